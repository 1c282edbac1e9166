//! Blend a cut-out layer onto a background image.
//!
//! Usage:
//! ```sh
//! cargo run --example blend_files -- cutout.png background.jpg output.png
//! ```

use std::env;
use std::path::PathBuf;
use std::process;

use poisson_blend::{BlendEngine, BlendJob, ProcessOptions};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <source> <target> <output>", args[0]);
        process::exit(1);
    }

    let engine = BlendEngine::new(ProcessOptions::default()).expect("default options are valid");
    let result = engine.process_files(&BlendJob {
        source: PathBuf::from(&args[1]),
        target: PathBuf::from(&args[2]),
        mask: None,
        output: PathBuf::from(&args[3]),
    });

    if result.skipped {
        println!("Skipped: {}", result.message);
    } else if result.success {
        println!("Done: {}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        process::exit(1);
    }
}
