//! Seamless image cloning via discrete Poisson image editing.
//!
//! Given a source image, a target canvas, and a selection mask, the selected
//! region is re-synthesized so that it follows the source's gradients while
//! meeting the target along the mask boundary, leaving no visible seam.
//!
//! Every channel is solved as one sparse linear system over the whole target
//! canvas: the 5-point Laplacian on selected pixels, identity rows elsewhere.
//!
//! # Quick Start
//!
//! ```no_run
//! use poisson_blend::{blend, BlendParams, Mask, Offset};
//!
//! let source = image::open("patch.png").unwrap().to_rgb8();
//! let target = image::open("scene.png").unwrap().to_rgb8();
//! let mask = Mask::from_luma(&image::open("mask.png").unwrap().to_luma8());
//!
//! let out = blend(&source, &target, &mask, Offset::new(40, 25), &BlendParams::default())
//!     .expect("blend failed");
//! out.save("composite.png").unwrap();
//! ```
//!
//! # Layers
//!
//! A cut-out with transparency can be blended directly; its alpha channel is
//! the mask and the background is resized onto the layer's canvas.
//!
//! ```no_run
//! use poisson_blend::{BlendEngine, ProcessOptions};
//!
//! let engine = BlendEngine::new(ProcessOptions::default()).expect("invalid options");
//! let layer = image::open("cutout.png").unwrap().to_rgba8();
//! let background = image::open("beach.jpg").unwrap().to_rgb8();
//! let out = engine.blend_layer(&layer, &background).expect("blend failed");
//! out.save("beach_blended.png").unwrap();
//! ```
//!
//! # Canvas edges
//!
//! By default pixels on the outermost ring of the canvas always keep the
//! Laplacian row, even when unselected, so they are solved rather than copied
//! from the target. [`EdgePolicy::PinUnmasked`] pins them instead.

#![deny(missing_docs)]

pub mod blend;
mod engine;
pub mod error;
pub mod mask;
pub mod operator;
pub mod solver;
pub mod sparse;

pub use blend::{align_source, blend, solve_channel, BlendParams, Offset};
pub use engine::{
    default_output_path, is_supported_image, load_mask, save_image, BlendEngine, BlendJob,
    ProcessOptions, ProcessResult,
};
pub use error::{Error, Result};
pub use mask::Mask;
pub use operator::{build_base_operator, specialize_for_mask, EdgePolicy, PoissonSystem};
pub use solver::{SolveError, SolverConfig, SolverKind};
