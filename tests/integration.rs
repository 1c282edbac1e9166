use image::{GrayImage, Luma, Rgb, RgbImage};
use poisson_blend::{
    blend, build_base_operator, solve_channel, specialize_for_mask, BlendParams, EdgePolicy,
    Error, Mask, Offset, PoissonSystem, SolverConfig, SolverKind,
};

fn pinned() -> BlendParams {
    BlendParams {
        edge_policy: EdgePolicy::PinUnmasked,
        ..BlendParams::default()
    }
}

fn on_ring(x: u32, y: u32, w: u32, h: u32) -> bool {
    x == 0 || y == 0 || x + 1 == w || y + 1 == h
}

fn textured(w: u32, h: u32, seed: u32) -> GrayImage {
    GrayImage::from_fn(w, h, |x, y| {
        Luma([((x * 31 + y * 17 + seed * 7) % 200 + 20) as u8])
    })
}

#[test]
fn empty_mask_returns_target_with_pinned_edges() {
    let source = textured(7, 6, 1);
    let target = textured(7, 6, 9);
    let mask = Mask::new(7, 6);

    let out = blend(&source, &target, &mask, Offset::new(2, -1), &pinned()).unwrap();
    assert_eq!(out, target);
}

#[test]
fn empty_mask_keeps_interior_with_default_edges() {
    let source = textured(7, 6, 1);
    let target = textured(7, 6, 9);
    let mask = Mask::new(7, 6);

    let out = blend(&source, &target, &mask, Offset::default(), &BlendParams::default()).unwrap();
    for (x, y, px) in out.enumerate_pixels() {
        if !on_ring(x, y, 7, 6) {
            assert_eq!(px, target.get_pixel(x, y), "pixel ({x}, {y})");
        }
    }
}

#[test]
fn unselected_interior_is_exact_for_any_mask() {
    let source = textured(9, 8, 3);
    let target = textured(9, 8, 5);
    let mask = Mask::from_fn(9, 8, |x, y| (3..6).contains(&x) && (2..5).contains(&y));

    let out = blend(&source, &target, &mask, Offset::default(), &BlendParams::default()).unwrap();
    for (x, y, px) in out.enumerate_pixels() {
        if !mask.contains(x, y) && !on_ring(x, y, 9, 8) {
            assert_eq!(px, target.get_pixel(x, y), "pixel ({x}, {y})");
        }
    }
}

#[test]
fn flat_source_fills_interior_with_matching_border() {
    let source = GrayImage::from_pixel(8, 8, Luma([77]));
    let mut target = textured(8, 8, 2);
    for (x, y, px) in target.enumerate_pixels_mut() {
        if on_ring(x, y, 8, 8) {
            *px = Luma([77]);
        }
    }
    let mask = Mask::from_fn(8, 8, |x, y| !on_ring(x, y, 8, 8));

    let out = blend(&source, &target, &mask, Offset::default(), &pinned()).unwrap();
    assert!(out.pixels().all(|p| p[0] == 77));
}

#[test]
fn full_mask_reproduces_source_regardless_of_target() {
    // Every row keeps the Laplacian, ring included, so A0 x = A0 s gives x = s.
    let source = textured(6, 5, 4);
    let target = GrayImage::from_pixel(6, 5, Luma([3]));
    let mask = Mask::filled(6, 5, true);

    let out = blend(&source, &target, &mask, Offset::default(), &BlendParams::default()).unwrap();
    assert_eq!(out, source);
}

#[test]
fn border_ring_solves_laplacian_by_default() {
    let source = GrayImage::from_pixel(5, 5, Luma([100]));
    let target = GrayImage::from_pixel(5, 5, Luma([100]));
    let mask = Mask::from_fn(5, 5, |x, y| !on_ring(x, y, 5, 5));

    let default = blend(&source, &target, &mask, Offset::default(), &BlendParams::default())
        .unwrap();
    // Unselected corner rows read 4x - (two neighbors) = 100, which 100 does
    // not satisfy: the edge is solved, not copied.
    assert_ne!(default.get_pixel(0, 0)[0], 100);

    let edges_pinned = blend(&source, &target, &mask, Offset::default(), &pinned()).unwrap();
    assert!(edges_pinned.pixels().all(|p| p[0] == 100));
}

#[test]
fn selected_ring_rows_satisfy_their_laplacian() {
    let mask = Mask::filled(4, 4, true);
    let system = PoissonSystem::new(&mask, EdgePolicy::Laplacian).unwrap();
    let source: Vec<f64> = (0..16).map(|i| f64::from(i * 13 % 50)).collect();
    let target = vec![200.0; 16];

    let x = solve_channel(&system, &source, &target, 1.0, &SolverConfig::default()).unwrap();
    let lhs = system.specialized().mul_vec(&x);
    let rhs = system.base().mul_vec(&source);
    for (k, (l, r)) in lhs.iter().zip(&rhs).enumerate() {
        assert!((l - r).abs() < 1e-6, "row {k}");
    }
}

#[test]
fn channels_blend_independently() {
    let (w, h) = (7, 6);
    let planes_src = [textured(w, h, 1), textured(w, h, 2), textured(w, h, 3)];
    let planes_tgt = [textured(w, h, 4), textured(w, h, 5), textured(w, h, 6)];
    let join = |p: &[GrayImage; 3]| {
        RgbImage::from_fn(w, h, |x, y| {
            Rgb([
                p[0].get_pixel(x, y)[0],
                p[1].get_pixel(x, y)[0],
                p[2].get_pixel(x, y)[0],
            ])
        })
    };
    let source = join(&planes_src);
    let target = join(&planes_tgt);
    let mask = Mask::from_fn(w, h, |x, y| (2..5).contains(&x) && (1..5).contains(&y));
    let offset = Offset::new(1, 0);
    let params = BlendParams::default();

    let rgb = blend(&source, &target, &mask, offset, &params).unwrap();
    for c in 0..3 {
        let single = blend(&planes_src[c], &planes_tgt[c], &mask, offset, &params).unwrap();
        for (x, y, px) in single.enumerate_pixels() {
            assert_eq!(rgb.get_pixel(x, y)[c], px[0], "channel {c} at ({x}, {y})");
        }
    }
}

#[test]
fn shape_mismatch_is_rejected() {
    let source = GrayImage::new(4, 4);
    let target = GrayImage::new(4, 4);
    let mask = Mask::new(3, 4);

    let err = blend(&source, &target, &mask, Offset::default(), &BlendParams::default())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ShapeMismatch {
            mask_width: 3,
            mask_height: 4,
            target_width: 4,
            target_height: 4,
        }
    ));
}

#[test]
fn shape_mismatch_wins_over_bad_parameters() {
    let target = GrayImage::new(4, 4);
    let params = BlendParams {
        strength: f64::NAN,
        ..BlendParams::default()
    };
    let err = blend(&target, &target, &Mask::new(4, 5), Offset::default(), &params).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));
}

#[test]
fn empty_target_is_rejected() {
    let target = GrayImage::new(0, 3);
    let err = blend(&target, &target, &Mask::new(0, 3), Offset::default(), &BlendParams::default())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidDimensions { width: 0, height: 3 }));
}

#[test]
fn gray_on_white_single_pixel_scenario() {
    let target = GrayImage::from_pixel(4, 4, Luma([100]));
    let source = GrayImage::from_pixel(4, 4, Luma([255]));
    let mut mask = Mask::new(4, 4);
    mask.set(1, 1, true);

    let out = blend(&source, &target, &mask, Offset::default(), &pinned()).unwrap();
    assert_eq!(out, target);

    let quirky = blend(&source, &target, &mask, Offset::default(), &BlendParams::default())
        .unwrap();
    for (x, y) in [(2, 1), (1, 2), (2, 2)] {
        assert_eq!(quirky.get_pixel(x, y)[0], 100);
    }
}

#[test]
fn offset_moves_the_cloned_detail() {
    // A 3x3 source with a bright center, shifted onto the masked block.
    let mut source = GrayImage::from_pixel(3, 3, Luma([50]));
    source.put_pixel(1, 1, Luma([90]));
    let target = GrayImage::from_pixel(9, 9, Luma([50]));
    let mask = Mask::from_fn(9, 9, |x, y| (4..7).contains(&x) && (4..7).contains(&y));

    let out = blend(&source, &target, &mask, Offset::new(4, 4), &pinned()).unwrap();
    let center = out.get_pixel(5, 5)[0];
    assert!(center > 50, "center {center}");
    assert!(center > out.get_pixel(4, 4)[0]);
    assert_eq!(out.get_pixel(1, 1)[0], 50);
}

#[test]
fn zero_strength_gives_smooth_membrane() {
    let source = textured(8, 8, 7);
    let target = GrayImage::from_pixel(8, 8, Luma([120]));
    let mask = Mask::from_fn(8, 8, |x, y| !on_ring(x, y, 8, 8));
    let params = BlendParams {
        strength: 0.0,
        ..pinned()
    };

    let out = blend(&source, &target, &mask, Offset::default(), &params).unwrap();
    assert!(out.pixels().all(|p| p[0] == 120));
}

#[test]
fn solvers_produce_the_same_image() {
    let source = textured(10, 9, 1);
    let target = textured(10, 9, 8);
    let mask = Mask::from_fn(10, 9, |x, y| (2..8).contains(&x) && (2..7).contains(&y));

    let krylov = blend(&source, &target, &mask, Offset::default(), &BlendParams::default())
        .unwrap();
    let sor = BlendParams {
        solver: SolverConfig {
            kind: SolverKind::GaussSeidel { omega: 1.6 },
            tolerance: 1e-12,
            ..SolverConfig::default()
        },
        ..BlendParams::default()
    };
    let relaxed = blend(&source, &target, &mask, Offset::default(), &sor).unwrap();
    for (a, b) in krylov.pixels().zip(relaxed.pixels()) {
        assert!(a[0].abs_diff(b[0]) <= 1);
    }
}

#[test]
fn specialization_preserves_the_base_operator() {
    let base = build_base_operator(5, 5).unwrap();
    let mask = Mask::new(5, 5);
    let specialized = specialize_for_mask(&base, &mask, EdgePolicy::PinUnmasked);
    assert_eq!(base, build_base_operator(5, 5).unwrap());
    assert_ne!(base, specialized);
    assert_eq!(base.nnz(), specialized.nnz());
}
