use glam::Vec2;

use artboard_engine::{
    gradient::{self, Rasterizer},
    Color, Gradient, GradientHandles, GradientKind, GradientStop,
};

fn stop(position: f32, color: Color) -> GradientStop {
    GradientStop {
        position,
        color,
        opacity: 1.0,
    }
}

fn black_to_white() -> Gradient {
    Gradient {
        kind: GradientKind::Linear,
        angle: 0.0,
        handles: GradientHandles {
            start: Vec2::new(0.0, 0.5),
            end: Vec2::new(1.0, 0.5),
        },
        stops: vec![stop(0.0, Color::BLACK), stop(1.0, Color::WHITE)],
    }
}

#[test]
fn test_normalize_is_a_fixed_point() {
    let messy = Gradient {
        kind: GradientKind::Linear,
        angle: 123.0,
        handles: GradientHandles {
            start: Vec2::new(0.0, 0.0),
            end: Vec2::new(1.0, 1.0),
        },
        stops: vec![stop(0.9, Color::WHITE), stop(-0.5, Color::BLACK), stop(1.7, Color::BLACK)],
    };
    let once = gradient::normalize(&messy);
    let twice = gradient::normalize(&once);
    assert_eq!(once, twice, "normalizing a normalized gradient must be a no-op");

    // Stops are clamped and sorted, and the angle comes from the handles.
    assert!((once.stops[0].position - 0.0).abs() < 1e-6);
    assert!((once.stops[2].position - 1.0).abs() < 1e-6);
    assert!((once.angle - 45.0).abs() < 1e-4);
}

#[test]
fn test_lone_stop_is_mirrored_to_both_ends() {
    let gradient = Gradient {
        stops: vec![stop(0.3, Color::WHITE)],
        ..Gradient::default()
    };
    let normalized = gradient::normalize(&gradient);
    assert_eq!(normalized.stops.len(), 2);
    assert!((normalized.stops[0].position - 0.0).abs() < 1e-6);
    assert!((normalized.stops[1].position - 1.0).abs() < 1e-6);
    assert_eq!(normalized.stops[0].color, Color::WHITE);
}

#[test]
fn test_sample_midpoint_is_mid_gray() {
    let (color, opacity) = gradient::sample(&black_to_white(), 0.5);
    assert!((color.r - 0.5).abs() < 1e-4);
    assert!((color.g - 0.5).abs() < 1e-4);
    assert!((color.b - 0.5).abs() < 1e-4);
    assert!((opacity - 1.0).abs() < 1e-4);
}

#[test]
fn test_sample_clamps_outside_unit_range() {
    let g = black_to_white();
    let (lo, _) = gradient::sample(&g, -3.0);
    let (hi, _) = gradient::sample(&g, 7.0);
    assert_eq!(lo, Color::BLACK);
    assert_eq!(hi, Color::WHITE);
}

#[test]
fn test_underfilled_gradient_falls_back_to_flat_color() {
    let g = Gradient {
        stops: vec![stop(0.4, Color::new(1.0, 0.0, 0.0, 1.0))],
        ..Gradient::default()
    };
    let (color, opacity) = gradient::fallback_color(&g);
    assert!((color.r - 1.0).abs() < 1e-6);
    assert!((opacity - 1.0).abs() < 1e-6);

    let empty = Gradient::default();
    let (color, _) = gradient::fallback_color(&empty);
    assert_eq!(color, Color::BLACK);
}

#[test]
fn test_linear_ratio_is_axis_projection() {
    let start = Vec2::new(0.0, 0.0);
    let end = Vec2::new(100.0, 0.0);
    let r = gradient::ratio_for_point(GradientKind::Linear, Vec2::new(25.0, 40.0), start, end);
    assert!((r - 0.25).abs() < 1e-5, "perpendicular offset must not matter");
}

#[test]
fn test_radial_ratio_is_distance_over_axis_length() {
    let start = Vec2::new(0.0, 0.0);
    let end = Vec2::new(0.0, 100.0);
    let r = gradient::ratio_for_point(GradientKind::Radial, Vec2::new(30.0, 40.0), start, end);
    assert!((r - 0.5).abs() < 1e-5);
}

#[test]
fn test_angular_ratio_wraps_a_full_turn() {
    let start = Vec2::new(0.0, 0.0);
    let end = Vec2::new(1.0, 0.0);
    let quarter =
        gradient::ratio_for_point(GradientKind::Angular, Vec2::new(0.0, 1.0), start, end);
    assert!((quarter - 0.25).abs() < 1e-5);
    let on_axis = gradient::ratio_for_point(GradientKind::Angular, Vec2::new(2.0, 0.0), start, end);
    assert!(on_axis.abs() < 1e-5);
}

#[test]
fn test_diamond_ratio_is_taxicab_distance() {
    let start = Vec2::new(0.0, 0.0);
    let end = Vec2::new(100.0, 0.0);
    let r = gradient::ratio_for_point(
        GradientKind::Diamond,
        Vec2::new(30.0, 20.0),
        start,
        end,
    );
    assert!((r - 0.5).abs() < 1e-5);
}

#[test]
fn test_rasterizer_memoizes_identical_requests() {
    let mut rasterizer = Rasterizer::new();
    let g = Gradient {
        kind: GradientKind::Angular,
        stops: vec![stop(0.0, Color::BLACK), stop(1.0, Color::WHITE)],
        ..Gradient::default()
    };
    let a = rasterizer.raster(&g, 16, 16);
    assert_eq!(rasterizer.len(), 1);
    let b = rasterizer.raster(&g, 16, 16);
    assert_eq!(rasterizer.len(), 1, "identical request must hit the cache");
    assert_eq!(a, b);
    assert_eq!(a.pixels.len(), 16 * 16 * 4);

    rasterizer.raster(&g, 32, 16);
    assert_eq!(rasterizer.len(), 2, "new dimensions are a distinct entry");
}
