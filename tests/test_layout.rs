use artboard_engine::{
    layout, Axis, AutoLayout, CrossAlign, Engine, LayoutFlow, MainAlign, ShapeKind, SizingMode,
};

fn stack_frame(engine: &mut Engine, layout: AutoLayout) -> String {
    engine.create_shape_with(ShapeKind::Frame, |s| {
        s.x = 200.0;
        s.y = 200.0;
        s.width = Some(120.0);
        s.height = Some(300.0);
        s.layout = Some(layout);
    })
}

fn child_rect(engine: &mut Engine, parent: &str, w: f32, h: f32) -> String {
    let parent = parent.to_string();
    engine.create_shape_with(ShapeKind::Rectangle, move |s| {
        s.parent_id = Some(parent);
        s.width = Some(w);
        s.height = Some(h);
    })
}

#[test]
fn test_vertical_stack_hug_height() {
    let mut engine = Engine::new();
    let frame = stack_frame(
        &mut engine,
        AutoLayout {
            axis: Axis::Vertical,
            spacing: 8.0,
            padding: 12.0,
            height_mode: SizingMode::Hug,
            ..AutoLayout::default()
        },
    );
    for _ in 0..3 {
        child_rect(&mut engine, &frame, 40.0, 20.0);
    }

    // Hug height: 3 children of 20 + 2 gaps of 8 + 2 * padding 12 = 100.
    let f = engine.doc.shape(&frame).unwrap();
    assert!((f.height.unwrap() - 100.0).abs() < 0.01, "hug height should be 100");

    // Frame keeps its center, so top = 200 - 50 = 150. Child centers land
    // at top + 22, top + 50, top + 78.
    let children: Vec<_> = engine
        .doc
        .shapes
        .iter()
        .filter(|s| s.parent_id.as_deref() == Some(frame.as_str()))
        .collect();
    assert_eq!(children.len(), 3);
    let expected_y = [172.0, 200.0, 228.0];
    for (child, want) in children.iter().zip(expected_y) {
        assert!(
            (child.y - want).abs() < 0.01,
            "child y {} should be {}",
            child.y,
            want
        );
        // Cross start alignment: left padding edge, so x = 140 + 12 + 20.
        assert!((child.x - 172.0).abs() < 0.01, "child x should be 172");
    }
}

#[test]
fn test_solver_is_idempotent() {
    let mut engine = Engine::new();
    let frame = stack_frame(
        &mut engine,
        AutoLayout {
            axis: Axis::Horizontal,
            spacing: 10.0,
            padding: 12.0,
            width_mode: SizingMode::Hug,
            main_align: MainAlign::Center,
            cross_align: CrossAlign::Center,
            ..AutoLayout::default()
        },
    );
    child_rect(&mut engine, &frame, 30.0, 30.0);
    child_rect(&mut engine, &frame, 50.0, 10.0);

    let settled = engine.doc.clone();
    layout::solve_all(&mut engine.doc);
    layout::solve_all(&mut engine.doc);
    assert!(
        engine.doc.approx_eq(&settled, 1e-3),
        "re-solving a settled document must not move anything"
    );
}

#[test]
fn test_fill_children_share_remaining_space() {
    let mut engine = Engine::new();
    let frame = stack_frame(
        &mut engine,
        AutoLayout {
            axis: Axis::Vertical,
            spacing: 0.0,
            padding: 10.0,
            ..AutoLayout::default()
        },
    );
    // Fixed 80 + two fill children inside inner 280: each fill gets 100.
    child_rect(&mut engine, &frame, 40.0, 80.0);
    let fill_a = engine.create_shape_with(ShapeKind::Frame, {
        let frame = frame.clone();
        move |s| {
            s.parent_id = Some(frame);
            s.width = Some(40.0);
            s.height = Some(10.0);
            s.layout = Some(AutoLayout {
                height_mode: SizingMode::Fill,
                ..AutoLayout::default()
            });
        }
    });
    let fill_b = engine.create_shape_with(ShapeKind::Frame, {
        let frame = frame.clone();
        move |s| {
            s.parent_id = Some(frame);
            s.width = Some(40.0);
            s.height = Some(10.0);
            s.layout = Some(AutoLayout {
                height_mode: SizingMode::Fill,
                ..AutoLayout::default()
            });
        }
    });

    let a = engine.doc.shape(&fill_a).unwrap();
    let b = engine.doc.shape(&fill_b).unwrap();
    assert!((a.height.unwrap() - 100.0).abs() < 0.01, "fill child a gets 100");
    assert!((b.height.unwrap() - 100.0).abs() < 0.01, "fill child b gets 100");
}

#[test]
fn test_space_between_distributes_slack() {
    let mut engine = Engine::new();
    let frame = stack_frame(
        &mut engine,
        AutoLayout {
            axis: Axis::Vertical,
            spacing: 0.0,
            padding: 0.0,
            main_align: MainAlign::SpaceBetween,
            ..AutoLayout::default()
        },
    );
    child_rect(&mut engine, &frame, 40.0, 50.0);
    child_rect(&mut engine, &frame, 40.0, 50.0);

    // Inner 300, used 100, slack 200 becomes the single gap. Top = 50.
    let children: Vec<_> = engine
        .doc
        .shapes
        .iter()
        .filter(|s| s.parent_id.as_deref() == Some(frame.as_str()))
        .collect();
    assert!((children[0].y - 75.0).abs() < 0.01, "first child at 50 + 25");
    assert!((children[1].y - 325.0).abs() < 0.01, "second child at 300 + 25");
}

#[test]
fn test_grid_places_row_major() {
    let mut engine = Engine::new();
    let frame = engine.create_shape_with(ShapeKind::Frame, |s| {
        s.x = 0.0;
        s.y = 0.0;
        s.layout = Some(AutoLayout {
            flow: LayoutFlow::Grid,
            columns: Some(2),
            spacing: 10.0,
            padding: 5.0,
            width_mode: SizingMode::Hug,
            height_mode: SizingMode::Hug,
            ..AutoLayout::default()
        });
    });
    for _ in 0..3 {
        child_rect(&mut engine, &frame, 20.0, 20.0);
    }

    // Cells hug the largest child: 20x20. Grid 50x50, hug total 60x60,
    // centered on the frame origin so the content box spans -30..30.
    let f = engine.doc.shape(&frame).unwrap();
    assert!((f.width.unwrap() - 60.0).abs() < 0.01);
    assert!((f.height.unwrap() - 60.0).abs() < 0.01);

    let children: Vec<_> = engine
        .doc
        .shapes
        .iter()
        .filter(|s| s.parent_id.as_deref() == Some(frame.as_str()))
        .collect();
    let expected = [(-15.0, -15.0), (15.0, -15.0), (-15.0, 15.0)];
    for (child, (x, y)) in children.iter().zip(expected) {
        assert!((child.x - x).abs() < 0.01, "cell x {} should be {}", child.x, x);
        assert!((child.y - y).abs() < 0.01, "cell y {} should be {}", child.y, y);
    }
}

#[test]
fn test_manually_positioned_children_are_left_alone() {
    let mut engine = Engine::new();
    let frame = stack_frame(&mut engine, AutoLayout::default());
    let floating = engine.create_shape_with(ShapeKind::Rectangle, {
        let frame = frame.clone();
        move |s| {
            s.parent_id = Some(frame);
            s.auto_positioned = false;
            s.x = 999.0;
            s.y = -50.0;
            s.width = Some(10.0);
            s.height = Some(10.0);
        }
    });
    child_rect(&mut engine, &frame, 40.0, 20.0);

    let f = engine.doc.shape(&floating).unwrap();
    assert!((f.x - 999.0).abs() < 0.01, "absolute child keeps its x");
    assert!((f.y - -50.0).abs() < 0.01, "absolute child keeps its y");
}
