use glam::Vec2;

use artboard_engine::{
    geometry, AlignMode, Color, Engine, EngineError, Gradient, GradientKind, GradientStop,
    PaintDescriptor, PropertyRequest, ShapeKind, Style,
};

fn rect_at(engine: &mut Engine, x: f32, y: f32, w: f32, h: f32) -> String {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    engine.create_shape_with(ShapeKind::Rectangle, move |s| {
        s.x = x;
        s.y = y;
        s.width = Some(w);
        s.height = Some(h);
    })
}

#[test]
fn test_rect_bounding_box_is_centered() {
    let mut engine = Engine::new();
    let id = rect_at(&mut engine, 100.0, 100.0, 50.0, 80.0);
    let b = geometry::bounding_box(engine.doc.shape(&id).unwrap()).unwrap();
    assert!((b.left - 75.0).abs() < 1e-4);
    assert!((b.right - 125.0).abs() < 1e-4);
    assert!((b.top - 60.0).abs() < 1e-4);
    assert!((b.bottom - 140.0).abs() < 1e-4);
}

#[test]
fn test_default_names_count_per_kind() {
    let mut engine = Engine::new();
    let a = engine.create_shape(ShapeKind::Rectangle);
    let b = engine.create_shape(ShapeKind::Rectangle);
    let c = engine.create_shape(ShapeKind::Circle);
    assert_eq!(engine.doc.shape(&a).unwrap().name, "Rectangle 1");
    assert_eq!(engine.doc.shape(&b).unwrap().name, "Rectangle 2");
    assert_eq!(engine.doc.shape(&c).unwrap().name, "Circle 1");
}

#[test]
fn test_unknown_target_is_acknowledged_unapplied() {
    let mut engine = Engine::new();
    let ack = engine.apply_property("no-such-shape", PropertyRequest::Opacity(0.5));
    assert!(!ack.applied);
    assert_eq!(ack.version, 0);
}

#[test]
fn test_noop_request_records_no_transaction() {
    let mut engine = Engine::new();
    let id = rect_at(&mut engine, 100.0, 100.0, 50.0, 50.0);
    let ack = engine.apply_property(&id, PropertyRequest::Position { x: 100.0, y: 100.0 });
    assert!(!ack.applied, "setting the current position changes nothing");

    assert!(engine.undo(), "only the creation is on the undo stack");
    assert!(!engine.can_undo());
}

#[test]
fn test_history_is_linear_and_symmetric() {
    let mut engine = Engine::new();
    let a = rect_at(&mut engine, 0.0, 0.0, 10.0, 10.0);
    engine.apply_property(&a, PropertyRequest::Position { x: 50.0, y: 0.0 });
    engine.apply_property(&a, PropertyRequest::Opacity(0.5));

    assert!(engine.undo());
    assert!((engine.doc.shape(&a).unwrap().opacity - 1.0).abs() < 1e-4);
    assert!(engine.undo());
    assert!((engine.doc.shape(&a).unwrap().x - 0.0).abs() < 1e-4);
    assert!(engine.undo());
    assert!(engine.doc.shape(&a).is_none());
    assert!(!engine.undo(), "three transactions, three undos");

    assert!(engine.redo());
    assert!(engine.redo());
    assert!(engine.redo());
    assert!((engine.doc.shape(&a).unwrap().opacity - 0.5).abs() < 1e-4);
    assert!(!engine.can_redo());
}

#[test]
fn test_new_edit_clears_the_redo_branch() {
    let mut engine = Engine::new();
    let a = rect_at(&mut engine, 0.0, 0.0, 10.0, 10.0);
    engine.apply_property(&a, PropertyRequest::Position { x: 50.0, y: 0.0 });
    engine.undo();
    assert!(engine.can_redo());
    engine.apply_property(&a, PropertyRequest::Position { x: -30.0, y: 0.0 });
    assert!(!engine.can_redo(), "a fresh edit invalidates the redo branch");
}

#[test]
fn test_duplicate_paints_just_above_the_source() {
    let mut engine = Engine::new();
    let a = rect_at(&mut engine, 0.0, 0.0, 10.0, 10.0);
    let b = rect_at(&mut engine, 40.0, 0.0, 10.0, 10.0);

    let copies = engine.duplicate(&[a.clone()]);
    assert_eq!(copies.len(), 1);

    let order: Vec<&str> = engine.doc.shapes.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(order, vec![a.as_str(), copies[0].as_str(), b.as_str()]);

    let copy = engine.doc.shape(&copies[0]).unwrap();
    assert!((copy.x - 8.0).abs() < 1e-4, "copy is nudged");
    assert!((copy.y - 8.0).abs() < 1e-4);
}

#[test]
fn test_group_takes_the_union_box_as_frame() {
    let mut engine = Engine::new();
    let a = rect_at(&mut engine, 7.5, 7.5, 15.0, 15.0);
    let b = rect_at(&mut engine, 22.5, 22.5, 15.0, 15.0);

    let group = engine.group(&[a.clone(), b.clone()]).unwrap();
    let g = engine.doc.shape(&group).unwrap();
    assert!((g.x - 15.0).abs() < 1e-4);
    assert!((g.y - 15.0).abs() < 1e-4);
    assert!((g.width.unwrap() - 30.0).abs() < 1e-4);
    assert!((g.height.unwrap() - 30.0).abs() < 1e-4);
    assert_eq!(
        engine.doc.shape(&a).unwrap().parent_id.as_deref(),
        Some(group.as_str())
    );
    assert_eq!(
        engine.doc.shape(&b).unwrap().parent_id.as_deref(),
        Some(group.as_str())
    );
}

#[test]
fn test_ungroup_restores_the_members() {
    let mut engine = Engine::new();
    let a = rect_at(&mut engine, 0.0, 0.0, 10.0, 10.0);
    let b = rect_at(&mut engine, 20.0, 0.0, 10.0, 10.0);
    let group = engine.group(&[a.clone(), b.clone()]).unwrap();

    let children = engine.ungroup(&group);
    assert_eq!(children, vec![a.clone(), b.clone()]);
    assert!(engine.doc.shape(&group).is_none());
    assert!(engine.doc.shape(&a).unwrap().parent_id.is_none());
}

#[test]
fn test_emptied_groups_are_pruned() {
    let mut engine = Engine::new();
    let a = rect_at(&mut engine, 0.0, 0.0, 10.0, 10.0);
    let b = rect_at(&mut engine, 20.0, 0.0, 10.0, 10.0);
    let group = engine.group(&[a.clone(), b.clone()]).unwrap();

    engine.delete_shapes(&[a, b]);
    assert!(
        engine.doc.shape(&group).is_none(),
        "a group with no members left must collapse"
    );
}

#[test]
fn test_align_left_against_the_union() {
    let mut engine = Engine::new();
    let a = rect_at(&mut engine, 10.0, 0.0, 20.0, 10.0);
    let b = rect_at(&mut engine, 100.0, 50.0, 40.0, 10.0);

    assert!(engine.align(AlignMode::Left, &[a.clone(), b.clone()]));
    // Union left edge is min(0, 80) = 0.
    assert!((engine.doc.shape(&a).unwrap().x - 10.0).abs() < 1e-4);
    assert!((engine.doc.shape(&b).unwrap().x - 20.0).abs() < 1e-4);
}

#[test]
fn test_drag_previews_then_commits_one_transaction() {
    let mut engine = Engine::new();
    let id = rect_at(&mut engine, 100.0, 100.0, 20.0, 20.0);

    assert!(engine.begin_drag(&[id.clone()], Vec2::new(100.0, 100.0)));
    engine.update_gesture(Vec2::new(110.0, 100.0));
    engine.update_gesture(Vec2::new(130.0, 125.0));
    assert!((engine.doc.shape(&id).unwrap().x - 130.0).abs() < 1e-4);
    assert!((engine.doc.shape(&id).unwrap().y - 125.0).abs() < 1e-4);

    assert!(engine.commit_gesture());
    assert!(engine.undo(), "the whole drag is one step");
    assert!((engine.doc.shape(&id).unwrap().x - 100.0).abs() < 1e-4);
}

#[test]
fn test_cancelled_gesture_restores_the_baseline() {
    let mut engine = Engine::new();
    let id = rect_at(&mut engine, 100.0, 100.0, 20.0, 20.0);
    let undo_before = engine.can_undo();

    engine.begin_drag(&[id.clone()], Vec2::new(100.0, 100.0));
    engine.update_gesture(Vec2::new(400.0, 400.0));
    engine.cancel_gesture();

    assert!((engine.doc.shape(&id).unwrap().x - 100.0).abs() < 1e-4);
    assert_eq!(engine.can_undo(), undo_before, "a cancel records nothing");
}

#[test]
fn test_stationary_gesture_commits_nothing() {
    let mut engine = Engine::new();
    let id = rect_at(&mut engine, 100.0, 100.0, 20.0, 20.0);
    engine.begin_drag(&[id.clone()], Vec2::new(100.0, 100.0));
    engine.update_gesture(Vec2::new(100.0, 100.0));
    assert!(!engine.commit_gesture(), "no material change, no transaction");
}

#[test]
fn test_only_one_gesture_at_a_time() {
    let mut engine = Engine::new();
    let id = rect_at(&mut engine, 0.0, 0.0, 20.0, 20.0);
    assert!(engine.begin_drag(&[id.clone()], Vec2::ZERO));
    assert!(!engine.begin_resize(&id, Vec2::ZERO));
    engine.cancel_gesture();
    assert!(engine.begin_resize(&id, Vec2::ZERO));
}

#[test]
fn test_locked_shapes_cannot_be_dragged() {
    let mut engine = Engine::new();
    let id = engine.create_shape_with(ShapeKind::Rectangle, |s| {
        s.locked = true;
        s.width = Some(10.0);
        s.height = Some(10.0);
    });
    assert!(!engine.begin_drag(&[id], Vec2::ZERO));
}

#[test]
fn test_last_page_cannot_be_deleted() {
    let mut engine = Engine::new();
    let page = engine.doc.active_page_id.clone();
    assert_eq!(engine.delete_page(&page), Err(EngineError::LastPage));
    assert_eq!(engine.doc.pages.len(), 1);
}

#[test]
fn test_deleting_a_page_takes_its_shapes() {
    let mut engine = Engine::new();
    let first = engine.doc.active_page_id.clone();
    let on_first = rect_at(&mut engine, 0.0, 0.0, 10.0, 10.0);

    let second = engine.add_page(None);
    assert_eq!(engine.doc.active_page_id, second);
    let on_second = rect_at(&mut engine, 0.0, 0.0, 10.0, 10.0);

    assert_eq!(engine.delete_page(&second), Ok(true));
    assert_eq!(engine.doc.active_page_id, first);
    assert!(engine.doc.shape(&on_second).is_none());
    assert!(engine.doc.shape(&on_first).is_some());
}

#[test]
fn test_duplicate_page_deep_copies_shapes() {
    let mut engine = Engine::new();
    let original = engine.doc.active_page_id.clone();
    let a = rect_at(&mut engine, 5.0, 5.0, 10.0, 10.0);

    let copy = engine.duplicate_page(&original).unwrap();
    assert_ne!(copy, original);

    let copied: Vec<_> = engine
        .doc
        .shapes
        .iter()
        .filter(|s| s.page_id.as_deref() == Some(copy.as_str()))
        .collect();
    assert_eq!(copied.len(), 1);
    assert_ne!(copied[0].id, a, "copies get fresh ids");
    assert!((copied[0].x - 5.0).abs() < 1e-4);
}

#[test]
fn test_selection_reports_parent_and_siblings() {
    let mut engine = Engine::new();
    let a = rect_at(&mut engine, 0.0, 0.0, 10.0, 10.0);
    let b = rect_at(&mut engine, 20.0, 0.0, 10.0, 10.0);
    let group = engine.group(&[a.clone(), b.clone()]).unwrap();

    let info = engine.set_selection(vec![a.clone()]).unwrap();
    assert_eq!(info.shape.id, a);
    assert_eq!(info.parent.unwrap().id, group);
    assert_eq!(info.siblings, vec![a, b]);
}

#[test]
fn test_hit_test_prefers_the_topmost_shape() {
    let mut engine = Engine::new();
    let below = rect_at(&mut engine, 50.0, 50.0, 40.0, 40.0);
    let above = rect_at(&mut engine, 50.0, 50.0, 40.0, 40.0);

    assert_eq!(engine.shape_at(Vec2::new(50.0, 50.0)), Some(above));
    assert_eq!(engine.shape_at(Vec2::new(500.0, 500.0)), None);
    let _ = below;
}

#[test]
fn test_reorder_children_leaves_unrelated_shapes_alone() {
    let mut engine = Engine::new();
    let z = rect_at(&mut engine, 0.0, 0.0, 10.0, 10.0);
    let frame = engine.create_shape_with(ShapeKind::Frame, |_| {});
    let child = |engine: &mut Engine, frame: &str| {
        let frame = frame.to_string();
        engine.create_shape_with(ShapeKind::Rectangle, move |s| {
            s.parent_id = Some(frame);
            s.width = Some(10.0);
            s.height = Some(10.0);
        })
    };
    let a = child(&mut engine, &frame);
    let b = child(&mut engine, &frame);
    let c = child(&mut engine, &frame);

    // Children missing from the request keep their relative order after
    // the requested ones.
    assert!(engine.reorder_children(Some(&frame), &[c.clone(), a.clone()]));

    let order: Vec<&str> = engine.doc.shapes.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(
        order,
        vec![z.as_str(), frame.as_str(), c.as_str(), a.as_str(), b.as_str()]
    );
    for id in [&a, &b, &c] {
        assert_eq!(
            engine.doc.shape(id).unwrap().parent_id.as_deref(),
            Some(frame.as_str())
        );
    }
}

#[test]
fn test_move_to_parent_top_carries_the_subtree() {
    let mut engine = Engine::new();
    let r1 = rect_at(&mut engine, 0.0, 0.0, 10.0, 10.0);
    let r2 = rect_at(&mut engine, 20.0, 0.0, 10.0, 10.0);
    let group = engine.group(&[r1.clone(), r2.clone()]).unwrap();
    let frame = engine.create_shape_with(ShapeKind::Frame, |_| {});

    assert!(engine.move_to_parent_top(&group, Some(&frame)));

    // The whole block lands contiguously at the new parent's top.
    let order: Vec<&str> = engine.doc.shapes.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(
        order,
        vec![frame.as_str(), group.as_str(), r1.as_str(), r2.as_str()]
    );
    assert_eq!(
        engine.doc.shape(&group).unwrap().parent_id.as_deref(),
        Some(frame.as_str())
    );
    assert_eq!(
        engine.doc.shape(&r1).unwrap().parent_id.as_deref(),
        Some(group.as_str())
    );

    // Reparenting under one's own descendant would create a cycle.
    assert!(!engine.move_to_parent_top(&frame, Some(&group)));
    assert!(engine.doc.shape(&frame).unwrap().parent_id.is_none());
}

#[test]
fn test_render_list_derives_paint_descriptors() {
    let mut engine = Engine::new();
    let gradient = |kind| Gradient {
        kind,
        stops: vec![
            GradientStop { position: 0.0, color: Color::BLACK, opacity: 1.0 },
            GradientStop { position: 1.0, color: Color::WHITE, opacity: 1.0 },
        ],
        ..Gradient::default()
    };
    let linear = engine.create_shape_with(ShapeKind::Rectangle, {
        let g = gradient(GradientKind::Linear);
        move |s| {
            s.width = Some(20.0);
            s.height = Some(20.0);
            s.fills = vec![Style::gradient(g)];
        }
    });
    let angular = engine.create_shape_with(ShapeKind::Rectangle, {
        let g = gradient(GradientKind::Angular);
        move |s| {
            s.width = Some(20.0);
            s.height = Some(20.0);
            s.fills = vec![Style::gradient(g)];
        }
    });
    let underfilled = engine.create_shape_with(ShapeKind::Rectangle, |s| {
        s.width = Some(20.0);
        s.height = Some(20.0);
        s.fills = vec![Style::gradient(Gradient::default())];
    });

    let list = engine.render_list();
    assert_eq!(list.len(), 3);

    let fill_of = |id: &str| {
        list.iter()
            .find(|r| r.shape.id == id)
            .and_then(|r| r.fills.first())
            .unwrap()
            .clone()
    };
    assert!(matches!(fill_of(&linear), PaintDescriptor::Stops { kind: GradientKind::Linear, .. }));
    match fill_of(&angular) {
        PaintDescriptor::Raster(buffer) => {
            assert_eq!(buffer.width, 20);
            assert_eq!(buffer.height, 20);
            assert_eq!(buffer.pixels.len(), 20 * 20 * 4);
        }
        other => panic!("angular gradient should rasterize, got {other:?}"),
    }
    assert!(
        matches!(fill_of(&underfilled), PaintDescriptor::Solid(_)),
        "a stopless gradient degrades to a flat color"
    );
}

#[test]
fn test_copy_paste_lands_on_the_active_page() {
    let mut engine = Engine::new();
    let a = rect_at(&mut engine, 10.0, 10.0, 10.0, 10.0);
    engine.copy(&[a.clone()]);

    let second = engine.add_page(None);
    let pasted = engine.paste();
    assert_eq!(pasted.len(), 1);
    let p = engine.doc.shape(&pasted[0]).unwrap();
    assert_eq!(p.page_id.as_deref(), Some(second.as_str()));
    assert!((p.x - 18.0).abs() < 1e-4);
    assert!(p.parent_id.is_none());
}
