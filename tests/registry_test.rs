use std::sync::Arc;
use std::thread;

use tsgl::{CanvasError, Color, Shape, ShapeRegistry};

fn squares(n: usize) -> Vec<Shape> {
    (0..n)
        .map(|i| Shape::square(i as f32, 0.0, 2.0, Color::RED))
        .collect()
}

#[test]
fn add_then_remove_restores_the_registry() {
    let registry = ShapeRegistry::new();
    let shapes = squares(3);
    for s in &shapes {
        registry.add(s);
    }
    let before = registry.ids();

    let extra = Shape::circle(5.0, 5.0, 2.0, Color::BLUE);
    registry.add(&extra);
    assert_eq!(registry.len(), 4);
    registry.remove(&extra).unwrap();

    assert_eq!(registry.ids(), before);
    assert!(!registry.contains(&extra));
}

#[test]
fn removing_an_unknown_shape_fails() {
    let registry = ShapeRegistry::new();
    let shape = Shape::square(0.0, 0.0, 1.0, Color::RED);
    let err = registry.remove(&shape).unwrap_err();
    assert!(matches!(err, CanvasError::NotRegistered(id) if id == shape.id()));
}

#[test]
fn duplicate_registrations_are_removed_one_at_a_time() {
    let registry = ShapeRegistry::new();
    let shapes = squares(2);
    registry.add(&shapes[0]);
    registry.add(&shapes[1]);
    registry.add(&shapes[0]);

    registry.remove(&shapes[0]).unwrap();
    assert_eq!(registry.ids(), vec![shapes[1].id(), shapes[0].id()]);
    registry.remove(&shapes[0]).unwrap();
    assert!(registry.remove(&shapes[0]).is_err());
}

#[test]
fn dropped_shapes_stop_counting() {
    let registry = ShapeRegistry::new();
    let mut shapes = squares(3);
    for s in &shapes {
        registry.add(s);
    }
    shapes.remove(1);
    assert_eq!(registry.len(), 2);
    registry.clear();
    assert!(registry.is_empty());
}

#[test]
fn concurrent_add_and_remove_leaves_no_residue() {
    let registry = Arc::new(ShapeRegistry::new());
    let anchor = Shape::square(0.0, 0.0, 1.0, Color::BLACK);
    registry.add(&anchor);

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for shape in squares(200) {
                    registry.add(&shape);
                    registry.remove(&shape).unwrap();
                }
            })
        })
        .collect();
    for _ in 0..200 {
        let ids = registry.ids();
        assert_eq!(ids.first(), Some(&anchor.id()));
    }
    for w in writers {
        w.join().unwrap();
    }
    assert_eq!(registry.ids(), vec![anchor.id()]);
}
