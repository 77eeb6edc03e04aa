//! Ordered set of shapes drawn every frame

use std::sync::{Arc, Mutex, Weak};

use log::debug;

use crate::error::{CanvasError, Result};
use crate::lock;
use crate::shape::drawable::{Shape, ShapeCell, ShapeId};

struct Entry {
    id: ShapeId,
    shape: Weak<ShapeCell>,
}

/// Shapes in insertion order, later entries on top. Holds weak references:
/// a shape whose handles were all dropped is pruned on the next visit.
#[derive(Default)]
pub struct ShapeRegistry {
    entries: Mutex<Vec<Entry>>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `shape` on top. Adding the same shape twice draws it twice.
    pub fn add(&self, shape: &Shape) {
        lock(&self.entries).push(Entry {
            id: shape.id(),
            shape: shape.downgrade(),
        });
    }

    /// Remove the lowest registration of `shape`.
    pub fn remove(&self, shape: &Shape) -> Result<()> {
        let id = shape.id();
        let mut entries = lock(&self.entries);
        match entries.iter().position(|e| e.id == id) {
            Some(index) => {
                entries.remove(index);
                Ok(())
            }
            None => Err(CanvasError::NotRegistered(id)),
        }
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    pub fn contains(&self, shape: &Shape) -> bool {
        let id = shape.id();
        lock(&self.entries).iter().any(|e| e.id == id)
    }

    /// Number of registrations whose shape is still alive.
    pub fn len(&self) -> usize {
        lock(&self.entries)
            .iter()
            .filter(|e| e.shape.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<ShapeId> {
        lock(&self.entries).iter().map(|e| e.id).collect()
    }

    /// Live shapes bottom to top. The lock is held only while collecting.
    pub(crate) fn snapshot(&self) -> Vec<Arc<ShapeCell>> {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|e| e.shape.strong_count() > 0);
        if entries.len() != before {
            debug!("pruned {} dropped shapes", before - entries.len());
        }
        entries.iter().filter_map(|e| e.shape.upgrade()).collect()
    }

    /// Visit every live shape in paint order without holding the registry
    /// lock, so the visitor may lock individual shapes.
    pub(crate) fn for_each_in_order(&self, mut f: impl FnMut(&ShapeCell)) {
        for cell in self.snapshot() {
            f(&cell);
        }
    }
}
