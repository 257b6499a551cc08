//! Annotations and their undo/redo history
//!
//! The live list and both history stacks hold independent value copies.
//! Ids come from a monotonic counter and are never reused, including for
//! redone annotations.

use super::layer::{LayerId, DEFAULT_LAYER};
use super::style::{ShapeProperties, TextProperties};
use crate::geometry::{bounding_rect, Point, Rectangle};
use serde::{Deserialize, Serialize};

pub type AnnotationId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Assigned by the store; ignored on insert
    #[serde(default)]
    pub id: AnnotationId,
    /// Free-form tag such as "click", "drag", "text", "freehand"
    pub kind: String,
    #[serde(default)]
    pub points: Vec<Point>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub text_props: TextProperties,
    #[serde(default)]
    pub shape_props: ShapeProperties,
    /// Milliseconds since the writer was created
    #[serde(default)]
    pub timestamp_ms: u64,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub layer: LayerId,
}

fn default_visible() -> bool {
    true
}

impl Annotation {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            id: 0,
            kind: kind.into(),
            points: Vec::new(),
            text: String::new(),
            text_props: TextProperties::default(),
            shape_props: ShapeProperties::default(),
            timestamp_ms: 0,
            visible: true,
            layer: DEFAULT_LAYER,
        }
    }

    pub fn with_points(mut self, points: Vec<Point>) -> Self {
        self.points = points;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_shape(mut self, shape: ShapeProperties) -> Self {
        self.shape_props = shape;
        self
    }

    pub fn with_text_props(mut self, props: TextProperties) -> Self {
        self.text_props = props;
        self
    }

    pub fn bounds(&self) -> Rectangle {
        bounding_rect(&self.points)
    }
}

/// Flat annotation list with undo/redo stacks
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
    undo_stack: Vec<Annotation>,
    redo_stack: Vec<Annotation>,
    next_id: AnnotationId,
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self {
            annotations: Vec::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            next_id: 1,
        }
    }
}

impl AnnotationStore {
    fn insert(&mut self, mut annotation: Annotation, layer: LayerId, timestamp_ms: u64) -> AnnotationId {
        annotation.id = self.next_id;
        self.next_id += 1;
        annotation.layer = layer;
        annotation.timestamp_ms = timestamp_ms;
        self.undo_stack.push(annotation.clone());
        self.annotations.push(annotation);
        self.next_id - 1
    }

    /// Add as a new edit; clears redo history
    pub fn add(&mut self, annotation: Annotation, layer: LayerId, timestamp_ms: u64) -> AnnotationId {
        self.redo_stack.clear();
        self.insert(annotation, layer, timestamp_ms)
    }

    /// Remove by id; the entry also leaves the undo history
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let index = self.annotations.iter().position(|a| a.id == id)?;
        self.undo_stack.retain(|a| a.id != id);
        Some(self.annotations.remove(index))
    }

    /// Replace content, keeping id, layer and timestamp
    pub fn update(&mut self, id: AnnotationId, mut replacement: Annotation) -> bool {
        let Some(existing) = self.annotations.iter_mut().find(|a| a.id == id) else {
            return false;
        };
        replacement.id = existing.id;
        replacement.layer = existing.layer;
        replacement.timestamp_ms = existing.timestamp_ms;
        *existing = replacement.clone();
        if let Some(entry) = self.undo_stack.iter_mut().find(|a| a.id == id) {
            *entry = replacement;
        }
        true
    }

    /// Move every annotation on `from`, history included, onto `to`;
    /// returns the ids moved from the live list
    pub fn reassign_layer(&mut self, from: LayerId, to: LayerId) -> Vec<AnnotationId> {
        let mut moved = Vec::new();
        for annotation in self.annotations.iter_mut().filter(|a| a.layer == from) {
            annotation.layer = to;
            moved.push(annotation.id);
        }
        for annotation in self.undo_stack.iter_mut().chain(self.redo_stack.iter_mut()) {
            if annotation.layer == from {
                annotation.layer = to;
            }
        }
        moved
    }

    /// Pop the most recent edit off the list into redo history
    pub fn undo(&mut self) -> Option<Annotation> {
        let annotation = self.undo_stack.pop()?;
        self.annotations.retain(|a| a.id != annotation.id);
        self.redo_stack.push(annotation.clone());
        Some(annotation)
    }

    /// Re-add the most recently undone annotation under a fresh id.
    ///
    /// Remaining redo entries are kept, so N undos allow N redos.
    pub fn redo(&mut self, layer: LayerId, timestamp_ms: u64) -> Option<Annotation> {
        let annotation = self.redo_stack.pop()?;
        let id = self.insert(annotation, layer, timestamp_ms);
        self.get(id).cloned()
    }

    /// Layer an undone annotation will be redone into
    pub fn peek_redo_layer(&self) -> Option<LayerId> {
        self.redo_stack.last().map(|a| a.layer)
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.annotations.iter_mut().find(|a| a.id == id)
    }

    pub fn all(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Drop everything including history; the id counter keeps counting
    pub fn clear(&mut self) {
        self.annotations.clear();
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(x: i32) -> Annotation {
        Annotation::new("stroke").with_points(vec![Point::new(x, x), Point::new(x + 1, x + 1)])
    }

    #[test]
    fn ids_are_strictly_increasing_and_never_reused() {
        let mut store = AnnotationStore::default();
        let a = store.add(stroke(0), DEFAULT_LAYER, 0);
        let b = store.add(stroke(1), DEFAULT_LAYER, 0);
        assert!(store.remove(b).is_some());
        let c = store.add(stroke(2), DEFAULT_LAYER, 0);
        assert!(a < b && b < c);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn new_add_clears_redo_stack() {
        let mut store = AnnotationStore::default();
        store.add(stroke(0), DEFAULT_LAYER, 0);
        store.undo();
        assert!(store.can_redo());

        store.add(stroke(1), DEFAULT_LAYER, 0);
        assert!(!store.can_redo());
        assert!(store.redo(DEFAULT_LAYER, 0).is_none());
    }

    #[test]
    fn undo_then_redo_assigns_new_id() {
        let mut store = AnnotationStore::default();
        store.add(stroke(0), DEFAULT_LAYER, 0);
        let last = store.add(stroke(5), DEFAULT_LAYER, 0);

        let undone = store.undo().unwrap();
        assert_eq!(undone.id, last);
        assert!(store.get(last).is_none());

        let redone = store.redo(DEFAULT_LAYER, 10).unwrap();
        assert!(redone.id > last);
        assert_eq!(redone.points, undone.points);
        assert!(store.redo(DEFAULT_LAYER, 10).is_none());
    }

    #[test]
    fn two_undos_allow_two_redos() {
        let mut store = AnnotationStore::default();
        store.add(stroke(0), DEFAULT_LAYER, 0);
        store.add(stroke(1), DEFAULT_LAYER, 0);
        store.undo();
        store.undo();
        assert!(store.is_empty());
        assert!(store.redo(DEFAULT_LAYER, 0).is_some());
        assert!(store.redo(DEFAULT_LAYER, 0).is_some());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn history_copies_are_independent() {
        let mut store = AnnotationStore::default();
        let id = store.add(stroke(0), DEFAULT_LAYER, 0);
        store.get_mut(id).unwrap().points.clear();

        let undone = store.undo().unwrap();
        assert_eq!(undone.points.len(), 2);
    }

    #[test]
    fn update_keeps_identity() {
        let mut store = AnnotationStore::default();
        let id = store.add(stroke(0), 3, 42);
        assert!(store.update(id, Annotation::new("text").with_text("hi")));
        let updated = store.get(id).unwrap();
        assert_eq!((updated.id, updated.layer, updated.timestamp_ms), (id, 3, 42));
        assert_eq!(updated.text, "hi");
        assert!(!store.update(999, Annotation::new("x")));
    }
}
