//! Compositing layers
//!
//! Layers only record which annotation ids belong to them. Removing a layer
//! forgets the membership list; the writer moves the annotations themselves
//! onto the default layer.

use super::annotation::AnnotationId;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type LayerId = u32;

/// The permanent default layer
pub const DEFAULT_LAYER: LayerId = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    /// In [0,1]
    pub opacity: f32,
    pub visible: bool,
    pub objects: Vec<AnnotationId>,
}

impl Layer {
    fn new(id: LayerId, name: String) -> Self {
        Self {
            id,
            name,
            opacity: 1.0,
            visible: true,
            objects: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayerStack {
    layers: BTreeMap<LayerId, Layer>,
    active: LayerId,
    next_id: LayerId,
}

impl Default for LayerStack {
    fn default() -> Self {
        let mut layers = BTreeMap::new();
        layers.insert(DEFAULT_LAYER, Layer::new(DEFAULT_LAYER, "Default".to_string()));
        Self {
            layers,
            active: DEFAULT_LAYER,
            next_id: DEFAULT_LAYER + 1,
        }
    }
}

impl LayerStack {
    /// New layer; a blank name becomes "Layer N"
    pub fn create(&mut self, name: &str) -> LayerId {
        let id = self.next_id;
        self.next_id += 1;
        let name = if name.trim().is_empty() {
            format!("Layer {}", id)
        } else {
            name.to_string()
        };
        debug!("Created layer {} ({})", id, name);
        self.layers.insert(id, Layer::new(id, name));
        id
    }

    /// False for the default layer and unknown ids
    pub fn remove(&mut self, id: LayerId) -> bool {
        if id == DEFAULT_LAYER || self.layers.remove(&id).is_none() {
            return false;
        }
        if self.active == id {
            self.active = DEFAULT_LAYER;
        }
        true
    }

    pub fn set_active(&mut self, id: LayerId) -> bool {
        if !self.layers.contains_key(&id) {
            return false;
        }
        self.active = id;
        true
    }

    pub fn active(&self) -> LayerId {
        self.active
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.layers.get(&self.active)
    }

    pub fn set_opacity(&mut self, id: LayerId, opacity: f32) -> bool {
        match self.layers.get_mut(&id) {
            Some(layer) => {
                layer.opacity = opacity.clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }

    pub fn set_visible(&mut self, id: LayerId, visible: bool) -> bool {
        match self.layers.get_mut(&id) {
            Some(layer) => {
                layer.visible = visible;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(&id)
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.layers.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<LayerId> {
        self.layers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Record `object` as a member of `layer`; false for unknown layers
    pub fn add_object(&mut self, layer: LayerId, object: AnnotationId) -> bool {
        match self.layers.get_mut(&layer) {
            Some(layer) => {
                layer.objects.push(object);
                true
            }
            None => false,
        }
    }

    pub fn remove_object(&mut self, object: AnnotationId) {
        for layer in self.layers.values_mut() {
            layer.objects.retain(|id| *id != object);
        }
    }

    /// Empty every membership list, keeping the layer definitions
    pub fn clear_objects(&mut self) {
        for layer in self.layers.values_mut() {
            layer.objects.clear();
        }
    }

    /// Opacity applied to drawing on the active layer; zero when hidden
    pub fn active_opacity(&self) -> f32 {
        self.active_layer()
            .map(|l| if l.visible { l.opacity } else { 0.0 })
            .unwrap_or(1.0)
    }

    pub fn active_visible(&self) -> bool {
        self.active_layer().map(|l| l.visible).unwrap_or(true)
    }
}
