//! Durable persistence for the shape list.
//!
//! The backend is host-provided: a flat get/set-by-key string store (local
//! storage in the browser shell, a file or table elsewhere). The whole shape
//! list is written as one JSON document under a single fixed key on every
//! committed mutation; anything unreadable on load degrades to an empty
//! list so a corrupt value can never break startup.

use crate::annotate::shape::Shape;
use crate::Result;
use std::collections::HashMap;

/// Fixed key the shape list persists under.
pub const SHAPES_STORAGE_KEY: &str = "map_shapes";

/// Host-provided durable key-value storage.
pub trait ShapeStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-memory store, used in tests and by hosts without persistence.
#[derive(Debug, Default)]
pub struct MemoryShapeStore {
    values: HashMap<String, String>,
}

impl MemoryShapeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShapeStore for MemoryShapeStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Load the persisted shape list. Missing or malformed content is an empty
/// list, never an error.
pub fn load_shapes(store: &dyn ShapeStore) -> Vec<Shape> {
    let Some(raw) = store.get(SHAPES_STORAGE_KEY) else {
        return Vec::new();
    };

    match serde_json::from_str(&raw) {
        Ok(shapes) => shapes,
        Err(e) => {
            log::warn!("ignoring malformed persisted shapes: {}", e);
            Vec::new()
        }
    }
}

/// Persist the whole shape list under the fixed key.
pub fn save_shapes(store: &mut dyn ShapeStore, shapes: &[Shape]) -> Result<()> {
    let raw = serde_json::to_string(shapes)?;
    store.set(SHAPES_STORAGE_KEY, &raw)
}

/// Pretty-printed JSON export of a shape list (the "download shapes"
/// action).
pub fn shapes_json(shapes: &[Shape]) -> Result<String> {
    Ok(serde_json::to_string_pretty(shapes)?)
}
