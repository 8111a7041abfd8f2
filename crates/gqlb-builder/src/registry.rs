//! Build-scoped element registry
//!
//! Accumulates the deltas returned by the evaluator, keyed by canonical id in
//! registration order. Write-once: a second write to an id is a collision.

use crate::error::BuilderError;
use crate::evaluator::{ElementData, RegisteredElement, RegistryDelta};
use gqlb_core::{CanonicalId, ElementKind};
use indexmap::IndexMap;

#[derive(Debug, Default)]
pub struct Registry {
    elements: IndexMap<CanonicalId, ElementData>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    pub fn apply(&mut self, delta: RegistryDelta) -> Result<(), BuilderError> {
        for RegisteredElement { id, data } in delta {
            if self.elements.contains_key(&id) {
                return Err(BuilderError::ExportNameCollision(format!(
                    "Element {} registered twice",
                    id
                )));
            }
            tracing::debug!("Registered {} {}", data.kind(), id);
            self.elements.insert(id, data);
        }
        Ok(())
    }

    pub fn get(&self, id: &CanonicalId) -> Option<&ElementData> {
        self.elements.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CanonicalId, &ElementData)> {
        self.elements.iter()
    }

    pub fn count(&self, kind: ElementKind) -> usize {
        self.elements.values().filter(|d| d.kind() == kind).count()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
