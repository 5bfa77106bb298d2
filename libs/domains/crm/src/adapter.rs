use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{BoardError, BoardResult};
use crate::models::{ColumnDescriptor, EntityDescriptor, EntityKind};
use crate::repository::RecordService;

/// Maps entity kinds to their status field, columns and record service.
///
/// Record services are injected by the caller; the adapter never builds
/// connections itself.
#[derive(Clone, Default)]
pub struct EntityAdapter {
    services: HashMap<EntityKind, Arc<dyn RecordService>>,
}

impl EntityAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the record service backing `kind`
    pub fn with_service(mut self, kind: EntityKind, service: Arc<dyn RecordService>) -> Self {
        self.services.insert(kind, service);
        self
    }

    pub fn resolve_status_field(&self, kind: EntityKind) -> &'static str {
        kind.status_field()
    }

    pub fn resolve_columns(&self, kind: EntityKind) -> Vec<ColumnDescriptor> {
        kind.columns()
    }

    pub fn resolve_descriptor(&self, kind: EntityKind) -> EntityDescriptor {
        kind.descriptor()
    }

    pub fn resolve_record_service(&self, kind: EntityKind) -> BoardResult<Arc<dyn RecordService>> {
        self.services
            .get(&kind)
            .cloned()
            .ok_or_else(|| BoardError::UnsupportedEntityKind(kind.to_string()))
    }

    /// Same as [`resolve_descriptor`](Self::resolve_descriptor) for a raw key
    pub fn resolve_key(&self, key: &str) -> BoardResult<EntityDescriptor> {
        EntityKind::parse(key).map(|kind| self.resolve_descriptor(kind))
    }

    pub fn supports(&self, kind: EntityKind) -> bool {
        self.services.contains_key(&kind)
    }
}

impl std::fmt::Debug for EntityAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityAdapter")
            .field("kinds", &self.services.keys().collect::<Vec<_>>())
            .finish()
    }
}
