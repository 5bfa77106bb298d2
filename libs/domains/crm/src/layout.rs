use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::board::ConfigurationSlot;
use crate::error::RecordResult;
use crate::models::{BoardConfiguration, EntityDescriptor, EntityKind, RecordId};
use crate::repository::BoardConfigurationService;

/// Reads and writes the saved column layout of each board
pub struct LayoutStore<C: BoardConfigurationService> {
    service: Arc<C>,
}

impl<C: BoardConfigurationService> Clone for LayoutStore<C> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl<C: BoardConfigurationService + 'static> LayoutStore<C> {
    pub fn new(service: C) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// Saved configuration for `kind`; filtering happens client-side
    pub async fn find(&self, kind: EntityKind) -> RecordResult<Option<BoardConfiguration>> {
        let configs = self.service.get_all().await?;
        Ok(BoardConfiguration::find_for(configs, kind))
    }

    /// Write a fresh snapshot of the board's columns.
    ///
    /// Updates the configuration held in `slot` when it has an id, otherwise
    /// creates one and stores the result back in the slot.
    pub async fn save(
        &self,
        slot: &ConfigurationSlot,
        descriptor: &EntityDescriptor,
    ) -> RecordResult<BoardConfiguration> {
        let mut current = slot.lock().await;
        let snapshot = BoardConfiguration::snapshot(descriptor, Utc::now())?;

        let existing_id = current.as_ref().and_then(|c| c.id);
        let mut saved = match existing_id {
            Some(id) => self.service.update(id, snapshot).await?,
            None => self.service.create(snapshot).await?,
        };
        if saved.id.is_none() {
            saved.id = match existing_id {
                Some(id) => Some(id),
                None => self.created_id(descriptor.kind).await,
            };
        }

        tracing::debug!(
            entity = %descriptor.kind,
            config_id = ?saved.id,
            created = existing_id.is_none(),
            "Saved board configuration"
        );
        *current = Some(saved.clone());
        Ok(saved)
    }

    /// Look up the id of a configuration whose create response omitted it
    async fn created_id(&self, kind: EntityKind) -> Option<RecordId> {
        match self.find(kind).await {
            Ok(found) => found.and_then(|c| c.id),
            Err(err) => {
                tracing::warn!(entity = %kind, error = %err, "Failed to look up created board configuration");
                None
            }
        }
    }

    /// Save without reporting failure to the caller
    pub async fn save_best_effort(&self, slot: &ConfigurationSlot, descriptor: &EntityDescriptor) {
        if let Err(err) = self.save(slot, descriptor).await {
            tracing::warn!(entity = %descriptor.kind, error = %err, "Failed to save board configuration");
        }
    }

    /// Fire-and-forget save on the runtime; awaiting the handle is optional
    pub fn spawn_save(&self, slot: ConfigurationSlot, descriptor: EntityDescriptor) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move { store.save_best_effort(&slot, &descriptor).await })
    }
}
