use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::instrument;
use validator::Validate;

use crate::adapter::EntityAdapter;
use crate::board::{BoardState, ConfigurationSlot};
use crate::error::{BoardError, BoardResult};
use crate::layout::LayoutStore;
use crate::models::{BoardConfiguration, CreateDeal, EntityKind, Record, RecordFields, RecordId};
use crate::repository::BoardConfigurationService;

/// Result of a drop onto a column
#[derive(Debug)]
pub enum Transition {
    /// The record already had the target status; nothing was written
    Unchanged,
    /// The record was persisted with its new status
    Moved {
        record: Record,
        /// Background layout save; dropping it does not cancel the save
        layout_save: JoinHandle<()>,
    },
}

impl Transition {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Transition::Unchanged)
    }
}

type InFlightKey = (EntityKind, RecordId);

/// Marks a record as moving until dropped
struct InFlightGuard {
    in_flight: Arc<Mutex<HashSet<InFlightKey>>>,
    key: InFlightKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(&self.key);
    }
}

/// Loads boards, moves records between columns and keeps layouts saved
pub struct BoardService<C: BoardConfigurationService + 'static> {
    adapter: EntityAdapter,
    layouts: LayoutStore<C>,
    in_flight: Arc<Mutex<HashSet<InFlightKey>>>,
}

impl<C: BoardConfigurationService + 'static> Clone for BoardService<C> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
            layouts: self.layouts.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<C: BoardConfigurationService + 'static> BoardService<C> {
    pub fn new(adapter: EntityAdapter, configurations: C) -> Self {
        Self {
            adapter,
            layouts: LayoutStore::new(configurations),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn adapter(&self) -> &EntityAdapter {
        &self.adapter
    }

    /// Fetch records, contacts (deal boards only) and the saved layout
    #[instrument(skip(self), fields(entity = %kind))]
    pub async fn load_board(&self, kind: EntityKind) -> BoardResult<BoardState> {
        let entity = self.adapter.resolve_descriptor(kind);
        entity.validate_columns()?;
        let records_service = self.adapter.resolve_record_service(kind)?;
        let contacts_service = match kind {
            EntityKind::Deal => Some(self.adapter.resolve_record_service(EntityKind::Contact)?),
            _ => None,
        };

        let (records, contacts, configuration) = tokio::try_join!(
            records_service.get_all(),
            async {
                match &contacts_service {
                    Some(service) => service.get_all().await,
                    None => Ok(Vec::new()),
                }
            },
            self.layouts.find(kind),
        )
        .map_err(|source| {
            tracing::warn!(error = %source, "Failed to load board");
            BoardError::Load { kind, source }
        })?;

        tracing::info!(
            records = records.len(),
            contacts = contacts.len(),
            has_configuration = configuration.is_some(),
            "Loaded board"
        );

        Ok(BoardState {
            entity,
            records,
            contacts,
            configuration: ConfigurationSlot::new(configuration),
        })
    }

    /// Move a record to `target_status` and persist it.
    ///
    /// Local state changes only after the record service confirms the write.
    /// A successful move also schedules a layout save whose failure is only
    /// logged.
    #[instrument(skip(self, state), fields(entity = %state.kind()))]
    pub async fn apply_transition(
        &self,
        state: &mut BoardState,
        record_id: RecordId,
        target_status: &str,
    ) -> BoardResult<Transition> {
        let kind = state.kind();
        let status_field = self.adapter.resolve_status_field(kind);

        let Some(record) = state.record(record_id) else {
            tracing::error!(record_id, "Dragged record is not on the board");
            return Err(BoardError::RecordNotFound(record_id));
        };

        if record.str_field(status_field) == Some(target_status) {
            tracing::debug!(record_id, target_status, "Record already in target column");
            return Ok(Transition::Unchanged);
        }

        if state.entity.column(target_status).is_none() {
            tracing::warn!(record_id, target_status, "Target status matches no column");
        }

        let updated = record.with_field(status_field, target_status);
        let service = self.adapter.resolve_record_service(kind)?;
        let _guard = self.begin_transition(kind, record_id)?;

        if let Err(source) = service.update(record_id, updated.clone()).await {
            tracing::warn!(record_id, target_status, error = %source, "Failed to move record");
            return Err(BoardError::Transition {
                record_id,
                target_status: target_status.to_string(),
                source,
            });
        }

        state.replace(updated.clone());
        let layout_save = self
            .layouts
            .spawn_save(state.configuration.clone(), state.entity.clone());

        tracing::info!(record_id, target_status, "Moved record");
        Ok(Transition::Moved {
            record: updated,
            layout_save,
        })
    }

    /// Save the board's column layout and report the outcome
    #[instrument(skip(self, state), fields(entity = %state.kind()))]
    pub async fn save_board_configuration(
        &self,
        state: &BoardState,
    ) -> BoardResult<BoardConfiguration> {
        state.entity.validate_columns()?;
        self.layouts
            .save(&state.configuration, &state.entity)
            .await
            .map_err(BoardError::Configuration)
    }

    /// Create a record and put it at the top of the board.
    ///
    /// A missing status is filled with the first column.
    #[instrument(skip_all, fields(entity = %state.kind()))]
    pub async fn add_record(
        &self,
        state: &mut BoardState,
        mut fields: RecordFields,
    ) -> BoardResult<Record> {
        let kind = state.kind();
        let status_field = self.adapter.resolve_status_field(kind);

        let has_status = fields.get(status_field).is_some_and(Value::is_string);
        if !has_status {
            let Some(first) = state.entity.columns.first() else {
                return Err(BoardError::Validation(format!("{kind} board has no columns")));
            };
            fields.insert(status_field.to_string(), Value::from(first.id.clone()));
        }

        let service = self.adapter.resolve_record_service(kind)?;
        let record = service
            .create(fields)
            .await
            .map_err(|source| BoardError::Create { kind, source })?;

        tracing::info!(record_id = record.id, "Added record to board");
        state.records.insert(0, record.clone());
        Ok(record)
    }

    /// Validate and add a deal to a deal board
    pub async fn add_deal(&self, state: &mut BoardState, input: CreateDeal) -> BoardResult<Record> {
        if state.kind() != EntityKind::Deal {
            return Err(BoardError::Validation(format!(
                "cannot add a deal to a {} board",
                state.kind()
            )));
        }
        input.validate()?;

        self.add_record(state, input.into_fields()).await
    }

    fn begin_transition(&self, kind: EntityKind, record_id: RecordId) -> BoardResult<InFlightGuard> {
        let key = (kind, record_id);
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(key) {
            tracing::warn!(record_id, "Rejected move while previous move is pending");
            return Err(BoardError::TransitionInFlight(record_id));
        }

        Ok(InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            key,
        })
    }
}
