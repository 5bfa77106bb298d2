use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::{
    BoardConfiguration, ColumnDescriptor, EntityDescriptor, EntityKind, Record, RecordId,
};

/// Field holding the contact reference on deals
pub const CONTACT_FIELD: &str = "contactId";

/// Field summed in column totals
pub const VALUE_FIELD: &str = "value";

/// The board's saved configuration, shared with background layout saves.
///
/// Saves hold the lock across the remote call so that a create is never
/// issued twice for the same board.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationSlot(Arc<Mutex<Option<BoardConfiguration>>>);

impl ConfigurationSlot {
    pub fn new(config: Option<BoardConfiguration>) -> Self {
        Self(Arc::new(Mutex::new(config)))
    }

    /// Copy of the current configuration, if one has been loaded or saved
    pub async fn get(&self) -> Option<BoardConfiguration> {
        self.0.lock().await.clone()
    }

    pub(crate) async fn lock(&self) -> tokio::sync::MutexGuard<'_, Option<BoardConfiguration>> {
        self.0.lock().await
    }
}

/// Per-column count and total for the board header
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub column: ColumnDescriptor,
    pub count: usize,
    pub total_value: f64,
}

/// Records loaded for one entity kind, plus its saved layout
#[derive(Debug, Clone)]
pub struct BoardState {
    pub entity: EntityDescriptor,
    pub records: Vec<Record>,
    /// Loaded only for deal boards, used for contact names on cards
    pub contacts: Vec<Record>,
    pub configuration: ConfigurationSlot,
}

impl BoardState {
    pub fn new(entity: EntityDescriptor, records: Vec<Record>) -> Self {
        Self {
            entity,
            records,
            contacts: Vec::new(),
            configuration: ConfigurationSlot::default(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.entity.kind
    }

    pub fn record(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Current status of a record; `None` if the field is missing or not a string
    pub fn status_of<'a>(&self, record: &'a Record) -> Option<&'a str> {
        record.str_field(&self.entity.status_field_name)
    }

    /// Records whose status equals `column_id` exactly
    pub fn records_in<'a>(&'a self, column_id: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.records
            .iter()
            .filter(move |r| self.status_of(r) == Some(column_id))
    }

    /// Records that render in no column
    pub fn unassigned(&self) -> Vec<&Record> {
        self.records
            .iter()
            .filter(|r| match self.status_of(r) {
                Some(status) => self.entity.column(status).is_none(),
                None => true,
            })
            .collect()
    }

    pub fn summaries(&self) -> Vec<ColumnSummary> {
        self.entity
            .columns
            .iter()
            .map(|column| {
                let (count, total_value) = self
                    .records_in(&column.id)
                    .fold((0, 0.0), |(count, total), record| {
                        (count + 1, total + record.f64_field(VALUE_FIELD).unwrap_or(0.0))
                    });
                ColumnSummary {
                    column: column.clone(),
                    count,
                    total_value,
                }
            })
            .collect()
    }

    pub fn count_in(&self, column_id: &str) -> usize {
        self.records_in(column_id).count()
    }

    /// Contact name shown on a deal card
    pub fn contact_name(&self, record: &Record) -> String {
        let Some(contact) = record.foreign_key(CONTACT_FIELD) else {
            return "No contact".to_string();
        };

        self.contacts
            .iter()
            .find(|c| c.id == contact.id())
            .and_then(Record::display_name)
            .or_else(|| contact.display_name())
            .unwrap_or("Unknown Contact")
            .to_string()
    }

    /// Replace a record by id, keeping its position
    pub(crate) fn replace(&mut self, record: Record) -> bool {
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }
}
