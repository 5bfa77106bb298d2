use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{RecordError, RecordResult};
use crate::models::{BoardConfiguration, Record, RecordFields, RecordId};

/// CRUD access to one table of the record store
///
/// Implementations can talk to the hosted backend or keep records in memory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordService: Send + Sync {
    /// Fetch every record in the table (no pagination)
    async fn get_all(&self) -> RecordResult<Vec<Record>>;

    async fn get_by_id(&self, id: RecordId) -> RecordResult<Record>;

    async fn create(&self, fields: RecordFields) -> RecordResult<Record>;

    /// Write `record` under `id`, returning the stored record
    async fn update(&self, id: RecordId, record: Record) -> RecordResult<Record>;

    async fn delete(&self, id: RecordId) -> RecordResult<bool>;
}

/// Storage for saved board layouts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BoardConfigurationService: Send + Sync {
    async fn get_all(&self) -> RecordResult<Vec<BoardConfiguration>>;

    async fn create(&self, config: BoardConfiguration) -> RecordResult<BoardConfiguration>;

    async fn update(
        &self,
        id: RecordId,
        config: BoardConfiguration,
    ) -> RecordResult<BoardConfiguration>;
}

/// In-memory record table (for development/testing)
#[derive(Debug, Clone)]
pub struct InMemoryRecordService {
    table: String,
    records: Arc<RwLock<Vec<Record>>>,
}

impl InMemoryRecordService {
    pub fn new(table: impl Into<String>) -> Self {
        Self::with_records(table, Vec::new())
    }

    pub fn with_records(table: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            table: table.into(),
            records: Arc::new(RwLock::new(records)),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn not_found(&self, id: RecordId) -> RecordError {
        RecordError::NotFound {
            table: self.table.clone(),
            id,
        }
    }
}

#[async_trait]
impl RecordService for InMemoryRecordService {
    async fn get_all(&self) -> RecordResult<Vec<Record>> {
        Ok(self.records.read().await.clone())
    }

    async fn get_by_id(&self, id: RecordId) -> RecordResult<Record> {
        let records = self.records.read().await;
        records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| self.not_found(id))
    }

    async fn create(&self, mut fields: RecordFields) -> RecordResult<Record> {
        let mut records = self.records.write().await;

        let id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        fields.insert(
            "createdAt".to_string(),
            Value::from(Utc::now().to_rfc3339()),
        );
        let record = Record::new(id, fields);
        records.push(record.clone());

        tracing::info!(table = %self.table, record_id = id, "Created record");
        Ok(record)
    }

    async fn update(&self, id: RecordId, record: Record) -> RecordResult<Record> {
        let mut records = self.records.write().await;

        let Some(stored) = records.iter_mut().find(|r| r.id == id) else {
            return Err(self.not_found(id));
        };
        stored.merge(record.fields);

        tracing::info!(table = %self.table, record_id = id, "Updated record");
        Ok(stored.clone())
    }

    async fn delete(&self, id: RecordId) -> RecordResult<bool> {
        let mut records = self.records.write().await;

        let Some(index) = records.iter().position(|r| r.id == id) else {
            return Err(self.not_found(id));
        };
        records.remove(index);

        tracing::info!(table = %self.table, record_id = id, "Deleted record");
        Ok(true)
    }
}

/// In-memory board configuration store (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryBoardConfigurationService {
    configs: Arc<RwLock<Vec<BoardConfiguration>>>,
}

impl InMemoryBoardConfigurationService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BoardConfigurationService for InMemoryBoardConfigurationService {
    async fn get_all(&self) -> RecordResult<Vec<BoardConfiguration>> {
        Ok(self.configs.read().await.clone())
    }

    async fn create(&self, mut config: BoardConfiguration) -> RecordResult<BoardConfiguration> {
        let mut configs = self.configs.write().await;

        let id = configs.iter().filter_map(|c| c.id).max().unwrap_or(0) + 1;
        config.id = Some(id);
        configs.push(config.clone());

        tracing::info!(config_id = id, entity = %config.entity_key, "Created board configuration");
        Ok(config)
    }

    async fn update(
        &self,
        id: RecordId,
        mut config: BoardConfiguration,
    ) -> RecordResult<BoardConfiguration> {
        let mut configs = self.configs.write().await;

        let Some(stored) = configs.iter_mut().find(|c| c.id == Some(id)) else {
            return Err(RecordError::NotFound {
                table: "kanban_view".to_string(),
                id,
            });
        };
        config.id = Some(id);
        *stored = config.clone();

        tracing::debug!(config_id = id, entity = %config.entity_key, "Updated board configuration");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> RecordFields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_next_id() {
        let service = InMemoryRecordService::with_records(
            "task",
            vec![Record::new(7, fields(json!({"title": "existing"})))],
        );

        let created = service
            .create(fields(json!({"title": "new", "status": "pending"})))
            .await
            .unwrap();

        assert_eq!(created.id, 8);
        assert!(created.get("createdAt").is_some());
        assert_eq!(service.get_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let service = InMemoryRecordService::with_records(
            "deal",
            vec![Record::new(1, fields(json!({"title": "Renewal", "stage": "lead"})))],
        );

        let patch = Record::new(1, fields(json!({"stage": "qualified"})));
        let updated = service.update(1, patch).await.unwrap();

        assert_eq!(updated.str_field("stage"), Some("qualified"));
        assert_eq!(updated.str_field("title"), Some("Renewal"));
    }

    #[tokio::test]
    async fn test_missing_record_errors() {
        let service = InMemoryRecordService::new("task");

        let result = service.get_by_id(3).await;
        assert!(matches!(result, Err(RecordError::NotFound { id: 3, .. })));

        let result = service.update(3, Record::new(3, RecordFields::new())).await;
        assert!(matches!(result, Err(RecordError::NotFound { .. })));

        let result = service.delete(3).await;
        assert!(matches!(result, Err(RecordError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_configuration_create_then_update() {
        let service = InMemoryBoardConfigurationService::new();
        let descriptor = crate::models::EntityKind::Task.descriptor();
        let config = BoardConfiguration::snapshot(&descriptor, Utc::now()).unwrap();

        let created = service.create(config.clone()).await.unwrap();
        assert_eq!(created.id, Some(1));

        let updated = service.update(1, config).await.unwrap();
        assert_eq!(updated.id, Some(1));
        assert_eq!(service.get_all().await.unwrap().len(), 1);
    }
}
