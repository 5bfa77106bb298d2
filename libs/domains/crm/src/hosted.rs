//! Record and board configuration services backed by the hosted platform.
//!
//! Every table speaks the same envelope:
//!
//! ```text
//! { "success": bool, "message": "...", "data": ..., "results": [
//!     { "success": bool, "data": {...}, "message": "...",
//!       "errors": [{ "fieldLabel": "...", "message": "..." }] } ] }
//! ```

use async_trait::async_trait;
use core_config::backend::HostedBackendConfig;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::{RecordError, RecordResult};
use crate::models::{BoardConfiguration, EntityKind, ForeignKey, ID_FIELD, Record, RecordFields, RecordId};
use crate::repository::{BoardConfigurationService, RecordService};

/// Table holding saved board layouts
pub const BOARD_CONFIGURATION_TABLE: &str = "kanban_view";

const PROJECT_HEADER: &str = "x-project-id";
const PUBLIC_KEY_HEADER: &str = "x-public-key";

/// Build the `fields` selector sent with read requests
pub fn field_list<S: AsRef<str>>(fields: &[S]) -> Value {
    let fields: Vec<Value> = fields
        .iter()
        .map(|name| json!({ "field": { "Name": name.as_ref() } }))
        .collect();
    json!({ "fields": fields })
}

/// Fields read for each kind's cards and forms
pub fn default_fields(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Task => &[
            "Name", "title", "description", "status", "priority", "dueDate", "relatedTo", "Tags",
            "Owner",
        ],
        EntityKind::Deal => &[
            "Name", "title", "contactId", "value", "probability", "stage", "status",
            "expectedClose", "Tags", "Owner",
        ],
        EntityKind::Contact => &["Name", "email", "phone", "company", "status", "Tags", "Owner"],
    }
}

/// Replace expanded references with bare ids before writing
pub fn to_write_shape(fields: RecordFields) -> RecordFields {
    fields
        .into_iter()
        .filter(|(name, _)| name != ID_FIELD)
        .map(|(name, value)| {
            let value = match ForeignKey::from_value(&value) {
                Some(reference) if value.is_object() => reference.to_value(),
                _ => value,
            };
            (name, value)
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    #[serde(default)]
    pub field_label: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordOutcome {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<FieldError>,
}

impl RecordOutcome {
    fn describe(&self) -> String {
        let mut parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field_label, e.message))
            .collect();
        if let Some(message) = &self.message {
            parts.push(message.clone());
        }
        if parts.is_empty() {
            parts.push("record rejected".to_string());
        }
        parts.join("; ")
    }
}

/// Response wrapper returned by every hosted call
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub results: Option<Vec<RecordOutcome>>,
}

impl Envelope {
    fn ensure_success(&self) -> RecordResult<()> {
        if self.success {
            Ok(())
        } else {
            Err(RecordError::Rejected(
                self.message.clone().unwrap_or_else(|| "request failed".to_string()),
            ))
        }
    }

    /// Decode `data`; a missing or null payload decodes as `T`'s null form
    pub fn into_data<T: DeserializeOwned>(self) -> RecordResult<T> {
        self.ensure_success()?;
        Ok(serde_json::from_value(self.data.unwrap_or(Value::Null))?)
    }

    /// Decode the first successful per-record result.
    ///
    /// Failed results are logged; the call fails only if none succeeded.
    pub fn into_first_result<T: DeserializeOwned>(self) -> RecordResult<T> {
        self.ensure_success()?;
        let results = self.results.unwrap_or_default();

        let (succeeded, failed): (Vec<_>, Vec<_>) = results.into_iter().partition(|r| r.success);
        for outcome in &failed {
            tracing::warn!(reason = %outcome.describe(), "Record write failed");
        }

        if let Some(data) = succeeded.into_iter().find_map(|r| r.data) {
            return Ok(serde_json::from_value(data)?);
        }

        let reasons: Vec<String> = failed.iter().map(RecordOutcome::describe).collect();
        if reasons.is_empty() {
            return Err(RecordError::Rejected("no record returned".to_string()));
        }
        Err(RecordError::Rejected(reasons.join("; ")))
    }

    /// Whether at least one record was deleted
    pub fn into_deleted(self) -> RecordResult<bool> {
        self.ensure_success()?;
        let results = self.results.unwrap_or_default();
        for outcome in results.iter().filter(|r| !r.success) {
            tracing::warn!(reason = %outcome.describe(), "Record delete failed");
        }
        Ok(results.iter().any(|r| r.success))
    }
}

/// Connection to the hosted platform, shared by all table services
#[derive(Debug, Clone)]
pub struct HostedClient {
    http: Client,
    base_url: String,
    project_id: String,
    public_key: String,
}

impl HostedClient {
    /// Build a client whose every request is bounded by the configured timeout
    pub fn new(config: &HostedBackendConfig) -> RecordResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            public_key: config.public_key.clone(),
        })
    }

    pub fn url(&self, table: &str, action: &str) -> String {
        format!("{}/tables/{}/records/{}", self.base_url, table, action)
    }

    async fn call(&self, table: &str, action: &str, body: Value) -> RecordResult<Envelope> {
        tracing::debug!(table, action, "Calling hosted backend");

        let response = self
            .http
            .post(self.url(table, action))
            .header(PROJECT_HEADER, &self.project_id)
            .header(PUBLIC_KEY_HEADER, &self.public_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RecordError::Transport(format!("HTTP {status}: {text}")));
        }

        Ok(response.json::<Envelope>().await?)
    }
}

/// Record service for one hosted table
#[derive(Debug, Clone)]
pub struct HostedRecordService {
    client: HostedClient,
    table: String,
    fields: Vec<String>,
}

impl HostedRecordService {
    pub fn new(client: HostedClient, table: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            client,
            table: table.into(),
            fields,
        }
    }

    /// Service for a kind's table with its default field list
    pub fn for_kind(client: HostedClient, kind: EntityKind) -> Self {
        let fields = default_fields(kind).iter().map(|f| f.to_string()).collect();
        Self::new(client, kind.table_name(), fields)
    }
}

#[async_trait]
impl RecordService for HostedRecordService {
    async fn get_all(&self) -> RecordResult<Vec<Record>> {
        let envelope = self
            .client
            .call(&self.table, "fetch", field_list(&self.fields))
            .await?;
        let records: Option<Vec<Record>> = envelope.into_data()?;
        Ok(records.unwrap_or_default())
    }

    async fn get_by_id(&self, id: RecordId) -> RecordResult<Record> {
        let mut body = field_list(&self.fields);
        body[ID_FIELD] = Value::from(id);

        let envelope = self.client.call(&self.table, "get", body).await?;
        let record: Option<Record> = envelope.into_data()?;
        record.ok_or_else(|| RecordError::NotFound {
            table: self.table.clone(),
            id,
        })
    }

    async fn create(&self, fields: RecordFields) -> RecordResult<Record> {
        let body = json!({ "records": [to_write_shape(fields)] });
        self.client
            .call(&self.table, "create", body)
            .await?
            .into_first_result()
    }

    async fn update(&self, id: RecordId, record: Record) -> RecordResult<Record> {
        let mut payload = to_write_shape(record.fields);
        payload.insert(ID_FIELD.to_string(), Value::from(id));

        let body = json!({ "records": [payload] });
        self.client
            .call(&self.table, "update", body)
            .await?
            .into_first_result()
    }

    async fn delete(&self, id: RecordId) -> RecordResult<bool> {
        let body = json!({ "RecordIds": [id] });
        self.client
            .call(&self.table, "delete", body)
            .await?
            .into_deleted()
    }
}

/// Decode configuration rows, skipping any that do not parse
fn decode_configurations(rows: Vec<Value>) -> Vec<BoardConfiguration> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(config) => Some(config),
            Err(err) => {
                tracing::warn!(error = %err, "Skipping unreadable board configuration");
                None
            }
        })
        .collect()
}

/// Board configuration service over the `kanban_view` table
#[derive(Debug, Clone)]
pub struct HostedBoardConfigurationService {
    client: HostedClient,
}

impl HostedBoardConfigurationService {
    const FIELDS: [&'static str; 4] = ["Name", "entity", "columnField", "uiPreferences"];

    pub fn new(client: HostedClient) -> Self {
        Self { client }
    }

    fn payload(config: &BoardConfiguration) -> Value {
        json!({
            "Name": config.name,
            "entity": config.entity_key,
            "columnField": config.status_field_name,
            "uiPreferences": config.serialized_column_layout,
        })
    }
}

#[async_trait]
impl BoardConfigurationService for HostedBoardConfigurationService {
    async fn get_all(&self) -> RecordResult<Vec<BoardConfiguration>> {
        let envelope = self
            .client
            .call(BOARD_CONFIGURATION_TABLE, "fetch", field_list(&Self::FIELDS))
            .await?;
        let rows: Option<Vec<Value>> = envelope.into_data()?;
        Ok(decode_configurations(rows.unwrap_or_default()))
    }

    async fn create(&self, config: BoardConfiguration) -> RecordResult<BoardConfiguration> {
        let body = json!({ "records": [Self::payload(&config)] });
        self.client
            .call(BOARD_CONFIGURATION_TABLE, "create", body)
            .await?
            .into_first_result()
    }

    async fn update(
        &self,
        id: RecordId,
        config: BoardConfiguration,
    ) -> RecordResult<BoardConfiguration> {
        let mut payload = Self::payload(&config);
        payload[ID_FIELD] = Value::from(id);

        let body = json!({ "records": [payload] });
        self.client
            .call(BOARD_CONFIGURATION_TABLE, "update", body)
            .await?
            .into_first_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn envelope(value: Value) -> Envelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_field_list_shape() {
        let body = field_list(&["Name", "stage"]);
        assert_eq!(
            body,
            json!({"fields": [{"field": {"Name": "Name"}}, {"field": {"Name": "stage"}}]})
        );
    }

    #[test]
    fn test_write_shape_flattens_references() {
        let fields: RecordFields = serde_json::from_value(json!({
            "Id": 3,
            "title": "Renewal",
            "contactId": {"Id": 8, "Name": "Ada"},
            "meta": {"source": "import"}
        }))
        .unwrap();

        let written = to_write_shape(fields);
        assert_eq!(written["contactId"], json!(8));
        assert_eq!(written["meta"], json!({"source": "import"}));
        assert!(!written.contains_key(ID_FIELD));
    }

    #[test]
    fn test_fetch_envelope_decodes_records() {
        let records: Option<Vec<Record>> = envelope(json!({
            "success": true,
            "data": [{"Id": 1, "title": "Call", "status": "pending"}]
        }))
        .into_data()
        .unwrap();

        let records = records.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].str_field("status"), Some("pending"));

        let empty: Option<Vec<Record>> = envelope(json!({"success": true})).into_data().unwrap();
        assert!(empty.is_none());
    }

    #[test]
    fn test_unsuccessful_envelope_is_rejected() {
        let result: RecordResult<Option<Vec<Record>>> =
            envelope(json!({"success": false, "message": "Invalid key"})).into_data();

        assert!(matches!(result, Err(RecordError::Rejected(ref m)) if m == "Invalid key"));
    }

    #[test]
    fn test_first_successful_result_wins() {
        let record: Record = envelope(json!({
            "success": true,
            "results": [
                {"success": false, "message": "duplicate"},
                {"success": true, "data": {"Id": 5, "stage": "qualified"}}
            ]
        }))
        .into_first_result()
        .unwrap();

        assert_eq!(record.id, 5);
    }

    #[test]
    fn test_all_results_failed() {
        let result: RecordResult<Record> = envelope(json!({
            "success": true,
            "results": [{
                "success": false,
                "errors": [{"fieldLabel": "Stage", "message": "is not a valid option"}]
            }]
        }))
        .into_first_result();

        let Err(RecordError::Rejected(message)) = result else {
            panic!("expected rejection");
        };
        assert_eq!(message, "Stage: is not a valid option");
    }

    #[test]
    fn test_delete_envelope() {
        let deleted = envelope(json!({"success": true, "results": [{"success": true}]}))
            .into_deleted()
            .unwrap();
        assert!(deleted);

        let deleted = envelope(json!({"success": true, "results": [{"success": false}]}))
            .into_deleted()
            .unwrap();
        assert!(!deleted);
    }

    #[test]
    fn test_client_url() {
        let config = HostedBackendConfig {
            base_url: "https://backend.example.com/api/".to_string(),
            project_id: "proj".to_string(),
            public_key: "key".to_string(),
            timeout: Duration::from_secs(5),
        };

        let client = HostedClient::new(&config).unwrap();
        assert_eq!(
            client.url("deal", "update"),
            "https://backend.example.com/api/tables/deal/records/update"
        );
    }

    #[test]
    fn test_malformed_configuration_rows_are_skipped() {
        let rows: Option<Vec<Value>> = envelope(json!({
            "success": true,
            "data": [
                {"Id": 1, "Name": "Task Board", "entity": "task", "columnField": "status", "uiPreferences": "{}"},
                {"Id": 2, "Name": "Scratch", "entity": null, "columnField": null},
                {"Id": "not-a-number", "entity": "deal"}
            ]
        }))
        .into_data()
        .unwrap();

        let configs = decode_configurations(rows.unwrap());
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[1].entity_key, "");

        let task = BoardConfiguration::find_for(configs, EntityKind::Task).unwrap();
        assert_eq!(task.id, Some(1));
    }

    #[test]
    fn test_create_echo_without_name_decodes() {
        let config: BoardConfiguration = envelope(json!({
            "success": true,
            "results": [{"success": true, "data": {"Id": 4}}]
        }))
        .into_first_result()
        .unwrap();

        assert_eq!(config.id, Some(4));
        assert!(config.name.is_empty());
    }

    #[test]
    fn test_configuration_payload_fields() {
        let config =
            BoardConfiguration::snapshot(&EntityKind::Task.descriptor(), chrono::Utc::now()).unwrap();
        let payload = HostedBoardConfigurationService::payload(&config);

        assert_eq!(payload["Name"], json!("Task Board"));
        assert_eq!(payload["entity"], json!("task"));
        assert_eq!(payload["columnField"], json!("status"));
        assert!(payload.get("Id").is_none());
    }
}
