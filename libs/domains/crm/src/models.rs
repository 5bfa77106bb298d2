use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString};
use validator::Validate;

use crate::error::{BoardError, BoardResult, RecordError};

/// Identifier assigned to a record by the record store
pub type RecordId = i64;

/// Flat field-name/value mapping as transported by the record store
pub type RecordFields = Map<String, Value>;

/// Name of the identifier field carried by every record
pub const ID_FIELD: &str = "Id";

/// Entity kinds that can be shown on a board
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
    Task,
    Deal,
    #[serde(alias = "app_contact")]
    #[strum(to_string = "contact", serialize = "app_contact")]
    Contact,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Task, EntityKind::Deal, EntityKind::Contact];

    /// Resolve a kind from its key, e.g. `"deal"`
    pub fn parse(key: &str) -> BoardResult<Self> {
        Self::from_str(key).map_err(|_| BoardError::UnsupportedEntityKind(key.to_string()))
    }

    /// Field holding the record's column
    pub fn status_field(self) -> &'static str {
        match self {
            EntityKind::Task | EntityKind::Contact => "status",
            EntityKind::Deal => "stage",
        }
    }

    /// Backing table in the record store
    pub fn table_name(self) -> &'static str {
        match self {
            EntityKind::Task => "task",
            EntityKind::Deal => "deal",
            EntityKind::Contact => "app_contact",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Task => "Task",
            EntityKind::Deal => "Deal",
            EntityKind::Contact => "Contact",
        }
    }

    /// Fixed, ordered column set for this kind
    pub fn columns(self) -> Vec<ColumnDescriptor> {
        match self {
            EntityKind::Task => vec![
                ColumnDescriptor::new("pending", "Pending", "gray-400"),
                ColumnDescriptor::new("in-progress", "In Progress", "yellow-400"),
                ColumnDescriptor::new("completed", "Completed", "green-400"),
            ],
            EntityKind::Deal => vec![
                ColumnDescriptor::new("lead", "Lead", "gray-400"),
                ColumnDescriptor::new("qualified", "Qualified", "blue-400"),
                ColumnDescriptor::new("proposal", "Proposal", "yellow-400"),
                ColumnDescriptor::new("negotiation", "Negotiation", "orange-400"),
                ColumnDescriptor::new("closed", "Closed", "green-400"),
            ],
            EntityKind::Contact => vec![
                ColumnDescriptor::new("active", "Active", "green-400"),
                ColumnDescriptor::new("inactive", "Inactive", "gray-400"),
            ],
        }
    }

    pub fn descriptor(self) -> EntityDescriptor {
        EntityDescriptor {
            kind: self,
            status_field_name: self.status_field().to_string(),
            columns: self.columns(),
        }
    }
}

/// A column on the board; `id` is the status value records carry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ColumnDescriptor {
    #[validate(length(min = 1))]
    pub id: String,
    #[serde(rename = "title")]
    pub label: String,
    #[serde(rename = "color")]
    pub color_tag: String,
}

impl ColumnDescriptor {
    pub fn new(id: &str, label: &str, color_tag: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            color_tag: color_tag.to_string(),
        }
    }
}

/// Everything the board needs to know about one entity kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub kind: EntityKind,
    pub status_field_name: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl EntityDescriptor {
    pub fn column(&self, id: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Check that column ids are non-empty and unique
    pub fn validate_columns(&self) -> BoardResult<()> {
        let mut seen = HashSet::new();
        for column in &self.columns {
            column.validate()?;
            if !seen.insert(column.id.as_str()) {
                return Err(BoardError::Validation(format!(
                    "duplicate column id '{}' on {} board",
                    column.id, self.kind
                )));
            }
        }
        Ok(())
    }
}

/// A flat record as stored by the record service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "Id")]
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: RecordFields,
}

impl Record {
    pub fn new(id: RecordId, mut fields: RecordFields) -> Self {
        fields.remove(ID_FIELD);
        Self { id, fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn f64_field(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(Value::as_f64)
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        if field != ID_FIELD {
            self.fields.insert(field.to_string(), value.into());
        }
    }

    /// Copy of this record with one field replaced
    pub fn with_field(&self, field: &str, value: impl Into<Value>) -> Self {
        let mut updated = self.clone();
        updated.set(field, value);
        updated
    }

    /// Shallow merge: provided fields overwrite, everything else is kept
    pub fn merge(&mut self, patch: RecordFields) {
        for (field, value) in patch {
            if field != ID_FIELD {
                self.fields.insert(field, value);
            }
        }
    }

    pub fn foreign_key(&self, field: &str) -> Option<ForeignKey> {
        self.fields.get(field).and_then(ForeignKey::from_value)
    }

    /// `Name` for contacts, `title` for tasks and deals
    pub fn display_name(&self) -> Option<&str> {
        self.str_field("Name").or_else(|| self.str_field("title"))
    }
}

/// A reference to another record.
///
/// Writes always send the bare id; reads may return the expanded form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForeignKey {
    Bare(RecordId),
    Expanded { id: RecordId, display_name: String },
}

impl ForeignKey {
    /// Normalize either wire shape. Numeric strings are accepted as bare ids.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(ForeignKey::Bare),
            Value::String(s) => s.trim().parse().ok().map(ForeignKey::Bare),
            Value::Object(map) => {
                let id = map
                    .get(ID_FIELD)
                    .or_else(|| map.get("id"))
                    .and_then(ForeignKey::from_value)?
                    .id();
                let display_name = map
                    .get("Name")
                    .or_else(|| map.get("name"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Some(ForeignKey::Expanded { id, display_name })
            }
            _ => None,
        }
    }

    pub fn id(&self) -> RecordId {
        match self {
            ForeignKey::Bare(id) | ForeignKey::Expanded { id, .. } => *id,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            ForeignKey::Bare(_) => None,
            ForeignKey::Expanded { display_name, .. } if display_name.is_empty() => None,
            ForeignKey::Expanded { display_name, .. } => Some(display_name),
        }
    }

    /// Value to send on the write path
    pub fn to_value(&self) -> Value {
        Value::from(self.id())
    }
}

/// Column layout snapshot stored inside a board configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub columns: Vec<ColumnDescriptor>,
    #[serde(rename = "lastModified")]
    pub last_modified: DateTime<Utc>,
}

/// Missing and null text fields both read as empty
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Persisted board layout for one entity kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfiguration {
    #[serde(rename = "Id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(rename = "Name", default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(rename = "entity", default, deserialize_with = "null_as_empty")]
    pub entity_key: String,
    #[serde(rename = "columnField", default, deserialize_with = "null_as_empty")]
    pub status_field_name: String,
    #[serde(rename = "uiPreferences", default, deserialize_with = "null_as_empty")]
    pub serialized_column_layout: String,
    #[serde(rename = "lastModified", default = "Utc::now")]
    pub last_modified: DateTime<Utc>,
}

impl BoardConfiguration {
    /// Snapshot the descriptor's columns into an unsaved configuration
    pub fn snapshot(descriptor: &EntityDescriptor, now: DateTime<Utc>) -> Result<Self, RecordError> {
        let layout = ColumnLayout {
            columns: descriptor.columns.clone(),
            last_modified: now,
        };

        Ok(Self {
            id: None,
            name: format!("{} Board", descriptor.kind.label()),
            entity_key: descriptor.kind.to_string(),
            status_field_name: descriptor.status_field_name.clone(),
            serialized_column_layout: serde_json::to_string(&layout)?,
            last_modified: now,
        })
    }

    pub fn is_for(&self, kind: EntityKind) -> bool {
        EntityKind::parse(&self.entity_key).is_ok_and(|k| k == kind)
    }

    /// First configuration in list order that belongs to `kind`
    pub fn find_for(configs: Vec<Self>, kind: EntityKind) -> Option<Self> {
        let mut matches = configs.into_iter().filter(|c| c.is_for(kind));
        let first = matches.next();
        let extra = matches.count();
        if extra > 0 {
            tracing::warn!(entity = %kind, extra, "Multiple board configurations for one kind, using the first");
        }
        first
    }
}

fn default_deal_stage() -> String {
    "lead".to_string()
}

fn default_deal_status() -> String {
    "New".to_string()
}

fn default_probability() -> u8 {
    50
}

fn validate_not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}

/// DTO for adding a deal from the board
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeal {
    #[validate(length(min = 1, max = 255), custom(function = "validate_not_blank"))]
    pub title: String,
    #[validate(range(min = 1))]
    pub contact_id: RecordId,
    #[validate(range(exclusive_min = 0.0))]
    pub value: f64,
    #[serde(default = "default_probability")]
    #[validate(range(max = 100))]
    pub probability: u8,
    #[serde(default = "default_deal_stage")]
    #[validate(length(min = 1))]
    pub stage: String,
    #[serde(default = "default_deal_status")]
    pub status: String,
    pub expected_close: NaiveDate,
}

impl CreateDeal {
    pub fn into_fields(self) -> RecordFields {
        let mut fields = RecordFields::new();
        fields.insert("title".to_string(), Value::from(self.title.trim()));
        fields.insert(
            "contactId".to_string(),
            ForeignKey::Bare(self.contact_id).to_value(),
        );
        fields.insert("value".to_string(), Value::from(self.value));
        fields.insert("probability".to_string(), Value::from(self.probability));
        fields.insert("stage".to_string(), Value::from(self.stage));
        fields.insert("status".to_string(), Value::from(self.status));
        fields.insert(
            "expectedClose".to_string(),
            Value::from(self.expected_close.format("%Y-%m-%d").to_string()),
        );
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strum::IntoEnumIterator;

    #[test]
    fn test_parse_entity_kind() {
        assert_eq!(EntityKind::parse("task").unwrap(), EntityKind::Task);
        assert_eq!(EntityKind::parse("deal").unwrap(), EntityKind::Deal);
        assert_eq!(EntityKind::parse("app_contact").unwrap(), EntityKind::Contact);
        assert_eq!(EntityKind::Contact.to_string(), "contact");

        let err = EntityKind::parse("invoice").unwrap_err();
        assert!(matches!(err, BoardError::UnsupportedEntityKind(ref k) if k == "invoice"));
    }

    #[test]
    fn test_status_fields() {
        assert_eq!(EntityKind::Task.status_field(), "status");
        assert_eq!(EntityKind::Contact.status_field(), "status");
        assert_eq!(EntityKind::Deal.status_field(), "stage");
    }

    #[test]
    fn test_builtin_column_sets_are_valid() {
        for kind in EntityKind::iter() {
            kind.descriptor().validate_columns().unwrap();
        }

        let ids: Vec<String> = EntityKind::Deal.columns().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, ["lead", "qualified", "proposal", "negotiation", "closed"]);
    }

    #[test]
    fn test_duplicate_column_ids_rejected() {
        let mut descriptor = EntityKind::Task.descriptor();
        descriptor
            .columns
            .push(ColumnDescriptor::new("pending", "Again", "red-400"));

        assert!(matches!(
            descriptor.validate_columns(),
            Err(BoardError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_column_id_rejected() {
        let mut descriptor = EntityKind::Task.descriptor();
        descriptor.columns[0].id = String::new();
        assert!(descriptor.validate_columns().is_err());
    }

    #[test]
    fn test_record_wire_shape() {
        let record: Record = serde_json::from_value(json!({
            "Id": 4,
            "title": "Renewal",
            "stage": "lead",
            "value": 1200.5
        }))
        .unwrap();

        assert_eq!(record.id, 4);
        assert_eq!(record.str_field("stage"), Some("lead"));
        assert_eq!(record.f64_field("value"), Some(1200.5));
        assert!(record.get(ID_FIELD).is_none());

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["Id"], json!(4));
    }

    #[test]
    fn test_with_field_keeps_other_fields() {
        let record: Record =
            serde_json::from_value(json!({"Id": 1, "title": "Call", "status": "pending"})).unwrap();

        let moved = record.with_field("status", "completed");
        assert_eq!(moved.str_field("status"), Some("completed"));
        assert_eq!(moved.str_field("title"), Some("Call"));
        assert_eq!(record.str_field("status"), Some("pending"));

        let same_id = record.with_field(ID_FIELD, 99);
        assert_eq!(same_id, record);
    }

    #[test]
    fn test_foreign_key_shapes() {
        assert_eq!(ForeignKey::from_value(&json!(3)), Some(ForeignKey::Bare(3)));
        assert_eq!(ForeignKey::from_value(&json!("12")), Some(ForeignKey::Bare(12)));

        let expanded = ForeignKey::from_value(&json!({"Id": 5, "Name": "Ada Lovelace"})).unwrap();
        assert_eq!(expanded.id(), 5);
        assert_eq!(expanded.display_name(), Some("Ada Lovelace"));
        assert_eq!(expanded.to_value(), json!(5));

        assert_eq!(ForeignKey::from_value(&json!(null)), None);
        assert_eq!(ForeignKey::from_value(&json!({"Name": "orphan"})), None);
    }

    #[test]
    fn test_configuration_snapshot() {
        let now = Utc::now();
        let config = BoardConfiguration::snapshot(&EntityKind::Deal.descriptor(), now).unwrap();

        assert_eq!(config.id, None);
        assert_eq!(config.name, "Deal Board");
        assert_eq!(config.entity_key, "deal");
        assert_eq!(config.status_field_name, "stage");

        let layout: ColumnLayout = serde_json::from_str(&config.serialized_column_layout).unwrap();
        assert_eq!(layout.columns, EntityKind::Deal.columns());
        assert_eq!(layout.last_modified, now);
    }

    #[test]
    fn test_find_for_takes_first_match() {
        let now = Utc::now();
        let mut first = BoardConfiguration::snapshot(&EntityKind::Task.descriptor(), now).unwrap();
        first.id = Some(1);
        let mut second = first.clone();
        second.id = Some(2);
        let mut deal = BoardConfiguration::snapshot(&EntityKind::Deal.descriptor(), now).unwrap();
        deal.id = Some(3);

        let found = BoardConfiguration::find_for(vec![deal, first, second], EntityKind::Task);
        assert_eq!(found.and_then(|c| c.id), Some(1));
    }

    #[test]
    fn test_create_deal_validation() {
        let deal: CreateDeal = serde_json::from_value(json!({
            "title": "Annual plan",
            "contactId": 2,
            "value": 5000.0,
            "expectedClose": "2026-12-01"
        }))
        .unwrap();
        deal.validate().unwrap();
        assert_eq!(deal.stage, "lead");
        assert_eq!(deal.probability, 50);

        let fields = deal.into_fields();
        assert_eq!(fields["contactId"], json!(2));
        assert_eq!(fields["expectedClose"], json!("2026-12-01"));

        let blank: CreateDeal = serde_json::from_value(json!({
            "title": "   ",
            "contactId": 2,
            "value": 0.0,
            "expectedClose": "2026-12-01"
        }))
        .unwrap();
        let errors = blank.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("value"));
    }
}
