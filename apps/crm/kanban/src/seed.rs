//! Demo records used when no hosted backend is configured

use std::sync::Arc;

use domain_crm::{EntityAdapter, EntityKind, InMemoryRecordService, Record};
use eyre::{Result, WrapErr};

const TASKS: &str = include_str!("../data/tasks.json");
const DEALS: &str = include_str!("../data/deals.json");
const CONTACTS: &str = include_str!("../data/contacts.json");

fn table(kind: EntityKind, raw: &str) -> Result<Arc<InMemoryRecordService>> {
    let records: Vec<Record> = serde_json::from_str(raw)
        .wrap_err_with(|| format!("Invalid seed data for {kind}"))?;
    Ok(Arc::new(InMemoryRecordService::with_records(
        kind.table_name(),
        records,
    )))
}

/// Adapter over in-memory tables seeded with the demo records
pub fn adapter() -> Result<EntityAdapter> {
    Ok(EntityAdapter::new()
        .with_service(EntityKind::Task, table(EntityKind::Task, TASKS)?)
        .with_service(EntityKind::Deal, table(EntityKind::Deal, DEALS)?)
        .with_service(EntityKind::Contact, table(EntityKind::Contact, CONTACTS)?))
}
