//! CRM Board Domain
//!
//! Kanban boards over CRM records (tasks, deals, contacts): loading a board,
//! moving records between status columns and keeping each board's column
//! layout saved across sessions.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ BoardService │  ← Load, transition, layout saves
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐
//! │EntityAdapter │  ← Kind → status field, columns, record service
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐
//! │  Repository  │  ← Record / configuration services (in-memory, hosted)
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐
//! │    Models    │  ← Records, kinds, columns, configurations
//! └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_crm::{
//!     BoardService, EntityAdapter, EntityKind, InMemoryBoardConfigurationService,
//!     InMemoryRecordService, Transition,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let adapter = EntityAdapter::new()
//!     .with_service(EntityKind::Task, Arc::new(InMemoryRecordService::new("task")));
//! let board = BoardService::new(adapter, InMemoryBoardConfigurationService::new());
//!
//! let mut state = board.load_board(EntityKind::Task).await?;
//! if let Transition::Moved { layout_save, .. } =
//!     board.apply_transition(&mut state, 1, "completed").await?
//! {
//!     layout_save.await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod board;
pub mod error;
pub mod hosted;
pub mod layout;
pub mod models;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use adapter::EntityAdapter;
pub use board::{BoardState, ColumnSummary, ConfigurationSlot};
pub use error::{BoardError, BoardResult, RecordError, RecordResult};
pub use hosted::{HostedBoardConfigurationService, HostedClient, HostedRecordService};
pub use layout::LayoutStore;
pub use models::{
    BoardConfiguration, ColumnDescriptor, ColumnLayout, CreateDeal, EntityDescriptor, EntityKind,
    ForeignKey, Record, RecordFields, RecordId,
};
pub use repository::{
    BoardConfigurationService, InMemoryBoardConfigurationService, InMemoryRecordService,
    RecordService,
};
pub use service::{BoardService, Transition};
