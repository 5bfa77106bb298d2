//! CRM Kanban
//!
//! Operator CLI for the CRM boards: print a board's columns or move a record
//! to another column. Talks to the hosted backend when `CRM_BACKEND_URL` is
//! set and to seeded in-memory tables otherwise.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use core_config::backend::HostedBackendConfig;
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{Environment, FromEnv};
use domain_crm::{
    BoardConfigurationService, BoardService, BoardState, EntityAdapter, EntityKind,
    HostedBoardConfigurationService, HostedClient, HostedRecordService,
    InMemoryBoardConfigurationService, RecordId, Transition,
};
use eyre::Result;
use tracing::info;

mod seed;

#[derive(Parser)]
#[command(name = "crm-kanban")]
#[command(about = "Inspect CRM kanban boards and move records between columns")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print each column with its records, count and total value
    Show {
        /// Entity kind (task, deal, contact)
        #[arg(short, long, default_value = "deal")]
        entity: String,
    },

    /// Move a record to another column
    Move {
        /// Entity kind (task, deal, contact)
        #[arg(short, long, default_value = "deal")]
        entity: String,

        /// Record identifier
        #[arg(long)]
        id: RecordId,

        /// Target column id, e.g. "qualified"
        #[arg(long)]
        to: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let environment = Environment::from_env();
    init_tracing(&environment);

    let cli = Cli::parse();

    if HostedBackendConfig::is_configured() {
        let config = HostedBackendConfig::from_env()?;
        let client = HostedClient::new(&config)?;
        info!(url = %config.base_url, "Using hosted backend");

        let adapter = EntityKind::ALL
            .into_iter()
            .fold(EntityAdapter::new(), |adapter, kind| {
                let service = HostedRecordService::for_kind(client.clone(), kind);
                adapter.with_service(kind, Arc::new(service))
            });
        let board = BoardService::new(adapter, HostedBoardConfigurationService::new(client));
        run(board, cli.command).await
    } else {
        info!("CRM_BACKEND_URL not set, using seeded in-memory data");
        let board = BoardService::new(seed::adapter()?, InMemoryBoardConfigurationService::new());
        run(board, cli.command).await
    }
}

async fn run<C: BoardConfigurationService + 'static>(
    board: BoardService<C>,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::Show { entity } => {
            let kind = EntityKind::parse(&entity)?;
            let state = board.load_board(kind).await?;
            print_board(&state);
        }

        Commands::Move { entity, id, to } => {
            let kind = EntityKind::parse(&entity)?;
            let mut state = board.load_board(kind).await?;

            match board.apply_transition(&mut state, id, &to).await? {
                Transition::Unchanged => {
                    println!("{} {} is already in '{}'", kind.label(), id, to);
                }
                Transition::Moved { layout_save, .. } => {
                    layout_save.await?;
                    println!("{} {} moved to '{}'", kind.label(), id, to);
                    print_board(&state);
                }
            }
        }
    }

    Ok(())
}

fn print_board(state: &BoardState) {
    let show_contacts = state.kind() == EntityKind::Deal;

    for summary in state.summaries() {
        println!(
            "{:<14} {:>3} records   total ${:.2}",
            summary.column.label, summary.count, summary.total_value
        );

        for record in state.records_in(&summary.column.id) {
            let name = record.display_name().unwrap_or("(untitled)");
            if show_contacts {
                println!("    #{:<4} {} ({})", record.id, name, state.contact_name(record));
            } else {
                println!("    #{:<4} {}", record.id, name);
            }
        }
    }

    let unassigned = state.unassigned();
    if !unassigned.is_empty() {
        println!("{} records match no column", unassigned.len());
    }
}
