//! # noteline-client
//!
//! Offline-first note sync client.
//!
//! Notes are written to a local SQLite store first, together with a durable
//! log of operations still owed to the remote store. The [`SyncOrchestrator`]
//! pushes changes right away while online, replays the log in order when
//! connectivity returns, and merges the remote copy back with
//! last-writer-wins.
//!
//! ```no_run
//! use noteline_client::{ClientConfig, SyncOrchestrator};
//! use noteline_engine::NoteDraft;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let sync = SyncOrchestrator::from_config(&config, true)?;
//! sync.load().await?;
//!
//! let outcome = sync.apply_mutation(NoteDraft::new("Groceries", "milk, eggs")).await?;
//! println!("stored {} (pending: {})", outcome.id, outcome.pending);
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod remote;
pub mod replay;
pub mod store;
pub mod worker;

pub use channel::SyncChannel;
pub use config::{ClientConfig, ConfigError};
pub use orchestrator::{CycleOutcome, MutationOutcome, SyncOrchestrator, SyncSummary};
pub use remote::{HttpRemote, RemoteNoteStore};
pub use replay::{ReplayEngine, ReplayReport};
pub use store::LocalStore;
pub use worker::SyncWorker;
