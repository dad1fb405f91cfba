//! # Noteline Engine
//!
//! The deterministic core of Noteline's offline synchronization.
//!
//! This crate holds the data model and the decision logic shared by the
//! client and the reference server. It performs no IO: storage, network and
//! scheduling live in `noteline-client`, which calls into the rules here.
//!
//! ## Core Concepts
//!
//! ### Notes
//!
//! A [`Note`] is identified by a client-generated id and carries a
//! [`SyncStatus`] (`pending`, `synced`, `error`). `updatedAt` moves strictly
//! forward on every local mutation (see [`clock::next_update`]); `lastSynced`
//! is only set after the remote store acknowledged a version.
//!
//! ### Pending Operations
//!
//! Every unconfirmed local mutation is a [`PendingOperation`] (`save` or
//! `delete`) in an ordered log. Replay delivers them in sequence order.
//!
//! ### Merge
//!
//! [`merge::resolve`] folds one remote note into local state using
//! last-writer-wins on `updatedAt`, with a guard that never lets an
//! equal-or-older remote version overwrite a pending local edit.
//!
//! ### Sync State
//!
//! [`SyncState`] is the externally observable state machine
//! (`idle → syncing → complete | error`) plus the online/offline flag. It
//! changes only by applying [`SyncMessage`]s.
//!
//! ## Quick Start
//!
//! ```rust
//! use noteline_engine::{merge, Note, SyncStatus};
//! use std::collections::HashSet;
//!
//! // A local edit made offline at t=200
//! let mut local = Note::new("a", "Draft", "offline edit", 100);
//! local.updated_at = 200;
//!
//! // The server still has the version from t=150
//! let mut remote = Note::new("a", "Draft", "old text", 100);
//! remote.updated_at = 150;
//! remote.sync_status = SyncStatus::Synced;
//!
//! let outcome = merge::merge(vec![local.clone()], &[remote], &HashSet::new(), 300);
//! assert_eq!(outcome.notes, vec![local]);
//! assert_eq!(outcome.report.kept_pending, vec!["a".to_string()]);
//! ```

pub mod clock;
pub mod error;
pub mod merge;
pub mod message;
pub mod note;
pub mod operation;
pub mod state;

// Re-export main types at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::Error;
pub use merge::{MergeFailure, MergeOutcome, MergeReport, Resolution};
pub use message::{Envelope, SyncMessage, PROTOCOL_VERSION};
pub use note::{Note, NoteDraft, SyncStatus};
pub use operation::{OperationKind, OperationSeq, PendingOperation, NOTE_ENTITY};
pub use state::{Connectivity, FollowUp, SyncPhase, SyncState};

/// Type aliases for clarity
pub type NoteId = String;
pub type Timestamp = u64;
