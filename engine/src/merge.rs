//! Merge of a remote note snapshot into local state.
//!
//! # Algorithm
//!
//! For every remote note `R`:
//!
//! 1. No local note with `R.id` → insert `R` as synced.
//! 2. `R.updatedAt > L.updatedAt` → overwrite `L` with `R` as synced.
//! 3. `L` is pending → keep `L` (an equal-or-older remote version never
//!    clobbers an unconfirmed local edit).
//! 4. Otherwise keep `L`.
//!
//! Local notes missing from the snapshot are never deleted; deletions travel
//! only as explicit delete operations. A remote note whose id has a queued
//! local delete is not resurrected.
//!
//! Equal timestamps resolve to "no change", so merging the same snapshot twice
//! is a no-op.

use crate::{Note, NoteId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// What the merge does with one remote note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resolution {
    /// Unknown locally; materialize it
    Insert,
    /// Remote is strictly newer; replace local
    Overwrite,
    /// Local has an unconfirmed edit at least as new as remote
    KeepPending,
    /// Deleted locally, delete not yet confirmed
    KeepDeleted,
    /// Already consistent or locally newer
    Unchanged,
}

impl Resolution {
    /// Whether the local store must write the remote version.
    pub fn writes(&self) -> bool {
        matches!(self, Resolution::Insert | Resolution::Overwrite)
    }
}

/// Decide how a single remote note folds into local state.
pub fn resolve(local: Option<&Note>, remote: &Note, deleted_locally: bool) -> Resolution {
    match local {
        None if deleted_locally => Resolution::KeepDeleted,
        None => Resolution::Insert,
        Some(l) if remote.updated_at > l.updated_at => Resolution::Overwrite,
        Some(l) if l.is_pending() => Resolution::KeepPending,
        Some(_) => Resolution::Unchanged,
    }
}

/// Per-note outcome of a merge pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub inserted: Vec<NoteId>,
    pub overwritten: Vec<NoteId>,
    pub kept_pending: Vec<NoteId>,
    pub kept_deleted: Vec<NoteId>,
    pub unchanged: Vec<NoteId>,
    /// Remote notes that could not be applied; siblings still were
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<MergeFailure>,
}

/// A remote note the merge skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeFailure {
    pub id: NoteId,
    pub reason: String,
}

impl MergeReport {
    pub fn record(&mut self, id: NoteId, resolution: Resolution) {
        let bucket = match resolution {
            Resolution::Insert => &mut self.inserted,
            Resolution::Overwrite => &mut self.overwritten,
            Resolution::KeepPending => &mut self.kept_pending,
            Resolution::KeepDeleted => &mut self.kept_deleted,
            Resolution::Unchanged => &mut self.unchanged,
        };
        bucket.push(id);
    }

    pub fn record_failure(&mut self, id: NoteId, reason: impl Into<String>) {
        self.failed.push(MergeFailure {
            id,
            reason: reason.into(),
        });
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Number of local notes written by the merge.
    pub fn changed(&self) -> usize {
        self.inserted.len() + self.overwritten.len()
    }
}

/// Result of an in-memory merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Post-merge local notes
    pub notes: Vec<Note>,
    pub report: MergeReport,
}

/// Merge `remote` into `local` without touching storage.
///
/// `deleted` holds ids with a queued local delete. `now` becomes the
/// `lastSynced` of every written note. Invalid remote notes are reported
/// in [`MergeReport::failed`] and skipped. Notes come back ordered by id.
pub fn merge(
    local: Vec<Note>,
    remote: &[Note],
    deleted: &HashSet<NoteId>,
    now: Timestamp,
) -> MergeOutcome {
    let mut state: BTreeMap<NoteId, Note> =
        local.into_iter().map(|n| (n.id.clone(), n)).collect();
    let mut report = MergeReport::default();

    for r in remote {
        if let Err(e) = r.validate() {
            report.record_failure(r.id.clone(), e.to_string());
            continue;
        }
        let resolution = resolve(state.get(&r.id), r, deleted.contains(&r.id));
        if resolution.writes() {
            state.insert(r.id.clone(), Note::from_remote(r, now));
        }
        report.record(r.id.clone(), resolution);
    }

    MergeOutcome {
        notes: state.into_values().collect(),
        report,
    }
}
