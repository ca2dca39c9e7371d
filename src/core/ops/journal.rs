//! core::ops::journal
//!
//! Operation journal for crash safety and undo.
//!
//! # Architecture
//!
//! The journal is the source of truth for:
//! - Rollback (`abort`) - restore refs to pre-operation state
//! - Resume (`continue`) - complete a paused operation
//! - Undo last completed operation
//!
//! # Storage
//!
//! - `.git/ridgeline/ops/<op_id>.json` - Journal files (append-only with fsync)
//! - `.git/ridgeline/op-state.json` - Current operation marker
//!
//! # Invariants
//!
//! - Journals must be written with fsync at each step boundary
//! - Interrupted commands must be recoverable via the journal
//! - All ref changes must be recorded with before/after OIDs
//!
//! # Example
//!
//! ```ignore
//! use ridgeline::core::ops::journal::{Journal, StepKind};
//!
//! // Create a new journal for an operation
//! let mut journal = Journal::new("restack");
//!
//! // Record steps as they happen
//! journal.record_ref_update(
//!     "refs/heads/feature",
//!     Some("abc123...".to_string()),
//!     "def456...",
//! );
//!
//! // Write to disk with fsync
//! journal.write(git_dir)?;
//!
//! // Mark as committed when done
//! journal.commit();
//! journal.write(git_dir)?;
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::core::types::UtcTimestamp;

/// Errors from journal operations.
#[derive(Debug, Error)]
pub enum JournalError {
    /// I/O error reading or writing journal files.
    #[error("journal i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("journal json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Journal file not found.
    #[error("journal not found: {0}")]
    NotFound(String),

    /// Invalid journal state.
    #[error("invalid journal state: {0}")]
    InvalidState(String),
}

/// Unique identifier for an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpId(String);

impl OpId {
    /// Generate a new unique operation id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create an OpId from an existing string.
    ///
    /// Used when reading journals from disk.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OpId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The current phase of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpPhase {
    /// Operation is in progress.
    InProgress,
    /// Operation is paused waiting for user (e.g., conflict resolution).
    Paused,
    /// Operation completed successfully.
    Committed,
    /// Operation was rolled back.
    RolledBack,
}

impl OpPhase {
    /// Check if the operation is finished (committed or rolled back).
    pub fn is_finished(&self) -> bool {
        matches!(self, OpPhase::Committed | OpPhase::RolledBack)
    }

    /// Check if the operation can be resumed.
    pub fn is_resumable(&self) -> bool {
        matches!(self, OpPhase::Paused)
    }

    /// Check if the operation is actively running.
    pub fn is_active(&self) -> bool {
        matches!(self, OpPhase::InProgress)
    }
}

/// A single step in an operation journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalStep {
    /// Step kind with operation-specific data.
    pub kind: StepKind,
    /// Timestamp when step was recorded.
    pub timestamp: UtcTimestamp,
}

/// The kind of journal step.
///
/// Each step records enough information to either undo the operation
/// or resume it from where it left off.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    /// A ref update with before/after values.
    ///
    /// Used for branch tip updates and other ref changes.
    RefUpdate {
        /// The full ref name (e.g., "refs/heads/feature").
        refname: String,
        /// OID before the update, or None if the ref was created.
        old_oid: Option<String>,
        /// OID after the update.
        new_oid: String,
    },

    /// A metadata write with full snapshot.
    ///
    /// Records metadata ref changes for tracked branches.
    MetadataWrite {
        /// Branch name.
        branch: String,
        /// Metadata ref OID before the write, or None if created.
        old_ref_oid: Option<String>,
        /// Metadata ref OID after the write.
        new_ref_oid: String,
    },

    /// A metadata delete.
    MetadataDelete {
        /// Branch name.
        branch: String,
        /// Metadata ref OID that was deleted.
        old_ref_oid: String,
    },

    /// A checkpoint marker.
    ///
    /// Used to mark significant points in multi-step operations.
    Checkpoint {
        /// Checkpoint name for debugging/logging.
        name: String,
    },

    /// A git process was run.
    ///
    /// Records git commands for auditing and debugging.
    GitProcess {
        /// Git command arguments.
        args: Vec<String>,
        /// Human-readable description of what the command does.
        description: String,
    },

    /// Conflict detected during operation.
    ///
    /// Records the state when the operation was paused for user intervention.
    ConflictPaused {
        /// The branch where the conflict occurred.
        branch: String,
        /// Type of git operation that conflicted (rebase, merge, etc.).
        git_state: String,
        /// Branches remaining to process after conflict resolution.
        remaining_branches: Vec<String>,
    },
}

/// An operation journal.
///
/// Records all state changes during a Ridgeline operation for crash
/// recovery, undo, and resume support.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journal {
    /// Unique operation identifier.
    pub op_id: OpId,
    /// Command that started this operation.
    pub command: String,
    /// When the operation started.
    pub started_at: UtcTimestamp,
    /// When the operation finished (if finished).
    pub finished_at: Option<UtcTimestamp>,
    /// Current phase.
    pub phase: OpPhase,
    /// Steps recorded so far.
    pub steps: Vec<JournalStep>,
}

impl Journal {
    /// Create a new journal for an operation.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            op_id: OpId::new(),
            command: command.into(),
            started_at: UtcTimestamp::now(),
            finished_at: None,
            phase: OpPhase::InProgress,
            steps: vec![],
        }
    }

    /// Get the directory where journals are stored.
    pub fn ops_dir(git_dir: &Path) -> PathBuf {
        git_dir.join("ridgeline").join("ops")
    }

    /// Get the path to this journal's file.
    pub fn file_path(&self, git_dir: &Path) -> PathBuf {
        Self::ops_dir(git_dir).join(format!("{}.json", self.op_id))
    }

    /// Add a step to the journal.
    pub fn add_step(&mut self, kind: StepKind) {
        self.steps.push(JournalStep {
            kind,
            timestamp: UtcTimestamp::now(),
        });
    }

    /// Record a ref update step.
    pub fn record_ref_update(
        &mut self,
        refname: impl Into<String>,
        old_oid: Option<String>,
        new_oid: impl Into<String>,
    ) {
        self.add_step(StepKind::RefUpdate {
            refname: refname.into(),
            old_oid,
            new_oid: new_oid.into(),
        });
    }

    /// Record a metadata write step.
    pub fn record_metadata_write(
        &mut self,
        branch: impl Into<String>,
        old_ref_oid: Option<String>,
        new_ref_oid: impl Into<String>,
    ) {
        self.add_step(StepKind::MetadataWrite {
            branch: branch.into(),
            old_ref_oid,
            new_ref_oid: new_ref_oid.into(),
        });
    }

    /// Record a metadata delete step.
    pub fn record_metadata_delete(
        &mut self,
        branch: impl Into<String>,
        old_ref_oid: impl Into<String>,
    ) {
        self.add_step(StepKind::MetadataDelete {
            branch: branch.into(),
            old_ref_oid: old_ref_oid.into(),
        });
    }

    /// Record a checkpoint.
    pub fn record_checkpoint(&mut self, name: impl Into<String>) {
        self.add_step(StepKind::Checkpoint { name: name.into() });
    }

    /// Record a git process execution.
    pub fn record_git_process(&mut self, args: Vec<String>, description: impl Into<String>) {
        self.add_step(StepKind::GitProcess {
            args,
            description: description.into(),
        });
    }

    /// Record that a conflict paused the operation.
    pub fn record_conflict_paused(
        &mut self,
        branch: impl Into<String>,
        git_state: impl Into<String>,
        remaining_branches: Vec<String>,
    ) {
        self.add_step(StepKind::ConflictPaused {
            branch: branch.into(),
            git_state: git_state.into(),
            remaining_branches,
        });
    }

    /// Mark the operation as committed (successful completion).
    pub fn commit(&mut self) {
        self.phase = OpPhase::Committed;
        self.finished_at = Some(UtcTimestamp::now());
    }

    /// Mark the operation as paused (waiting for user).
    pub fn pause(&mut self) {
        self.phase = OpPhase::Paused;
    }

    /// Mark the operation as rolled back.
    pub fn rollback(&mut self) {
        self.phase = OpPhase::RolledBack;
        self.finished_at = Some(UtcTimestamp::now());
    }

    /// Write the journal to disk with fsync.
    ///
    /// This should be called after each step to ensure crash safety.
    pub fn write(&self, git_dir: &Path) -> Result<(), JournalError> {
        let dir = Self::ops_dir(git_dir);
        fs::create_dir_all(&dir)?;

        let path = self.file_path(git_dir);
        let content = serde_json::to_string_pretty(self)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        file.write_all(content.as_bytes())?;
        file.sync_all()?;

        Ok(())
    }

    /// Read a journal from disk.
    pub fn read(git_dir: &Path, op_id: &OpId) -> Result<Self, JournalError> {
        let path = Self::ops_dir(git_dir).join(format!("{}.json", op_id));

        if !path.exists() {
            return Err(JournalError::NotFound(op_id.to_string()));
        }

        let content = fs::read_to_string(&path)?;
        let journal = serde_json::from_str(&content)?;
        Ok(journal)
    }

    /// List all journal files.
    ///
    /// Returns operation IDs sorted by modification time (newest first).
    pub fn list(git_dir: &Path) -> Result<Vec<OpId>, JournalError> {
        let dir = Self::ops_dir(git_dir);
        if !dir.exists() {
            return Ok(vec![]);
        }

        let mut entries: Vec<_> = fs::read_dir(&dir)?
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let name = entry.file_name().into_string().ok()?;
                let id = name.strip_suffix(".json")?;
                let mtime = entry.metadata().ok()?.modified().ok()?;
                Some((OpId::from_string(id), mtime))
            })
            .collect();

        // Sort by modification time (newest first)
        entries.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(entries.into_iter().map(|(id, _)| id).collect())
    }

    /// Get the most recent journal.
    pub fn most_recent(git_dir: &Path) -> Result<Option<Self>, JournalError> {
        let ids = Self::list(git_dir)?;
        match ids.first() {
            Some(id) => Ok(Some(Self::read(git_dir, id)?)),
            None => Ok(None),
        }
    }

    /// Delete this journal from disk.
    pub fn delete(&self, git_dir: &Path) -> Result<(), JournalError> {
        let path = self.file_path(git_dir);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Get all ref update steps for undo/rollback.
    ///
    /// Returns steps in reverse order (most recent first) for rollback.
    pub fn ref_updates_for_rollback(&self) -> Vec<&StepKind> {
        self.steps
            .iter()
            .rev()
            .filter_map(|step| match &step.kind {
                kind @ StepKind::RefUpdate { .. } => Some(kind),
                kind @ StepKind::MetadataWrite { .. } => Some(kind),
                kind @ StepKind::MetadataDelete { .. } => Some(kind),
                _ => None,
            })
            .collect()
    }
}

/// The op-state marker indicating an operation is in progress.
///
/// This file exists only while a Ridgeline operation is executing or
/// paused waiting for user intervention. It prevents other Ridgeline
/// commands from running until the current operation is resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpState {
    /// Operation id (matches the journal).
    pub op_id: OpId,
    /// Command name.
    pub command: String,
    /// Current phase.
    pub phase: OpPhase,
    /// When the op-state was last updated.
    pub updated_at: UtcTimestamp,
}

impl OpState {
    /// Create a new op-state marker from a journal.
    pub fn from_journal(journal: &Journal) -> Self {
        Self {
            op_id: journal.op_id.clone(),
            command: journal.command.clone(),
            phase: journal.phase.clone(),
            updated_at: UtcTimestamp::now(),
        }
    }

    /// Path to the op-state file.
    pub fn path(git_dir: &Path) -> PathBuf {
        git_dir.join("ridgeline").join("op-state.json")
    }

    /// Write the op-state marker to disk.
    pub fn write(&self, git_dir: &Path) -> Result<(), JournalError> {
        let dir = git_dir.join("ridgeline");
        fs::create_dir_all(&dir)?;

        let path = Self::path(git_dir);
        let content = serde_json::to_string_pretty(self)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        file.write_all(content.as_bytes())?;
        file.sync_all()?;

        Ok(())
    }

    /// Read the op-state marker, if it exists.
    pub fn read(git_dir: &Path) -> Result<Option<Self>, JournalError> {
        let path = Self::path(git_dir);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let state = serde_json::from_str(&content)?;
        Ok(Some(state))
    }

    /// Remove the op-state marker.
    pub fn remove(git_dir: &Path) -> Result<(), JournalError> {
        let path = Self::path(git_dir);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Check if an op-state marker exists.
    pub fn exists(git_dir: &Path) -> bool {
        Self::path(git_dir).exists()
    }

    /// Update the phase and write to disk.
    pub fn update_phase(&mut self, phase: OpPhase, git_dir: &Path) -> Result<(), JournalError> {
        self.phase = phase;
        self.updated_at = UtcTimestamp::now();
        self.write(git_dir)
    }
}
