//! engine::exec
//!
//! The single transactional executor.
//!
//! # Architecture
//!
//! Per the Executor is the ONLY component
//! allowed to mutate the repository. All mutations must flow through
//! this module.
//!
//! # Executor Contract
//!
//! The executor MUST:
//! 1. Acquire the Ridgeline repository lock before any mutation
//! 2. Write op-state marker before the first mutation
//! 3. Record `IntentRecorded` event before mutations
//! 4. Apply all ref updates with CAS semantics
//! 5. If CAS fails: abort without continuing, record `Aborted`
//! 6. If conflict pauses: transition to `awaiting_user` and stop
//! 7. After success: re-scan, verify invariants, record `Committed`
//! 8. Clear op-state marker and release lock
//!
//! # Invariants
//!
//! - Only the Executor mutates the repository
//! - All mutations are journaled
//! - CAS preconditions are enforced
//! - Interrupted operations are recoverable
//!
//! # Example
//!
//! ```ignore
//! use ridgeline::engine::exec::Executor;
//! use ridgeline::engine::plan::Plan;
//!
//! let executor = Executor::new(&git);
//! match executor.execute(&plan, &ctx)? {
//! ExecuteResult::Success { fingerprint } => {
//! println!("Success! New fingerprint: {}", fingerprint);
//! }
//! ExecuteResult::Paused { branch,.. } => {
//! println!("Conflict on {}. Run 'rl continue' after resolving.", branch);
//! }
//! ExecuteResult::Aborted { error,.. } => {
//! println!("Aborted: {}", error);
//! }
//! }
//! ```

use thiserror::Error;

use super::ledger::{Event, EventLedger, LedgerError};
use super::plan::{Plan, PlanStep};
use super::scan::compute_fingerprint;
use super::Context;
use crate::core::metadata::store::{MetadataStore, StoreError};
use crate::core::ops::journal::{Journal, JournalError, OpPhase, OpState};
use crate::core::ops::lock::{LockError, RepoLock};
use crate::core::types::{BranchName, Fingerprint, Oid};
use crate::git::{Git, GitError, GitState};

/// Errors from execution.
#[derive(Debug, Error)]
pub enum ExecuteError {
 /// Failed to acquire repository lock.
 #[error("failed to acquire lock: {0}")]
 LockFailed(#[from] LockError),

 /// CAS precondition failed during execution.
 #[error("CAS failed for {refname}: expected {expected}, found {actual}")]
 CasFailed {
 /// The ref that failed
 refname: String,
 /// Expected old value
 expected: String,
 /// Actual current value
 actual: String,
 },

 /// Git operation failed.
 #[error("git error: {0}")]
 Git(#[from] GitError),

 /// Metadata operation failed.
 #[error("metadata error: {0}")]
 Metadata(#[from] StoreError),

 /// Journal operation failed.
 #[error("journal error: {0}")]
 Journal(#[from] JournalError),

 /// Ledger operation failed.
 #[error("ledger error: {0}")]
 Ledger(#[from] LedgerError),

 /// Another operation is in progress.
 #[error("another operation is in progress: {command} ({op_id})")]
 OperationInProgress {
 /// Command of the in-progress operation
 command: String,
 /// Op ID of the in-progress operation
 op_id: String,
 },

 /// Plan is invalid.
 #[error("invalid plan: {0}")]
 InvalidPlan(String),

 /// Internal error.
 #[error("internal error: {0}")]
 Internal(String),
}

/// Result of executing a plan.
#[derive(Debug)]
pub enum ExecuteResult {
 /// Plan executed successfully.
 Success {
 /// Post-execution fingerprint.
 fingerprint: Fingerprint,
 },

 /// Execution paused for conflict resolution.
 Paused {
 /// Branch where conflict occurred.
 branch: String,
 /// Git state (rebase, merge, etc.).
 git_state: GitState,
 /// Steps remaining after conflict resolution.
 remaining_steps: Vec<PlanStep>,
 },

 /// Execution aborted due to error.
 Aborted {
 /// Error that caused the abort.
 error: String,
 /// Steps that were successfully applied.
 applied_steps: Vec<PlanStep>,
 },
}

impl ExecuteResult {
 /// Check if execution was successful.
 pub fn is_success(&self) -> bool {
 matches!(self, ExecuteResult::Success {.. })
 }

 /// Check if execution was paused.
 pub fn is_paused(&self) -> bool {
 matches!(self, ExecuteResult::Paused {.. })
 }

 /// Check if execution was aborted.
 pub fn is_aborted(&self) -> bool {
 matches!(self, ExecuteResult::Aborted {.. })
 }
}

/// The executor.
///
/// Applies plans to the repository with transactional semantics.
/// This is the single mutation pathway for all Ridgeline operations.
pub struct Executor<'a> {
 git: &'a Git,
}

impl<'a> Executor<'a> {
 /// Create a new executor.
 pub fn new(git: &'a Git) -> Self {
 Self { git }
 }

 /// Execute a plan.
 ///
 /// This is the main entry point for applying changes to the repository.
 /// It enforces the executor contract: lock, journal, CAS, verify.
 ///
 /// # Arguments
 ///
 /// * `plan` - The plan to execute
 /// * `ctx` - Execution context (debug mode, etc.)
 ///
 /// # Returns
 ///
 /// - `ExecuteResult::Success` if all steps completed
 /// - `ExecuteResult::Paused` if waiting for conflict resolution
 /// - `ExecuteResult::Aborted` if an error occurred
 pub fn execute(&self, plan: &Plan, ctx: &Context) -> Result<ExecuteResult, ExecuteError> {
 let git_dir = self.git.git_dir();

 // Check for in-progress operation
 if let Some(op_state) = OpState::read(git_dir)? {
 return Err(ExecuteError::OperationInProgress {
 command: op_state.command,
 op_id: op_state.op_id.to_string(),
 });
 }

 // Early return for empty plans
 if plan.is_empty() {
 if ctx.debug {
 eprintln!("[debug] Empty plan, nothing to execute");
 }
 return Ok(ExecuteResult::Success {
 fingerprint: Fingerprint::compute(&[]),
 });
 }

 // Acquire lock
 if ctx.debug {
 eprintln!("[debug] Acquiring repository lock");
 }
 let _lock = RepoLock::acquire(git_dir)?;

 // Create journal
 let mut journal = Journal::new(&plan.command);

 // Write op-state marker
 if ctx.debug {
 eprintln!("[debug] Writing op-state marker");
 }
 let op_state = OpState::from_journal(&journal);
 op_state.write(git_dir)?;

 // Record IntentRecorded event
 if ctx.debug {
 eprintln!("[debug] Recording IntentRecorded event");
 }
 let ledger = EventLedger::new(self.git);
 let current_fp = self.compute_current_fingerprint()?;
 let _ = ledger.append(Event::intent_recorded(
 plan.op_id.as_str(),
 &plan.command,
 plan.digest(),
 current_fp.as_str(),
 ));

 // Execute steps
 let mut applied_steps = Vec::new();
 let mut step_iter = plan.steps.iter().enumerate().peekable();

 while let Some((i, step)) = step_iter.next() {
 if ctx.debug {
 eprintln!("[debug] Executing step {}: {:?}", i + 1, step.description());
 }

 match self.execute_step(step, &mut journal)? {
 StepResult::Continue => {
 applied_steps.push(step.clone());
 // Write journal after each mutation
 if step.is_mutation() {
 journal.write(git_dir)?;
 }
 }
 StepResult::Pause { branch, git_state } => {
 // Record conflict in journal
 let remaining: Vec<PlanStep> = step_iter.map(|(_, s)| s.clone()).collect();
 let remaining_names: Vec<String> = remaining
.iter()
.filter_map(|s| {
 if let PlanStep::WriteMetadataCas { branch,.. } = s {
 Some(branch.clone())
 } else {
 None
 }
 })
.collect();

 journal.record_conflict_paused(
 &branch,
 git_state.description(),
 remaining_names,
 );
 journal.pause();
 journal.write(git_dir)?;

 // Update op-state to paused
 let mut op_state = OpState::from_journal(&journal);
 op_state.phase = OpPhase::Paused;
 op_state.write(git_dir)?;

 return Ok(ExecuteResult::Paused {
 branch,
 git_state,
 remaining_steps: remaining,
 });
 }
 StepResult::Abort { error } => {
 // Record abort in journal
 journal.rollback();
 journal.write(git_dir)?;

 // Record Aborted event
 let _ = ledger.append(Event::aborted(plan.op_id.as_str(), &error));

 // Clear op-state
 OpState::remove(git_dir)?;

 return Ok(ExecuteResult::Aborted {
 error,
 applied_steps,
 });
 }
 }
 }

 // Compute post-execution fingerprint
 let new_fp = self.compute_current_fingerprint()?;

 // Record Committed event
 if ctx.debug {
 eprintln!("[debug] Recording Committed event");
 }
 let _ = ledger.append(Event::committed(plan.op_id.as_str(), new_fp.as_str()));

 // Mark journal as committed
 journal.commit();
 journal.write(git_dir)?;

 // Clear op-state
 if ctx.debug {
 eprintln!("[debug] Clearing op-state marker");
 }
 OpState::remove(git_dir)?;

 Ok(ExecuteResult::Success {
 fingerprint: new_fp,
 })
 }

 /// Execute a single step.
 fn execute_step(
 &self,
 step: &PlanStep,
 journal: &mut Journal,
 ) -> Result<StepResult, ExecuteError> {
 match step {
 PlanStep::UpdateRefCas {
 refname,
 old_oid,
 new_oid,
 reason,
 } => {
 let new = Oid::new(new_oid).map_err(|e| ExecuteError::Internal(e.to_string()))?;
 let old = old_oid
.as_ref()
.map(Oid::new)
.transpose()
.map_err(|e| ExecuteError::Internal(e.to_string()))?;

 self.git
.update_ref_cas(refname, &new, old.as_ref(), reason)
.map_err(|e| match e {
 GitError::CasFailed {
 expected, actual,..
 } => ExecuteError::CasFailed {
 refname: refname.clone(),
 expected,
 actual,
 },
 other => ExecuteError::Git(other),
 })?;

 journal.record_ref_update(refname, old_oid.clone(), new_oid);
 Ok(StepResult::Continue)
 }

 PlanStep::DeleteRefCas {
 refname,
 old_oid,
 reason: _,
 } => {
 let old = Oid::new(old_oid).map_err(|e| ExecuteError::Internal(e.to_string()))?;

 self.git
.delete_ref_cas(refname, &old)
.map_err(|e| match e {
 GitError::CasFailed {
 expected, actual,..
 } => ExecuteError::CasFailed {
 refname: refname.clone(),
 expected,
 actual,
 },
 other => ExecuteError::Git(other),
 })?;

 journal.record_ref_update(refname, Some(old_oid.clone()), "");
 Ok(StepResult::Continue)
 }

 PlanStep::WriteMetadataCas {
 branch,
 old_ref_oid,
 metadata,
 } => {
 let store = MetadataStore::new(self.git);
 let branch_name =
 BranchName::new(branch).map_err(|e| ExecuteError::Internal(e.to_string()))?;

 let old = old_ref_oid
.as_ref()
.map(Oid::new)
.transpose()
.map_err(|e| ExecuteError::Internal(e.to_string()))?;

 let new_oid = store
.write_cas(&branch_name, old.as_ref(), metadata)
.map_err(|e| match e {
 StoreError::CasFailed { expected, actual } => ExecuteError::CasFailed {
 refname: format!("refs/branch-metadata/{}", branch),
 expected,
 actual,
 },
 other => ExecuteError::Metadata(other),
 })?;

 journal.record_metadata_write(branch, old_ref_oid.clone(), new_oid.to_string());
 Ok(StepResult::Continue)
 }

 PlanStep::DeleteMetadataCas {
 branch,
 old_ref_oid,
 } => {
 let store = MetadataStore::new(self.git);
 let branch_name =
 BranchName::new(branch).map_err(|e| ExecuteError::Internal(e.to_string()))?;
 let old =
 Oid::new(old_ref_oid).map_err(|e| ExecuteError::Internal(e.to_string()))?;

 store.delete_cas(&branch_name, &old).map_err(|e| match e {
 StoreError::CasFailed { expected, actual } => ExecuteError::CasFailed {
 refname: format!("refs/branch-metadata/{}", branch),
 expected,
 actual,
 },
 other => ExecuteError::Metadata(other),
 })?;

 journal.record_metadata_delete(branch, old_ref_oid);
 Ok(StepResult::Continue)
 }

 PlanStep::RunGit {
 args,
 description,
 expected_effects: _,
 } => {
 journal.record_git_process(args.clone(), description);

 // A conflicting rebase/merge/cherry-pick exits non-zero; that is
 // expected and not itself an error. Only a spawn failure (git not
 // on PATH, etc.) is. Whether we actually paused is decided by the
 // PotentialConflictPause marker that follows, which can name the
 // branch; this step cannot.
 self.git.run_subprocess(args)?;

 Ok(StepResult::Continue)
 }

 PlanStep::Checkpoint { name } => {
 journal.record_checkpoint(name);
 Ok(StepResult::Continue)
 }

 PlanStep::PotentialConflictPause {
 branch,
 git_operation: _,
 } => {
 let git_state = self.git.state();
 if git_state.is_in_progress() {
 return Ok(StepResult::Pause {
 branch: branch.clone(),
 git_state,
 });
 }
 Ok(StepResult::Continue)
 }
 }
 }

 /// Compute current fingerprint from repository state.
 fn compute_current_fingerprint(&self) -> Result<Fingerprint, ExecuteError> {
 use std::collections::HashMap;

 // Get branches
 let branch_list = self.git.list_branches().unwrap_or_default();
 let mut branches = HashMap::new();
 for branch in branch_list {
 if let Ok(oid) = self.git.resolve_ref(&format!("refs/heads/{}", branch)) {
 branches.insert(branch, oid);
 }
 }

 // Get metadata
 let store = MetadataStore::new(self.git);
 let metadata_refs = store.list_with_oids().unwrap_or_default();
 let mut metadata = HashMap::new();
 for (branch, oid) in metadata_refs {
 metadata.insert(
 branch,
 super::scan::ScannedMetadata {
 ref_oid: oid.clone(),
 metadata: crate::core::metadata::schema::BranchMetadataV1::new(
 BranchName::new("placeholder").unwrap(),
 BranchName::new("placeholder").unwrap(),
 oid,
 ),
 },
 );
 }

 Ok(compute_fingerprint(&branches, &metadata, None))
 }
}

/// Result of executing a single step.
#[allow(dead_code)] // Abort variant reserved for future use
enum StepResult {
 /// Step completed, continue to next.
 Continue,
 /// Step caused a conflict, pause for user.
 Pause { branch: String, git_state: GitState },
 /// Step failed, abort execution.
 Abort { error: String },
}

/// Execute a plan (convenience function).
///
/// This is a simpler interface when you just need to execute a plan
/// without creating an Executor struct.
pub fn execute(plan: &Plan, git: &Git, ctx: &Context) -> Result<ExecuteResult, ExecuteError> {
 let executor = Executor::new(git);
 executor.execute(plan, ctx)
}

#[cfg(test)]
mod tests {
 use super::*;

 mod execute_result {
 use super::*;

 #[test]
 fn success_is_success() {
 let result = ExecuteResult::Success {
 fingerprint: Fingerprint::compute(&[]),
 };
 assert!(result.is_success());
 assert!(!result.is_paused());
 assert!(!result.is_aborted());
 }

 #[test]
 fn paused_is_paused() {
 let result = ExecuteResult::Paused {
 branch: "feature".to_string(),
 git_state: GitState::Rebase {
 current: Some(1),
 total: Some(3),
 },
 remaining_steps: vec![],
 };
 assert!(!result.is_success());
 assert!(result.is_paused());
 assert!(!result.is_aborted());
 }

 #[test]
 fn aborted_is_aborted() {
 let result = ExecuteResult::Aborted {
 error: "CAS failed".to_string(),
 applied_steps: vec![],
 };
 assert!(!result.is_success());
 assert!(!result.is_paused());
 assert!(result.is_aborted());
 }
 }

 mod execute_error {
 use super::*;

 #[test]
 fn display_cas_failed() {
 let err = ExecuteError::CasFailed {
 refname: "refs/heads/main".to_string(),
 expected: "abc".to_string(),
 actual: "def".to_string(),
 };
 let msg = err.to_string();
 assert!(msg.contains("CAS failed"));
 assert!(msg.contains("refs/heads/main"));
 assert!(msg.contains("abc"));
 assert!(msg.contains("def"));
 }

 #[test]
 fn display_operation_in_progress() {
 let err = ExecuteError::OperationInProgress {
 command: "restack".to_string(),
 op_id: "abc-123".to_string(),
 };
 let msg = err.to_string();
 assert!(msg.contains("in progress"));
 assert!(msg.contains("restack"));
 assert!(msg.contains("abc-123"));
 }

 #[test]
 fn display_invalid_plan() {
 let err = ExecuteError::InvalidPlan("missing steps".to_string());
 let msg = err.to_string();
 assert!(msg.contains("invalid plan"));
 }
 }

 mod step_result {
 use super::*;

 #[test]
 fn constructible() {
 let _ = StepResult::Continue;
 let _ = StepResult::Pause {
 branch: "feature".to_string(),
 git_state: GitState::Clean,
 };
 let _ = StepResult::Abort {
 error: "test".to_string(),
 };
 }
 }
}
