//! engine::plan
//!
//! Deterministic plan generation.
//!
//! # Architecture
//!
//! Per plans are the sole intermediate
//! representation between validated state and repository mutation.
//!
//! Plans are:
//! - **Deterministic**: Same input always produces the same plan
//! - **Previewable**: Can be shown to user before execution
//! - **Serializable**: Can be recorded in journals for recovery
//! - **Typed**: Steps are strongly typed with explicit touched refs
//!
//! # Invariants
//!
//! - Planner does not perform I/O
//! - Planner does not mutate any state
//! - Plans are pure data structures
//! - All ref mutations in steps include expected old OIDs for CAS
//!
//! # Example
//!
//! ```
//! use ridgeline::engine::plan::{Plan, PlanStep};
//! use ridgeline::core::ops::journal::OpId;
//!
//! let plan = Plan::new(OpId::new(), "restack")
//!.with_step(PlanStep::Checkpoint {
//! name: "start".to_string(),
//! })
//!.with_step(PlanStep::UpdateRefCas {
//! refname: "refs/heads/feature".to_string(),
//! old_oid: Some("abc123...".to_string()),
//! new_oid: "def456...".to_string(),
//! reason: "rebase onto main".to_string(),
//! });
//!
//! assert!(!plan.is_empty());
//! assert_eq!(plan.steps.len(), 2);
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::gate::ReadyContext;
use crate::core::metadata::schema::BranchMetadataV1;
use crate::core::ops::journal::OpId;

/// A typed plan step.
///
/// Each step represents an atomic operation that the executor will apply.
/// Steps include all information needed for CAS validation and rollback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanStep {
 /// Update a ref with CAS semantics.
 ///
 /// The update only succeeds if the ref's current value matches `old_oid`.
 UpdateRefCas {
 /// Full ref name (e.g., "refs/heads/feature").
 refname: String,
 /// Expected current OID, or None if creating.
 old_oid: Option<String>,
 /// New OID to set.
 new_oid: String,
 /// Human-readable reason for the update.
 reason: String,
 },

 /// Delete a ref with CAS semantics.
 ///
 /// The delete only succeeds if the ref's current value matches `old_oid`.
 DeleteRefCas {
 /// Full ref name.
 refname: String,
 /// Expected current OID.
 old_oid: String,
 /// Human-readable reason for deletion.
 reason: String,
 },

 /// Write metadata with CAS semantics.
 ///
 /// Creates or updates a branch's metadata ref.
 WriteMetadataCas {
 /// Branch name.
 branch: String,
 /// Expected current metadata ref OID, or None if creating.
 old_ref_oid: Option<String>,
 /// The metadata to write (boxed to reduce enum size).
 metadata: Box<BranchMetadataV1>,
 },

 /// Delete metadata with CAS semantics.
 DeleteMetadataCas {
 /// Branch name.
 branch: String,
 /// Expected current metadata ref OID.
 old_ref_oid: String,
 },

 /// Run a git command.
 ///
 /// For operations that require invoking git (rebase, merge, etc.).
 RunGit {
 /// Git command arguments (excluding "git" itself).
 args: Vec<String>,
 /// Human-readable description of what the command does.
 description: String,
 /// Refs that are expected to change.
 expected_effects: Vec<String>,
 },

 /// Checkpoint marker for recovery.
 ///
 /// Used to mark significant points in multi-step operations.
 /// If execution is interrupted, recovery knows where to resume.
 Checkpoint {
 /// Checkpoint name for identification.
 name: String,
 },

 /// Pause for conflict resolution.
 ///
 /// Indicates that the operation may pause here for user intervention.
 /// Used after RunGit steps that may produce conflicts.
 PotentialConflictPause {
 /// Branch where conflict may occur.
 branch: String,
 /// Git operation that may conflict.
 git_operation: String,
 },
}

impl PlanStep {
 /// Get the refs touched by this step.
 ///
 /// Returns refs that will be read or modified by this step.
 pub fn touched_refs(&self) -> Vec<&str> {
 match self {
 PlanStep::UpdateRefCas { refname,.. } => vec![refname.as_str()],
 PlanStep::DeleteRefCas { refname,.. } => vec![refname.as_str()],
 PlanStep::WriteMetadataCas { branch: _,.. } => {
 // Metadata ref name
 vec![] // Would need to construct; simplified for now
 }
 PlanStep::DeleteMetadataCas { branch: _,.. } => {
 vec![]
 }
 PlanStep::RunGit {
 expected_effects,..
 } => expected_effects.iter().map(|s| s.as_str()).collect(),
 PlanStep::Checkpoint {.. } => vec![],
 PlanStep::PotentialConflictPause {.. } => vec![],
 }
 }

 /// Check if this step modifies refs (as opposed to being a marker).
 pub fn is_mutation(&self) -> bool {
 matches!(
 self,
 PlanStep::UpdateRefCas {.. }
 | PlanStep::DeleteRefCas {.. }
 | PlanStep::WriteMetadataCas {.. }
 | PlanStep::DeleteMetadataCas {.. }
 | PlanStep::RunGit {.. }
 )
 }

 /// Get a human-readable description of this step.
 pub fn description(&self) -> String {
 match self {
 PlanStep::UpdateRefCas {
 refname, reason,..
 } => {
 format!("Update {}: {}", refname, reason)
 }
 PlanStep::DeleteRefCas {
 refname, reason,..
 } => {
 format!("Delete {}: {}", refname, reason)
 }
 PlanStep::WriteMetadataCas { branch,.. } => {
 format!("Write metadata for {}", branch)
 }
 PlanStep::DeleteMetadataCas { branch,.. } => {
 format!("Delete metadata for {}", branch)
 }
 PlanStep::RunGit { description,.. } => description.clone(),
 PlanStep::Checkpoint { name } => format!("Checkpoint: {}", name),
 PlanStep::PotentialConflictPause {
 branch,
 git_operation,
 } => {
 format!("May pause for {} conflict on {}", git_operation, branch)
 }
 }
 }
}

/// A complete execution plan.
///
/// Contains all information needed for the executor to apply changes
/// to the repository. Plans are immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
 /// Operation ID for journal correlation.
 pub op_id: OpId,
 /// Command that generated this plan.
 pub command: String,
 /// Ordered steps to execute.
 pub steps: Vec<PlanStep>,
 /// All refs that will be touched (for CAS validation).
 touched_refs: Vec<String>,
 /// Pre-computed digest for integrity checking.
 #[serde(skip)]
 digest_cache: Option<String>,
}

impl Plan {
 /// Create a new empty plan.
 ///
 /// # Example
 ///
 /// ```
 /// use ridgeline::engine::plan::Plan;
 /// use ridgeline::core::ops::journal::OpId;
 ///
 /// let plan = Plan::new(OpId::new(), "restack");
 /// assert!(plan.is_empty());
 /// ```
 pub fn new(op_id: OpId, command: impl Into<String>) -> Self {
 Self {
 op_id,
 command: command.into(),
 steps: vec![],
 touched_refs: vec![],
 digest_cache: None,
 }
 }

 /// Add a step to the plan (builder pattern).
 pub fn with_step(mut self, step: PlanStep) -> Self {
 // Collect touched refs
 for r in step.touched_refs() {
 if !self.touched_refs.contains(&r.to_string()) {
 self.touched_refs.push(r.to_string());
 }
 }
 self.steps.push(step);
 self.digest_cache = None; // Invalidate cache
 self
 }

 /// Add multiple steps.
 pub fn with_steps(mut self, steps: impl IntoIterator<Item = PlanStep>) -> Self {
 for step in steps {
 self = self.with_step(step);
 }
 self
 }

 /// Compute a digest of the plan for integrity checking.
 ///
 /// The digest is a SHA-256 hash of the canonical JSON serialization.
 /// This allows verifying that a plan hasn't been modified.
 ///
 /// # Example
 ///
 /// ```
 /// use ridgeline::engine::plan::{Plan, PlanStep};
 /// use ridgeline::core::ops::journal::OpId;
 ///
 /// let plan = Plan::new(OpId::new(), "test")
 ///.with_step(PlanStep::Checkpoint { name: "start".to_string() });
 ///
 /// let digest = plan.digest();
 /// assert!(digest.starts_with("sha256:"));
 /// ```
 pub fn digest(&self) -> String {
 // Use cached value if available
 if let Some(ref cached) = self.digest_cache {
 return cached.clone();
 }

 // Compute digest from canonical JSON
 let json = serde_json::to_string(&self).unwrap_or_default();
 let mut hasher = Sha256::new();
 hasher.update(json.as_bytes());
 let hash = hasher.finalize();
 format!("sha256:{}", hex::encode(hash))
 }

 /// Check if the plan is empty (no-op).
 pub fn is_empty(&self) -> bool {
 self.steps.is_empty()
 }

 /// Check if the plan has any mutation steps.
 pub fn has_mutations(&self) -> bool {
 self.steps.iter().any(|s| s.is_mutation())
 }

 /// Get the number of steps.
 pub fn step_count(&self) -> usize {
 self.steps.len()
 }

 /// Get the number of mutation steps.
 pub fn mutation_count(&self) -> usize {
 self.steps.iter().filter(|s| s.is_mutation()).count()
 }

 /// Get all touched refs.
 pub fn touched_refs(&self) -> &[String] {
 &self.touched_refs
 }

 /// Generate a preview string for user confirmation.
 ///
 /// Returns a human-readable description of what the plan will do.
 pub fn preview(&self) -> String {
 if self.is_empty() {
 return format!("{}: No changes needed", self.command);
 }

 let mut lines = vec![format!("{}:", self.command)];

 for (i, step) in self.steps.iter().enumerate() {
 lines.push(format!(" {}. {}", i + 1, step.description()));
 }

 lines.join("\n")
 }

 /// Get an iterator over mutation steps only.
 pub fn mutations(&self) -> impl Iterator<Item = &PlanStep> {
 self.steps.iter().filter(|s| s.is_mutation())
 }
}

impl PartialEq for Plan {
 fn eq(&self, other: &Self) -> bool {
 self.op_id == other.op_id && self.command == other.command && self.steps == other.steps
 }
}

/// Errors from plan generation.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
 /// Invalid state for planning.
 #[error("invalid state for planning: {0}")]
 InvalidState(String),

 /// Missing required data.
 #[error("missing required data: {0}")]
 MissingData(String),

 /// Conflict with frozen branch.
 #[error("cannot modify frozen branch: {0}")]
 FrozenBranch(String),
}

/// Plan the hello command.
///
/// The hello command has no actual steps - it's just a lifecycle validation.
/// This is kept for Milestone 0 compatibility.
pub fn plan_hello(ready: &ReadyContext) -> Result<Plan, PlanError> {
 let _ = ready; // Not used for hello
 Ok(Plan::new(OpId::new(), "hello"))
}
