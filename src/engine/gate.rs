//! engine::gate
//!
//! Capability gating for command execution.
//!
//! # Architecture
//!
//! gating determines whether a command's
//! required capabilities are satisfied. Each command declares its requirement
//! set. If requirements are met, gating produces a `ReadyContext`. If not,
//! it produces a `RepairBundle` for the Doctor.
//!
//! **Key insight:** There is no global "repo is valid" boolean. Each command
//! has its own validation contract. Read-only commands may run with fewer
//! capabilities than mutating commands.
//!
//! # Invariants
//!
//! - Gating never produces a ReadyContext when requirements are not met
//! - Gating is deterministic given the same snapshot
//! - A missing capability always maps to one or more blocking issues
//!
//! # Example
//!
//! ```ignore
//! use ridgeline::engine::gate::{gate, requirements};
//! use ridgeline::engine::scan::scan;
//!
//! let snapshot = scan(&git)?;
//!
//! match gate(&snapshot, &requirements::MUTATING) {
//! GateResult::Ready(ctx) => {
//! // Proceed with planning and execution
//! }
//! GateResult::NeedsRepair(bundle) => {
//! // Hand off to Doctor
//! for issue in &bundle.blocking_issues {
//! println!("Blocking: {}", issue.message);
//! }
//! }
//! }
//! ```

use super::capabilities::{Capability, CapabilitySet};
use super::health::Issue;
use super::scan::RepoSnapshot;
use crate::core::types::BranchName;

/// Requirements for a command to execute.
///
/// Each command declares its required capabilities. Gating checks if
/// the snapshot's capabilities satisfy these requirements.
#[derive(Debug, Clone)]
pub struct RequirementSet {
 /// Required capabilities for this command type.
 pub capabilities: &'static [Capability],
 /// Human-readable name for this requirement set.
 pub name: &'static str,
}

impl RequirementSet {
 /// Create a new requirement set.
 pub const fn new(name: &'static str, capabilities: &'static [Capability]) -> Self {
 Self { capabilities, name }
 }

 /// Check if all requirements are satisfied.
 pub fn satisfied_by(&self, caps: &CapabilitySet) -> bool {
 caps.has_all(self.capabilities)
 }

 /// Get the missing capabilities.
 pub fn missing(&self, caps: &CapabilitySet) -> Vec<Capability> {
 caps.missing(self.capabilities)
 }
}

/// Predefined requirement sets for common command categories.
pub mod requirements {
 use super::*;

 /// Requirements for read-only commands (log, info, parent, children).
 ///
 /// These commands only need the repository to be accessible.
 /// Works in bare repositories.
 pub const READ_ONLY: RequirementSet = RequirementSet::new("read-only", &[Capability::RepoOpen]);

 /// Requirements for commands that read stack structure (checkout, up, down).
 ///
 /// These need metadata and graph to be valid but don't require
 /// absence of in-progress operations.
 ///
 /// Per Category C, navigation commands require a working
 /// directory and do NOT work in bare repositories.
 pub const NAVIGATION: RequirementSet = RequirementSet::new(
 "navigation",
 &[
 Capability::RepoOpen,
 Capability::TrunkKnown,
 Capability::MetadataReadable,
 Capability::GraphValid,
 Capability::WorkingDirectoryAvailable,
 ],
 );

 /// Requirements for mutating commands (create, restack, modify, fold, etc.).
 ///
 /// These require no in-progress operations, a valid graph, and a working
 /// directory (since they modify the working tree).
 ///
 /// Per Category C, these commands do NOT work in bare
 /// repositories.
 pub const MUTATING: RequirementSet = RequirementSet::new(
 "mutating",
 &[
 Capability::RepoOpen,
 Capability::TrunkKnown,
 Capability::NoRidgelineOpInProgress,
 Capability::NoExternalGitOpInProgress,
 Capability::MetadataReadable,
 Capability::GraphValid,
 Capability::FrozenPolicySatisfied,
 Capability::WorkingDirectoryAvailable,
 ],
 );

 /// Requirements for metadata-only mutating commands (track, untrack, freeze, unfreeze).
 ///
 /// These modify only metadata refs, not the working tree or branch tips.
 ///
 /// Per Category B, these commands work in bare repositories.
 pub const MUTATING_METADATA_ONLY: RequirementSet = RequirementSet::new(
 "mutating-metadata-only",
 &[
 Capability::RepoOpen,
 Capability::TrunkKnown,
 Capability::NoRidgelineOpInProgress,
 Capability::NoExternalGitOpInProgress,
 Capability::MetadataReadable,
 Capability::GraphValid,
 Capability::FrozenPolicySatisfied,
 // Note: WorkingDirectoryAvailable NOT required
 ],
 );

 /// Requirements for remote commands (submit, sync, get).
 ///
 /// All of MUTATING plus remote and auth requirements.
 ///
 /// Per submit/sync/get may work in bare repos with
 /// restrictions (e.g., `--no-restack`, `--no-checkout`), but by default
 /// they require a working directory.
 pub const REMOTE: RequirementSet = RequirementSet::new(
 "remote",
 &[
 Capability::RepoOpen,
 Capability::TrunkKnown,
 Capability::NoRidgelineOpInProgress,
 Capability::NoExternalGitOpInProgress,
 Capability::MetadataReadable,
 Capability::GraphValid,
 Capability::FrozenPolicySatisfied,
 Capability::WorkingDirectoryAvailable,
 Capability::RemoteResolved,
 Capability::AuthAvailable,
 ],
 );

 /// Requirements for remote commands in bare repo mode.
 ///
 /// Per remote commands can work in bare repos
 /// when used with flags like `--no-restack` or `--no-checkout`.
 /// This requirement set is for those restricted modes.
 pub const REMOTE_BARE_ALLOWED: RequirementSet = RequirementSet::new(
 "remote-bare-allowed",
 &[
 Capability::RepoOpen,
 Capability::TrunkKnown,
 Capability::NoRidgelineOpInProgress,
 Capability::NoExternalGitOpInProgress,
 Capability::MetadataReadable,
 Capability::GraphValid,
 Capability::FrozenPolicySatisfied,
 // Note: WorkingDirectoryAvailable NOT required
 Capability::RemoteResolved,
 Capability::AuthAvailable,
 ],
 );

 /// Requirements for continue/abort commands.
 ///
 /// These specifically require a Ridgeline op to be in progress.
 pub const RECOVERY: RequirementSet = RequirementSet::new(
 "recovery",
 &[
 Capability::RepoOpen,
 // Note: Does NOT require NoRidgelineOpInProgress
 ],
 );

 /// Minimal requirements (just repo access).
 pub const MINIMAL: RequirementSet = RequirementSet::new("minimal", &[Capability::RepoOpen]);
}

/// Result of gating check.
#[derive(Debug)]
pub enum GateResult {
 /// Requirements satisfied, ready to execute.
 Ready(Box<ReadyContext>),
 /// Requirements not satisfied, needs repair.
 NeedsRepair(RepairBundle),
}

impl GateResult {
 /// Check if gating passed.
 pub fn is_ready(&self) -> bool {
 matches!(self, GateResult::Ready(_))
 }

 /// Unwrap the ready context, panicking if not ready.
 pub fn unwrap_ready(self) -> ReadyContext {
 match self {
 GateResult::Ready(ctx) => *ctx,
 GateResult::NeedsRepair(_) => panic!("called unwrap_ready on NeedsRepair"),
 }
 }

 /// Unwrap the repair bundle, panicking if ready.
 pub fn unwrap_repair(self) -> RepairBundle {
 match self {
 GateResult::Ready(_) => panic!("called unwrap_repair on Ready"),
 GateResult::NeedsRepair(bundle) => bundle,
 }
 }
}

/// A validated context indicating the command is ready to execute.
///
/// Contains the snapshot and any command-specific validated data
/// extracted during gating.
#[derive(Debug)]
pub struct ReadyContext {
 /// The scanned repository snapshot.
 pub snapshot: RepoSnapshot,
 /// Command-specific validated data.
 pub data: ValidatedData,
}

impl ReadyContext {
 /// Get the trunk branch.
 pub fn trunk(&self) -> Option<&BranchName> {
 self.snapshot.trunk()
 }

 /// Get the capabilities that were verified.
 pub fn capabilities(&self) -> &CapabilitySet {
 self.snapshot.health.capabilities()
 }
}

/// Command-specific validated data.
///
/// Different commands may need different validated data. This enum
/// provides type-safe access to command-specific information that
/// was validated during gating.
#[derive(Debug, Default)]
pub enum ValidatedData {
 /// No specific data needed.
 #[default]
 None,

 /// Stack scope for operations that affect multiple branches.
 StackScope {
 /// The trunk branch.
 trunk: BranchName,
 /// Branches in the scope (in topological order).
 branches: Vec<BranchName>,
 },

 /// Single branch target.
 SingleBranch {
 /// The target branch.
 branch: BranchName,
 },
}

/// Bundle of issues requiring repair.
///
/// Produced when gating fails. Contains the information needed
/// by Doctor to present fix options to the user.
#[derive(Debug)]
pub struct RepairBundle {
 /// The command that failed gating.
 pub command: String,
 /// Capabilities that are missing.
 pub missing_capabilities: Vec<Capability>,
 /// Issues that are blocking execution.
 pub blocking_issues: Vec<Issue>,
}

impl RepairBundle {
 /// Check if the bundle has any blocking issues.
 pub fn has_issues(&self) -> bool {
 !self.blocking_issues.is_empty()
 }

 /// Get a summary message.
 pub fn summary(&self) -> String {
 let n = self.blocking_issues.len();
 if n == 1 {
 format!("1 issue blocking {}", self.command)
 } else {
 format!("{} issues blocking {}", n, self.command)
 }
 }
}

/// Perform gating check for a command.
///
/// Checks if the snapshot's capabilities satisfy the requirement set.
/// If satisfied, returns a `ReadyContext`. If not, returns a `RepairBundle`.
///
/// # Arguments
///
/// * `snapshot` - The scanned repository snapshot
/// * `requirements` - The requirement set to check against
///
/// # Returns
///
/// `GateResult::Ready` if all requirements are satisfied,
/// `GateResult::NeedsRepair` otherwise.
///
/// # Example
///
/// ```ignore
/// let result = gate(snapshot, &requirements::MUTATING);
/// match result {
/// GateResult::Ready(ctx) => {
/// // Plan and execute
/// }
/// GateResult::NeedsRepair(bundle) => {
/// // Show issues to user
/// }
/// }
/// ```
pub fn gate(snapshot: RepoSnapshot, requirements: &RequirementSet) -> GateResult {
 let caps = snapshot.health.capabilities();

 if requirements.satisfied_by(caps) {
 GateResult::Ready(Box::new(ReadyContext {
 snapshot,
 data: ValidatedData::None,
 }))
 } else {
 let missing = requirements.missing(caps);

 // Collect blocking issues that relate to missing capabilities
 let blocking_issues: Vec<Issue> = snapshot.health.blocking_issues().cloned().collect();

 GateResult::NeedsRepair(RepairBundle {
 command: requirements.name.to_string(),
 missing_capabilities: missing,
 blocking_issues,
 })
 }
}

/// Gate with additional scope resolution.
///
/// For commands that operate on a scope of branches (like restack),
/// this resolves the scope and includes it in the validated data.
pub fn gate_with_scope(
 snapshot: RepoSnapshot,
 requirements: &RequirementSet,
 target: Option<&BranchName>,
) -> GateResult {
 // First do basic gating
 let caps = snapshot.health.capabilities();

 if !requirements.satisfied_by(caps) {
 let missing = requirements.missing(caps);
 let blocking_issues: Vec<Issue> = snapshot.health.blocking_issues().cloned().collect();

 return GateResult::NeedsRepair(RepairBundle {
 command: requirements.name.to_string(),
 missing_capabilities: missing,
 blocking_issues,
 });
 }

 // Resolve scope
 let trunk = match snapshot.trunk() {
 Some(t) => t.clone(),
 None => {
 // This shouldn't happen if TrunkKnown capability is satisfied
 return GateResult::NeedsRepair(RepairBundle {
 command: requirements.name.to_string(),
 missing_capabilities: vec![Capability::TrunkKnown],
 blocking_issues: vec![],
 });
 }
 };

 // Determine target branch
 let target_branch = target.cloned().or_else(|| snapshot.current_branch.clone());

 let data = match target_branch {
 Some(branch) => {
 // All branches in scope: the target plus everything upstack
 // (descendants), in deterministic pre-order with stable name tie-break.
 let mut branches = Vec::new();
 let mut stack = vec![branch.clone()];
 let mut seen = std::collections::HashSet::new();
 while let Some(current) = stack.pop() {
 if !seen.insert(current.clone()) {
 continue;
 }
 branches.push(current.clone());
 if let Some(children) = snapshot.graph.children(&current) {
 let mut sorted: Vec<_> = children.iter().cloned().collect();
 sorted.sort();
 stack.extend(sorted.into_iter().rev());
 }
 }
 ValidatedData::StackScope { trunk, branches }
 }
 None => ValidatedData::StackScope {
 trunk,
 branches: vec![],
 },
 };

 GateResult::Ready(Box::new(ReadyContext { snapshot, data }))
}
