//! cli::commands::merge
//!
//! Merge PRs via the forge API while preserving stack topology.
//!
//! # Design
//!
//! The merge command:
//! - Builds an ordered step plan with `core::merge::build_merge_plan`:
//!   `MergePr` for each requested branch, then (if anything actually
//!   merged) `PullTrunk`, `Restack`/`UpdatePrBase` for surviving
//!   descendants whose local parent was merged, and `DeleteBranch` last.
//! - Re-validates each step's precondition immediately before acting on
//!   it rather than trusting the plan snapshot, since merging is a
//!   multi-step remote operation and state can change mid-run (a PR
//!   merged by someone else, a branch deleted out from under us).
//! - Stops on the first step that fails, leaving already-merged PRs
//!   merged and suggesting `rl sync` to reconcile local state.
//!
//! # Architecture
//!
//! Gating runs through the `AsyncCommand`/`run_async_command` lifecycle
//! the same way every other async command does (Scan -> Gate), but the
//! plan it produces is never executed through the sync `Executor`: a
//! forge merge is a network call, not a `PlanStep`, so execution happens
//! in `execute_merge_plan` against a fresh `core::merge::MergeStep` list
//! built from the post-gate snapshot.
//!
//! Local mutations (trunk pull, restack, branch delete) reuse the same
//! machinery the standalone `restack`/`delete` commands use: restacks go
//! through `build_restack_plan` + `Executor`, deletes go through
//! `MetadataStore::delete_cas` plus a forced `git branch -D`.
//!
//! # Example
//!
//! ```bash
//! # Merge PRs in stack
//! ridgeline merge
//!
//! # Dry run
//! ridgeline merge --dry-run
//!
//! # Use squash merge
//! ridgeline merge --method squash
//! ```

use crate::cli::args::MergeMethodArg;
use crate::cli::commands::auth::get_github_token;
use crate::cli::commands::restack::{build_restack_plan, topological_sort};
use crate::core::merge::{build_merge_plan, MergeStep, MergeStrategy};
use crate::core::metadata::schema::PrState;
use crate::core::metadata::store::MetadataStore;
use crate::core::ops::journal::OpId;
use crate::core::types::BranchName;
use crate::engine::command::{AsyncCommand, CommandOutput, PlanFut};
use crate::engine::exec::{ExecuteResult, Executor};
use crate::engine::gate::{requirements, ReadyContext, RequirementSet};
use crate::engine::plan::{Plan, PlanError};
use crate::engine::scan::scan;
use crate::engine::Context;
use crate::forge::{create_forge, Forge, MergeMethod, UpdatePrRequest};
use anyhow::{bail, Context as _, Result};
use std::process::Command;

/// Result of a merge operation.
#[derive(Debug, Default)]
pub struct MergeResult {
    /// Number of PRs merged.
    pub merged_count: usize,
    /// Branches that were merged.
    pub merged_branches: Vec<BranchName>,
}

/// The merge command.
///
/// Gating-only: this produces an empty plan since the real merge steps
/// are network calls, not `PlanStep`s. `execute_merge_plan` does the work.
pub struct MergeCommand {
    /// Merge method to use.
    merge_method: MergeMethod,
    /// Merge furthest-from-trunk branch first.
    strategy: MergeStrategy,
    /// Merge closed/draft PRs and skip cached-status checks.
    force: bool,
}

impl MergeCommand {
    /// Create a new merge command.
    pub fn new(method: Option<MergeMethodArg>, top_down: bool, force: bool) -> Self {
        let merge_method = match method {
            Some(MergeMethodArg::Merge) => MergeMethod::Merge,
            Some(MergeMethodArg::Squash) => MergeMethod::Squash,
            Some(MergeMethodArg::Rebase) => MergeMethod::Rebase,
            None => MergeMethod::Squash,
        };
        let strategy = if top_down {
            MergeStrategy::TopDown
        } else {
            MergeStrategy::BottomUp
        };

        Self {
            merge_method,
            strategy,
            force,
        }
    }
}

impl AsyncCommand for MergeCommand {
    const REQUIREMENTS: &'static RequirementSet = &requirements::REMOTE_BARE_ALLOWED;
    type Output = MergeResult;

    fn plan<'a>(&'a self, ready: &'a ReadyContext) -> PlanFut<'a> {
        Box::pin(async move {
            let current = ready
                .snapshot
                .current_branch
                .as_ref()
                .ok_or_else(|| PlanError::InvalidState("Not on a branch".to_string()))?;

            let mergeable = mergeable_stack(current, &ready.snapshot);
            if mergeable.is_empty() {
                return Err(PlanError::InvalidState(
                    "No PRs to merge. Run 'rl submit' first.".to_string(),
                ));
            }

            // Validate the plan builds (closed/draft PRs surface here), but
            // don't keep the steps: execute_merge_plan rebuilds them from a
            // fresh scan right before acting, since merging spans several
            // round trips to the forge.
            build_merge_plan(
                &mergeable,
                &ready.snapshot,
                self.merge_method,
                self.strategy,
                self.force,
            )
            .map_err(|e| PlanError::InvalidState(e.to_string()))?;

            Ok(Plan::new(OpId::new(), "merge"))
        })
    }

    fn finish(&self, result: ExecuteResult) -> CommandOutput<Self::Output> {
        match result {
            ExecuteResult::Success { .. } => CommandOutput::Success(MergeResult::default()),
            ExecuteResult::Paused { branch, .. } => CommandOutput::Paused {
                message: format!(
                    "Merge paused at '{}'. This shouldn't happen for merge operations.",
                    branch
                ),
            },
            ExecuteResult::Aborted { error, .. } => CommandOutput::Failed { error },
        }
    }
}

/// Branches from trunk to `current` (inclusive) that have a linked PR.
fn mergeable_stack(
    current: &BranchName,
    snapshot: &crate::engine::scan::RepoSnapshot,
) -> Vec<BranchName> {
    let mut stack = snapshot.graph.ancestors(current);
    stack.reverse(); // bottom-up: trunk-adjacent first
    stack.push(current.clone());

    stack
        .into_iter()
        .filter(|b| {
            snapshot
                .metadata
                .get(b)
                .map(|m| matches!(m.metadata.pr, PrState::Linked { .. }))
                .unwrap_or(false)
        })
        .collect()
}

/// Run the merge command.
///
/// This is a synchronous wrapper that uses tokio to run the async implementation.
pub fn merge(
    ctx: &Context,
    _confirm: bool,
    dry_run: bool,
    method: Option<MergeMethodArg>,
    top_down: bool,
    force: bool,
) -> Result<()> {
    let cwd = ctx
        .cwd
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap());
    let git = crate::git::Git::open(&cwd).context("Failed to open repository")?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(merge_impl(&git, ctx, dry_run, method, top_down, force))
}

/// Async implementation of merge using the engine lifecycle.
async fn merge_impl(
    git: &crate::git::Git,
    ctx: &Context,
    dry_run: bool,
    method: Option<MergeMethodArg>,
    top_down: bool,
    force: bool,
) -> Result<()> {
    use crate::engine::runner::run_async_command;

    let command = MergeCommand::new(method, top_down, force);

    // Scan -> Gate -> Plan (plan is empty; it only exists to validate
    // preconditions through build_merge_plan before anything is touched).
    let result = run_async_command(&command, git, ctx).await;

    match result {
        Ok(CommandOutput::Success(_)) => {
            execute_merge_plan(
                git,
                ctx,
                dry_run,
                command.merge_method,
                command.strategy,
                force,
            )
            .await
        }
        Ok(CommandOutput::Paused { message }) => bail!("Unexpected pause: {}", message),
        Ok(CommandOutput::Failed { error }) => bail!("{}", error),
        Err(e) => bail!("Merge failed: {}", e),
    }
}

/// Build and execute the merge plan against the forge and local repository.
///
/// Re-scans immediately before acting (gating already validated
/// requirements) and re-validates each step's precondition right before
/// performing it, since a full merge run spans multiple network round
/// trips during which remote state can move.
async fn execute_merge_plan(
    git: &crate::git::Git,
    ctx: &Context,
    dry_run: bool,
    method: MergeMethod,
    strategy: MergeStrategy,
    force: bool,
) -> Result<()> {
    let snapshot = scan(git)?;

    let current = snapshot
        .current_branch
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Not on a branch."))?;

    let mergeable = mergeable_stack(current, &snapshot);
    if mergeable.is_empty() {
        bail!("No PRs to merge. Run 'rl submit' first.");
    }

    let steps = build_merge_plan(&mergeable, &snapshot, method, strategy, force)
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    if dry_run {
        print_dry_run(&steps, method);
        return Ok(());
    }

    let token = get_github_token()?;
    let remote_url = git
        .remote_url("origin")?
        .ok_or_else(|| anyhow::anyhow!("No 'origin' remote configured."))?;
    let forge = create_forge(&remote_url, &token, None)?;

    let mut merged_count = 0usize;
    let mut merged_branches = Vec::new();

    for step in &steps {
        match step {
            MergeStep::MergePr {
                branch,
                number,
                method,
            } => {
                // Re-validate immediately before merging: someone else may
                // have closed or merged this PR since the plan was built.
                let pr = forge
                    .get_pr(*number)
                    .await
                    .with_context(|| format!("Failed to refresh PR #{} before merge", number))?;

                match pr.state {
                    crate::forge::PrState::Merged => {
                        if !ctx.quiet {
                            println!("PR #{} ({}) is already merged.", number, branch);
                        }
                    }
                    crate::forge::PrState::Closed if !force => {
                        bail!(
                            "PR #{} for '{}' was closed since planning. Stopping. Run 'rl sync' to update state.",
                            number, branch
                        );
                    }
                    _ => {
                        if !ctx.quiet {
                            println!("Merging PR #{} ({})...", number, branch);
                        }
                        forge.merge_pr(*number, *method).await.with_context(|| {
                            format!("Failed to merge PR #{} ({})", number, branch)
                        })?;
                        merged_count += 1;
                        merged_branches.push(branch.clone());
                        if !ctx.quiet {
                            println!("  Merged successfully.");
                        }
                    }
                }
            }

            MergeStep::PullTrunk => {
                pull_trunk(git, &snapshot, ctx)?;
            }

            MergeStep::Restack { branch } => {
                restack_one(git, ctx, branch)?;
            }

            MergeStep::UpdatePrBase { branch, new_base } => {
                let rescanned = scan(git)?;
                if let Some(scanned) = rescanned.metadata.get(branch) {
                    if let PrState::Linked { number, .. } = &scanned.metadata.pr {
                        forge
                            .update_pr(UpdatePrRequest {
                                number: *number,
                                base: Some(new_base.to_string()),
                                ..Default::default()
                            })
                            .await
                            .with_context(|| {
                                format!("Failed to update PR base for '{}'", branch)
                            })?;
                    }
                }
            }

            MergeStep::DeleteBranch { branch } => {
                delete_merged_branch(git, ctx, branch)?;
            }
        }
    }

    if !ctx.quiet {
        if merged_count > 0 {
            let names: Vec<&str> = merged_branches.iter().map(|b| b.as_str()).collect();
            println!("\n{} PR(s) merged: {}", merged_count, names.join(", "));
            println!("Run 'rl sync' to update local state.");
        } else {
            println!("\nNothing to merge.");
        }
    }

    Ok(())
}

fn print_dry_run(steps: &[MergeStep], method: MergeMethod) {
    println!("Would perform the following using {} method:", method);
    for step in steps {
        match step {
            MergeStep::MergePr { branch, number, .. } => {
                println!("  merge    PR #{} ({})", number, branch)
            }
            MergeStep::PullTrunk => println!("  pull     trunk (fetch merged commits)"),
            MergeStep::Restack { branch } => println!("  restack  {}", branch),
            MergeStep::UpdatePrBase { branch, new_base } => {
                println!("  rebase   {}'s PR base onto {}", branch, new_base)
            }
            MergeStep::DeleteBranch { branch } => println!("  delete   {}", branch),
        }
    }
}

/// Fast-forward local trunk to origin/trunk after a merge lands upstream.
fn pull_trunk(
    git: &crate::git::Git,
    snapshot: &crate::engine::scan::RepoSnapshot,
    ctx: &Context,
) -> Result<()> {
    let trunk = snapshot
        .trunk
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("trunk not configured"))?;
    let cwd = ctx
        .cwd
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap());

    if !ctx.quiet {
        println!("Pulling merged commits into '{}'...", trunk);
    }

    let fetch_status = Command::new("git")
        .current_dir(&cwd)
        .args(["fetch", "origin", trunk.as_str()])
        .status()
        .context("Failed to run git fetch")?;
    if !fetch_status.success() {
        bail!("git fetch failed");
    }

    let remote_trunk = format!("refs/remotes/origin/{}", trunk);
    let remote_oid = git
        .resolve_ref(&remote_trunk)
        .with_context(|| format!("origin/{} not found after fetch", trunk))?;
    let local_trunk = format!("refs/heads/{}", trunk);
    let local_oid = git.resolve_ref(&local_trunk)?;

    if local_oid == remote_oid {
        return Ok(());
    }

    if !git.is_ancestor(&local_oid, &remote_oid)? {
        bail!(
            "Local trunk '{}' has diverged from origin; run 'rl sync' to reconcile.",
            trunk
        );
    }

    let update_status = Command::new("git")
        .current_dir(&cwd)
        .args(["update-ref", &local_trunk, remote_oid.as_str()])
        .status()
        .context("Failed to fast-forward trunk")?;
    if !update_status.success() {
        bail!("Failed to update local '{}' ref", trunk);
    }

    Ok(())
}

/// Restack a single branch onto its current parent tip, reusing the
/// restack engine's plan builder and executor.
fn restack_one(git: &crate::git::Git, ctx: &Context, branch: &BranchName) -> Result<()> {
    let snapshot = scan(git)?;
    let trunk = snapshot
        .trunk
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("trunk not configured"))?
        .clone();

    let ordered = topological_sort(std::slice::from_ref(branch), &snapshot);
    let plan = build_restack_plan(&ordered, &snapshot, &trunk, ctx.verify)
        .map_err(|e| anyhow::anyhow!("Failed to build restack plan for '{}': {}", branch, e))?;

    if plan.is_empty() {
        return Ok(());
    }

    let executor = Executor::new(git);
    match executor.execute(&plan, ctx)? {
        ExecuteResult::Success { .. } => Ok(()),
        ExecuteResult::Paused {
            branch: paused,
            git_state,
            ..
        } => {
            let message = format!(
                "Conflict while restacking '{}' ({}) after merge.\nResolve conflicts, then run 'rl continue'.\nTo abort, run 'rl abort'.",
                paused,
                git_state.description()
            );
            println!();
            println!("{}", message);
            Err(crate::cli::exit::CliError::Conflict(message).into())
        }
        ExecuteResult::Aborted { error, .. } => {
            Err(anyhow::anyhow!("Restack after merge failed: {}", error))
        }
    }
}

/// Delete a merged branch's local ref and metadata.
fn delete_merged_branch(git: &crate::git::Git, ctx: &Context, branch: &BranchName) -> Result<()> {
    let snapshot = scan(git)?;
    let cwd = ctx
        .cwd
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap());

    if snapshot.current_branch.as_ref() == Some(branch) {
        let trunk = snapshot
            .trunk
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("trunk not configured"))?;
        let status = Command::new("git")
            .args(["checkout", trunk.as_str()])
            .current_dir(&cwd)
            .status()
            .context("Failed to checkout trunk before deleting merged branch")?;
        if !status.success() {
            bail!("git checkout failed");
        }
    }

    let status = Command::new("git")
        .args(["branch", "-D", branch.as_str()])
        .current_dir(&cwd)
        .status()
        .with_context(|| format!("Failed to delete branch '{}'", branch))?;
    if !status.success() {
        eprintln!("Warning: failed to delete local branch '{}'", branch);
    }

    if let Some(scanned) = snapshot.metadata.get(branch) {
        let store = MetadataStore::new(git);
        store
            .delete_cas(branch, &scanned.ref_oid)
            .with_context(|| format!("Failed to delete metadata for '{}'", branch))?;
    }

    if !ctx.quiet {
        println!("  Deleted '{}'", branch);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn merge_method_conversion() {
        use crate::forge::MergeMethod;

        let m: MergeMethod = MergeMethod::Squash;
        assert_eq!(format!("{}", m), "squash");
    }
}
