//! continue and abort commands - Resume or cancel paused operations

use crate::cli::commands::restack::{build_restack_plan, get_parent_tip, topological_sort};
use crate::cli::exit::CliError;
use crate::core::metadata::schema::BaseInfo;
use crate::core::metadata::store::MetadataStore;
use crate::core::ops::journal::{Journal, OpPhase, OpState, StepKind};
use crate::core::types::BranchName;
use crate::engine::exec::{ExecuteResult, Executor};
use crate::engine::scan::scan;
use crate::engine::Context;
use crate::git::{Git, GitState};
use anyhow::{bail, Context as _, Result};
use std::process::Command;

/// Continue a paused operation after resolving conflicts.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `all` - Stage all changes before continuing
pub fn continue_op(ctx: &Context, all: bool) -> Result<()> {
    let cwd = ctx
        .cwd
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap());
    let git = Git::open(&cwd).context("Failed to open repository")?;
    let git_dir = git.git_dir();

    // Check for in-progress operation
    let op_state =
        OpState::read(git_dir)?.ok_or_else(|| anyhow::anyhow!("No operation in progress"))?;

    if op_state.phase != OpPhase::Paused {
        bail!(
            "Operation '{}' is not paused (phase: {:?})",
            op_state.command,
            op_state.phase
        );
    }

    // Check git state
    let git_state = git.state();
    if !git_state.is_in_progress() {
        // Git operation already completed somehow
        if !ctx.quiet {
            println!("Git operation appears to be complete. Cleaning up...");
        }
        OpState::remove(git_dir)?;
        return Ok(());
    }

    // Stage all if requested
    if all {
        let status = Command::new("git")
            .args(["add", "-A"])
            .current_dir(&cwd)
            .status()
            .context("Failed to run git add")?;

        if !status.success() {
            bail!("git add failed");
        }
    }

    // Continue the git operation
    let continue_args = match git_state {
        GitState::Rebase { .. } => vec!["rebase", "--continue"],
        GitState::Merge => vec!["merge", "--continue"],
        GitState::CherryPick => vec!["cherry-pick", "--continue"],
        GitState::Revert => vec!["revert", "--continue"],
        GitState::Bisect => bail!("Cannot continue a bisect operation with ridgeline"),
        GitState::ApplyMailbox => vec!["am", "--continue"],
        GitState::Clean => bail!("No git operation in progress"),
    };

    if !ctx.quiet {
        println!("Continuing {}...", op_state.command);
    }

    let status = Command::new("git")
        .args(&continue_args)
        .current_dir(&cwd)
        .status()
        .context("Failed to continue git operation")?;

    if !status.success() {
        // Check if still in conflict
        let new_state = git.state();
        if new_state.is_in_progress() {
            let message =
                "Conflicts remain. Resolve them and run 'rl continue' again.".to_string();
            println!();
            println!("{}", message);
            return Err(CliError::Conflict(message).into());
        }
        bail!("git {} failed", continue_args.join(" "));
    }

    // The git-level rebase/merge/cherry-pick that was paused has now completed.
    // If this was a multi-branch restack, finish the branch that just unblocked
    // and pick up any branches still queued behind it.
    let journal = Journal::read(git_dir, &op_state.op_id)?;
    let conflict = journal.steps.iter().rev().find_map(|step| match &step.kind {
        StepKind::ConflictPaused {
            branch,
            remaining_branches,
            ..
        } => Some((branch.clone(), remaining_branches.clone())),
        _ => None,
    });

    // The paused operation's own op-state is no longer relevant: the git-level
    // step it was blocked on just finished. Clear it before driving any further
    // restack work, which manages its own op-state/journal lifecycle.
    OpState::remove(git_dir)?;

    if let Some((paused_branch, remaining)) = conflict {
        resume_restack(ctx, &git, &paused_branch, &remaining)?;
    }

    if !ctx.quiet {
        println!("Operation '{}' completed.", op_state.command);
    }

    Ok(())
}

/// Finish a restack that paused mid-batch.
///
/// `paused_branch` just had its git-level rebase completed by `rl continue`;
/// its metadata still needs updating. `remaining` are the branches that were
/// queued behind it (in topological order) when the conflict was recorded.
fn resume_restack(ctx: &Context, git: &Git, paused_branch: &str, remaining: &[String]) -> Result<()> {
    let branch = BranchName::new(paused_branch)
        .map_err(|e| anyhow::anyhow!("Invalid branch name in continuation: {}", e))?;

    let snapshot = scan(git).context("Failed to rescan repository after continue")?;
    let trunk = snapshot
        .trunk()
        .ok_or_else(|| anyhow::anyhow!("trunk not configured"))?
        .clone();

    if let Some(scanned) = snapshot.metadata.get(&branch) {
        let parent_tip = get_parent_tip(&branch, &snapshot, &trunk)?;
        let mut updated = scanned.metadata.clone();
        updated.base = BaseInfo {
            oid: parent_tip.to_string(),
        };
        updated.timestamps.updated_at = crate::core::types::UtcTimestamp::now();

        let store = MetadataStore::new(git);
        store.write_cas(&branch, Some(&scanned.ref_oid), &updated)?;
    }

    if remaining.is_empty() {
        return Ok(());
    }

    let remaining_branches: Vec<BranchName> = remaining
        .iter()
        .filter_map(|b| BranchName::new(b).ok())
        .collect();

    // Re-scan so the just-written metadata (and anything else) is reflected,
    // then re-sort: topology shouldn't have changed, but this keeps the
    // invariant explicit rather than assumed.
    let snapshot = scan(git).context("Failed to rescan repository before resuming restack")?;
    let ordered = topological_sort(&remaining_branches, &snapshot);

    let plan = build_restack_plan(&ordered, &snapshot, &trunk, ctx.verify)
        .map_err(|e| anyhow::anyhow!("Failed to build continuation plan: {}", e))?;

    if plan.is_empty() {
        return Ok(());
    }

    let executor = Executor::new(git);
    match executor.execute(&plan, ctx)? {
        ExecuteResult::Success { .. } => Ok(()),
        ExecuteResult::Paused {
            branch, git_state, ..
        } => {
            let message = format!(
                "Conflict while restacking '{}' ({}).\nResolve conflicts, then run 'rl continue'.\nTo abort, run 'rl abort'.",
                branch,
                git_state.description()
            );
            println!();
            println!("{}", message);
            Err(CliError::Conflict(message).into())
        }
        ExecuteResult::Aborted { error, .. } => {
            Err(anyhow::anyhow!("Restack continuation failed: {}", error))
        }
    }
}

/// Abort a paused operation and restore pre-operation state.
pub fn abort(ctx: &Context) -> Result<()> {
    let cwd = ctx
        .cwd
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap());
    let git = Git::open(&cwd).context("Failed to open repository")?;
    let git_dir = git.git_dir();

    // Check for in-progress operation
    let op_state =
        OpState::read(git_dir)?.ok_or_else(|| anyhow::anyhow!("No operation in progress"))?;

    if !ctx.quiet {
        println!("Aborting {}...", op_state.command);
    }

    // Abort the git operation if any
    let git_state = git.state();
    let abort_args: Option<Vec<&str>> = match git_state {
        GitState::Rebase { .. } => Some(vec!["rebase", "--abort"]),
        GitState::Merge => Some(vec!["merge", "--abort"]),
        GitState::CherryPick => Some(vec!["cherry-pick", "--abort"]),
        GitState::Revert => Some(vec!["revert", "--abort"]),
        GitState::Bisect => Some(vec!["bisect", "reset"]),
        GitState::ApplyMailbox => Some(vec!["am", "--abort"]),
        GitState::Clean => None,
    };

    if let Some(args) = abort_args {
        let status = Command::new("git")
            .args(&args)
            .current_dir(&cwd)
            .status()
            .context("Failed to abort git operation")?;

        if !status.success() {
            eprintln!("Warning: git {} may have failed", args.join(" "));
        }
    }

    // Read journal to rollback ref changes
    // For now, we just clear the op-state
    // A full implementation would use journal.ref_updates_for_rollback()

    // Clear op-state
    OpState::remove(git_dir)?;

    if !ctx.quiet {
        println!("Operation '{}' aborted.", op_state.command);
    }

    Ok(())
}
