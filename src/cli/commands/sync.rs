//! cli::commands::sync
//!
//! Sync with remote (fetch, update trunk, reconcile and clean up merged
//! branches, optionally restack the survivors).
//!
//! # Design
//!
//! - Fetches from remote and fast-forwards trunk (or resets with `--force`
//!   when trunk has diverged).
//! - Fetches PR state for every tracked branch with a linked PR, and
//!   reconciles each branch's locally recorded parent against the PR's
//!   reported base: the local parent wins unless it no longer exists, or
//!   the remote base is strictly more specific (sits between the local
//!   parent and the branch) and the branch carries no commits the
//!   candidate doesn't already have. A stale remote base never silently
//!   overrides a local parent with real, unique content.
//! - Runs the Clean pass: every branch whose PR is merged or closed is
//!   deleted, and its children are reparented to the nearest ancestor
//!   that survives the sweep (walking past other branches also being
//!   deleted in the same pass).
//! - Optionally restacks every surviving tracked branch afterward.
//!
//! # Example
//!
//! ```bash
//! # Sync with remote
//! ridgeline sync
//!
//! # Force reset trunk to remote
//! ridgeline sync --force
//!
//! # Restack after syncing
//! ridgeline sync --restack
//! ```

use std::collections::HashMap;
use std::process::Command;

use anyhow::{bail, Context as _, Result};

use crate::cli::commands::phase3_helpers::reparent_children;
use crate::cli::commands::restack::{build_restack_plan, topological_sort};
use crate::core::metadata::schema::{ParentInfo, PrState};
use crate::core::metadata::store::MetadataStore;
use crate::core::ops::journal::{Journal, OpState};
use crate::core::ops::lock::RepoLock;
use crate::core::types::BranchName;
use crate::engine::exec::{ExecuteResult, Executor};
use crate::engine::scan::{scan, RepoSnapshot};
use crate::engine::Context;
use crate::forge::PrState as ForgePrState;
use crate::git::Git;

/// Run the sync command.
///
/// This is a synchronous wrapper that uses tokio to run the async implementation.
pub fn sync(ctx: &Context, force: bool, restack: bool) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(sync_async(ctx, force, restack))
}

/// Async implementation of sync.
async fn sync_async(ctx: &Context, force: bool, restack: bool) -> Result<()> {
    let cwd = ctx
        .cwd
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap());
    let git = Git::open(&cwd).context("Failed to open repository")?;
    let git_dir = git.git_dir();

    if let Some(op_state) = OpState::read(git_dir)? {
        bail!(
            "Another operation is in progress: {} ({}). Use 'rl continue' or 'rl abort'.",
            op_state.command,
            op_state.op_id
        );
    }

    let snapshot = scan(&git)?;

    let trunk = snapshot
        .trunk
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Trunk not configured. Run 'ridgeline init' first."))?
        .clone();

    pull_trunk(&git, &cwd, &trunk, force, ctx)?;

    // Fetch PR state for tracked branches (best-effort: sync degrades to a
    // trunk-only update when no token/remote/forge is available).
    let remote_prs = fetch_remote_pr_state(&git, &snapshot, ctx).await;

    // Re-scan: trunk may have moved.
    let snapshot = scan(&git)?;

    if let Some(ref remote_prs) = remote_prs {
        reconcile_parents(&git, &snapshot, &trunk, remote_prs, ctx)?;
    }

    let snapshot = scan(&git)?;

    if let Some(ref remote_prs) = remote_prs {
        clean_merged_branches(&git, &cwd, &snapshot, &trunk, remote_prs, ctx)?;
    }

    if restack {
        restack_survivors(&git, ctx)?;
    }

    if !ctx.quiet {
        println!("Sync complete.");
    }

    Ok(())
}

/// Fast-forward (or force-reset) local trunk to origin/trunk.
fn pull_trunk(
    git: &Git,
    cwd: &std::path::Path,
    trunk: &BranchName,
    force: bool,
    ctx: &Context,
) -> Result<()> {
    if !ctx.quiet {
        println!("Fetching from origin...");
    }

    let fetch_status = Command::new("git")
        .current_dir(cwd)
        .args(["fetch", "origin"])
        .status()?;
    if !fetch_status.success() {
        bail!("git fetch failed");
    }

    let local_trunk = format!("refs/heads/{}", trunk);
    let remote_trunk = format!("refs/remotes/origin/{}", trunk);

    let local_oid = git.resolve_ref(&local_trunk)?;
    let remote_oid = match git.resolve_ref(&remote_trunk) {
        Ok(oid) => oid,
        Err(_) => {
            if !ctx.quiet {
                println!("Remote trunk not found. Nothing to sync.");
            }
            return Ok(());
        }
    };

    if local_oid == remote_oid {
        if !ctx.quiet {
            println!("Trunk '{}' is up to date.", trunk);
        }
        return Ok(());
    }

    let is_ancestor = git.is_ancestor(&local_oid, &remote_oid)?;

    if is_ancestor {
        if !ctx.quiet {
            println!("Fast-forwarding {} to origin/{}...", trunk, trunk);
        }

        let ff_status = Command::new("git")
            .current_dir(cwd)
            .args(["checkout", trunk.as_str()])
            .status()?;
        if !ff_status.success() {
            bail!("git checkout failed");
        }

        let merge_status = Command::new("git")
            .current_dir(cwd)
            .args(["merge", "--ff-only", &format!("origin/{}", trunk)])
            .status()?;
        if !merge_status.success() {
            bail!("git merge --ff-only failed");
        }
    } else if force {
        if !ctx.quiet {
            println!(
                "Force resetting {} to origin/{} (diverged)...",
                trunk, trunk
            );
        }

        let checkout_status = Command::new("git")
            .current_dir(cwd)
            .args(["checkout", trunk.as_str()])
            .status()?;
        if !checkout_status.success() {
            bail!("git checkout failed");
        }

        let reset_status = Command::new("git")
            .current_dir(cwd)
            .args(["reset", "--hard", &format!("origin/{}", trunk)])
            .status()?;
        if !reset_status.success() {
            bail!("git reset --hard failed");
        }
    } else {
        bail!(
            "Trunk '{}' has diverged from origin. Use --force to reset.",
            trunk
        );
    }

    Ok(())
}

/// PR state fetched from the forge, keyed by branch.
struct RemotePr {
    number: u64,
    state: ForgePrState,
    base: String,
}

/// Fetch linked-PR state for every tracked branch. Returns `None` when no
/// token, remote, or forge is available rather than failing the whole sync.
async fn fetch_remote_pr_state(
    git: &Git,
    snapshot: &RepoSnapshot,
    ctx: &Context,
) -> Option<HashMap<BranchName, RemotePr>> {
    use crate::cli::commands::auth::get_github_token;

    let token = get_github_token().ok()?;
    let remote_url = git.remote_url("origin").ok()??;
    let forge = crate::forge::create_forge(&remote_url, &token, None).ok()?;

    let mut out = HashMap::new();
    for (branch, scanned) in &snapshot.metadata {
        if let PrState::Linked { number, .. } = &scanned.metadata.pr {
            match forge.get_pr(*number).await {
                Ok(pr) => {
                    out.insert(
                        branch.clone(),
                        RemotePr {
                            number: *number,
                            state: pr.state,
                            base: pr.base,
                        },
                    );
                }
                Err(e) => {
                    if !ctx.quiet {
                        eprintln!(
                            "Warning: Could not check PR #{} for '{}': {}",
                            number, branch, e
                        );
                    }
                }
            }
        }
    }

    Some(out)
}

/// Reconcile each branch's local parent against its PR's reported base.
///
/// Local wins unless the local parent no longer exists (handled separately
/// by the restack engine's own reparent-on-deleted-parent fallback) or the
/// remote base is strictly more specific than the local parent and the
/// branch has no unique commits over it.
fn reconcile_parents(
    git: &Git,
    snapshot: &RepoSnapshot,
    trunk: &BranchName,
    remote_prs: &HashMap<BranchName, RemotePr>,
    ctx: &Context,
) -> Result<()> {
    let store = MetadataStore::new(git);

    for (branch, remote) in remote_prs {
        if !matches!(remote.state, ForgePrState::Open) {
            continue; // merged/closed branches are handled by the clean pass
        }
        let Some(scanned) = snapshot.metadata.get(branch) else {
            continue;
        };
        let local_parent = if scanned.metadata.parent.is_trunk() {
            trunk.clone()
        } else {
            match BranchName::new(scanned.metadata.parent.name()) {
                Ok(name) => name,
                Err(_) => continue,
            }
        };

        if remote.base == local_parent.as_str() {
            continue;
        }

        let Ok(candidate) = BranchName::new(&remote.base) else {
            continue;
        };
        if !snapshot.branches.contains_key(&candidate) {
            continue; // remote names a branch we don't have locally; ignore
        }

        // The candidate must be strictly more specific: an ancestor of
        // `branch` that sits below (closer to `branch` than) the recorded
        // parent.
        let ancestors_of_branch = snapshot.graph.ancestors(branch);
        if !ancestors_of_branch.contains(&candidate) {
            continue;
        }
        let candidate_is_more_specific = candidate == local_parent
            || snapshot
                .graph
                .ancestors(&candidate)
                .contains(&local_parent);
        if !candidate_is_more_specific {
            continue;
        }

        // Only adopt the more specific base if `branch` carries no commits
        // unique relative to it (otherwise we would silently rebase real
        // work onto a different parent).
        let (Some(branch_tip), Some(candidate_tip)) = (
            snapshot.branches.get(branch),
            snapshot.branches.get(&candidate),
        ) else {
            continue;
        };
        if !git.is_ancestor(branch_tip, candidate_tip)? {
            continue;
        }

        let mut updated = scanned.metadata.clone();
        updated.parent = if &candidate == trunk {
            ParentInfo::Trunk {
                name: candidate.to_string(),
            }
        } else {
            ParentInfo::Branch {
                name: candidate.to_string(),
            }
        };
        updated.timestamps.updated_at = crate::core::types::UtcTimestamp::now();

        store
            .write_cas(branch, Some(&scanned.ref_oid), &updated)
            .with_context(|| format!("Failed to update parent for '{}'", branch))?;

        if !ctx.quiet {
            println!(
                "  '{}': adopted more specific PR base '{}' (was '{}')",
                branch, candidate, local_parent
            );
        }
    }

    Ok(())
}

/// Delete every branch whose PR has merged or closed, reparenting its
/// children to the nearest ancestor that survives the sweep.
fn clean_merged_branches(
    git: &Git,
    cwd: &std::path::Path,
    snapshot: &RepoSnapshot,
    trunk: &BranchName,
    remote_prs: &HashMap<BranchName, RemotePr>,
    ctx: &Context,
) -> Result<()> {
    let mut to_delete: Vec<BranchName> = remote_prs
        .iter()
        .filter(|(branch, pr)| {
            matches!(pr.state, ForgePrState::Merged | ForgePrState::Closed)
                && snapshot.branches.contains_key(branch)
        })
        .map(|(branch, _)| branch.clone())
        .collect();
    to_delete.retain(|b| b != trunk);

    if to_delete.is_empty() {
        return Ok(());
    }

    if !ctx.quiet {
        println!("Cleaning up {} merged/closed branch(es):", to_delete.len());
        for branch in &to_delete {
            let pr = &remote_prs[branch];
            println!("  '{}' (PR #{}, {})", branch, pr.number, pr.state);
        }
    }

    let git_dir = git.git_dir();
    let _lock = RepoLock::acquire(git_dir).context("Failed to acquire repository lock")?;
    let mut journal = Journal::new("sync-clean");
    let op_state = OpState::from_journal(&journal);
    op_state.write(git_dir)?;

    let deleting: std::collections::HashSet<&BranchName> = to_delete.iter().collect();

    // For every branch being deleted, compute the nearest ancestor that
    // survives the sweep (walking past siblings also being deleted) and
    // reparent its direct children onto that ancestor.
    for branch in &to_delete {
        let mut surviving_ancestor = trunk.clone();
        for ancestor in snapshot.graph.ancestors(branch) {
            if !deleting.contains(&ancestor) {
                surviving_ancestor = ancestor;
                break;
            }
        }

        // Exclude children that are themselves being deleted in this same
        // sweep: they'll be handled by their own turn through this loop
        // (reparenting *their* children onto the nearest surviving
        // ancestor), so writing throwaway metadata for a branch about to
        // be deleted only risks a stale-`ref_oid` CAS mismatch later.
        let reparented = reparent_children(
            branch,
            &surviving_ancestor,
            snapshot,
            git,
            &mut journal,
            &deleting,
        )?;
        if !ctx.quiet && !reparented.is_empty() {
            println!(
                "  Reparented {} child(ren) of '{}' to '{}'",
                reparented.len(),
                branch,
                surviving_ancestor
            );
        }
    }

    let current = snapshot.current_branch.as_ref();
    if current.map(|c| deleting.contains(c)).unwrap_or(false) {
        let status = Command::new("git")
            .args(["checkout", trunk.as_str()])
            .current_dir(cwd)
            .status()
            .context("Failed to checkout trunk before deleting merged branches")?;
        if !status.success() {
            OpState::remove(git_dir)?;
            bail!("git checkout failed");
        }
    }

    let store = MetadataStore::new(git);
    for branch in &to_delete {
        if let Some(oid) = snapshot.branches.get(branch) {
            let status = Command::new("git")
                .args(["branch", "-D", branch.as_str()])
                .current_dir(cwd)
                .status()
                .with_context(|| format!("Failed to delete branch '{}'", branch))?;

            if !status.success() {
                eprintln!("Warning: Failed to delete git branch '{}'", branch);
                continue;
            }

            journal.record_ref_update(
                format!("refs/heads/{}", branch),
                Some(oid.to_string()),
                "0000000000000000000000000000000000000000".to_string(),
            );
        }

        // Re-resolve the metadata ref's current OID immediately before
        // deleting rather than trusting the pre-loop snapshot: the
        // reparent pass above (or a prior iteration of this very loop)
        // may already have written this branch's metadata, moving the
        // ref past what `snapshot` recorded.
        let current_ref_oid = store
            .read(branch)
            .with_context(|| format!("Failed to re-read metadata for '{}'", branch))?
            .map(|entry| entry.ref_oid);

        if let Some(ref_oid) = current_ref_oid {
            store
                .delete_cas(branch, &ref_oid)
                .with_context(|| format!("Failed to delete metadata for '{}'", branch))?;
            journal.record_metadata_delete(branch.as_str(), ref_oid.to_string());
        }

        if !ctx.quiet {
            println!("  Deleted '{}'", branch);
        }
    }

    journal.commit();
    journal.write(git_dir)?;
    OpState::remove(git_dir)?;

    Ok(())
}

/// Restack every tracked branch, trunk-ward first, after a sync.
fn restack_survivors(git: &Git, ctx: &Context) -> Result<()> {
    let snapshot = scan(git)?;
    let trunk = snapshot
        .trunk
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("trunk not configured"))?
        .clone();

    let all: Vec<BranchName> = snapshot.metadata.keys().cloned().collect();
    if all.is_empty() {
        return Ok(());
    }
    let ordered = topological_sort(&all, &snapshot);

    if !ctx.quiet {
        println!("Restacking branches...");
    }

    let plan = build_restack_plan(&ordered, &snapshot, &trunk, ctx.verify)
        .context("Failed to build restack plan")?;

    if plan.is_empty() {
        if !ctx.quiet {
            println!("  Nothing to restack.");
        }
        return Ok(());
    }

    let executor = Executor::new(git);
    match executor.execute(&plan, ctx)? {
        ExecuteResult::Success { .. } => {
            if !ctx.quiet {
                println!("  Restack complete.");
            }
            Ok(())
        }
        ExecuteResult::Paused {
            branch: paused,
            git_state,
            ..
        } => {
            let message = format!(
                "Conflict while restacking '{}' ({}) after sync.\nResolve conflicts, then run 'rl continue'.\nTo abort, run 'rl abort'.",
                paused,
                git_state.description()
            );
            println!();
            println!("{}", message);
            Err(crate::cli::exit::CliError::Conflict(message).into())
        }
        ExecuteResult::Aborted { error, .. } => {
            Err(anyhow::anyhow!("Restack after sync failed: {}", error))
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn sync_command_compiles() {
        // Basic compilation test - verifies module structure
    }
}
