//! core::merge
//!
//! Merge planning: turns a stack of branches with linked PRs into an
//! ordered list of steps that merges them upstream while keeping the
//! local stack topology consistent afterward.
//!
//! # Design
//!
//! Unlike the restack engine, merge steps are not executed through the
//! sync `engine::plan::Plan`/`Executor` machinery: merging a PR is a
//! network call against the forge, not a local git mutation, so the
//! step list here is consumed by an async loop (see
//! `cli::commands::merge::execute_merge_plan`) that re-validates each
//! precondition immediately before acting on it.
//!
//! # Strategy
//!
//! - `BottomUp` merges the branch closest to trunk first, then works up
//!   the stack. This is the default: each merge shrinks the stack from
//!   the bottom, and every later merge's base is already trunk.
//! - `TopDown` merges the branch furthest from trunk first. Rarely
//!   useful on its own, but supported for forges/policies that require
//!   merging a specific PR before its base is touched.
//!
//! After all requested merges land, any branch still in the stack whose
//! *local* parent was just merged is restacked onto trunk (not blindly
//! retargeted - if a surviving branch's parent is another surviving
//! branch, it keeps that parent). Its PR base is updated to match, and
//! the merged branch's local ref and metadata are deleted last.

use crate::core::metadata::schema::PrState;
use crate::core::types::BranchName;
use crate::engine::scan::RepoSnapshot;
use crate::forge::MergeMethod;
use thiserror::Error;

/// Direction to walk the stack when merging multiple PRs in one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Merge the branch nearest trunk first (default).
    #[default]
    BottomUp,
    /// Merge the branch furthest from trunk first.
    TopDown,
}

/// A single step in an ordered merge plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeStep {
    /// Merge a PR via the forge API.
    MergePr {
        /// Local branch the PR is linked to.
        branch: BranchName,
        /// PR number on the forge.
        number: u64,
        /// Merge method to request.
        method: MergeMethod,
    },
    /// Pull the just-merged commits into local trunk.
    PullTrunk,
    /// Restack a surviving branch onto its (possibly new) parent tip.
    Restack {
        /// Branch to restack.
        branch: BranchName,
    },
    /// Update a surviving branch's PR base on the forge.
    UpdatePrBase {
        /// Branch whose PR base changed.
        branch: BranchName,
        /// New base branch name.
        new_base: BranchName,
    },
    /// Delete a merged branch's local ref and metadata.
    DeleteBranch {
        /// Branch to delete.
        branch: BranchName,
    },
}

/// Errors that prevent building a merge plan.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MergePlanError {
    /// Branch has no linked PR.
    #[error("'{branch}' has no linked PR. Run 'rl submit' first.")]
    NoPr {
        /// Branch missing a PR link.
        branch: BranchName,
    },
    /// PR is closed (not merged) and `force` was not given.
    #[error("PR #{number} for '{branch}' is closed. Use --force to merge anyway.")]
    ClosedPr {
        /// Affected branch.
        branch: BranchName,
        /// PR number.
        number: u64,
    },
    /// PR is a draft and `force` was not given.
    #[error("PR #{number} for '{branch}' is a draft. Publish it or use --force.")]
    DraftPr {
        /// Affected branch.
        branch: BranchName,
        /// PR number.
        number: u64,
    },
}

/// Sort branches so parents precede children (pure graph walk, no I/O).
///
/// Duplicated in miniature from `cli::commands::restack::topological_sort`
/// rather than imported: this module sits below the CLI layer and must not
/// depend on it.
fn topological_sort(branches: &[BranchName], snapshot: &RepoSnapshot) -> Vec<BranchName> {
    let branch_set: std::collections::HashSet<_> = branches.iter().collect();
    let mut result = Vec::new();
    let mut visited = std::collections::HashSet::new();

    fn visit(
        branch: &BranchName,
        snapshot: &RepoSnapshot,
        branch_set: &std::collections::HashSet<&BranchName>,
        visited: &mut std::collections::HashSet<BranchName>,
        result: &mut Vec<BranchName>,
    ) {
        if visited.contains(branch) {
            return;
        }
        visited.insert(branch.clone());
        if let Some(parent) = snapshot.graph.parent(branch) {
            if branch_set.contains(parent) {
                visit(parent, snapshot, branch_set, visited, result);
            }
        }
        result.push(branch.clone());
    }

    for branch in branches {
        visit(branch, snapshot, &branch_set, &mut visited, &mut result);
    }

    result
}

/// A branch queued for merging, with its cached PR link resolved.
#[derive(Debug, Clone)]
struct MergeCandidate {
    branch: BranchName,
    number: u64,
    already_merged: bool,
}

/// Build the ordered list of merge steps for `stack`.
///
/// `stack` must already be in bottom-up order (trunk-adjacent branch
/// first). Branches without a linked PR are skipped silently - the
/// caller is expected to have already filtered to PR-linked branches
/// when computing `stack`, as `rl merge` does. Branches whose cached
/// last-known PR state is closed or draft produce a [`MergePlanError`]
/// unless `force` is set; already-merged PRs are skipped (not re-merged)
/// regardless of `force`.
pub fn build_merge_plan(
    stack: &[BranchName],
    snapshot: &RepoSnapshot,
    method: MergeMethod,
    strategy: MergeStrategy,
    force: bool,
) -> Result<Vec<MergeStep>, MergePlanError> {
    let mut candidates = Vec::new();
    for branch in stack {
        let Some(scanned) = snapshot.metadata.get(branch) else {
            continue;
        };
        let PrState::Linked {
            number, last_known, ..
        } = &scanned.metadata.pr
        else {
            return Err(MergePlanError::NoPr {
                branch: branch.clone(),
            });
        };

        let already_merged = last_known
            .as_ref()
            .map(|c| c.state == "merged")
            .unwrap_or(false);

        if !already_merged && !force {
            if let Some(cache) = last_known {
                if cache.state == "closed" {
                    return Err(MergePlanError::ClosedPr {
                        branch: branch.clone(),
                        number: *number,
                    });
                }
                if cache.is_draft {
                    return Err(MergePlanError::DraftPr {
                        branch: branch.clone(),
                        number: *number,
                    });
                }
            }
        }

        candidates.push(MergeCandidate {
            branch: branch.clone(),
            number: *number,
            already_merged,
        });
    }

    if strategy == MergeStrategy::TopDown {
        candidates.reverse();
    }

    let mut steps = Vec::new();
    let merged_branches: std::collections::HashSet<&BranchName> = candidates
        .iter()
        .filter(|c| !c.already_merged)
        .map(|c| &c.branch)
        .collect();

    for candidate in &candidates {
        if candidate.already_merged {
            continue;
        }
        steps.push(MergeStep::MergePr {
            branch: candidate.branch.clone(),
            number: candidate.number,
            method,
        });
    }

    if merged_branches.is_empty() {
        return Ok(steps);
    }

    steps.push(MergeStep::PullTrunk);

    // Any tracked branch (merged or not) whose local parent is one of the
    // merged branches needs its recorded parent walked forward. Restack
    // every survivor in topological order so descendants of descendants
    // pick up the already-updated parent tip.
    let trunk = snapshot.trunk.clone();
    let mut survivors: Vec<BranchName> = snapshot
        .metadata
        .keys()
        .filter(|b| !merged_branches.contains(b))
        .cloned()
        .collect();
    survivors.sort_by_key(|b| b.as_str().to_string());

    let ordered_survivors = topological_sort(&survivors, snapshot);

    // A survivor needs restacking if its immediate parent was merged, or if
    // its immediate parent is itself a survivor that needs restacking -
    // once an intermediate branch's tip moves, every descendant below it
    // is no longer fixed and has to follow in turn. `ordered_survivors` is
    // parent-before-child, so by the time we reach `branch` its parent's
    // membership in `restacked` (if the parent is a survivor) is already
    // settled.
    let mut restacked: std::collections::HashSet<BranchName> = std::collections::HashSet::new();
    for branch in &ordered_survivors {
        let Some(scanned) = snapshot.metadata.get(branch) else {
            continue;
        };
        if scanned.metadata.parent.is_trunk() {
            continue;
        }
        let parent_name = match BranchName::new(scanned.metadata.parent.name()) {
            Ok(n) => n,
            Err(_) => continue,
        };
        let parent_was_merged = merged_branches.contains(&parent_name);
        if !parent_was_merged && !restacked.contains(&parent_name) {
            continue;
        }
        restacked.insert(branch.clone());
        steps.push(MergeStep::Restack {
            branch: branch.clone(),
        });
        // Only a direct child of a merged branch has its PR base change
        // (to trunk, since its old base no longer exists). A branch whose
        // parent is a surviving branch keeps that branch as its base - it
        // only needs its tip rebased, not its PR retargeted.
        if parent_was_merged && scanned.metadata.pr.is_linked() {
            let new_base = trunk.clone().unwrap_or(parent_name);
            steps.push(MergeStep::UpdatePrBase {
                branch: branch.clone(),
                new_base,
            });
        }
    }

    // Delete merged branches last, in the same order they were merged, so
    // their metadata is available for any restack step above that still
    // needs to read it.
    for candidate in &candidates {
        if candidate.already_merged {
            continue;
        }
        steps.push(MergeStep::DeleteBranch {
            branch: candidate.branch.clone(),
        });
    }

    Ok(steps)
}
