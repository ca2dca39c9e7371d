//! core::paths
//!
//! Centralized path routing for Ridgeline storage locations.
//!
//! # Architecture
//!
//! Per all Ridgeline storage locations must be routed
//! through a centralized helper to ensure correct handling of:
//! - Normal repositories (git_dir == common_dir)
//! - Linked worktrees (common_dir is the parent repo's git dir)
//! - Bare repositories (no work_dir)
//!
//! **Hard rule:** No code may assume `.git/` is a directory or that
//! `git_dir == common_dir`. All paths must go through `RidgelinePaths`.
//!
//! # Storage Layout
//!
//! All Ridgeline data is stored under `<common_dir>/ridgeline/`:
//! - `config.toml` - Repository configuration
//! - `lock` - Exclusive lock file
//! - `op-state.json` - Current operation marker
//! - `ops/` - Operation journals
//! - `cache/` - Optional cached data
//!
//! # Example
//!
//! ```
//! use ridgeline::core::paths::RidgelinePaths;
//! use std::path::PathBuf;
//!
//! let paths = RidgelinePaths::new(
//! PathBuf::from("/repo/.git"),
//! PathBuf::from("/repo/.git"),
//! );
//!
//! assert_eq!(
//! paths.repo_config_path(),
//! PathBuf::from("/repo/.git/ridgeline/config.toml")
//! );
//! ```

use std::path::{Path, PathBuf};

use crate::git::RepoInfo;

/// Centralized path routing for Ridgeline storage.
///
/// This struct ensures all Ridgeline storage locations are computed
/// consistently, using `common_dir` for repo-scoped storage.
///
/// # Invariants
///
/// - All repo-scoped storage uses `common_dir` (shared across worktrees)
/// - `git_dir` is only used for worktree-specific state (if any)
/// - No code outside this module should compute `*.join("ridgeline")` paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RidgelinePaths {
 /// Path to the per-worktree.git directory.
 /// For normal repos, this equals common_dir.
 /// For linked worktrees, this is `.git/worktrees/<name>/`.
 pub git_dir: PathBuf,

 /// Path to the shared git directory (refs, objects, config).
 /// For normal repos, this equals git_dir.
 /// For linked worktrees, this is the parent repo's git dir.
 pub common_dir: PathBuf,
}

impl RidgelinePaths {
 /// Create a new RidgelinePaths from git_dir and common_dir.
 ///
 /// # Example
 ///
 /// ```
 /// use ridgeline::core::paths::RidgelinePaths;
 /// use std::path::PathBuf;
 ///
 /// // Normal repository
 /// let paths = RidgelinePaths::new(
 /// PathBuf::from("/repo/.git"),
 /// PathBuf::from("/repo/.git"),
 /// );
 /// assert_eq!(paths.git_dir, paths.common_dir);
 ///
 /// // Linked worktree
 /// let paths = RidgelinePaths::new(
 /// PathBuf::from("/repo/.git/worktrees/feature"),
 /// PathBuf::from("/repo/.git"),
 /// );
 /// assert_ne!(paths.git_dir, paths.common_dir);
 /// ```
 pub fn new(git_dir: PathBuf, common_dir: PathBuf) -> Self {
 Self {
 git_dir,
 common_dir,
 }
 }

 /// Create RidgelinePaths from a RepoInfo.
 ///
 /// This is the preferred way to create RidgelinePaths after scanning.
 ///
 /// # Example
 ///
 /// ```ignore
 /// let git = Git::open(Path::new("."))?;
 /// let info = git.info()?;
 /// let paths = RidgelinePaths::from_repo_info(&info);
 /// ```
 pub fn from_repo_info(info: &RepoInfo) -> Self {
 Self {
 git_dir: info.git_dir.clone(),
 common_dir: info.common_dir.clone(),
 }
 }

 // =========================================================================
 // Repo-scoped paths (shared across worktrees)
 // =========================================================================

 /// Get the root Ridgeline directory under common_dir.
 ///
 /// All Ridgeline data is stored under this directory.
 ///
 /// # Example
 ///
 /// ```
 /// use ridgeline::core::paths::RidgelinePaths;
 /// use std::path::PathBuf;
 ///
 /// let paths = RidgelinePaths::new(
 /// PathBuf::from("/repo/.git"),
 /// PathBuf::from("/repo/.git"),
 /// );
 /// assert_eq!(paths.repo_ridgeline_dir(), PathBuf::from("/repo/.git/ridgeline"));
 /// ```
 pub fn repo_ridgeline_dir(&self) -> PathBuf {
 self.common_dir.join("ridgeline")
 }

 /// Get the path to the repository configuration file.
 ///
 /// This is `<common_dir>/ridgeline/config.toml`.
 pub fn repo_config_path(&self) -> PathBuf {
 self.repo_ridgeline_dir().join("config.toml")
 }

 /// Get the path to the repository lock file.
 ///
 /// This is `<common_dir>/ridgeline/lock`.
 pub fn repo_lock_path(&self) -> PathBuf {
 self.repo_ridgeline_dir().join("lock")
 }

 /// Get the path to the operation state marker.
 ///
 /// This is `<common_dir>/ridgeline/op-state.json`.
 pub fn repo_op_state_path(&self) -> PathBuf {
 self.repo_ridgeline_dir().join("op-state.json")
 }

 /// Get the directory for operation journals.
 ///
 /// This is `<common_dir>/ridgeline/ops/`.
 pub fn repo_ops_dir(&self) -> PathBuf {
 self.repo_ridgeline_dir().join("ops")
 }

 /// Get the path to a specific operation journal.
 ///
 /// This is `<common_dir>/ridgeline/ops/<op_id>.json`.
 pub fn repo_op_journal_path(&self, op_id: &str) -> PathBuf {
 self.repo_ops_dir().join(format!("{}.json", op_id))
 }

 /// Get the directory for cached data.
 ///
 /// This is `<common_dir>/ridgeline/cache/`.
 pub fn repo_cache_dir(&self) -> PathBuf {
 self.repo_ridgeline_dir().join("cache")
 }

 // =========================================================================
 // Helpers
 // =========================================================================

 /// Check if this is a linked worktree (common_dir != git_dir).
 pub fn is_worktree(&self) -> bool {
 self.git_dir != self.common_dir
 }

 /// Get the common_dir as a Path reference.
 pub fn common_dir(&self) -> &Path {
 &self.common_dir
 }

 /// Get the git_dir as a Path reference.
 pub fn git_dir(&self) -> &Path {
 &self.git_dir
 }

 /// Ensure the Ridgeline directory structure exists.
 ///
 /// Creates `<common_dir>/ridgeline/` and `<common_dir>/ridgeline/ops/` if needed.
 ///
 /// # Errors
 ///
 /// Returns an IO error if directory creation fails.
 pub fn ensure_dirs(&self) -> std::io::Result<()> {
 std::fs::create_dir_all(self.repo_ridgeline_dir())?;
 std::fs::create_dir_all(self.repo_ops_dir())?;
 Ok(())
 }
}
