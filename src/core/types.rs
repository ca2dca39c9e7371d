//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`Oid`] - Git object identifier (SHA)
//! - [`RefName`] - Validated Git reference name
//! - [`UtcTimestamp`] - RFC3339 timestamp
//! - [`Fingerprint`] - Repository state hash for divergence detection
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use ridgeline::core::types::{BranchName, Oid, RefName};
//!
//! // Valid constructions
//! let branch = BranchName::new("feature/my-branch").unwrap();
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! let refname = RefName::for_branch(&branch);
//!
//! // Invalid constructions fail at creation time
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
 #[error("invalid branch name: {0}")]
 InvalidBranchName(String),

 #[error("invalid object id: {0}")]
 InvalidOid(String),

 #[error("invalid ref name: {0}")]
 InvalidRefName(String),
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
/// - Cannot be exactly `@`
///
/// # Example
///
/// ```
/// use ridgeline::core::types::BranchName;
///
/// // Valid branch names
/// let name = BranchName::new("feature/my-branch").unwrap();
/// assert_eq!(name.as_str(), "feature/my-branch");
///
/// let with_at = BranchName::new("user@feature").unwrap();
/// assert_eq!(with_at.as_str(), "user@feature");
///
/// // Invalid branch names
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new(".hidden").is_err());
/// assert!(BranchName::new("branch.lock").is_err());
/// assert!(BranchName::new("has space").is_err());
/// assert!(BranchName::new("@").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
 /// Create a new validated branch name.
 ///
 /// # Errors
 ///
 /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
 pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
 let name = name.into();
 Self::validate(&name)?;
 Ok(Self(name))
 }

 /// Validate a branch name against Git's refname rules.
 fn validate(name: &str) -> Result<(), TypeError> {
 // Cannot be empty
 if name.is_empty() {
 return Err(TypeError::InvalidBranchName(
 "branch name cannot be empty".into(),
 ));
 }

 // Cannot be exactly "@" (reserved)
 if name == "@" {
 return Err(TypeError::InvalidBranchName(
 "branch name cannot be '@' (reserved)".into(),
 ));
 }

 // Cannot start with '.' or '-'
 if name.starts_with('.') {
 return Err(TypeError::InvalidBranchName(
 "branch name cannot start with '.'".into(),
 ));
 }
 if name.starts_with('-') {
 return Err(TypeError::InvalidBranchName(
 "branch name cannot start with '-'".into(),
 ));
 }

 // Cannot end with ".lock" or "/"
 if name.ends_with(".lock") {
 return Err(TypeError::InvalidBranchName(
 "branch name cannot end with '.lock'".into(),
 ));
 }
 if name.ends_with('/') {
 return Err(TypeError::InvalidBranchName(
 "branch name cannot end with '/'".into(),
 ));
 }

 // Cannot contain "..", "@{", or "//"
 if name.contains("..") {
 return Err(TypeError::InvalidBranchName(
 "branch name cannot contain '..'".into(),
 ));
 }
 if name.contains("@{") {
 return Err(TypeError::InvalidBranchName(
 "branch name cannot contain '@{'".into(),
 ));
 }
 if name.contains("//") {
 return Err(TypeError::InvalidBranchName(
 "branch name cannot contain '//'".into(),
 ));
 }

 // Cannot contain certain special characters
 const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
 for c in INVALID_CHARS {
 if name.contains(c) {
 return Err(TypeError::InvalidBranchName(format!(
 "branch name cannot contain '{c}'"
 )));
 }
 }

 // Cannot contain ASCII control characters (0x00-0x1F or 0x7F)
 for c in name.chars() {
 if c.is_ascii_control() {
 return Err(TypeError::InvalidBranchName(
 "branch name cannot contain control characters".into(),
 ));
 }
 }

 // Check each component (split by /) for component-specific rules
 for component in name.split('/') {
 if component.is_empty() {
 // This would mean "//" which is already caught, or leading/trailing "/"
 continue;
 }
 if component.starts_with('.') {
 return Err(TypeError::InvalidBranchName(
 "path component cannot start with '.'".into(),
 ));
 }
 if component.ends_with(".lock") {
 return Err(TypeError::InvalidBranchName(
 "path component cannot end with '.lock'".into(),
 ));
 }
 }

 Ok(())
 }

 /// Get the branch name as a string slice.
 pub fn as_str(&self) -> &str {
 &self.0
 }
}

impl TryFrom<String> for BranchName {
 type Error = TypeError;

 fn try_from(s: String) -> Result<Self, Self::Error> {
 Self::new(s)
 }
}

impl From<BranchName> for String {
 fn from(name: BranchName) -> Self {
 name.0
 }
}

impl AsRef<str> for BranchName {
 fn as_ref(&self) -> &str {
 &self.0
 }
}

impl std::fmt::Display for BranchName {
 fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
 write!(f, "{}", self.0)
 }
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// OIDs are normalized to lowercase for consistency.
///
/// # Example
///
/// ```
/// use ridgeline::core::types::Oid;
///
/// // Create from hex string (normalized to lowercase)
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
///
/// // Get abbreviated form
/// assert_eq!(oid.short(7), "abc123d");
///
/// // Zero OID for null references
/// let zero = Oid::zero();
/// assert!(zero.is_zero());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
 /// The zero OID (40 zeros for SHA-1).
 const ZERO_SHA1: &'static str = "0000000000000000000000000000000000000000";

 /// Create a new validated object id.
 ///
 /// The OID is normalized to lowercase.
 ///
 /// # Errors
 ///
 /// Returns `TypeError::InvalidOid` if the string is not a valid hex OID.
 pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
 let oid = oid.into().to_ascii_lowercase();
 Self::validate(&oid)?;
 Ok(Self(oid))
 }

 /// Create the zero/null OID (40 zeros).
 ///
 /// This represents a null reference in Git.
 ///
 /// # Example
 ///
 /// ```
 /// use ridgeline::core::types::Oid;
 ///
 /// let zero = Oid::zero();
 /// assert!(zero.is_zero());
 /// assert_eq!(zero.as_str().len(), 40);
 /// ```
 pub fn zero() -> Self {
 Self(Self::ZERO_SHA1.to_string())
 }

 /// Check if this is the zero/null OID.
 ///
 /// # Example
 ///
 /// ```
 /// use ridgeline::core::types::Oid;
 ///
 /// let zero = Oid::zero();
 /// assert!(zero.is_zero());
 ///
 /// let non_zero = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
 /// assert!(!non_zero.is_zero());
 /// ```
 pub fn is_zero(&self) -> bool {
 self.0.chars().all(|c| c == '0')
 }

 /// Get an abbreviated form of the OID.
 ///
 /// Returns the first `len` characters. If `len` exceeds the OID length,
 /// returns the full OID.
 ///
 /// # Example
 ///
 /// ```
 /// use ridgeline::core::types::Oid;
 ///
 /// let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
 /// assert_eq!(oid.short(7), "abc123d");
 /// assert_eq!(oid.short(4), "abc1");
 /// ```
 pub fn short(&self, len: usize) -> &str {
 let end = len.min(self.0.len());
 &self.0[..end]
 }

 /// Validate an object id.
 fn validate(oid: &str) -> Result<(), TypeError> {
 // SHA-1 is 40 hex chars, SHA-256 is 64
 if oid.len() != 40 && oid.len() != 64 {
 return Err(TypeError::InvalidOid(format!(
 "expected 40 or 64 hex characters, got {}",
 oid.len()
 )));
 }
 if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
 return Err(TypeError::InvalidOid(
 "object id must be hexadecimal".into(),
 ));
 }
 Ok(())
 }

 /// Get the object id as a string slice.
 pub fn as_str(&self) -> &str {
 &self.0
 }
}

impl TryFrom<String> for Oid {
 type Error = TypeError;

 fn try_from(s: String) -> Result<Self, Self::Error> {
 Self::new(s)
 }
}

impl From<Oid> for String {
 fn from(oid: Oid) -> Self {
 oid.0
 }
}

impl AsRef<str> for Oid {
 fn as_ref(&self) -> &str {
 &self.0
 }
}

impl std::fmt::Display for Oid {
 fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
 write!(f, "{}", self.0)
 }
}

/// A validated Git reference name.
///
/// Reference names must conform to Git's refname rules (see `git check-ref-format`).
///
/// # Example
///
/// ```
/// use ridgeline::core::types::{BranchName, RefName};
///
/// // Create ref for a branch
/// let branch = BranchName::new("feature/foo").unwrap();
/// let refname = RefName::for_branch(&branch);
/// assert_eq!(refname.as_str(), "refs/heads/feature/foo");
///
/// // Create metadata ref
/// let meta_ref = RefName::for_metadata(&branch);
/// assert_eq!(meta_ref.as_str(), "refs/branch-metadata/feature/foo");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
 /// Create a new validated ref name.
 ///
 /// # Errors
 ///
 /// Returns `TypeError::InvalidRefName` if the name violates Git's refname rules.
 pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
 let name = name.into();
 Self::validate(&name)?;
 Ok(Self(name))
 }

 /// Create a ref name for a branch (`refs/heads/<branch>`).
 ///
 /// # Example
 ///
 /// ```
 /// use ridgeline::core::types::{BranchName, RefName};
 ///
 /// let branch = BranchName::new("main").unwrap();
 /// let refname = RefName::for_branch(&branch);
 /// assert_eq!(refname.as_str(), "refs/heads/main");
 /// ```
 pub fn for_branch(branch: &BranchName) -> Self {
 // Safe because branch names are validated and refs/heads/ prefix is valid
 Self(format!("refs/heads/{}", branch.as_str()))
 }

 /// Create a metadata ref name for a branch (`refs/branch-metadata/<branch>`).
 ///
 /// # Example
 ///
 /// ```
 /// use ridgeline::core::types::{BranchName, RefName};
 ///
 /// let branch = BranchName::new("feature/foo").unwrap();
 /// let refname = RefName::for_metadata(&branch);
 /// assert_eq!(refname.as_str(), "refs/branch-metadata/feature/foo");
 /// ```
 pub fn for_metadata(branch: &BranchName) -> Self {
 // Safe because branch names are validated
 Self(format!("refs/branch-metadata/{}", branch.as_str()))
 }

 /// Strip a prefix from the ref name and return the remainder.
 ///
 /// Returns `None` if the ref doesn't start with the given prefix.
 ///
 /// # Example
 ///
 /// ```
 /// use ridgeline::core::types::RefName;
 ///
 /// let refname = RefName::new("refs/heads/feature/foo").unwrap();
 /// assert_eq!(refname.strip_prefix("refs/heads/"), Some("feature/foo"));
 /// assert_eq!(refname.strip_prefix("refs/tags/"), None);
 /// ```
 pub fn strip_prefix(&self, prefix: &str) -> Option<&str> {
 self.0.strip_prefix(prefix)
 }

 /// Check if this ref is under the branch metadata namespace.
 pub fn is_metadata_ref(&self) -> bool {
 self.0.starts_with("refs/branch-metadata/")
 }

 /// Check if this ref is a branch ref.
 pub fn is_branch_ref(&self) -> bool {
 self.0.starts_with("refs/heads/")
 }

 /// Validate a ref name against Git's refname rules.
 fn validate(name: &str) -> Result<(), TypeError> {
 // Cannot be empty
 if name.is_empty() {
 return Err(TypeError::InvalidRefName("ref name cannot be empty".into()));
 }

 // Cannot start with "/"
 if name.starts_with('/') {
 return Err(TypeError::InvalidRefName(
 "ref name cannot start with '/'".into(),
 ));
 }

 // Cannot end with "/" or ".lock"
 if name.ends_with('/') {
 return Err(TypeError::InvalidRefName(
 "ref name cannot end with '/'".into(),
 ));
 }
 if name.ends_with(".lock") {
 return Err(TypeError::InvalidRefName(
 "ref name cannot end with '.lock'".into(),
 ));
 }

 // Cannot contain "..", "@{", or "//"
 if name.contains("..") {
 return Err(TypeError::InvalidRefName(
 "ref name cannot contain '..'".into(),
 ));
 }
 if name.contains("@{") {
 return Err(TypeError::InvalidRefName(
 "ref name cannot contain '@{'".into(),
 ));
 }
 if name.contains("//") {
 return Err(TypeError::InvalidRefName(
 "ref name cannot contain '//'".into(),
 ));
 }

 // Cannot contain certain special characters
 const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
 for c in INVALID_CHARS {
 if name.contains(c) {
 return Err(TypeError::InvalidRefName(format!(
 "ref name cannot contain '{c}'"
 )));
 }
 }

 // Cannot contain ASCII control characters
 for c in name.chars() {
 if c.is_ascii_control() {
 return Err(TypeError::InvalidRefName(
 "ref name cannot contain control characters".into(),
 ));
 }
 }

 // Check each component
 for component in name.split('/') {
 if component.is_empty() {
 continue;
 }
 if component.starts_with('.') {
 return Err(TypeError::InvalidRefName(
 "path component cannot start with '.'".into(),
 ));
 }
 if component.ends_with(".lock") {
 return Err(TypeError::InvalidRefName(
 "path component cannot end with '.lock'".into(),
 ));
 }
 }

 Ok(())
 }

 /// Get the ref name as a string slice.
 pub fn as_str(&self) -> &str {
 &self.0
 }
}

impl TryFrom<String> for RefName {
 type Error = TypeError;

 fn try_from(s: String) -> Result<Self, Self::Error> {
 Self::new(s)
 }
}

impl From<RefName> for String {
 fn from(name: RefName) -> Self {
 name.0
 }
}

impl AsRef<str> for RefName {
 fn as_ref(&self) -> &str {
 &self.0
 }
}

impl std::fmt::Display for RefName {
 fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
 write!(f, "{}", self.0)
 }
}

/// A UTC timestamp in RFC3339 format.
///
/// # Example
///
/// ```
/// use ridgeline::core::types::UtcTimestamp;
///
/// let now = UtcTimestamp::now();
/// println!("Current time: {}", now);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
 /// Create a timestamp for the current moment.
 pub fn now() -> Self {
 Self(chrono::Utc::now())
 }

 /// Create a timestamp from a chrono DateTime.
 pub fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
 Self(dt)
 }

 /// Get the underlying datetime.
 pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
 &self.0
 }
}

impl std::fmt::Display for UtcTimestamp {
 fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
 write!(f, "{}", self.0.to_rfc3339())
 }
}

/// A stable hash over repository ref state for divergence detection.
///
/// The fingerprint is computed over a stable
/// set of ref values to detect out-of-band changes between Ridgeline operations.
///
/// # Example
///
/// ```
/// use ridgeline::core::types::{Fingerprint, RefName, Oid};
///
/// let refs = vec![
/// (RefName::new("refs/heads/main").unwrap(),
/// Oid::new("abc123def4567890abc123def4567890abc12345").unwrap()),
/// (RefName::new("refs/heads/feature").unwrap(),
/// Oid::new("def456abc7890123def456abc7890123def45678").unwrap()),
/// ];
///
/// let fp = Fingerprint::compute(&refs);
/// println!("Fingerprint: {}", fp);
///
/// // Same refs produce same fingerprint
/// let fp2 = Fingerprint::compute(&refs);
/// assert_eq!(fp, fp2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
 /// Compute a fingerprint from a set of (refname, oid) pairs.
 ///
 /// The refs are sorted by refname before hashing to ensure determinism
 /// regardless of input order.
 pub fn compute(refs: &[(RefName, Oid)]) -> Self {
 let mut sorted: Vec<_> = refs.iter().collect();
 sorted.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));

 let mut hasher = Sha256::new();
 for (refname, oid) in sorted {
 hasher.update(refname.as_str().as_bytes());
 hasher.update(b"\0");
 hasher.update(oid.as_str().as_bytes());
 hasher.update(b"\n");
 }

 let result = hasher.finalize();
 Self(hex::encode(result))
 }

 /// Get the fingerprint as a hex string.
 pub fn as_str(&self) -> &str {
 &self.0
 }
}

impl std::fmt::Display for Fingerprint {
 fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
 write!(f, "{}", self.0)
 }
}
