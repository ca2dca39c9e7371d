//! core::metadata::schema
//!
//! Branch metadata schema (v1).
//!
//! # Schema Design
//!
//! metadata is:
//! - Self-describing with `kind` and `schema_version`
//! - Structured with no boolean blindness
//! - Strictly parsed (unknown fields rejected)
//!
//! # Structural vs Cached
//!
//! Per //! - **Structural**: parent, base, frozen (correctness-critical)
//! - **Cached**: PR linkage (may be stale, never justifies structural changes)
//!
//! # Example
//!
//! ```
//! use ridgeline::core::metadata::schema::{BranchMetadataV1, parse_metadata, METADATA_KIND};
//! use ridgeline::core::types::{BranchName, Oid};
//!
//! // Create metadata for a new branch
//! let branch = BranchName::new("feature-a").unwrap();
//! let parent = BranchName::new("main").unwrap();
//! let base = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//!
//! let meta = BranchMetadataV1::new(branch, parent, base);
//! assert_eq!(meta.kind, METADATA_KIND);
//!
//! // Serialize and parse back
//! let json = serde_json::to_string(&meta).unwrap();
//! let parsed = parse_metadata(&json).unwrap();
//! assert_eq!(parsed.branch.name, "feature-a");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{BranchName, Oid, TypeError, UtcTimestamp};

/// The kind identifier for branch metadata.
pub const METADATA_KIND: &str = "ridgeline.branch-metadata";

/// Schema version before `scope` and the extended `pr` cache fields existed.
///
/// Readers must still accept records at this version (I3); writers always
/// emit [`SCHEMA_VERSION`].
pub const SCHEMA_VERSION_V1: u32 = 1;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 2;

/// Errors from metadata operations.
#[derive(Debug, Error)]
pub enum MetadataError {
 #[error("failed to parse metadata: {0}")]
 ParseError(String),

 #[error("invalid kind '{found}', expected '{}'", METADATA_KIND)]
 InvalidKind { found: String },

 #[error("unsupported schema version {0}, supported: {SCHEMA_VERSION_V1}..={SCHEMA_VERSION}")]
 UnsupportedVersion(u32),

 #[error("invalid metadata value: {0}")]
 InvalidValue(String),

 #[error("type validation failed: {0}")]
 TypeError(#[from] TypeError),
}

/// Envelope for version dispatch before full parsing.
///
/// This allows us to check the schema version before attempting
/// to parse the full metadata structure.
#[derive(Debug, Deserialize)]
struct MetadataEnvelope {
 kind: String,
 schema_version: u32,
}

/// Parse metadata JSON with version dispatch.
///
/// This function checks the schema version and dispatches to the
/// appropriate parser. Currently only v1 is supported.
///
/// # Errors
///
/// Returns an error if:
/// - The JSON is malformed
/// - The `kind` field doesn't match `METADATA_KIND`
/// - The `schema_version` is not supported
/// - Any field values are invalid
///
/// # Example
///
/// ```
/// use ridgeline::core::metadata::schema::parse_metadata;
///
/// let json = r#"{
/// "kind": "ridgeline.branch-metadata",
/// "schema_version": 1,
/// "branch": { "name": "feature" },
/// "parent": { "kind": "trunk", "name": "main" },
/// "base": { "oid": "abc123def4567890abc123def4567890abc12345" },
/// "freeze": { "state": "unfrozen" },
/// "pr": { "state": "none" },
/// "timestamps": {
/// "created_at": "2024-01-01T00:00:00Z",
/// "updated_at": "2024-01-01T00:00:00Z"
/// }
/// }"#;
///
/// let meta = parse_metadata(json).unwrap();
/// assert_eq!(meta.branch.name, "feature");
/// ```
pub fn parse_metadata(json: &str) -> Result<BranchMetadataV1, MetadataError> {
 // First, extract envelope to check version
 let envelope: MetadataEnvelope =
 serde_json::from_str(json).map_err(|e| MetadataError::ParseError(e.to_string()))?;

 // Validate kind
 if envelope.kind != METADATA_KIND {
 return Err(MetadataError::InvalidKind {
 found: envelope.kind,
 });
 }

 // Dispatch based on version. v1 records lack `scope` and the extended
 // `pr` cache fields; both are `#[serde(default)]` so a v1 document
 // deserializes straight into the current struct and is upgraded in place.
 match envelope.schema_version {
 SCHEMA_VERSION_V1 | SCHEMA_VERSION => {
 let mut meta: BranchMetadataV1 =
 serde_json::from_str(json).map_err(|e| MetadataError::ParseError(e.to_string()))?;
 if meta.schema_version == SCHEMA_VERSION_V1 {
 meta.schema_version = SCHEMA_VERSION;
 }
 meta.validate()?;
 Ok(meta)
 }
 v => Err(MetadataError::UnsupportedVersion(v)),
 }
}

/// Branch metadata (v1).
///
/// This is the complete metadata stored for each tracked branch.
/// Use [`parse_metadata`] to parse from JSON with validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BranchMetadataV1 {
 /// Kind identifier (always "ridgeline.branch-metadata")
 pub kind: String,

 /// Schema version (always 1 for this struct)
 pub schema_version: u32,

 /// The branch this metadata describes
 pub branch: BranchInfo,

 /// Parent branch information
 pub parent: ParentInfo,

 /// Base commit information
 pub base: BaseInfo,

 /// Freeze state
 pub freeze: FreezeState,

 /// PR linkage state (cached, not structural)
 pub pr: PrState,

 /// Timestamps
 pub timestamps: Timestamps,
}

impl BranchMetadataV1 {
 /// Create new metadata for a branch.
 ///
 /// The parent is set as a regular branch. Use [`BranchMetadataBuilder`]
 /// for more control over the metadata structure.
 pub fn new(branch: BranchName, parent: BranchName, base_oid: Oid) -> Self {
 let now = UtcTimestamp::now();
 Self {
 kind: METADATA_KIND.to_string(),
 schema_version: SCHEMA_VERSION,
 branch: BranchInfo {
 name: branch.to_string(),
 },
 parent: ParentInfo::Branch {
 name: parent.to_string(),
 },
 base: BaseInfo {
 oid: base_oid.to_string(),
 },
 freeze: FreezeState::Unfrozen,
 pr: PrState::None,
 timestamps: Timestamps {
 created_at: now.clone(),
 updated_at: now,
 },
 }
 }

 /// Create a builder for constructing metadata with more options.
 pub fn builder(branch: BranchName, parent: BranchName, base_oid: Oid) -> BranchMetadataBuilder {
 BranchMetadataBuilder::new(branch, parent, base_oid)
 }

 /// Validate the metadata structure.
 ///
 /// This checks that:
 /// - `kind` matches `METADATA_KIND`
 /// - `schema_version` equals `SCHEMA_VERSION`
 /// - Branch name is valid
 /// - Parent name is valid
 /// - Base OID is valid
 pub fn validate(&self) -> Result<(), MetadataError> {
 // Validate kind
 if self.kind != METADATA_KIND {
 return Err(MetadataError::InvalidKind {
 found: self.kind.clone(),
 });
 }

 // Validate version
 if self.schema_version != SCHEMA_VERSION {
 return Err(MetadataError::UnsupportedVersion(self.schema_version));
 }

 // Validate branch name
 BranchName::new(&self.branch.name)?;

 // Validate parent name
 BranchName::new(self.parent.name())?;

 // Validate base OID
 Oid::new(&self.base.oid)?;

 Ok(())
 }

 /// Extract structural metadata with validation.
 ///
 /// This returns only the correctness-critical fields (parent, base, frozen)
 /// with validated types. cached fields (like PR linkage)
 /// must not be used to justify structural changes.
 ///
 /// # Errors
 ///
 /// Returns an error if any structural field contains invalid data.
 pub fn into_structural(self) -> Result<StructuralMetadata, MetadataError> {
 let parent = BranchName::new(self.parent.name())?;
 let base = Oid::new(&self.base.oid)?;
 let frozen = self.freeze.is_frozen();

 Ok(StructuralMetadata {
 parent,
 base,
 frozen,
 })
 }

 /// Get a reference view of structural metadata.
 ///
 /// Unlike [`into_structural`](Self::into_structural), this doesn't validate
 /// the types. Use this for quick access when you know the metadata is valid.
 pub fn structural_view(&self) -> StructuralView<'_> {
 StructuralView {
 parent: &self.parent,
 base: &self.base,
 freeze: &self.freeze,
 }
 }

 /// Update the `updated_at` timestamp to now.
 pub fn touch(&mut self) {
 self.timestamps.updated_at = UtcTimestamp::now();
 }

 /// Serialize to canonical JSON (compact, deterministic).
 ///
 /// This produces a stable JSON string suitable for fingerprinting.
 pub fn to_canonical_json(&self) -> Result<String, MetadataError> {
 serde_json::to_string(self).map_err(|e| MetadataError::ParseError(e.to_string()))
 }
}

/// Builder for constructing branch metadata with more options.
pub struct BranchMetadataBuilder {
 branch: BranchName,
 parent: BranchName,
 base_oid: Oid,
 parent_is_trunk: bool,
 freeze_state: FreezeState,
 pr_state: PrState,
}

impl BranchMetadataBuilder {
 /// Create a new builder with required fields.
 pub fn new(branch: BranchName, parent: BranchName, base_oid: Oid) -> Self {
 Self {
 branch,
 parent,
 base_oid,
 parent_is_trunk: false,
 freeze_state: FreezeState::Unfrozen,
 pr_state: PrState::None,
 }
 }

 /// Mark the parent as trunk.
 pub fn parent_is_trunk(mut self) -> Self {
 self.parent_is_trunk = true;
 self
 }

 /// Set the freeze state.
 pub fn freeze_state(mut self, state: FreezeState) -> Self {
 self.freeze_state = state;
 self
 }

 /// Set the PR state.
 pub fn pr_state(mut self, state: PrState) -> Self {
 self.pr_state = state;
 self
 }

 /// Build the metadata.
 pub fn build(self) -> BranchMetadataV1 {
 let now = UtcTimestamp::now();

 let parent = if self.parent_is_trunk {
 ParentInfo::Trunk {
 name: self.parent.to_string(),
 }
 } else {
 ParentInfo::Branch {
 name: self.parent.to_string(),
 }
 };

 BranchMetadataV1 {
 kind: METADATA_KIND.to_string(),
 schema_version: SCHEMA_VERSION,
 branch: BranchInfo {
 name: self.branch.to_string(),
 },
 parent,
 base: BaseInfo {
 oid: self.base_oid.to_string(),
 },
 freeze: self.freeze_state,
 pr: self.pr_state,
 timestamps: Timestamps {
 created_at: now.clone(),
 updated_at: now,
 },
 }
 }
}

/// Structural metadata (correctness-critical fields only).
///
/// Per structural fields define the stack graph.
/// Cached fields must not be used to justify structural changes.
///
/// This struct contains validated types, unlike [`StructuralView`] which
/// holds references to the raw data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralMetadata {
 /// Parent branch name (validated)
 pub parent: BranchName,
 /// Base commit OID (validated)
 pub base: Oid,
 /// Whether the branch is frozen
 pub frozen: bool,
}

/// Reference view of structural metadata.
///
/// This provides quick access to structural fields without validation
/// or cloning. Use [`BranchMetadataV1::into_structural`] when you need
/// validated types.
#[derive(Debug)]
pub struct StructuralView<'a> {
 /// Parent information
 pub parent: &'a ParentInfo,
 /// Base commit
 pub base: &'a BaseInfo,
 /// Freeze state
 pub freeze: &'a FreezeState,
}

/// Branch identification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BranchInfo {
 /// Branch name
 pub name: String,
}

/// Parent branch information.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum ParentInfo {
 /// Parent is another branch
 Branch { name: String },
 /// Parent is trunk
 Trunk { name: String },
}

impl ParentInfo {
 /// Get the parent branch name.
 pub fn name(&self) -> &str {
 match self {
 ParentInfo::Branch { name } | ParentInfo::Trunk { name } => name,
 }
 }

 /// Check if the parent is trunk.
 pub fn is_trunk(&self) -> bool {
 matches!(self, ParentInfo::Trunk {.. })
 }
}

/// Base commit information.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BaseInfo {
 /// Object id of the base commit
 pub oid: String,
}

/// Freeze state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case", deny_unknown_fields)]
pub enum FreezeState {
 /// Branch is not frozen
 Unfrozen,
 /// Branch is frozen
 Frozen {
 /// Scope of the freeze
 scope: FreezeScope,
 /// Reason for freezing
 reason: Option<String>,
 /// When the branch was frozen
 frozen_at: UtcTimestamp,
 },
}

impl FreezeState {
 /// Check if the branch is frozen.
 pub fn is_frozen(&self) -> bool {
 matches!(self, FreezeState::Frozen {.. })
 }

 /// Create a frozen state with the given scope.
 pub fn frozen(scope: FreezeScope, reason: Option<String>) -> Self {
 FreezeState::Frozen {
 scope,
 reason,
 frozen_at: UtcTimestamp::now(),
 }
 }
}

/// Scope of a freeze.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FreezeScope {
 /// Only this branch is frozen
 Single,
 /// This branch and all downstack ancestors are frozen
 DownstackInclusive,
}

/// PR linkage state (cached, not structural).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case", deny_unknown_fields)]
pub enum PrState {
 /// No PR linked
 None,
 /// PR is linked
 Linked {
 /// Forge name (e.g., "github")
 forge: String,
 /// PR number
 number: u64,
 /// PR URL
 url: String,
 /// Last known PR status (cached)
 last_known: Option<PrStatusCache>,
 },
}

impl PrState {
 /// Create a linked PR state.
 pub fn linked(forge: &str, number: u64, url: &str) -> Self {
 PrState::Linked {
 forge: forge.to_string(),
 number,
 url: url.to_string(),
 last_known: None,
 }
 }

 /// Check if a PR is linked.
 pub fn is_linked(&self) -> bool {
 matches!(self, PrState::Linked {.. })
 }

 /// Get the PR number if linked.
 pub fn number(&self) -> Option<u64> {
 match self {
 PrState::Linked { number,.. } => Some(*number),
 PrState::None => None,
 }
 }
}

/// Cached PR status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PrStatusCache {
 /// PR state (open, closed, merged)
 pub state: String,
 /// Whether the PR is a draft
 pub is_draft: bool,
}

/// Timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Timestamps {
 /// When the metadata was created
 pub created_at: UtcTimestamp,
 /// When the metadata was last updated
 pub updated_at: UtcTimestamp,
}
