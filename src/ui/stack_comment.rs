//! ui::stack_comment
//!
//! Pure functions for generating stack comment tables for PR descriptions.
//!
//! # Design
//!
//! This module contains only pure functions that:
//! - Take immutable inputs (stack info, current branch, PR linkage)
//! - Return formatted strings
//! - Have no side effects
//!
//! The stack comment is appended to PR descriptions with HTML comment markers
//! that allow it to be regenerated on subsequent submits while preserving
//! any user-provided description above the markers.
//!
//! # Example Output
//!
//! ```markdown
//! <!-- ridgeline:stack:start -->
//!
//! ### Stack
//!
//! | | Branch | PR |
//! |---|--------|-----|
//! | ‚¨ÜÔ∏è | `feature-a` | [#10](https://github.com/org/repo/pull/10) |
//! | üëâ | `feature-b` | [#11](https://github.com/org/repo/pull/11) |
//! | ‚¨áÔ∏è | `feature-c` | ‚ùì |
//!
//! <!-- ridgeline:stack:end -->
//! ```

/// Marker indicating the start of the stack comment section.
pub const STACK_MARKER_START: &str = "<!-- ridgeline:stack:start -->";

/// Marker indicating the end of the stack comment section.
pub const STACK_MARKER_END: &str = "<!-- ridgeline:stack:end -->";

/// Position of a branch relative to the current PR's branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackPosition {
    /// Branch is an ancestor (closer to trunk, shown above in stack)
    Ancestor,
    /// This is the current branch
    Current,
    /// Branch is a descendant (stacked on current, shown below)
    Descendant,
}

impl StackPosition {
    /// Get the emoji indicator for this position.
    ///
    /// - Ancestor: ‚¨ÜÔ∏è (up arrow)
    /// - Current: üëâ (pointing hand)
    /// - Descendant: ‚¨áÔ∏è (down arrow)
    pub fn indicator(&self) -> &'static str {
        match self {
            StackPosition::Ancestor => "‚¨ÜÔ∏è",
            StackPosition::Current => "üëâ",
            StackPosition::Descendant => "‚¨áÔ∏è",
        }
    }
}

/// Information about a single branch in the stack.
#[derive(Debug, Clone)]
pub struct StackBranchInfo {
    /// Branch name
    pub name: String,
    /// PR number if linked, None if not submitted
    pub pr_number: Option<u64>,
    /// PR URL if linked
    pub pr_url: Option<String>,
    /// Position relative to current branch
    pub position: StackPosition,
}

/// Input for generating a stack comment.
#[derive(Debug)]
pub struct StackCommentInput {
    /// All branches in the stack, ordered from top (closest to trunk) to bottom
    pub branches: Vec<StackBranchInfo>,
}

/// Generate the stack comment table.
///
/// This is a pure function that produces markdown content including
/// the start and end markers.
///
/// # Arguments
///
/// * `input` - Stack information with branch details
///
/// # Returns
///
/// A string containing the full stack comment section including markers.
///
/// # Example
///
/// ```
/// use ridgeline::ui::stack_comment::{generate_stack_comment, StackCommentInput, StackBranchInfo, StackPosition};
///
/// let input = StackCommentInput {
///     branches: vec![
///         StackBranchInfo {
///             name: "feature-a".to_string(),
///             pr_number: Some(10),
///             pr_url: Some("https://github.com/org/repo/pull/10".to_string()),
///             position: StackPosition::Ancestor,
///         },
///         StackBranchInfo {
///             name: "feature-b".to_string(),
///             pr_number: Some(11),
///             pr_url: Some("https://github.com/org/repo/pull/11".to_string()),
///             position: StackPosition::Current,
///         },
///     ],
/// };
///
/// let comment = generate_stack_comment(&input);
/// assert!(comment.contains("feature-a"));
/// assert!(comment.contains("[#10]"));
/// ```
pub fn generate_stack_comment(input: &StackCommentInput) -> String {
    let mut lines = vec![
        STACK_MARKER_START.to_string(),
        String::new(),
        "### Stack".to_string(),
        String::new(),
        "| | Branch | PR |".to_string(),
        "|---|--------|-----|".to_string(),
    ];

    for branch in &input.branches {
        let indicator = branch.position.indicator();
        let pr_cell = match (&branch.pr_number, &branch.pr_url) {
            (Some(num), Some(url)) => format!("[#{}]({})", num, url),
            (Some(num), None) => format!("#{}", num),
            (None, _) => "‚ùì".to_string(),
        };

        lines.push(format!(
            "| {} | `{}` | {} |",
            indicator, branch.name, pr_cell
        ));
    }

    lines.push(String::new());
    lines.push(STACK_MARKER_END.to_string());

    lines.join("\n")
}

/// Merge a stack comment into an existing PR body.
///
/// If the body already contains a stack comment section (between markers),
/// it will be replaced. Otherwise, the stack comment is appended.
///
/// This function preserves any user-provided content:
/// - Content before the start marker is kept
/// - Content after the end marker is kept
/// - Only the section between markers is replaced
///
/// # Arguments
///
/// * `existing_body` - The current PR body (may be None or empty)
/// * `stack_comment` - The new stack comment to insert
///
/// # Returns
///
/// The merged body string.
///
/// # Example
///
/// ```
/// use ridgeline::ui::stack_comment::merge_stack_comment;
///
/// // Append to existing description
/// let result = merge_stack_comment(
///     Some("This PR adds a new feature."),
///     "<!-- ridgeline:stack:start -->\nstack\n<!-- ridgeline:stack:end -->"
/// );
/// assert!(result.starts_with("This PR adds a new feature."));
/// assert!(result.contains("stack"));
/// ```
pub fn merge_stack_comment(existing_body: Option<&str>, stack_comment: &str) -> String {
    let body = existing_body.unwrap_or("");

    // Handle empty/whitespace-only body
    if body.trim().is_empty() {
        return stack_comment.to_string();
    }

    // Check if markers exist (not inside code blocks)
    if let Some((before, after)) = find_marker_bounds(body) {
        // Replace existing section
        let before = before.trim_end();
        let after = after.trim_start();

        if before.is_empty() && after.is_empty() {
            stack_comment.to_string()
        } else if before.is_empty() {
            format!("{}\n\n{}", stack_comment, after)
        } else if after.is_empty() {
            format!("{}\n\n{}", before, stack_comment)
        } else {
            format!("{}\n\n{}\n\n{}", before, stack_comment, after)
        }
    } else {
        // Append to existing body
        format!("{}\n\n{}", body.trim_end(), stack_comment)
    }
}

/// Find the bounds of the stack comment section, excluding markers inside code blocks.
///
/// Returns `Some((before, after))` where `before` is content before the start marker
/// and `after` is content after the end marker. Returns `None` if valid markers not found.
fn find_marker_bounds(body: &str) -> Option<(&str, &str)> {
    // Find start marker, ensuring it's not inside a code block
    let start_idx = find_marker_outside_code_blocks(body, STACK_MARKER_START)?;

    // Find end marker after start, ensuring it's not inside a code block
    let search_start = start_idx + STACK_MARKER_START.len();
    let end_idx_relative =
        find_marker_outside_code_blocks(&body[search_start..], STACK_MARKER_END)?;
    let end_idx = search_start + end_idx_relative;

    // Ensure start comes before end
    if start_idx >= end_idx {
        return None;
    }

    let before = &body[..start_idx];
    let after = &body[end_idx + STACK_MARKER_END.len()..];

    Some((before, after))
}

/// Find a marker in text, but only if it's not inside a code block.
fn find_marker_outside_code_blocks(text: &str, marker: &str) -> Option<usize> {
    let mut in_code_block = false;
    let mut search_start = 0;

    for line in text.lines() {
        let line_start = text[search_start..]
            .find(line)
            .map(|i| search_start + i)
            .unwrap_or(search_start);

        // Check for code block fence
        if line.trim().starts_with("```") {
            in_code_block = !in_code_block;
        }

        // If not in code block, check for marker in this line
        if !in_code_block {
            if let Some(marker_offset) = line.find(marker) {
                return Some(line_start + marker_offset);
            }
        }

        search_start = line_start + line.len();
    }

    // Also check the last bit if there's trailing content
    if !in_code_block {
        if let Some(idx) = text.find(marker) {
            // Verify it's not in a code block by checking
            let text_before = &text[..idx];
            let fence_count = text_before.matches("```").count();
            if fence_count.is_multiple_of(2) {
                return Some(idx);
            }
        }
    }

    None
}
