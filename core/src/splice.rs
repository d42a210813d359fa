//! Managed-section splicing for human-owned documents.
//!
//! Generated policy content lives between two sentinel marker lines inside an
//! otherwise human-authored document. The splicer replaces exactly that
//! region on re-apply, leaving every byte outside it untouched.

/// Opening sentinel of the machine-owned region. Must match byte-for-byte on
/// write and re-parse.
pub const EGOKIT_BEGIN_MARKER: &str = "<!-- BEGIN-EGOKIT-POLICIES -->";
/// Closing sentinel of the machine-owned region.
pub const EGOKIT_END_MARKER: &str = "<!-- END-EGOKIT-POLICIES -->";

/// Locate the managed section in `text`.
///
/// Returns the byte offsets spanning from the begin marker through the end
/// marker inclusive, or `None` when either marker is missing or the end
/// marker precedes the begin marker.
pub fn find_managed_section(text: &str) -> Option<(usize, usize)> {
    let start = text.find(EGOKIT_BEGIN_MARKER)?;
    let end_start = text.find(EGOKIT_END_MARKER)?;
    if end_start < start {
        return None;
    }
    Some((start, end_start + EGOKIT_END_MARKER.len()))
}

/// Split `text` into the human-owned content before and after the managed
/// section. When no section is present the whole input is `before`.
pub fn extract_human_content(text: &str) -> (&str, &str) {
    match find_managed_section(text) {
        Some((start, end)) => (&text[..start], &text[end..]),
        None => (text, ""),
    }
}

/// Splice `section` into a document.
///
/// - `existing` absent: returns `template` (a full new document already
///   embedding the section).
/// - managed section found: replaces exactly the spanned region.
/// - no section found: appends the section to the end, original content
///   unchanged before it. Callers wanting confirmation before an append must
///   ask first; the splice itself is unconditional.
///
/// Re-applying the same section to the output is a no-op after the second
/// application.
pub fn splice(existing: Option<&str>, section: &str, template: &str) -> String {
    let Some(text) = existing else {
        return template.to_string();
    };

    match find_managed_section(text) {
        Some((start, end)) => {
            let mut result = String::with_capacity(text.len() + section.len());
            result.push_str(&text[..start]);
            result.push_str(section);
            result.push_str(&text[end..]);
            result
        }
        None => {
            let mut result = String::with_capacity(text.len() + section.len() + 2);
            result.push_str(text);
            if !text.is_empty() && !text.ends_with('\n') {
                result.push('\n');
            }
            result.push('\n');
            result.push_str(section);
            result.push('\n');
            result
        }
    }
}
