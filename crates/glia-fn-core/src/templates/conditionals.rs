//! `{{#if name}}…{{/if}}` conditional blocks.
//!
//! Blocks pair up by nesting depth. An outer block is decided first; the
//! blocks nested inside it are only looked at when it survives. Unknown
//! condition names count as false.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*(?:#if\s+([A-Za-z_][A-Za-z0-9_]*)|/if)\s*\}\}")
        .expect("conditional marker pattern is valid")
});

#[derive(Debug)]
struct Marker<'t> {
    start: usize,
    end: usize,
    /// `Some(condition)` for an opening marker, `None` for `{{/if}}`.
    open: Option<&'t str>,
}

fn markers(text: &str) -> Vec<Marker<'_>> {
    MARKER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Marker {
                start: whole.start(),
                end: whole.end(),
                open: caps.get(1).map(|m| m.as_str()),
            })
        })
        .collect()
}

/// Index of the `{{/if}}` closing the opening marker at `open_idx`.
fn matching_close(markers: &[Marker<'_>], open_idx: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, marker) in markers.iter().enumerate().skip(open_idx + 1) {
        match marker.open {
            Some(_) => depth += 1,
            None if depth == 0 => return Some(idx),
            None => depth -= 1,
        }
    }
    None
}

/// Keep or drop each conditional block according to `conditions`.
///
/// Stray `{{/if}}` markers are stripped. An opener that never closes runs to
/// the end of its scope: the rest of the text is kept only when its condition
/// is true.
pub fn apply_conditionals(text: &str, conditions: &BTreeMap<String, bool>) -> String {
    let markers = markers(text);
    if markers.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut idx = 0;

    while idx < markers.len() {
        let marker = &markers[idx];
        out.push_str(&text[cursor..marker.start]);

        let Some(condition) = marker.open else {
            cursor = marker.end;
            idx += 1;
            continue;
        };

        let keep = conditions.get(condition).copied().unwrap_or(false);
        match matching_close(&markers, idx) {
            Some(close_idx) => {
                let close = &markers[close_idx];
                if keep {
                    let inner = &text[marker.end..close.start];
                    out.push_str(&apply_conditionals(inner, conditions));
                }
                cursor = close.end;
                idx = close_idx + 1;
            }
            None if keep => {
                cursor = marker.end;
                idx += 1;
            }
            None => {
                cursor = text.len();
                break;
            }
        }
    }

    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conds(pairs: &[(&str, bool)]) -> BTreeMap<String, bool> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_true_block_kept_without_markers() {
        let out = apply_conditionals("a{{#if kv}}B{{/if}}c", &conds(&[("kv", true)]));
        assert_eq!(out, "aBc");
    }

    #[test]
    fn test_false_block_removed() {
        let out = apply_conditionals("a{{#if kv}}B{{/if}}c", &conds(&[("kv", false)]));
        assert_eq!(out, "ac");
    }

    #[test]
    fn test_nested_inner_evaluated_when_outer_survives() {
        let text = "{{#if a}}1{{#if b}}2{{/if}}3{{/if}}";
        assert_eq!(apply_conditionals(text, &conds(&[("a", true), ("b", true)])), "123");
        assert_eq!(apply_conditionals(text, &conds(&[("a", true), ("b", false)])), "13");
        assert_eq!(apply_conditionals(text, &conds(&[("a", false), ("b", true)])), "");
    }

    #[test]
    fn test_empty_conditions_strip_everything() {
        let text = "x{{#if a}}1{{#if b}}2{{#if c}}3{{/if}}{{/if}}{{/if}}y{{#if d}}z{{/if}}";
        assert_eq!(apply_conditionals(text, &BTreeMap::new()), "xy");
    }

    #[test]
    fn test_sibling_blocks() {
        let text = "{{#if a}}A{{/if}}-{{#if b}}B{{/if}}";
        assert_eq!(apply_conditionals(text, &conds(&[("b", true)])), "-B");
    }

    #[test]
    fn test_unmatched_markers_stripped() {
        assert_eq!(apply_conditionals("a{{/if}}b", &BTreeMap::new()), "ab");
        assert_eq!(apply_conditionals("a{{#if x}}b", &BTreeMap::new()), "a");
        assert_eq!(apply_conditionals("a{{#if x}}b", &conds(&[("x", false)])), "a");
        assert_eq!(apply_conditionals("a{{#if x}}b", &conds(&[("x", true)])), "ab");
    }

    #[test]
    fn test_unclosed_opener_inside_block_drops_to_block_end() {
        let text = "{{#if a}}1{{#if b}}2{{/if}}3{{#if c}}4{{/if}}5";
        // `a` never closes: `b` and `c` take the two closers.
        assert_eq!(apply_conditionals(text, &conds(&[("a", true)])), "135");
        assert_eq!(apply_conditionals(text, &conds(&[("a", true), ("c", true)])), "1345");
        assert_eq!(apply_conditionals(text, &conds(&[("b", true)])), "");
    }

    #[test]
    fn test_plain_placeholders_untouched() {
        let out = apply_conditionals("{{name}}{{#if a}}!{{/if}}", &conds(&[("a", true)]));
        assert_eq!(out, "{{name}}!");
    }
}
