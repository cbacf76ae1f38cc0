//! Recovery of tool calls that an upstream integration glued together.
//!
//! Some model integrations emit two or more calls as one: the tool names are
//! concatenated with no separator and so are the JSON argument objects. The
//! functions here are pure so they can be tested in isolation.

use log::debug;
use notegate_protocol::{RawArguments, ToolCallRequest};
use std::collections::HashSet;

/// Split `name` into a sequence of known tool names.
///
/// Candidates are tried longest-first with backtracking; the first complete
/// consumption of `name` wins. Returns `None` when no sequence of known names
/// spells `name` exactly.
pub fn decompose_tool_name(name: &str, known: &[String]) -> Option<Vec<String>> {
    if name.is_empty() {
        return None;
    }
    let mut candidates: Vec<&str> = known
        .iter()
        .map(String::as_str)
        .filter(|candidate| !candidate.is_empty())
        .collect();
    candidates.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    candidates.dedup();

    let mut dead_ends = HashSet::new();
    consume(name, &candidates, &mut dead_ends)
        .map(|parts| parts.into_iter().map(str::to_string).collect())
}

/// Depth-first search over offsets into `name`, driven by an explicit stack
/// of `(offset, next candidate index)` frames so long names cannot exhaust
/// the thread stack. `dead_ends` remembers offsets already proven unsolvable.
fn consume<'a>(
    name: &str,
    candidates: &[&'a str],
    dead_ends: &mut HashSet<usize>,
) -> Option<Vec<&'a str>> {
    let mut frames: Vec<(usize, usize)> = vec![(0, 0)];
    let mut parts: Vec<&'a str> = Vec::new();

    while let Some((offset, next)) = frames.last_mut() {
        let offset = *offset;
        if offset == name.len() {
            return Some(parts);
        }
        let rest = &name[offset..];
        let found = if dead_ends.contains(&offset) {
            None
        } else {
            candidates[*next..]
                .iter()
                .position(|candidate| rest.starts_with(candidate))
                .map(|pos| *next + pos)
        };
        match found {
            Some(idx) => {
                *next = idx + 1;
                let candidate = candidates[idx];
                parts.push(candidate);
                frames.push((offset + candidate.len(), 0));
            }
            None => {
                dead_ends.insert(offset);
                frames.pop();
                parts.pop();
            }
        }
    }
    None
}

/// Split a string of back-to-back JSON objects into one string per object.
///
/// A fragment ends whenever brace depth returns to zero. Braces inside string
/// literals are ignored. Text between fragments is dropped, as is a trailing
/// unterminated fragment.
pub fn split_concatenated_json(raw: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in raw.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(idx);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0
                    && let Some(begin) = start.take()
                {
                    fragments.push(raw[begin..=idx].to_string());
                }
            }
            _ => {}
        }
    }
    fragments
}

/// Rebuild a concatenated call as its constituent calls.
///
/// Names pair positionally with argument fragments; a missing fragment
/// becomes `{}`. The first call keeps the original id and the rest get
/// `<id>_split1`, `<id>_split2`, and so on. Returns `None` unless the name
/// decomposes into at least two known tools.
pub fn recover_concatenated_call(
    request: &ToolCallRequest,
    known: &[String],
) -> Option<Vec<ToolCallRequest>> {
    let names = decompose_tool_name(&request.tool_name, known)?;
    if names.len() < 2 {
        return None;
    }
    let raw = match &request.arguments {
        RawArguments::Text(text) => text.clone(),
        RawArguments::Structured(value) => value.to_string(),
    };
    let mut fragments = split_concatenated_json(&raw).into_iter();
    debug!(
        "decomposed concatenated tool call (id={}, name={}, parts={})",
        request.id,
        request.tool_name,
        names.len()
    );

    let calls = names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let id = if idx == 0 {
                request.id.clone()
            } else {
                format!("{}_split{idx}", request.id)
            };
            let arguments = fragments.next().unwrap_or_else(|| "{}".to_string());
            ToolCallRequest::new(id, name, RawArguments::Text(arguments))
        })
        .collect();
    Some(calls)
}
