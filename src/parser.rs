use std::collections::HashMap;

use crate::env::validate;
use crate::model::{CleanLine, Entry};

/// Parse env entries from text without applying them.
///
/// Duplicate keys keep the last value at the position of their first
/// occurrence.
pub fn parse_str(input: &str) -> Vec<Entry> {
    let mut entries = Vec::new();
    let mut by_key = HashMap::<String, usize>::new();

    for clean in filter_lines(input) {
        let Some((key, value)) = parse_assignment(&clean.text) else {
            continue;
        };
        let entry = Entry {
            key: key.to_owned(),
            value: value.to_owned(),
            line: clean.line,
        };

        if let Some(existing_idx) = by_key.get(&entry.key).copied() {
            entries[existing_idx] = entry;
        } else {
            by_key.insert(entry.key.clone(), entries.len());
            entries.push(entry);
        }
    }

    entries
}

/// Drop blank lines and `#` comments, trimming what remains.
pub fn filter_lines(input: &str) -> Vec<CleanLine> {
    input
        .split('\n')
        .zip(1u32..)
        .filter_map(|(raw, line)| {
            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                return None;
            }
            Some(CleanLine {
                line,
                text: text.to_owned(),
            })
        })
        .collect()
}

/// Split a clean line on its first `=`.
///
/// Returns `None` for lines without `=` or with an empty key. Both sides are
/// trimmed and one layer of surrounding double quotes is removed from the
/// value.
pub fn parse_assignment(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, strip_double_quotes(value.trim())))
}

/// Keep only the last applicable line for every key that is assigned more
/// than once.
///
/// Lines that do not parse as assignments pass through untouched, and so do
/// assignments the target would reject, so their failures are still
/// reported. After this pass at most one line per key can write, so any
/// partition of the result hands disjoint written keys to the workers and a
/// rejected later line never erases an earlier valid value.
pub fn retain_last_assignments(lines: Vec<CleanLine>) -> Vec<CleanLine> {
    let keep: Vec<bool> = {
        let mut last_valid = HashMap::<&str, usize>::new();
        for (idx, clean) in lines.iter().enumerate() {
            if let Some((key, value)) = parse_assignment(&clean.text)
                && validate(key, value).is_ok()
            {
                last_valid.insert(key, idx);
            }
        }
        lines
            .iter()
            .enumerate()
            .map(|(idx, clean)| {
                parse_assignment(&clean.text).is_none_or(|(key, value)| {
                    validate(key, value).is_err() || last_valid.get(key) == Some(&idx)
                })
            })
            .collect()
    };

    lines
        .into_iter()
        .zip(keep)
        .filter_map(|(clean, keep)| keep.then_some(clean))
        .collect()
}

fn strip_double_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(value)
}
