//! Header-delimited key/value table parsing.
//!
//! Device output of the form
//!
//! ```text
//! CHASSIS/SLOT 1/2
//!   Model Name = OS6860,
//!   Serial Number = T123456,
//!   free-form continuation line
//! CHASSIS/SLOT 1/3
//!   ...
//! ```
//!
//! is split into records: each block starts at a header line (recognized by
//! containing the caller's upper-cased marker) and runs until the next header
//! or end of input. Field names are normalized (pipes stripped; slashes,
//! spaces and dashes become underscores; upper-cased) and values are trimmed
//! raw text with no further typing.

use indexmap::IndexMap;

/// One parsed record: normalized field names to trimmed raw values, in
/// insertion order. Later duplicate keys overwrite earlier ones.
pub type Record = IndexMap<String, String>;

/// Stem of synthesized header keys (`PREFIX_1`, `PREFIX_2`, ...).
pub const PREFIX_KEY: &str = "PREFIX";

/// Field collecting free-form lines of a record.
pub const TEXT_KEY: &str = "TEXT";

/// Parse multi-record key/value output.
///
/// `command` and `prompt`, when given, are scrubbed from every line first so
/// echoes do not pollute the fields. A line whose upper-cased form contains
/// `header_marker` starts a new record; its tokens (split on `delimiter`,
/// then on `/`) become header fields, with values binding to keys from the
/// right and `PREFIX_n` names synthesized for leftover leading values.
/// Other lines either contribute `key<delimiter>value` pairs (comma-separated,
/// multiple per line) or accumulate into a synthetic `TEXT` field.
///
/// A key with an empty value becomes a prefix carried onto the field names of
/// the following lines, until the next header resets it.
#[must_use]
pub fn parse_key_value_records(
    data: &str,
    command: Option<&str>,
    prompt: Option<&str>,
    header_marker: &str,
    delimiter: char,
) -> Vec<Record> {
    if data.is_empty() {
        return Vec::new();
    }

    let mut records = Vec::new();
    let mut current: Option<Record> = None;
    let mut found_header = false;
    let mut prefix = String::new();
    let mut text: Option<String> = None;

    for raw in data.lines() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if raw.is_empty() {
            continue;
        }
        let mut line = raw.to_string();
        if let Some(cmd) = command {
            if !cmd.is_empty() {
                line = line.replace(cmd, "");
            }
        }
        if let Some(p) = prompt {
            if !p.is_empty() {
                line = line.replace(p, "");
            }
        }

        if !header_marker.is_empty() && line.to_uppercase().contains(header_marker) {
            if found_header {
                if let Some(record) = current.take() {
                    push_record(&mut records, record, text.take());
                }
            }
            found_header = true;
            prefix.clear();
            current = parse_header(line.trim(), delimiter, '/');
            text = None;
        } else if let Some(buffer) = text.as_mut() {
            buffer.push_str(&line);
            buffer.push_str("\r\n");
        } else if line.contains(delimiter) {
            let record = current.get_or_insert_with(Record::new);
            if let Some(carried) = collect_fields(record, line.trim(), &prefix, delimiter) {
                prefix = carried;
            }
        } else {
            let mut buffer = line;
            buffer.push_str("\r\n");
            text = Some(buffer);
        }
    }

    if found_header {
        if let Some(record) = current.take() {
            push_record(&mut records, record, text.take());
        }
    }
    records
}

fn push_record(records: &mut Vec<Record>, mut record: Record, text: Option<String>) {
    if let Some(text) = text {
        record.insert(TEXT_KEY.to_string(), text);
    }
    records.push(record);
}

/// Parse one `key<delim>value[,key<delim>value...]` line into `record`.
///
/// Returns the new carry-forward prefix when the line contains a key with no
/// value.
fn collect_fields(
    record: &mut Record,
    line: &str,
    current_prefix: &str,
    delimiter: char,
) -> Option<String> {
    let applied_prefix = if current_prefix.is_empty() {
        String::new()
    } else {
        format!("{current_prefix}_")
    };

    let mut entries: Vec<&str> = line.split(',').collect();
    if let Some(first) = entries.first_mut() {
        if first.is_empty() {
            *first = line;
        }
    }

    let mut carried = None;
    for entry in entries {
        if entry.is_empty() {
            continue;
        }
        let parts: Vec<&str> = entry.trim().split(delimiter).collect();
        let Some(&first) = parts.first() else {
            continue;
        };
        if first.is_empty() {
            continue;
        }
        let mut value = String::new();
        if parts.len() > 1 && !parts[1].is_empty() {
            value = parts[1].trim().to_string();
            // Extra delimiters belong to the value ("12:30:05", "a = b = c").
            for (idx, part) in parts.iter().enumerate().skip(2) {
                if idx == 2 && value.len() > 2 {
                    value.push_str(", ");
                    value.push_str(part.trim());
                } else {
                    value.push(':');
                    value.push_str(part.trim());
                }
            }
        }
        if value.is_empty() {
            carried = Some(first.trim().to_uppercase());
        } else {
            record.insert(format!("{applied_prefix}{}", normalize_key(first)), value);
        }
    }
    carried
}

/// Parse a header line into a record of positional key/value bindings.
fn parse_header(line: &str, delimiter: char, separator: char) -> Option<Record> {
    let upper = line.to_uppercase();
    let mut parts: Vec<String> = upper.split(delimiter).map(str::to_string).collect();
    let first = parts.first()?.trim().to_string();
    if first.is_empty() {
        return None;
    }
    if first.contains(' ') {
        // No delimiter between the label and its value: the first two
        // whitespace tokens play those roles.
        let mut tokens = first.split_whitespace();
        let key = tokens.next()?.to_string();
        let value = tokens.next()?.to_string();
        parts = vec![key, value];
    } else {
        parts[0] = first;
    }

    let keys: Vec<&str> = parts[0].split(separator).collect();
    let values_src = parts.get(1)?;
    if values_src.is_empty() {
        return None;
    }
    let values: Vec<&str> = values_src.split(separator).collect();
    if keys.is_empty() || values.is_empty() {
        return None;
    }

    // Rightmost values bind to the real keys; leftover leading values get
    // synthesized PREFIX_n names.
    let keys: Vec<String> = if keys.len() < values.len() {
        let missing = values.len() - keys.len();
        (0..values.len())
            .map(|idx| {
                if idx < missing {
                    format!("{PREFIX_KEY}_{}", idx + 1)
                } else {
                    keys[idx - missing].to_string()
                }
            })
            .collect()
    } else {
        keys.iter().map(|&key| key.to_string()).collect()
    };
    if keys.len() != values.len() {
        return None;
    }

    let mut record = Record::new();
    for (key, value) in keys.iter().zip(values.iter()) {
        if key.is_empty() {
            continue;
        }
        record.insert(normalize_key(key), value.trim().to_string());
    }
    Some(record)
}

/// Normalize a field name: strip pipes, map `/`, space and `-` to `_`,
/// upper-case.
fn normalize_key(key: &str) -> String {
    key.replace('|', "")
        .trim()
        .replace(['/', ' ', '-'], "_")
        .to_uppercase()
}
