//! Content fingerprints: the cache key for analysis results.
//!
//! Two payloads that differ only in casing, whitespace, blank lines, key order or
//! volatile bookkeeping fields hash identically.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Keys stripped at any depth before hashing.
pub const VOLATILE_KEYS: &[&str] = &[
    "metadata",
    "updated_at",
    "created_at",
    "uploaded_at",
    "timestamp",
    "last_modified",
    "parsed_at",
];

/// Lower-cases, drops blank lines and collapses every whitespace run to one space.
pub fn normalize_text(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Canonical, normalized serialization of structured content.
pub fn canonical_content(value: &Value) -> String {
    normalize_text(&canonicalize(value).to_string())
}

pub fn content_hash(normalized: &str) -> String {
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map
                .iter()
                .filter(|(k, _)| !VOLATILE_KEYS.contains(&k.as_str()))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            let mut out = Map::new();
            for (k, v) in entries {
                out.insert(k.clone(), canonicalize(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::String(s) => Value::String(normalize_text(s)),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_collapses_whitespace_and_case() {
        assert_eq!(
            normalize_text("  Senior   Engineer\n\n\n  Built APIs\t fast  "),
            "senior engineer built apis fast"
        );
    }

    #[test]
    fn test_hash_is_stable_hex_sha256() {
        let h = content_hash("");
        assert_eq!(
            h,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(content_hash("abc"), content_hash("abc"));
    }

    #[test]
    fn test_volatile_keys_do_not_change_fingerprint() {
        let a = json!({
            "summary": "Backend engineer",
            "metadata": {"uploaded_at": "2024-01-01"},
            "experience": [{"title": "Engineer", "updated_at": "2024-01-02"}]
        });
        let b = json!({
            "summary": "Backend engineer",
            "metadata": {"uploaded_at": "2025-06-30"},
            "experience": [{"title": "Engineer", "updated_at": "2025-07-01"}]
        });
        assert_eq!(canonical_content(&a), canonical_content(&b));
    }

    #[test]
    fn test_formatting_only_changes_do_not_change_fingerprint() {
        let a = json!({"summary": "Backend   engineer", "skills": [{"name": "Rust"}]});
        let b = json!({"skills": [{"name": "rust"}], "summary": "backend engineer"});
        assert_eq!(
            content_hash(&canonical_content(&a)),
            content_hash(&canonical_content(&b))
        );
    }

    #[test]
    fn test_substantive_change_changes_fingerprint() {
        let a = json!({"summary": "Backend engineer"});
        let b = json!({"summary": "Frontend engineer"});
        assert_ne!(
            content_hash(&canonical_content(&a)),
            content_hash(&canonical_content(&b))
        );
    }

    #[test]
    fn test_blank_lines_inside_strings_are_ignored() {
        let a = json!({"summary": "Built APIs\n\n\nShipped fast"});
        let b = json!({"summary": "built apis shipped fast"});
        assert_eq!(canonical_content(&a), canonical_content(&b));
    }
}
