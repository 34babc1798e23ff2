// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;

/// Substitute `{{key}}` placeholders in `content` using the provided `vars`.
/// Keys are looked up case-sensitively.  Unknown placeholders are left as-is.
pub fn apply_template(content: &str, vars: &HashMap<String, String>) -> String {
    if vars.is_empty() || !content.contains("{{") {
        return content.to_string();
    }

    let mut result = content.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

/// Parse a `KEY=VALUE` string into a `(key, value)` pair.
/// The key is trimmed; the value is kept verbatim after the first `=`.
pub fn parse_var(spec: &str) -> Option<(String, String)> {
    let (k, v) = spec.split_once('=')?;
    if k.trim().is_empty() {
        return None;
    }
    Some((k.trim().to_string(), v.to_string()))
}

// ─── Unit tests ───────────────────────────────────────────────────────────────
