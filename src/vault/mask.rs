//! Display-safe masking for sensitive values.

use serde_json::Value;

/// Field names treated as sensitive wherever they appear in a log payload.
///
/// Matching ignores case, `_` and `-` (`accountNumber` == `account_number`).
pub const SENSITIVE_FIELDS: &[&str] = &[
    "account_number",
    "account_name",
    "phone",
    "phone_number",
    "card_number",
    "cvv",
    "iban",
    "proof_image",
    "proof_image_ref",
    "notes",
    "destination",
    "destination_details",
    "password",
    "secret",
    "token",
    "client_secret",
    "api_key",
    "signature",
    "authorization",
];

const DEFAULT_VISIBLE: usize = 4;

/// Mask all but the last `visible_chars` characters.
///
/// Values not longer than `visible_chars` are masked entirely.
pub fn mask(value: &str, visible_chars: usize) -> String {
    let len = value.chars().count();
    if len <= visible_chars {
        return "*".repeat(len.max(1));
    }
    let tail: String = value.chars().skip(len - visible_chars).collect();
    format!("{}{}", "*".repeat(len - visible_chars), tail)
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn is_sensitive_field(key: &str) -> bool {
    let key = normalize_key(key);
    SENSITIVE_FIELDS.iter().any(|f| normalize_key(f) == key)
}

/// Deep copy of `value` with every sensitive field replaced by its masked form.
pub fn sanitize_for_logging(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = if is_sensitive_field(k) {
                        mask_value(v)
                    } else {
                        sanitize_for_logging(v)
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_for_logging).collect()),
        other => other.clone(),
    }
}

fn mask_value(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(mask(s, DEFAULT_VISIBLE)),
        Value::Number(n) => Value::String(mask(&n.to_string(), DEFAULT_VISIBLE)),
        _ => Value::String("***".to_string()),
    }
}
