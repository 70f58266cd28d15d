//! Canonical JSON encoding for content addressing.
//!
//! A value is encoded as UTF-8 JSON with:
//! - Object keys sorted by code point at every nesting level
//! - No insignificant whitespace (`,` and `:` separators only)
//! - Non-ASCII characters written literally, never `\u` escaped
//! - Only `"`, `\` and control characters escaped
//! - Integers with their exact digits, however large
//! - Floats in shortest round-trip form (ties to even), scientific notation
//!   outside `1e-4 <= |x| < 1e16` with a signed, two-digit minimum exponent
//!
//! These rules reproduce the serialization the receipt gateway signs, so the
//! bytes must not drift. A content id is `sha256:` + hex(SHA-256(bytes)).

use serde_json::{Map, Number, Value};

use crate::crypto::Sha256Hash;
use crate::types::ContentId;

/// Encode a JSON value to canonical bytes.
pub fn canonical_value_bytes(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Compute the content id of a JSON value.
pub fn content_id(value: &Value) -> ContentId {
    ContentId::from_digest(Sha256Hash::hash(&canonical_value_bytes(value)))
}

/// Recursively encode a JSON value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.extend_from_slice(b"null"),
        Value::Bool(true) => buf.extend_from_slice(b"true"),
        Value::Bool(false) => buf.extend_from_slice(b"false"),
        Value::Number(n) => encode_number(buf, n),
        Value::String(s) => encode_string(buf, s),
        Value::Array(items) => {
            buf.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                encode_value_to(buf, item);
            }
            buf.push(b']');
        }
        Value::Object(map) => encode_object(buf, map),
    }
}

/// Encode an object with keys in sorted order.
///
/// Sorting here rather than relying on the map's iteration order keeps the
/// output stable even if `serde_json/preserve_order` is enabled somewhere in
/// the dependency graph.
fn encode_object(buf: &mut Vec<u8>, map: &Map<String, Value>) {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    // Byte order of UTF-8 equals code point order.
    entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    buf.push(b'{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        encode_string(buf, key);
        buf.push(b':');
        encode_value_to(buf, value);
    }
    buf.push(b'}');
}

/// Encode a string with minimal escaping.
fn encode_string(buf: &mut Vec<u8>, s: &str) {
    buf.push(b'"');
    for ch in s.chars() {
        match ch {
            '"' => buf.extend_from_slice(b"\\\""),
            '\\' => buf.extend_from_slice(b"\\\\"),
            '\n' => buf.extend_from_slice(b"\\n"),
            '\r' => buf.extend_from_slice(b"\\r"),
            '\t' => buf.extend_from_slice(b"\\t"),
            '\u{08}' => buf.extend_from_slice(b"\\b"),
            '\u{0c}' => buf.extend_from_slice(b"\\f"),
            c if (c as u32) < 0x20 => {
                buf.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut tmp = [0u8; 4];
                buf.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
            }
        }
    }
    buf.push(b'"');
}

/// Encode a number.
///
/// Integers keep their exact digits at any magnitude. Anything else is
/// re-read as the nearest `f64` and written by [`float_repr`].
fn encode_number(buf: &mut Vec<u8>, n: &Number) {
    if let Some(i) = n.as_i64() {
        buf.extend_from_slice(i.to_string().as_bytes());
    } else if let Some(u) = n.as_u64() {
        buf.extend_from_slice(u.to_string().as_bytes());
    } else {
        // With `arbitrary_precision` the display form is the source text.
        let text = n.to_string();
        if is_integer_text(&text) {
            buf.extend_from_slice(text.as_bytes());
        } else {
            let f = text.parse::<f64>().unwrap_or(f64::NAN);
            buf.extend_from_slice(float_repr(f).as_bytes());
        }
    }
}

fn is_integer_text(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Shortest round-trip float text, ties to even, with a fixed/scientific
/// switch at decimal exponents -4 and 16.
fn float_repr(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f < 0.0 { "-Infinity" } else { "Infinity" }.to_string();
    }
    let sign = if f.is_sign_negative() { "-" } else { "" };
    if f == 0.0 {
        return format!("{sign}0.0");
    }

    let mut buffer = ryu::Buffer::new();
    let (digits, exp) = decimal_digits(buffer.format_finite(f.abs()));

    let mut out = String::from(sign);
    if (-4..16).contains(&exp) {
        if exp >= 0 {
            let int_len = exp as usize + 1;
            if digits.len() <= int_len {
                out.push_str(&digits);
                out.push_str(&"0".repeat(int_len - digits.len()));
                out.push_str(".0");
            } else {
                out.push_str(&digits[..int_len]);
                out.push('.');
                out.push_str(&digits[int_len..]);
            }
        } else {
            out.push_str("0.");
            out.push_str(&"0".repeat((-exp - 1) as usize));
            out.push_str(&digits);
        }
    } else {
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        let exp_sign = if exp < 0 { '-' } else { '+' };
        out.push_str(&format!("e{exp_sign}{:02}", exp.abs()));
    }
    out
}

/// Split positive decimal text (`"123.45"`, `"1e16"`, `"1.5e-7"`) into its
/// significant digits and the decimal exponent of the first digit.
///
/// The input must be non-zero.
fn decimal_digits(text: &str) -> (String, i32) {
    let (mantissa, exp) = match text.split_once(['e', 'E']) {
        Some((mantissa, exp)) => (mantissa, exp.parse::<i32>().unwrap_or(0)),
        None => (text, 0),
    };
    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    let all: String = int.chars().chain(frac.chars()).collect();
    let leading = all.len() - all.trim_start_matches('0').len();
    let digits = all.trim_matches('0').to_string();
    let exp = exp + int.len() as i32 - 1 - leading as i32;
    (digits, exp)
}
