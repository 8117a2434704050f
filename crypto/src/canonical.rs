//! Deterministic JSON rendering.
//!
//! Object members are emitted in ascending order of their UTF-16 code
//! units, with no insignificant whitespace. Strings use the standard JSON
//! escapes. Numbers are rendered the way ECMAScript prints a double, so
//! `1.0` and `1` hash alike. The ordering is applied here rather than relied upon from
//! `serde_json::Map`, whose iteration order depends on crate features.

use serde::Serialize;
use serde_json::{Number, Value};

use crate::CodecError;

/// Serialize `value` and render it canonically.
pub fn canonicalize<T: Serialize + ?Sized>(value: &T) -> Result<String, CodecError> {
    let value = serde_json::to_value(value)?;
    Ok(canonicalize_value(&value))
}

/// Render an already-built JSON value canonically.
pub fn canonicalize_value(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(n, out),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut members: Vec<(&String, &Value)> = map.iter().collect();
            members.sort_by(|(a, _), (b, _)| a.encode_utf16().cmp(b.encode_utf16()));
            out.push('{');
            for (i, (key, item)) in members.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(item, out);
            }
            out.push('}');
        }
    }
}

/// Largest integer a double holds exactly.
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

fn write_number(n: &Number, out: &mut String) {
    if let Some(i) = n.as_i64().filter(|i| i.unsigned_abs() <= MAX_SAFE_INTEGER) {
        out.push_str(&i.to_string());
        return;
    }
    if let Some(u) = n.as_u64().filter(|u| *u <= MAX_SAFE_INTEGER) {
        out.push_str(&u.to_string());
        return;
    }
    match n.as_f64() {
        Some(f) if f.is_finite() => write_double(f, out),
        _ => out.push_str(&n.to_string()),
    }
}

/// ECMAScript `Number::toString` for a finite double.
fn write_double(f: f64, out: &mut String) {
    if f == 0.0 {
        out.push('0');
        return;
    }
    if f < 0.0 {
        out.push('-');
    }
    // `{:e}` yields the shortest digits that round-trip.
    let sci = format!("{:e}", f.abs());
    let Some((mantissa, exp)) = sci.split_once('e') else {
        out.push_str(&sci);
        return;
    };
    let Ok(exp) = exp.parse::<i32>() else {
        out.push_str(&sci);
        return;
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let n = exp + 1;

    if k <= n && n <= 21 {
        out.push_str(&digits);
        out.extend(std::iter::repeat('0').take((n - k) as usize));
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        out.push_str(int);
        out.push('.');
        out.push_str(frac);
    } else if -6 < n && n <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat('0').take((-n) as usize));
        out.push_str(&digits);
    } else {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        out.push('e');
        out.push(if n - 1 < 0 { '-' } else { '+' });
        out.push_str(&(n - 1).abs().to_string());
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_keys_and_strips_whitespace() {
        let v = json!({ "b": 1, "a": [true, null, "x"] });
        assert_eq!(canonicalize_value(&v), r#"{"a":[true,null,"x"],"b":1}"#);
    }

    #[test]
    fn sorts_nested_objects() {
        let v = json!({ "z": { "y": 1, "x": 2 }, "T": 0 });
        assert_eq!(canonicalize_value(&v), r#"{"T":0,"z":{"x":2,"y":1}}"#);
    }

    #[test]
    fn escapes_control_characters() {
        let v = json!("a\"b\\c\nd\u{1}");
        assert_eq!(canonicalize_value(&v), r#""a\"b\\c\nd\u0001""#);
    }

    #[test]
    fn leaves_non_ascii_unescaped() {
        let v = json!({ "k": "caf\u{e9}" });
        assert_eq!(canonicalize_value(&v), "{\"k\":\"caf\u{e9}\"}");
    }

    #[test]
    fn numbers_use_ecmascript_form() {
        let cases = [
            (json!(1.0), "1"),
            (json!(1e21), "1e+21"),
            (json!(1e20), "100000000000000000000"),
            (json!(0.000001), "0.000001"),
            (json!(1e-7), "1e-7"),
            (json!(1.5), "1.5"),
            (json!(-0.0), "0"),
            (json!(-2.5), "-2.5"),
            (json!(123.456), "123.456"),
            (json!(1.2345e-9), "1.2345e-9"),
            (json!(u64::MAX), "18446744073709552000"),
            (json!(-42), "-42"),
        ];
        for (value, expected) in cases {
            assert_eq!(canonicalize_value(&value), expected, "{value}");
        }
    }

    #[test]
    fn matches_serde_json_for_plain_strings() {
        let s = "tab\there \u{1f} end";
        assert_eq!(
            canonicalize_value(&json!(s)),
            serde_json::to_string(s).unwrap()
        );
    }
}
