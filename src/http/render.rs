//! Body encoders used by the context write helpers.

use serde::Serialize;
use serde_json::Value;

use crate::error::TemplateError;

/// Escape `input` so it can be embedded in a JavaScript string or
/// identifier position without terminating it.
pub fn js_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '<' => out.push_str("\\u003C"),
            '>' => out.push_str("\\u003E"),
            '&' => out.push_str("\\u0026"),
            '=' => out.push_str("\\u003D"),
            c if (c as u32) < 0x20 || c == '\u{2028}' || c == '\u{2029}' => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

/// `callback(<json>)` with the callback escaped.
pub fn jsonp<T: Serialize + ?Sized>(callback: &str, data: &T) -> Result<Vec<u8>, serde_json::Error> {
    let payload = serde_json::to_vec(data)?;
    let callback = js_escape(callback);

    let mut body = Vec::with_capacity(callback.len() + payload.len() + 2);
    body.extend_from_slice(callback.as_bytes());
    body.push(b'(');
    body.extend_from_slice(&payload);
    body.push(b')');
    Ok(body)
}

/// Render `{{ .Field }}` style placeholders against `data`.
///
/// Paths are dot-separated and may start with a dot; `{{ . }}` is the
/// whole value. Missing keys render as an empty string.
pub fn render_template(source: &str, data: &Value) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    let mut offset = 0;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or(TemplateError::Unterminated(offset + start))?;

        if let Some(value) = lookup(data, after[..end].trim()) {
            match value {
                Value::Null => {}
                Value::String(s) => out.push_str(s),
                other => out.push_str(&other.to_string()),
            }
        }

        let consumed = start + 2 + end + 2;
        offset += consumed;
        rest = &rest[consumed..];
    }

    out.push_str(rest);
    Ok(out)
}

fn lookup<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix('.').unwrap_or(path);
    if path.is_empty() {
        return Some(data);
    }

    path.split('.').try_fold(data, |value, key| match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
