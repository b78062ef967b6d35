//! Recovers a JSON object from LLM output that may carry leading/trailing
//! prose (spec §4.F/§6.4: "the parser recovers from pre/post prose by
//! extracting the outermost balanced-brace span").

use anyhow::{Result, anyhow};
use serde_json::Value;

/// Scans for the first `{`, then tracks brace depth (ignoring braces inside
/// string literals) until it returns to zero, and parses that span as JSON.
pub fn extract_outer_object(payload: &str) -> Result<Value> {
    let bytes = payload.as_bytes();
    let start = payload
        .find('{')
        .ok_or_else(|| anyhow!("no JSON object found in response"))?;

    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut end = None;

    for (idx, &byte) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(idx);
                    break;
                }
            }
            _ => {}
        }
    }

    let end = end.ok_or_else(|| anyhow!("unbalanced braces in response"))?;
    let span = &payload[start..=end];
    serde_json::from_str(span).map_err(|e| anyhow!("malformed JSON in extracted span: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_object_with_surrounding_prose() {
        let payload = "Here you go:\n{\"groups\": []}\nHope that helps!";
        let value = extract_outer_object(payload).expect("parses");
        assert_eq!(value["groups"], serde_json::json!([]));
    }

    #[test]
    fn ignores_braces_inside_strings() {
        let payload = r#"{"connection": "uses { and } in dialogue", "groups": []}"#;
        let value = extract_outer_object(payload).expect("parses");
        assert_eq!(value["connection"], "uses { and } in dialogue");
    }

    #[test]
    fn errors_on_missing_brace() {
        let payload = "no json here";
        assert!(extract_outer_object(payload).is_err());
    }

    #[test]
    fn errors_on_unbalanced_braces() {
        let payload = "{\"groups\": [}";
        assert!(extract_outer_object(payload).is_err());
    }
}
