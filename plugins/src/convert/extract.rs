use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

static FENCE_REGEX: OnceLock<Regex> = OnceLock::new();

fn fence_re() -> &'static Regex {
    FENCE_REGEX.get_or_init(|| {
        Regex::new(r"(?s)^```(?:json)?\s*(.*?)\s*```$").expect("FENCE_REGEX is valid")
    })
}

/// Pulls a JSON value out of an extraction engine reply.
///
/// Accepts a bare JSON document, a markdown `json` fence, or prose with a
/// single embedded object. Returns `None` when nothing parses or the value
/// is `null`.
pub fn extract_json_from_string(input: &str) -> Option<Value> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let body = fence_re()
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    let parsed = serde_json::from_str::<Value>(body).ok().or_else(|| {
        let start = body.find('{')?;
        let end = body.rfind('}')?;
        if end <= start {
            return None;
        }
        serde_json::from_str::<Value>(&body[start..=end]).ok()
    });

    match parsed {
        Some(Value::Null) | None => {
            tracing::debug!(
                target: "docflow.convert",
                len = input.len(),
                "no json found in converter reply"
            );
            None
        }
        Some(v) => Some(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_bare_json() {
        assert_eq!(
            extract_json_from_string(r#"{"agreement":{"agreement_name":"Lease"}}"#),
            Some(json!({"agreement": {"agreement_name": "Lease"}}))
        );
    }

    #[test]
    fn test_fenced_json() {
        let reply = "```json\n{\"agreement\": {\"parties\": []}}\n```";
        assert_eq!(
            extract_json_from_string(reply),
            Some(json!({"agreement": {"parties": []}}))
        );
    }

    #[test]
    fn test_unlabelled_fence() {
        assert_eq!(extract_json_from_string("```\n[1, 2]\n```"), Some(json!([1, 2])));
    }

    #[test]
    fn test_object_inside_prose() {
        let reply = "Here is the record: {\"agreement\": {\"agreement_type\": \"NDA\"}} Done.";
        assert_eq!(
            extract_json_from_string(reply),
            Some(json!({"agreement": {"agreement_type": "NDA"}}))
        );
    }

    #[test]
    fn test_non_json_is_none() {
        assert_eq!(extract_json_from_string("I could not read this file."), None);
        assert_eq!(extract_json_from_string("   "), None);
        assert_eq!(extract_json_from_string("null"), None);
    }
}
