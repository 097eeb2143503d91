//! Success detection for remote responses.
//!
//! Each check is a pure function of the response. Checks run in
//! [`SUCCESS_CHECKS`] order and the first one that matches wins. The list is
//! a compile-time constant so the behaviour can only change with a release.

use serde_json::{Map, Value};

/// The parts of an HTTP response the checks look at.
#[derive(Debug, Clone)]
pub struct RemoteResponse<'a> {
    pub status: u16,
    pub body: &'a str,
    /// Body parsed as a JSON object, if it is one.
    json: Option<Map<String, Value>>,
}

impl<'a> RemoteResponse<'a> {
    pub fn new(status: u16, body: &'a str) -> Self {
        let json = match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        };
        Self { status, body, json }
    }

    pub fn json_field(&self, key: &str) -> Option<&Value> {
        self.json.as_ref().and_then(|m| m.get(key))
    }
}

/// A named success predicate.
pub struct SuccessCheck {
    pub name: &'static str,
    pub check: fn(&RemoteResponse<'_>) -> bool,
}

/// Ordered success predicates.
pub const SUCCESS_CHECKS: &[SuccessCheck] = &[
    SuccessCheck {
        name: "ok_status_with_success_text",
        check: ok_status_with_success_text,
    },
    SuccessCheck {
        name: "json_success_flag",
        check: json_success_flag,
    },
    SuccessCheck {
        name: "json_success_code",
        check: json_success_code,
    },
    SuccessCheck {
        name: "json_success_status",
        check: json_success_status,
    },
];

/// Name of the first check that matches, or `None` when the response
/// carries no success signal.
pub fn classify(resp: &RemoteResponse<'_>) -> Option<&'static str> {
    SUCCESS_CHECKS
        .iter()
        .find(|c| (c.check)(resp))
        .map(|c| c.name)
}

/// HTTP 200 and the body mentions success ("成功" or "success", any case).
fn ok_status_with_success_text(resp: &RemoteResponse<'_>) -> bool {
    resp.status == 200
        && (resp.body.contains("成功") || resp.body.to_lowercase().contains("success"))
}

/// `{"success": true}`
fn json_success_flag(resp: &RemoteResponse<'_>) -> bool {
    matches!(resp.json_field("success"), Some(Value::Bool(true)))
}

/// `{"code": 0}` or `{"code": 200}`
fn json_success_code(resp: &RemoteResponse<'_>) -> bool {
    resp.json_field("code")
        .and_then(Value::as_f64)
        .is_some_and(|code| code == 0.0 || code == 200.0)
}

/// `{"status": "ok"}` or `{"status": "success"}`
fn json_success_status(resp: &RemoteResponse<'_>) -> bool {
    matches!(
        resp.json_field("status").and_then(Value::as_str),
        Some("ok" | "success")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_raw(status: u16, body: &str) -> Option<&'static str> {
        classify(&RemoteResponse::new(status, body))
    }

    #[test]
    fn json_success_true_is_success() {
        assert_eq!(
            classify_raw(200, r#"{"success": true}"#),
            Some("ok_status_with_success_text")
        );
        // Without a 200 the JSON flag alone still counts.
        assert_eq!(
            classify_raw(202, r#"{"success": true}"#),
            Some("json_success_flag")
        );
    }

    #[test]
    fn chinese_success_text_in_html() {
        assert_eq!(
            classify_raw(200, "<html>提交成功</html>"),
            Some("ok_status_with_success_text")
        );
    }

    #[test]
    fn success_text_is_case_insensitive() {
        assert!(classify_raw(200, "Steps SUCCESSFULLY updated").is_some());
    }

    #[test]
    fn success_text_needs_status_200() {
        assert_eq!(classify_raw(500, "<html>提交成功</html>"), None);
    }

    #[test]
    fn json_code_500_is_failure() {
        assert_eq!(classify_raw(200, r#"{"code": 500}"#), None);
    }

    #[test]
    fn json_code_zero_or_200_is_success() {
        assert_eq!(classify_raw(200, r#"{"code": 0}"#), Some("json_success_code"));
        assert_eq!(classify_raw(200, r#"{"code": 200, "msg": "ok"}"#), Some("json_success_code"));
        assert_eq!(classify_raw(200, r#"{"code": "0"}"#), None);
    }

    #[test]
    fn json_status_strings() {
        assert_eq!(classify_raw(200, r#"{"status": "ok"}"#), Some("json_success_status"));
        assert_eq!(classify_raw(200, r#"{"status": "error"}"#), None);
    }

    #[test]
    fn json_success_false_is_failure() {
        assert_eq!(classify_raw(400, r#"{"success": false, "code": 1}"#), None);
    }

    #[test]
    fn success_word_anywhere_wins_on_200() {
        // Ambiguous text leans towards success.
        assert!(classify_raw(200, r#"{"success": false}"#).is_some());
    }

    #[test]
    fn non_object_json_is_ignored() {
        assert_eq!(classify_raw(200, "[0]"), None);
        assert_eq!(classify_raw(200, "0"), None);
    }

    #[test]
    fn empty_body_is_failure() {
        assert_eq!(classify_raw(200, ""), None);
    }
}
