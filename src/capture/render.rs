//! Human-readable, redacted rendering of a captured request

use super::redaction::RedactionPolicy;
use super::types::CapturedRequest;
use chrono::SecondsFormat;

const RULE_WIDTH: usize = 60;

pub fn render_capture(
    record: &CapturedRequest,
    policy: &RedactionPolicy,
    body_preview_chars: usize,
) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec![
        rule.clone(),
        format!(
            "CAPTURED {} REQUEST #{}",
            record.target().as_str().to_uppercase(),
            record.id()
        ),
        format!(
            "Timestamp: {}",
            record.timestamp().to_rfc3339_opts(SecondsFormat::Millis, true)
        ),
        format!("Method: {}", record.method()),
        format!("URL: {}", record.url()),
        "Headers:".to_string(),
    ];

    for name in record.headers().keys() {
        let values = record
            .headers()
            .get_all(name)
            .iter()
            .map(|value| value.as_bytes());
        lines.push(format!(
            "   {}: {}",
            name.as_str(),
            policy.redact_values(name.as_str(), values)
        ));
    }

    if !record.body().is_empty() {
        let body = String::from_utf8_lossy(record.body());
        let preview: String = body.chars().take(body_preview_chars).collect();
        let ellipsis = if body.chars().count() > body_preview_chars {
            "..."
        } else {
            ""
        };
        lines.push(format!("Body: {preview}{ellipsis}"));
    }

    lines.push(rule);
    lines.join("\n")
}
