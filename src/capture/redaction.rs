//! Display-time masking of sensitive header values
//!
//! Redaction never touches the stored [`CapturedRequest`](super::CapturedRequest);
//! it only produces the strings that end up in human-facing logs.

pub const MASK_MARKER: &str = "...[HIDDEN FOR SECURITY]";
pub const EMPTY_MARKER: &str = "<empty>";
pub const VALUE_DELIMITER: &str = ", ";

pub fn default_sensitive_tokens() -> Vec<String> {
    vec!["authorization".to_string(), "key".to_string()]
}

#[derive(Debug, Clone)]
pub struct RedactionPolicy {
    sensitive_tokens: Vec<String>,
    visible_prefix_chars: usize,
}

impl RedactionPolicy {
    pub fn new(sensitive_tokens: Vec<String>, visible_prefix_chars: usize) -> Self {
        Self {
            sensitive_tokens: sensitive_tokens
                .into_iter()
                .map(|token| token.to_lowercase())
                .filter(|token| !token.is_empty())
                .collect(),
            visible_prefix_chars,
        }
    }

    pub fn is_sensitive(&self, header_name: &str) -> bool {
        let name = header_name.to_lowercase();
        self.sensitive_tokens
            .iter()
            .any(|token| name.contains(token.as_str()))
    }

    pub fn redact(&self, header_name: &str, header_value: &str) -> String {
        if self.is_sensitive(header_name) {
            // Cap at half the value so short secrets never show in full.
            let total = header_value.chars().count();
            let visible = self.visible_prefix_chars.min(total / 2);
            let prefix: String = header_value.chars().take(visible).collect();
            format!("{prefix}{MASK_MARKER}")
        } else if header_value.is_empty() {
            EMPTY_MARKER.to_string()
        } else {
            header_value.to_string()
        }
    }

    /// Redacts each value independently, then joins them for display.
    pub fn redact_values<'a, I>(&self, header_name: &str, values: I) -> String
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let rendered: Vec<String> = values
            .into_iter()
            .map(|raw| self.redact(header_name, &String::from_utf8_lossy(raw)))
            .collect();

        if rendered.is_empty() {
            EMPTY_MARKER.to_string()
        } else {
            rendered.join(VALUE_DELIMITER)
        }
    }
}

impl Default for RedactionPolicy {
    fn default() -> Self {
        Self::new(default_sensitive_tokens(), 20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "Bearer abcdefghijklmnopqrstuvwxyz";

    #[test]
    fn test_authorization_is_masked() {
        let policy = RedactionPolicy::default();
        let shown = policy.redact("Authorization", TOKEN);
        assert_eq!(shown, "Bearer abcdefghi...[HIDDEN FOR SECURITY]");
        assert!(!shown.contains(TOKEN));
    }

    #[test]
    fn test_long_value_uses_prefix_limit() {
        let policy = RedactionPolicy::default();
        let secret = "x".repeat(100);
        let shown = policy.redact("x-api-key", &secret);
        assert_eq!(shown, format!("{}{}", "x".repeat(20), MASK_MARKER));
    }

    #[test]
    fn test_token_match_is_case_insensitive() {
        let policy = RedactionPolicy::default();
        assert!(policy.is_sensitive("X-API-KEY"));
        assert!(policy.is_sensitive("Proxy-Authorization"));
        assert!(policy.is_sensitive("apikey"));
        assert!(!policy.is_sensitive("content-type"));
    }

    #[test]
    fn test_short_secret_never_shown_in_full() {
        let policy = RedactionPolicy::default();
        for secret in ["", "a", "ab", "abc", "secret-key"] {
            let shown = policy.redact("api-key", secret);
            assert!(shown.ends_with(MASK_MARKER));
            let prefix = shown.trim_end_matches(MASK_MARKER);
            assert!(secret.is_empty() || prefix.len() < secret.len());
        }
    }

    #[test]
    fn test_prefix_respects_char_boundaries() {
        let policy = RedactionPolicy::default();
        let shown = policy.redact("authorization", "ключ-ключ-ключ");
        assert_eq!(shown, format!("ключ-кл{MASK_MARKER}"));
    }

    #[test]
    fn test_non_sensitive_passthrough_and_empty_marker() {
        let policy = RedactionPolicy::default();
        assert_eq!(policy.redact("content-type", "application/json"), "application/json");
        assert_eq!(policy.redact("x-trace", ""), EMPTY_MARKER);
    }

    #[test]
    fn test_multi_values_redacted_independently() {
        let policy = RedactionPolicy::default();
        let values: Vec<&[u8]> = vec![&b"first-secret-value"[..], &b"second-secret-value"[..]];
        let shown = policy.redact_values("x-api-key", values);
        assert_eq!(
            shown,
            format!("first-sec{MASK_MARKER}, second-se{MASK_MARKER}")
        );

        let values: Vec<&[u8]> = vec![&b"gzip"[..], &b"br"[..]];
        assert_eq!(policy.redact_values("accept-encoding", values), "gzip, br");
    }

    #[test]
    fn test_custom_tokens() {
        let policy = RedactionPolicy::new(vec!["Cookie".to_string(), String::new()], 4);
        assert!(policy.is_sensitive("set-cookie"));
        assert!(!policy.is_sensitive("authorization"));
        assert_eq!(policy.redact("cookie", "session=abcdef"), format!("sess{MASK_MARKER}"));
    }
}
