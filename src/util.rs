//! Shared utilities for the promptwright codebase

use std::fmt;

/// A string wrapper that masks its contents in Debug/Display output.
/// Prevents accidental logging of API keys and other secrets.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Intentionally access the raw secret value (for headers, URLs, etc.)
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<&str> for SecretString {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Reduce a provider or model name to a safe single path component.
/// Path separators and `..` sequences are removed, then anything that is not
/// alphanumeric or one of `-`, `_`, `.` is dropped. The result may be empty.
pub fn sanitize_path_component(component: &str) -> String {
    component
        .replace(['/', '\\'], "")
        .replace("..", "")
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect()
}

/// Truncate to at most `max` characters, appending `...` when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_string_hides_in_debug() {
        let secret = SecretString::new("my-api-key-123".to_string());
        let debug_output = format!("{:?}", secret);
        assert_eq!(debug_output, "***");
        assert!(!debug_output.contains("my-api-key"));
    }

    #[test]
    fn test_secret_string_hides_in_display() {
        let secret = SecretString::new("my-api-key-123".to_string());
        assert_eq!(format!("{}", secret), "***");
    }

    #[test]
    fn test_secret_string_expose_returns_value() {
        let secret: SecretString = "test-key".to_string().into();
        assert_eq!(secret.expose(), "test-key");
        assert!(secret == "test-key");
    }

    #[test]
    fn test_sanitize_keeps_safe_names() {
        assert_eq!(sanitize_path_component("gpt-4.5"), "gpt-4.5");
        assert_eq!(sanitize_path_component("base_chat"), "base_chat");
    }

    #[test]
    fn test_sanitize_strips_traversal() {
        assert_eq!(sanitize_path_component("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_path_component("..\\secrets"), "secrets");
        assert_eq!(sanitize_path_component("a b;c$"), "abc");
        assert_eq!(sanitize_path_component("../"), "");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdefgh", 3), "abc...");
    }
}
