//! Recovery strategies and their fingerprint heuristics.
//!
//! Each strategy knows one way commodity kits hide their exfiltration
//! endpoint inside a bundle: base64 pools in bundled class files, deflated
//! blobs inside compiled bytecode, string constants in the entry script,
//! plain text, and a brute-force sweep as the fallback. Fingerprinting is
//! deliberately generous; a strategy that runs and recovers nothing costs
//! little, while one that is skipped can miss the only endpoint.

use std::fmt;
use std::sync::LazyLock;

use regex::bytes::Regex as BytesRegex;
use strum::{EnumCount, EnumIter};

use crate::deobfuscation::decode::{decode_base64_run, inflate_limited, INFLATE_LIMIT};
use crate::deobfuscation::score::{DeobfuscationScore, ScoreEvidence};
use crate::extract::Artifact;
use crate::ioc::patterns::PatternSet;

/// Base64 runs long enough to hide an endpoint.
static BASE64_RUN: LazyLock<BytesRegex> =
    LazyLock::new(|| BytesRegex::new(r"[A-Za-z0-9+/]{20,}={0,2}").expect("valid regex"));

/// Longer runs for the fallback sweep; short runs are too noisy across
/// arbitrary binaries.
static LONG_BASE64_RUN: LazyLock<BytesRegex> =
    LazyLock::new(|| BytesRegex::new(r"[A-Za-z0-9+/]{80,}={0,2}").expect("valid regex"));

/// Printable ASCII runs, the shape of string constants inside bytecode.
static PRINTABLE_RUN: LazyLock<BytesRegex> =
    LazyLock::new(|| BytesRegex::new(r"(?-u)[ -~]{30,100}").expect("valid regex"));

/// NUL-delimited segments in this size range are candidate deflate streams.
const SEGMENT_RANGE: std::ops::RangeInclusive<usize> = 20..=100;

/// A recovered exfiltration endpoint and the strategy that surfaced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// The recovered URL.
    pub url: String,
    /// Stable name of the strategy that recovered it.
    pub strategy: &'static str,
}

/// Recovery strategies in fixed priority order.
///
/// Declaration order is evaluation order: earlier variants target more
/// specific hiding schemes and claim the primary slot when they recover
/// anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, EnumIter)]
pub enum Strategy {
    /// Endpoint base64-encoded inside bundled class files.
    ClassPool,
    /// Endpoint base64-encoded and deflate-compressed inside bytecode.
    CompressedBytecode,
    /// Endpoint embedded as a string constant in the bundle entry script.
    MainScript,
    /// Endpoint in plain sight in source or bytecode text.
    Plaintext,
    /// Exhaustive sweep over every artifact.
    Generic,
}

impl Strategy {
    /// Stable name used in reports and endpoint attribution.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Strategy::ClassPool => "class-pool",
            Strategy::CompressedBytecode => "compressed-bytecode",
            Strategy::MainScript => "main-script",
            Strategy::Plaintext => "plaintext",
            Strategy::Generic => "generic",
        }
    }

    /// Score how well the staged artifact set matches this strategy's
    /// hiding scheme.
    pub(crate) fn fingerprint(self, artifacts: &[Artifact]) -> DeobfuscationScore {
        let score = DeobfuscationScore::new();

        match self {
            Strategy::ClassPool => {
                let count = artifacts
                    .iter()
                    .filter(|artifact| has_extension(artifact.name(), ".class"))
                    .count();
                if count > 0 {
                    score.add(ScoreEvidence::NamePattern {
                        pattern: "*.class".to_string(),
                        match_count: count,
                        confidence: (60 + 10 * (count - 1)).min(80),
                    });
                }
            }
            Strategy::CompressedBytecode => {
                for artifact in artifacts
                    .iter()
                    .filter(|artifact| has_extension(artifact.name(), ".pyc"))
                {
                    let runs = BASE64_RUN.find_iter(artifact.bytes()).count();
                    if runs > 0 {
                        score.add(ScoreEvidence::EncodedPayload {
                            artifact: artifact.name().to_string(),
                            run_count: runs,
                            confidence: 60,
                        });
                    }
                }
            }
            Strategy::MainScript => {
                for artifact in artifacts {
                    if artifact.name().to_ascii_lowercase().contains("main") {
                        score.add(ScoreEvidence::EntryPoint {
                            name: artifact.name().to_string(),
                            confidence: 60,
                        });
                    }
                }
            }
            Strategy::Plaintext => {
                let count = artifacts
                    .iter()
                    .filter(|artifact| {
                        has_extension(artifact.name(), ".py")
                            || has_extension(artifact.name(), ".pyc")
                    })
                    .count();
                if count > 0 {
                    score.add(ScoreEvidence::NamePattern {
                        pattern: "*.py|*.pyc".to_string(),
                        match_count: count,
                        confidence: 55,
                    });
                }
            }
            Strategy::Generic => {
                score.add(ScoreEvidence::Fallback { confidence: 100 });
            }
        }

        score
    }

    /// Run the recovery pass, returning every endpoint this strategy can
    /// surface, deduplicated by URL in discovery order.
    pub(crate) fn deobfuscate(self, artifacts: &[Artifact]) -> Vec<Endpoint> {
        let mut endpoints = Vec::new();

        match self {
            Strategy::ClassPool => {
                for artifact in artifacts
                    .iter()
                    .filter(|artifact| has_extension(artifact.name(), ".class"))
                {
                    for run in BASE64_RUN.find_iter(artifact.bytes()) {
                        if let Some(decoded) = decode_base64_run(run.as_bytes()) {
                            self.collect(&String::from_utf8_lossy(&decoded), &mut endpoints);
                        }
                    }
                }
            }
            Strategy::CompressedBytecode => {
                for artifact in artifacts
                    .iter()
                    .filter(|artifact| has_extension(artifact.name(), ".pyc"))
                {
                    for run in BASE64_RUN.find_iter(artifact.bytes()) {
                        let Some(decoded) = decode_base64_run(run.as_bytes()) else {
                            continue;
                        };
                        if let Some(inflated) = inflate_limited(&decoded, INFLATE_LIMIT) {
                            self.collect(&String::from_utf8_lossy(&inflated), &mut endpoints);
                        }
                    }
                }
            }
            Strategy::MainScript => {
                for artifact in artifacts {
                    if !artifact.name().to_ascii_lowercase().contains("main") {
                        continue;
                    }
                    for run in PRINTABLE_RUN.find_iter(artifact.bytes()) {
                        if !contains_subslice(run.as_bytes(), b"discord") {
                            continue;
                        }
                        // Printable ASCII is always valid UTF-8
                        if let Ok(text) = std::str::from_utf8(run.as_bytes()) {
                            self.collect(text, &mut endpoints);
                        }
                    }
                }
            }
            Strategy::Plaintext => {
                for artifact in artifacts.iter().filter(|artifact| {
                    has_extension(artifact.name(), ".py") || has_extension(artifact.name(), ".pyc")
                }) {
                    self.collect(&String::from_utf8_lossy(artifact.bytes()), &mut endpoints);
                }
            }
            Strategy::Generic => {
                for artifact in artifacts {
                    self.collect(&String::from_utf8_lossy(artifact.bytes()), &mut endpoints);

                    for run in LONG_BASE64_RUN.find_iter(artifact.bytes()) {
                        let Some(decoded) = decode_base64_run(run.as_bytes()) else {
                            continue;
                        };
                        self.collect(&String::from_utf8_lossy(&decoded), &mut endpoints);
                        if let Some(inflated) = inflate_limited(&decoded, INFLATE_LIMIT) {
                            self.collect(&String::from_utf8_lossy(&inflated), &mut endpoints);
                        }
                    }

                    for segment in artifact.bytes().split(|&byte| byte == 0) {
                        if SEGMENT_RANGE.contains(&segment.len()) {
                            if let Some(inflated) = inflate_limited(segment, INFLATE_LIMIT) {
                                self.collect(&String::from_utf8_lossy(&inflated), &mut endpoints);
                            }
                        }
                    }
                }
            }
        }

        endpoints
    }

    fn collect(self, text: &str, endpoints: &mut Vec<Endpoint>) {
        for url in PatternSet::global().find_webhooks(text) {
            if !endpoints.iter().any(|endpoint| endpoint.url == url) {
                endpoints.push(Endpoint {
                    url,
                    strategy: self.name(),
                });
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn has_extension(name: &str, extension: &str) -> bool {
    name.to_ascii_lowercase().ends_with(extension)
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
