//! End-to-end sample triage.
//!
//! The pipeline ties every stage together: classify the input, probe for
//! and walk an embedded archive, scan each staged artifact for indicators,
//! recover hidden endpoints, then score and assemble the report. A run
//! never returns an error; anything that goes wrong below the archive
//! trailer degrades into detections inside the report, and only a present
//! but unparseable trailer marks the run [`PipelineState::Failed`].
//!
//! Artifact scans are content-addressed and cached, so a pipeline kept
//! alive across many samples does not rescan the interpreter runtime every
//! dropper bundles.
//!
//! # Examples
//!
//! ```rust,no_run
//! use pyscope::{AnalysisPipeline, Sample};
//! use pyscope::pipeline::AnalysisConfig;
//!
//! let sample = Sample::from_file(std::path::Path::new("dropper.exe"))?;
//! let pipeline = AnalysisPipeline::new(AnalysisConfig::default());
//! let report = pipeline.run(&sample);
//! println!("{}", report.to_json_pretty()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;

pub use config::{
    AnalysisConfig, DEFAULT_MAX_ARTIFACTS, DEFAULT_MAX_DEPTH, DEFAULT_STAGING_BUDGET,
};

use std::fmt;

use crossbeam_skiplist::SkipSet;
use dashmap::DashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::{EnumCount, EnumIter};
use tracing::{debug, trace};

use crate::{
    archive::CArchive,
    deobfuscation::{DeobfuscationRegistry, Endpoint},
    extract::{extract_tree, Artifact, ArtifactStore},
    format::{pe, SampleKind},
    ioc::{ArtifactScan, IocScanner},
    report::{finalize_bucket, sort_detections, AnalysisReport, Detection, IocBuckets, SampleHashes},
    score::risk_score,
    Sample,
};

/// Observable phases of one pipeline run.
///
/// Runs move strictly forward through the happy path. [`Failed`] is
/// reachable only from [`Extracting`], when a present archive trailer turns
/// out to be structurally unparseable; every other problem degrades into a
/// detection and the run finishes as [`Done`].
///
/// [`Failed`]: PipelineState::Failed
/// [`Extracting`]: PipelineState::Extracting
/// [`Done`]: PipelineState::Done
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumCount, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineState {
    /// Input classified, nothing else done yet
    Sniffed,
    /// Probing for and walking the embedded archive
    Extracting,
    /// Scanning the sample and every staged artifact for indicators
    PerArtifactScan,
    /// Running endpoint recovery strategies
    Deobfuscating,
    /// Computing the aggregate risk score
    Scored,
    /// Run complete, report available
    #[default]
    Done,
    /// Embedded archive unparseable, degraded report produced
    Failed,
}

impl PipelineState {
    /// Stable lowercase name, matching the serialized form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Sniffed => "sniffed",
            PipelineState::Extracting => "extracting",
            PipelineState::PerArtifactScan => "per-artifact-scan",
            PipelineState::Deobfuscating => "deobfuscating",
            PipelineState::Scored => "scored",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        }
    }

    /// True when `next` is a legal successor of `self`.
    #[must_use]
    pub fn can_advance(self, next: PipelineState) -> bool {
        matches!(
            (self, next),
            (PipelineState::Sniffed, PipelineState::Extracting)
                | (PipelineState::Extracting, PipelineState::PerArtifactScan)
                | (PipelineState::Extracting, PipelineState::Failed)
                | (PipelineState::PerArtifactScan, PipelineState::Deobfuscating)
                | (PipelineState::Deobfuscating, PipelineState::Scored)
                | (PipelineState::Scored, PipelineState::Done)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    debug_assert!(
        state.can_advance(next),
        "illegal pipeline transition {state} -> {next}"
    );
    debug!(from = %state, to = %next, "pipeline state");
    *state = next;
}

/// Everything one content-addressed scan produced.
#[derive(Clone)]
struct ScanOutput {
    scan: ArtifactScan,
    pe: Vec<Detection>,
}

/// Run-local merge state: detections and indicator candidates in discovery
/// order, plus the run-unique webhook set.
#[derive(Default)]
struct Accumulator {
    detections: Vec<Detection>,
    urls: Vec<String>,
    ips: Vec<String>,
    webhooks: SkipSet<String>,
}

impl Accumulator {
    fn absorb(&mut self, output: ScanOutput) {
        for url in &output.scan.webhooks {
            self.promote(url);
        }
        self.urls.extend(output.scan.urls);
        self.ips.extend(output.scan.ips);
        self.detections.extend(output.scan.detections);
        self.detections.extend(output.pe);
    }

    /// One critical detection per run-unique webhook URL, regardless of how
    /// many artifacts carry it.
    fn promote(&mut self, url: &str) {
        if !self.webhooks.contains(url) {
            self.webhooks.insert(url.to_string());
            self.detections.push(Detection::critical(
                "Discord Webhook Found",
                format!("Found Discord webhook URL: {url}"),
            ));
        }
    }

    fn promote_recovered(&mut self, endpoint: &Endpoint) {
        if !self.webhooks.contains(&endpoint.url) {
            self.webhooks.insert(endpoint.url.clone());
            self.detections.push(Detection::critical(
                "Obfuscated Webhook Recovered",
                format!(
                    "Recovered via {} strategy: {}",
                    endpoint.strategy, endpoint.url
                ),
            ));
        }
    }
}

/// The triage conductor.
///
/// One pipeline holds the configuration, the recovery strategy registry and
/// the content-addressed scan cache; [`run`](AnalysisPipeline::run) may be
/// called any number of times, from any thread, and yields an identical
/// report for identical input bytes.
pub struct AnalysisPipeline {
    config: AnalysisConfig,
    registry: DeobfuscationRegistry,
    cache: DashMap<([u8; 32], SampleKind), ScanOutput>,
}

impl Default for AnalysisPipeline {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl AnalysisPipeline {
    /// Creates a pipeline with the given configuration and an empty scan
    /// cache.
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            registry: DeobfuscationRegistry::new(),
            cache: DashMap::new(),
        }
    }

    /// The configuration this pipeline runs with.
    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze one sample end to end.
    ///
    /// Never fails: every degraded condition surfaces as a detection inside
    /// the returned report, and [`AnalysisReport::state`] records whether
    /// the run finished or failed during extraction.
    #[must_use]
    pub fn run(&self, sample: &Sample) -> AnalysisReport {
        let mut state = PipelineState::Sniffed;
        let mut acc = Accumulator::default();
        debug!(
            kind = sample.kind().as_str(),
            len = sample.len(),
            "sample sniffed"
        );

        advance(&mut state, PipelineState::Extracting);
        let store = self.open_store(&mut acc);
        let mut artifacts: Vec<Artifact> = Vec::new();

        if sample.kind() == SampleKind::Executable && CArchive::has_trailer(sample.data()) {
            match (CArchive::parse(sample.data()), &store) {
                (Ok(archive), Some(store)) => {
                    let outcome = extract_tree(
                        &archive,
                        store,
                        self.config.max_depth,
                        self.config.max_artifacts,
                    );
                    acc.detections.extend(outcome.detections);
                    artifacts = outcome.artifacts;
                }
                (Err(error), _) => {
                    acc.detections.push(Detection::critical(
                        "Malformed Embedded Archive",
                        format!("embedded archive cannot be parsed: {error}"),
                    ));
                    advance(&mut state, PipelineState::Failed);
                    return self.assemble(sample, state, acc);
                }
                (Ok(_), None) => {}
            }
        }

        advance(&mut state, PipelineState::PerArtifactScan);
        acc.absorb(self.scan_artifact(sample.data(), sample.kind()));
        let outputs: Vec<ScanOutput> = artifacts
            .par_iter()
            .map(|artifact| self.scan_artifact(artifact.bytes(), artifact.kind()))
            .collect();
        for output in outputs {
            acc.absorb(output);
        }
        if let Some(store) = &store {
            self.decompile_bytecode(sample, &artifacts, store, &mut acc);
        }

        advance(&mut state, PipelineState::Deobfuscating);
        let outcome = self.registry.run(&artifacts);
        if let Some(recovery) = &outcome.primary {
            debug!(
                strategy = %recovery.strategy,
                url = %recovery.endpoint.url,
                auxiliary = outcome.auxiliary.len(),
                evidence = %recovery.score.evidence_summary(),
                "primary recovery"
            );
        }
        for endpoint in outcome.endpoints() {
            acc.promote_recovered(endpoint);
        }

        advance(&mut state, PipelineState::Scored);
        advance(&mut state, PipelineState::Done);
        self.assemble(sample, state, acc)
    }

    fn open_store(&self, acc: &mut Accumulator) -> Option<ArtifactStore> {
        match ArtifactStore::new(self.config.staging_budget) {
            Ok(store) => Some(store),
            Err(error) => {
                acc.detections.push(Detection::warning(
                    "Staging Unavailable",
                    format!("artifact staging disabled: {error}"),
                ));
                None
            }
        }
    }

    /// Content-addressed scan: identical bytes of the same kind are scanned
    /// once per pipeline lifetime.
    fn scan_artifact(&self, data: &[u8], kind: SampleKind) -> ScanOutput {
        let digest: [u8; 32] = Sha256::digest(data).into();
        if let Some(cached) = self.cache.get(&(digest, kind)) {
            trace!(kind = kind.as_str(), len = data.len(), "scan cache hit");
            return cached.clone();
        }

        let output = ScanOutput {
            scan: IocScanner::scan(data, kind),
            pe: if kind == SampleKind::Executable {
                pe::analyze(data)
            } else {
                Vec::new()
            },
        };
        self.cache.insert((digest, kind), output.clone());
        output
    }

    /// Hand every compiled bytecode body to the external decompiler and
    /// scan the recovered source as text.
    ///
    /// The first failure produces one informational detection and ends
    /// decompilation for this run; the collaborator has already marked
    /// itself unavailable for later runs.
    fn decompile_bytecode(
        &self,
        sample: &Sample,
        artifacts: &[Artifact],
        store: &ArtifactStore,
        acc: &mut Accumulator,
    ) {
        let Some(decompiler) = &self.config.decompiler else {
            return;
        };

        let mut targets: Vec<(&str, &[u8])> = Vec::new();
        if sample.kind() == SampleKind::CompiledBytecode {
            targets.push((sample.name().unwrap_or("sample.pyc"), sample.data()));
        }
        for artifact in artifacts {
            if artifact.kind() == SampleKind::CompiledBytecode {
                targets.push((artifact.name(), artifact.bytes()));
            }
        }

        for (name, bytes) in targets {
            let staged = match store.stage(name, bytes) {
                Ok(staged) => staged,
                Err(error) => {
                    debug!(artifact = name, error = %error, "staging for decompilation failed");
                    continue;
                }
            };

            match decompiler.decompile(staged.path()) {
                Ok(source) => {
                    debug!(artifact = name, len = source.len(), "bytecode decompiled");
                    acc.absorb(self.scan_artifact(source.as_bytes(), SampleKind::SourceText));
                }
                Err(error) => {
                    acc.detections.push(Detection::info(
                        "Decompilation Unavailable",
                        format!("bytecode decompilation skipped: {error}"),
                    ));
                    break;
                }
            }
        }
    }

    fn assemble(
        &self,
        sample: &Sample,
        state: PipelineState,
        acc: Accumulator,
    ) -> AnalysisReport {
        let Accumulator {
            mut detections,
            urls,
            ips,
            webhooks,
        } = acc;
        sort_detections(&mut detections);

        let endpoints = finalize_bucket(
            webhooks
                .iter()
                .map(|entry| entry.value().clone())
                .collect(),
        );
        let score = risk_score(&detections, endpoints.len());
        debug!(
            score,
            detections = detections.len(),
            endpoints = endpoints.len(),
            state = %state,
            "report assembled"
        );

        AnalysisReport {
            detections,
            endpoints,
            iocs: IocBuckets {
                urls: finalize_bucket(urls),
                ips: finalize_bucket(ips),
                hashes: SampleHashes::compute(sample.data()),
            },
            score,
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompiler::Decompiler;
    use crate::test::{make_pyc, nested_archive, ArchiveBuilder, TEST_WEBHOOK};
    use std::collections::HashSet;
    use strum::IntoEnumIterator;

    fn count_title(report: &AnalysisReport, title: &str) -> usize {
        report
            .detections
            .iter()
            .filter(|detection| detection.title == title)
            .count()
    }

    #[test]
    fn failed_is_reachable_only_from_extracting() {
        for state in PipelineState::iter() {
            assert_eq!(
                state.can_advance(PipelineState::Failed),
                state == PipelineState::Extracting,
                "{state}"
            );
        }
    }

    #[test]
    fn happy_path_advances_in_order() {
        let path = [
            PipelineState::Sniffed,
            PipelineState::Extracting,
            PipelineState::PerArtifactScan,
            PipelineState::Deobfuscating,
            PipelineState::Scored,
            PipelineState::Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_advance(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(!PipelineState::Done.can_advance(PipelineState::Sniffed));
        assert!(!PipelineState::Failed.can_advance(PipelineState::PerArtifactScan));
    }

    #[test]
    fn state_names_are_distinct() {
        let names: HashSet<&str> = PipelineState::iter().map(|s| s.as_str()).collect();
        assert_eq!(names.len(), PipelineState::COUNT);
    }

    #[test]
    fn source_sample_promotes_webhook_once() {
        let body = format!("#!/usr/bin/env python\nWEBHOOK_URL = '{TEST_WEBHOOK}'\n");
        let sample = Sample::from_mem(body.into_bytes());
        assert_eq!(sample.kind(), SampleKind::SourceText);

        let report = AnalysisPipeline::default().run(&sample);

        assert_eq!(report.state, PipelineState::Done);
        assert_eq!(count_title(&report, "Discord Webhook Found"), 1);
        assert_eq!(report.endpoints, vec![TEST_WEBHOOK.to_string()]);
        assert!(report.iocs.urls.is_empty());
        // 1 critical + 3 constant warnings + 1 endpoint
        assert_eq!(report.score, 95);
    }

    #[test]
    fn plain_executable_skips_extraction() {
        let sample = Sample::from_mem(b"MZ plain program, no trailer".to_vec());
        let report = AnalysisPipeline::default().run(&sample);

        assert_eq!(report.state, PipelineState::Done);
        assert_eq!(count_title(&report, "PE Analysis Error"), 1);
        assert!(report.endpoints.is_empty());
        assert_eq!(report.score, 5);
    }

    #[test]
    fn archive_sample_runs_end_to_end() {
        let data = ArchiveBuilder::new()
            .add_stored("config.py", format!("hook = '{TEST_WEBHOOK}'").as_bytes())
            .add_stored("readme.txt", b"no interpreter marker here")
            .build();
        let sample = Sample::from_mem(data);
        assert_eq!(sample.kind(), SampleKind::Executable);

        let report = AnalysisPipeline::default().run(&sample);

        assert_eq!(report.state, PipelineState::Done);
        // The webhook is visible in the root bytes and in the artifact, but
        // promotion is run-unique
        assert_eq!(count_title(&report, "Discord Webhook Found"), 1);
        assert_eq!(count_title(&report, "Obfuscated Webhook Recovered"), 0);
        assert_eq!(report.endpoints, vec![TEST_WEBHOOK.to_string()]);
    }

    #[test]
    fn malformed_trailer_degrades_to_failed_report() {
        let data = ArchiveBuilder::new()
            .add_stored("a.txt", b"x")
            .with_overlay_size(0xFFFF_FF00)
            .build();
        let sample = Sample::from_mem(data);

        let report = AnalysisPipeline::default().run(&sample);

        assert_eq!(report.state, PipelineState::Failed);
        assert_eq!(count_title(&report, "Malformed Embedded Archive"), 1);
        assert!(report.endpoints.is_empty());
        assert!(report.score >= 30);
        assert!(!report.iocs.hashes.sha256.is_empty());
    }

    #[test]
    fn hidden_endpoint_recovered_through_strategies() {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;

        let encoded = STANDARD.encode(TEST_WEBHOOK);
        let data = ArchiveBuilder::new()
            .add_stored("com/app/Config.class", format!("pool {encoded}").as_bytes())
            .build();
        let sample = Sample::from_mem(data);

        let report = AnalysisPipeline::default().run(&sample);

        assert_eq!(report.state, PipelineState::Done);
        assert_eq!(count_title(&report, "Discord Webhook Found"), 0);
        assert_eq!(count_title(&report, "Obfuscated Webhook Recovered"), 1);
        let recovered = report
            .detections
            .iter()
            .find(|d| d.title == "Obfuscated Webhook Recovered")
            .unwrap();
        assert!(recovered.description.contains("class-pool"));
        assert_eq!(report.endpoints, vec![TEST_WEBHOOK.to_string()]);
    }

    #[test]
    fn depth_cap_is_plumbed_through_config() {
        let sample = Sample::from_mem(nested_archive(3, b"deep payload"));
        let pipeline = AnalysisPipeline::new(AnalysisConfig::default().with_max_depth(1));

        let report = pipeline.run(&sample);

        assert_eq!(report.state, PipelineState::Done);
        assert_eq!(count_title(&report, "Extraction Depth Exceeded"), 1);
    }

    #[test]
    fn repeated_runs_are_idempotent() {
        let data = ArchiveBuilder::new()
            .add_stored("config.py", format!("hook = '{TEST_WEBHOOK}'").as_bytes())
            .add_deflated("module.pyc", &make_pyc(b"compiled body"))
            .build();
        let sample = Sample::from_mem(data);
        let pipeline = AnalysisPipeline::default();

        let first = pipeline.run(&sample);
        let second = pipeline.run(&sample);

        assert_eq!(first, second);
    }

    #[test]
    fn decompiled_source_is_scanned_as_text() {
        let body = make_pyc(b"eval(compile(blob)) # staged");
        let data = ArchiveBuilder::new().add_stored("mod.pyc", &body).build();
        let sample = Sample::from_mem(data);

        let config = AnalysisConfig::default().with_decompiler(Decompiler::with_program("/bin/cat"));
        let report = AnalysisPipeline::new(config).run(&sample);

        // The keyword table only applies to source text, so this detection
        // proves the decompiled output went through a text scan
        assert_eq!(count_title(&report, "Suspicious Python Code Found"), 1);
        assert_eq!(count_title(&report, "Decompilation Unavailable"), 0);
    }

    #[test]
    fn decompiler_failure_is_noted_once() {
        let data = ArchiveBuilder::new()
            .add_stored("one.pyc", &make_pyc(b"first"))
            .add_stored("two.pyc", &make_pyc(b"second"))
            .build();
        let sample = Sample::from_mem(data);

        let config = AnalysisConfig::default()
            .with_decompiler(Decompiler::with_program("/nonexistent/pyscope-decompiler"));
        let report = AnalysisPipeline::new(config).run(&sample);

        assert_eq!(report.state, PipelineState::Done);
        assert_eq!(count_title(&report, "Decompilation Unavailable"), 1);
    }

    #[test]
    fn bytecode_root_sample_without_decompiler() {
        let sample = Sample::from_mem(make_pyc(b"plain marshalled body"));
        assert_eq!(sample.kind(), SampleKind::CompiledBytecode);

        let report = AnalysisPipeline::default().run(&sample);

        assert_eq!(report.state, PipelineState::Done);
        assert_eq!(count_title(&report, "Suspicious Python Code Found"), 0);
    }
}
