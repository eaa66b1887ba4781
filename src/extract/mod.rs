//! Recursive extraction of archive entries into scannable artifacts.
//!
//! The walker materializes every entry of an embedded archive, classifies it,
//! and re-extracts entries that are themselves archives, breadth-first and
//! bounded. Three limits keep hostile inputs from running away: a recursion
//! depth cap, an artifact count cap and the byte budget of the
//! [`ArtifactStore`]. Hitting a limit truncates extraction with exactly one
//! warning per limit per run; everything staged before the limit remains
//! available for scanning.
//!
//! Failures below the root archive are never fatal. A corrupt entry becomes
//! a warning detection, an inner blob that merely looks like a container is
//! kept as a leaf artifact, and the run carries on.

mod store;

pub use store::{ArtifactStore, StagedArtifact};

use std::collections::VecDeque;

use tracing::debug;

use crate::{
    archive::CArchive,
    format::{FormatSniffer, SampleKind},
    ioc::patterns::SUSPICIOUS_BUNDLE_NAMES,
    report::Detection,
};

/// One materialized archive entry, ready for scanning.
///
/// Classification happens at construction from content alone, exactly like
/// top-level samples. The provenance chain records the entry names of
/// enclosing containers, outermost first, and drives the recursion depth
/// bound.
#[derive(Debug, Clone)]
pub struct Artifact {
    name: String,
    bytes: Vec<u8>,
    provenance: Vec<String>,
    kind: SampleKind,
}

impl Artifact {
    /// Create an artifact from entry `name` and materialized `bytes`.
    ///
    /// `provenance` lists the enclosing container entry names, outermost
    /// first; entries of the root archive have an empty chain.
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, provenance: Vec<String>) -> Artifact {
        let kind = FormatSniffer::classify(&bytes);
        Artifact {
            name: name.into(),
            bytes,
            provenance,
            kind,
        }
    }

    /// Entry name from the table of contents.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Materialized (decompressed) content.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Format classification of the content.
    #[must_use]
    pub fn kind(&self) -> SampleKind {
        self.kind
    }

    /// Enclosing container entry names, outermost first.
    #[must_use]
    pub fn provenance(&self) -> &[String] {
        &self.provenance
    }

    /// Nesting depth: entries of the root archive are at depth zero.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.provenance.len()
    }
}

/// Everything one extraction pass produced: the artifact set plus the
/// warnings accumulated along the way.
#[derive(Debug, Default)]
pub struct ExtractionOutcome {
    /// Materialized artifacts in staging order
    pub artifacts: Vec<Artifact>,
    /// Corruption and truncation warnings
    pub detections: Vec<Detection>,
}

/// Extract the full artifact tree beneath `root`.
///
/// Infallible by design: the root archive is already parsed, and everything
/// below it degrades to warnings inside the returned outcome.
pub(crate) fn extract_tree(
    root: &CArchive<'_>,
    store: &ArtifactStore,
    max_depth: usize,
    max_artifacts: usize,
) -> ExtractionOutcome {
    Walker {
        store,
        max_depth,
        max_artifacts,
        artifacts: Vec::new(),
        detections: Vec::new(),
        queue: VecDeque::new(),
        count_warned: false,
        budget_warned: false,
        depth_warned: false,
    }
    .run(root)
}

struct Walker<'s> {
    store: &'s ArtifactStore,
    max_depth: usize,
    max_artifacts: usize,
    artifacts: Vec<Artifact>,
    detections: Vec<Detection>,
    queue: VecDeque<(Vec<u8>, Vec<String>)>,
    count_warned: bool,
    budget_warned: bool,
    depth_warned: bool,
}

impl Walker<'_> {
    fn run(mut self, root: &CArchive<'_>) -> ExtractionOutcome {
        self.detections.extend(root.warnings().to_vec());
        self.stage_entries(root, &[]);

        while let Some((bytes, prefix)) = self.queue.pop_front() {
            if self.count_warned || self.budget_warned {
                break;
            }

            // The trailer probe passed when this was queued; a full parse
            // failure here means the blob only resembled a container.
            if let Ok(nested) = CArchive::parse(&bytes) {
                self.detections.extend(nested.warnings().to_vec());
                self.stage_entries(&nested, &prefix);
            }
        }

        self.bundle_heuristics();

        ExtractionOutcome {
            artifacts: self.artifacts,
            detections: self.detections,
        }
    }

    fn stage_entries(&mut self, archive: &CArchive<'_>, prefix: &[String]) {
        for entry in archive.entries() {
            if self.count_warned || self.budget_warned {
                return;
            }
            if self.artifacts.len() >= self.max_artifacts {
                self.detections.push(Detection::warning(
                    "Artifact Budget Exceeded",
                    format!(
                        "extraction stopped at {} artifacts; remaining entries skipped",
                        self.max_artifacts
                    ),
                ));
                self.count_warned = true;
                return;
            }

            let bytes = match archive.read_entry(entry) {
                Ok(bytes) => bytes,
                Err(error) => {
                    self.detections.push(Detection::warning(
                        "Corrupt Archive Entry",
                        format!("entry '{}' failed to materialize: {error}", entry.name()),
                    ));
                    continue;
                }
            };

            if self.store.reserve(bytes.len() as u64).is_err() {
                self.detections.push(Detection::warning(
                    "Staging Budget Exceeded",
                    format!(
                        "staging budget of {} bytes exhausted; remaining entries skipped",
                        self.store.capacity()
                    ),
                ));
                self.budget_warned = true;
                return;
            }

            let artifact = Artifact::new(entry.name(), bytes, prefix.to_vec());
            debug!(
                name = artifact.name(),
                kind = artifact.kind().as_str(),
                depth = artifact.depth(),
                len = artifact.bytes().len(),
                "staged artifact"
            );

            if artifact.kind() == SampleKind::Executable && CArchive::has_trailer(artifact.bytes())
            {
                if artifact.depth() < self.max_depth {
                    let mut child_prefix = prefix.to_vec();
                    child_prefix.push(entry.name().to_string());
                    self.queue.push_back((artifact.bytes().to_vec(), child_prefix));
                } else if !self.depth_warned && CArchive::parse(artifact.bytes()).is_ok() {
                    self.detections.push(Detection::warning(
                        "Extraction Depth Exceeded",
                        format!(
                            "nested archive '{}' at depth {} exceeds the recursion limit of {}",
                            entry.name(),
                            artifact.depth(),
                            self.max_depth
                        ),
                    ));
                    self.depth_warned = true;
                }
            }

            self.artifacts.push(artifact);
        }
    }

    /// Name-table heuristics over the staged set: flag harvesting-styled
    /// entry names individually and bytecode-heavy bundles once.
    fn bundle_heuristics(&mut self) {
        let mut bytecode_entries = 0usize;

        for artifact in &self.artifacts {
            let lowered = artifact.name().to_ascii_lowercase();
            if lowered.ends_with(".pyc") || lowered.ends_with(".pyz") {
                bytecode_entries += 1;
            }
            if SUSPICIOUS_BUNDLE_NAMES
                .iter()
                .any(|marker| lowered.contains(marker))
            {
                self.detections.push(Detection::critical(
                    "Suspicious File in Bundle",
                    format!("suspicious file name in bundle: {}", artifact.name()),
                ));
            }
        }

        if bytecode_entries > 0 {
            self.detections.push(Detection::info(
                "Python Bundle Detected",
                format!("archive stages {bytecode_entries} compiled bytecode entries"),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{make_pyc, nested_archive, ArchiveBuilder};

    fn walk(data: &[u8], capacity: u64, max_depth: usize, max_artifacts: usize) -> ExtractionOutcome {
        let archive = CArchive::parse(data).unwrap();
        let store = ArtifactStore::new(capacity).unwrap();
        extract_tree(&archive, &store, max_depth, max_artifacts)
    }

    #[test]
    fn flat_extraction_classifies_artifacts() {
        let data = ArchiveBuilder::new()
            .add_stored("script.py", b"#!/usr/bin/env python\nprint('x')\n")
            .add_deflated("module.pyc", &make_pyc(b"bytecode body"))
            .add_stored("readme.txt", b"plain notes, no interpreter marker")
            .build();

        let outcome = walk(&data, 1 << 20, 5, 512);

        assert_eq!(outcome.artifacts.len(), 3);
        assert_eq!(outcome.artifacts[0].kind(), SampleKind::SourceText);
        assert_eq!(outcome.artifacts[1].kind(), SampleKind::CompiledBytecode);
        assert_eq!(outcome.artifacts[2].kind(), SampleKind::Unknown);
        assert!(outcome.artifacts.iter().all(|a| a.depth() == 0));

        // One informational bundle note for the .pyc entry
        let bundle: Vec<_> = outcome
            .detections
            .iter()
            .filter(|d| d.title == "Python Bundle Detected")
            .collect();
        assert_eq!(bundle.len(), 1);
    }

    #[test]
    fn corrupt_entry_degrades_to_warning() {
        let data = ArchiveBuilder::new()
            .add_stored("good.txt", b"fine")
            .add_raw("broken.bin", b"not zlib at all", 128, 1, b'b')
            .add_stored("after.txt", b"still fine")
            .build();

        let outcome = walk(&data, 1 << 20, 5, 512);

        let names: Vec<_> = outcome.artifacts.iter().map(Artifact::name).collect();
        assert_eq!(names, vec!["good.txt", "after.txt"]);

        let corrupt: Vec<_> = outcome
            .detections
            .iter()
            .filter(|d| d.title == "Corrupt Archive Entry")
            .collect();
        assert_eq!(corrupt.len(), 1);
        assert!(corrupt[0].description.contains("broken.bin"));
    }

    #[test]
    fn nested_containers_extract_with_provenance() {
        let data = nested_archive(3, b"innermost payload");
        let outcome = walk(&data, 1 << 20, 5, 512);

        // layer2.exe, layer1.exe, layer0.exe
        assert_eq!(outcome.artifacts.len(), 3);

        let innermost = outcome
            .artifacts
            .iter()
            .find(|a| a.name() == "layer0.exe")
            .unwrap();
        assert_eq!(innermost.depth(), 2);
        assert_eq!(
            innermost.provenance(),
            &["layer2.exe".to_string(), "layer1.exe".to_string()]
        );
        assert_eq!(innermost.bytes(), b"innermost payload");

        assert!(!outcome
            .detections
            .iter()
            .any(|d| d.title == "Extraction Depth Exceeded"));
    }

    #[test]
    fn depth_limit_warns_exactly_once() {
        let inner = nested_archive(2, b"too deep");
        let data = ArchiveBuilder::new()
            .add_stored("left.exe", &inner)
            .add_stored("right.exe", &inner)
            .build();

        let outcome = walk(&data, 1 << 20, 1, 512);

        let warnings: Vec<_> = outcome
            .detections
            .iter()
            .filter(|d| d.title == "Extraction Depth Exceeded")
            .collect();
        assert_eq!(warnings.len(), 1);

        // The blocked containers are still kept as leaf artifacts
        assert!(outcome.artifacts.iter().any(|a| a.name() == "layer1.exe"));
    }

    #[test]
    fn artifact_cap_warns_exactly_once() {
        let data = ArchiveBuilder::new()
            .add_stored("a", b"1")
            .add_stored("b", b"2")
            .add_stored("c", b"3")
            .add_stored("d", b"4")
            .add_stored("e", b"5")
            .build();

        let outcome = walk(&data, 1 << 20, 5, 3);

        assert_eq!(outcome.artifacts.len(), 3);
        let warnings: Vec<_> = outcome
            .detections
            .iter()
            .filter(|d| d.title == "Artifact Budget Exceeded")
            .collect();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn staging_budget_warns_and_keeps_earlier_artifacts() {
        let data = ArchiveBuilder::new()
            .add_stored("small.txt", &[0x41; 16])
            .add_stored("big.bin", &[0x42; 200])
            .add_stored("later.txt", &[0x43; 16])
            .build();

        let outcome = walk(&data, 64, 5, 512);

        assert_eq!(outcome.artifacts.len(), 1);
        assert_eq!(outcome.artifacts[0].name(), "small.txt");

        let warnings: Vec<_> = outcome
            .detections
            .iter()
            .filter(|d| d.title == "Staging Budget Exceeded")
            .collect();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn harvesting_names_are_flagged() {
        let data = ArchiveBuilder::new()
            .add_stored("token_grabber.py", b"x")
            .add_stored("benign.txt", b"y")
            .build();

        let outcome = walk(&data, 1 << 20, 5, 512);

        let flagged: Vec<_> = outcome
            .detections
            .iter()
            .filter(|d| d.title == "Suspicious File in Bundle")
            .collect();
        assert_eq!(flagged.len(), 1);
        assert!(flagged[0].description.contains("token_grabber.py"));
    }

    #[test]
    fn non_archive_executable_stays_leaf() {
        let data = ArchiveBuilder::new()
            .add_stored("plain.exe", b"MZ\x90\x00 just a program")
            .build();

        let outcome = walk(&data, 1 << 20, 5, 512);

        assert_eq!(outcome.artifacts.len(), 1);
        assert_eq!(outcome.artifacts[0].kind(), SampleKind::Executable);
        assert!(outcome.detections.iter().all(|d| d.title != "Extraction Depth Exceeded"));
    }
}
