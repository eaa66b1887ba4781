//! Surface analysis of native executables.
//!
//! Inspects the section table and import directory of a PE image for the
//! markers that bundled droppers tend to carry: packer-styled section names
//! and imports named after credential or token harvesting routines. Parse
//! failures are expected on truncated or deliberately damaged headers and
//! degrade to a single informational detection, never an error.

use std::collections::BTreeSet;

use goblin::pe::PE;

use crate::{
    ioc::patterns::SUSPICIOUS_FUNCTIONS,
    report::{Detection, Severity},
};

/// Section name fragments that suggest a packed or encrypted image.
const SUSPICIOUS_SECTION_MARKERS: &[&str] = &["packed", "encrypt", "hidden"];

/// Run surface analysis over a native executable image.
///
/// Returns detections only; a sample that fails to parse as PE yields one
/// informational detection describing the parse error. Section findings are
/// reported per section, import findings once with the sorted list of
/// offending names.
pub(crate) fn analyze(data: &[u8]) -> Vec<Detection> {
    let pe = match PE::parse(data) {
        Ok(pe) => pe,
        Err(error) => {
            return vec![Detection::new(
                "PE Analysis Error",
                format!("Could not analyze PE image: {error}"),
                Severity::Info,
            )];
        }
    };

    let mut detections = Vec::new();

    for section in &pe.sections {
        let name = String::from_utf8_lossy(&section.name);
        let name = name.trim_end_matches('\0');
        if section_is_suspicious(name) {
            detections.push(Detection::new(
                "Packed/Encrypted Section Found",
                format!("Section {name} may be packed or encrypted"),
                Severity::Warning,
            ));
        }
    }

    let suspicious = collect_suspicious_imports(pe.imports.iter().map(|import| import.name.as_ref()));
    if !suspicious.is_empty() {
        let joined = suspicious.into_iter().collect::<Vec<_>>().join(", ");
        detections.push(Detection::new(
            "Suspicious Imports Found",
            format!("Suspicious imports: {joined}"),
            Severity::Critical,
        ));
    }

    detections
}

/// Whether a section name carries a packer marker, case-insensitively.
fn section_is_suspicious(name: &str) -> bool {
    let lowered = name.to_ascii_lowercase();
    SUSPICIOUS_SECTION_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Collect import names that match the suspicious function table, sorted and
/// deduplicated for stable report output.
fn collect_suspicious_imports<'a>(names: impl Iterator<Item = &'a str>) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    for name in names {
        let lowered = name.to_ascii_lowercase();
        if SUSPICIOUS_FUNCTIONS
            .iter()
            .any(|func| lowered.contains(&func.to_ascii_lowercase()))
        {
            found.insert(name.to_string());
        }
    }
    found
}
