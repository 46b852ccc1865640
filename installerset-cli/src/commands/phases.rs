use crate::output::{self, Mark, OutputFormat};
use anyhow::Result;
use installerset::{Manifest, Phase};
use serde::Serialize;
use tabled::Tabled;

/// Placeholder for resources no phase applies
const UNCLASSIFIED: &str = "-";

#[derive(Debug, Serialize, Tabled, PartialEq)]
pub struct ResourceRow {
    #[tabled(rename = "PHASE")]
    pub phase: String,
    #[tabled(rename = "KIND")]
    pub kind: String,
    #[tabled(rename = "NAME")]
    pub name: String,
    #[tabled(rename = "NAMESPACE")]
    pub namespace: String,
}

/// One row per resource, grouped by phase in apply order. Unclassified
/// resources come last, in manifest order.
pub fn classify(manifest: &Manifest) -> Vec<ResourceRow> {
    let row = |phase: &str, resource: &installerset::Resource| ResourceRow {
        phase: phase.to_string(),
        kind: resource.kind().to_string(),
        name: resource.name().to_string(),
        namespace: resource.namespace().unwrap_or_default().to_string(),
    };

    let mut rows = Vec::with_capacity(manifest.len());
    for phase in Phase::ALL {
        rows.extend(manifest.filter(&phase.selector()).iter().map(|r| row(phase.as_str(), r)));
    }
    rows.extend(
        manifest
            .iter()
            .filter(|r| Phase::for_kind(r.kind()).is_none())
            .map(|r| row(UNCLASSIFIED, r)),
    );
    rows
}

pub fn handle_phases_command(manifest: &Manifest, format: OutputFormat) -> Result<()> {
    let rows = classify(manifest);
    let skipped = rows.iter().filter(|r| r.phase == UNCLASSIFIED).count();

    output::print_rows(rows, format, "Manifest contains no resources")?;

    if skipped > 0 && format.is_table() {
        output::print_mark(
            Mark::Skipped,
            &format!("{} resource(s) match no phase and will not be applied", skipped),
        );
    }
    Ok(())
}
