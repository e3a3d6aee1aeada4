//! KNI reconcile: merges rendered site overlays into the installer's
//! manifest tree and promotes the result.

#![forbid(unsafe_code)]

use std::fmt;
use std::path::PathBuf;

use kni_core::Result;
use serde::Serialize;
use tracing::info;

pub mod engine;
pub mod layout;
pub mod promote;
pub mod writer;

pub use engine::{reconcile, ReconcileOutcome};
pub use layout::{SiteLayout, CLUSTER_MODS_PHASE};
pub use promote::promote;
pub use writer::{new_resource_file_name, NewResourceWriter};

#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub site: String,
    pub final_dir: PathBuf,
    pub overlay_resources: usize,
    pub processed_keys: usize,
    #[serde(flatten)]
    pub outcome: ReconcileOutcome,
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.outcome;
        writeln!(f, "site {}: manifests ready in {}", self.site, self.final_dir.display())?;
        writeln!(f, "  overlay resources: {}  baseline keys: {}  unchanged: {}", self.overlay_resources, self.processed_keys, o.unchanged)?;
        writeln!(f, "  backed up: {}  rewritten: {}  split: {}  added: {}", o.backed_up.len(), o.rewritten.len(), o.split.len(), o.created.len())?;
        for (label, paths) in [("rewritten", &o.rewritten), ("split", &o.split), ("added", &o.created), ("skipped", &o.skipped)] {
            for p in paths {
                writeln!(f, "  {:<9} {}", label, p.display())?;
            }
        }
        Ok(())
    }
}

/// Load `overlay`, reconcile the site's working tree with it and promote
/// the tree to `final_manifests`. Nothing is promoted unless every step
/// succeeded.
pub fn merge_manifests(overlay: &str, layout: &SiteLayout) -> Result<MergeReport> {
    let overlay = kni_corpus::load_overlay(overlay)?;
    let working = layout.working_tree();
    let final_dir = layout.final_manifests();
    info!(site = layout.site_name(), resources = overlay.len(), working = %working.display(), "merging overlay");
    let outcome = reconcile(&working, &overlay)?;
    let processed_keys = outcome.processed.len();
    promote(&working, &final_dir)?;
    Ok(MergeReport {
        site: layout.site_name().to_string(),
        overlay_resources: overlay.len(),
        processed_keys,
        outcome: outcome.relocate(&working, &final_dir),
        final_dir,
    })
}
