//! Kustomization index for freshly generated installer assets, so the
//! generated tree can serve as a base for site overlays.

use std::path::{Path, PathBuf};

use kni_core::{Error, Result};
use serde::Serialize;
use tracing::info;
use walkdir::WalkDir;

pub const KUSTOMIZATION_FILE: &str = "kustomization.yaml";

/// (directory, extension) in listing order.
const PATTERNS: [(&str, &str); 3] = [("manifests", "yaml"), ("manifests", "yml"), ("openshift", "yaml")];

#[derive(Debug, Serialize)]
struct Kustomization<'a> {
    resources: &'a [String],
}

/// Resource entries relative to `assets`, one pattern at a time, sorted by
/// file name within a pattern. Subdirectories are not descended into.
pub fn kustomization_entries(assets: &Path) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for (dir, ext) in PATTERNS {
        let full = assets.join(dir);
        if !full.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&full).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::io(&full, std::io::Error::from(e)))?;
            if !entry.file_type().is_file() || entry.path().extension().and_then(|e| e.to_str()) != Some(ext) {
                continue;
            }
            out.push(format!("{}/{}", dir, entry.file_name().to_string_lossy()));
        }
    }
    Ok(out)
}

/// Write `<assets>/kustomization.yaml` listing every generated manifest.
pub fn write_kustomization_index(assets: &Path) -> Result<(PathBuf, Vec<String>)> {
    let entries = kustomization_entries(assets)?;
    let path = assets.join(KUSTOMIZATION_FILE);
    let body = serde_yaml::to_string(&Kustomization { resources: &entries })
        .map_err(|e| Error::Serialize { key: KUSTOMIZATION_FILE.to_string(), source: e })?;
    std::fs::write(&path, body).map_err(|e| Error::io(&path, e))?;
    info!(path = %path.display(), resources = entries.len(), "wrote kustomization index");
    Ok((path, entries))
}
