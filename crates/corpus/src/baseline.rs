//! Baseline tree loading.
//!
//! Only YAML files below an `openshift/` or `manifests/` directory count as
//! resources, and every document of a multi-document file is keyed. Files
//! that do not parse are scaffolding and get skipped; a list that breaks
//! its shape contract, or any I/O failure, is fatal.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use kni_core::prelude::*;
use metrics::counter;
use smallvec::SmallVec;
use tracing::{debug, warn};
use walkdir::WalkDir;

const RESOURCE_DIRS: [&str; 2] = ["openshift", "manifests"];

/// One manifest file and the resources it holds (several for a list file).
#[derive(Debug, Clone)]
pub struct BaselineFile {
    pub path: PathBuf,
    pub docs: ManifestSet,
}

impl BaselineFile {
    pub fn keys(&self) -> impl Iterator<Item = &ResourceKey> { self.docs.keys() }
    /// More than one resource: changes are split out instead of rewritten in place.
    pub fn is_bundle(&self) -> bool { self.docs.len() > 1 }
}

#[derive(Debug, Clone, Default)]
pub struct BaselineTree {
    pub root: PathBuf,
    /// Sorted by path.
    pub files: Vec<BaselineFile>,
    pub skipped: Vec<PathBuf>,
}

impl BaselineTree {
    /// file -> keys it defines
    pub fn key_index(&self) -> BTreeMap<&Path, SmallVec<[&ResourceKey; 4]>> {
        self.files.iter().map(|f| (f.path.as_path(), f.keys().collect())).collect()
    }

    /// Keys defined by more than one file, with the files defining them.
    pub fn duplicate_keys(&self) -> Vec<(&ResourceKey, SmallVec<[&Path; 2]>)> {
        let mut by_key: BTreeMap<&ResourceKey, SmallVec<[&Path; 2]>> = BTreeMap::new();
        for (path, keys) in self.key_index() {
            for key in keys {
                by_key.entry(key).or_default().push(path);
            }
        }
        by_key.into_iter().filter(|(_, files)| files.len() > 1).collect()
    }

    pub fn resource_count(&self) -> usize {
        self.files.iter().map(|f| f.docs.len()).sum()
    }
}

/// Whether `path` (below `root`) is a manifest the engine should look at.
pub fn is_candidate(root: &Path, path: &Path) -> bool {
    let ext_ok = matches!(path.extension().and_then(|e| e.to_str()), Some("yaml") | Some("yml"));
    if !ext_ok {
        return false;
    }
    let rel = path.strip_prefix(root).unwrap_or(path);
    let Some(parent) = rel.parent() else { return false };
    parent.components().any(|c| c.as_os_str().to_str().map_or(false, |s| RESOURCE_DIRS.contains(&s)))
}

/// Walk `root` and key every qualifying manifest file.
pub fn load_baseline_tree(root: &Path) -> Result<BaselineTree> {
    let mut tree = BaselineTree { root: root.to_path_buf(), ..Default::default() };
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            Error::io(path, std::io::Error::from(e))
        })?;
        if !entry.file_type().is_file() || !is_candidate(root, entry.path()) {
            continue;
        }
        let path = entry.path();
        match load_file(path)? {
            Some(docs) => {
                debug!(path = %path.display(), resources = docs.len(), "baseline file");
                tree.files.push(BaselineFile { path: path.to_path_buf(), docs });
            }
            None => {
                counter!("corpus_skipped_files_total", 1u64);
                tree.skipped.push(path.to_path_buf());
            }
        }
    }
    Ok(tree)
}

fn load_file(path: &Path) -> Result<Option<ManifestSet>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    if content.is_empty() {
        debug!(path = %path.display(), "skipping empty file");
        return Ok(None);
    }
    let origin = path.display().to_string();
    let docs = match parse_documents(&content, &origin) {
        Ok(docs) if docs.is_empty() => return Ok(None),
        Ok(docs) => docs,
        Err(e) if e.is_parse() => {
            warn!(path = %path.display(), error = %e, "skipping unparseable manifest");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    // every document counts; several documents make the file a bundle
    let mut out = ManifestSet::new();
    for doc in docs {
        out.extend(keyed(doc, &origin)?);
    }
    Ok(Some(out))
}
