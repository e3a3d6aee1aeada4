//! Reconciliation of a baseline manifest tree against overlay resources.
//!
//! Per file: every key is marked processed; keys whose overlay version
//! differs cause the file to be backed up to `<file>.orig` and the overlay
//! version written, in place for single-resource files and split out as
//! `NN_<file>` for list files. Overlay keys never seen in the baseline are
//! added under `manifests/`. The pass never deletes resources.

use std::path::{Path, PathBuf};
use std::time::Instant;

use kni_core::prelude::*;
use kni_core::{diff_documents, value::mappings_equal};
use kni_corpus::{load_baseline_tree, BaselineFile};
use metrics::{counter, histogram};
use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::writer::{write_manifest, NewResourceWriter};

pub const BACKUP_SUFFIX: &str = ".orig";
pub const NEW_RESOURCE_DIR: &str = "manifests";

/// What one pass did, for logging and reporting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileOutcome {
    /// `<file>.orig` backups
    pub backed_up: Vec<PathBuf>,
    /// single-resource files rewritten in place
    pub rewritten: Vec<PathBuf>,
    /// `NN_<file>` files split out of list files
    pub split: Vec<PathBuf>,
    /// `99_NNNN_<name>.yaml` files for overlay-only resources
    pub created: Vec<PathBuf>,
    /// baseline resources identical in the overlay
    pub unchanged: usize,
    /// files skipped as unparseable
    pub skipped: Vec<PathBuf>,
    #[serde(skip)]
    pub processed: FxHashSet<ResourceKey>,
}

impl ReconcileOutcome {
    /// Nothing was written.
    pub fn is_noop(&self) -> bool {
        self.backed_up.is_empty() && self.rewritten.is_empty() && self.split.is_empty() && self.created.is_empty()
    }

    /// Re-root every recorded path from `from` to `to`, e.g. after the tree was promoted.
    pub fn relocate(mut self, from: &Path, to: &Path) -> Self {
        let move_path = |p: &mut PathBuf| {
            if let Ok(rel) = p.strip_prefix(from) {
                *p = to.join(rel);
            }
        };
        for list in [&mut self.backed_up, &mut self.rewritten, &mut self.split, &mut self.created, &mut self.skipped] {
            list.iter_mut().for_each(&move_path);
        }
        self
    }
}

/// Reconcile the tree at `root` with `overlay`, mutating it in place.
///
/// Any I/O, shape or serialization failure aborts the pass; files already
/// written stay written and their `.orig` backups remain.
pub fn reconcile(root: &Path, overlay: &ManifestSet) -> Result<ReconcileOutcome> {
    let t0 = Instant::now();
    let tree = load_baseline_tree(root)?;
    counter!("reconcile_files_scanned_total", tree.files.len() as u64);
    for (key, files) in tree.duplicate_keys() {
        warn!(key = %key, files = ?files, "resource defined by more than one baseline file");
    }

    let mut out = ReconcileOutcome { skipped: tree.skipped.clone(), ..Default::default() };
    for file in &tree.files {
        reconcile_file(file, overlay, &mut out)?;
    }

    let mut writer = NewResourceWriter::new(root.join(NEW_RESOURCE_DIR));
    let fresh: Vec<_> = overlay.iter().filter(|(k, _)| !out.processed.contains(*k)).collect();
    for (key, doc) in fresh {
        out.created.push(writer.write(key, doc)?);
    }
    debug!(dir = %writer.dir().display(), created = writer.written(), "new resources written");

    counter!("reconcile_backups_total", out.backed_up.len() as u64);
    counter!("reconcile_rewrites_total", (out.rewritten.len() + out.split.len()) as u64);
    counter!("reconcile_new_resources_total", out.created.len() as u64);
    histogram!("reconcile_latency_ms", t0.elapsed().as_secs_f64() * 1000.0);
    info!(
        root = %root.display(),
        files = tree.files.len(),
        processed = out.processed.len(),
        unchanged = out.unchanged,
        backed_up = out.backed_up.len(),
        rewritten = out.rewritten.len(),
        split = out.split.len(),
        created = out.created.len(),
        "reconciliation finished"
    );
    Ok(out)
}

fn reconcile_file(file: &BaselineFile, overlay: &ManifestSet, out: &mut ReconcileOutcome) -> Result<()> {
    let mut changed: Vec<(&ResourceKey, &ManifestDocument)> = Vec::new();
    for (key, base) in &file.docs {
        out.processed.insert(key.clone());
        let Some(desired) = overlay.get(key) else { continue };
        if mappings_equal(desired, base) {
            out.unchanged += 1;
            continue;
        }
        let diff = diff_documents(desired, base);
        debug!(key = %key, path = %file.path.display(), adds = diff.adds, updates = diff.updates, removes = diff.removes, "overlay changes resource");
        changed.push((key, desired));
    }
    if changed.is_empty() {
        return Ok(());
    }

    // split targets must not clobber files the pass never backed up
    let targets: Vec<PathBuf> = if file.is_bundle() {
        (0..changed.len()).map(|seq| split_path(&file.path, seq)).collect()
    } else {
        Vec::new()
    };
    if let Some(taken) = targets.iter().find(|p| p.exists()) {
        return Err(Error::io(
            taken,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, format!("split target for {} already exists", file.path.display())),
        ));
    }

    out.backed_up.push(back_up(&file.path)?);
    if !file.is_bundle() {
        for (key, desired) in changed {
            write_manifest(&file.path, key, desired)?;
        }
        out.rewritten.push(file.path.clone());
        return Ok(());
    }
    for ((key, desired), path) in changed.into_iter().zip(targets) {
        write_manifest(&path, key, desired)?;
        debug!(key = %key, path = %path.display(), "split changed list member");
        out.split.push(path);
    }
    Ok(())
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(BACKUP_SUFFIX);
    PathBuf::from(s)
}

/// `dir/NN_<file name>`
pub fn split_path(path: &Path, seq: usize) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!("{:02}_{}", seq, name))
}

/// Move `path` aside to `<path>.orig`. An existing backup is kept, since it
/// already holds the earliest version of the file; the live file is then
/// just removed.
fn back_up(path: &Path) -> Result<PathBuf> {
    let orig = backup_path(path);
    if orig.exists() {
        warn!(path = %path.display(), "backup already exists; keeping the earlier one");
        std::fs::remove_file(path).map_err(|e| Error::io(path, e))?;
    } else {
        std::fs::rename(path, &orig).map_err(|e| Error::io(path, e))?;
    }
    debug!(path = %path.display(), backup = %orig.display(), "backed up");
    Ok(orig)
}
