//! Files for overlay resources the baseline never defined.

use std::path::{Path, PathBuf};

use kni_core::prelude::*;
use tracing::info;

/// Sorts after everything the installer generates.
pub const NEW_RESOURCE_PREFIX: &str = "99";

pub fn new_resource_file_name(seq: usize, key: &ResourceKey) -> String {
    format!("{}_{:04}_{}.yaml", NEW_RESOURCE_PREFIX, seq, key.display_name())
}

/// Writes new resources into one directory, numbering them in call order.
#[derive(Debug)]
pub struct NewResourceWriter {
    dir: PathBuf,
    next: usize,
}

impl NewResourceWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into(), next: 0 } }

    pub fn dir(&self) -> &Path { &self.dir }
    pub fn written(&self) -> usize { self.next }

    pub fn write(&mut self, key: &ResourceKey, doc: &ManifestDocument) -> Result<PathBuf> {
        if self.next == 0 {
            std::fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        }
        let path = self.dir.join(new_resource_file_name(self.next, key));
        write_manifest(&path, key, doc)?;
        info!(key = %key, path = %path.display(), "overlay added resource");
        self.next += 1;
        Ok(path)
    }
}

pub(crate) fn write_manifest(path: &Path, key: &ResourceKey, doc: &ManifestDocument) -> Result<()> {
    let body = render_document(key, doc)?;
    std::fs::write(path, body).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_follow_the_sorting_convention() {
        let key = ResourceKey::new("~G", "v1", "Service", "extra");
        assert_eq!(new_resource_file_name(0, &key), "99_0000_extra-service.yaml");
        let key = ResourceKey::new("operators.coreos.com", "v1alpha1", "Subscription", "SRIOV");
        assert_eq!(new_resource_file_name(12, &key), "99_0012_operators.coreos.com-sriov-subscription.yaml");
    }

    #[test]
    fn numbers_files_in_write_order_and_creates_the_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let mut w = NewResourceWriter::new(tmp.path().join("manifests"));
        let doc: ManifestDocument = serde_yaml::from_str("apiVersion: v1\nkind: Namespace\nmetadata: {name: a}\n").unwrap();
        let p0 = w.write(&identity(&doc), &doc).unwrap();
        let p1 = w.write(&ResourceKey::new("~G", "v1", "Namespace", "b"), &doc).unwrap();
        assert!(p0.ends_with("manifests/99_0000_a-namespace.yaml"));
        assert!(p1.ends_with("manifests/99_0001_b-namespace.yaml"));
        assert_eq!(w.written(), 2);
        assert!(p0.is_file() && p1.is_file());
    }
}
