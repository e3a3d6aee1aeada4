//! Site build directory conventions.

use std::path::{Path, PathBuf};

use kni_core::{Error, Result};
use tracing::info;

/// Phase whose rendered output is merged into the installer manifests.
pub const CLUSTER_MODS_PHASE: &str = "01_cluster-mods";

/// Paths of one site below a build directory:
///
/// ```text
/// <build>/<site>/generated_assets          installer output
/// <build>/<site>/blueprint/base/00_cluster working tree
/// <build>/<site>/blueprint/sites/site/NN_* overlay sources
/// <build>/<site>/final_manifests           promoted tree
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLayout {
    build_path: PathBuf,
    site_name: String,
}

impl SiteLayout {
    pub fn new(build_path: impl Into<PathBuf>, site_name: impl Into<String>) -> Self {
        Self { build_path: build_path.into(), site_name: site_name.into() }
    }

    pub fn site_name(&self) -> &str { &self.site_name }
    pub fn site_dir(&self) -> PathBuf { self.build_path.join(&self.site_name) }
    pub fn generated_assets(&self) -> PathBuf { self.site_dir().join("generated_assets") }
    pub fn working_tree(&self) -> PathBuf { self.site_dir().join("blueprint/base/00_cluster") }
    pub fn final_manifests(&self) -> PathBuf { self.site_dir().join("final_manifests") }
    pub fn phase_dir(&self, phase: &str) -> PathBuf { self.site_dir().join("blueprint/sites/site").join(phase) }

    /// Move installer output into place as the working tree, replacing a
    /// stale one.
    pub fn stage_generated_assets(&self) -> Result<PathBuf> {
        let assets = self.generated_assets();
        let working = self.working_tree();
        if !assets.is_dir() {
            return Err(Error::io(&assets, std::io::Error::new(std::io::ErrorKind::NotFound, "no generated assets")));
        }
        if working.exists() {
            std::fs::remove_dir_all(&working).map_err(|e| Error::io(&working, e))?;
        }
        create_parent(&working)?;
        std::fs::rename(&assets, &working).map_err(|e| Error::io(&assets, e))?;
        info!(site = %self.site_name, from = %assets.display(), to = %working.display(), "staged generated assets");
        Ok(working)
    }
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) => std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_hang_off_the_site_dir() {
        let l = SiteLayout::new("/home/u/.kni", "edge-1");
        assert_eq!(l.working_tree(), PathBuf::from("/home/u/.kni/edge-1/blueprint/base/00_cluster"));
        assert_eq!(l.final_manifests(), PathBuf::from("/home/u/.kni/edge-1/final_manifests"));
        assert_eq!(l.phase_dir(CLUSTER_MODS_PHASE), PathBuf::from("/home/u/.kni/edge-1/blueprint/sites/site/01_cluster-mods"));
    }

    #[test]
    fn staging_replaces_stale_working_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let l = SiteLayout::new(tmp.path(), "s");
        std::fs::create_dir_all(l.generated_assets().join("manifests")).unwrap();
        std::fs::write(l.generated_assets().join("manifests/new.yaml"), "a: 1\n").unwrap();
        std::fs::create_dir_all(l.working_tree()).unwrap();
        std::fs::write(l.working_tree().join("stale.yaml"), "a: 0\n").unwrap();

        let working = l.stage_generated_assets().unwrap();
        assert!(working.join("manifests/new.yaml").is_file());
        assert!(!working.join("stale.yaml").exists());
        assert!(!l.generated_assets().exists());
    }

    #[test]
    fn staging_without_assets_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let err = SiteLayout::new(tmp.path(), "s").stage_generated_assets().unwrap_err();
        assert!(err.to_string().contains("generated_assets"), "{}", err);
    }
}
