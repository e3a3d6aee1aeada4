//! KNI corpus: turns on-disk manifest trees and rendered overlay streams
//! into keyed manifest sets.

#![forbid(unsafe_code)]

pub mod baseline;
pub mod kustomization;
pub mod overlay;

pub use baseline::{load_baseline_tree, BaselineFile, BaselineTree};
pub use kustomization::{kustomization_entries, write_kustomization_index, KUSTOMIZATION_FILE};
pub use overlay::{load_overlay, load_overlay_with_limit, split_documents};
