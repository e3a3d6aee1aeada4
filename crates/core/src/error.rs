//! Error taxonomy for manifest reconciliation

use std::path::PathBuf;

use thiserror::Error;

/// Every failure a reconciliation pass can surface.
///
/// Messages always carry the offending path or resource key so a failed
/// pass can be diagnosed from the log line alone.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed YAML in an overlay segment or a manifest file
    #[error("parsing YAML in {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A document parsed, but is not a mapping
    #[error("document in {origin} is not a mapping")]
    NotAMapping { origin: String },

    /// A list-wrapper without a usable `items` sequence
    #[error("malformed list in {origin}: {reason}")]
    Shape { origin: String, reason: String },

    /// Read/write/rename failure inside the working tree
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Final rename of the working tree failed; the working tree is left in place
    #[error("promoting {} to {}: {source}", from.display(), to.display())]
    Promote {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The overlay renderer produced no content
    #[error("overlay stream is empty")]
    EmptyOverlay,

    /// The overlay exceeds `KNI_MAX_OVERLAY_BYTES` (default 16 MiB). Not a
    /// YAML defect: the stream is refused before parsing to bound memory use.
    #[error("overlay stream too large ({size} bytes > {max})")]
    OverlayTooLarge { size: usize, max: usize },

    /// A resource could not be rendered back to YAML
    #[error("serializing {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_yaml::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn parse(origin: impl Into<String>, source: serde_yaml::Error) -> Self {
        Self::Parse { origin: origin.into(), source }
    }

    pub fn not_a_mapping(origin: impl Into<String>) -> Self {
        Self::NotAMapping { origin: origin.into() }
    }

    pub fn shape(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Shape { origin: origin.into(), reason: reason.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// True for failures that a baseline walk may tolerate by skipping the file.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::NotAMapping { .. })
    }
}
