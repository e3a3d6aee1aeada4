//! KNI core: manifest documents, resource identity and the error taxonomy
//! shared by the corpus loader and the reconciliation engine.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::Deserialize;

pub mod error;
pub mod identity;
pub mod value;

pub use error::{Error, Result};
pub use identity::{expand_list, identity, keyed, ResourceKey};
pub use value::{diff_documents, diff_summary, lookup_path, lookup_str, structurally_equal, DiffSummary};

/// One configuration object as parsed from YAML.
pub type ManifestDocument = serde_yaml::Mapping;

/// Documents keyed by identity. Duplicate keys overwrite (last write wins);
/// iteration is in key order.
pub type ManifestSet = BTreeMap<ResourceKey, ManifestDocument>;

/// Parse one YAML document that must be a mapping. `origin` names the file
/// or stream segment in error messages. Returns `None` for documents that
/// are empty or only comments.
pub fn parse_document(text: &str, origin: &str) -> Result<Option<ManifestDocument>> {
    let value: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| Error::parse(origin, e))?;
    match value {
        serde_yaml::Value::Null => Ok(None),
        serde_yaml::Value::Mapping(m) => Ok(Some(m)),
        _ => Err(Error::not_a_mapping(origin)),
    }
}

/// Parse every document of a multi-document YAML text (`---` separated).
/// Empty documents are dropped; any document that fails to parse, or is
/// not a mapping, fails the whole text.
pub fn parse_documents(text: &str, origin: &str) -> Result<Vec<ManifestDocument>> {
    let mut out = Vec::new();
    for (i, de) in serde_yaml::Deserializer::from_str(text).enumerate() {
        match serde_yaml::Value::deserialize(de).map_err(|e| Error::parse(origin, e))? {
            serde_yaml::Value::Null => {}
            serde_yaml::Value::Mapping(m) => out.push(m),
            _ => return Err(Error::not_a_mapping(format!("{} (document {})", origin, i))),
        }
    }
    Ok(out)
}

/// Render a document back to YAML.
pub fn render_document(key: &ResourceKey, doc: &ManifestDocument) -> Result<String> {
    serde_yaml::to_string(doc).map_err(|e| Error::Serialize { key: key.to_string(), source: e })
}

pub mod prelude {
    pub use super::{
        identity, keyed, parse_document, parse_documents, render_document, structurally_equal, Error, ManifestDocument, ManifestSet,
        ResourceKey, Result,
    };
}
