//! Resource identity: Group/Version/Kind + Name keys with sentinels for
//! missing fields.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_yaml::Value;

use crate::error::{Error, Result};
use crate::value::{lookup_str, ITEMS};
use crate::{ManifestDocument, ManifestSet};

pub const GROUP_SENTINEL: &str = "~G";
pub const VERSION_SENTINEL: &str = "~V";
pub const KIND_SENTINEL: &str = "~K";
pub const NAME_SENTINEL: &str = "~N";

/// GVKN key. Renders as `<group>/<version>/<kind>|<name>`.
///
/// Ordering is field-wise (group, version, kind, name); sequence numbers
/// handed out while writing files follow this order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKey {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self { group: group.into(), version: version.into(), kind: kind.into(), name: name.into() }
    }

    /// `~G/v1/List|~N`: a bare `List` carries other documents and is never a resource itself.
    pub fn is_list_wrapper(&self) -> bool {
        self.group == GROUP_SENTINEL && self.version == "v1" && self.kind == "List" && self.name == NAME_SENTINEL
    }

    /// Lowercased `[<group>-]<name>-<kind>`, used for synthesized file names.
    pub fn display_name(&self) -> String {
        let base = format!("{}-{}", self.name, self.kind);
        let full = if self.group == GROUP_SENTINEL { base } else { format!("{}-{}", self.group, base) };
        full.to_lowercase()
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}|{}", self.group, self.version, self.kind, self.name)
    }
}

impl Serialize for ResourceKey {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// Derive the key of a document. Never fails; absent or non-string fields
/// fall back to the sentinels.
pub fn identity(doc: &ManifestDocument) -> ResourceKey {
    let (group, version) = match doc.get("apiVersion").and_then(Value::as_str) {
        Some(av) => match av.split_once('/') {
            Some((g, v)) => (g, v),
            None => (GROUP_SENTINEL, av),
        },
        None => (GROUP_SENTINEL, VERSION_SENTINEL),
    };
    let kind = doc.get("kind").and_then(Value::as_str).unwrap_or(KIND_SENTINEL);
    let name = lookup_str(doc, &["metadata", "name"]).unwrap_or(NAME_SENTINEL);
    ResourceKey::new(group, version, kind, name)
}

/// Expand a list-wrapper into its members. Nested wrappers are expanded in
/// turn; later members overwrite earlier ones with the same key.
pub fn expand_list(doc: &ManifestDocument, origin: &str) -> Result<ManifestSet> {
    let mut out = ManifestSet::new();
    expand_into(doc, origin, &mut out)?;
    Ok(out)
}

fn expand_into(doc: &ManifestDocument, origin: &str, out: &mut ManifestSet) -> Result<()> {
    let items = match doc.get(ITEMS) {
        Some(Value::Sequence(items)) => items,
        Some(_) => return Err(Error::shape(origin, "`items` is not a sequence")),
        None => return Err(Error::shape(origin, "list has no `items`")),
    };
    for (i, item) in items.iter().enumerate() {
        let Some(item) = item.as_mapping() else {
            return Err(Error::shape(origin, format!("items[{}] is not a mapping", i)));
        };
        let key = identity(item);
        if key.is_list_wrapper() {
            expand_into(item, &format!("{} items[{}]", origin, i), out)?;
        } else {
            out.insert(key, item.clone());
        }
    }
    Ok(())
}

/// Key a single parsed document: wrappers are expanded, anything else
/// yields a one-entry set.
pub fn keyed(doc: ManifestDocument, origin: &str) -> Result<ManifestSet> {
    let key = identity(&doc);
    if key.is_list_wrapper() {
        return expand_list(&doc, origin);
    }
    let mut out = ManifestSet::new();
    out.insert(key, doc);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(y: &str) -> ManifestDocument {
        serde_yaml::from_str(y).unwrap()
    }

    #[test]
    fn full_identity() {
        let k = identity(&doc("apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n"));
        assert_eq!(k.to_string(), "apps/v1/Deployment|web");
    }

    #[test]
    fn version_only_api_version_gets_group_sentinel() {
        let k = identity(&doc("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: foo\n"));
        assert_eq!(k.to_string(), "~G/v1/ConfigMap|foo");
    }

    #[test]
    fn missing_fields_use_sentinels() {
        assert_eq!(identity(&doc("{}")).to_string(), "~G/~V/~K|~N");
        assert_eq!(identity(&doc("kind: Secret\n")).to_string(), "~G/~V/Secret|~N");
        assert_eq!(identity(&doc("apiVersion: v1\nmetadata: {}\n")).to_string(), "~G/v1/~K|~N");
        // metadata.name present but not a string
        assert_eq!(identity(&doc("apiVersion: v1\nkind: A\nmetadata:\n  name: 12\n")).to_string(), "~G/v1/A|~N");
        // metadata not a mapping
        assert_eq!(identity(&doc("apiVersion: v1\nkind: A\nmetadata: nope\n")).to_string(), "~G/v1/A|~N");
    }

    #[test]
    fn list_wrapper_detection() {
        assert!(identity(&doc("apiVersion: v1\nkind: List\nitems: []\n")).is_list_wrapper());
        // a named List is an ordinary resource
        assert!(!identity(&doc("apiVersion: v1\nkind: List\nmetadata:\n  name: x\n")).is_list_wrapper());
        assert!(!identity(&doc("apiVersion: apps/v1\nkind: List\n")).is_list_wrapper());
    }

    #[test]
    fn expand_list_keys_each_item() {
        let d = doc(r#"
apiVersion: v1
kind: List
items:
  - apiVersion: v1
    kind: Secret
    metadata: { name: s1 }
  - apiVersion: v1
    kind: Secret
    metadata: { name: s2 }
  - apiVersion: v1
    kind: Secret
    metadata: { name: s1 }
    data: { last: "yes" }
"#);
        let set = expand_list(&d, "b.yaml").unwrap();
        assert_eq!(set.len(), 2);
        let s1 = &set[&ResourceKey::new("~G", "v1", "Secret", "s1")];
        assert!(s1.get("data").is_some(), "last duplicate wins");
    }

    #[test]
    fn expand_list_recurses_into_nested_wrappers() {
        let d = doc(r#"
apiVersion: v1
kind: List
items:
  - apiVersion: v1
    kind: List
    items:
      - { apiVersion: v1, kind: ConfigMap, metadata: { name: inner } }
"#);
        let set = expand_list(&d, "nested").unwrap();
        let keys: Vec<String> = set.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["~G/v1/ConfigMap|inner"]);
    }

    #[test]
    fn malformed_lists_are_shape_errors() {
        for y in ["apiVersion: v1\nkind: List\n", "apiVersion: v1\nkind: List\nitems: {}\n", "apiVersion: v1\nkind: List\nitems: [1]\n"] {
            let err = expand_list(&doc(y), "bad.yaml").unwrap_err();
            assert!(matches!(err, Error::Shape { .. }), "{}: {}", y, err);
            assert!(err.to_string().contains("bad.yaml"));
        }
    }

    #[test]
    fn display_names() {
        assert_eq!(ResourceKey::new("~G", "v1", "Service", "extra").display_name(), "extra-service");
        assert_eq!(
            ResourceKey::new("machineconfiguration.openshift.io", "v1", "MachineConfig", "99-Worker_SSH").display_name(),
            "machineconfiguration.openshift.io-99-worker_ssh-machineconfig"
        );
    }
}
