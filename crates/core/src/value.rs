//! Structural comparison and path lookup over the YAML value model.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::ManifestDocument;

pub(crate) const ITEMS: &str = "items";

/// Walk nested mappings by string key.
pub fn lookup_path<'a>(doc: &'a ManifestDocument, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut cur = doc.get(*first)?;
    for seg in rest {
        cur = cur.as_mapping()?.get(*seg)?;
    }
    Some(cur)
}

pub fn lookup_str<'a>(doc: &'a ManifestDocument, path: &[&str]) -> Option<&'a str> {
    lookup_path(doc, path).and_then(Value::as_str)
}

/// Deep equality, field by field. Mapping key order is irrelevant;
/// sequence order and scalar types are significant (`1` != `"1"` != `1.0`).
pub fn structurally_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Sequence(x), Value::Sequence(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(l, r)| structurally_equal(l, r))
        }
        (Value::Mapping(x), Value::Mapping(y)) => mappings_equal(x, y),
        (Value::Tagged(x), Value::Tagged(y)) => x.tag == y.tag && structurally_equal(&x.value, &y.value),
        _ => false,
    }
}

pub fn mappings_equal(a: &Mapping, b: &Mapping) -> bool {
    a.len() == b.len()
        && a.iter().all(|(k, av)| match b.get(k) {
            Some(bv) => structurally_equal(av, bv),
            None => false,
        })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary { pub adds: usize, pub updates: usize, pub removes: usize }

impl DiffSummary {
    pub fn is_empty(&self) -> bool { self.adds == 0 && self.updates == 0 && self.removes == 0 }
}

/// Count leaf-level changes going from `base` to `target`.
pub fn diff_summary(target: &Value, base: &Value) -> DiffSummary {
    let mut s = DiffSummary::default();
    walk(target, base, &mut s);
    s
}

/// [`diff_summary`] for two documents, without wrapping them in a `Value`.
pub fn diff_documents(target: &Mapping, base: &Mapping) -> DiffSummary {
    let mut s = DiffSummary::default();
    walk_mappings(target, base, &mut s);
    s
}

fn walk(a: &Value, b: &Value, s: &mut DiffSummary) {
    match (a, b) {
        (Value::Mapping(am), Value::Mapping(bm)) => walk_mappings(am, bm, s),
        (Value::Sequence(aa), Value::Sequence(bb)) => {
            let min_len = aa.len().min(bb.len());
            s.updates += (0..min_len).filter(|&i| !structurally_equal(&aa[i], &bb[i])).count();
            if aa.len() > bb.len() { s.adds += aa.len() - bb.len(); }
            if bb.len() > aa.len() { s.removes += bb.len() - aa.len(); }
        }
        // Scalars differ or type differs
        (av, bv) => { if !structurally_equal(av, bv) { s.updates += 1; } }
    }
}

fn walk_mappings(am: &Mapping, bm: &Mapping, s: &mut DiffSummary) {
    for (k, av) in am.iter() {
        match bm.get(k) {
            Some(bv) if structurally_equal(av, bv) => {}
            Some(bv) => walk(av, bv, s),
            None => s.adds += 1,
        }
    }
    s.removes += bm.keys().filter(|k| !am.contains_key(*k)).count();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(y: &str) -> Value {
        serde_yaml::from_str(y).unwrap()
    }

    #[test]
    fn key_order_is_irrelevant() {
        assert!(structurally_equal(&v("{a: 1, b: [x, y], c: {d: null}}"), &v("{c: {d: null}, b: [x, y], a: 1}")));
    }

    #[test]
    fn scalar_types_and_sequence_order_matter() {
        assert!(!structurally_equal(&v("k: \"1\""), &v("k: 1")));
        assert!(!structurally_equal(&v("k: 1"), &v("k: 1.0")));
        assert!(!structurally_equal(&v("[a, b]"), &v("[b, a]")));
        assert!(!structurally_equal(&v("{a: 1}"), &v("{a: 1, b: 2}")));
        assert!(!structurally_equal(&v("{a: 1}"), &v("{b: 1}")));
        assert!(structurally_equal(&v("!secret abc"), &v("!secret abc")));
        assert!(!structurally_equal(&v("!secret abc"), &v("!other abc")));
    }

    #[test]
    fn lookup_walks_mappings_only() {
        let d: ManifestDocument = serde_yaml::from_str("metadata:\n  name: foo\n  labels:\n    app: web\nlist: [1]\n").unwrap();
        assert_eq!(lookup_str(&d, &["metadata", "labels", "app"]), Some("web"));
        assert_eq!(lookup_str(&d, &["metadata", "missing"]), None);
        assert_eq!(lookup_path(&d, &["list", "0"]), None);
        assert_eq!(lookup_path(&d, &[]), None);
    }

    #[test]
    fn diff_summary_counts_adds_updates_removes() {
        let base = v("{a: 1, b: {x: 1}, c: [1, 2, 3]}");
        let target = v("{a: 2, b: {x: 1, y: 2}, c: [1, 9], d: true}");
        let s = diff_summary(&target, &base);
        assert_eq!(s, DiffSummary { adds: 2, updates: 2, removes: 1 });
        assert!(diff_summary(&base, &base).is_empty());
    }

    #[test]
    fn document_diff_matches_value_diff() {
        let base = v("{metadata: {name: foo}, data: {k: \"1\", gone: x}}");
        let target = v("{metadata: {name: foo}, data: {k: \"2\", added: y}}");
        let s = diff_documents(target.as_mapping().unwrap(), base.as_mapping().unwrap());
        assert_eq!(s, DiffSummary { adds: 1, updates: 1, removes: 1 });
        assert_eq!(s, diff_summary(&target, &base));
    }
}
