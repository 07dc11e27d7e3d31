//! Constructor parameters exposed through `get_params` / `set_params`.

use crate::bpemb::BpeEmbeddings;
use crate::subword::SubwordModel;
use crate::table::VectorTable;
use crate::{EmbeddingError, EmbeddingResult};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Parameter map, ordered by name.
pub type Params = BTreeMap<String, ParamValue>;

/// A shared, externally owned backend handle.
///
/// Equality is handle identity: two resources are equal only if they point
/// at the same loaded model.
#[derive(Clone)]
pub enum Resource {
    Vectors(Arc<VectorTable>),
    Subwords(Arc<SubwordModel>),
    Bpe(Arc<BpeEmbeddings>),
}

impl Resource {
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::Vectors(_) => "vectors",
            Resource::Subwords(_) => "subwords",
            Resource::Bpe(_) => "bpe",
        }
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Resource::Vectors(a), Resource::Vectors(b)) => Arc::ptr_eq(a, b),
            (Resource::Subwords(a), Resource::Subwords(b)) => Arc::ptr_eq(a, b),
            (Resource::Bpe(a), Resource::Bpe(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Vectors(t) => write!(f, "Vectors({} x {})", t.len(), t.dimension()),
            Resource::Subwords(m) => write!(f, "Subwords({} words, dim {})", m.nwords(), m.dim()),
            Resource::Bpe(b) => write!(f, "Bpe({} subwords, dim {})", b.vectors().len(), b.dim()),
        }
    }
}

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Value(serde_json::Value),
    Resource(Resource),
}

impl ParamValue {
    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            ParamValue::Resource(r) => Some(r),
            ParamValue::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            ParamValue::Value(v) => Some(v),
            ParamValue::Resource(_) => None,
        }
    }
}

impl From<Resource> for ParamValue {
    fn from(r: Resource) -> Self {
        ParamValue::Resource(r)
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(v: serde_json::Value) -> Self {
        ParamValue::Value(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Value(v.into())
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Value(v.into())
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Value(v.into())
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Value(v.into())
    }
}

/// Fail with `InvalidParameter` if `params` carries a key outside `allowed`.
pub fn check_keys(owner: &str, params: &Params, allowed: &[&str]) -> EmbeddingResult<()> {
    if let Some(key) = params.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(EmbeddingError::InvalidParameter(format!(
            "Invalid parameter {:?} for {}. Valid parameters are: {}",
            key,
            owner,
            allowed.join(", ")
        )));
    }
    Ok(())
}

/// Decode a plain value parameter.
pub fn value_param<T: DeserializeOwned>(key: &str, value: &ParamValue) -> EmbeddingResult<T> {
    let json = value.as_value().ok_or_else(|| {
        EmbeddingError::InvalidParameter(format!("{} expects a value, got a resource", key))
    })?;
    serde_json::from_value(json.clone())
        .map_err(|e| EmbeddingError::InvalidParameter(format!("{}: {}", key, e)))
}

/// Split `prefix__rest` keys addressed to a nested stage.
///
/// Returns the params for `prefix` with the prefix stripped.
pub fn nested(params: &Params, prefix: &str) -> Params {
    let marker = format!("{}__", prefix);
    params
        .iter()
        .filter_map(|(k, v)| k.strip_prefix(&marker).map(|rest| (rest.to_string(), v.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_keys() {
        let mut params = Params::new();
        params.insert("nlp".into(), true.into());
        params.insert("bogus".into(), true.into());
        let err = check_keys("VectorLanguage", &params, &["nlp"]).unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn decodes_values() {
        let v: usize = value_param("n", &ParamValue::from(3usize)).unwrap();
        assert_eq!(v, 3);
        let bad: EmbeddingResult<bool> = value_param("flag", &ParamValue::from("yes"));
        assert!(bad.is_err());
    }

    #[test]
    fn nested_strips_prefix() {
        let mut params = Params::new();
        params.insert("embed__nlp".into(), true.into());
        params.insert("model__c".into(), 2.0.into());
        let inner = nested(&params, "embed");
        assert_eq!(inner.len(), 1);
        assert!(inner.contains_key("nlp"));
    }

    #[test]
    fn resources_compare_by_identity() {
        let table = Arc::new(VectorTable::from_pairs(vec![("a", vec![1.0])]).unwrap());
        let a = Resource::Vectors(table.clone());
        let b = Resource::Vectors(table);
        let c = Resource::Vectors(Arc::new(
            VectorTable::from_pairs(vec![("a", vec![1.0])]).unwrap(),
        ));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
