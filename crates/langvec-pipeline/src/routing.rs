//! `stage__param` routing shared by composite estimators.

use langvec_embeddings::{value_param, EmbeddingError, EmbeddingResult, ParamValue, Params};
use std::collections::BTreeMap;

/// Stage names must be non-empty, unique and free of the `__` separator.
pub(crate) fn check_stage_name(owner: &str, name: &str, taken: &[&str]) -> EmbeddingResult<()> {
    if name.is_empty() || name.contains("__") {
        return Err(EmbeddingError::InvalidParameter(format!(
            "{} stage name {:?} must be non-empty and must not contain \"__\"",
            owner, name
        )));
    }
    if taken.contains(&name) {
        return Err(EmbeddingError::InvalidParameter(format!(
            "{} stage name {:?} is used twice",
            owner, name
        )));
    }
    Ok(())
}

/// The read-only shallow param listing the stage names.
pub(crate) fn names_param(names: &[&str]) -> ParamValue {
    ParamValue::Value(names.iter().map(|n| serde_json::Value::from(*n)).collect())
}

/// Prefix every nested param with its stage name.
pub(crate) fn prefixed(params: &mut Params, stage: &str, nested: Params) {
    for (key, value) in nested {
        params.insert(format!("{}__{}", stage, key), value);
    }
}

/// Split `params` into per-stage maps keyed by stage name.
///
/// `list_key` may only repeat the current stage names.
pub(crate) fn route_params(
    owner: &str,
    list_key: &str,
    names: &[&str],
    params: Params,
) -> EmbeddingResult<BTreeMap<String, Params>> {
    let mut routed: BTreeMap<String, Params> =
        names.iter().map(|n| (n.to_string(), Params::new())).collect();

    for (key, value) in params {
        if key == list_key {
            let given: Vec<String> = value_param(list_key, &value)?;
            if given != names {
                return Err(EmbeddingError::InvalidParameter(format!(
                    "{} of {} cannot be changed through set_params",
                    list_key, owner
                )));
            }
            continue;
        }
        let target = key
            .split_once("__")
            .and_then(|(stage, rest)| routed.get_mut(stage).map(|p| (p, rest)));
        match target {
            Some((stage_params, rest)) => {
                stage_params.insert(rest.to_string(), value);
            }
            None => {
                return Err(EmbeddingError::InvalidParameter(format!(
                    "Invalid parameter {:?} for {}. Valid parameters are: {} and <stage>__<param> for stages {}",
                    key,
                    owner,
                    list_key,
                    names.join(", ")
                )))
            }
        }
    }
    Ok(routed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_prefix() {
        let mut params = Params::new();
        params.insert("embed__nlp".into(), true.into());
        params.insert("model__c".into(), 2.0.into());
        params.insert("model__inner__x".into(), 1usize.into());

        let routed = route_params("Pipeline", "steps", &["embed", "model"], params).unwrap();
        assert_eq!(routed["embed"].len(), 1);
        assert!(routed["model"].contains_key("c"));
        assert!(routed["model"].contains_key("inner__x"));
    }

    #[test]
    fn rejects_unknown_stages_and_renames() {
        let mut params = Params::new();
        params.insert("other__c".into(), 2.0.into());
        assert!(route_params("Pipeline", "steps", &["embed"], params).is_err());

        let mut params = Params::new();
        params.insert("steps".into(), names_param(&["renamed"]));
        assert!(route_params("Pipeline", "steps", &["embed"], params).is_err());

        let mut params = Params::new();
        params.insert("steps".into(), names_param(&["embed"]));
        assert!(route_params("Pipeline", "steps", &["embed"], params).is_ok());
    }

    #[test]
    fn validates_stage_names() {
        assert!(check_stage_name("FeatureUnion", "colors", &[]).is_ok());
        assert!(check_stage_name("FeatureUnion", "", &[]).is_err());
        assert!(check_stage_name("FeatureUnion", "a__b", &[]).is_err());
        assert!(check_stage_name("FeatureUnion", "colors", &["colors"]).is_err());
    }
}
