//! Concrete modification helpers
//!
//! Turns resolved effects into actual header lists and URLs. Executors
//! that rewrite traffic in-process use these; executors that forward
//! instructions elsewhere can ignore them.

use crate::error::EngineError;
use crate::rule::{
    HeaderModification, HeaderOperation, QueryTransform, RedirectAction, ReplaceAction,
};
use crate::Result;

/// Apply header edits in order to a name/value list.
///
/// Header name comparison is case-insensitive; `set` collapses every
/// existing occurrence down to the one new value, `append` always adds.
pub fn apply_header_modifications(
    headers: &mut Vec<(String, String)>,
    modifications: &[HeaderModification],
) {
    for m in modifications {
        match m.operation {
            HeaderOperation::Set => {
                headers.retain(|(name, _)| !name.eq_ignore_ascii_case(&m.header));
                headers.push((m.header.clone(), m.value.clone().unwrap_or_default()));
            }
            HeaderOperation::Remove => {
                headers.retain(|(name, _)| !name.eq_ignore_ascii_case(&m.header));
            }
            HeaderOperation::Append => {
                headers.push((m.header.clone(), m.value.clone().unwrap_or_default()));
            }
        }
    }
}

/// Compute the destination of a redirect action.
///
/// A fixed target URL wins; otherwise the transform is applied piecewise
/// to the current URL.
pub fn build_redirect_url(redirect: &RedirectAction, current: &str) -> Result<String> {
    if let Some(target) = &redirect.url {
        url::Url::parse(target).map_err(|e| EngineError::invalid_redirect(&e.to_string()))?;
        return Ok(target.clone());
    }

    let transform = redirect
        .transform
        .as_ref()
        .ok_or_else(|| EngineError::invalid_redirect("redirect has neither url nor transform"))?;

    let mut parsed =
        url::Url::parse(current).map_err(|e| EngineError::invalid_redirect(&e.to_string()))?;

    if let Some(scheme) = &transform.scheme {
        parsed
            .set_scheme(scheme)
            .map_err(|_| EngineError::invalid_redirect("scheme change rejected for this URL"))?;
    }
    if let Some(host) = &transform.host {
        parsed
            .set_host(Some(host))
            .map_err(|e| EngineError::invalid_redirect(&e.to_string()))?;
    }
    if let Some(path) = &transform.path {
        parsed.set_path(path);
    }
    if let Some(query) = &transform.query_transform {
        transform_query(&mut parsed, query);
    }

    Ok(parsed.to_string())
}

/// Rewrite just the query string of a URL
pub fn apply_query_transform(current: &str, transform: &QueryTransform) -> Result<String> {
    let mut parsed =
        url::Url::parse(current).map_err(|e| EngineError::invalid_redirect(&e.to_string()))?;
    transform_query(&mut parsed, transform);
    Ok(parsed.to_string())
}

/// First occurrence only
pub fn apply_replacement(url: &str, replace: &ReplaceAction) -> String {
    url.replacen(&replace.from, &replace.to, 1)
}

fn transform_query(parsed: &mut url::Url, transform: &QueryTransform) {
    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    // Removals first, then add-or-replace in declared order
    pairs.retain(|(key, _)| !transform.remove_params.iter().any(|r| r == key));
    for pair in &transform.add_or_replace_params {
        match pairs.iter_mut().find(|(key, _)| key == &pair.key) {
            Some(existing) => existing.1 = pair.value.clone(),
            None => pairs.push((pair.key.clone(), pair.value.clone())),
        }
    }

    if pairs.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(pairs);
    }
}
