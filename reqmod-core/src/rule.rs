//! Rule model
//!
//! A rule pairs a matching condition with a typed action payload. The wire
//! shape mirrors what browser hosts exchange: camelCase field names, the
//! action keyed by an uppercase `ruleType` discriminant.

use serde::{Deserialize, Serialize};

use crate::context::{RequestMethod, ResourceType};
use crate::error::EngineError;
use crate::pattern::UrlFilter;
use crate::Result;

/// The unit of policy: who it matches and what it does
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: i64,
    /// Higher priority wins ordering conflicts; ties break on ascending id
    pub priority: i32,
    pub condition: RuleCondition,
    #[serde(flatten)]
    pub action: RuleAction,
}

/// When a rule applies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub url_filter: String,
    /// Empty means every resource type matches
    #[serde(default)]
    pub resource_types: Vec<ResourceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_methods: Option<Vec<RequestMethod>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<String>>,
    /// Takes precedence over `domains`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_domains: Option<Vec<String>>,
}

/// What a rule does, keyed by its type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "ruleType", content = "action", rename_all = "UPPERCASE")]
pub enum RuleAction {
    Redirect(RedirectAction),
    Replace(ReplaceAction),
    #[serde(rename = "QUERYPARAM")]
    QueryParam(QueryTransform),
    Cancel,
    Delay(DelayAction),
    Headers(HeaderConfig),
    #[serde(rename = "USERAGENT")]
    UserAgent(UserAgentAction),
}

impl RuleAction {
    /// Discriminant name as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            RuleAction::Redirect(_) => "REDIRECT",
            RuleAction::Replace(_) => "REPLACE",
            RuleAction::QueryParam(_) => "QUERYPARAM",
            RuleAction::Cancel => "CANCEL",
            RuleAction::Delay(_) => "DELAY",
            RuleAction::Headers(_) => "HEADERS",
            RuleAction::UserAgent(_) => "USERAGENT",
        }
    }
}

/// Redirect to a fixed URL or rewrite pieces of the current one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<UrlTransform>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlTransform {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_transform: Option<QueryTransform>,
}

impl UrlTransform {
    pub fn is_empty(&self) -> bool {
        self.scheme.is_none()
            && self.host.is_none()
            && self.path.is_none()
            && self.query_transform.as_ref().map_or(true, |t| t.is_empty())
    }
}

/// Query-string edits: removals run before add-or-replace entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTransform {
    #[serde(default)]
    pub remove_params: Vec<String>,
    #[serde(default)]
    pub add_or_replace_params: Vec<QueryParamPair>,
}

impl QueryTransform {
    pub fn is_empty(&self) -> bool {
        self.remove_params.is_empty() && self.add_or_replace_params.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParamPair {
    pub key: String,
    pub value: String,
}

/// First-occurrence substring swap applied to the URL
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceAction {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayAction {
    pub delay_ms: u64,
}

/// Header modifications split by direction; an empty direction is a
/// deliberate no-op for that phase, not an error
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderConfig {
    #[serde(default)]
    pub request: Vec<HeaderModification>,
    #[serde(default)]
    pub response: Vec<HeaderModification>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderModification {
    pub header: String,
    pub operation: HeaderOperation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl HeaderModification {
    pub fn set(header: &str, value: &str) -> Self {
        Self {
            header: header.to_string(),
            operation: HeaderOperation::Set,
            value: Some(value.to_string()),
        }
    }

    pub fn remove(header: &str) -> Self {
        Self {
            header: header.to_string(),
            operation: HeaderOperation::Remove,
            value: None,
        }
    }

    pub fn append(header: &str, value: &str) -> Self {
        Self {
            header: header.to_string(),
            operation: HeaderOperation::Append,
            value: Some(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderOperation {
    Set,
    Remove,
    Append,
}

/// Outbound `User-Agent` override
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAgentAction {
    pub user_agent: String,
}

impl Rule {
    /// Validate shape invariants before the rule is accepted into a store.
    ///
    /// The engine itself never calls this during matching: anything
    /// malformed that slips through simply never matches.
    pub fn validate(&self) -> Result<()> {
        if self.priority <= 0 {
            return Err(EngineError::invalid_rule("priority must be positive"));
        }
        UrlFilter::parse(&self.condition.url_filter)?;

        match &self.action {
            RuleAction::Redirect(redirect) => match (&redirect.url, &redirect.transform) {
                (None, None) => Err(EngineError::invalid_rule(
                    "redirect requires a target url or a transform",
                )),
                (Some(target), _) => {
                    url::Url::parse(target)
                        .map_err(|e| EngineError::invalid_redirect(&e.to_string()))?;
                    Ok(())
                }
                (None, Some(transform)) if transform.is_empty() => {
                    Err(EngineError::invalid_rule("redirect transform is empty"))
                }
                (None, Some(_)) => Ok(()),
            },
            RuleAction::Replace(replace) => {
                if replace.from.is_empty() {
                    Err(EngineError::invalid_rule("replace requires a search string"))
                } else {
                    Ok(())
                }
            }
            RuleAction::QueryParam(transform) => {
                if transform.is_empty() {
                    Err(EngineError::invalid_rule("query transform is empty"))
                } else {
                    Ok(())
                }
            }
            RuleAction::Cancel => Ok(()),
            RuleAction::Delay(delay) => {
                if delay.delay_ms == 0 {
                    Err(EngineError::invalid_rule("delay must be non-zero"))
                } else {
                    Ok(())
                }
            }
            RuleAction::Headers(config) => {
                if config.request.is_empty() && config.response.is_empty() {
                    Err(EngineError::invalid_rule(
                        "headers rule has no modifications in either direction",
                    ))
                } else {
                    Ok(())
                }
            }
            RuleAction::UserAgent(spoof) => {
                if spoof.user_agent.is_empty() {
                    Err(EngineError::invalid_rule("user agent value is empty"))
                } else {
                    Ok(())
                }
            }
        }
    }
}
