//! Request snapshots handed to the engine by the interception hooks

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// Interception phase delivering the request snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Request is about to leave the client; no headers finalized yet
    PreSend,
    /// Outgoing request headers are finalized but not yet sent
    PreHeaderSend,
    /// Response headers arrived, body has not
    PostHeaderReceive,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::PreSend => "pre-send",
            Phase::PreHeaderSend => "pre-header-send",
            Phase::PostHeaderReceive => "post-header-receive",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre-send" => Ok(Phase::PreSend),
            "pre-header-send" => Ok(Phase::PreHeaderSend),
            "post-header-receive" => Ok(Phase::PostHeaderReceive),
            other => Err(EngineError::UnknownPhase {
                name: other.to_string(),
            }),
        }
    }
}

/// Resource classification reported by the interception hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    MainFrame,
    SubFrame,
    Stylesheet,
    Script,
    Image,
    Font,
    Object,
    Xmlhttprequest,
    Ping,
    CspReport,
    Media,
    Websocket,
    Other,
}

impl ResourceType {
    /// Map the raw string a host reports; unknown values land in `Other`
    pub fn parse(raw: &str) -> ResourceType {
        match raw {
            "main_frame" => ResourceType::MainFrame,
            "sub_frame" => ResourceType::SubFrame,
            "stylesheet" => ResourceType::Stylesheet,
            "script" => ResourceType::Script,
            "image" => ResourceType::Image,
            "font" => ResourceType::Font,
            "object" => ResourceType::Object,
            "xmlhttprequest" => ResourceType::Xmlhttprequest,
            "ping" => ResourceType::Ping,
            "csp_report" => ResourceType::CspReport,
            "media" => ResourceType::Media,
            "websocket" => ResourceType::Websocket,
            _ => ResourceType::Other,
        }
    }
}

/// HTTP methods a rule condition can restrict to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMethod {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
}

impl RequestMethod {
    /// Case-insensitive parse of a method name
    pub fn parse(raw: &str) -> Option<RequestMethod> {
        match raw.to_ascii_lowercase().as_str() {
            "connect" => Some(RequestMethod::Connect),
            "delete" => Some(RequestMethod::Delete),
            "get" => Some(RequestMethod::Get),
            "head" => Some(RequestMethod::Head),
            "options" => Some(RequestMethod::Options),
            "patch" => Some(RequestMethod::Patch),
            "post" => Some(RequestMethod::Post),
            "put" => Some(RequestMethod::Put),
            _ => None,
        }
    }
}

/// Document lifecycle state, reported by hosts that stage documents
/// before activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentLifecycle {
    Prerender,
    Active,
    Cached,
    PendingDeletion,
}

/// Request context for rule matching, one per intercepted request/phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub url: String,
    pub method: RequestMethod,
    pub resource_type: ResourceType,
    /// Origin that initiated the request; empty when the host reports none
    pub initiator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_lifecycle: Option<DocumentLifecycle>,
}

impl RequestContext {
    pub fn new(url: &str, method: RequestMethod, resource_type: ResourceType, initiator: &str) -> Self {
        Self {
            url: url.to_string(),
            method,
            resource_type,
            initiator: initiator.to_string(),
            document_lifecycle: None,
        }
    }

    pub fn with_document_lifecycle(mut self, lifecycle: DocumentLifecycle) -> Self {
        self.document_lifecycle = Some(lifecycle);
        self
    }

    /// Main-frame navigations and prerendered documents get elevated
    /// reporting severity downstream; this never affects matching
    pub fn is_top_level_or_prerender(&self) -> bool {
        self.resource_type == ResourceType::MainFrame
            || self.document_lifecycle == Some(DocumentLifecycle::Prerender)
    }

    /// Lowercased host of the initiator origin, when it parses as a URL
    pub fn initiator_host(&self) -> Option<String> {
        let parsed = url::Url::parse(&self.initiator).ok()?;
        parsed.host_str().map(|h| h.to_ascii_lowercase())
    }
}
