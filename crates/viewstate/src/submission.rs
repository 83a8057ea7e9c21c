use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LINK_PREFIX: &str = "meshcore://";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidLinkError {
    #[error("link is empty")]
    Empty,
    #[error("link must start with meshcore://")]
    WrongScheme,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionFailure {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("{0}")]
    Rejected(String),
    #[error("server reply carried neither message nor error")]
    EmptyReply,
    #[error("unreadable server reply: {0}")]
    MalformedReply(String),
}

/// POST body adding one node by its advert link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSubmission {
    links: Vec<String>,
    radio: serde_json::Map<String, serde_json::Value>,
}

impl NodeSubmission {
    pub fn from_link(link: &str) -> Result<Self, InvalidLinkError> {
        let link = link.trim();
        if link.is_empty() {
            return Err(InvalidLinkError::Empty);
        }
        if !link.starts_with(LINK_PREFIX) {
            return Err(InvalidLinkError::WrongScheme);
        }
        Ok(Self {
            links: vec![link.to_string()],
            radio: serde_json::Map::new(),
        })
    }

    pub fn link(&self) -> &str {
        self.links.first().map(String::as_str).unwrap_or_default()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct SubmissionReply {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SubmissionReply {
    pub fn parse(body: &str) -> Result<Self, SubmissionFailure> {
        serde_json::from_str(body).map_err(|e| SubmissionFailure::MalformedReply(e.to_string()))
    }

    /// The server's message on success. `error` wins if both are present.
    pub fn into_result(self) -> Result<String, SubmissionFailure> {
        match (self.message, self.error) {
            (_, Some(error)) => Err(SubmissionFailure::Rejected(error)),
            (Some(message), None) => Ok(message),
            (None, None) => Err(SubmissionFailure::EmptyReply),
        }
    }
}
