//! What the draft is asked to be.

use seoflow_core::types::{ContentType, PipelineRequest, StyleProfile, Tone};
use serde::{Deserialize, Serialize};

/// The request fields and client profile that shape a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftBrief {
    /// Subject of the article.
    pub topic: String,
    /// Requested tone.
    pub tone: Tone,
    /// Desired length in words.
    pub target_length: u32,
    /// Keywords in request order.
    pub keywords: Vec<String>,
    /// Kind of piece being written.
    pub content_type: ContentType,
    /// Resolved client profile; neutral when none is configured.
    pub profile: StyleProfile,
}

impl DraftBrief {
    /// Builds the brief for a request.
    pub fn new(request: &PipelineRequest, profile: StyleProfile) -> Self {
        Self {
            topic: request.topic.trim().to_owned(),
            tone: request.tone.clone(),
            target_length: request.target_length,
            keywords: request
                .keywords
                .iter()
                .map(|keyword| keyword.trim().to_owned())
                .collect(),
            content_type: request.content_type,
            profile,
        }
    }

    /// First keyword of the request.
    pub fn primary_keyword(&self) -> Option<&str> {
        self.keywords.first().map(String::as_str)
    }
}
