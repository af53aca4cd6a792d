//! Stage artifacts and their provenance.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, IntoStaticStr};

/// Namespace of a cached or produced artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(AsRefStr, IntoStaticStr, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Search landscape signals.
    Landscape,
    /// Competitor insight.
    Competitor,
    /// Generated draft.
    Draft,
    /// Style-adapted draft.
    Adapted,
    /// Optimized final content.
    Final,
}

/// Where an artifact's payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Computed during this run.
    Fresh,
    /// Read from a live cache entry.
    Cached,
    /// Read from an expired cache entry as a fallback.
    StaleCache,
    /// Neutral defaults substituted for unavailable data.
    Default,
}

impl Origin {
    /// Returns whether this origin marks the run as degraded.
    pub fn is_degraded(self) -> bool {
        matches!(self, Self::StaleCache | Self::Default)
    }
}

/// A payload together with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact<T> {
    /// Artifact namespace.
    pub kind: ArtifactKind,
    /// Provenance of the payload.
    pub origin: Origin,
    /// When the payload was produced or retrieved.
    pub produced_at: Timestamp,
    /// The payload itself.
    pub payload: T,
}

impl<T> Artifact<T> {
    /// Wraps a freshly computed payload.
    pub fn fresh(kind: ArtifactKind, payload: T) -> Self {
        Self::new(kind, Origin::Fresh, payload)
    }

    /// Wraps a payload with an explicit origin.
    pub fn new(kind: ArtifactKind, origin: Origin, payload: T) -> Self {
        Self {
            kind,
            origin,
            produced_at: Timestamp::now(),
            payload,
        }
    }

    /// Re-labels the provenance.
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Consumes the artifact, returning its payload.
    pub fn into_payload(self) -> T {
        self.payload
    }
}
