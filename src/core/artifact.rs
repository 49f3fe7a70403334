//! Artifact references of the form `name:tag`

use crate::core::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which revision of a named artifact to resolve
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionTag {
    /// Most recently logged revision
    Latest,
    /// Revision promoted for production use
    Prod,
    /// Revision pinned as the reference dataset
    Reference,
    /// Any other identifier, e.g. `v3`, passed through untouched
    Explicit(String),
}

impl VersionTag {
    pub fn as_str(&self) -> &str {
        match self {
            VersionTag::Latest => "latest",
            VersionTag::Prod => "prod",
            VersionTag::Reference => "reference",
            VersionTag::Explicit(tag) => tag,
        }
    }
}

impl From<&str> for VersionTag {
    fn from(tag: &str) -> Self {
        match tag {
            "latest" => VersionTag::Latest,
            "prod" => VersionTag::Prod,
            "reference" => VersionTag::Reference,
            other => VersionTag::Explicit(other.to_string()),
        }
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to a versioned artifact held by the tracking backend
///
/// The orchestrator never resolves these itself; it only formats them into
/// step parameters. Resolution happens inside the step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactReference {
    pub name: String,
    pub version_tag: VersionTag,
}

impl ArtifactReference {
    pub fn new(name: impl Into<String>, version_tag: VersionTag) -> Self {
        Self {
            name: name.into(),
            version_tag,
        }
    }

    pub fn latest(name: impl Into<String>) -> Self {
        Self::new(name, VersionTag::Latest)
    }
}

impl FromStr for ArtifactReference {
    type Err = PipelineError;

    /// Parse `name:tag`. The split happens on the last `:` so names may
    /// themselves carry a project prefix such as `proj/name:latest`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, tag) = s
            .rsplit_once(':')
            .ok_or_else(|| PipelineError::InvalidArtifactReference(s.to_string()))?;

        if name.is_empty() || tag.is_empty() {
            return Err(PipelineError::InvalidArtifactReference(s.to_string()));
        }

        Ok(Self::new(name, VersionTag::from(tag)))
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version_tag)
    }
}
