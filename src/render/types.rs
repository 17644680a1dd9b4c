//! Renderer configuration and input/output types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::anchor::AnchoredPosition;

/// Configuration for highlight decorations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Upper bound on the overlap count shown on a decoration
    pub max_overlap_count: usize,
    /// CSS class set on every decoration
    pub class_name: String,
    /// Attribute carrying the primary highlight id
    pub id_attribute: String,
    /// How long a scroll-to pulse stays on
    #[serde(with = "duration_millis")]
    pub pulse: Duration,
    /// Colour used when a highlight has none
    pub default_color: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_overlap_count: 5,
            class_name: "text-highlight".to_string(),
            id_attribute: "data-highlight-id".to_string(),
            pulse: Duration::from_millis(500),
            default_color: "#FFEB3B".to_string(),
        }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// One highlight as the renderer sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightSegment {
    pub id: String,
    pub anchor: AnchoredPosition,
    pub color: Option<String>,
    pub note: Option<String>,
    pub user_name: Option<String>,
}

/// Outcome of one `apply_highlights` pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    /// Records covered by a decoration
    pub rendered: usize,
    /// Ids of records that could not be resolved
    pub skipped: Vec<String>,
    /// Decorations created
    pub decorations: usize,
    /// The pass hit a corrupted tree and rolled back
    pub aborted: bool,
}
