//! Bundle summaries and timing diagnostics.

use ovtrack_core::{StreamBundle, Time};
use serde::Serialize;

/// Summary of one stream slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamSummary {
    pub index: usize,
    /// Empty slots have no type.
    pub type_id: Option<u64>,
    pub kind: String,
    pub chunks: usize,
    pub start: Time,
    pub duration: Time,
    pub selected: bool,
    pub decodable: bool,
}

/// Summary of a whole bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleSummary {
    pub source: Option<String>,
    pub max_duration: Time,
    pub streams: Vec<StreamSummary>,
}

impl BundleSummary {
    /// Summarize `bundle`.
    pub fn of(bundle: &StreamBundle) -> Self {
        let streams = (0..bundle.num_streams())
            .map(|index| match bundle.stream(index) {
                Some(stream) => {
                    let stream = stream.read();
                    StreamSummary {
                        index,
                        type_id: Some(stream.type_id()),
                        kind: stream.type_name(),
                        chunks: stream.len(),
                        start: stream.start_time(),
                        duration: stream.duration(),
                        selected: stream.is_selected(),
                        decodable: !stream.is_error(),
                    }
                }
                None => StreamSummary {
                    index,
                    type_id: None,
                    kind: "empty".to_string(),
                    chunks: 0,
                    start: Time::MIN,
                    duration: Time::MIN,
                    selected: false,
                    decodable: false,
                },
            })
            .collect();

        Self {
            source: bundle.source().map(|p| p.display().to_string()),
            max_duration: bundle.max_duration(),
            streams,
        }
    }

    /// Total number of buffer chunks.
    pub fn total_chunks(&self) -> usize {
        self.streams.iter().map(|s| s.chunks).sum()
    }
}

/// Kind of timing problem found in a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Issue {
    /// Some chunk starts before the previous one ends.
    Overlapping,
    /// Some chunk starts after the previous one ends.
    Noncontinuous,
    /// The stream type has no codec.
    Undecodable,
}

/// Timing diagnostics for one stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamCheck {
    pub index: usize,
    pub kind: String,
    pub issues: Vec<Issue>,
}

/// Timing diagnostics for a bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub streams: Vec<StreamCheck>,
}

impl CheckReport {
    /// Check every stream of `bundle`.
    pub fn of(bundle: &StreamBundle) -> Self {
        let streams = bundle
            .streams()
            .map(|(index, stream)| {
                let stream = stream.read();
                let mut issues = Vec::new();
                if stream.is_error() {
                    issues.push(Issue::Undecodable);
                } else {
                    if stream.overlapping() {
                        issues.push(Issue::Overlapping);
                    }
                    if stream.noncontinuous() {
                        issues.push(Issue::Noncontinuous);
                    }
                }
                StreamCheck {
                    index,
                    kind: stream.type_name(),
                    issues,
                }
            })
            .collect();
        Self { streams }
    }

    /// True when no stream has a timing problem.
    ///
    /// Undecodable streams are reported but do not count as problems.
    pub fn is_clean(&self) -> bool {
        self.streams
            .iter()
            .flat_map(|s| &s.issues)
            .all(|issue| *issue == Issue::Undecodable)
    }
}
