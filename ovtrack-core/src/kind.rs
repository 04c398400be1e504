//! Stream type identifiers.
//!
//! Each stream declared in a recording carries a 64-bit type identifier.
//! [`StreamKind`] is the closed set of identifiers this library can decode;
//! any other identifier is kept verbatim in an error placeholder stream.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Type identifiers
// =============================================================================

/// Root of the type hierarchy. Never instantiated as a stream.
pub const TYPE_ID_EBML_STREAM: u64 = 0x434F_6587_2EFD_2B7E;
/// Experiment metadata.
pub const TYPE_ID_EXPERIMENT_INFO: u64 = 0x4034_88E7_565D_70B6;
/// Stimulation events.
pub const TYPE_ID_STIMULATIONS: u64 = 0x6F75_2DD0_082A_321E;
/// Generic N-dimensional matrix.
pub const TYPE_ID_STREAMED_MATRIX: u64 = 0x544A_003E_6DCB_A5F6;
/// Sampled multichannel signal.
pub const TYPE_ID_SIGNAL: u64 = 0x5BA3_6127_195F_EAE1;
/// Frequency-domain spectrum.
pub const TYPE_ID_SPECTRUM: u64 = 0x1F26_1C0A_593B_F6BD;
/// Feature vectors.
pub const TYPE_ID_FEATURE_VECTOR: u64 = 0x1734_1935_152F_F448;
/// Electrode positions.
pub const TYPE_ID_CHANNEL_LOCALISATION: u64 = 0x013D_F452_A3A8_879A;
/// Channel measurement units.
pub const TYPE_ID_CHANNEL_UNITS: u64 = 0x6AB2_6B81_0F8E_E5D2;

/// The stream types with a known codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// Generic N-dimensional matrix.
    StreamedMatrix,
    /// Sampled multichannel signal.
    Signal,
    /// Stimulation events.
    Stimulations,
    /// Frequency-domain spectrum.
    Spectrum,
    /// Feature vectors.
    FeatureVector,
    /// Electrode positions.
    ChannelLocalisation,
    /// Channel measurement units.
    ChannelUnits,
    /// Experiment metadata.
    ExperimentInfo,
}

impl StreamKind {
    /// Every known kind.
    pub const ALL: [StreamKind; 8] = [
        StreamKind::StreamedMatrix,
        StreamKind::Signal,
        StreamKind::Stimulations,
        StreamKind::Spectrum,
        StreamKind::FeatureVector,
        StreamKind::ChannelLocalisation,
        StreamKind::ChannelUnits,
        StreamKind::ExperimentInfo,
    ];

    /// Look up the kind for a type identifier.
    pub fn from_type_id(type_id: u64) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.type_id() == type_id)
    }

    /// The 64-bit identifier written to the container.
    pub const fn type_id(self) -> u64 {
        match self {
            StreamKind::StreamedMatrix => TYPE_ID_STREAMED_MATRIX,
            StreamKind::Signal => TYPE_ID_SIGNAL,
            StreamKind::Stimulations => TYPE_ID_STIMULATIONS,
            StreamKind::Spectrum => TYPE_ID_SPECTRUM,
            StreamKind::FeatureVector => TYPE_ID_FEATURE_VECTOR,
            StreamKind::ChannelLocalisation => TYPE_ID_CHANNEL_LOCALISATION,
            StreamKind::ChannelUnits => TYPE_ID_CHANNEL_UNITS,
            StreamKind::ExperimentInfo => TYPE_ID_EXPERIMENT_INFO,
        }
    }

    /// Human readable name.
    pub const fn name(self) -> &'static str {
        match self {
            StreamKind::StreamedMatrix => "Streamed matrix",
            StreamKind::Signal => "Signal",
            StreamKind::Stimulations => "Stimulations",
            StreamKind::Spectrum => "Spectrum",
            StreamKind::FeatureVector => "Feature vector",
            StreamKind::ChannelLocalisation => "Channel localisation",
            StreamKind::ChannelUnits => "Channel units",
            StreamKind::ExperimentInfo => "Experiment information",
        }
    }

    /// The kind this one is derived from, if any.
    ///
    /// Matrix-based kinds derive from [`StreamKind::StreamedMatrix`]; the
    /// remaining kinds derive directly from the untyped root.
    pub const fn parent(self) -> Option<StreamKind> {
        match self {
            StreamKind::Signal
            | StreamKind::Spectrum
            | StreamKind::FeatureVector
            | StreamKind::ChannelLocalisation
            | StreamKind::ChannelUnits => Some(StreamKind::StreamedMatrix),
            StreamKind::StreamedMatrix | StreamKind::Stimulations | StreamKind::ExperimentInfo => None,
        }
    }

    /// Check whether this kind is `other` or derives from it.
    pub fn is_derived_from(self, other: StreamKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = kind.parent();
        }
        false
    }

    /// Check whether the payload is carried in a numeric matrix.
    pub fn is_matrix_based(self) -> bool {
        self.is_derived_from(StreamKind::StreamedMatrix)
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Display name for any type identifier, known or not.
pub fn type_name(type_id: u64) -> String {
    match StreamKind::from_type_id(type_id) {
        Some(kind) => kind.name().to_string(),
        None => format!("Unknown (0x{type_id:016X})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_id_lookup() {
        for kind in StreamKind::ALL {
            assert_eq!(StreamKind::from_type_id(kind.type_id()), Some(kind));
        }
        assert_eq!(StreamKind::from_type_id(TYPE_ID_EBML_STREAM), None);
        assert_eq!(StreamKind::from_type_id(42), None);
    }

    #[test]
    fn test_hierarchy() {
        assert!(StreamKind::Signal.is_derived_from(StreamKind::StreamedMatrix));
        assert!(StreamKind::Signal.is_derived_from(StreamKind::Signal));
        assert!(!StreamKind::Stimulations.is_derived_from(StreamKind::StreamedMatrix));
        assert!(!StreamKind::StreamedMatrix.is_derived_from(StreamKind::Signal));
        assert!(StreamKind::ChannelUnits.is_matrix_based());
        assert!(!StreamKind::ExperimentInfo.is_matrix_based());
    }

    #[test]
    fn test_type_name() {
        assert_eq!(type_name(TYPE_ID_SIGNAL), "Signal");
        assert_eq!(type_name(0x10), "Unknown (0x0000000000000010)");
    }
}
