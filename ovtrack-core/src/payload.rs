//! Header and buffer payloads of every stream type.

use crate::matrix::Matrix;
use crate::time::Time;
use serde::{Deserialize, Serialize};

/// Header of matrix-based streams without extra fields
/// (streamed matrix, feature vector).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatrixHeader {
    /// Layout and labels. Values are unused.
    pub matrix: Matrix,
}

/// Header of a sampled signal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalHeader {
    /// `channels x samples per buffer` layout with channel labels.
    pub matrix: Matrix,
    /// Samples per second.
    pub sampling_rate: u64,
}

/// Header of a spectrum stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpectrumHeader {
    /// `channels x frequency bins` layout.
    pub matrix: Matrix,
    /// Center frequency of every bin.
    pub frequency_abscissa: Matrix,
    /// Sampling rate of the analysed signal.
    pub sampling_rate: u64,
}

/// Header of channel localisation and channel units streams.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DynamicMatrixHeader {
    /// Layout and labels.
    pub matrix: Matrix,
    /// True if buffers may change over time, false if the first buffer holds
    /// for the whole recording.
    pub dynamic: bool,
}

/// Buffer of every matrix-based stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatrixBuffer {
    /// Values laid out as declared by the stream header.
    pub matrix: Matrix,
}

impl MatrixBuffer {
    /// Wrap a matrix.
    pub fn new(matrix: Matrix) -> Self {
        Self { matrix }
    }
}

/// Stimulation streams carry no header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StimulationHeader;

/// A single stimulation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stimulation {
    /// Event code.
    pub identifier: u64,
    /// When the event happened.
    pub date: Time,
    /// How long the event lasts.
    pub duration: Time,
}

impl Stimulation {
    /// Create a stimulation.
    pub fn new(identifier: u64, date: Time, duration: Time) -> Self {
        Self {
            identifier,
            date,
            duration,
        }
    }
}

/// Ordered set of stimulations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StimulationSet {
    stimulations: Vec<Stimulation>,
}

impl StimulationSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stimulation.
    pub fn push(&mut self, stimulation: Stimulation) {
        self.stimulations.push(stimulation);
    }

    /// Number of stimulations.
    pub fn len(&self) -> usize {
        self.stimulations.len()
    }

    /// True if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.stimulations.is_empty()
    }

    /// Access one stimulation.
    pub fn get(&self, index: usize) -> Option<&Stimulation> {
        self.stimulations.get(index)
    }

    /// Iterate over stimulations.
    pub fn iter(&self) -> std::slice::Iter<'_, Stimulation> {
        self.stimulations.iter()
    }

    /// Shift every date by `offset`.
    pub fn shift(&mut self, offset: Time) {
        for stimulation in &mut self.stimulations {
            stimulation.date += offset;
        }
    }
}

impl FromIterator<Stimulation> for StimulationSet {
    fn from_iter<I: IntoIterator<Item = Stimulation>>(iter: I) -> Self {
        Self {
            stimulations: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a StimulationSet {
    type Item = &'a Stimulation;
    type IntoIter = std::slice::Iter<'a, Stimulation>;

    fn into_iter(self) -> Self::IntoIter {
        self.stimulations.iter()
    }
}

/// Buffer of a stimulation stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StimulationBuffer {
    /// Events that happened in the buffer's interval.
    pub stimulations: StimulationSet,
}

/// Header of the experiment information stream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExperimentInfoHeader {
    /// Experiment identifier.
    pub experiment_id: u64,
    /// Free-form experiment date.
    pub experiment_date: String,
    /// Subject identifier.
    pub subject_id: u64,
    /// Subject name.
    pub subject_name: String,
    /// Subject age in years.
    pub subject_age: u64,
    /// Subject gender code.
    pub subject_gender: u64,
    /// Laboratory identifier.
    pub laboratory_id: u64,
    /// Laboratory name.
    pub laboratory_name: String,
    /// Technician identifier.
    pub technician_id: u64,
    /// Technician name.
    pub technician_name: String,
}

/// Experiment information streams have empty buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmptyBuffer;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stimulation_set_shift() {
        let mut set: StimulationSet = [
            Stimulation::new(0x8001, Time::from_millis(10), Time::ZERO),
            Stimulation::new(0x8002, Time::from_millis(20), Time::from_millis(5)),
        ]
        .into_iter()
        .collect();

        set.shift(Time::from_secs(1));
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(1).map(|s| s.date), Some(Time::from_millis(1020)));
        assert_eq!(set.get(1).map(|s| s.duration), Some(Time::from_millis(5)));
    }

    #[test]
    fn test_deep_clone_is_independent() {
        let original = MatrixBuffer::new(Matrix::from_values(&[1, 2], vec![1.0, 2.0]).unwrap());
        let mut copy = original.clone();
        copy.matrix.values_mut()[0] = 9.0;
        assert_eq!(original.matrix.values(), &[1.0, 2.0]);
    }
}
