//! Compile-time stream types.
//!
//! Every stream type is a zero-sized marker implementing [`StreamType`],
//! which ties together its [`StreamKind`], header payload and buffer
//! payload. `Stream<Signal>` and `Stream<Stimulations>` are therefore
//! distinct types and cannot be mixed up.

use crate::any::AnyStream;
use crate::kind::StreamKind;
use crate::payload::{
    DynamicMatrixHeader, EmptyBuffer, ExperimentInfoHeader, MatrixBuffer, MatrixHeader, SignalHeader,
    SpectrumHeader, StimulationBuffer, StimulationHeader,
};
use crate::stream::Stream;
use std::fmt::Debug;

/// A stream type with its header and buffer payloads.
pub trait StreamType: Debug + Clone + Copy + Default + Send + Sync + 'static {
    /// Payload of the header chunk.
    type Header: Debug + Clone + PartialEq + Default + Send + Sync;
    /// Payload of each buffer chunk.
    type Buffer: Debug + Clone + PartialEq + Default + Send + Sync;

    /// The runtime kind.
    const KIND: StreamKind;

    /// Wrap a typed stream into the closed sum type.
    fn into_any(stream: Stream<Self>) -> AnyStream;

    /// Borrow the typed stream if `any` holds this type.
    fn from_any(any: &AnyStream) -> Option<&Stream<Self>>;

    /// Mutably borrow the typed stream if `any` holds this type.
    fn from_any_mut(any: &mut AnyStream) -> Option<&mut Stream<Self>>;
}

macro_rules! stream_type {
    ($(#[$meta:meta])* $name:ident, $kind:ident, $header:ty, $buffer:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name;

        impl StreamType for $name {
            type Header = $header;
            type Buffer = $buffer;

            const KIND: StreamKind = StreamKind::$kind;

            fn into_any(stream: Stream<Self>) -> AnyStream {
                AnyStream::$kind(stream)
            }

            fn from_any(any: &AnyStream) -> Option<&Stream<Self>> {
                match any {
                    AnyStream::$kind(stream) => Some(stream),
                    _ => None,
                }
            }

            fn from_any_mut(any: &mut AnyStream) -> Option<&mut Stream<Self>> {
                match any {
                    AnyStream::$kind(stream) => Some(stream),
                    _ => None,
                }
            }
        }
    };
}

stream_type!(
    /// Generic N-dimensional matrix stream.
    StreamedMatrix,
    StreamedMatrix,
    MatrixHeader,
    MatrixBuffer
);
stream_type!(
    /// Sampled signal: `channels x samples` per buffer.
    Signal,
    Signal,
    SignalHeader,
    MatrixBuffer
);
stream_type!(
    /// Stimulation events.
    Stimulations,
    Stimulations,
    StimulationHeader,
    StimulationBuffer
);
stream_type!(
    /// Spectrum: `channels x frequency bins` per buffer.
    Spectrum,
    Spectrum,
    SpectrumHeader,
    MatrixBuffer
);
stream_type!(
    /// Feature vectors.
    FeatureVector,
    FeatureVector,
    MatrixHeader,
    MatrixBuffer
);
stream_type!(
    /// Electrode positions.
    ChannelLocalisation,
    ChannelLocalisation,
    DynamicMatrixHeader,
    MatrixBuffer
);
stream_type!(
    /// Channel measurement units.
    ChannelUnits,
    ChannelUnits,
    DynamicMatrixHeader,
    MatrixBuffer
);
stream_type!(
    /// Experiment metadata. Only the header carries information.
    ExperimentInfo,
    ExperimentInfo,
    ExperimentInfoHeader,
    EmptyBuffer
);
