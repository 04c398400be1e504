//! Payload coding of matrix-based stream types.

use super::PayloadCodec;
use crate::ebml::{read_f64_array, Node};
use crate::elements::*;
use crate::error::{EbmlError, Result};
use crate::reader::DEFAULT_MAX_ELEMENT_SIZE;
use crate::writer::Writer;
use ovtrack_core::error::CodecError;
use ovtrack_core::{
    ChannelLocalisation, ChannelUnits, DynamicMatrixHeader, FeatureVector, Matrix, MatrixBuffer, MatrixHeader,
    Signal, SignalHeader, Spectrum, SpectrumHeader, StreamedMatrix, Time,
};

/// Largest matrix accepted from a header: as many `f64` values as fit in the
/// largest element a demuxer accepts by default. Also bounds the summed
/// dimension sizes, which size the label tables.
pub const MAX_MATRIX_ELEMENTS: u64 = DEFAULT_MAX_ELEMENT_SIZE / 8;

/// Write the layout section (dimension sizes and labels) of a matrix.
pub(crate) fn write_matrix_layout(matrix: &Matrix, writer: &mut Writer) -> Result<()> {
    writer.open_child(HEADER_MATRIX);
    writer.uint(HEADER_MATRIX_DIMENSION_COUNT, matrix.dimension_count() as u64)?;
    for dimension in 0..matrix.dimension_count() {
        writer.open_child(HEADER_MATRIX_DIMENSION);
        writer.uint(HEADER_MATRIX_DIMENSION_SIZE, matrix.dimension_size(dimension) as u64)?;
        for label in matrix.labels(dimension) {
            writer.string(HEADER_MATRIX_DIMENSION_LABEL, label)?;
        }
        writer.close_child()?;
    }
    writer.close_child()?;
    Ok(())
}

/// Read a layout section into a zero-filled, labelled matrix.
pub(crate) fn read_matrix_layout(node: &Node) -> Result<Matrix> {
    let declared = node
        .require(HEADER_MATRIX_DIMENSION_COUNT, "DimensionCount")?
        .as_uint()?;
    let dimensions: Vec<&Node> = node.children_with(HEADER_MATRIX_DIMENSION).collect();
    if dimensions.len() as u64 != declared {
        return Err(EbmlError::InvalidPayload(format!(
            "matrix declares {} dimensions, {} present",
            declared,
            dimensions.len()
        )));
    }

    let mut sizes = Vec::with_capacity(dimensions.len());
    let mut entries = 0u64;
    for dimension in &dimensions {
        let size = dimension.require(HEADER_MATRIX_DIMENSION_SIZE, "DimensionSize")?.as_uint()?;
        entries = entries.saturating_add(size);
        if entries > MAX_MATRIX_ELEMENTS {
            return Err(EbmlError::InvalidPayload(format!(
                "matrix dimension size {size} exceeds the limit of {MAX_MATRIX_ELEMENTS} entries"
            )));
        }
        let labels = dimension.children_with(HEADER_MATRIX_DIMENSION_LABEL).count() as u64;
        if labels > size {
            return Err(EbmlError::InvalidPayload(format!(
                "dimension of size {size} carries {labels} labels"
            )));
        }
        sizes.push(usize::try_from(size).map_err(|_| EbmlError::InvalidPayload(format!("dimension size {size}")))?);
    }
    let total = sizes
        .iter()
        .try_fold(1u64, |acc, &s| acc.checked_mul(s as u64))
        .filter(|&total| total <= MAX_MATRIX_ELEMENTS);
    if total.is_none() {
        return Err(EbmlError::InvalidPayload(format!(
            "matrix element count exceeds the limit of {MAX_MATRIX_ELEMENTS}"
        )));
    }

    let mut matrix = Matrix::new(&sizes);
    for (d, dimension) in dimensions.iter().enumerate() {
        for (i, label) in dimension.children_with(HEADER_MATRIX_DIMENSION_LABEL).enumerate() {
            matrix.set_label(d, i, label.as_string()?);
        }
    }
    Ok(matrix)
}

fn write_matrix_values(matrix: &Matrix, writer: &mut Writer) -> Result<()> {
    writer.open_child(BUFFER_MATRIX);
    writer.f64s(BUFFER_MATRIX_RAW_BUFFER, matrix.values())?;
    writer.close_child()?;
    Ok(())
}

/// Read the values of a buffer into a matrix shaped like `layout`.
fn read_matrix_values(root: &Node, layout: &Matrix) -> Result<Matrix> {
    let raw = root
        .require(BUFFER_MATRIX, "StreamedMatrix buffer")?
        .require(BUFFER_MATRIX_RAW_BUFFER, "RawBuffer")?;
    let values = read_f64_array(&raw.data)?;
    if values.len() != layout.len() {
        return Err(CodecError::SizeMismatch {
            expected: layout.len(),
            found: values.len(),
        }
        .into());
    }
    Ok(Matrix::from_values(layout.dimension_sizes(), values)?)
}

fn read_dynamic_flag(root: &Node, section: u64, flag: u64) -> Result<bool> {
    match root.child(section).and_then(|s| s.child(flag)) {
        Some(node) => Ok(node.as_uint()? != 0),
        None => Ok(false),
    }
}

fn layout(root: &Node) -> Result<Matrix> {
    read_matrix_layout(root.require(HEADER_MATRIX, "StreamedMatrix header")?)
}

impl PayloadCodec for StreamedMatrix {
    fn write_header(header: &MatrixHeader, writer: &mut Writer) -> Result<()> {
        write_matrix_layout(&header.matrix, writer)
    }

    fn write_buffer(buffer: &MatrixBuffer, _offset: Time, writer: &mut Writer) -> Result<()> {
        write_matrix_values(&buffer.matrix, writer)
    }

    fn read_header(root: &Node) -> Result<MatrixHeader> {
        Ok(MatrixHeader { matrix: layout(root)? })
    }

    fn read_buffer(root: &Node, header: &MatrixHeader) -> Result<MatrixBuffer> {
        Ok(MatrixBuffer::new(read_matrix_values(root, &header.matrix)?))
    }
}

impl PayloadCodec for FeatureVector {
    fn write_header(header: &MatrixHeader, writer: &mut Writer) -> Result<()> {
        write_matrix_layout(&header.matrix, writer)
    }

    fn write_buffer(buffer: &MatrixBuffer, _offset: Time, writer: &mut Writer) -> Result<()> {
        write_matrix_values(&buffer.matrix, writer)
    }

    fn read_header(root: &Node) -> Result<MatrixHeader> {
        let matrix = layout(root)?;
        if matrix.dimension_count() > 1 {
            return Err(EbmlError::InvalidPayload(format!(
                "feature vector with {} dimensions",
                matrix.dimension_count()
            )));
        }
        Ok(MatrixHeader { matrix })
    }

    fn read_buffer(root: &Node, header: &MatrixHeader) -> Result<MatrixBuffer> {
        Ok(MatrixBuffer::new(read_matrix_values(root, &header.matrix)?))
    }
}

impl PayloadCodec for Signal {
    fn write_header(header: &SignalHeader, writer: &mut Writer) -> Result<()> {
        writer.open_child(HEADER_SIGNAL);
        writer.uint(HEADER_SIGNAL_SAMPLING, header.sampling_rate)?;
        writer.close_child()?;
        write_matrix_layout(&header.matrix, writer)
    }

    fn write_buffer(buffer: &MatrixBuffer, _offset: Time, writer: &mut Writer) -> Result<()> {
        write_matrix_values(&buffer.matrix, writer)
    }

    fn read_header(root: &Node) -> Result<SignalHeader> {
        let sampling_rate = root
            .require(HEADER_SIGNAL, "Signal header")?
            .require(HEADER_SIGNAL_SAMPLING, "Sampling")?
            .as_uint()?;
        Ok(SignalHeader {
            matrix: layout(root)?,
            sampling_rate,
        })
    }

    fn read_buffer(root: &Node, header: &SignalHeader) -> Result<MatrixBuffer> {
        Ok(MatrixBuffer::new(read_matrix_values(root, &header.matrix)?))
    }
}

impl PayloadCodec for Spectrum {
    fn write_header(header: &SpectrumHeader, writer: &mut Writer) -> Result<()> {
        writer.open_child(HEADER_SPECTRUM);
        writer.uint(HEADER_SPECTRUM_SAMPLING, header.sampling_rate)?;
        writer.open_child(HEADER_SPECTRUM_FREQUENCY_ABSCISSA);
        write_matrix_layout(&header.frequency_abscissa, writer)?;
        write_matrix_values(&header.frequency_abscissa, writer)?;
        writer.close_child()?;
        writer.close_child()?;
        write_matrix_layout(&header.matrix, writer)
    }

    fn write_buffer(buffer: &MatrixBuffer, _offset: Time, writer: &mut Writer) -> Result<()> {
        write_matrix_values(&buffer.matrix, writer)
    }

    fn read_header(root: &Node) -> Result<SpectrumHeader> {
        let section = root.require(HEADER_SPECTRUM, "Spectrum header")?;
        let sampling_rate = section.require(HEADER_SPECTRUM_SAMPLING, "Sampling")?.as_uint()?;
        let abscissa_node = section.require(HEADER_SPECTRUM_FREQUENCY_ABSCISSA, "FrequencyAbscissa")?;
        let abscissa_layout = layout(abscissa_node)?;
        let mut frequency_abscissa = read_matrix_values(abscissa_node, &abscissa_layout)?;
        for d in 0..abscissa_layout.dimension_count() {
            for (i, label) in abscissa_layout.labels(d).iter().enumerate() {
                frequency_abscissa.set_label(d, i, label.clone());
            }
        }
        Ok(SpectrumHeader {
            matrix: layout(root)?,
            frequency_abscissa,
            sampling_rate,
        })
    }

    fn read_buffer(root: &Node, header: &SpectrumHeader) -> Result<MatrixBuffer> {
        Ok(MatrixBuffer::new(read_matrix_values(root, &header.matrix)?))
    }
}

impl PayloadCodec for ChannelLocalisation {
    fn write_header(header: &DynamicMatrixHeader, writer: &mut Writer) -> Result<()> {
        writer.open_child(HEADER_CHANNEL_LOCALISATION);
        writer.uint(HEADER_CHANNEL_LOCALISATION_DYNAMIC, header.dynamic as u64)?;
        writer.close_child()?;
        write_matrix_layout(&header.matrix, writer)
    }

    fn write_buffer(buffer: &MatrixBuffer, _offset: Time, writer: &mut Writer) -> Result<()> {
        write_matrix_values(&buffer.matrix, writer)
    }

    fn read_header(root: &Node) -> Result<DynamicMatrixHeader> {
        Ok(DynamicMatrixHeader {
            matrix: layout(root)?,
            dynamic: read_dynamic_flag(root, HEADER_CHANNEL_LOCALISATION, HEADER_CHANNEL_LOCALISATION_DYNAMIC)?,
        })
    }

    fn read_buffer(root: &Node, header: &DynamicMatrixHeader) -> Result<MatrixBuffer> {
        Ok(MatrixBuffer::new(read_matrix_values(root, &header.matrix)?))
    }
}

impl PayloadCodec for ChannelUnits {
    fn write_header(header: &DynamicMatrixHeader, writer: &mut Writer) -> Result<()> {
        writer.open_child(HEADER_CHANNEL_UNITS);
        writer.uint(HEADER_CHANNEL_UNITS_DYNAMIC, header.dynamic as u64)?;
        writer.close_child()?;
        write_matrix_layout(&header.matrix, writer)
    }

    fn write_buffer(buffer: &MatrixBuffer, _offset: Time, writer: &mut Writer) -> Result<()> {
        write_matrix_values(&buffer.matrix, writer)
    }

    fn read_header(root: &Node) -> Result<DynamicMatrixHeader> {
        Ok(DynamicMatrixHeader {
            matrix: layout(root)?,
            dynamic: read_dynamic_flag(root, HEADER_CHANNEL_UNITS, HEADER_CHANNEL_UNITS_DYNAMIC)?,
        })
    }

    fn read_buffer(root: &Node, header: &DynamicMatrixHeader) -> Result<MatrixBuffer> {
        Ok(MatrixBuffer::new(read_matrix_values(root, &header.matrix)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_of(bytes: Vec<u8>) -> Node {
        let mut writer = Writer::new();
        writer.open_child(PAYLOAD_HEADER);
        writer.set_child_data(&bytes).unwrap();
        writer.close_child().unwrap();
        Node::parse_all(&writer.finish().unwrap()).unwrap().remove(0)
    }

    fn section(write: impl FnOnce(&mut Writer) -> Result<()>) -> Node {
        let mut writer = Writer::new();
        write(&mut writer).unwrap();
        root_of(writer.finish().unwrap())
    }

    #[test]
    fn test_layout_keeps_labels() {
        let matrix = Matrix::with_shape(2, 3).with_labels(0, ["C3", "C4"]);
        let root = section(|w| write_matrix_layout(&matrix, w));
        let parsed = layout(&root).unwrap();
        assert!(parsed.same_layout(&matrix));
        assert_eq!(parsed.labels(0), matrix.labels(0));
    }

    #[test]
    fn test_dimension_count_mismatch() {
        let root = section(|w| {
            w.open_child(HEADER_MATRIX);
            w.uint(HEADER_MATRIX_DIMENSION_COUNT, 2)?;
            w.open_child(HEADER_MATRIX_DIMENSION);
            w.uint(HEADER_MATRIX_DIMENSION_SIZE, 4)?;
            w.close_child()?;
            w.close_child()?;
            Ok(())
        });
        assert!(layout(&root).is_err());
    }

    #[test]
    fn test_layout_size_limits() {
        let oversized = section(|w| {
            w.open_child(HEADER_MATRIX);
            w.uint(HEADER_MATRIX_DIMENSION_COUNT, 2)?;
            for size in [MAX_MATRIX_ELEMENTS / 2, 3] {
                w.open_child(HEADER_MATRIX_DIMENSION);
                w.uint(HEADER_MATRIX_DIMENSION_SIZE, size)?;
                w.close_child()?;
            }
            w.close_child()?;
            Ok(())
        });
        assert!(matches!(layout(&oversized), Err(EbmlError::InvalidPayload(_))));

        let labelled = section(|w| {
            w.open_child(HEADER_MATRIX);
            w.uint(HEADER_MATRIX_DIMENSION_COUNT, 1)?;
            w.open_child(HEADER_MATRIX_DIMENSION);
            w.uint(HEADER_MATRIX_DIMENSION_SIZE, 1)?;
            w.string(HEADER_MATRIX_DIMENSION_LABEL, "Cz")?;
            w.string(HEADER_MATRIX_DIMENSION_LABEL, "Pz")?;
            w.close_child()?;
            w.close_child()?;
            Ok(())
        });
        assert!(matches!(layout(&labelled), Err(EbmlError::InvalidPayload(_))));
    }

    #[test]
    fn test_buffer_size_mismatch() {
        let header = SignalHeader {
            matrix: Matrix::with_shape(2, 4),
            sampling_rate: 128,
        };
        let wrong = MatrixBuffer::new(Matrix::with_shape(2, 2));
        let root = section(|w| Signal::write_buffer(&wrong, Time::ZERO, w));
        let err = Signal::read_buffer(&root, &header).unwrap_err();
        assert!(matches!(
            err,
            EbmlError::Core(ovtrack_core::Error::Codec(CodecError::SizeMismatch { expected: 8, found: 4 }))
        ));
    }

    #[test]
    fn test_spectrum_header() {
        let header = SpectrumHeader {
            matrix: Matrix::with_shape(2, 3),
            frequency_abscissa: Matrix::from_values(&[3], vec![1.0, 2.0, 4.0]).unwrap().with_labels(0, ["1", "2", "4"]),
            sampling_rate: 512,
        };
        let root = section(|w| Spectrum::write_header(&header, w));
        assert_eq!(Spectrum::read_header(&root).unwrap(), header);
    }

    #[test]
    fn test_feature_vector_must_be_one_dimensional() {
        let header = MatrixHeader {
            matrix: Matrix::with_shape(2, 2),
        };
        let root = section(|w| FeatureVector::write_header(&header, w));
        assert!(FeatureVector::read_header(&root).is_err());
    }
}
