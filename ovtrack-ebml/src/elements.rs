//! Element identifiers of the `.ov` container and of chunk payloads.
//!
//! Identifiers are stored as VINT *values*: the length marker bit is not part
//! of the identifier. The standard EBML header element `1A 45 DF A3` is
//! therefore identifier `0x0A45DFA3` here.

// =============================================================================
// EBML Header Elements
// =============================================================================

/// EBML Header element.
pub const EBML: u64 = 0x0A45_DFA3;
/// EBML Version.
pub const EBML_VERSION: u64 = 0x0286;
/// EBML Read Version.
pub const EBML_READ_VERSION: u64 = 0x02F7;
/// EBML Max ID Length.
pub const EBML_MAX_ID_LENGTH: u64 = 0x02F2;
/// EBML Max Size Length.
pub const EBML_MAX_SIZE_LENGTH: u64 = 0x02F3;
/// EBML Doc Type.
pub const DOC_TYPE: u64 = 0x0282;
/// EBML Doc Type Version.
pub const DOC_TYPE_VERSION: u64 = 0x0287;
/// EBML Doc Type Read Version.
pub const DOC_TYPE_READ_VERSION: u64 = 0x0285;

// =============================================================================
// Container Elements
// =============================================================================

/// Stream declaration section.
pub const STREAM_HEADER: u64 = 0xF595_05AB_3684_C8D8;
/// Compression flag of the declaration section (must be zero).
pub const STREAM_HEADER_COMPRESSION: u64 = 0x4035_8769_1663_80D1;
/// Type identifier of one declared stream. Streams are numbered in order.
pub const STREAM_HEADER_STREAM_TYPE: u64 = 0x732E_E278_7BE0_BD1C;

/// One chunk of one stream.
pub const STREAM_BUFFER: u64 = 0x2E60_AD18_87A2_9BDF;
/// Index of the stream the chunk belongs to.
pub const STREAM_BUFFER_STREAM_INDEX: u64 = 0x30A5_6D8A_B9C1_2238;
/// Chunk start time.
pub const STREAM_BUFFER_START_TIME: u64 = 0x093E_6A0A_C5A9_467B;
/// Chunk end time.
pub const STREAM_BUFFER_END_TIME: u64 = 0x8B5C_CCD9_C502_4F29;
/// Encoded chunk payload.
pub const STREAM_BUFFER_CONTENT: u64 = 0x8D4B_0BE8_7051_265C;

// =============================================================================
// Payload Root Elements
// =============================================================================

/// Root of a header chunk payload.
pub const PAYLOAD_HEADER: u64 = 0x002B_395F_108A_DFAE;
/// Payload format type.
pub const PAYLOAD_HEADER_STREAM_TYPE: u64 = 0x00CD_D0F7_46B0_278D;
/// Payload format version.
pub const PAYLOAD_HEADER_STREAM_VERSION: u64 = 0x006F_5A08_7D42_C6F8;
/// Root of a buffer chunk payload.
pub const PAYLOAD_BUFFER: u64 = 0x00CF_2101_0237_5310;
/// Root of an end chunk payload.
pub const PAYLOAD_END: u64 = 0x00D9_DDC3_0C6F_3CBF;

// =============================================================================
// Streamed Matrix
// =============================================================================

/// Matrix layout section of a header.
pub const HEADER_MATRIX: u64 = 0x0072_F560_7D4D_1C7B;
/// Number of dimensions.
pub const HEADER_MATRIX_DIMENSION_COUNT: u64 = 0x003F_EBD4_2725_D9DB;
/// One dimension.
pub const HEADER_MATRIX_DIMENSION: u64 = 0x0000_E3C0_3C2E_1B4E;
/// Number of entries of a dimension.
pub const HEADER_MATRIX_DIMENSION_SIZE: u64 = 0x0013_02F7_36D8_438A;
/// Label of one dimension entry.
pub const HEADER_MATRIX_DIMENSION_LABEL: u64 = 0x0015_3E40_1902_27E0;
/// Matrix section of a buffer.
pub const BUFFER_MATRIX: u64 = 0x0012_0663_08FB_C165;
/// Little-endian `f64` values.
pub const BUFFER_MATRIX_RAW_BUFFER: u64 = 0x00B1_8C10_427D_098C;

// =============================================================================
// Signal, Spectrum, Channel Localisation, Channel Units
// =============================================================================

/// Signal section of a header.
pub const HEADER_SIGNAL: u64 = 0x0078_55DE_3FEF_8DAF;
/// Sampling rate of a signal.
pub const HEADER_SIGNAL_SAMPLING: u64 = 0x0014_1A1E_0D1A_7F5F;
/// Spectrum section of a header.
pub const HEADER_SPECTRUM: u64 = 0x00CC_FA4B_14F3_7D4D;
/// Frequency of every bin, as a matrix section.
pub const HEADER_SPECTRUM_FREQUENCY_ABSCISSA: u64 = 0x00D0_D5C1_3C4A_8A4F;
/// Sampling rate of the analysed signal.
pub const HEADER_SPECTRUM_SAMPLING: u64 = 0x00D2_F05B_1B8C_4C14;
/// Channel localisation section of a header.
pub const HEADER_CHANNEL_LOCALISATION: u64 = 0x00F4_C1D4_4BCE_4E8B;
/// Whether positions change over time.
pub const HEADER_CHANNEL_LOCALISATION_DYNAMIC: u64 = 0x006F_5AC6_0DA7_A5D8;
/// Channel units section of a header.
pub const HEADER_CHANNEL_UNITS: u64 = 0x1740_0C2D_5BA3_C3A1;
/// Whether units change over time.
pub const HEADER_CHANNEL_UNITS_DYNAMIC: u64 = 0x7307_023A_4E6B_0A54;

// =============================================================================
// Stimulations
// =============================================================================

/// Stimulation section of a buffer.
pub const BUFFER_STIMULATION: u64 = 0x006D_EABE_7FC0_5A20;
/// Number of stimulations in the buffer.
pub const BUFFER_STIMULATION_COUNT: u64 = 0x00BB_790B_2B85_74D8;
/// One stimulation.
pub const BUFFER_STIMULATION_ENTRY: u64 = 0x0016_EAC6_29FB_CCA9;
/// Stimulation code.
pub const BUFFER_STIMULATION_ID: u64 = 0x006F_A5DB_4BAC_31E9;
/// Stimulation date.
pub const BUFFER_STIMULATION_DATE: u64 = 0x00B8_66D8_14AA_8A6D;
/// Stimulation duration.
pub const BUFFER_STIMULATION_DURATION: u64 = 0x14EE_055F_87FB_CC6D;

// =============================================================================
// Experiment Information
// =============================================================================

/// Experiment information section of a header.
pub const HEADER_EXPERIMENT_INFO: u64 = 0x0074_6BA0_115A_E04D;
/// Experiment subsection.
pub const HEADER_EXPERIMENT: u64 = 0x0011_D6B7_48E2_A6C1;
/// Experiment identifier.
pub const HEADER_EXPERIMENT_ID: u64 = 0x006A_CD74_1BED_3A9E;
/// Experiment date.
pub const HEADER_EXPERIMENT_DATE: u64 = 0x002F_8FB7_6F4E_F9C2;
/// Subject subsection.
pub const HEADER_SUBJECT: u64 = 0x003E_C620_333E_0A94;
/// Subject identifier.
pub const HEADER_SUBJECT_ID: u64 = 0x00D6_2974_473D_4AA5;
/// Subject name.
pub const HEADER_SUBJECT_NAME: u64 = 0x0041_FD0A_6BCD_1A8D;
/// Subject age.
pub const HEADER_SUBJECT_AGE: u64 = 0x00DF_7DD9_3333_6C4E;
/// Subject gender.
pub const HEADER_SUBJECT_GENDER: u64 = 0x0087_EB74_3F1F_E3E7;
/// Context subsection.
pub const HEADER_CONTEXT: u64 = 0x0018_C291_7A9A_3C93;
/// Laboratory identifier.
pub const HEADER_CONTEXT_LABORATORY_ID: u64 = 0x003F_11B9_26D7_6D9C;
/// Laboratory name.
pub const HEADER_CONTEXT_LABORATORY_NAME: u64 = 0x0071_1C33_6DA1_0A9F;
/// Technician identifier.
pub const HEADER_CONTEXT_TECHNICIAN_ID: u64 = 0x00B1_A5C3_2F4D_6D85;
/// Technician name.
pub const HEADER_CONTEXT_TECHNICIAN_NAME: u64 = 0x00B8_E94D_26F8_A1C0;

/// Element type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    /// Master element (contains other elements).
    Master,
    /// Unsigned integer.
    UnsignedInt,
    /// UTF-8 string.
    String,
    /// Binary data.
    Binary,
}

/// Get the type of a known element.
pub fn element_type(id: u64) -> Option<ElementType> {
    match id {
        // Master elements
        EBML | STREAM_HEADER | STREAM_BUFFER | PAYLOAD_HEADER | PAYLOAD_BUFFER | PAYLOAD_END | HEADER_MATRIX
        | HEADER_MATRIX_DIMENSION | BUFFER_MATRIX | HEADER_SIGNAL | HEADER_SPECTRUM
        | HEADER_SPECTRUM_FREQUENCY_ABSCISSA | HEADER_CHANNEL_LOCALISATION | HEADER_CHANNEL_UNITS
        | BUFFER_STIMULATION | BUFFER_STIMULATION_ENTRY | HEADER_EXPERIMENT_INFO | HEADER_EXPERIMENT
        | HEADER_SUBJECT | HEADER_CONTEXT => Some(ElementType::Master),

        // Unsigned integers
        EBML_VERSION | EBML_READ_VERSION | EBML_MAX_ID_LENGTH | EBML_MAX_SIZE_LENGTH | DOC_TYPE_VERSION
        | DOC_TYPE_READ_VERSION | STREAM_HEADER_COMPRESSION | STREAM_HEADER_STREAM_TYPE
        | STREAM_BUFFER_STREAM_INDEX | STREAM_BUFFER_START_TIME | STREAM_BUFFER_END_TIME
        | PAYLOAD_HEADER_STREAM_TYPE | PAYLOAD_HEADER_STREAM_VERSION | HEADER_MATRIX_DIMENSION_COUNT
        | HEADER_MATRIX_DIMENSION_SIZE | HEADER_SIGNAL_SAMPLING | HEADER_SPECTRUM_SAMPLING
        | HEADER_CHANNEL_LOCALISATION_DYNAMIC | HEADER_CHANNEL_UNITS_DYNAMIC | BUFFER_STIMULATION_COUNT
        | BUFFER_STIMULATION_ID | BUFFER_STIMULATION_DATE | BUFFER_STIMULATION_DURATION
        | HEADER_EXPERIMENT_ID | HEADER_SUBJECT_ID | HEADER_SUBJECT_AGE | HEADER_SUBJECT_GENDER
        | HEADER_CONTEXT_LABORATORY_ID | HEADER_CONTEXT_TECHNICIAN_ID => Some(ElementType::UnsignedInt),

        // Strings
        DOC_TYPE | HEADER_MATRIX_DIMENSION_LABEL | HEADER_EXPERIMENT_DATE | HEADER_SUBJECT_NAME
        | HEADER_CONTEXT_LABORATORY_NAME | HEADER_CONTEXT_TECHNICIAN_NAME => Some(ElementType::String),

        // Binary
        STREAM_BUFFER_CONTENT | BUFFER_MATRIX_RAW_BUFFER => Some(ElementType::Binary),

        _ => None,
    }
}

/// Check if an element is a master element (container).
///
/// Unknown identifiers are treated as leaves so that their content can be
/// skipped in one piece.
pub fn is_master_element(id: u64) -> bool {
    element_type(id) == Some(ElementType::Master)
}
