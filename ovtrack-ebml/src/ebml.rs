//! EBML (Extensible Binary Meta Language) coding utilities.
//!
//! `.ov` files use EBML with a few particularities:
//! - Element identifiers and sizes are both VINT *values* (the length marker
//!   is stripped from identifiers too).
//! - VINTs may be up to 10 bytes long. When the first byte is zero the length
//!   marker continues into the second byte: `00 1x..` is 9 bytes long,
//!   `00 01x..` is 10 bytes long.
//! - There is no unknown-size element.

use crate::elements;
use crate::error::{EbmlError, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::io::Write;

/// Maximum recursion depth for nested elements.
pub const MAX_RECURSION_DEPTH: u32 = 64;

/// Maximum VINT length in bytes.
pub const MAX_VINT_LENGTH: usize = 10;

/// Doc type written to and expected in the EBML header.
pub const OV_DOC_TYPE: &str = "OpenViBE_Stream_File";

/// Length in bytes of the VINT starting with `first` (and `second`, needed
/// only when `first` is zero).
///
/// Returns `Ok(None)` when `first` is zero and `second` is not available yet.
pub fn coded_length(first: u8, second: Option<u8>) -> Result<Option<usize>> {
    if first != 0 {
        return Ok(Some(first.leading_zeros() as usize + 1));
    }
    match second {
        None => Ok(None),
        Some(b) if b & 0x80 != 0 => Ok(Some(9)),
        Some(b) if b & 0x40 != 0 => Ok(Some(10)),
        Some(_) => Err(EbmlError::InvalidVint { offset: 0 }),
    }
}

/// Decode a VINT from the start of `data`.
///
/// Returns the value with its length marker removed and the number of bytes
/// consumed, or `Ok(None)` if `data` is too short to hold the whole VINT.
pub fn decode_vint(data: &[u8]) -> Result<Option<(u64, usize)>> {
    let Some(&first) = data.first() else {
        return Ok(None);
    };
    let Some(length) = coded_length(first, data.get(1).copied())? else {
        return Ok(None);
    };
    if data.len() < length {
        return Ok(None);
    }

    // Clear the marker bit, which sits in byte (length - 1) / 8.
    let mut bytes = [0u8; MAX_VINT_LENGTH];
    bytes[..length].copy_from_slice(&data[..length]);
    let marker_byte = (length - 1) / 8;
    bytes[marker_byte] &= !(0x80u8 >> ((length - 1) % 8));

    let mut value: u128 = 0;
    for &byte in &bytes[..length] {
        value = (value << 8) | byte as u128;
    }
    let value = u64::try_from(value).map_err(|_| EbmlError::InvalidVint { offset: 0 })?;
    Ok(Some((value, length)))
}

/// Calculate the minimum number of bytes needed to encode a value as a VINT.
///
/// A value whose data bits would be all ones is pushed to the next length.
pub fn vint_length(value: u64) -> usize {
    for length in 1..=9u32 {
        let bits = 7 * length;
        if (value as u128) < (1u128 << bits) - 1 {
            return length as usize;
        }
    }
    MAX_VINT_LENGTH
}

/// Encode a value as a VINT.
///
/// Returns the encoded bytes and the length.
pub fn encode_vint(value: u64) -> ([u8; MAX_VINT_LENGTH], usize) {
    let length = vint_length(value);
    let mut bytes = [0u8; MAX_VINT_LENGTH];

    let mut v = value as u128;
    for i in (0..length).rev() {
        bytes[i] = (v & 0xFF) as u8;
        v >>= 8;
    }

    bytes[(length - 1) / 8] |= 0x80 >> ((length - 1) % 8);
    (bytes, length)
}

/// Write a VINT.
pub fn write_vint<W: Write>(writer: &mut W, value: u64) -> Result<usize> {
    let (bytes, length) = encode_vint(value);
    writer.write_all(&bytes[..length])?;
    Ok(length)
}

/// Write a complete element: identifier, size and content.
pub fn write_element<W: Write>(writer: &mut W, id: u64, data: &[u8]) -> Result<usize> {
    let id_len = write_vint(writer, id)?;
    let size_len = write_vint(writer, data.len() as u64)?;
    writer.write_all(data)?;
    Ok(id_len + size_len + data.len())
}

/// Read an unsigned integer from EBML data (big-endian, 0 to 8 bytes).
pub fn read_unsigned_int(data: &[u8]) -> Result<u64> {
    if data.len() > 8 {
        return Err(EbmlError::InvalidPayload(format!(
            "unsigned integer of {} bytes",
            data.len()
        )));
    }
    let mut value = 0u64;
    for &byte in data {
        value = (value << 8) | byte as u64;
    }
    Ok(value)
}

/// Encode an unsigned integer in minimal bytes (at least one).
pub fn unsigned_int_bytes(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(7);
    bytes[start..].to_vec()
}

/// Read a UTF-8 string from EBML data, stopping at a NUL terminator.
pub fn read_string(data: &[u8]) -> Result<String> {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8(data[..end].to_vec())
        .map_err(|e| EbmlError::InvalidPayload(format!("Invalid UTF-8 string: {}", e)))
}

/// Read an array of little-endian `f64` values.
pub fn read_f64_array(data: &[u8]) -> Result<Vec<f64>> {
    if data.len() % 8 != 0 {
        return Err(EbmlError::InvalidPayload(format!(
            "raw buffer of {} bytes is not a whole number of doubles",
            data.len()
        )));
    }
    let mut values = vec![0.0; data.len() / 8];
    LittleEndian::read_f64_into(data, &mut values);
    Ok(values)
}

/// Encode `f64` values as little-endian bytes.
pub fn f64_array_bytes(values: &[f64]) -> Vec<u8> {
    let mut bytes = vec![0u8; values.len() * 8];
    LittleEndian::write_f64_into(values, &mut bytes);
    bytes
}

/// EBML document header information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EbmlHeader {
    /// EBML version.
    pub version: u64,
    /// EBML read version.
    pub read_version: u64,
    /// Maximum ID length.
    pub max_id_length: u64,
    /// Maximum size length.
    pub max_size_length: u64,
    /// Document type.
    pub doc_type: String,
    /// Document type version.
    pub doc_type_version: u64,
    /// Document type read version.
    pub doc_type_read_version: u64,
}

impl Default for EbmlHeader {
    fn default() -> Self {
        Self {
            version: 1,
            read_version: 1,
            max_id_length: MAX_VINT_LENGTH as u64,
            max_size_length: 8,
            doc_type: OV_DOC_TYPE.to_string(),
            doc_type_version: 1,
            doc_type_read_version: 1,
        }
    }
}

impl EbmlHeader {
    /// Check if this header announces a stream recording.
    pub fn is_stream_file(&self) -> bool {
        self.doc_type == OV_DOC_TYPE
    }

    /// Update one field from a leaf of the EBML header element.
    ///
    /// Unknown children are ignored.
    pub fn apply_child(&mut self, id: u64, data: &[u8]) -> Result<()> {
        match id {
            elements::EBML_VERSION => self.version = read_unsigned_int(data)?,
            elements::EBML_READ_VERSION => self.read_version = read_unsigned_int(data)?,
            elements::EBML_MAX_ID_LENGTH => self.max_id_length = read_unsigned_int(data)?,
            elements::EBML_MAX_SIZE_LENGTH => self.max_size_length = read_unsigned_int(data)?,
            elements::DOC_TYPE => self.doc_type = read_string(data)?,
            elements::DOC_TYPE_VERSION => self.doc_type_version = read_unsigned_int(data)?,
            elements::DOC_TYPE_READ_VERSION => self.doc_type_read_version = read_unsigned_int(data)?,
            _ => {}
        }
        Ok(())
    }

    /// Serialize as a complete EBML header element.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut content = Vec::new();
        write_element(&mut content, elements::EBML_VERSION, &unsigned_int_bytes(self.version))?;
        write_element(&mut content, elements::EBML_READ_VERSION, &unsigned_int_bytes(self.read_version))?;
        write_element(&mut content, elements::EBML_MAX_ID_LENGTH, &unsigned_int_bytes(self.max_id_length))?;
        write_element(
            &mut content,
            elements::EBML_MAX_SIZE_LENGTH,
            &unsigned_int_bytes(self.max_size_length),
        )?;
        write_element(&mut content, elements::DOC_TYPE, self.doc_type.as_bytes())?;
        write_element(&mut content, elements::DOC_TYPE_VERSION, &unsigned_int_bytes(self.doc_type_version))?;
        write_element(
            &mut content,
            elements::DOC_TYPE_READ_VERSION,
            &unsigned_int_bytes(self.doc_type_read_version),
        )?;

        let mut out = Vec::with_capacity(content.len() + 8);
        write_element(&mut out, elements::EBML, &content)?;
        Ok(out)
    }
}

/// A fully parsed element, used for small self-contained payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Element identifier.
    pub id: u64,
    /// Raw content of a leaf; empty for masters.
    pub data: Vec<u8>,
    /// Children of a master; empty for leaves.
    pub children: Vec<Node>,
}

impl Node {
    /// Parse every top-level element of `data`.
    ///
    /// Master and leaf elements are told apart with
    /// [`elements::is_master_element`].
    pub fn parse_all(data: &[u8]) -> Result<Vec<Node>> {
        parse_level(data, 0, 0)
    }

    /// First child with the given identifier.
    pub fn child(&self, id: u64) -> Option<&Node> {
        self.children.iter().find(|c| c.id == id)
    }

    /// First child with the given identifier, or a missing-element error.
    pub fn require(&self, id: u64, name: &'static str) -> Result<&Node> {
        self.child(id).ok_or(EbmlError::MissingElement(name))
    }

    /// Every child with the given identifier.
    pub fn children_with(&self, id: u64) -> impl Iterator<Item = &Node> + '_ {
        self.children.iter().filter(move |c| c.id == id)
    }

    /// Leaf content as an unsigned integer.
    pub fn as_uint(&self) -> Result<u64> {
        read_unsigned_int(&self.data)
    }

    /// Leaf content as a string.
    pub fn as_string(&self) -> Result<String> {
        read_string(&self.data)
    }
}

fn parse_level(data: &[u8], base_offset: u64, depth: u32) -> Result<Vec<Node>> {
    if depth > MAX_RECURSION_DEPTH {
        return Err(EbmlError::RecursionLimit { depth });
    }

    let mut nodes = Vec::new();
    let mut pos = 0usize;
    while pos < data.len() {
        let offset = base_offset + pos as u64;
        let (id, id_len) = decode_vint(&data[pos..])?.ok_or(EbmlError::InvalidVint { offset })?;
        let (size, size_len) =
            decode_vint(&data[pos + id_len..])?.ok_or(EbmlError::InvalidVint { offset: offset + id_len as u64 })?;

        let start = pos + id_len + size_len;
        let available = (data.len() - start) as u64;
        if size > available {
            return Err(EbmlError::Overrun {
                id,
                offset,
                excess: size - available,
            });
        }
        let end = start + size as usize;
        let content = &data[start..end];

        let node = if elements::is_master_element(id) {
            Node {
                id,
                data: Vec::new(),
                children: parse_level(content, base_offset + start as u64, depth + 1)?,
            }
        } else {
            Node {
                id,
                data: content.to_vec(),
                children: Vec::new(),
            }
        };
        nodes.push(node);
        pos = end;
    }
    Ok(nodes)
}
