//! Binary `application/dmr-encoded` codec.
//!
//! Every value is written as its type character followed by a payload. Integers
//! are big-endian, strings use Java's modified UTF-8 with a two-byte length
//! (`s`) or, for long strings, a four-byte character count (`S`).

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::node::{ModelNode, ModelType};
use crate::DmrError;

const SHORT_STRING_THRESHOLD: usize = 65_535 / 3;
const MAX_SHORT_UTF_LEN: usize = 65_535;
const MAX_DECODE_DEPTH: usize = 128;

pub fn encode(node: &ModelNode) -> Result<Vec<u8>, DmrError> {
    let mut writer = DataWriter::default();
    write_node(&mut writer, node)?;
    Ok(writer.bytes)
}

/// Decodes exactly one value; trailing bytes are rejected.
pub fn decode(bytes: &[u8]) -> Result<ModelNode, DmrError> {
    let mut reader = DataReader::new(bytes);
    let node = read_node(&mut reader, 0)?;
    let remaining = reader.remaining();
    if remaining > 0 {
        return Err(DmrError::TrailingBytes(remaining));
    }
    Ok(node)
}

pub fn to_base64(node: &ModelNode) -> Result<String, DmrError> {
    Ok(STANDARD.encode(encode(node)?))
}

/// Decodes a base64 payload, ignoring any whitespace and line breaks in it.
pub fn from_base64(encoded: &str) -> Result<ModelNode, DmrError> {
    let compact = encoded
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|error| DmrError::Base64(error.to_string()))?;
    decode(&bytes)
}

#[derive(Default)]
struct DataWriter {
    bytes: Vec<u8>,
}

impl DataWriter {
    fn byte(&mut self, value: u8) {
        self.bytes.push(value);
    }

    fn int(&mut self, value: i32) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    fn long(&mut self, value: i64) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    fn length(&mut self, value: usize) -> Result<(), DmrError> {
        let value = i32::try_from(value).map_err(|_| DmrError::StringTooLong(value))?;
        self.int(value);
        Ok(())
    }

    fn utf(&mut self, value: &str) -> Result<(), DmrError> {
        let encoded = modified_utf8(value);
        if encoded.len() > MAX_SHORT_UTF_LEN {
            return Err(DmrError::StringTooLong(encoded.len()));
        }
        self.bytes
            .extend_from_slice(&(encoded.len() as u16).to_be_bytes());
        self.bytes.extend_from_slice(&encoded);
        Ok(())
    }
}

fn modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        push_modified_utf8_unit(&mut out, unit);
    }
    out
}

fn push_modified_utf8_unit(out: &mut Vec<u8>, unit: u16) {
    match unit {
        0x0001..=0x007f => out.push(unit as u8),
        0x0000 | 0x0080..=0x07ff => {
            out.push(0xc0 | ((unit >> 6) & 0x1f) as u8);
            out.push(0x80 | (unit & 0x3f) as u8);
        }
        _ => {
            out.push(0xe0 | ((unit >> 12) & 0x0f) as u8);
            out.push(0x80 | ((unit >> 6) & 0x3f) as u8);
            out.push(0x80 | (unit & 0x3f) as u8);
        }
    }
}

fn write_string(writer: &mut DataWriter, value: &str) -> Result<(), DmrError> {
    let units = value.encode_utf16().count();
    if units > SHORT_STRING_THRESHOLD {
        let encoded = modified_utf8(value);
        if encoded.len() > MAX_SHORT_UTF_LEN {
            writer.byte(b'S');
            writer.length(units)?;
            writer.bytes.extend_from_slice(&encoded);
            return Ok(());
        }
    }
    writer.byte(ModelType::String.type_char());
    writer.utf(value)
}

fn write_node(writer: &mut DataWriter, node: &ModelNode) -> Result<(), DmrError> {
    match node {
        ModelNode::String(value) => return write_string(writer, value),
        _ => writer.byte(node.model_type().type_char()),
    }
    match node {
        ModelNode::Undefined | ModelNode::String(_) => {}
        ModelNode::Boolean(value) => writer.byte(u8::from(*value)),
        ModelNode::Int(value) => writer.int(*value),
        ModelNode::Long(value) => writer.long(*value),
        ModelNode::Double(value) => writer.long(value.to_bits() as i64),
        ModelNode::BigInteger(value) => {
            let bytes = big_integer_bytes(*value);
            writer.length(bytes.len())?;
            writer.bytes.extend_from_slice(&bytes);
        }
        ModelNode::BigDecimal { unscaled, scale } => {
            let bytes = big_integer_bytes(*unscaled);
            writer.length(bytes.len())?;
            writer.bytes.extend_from_slice(&bytes);
            writer.int(*scale);
        }
        ModelNode::Bytes(bytes) => {
            writer.length(bytes.len())?;
            writer.bytes.extend_from_slice(bytes);
        }
        ModelNode::Expression(value) => writer.utf(value)?,
        ModelNode::List(items) => {
            writer.length(items.len())?;
            for item in items {
                write_node(writer, item)?;
            }
        }
        ModelNode::Object(entries) => {
            writer.length(entries.len())?;
            for (key, value) in entries {
                writer.utf(key)?;
                write_node(writer, value)?;
            }
        }
        ModelNode::Property(name, value) => {
            writer.utf(name)?;
            write_node(writer, value)?;
        }
        ModelNode::Type(model_type) => writer.byte(model_type.type_char()),
    }
    Ok(())
}

/// Minimal two's-complement big-endian representation, as `BigInteger.toByteArray` produces.
fn big_integer_bytes(value: i128) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

fn big_integer_from_bytes(bytes: &[u8]) -> Result<i128, DmrError> {
    if bytes.len() > 16 {
        return Err(DmrError::BigNumberOverflow(bytes.len()));
    }
    let negative = bytes.first().is_some_and(|byte| byte & 0x80 != 0);
    let mut buffer = if negative { [0xff; 16] } else { [0x00; 16] };
    buffer[16 - bytes.len()..].copy_from_slice(bytes);
    Ok(i128::from_be_bytes(buffer))
}

struct DataReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> DataReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], DmrError> {
        if self.remaining() < count {
            return Err(DmrError::UnexpectedEof {
                offset: self.bytes.len(),
            });
        }
        let slice = &self.bytes[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8, DmrError> {
        Ok(self.take(1)?[0])
    }

    fn int(&mut self) -> Result<i32, DmrError> {
        let mut buffer = [0u8; 4];
        buffer.copy_from_slice(self.take(4)?);
        Ok(i32::from_be_bytes(buffer))
    }

    fn long(&mut self) -> Result<i64, DmrError> {
        let mut buffer = [0u8; 8];
        buffer.copy_from_slice(self.take(8)?);
        Ok(i64::from_be_bytes(buffer))
    }

    fn length(&mut self) -> Result<usize, DmrError> {
        let length = self.int()?;
        usize::try_from(length).map_err(|_| DmrError::NegativeLength(length))
    }

    fn utf(&mut self) -> Result<String, DmrError> {
        let mut buffer = [0u8; 2];
        buffer.copy_from_slice(self.take(2)?);
        let length = usize::from(u16::from_be_bytes(buffer));
        let start = self.offset;
        let bytes = self.take(length)?;
        let mut units = Vec::with_capacity(length);
        let mut index = 0;
        while index < bytes.len() {
            let (unit, width) = read_modified_utf8_unit(bytes, index, start)?;
            units.push(unit);
            index += width;
        }
        String::from_utf16(&units).map_err(|_| DmrError::InvalidUtf8 { offset: start })
    }

    fn long_string(&mut self) -> Result<String, DmrError> {
        let count = self.length()?;
        let mut units = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            let start = self.offset;
            let (unit, width) = read_modified_utf8_unit(self.bytes, self.offset, 0)
                .map_err(|_| DmrError::InvalidUtf8 { offset: start })?;
            self.take(width)?;
            units.push(unit);
        }
        String::from_utf16(&units).map_err(|_| DmrError::InvalidUtf8 {
            offset: self.offset,
        })
    }
}

/// Reads one UTF-16 unit at `index`, returning it together with its encoded width.
fn read_modified_utf8_unit(bytes: &[u8], index: usize, base: usize) -> Result<(u16, usize), DmrError> {
    let invalid = || DmrError::InvalidUtf8 {
        offset: base + index,
    };
    let continuation = |position: usize| -> Result<u16, DmrError> {
        match bytes.get(position) {
            Some(byte) if byte & 0xc0 == 0x80 => Ok(u16::from(byte & 0x3f)),
            _ => Err(invalid()),
        }
    };
    let first = *bytes.get(index).ok_or_else(invalid)?;
    match first {
        0x00..=0x7f => Ok((u16::from(first), 1)),
        0xc0..=0xdf => {
            let second = continuation(index + 1)?;
            Ok(((u16::from(first & 0x1f) << 6) | second, 2))
        }
        0xe0..=0xef => {
            let second = continuation(index + 1)?;
            let third = continuation(index + 2)?;
            Ok(((u16::from(first & 0x0f) << 12) | (second << 6) | third, 3))
        }
        _ => Err(invalid()),
    }
}

fn read_node(reader: &mut DataReader<'_>, depth: usize) -> Result<ModelNode, DmrError> {
    if depth > MAX_DECODE_DEPTH {
        return Err(DmrError::NestingTooDeep(MAX_DECODE_DEPTH));
    }
    let type_char = reader.byte()?;
    let model_type = ModelType::from_type_char(type_char).ok_or(DmrError::InvalidType(type_char))?;
    let node = match model_type {
        ModelType::Undefined => ModelNode::Undefined,
        ModelType::Boolean => ModelNode::Boolean(reader.byte()? != 0),
        ModelType::Int => ModelNode::Int(reader.int()?),
        ModelType::Long => ModelNode::Long(reader.long()?),
        ModelType::Double => ModelNode::Double(f64::from_bits(reader.long()? as u64)),
        ModelType::BigInteger => {
            let length = reader.length()?;
            ModelNode::BigInteger(big_integer_from_bytes(reader.take(length)?)?)
        }
        ModelType::BigDecimal => {
            let length = reader.length()?;
            let unscaled = big_integer_from_bytes(reader.take(length)?)?;
            let scale = reader.int()?;
            ModelNode::BigDecimal { unscaled, scale }
        }
        ModelType::String if type_char == b'S' => ModelNode::String(reader.long_string()?),
        ModelType::String => ModelNode::String(reader.utf()?),
        ModelType::Bytes => {
            let length = reader.length()?;
            ModelNode::Bytes(reader.take(length)?.to_vec())
        }
        ModelType::Expression => ModelNode::Expression(reader.utf()?),
        ModelType::List => {
            let count = reader.length()?;
            let mut items = Vec::with_capacity(count.min(reader.remaining()));
            for _ in 0..count {
                items.push(read_node(reader, depth + 1)?);
            }
            ModelNode::List(items)
        }
        ModelType::Object => {
            let count = reader.length()?;
            let mut entries = Vec::with_capacity(count.min(reader.remaining()));
            for _ in 0..count {
                let key = reader.utf()?;
                entries.push((key, read_node(reader, depth + 1)?));
            }
            ModelNode::Object(entries)
        }
        ModelType::Property => {
            let name = reader.utf()?;
            ModelNode::Property(name, Box::new(read_node(reader, depth + 1)?))
        }
        ModelType::Type => {
            let inner = reader.byte()?;
            ModelNode::Type(ModelType::from_type_char(inner).ok_or(DmrError::InvalidType(inner))?)
        }
    };
    Ok(node)
}
