//! Wire primitives shared by every packet: VarInts, length-prefixed strings,
//! booleans, and network NBT for structurally encoded text components.
//!
//! All multi-byte fixed-width integers are big-endian.  Strings are prefixed
//! with their UTF-8 byte length as a VarInt.
//!
//! # What is a VarInt? (for newcomers)
//!
//! A VarInt stores a 32-bit integer in 1–5 bytes.  Each byte carries seven
//! bits of the value; the high bit says "another byte follows".  Small values
//! such as packet ids and scores therefore cost a single byte.

use serde_json::{Map, Number, Value};

use crate::protocol::codec::ProtocolError;

/// Longest string (in characters) the client accepts in a packet field.
pub const MAX_STRING_CHARS: usize = 32_767;

const MAX_NBT_DEPTH: usize = 512;

pub(crate) const TAG_END: u8 = 0;
pub(crate) const TAG_BYTE: u8 = 1;
pub(crate) const TAG_SHORT: u8 = 2;
pub(crate) const TAG_INT: u8 = 3;
pub(crate) const TAG_LONG: u8 = 4;
pub(crate) const TAG_FLOAT: u8 = 5;
pub(crate) const TAG_DOUBLE: u8 = 6;
pub(crate) const TAG_BYTE_ARRAY: u8 = 7;
pub(crate) const TAG_STRING: u8 = 8;
pub(crate) const TAG_LIST: u8 = 9;
pub(crate) const TAG_COMPOUND: u8 = 10;
pub(crate) const TAG_INT_ARRAY: u8 = 11;
pub(crate) const TAG_LONG_ARRAY: u8 = 12;

// ── Writers ───────────────────────────────────────────────────────────────────

/// Appends `value` as a VarInt (negative values always take five bytes).
pub fn write_var_int(buf: &mut Vec<u8>, value: i32) {
    let mut v = value as u32;
    loop {
        if v & !0x7F == 0 {
            buf.push(v as u8);
            return;
        }
        buf.push(((v & 0x7F) | 0x80) as u8);
        v >>= 7;
    }
}

/// Appends a VarInt-length-prefixed UTF-8 string.
///
/// # Errors
///
/// Returns [`ProtocolError::Validation`] when the string exceeds
/// [`MAX_STRING_CHARS`] characters.
pub fn write_string(buf: &mut Vec<u8>, s: &str) -> Result<(), ProtocolError> {
    let chars = s.chars().count();
    if chars > MAX_STRING_CHARS {
        return Err(ProtocolError::Validation(format!(
            "string of {chars} characters exceeds the {MAX_STRING_CHARS} character limit"
        )));
    }
    write_var_int(buf, s.len() as i32);
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

pub fn write_bool(buf: &mut Vec<u8>, value: bool) {
    buf.push(if value { 0x01 } else { 0x00 });
}

/// Writes a JSON text component as a string, after checking that it parses.
///
/// # Errors
///
/// Returns [`ProtocolError::Validation`] if `json` does not parse.
pub fn write_json_component(buf: &mut Vec<u8>, json: &str) -> Result<(), ProtocolError> {
    serde_json::from_str::<Value>(json)
        .map_err(|e| ProtocolError::Validation(format!("text component is not valid JSON: {e}")))?;
    write_string(buf, json)
}

/// Writes a JSON text component as a nameless network NBT root tag.
///
/// # Errors
///
/// Returns [`ProtocolError::Validation`] if `json` does not parse or contains
/// a value NBT cannot represent (`null`).
pub fn write_nbt_component(buf: &mut Vec<u8>, json: &str) -> Result<(), ProtocolError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| ProtocolError::Validation(format!("text component is not valid JSON: {e}")))?;
    write_nbt_root(buf, &value)
}

/// Writes any JSON value as a nameless network NBT root tag.
pub(crate) fn write_nbt_root(buf: &mut Vec<u8>, value: &Value) -> Result<(), ProtocolError> {
    buf.push(tag_of(value)?);
    write_nbt_payload(buf, value)
}

fn tag_of(value: &Value) -> Result<u8, ProtocolError> {
    match value {
        Value::Null => Err(ProtocolError::Validation(
            "null cannot be represented in NBT".to_string(),
        )),
        Value::Bool(_) => Ok(TAG_BYTE),
        Value::Number(n) => Ok(match n.as_i64() {
            Some(i) if i32::try_from(i).is_ok() => TAG_INT,
            Some(_) => TAG_LONG,
            None => TAG_DOUBLE,
        }),
        Value::String(_) => Ok(TAG_STRING),
        Value::Array(_) => Ok(TAG_LIST),
        Value::Object(_) => Ok(TAG_COMPOUND),
    }
}

fn write_nbt_payload(buf: &mut Vec<u8>, value: &Value) -> Result<(), ProtocolError> {
    match value {
        Value::Null => {
            return Err(ProtocolError::Validation(
                "null cannot be represented in NBT".to_string(),
            ))
        }
        Value::Bool(b) => buf.push(u8::from(*b)),
        Value::Number(n) => match (n.as_i64(), tag_of(value)?) {
            (Some(i), TAG_INT) => buf.extend_from_slice(&(i as i32).to_be_bytes()),
            (Some(i), _) => buf.extend_from_slice(&i.to_be_bytes()),
            (None, _) => buf.extend_from_slice(&n.as_f64().unwrap_or_default().to_be_bytes()),
        },
        Value::String(s) => write_nbt_string(buf, s)?,
        Value::Array(items) => write_nbt_list(buf, items)?,
        Value::Object(fields) => {
            for (name, field) in fields {
                buf.push(tag_of(field)?);
                write_nbt_string(buf, name)?;
                write_nbt_payload(buf, field)?;
            }
            buf.push(TAG_END);
        }
    }
    Ok(())
}

fn write_nbt_list(buf: &mut Vec<u8>, items: &[Value]) -> Result<(), ProtocolError> {
    let tags = items.iter().map(tag_of).collect::<Result<Vec<_>, _>>()?;
    let homogeneous = tags.windows(2).all(|w| w[0] == w[1]);

    if homogeneous {
        buf.push(tags.first().copied().unwrap_or(TAG_END));
        buf.extend_from_slice(&(items.len() as i32).to_be_bytes());
        for item in items {
            write_nbt_payload(buf, item)?;
        }
        return Ok(());
    }

    // Mixed lists are not representable; every element becomes a compound.
    buf.push(TAG_COMPOUND);
    buf.extend_from_slice(&(items.len() as i32).to_be_bytes());
    for item in items {
        let wrapped = match item {
            Value::Object(_) => item.clone(),
            Value::String(s) => serde_json::json!({ "text": s }),
            other => serde_json::json!({ "": other }),
        };
        write_nbt_payload(buf, &wrapped)?;
    }
    Ok(())
}

fn write_nbt_string(buf: &mut Vec<u8>, s: &str) -> Result<(), ProtocolError> {
    let len = u16::try_from(s.len()).map_err(|_| {
        ProtocolError::Validation(format!("NBT string of {} bytes is too long", s.len()))
    })?;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

// ── Reader ────────────────────────────────────────────────────────────────────

/// Cursor over a received packet body.
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < n {
            return Err(ProtocolError::InsufficientData {
                needed: self.pos + n,
                available: self.buf.len(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, ProtocolError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        match self.read_u8()? {
            0x00 => Ok(false),
            0x01 => Ok(true),
            other => Err(ProtocolError::MalformedPayload(format!(
                "invalid boolean byte 0x{other:02X}"
            ))),
        }
    }

    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        let b = self.read_bytes(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i64(&mut self) -> Result<i64, ProtocolError> {
        let b = self.read_bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(i64::from_be_bytes(raw))
    }

    pub fn read_var_int(&mut self) -> Result<i32, ProtocolError> {
        let mut value: u32 = 0;
        for shift in (0..35).step_by(7) {
            let byte = self.read_u8()?;
            value |= u32::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value as i32);
            }
        }
        Err(ProtocolError::MalformedPayload(
            "VarInt is longer than 5 bytes".to_string(),
        ))
    }

    pub fn read_string(&mut self) -> Result<String, ProtocolError> {
        let len = self.read_var_int()?;
        let len = usize::try_from(len).map_err(|_| {
            ProtocolError::MalformedPayload(format!("negative string length {len}"))
        })?;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| ProtocolError::MalformedPayload(format!("invalid UTF-8: {e}")))
    }

    /// Reads a nameless network NBT root tag and returns it as a JSON string.
    pub fn read_nbt_component(&mut self) -> Result<String, ProtocolError> {
        let value = self.read_nbt_root()?;
        serde_json::to_string(&value)
            .map_err(|e| ProtocolError::MalformedPayload(format!("NBT to JSON failed: {e}")))
    }

    pub(crate) fn read_nbt_root(&mut self) -> Result<Value, ProtocolError> {
        let tag = self.read_u8()?;
        if tag == TAG_END {
            return Err(ProtocolError::MalformedPayload(
                "empty NBT root where a component was expected".to_string(),
            ));
        }
        self.read_nbt_payload(tag, 0)
    }

    fn read_nbt_string(&mut self) -> Result<String, ProtocolError> {
        let len = self.read_u16()? as usize;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| ProtocolError::MalformedPayload(format!("invalid NBT string: {e}")))
    }

    fn read_nbt_len(&mut self) -> Result<usize, ProtocolError> {
        let len = self.read_i32()?;
        usize::try_from(len)
            .map_err(|_| ProtocolError::MalformedPayload(format!("negative NBT length {len}")))
    }

    fn read_nbt_payload(&mut self, tag: u8, depth: usize) -> Result<Value, ProtocolError> {
        if depth > MAX_NBT_DEPTH {
            return Err(ProtocolError::MalformedPayload(
                "NBT nesting too deep".to_string(),
            ));
        }
        let value = match tag {
            TAG_BYTE => match self.read_i8()? {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => Value::from(other),
            },
            TAG_SHORT => Value::from(self.read_u16()? as i16),
            TAG_INT => Value::from(self.read_i32()?),
            TAG_LONG => Value::from(self.read_i64()?),
            TAG_FLOAT => float_value(f64::from(f32::from_bits(self.read_i32()? as u32))),
            TAG_DOUBLE => float_value(f64::from_bits(self.read_i64()? as u64)),
            TAG_BYTE_ARRAY => {
                let len = self.read_nbt_len()?;
                Value::Array(
                    self.read_bytes(len)?
                        .iter()
                        .map(|b| Value::from(*b as i8))
                        .collect(),
                )
            }
            TAG_STRING => Value::String(self.read_nbt_string()?),
            TAG_LIST => {
                let element = self.read_u8()?;
                let len = self.read_nbt_len()?;
                let mut items = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    items.push(self.read_nbt_payload(element, depth + 1)?);
                }
                Value::Array(items)
            }
            TAG_COMPOUND => {
                let mut fields = Map::new();
                loop {
                    let field_tag = self.read_u8()?;
                    if field_tag == TAG_END {
                        break;
                    }
                    let name = self.read_nbt_string()?;
                    let field = self.read_nbt_payload(field_tag, depth + 1)?;
                    fields.insert(name, field);
                }
                Value::Object(fields)
            }
            TAG_INT_ARRAY => {
                let len = self.read_nbt_len()?;
                let mut items = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    items.push(Value::from(self.read_i32()?));
                }
                Value::Array(items)
            }
            TAG_LONG_ARRAY => {
                let len = self.read_nbt_len()?;
                let mut items = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    items.push(Value::from(self.read_i64()?));
                }
                Value::Array(items)
            }
            other => {
                return Err(ProtocolError::MalformedPayload(format!(
                    "unknown NBT tag {other}"
                )))
            }
        };
        Ok(value)
    }
}

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn var_int_bytes(value: i32) -> Vec<u8> {
        let mut buf = Vec::new();
        write_var_int(&mut buf, value);
        buf
    }

    #[test]
    fn test_var_int_known_encodings() {
        assert_eq!(var_int_bytes(0), vec![0x00]);
        assert_eq!(var_int_bytes(1), vec![0x01]);
        assert_eq!(var_int_bytes(127), vec![0x7F]);
        assert_eq!(var_int_bytes(128), vec![0x80, 0x01]);
        assert_eq!(var_int_bytes(25565), vec![0xDD, 0xC7, 0x01]);
        assert_eq!(var_int_bytes(-1), vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    }

    #[test]
    fn test_var_int_reads_back_extremes() {
        for value in [0, 1, 300, i32::MAX, i32::MIN, -1] {
            let bytes = var_int_bytes(value);
            let mut reader = WireReader::new(&bytes);
            assert_eq!(reader.read_var_int().unwrap(), value);
            assert_eq!(reader.remaining(), 0);
        }
    }

    #[test]
    fn test_var_int_longer_than_five_bytes_is_rejected() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        let mut reader = WireReader::new(&bytes);
        assert!(matches!(
            reader.read_var_int(),
            Err(ProtocolError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_string_is_length_prefixed_in_bytes() {
        let mut buf = Vec::new();
        write_string(&mut buf, "§aé").unwrap();
        // "§" and "é" are two bytes each in UTF-8
        assert_eq!(buf[0], 5);
        let mut reader = WireReader::new(&buf);
        assert_eq!(reader.read_string().unwrap(), "§aé");
    }

    #[test]
    fn test_string_over_limit_is_rejected() {
        let mut buf = Vec::new();
        let long = "x".repeat(MAX_STRING_CHARS + 1);
        assert!(matches!(
            write_string(&mut buf, &long),
            Err(ProtocolError::Validation(_))
        ));
        assert!(buf.is_empty(), "nothing may be written on failure");
    }

    #[test]
    fn test_truncated_string_reports_insufficient_data() {
        let bytes = [0x05, b'a', b'b'];
        let mut reader = WireReader::new(&bytes);
        assert!(matches!(
            reader.read_string(),
            Err(ProtocolError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_plain_string_component_is_string_tag() {
        let mut buf = Vec::new();
        write_nbt_component(&mut buf, r#""hi""#).unwrap();
        assert_eq!(buf, vec![TAG_STRING, 0x00, 0x02, b'h', b'i']);
    }

    #[test]
    fn test_compound_component_round_trips_through_nbt() {
        let json = r#"{"text":"Stats","bold":true,"color":"gold","extra":[{"text":"!"}]}"#;
        let mut buf = Vec::new();
        write_nbt_component(&mut buf, json).unwrap();
        assert_eq!(buf[0], TAG_COMPOUND);

        let mut reader = WireReader::new(&buf);
        let decoded = reader.read_nbt_component().unwrap();
        let expected: Value = serde_json::from_str(json).unwrap();
        let actual: Value = serde_json::from_str(&decoded).unwrap();
        assert_eq!(actual, expected);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_mixed_list_elements_are_wrapped_in_compounds() {
        let json = r#"{"text":"","extra":["a",{"text":"b"}]}"#;
        let mut buf = Vec::new();
        write_nbt_component(&mut buf, json).unwrap();

        let mut reader = WireReader::new(&buf);
        let decoded: Value = serde_json::from_str(&reader.read_nbt_component().unwrap()).unwrap();
        assert_eq!(decoded["extra"][0]["text"], "a");
        assert_eq!(decoded["extra"][1]["text"], "b");
    }

    #[test]
    fn test_invalid_json_component_is_rejected() {
        let mut buf = Vec::new();
        assert!(matches!(
            write_nbt_component(&mut buf, "{not json"),
            Err(ProtocolError::Validation(_))
        ));
    }

    #[test]
    fn test_null_in_component_is_rejected() {
        let mut buf = Vec::new();
        assert!(matches!(
            write_nbt_component(&mut buf, r#"{"text":null}"#),
            Err(ProtocolError::Validation(_))
        ));
    }

    #[test]
    fn test_large_numbers_use_long_tag() {
        let mut buf = Vec::new();
        write_nbt_root(&mut buf, &serde_json::json!(5_000_000_000i64)).unwrap();
        assert_eq!(buf[0], TAG_LONG);
        let mut reader = WireReader::new(&buf);
        assert_eq!(reader.read_nbt_root().unwrap(), serde_json::json!(5_000_000_000i64));
    }
}
