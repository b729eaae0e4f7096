// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! MySql internal binary JSON representation.
//!
//! A document is a type byte followed by a value. Objects and arrays come in two storage
//! formats ([`Small`] and [`Large`]) that only differ in the width of offsets and sizes.

use std::str::from_utf8;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{Map, Number, Value as Json};

use crate::{
    constants::ColumnType,
    error::{DecodeError, Result},
    io::ParseBuf,
};

use super::{decimal::decode_decimal, time::Temporal};

/// Decodes a binary JSON document into a JSON tree.
///
/// An empty document is JSON `null`. Containers nested deeper than `max_depth` are rejected.
pub fn decode_jsonb(data: &[u8], max_depth: usize) -> Result<Json> {
    if data.is_empty() {
        return Ok(Json::Null);
    }

    let mut buf = ParseBuf::new(data);
    let value_type = eat_jsonb_type(&mut buf)?;
    let decoder = JsonbDecoder { max_depth };
    decoder.decode_value(value_type, buf.as_slice(), 0)
}

#[derive(Debug, Clone, Copy)]
struct JsonbDecoder {
    max_depth: usize,
}

impl JsonbDecoder {
    fn decode_value(&self, value_type: JsonbType, data: &[u8], depth: usize) -> Result<Json> {
        match value_type {
            JsonbType::JSONB_TYPE_SMALL_OBJECT => {
                self.decode_complex::<Small, Object>(data, depth + 1)
            }
            JsonbType::JSONB_TYPE_LARGE_OBJECT => {
                self.decode_complex::<Large, Object>(data, depth + 1)
            }
            JsonbType::JSONB_TYPE_SMALL_ARRAY => self.decode_complex::<Small, Array>(data, depth + 1),
            JsonbType::JSONB_TYPE_LARGE_ARRAY => self.decode_complex::<Large, Array>(data, depth + 1),
            _ => decode_scalar(value_type, &mut ParseBuf::new(data)),
        }
    }

    fn decode_complex<T: StorageFormat, U: ComplexType>(
        &self,
        data: &[u8],
        depth: usize,
    ) -> Result<Json> {
        if depth > self.max_depth {
            return Err(DecodeError::malformed_json(format!(
                "document is nested deeper than {}",
                self.max_depth
            )));
        }

        let mut header = ParseBuf::new(data);
        let element_count = T::eat_offset(&mut header).map_err(to_json_err)? as usize;
        let size = T::eat_offset(&mut header).map_err(to_json_err)? as usize;

        if size > data.len() {
            return Err(DecodeError::malformed_json(format!(
                "container size {} exceeds available {} bytes",
                size,
                data.len()
            )));
        }
        let data = &data[..size];

        let header_size = element_count
            .checked_mul(U::entries_size::<T>())
            .and_then(|x| x.checked_add(2 * T::OFFSET_SIZE))
            .filter(|x| *x <= size)
            .ok_or_else(|| {
                DecodeError::malformed_json(format!(
                    "{} entries do not fit into a container of {} bytes",
                    element_count, size
                ))
            })?;

        let mut entries = ParseBuf::new(&data[2 * T::OFFSET_SIZE..header_size]);

        let mut keys = Vec::with_capacity(if U::IS_ARRAY { 0 } else { element_count });
        if !U::IS_ARRAY {
            for _ in 0..element_count {
                let key_offset = T::eat_offset(&mut entries)? as usize;
                let key_len = entries.eat_u16_le()? as usize;
                let key = data
                    .get(key_offset..key_offset + key_len)
                    .ok_or_else(|| {
                        DecodeError::malformed_json(format!(
                            "key at {}..{} is out of container bounds",
                            key_offset,
                            key_offset + key_len
                        ))
                    })?;
                let key = from_utf8(key)
                    .map_err(|e| DecodeError::malformed_json(format!("invalid key: {}", e)))?;
                keys.push(key.to_owned());
            }
        }

        let mut values = Vec::with_capacity(element_count);
        for _ in 0..element_count {
            let value_type = eat_jsonb_type(&mut entries)?;
            let field = entries.eat(T::OFFSET_SIZE)?;
            let value = if value_type.is_inlined::<T>() {
                decode_scalar(value_type, &mut ParseBuf::new(field))?
            } else {
                let offset = ParseBuf::new(field).eat_uint_le(T::OFFSET_SIZE)? as usize;
                if offset < header_size || offset >= size {
                    return Err(DecodeError::malformed_json(format!(
                        "value offset {} is out of container bounds",
                        offset
                    )));
                }
                self.decode_value(value_type, &data[offset..], depth)?
            };
            values.push(value);
        }

        if U::IS_ARRAY {
            Ok(Json::Array(values))
        } else {
            let object = keys.into_iter().zip(values).collect::<Map<String, Json>>();
            Ok(Json::Object(object))
        }
    }
}

fn to_json_err(err: DecodeError) -> DecodeError {
    match err {
        e @ DecodeError::MalformedJson(_) => e,
        e => DecodeError::malformed_json(e.to_string()),
    }
}

fn eat_jsonb_type(buf: &mut ParseBuf<'_>) -> Result<JsonbType> {
    let byte = buf.eat_u8().map_err(to_json_err)?;
    JsonbType::try_from(byte).map_err(|e| DecodeError::malformed_json(e.to_string()))
}

fn decode_scalar(value_type: JsonbType, buf: &mut ParseBuf<'_>) -> Result<Json> {
    let value = match value_type {
        JsonbType::JSONB_TYPE_LITERAL => {
            let literal = buf.eat_u8().map_err(to_json_err)?;
            match LiteralType::try_from(literal)
                .map_err(|e| DecodeError::malformed_json(e.to_string()))?
            {
                LiteralType::JSONB_NULL_LITERAL => Json::Null,
                LiteralType::JSONB_TRUE_LITERAL => Json::Bool(true),
                LiteralType::JSONB_FALSE_LITERAL => Json::Bool(false),
            }
        }
        JsonbType::JSONB_TYPE_INT16 => Json::from(buf.eat_i16_le().map_err(to_json_err)?),
        JsonbType::JSONB_TYPE_UINT16 => Json::from(buf.eat_u16_le().map_err(to_json_err)?),
        JsonbType::JSONB_TYPE_INT32 => Json::from(buf.eat_i32_le().map_err(to_json_err)?),
        JsonbType::JSONB_TYPE_UINT32 => Json::from(buf.eat_u32_le().map_err(to_json_err)?),
        JsonbType::JSONB_TYPE_INT64 => Json::from(buf.eat_i64_le().map_err(to_json_err)?),
        JsonbType::JSONB_TYPE_UINT64 => Json::from(buf.eat_u64_le().map_err(to_json_err)?),
        JsonbType::JSONB_TYPE_DOUBLE => {
            let x = buf.eat_f64_le().map_err(to_json_err)?;
            Number::from_f64(x)
                .map(Json::Number)
                .ok_or_else(|| DecodeError::malformed_json(format!("non-finite double {}", x)))?
        }
        JsonbType::JSONB_TYPE_STRING => {
            let len = deserialize_variable_length(buf)? as usize;
            let bytes = buf.eat(len).map_err(to_json_err)?;
            let s = from_utf8(bytes)
                .map_err(|e| DecodeError::malformed_json(format!("invalid string: {}", e)))?;
            Json::String(s.to_owned())
        }
        JsonbType::JSONB_TYPE_OPAQUE => {
            let field_type = buf.eat_u8().map_err(to_json_err)?;
            let len = deserialize_variable_length(buf)? as usize;
            let data = buf.eat(len).map_err(to_json_err)?;
            decode_opaque(field_type, data)?
        }
        JsonbType::JSONB_TYPE_SMALL_OBJECT
        | JsonbType::JSONB_TYPE_LARGE_OBJECT
        | JsonbType::JSONB_TYPE_SMALL_ARRAY
        | JsonbType::JSONB_TYPE_LARGE_ARRAY => {
            return Err(DecodeError::malformed_json("container where scalar expected"))
        }
    };
    Ok(value)
}

/// Renders an opaque value the way MySql prints it in JSON text.
fn decode_opaque(field_type: u8, data: &[u8]) -> Result<Json> {
    let packed = || -> Result<i64> {
        ParseBuf::new(data).eat_i64_le().map_err(to_json_err)
    };

    match ColumnType::try_from(field_type) {
        Ok(ColumnType::MYSQL_TYPE_DATE) | Ok(ColumnType::MYSQL_TYPE_NEWDATE) => {
            let date = Temporal::from_int64_date_packed(packed()?);
            Ok(Json::String(date.to_string()))
        }
        Ok(ColumnType::MYSQL_TYPE_TIME) | Ok(ColumnType::MYSQL_TYPE_TIME2) => {
            let time = Temporal::from_int64_time_packed(packed()?);
            Ok(Json::String(format!("{:.6}", time)))
        }
        Ok(ColumnType::MYSQL_TYPE_DATETIME)
        | Ok(ColumnType::MYSQL_TYPE_DATETIME2)
        | Ok(ColumnType::MYSQL_TYPE_TIMESTAMP)
        | Ok(ColumnType::MYSQL_TYPE_TIMESTAMP2) => {
            let datetime = Temporal::from_int64_datetime_packed(packed()?);
            Ok(Json::String(format!("{:.6}", datetime)))
        }
        Ok(ColumnType::MYSQL_TYPE_NEWDECIMAL) => {
            let mut buf = ParseBuf::new(data);
            let precision = buf.eat_u8().map_err(to_json_err)?;
            let scale = buf.eat_u8().map_err(to_json_err)?;
            let decimal = decode_decimal(&mut buf, precision, scale).map_err(to_json_err)?;
            decimal
                .parse::<Number>()
                .map(Json::Number)
                .map_err(|e| DecodeError::malformed_json(format!("decimal {}: {}", decimal, e)))
        }
        _ => Ok(Json::String(format!(
            "base64:type{}:{}",
            field_type,
            STANDARD.encode(data)
        ))),
    }
}

/// Type of a complex jsonb value (array or object).
pub trait ComplexType {
    const IS_ARRAY: bool;

    /// Size of key and value entries of a single element.
    fn entries_size<T: StorageFormat>() -> usize;
}

/// An Object (see [`ComplexType`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Object;

impl ComplexType for Object {
    const IS_ARRAY: bool = false;

    fn entries_size<T: StorageFormat>() -> usize {
        T::KEY_ENTRY_SIZE + T::VALUE_ENTRY_SIZE
    }
}

/// An Array (see [`ComplexType`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Array;

impl ComplexType for Array {
    const IS_ARRAY: bool = true;

    fn entries_size<T: StorageFormat>() -> usize {
        T::VALUE_ENTRY_SIZE
    }
}

/// JSONB storage format for objects and arrays.
pub trait StorageFormat {
    const IS_LARGE: bool;
    /// The size of offset or size fields.
    const OFFSET_SIZE: usize;
    const KEY_ENTRY_SIZE: usize = Self::OFFSET_SIZE + 2;
    const VALUE_ENTRY_SIZE: usize = Self::OFFSET_SIZE + 1;

    fn eat_offset(buf: &mut ParseBuf<'_>) -> Result<u32>;
}

/// Small array/object storage format. See [`StorageFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Small;

impl StorageFormat for Small {
    const IS_LARGE: bool = false;
    const OFFSET_SIZE: usize = 2;

    fn eat_offset(buf: &mut ParseBuf<'_>) -> Result<u32> {
        buf.eat_u16_le().map(u32::from)
    }
}

/// Large array/object storage format. See [`StorageFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Large;

impl StorageFormat for Large {
    const IS_LARGE: bool = true;
    const OFFSET_SIZE: usize = 4;

    fn eat_offset(buf: &mut ParseBuf<'_>) -> Result<u32> {
        buf.eat_u32_le()
    }
}

/// 1-byte JSONB type marker
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum JsonbType {
    JSONB_TYPE_SMALL_OBJECT = 0x0,
    JSONB_TYPE_LARGE_OBJECT = 0x1,
    JSONB_TYPE_SMALL_ARRAY = 0x2,
    JSONB_TYPE_LARGE_ARRAY = 0x3,
    JSONB_TYPE_LITERAL = 0x4,
    JSONB_TYPE_INT16 = 0x5,
    JSONB_TYPE_UINT16 = 0x6,
    JSONB_TYPE_INT32 = 0x7,
    JSONB_TYPE_UINT32 = 0x8,
    JSONB_TYPE_INT64 = 0x9,
    JSONB_TYPE_UINT64 = 0xA,
    JSONB_TYPE_DOUBLE = 0xB,
    JSONB_TYPE_STRING = 0xC,
    JSONB_TYPE_OPAQUE = 0xF,
}

impl JsonbType {
    /// Values of these types are stored in the value entry instead of an offset.
    fn is_inlined<T: StorageFormat>(&self) -> bool {
        match self {
            JsonbType::JSONB_TYPE_LITERAL
            | JsonbType::JSONB_TYPE_INT16
            | JsonbType::JSONB_TYPE_UINT16 => true,
            JsonbType::JSONB_TYPE_INT32 | JsonbType::JSONB_TYPE_UINT32 => T::IS_LARGE,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("Unknown JSONB type {}", _0)]
#[repr(transparent)]
pub struct UnknownJsonbType(pub u8);

impl From<UnknownJsonbType> for u8 {
    fn from(x: UnknownJsonbType) -> Self {
        x.0
    }
}

impl TryFrom<u8> for JsonbType {
    type Error = UnknownJsonbType;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0x0 => Ok(Self::JSONB_TYPE_SMALL_OBJECT),
            0x1 => Ok(Self::JSONB_TYPE_LARGE_OBJECT),
            0x2 => Ok(Self::JSONB_TYPE_SMALL_ARRAY),
            0x3 => Ok(Self::JSONB_TYPE_LARGE_ARRAY),
            0x4 => Ok(Self::JSONB_TYPE_LITERAL),
            0x5 => Ok(Self::JSONB_TYPE_INT16),
            0x6 => Ok(Self::JSONB_TYPE_UINT16),
            0x7 => Ok(Self::JSONB_TYPE_INT32),
            0x8 => Ok(Self::JSONB_TYPE_UINT32),
            0x9 => Ok(Self::JSONB_TYPE_INT64),
            0xA => Ok(Self::JSONB_TYPE_UINT64),
            0xB => Ok(Self::JSONB_TYPE_DOUBLE),
            0xC => Ok(Self::JSONB_TYPE_STRING),
            0xF => Ok(Self::JSONB_TYPE_OPAQUE),
            x => Err(UnknownJsonbType(x)),
        }
    }
}

/// 1-byte JSONB literal type
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LiteralType {
    JSONB_NULL_LITERAL = 0x0,
    JSONB_TRUE_LITERAL = 0x1,
    JSONB_FALSE_LITERAL = 0x2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("Unknown JSONB literal type {}", _0)]
#[repr(transparent)]
pub struct UnknownLiteralType(pub u8);

impl From<UnknownLiteralType> for u8 {
    fn from(x: UnknownLiteralType) -> Self {
        x.0
    }
}

impl TryFrom<u8> for LiteralType {
    type Error = UnknownLiteralType;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0x0 => Ok(Self::JSONB_NULL_LITERAL),
            0x1 => Ok(Self::JSONB_TRUE_LITERAL),
            0x2 => Ok(Self::JSONB_FALSE_LITERAL),
            x => Err(UnknownLiteralType(x)),
        }
    }
}

/// Deserializes variable-length (an integer) that is used within JSONB.
pub fn deserialize_variable_length(buf: &mut ParseBuf<'_>) -> Result<u32> {
    // variable-length takes up to 5 bytes
    const MAX_REPR_LEN: usize = 5;

    let mut len = 0_u64;
    for i in 0..MAX_REPR_LEN {
        let byte = buf.eat_u8().map_err(to_json_err)? as u64;
        len |= (byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return u32::try_from(len).map_err(|_| {
                DecodeError::malformed_json("invalid variable-length value (> u32::MAX)")
            });
        }
    }

    Err(DecodeError::malformed_json(
        "invalid variable-length value (more than 5 bytes)",
    ))
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{test_support::*, *};

    #[test]
    fn should_decode_empty_as_null() {
        assert_eq!(decode_jsonb(&[], 100).unwrap(), Json::Null);
    }

    #[test]
    fn should_roundtrip_small_document() {
        let doc = json!({
            "zeta": 1,
            "alpha": [true, false, null, -32768, 65535, 2147483647, -9000000000_i64],
            "nested": {"pi": 3.5, "s": "ünïcode", "big": u64::MAX},
            "empty": {},
        });
        let bytes = encode_jsonb(&doc, false);
        assert_eq!(bytes[0], JsonbType::JSONB_TYPE_SMALL_OBJECT as u8);
        let decoded = decode_jsonb(&bytes, 100).unwrap();
        assert_eq!(decoded, doc);
        let keys = decoded.as_object().unwrap().keys().collect::<Vec<_>>();
        assert_eq!(keys, vec!["zeta", "alpha", "nested", "empty"]);
    }

    #[test]
    fn should_roundtrip_large_document() {
        let doc = json!({
            "blob": "x".repeat(70_000),
            "items": [1, 70000, "y"],
        });
        let bytes = encode_jsonb(&doc, false);
        assert!(bytes.len() > 65_536);
        assert_eq!(bytes[0], JsonbType::JSONB_TYPE_LARGE_OBJECT as u8);
        assert_eq!(decode_jsonb(&bytes, 100).unwrap(), doc);

        let doc = json!([1, 2, 100000, {"a": [null]}]);
        let bytes = encode_jsonb(&doc, true);
        assert_eq!(bytes[0], JsonbType::JSONB_TYPE_LARGE_ARRAY as u8);
        assert_eq!(decode_jsonb(&bytes, 100).unwrap(), doc);
    }

    #[test]
    fn should_decode_scalar_roots() {
        for doc in [json!("abc"), json!(42), json!(null), json!(1.25)] {
            assert_eq!(decode_jsonb(&encode_jsonb(&doc, false), 100).unwrap(), doc);
        }
    }

    #[test]
    fn should_limit_depth() {
        let mut doc = json!(1);
        for _ in 0..10 {
            doc = json!([doc]);
        }
        let bytes = encode_jsonb(&doc, false);
        assert_eq!(decode_jsonb(&bytes, 10).unwrap(), doc);
        assert!(matches!(
            decode_jsonb(&bytes, 9),
            Err(DecodeError::MalformedJson(_))
        ));
    }

    #[test]
    fn should_reject_bad_offsets() {
        let mut bytes = encode_jsonb(&json!({"a": "b"}), false);
        // value offset of the only entry
        bytes[1 + 4 + 4 + 1] = 0xff;
        assert!(matches!(
            decode_jsonb(&bytes, 100),
            Err(DecodeError::MalformedJson(_))
        ));

        let mut bytes = encode_jsonb(&json!([1]), false);
        // declared size exceeds the buffer
        bytes[3] = 0xff;
        assert!(matches!(
            decode_jsonb(&bytes, 100),
            Err(DecodeError::MalformedJson(_))
        ));

        assert!(matches!(
            decode_jsonb(&[0x0d, 0x00], 100),
            Err(DecodeError::MalformedJson(_))
        ));
    }

    #[test]
    fn should_decode_opaque_values() {
        fn opaque(field_type: u8, data: &[u8]) -> Vec<u8> {
            let mut out = vec![JsonbType::JSONB_TYPE_OPAQUE as u8, field_type];
            serialize_variable_length(data.len() as u32, &mut out);
            out.extend_from_slice(data);
            out
        }

        let ymd: i64 = (2014 * 13 + 12) << 5 | 27;
        let packed = (ymd << 17) << 24;
        let doc = opaque(ColumnType::MYSQL_TYPE_DATE as u8, &packed.to_le_bytes());
        assert_eq!(decode_jsonb(&doc, 100).unwrap(), json!("2014-12-27"));

        let hms: i64 = (838 << 12) | (59 << 6) | 59;
        let packed = -(hms << 24);
        let doc = opaque(ColumnType::MYSQL_TYPE_TIME as u8, &packed.to_le_bytes());
        assert_eq!(decode_jsonb(&doc, 100).unwrap(), json!("-838:59:59.000000"));

        let hms: i64 = (1 << 12) | (2 << 6) | 3;
        let packed = (((ymd << 17) | hms) << 24) + 500;
        let doc = opaque(ColumnType::MYSQL_TYPE_DATETIME as u8, &packed.to_le_bytes());
        assert_eq!(
            decode_jsonb(&doc, 100).unwrap(),
            json!("2014-12-27 01:02:03.000500")
        );

        let mut decimal = vec![5, 2];
        decimal.extend(crate::binlog::decimal::test_support::encode_decimal("-1.25", 5, 2));
        let doc = opaque(ColumnType::MYSQL_TYPE_NEWDECIMAL as u8, &decimal);
        assert_eq!(decode_jsonb(&doc, 100).unwrap(), json!(-1.25));

        let doc = opaque(ColumnType::MYSQL_TYPE_BLOB as u8, b"\x01\x02");
        assert_eq!(decode_jsonb(&doc, 100).unwrap(), json!("base64:type252:AQI="));
    }

    #[test]
    fn should_handle_variable_length() {
        for len in [0, 127, 128, 16_384, u32::MAX] {
            let mut out = Vec::new();
            serialize_variable_length(len, &mut out);
            assert_eq!(
                deserialize_variable_length(&mut ParseBuf::new(&out)).unwrap(),
                len
            );
        }
        let bad = [0x80; 6];
        assert!(deserialize_variable_length(&mut ParseBuf::new(&bad)).is_err());
    }
}
