// Copyright (c) 2017 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use std::fmt;

use bitvec::prelude::*;

use crate::binlog::time::Temporal;

pub mod convert;

/// Decoded value of a binlog row column.
#[derive(Clone, PartialEq)]
pub enum Value {
    Null,
    /// Signed integer column.
    Int(i64),
    /// Unsigned integer column, YEAR, or an ENUM/SET ordinal when labels are unknown.
    UInt(u64),
    /// FLOAT or DOUBLE column.
    Double(f64),
    /// Exact decimal string, padded to the column scale.
    Decimal(String),
    /// Character data decoded according to the column charset.
    Text(String),
    /// Binary data, or character data that is not valid in its charset.
    Bytes(Vec<u8>),
    Temporal(Temporal),
    Bit(BitValue),
    /// ENUM label.
    Enum(String),
    /// Selected SET labels in declaration order.
    Set(Vec<String>),
    Json(serde_json::Value),
    /// GEOMETRY column: SRID followed by WKB payload.
    Geometry { srid: u32, wkb: Vec<u8> },
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the value as `i64` if it is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(x) => Some(x),
            Value::UInt(x) => i64::try_from(x).ok(),
            _ => None,
        }
    }

    /// Returns the value as `u64` if it is a non-negative integer or a BIT of <= 64 bits.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(x) => Some(*x),
            Value::Int(x) => u64::try_from(*x).ok(),
            Value::Bit(x) => x.to_u64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Double(x) => Some(x),
            _ => None,
        }
    }

    /// Returns textual content of `Text`, `Decimal` and `Enum` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(x) | Value::Decimal(x) | Value::Enum(x) => Some(x),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(x) => Some(x),
            Value::Text(x) => Some(x.as_bytes()),
            Value::Geometry { wkb, .. } => Some(wkb),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.debug_tuple("Null").finish(),
            Value::Int(x) => f.debug_tuple("Int").field(x).finish(),
            Value::UInt(x) => f.debug_tuple("UInt").field(x).finish(),
            Value::Double(x) => f.debug_tuple("Double").field(x).finish(),
            Value::Decimal(x) => f.debug_tuple("Decimal").field(x).finish(),
            Value::Text(x) => f.debug_tuple("Text").field(x).finish(),
            Value::Bytes(bytes) => {
                let mut debug = f.debug_tuple("Bytes");
                if bytes.len() <= 8 {
                    debug
                        .field(&String::from_utf8_lossy(bytes).replace('\n', "\\n"))
                        .finish()
                } else {
                    let bytes = String::from_utf8_lossy(&bytes[..8]).replace('\n', "\\n");
                    debug.field(&format!("{}..", bytes)).finish()
                }
            }
            Value::Temporal(x) => f.debug_tuple("Temporal").field(&format_args!("'{:.6}'", x)).finish(),
            Value::Bit(x) => f.debug_tuple("Bit").field(x).finish(),
            Value::Enum(x) => f.debug_tuple("Enum").field(x).finish(),
            Value::Set(x) => f.debug_tuple("Set").field(x).finish(),
            Value::Json(x) => f.debug_tuple("Json").field(x).finish(),
            Value::Geometry { srid, wkb } => f
                .debug_struct("Geometry")
                .field("srid", srid)
                .field("wkb_len", &wkb.len())
                .finish(),
        }
    }
}

/// Value of a `BIT(width)` column.
///
/// Bytes are stored as logged: big-endian, most significant bit first, the unused high bits
/// of the first byte are zero.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitValue {
    width: usize,
    bytes: Vec<u8>,
}

impl BitValue {
    pub fn new(width: usize, bytes: Vec<u8>) -> Self {
        Self { width, bytes }
    }

    /// Declared width in bits.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns bit `k` (1-indexed, `1` is the least significant bit).
    pub fn bit(&self, k: usize) -> bool {
        if k == 0 || k > self.bytes.len() * 8 {
            return false;
        }
        let byte = self.bytes.len() - 1 - (k - 1) / 8;
        self.bytes[byte] & (1 << ((k - 1) % 8)) != 0
    }

    /// Returns exactly `width` bits, most significant first.
    pub fn bits(&self) -> BitVec<u8, Msb0> {
        let all = BitSlice::<u8, Msb0>::from_slice(&self.bytes);
        let skip = all.len().saturating_sub(self.width);
        all[skip..].to_bitvec()
    }

    /// Interprets the value as an unsigned integer.
    ///
    /// Returns `None` if there are set bits above the 64th.
    pub fn to_u64(&self) -> Option<u64> {
        let first_set = self
            .bytes
            .iter()
            .position(|x| *x != 0)
            .unwrap_or(self.bytes.len());
        let significant = &self.bytes[first_set..];
        if significant.len() > 8 {
            return None;
        }
        Some(
            significant
                .iter()
                .fold(0_u64, |acc, byte| (acc << 8) | *byte as u64),
        )
    }
}

impl fmt::Debug for BitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b'")?;
        for bit in self.bits().iter() {
            f.write_str(if *bit { "1" } else { "0" })?;
        }
        write!(f, "'")
    }
}
