// Copyright (c) 2017 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

/// Type of MySql column field as it appears in the binlog.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
#[repr(u8)]
pub enum ColumnType {
    MYSQL_TYPE_DECIMAL = 0,
    MYSQL_TYPE_TINY,
    MYSQL_TYPE_SHORT,
    MYSQL_TYPE_LONG,
    MYSQL_TYPE_FLOAT,
    MYSQL_TYPE_DOUBLE,
    MYSQL_TYPE_NULL,
    MYSQL_TYPE_TIMESTAMP,
    MYSQL_TYPE_LONGLONG,
    MYSQL_TYPE_INT24,
    MYSQL_TYPE_DATE,
    MYSQL_TYPE_TIME,
    MYSQL_TYPE_DATETIME,
    MYSQL_TYPE_YEAR,
    /// Internal to MySql. Not used in protocol
    MYSQL_TYPE_NEWDATE,
    MYSQL_TYPE_VARCHAR,
    MYSQL_TYPE_BIT,
    MYSQL_TYPE_TIMESTAMP2,
    MYSQL_TYPE_DATETIME2,
    MYSQL_TYPE_TIME2,
    /// Used for replication only
    MYSQL_TYPE_TYPED_ARRAY,
    MYSQL_TYPE_JSON = 245,
    MYSQL_TYPE_NEWDECIMAL = 246,
    MYSQL_TYPE_ENUM = 247,
    MYSQL_TYPE_SET = 248,
    MYSQL_TYPE_TINY_BLOB = 249,
    MYSQL_TYPE_MEDIUM_BLOB = 250,
    MYSQL_TYPE_LONG_BLOB = 251,
    MYSQL_TYPE_BLOB = 252,
    MYSQL_TYPE_VAR_STRING = 253,
    MYSQL_TYPE_STRING = 254,
    MYSQL_TYPE_GEOMETRY = 255,
}

impl ColumnType {
    pub fn is_numeric_type(&self) -> bool {
        use ColumnType::*;
        matches!(
            self,
            MYSQL_TYPE_TINY
                | MYSQL_TYPE_SHORT
                | MYSQL_TYPE_INT24
                | MYSQL_TYPE_LONG
                | MYSQL_TYPE_LONGLONG
                | MYSQL_TYPE_NEWDECIMAL
                | MYSQL_TYPE_FLOAT
                | MYSQL_TYPE_DOUBLE
        )
    }

    /// Character columns as counted by `COLUMN_CHARSET` optional metadata.
    ///
    /// ENUM and SET are sent as `MYSQL_TYPE_STRING` but are not counted here, so the real type
    /// from the column metadata is needed (see [`ColumnType::real_type`]).
    pub fn is_character_type(&self) -> bool {
        use ColumnType::*;
        matches!(
            self,
            MYSQL_TYPE_STRING
                | MYSQL_TYPE_VAR_STRING
                | MYSQL_TYPE_VARCHAR
                | MYSQL_TYPE_BLOB
                | MYSQL_TYPE_TINY_BLOB
                | MYSQL_TYPE_MEDIUM_BLOB
                | MYSQL_TYPE_LONG_BLOB
        )
    }

    pub fn is_enum_type(&self) -> bool {
        matches!(self, ColumnType::MYSQL_TYPE_ENUM)
    }

    pub fn is_set_type(&self) -> bool {
        matches!(self, ColumnType::MYSQL_TYPE_SET)
    }

    pub fn is_enum_or_set_type(&self) -> bool {
        self.is_enum_type() || self.is_set_type()
    }

    pub fn is_geometry_type(&self) -> bool {
        matches!(self, ColumnType::MYSQL_TYPE_GEOMETRY)
    }

    /// Returns the length of type-specific metadata stored in a table map event.
    ///
    /// Returns `None` for type codes that never appear in a table map.
    pub fn metadata_len(&self) -> Option<usize> {
        use ColumnType::*;
        match self {
            MYSQL_TYPE_FLOAT | MYSQL_TYPE_DOUBLE => Some(1),
            MYSQL_TYPE_BLOB | MYSQL_TYPE_TINY_BLOB | MYSQL_TYPE_MEDIUM_BLOB
            | MYSQL_TYPE_LONG_BLOB | MYSQL_TYPE_GEOMETRY | MYSQL_TYPE_JSON => Some(1),
            MYSQL_TYPE_TIME2 | MYSQL_TYPE_DATETIME2 | MYSQL_TYPE_TIMESTAMP2 => Some(1),
            MYSQL_TYPE_VARCHAR | MYSQL_TYPE_VAR_STRING | MYSQL_TYPE_STRING => Some(2),
            MYSQL_TYPE_DECIMAL | MYSQL_TYPE_NEWDECIMAL => Some(2),
            MYSQL_TYPE_BIT | MYSQL_TYPE_ENUM | MYSQL_TYPE_SET => Some(2),
            MYSQL_TYPE_TINY | MYSQL_TYPE_SHORT | MYSQL_TYPE_INT24 | MYSQL_TYPE_LONG
            | MYSQL_TYPE_LONGLONG | MYSQL_TYPE_NULL | MYSQL_TYPE_TIMESTAMP | MYSQL_TYPE_DATE
            | MYSQL_TYPE_TIME | MYSQL_TYPE_DATETIME | MYSQL_TYPE_YEAR | MYSQL_TYPE_NEWDATE => {
                Some(0)
            }
            MYSQL_TYPE_TYPED_ARRAY => None,
        }
    }

    /// Resolves the real type of a column.
    ///
    /// ENUM and SET columns are logged as `MYSQL_TYPE_STRING` with the real type in the first
    /// metadata byte.
    pub fn real_type(&self, metadata: &[u8]) -> ColumnType {
        match (self, metadata.first()) {
            (ColumnType::MYSQL_TYPE_STRING, Some(&real))
                if real == ColumnType::MYSQL_TYPE_ENUM as u8
                    || real == ColumnType::MYSQL_TYPE_SET as u8 =>
            {
                ColumnType::try_from(real).unwrap_or(*self)
            }
            (ColumnType::MYSQL_TYPE_DATE, _) => ColumnType::MYSQL_TYPE_NEWDATE,
            _ => *self,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("Unknown column type {}", _0)]
#[repr(transparent)]
pub struct UnknownColumnType(pub u8);

impl From<UnknownColumnType> for u8 {
    fn from(x: UnknownColumnType) -> Self {
        x.0
    }
}

impl TryFrom<u8> for ColumnType {
    type Error = UnknownColumnType;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        use ColumnType::*;
        match byte {
            0x00_u8 => Ok(MYSQL_TYPE_DECIMAL),
            0x01_u8 => Ok(MYSQL_TYPE_TINY),
            0x02_u8 => Ok(MYSQL_TYPE_SHORT),
            0x03_u8 => Ok(MYSQL_TYPE_LONG),
            0x04_u8 => Ok(MYSQL_TYPE_FLOAT),
            0x05_u8 => Ok(MYSQL_TYPE_DOUBLE),
            0x06_u8 => Ok(MYSQL_TYPE_NULL),
            0x07_u8 => Ok(MYSQL_TYPE_TIMESTAMP),
            0x08_u8 => Ok(MYSQL_TYPE_LONGLONG),
            0x09_u8 => Ok(MYSQL_TYPE_INT24),
            0x0a_u8 => Ok(MYSQL_TYPE_DATE),
            0x0b_u8 => Ok(MYSQL_TYPE_TIME),
            0x0c_u8 => Ok(MYSQL_TYPE_DATETIME),
            0x0d_u8 => Ok(MYSQL_TYPE_YEAR),
            0x0e_u8 => Ok(MYSQL_TYPE_NEWDATE),
            0x0f_u8 => Ok(MYSQL_TYPE_VARCHAR),
            0x10_u8 => Ok(MYSQL_TYPE_BIT),
            0x11_u8 => Ok(MYSQL_TYPE_TIMESTAMP2),
            0x12_u8 => Ok(MYSQL_TYPE_DATETIME2),
            0x13_u8 => Ok(MYSQL_TYPE_TIME2),
            0x14_u8 => Ok(MYSQL_TYPE_TYPED_ARRAY),
            0xf5_u8 => Ok(MYSQL_TYPE_JSON),
            0xf6_u8 => Ok(MYSQL_TYPE_NEWDECIMAL),
            0xf7_u8 => Ok(MYSQL_TYPE_ENUM),
            0xf8_u8 => Ok(MYSQL_TYPE_SET),
            0xf9_u8 => Ok(MYSQL_TYPE_TINY_BLOB),
            0xfa_u8 => Ok(MYSQL_TYPE_MEDIUM_BLOB),
            0xfb_u8 => Ok(MYSQL_TYPE_LONG_BLOB),
            0xfc_u8 => Ok(MYSQL_TYPE_BLOB),
            0xfd_u8 => Ok(MYSQL_TYPE_VAR_STRING),
            0xfe_u8 => Ok(MYSQL_TYPE_STRING),
            0xff_u8 => Ok(MYSQL_TYPE_GEOMETRY),
            x => Err(UnknownColumnType(x)),
        }
    }
}

/// Collation id of the `binary` pseudo-charset.
pub const BINARY_COLLATION: u16 = 63;

/// Character set family of a collation id, as far as value decoding cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    /// `binary`: values are raw bytes.
    Binary,
    /// Single-byte latin1 family.
    Latin1,
    /// 3-byte `utf8`/`utf8mb3`.
    Utf8,
    /// 4-byte `utf8mb4` (MySql >= 5.5.3).
    Utf8mb4,
    /// ASCII-compatible charsets this crate does not transcode.
    Other,
}

impl Charset {
    /// Maps a collation id to its character set.
    pub fn from_collation(id: u16) -> Self {
        match id {
            BINARY_COLLATION => Charset::Binary,
            5 | 8 | 15 | 31 | 47 | 48 | 49 | 94 => Charset::Latin1,
            33 | 83 | 192..=215 | 223 | 76 => Charset::Utf8,
            45 | 46 | 224..=247 | 255..=323 => Charset::Utf8mb4,
            _ => Charset::Other,
        }
    }
}
