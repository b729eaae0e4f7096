// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Column value codecs.
//!
//! Every column type is decoded by [`decode_value`] given a [`ColumnCtx`] that carries the
//! type metadata from the table map event plus whatever is known about the column definition.

use crate::{
    constants::{Charset, ColumnType},
    error::{DecodeError, Result},
    io::ParseBuf,
    opts::{CharPadding, DecoderOptions, LabelPolicy, ServerVersion},
    value::{BitValue, Value},
};

use super::{decimal::decode_decimal, jsonb::decode_jsonb, time::Temporal};

/// Everything a codec needs to know about a column.
#[derive(Debug, Clone, Copy)]
pub struct ColumnCtx<'a> {
    /// Column index in the table.
    pub index: usize,
    /// Type code as logged.
    pub type_code: u8,
    /// Real column type (see [`ColumnType::real_type`]).
    pub column_type: ColumnType,
    pub metadata: &'a [u8],
    pub unsigned: bool,
    pub collation: Option<u16>,
    pub labels: Option<&'a [String]>,
    pub opts: &'a DecoderOptions,
}

impl<'a> ColumnCtx<'a> {
    fn unsupported(&self) -> DecodeError {
        DecodeError::UnsupportedType {
            type_code: self.type_code,
            column: self.index,
        }
    }

    fn meta(&self, i: usize) -> Result<u8> {
        self.metadata.get(i).copied().ok_or_else(|| {
            DecodeError::malformed(format!(
                "missing metadata byte {} for {:?}",
                i, self.column_type
            ))
        })
    }

    fn require(&self, version: ServerVersion) -> Result<()> {
        if self.opts.server_version().supports(version) {
            Ok(())
        } else {
            Err(self.unsupported())
        }
    }

    fn charset(&self) -> Option<Charset> {
        self.collation
            .or(self.opts.default_collation())
            .map(Charset::from_collation)
    }
}

/// Decodes a single non-NULL column value.
pub fn decode_value(ctx: &ColumnCtx<'_>, buf: &mut ParseBuf<'_>) -> Result<Value> {
    use ColumnType::*;

    match ctx.column_type {
        MYSQL_TYPE_NULL => Ok(Value::Null),
        MYSQL_TYPE_TINY => Ok(if ctx.unsigned {
            Value::UInt(buf.eat_u8()? as u64)
        } else {
            Value::Int(buf.eat_i8()? as i64)
        }),
        MYSQL_TYPE_SHORT => Ok(if ctx.unsigned {
            Value::UInt(buf.eat_u16_le()? as u64)
        } else {
            Value::Int(buf.eat_i16_le()? as i64)
        }),
        MYSQL_TYPE_INT24 => Ok(if ctx.unsigned {
            Value::UInt(buf.eat_u24_le()? as u64)
        } else {
            Value::Int(buf.eat_i24_le()? as i64)
        }),
        MYSQL_TYPE_LONG => Ok(if ctx.unsigned {
            Value::UInt(buf.eat_u32_le()? as u64)
        } else {
            Value::Int(buf.eat_i32_le()? as i64)
        }),
        MYSQL_TYPE_LONGLONG => Ok(if ctx.unsigned {
            Value::UInt(buf.eat_u64_le()?)
        } else {
            Value::Int(buf.eat_i64_le()?)
        }),
        MYSQL_TYPE_FLOAT => Ok(Value::Double(buf.eat_f32_le()? as f64)),
        MYSQL_TYPE_DOUBLE => Ok(Value::Double(buf.eat_f64_le()?)),
        MYSQL_TYPE_DECIMAL | MYSQL_TYPE_NEWDECIMAL => {
            decode_decimal(buf, ctx.meta(0)?, ctx.meta(1)?).map(Value::Decimal)
        }
        MYSQL_TYPE_BIT => {
            let width = ctx.meta(1)? as usize * 8 + ctx.meta(0)? as usize;
            let bytes = buf.eat((width + 7) / 8)?;
            Ok(Value::Bit(BitValue::new(width, bytes.to_vec())))
        }
        MYSQL_TYPE_ENUM => decode_enum(ctx, buf),
        MYSQL_TYPE_SET => decode_set(ctx, buf),
        MYSQL_TYPE_YEAR => {
            let year = buf.eat_u8()?;
            Ok(Value::UInt(if year == 0 { 0 } else { year as u64 + 1900 }))
        }
        MYSQL_TYPE_DATE | MYSQL_TYPE_NEWDATE => Temporal::read_date(buf).map(Value::Temporal),
        MYSQL_TYPE_TIME => Temporal::read_time(buf).map(Value::Temporal),
        MYSQL_TYPE_DATETIME => Temporal::read_datetime(buf).map(Value::Temporal),
        MYSQL_TYPE_TIMESTAMP => Temporal::read_timestamp(buf).map(Value::Temporal),
        MYSQL_TYPE_TIME2 | MYSQL_TYPE_DATETIME2 | MYSQL_TYPE_TIMESTAMP2 => {
            ctx.require(ServerVersion::FRACTIONAL_TEMPORAL)?;
            let fsp = ctx.meta(0)?;
            if fsp > 6 {
                return Err(DecodeError::malformed(format!(
                    "invalid fractional second precision {}",
                    fsp
                )));
            }
            let value = match ctx.column_type {
                MYSQL_TYPE_TIME2 => Temporal::read_time2(buf, fsp)?,
                MYSQL_TYPE_DATETIME2 => Temporal::read_datetime2(buf, fsp)?,
                _ => Temporal::read_timestamp2(buf, fsp)?,
            };
            Ok(Value::Temporal(value))
        }
        MYSQL_TYPE_VARCHAR | MYSQL_TYPE_VAR_STRING => {
            let max_len = u16::from_le_bytes([ctx.meta(0)?, ctx.meta(1)?]);
            let data = buf.eat_len_prefixed(if max_len < 256 { 1 } else { 2 })?;
            decode_text(ctx, data, false)
        }
        MYSQL_TYPE_STRING => {
            let (byte0, byte1) = (ctx.meta(0)?, ctx.meta(1)?);
            let max_len = if byte0 & 0x30 != 0x30 {
                (((byte0 & 0x30) ^ 0x30) as usize) << 4 | byte1 as usize
            } else {
                byte1 as usize
            };
            let data = buf.eat_len_prefixed(if max_len < 256 { 1 } else { 2 })?;
            decode_text(ctx, data, true)
        }
        MYSQL_TYPE_TINY_BLOB | MYSQL_TYPE_MEDIUM_BLOB | MYSQL_TYPE_LONG_BLOB | MYSQL_TYPE_BLOB => {
            let data = eat_blob(ctx, buf)?;
            decode_text(ctx, data, false)
        }
        MYSQL_TYPE_JSON => {
            ctx.require(ServerVersion::JSON)?;
            let data = eat_blob(ctx, buf)?;
            decode_jsonb(data, ctx.opts.max_json_depth()).map(Value::Json)
        }
        MYSQL_TYPE_GEOMETRY => {
            let mut data = ParseBuf::new(eat_blob(ctx, buf)?);
            let srid = data.eat_u32_le()?;
            Ok(Value::Geometry {
                srid,
                wkb: data.eat_all().to_vec(),
            })
        }
        MYSQL_TYPE_TYPED_ARRAY => Err(ctx.unsupported()),
    }
}

/// Reads a BLOB-like value, prefixed with a 1 to 4 byte length.
fn eat_blob<'a>(ctx: &ColumnCtx<'_>, buf: &mut ParseBuf<'a>) -> Result<&'a [u8]> {
    buf.eat_len_prefixed(ctx.meta(0)? as usize)
}

/// MySql `latin1` is cp1252 (undefined cp1252 bytes map to C1 controls).
const LATIN1_80_9F: [char; 32] = [
    '\u{20ac}', '\u{0081}', '\u{201a}', '\u{0192}', '\u{201e}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02c6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008d}', '\u{017d}', '\u{008f}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201c}', '\u{201d}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02dc}', '\u{2122}', '\u{0161}', '\u{203a}', '\u{0153}', '\u{009d}', '\u{017e}', '\u{0178}',
];

fn latin1_char(x: u8) -> char {
    match x {
        0x80..=0x9f => LATIN1_80_9F[(x - 0x80) as usize],
        _ => x as char,
    }
}

fn decode_text(ctx: &ColumnCtx<'_>, data: &[u8], is_char: bool) -> Result<Value> {
    let charset = ctx.charset();
    if charset == Some(Charset::Utf8mb4) {
        ctx.require(ServerVersion::UTF8MB4)?;
    }

    let text = match charset {
        Some(Charset::Binary) => return Ok(Value::Bytes(data.to_vec())),
        Some(Charset::Latin1) => data.iter().map(|&x| latin1_char(x)).collect::<String>(),
        _ => match std::str::from_utf8(data) {
            Ok(text) => text.to_owned(),
            Err(err) => {
                if charset.is_some() {
                    tracing::warn!(
                        column = ctx.index,
                        error = %err,
                        "column data is not valid in its charset, emitting bytes"
                    );
                }
                return Ok(Value::Bytes(data.to_vec()));
            }
        },
    };

    match ctx.opts.char_padding() {
        CharPadding::TrimTrailingSpaces if is_char => {
            Ok(Value::Text(text.trim_end_matches(' ').to_owned()))
        }
        _ => Ok(Value::Text(text)),
    }
}

fn decode_enum(ctx: &ColumnCtx<'_>, buf: &mut ParseBuf<'_>) -> Result<Value> {
    let ordinal = match ctx.meta(1)? {
        len @ 1..=2 => buf.eat_uint_le(len as usize)?,
        len => {
            return Err(DecodeError::malformed(format!(
                "invalid ENUM pack length {}",
                len
            )))
        }
    };

    let labels = match ctx.labels {
        Some(labels) => labels,
        None => return missing_labels(ctx, ordinal),
    };

    match ordinal {
        // invalid value inserted in non-strict mode
        0 => Ok(Value::Enum(String::new())),
        n => labels
            .get(n as usize - 1)
            .cloned()
            .map(Value::Enum)
            .ok_or_else(|| {
                DecodeError::malformed(format!(
                    "ENUM ordinal {} out of {} label(s)",
                    n,
                    labels.len()
                ))
            }),
    }
}

fn decode_set(ctx: &ColumnCtx<'_>, buf: &mut ParseBuf<'_>) -> Result<Value> {
    let mask = match ctx.meta(1)? {
        len @ 1..=8 => buf.eat_uint_le(len as usize)?,
        len => {
            return Err(DecodeError::malformed(format!(
                "invalid SET pack length {}",
                len
            )))
        }
    };

    let labels = match ctx.labels {
        Some(labels) => labels,
        None => return missing_labels(ctx, mask),
    };

    if labels.len() < 64 && mask >> labels.len() != 0 {
        return Err(DecodeError::malformed(format!(
            "SET bitmask {:#x} exceeds {} label(s)",
            mask,
            labels.len()
        )));
    }

    Ok(Value::Set(
        labels
            .iter()
            .take(64)
            .enumerate()
            .filter(|(i, _)| mask & (1_u64 << i) != 0)
            .map(|(_, label)| label.clone())
            .collect(),
    ))
}

fn missing_labels(ctx: &ColumnCtx<'_>, raw: u64) -> Result<Value> {
    match ctx.opts.label_policy() {
        LabelPolicy::Ordinal => Ok(Value::UInt(raw)),
        LabelPolicy::Error => Err(DecodeError::MissingLabels { column: ctx.index }),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::binlog::{decimal::test_support::encode_decimal, jsonb::test_support::encode_jsonb};

    struct Column {
        column_type: ColumnType,
        metadata: Vec<u8>,
        unsigned: bool,
        collation: Option<u16>,
        labels: Option<Vec<String>>,
        opts: DecoderOptions,
    }

    impl Column {
        fn new(column_type: ColumnType, metadata: &[u8]) -> Self {
            Self {
                column_type,
                metadata: metadata.to_vec(),
                unsigned: false,
                collation: None,
                labels: None,
                opts: DecoderOptions::default(),
            }
        }

        fn unsigned(mut self) -> Self {
            self.unsigned = true;
            self
        }

        fn collation(mut self, collation: u16) -> Self {
            self.collation = Some(collation);
            self
        }

        fn labels(mut self, labels: &[&str]) -> Self {
            self.labels = Some(labels.iter().map(|x| x.to_string()).collect());
            self
        }

        fn opts(mut self, opts: DecoderOptions) -> Self {
            self.opts = opts;
            self
        }

        fn decode(&self, bytes: &[u8]) -> Result<Value> {
            let ctx = ColumnCtx {
                index: 0,
                type_code: self.column_type as u8,
                column_type: self.column_type,
                metadata: &self.metadata,
                unsigned: self.unsigned,
                collation: self.collation,
                labels: self.labels.as_deref(),
                opts: &self.opts,
            };
            let mut buf = ParseBuf::new(bytes);
            let value = decode_value(&ctx, &mut buf)?;
            assert!(buf.is_empty(), "{} byte(s) left", buf.remaining());
            Ok(value)
        }
    }

    fn prefixed(width: usize, data: &[u8]) -> Vec<u8> {
        let mut out = (data.len() as u32).to_le_bytes()[..width].to_vec();
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn should_decode_integer_boundaries() {
        use ColumnType::*;

        let cases: &[(ColumnType, &[u8], Value, Value)] = &[
            (MYSQL_TYPE_TINY, &[0x80], Value::Int(-128), Value::UInt(128)),
            (MYSQL_TYPE_TINY, &[0x7f], Value::Int(127), Value::UInt(127)),
            (
                MYSQL_TYPE_SHORT,
                &[0x00, 0x80],
                Value::Int(-32768),
                Value::UInt(32768),
            ),
            (
                MYSQL_TYPE_INT24,
                &[0x00, 0x00, 0x80],
                Value::Int(-8388608),
                Value::UInt(8388608),
            ),
            (
                MYSQL_TYPE_INT24,
                &[0xff, 0xff, 0xff],
                Value::Int(-1),
                Value::UInt(16777215),
            ),
            (
                MYSQL_TYPE_LONG,
                &[0x00, 0x00, 0x00, 0x80],
                Value::Int(-2147483648),
                Value::UInt(2147483648),
            ),
            (
                MYSQL_TYPE_LONGLONG,
                &[0xff; 8],
                Value::Int(-1),
                Value::UInt(u64::MAX),
            ),
            (
                MYSQL_TYPE_LONGLONG,
                &[0, 0, 0, 0, 0, 0, 0, 0x80],
                Value::Int(i64::MIN),
                Value::UInt(1 << 63),
            ),
        ];

        for (ty, bytes, signed, unsigned) in cases {
            assert_eq!(&Column::new(*ty, &[]).decode(bytes).unwrap(), signed);
            assert_eq!(
                &Column::new(*ty, &[]).unsigned().decode(bytes).unwrap(),
                unsigned
            );
        }
    }

    proptest! {
        #[test]
        fn longlong_roundtrip(x: i64) {
            let col = Column::new(ColumnType::MYSQL_TYPE_LONGLONG, &[]);
            prop_assert_eq!(col.decode(&x.to_le_bytes()).unwrap(), Value::Int(x));
        }

        #[test]
        fn long_unsigned_roundtrip(x: u32) {
            let col = Column::new(ColumnType::MYSQL_TYPE_LONG, &[]).unsigned();
            prop_assert_eq!(col.decode(&x.to_le_bytes()).unwrap(), Value::UInt(x as u64));
        }

        #[test]
        fn int24_roundtrip(x in -8388608_i32..8388608) {
            let col = Column::new(ColumnType::MYSQL_TYPE_INT24, &[]);
            prop_assert_eq!(col.decode(&x.to_le_bytes()[..3]).unwrap(), Value::Int(x as i64));
        }

        #[test]
        fn double_roundtrip(x in any::<f64>().prop_filter("nan", |x| !x.is_nan())) {
            let col = Column::new(ColumnType::MYSQL_TYPE_DOUBLE, &[8]);
            prop_assert_eq!(col.decode(&x.to_le_bytes()).unwrap(), Value::Double(x));
        }
    }

    #[test]
    fn should_decode_float() {
        let col = Column::new(ColumnType::MYSQL_TYPE_FLOAT, &[4]);
        assert_eq!(
            col.decode(&1.5_f32.to_le_bytes()).unwrap(),
            Value::Double(1.5)
        );
    }

    #[test]
    fn should_decode_decimal() {
        let col = Column::new(ColumnType::MYSQL_TYPE_NEWDECIMAL, &[30, 10]);
        assert_eq!(
            col.decode(&encode_decimal("-13.47", 30, 10)).unwrap(),
            Value::Decimal("-13.4700000000".into())
        );
        let col = Column::new(ColumnType::MYSQL_TYPE_NEWDECIMAL, &[30, 20]);
        assert_eq!(
            col.decode(&encode_decimal("1.01234567890123456789", 30, 20))
                .unwrap(),
            Value::Decimal("1.01234567890123456789".into())
        );
    }

    #[test]
    fn should_decode_bit() {
        // BIT(64): metadata is (bits % 8, bytes)
        let col = Column::new(ColumnType::MYSQL_TYPE_BIT, &[0, 8]);
        let value = col.decode(&[0x80, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        match value {
            Value::Bit(bit) => {
                assert_eq!(bit.width(), 64);
                assert!(bit.bit(64));
                assert!((1..64).all(|k| !bit.bit(k)));
                assert_eq!(bit.to_u64(), Some(1 << 63));
            }
            other => panic!("unexpected {:?}", other),
        }

        let col = Column::new(ColumnType::MYSQL_TYPE_BIT, &[0, 4]);
        let value = col.decode(&[0x80, 0, 0, 0]).unwrap();
        assert_eq!(value.as_u64(), Some(1 << 31));

        let col = Column::new(ColumnType::MYSQL_TYPE_BIT, &[3, 0]);
        let value = col.decode(&[0b101]).unwrap();
        assert_eq!(value, Value::Bit(BitValue::new(3, vec![0b101])));
    }

    #[test]
    fn should_decode_set_in_declaration_order() {
        let labels = (b'a'..=b'z')
            .chain(b'A'..=b'Z')
            .map(|x| (x as char).to_string())
            .collect::<Vec<_>>();
        let labels = labels.iter().map(String::as_str).collect::<Vec<_>>();
        let col = Column::new(ColumnType::MYSQL_TYPE_SET, &[0xf8, 8]).labels(&labels);

        // 'a', 'd', 'Z' selected in any order
        let mask: u64 = 1 | 1 << 3 | 1 << 51;
        assert_eq!(
            col.decode(&mask.to_le_bytes()).unwrap(),
            Value::Set(vec!["a".into(), "d".into(), "Z".into()])
        );
        assert_eq!(col.decode(&[0; 8]).unwrap(), Value::Set(vec![]));

        let col = Column::new(ColumnType::MYSQL_TYPE_SET, &[0xf8, 1]).labels(&["x", "y"]);
        assert!(matches!(
            col.decode(&[0b100]).unwrap_err(),
            DecodeError::Malformed(_)
        ));
    }

    #[test]
    fn should_decode_enum() {
        let col = Column::new(ColumnType::MYSQL_TYPE_ENUM, &[0xf7, 1]).labels(&["new", "done"]);
        assert_eq!(col.decode(&[2]).unwrap(), Value::Enum("done".into()));
        assert_eq!(col.decode(&[0]).unwrap(), Value::Enum("".into()));
        assert!(col.decode(&[3]).is_err());

        let col = Column::new(ColumnType::MYSQL_TYPE_ENUM, &[0xf7, 2]).labels(&["a"]);
        assert_eq!(col.decode(&[1, 0]).unwrap(), Value::Enum("a".into()));
    }

    #[test]
    fn should_follow_label_policy() {
        let col = Column::new(ColumnType::MYSQL_TYPE_ENUM, &[0xf7, 1]);
        assert_eq!(col.decode(&[2]).unwrap(), Value::UInt(2));

        let col = Column::new(ColumnType::MYSQL_TYPE_SET, &[0xf8, 2]);
        assert_eq!(col.decode(&[0x05, 0x01]).unwrap(), Value::UInt(0x105));

        let col = Column::new(ColumnType::MYSQL_TYPE_SET, &[0xf8, 1])
            .opts(DecoderOptions::new().with_label_policy(LabelPolicy::Error));
        assert!(matches!(
            col.decode(&[1]).unwrap_err(),
            DecodeError::MissingLabels { column: 0 }
        ));
    }

    #[test]
    fn should_decode_strings() {
        // VARCHAR(100) utf8mb4: max length 400 bytes, 2-byte prefix
        let col = Column::new(ColumnType::MYSQL_TYPE_VARCHAR, &[0x90, 0x01]).collation(255);
        let data = prefixed(2, "𠜎".as_bytes());
        assert_eq!(col.decode(&data).unwrap(), Value::Text("𠜎".into()));

        let col = Column::new(ColumnType::MYSQL_TYPE_VARCHAR, &[0x20, 0x00]).collation(8);
        assert_eq!(
            col.decode(&prefixed(1, &[b'c', 0xe9])).unwrap(),
            Value::Text("cé".into())
        );
        assert_eq!(
            col.decode(&prefixed(1, &[0x80, b'5', 0x93, 0x9f, 0x94, 0x81])).unwrap(),
            Value::Text("€5\u{201c}Ÿ\u{201d}\u{0081}".into())
        );

        // VARBINARY
        let col = Column::new(ColumnType::MYSQL_TYPE_VARCHAR, &[0x20, 0x00]).collation(63);
        assert_eq!(
            col.decode(&prefixed(1, &[0xff, 0x00])).unwrap(),
            Value::Bytes(vec![0xff, 0x00])
        );

        // invalid utf8 in a utf8mb4 column
        let col = Column::new(ColumnType::MYSQL_TYPE_VARCHAR, &[0x20, 0x00]).collation(255);
        assert_eq!(
            col.decode(&prefixed(1, &[0xff])).unwrap(),
            Value::Bytes(vec![0xff])
        );
    }

    #[test]
    fn should_decode_char() {
        // CHAR(10) utf8mb4: 40 bytes
        let col = Column::new(ColumnType::MYSQL_TYPE_STRING, &[0xfe, 40]).collation(255);
        let data = prefixed(1, b"ab  ");
        assert_eq!(col.decode(&data).unwrap(), Value::Text("ab  ".into()));

        let trimming = DecoderOptions::new().with_char_padding(CharPadding::TrimTrailingSpaces);
        let col = Column::new(ColumnType::MYSQL_TYPE_STRING, &[0xfe, 40])
            .collation(255)
            .opts(trimming.clone());
        assert_eq!(col.decode(&data).unwrap(), Value::Text("ab".into()));

        let col = Column::new(ColumnType::MYSQL_TYPE_STRING, &[0xfe, 4])
            .collation(63)
            .opts(trimming);
        assert_eq!(col.decode(&data).unwrap(), Value::Bytes(b"ab  ".to_vec()));

        // CHAR(255) utf8mb4: 1020 bytes, encoded in the real type bits
        let col = Column::new(ColumnType::MYSQL_TYPE_STRING, &[0xce, 0xfc]).collation(255);
        let data = prefixed(2, b"x");
        assert_eq!(col.decode(&data).unwrap(), Value::Text("x".into()));
    }

    #[test]
    fn should_decode_blobs() {
        let col = Column::new(ColumnType::MYSQL_TYPE_BLOB, &[2]).collation(63);
        assert_eq!(
            col.decode(&prefixed(2, &[1, 2, 3])).unwrap(),
            Value::Bytes(vec![1, 2, 3])
        );

        let col = Column::new(ColumnType::MYSQL_TYPE_BLOB, &[4]).collation(33);
        assert_eq!(
            col.decode(&prefixed(4, b"text")).unwrap(),
            Value::Text("text".into())
        );

        let col = Column::new(ColumnType::MYSQL_TYPE_BLOB, &[5]);
        assert!(col.decode(&[0]).is_err());
    }

    #[test]
    fn should_gate_by_server_version() {
        let old = DecoderOptions::new().with_server_version(ServerVersion(5, 6, 3));
        let col = Column::new(ColumnType::MYSQL_TYPE_TIME2, &[0]).opts(old.clone());
        assert!(matches!(
            col.decode(&[0x80, 0, 0]).unwrap_err(),
            DecodeError::UnsupportedType {
                type_code: 0x13,
                column: 0
            }
        ));

        let col = Column::new(ColumnType::MYSQL_TYPE_JSON, &[4]).opts(old);
        assert!(matches!(
            col.decode(&[0; 4]).unwrap_err(),
            DecodeError::UnsupportedType { .. }
        ));

        let ancient = DecoderOptions::new().with_server_version(ServerVersion(5, 5, 2));
        let col = Column::new(ColumnType::MYSQL_TYPE_VARCHAR, &[0x20, 0])
            .collation(45)
            .opts(ancient.clone());
        assert!(col.decode(&prefixed(1, b"a")).is_err());
        let col = Column::new(ColumnType::MYSQL_TYPE_VARCHAR, &[0x20, 0])
            .collation(33)
            .opts(ancient);
        assert_eq!(
            col.decode(&prefixed(1, b"a")).unwrap(),
            Value::Text("a".into())
        );
    }

    #[test]
    fn should_decode_year() {
        let col = Column::new(ColumnType::MYSQL_TYPE_YEAR, &[]);
        assert_eq!(col.decode(&[1]).unwrap(), Value::UInt(1901));
        assert_eq!(col.decode(&[255]).unwrap(), Value::UInt(2155));
        assert_eq!(col.decode(&[0]).unwrap(), Value::UInt(0));
    }

    #[test]
    fn should_decode_temporal_boundaries() {
        let render = |value: Value| match value {
            Value::Temporal(t) => format!("{:.6}", t),
            other => panic!("unexpected {:?}", other),
        };

        // DATETIME2(0) 1000-01-01 00:00:00 and 9999-12-31 23:59:59
        let col = Column::new(ColumnType::MYSQL_TYPE_DATETIME2, &[0]);
        let pack = |y: i64, mo: i64, d: i64, h: i64, mi: i64, s: i64| {
            let ym = y * 13 + mo;
            let v = (ym << 22 | d << 17 | h << 12 | mi << 6 | s) + 0x80_0000_0000;
            v.to_be_bytes()[3..].to_vec()
        };
        assert_eq!(
            render(col.decode(&pack(1000, 1, 1, 0, 0, 0)).unwrap()),
            "1000-01-01 00:00:00.000000"
        );
        assert_eq!(
            render(col.decode(&pack(9999, 12, 31, 23, 59, 59)).unwrap()),
            "9999-12-31 23:59:59.000000"
        );

        // TIMESTAMP2(0) 2038-01-19 03:14:07 UTC
        let col = Column::new(ColumnType::MYSQL_TYPE_TIMESTAMP2, &[0]);
        assert_eq!(
            render(col.decode(&0x7fff_ffff_u32.to_be_bytes()).unwrap()),
            "2038-01-19 03:14:07.000000"
        );

        // legacy DATE 2155-12-31
        let col = Column::new(ColumnType::MYSQL_TYPE_DATE, &[]);
        let v: u32 = 2155 << 9 | 12 << 5 | 31;
        assert_eq!(
            render(col.decode(&v.to_le_bytes()[..3]).unwrap()),
            "2155-12-31"
        );

        // legacy TIME -838:59:59
        let col = Column::new(ColumnType::MYSQL_TYPE_TIME, &[]);
        assert_eq!(
            render(col.decode(&(-8385959_i32).to_le_bytes()[..3]).unwrap()),
            "-838:59:59.000000"
        );

        let col = Column::new(ColumnType::MYSQL_TYPE_TIME2, &[7]);
        assert!(col.decode(&[0x80, 0, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn should_decode_time2_micro() {
        // TIME(6) -00:00:00.000001 is 0x800000000000 - 1
        let col = Column::new(ColumnType::MYSQL_TYPE_TIME2, &[6]);
        let bytes = (0x8000_0000_0000_i64 - 1).to_be_bytes();
        match col.decode(&bytes[2..]).unwrap() {
            Value::Temporal(t) => {
                assert!(t.negative);
                assert_eq!((t.hour, t.minute, t.second, t.microsecond), (0, 0, 0, 1));
                assert_eq!(format!("{:.6}", t), "-00:00:00.000001");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn should_decode_json() {
        let doc = serde_json::json!({"a": [1, 2.5, "x"], "b": null});
        let col = Column::new(ColumnType::MYSQL_TYPE_JSON, &[4]);
        let data = prefixed(4, &encode_jsonb(&doc, false));
        assert_eq!(col.decode(&data).unwrap(), Value::Json(doc));

        let data = prefixed(4, &[]);
        assert_eq!(
            col.decode(&data).unwrap(),
            Value::Json(serde_json::Value::Null)
        );
    }

    #[test]
    fn should_decode_geometry() {
        let col = Column::new(ColumnType::MYSQL_TYPE_GEOMETRY, &[4]);
        let mut payload = 4326_u32.to_le_bytes().to_vec();
        payload.extend_from_slice(&[1, 1, 0, 0, 0]);
        assert_eq!(
            col.decode(&prefixed(4, &payload)).unwrap(),
            Value::Geometry {
                srid: 4326,
                wkb: vec![1, 1, 0, 0, 0]
            }
        );
        assert!(col.decode(&prefixed(4, &[1, 2])).unwrap_err().is_truncated());
    }

    #[test]
    fn should_reject_typed_array() {
        let col = Column::new(ColumnType::MYSQL_TYPE_TYPED_ARRAY, &[]);
        assert!(matches!(
            col.decode(&[]).unwrap_err(),
            DecodeError::UnsupportedType {
                type_code: 0x14,
                ..
            }
        ));
    }
}
