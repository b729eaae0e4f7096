// Copyright (c) 2017 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Conversions from a decoded [`Value`] into Rust types.

use std::{error::Error, fmt};

use super::Value;

pub mod chrono;
pub mod decimal;

/// `FromValue` conversion error.
#[derive(Clone, PartialEq)]
pub struct FromValueError(pub Value);

impl fmt::Display for FromValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Couldn't convert the value `{:?}` to a desired type",
            self.0
        )
    }
}

impl fmt::Debug for FromValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Error for FromValueError {}

macro_rules! impl_try_from_value_int {
    ($($t:ty),*) => {$(
        impl TryFrom<Value> for $t {
            type Error = FromValueError;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                match value {
                    Value::Int(x) => <$t>::try_from(x).map_err(|_| FromValueError(value)),
                    Value::UInt(x) => <$t>::try_from(x).map_err(|_| FromValueError(value)),
                    Value::Bit(ref x) => x
                        .to_u64()
                        .and_then(|x| <$t>::try_from(x).ok())
                        .ok_or_else(|| FromValueError(value.clone())),
                    v => Err(FromValueError(v)),
                }
            }
        }
    )*};
}

impl_try_from_value_int!(i8, u8, i16, u16, i32, u32, i64, u64);

impl TryFrom<Value> for f64 {
    type Error = FromValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Double(x) => Ok(x),
            Value::Int(x) => Ok(x as f64),
            Value::UInt(x) => Ok(x as f64),
            Value::Decimal(ref x) => x.parse().map_err(|_| FromValueError(value.clone())),
            v => Err(FromValueError(v)),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = FromValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Text(x) | Value::Decimal(x) | Value::Enum(x) => Ok(x),
            Value::Bytes(bytes) => {
                String::from_utf8(bytes).map_err(|e| FromValueError(Value::Bytes(e.into_bytes())))
            }
            v => Err(FromValueError(v)),
        }
    }
}

impl TryFrom<Value> for Vec<u8> {
    type Error = FromValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bytes(x) => Ok(x),
            Value::Text(x) => Ok(x.into_bytes()),
            Value::Geometry { srid, wkb } => {
                let mut out = Vec::with_capacity(wkb.len() + 4);
                out.extend_from_slice(&srid.to_le_bytes());
                out.extend_from_slice(&wkb);
                Ok(out)
            }
            v => Err(FromValueError(v)),
        }
    }
}

impl TryFrom<Value> for serde_json::Value {
    type Error = FromValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Json(x) => Ok(x),
            v => Err(FromValueError(v)),
        }
    }
}
