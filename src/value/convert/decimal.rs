// Copyright (c) 2017 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! This module implements conversion from `Value` for `Decimal` type.

#![cfg(feature = "rust_decimal")]

use std::str::FromStr;

use rust_decimal::Decimal;

use super::{FromValueError, Value};

impl TryFrom<Value> for Decimal {
    type Error = FromValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Int(x) => Ok(x.into()),
            Value::UInt(x) => Ok(x.into()),
            Value::Decimal(ref x) => {
                Decimal::from_str(x).map_err(|_| FromValueError(value.clone()))
            }
            v => Err(FromValueError(v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use super::super::Value;

    proptest! {
        #[test]
        fn decimal_roundtrip(
            sign in r"-?",
            m in r"[0-9]{1,14}",
            d in r"[0-9]{1,14}",
        ) {
            let m = match m.trim_start_matches('0') {
                "" => "0",
                m => m,
            };
            let sign = if m == "0" && d.chars().all(|b| b == '0') {
                String::new()
            } else {
                sign
            };
            let s = format!("{}{}.{}", sign, m, d);
            let dec: Decimal = Decimal::try_from(Value::Decimal(s.clone())).unwrap();
            prop_assert_eq!(dec.to_string(), s);
        }
    }

    #[test]
    fn should_reject_non_numeric() {
        assert!(Decimal::try_from(Value::Text("12".into())).is_err());
        assert!(Decimal::try_from(Value::Decimal("x".into())).is_err());
        assert_eq!(Decimal::try_from(Value::Int(-5)).unwrap(), Decimal::from(-5));
    }
}
