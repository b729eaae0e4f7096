// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! MySql packed decimal (`DECIMAL(M,D)` binary representation).
//!
//! The value is split into an integer and a fractional part, each stored as a sequence
//! of big-endian 4-byte words holding 9 decimal digits. Leftover digits at the outer ends
//! use the minimal number of bytes (see [`DIG2BYTES`]). The sign is stored in the top bit of
//! the first byte, and negative values have every byte complemented.

use std::fmt::Write;

use crate::{
    error::{DecodeError, Result},
    io::ParseBuf,
};

/// Decimal digits stored in a full 4-byte word.
pub const DIG_PER_DEC: usize = 9;

/// Bytes needed to store `n` leftover digits.
pub const DIG2BYTES: [usize; DIG_PER_DEC + 1] = [0, 1, 1, 2, 2, 3, 3, 4, 4, 4];

/// Max precision of a MySql decimal.
pub const MAX_PRECISION: u8 = 65;

/// Returns the number of bytes a `DECIMAL(precision, scale)` value occupies.
pub fn decimal_bin_size(precision: u8, scale: u8) -> usize {
    let intg = precision.saturating_sub(scale) as usize;
    let frac = scale as usize;
    (intg / DIG_PER_DEC) * 4
        + DIG2BYTES[intg % DIG_PER_DEC]
        + (frac / DIG_PER_DEC) * 4
        + DIG2BYTES[frac % DIG_PER_DEC]
}

/// Reads a packed decimal and renders it as an exact decimal string.
///
/// The fractional part is always `scale` digits long, the integer part has no leading zeros
/// (`0` if empty).
pub fn decode_decimal(buf: &mut ParseBuf<'_>, precision: u8, scale: u8) -> Result<String> {
    if precision == 0 || precision > MAX_PRECISION || scale > precision {
        return Err(DecodeError::malformed(format!(
            "invalid decimal metadata ({}, {})",
            precision, scale
        )));
    }

    let mut bytes = buf.eat(decimal_bin_size(precision, scale))?.to_vec();

    let negative = bytes[0] & 0x80 == 0;
    bytes[0] ^= 0x80;
    if negative {
        bytes.iter_mut().for_each(|x| *x = !*x);
    }

    let intg = (precision - scale) as usize;
    let frac = scale as usize;
    let mut data = ParseBuf::new(&bytes);

    let mut int_part = String::with_capacity(intg);
    let leftover = DIG2BYTES[intg % DIG_PER_DEC];
    if leftover > 0 {
        write!(int_part, "{}", data.eat_uint_be(leftover)?).ok();
    }
    for _ in 0..intg / DIG_PER_DEC {
        write!(int_part, "{:09}", data.eat_uint_be(4)?).ok();
    }

    let mut frac_part = String::with_capacity(frac);
    for _ in 0..frac / DIG_PER_DEC {
        write!(frac_part, "{:09}", data.eat_uint_be(4)?).ok();
    }
    let leftover = DIG2BYTES[frac % DIG_PER_DEC];
    if leftover > 0 {
        let digits = frac % DIG_PER_DEC;
        write!(
            frac_part,
            "{:0width$}",
            data.eat_uint_be(leftover)?,
            width = digits
        )
        .ok();
    }

    if int_part.len() > intg.max(1) || frac_part.len() != frac {
        return Err(DecodeError::malformed("decimal digit group overflow"));
    }

    let int_part = match int_part.trim_start_matches('0') {
        "" => "0",
        x => x,
    };
    let is_zero = int_part == "0" && frac_part.bytes().all(|x| x == b'0');

    let mut output = String::with_capacity(int_part.len() + frac_part.len() + 2);
    if negative && !is_zero {
        output.push('-');
    }
    output.push_str(int_part);
    if frac > 0 {
        output.push('.');
        output.push_str(&frac_part);
    }
    Ok(output)
}


#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{test_support::encode_decimal, *};

    fn decode(bytes: &[u8], precision: u8, scale: u8) -> Result<String> {
        let mut buf = ParseBuf::new(bytes);
        let out = decode_decimal(&mut buf, precision, scale)?;
        assert!(buf.is_empty());
        Ok(out)
    }

    #[test]
    fn should_compute_bin_size() {
        assert_eq!(decimal_bin_size(10, 2), 5);
        assert_eq!(decimal_bin_size(14, 4), 7);
        assert_eq!(decimal_bin_size(30, 10), 14);
        assert_eq!(decimal_bin_size(65, 30), 30);
    }

    #[test]
    fn should_decode_known_values() {
        // DECIMAL(14,4) 1234567890.1234
        let bytes = [0x81, 0x0d, 0xfb, 0x38, 0xd2, 0x04, 0xd2];
        assert_eq!(decode(&bytes, 14, 4).unwrap(), "1234567890.1234");

        // DECIMAL(14,4) -1234567890.1234
        let bytes = [0x7e, 0xf2, 0x04, 0xc7, 0x2d, 0xfb, 0x2d];
        assert_eq!(decode(&bytes, 14, 4).unwrap(), "-1234567890.1234");

        assert_eq!(
            decode(&encode_decimal("-13.47", 30, 10), 30, 10).unwrap(),
            "-13.4700000000"
        );
        assert_eq!(decode(&encode_decimal("0", 5, 2), 5, 2).unwrap(), "0.00");
        assert_eq!(decode(&encode_decimal("-0.5", 5, 2), 5, 2).unwrap(), "-0.50");
        assert_eq!(decode(&encode_decimal("42", 5, 0), 5, 0).unwrap(), "42");
    }

    #[test]
    fn should_reject_bad_input() {
        assert!(decode(&[0x80], 70, 2).is_err());
        assert!(decode(&[0x80], 5, 6).is_err());
        assert!(decode(&[0x80, 0x00], 10, 2).unwrap_err().is_truncated());
    }

    proptest! {
        #[test]
        fn decimal_roundtrip(
            negative in any::<bool>(),
            int_part in r"[1-9][0-9]{0,19}",
            frac_part in r"[0-9]{10}",
        ) {
            let value = format!("{}{}.{}", if negative { "-" } else { "" }, int_part, frac_part);
            let bytes = encode_decimal(&value, 30, 10);
            prop_assert_eq!(decode(&bytes, 30, 10).unwrap(), value);
        }

        #[test]
        fn decimal_roundtrip_wide(
            int_part in r"[1-9][0-9]{0,34}",
            frac_part in r"[0-9]{30}",
        ) {
            let value = format!("{}.{}", int_part, frac_part);
            let bytes = encode_decimal(&value, 65, 30);
            prop_assert_eq!(decode(&bytes, 65, 30).unwrap(), value);
        }
    }
}
