// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use crate::{error::Result, io::ParseBuf};

/// Lowest 24 bits of a packed time value hold microseconds.
pub const PACKED_FRAC_BITS: u32 = 24;

/// Returns the integer part of a packed time value.
pub fn my_packed_time_get_int_part(i: i64) -> i64 {
    i >> PACKED_FRAC_BITS
}

/// Returns the fractional part (microseconds) of a packed time value.
pub fn my_packed_time_get_frac_part(i: i64) -> i64 {
    i % (1 << PACKED_FRAC_BITS)
}

/// Builds a packed time value from its integer and fractional parts.
pub fn my_packed_time_make(i: i64, f: i64) -> i64 {
    (i << PACKED_FRAC_BITS) + f
}

/// Returns the number of bytes used to store `fsp` fractional digits.
pub fn frac_storage_len(fsp: u8) -> usize {
    (fsp as usize + 1) / 2
}

/// Reads the fractional part of a TIMESTAMP2 or DATETIME2 value as microseconds.
///
/// The fraction is stored big-endian with two digits per byte.
pub fn eat_frac_micros(buf: &mut ParseBuf<'_>, fsp: u8) -> Result<i64> {
    let frac = match frac_storage_len(fsp) {
        0 => 0,
        1 => buf.eat_int_be(1)? * 10_000,
        2 => buf.eat_int_be(2)? * 100,
        _ => buf.eat_int_be(3)?,
    };
    Ok(frac)
}
