// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use std::{
    cmp::min,
    fmt::{self, Write},
};

use chrono::{DateTime, Datelike, Timelike};

use crate::{error::Result, io::ParseBuf};

use super::misc::{
    eat_frac_micros, frac_storage_len, my_packed_time_get_frac_part, my_packed_time_get_int_part,
    my_packed_time_make,
};

/// Integer part offset of a TIME2 value.
const TIMEF_INT_OFS: i64 = 0x800000;
/// Offset of a 6-byte TIME2 value (fsp 5 and 6).
const TIMEF_OFS: i64 = 0x800000000000;
/// Integer part offset of a DATETIME2 value.
const DATETIMEF_INT_OFS: i64 = 0x8000000000;

/// Kind of a temporal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalKind {
    Date,
    Time,
    DateTime,
    /// UTC point in time (TIMESTAMP column).
    Timestamp,
}

/// Decoded DATE, TIME, DATETIME or TIMESTAMP value.
///
/// Fields not meaningful for the kind are zero (e.g. `year`, `month`, `day` of a TIME).
/// `hour` of a TIME may exceed 23 (`-838:59:59` to `838:59:59`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Temporal {
    pub year: u32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub microsecond: u32,
    pub negative: bool,
    pub kind: TemporalKind,
}

impl Temporal {
    pub fn date(year: u32, month: u32, day: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
            microsecond: 0,
            negative: false,
            kind: TemporalKind::Date,
        }
    }

    pub fn datetime(
        year: u32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        microsecond: u32,
    ) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            microsecond,
            negative: false,
            kind: TemporalKind::DateTime,
        }
    }

    pub fn time(negative: bool, hour: u32, minute: u32, second: u32, microsecond: u32) -> Self {
        Self {
            year: 0,
            month: 0,
            day: 0,
            hour,
            minute,
            second,
            microsecond,
            negative,
            kind: TemporalKind::Time,
        }
    }

    /// Converts seconds since the unix epoch (UTC) into a `Timestamp`.
    ///
    /// The zero timestamp maps to `0000-00-00 00:00:00`.
    pub fn from_unix_timestamp(seconds: u32, microsecond: u32) -> Self {
        let mut this = match DateTime::from_timestamp(seconds as i64, 0) {
            Some(dt) if seconds != 0 => Self::datetime(
                dt.year() as u32,
                dt.month(),
                dt.day(),
                dt.hour(),
                dt.minute(),
                dt.second(),
                microsecond,
            ),
            _ => Self::datetime(0, 0, 0, 0, 0, 0, microsecond),
        };
        this.kind = TemporalKind::Timestamp;
        this
    }

    /// Convert time packed numeric representation to [`Temporal`].
    pub fn from_int64_time_packed(mut packed_value: i64) -> Self {
        let negative = packed_value < 0;
        if negative {
            packed_value = -packed_value
        }

        let hms: i64 = my_packed_time_get_int_part(packed_value);

        let hour = (hms >> 12) as u32 % (1 << 10); /* 10 bits starting at 12th */
        let minute = (hms >> 6) as u32 % (1 << 6); /* 6 bits starting at 6th   */
        let second = hms as u32 % (1 << 6); /* 6 bits starting at 0th   */
        let microsecond = my_packed_time_get_frac_part(packed_value);

        Self::time(negative, hour, minute, second, microsecond as u32)
    }

    /// Convert packed numeric date representation to [`Temporal`].
    pub fn from_int64_date_packed(packed_value: i64) -> Self {
        let mut this = Self::from_int64_datetime_packed(packed_value);
        this.kind = TemporalKind::Date;
        this
    }

    /// Convert packed numeric datetime representation to [`Temporal`].
    pub fn from_int64_datetime_packed(mut packed_value: i64) -> Self {
        let negative = packed_value < 0;
        if negative {
            packed_value = -packed_value
        }

        let microsecond = my_packed_time_get_frac_part(packed_value);
        let ymdhms: i64 = my_packed_time_get_int_part(packed_value);

        let ymd: i64 = ymdhms >> 17;
        let ym: i64 = ymd >> 5;
        let hms: i64 = ymdhms % (1 << 17);

        let day = ymd % (1 << 5);
        let month = ym % 13;
        let year = ym / 13;

        let second = hms % (1 << 6);
        let minute = (hms >> 6) % (1 << 6);
        let hour = hms >> 12;

        let mut this = Self::datetime(
            year as u32,
            month as u32,
            day as u32,
            hour as u32,
            minute as u32,
            second as u32,
            microsecond as u32,
        );
        this.negative = negative;
        this
    }

    /// Reads a 3-byte `DATE` value.
    pub fn read_date(buf: &mut ParseBuf<'_>) -> Result<Self> {
        let v = buf.eat_u24_le()?;
        Ok(Self::date(v >> 9, (v >> 5) & 15, v & 31))
    }

    /// Reads a 3-byte legacy `TIME` value stored as `±HHMMSS`.
    pub fn read_time(buf: &mut ParseBuf<'_>) -> Result<Self> {
        let v = buf.eat_i24_le()?;
        let abs = v.unsigned_abs();
        Ok(Self::time(v < 0, abs / 10000, (abs / 100) % 100, abs % 100, 0))
    }

    /// Reads an 8-byte legacy `DATETIME` value stored as `YYYYMMDDhhmmss`.
    pub fn read_datetime(buf: &mut ParseBuf<'_>) -> Result<Self> {
        let v = buf.eat_u64_le()?;
        let date = (v / 1_000_000) as u32;
        let time = (v % 1_000_000) as u32;
        Ok(Self::datetime(
            date / 10000,
            (date / 100) % 100,
            date % 100,
            time / 10000,
            (time / 100) % 100,
            time % 100,
            0,
        ))
    }

    /// Reads a 4-byte legacy `TIMESTAMP` value (seconds since epoch).
    pub fn read_timestamp(buf: &mut ParseBuf<'_>) -> Result<Self> {
        let secs = buf.eat_u32_le()?;
        Ok(Self::from_unix_timestamp(secs, 0))
    }

    /// Reads a `TIME(fsp)` value in the binary format introduced in MySql 5.6.4.
    pub fn read_time2(buf: &mut ParseBuf<'_>, fsp: u8) -> Result<Self> {
        let packed = match frac_storage_len(fsp) {
            0 => my_packed_time_make(buf.eat_uint_be(3)? as i64 - TIMEF_INT_OFS, 0),
            1 => {
                let mut intpart = buf.eat_uint_be(3)? as i64 - TIMEF_INT_OFS;
                let mut frac = buf.eat_uint_be(1)? as i64;
                if intpart < 0 && frac != 0 {
                    intpart += 1;
                    frac -= 0x100;
                }
                my_packed_time_make(intpart, frac * 10_000)
            }
            2 => {
                let mut intpart = buf.eat_uint_be(3)? as i64 - TIMEF_INT_OFS;
                let mut frac = buf.eat_uint_be(2)? as i64;
                if intpart < 0 && frac != 0 {
                    intpart += 1;
                    frac -= 0x10000;
                }
                my_packed_time_make(intpart, frac * 100)
            }
            _ => buf.eat_uint_be(6)? as i64 - TIMEF_OFS,
        };
        Ok(Self::from_int64_time_packed(packed))
    }

    /// Reads a `DATETIME(fsp)` value in the binary format introduced in MySql 5.6.4.
    pub fn read_datetime2(buf: &mut ParseBuf<'_>, fsp: u8) -> Result<Self> {
        let intpart = buf.eat_uint_be(5)? as i64 - DATETIMEF_INT_OFS;
        let frac = eat_frac_micros(buf, fsp)?;
        Ok(Self::from_int64_datetime_packed(my_packed_time_make(
            intpart, frac,
        )))
    }

    /// Reads a `TIMESTAMP(fsp)` value in the binary format introduced in MySql 5.6.4.
    pub fn read_timestamp2(buf: &mut ParseBuf<'_>, fsp: u8) -> Result<Self> {
        let secs = buf.eat_uint_be(4)? as u32;
        let frac = eat_frac_micros(buf, fsp)?;
        Ok(Self::from_unix_timestamp(secs, frac as u32))
    }

    /// Returns `true` if every field is zero (`0000-00-00`, `00:00:00`).
    pub fn is_zero(&self) -> bool {
        self.year == 0
            && self.month == 0
            && self.day == 0
            && self.hour == 0
            && self.minute == 0
            && self.second == 0
            && self.microsecond == 0
    }
}

/// Formats the value in MySql notation.
///
/// Microseconds are only printed if formatter precision is given (`{:.6}`).
impl fmt::Display for Temporal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TemporalKind::DateTime | TemporalKind::Timestamp => format_datetime(self, f),
            TemporalKind::Date => format_date(self, f),
            TemporalKind::Time => format_time(self, f),
        }
    }
}

fn trim_two_digits(value: u32) -> u32 {
    if value >= 100 {
        0
    } else {
        value
    }
}

/// Formats a time value as `HH:MM:SS[.fraction]`.
fn format_time(time: &Temporal, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if time.negative {
        f.write_char('-')?;
    }

    write!(
        f,
        "{:02}:{:02}:{:02}",
        time.hour,
        trim_two_digits(time.minute),
        trim_two_digits(time.second),
    )?;
    format_useconds(time.microsecond, f)?;
    Ok(())
}

/// Formats a datetime value with an optional fractional part (if formatter precision is given).
fn format_datetime(time: &Temporal, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    format_date_and_time(time, f)?;
    format_useconds(time.microsecond, f)?;
    Ok(())
}

/// Formats date and time part as 'YYYY-MM-DD hh:mm:ss'
fn format_date_and_time(time: &Temporal, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
        f,
        "{:02}{:02}-{:02}-{:02} {:02}:{:02}:{:02}",
        trim_two_digits(time.year / 100),
        trim_two_digits(time.year % 100),
        trim_two_digits(time.month),
        trim_two_digits(time.day),
        trim_two_digits(time.hour),
        trim_two_digits(time.minute),
        trim_two_digits(time.second),
    )
}

/// Formats a date value as 'YYYY-MM-DD'.
fn format_date(time: &Temporal, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
        f,
        "{:02}{:02}-{:02}-{:02}",
        trim_two_digits(time.year / 100),
        trim_two_digits(time.year % 100),
        trim_two_digits(time.month),
        trim_two_digits(time.day),
    )
}

/// Only formats useconds if formatter precision is given (will be truncated to 6)
fn format_useconds(mut useconds: u32, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let Some(dec) = f.precision().map(|x| min(x, 6)) else {
        return Ok(());
    };

    if dec == 0 {
        return Ok(());
    }

    useconds %= 1_000_000;

    for _ in 0..(6 - dec) {
        useconds /= 10;
    }

    write!(f, ".{:0width$}", useconds, width = dec)
}
