// Copyright (c) 2017 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Position-tracking read head over an event buffer.

use std::fmt;

use bitvec::prelude::*;
use byteorder::{BigEndian as BE, ByteOrder, LittleEndian as LE};

use crate::error::{DecodeError, Result};

/// Forward-only cursor over an immutable byte buffer.
///
/// Every `eat_*` method checks the remaining length first and fails with
/// [`DecodeError::Truncated`] without moving the cursor.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ParseBuf<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl fmt::Debug for ParseBuf<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseBuf")
            .field("pos", &self.pos)
            .field("remaining", &self.remaining())
            .finish()
    }
}

impl<'a> ParseBuf<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset from the start of the buffer.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Number of bytes left.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Returns the unread part of the buffer without consuming it.
    pub fn as_slice(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if needed > self.remaining() {
            return Err(DecodeError::Truncated {
                needed,
                remaining: self.remaining(),
                pos: self.pos,
            });
        }
        Ok(())
    }

    /// Consumes `n` bytes.
    pub fn eat(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Consumes `n` bytes and returns them as a separate cursor.
    pub fn eat_buf(&mut self, n: usize) -> Result<ParseBuf<'a>> {
        self.eat(n).map(ParseBuf::new)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.eat(n).map(drop)
    }

    /// Consumes the rest of the buffer.
    pub fn eat_all(&mut self) -> &'a [u8] {
        let bytes = self.as_slice();
        self.pos = self.buf.len();
        bytes
    }

    pub fn eat_u8(&mut self) -> Result<u8> {
        self.eat(1).map(|x| x[0])
    }

    pub fn eat_i8(&mut self) -> Result<i8> {
        self.eat_u8().map(|x| x as i8)
    }

    pub fn eat_u16_le(&mut self) -> Result<u16> {
        self.eat(2).map(LE::read_u16)
    }

    pub fn eat_i16_le(&mut self) -> Result<i16> {
        self.eat(2).map(LE::read_i16)
    }

    pub fn eat_u24_le(&mut self) -> Result<u32> {
        self.eat(3).map(LE::read_u24)
    }

    pub fn eat_i24_le(&mut self) -> Result<i32> {
        self.eat(3).map(LE::read_i24)
    }

    pub fn eat_u32_le(&mut self) -> Result<u32> {
        self.eat(4).map(LE::read_u32)
    }

    pub fn eat_i32_le(&mut self) -> Result<i32> {
        self.eat(4).map(LE::read_i32)
    }

    pub fn eat_u48_le(&mut self) -> Result<u64> {
        self.eat(6).map(LE::read_u48)
    }

    pub fn eat_u64_le(&mut self) -> Result<u64> {
        self.eat(8).map(LE::read_u64)
    }

    pub fn eat_i64_le(&mut self) -> Result<i64> {
        self.eat(8).map(LE::read_i64)
    }

    pub fn eat_f32_le(&mut self) -> Result<f32> {
        self.eat(4).map(LE::read_f32)
    }

    pub fn eat_f64_le(&mut self) -> Result<f64> {
        self.eat(8).map(LE::read_f64)
    }

    /// Reads an `n`-byte little-endian unsigned integer (`1 <= n <= 8`).
    pub fn eat_uint_le(&mut self, n: usize) -> Result<u64> {
        check_int_width(n)?;
        self.eat(n).map(|x| LE::read_uint(x, n))
    }

    /// Reads an `n`-byte little-endian signed integer, sign-extended to 64 bits.
    pub fn eat_int_le(&mut self, n: usize) -> Result<i64> {
        check_int_width(n)?;
        self.eat(n).map(|x| LE::read_int(x, n))
    }

    /// Reads an `n`-byte big-endian unsigned integer (`1 <= n <= 8`).
    pub fn eat_uint_be(&mut self, n: usize) -> Result<u64> {
        check_int_width(n)?;
        self.eat(n).map(|x| BE::read_uint(x, n))
    }

    /// Reads an `n`-byte big-endian signed integer, sign-extended to 64 bits.
    pub fn eat_int_be(&mut self, n: usize) -> Result<i64> {
        check_int_width(n)?;
        self.eat(n).map(|x| BE::read_int(x, n))
    }

    /// Reads a length-encoded integer.
    ///
    /// `0xfb` (NULL marker) and `0xff` (error marker) are not valid here.
    pub fn eat_lenenc_int(&mut self) -> Result<u64> {
        let start = *self;
        let result = match self.eat_u8()? {
            x @ 0x00..=0xfa => Ok(x as u64),
            0xfc => self.eat_uint_le(2),
            0xfd => self.eat_uint_le(3),
            0xfe => self.eat_uint_le(8),
            x => Err(DecodeError::malformed(format!(
                "invalid length-encoded integer marker {:#04x}",
                x
            ))),
        };
        if result.is_err() {
            *self = start;
        }
        result
    }

    /// Reads a length-encoded integer and that many bytes.
    pub fn eat_lenenc_bytes(&mut self) -> Result<&'a [u8]> {
        let start = *self;
        let len = self.eat_lenenc_int()?;
        let result = usize::try_from(len)
            .map_err(|_| DecodeError::malformed("length-encoded string is too long"))
            .and_then(|len| self.eat(len));
        if result.is_err() {
            *self = start;
        }
        result
    }

    /// Reads a `width`-byte little-endian length followed by that many bytes.
    pub fn eat_len_prefixed(&mut self, width: usize) -> Result<&'a [u8]> {
        if !(1..=4).contains(&width) {
            return Err(DecodeError::malformed(format!(
                "invalid length prefix width {}",
                width
            )));
        }
        let start = *self;
        let len = self.eat_uint_le(width)? as usize;
        let result = self.eat(len);
        if result.is_err() {
            *self = start;
        }
        result
    }

    /// Reads a bitmap of `bits` bits stored in `(bits + 7) / 8` bytes.
    ///
    /// The first bit is the least significant bit of the first byte.
    pub fn eat_bitmap(&mut self, bits: usize) -> Result<BitVec<u8, Lsb0>> {
        let bytes = self.eat((bits + 7) / 8)?;
        let mut bitmap = BitVec::<u8, Lsb0>::from_slice(bytes);
        bitmap.truncate(bits);
        Ok(bitmap)
    }
}

fn check_int_width(n: usize) -> Result<()> {
    if (1..=8).contains(&n) {
        Ok(())
    } else {
        Err(DecodeError::malformed(format!("invalid integer width {}", n)))
    }
}
