// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use std::fmt;

use bitvec::{order::Lsb0, slice::BitSlice};

use crate::{error::Result, io::ParseBuf, value::Value};

use super::value::{decode_value, ColumnCtx};

/// Representation of a binlog row image.
///
/// Holds one slot per table column. A slot is empty if the column is not present in the image
/// (see `binlog_row_image`).
#[derive(Clone, PartialEq)]
pub struct RowImage {
    values: Vec<Option<Value>>,
}

impl RowImage {
    pub fn new(values: Vec<Option<Value>>) -> Self {
        Self { values }
    }

    /// Reads a row image.
    ///
    /// Content:
    ///
    /// * null bitmap sized by the number of present columns,
    /// * values of present non-NULL columns in column order.
    pub(crate) fn read(
        buf: &mut ParseBuf<'_>,
        present: &BitSlice<u8, Lsb0>,
        columns: &[ColumnCtx<'_>],
    ) -> Result<Self> {
        let null_bitmap = buf.eat_bitmap(present.count_ones())?;

        let mut values = Vec::with_capacity(columns.len());
        let mut image_idx = 0;

        for (i, ctx) in columns.iter().enumerate() {
            if !present.get(i).as_deref().copied().unwrap_or(false) {
                values.push(None);
                continue;
            }

            if null_bitmap[image_idx] {
                values.push(Some(Value::Null));
            } else {
                let value = decode_value(ctx, buf).map_err(|e| e.at_column(i))?;
                values.push(Some(value));
            }

            image_idx += 1;
        }

        Ok(Self { values })
    }

    /// Returns the number of columns in the table.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has a length of 0.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns `true` if the column at `index` is present in this image.
    pub fn is_present(&self, index: usize) -> bool {
        matches!(self.values.get(index), Some(Some(_)))
    }

    /// Returns the number of present columns.
    pub fn present_count(&self) -> usize {
        self.values.iter().filter(|x| x.is_some()).count()
    }

    /// Returns reference to the value of a column with index `index` if it is present
    /// and wasn't taken by `RowImage::take`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(|x| x.as_ref())
    }

    /// Takes value of a column with index `index`.
    pub fn take(&mut self, index: usize) -> Option<Value> {
        self.values.get_mut(index).and_then(|x| x.take())
    }

    /// Returns all slots.
    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Option<Value>> {
        self.values
    }
}

impl fmt::Debug for RowImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_map();
        for (i, val) in self.values.iter().enumerate() {
            if let Some(val) = val {
                debug.entry(&format_args!("@{}", i), val);
            }
        }
        debug.finish()
    }
}
