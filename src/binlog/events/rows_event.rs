// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use std::sync::Arc;

use crate::{
    error::{DecodeError, Result},
    io::ParseBuf,
    opts::DecoderOptions,
    schema::TableSchema,
};

use super::{
    super::{row::RowImage, value::ColumnCtx, EventType},
    TableMapEvent,
};

bitflags::bitflags! {
    /// Rows event flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RowsEventFlags: u16 {
        /// Last event of a statement.
        const STMT_END = 0x0001;
        /// No foreign key checks.
        const NO_FOREIGN_KEY_CHECKS = 0x0002;
        /// No unique key checks.
        const RELAXED_UNIQUE_CHECKS = 0x0004;
        /// Indicates that rows in this event are complete,
        /// that is contain values for all columns of the table.
        const COMPLETE_ROWS = 0x0008;
    }
}

/// Kind of a row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowsEventKind {
    Write,
    Update,
    Delete,
}

impl RowsEventKind {
    /// Returns the kind of a rows event and whether it is a version 2 event.
    pub fn from_event_type(event_type: EventType) -> Option<(Self, bool)> {
        match event_type {
            EventType::WRITE_ROWS_EVENT_V1 => Some((Self::Write, false)),
            EventType::UPDATE_ROWS_EVENT_V1 => Some((Self::Update, false)),
            EventType::DELETE_ROWS_EVENT_V1 => Some((Self::Delete, false)),
            EventType::WRITE_ROWS_EVENT => Some((Self::Write, true)),
            EventType::UPDATE_ROWS_EVENT => Some((Self::Update, true)),
            EventType::DELETE_ROWS_EVENT => Some((Self::Delete, true)),
            _ => None,
        }
    }
}

/// Before and after images of an updated row.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatedRow {
    pub before: RowImage,
    pub after: RowImage,
}

/// Rows carried by a rows event.
#[derive(Debug, Clone, PartialEq)]
pub enum Rows {
    /// After images of inserted rows.
    Write(Vec<RowImage>),
    Update(Vec<UpdatedRow>),
    /// Before images of deleted rows.
    Delete(Vec<RowImage>),
}

impl Rows {
    pub fn len(&self) -> usize {
        match self {
            Rows::Write(rows) | Rows::Delete(rows) => rows.len(),
            Rows::Update(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decoded WRITE, UPDATE or DELETE rows event (v1 or v2).
#[derive(Debug, Clone, PartialEq)]
pub struct RowsEventData {
    table_id: u64,
    flags: u16,
    table: Arc<TableMapEvent>,
    rows: Rows,
}

impl RowsEventData {
    /// Decodes a rows event body.
    ///
    /// `resolve` maps the table id to its table map event (and a caller-supplied schema,
    /// if any). It is called before any row is read.
    pub fn read<'s, F>(
        buf: &mut ParseBuf<'_>,
        event_type: EventType,
        opts: &DecoderOptions,
        resolve: F,
    ) -> Result<Self>
    where
        F: FnOnce(u64) -> Option<(Arc<TableMapEvent>, Option<&'s TableSchema>)>,
    {
        let (kind, is_v2) = RowsEventKind::from_event_type(event_type).ok_or_else(|| {
            DecodeError::malformed(format!("{:?} is not a rows event", event_type))
        })?;

        let table_id = buf.eat_u48_le()?;
        let flags = buf.eat_u16_le()?;

        if is_v2 {
            // extra data length includes the length field itself
            let extra_len = buf.eat_u16_le()? as usize;
            let extra_len = extra_len.checked_sub(2).ok_or_else(|| {
                DecodeError::malformed(format!("invalid extra data length {}", extra_len))
            })?;
            buf.skip(extra_len)?;
        }

        let (table, schema) = resolve(table_id).ok_or(DecodeError::UnknownTable(table_id))?;

        let num_columns = buf.eat_lenenc_int()?;
        if usize::try_from(num_columns).ok() != Some(table.columns_count()) {
            return Err(DecodeError::malformed(format!(
                "rows event has {} column(s), table map for {} has {}",
                num_columns,
                table_id,
                table.columns_count()
            )));
        }
        let num_columns = table.columns_count();

        let columns_before_image = buf.eat_bitmap(num_columns)?;
        let columns_after_image = match kind {
            RowsEventKind::Update => buf.eat_bitmap(num_columns)?,
            _ => columns_before_image.clone(),
        };

        // images without columns take no bytes, so the remaining bytes can't be rows
        let image_is_empty = match kind {
            RowsEventKind::Update => {
                columns_before_image.not_any() && columns_after_image.not_any()
            }
            _ => columns_before_image.not_any(),
        };
        if image_is_empty && !buf.is_empty() {
            return Err(DecodeError::malformed(format!(
                "{} byte(s) of rows for an image without columns",
                buf.remaining()
            )));
        }

        let columns = column_contexts(&table, schema, opts);

        let rows = match kind {
            RowsEventKind::Write | RowsEventKind::Delete => {
                let mut rows = Vec::new();
                while !buf.is_empty() {
                    rows.push(RowImage::read(buf, &columns_before_image, &columns)?);
                }
                if kind == RowsEventKind::Write {
                    Rows::Write(rows)
                } else {
                    Rows::Delete(rows)
                }
            }
            RowsEventKind::Update => {
                let mut rows = Vec::new();
                while !buf.is_empty() {
                    let before = RowImage::read(buf, &columns_before_image, &columns)?;
                    let after = RowImage::read(buf, &columns_after_image, &columns)?;
                    rows.push(UpdatedRow { before, after });
                }
                Rows::Update(rows)
            }
        };

        Ok(Self {
            table_id,
            flags,
            table,
            rows,
        })
    }

    pub fn table_id(&self) -> u64 {
        self.table_id
    }

    pub fn kind(&self) -> RowsEventKind {
        match self.rows {
            Rows::Write(_) => RowsEventKind::Write,
            Rows::Update(_) => RowsEventKind::Update,
            Rows::Delete(_) => RowsEventKind::Delete,
        }
    }

    /// Returns parsed flags (unknown bits are truncated).
    pub fn flags(&self) -> RowsEventFlags {
        RowsEventFlags::from_bits_truncate(self.flags)
    }

    /// Returns raw flags.
    pub fn flags_raw(&self) -> u16 {
        self.flags
    }

    /// Returns the table map event this event was decoded with.
    pub fn table(&self) -> &Arc<TableMapEvent> {
        &self.table
    }

    pub fn rows(&self) -> &Rows {
        &self.rows
    }

    pub fn into_rows(self) -> Rows {
        self.rows
    }
}

/// Resolves codec context of every column.
///
/// Table map metadata wins over the caller-supplied schema.
fn column_contexts<'a>(
    table: &'a TableMapEvent,
    schema: Option<&'a TableSchema>,
    opts: &'a DecoderOptions,
) -> Vec<ColumnCtx<'a>> {
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let def = schema.and_then(|s| s.column(index));
            ColumnCtx {
                index,
                type_code: column.type_code(),
                column_type: column.column_type(),
                metadata: column.metadata(),
                unsigned: column
                    .unsigned()
                    .or_else(|| def.and_then(|d| d.unsigned()))
                    .unwrap_or(false),
                collation: column
                    .collation()
                    .or_else(|| def.and_then(|d| d.collation())),
                labels: column.labels().or_else(|| def.and_then(|d| d.labels())),
                opts,
            }
        })
        .collect()
}
