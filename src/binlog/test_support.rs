// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Builders of raw binlog events for tests.

use bytes::BufMut;

use crate::constants::ColumnType;

use super::{BinlogEventHeader, EventType};

pub fn put_lenenc_int(buf: &mut Vec<u8>, x: u64) {
    match x {
        0..=0xfa => buf.put_u8(x as u8),
        0xfb..=0xffff => {
            buf.put_u8(0xfc);
            buf.put_u16_le(x as u16);
        }
        0x10000..=0xffffff => {
            buf.put_u8(0xfd);
            buf.put_uint_le(x, 3);
        }
        _ => {
            buf.put_u8(0xfe);
            buf.put_u64_le(x);
        }
    }
}

pub fn put_lenenc_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    put_lenenc_int(buf, bytes.len() as u64);
    buf.put_slice(bytes);
}

fn put_bitmap(buf: &mut Vec<u8>, bits: &[bool]) {
    let mut bytes = vec![0_u8; (bits.len() + 7) / 8];
    for (i, _) in bits.iter().enumerate().filter(|(_, x)| **x) {
        bytes[i / 8] |= 1 << (i % 8);
    }
    buf.put_slice(&bytes);
}

/// Frames an event body with a binlog event header.
pub fn event(event_type: EventType, body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(BinlogEventHeader::LEN + body.len());
    buf.put_u32_le(1_700_000_000);
    buf.put_u8(event_type as u8);
    buf.put_u32_le(1);
    buf.put_u32_le((BinlogEventHeader::LEN + body.len()) as u32);
    buf.put_u32_le(4096);
    buf.put_u16_le(0);
    buf.put_slice(body);
    buf
}

/// Builds a table map event body.
pub struct TableMapBuilder {
    table_id: u64,
    database: String,
    table: String,
    types: Vec<u8>,
    metadata: Vec<u8>,
    nullable: Vec<bool>,
    optional: Vec<u8>,
}

impl TableMapBuilder {
    pub fn new(table_id: u64, database: &str, table: &str) -> Self {
        Self {
            table_id,
            database: database.into(),
            table: table.into(),
            types: Vec::new(),
            metadata: Vec::new(),
            nullable: Vec::new(),
            optional: Vec::new(),
        }
    }

    pub fn column(self, column_type: ColumnType, metadata: &[u8], nullable: bool) -> Self {
        self.raw_column(column_type as u8, metadata, nullable)
    }

    pub fn raw_column(mut self, type_code: u8, metadata: &[u8], nullable: bool) -> Self {
        self.types.push(type_code);
        self.metadata.extend_from_slice(metadata);
        self.nullable.push(nullable);
        self
    }

    /// Appends an optional metadata field.
    pub fn optional(mut self, field_type: u8, value: &[u8]) -> Self {
        self.optional.put_u8(field_type);
        put_lenenc_bytes(&mut self.optional, value);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.put_uint_le(self.table_id, 6);
        buf.put_u16_le(0);
        for name in [&self.database, &self.table] {
            buf.put_u8(name.len() as u8);
            buf.put_slice(name.as_bytes());
            buf.put_u8(0);
        }
        put_lenenc_int(&mut buf, self.types.len() as u64);
        buf.put_slice(&self.types);
        put_lenenc_bytes(&mut buf, &self.metadata);
        put_bitmap(&mut buf, &self.nullable);
        buf.put_slice(&self.optional);
        buf
    }
}

/// Builds a rows event body.
pub struct RowsBuilder {
    event_type: EventType,
    table_id: u64,
    flags: u16,
    extra_data: Vec<u8>,
    present: Vec<bool>,
    after: Option<Vec<bool>>,
    rows: Vec<u8>,
}

impl RowsBuilder {
    /// Every column is present unless [`RowsBuilder::present`] says otherwise.
    pub fn new(event_type: EventType, table_id: u64, num_columns: usize) -> Self {
        Self {
            event_type,
            table_id,
            flags: 0,
            extra_data: Vec::new(),
            present: vec![true; num_columns],
            after: None,
            rows: Vec::new(),
        }
    }

    pub fn flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    /// Extra data of a v2 event (without the length field).
    pub fn extra_data(mut self, extra_data: &[u8]) -> Self {
        self.extra_data = extra_data.to_vec();
        self
    }

    pub fn present(mut self, present: &[bool]) -> Self {
        self.present = present.to_vec();
        self
    }

    /// After image columns of an UPDATE event (defaults to the present columns).
    pub fn after(mut self, after: &[bool]) -> Self {
        self.after = Some(after.to_vec());
        self
    }

    /// Appends a row image: one cell per column in the image, `None` is NULL.
    pub fn image(mut self, cells: &[Option<&[u8]>]) -> Self {
        let nulls = cells.iter().map(Option::is_none).collect::<Vec<_>>();
        put_bitmap(&mut self.rows, &nulls);
        for cell in cells.iter().flatten() {
            self.rows.put_slice(cell);
        }
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let is_v2 = matches!(
            self.event_type,
            EventType::WRITE_ROWS_EVENT | EventType::UPDATE_ROWS_EVENT | EventType::DELETE_ROWS_EVENT
        );
        let is_update = matches!(
            self.event_type,
            EventType::UPDATE_ROWS_EVENT_V1 | EventType::UPDATE_ROWS_EVENT
        );

        let mut buf = Vec::new();
        buf.put_uint_le(self.table_id, 6);
        buf.put_u16_le(self.flags);
        if is_v2 {
            buf.put_u16_le(self.extra_data.len() as u16 + 2);
            buf.put_slice(&self.extra_data);
        }
        put_lenenc_int(&mut buf, self.present.len() as u64);
        put_bitmap(&mut buf, &self.present);
        if is_update {
            put_bitmap(&mut buf, self.after.as_deref().unwrap_or(&self.present));
        }
        buf.put_slice(&self.rows);
        buf
    }
}
