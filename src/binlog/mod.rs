// Copyright (c) 2020 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Row-based binlog decoding. This implementation assumes
//! binlog version >= 4 (MySql >= 5.0.0).
//!
//! Events are expected to be already framed: one event per buffer, starting with the common
//! header and without the checksum trailer.

use std::{collections::HashMap, sync::Arc};

use crate::{
    error::{DecodeError, Result},
    io::ParseBuf,
    opts::DecoderOptions,
    schema::TableSchema,
};

use self::events::{RowsEventData, RowsEventKind, TableMapEvent};

pub mod decimal;
pub mod events;
pub mod jsonb;
pub mod misc;
pub mod row;
pub mod time;
pub mod value;

#[cfg(test)]
pub(crate) mod test_support;

/// Binlog event type.
#[allow(non_camel_case_types)]
#[repr(u8)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum EventType {
    /// Ignored event.
    UNKNOWN_EVENT = 0x00,
    /// A start event is the first event of a binlog for binlog-version 1 to 3.
    ///
    /// Superseded by `FORMAT_DESCRIPTION_EVENT` since mysql v5.0.0.
    START_EVENT_V3 = 0x01,
    /// A `QUERY_EVENT` is created for each query that modifies the database,
    /// unless the query is logged row-based.
    QUERY_EVENT = 0x02,
    /// A `STOP_EVENT` has no payload or post-header.
    STOP_EVENT = 0x03,
    /// The rotate event is added to the binlog as last event
    /// to tell the reader what binlog to request next.
    ROTATE_EVENT = 0x04,
    INTVAR_EVENT = 0x05,
    LOAD_EVENT = 0x06,
    /// Ignored event.
    SLAVE_EVENT = 0x07,
    CREATE_FILE_EVENT = 0x08,
    APPEND_BLOCK_EVENT = 0x09,
    EXEC_LOAD_EVENT = 0x0a,
    DELETE_FILE_EVENT = 0x0b,
    NEW_LOAD_EVENT = 0x0c,
    RAND_EVENT = 0x0d,
    USER_VAR_EVENT = 0x0e,
    /// A format description event is the first event of a binlog for binlog-version 4.
    /// It describes how the other events are layed out.
    FORMAT_DESCRIPTION_EVENT = 0x0f,
    XID_EVENT = 0x10,
    BEGIN_LOAD_QUERY_EVENT = 0x11,
    EXECUTE_LOAD_QUERY_EVENT = 0x12,
    /// Maps a table definition to a number. Precedes every group of rows events.
    TABLE_MAP_EVENT = 0x13,
    PRE_GA_WRITE_ROWS_EVENT = 0x14,
    PRE_GA_UPDATE_ROWS_EVENT = 0x15,
    PRE_GA_DELETE_ROWS_EVENT = 0x16,
    WRITE_ROWS_EVENT_V1 = 0x17,
    UPDATE_ROWS_EVENT_V1 = 0x18,
    DELETE_ROWS_EVENT_V1 = 0x19,
    INCIDENT_EVENT = 0x1a,
    HEARTBEAT_EVENT = 0x1b,
    IGNORABLE_EVENT = 0x1c,
    ROWS_QUERY_EVENT = 0x1d,
    /// Version 2 rows events carry a variable-length extra data section.
    WRITE_ROWS_EVENT = 0x1e,
    UPDATE_ROWS_EVENT = 0x1f,
    DELETE_ROWS_EVENT = 0x20,
    GTID_EVENT = 0x21,
    ANONYMOUS_GTID_EVENT = 0x22,
    PREVIOUS_GTIDS_EVENT = 0x23,
    TRANSACTION_CONTEXT_EVENT = 0x24,
    VIEW_CHANGE_EVENT = 0x25,
    /// Prepared XA transaction terminal event similar to Xid.
    XA_PREPARE_LOG_EVENT = 0x26,
    /// Extension of UPDATE_ROWS_EVENT, allowing partial values according
    /// to binlog_row_value_options.
    PARTIAL_UPDATE_ROWS_EVENT = 0x27,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("Unknown event type {}", _0)]
#[repr(transparent)]
pub struct UnknownEventType(pub u8);

impl From<UnknownEventType> for u8 {
    fn from(x: UnknownEventType) -> Self {
        x.0
    }
}

impl TryFrom<u8> for EventType {
    type Error = UnknownEventType;

    fn try_from(byte: u8) -> std::result::Result<Self, UnknownEventType> {
        match byte {
            0x00 => Ok(Self::UNKNOWN_EVENT),
            0x01 => Ok(Self::START_EVENT_V3),
            0x02 => Ok(Self::QUERY_EVENT),
            0x03 => Ok(Self::STOP_EVENT),
            0x04 => Ok(Self::ROTATE_EVENT),
            0x05 => Ok(Self::INTVAR_EVENT),
            0x06 => Ok(Self::LOAD_EVENT),
            0x07 => Ok(Self::SLAVE_EVENT),
            0x08 => Ok(Self::CREATE_FILE_EVENT),
            0x09 => Ok(Self::APPEND_BLOCK_EVENT),
            0x0a => Ok(Self::EXEC_LOAD_EVENT),
            0x0b => Ok(Self::DELETE_FILE_EVENT),
            0x0c => Ok(Self::NEW_LOAD_EVENT),
            0x0d => Ok(Self::RAND_EVENT),
            0x0e => Ok(Self::USER_VAR_EVENT),
            0x0f => Ok(Self::FORMAT_DESCRIPTION_EVENT),
            0x10 => Ok(Self::XID_EVENT),
            0x11 => Ok(Self::BEGIN_LOAD_QUERY_EVENT),
            0x12 => Ok(Self::EXECUTE_LOAD_QUERY_EVENT),
            0x13 => Ok(Self::TABLE_MAP_EVENT),
            0x14 => Ok(Self::PRE_GA_WRITE_ROWS_EVENT),
            0x15 => Ok(Self::PRE_GA_UPDATE_ROWS_EVENT),
            0x16 => Ok(Self::PRE_GA_DELETE_ROWS_EVENT),
            0x17 => Ok(Self::WRITE_ROWS_EVENT_V1),
            0x18 => Ok(Self::UPDATE_ROWS_EVENT_V1),
            0x19 => Ok(Self::DELETE_ROWS_EVENT_V1),
            0x1a => Ok(Self::INCIDENT_EVENT),
            0x1b => Ok(Self::HEARTBEAT_EVENT),
            0x1c => Ok(Self::IGNORABLE_EVENT),
            0x1d => Ok(Self::ROWS_QUERY_EVENT),
            0x1e => Ok(Self::WRITE_ROWS_EVENT),
            0x1f => Ok(Self::UPDATE_ROWS_EVENT),
            0x20 => Ok(Self::DELETE_ROWS_EVENT),
            0x21 => Ok(Self::GTID_EVENT),
            0x22 => Ok(Self::ANONYMOUS_GTID_EVENT),
            0x23 => Ok(Self::PREVIOUS_GTIDS_EVENT),
            0x24 => Ok(Self::TRANSACTION_CONTEXT_EVENT),
            0x25 => Ok(Self::VIEW_CHANGE_EVENT),
            0x26 => Ok(Self::XA_PREPARE_LOG_EVENT),
            0x27 => Ok(Self::PARTIAL_UPDATE_ROWS_EVENT),
            x => Err(UnknownEventType(x)),
        }
    }
}

bitflags::bitflags! {
    /// Binlog Event Flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventFlags: u16 {
        /// Gets unset in the `FORMAT_DESCRIPTION_EVENT`
        /// when the file gets closed to detect broken binlogs.
        const LOG_EVENT_BINLOG_IN_USE_F = 0x0001;

        /// Unused.
        const LOG_EVENT_FORCED_ROTATE_F = 0x0002;

        /// event is thread specific (`CREATE TEMPORARY TABLE` ...).
        const LOG_EVENT_THREAD_SPECIFIC_F = 0x0004;

        /// Event doesn't need default database to be updated (`CREATE DATABASE`, ...).
        const LOG_EVENT_SUPPRESS_USE_F = 0x0008;

        /// Unused.
        const LOG_EVENT_UPDATE_TABLE_MAP_VERSION_F = 0x0010;

        /// Event is created by the slaves SQL-thread and shouldn't update the master-log pos.
        const LOG_EVENT_ARTIFICIAL_F = 0x0020;

        /// Event is created by the slaves IO-thread when written to the relay log.
        const LOG_EVENT_RELAY_LOG_F = 0x0040;

        /// Setting this flag will mark an event as Ignorable.
        const LOG_EVENT_IGNORABLE_F = 0x0080;

        /// Events with this flag are not filtered (e.g. on the current
        /// database) and are always written to the binary log regardless of
        /// filters.
        const LOG_EVENT_NO_FILTER_F = 0x0100;

        /// MTS: group of events can be marked to force its execution in isolation from
        /// any other Workers.
        const LOG_EVENT_MTS_ISOLATE_F = 0x0200;
    }
}

/// The binlog event header starts each event and is 19 bytes long assuming binlog version >= 4.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct BinlogEventHeader {
    /// Seconds since unix epoch.
    pub timestamp: u32,
    /// Raw event type.
    pub event_type: u8,
    /// Server-id of the originating mysql-server.
    ///
    /// Used to filter out events in circular replication.
    pub server_id: u32,
    /// Size of the event (header, post-header, body).
    pub event_size: u32,
    /// Position of the next event.
    pub log_pos: u32,
    /// Binlog Event Flag.
    ///
    /// This field contains raw value. Use [`Self::flags()`] to get the actual flags.
    pub flags: u16,
}

impl BinlogEventHeader {
    /// Binlog event header length for version >= 4.
    pub const LEN: usize = 19;
    /// Length of the CRC32 checksum trailing an event if `binlog_checksum` is enabled.
    pub const BINLOG_CHECKSUM_LEN: usize = 4;

    pub fn read(buf: &mut ParseBuf<'_>) -> Result<Self> {
        let mut header = buf.eat_buf(Self::LEN)?;
        Ok(Self {
            timestamp: header.eat_u32_le()?,
            event_type: header.eat_u8()?,
            server_id: header.eat_u32_le()?,
            event_size: header.eat_u32_le()?,
            log_pos: header.eat_u32_le()?,
            flags: header.eat_u16_le()?,
        })
    }

    /// Returns parsed event type.
    pub fn event_type(&self) -> std::result::Result<EventType, UnknownEventType> {
        EventType::try_from(self.event_type)
    }

    /// Returns parsed flags (unknown bits are truncated).
    pub fn flags(&self) -> EventFlags {
        EventFlags::from_bits_truncate(self.flags)
    }
}

/// Decoded body of a binlog event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    TableMap(Arc<TableMapEvent>),
    Rows(RowsEventData),
    /// Event outside of row-based change data (raw event type).
    Other(u8),
}

/// Decoded binlog event.
#[derive(Debug, Clone, PartialEq)]
pub struct BinlogEvent {
    pub header: BinlogEventHeader,
    pub data: EventData,
}

/// Binlog decoding session.
///
/// Remembers table map events by table id so that following rows events could be decoded.
/// One decoder per replication stream.
#[derive(Debug, Clone, Default)]
pub struct BinlogDecoder {
    opts: DecoderOptions,
    tables: HashMap<u64, Arc<TableMapEvent>>,
    /// Caller-supplied column definitions, by database and table name.
    schemas: HashMap<String, HashMap<String, TableSchema>>,
}

impl BinlogDecoder {
    pub fn new(opts: DecoderOptions) -> Self {
        Self {
            opts,
            tables: HashMap::new(),
            schemas: HashMap::new(),
        }
    }

    pub fn opts(&self) -> &DecoderOptions {
        &self.opts
    }

    /// Registers column definitions of a table.
    ///
    /// They are used for whatever the table map event lacks (see `binlog_row_metadata`).
    /// Replaces previously registered definitions.
    pub fn register_schema(
        &mut self,
        database: impl Into<String>,
        table: impl Into<String>,
        schema: TableSchema,
    ) {
        self.schemas
            .entry(database.into())
            .or_default()
            .insert(table.into(), schema);
    }

    /// Returns the table map event currently installed for `table_id`.
    pub fn table(&self, table_id: u64) -> Option<&Arc<TableMapEvent>> {
        self.tables.get(&table_id)
    }

    /// Forgets all table map events (e.g. when switching to another binlog file).
    pub fn reset(&mut self) {
        self.tables.clear();
    }

    /// Decodes a single framed event (header and body, without checksum).
    ///
    /// The header's event size may either match `bytes` or also count the stripped checksum.
    ///
    /// A table map event is installed only if it decodes successfully, so any error leaves
    /// the session as it was.
    pub fn decode(&mut self, bytes: &[u8]) -> Result<BinlogEvent> {
        let mut buf = ParseBuf::new(bytes);
        let header = BinlogEventHeader::read(&mut buf)?;

        // event size still counts the checksum stripped by the caller
        let event_size = header.event_size as usize;
        if event_size != bytes.len()
            && event_size != bytes.len() + BinlogEventHeader::BINLOG_CHECKSUM_LEN
        {
            return Err(DecodeError::malformed(format!(
                "event size {} doesn't match buffer length {}",
                header.event_size,
                bytes.len()
            )));
        }

        let event_type = match header.event_type() {
            Ok(event_type) => event_type,
            Err(UnknownEventType(raw)) => {
                tracing::trace!(event_type = raw, log_pos = header.log_pos, "skipping unknown event");
                return Ok(BinlogEvent {
                    header,
                    data: EventData::Other(raw),
                });
            }
        };

        tracing::trace!(
            event_type = ?event_type,
            log_pos = header.log_pos,
            event_size = header.event_size,
            "decoding binlog event"
        );

        let data = match event_type {
            EventType::TABLE_MAP_EVENT => {
                let event = Arc::new(TableMapEvent::read(&mut buf)?);
                let previous = self.tables.insert(event.table_id(), event.clone());
                tracing::debug!(
                    table_id = event.table_id(),
                    database = %event.database_name(),
                    table = %event.table_name(),
                    columns = event.columns_count(),
                    replaced = previous.is_some(),
                    "installed table map"
                );
                EventData::TableMap(event)
            }
            event_type if RowsEventKind::from_event_type(event_type).is_some() => {
                let tables = &self.tables;
                let schemas = &self.schemas;
                let result = RowsEventData::read(&mut buf, event_type, &self.opts, |table_id| {
                    let table = tables.get(&table_id)?.clone();
                    let schema = schemas
                        .get(&*table.database_name())
                        .and_then(|x| x.get(&*table.table_name()));
                    Some((table, schema))
                });
                match result {
                    Ok(rows) => EventData::Rows(rows),
                    Err(err @ DecodeError::UnknownTable(_)) => {
                        tracing::warn!(log_pos = header.log_pos, error = %err, "rows event for unmapped table");
                        return Err(err);
                    }
                    Err(err) => return Err(err),
                }
            }
            _ => EventData::Other(header.event_type),
        };

        Ok(BinlogEvent { header, data })
    }
}
