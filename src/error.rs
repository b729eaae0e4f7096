// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Errors produced while decoding binlog events.

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Failure to decode a single binlog event.
///
/// Every variant is fatal to the event being decoded and leaves the decoder session
/// usable for the next event.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A read would run past the end of the event buffer.
    #[error("truncated buffer: need {needed} byte(s) at offset {pos}, {remaining} remaining")]
    Truncated {
        needed: usize,
        remaining: usize,
        pos: usize,
    },
    /// A rows event references a table id with no preceding table map event.
    #[error("no table map event for table id {0}")]
    UnknownTable(u64),
    /// No codec is registered for the column type (or the server is too old for it).
    #[error("unsupported column type {type_code:#04x} at column {column}")]
    UnsupportedType { type_code: u8, column: usize },
    /// The binary JSON tree is internally inconsistent.
    #[error("malformed jsonb: {0}")]
    MalformedJson(String),
    /// Structural inconsistency of an event.
    #[error("malformed event: {0}")]
    Malformed(String),
    /// ENUM or SET labels are unavailable and the label policy forbids ordinals.
    #[error("no ENUM/SET labels known for column {column}")]
    MissingLabels { column: usize },
    /// A column value failed to decode.
    #[error("column {column}: {source}")]
    Column {
        column: usize,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    pub(crate) fn malformed_json(msg: impl Into<String>) -> Self {
        Self::MalformedJson(msg.into())
    }

    /// Attaches a column index to a codec error.
    ///
    /// Errors that already name their column are returned as is.
    pub(crate) fn at_column(self, column: usize) -> Self {
        match self {
            e @ DecodeError::UnsupportedType { .. }
            | e @ DecodeError::MissingLabels { .. }
            | e @ DecodeError::Column { .. } => e,
            e => DecodeError::Column {
                column,
                source: Box::new(e),
            },
        }
    }

    /// Returns the innermost error, skipping `Column` wrappers.
    pub fn root(&self) -> &DecodeError {
        match self {
            DecodeError::Column { source, .. } => source.root(),
            e => e,
        }
    }

    /// Returns `true` if this error (or the wrapped one) is a truncation.
    pub fn is_truncated(&self) -> bool {
        matches!(self.root(), DecodeError::Truncated { .. })
    }
}
