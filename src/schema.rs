// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Column definitions known from DDL.
//!
//! Table map events only carry signedness, charsets, names and ENUM/SET labels if the server
//! runs with `binlog_row_metadata=FULL`. Callers that track schema some other way register
//! a [`TableSchema`] on the decoder, and it is consulted for whatever the event omits.

use serde::{Deserialize, Serialize};

/// Definition of a single column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnDef {
    name: Option<String>,
    unsigned: Option<bool>,
    collation: Option<u16>,
    labels: Option<Vec<String>>,
}

impl ColumnDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Defines `UNSIGNED` flag of a numeric column.
    pub fn with_unsigned(mut self, unsigned: bool) -> Self {
        self.unsigned = Some(unsigned);
        self
    }

    /// Defines collation id of a character, ENUM or SET column.
    pub fn with_collation(mut self, collation: u16) -> Self {
        self.collation = Some(collation);
        self
    }

    /// Defines ENUM or SET labels in declaration order.
    pub fn with_labels<I, T>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn unsigned(&self) -> Option<bool> {
        self.unsigned
    }

    pub fn collation(&self) -> Option<u16> {
        self.collation
    }

    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }
}

/// Column definitions of a table, in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableSchema {
    columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    /// Returns definition of the column at `index`, if known.
    pub fn column(&self, index: usize) -> Option<&ColumnDef> {
        self.columns.get(index)
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }
}
