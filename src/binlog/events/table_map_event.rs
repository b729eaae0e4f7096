// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use std::borrow::Cow;

use bitvec::prelude::*;

use crate::{
    constants::ColumnType,
    error::{DecodeError, Result},
    io::ParseBuf,
};

/// Type of an optional metadata field of a table map event.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum OptionalMetadataFieldType {
    /// UNSIGNED flag of numeric columns.
    ///
    /// One bit per numeric column, most significant bit first. `1` means unsigned.
    SIGNEDNESS = 1,
    /// Character set of string columns.
    ///
    /// Default collation as a length-encoded integer, then `(index, collation)` pairs for
    /// character columns with a different collation. The index counts character columns only.
    DEFAULT_CHARSET,
    /// Character set of string columns, one length-encoded collation per character column.
    COLUMN_CHARSET,
    /// Column names as length-encoded strings (`binlog_row_metadata=FULL`).
    COLUMN_NAME,
    /// Labels of every SET column: label count, then length-encoded labels.
    SET_STR_VALUE,
    /// Labels of every ENUM column, same format as `SET_STR_VALUE`.
    ENUM_STR_VALUE,
    /// Geometry type of every GEOMETRY column.
    GEOMETRY_TYPE,
    /// Primary key column indexes.
    SIMPLE_PRIMARY_KEY,
    /// Primary key column indexes with prefix lengths.
    PRIMARY_KEY_WITH_PREFIX,
    /// Same as `DEFAULT_CHARSET` but for ENUM and SET columns.
    ENUM_AND_SET_DEFAULT_CHARSET,
    /// Same as `COLUMN_CHARSET` but for ENUM and SET columns.
    ENUM_AND_SET_COLUMN_CHARSET,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("Unknown optional metadata field type {}", _0)]
#[repr(transparent)]
pub struct UnknownOptionalMetadataFieldType(pub u8);

impl From<UnknownOptionalMetadataFieldType> for u8 {
    fn from(x: UnknownOptionalMetadataFieldType) -> Self {
        x.0
    }
}

impl TryFrom<u8> for OptionalMetadataFieldType {
    type Error = UnknownOptionalMetadataFieldType;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::SIGNEDNESS),
            2 => Ok(Self::DEFAULT_CHARSET),
            3 => Ok(Self::COLUMN_CHARSET),
            4 => Ok(Self::COLUMN_NAME),
            5 => Ok(Self::SET_STR_VALUE),
            6 => Ok(Self::ENUM_STR_VALUE),
            7 => Ok(Self::GEOMETRY_TYPE),
            8 => Ok(Self::SIMPLE_PRIMARY_KEY),
            9 => Ok(Self::PRIMARY_KEY_WITH_PREFIX),
            10 => Ok(Self::ENUM_AND_SET_DEFAULT_CHARSET),
            11 => Ok(Self::ENUM_AND_SET_COLUMN_CHARSET),
            x => Err(UnknownOptionalMetadataFieldType(x)),
        }
    }
}

/// Column of a table, as described by a table map event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableColumn {
    type_code: u8,
    column_type: ColumnType,
    metadata: Vec<u8>,
    nullable: bool,
    unsigned: Option<bool>,
    collation: Option<u16>,
    name: Option<String>,
    labels: Option<Vec<String>>,
    geometry_type: Option<u64>,
}

impl TableColumn {
    /// Raw type code as logged.
    pub fn type_code(&self) -> u8 {
        self.type_code
    }

    /// Real column type (ENUM and SET are logged as `MYSQL_TYPE_STRING`).
    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// Type-specific metadata.
    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// `UNSIGNED` flag if the event carries signedness metadata.
    pub fn unsigned(&self) -> Option<bool> {
        self.unsigned
    }

    /// Collation id if the event carries charset metadata.
    pub fn collation(&self) -> Option<u16> {
        self.collation
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// ENUM or SET labels if the event carries them.
    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    pub fn geometry_type(&self) -> Option<u64> {
        self.geometry_type
    }

    fn is_numeric(&self) -> bool {
        self.column_type.is_numeric_type()
    }

    fn is_character(&self) -> bool {
        self.column_type.is_character_type()
    }

    fn is_enum_or_set(&self) -> bool {
        self.column_type.is_enum_or_set_type()
    }
}

/// Primary key part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimaryKeyPart {
    /// Column index.
    pub column_index: usize,
    /// Prefix length (`0` means the whole column).
    pub prefix_length: u64,
}

/// Table map event.
///
/// In row-based mode, every row operation event is preceded by a Table_map_event which maps
/// a table definition to a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableMapEvent {
    /// The number that identifies the table.
    ///
    /// It's 6 bytes long, so valid range is [0, 1<<48).
    table_id: u64,
    /// Reserved for future use; currently always 0.
    flags: u16,
    /// The name of the database in which the table resides.
    database_name: Vec<u8>,
    /// The name of the table.
    table_name: Vec<u8>,
    columns: Vec<TableColumn>,
    primary_key: Vec<PrimaryKeyPart>,
}

impl TableMapEvent {
    /// Decodes a table map event body (the event without its common header).
    pub fn read(buf: &mut ParseBuf<'_>) -> Result<Self> {
        let table_id = buf.eat_u48_le()?;
        let flags = buf.eat_u16_le()?;

        let database_name = eat_name(buf)?.to_vec();
        let table_name = eat_name(buf)?.to_vec();

        let columns_count = usize::try_from(buf.eat_lenenc_int()?)
            .map_err(|_| DecodeError::malformed("column count overflow"))?;
        let columns_type = buf.eat(columns_count)?;
        let mut columns_metadata = ParseBuf::new(buf.eat_lenenc_bytes()?);
        let null_bitmask = buf.eat_bitmap(columns_count)?;

        let mut columns = Vec::with_capacity(columns_count);
        for (index, &type_code) in columns_type.iter().enumerate() {
            let raw_type = ColumnType::try_from(type_code).map_err(|_| {
                DecodeError::UnsupportedType {
                    type_code,
                    column: index,
                }
            })?;
            let metadata_len = raw_type
                .metadata_len()
                .ok_or(DecodeError::UnsupportedType {
                    type_code,
                    column: index,
                })?;
            let metadata = columns_metadata.eat(metadata_len).map_err(|_| {
                DecodeError::malformed(format!(
                    "metadata block is too short for column {} of type {:?}",
                    index, raw_type
                ))
            })?;

            columns.push(TableColumn {
                type_code,
                column_type: raw_type.real_type(metadata),
                metadata: metadata.to_vec(),
                nullable: null_bitmask[index],
                unsigned: None,
                collation: None,
                name: None,
                labels: None,
                geometry_type: None,
            });
        }

        if !columns_metadata.is_empty() {
            return Err(DecodeError::malformed(format!(
                "{} unused byte(s) in column metadata block",
                columns_metadata.remaining()
            )));
        }

        let mut this = Self {
            table_id,
            flags,
            database_name,
            table_name,
            columns,
            primary_key: Vec::new(),
        };

        this.read_optional_metadata(&mut ParseBuf::new(buf.eat_all()))?;

        Ok(this)
    }

    /// Applies the optional metadata block to columns.
    ///
    /// Fields with unknown types are skipped.
    fn read_optional_metadata(&mut self, buf: &mut ParseBuf<'_>) -> Result<()> {
        use OptionalMetadataFieldType::*;

        while !buf.is_empty() {
            let field_type = buf.eat_u8()?;
            let mut value = ParseBuf::new(buf.eat_lenenc_bytes()?);

            let Ok(field_type) = OptionalMetadataFieldType::try_from(field_type) else {
                continue;
            };

            match field_type {
                SIGNEDNESS => {
                    let count = self.columns.iter().filter(|c| c.is_numeric()).count();
                    let bytes = value.eat((count + 7) / 8)?;
                    let flags = BitSlice::<u8, Msb0>::from_slice(bytes);
                    for (column, flag) in self
                        .columns
                        .iter_mut()
                        .filter(|c| c.is_numeric())
                        .zip(flags.iter())
                    {
                        column.unsigned = Some(*flag);
                    }
                }
                DEFAULT_CHARSET => {
                    read_default_charset(&mut value, self.character_columns())?;
                }
                ENUM_AND_SET_DEFAULT_CHARSET => {
                    read_default_charset(&mut value, self.enum_and_set_columns())?;
                }
                COLUMN_CHARSET => {
                    read_column_charsets(&mut value, self.character_columns())?;
                }
                ENUM_AND_SET_COLUMN_CHARSET => {
                    read_column_charsets(&mut value, self.enum_and_set_columns())?;
                }
                COLUMN_NAME => {
                    for column in self.columns.iter_mut() {
                        let name = value.eat_lenenc_bytes()?;
                        column.name = Some(String::from_utf8_lossy(name).into_owned());
                    }
                }
                SET_STR_VALUE | ENUM_STR_VALUE => {
                    let wanted = if field_type == SET_STR_VALUE {
                        ColumnType::MYSQL_TYPE_SET
                    } else {
                        ColumnType::MYSQL_TYPE_ENUM
                    };
                    for column in self
                        .columns
                        .iter_mut()
                        .filter(|c| c.column_type == wanted)
                    {
                        let count = value.eat_lenenc_int()?;
                        let labels = (0..count)
                            .map(|_| {
                                value
                                    .eat_lenenc_bytes()
                                    .map(|x| String::from_utf8_lossy(x).into_owned())
                            })
                            .collect::<Result<Vec<_>>>()?;
                        column.labels = Some(labels);
                    }
                }
                GEOMETRY_TYPE => {
                    for column in self
                        .columns
                        .iter_mut()
                        .filter(|c| c.column_type.is_geometry_type())
                    {
                        column.geometry_type = Some(value.eat_lenenc_int()?);
                    }
                }
                SIMPLE_PRIMARY_KEY => {
                    while !value.is_empty() {
                        let column_index = self.column_index(value.eat_lenenc_int()?)?;
                        self.primary_key.push(PrimaryKeyPart {
                            column_index,
                            prefix_length: 0,
                        });
                    }
                }
                PRIMARY_KEY_WITH_PREFIX => {
                    while !value.is_empty() {
                        let column_index = self.column_index(value.eat_lenenc_int()?)?;
                        let prefix_length = value.eat_lenenc_int()?;
                        self.primary_key.push(PrimaryKeyPart {
                            column_index,
                            prefix_length,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    fn character_columns(&mut self) -> impl Iterator<Item = &mut TableColumn> {
        self.columns.iter_mut().filter(|c| c.is_character())
    }

    fn enum_and_set_columns(&mut self) -> impl Iterator<Item = &mut TableColumn> {
        self.columns.iter_mut().filter(|c| c.is_enum_or_set())
    }

    fn column_index(&self, index: u64) -> Result<usize> {
        usize::try_from(index)
            .ok()
            .filter(|x| *x < self.columns.len())
            .ok_or_else(|| {
                DecodeError::malformed(format!("primary key column {} is out of range", index))
            })
    }

    /// Returns the table identifier.
    pub fn table_id(&self) -> u64 {
        self.table_id
    }

    /// Returns raw flags.
    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// Returns the number of columns.
    pub fn columns_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns raw database name value.
    pub fn database_name_raw(&self) -> &[u8] {
        &self.database_name
    }

    /// Returns database name as a string (lossy converted).
    pub fn database_name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.database_name)
    }

    /// Returns raw table name value.
    pub fn table_name_raw(&self) -> &[u8] {
        &self.table_name
    }

    /// Returns table name as a string (lossy converted).
    pub fn table_name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.table_name)
    }

    /// Returns the column at `index`.
    pub fn column(&self, index: usize) -> Option<&TableColumn> {
        self.columns.get(index)
    }

    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    /// Returns the primary key, if logged.
    pub fn primary_key(&self) -> &[PrimaryKeyPart] {
        &self.primary_key
    }

    /// Returns null-bitmap for this table.
    ///
    /// For each column this null bitmap contains a bit indicating whether
    /// data in the column can be NULL or not.
    pub fn null_bitmask(&self) -> BitVec<u8, Lsb0> {
        self.columns.iter().map(TableColumn::is_nullable).collect()
    }

    /// Ruturns a number of JSON columns.
    pub fn json_column_count(&self) -> usize {
        self.columns
            .iter()
            .filter(|x| x.column_type == ColumnType::MYSQL_TYPE_JSON)
            .count()
    }
}

/// Reads a 1-byte length, the name and its terminating NUL.
fn eat_name<'a>(buf: &mut ParseBuf<'a>) -> Result<&'a [u8]> {
    let name = buf.eat_len_prefixed(1)?;
    buf.skip(1)?;
    Ok(name)
}

fn read_default_charset<'a>(
    value: &mut ParseBuf<'_>,
    columns: impl Iterator<Item = &'a mut TableColumn>,
) -> Result<()> {
    let default = charset_id(value.eat_lenenc_int()?)?;
    let mut columns = columns.collect::<Vec<_>>();
    for column in columns.iter_mut() {
        column.collation = Some(default);
    }
    while !value.is_empty() {
        let index = value.eat_lenenc_int()? as usize;
        let collation = charset_id(value.eat_lenenc_int()?)?;
        let column = columns.get_mut(index).ok_or_else(|| {
            DecodeError::malformed(format!("charset for missing column {}", index))
        })?;
        column.collation = Some(collation);
    }
    Ok(())
}

fn read_column_charsets<'a>(
    value: &mut ParseBuf<'_>,
    columns: impl Iterator<Item = &'a mut TableColumn>,
) -> Result<()> {
    for column in columns {
        column.collation = Some(charset_id(value.eat_lenenc_int()?)?);
    }
    Ok(())
}

fn charset_id(x: u64) -> Result<u16> {
    u16::try_from(x).map_err(|_| DecodeError::malformed(format!("invalid collation id {}", x)))
}
