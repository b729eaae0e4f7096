// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

mod rows_event;
mod table_map_event;

pub use self::rows_event::{Rows, RowsEventData, RowsEventFlags, RowsEventKind, UpdatedRow};
pub use self::table_map_event::{
    OptionalMetadataFieldType, PrimaryKeyPart, TableColumn, TableMapEvent,
    UnknownOptionalMetadataFieldType,
};
