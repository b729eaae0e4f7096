// Copyright (c) 2017 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Decoder of MySql row-based binlog events.
//!
//! Turns framed binlog events into table descriptors and typed row changes:
//!
//! ```no_run
//! use binlog_decode::{
//!     binlog::{events::Rows, BinlogDecoder, EventData},
//!     opts::{DecoderOptions, ServerVersion},
//! };
//!
//! # fn next_event() -> Vec<u8> { Vec::new() }
//! let opts = DecoderOptions::new().with_server_version(ServerVersion(8, 0, 35));
//! let mut decoder = BinlogDecoder::new(opts);
//!
//! loop {
//!     let event = decoder.decode(&next_event())?;
//!     if let EventData::Rows(rows) = event.data {
//!         if let Rows::Write(images) = rows.rows() {
//!             println!("{} row(s) inserted into {}", images.len(), rows.table().table_name());
//!         }
//!     }
//! }
//! # Ok::<(), binlog_decode::error::DecodeError>(())
//! ```
//!
//! Table map events are cached per decoder, so one decoder must see every event of a stream.

#[macro_use]
extern crate lazy_static;

pub mod binlog;
pub mod constants;
pub mod error;
pub mod io;
pub mod opts;
pub mod schema;
pub mod value;

pub use crate::binlog::{BinlogDecoder, BinlogEvent, EventData};
pub use crate::error::{DecodeError, Result};
pub use crate::value::Value;
