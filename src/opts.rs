// Copyright (c) 2017 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Decoder configuration supplied by the connection layer.

use std::{fmt, str::FromStr};

use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref VERSION_RE: Regex = Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})").unwrap();
}

/// MySql server version, as reported in the handshake or format description event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerVersion(pub u8, pub u8, pub u8);

impl ServerVersion {
    /// Fractional-second TIME2/DATETIME2/TIMESTAMP2.
    pub const FRACTIONAL_TEMPORAL: ServerVersion = ServerVersion(5, 6, 4);
    /// Native JSON columns.
    pub const JSON: ServerVersion = ServerVersion(5, 7, 8);
    /// 4-byte `utf8mb4` character set.
    pub const UTF8MB4: ServerVersion = ServerVersion(5, 5, 3);

    pub fn supports(&self, feature: ServerVersion) -> bool {
        *self >= feature
    }
}

impl Default for ServerVersion {
    fn default() -> Self {
        ServerVersion(8, 0, 0)
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid server version `{}`", _0)]
pub struct InvalidServerVersion(pub String);

impl FromStr for ServerVersion {
    type Err = InvalidServerVersion;

    /// Parses strings like `8.0.35` or `5.7.44-log`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidServerVersion(s.to_owned());
        let caps = VERSION_RE.captures(s).ok_or_else(invalid)?;
        let part = |i: usize| caps[i].parse::<u8>().map_err(|_| invalid());
        Ok(ServerVersion(part(1)?, part(2)?, part(3)?))
    }
}

impl TryFrom<String> for ServerVersion {
    type Error = InvalidServerVersion;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ServerVersion> for String {
    fn from(x: ServerVersion) -> Self {
        x.to_string()
    }
}

/// What to emit for ENUM and SET columns whose labels are unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelPolicy {
    /// Emit the raw ordinal (ENUM) or bitmask (SET) as an unsigned integer.
    #[default]
    Ordinal,
    /// Fail the event with `DecodeError::MissingLabels`.
    Error,
}

/// Trailing-space handling for `CHAR` text columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharPadding {
    /// Keep the bytes as logged.
    #[default]
    Preserve,
    /// Strip trailing spaces (never applied to binary columns).
    TrimTrailingSpaces,
}

/// Options of a [`crate::binlog::BinlogDecoder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderOptions {
    server_version: ServerVersion,
    label_policy: LabelPolicy,
    char_padding: CharPadding,
    max_json_depth: usize,
    default_collation: Option<u16>,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            server_version: ServerVersion::default(),
            label_policy: LabelPolicy::default(),
            char_padding: CharPadding::default(),
            max_json_depth: 100,
            default_collation: None,
        }
    }
}

impl DecoderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines the version of the server that produced the binlog (defaults to `8.0.0`).
    ///
    /// Column types introduced later than this version are rejected.
    pub fn with_server_version(mut self, server_version: ServerVersion) -> Self {
        self.server_version = server_version;
        self
    }

    /// Defines ENUM/SET handling when labels are unknown (defaults to [`LabelPolicy::Ordinal`]).
    pub fn with_label_policy(mut self, label_policy: LabelPolicy) -> Self {
        self.label_policy = label_policy;
        self
    }

    /// Defines `CHAR` padding handling (defaults to [`CharPadding::Preserve`]).
    pub fn with_char_padding(mut self, char_padding: CharPadding) -> Self {
        self.char_padding = char_padding;
        self
    }

    /// Maximum nesting depth of a JSON document (defaults to `100`).
    pub fn with_max_json_depth(mut self, max_json_depth: usize) -> Self {
        self.max_json_depth = max_json_depth;
        self
    }

    /// Collation assumed for character columns with no known collation.
    pub fn with_default_collation(mut self, default_collation: Option<u16>) -> Self {
        self.default_collation = default_collation;
        self
    }

    pub fn server_version(&self) -> ServerVersion {
        self.server_version
    }

    pub fn label_policy(&self) -> LabelPolicy {
        self.label_policy
    }

    pub fn char_padding(&self) -> CharPadding {
        self.char_padding
    }

    pub fn max_json_depth(&self) -> usize {
        self.max_json_depth
    }

    pub fn default_collation(&self) -> Option<u16> {
        self.default_collation
    }
}
