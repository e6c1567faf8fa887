// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Identity of records: which stream they belong to, what kind they are and which block layout
//! applies to them.

use crate::{RecordResult, error::Details};
use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};
use strum_macros::{Display as StrumDisplay, EnumString};

/// Identifies a logical stream of records within a file.
///
/// A stream id is made of the type of device that recorded the stream and an instance number, to
/// tell apart several devices of the same type. Its text form is `<type>-<instance>`, e.g. `1201-1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StreamId {
    type_id: u16,
    instance: u16,
}

impl StreamId {
    pub const fn new(type_id: u16, instance: u16) -> Self {
        Self { type_id, instance }
    }

    pub fn type_id(&self) -> u16 {
        self.type_id
    }

    pub fn instance(&self) -> u16 {
        self.instance
    }
}

impl Display for StreamId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.type_id, self.instance)
    }
}

impl FromStr for StreamId {
    type Err = crate::Error;

    fn from_str(s: &str) -> RecordResult<Self> {
        let invalid = || Details::ParseStreamId(s.to_string());
        let (type_id, instance) = s.split_once('-').ok_or_else(invalid)?;
        Ok(Self {
            type_id: type_id.parse().map_err(|_| invalid())?,
            instance: instance.parse().map_err(|_| invalid())?,
        })
    }
}

impl TryFrom<String> for StreamId {
    type Error = crate::Error;

    fn try_from(value: String) -> RecordResult<Self> {
        value.parse()
    }
}

impl From<StreamId> for String {
    fn from(id: StreamId) -> Self {
        id.to_string()
    }
}

/// The category of a record. Orthogonal to the stream it belongs to.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    StrumDisplay,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Device state snapshot.
    State,
    /// Device configuration.
    Configuration,
    /// Device data, like sensor readings or frames.
    Data,
}

/// Which content block layout applies to the records of a stream and kind.
pub type FormatVersion = u32;

/// The key under which decoding state is cached.
///
/// At most one [`ReaderState`](crate::ReaderState) exists per identity in a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReaderIdentity {
    pub stream: StreamId,
    pub kind: RecordKind,
    pub format_version: FormatVersion,
}

impl ReaderIdentity {
    pub const fn new(stream: StreamId, kind: RecordKind, format_version: FormatVersion) -> Self {
        Self {
            stream,
            kind,
            format_version,
        }
    }
}

impl Display for ReaderIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/v{}", self.stream, self.kind, self.format_version)
    }
}

/// What the engine knows about a record before its payload is read.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecordHeader {
    /// Timestamp of the record, in seconds.
    pub timestamp: f64,
    pub stream: StreamId,
    pub kind: RecordKind,
    pub format_version: FormatVersion,
    /// Size of the record's payload, in bytes.
    pub payload_size: usize,
}

impl RecordHeader {
    pub fn identity(&self) -> ReaderIdentity {
        ReaderIdentity::new(self.stream, self.kind, self.format_version)
    }
}

/// Where the engine should put a record's payload before handing it to a player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DataReference {
    /// Leave the payload where it is. The player pulls bytes on demand.
    #[default]
    Lazy,
    /// Read the whole payload into memory before calling the player. The player still reads it
    /// from the start, from a reader over that memory.
    Buffered,
}
