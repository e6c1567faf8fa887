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

use crate::record::{ReaderIdentity, StreamId};
use std::{error::Error as _, fmt};

/// Errors encountered while playing records.
///
/// To inspect the details of the error use [`details`](Self::details) or [`into_details`](Self::into_details)
/// to get a [`Details`] which contains more precise error information.
///
/// A handler choosing to stop early, or a block whose size can't be established, are not errors.
/// Those are reported through [`StopReason`](crate::StopReason).
#[derive(thiserror::Error, Debug)]
#[repr(transparent)]
#[error(transparent)]
pub struct Error {
    details: Box<Details>,
}

impl Error {
    pub fn new(details: Details) -> Self {
        Self {
            details: Box::new(details),
        }
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn into_details(self) -> Details {
        *self.details
    }

    /// Whether this error was caused by the bytes of a record rather than by the configuration
    /// of the stream or the player.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            *self.details,
            Details::ReadBlock { .. }
                | Details::ReadPastBlockEnd { .. }
                | Details::SchemaBlockSize { .. }
                | Details::BlockExceedsRecord { .. }
                | Details::NoActiveBlock
        )
    }
}

impl From<Details> for Error {
    fn from(details: Details) -> Self {
        Self::new(details)
    }
}

#[derive(thiserror::Error)]
pub enum Details {
    #[error("Failed to read content block #{block_index}")]
    ReadBlock {
        block_index: usize,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Content block #{block_index} has {available} bytes left but {requested} were requested"
    )]
    ReadPastBlockEnd {
        block_index: usize,
        requested: usize,
        available: usize,
    },

    #[error(
        "Schema block #{block_index} declares {declared} bytes but its description needs {actual}"
    )]
    SchemaBlockSize {
        block_index: usize,
        declared: usize,
        actual: usize,
    },

    #[error("Content block #{block_index} needs {size} bytes but the record only has {remaining} left")]
    BlockExceedsRecord {
        block_index: usize,
        size: usize,
        remaining: usize,
    },

    #[error("No content block is being read")]
    NoActiveBlock,

    #[error(
        "Schema view for block #{block_index} was created as `{cached}` but `{requested}` was requested"
    )]
    SchemaViewMismatch {
        block_index: usize,
        cached: &'static str,
        requested: &'static str,
    },

    #[error("No record format is known for {0}")]
    UnknownRecordFormat(ReaderIdentity),

    #[error("Stream {0} does not exist in this file")]
    UnknownStream(StreamId),

    #[error("No player is attached to stream {0}")]
    StreamNotAttached(StreamId),

    #[error("Invalid record format `{text}`: {reason}")]
    ParseRecordFormat { text: String, reason: String },

    #[error("Invalid stream id `{0}`, expected `<type>-<instance>`")]
    ParseStreamId(String),

    #[error("Failed to parse stream catalog")]
    ParseCatalog(#[source] serde_json::Error),

    #[error("Failed to read stream catalog")]
    ReadCatalog(#[source] std::io::Error),

    #[error("Invalid field name: {0}")]
    InvalidFieldName(String),

    #[error("Field `{0}` is declared more than once")]
    DuplicateFieldName(String),

    #[error("Record #{index} does not exist, the file has {count} records")]
    RecordIndex { index: usize, count: usize },
}

impl fmt::Debug for Details {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut msg = self.to_string();
        if let Some(e) = self.source() {
            msg.extend([": ", &e.to_string()]);
        }
        write!(f, "{msg}")
    }
}
