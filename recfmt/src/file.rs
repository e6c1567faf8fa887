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

//! An in-memory record file, handing its records to [`StreamPlayer`]s.

use crate::{
    RecordResult,
    catalog::{FormatSource, StreamCatalog},
    error::Details,
    player::{RecordOutcome, StreamPlayer},
    record::{DataReference, FormatVersion, RecordHeader, RecordKind, StreamId},
};
use log::{debug, trace};
use std::sync::Arc;

/// A record as it is stored in a [`RecordFile`].
#[derive(bon::Builder, Clone, Debug, PartialEq)]
pub struct StoredRecord {
    pub timestamp: f64,
    pub stream: StreamId,
    pub kind: RecordKind,
    #[builder(default = 1)]
    pub format_version: FormatVersion,
    #[builder(default)]
    pub payload: Vec<u8>,
}

impl StoredRecord {
    pub fn header(&self) -> RecordHeader {
        RecordHeader {
            timestamp: self.timestamp,
            stream: self.stream,
            kind: self.kind,
            format_version: self.format_version,
            payload_size: self.payload.len(),
        }
    }
}

/// The streams of a file, described by a [`StreamCatalog`], and their records, in file order.
#[derive(Clone, Debug)]
pub struct RecordFile {
    catalog: Arc<StreamCatalog>,
    records: Vec<StoredRecord>,
}

impl RecordFile {
    pub fn new(catalog: StreamCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            records: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &StreamCatalog {
        &self.catalog
    }

    pub fn records(&self) -> &[StoredRecord] {
        &self.records
    }

    pub fn push(&mut self, record: StoredRecord) {
        self.records.push(record);
    }

    /// Attach `player` to one of the file's streams.
    pub fn attach<P: StreamPlayer + ?Sized>(
        &self,
        player: &mut P,
        stream: StreamId,
    ) -> RecordResult<()> {
        if !self.catalog.has_stream(stream) {
            return Err(Details::UnknownStream(stream).into());
        }
        let source: Arc<dyn FormatSource> = self.catalog.clone();
        player.on_attached(source, stream)
    }

    /// Hand the record at `index` to `player`.
    ///
    /// Returns `None` when the player declined the record after seeing its header.
    pub fn read_record<P: StreamPlayer + ?Sized>(
        &self,
        index: usize,
        player: &mut P,
    ) -> RecordResult<Option<RecordOutcome>> {
        let record = self.records.get(index).ok_or(Details::RecordIndex {
            index,
            count: self.records.len(),
        })?;
        let header = record.header();
        let read_size = match player.process_record_header(&header) {
            None => {
                trace!("Record #{index} declined by the player");
                return Ok(None);
            }
            Some(DataReference::Lazy) => 0,
            Some(DataReference::Buffered) => record.payload.len(),
        };
        player
            .process_record(&header, &mut record.payload.as_slice(), read_size)
            .map(Some)
    }

    /// Hand every record to `player`, in file order. A record that fails doesn't prevent the
    /// following ones from being read.
    pub fn read_all_records<P: StreamPlayer + ?Sized>(
        &self,
        player: &mut P,
    ) -> Vec<RecordResult<Option<RecordOutcome>>> {
        (0..self.records.len())
            .map(|index| {
                let result = self.read_record(index, player);
                if let Err(e) = &result {
                    debug!("Failed to read record #{index}: {e}");
                }
                result
            })
            .collect()
    }
}
