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

//! Decoding state kept per [`ReaderIdentity`], and the context of the record being read.

mod block;

use crate::{
    RecordResult,
    cache::{SchemaCache, ViewCaches},
    catalog::FormatSource,
    error::{Details, Error},
    format::RecordFormat,
    layout::{RawSchema, SchemaBlock, SchemaView},
    record::{ReaderIdentity, RecordHeader},
};
pub use block::ContentBlockReader;
pub(crate) use block::BlockFlow;
use std::{
    io::{self, Read},
    sync::Arc,
};

/// Everything needed to decode the records of one [`ReaderIdentity`].
///
/// Created the first time a record of the identity is read, and kept for as long as the player is
/// attached to the stream.
#[derive(Debug)]
pub struct ReaderState {
    identity: ReaderIdentity,
    pub(crate) last_read_timestamp: Option<f64>,
    pub(crate) format: RecordFormat,
    pub(crate) readers: Vec<ContentBlockReader>,
    pub(crate) views: ViewCaches,
}

impl ReaderState {
    pub(crate) fn new(
        identity: ReaderIdentity,
        format: RecordFormat,
        source: &dyn FormatSource,
    ) -> Self {
        let readers = format
            .blocks()
            .iter()
            .enumerate()
            .map(|(index, block)| ContentBlockReader::for_block(&identity, index, block, source))
            .collect();
        Self {
            identity,
            last_read_timestamp: None,
            format,
            readers,
            views: ViewCaches::default(),
        }
    }

    pub fn identity(&self) -> &ReaderIdentity {
        &self.identity
    }

    pub fn record_format(&self) -> &RecordFormat {
        &self.format
    }

    pub fn content_readers(&self) -> &[ContentBlockReader] {
        &self.readers
    }

    /// Timestamp of the last record read with this state, or `None` if none was read yet.
    ///
    /// This is the most recent record handed to the player, not the largest timestamp: reading
    /// records out of order moves it backwards.
    pub fn last_read_timestamp(&self) -> Option<f64> {
        self.last_read_timestamp
    }

    pub fn expected_views(&self) -> &SchemaCache {
        &self.views.expected
    }

    pub fn legacy_views(&self) -> &SchemaCache {
        &self.views.legacy
    }
}

#[derive(Clone, Copy, Debug)]
struct ActiveBlock {
    index: usize,
    /// `None` when the block's size couldn't be established.
    size: Option<usize>,
    remaining: usize,
}

/// The record being read, as seen by handler callbacks.
///
/// Gives access to the record's metadata, to the bytes of the current content block and to the
/// cached schema views of the record's [`ReaderIdentity`]. It only lives for the duration of one
/// record.
pub struct CurrentRecord<'a> {
    header: &'a RecordHeader,
    format: &'a RecordFormat,
    views: &'a mut ViewCaches,
    reader: &'a mut dyn Read,
    /// Bytes of the record not yet claimed by a block.
    remaining: usize,
    block: Option<ActiveBlock>,
    /// The first read or view failure, surfaced once the handler returns.
    failure: Option<Error>,
}

impl<'a> CurrentRecord<'a> {
    pub(crate) fn new(
        header: &'a RecordHeader,
        format: &'a RecordFormat,
        views: &'a mut ViewCaches,
        reader: &'a mut dyn Read,
    ) -> Self {
        Self {
            header,
            format,
            views,
            reader,
            remaining: header.payload_size,
            block: None,
            failure: None,
        }
    }

    pub fn header(&self) -> &RecordHeader {
        self.header
    }

    pub fn timestamp(&self) -> f64 {
        self.header.timestamp
    }

    pub fn identity(&self) -> ReaderIdentity {
        self.header.identity()
    }

    pub fn record_format(&self) -> &RecordFormat {
        self.format
    }

    /// Index of the content block being read.
    pub fn block_index(&self) -> Option<usize> {
        self.block.map(|block| block.index)
    }

    /// Size of the content block being read, if it could be established.
    pub fn block_size(&self) -> Option<usize> {
        self.block.and_then(|block| block.size)
    }

    /// Bytes of the current content block that haven't been read yet.
    pub fn block_remaining(&self) -> usize {
        self.block.map_or(0, |block| block.remaining)
    }

    /// Bytes of the record after the current content block.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Read the next `dest.len()` bytes of the current content block.
    ///
    /// A failure also fails the record, whatever the handler returns afterwards.
    pub fn read(&mut self, dest: &mut [u8]) -> RecordResult<()> {
        let Some(block) = self.block.as_mut() else {
            return Err(self.fail(Details::NoActiveBlock.into()));
        };
        let block_index = block.index;
        let available = block.remaining;
        if dest.len() > available {
            return Err(self.fail(
                Details::ReadPastBlockEnd {
                    block_index,
                    requested: dest.len(),
                    available,
                }
                .into(),
            ));
        }
        block.remaining -= dest.len();
        if let Err(source) = self.reader.read_exact(dest) {
            return Err(self.fail(
                Details::ReadBlock {
                    block_index,
                    source,
                }
                .into(),
            ));
        }
        Ok(())
    }

    /// Read what is left of the current content block.
    pub fn read_to_end(&mut self) -> RecordResult<Vec<u8>> {
        let mut bytes = vec![0; self.block_remaining()];
        self.read(&mut bytes)?;
        Ok(bytes)
    }

    /// The view of type `T` for a schema block, bound against the block's description the first
    /// time it is requested for this [`ReaderIdentity`].
    ///
    /// Requesting a block index with a different type than it was first requested with fails, and
    /// fails the record too.
    pub fn expected_view<T: SchemaView>(
        &mut self,
        block_index: usize,
        block: &SchemaBlock,
    ) -> RecordResult<&mut T> {
        match self.views.expected.get_or_bind::<T>(block_index, block.schema()) {
            Ok(view) => Ok(view),
            Err(error) => Err(Self::record_failure(&mut self.failure, error)),
        }
    }

    /// Like [`expected_view`](Self::expected_view), for views of fields that are no longer part
    /// of the current layout but that older files still have.
    pub fn legacy_view<T: SchemaView>(
        &mut self,
        block_index: usize,
        block: &SchemaBlock,
    ) -> RecordResult<&mut T> {
        match self.views.legacy.get_or_bind::<T>(block_index, block.schema()) {
            Ok(view) => Ok(view),
            Err(error) => Err(Self::record_failure(&mut self.failure, error)),
        }
    }

    /// Keep the first failure of the record, and hand the caller an equivalent error. The record
    /// keeps the original, with its source.
    fn fail(&mut self, error: Error) -> Error {
        Self::record_failure(&mut self.failure, error)
    }

    fn record_failure(failure: &mut Option<Error>, error: Error) -> Error {
        if failure.is_some() {
            return error;
        }
        let Some(copy) = duplicate(error.details()) else {
            return error;
        };
        *failure = Some(error);
        copy.into()
    }

    pub(crate) fn take_failure(&mut self) -> RecordResult<()> {
        match self.failure.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Take `len` bytes of the record, for a block that is being located.
    fn take(&mut self, block_index: usize, len: usize) -> RecordResult<Vec<u8>> {
        if len > self.remaining {
            return Err(Details::BlockExceedsRecord {
                block_index,
                size: len,
                remaining: self.remaining,
            }
            .into());
        }
        let mut bytes = vec![0; len];
        self.reader
            .read_exact(&mut bytes)
            .map_err(|source| Details::ReadBlock {
                block_index,
                source,
            })?;
        self.remaining -= len;
        Ok(bytes)
    }

    fn read_schema_block(
        &mut self,
        block_index: usize,
        declared: Option<usize>,
        schema: &Arc<RawSchema>,
    ) -> RecordResult<SchemaBlock> {
        let header_size = schema.header_size();
        let bytes = match declared {
            Some(declared) => {
                let bytes = self.take(block_index, declared)?;
                let actual = if bytes.len() < header_size {
                    header_size
                } else {
                    schema.block_size(&bytes)
                };
                if actual != declared {
                    return Err(Details::SchemaBlockSize {
                        block_index,
                        declared,
                        actual,
                    }
                    .into());
                }
                bytes
            }
            None => {
                let mut bytes = self.take(block_index, header_size)?;
                let variable = schema.block_size(&bytes) - header_size;
                bytes.extend(self.take(block_index, variable)?);
                bytes
            }
        };
        let size = bytes.len();
        let block = SchemaBlock::new(schema.clone(), bytes).ok_or(Details::SchemaBlockSize {
            block_index,
            declared: size,
            actual: size,
        })?;
        self.block = Some(ActiveBlock {
            index: block_index,
            size: Some(size),
            remaining: 0,
        });
        Ok(block)
    }

    fn begin_block(&mut self, block_index: usize, size: usize) -> RecordResult<()> {
        if size > self.remaining {
            return Err(Details::BlockExceedsRecord {
                block_index,
                size,
                remaining: self.remaining,
            }
            .into());
        }
        self.remaining -= size;
        self.block = Some(ActiveBlock {
            index: block_index,
            size: Some(size),
            remaining: size,
        });
        Ok(())
    }

    fn begin_indeterminate_block(&mut self, block_index: usize) {
        self.block = Some(ActiveBlock {
            index: block_index,
            size: None,
            remaining: 0,
        });
    }

    /// Close the current block, skipping whatever the handler didn't read when the walk goes on.
    fn end_block(&mut self, keep_going: bool) -> RecordResult<BlockFlow> {
        self.take_failure()?;
        let block = self.block.take();
        if !keep_going {
            return Ok(BlockFlow::StoppedByHandler);
        }
        if let Some(ActiveBlock {
            index, remaining, ..
        }) = block
            && remaining > 0
        {
            let skipped = io::copy(
                &mut (&mut *self.reader).take(remaining as u64),
                &mut io::sink(),
            )
            .map_err(|source| Details::ReadBlock {
                block_index: index,
                source,
            })?;
            if skipped < remaining as u64 {
                return Err(Details::ReadBlock {
                    block_index: index,
                    source: io::ErrorKind::UnexpectedEof.into(),
                }
                .into());
            }
        }
        Ok(BlockFlow::Continue)
    }
}

/// A copy of the failures a handler can run into while reading a block.
fn duplicate(details: &Details) -> Option<Details> {
    let copy = match details {
        Details::ReadBlock {
            block_index,
            source,
        } => Details::ReadBlock {
            block_index: *block_index,
            source: io::Error::new(source.kind(), source.to_string()),
        },
        Details::ReadPastBlockEnd {
            block_index,
            requested,
            available,
        } => Details::ReadPastBlockEnd {
            block_index: *block_index,
            requested: *requested,
            available: *available,
        },
        Details::SchemaViewMismatch {
            block_index,
            cached,
            requested,
        } => Details::SchemaViewMismatch {
            block_index: *block_index,
            cached: *cached,
            requested: *requested,
        },
        Details::NoActiveBlock => Details::NoActiveBlock,
        _ => return None,
    };
    Some(copy)
}
