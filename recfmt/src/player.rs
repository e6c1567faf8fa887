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

//! Players receive records from the engine reading a file.
//!
//! [`RecordFormatPlayer`] walks the content blocks of every record in order and hands each one to
//! the callback of a [`RecordFormatHandler`] that matches the block's kind.

use crate::{
    RecordResult,
    catalog::FormatSource,
    error::Details,
    format::ContentBlock,
    layout::SchemaBlock,
    reader::{BlockFlow, CurrentRecord, ReaderState},
    record::{DataReference, ReaderIdentity, RecordHeader, RecordKind, StreamId},
};
use log::{debug, trace, warn};
use std::{
    collections::{HashMap, hash_map::Entry},
    io::Read,
    sync::Arc,
};

/// What the engine reading a file expects from the objects it hands records to.
pub trait StreamPlayer {
    /// Called when the player is attached to `stream`. Failing means the stream's records can't be
    /// played, and must be reported to whoever attached the player.
    fn on_attached(&mut self, source: Arc<dyn FormatSource>, stream: StreamId) -> RecordResult<()>;

    /// Called before a record's payload is read. Returns where the payload should be put, or
    /// `None` to skip the record without reading it.
    fn process_record_header(&mut self, header: &RecordHeader) -> Option<DataReference>;

    /// Called with the record's payload. `payload` always yields the whole payload from its first
    /// byte, whatever [`DataReference`] was returned for the header. `read_size` is the number of
    /// those bytes the engine already holds in memory, so it is `0` for
    /// [`DataReference::Lazy`] and the payload length for [`DataReference::Buffered`].
    fn process_record(
        &mut self,
        header: &RecordHeader,
        payload: &mut dyn Read,
        read_size: usize,
    ) -> RecordResult<RecordOutcome>;
}

/// Callbacks of a [`RecordFormatPlayer`], one per kind of content block.
///
/// Every callback returns whether the remaining blocks of the record should be read. Returning
/// `false` is not an error: it stops the record early, for instance when only the first block of
/// metadata is needed.
///
/// Only the callbacks for the blocks an application cares about need to be implemented. The image,
/// audio and custom callbacks fall back to [`on_unsupported_block`](Self::on_unsupported_block).
pub trait RecordFormatHandler {
    /// Decide whether a record should be read at all, before any of its bytes are.
    fn on_record_header(&mut self, header: &RecordHeader) -> bool {
        let _ = header;
        true
    }

    /// A schema block was read. Use [`CurrentRecord::expected_view`] to read its fields through a
    /// typed view.
    fn on_schema_block_read(
        &mut self,
        record: &mut CurrentRecord<'_>,
        block_index: usize,
        block: &SchemaBlock,
    ) -> bool {
        let _ = (record, block_index, block);
        true
    }

    /// An image block was located. Its bytes haven't been read: use [`CurrentRecord::read`] to get
    /// them. Bytes left unread are skipped.
    fn on_image_read(
        &mut self,
        record: &mut CurrentRecord<'_>,
        block_index: usize,
        block: &ContentBlock,
    ) -> bool {
        self.on_unsupported_block(record, block_index, block)
    }

    /// An audio block was located. Its bytes haven't been read.
    fn on_audio_read(
        &mut self,
        record: &mut CurrentRecord<'_>,
        block_index: usize,
        block: &ContentBlock,
    ) -> bool {
        self.on_unsupported_block(record, block_index, block)
    }

    /// A custom block was located. Its bytes haven't been read.
    fn on_custom_block_read(
        &mut self,
        record: &mut CurrentRecord<'_>,
        block_index: usize,
        block: &ContentBlock,
    ) -> bool {
        self.on_unsupported_block(record, block_index, block)
    }

    /// Called for blocks that can't be decoded, and for the blocks of the kinds above when their
    /// callback isn't implemented.
    ///
    /// When the size of the block can't be established, nothing after this block can be located
    /// and the record stops here whatever this returns. By default, other blocks are skipped.
    fn on_unsupported_block(
        &mut self,
        record: &mut CurrentRecord<'_>,
        block_index: usize,
        block: &ContentBlock,
    ) -> bool {
        let _ = (block_index, block);
        record.block_size().is_some()
    }
}

/// Why the walk over a record's blocks ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Every block was handed to its callback.
    Completed,
    /// The callback of this block returned `false`.
    StoppedByHandler { block_index: usize },
    /// The size of this block couldn't be established, so no later block could be located. The
    /// blocks before it were read correctly.
    IndeterminateBlockSize { block_index: usize },
}

/// The result of reading a record with a [`RecordFormatPlayer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Number of blocks handed to their callback, including one that stopped the record.
    pub blocks_read: usize,
    pub stop: StopReason,
}

impl RecordOutcome {
    pub fn is_complete(&self) -> bool {
        self.stop == StopReason::Completed
    }
}

/// The reader states of a player, by identity.
#[derive(Default)]
struct ReaderStates {
    sources: HashMap<StreamId, Arc<dyn FormatSource>>,
    readers: HashMap<ReaderIdentity, ReaderState>,
    /// The identity most recently read for each stream and kind.
    last_reader: HashMap<(StreamId, RecordKind), ReaderIdentity>,
}

impl ReaderStates {
    fn attach(&mut self, source: Arc<dyn FormatSource>, stream: StreamId) {
        self.readers.retain(|identity, _| identity.stream != stream);
        self.last_reader.retain(|(id, _), _| *id != stream);
        self.sources.insert(stream, source);
    }

    fn get_or_create(&mut self, identity: ReaderIdentity) -> RecordResult<&mut ReaderState> {
        let source = self
            .sources
            .get(&identity.stream)
            .ok_or(Details::StreamNotAttached(identity.stream))?;
        let state = match self.readers.entry(identity) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let Some(format) = source.record_format(&identity) else {
                    warn!("No record format for {identity}, its records can't be read");
                    return Err(Details::UnknownRecordFormat(identity).into());
                };
                debug!("Reading {identity} as `{format}`");
                entry.insert(ReaderState::new(identity, format, source.as_ref()))
            }
        };
        self.last_reader
            .insert((identity.stream, identity.kind), identity);
        Ok(state)
    }
}

/// A [`StreamPlayer`] for records made of content blocks, which are decoded in order and handed
/// to the callbacks of a [`RecordFormatHandler`].
///
/// The blocks of a record are read until they are all read, a callback returns `false`, a block
/// can't be located or reading fails. One player may be attached to several streams: each
/// [`ReaderIdentity`] it meets gets its own [`ReaderState`].
///
/// Players are not meant to be shared between threads: records are handed to them one at a time.
pub struct RecordFormatPlayer<H> {
    handler: H,
    states: ReaderStates,
}

impl<H: RecordFormatHandler> RecordFormatPlayer<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            states: ReaderStates::default(),
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Whether the player was attached to this stream.
    pub fn is_attached(&self, stream: StreamId) -> bool {
        self.states.sources.contains_key(&stream)
    }

    /// The state of an identity, if one of its records was read.
    pub fn reader_state(&self, identity: &ReaderIdentity) -> Option<&ReaderState> {
        self.states.readers.get(identity)
    }

    /// The state most recently used for records of this stream and kind, whatever their format
    /// version.
    pub fn last_reader_state(&self, stream: StreamId, kind: RecordKind) -> Option<&ReaderState> {
        let identity = self.states.last_reader.get(&(stream, kind))?;
        self.states.readers.get(identity)
    }

    /// Number of identities this player has decoding state for.
    pub fn reader_count(&self) -> usize {
        self.states.readers.len()
    }
}

impl<H: RecordFormatHandler> StreamPlayer for RecordFormatPlayer<H> {
    fn on_attached(&mut self, source: Arc<dyn FormatSource>, stream: StreamId) -> RecordResult<()> {
        if !source.has_stream(stream) {
            return Err(Details::UnknownStream(stream).into());
        }
        debug!("Attached to stream {stream}");
        self.states.attach(source, stream);
        Ok(())
    }

    fn process_record_header(&mut self, header: &RecordHeader) -> Option<DataReference> {
        if !self.is_attached(header.stream) {
            trace!("Skipping record of unattached stream {}", header.stream);
            return None;
        }
        // Blocks are pulled from the payload as they are walked.
        self.handler
            .on_record_header(header)
            .then_some(DataReference::Lazy)
    }

    fn process_record(
        &mut self,
        header: &RecordHeader,
        payload: &mut dyn Read,
        read_size: usize,
    ) -> RecordResult<RecordOutcome> {
        if read_size > 0 {
            trace!("Ignoring {read_size} bytes read in advance, blocks are read from the payload");
        }
        let identity = header.identity();
        let state = self.states.get_or_create(identity)?;
        // Set before the walk, so records stopped early count as read.
        state.last_read_timestamp = Some(header.timestamp);

        let ReaderState {
            format,
            readers,
            views,
            ..
        } = state;
        let (format, readers) = (&*format, &*readers);
        let mut record = CurrentRecord::new(header, format, views, payload);
        let mut blocks_read = 0;
        for (block_index, (block, reader)) in format.blocks().iter().zip(readers).enumerate() {
            trace!("Block #{block_index} of {identity}: {block}");
            let is_last = block_index + 1 == format.len();
            match reader.read_block(block_index, block, is_last, &mut record, &mut self.handler)? {
                BlockFlow::Continue => blocks_read += 1,
                BlockFlow::StoppedByHandler => {
                    return Ok(RecordOutcome {
                        blocks_read: blocks_read + 1,
                        stop: StopReason::StoppedByHandler { block_index },
                    });
                }
                BlockFlow::IndeterminateSize => {
                    warn!(
                        "Can't establish the size of block #{block_index} ({block}) of {identity}, skipping the rest of the record"
                    );
                    return Ok(RecordOutcome {
                        blocks_read,
                        stop: StopReason::IndeterminateBlockSize { block_index },
                    });
                }
            }
        }
        if record.remaining() > 0 {
            warn!(
                "{} bytes left unread after the last block of a {identity} record",
                record.remaining()
            );
        }
        Ok(RecordOutcome {
            blocks_read,
            stop: StopReason::Completed,
        })
    }
}
