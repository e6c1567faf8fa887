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

use super::CurrentRecord;
use crate::{
    RecordResult,
    catalog::FormatSource,
    format::ContentBlock,
    layout::RawSchema,
    player::RecordFormatHandler,
    record::ReaderIdentity,
};
use log::warn;
use std::sync::Arc;

/// Reads one content block of a record and hands it to the matching handler callback.
#[derive(Clone, Debug)]
pub enum ContentBlockReader {
    /// Reads the whole block, following the description provided by the file.
    Schema(Arc<RawSchema>),
    /// The following readers only locate the block. Handlers pull its bytes if they want them.
    Image,
    Audio,
    Custom,
    /// Used for unknown blocks, and schema blocks the file has no description for.
    Unsupported,
}

/// What to do after a block was handed to its handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BlockFlow {
    Continue,
    StoppedByHandler,
    IndeterminateSize,
}

impl ContentBlockReader {
    pub(super) fn for_block(
        identity: &ReaderIdentity,
        block_index: usize,
        block: &ContentBlock,
        source: &dyn FormatSource,
    ) -> Self {
        match block {
            ContentBlock::Schema { .. } => match source.schema_description(identity, block_index) {
                Some(schema) => ContentBlockReader::Schema(schema),
                None => {
                    warn!("No schema description for block #{block_index} of {identity}");
                    ContentBlockReader::Unsupported
                }
            },
            ContentBlock::Image(_) => ContentBlockReader::Image,
            ContentBlock::Audio(_) => ContentBlockReader::Audio,
            ContentBlock::Custom { .. } => ContentBlockReader::Custom,
            ContentBlock::Unsupported { .. } => ContentBlockReader::Unsupported,
        }
    }

    pub(crate) fn read_block<H: RecordFormatHandler + ?Sized>(
        &self,
        block_index: usize,
        block: &ContentBlock,
        is_last: bool,
        record: &mut CurrentRecord<'_>,
        handler: &mut H,
    ) -> RecordResult<BlockFlow> {
        if let ContentBlockReader::Schema(schema) = self {
            let schema_block = record.read_schema_block(block_index, block.static_size(), schema)?;
            let keep_going = handler.on_schema_block_read(record, block_index, &schema_block);
            return record.end_block(keep_going);
        }

        // Only the last block may take whatever is left of the record.
        let size = block
            .static_size()
            .or_else(|| is_last.then(|| record.remaining()));
        let Some(size) = size else {
            record.begin_indeterminate_block(block_index);
            handler.on_unsupported_block(record, block_index, block);
            record.take_failure()?;
            return Ok(BlockFlow::IndeterminateSize);
        };

        record.begin_block(block_index, size)?;
        let keep_going = match self {
            ContentBlockReader::Image => handler.on_image_read(record, block_index, block),
            ContentBlockReader::Audio => handler.on_audio_read(record, block_index, block),
            ContentBlockReader::Custom => handler.on_custom_block_read(record, block_index, block),
            ContentBlockReader::Schema(_) | ContentBlockReader::Unsupported => {
                handler.on_unsupported_block(record, block_index, block)
            }
        };
        record.end_block(keep_going)
    }
}
