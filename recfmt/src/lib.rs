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

//! **recfmt** decodes the records of multi-stream recording files, whose payloads are sequences of
//! typed content blocks.
//!
//! Every record belongs to a stream, has a kind ([`RecordKind`]) and a format version. Together
//! they form a [`ReaderIdentity`], which determines the [`RecordFormat`] of the record: the
//! ordered list of content blocks its payload is made of. Schema blocks hold fields described by
//! a [`RawSchema`], image, audio and custom blocks hold opaque data.
//!
//! Applications implement [`RecordFormatHandler`] and wrap it in a [`RecordFormatPlayer`], which
//! walks the blocks of every record in order and calls the handler back once per block:
//!
//! ```
//! use recfmt::{
//!     ContentBlock, CurrentRecord, RecordFile, RecordFormatHandler, RecordFormatPlayer,
//!     RecordKind, StoredRecord, StreamCatalog, StreamId,
//! };
//!
//! #[derive(Default)]
//! struct Sizes(Vec<usize>);
//!
//! impl RecordFormatHandler for Sizes {
//!     fn on_custom_block_read(
//!         &mut self,
//!         record: &mut CurrentRecord<'_>,
//!         _block_index: usize,
//!         _block: &ContentBlock,
//!     ) -> bool {
//!         self.0.extend(record.block_size());
//!         true
//!     }
//! }
//!
//! # fn main() -> recfmt::RecordResult<()> {
//! let stream = StreamId::new(100, 1);
//! let mut catalog = StreamCatalog::new();
//! catalog
//!     .add_stream(stream)
//!     .add_format(RecordKind::Data, 1, "custom/size=4+custom".parse()?);
//!
//! let mut file = RecordFile::new(catalog);
//! file.push(
//!     StoredRecord::builder()
//!         .timestamp(0.5)
//!         .stream(stream)
//!         .kind(RecordKind::Data)
//!         .payload(vec![0; 10])
//!         .build(),
//! );
//!
//! let mut player = RecordFormatPlayer::new(Sizes::default());
//! file.attach(&mut player, stream)?;
//! file.read_record(0, &mut player)?;
//! assert_eq!(player.handler().0, [4, 6]);
//! # Ok(())
//! # }
//! ```
//!
//! Fields of schema blocks are read through [`SchemaView`]s: structs of [`Field`]s bound to the
//! block's description the first time the block is met, then cached for every later record of the
//! same identity.
//!
//! # Features
//!
//! - `derive`: enable `#[derive(SchemaView)]`
//!
//! # MSRV
//!
//! The current MSRV is 1.88.0.

mod cache;
mod file;
mod player;
mod reader;

pub mod catalog;
pub mod error;
pub mod format;
pub mod layout;
pub mod record;

pub use cache::{SchemaCache, ViewCaches};
pub use catalog::{FormatDescription, FormatSource, StreamCatalog, StreamDescription};
pub use error::Error;
pub use file::{RecordFile, StoredRecord};
pub use format::{
    AudioFormat, AudioSampleFormat, AudioSpec, BlockKind, ContentBlock, ImageFormat, ImageSpec,
    PixelFormat, RecordFormat,
};
pub use layout::{Field, FieldDescription, FieldType, FieldValue, RawSchema, SchemaBlock};
pub use player::{
    RecordFormatHandler, RecordFormatPlayer, RecordOutcome, StopReason, StreamPlayer,
};
pub use reader::{ContentBlockReader, CurrentRecord, ReaderState};
pub use record::{
    DataReference, FormatVersion, ReaderIdentity, RecordHeader, RecordKind, StreamId,
};

pub use layout::SchemaView;
#[cfg(feature = "derive")]
pub use recfmt_derive::SchemaView;

/// A convenience type alias for `Result`s with `Error`s.
pub type RecordResult<T> = Result<T, Error>;
