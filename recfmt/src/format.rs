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

//! Description of a record's payload as an ordered list of typed content blocks.
//!
//! A [`RecordFormat`] has a compact text form, where content blocks are joined with `+` and each
//! block is a list of `/` separated tokens, the first one being the block's kind:
//!
//! ```
//! # use recfmt::{ContentBlock, RecordFormat};
//! let format: RecordFormat = "schema+image/raw/640x480/pixel=grey8+custom".parse().unwrap();
//! assert_eq!(format.len(), 3);
//! assert_eq!(format.block(1).and_then(ContentBlock::static_size), Some(640 * 480));
//! ```

use crate::{RecordResult, error::Details};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
    sync::OnceLock,
};
use strum_macros::{Display as StrumDisplay, EnumDiscriminants, EnumString};

/// Describes one content block of a record.
///
/// The description is static: it is the same for every record of a given
/// [`ReaderIdentity`](crate::ReaderIdentity). Only what can be known without looking at the
/// record's bytes is described here.
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(BlockKind), derive(Hash, Ord, PartialOrd))]
pub enum ContentBlock {
    /// A block of fields described by a [`RawSchema`](crate::RawSchema).
    Schema { size: Option<usize> },
    Image(ImageSpec),
    Audio(AudioSpec),
    /// Opaque bytes only the application knows how to interpret.
    Custom { size: Option<usize> },
    /// A block this library doesn't know. Its description text is kept verbatim.
    Unsupported { description: String },
}

impl ContentBlock {
    pub fn kind(&self) -> BlockKind {
        self.into()
    }

    /// The block's size in bytes, if it can be known from the description alone.
    pub fn static_size(&self) -> Option<usize> {
        match self {
            ContentBlock::Schema { size } | ContentBlock::Custom { size } => *size,
            ContentBlock::Image(image) => image.size(),
            ContentBlock::Audio(audio) => audio.size(),
            ContentBlock::Unsupported { .. } => None,
        }
    }
}

/// How an image block's bytes are encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, StrumDisplay, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ImageFormat {
    /// Uncompressed pixels, in the block's [`PixelFormat`].
    Raw,
    Jpg,
    Png,
    /// A frame compressed by the video codec named in the description.
    Video,
}

/// Pixel layout of raw images.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, StrumDisplay, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum PixelFormat {
    Grey8,
    Grey16,
    Rgb8,
    Bgr8,
    Rgba8,
    Depth32f,
    Rgb32f,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Grey8 => 1,
            PixelFormat::Grey16 => 2,
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => 3,
            PixelFormat::Rgba8 | PixelFormat::Depth32f => 4,
            PixelFormat::Rgb32f => 12,
        }
    }
}

/// Describes an image content block.
#[derive(bon::Builder, Clone, Debug, PartialEq)]
pub struct ImageSpec {
    #[builder(start_fn)]
    pub format: ImageFormat,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub pixel_format: Option<PixelFormat>,
    /// Name of the video codec, for [`ImageFormat::Video`] blocks.
    #[builder(into)]
    pub codec: Option<String>,
    /// Explicit size of the block, in bytes.
    pub size: Option<usize>,
}

impl ImageSpec {
    /// The size of the image data, when it's declared or can be computed from a raw image's
    /// dimensions and pixel format.
    pub fn size(&self) -> Option<usize> {
        if self.size.is_some() {
            return self.size;
        }
        match (self.format, self.width, self.height, self.pixel_format) {
            (ImageFormat::Raw, Some(width), Some(height), Some(pixel_format)) => (width as usize)
                .checked_mul(height as usize)?
                .checked_mul(pixel_format.bytes_per_pixel()),
            _ => None,
        }
    }
}

/// How an audio block's bytes are encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, StrumDisplay, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum AudioFormat {
    /// Uncompressed samples, interleaved by channel.
    Pcm,
    Opus,
}

/// Layout of a single PCM sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, StrumDisplay, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum AudioSampleFormat {
    S8,
    U8,
    S16le,
    S16be,
    S24le,
    S32le,
    F32le,
    F64le,
}

impl AudioSampleFormat {
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            AudioSampleFormat::S8 | AudioSampleFormat::U8 => 1,
            AudioSampleFormat::S16le | AudioSampleFormat::S16be => 2,
            AudioSampleFormat::S24le => 3,
            AudioSampleFormat::S32le | AudioSampleFormat::F32le => 4,
            AudioSampleFormat::F64le => 8,
        }
    }
}

/// Describes an audio content block.
#[derive(bon::Builder, Clone, Debug, PartialEq)]
pub struct AudioSpec {
    #[builder(start_fn)]
    pub format: AudioFormat,
    pub sample_format: Option<AudioSampleFormat>,
    pub channels: Option<u8>,
    pub sample_rate: Option<u32>,
    /// Number of samples per channel in the block.
    pub sample_count: Option<u32>,
    /// Explicit size of the block, in bytes.
    pub size: Option<usize>,
}

impl AudioSpec {
    /// The size of the audio data, when it's declared or can be computed from the PCM layout.
    pub fn size(&self) -> Option<usize> {
        if self.size.is_some() {
            return self.size;
        }
        match (
            self.format,
            self.sample_format,
            self.channels,
            self.sample_count,
        ) {
            (AudioFormat::Pcm, Some(sample_format), Some(channels), Some(sample_count)) => {
                sample_format
                    .bytes_per_sample()
                    .checked_mul(channels as usize)?
                    .checked_mul(sample_count as usize)
            }
            _ => None,
        }
    }
}

/// The ordered list of content blocks every record of a [`ReaderIdentity`](crate::ReaderIdentity)
/// is made of.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordFormat {
    blocks: Vec<ContentBlock>,
}

impl RecordFormat {
    pub fn new(blocks: Vec<ContentBlock>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&ContentBlock> {
        self.blocks.get(index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl FromIterator<ContentBlock> for RecordFormat {
    fn from_iter<T: IntoIterator<Item = ContentBlock>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl FromStr for RecordFormat {
    type Err = crate::Error;

    fn from_str(s: &str) -> RecordResult<Self> {
        if s.is_empty() {
            return Ok(Self::default());
        }
        s.split('+')
            .map(|block| {
                parse_block(block).map_err(|reason| {
                    crate::Error::from(Details::ParseRecordFormat {
                        text: s.to_string(),
                        reason,
                    })
                })
            })
            .collect()
    }
}

impl TryFrom<String> for RecordFormat {
    type Error = crate::Error;

    fn try_from(value: String) -> RecordResult<Self> {
        value.parse()
    }
}

impl From<RecordFormat> for String {
    fn from(format: RecordFormat) -> Self {
        format.to_string()
    }
}

impl Display for RecordFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (index, block) in self.blocks.iter().enumerate() {
            if index > 0 {
                f.write_str("+")?;
            }
            write!(f, "{block}")?;
        }
        Ok(())
    }
}

impl Display for ContentBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ContentBlock::Schema { size } => {
                f.write_str("schema")?;
                write_size(f, *size)
            }
            ContentBlock::Custom { size } => {
                f.write_str("custom")?;
                write_size(f, *size)
            }
            ContentBlock::Image(image) => {
                write!(f, "image/{}", image.format)?;
                if let (Some(width), Some(height)) = (image.width, image.height) {
                    write!(f, "/{width}x{height}")?;
                }
                if let Some(pixel_format) = image.pixel_format {
                    write!(f, "/pixel={pixel_format}")?;
                }
                if let Some(codec) = &image.codec {
                    write!(f, "/codec={codec}")?;
                }
                write_size(f, image.size)
            }
            ContentBlock::Audio(audio) => {
                write!(f, "audio/{}", audio.format)?;
                if let Some(sample_format) = audio.sample_format {
                    write!(f, "/sample={sample_format}")?;
                }
                if let Some(channels) = audio.channels {
                    write!(f, "/channels={channels}")?;
                }
                if let Some(rate) = audio.sample_rate {
                    write!(f, "/rate={rate}")?;
                }
                if let Some(samples) = audio.sample_count {
                    write!(f, "/samples={samples}")?;
                }
                write_size(f, audio.size)
            }
            ContentBlock::Unsupported { description } => f.write_str(description),
        }
    }
}

fn write_size(f: &mut Formatter<'_>, size: Option<usize>) -> fmt::Result {
    match size {
        Some(size) => write!(f, "/size={size}"),
        None => Ok(()),
    }
}

fn dimensions_regex() -> &'static Regex {
    static DIMENSIONS_ONCE: OnceLock<Regex> = OnceLock::new();
    DIMENSIONS_ONCE
        .get_or_init(|| Regex::new(r"^(?P<width>[0-9]+)x(?P<height>[0-9]+)$").expect("Regex is valid"))
}

fn parse_block(text: &str) -> Result<ContentBlock, String> {
    let mut tokens = text.split('/');
    let kind = tokens.next().unwrap_or_default();
    match kind {
        "schema" => {
            let mut size = None;
            for token in tokens {
                size = Some(parse_size(token)?);
            }
            Ok(ContentBlock::Schema { size })
        }
        "custom" => {
            let mut size = None;
            for token in tokens {
                size = Some(parse_size(token)?);
            }
            Ok(ContentBlock::Custom { size })
        }
        "image" => {
            let format = parse_token::<ImageFormat>(tokens.next(), "image format")?;
            let mut image = ImageSpec::builder(format).build();
            for token in tokens {
                if let Some(captures) = dimensions_regex().captures(token) {
                    image.width = Some(parse_number(&captures["width"])?);
                    image.height = Some(parse_number(&captures["height"])?);
                    continue;
                }
                match split_key(token)? {
                    ("pixel", value) => {
                        image.pixel_format = Some(parse_token(Some(value), "pixel format")?)
                    }
                    ("codec", value) => image.codec = Some(value.to_string()),
                    ("size", value) => image.size = Some(parse_number(value)?),
                    (key, _) => return Err(format!("unknown image property `{key}`")),
                }
            }
            Ok(ContentBlock::Image(image))
        }
        "audio" => {
            let format = parse_token::<AudioFormat>(tokens.next(), "audio format")?;
            let mut audio = AudioSpec::builder(format).build();
            for token in tokens {
                match split_key(token)? {
                    ("sample", value) => {
                        audio.sample_format = Some(parse_token(Some(value), "sample format")?)
                    }
                    ("channels", value) => audio.channels = Some(parse_number(value)?),
                    ("rate", value) => audio.sample_rate = Some(parse_number(value)?),
                    ("samples", value) => audio.sample_count = Some(parse_number(value)?),
                    ("size", value) => audio.size = Some(parse_number(value)?),
                    (key, _) => return Err(format!("unknown audio property `{key}`")),
                }
            }
            Ok(ContentBlock::Audio(audio))
        }
        "" => Err("empty content block".to_string()),
        _ => Ok(ContentBlock::Unsupported {
            description: text.to_string(),
        }),
    }
}

fn split_key(token: &str) -> Result<(&str, &str), String> {
    match token.split_once('=') {
        Some((key, value)) if !value.is_empty() => Ok((key, value)),
        _ => Err(format!("expected `key=value`, got `{token}`")),
    }
}

fn parse_size(token: &str) -> Result<usize, String> {
    match split_key(token)? {
        ("size", value) => parse_number(value),
        (key, _) => Err(format!("unknown property `{key}`")),
    }
}

fn parse_number<T: FromStr>(value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("`{value}` is not a valid number"))
}

fn parse_token<T: FromStr>(token: Option<&str>, what: &str) -> Result<T, String> {
    let token = token.ok_or_else(|| format!("missing {what}"))?;
    token
        .parse()
        .map_err(|_| format!("unknown {what} `{token}`"))
}
