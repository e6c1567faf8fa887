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

//! Where record formats and schema descriptions come from.

use crate::{
    RecordResult,
    error::Details,
    format::RecordFormat,
    layout::RawSchema,
    record::{FormatVersion, ReaderIdentity, RecordKind, StreamId},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, io::Read, sync::Arc};

/// Provides the static descriptions a player needs to decode records.
///
/// This is implemented by whatever holds the file's metadata. Players query it the first time they
/// meet a [`ReaderIdentity`], and never again for that identity.
pub trait FormatSource {
    /// Whether the file has a stream with this id.
    fn has_stream(&self, stream: StreamId) -> bool;

    /// The content blocks records of `identity` are made of.
    fn record_format(&self, identity: &ReaderIdentity) -> Option<RecordFormat>;

    /// The description of the schema block at `block_index` for records of `identity`.
    fn schema_description(
        &self,
        identity: &ReaderIdentity,
        block_index: usize,
    ) -> Option<Arc<RawSchema>>;
}

/// The formats of one stream's records, for one kind and version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormatDescription {
    pub kind: RecordKind,
    pub version: FormatVersion,
    pub format: RecordFormat,
    /// Descriptions of the schema blocks, by block index.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub schemas: BTreeMap<usize, Arc<RawSchema>>,
}

impl FormatDescription {
    pub fn with_schema(&mut self, block_index: usize, schema: RawSchema) -> &mut Self {
        self.schemas.insert(block_index, Arc::new(schema));
        self
    }
}

/// One stream of a [`StreamCatalog`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamDescription {
    pub id: StreamId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub formats: Vec<FormatDescription>,
}

impl StreamDescription {
    /// Add the format of the records of `kind` and `version`, replacing any previous one.
    pub fn add_format(
        &mut self,
        kind: RecordKind,
        version: FormatVersion,
        format: RecordFormat,
    ) -> &mut FormatDescription {
        self.formats
            .retain(|description| (description.kind, description.version) != (kind, version));
        self.formats.push(FormatDescription {
            kind,
            version,
            format,
            schemas: BTreeMap::new(),
        });
        let index = self.formats.len() - 1;
        &mut self.formats[index]
    }

    pub fn format(&self, kind: RecordKind, version: FormatVersion) -> Option<&FormatDescription> {
        self.formats
            .iter()
            .find(|description| description.kind == kind && description.version == version)
    }
}

/// An in memory [`FormatSource`], usually read from JSON:
///
/// ```
/// # use recfmt::{FormatSource, ReaderIdentity, RecordKind, StreamCatalog, StreamId};
/// let catalog = StreamCatalog::parse_str(r#"{
///     "streams": [{
///         "id": "1201-1",
///         "name": "camera",
///         "formats": [{
///             "kind": "data",
///             "version": 1,
///             "format": "schema+image/raw/640x480/pixel=grey8",
///             "schemas": {"0": {"name": "frame", "fields": [{"name": "exposure", "type": "f32"}]}}
///         }]
///     }]
/// }"#).unwrap();
/// let identity = ReaderIdentity::new(StreamId::new(1201, 1), RecordKind::Data, 1);
/// assert_eq!(catalog.record_format(&identity).unwrap().len(), 2);
/// assert!(catalog.schema_description(&identity, 0).is_some());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamCatalog {
    #[serde(default)]
    streams: Vec<StreamDescription>,
}

impl StreamCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_str(json: &str) -> RecordResult<Self> {
        serde_json::from_str(json).map_err(|e| Details::ParseCatalog(e).into())
    }

    pub fn from_reader<R: Read>(reader: R) -> RecordResult<Self> {
        serde_json::from_reader(reader).map_err(|e| {
            if e.is_io() {
                Details::ReadCatalog(e.into()).into()
            } else {
                Details::ParseCatalog(e).into()
            }
        })
    }

    /// Get the stream with this id, adding it first if needed.
    pub fn add_stream(&mut self, id: StreamId) -> &mut StreamDescription {
        let position = match self.streams.iter().position(|stream| stream.id == id) {
            Some(position) => position,
            None => {
                self.streams.push(StreamDescription {
                    id,
                    name: None,
                    formats: Vec::new(),
                });
                self.streams.len() - 1
            }
        };
        &mut self.streams[position]
    }

    pub fn stream(&self, id: StreamId) -> Option<&StreamDescription> {
        self.streams.iter().find(|stream| stream.id == id)
    }

    pub fn streams(&self) -> impl Iterator<Item = &StreamDescription> {
        self.streams.iter()
    }

    fn format(&self, identity: &ReaderIdentity) -> Option<&FormatDescription> {
        self.stream(identity.stream)?
            .format(identity.kind, identity.format_version)
    }
}

impl FormatSource for StreamCatalog {
    fn has_stream(&self, stream: StreamId) -> bool {
        self.stream(stream).is_some()
    }

    fn record_format(&self, identity: &ReaderIdentity) -> Option<RecordFormat> {
        self.format(identity).map(|description| description.format.clone())
    }

    fn schema_description(
        &self,
        identity: &ReaderIdentity,
        block_index: usize,
    ) -> Option<Arc<RawSchema>> {
        self.format(identity)?.schemas.get(&block_index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{FieldDescription, FieldType};
    use pretty_assertions::assert_eq;

    const CATALOG: &str = r#"{
        "streams": [
            {
                "id": "1201-1",
                "name": "camera",
                "formats": [
                    {"kind": "configuration", "version": 1, "format": "schema",
                     "schemas": {"0": {"name": "config", "fields": [{"name": "width", "type": "u32"}]}}},
                    {"kind": "data", "version": 2, "format": "schema/size=8+image/jpg",
                     "schemas": {"0": {"name": "meta", "fields": [{"name": "frame", "type": "u64"}]}}}
                ]
            },
            {"id": "100-3"}
        ]
    }"#;

    #[test]
    fn parse_catalog() -> anyhow::Result<()> {
        let catalog = StreamCatalog::parse_str(CATALOG)?;
        let camera = StreamId::new(1201, 1);
        assert!(catalog.has_stream(camera));
        assert!(catalog.has_stream(StreamId::new(100, 3)));
        assert!(!catalog.has_stream(StreamId::new(100, 4)));
        assert_eq!(catalog.stream(camera).and_then(|s| s.name.as_deref()), Some("camera"));

        let data = ReaderIdentity::new(camera, RecordKind::Data, 2);
        assert_eq!(
            catalog.record_format(&data).map(|f| f.to_string()),
            Some("schema/size=8+image/jpg".to_string())
        );
        let schema = catalog.schema_description(&data, 0).expect("block 0 has a schema");
        assert_eq!(schema.name(), "meta");
        assert!(catalog.schema_description(&data, 1).is_none());

        let unknown_version = ReaderIdentity::new(camera, RecordKind::Data, 1);
        assert!(catalog.record_format(&unknown_version).is_none());
        Ok(())
    }

    #[test]
    fn invalid_catalogs() {
        let bad_format = r#"{"streams": [{"id": "1-1", "formats": [{"kind": "data", "version": 1, "format": "image"}]}]}"#;
        let error = StreamCatalog::parse_str(bad_format).unwrap_err();
        assert!(matches!(error.details(), Details::ParseCatalog(_)));

        let bad_id = r#"{"streams": [{"id": "camera"}]}"#;
        assert!(StreamCatalog::parse_str(bad_id).is_err());

        let bad_field = r#"{"streams": [{"id": "1-1", "formats": [{"kind": "data", "version": 1, "format": "schema",
            "schemas": {"0": {"name": "x", "fields": [{"name": "a b", "type": "u8"}]}}}]}]}"#;
        assert!(StreamCatalog::parse_str(bad_field).is_err());
    }

    #[test]
    fn build_and_round_trip() -> anyhow::Result<()> {
        let mut catalog = StreamCatalog::new();
        let stream = StreamId::new(285, 1);
        catalog
            .add_stream(stream)
            .add_format(RecordKind::State, 1, "schema+custom".parse()?)
            .with_schema(
                0,
                RawSchema::new("state", vec![FieldDescription::new("mode", FieldType::U8)])?,
            );
        catalog.add_stream(stream).name = Some("imu".to_string());
        assert_eq!(catalog.streams().count(), 1);

        let json = serde_json::to_string(&catalog)?;
        assert_eq!(StreamCatalog::parse_str(&json)?, catalog);
        assert_eq!(StreamCatalog::from_reader(json.as_bytes())?, catalog);
        Ok(())
    }

    #[test]
    fn replacing_a_format() -> anyhow::Result<()> {
        let mut catalog = StreamCatalog::new();
        let stream = catalog.add_stream(StreamId::new(1, 1));
        stream.add_format(RecordKind::Data, 1, "custom".parse()?);
        stream.add_format(RecordKind::Data, 1, "schema".parse()?);
        assert_eq!(stream.formats.len(), 1);
        assert_eq!(
            stream.format(RecordKind::Data, 1).map(|f| f.format.to_string()),
            Some("schema".to_string())
        );
        Ok(())
    }
}
