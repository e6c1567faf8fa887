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

use recfmt::{
    ContentBlock, CurrentRecord, Field, RecordFile, RecordFormatHandler, RecordFormatPlayer,
    RecordKind, SchemaBlock, StoredRecord, StreamCatalog, StreamId,
};
use recfmt_derive::SchemaView;

const CATALOG: &str = r#"{
    "streams": [
        {
            "id": "1201-1",
            "name": "camera",
            "formats": [
                {"kind": "data", "version": 1, "format": "schema+image/raw/4x2/pixel=grey8",
                 "schemas": {"0": {"name": "frame", "fields": [
                     {"name": "exposure", "type": "f32"},
                     {"name": "frame_number", "type": "u64"},
                     {"name": "camera_model", "type": "string"}]}}}
            ]
        }
    ]
}"#;

#[derive(SchemaView, Default)]
struct Frame {
    exposure: Field<f32>,
    #[view(rename = "frame_number")]
    number: Field<u64>,
    #[view(rename = "camera_model")]
    model: Field<String>,
}

struct Printer;

impl RecordFormatHandler for Printer {
    fn on_schema_block_read(
        &mut self,
        record: &mut CurrentRecord<'_>,
        block_index: usize,
        block: &SchemaBlock,
    ) -> bool {
        let timestamp = record.timestamp();
        match record.expected_view::<Frame>(block_index, block) {
            Ok(frame) => println!(
                "{timestamp:>6.3}: frame {:?} exposure {:?} model {:?}",
                frame.number.get(block),
                frame.exposure.get(block),
                frame.model.get(block),
            ),
            Err(err) => println!("{timestamp:>6.3}: {err}"),
        }
        true
    }

    fn on_image_read(
        &mut self,
        record: &mut CurrentRecord<'_>,
        _block_index: usize,
        block: &ContentBlock,
    ) -> bool {
        match record.read_to_end() {
            Ok(pixels) => println!("        {block}: {pixels:?}"),
            Err(err) => println!("        {block}: {err}"),
        }
        true
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let camera: StreamId = "1201-1".parse()?;
    let mut file = RecordFile::new(StreamCatalog::parse_str(CATALOG)?);
    for number in 0..3u64 {
        let mut payload = Vec::new();
        payload.extend(0.01f32.to_le_bytes());
        payload.extend(number.to_le_bytes());
        payload.extend(3u32.to_le_bytes());
        payload.extend(b"cam");
        payload.extend((0..8).map(|pixel| pixel * 16 + number as u8));
        file.push(
            StoredRecord::builder()
                .timestamp(number as f64 / 30.0)
                .stream(camera)
                .kind(RecordKind::Data)
                .payload(payload)
                .build(),
        );
    }

    let mut player = RecordFormatPlayer::new(Printer);
    file.attach(&mut player, camera)?;
    for result in file.read_all_records(&mut player) {
        if let Some(outcome) = result? {
            println!("        {outcome:?}");
        }
    }
    if let Some(state) = player.last_reader_state(camera, RecordKind::Data) {
        println!(
            "last read at {:?}, {} view(s) bound",
            state.last_read_timestamp(),
            state.expected_views().bind_count()
        );
    }
    Ok(())
}
