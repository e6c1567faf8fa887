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

use criterion::{Criterion, criterion_group, criterion_main};
use recfmt::{
    ContentBlock, CurrentRecord, Field, FieldDescription, FieldType, RawSchema, RecordFile,
    RecordFormatHandler, RecordFormatPlayer, RecordKind, SchemaBlock, StoredRecord, StreamCatalog,
    StreamId,
};
use recfmt_derive::SchemaView;
use std::{hint::black_box, time::Duration};

const STREAM: StreamId = StreamId::new(1201, 1);

#[derive(SchemaView, Default)]
struct Pose {
    x: Field<f64>,
    y: Field<f64>,
    z: Field<f64>,
    label: Field<String>,
}

#[derive(Default)]
struct Sum {
    total: f64,
    image_bytes: usize,
}

impl RecordFormatHandler for Sum {
    fn on_schema_block_read(
        &mut self,
        record: &mut CurrentRecord<'_>,
        block_index: usize,
        block: &SchemaBlock,
    ) -> bool {
        let Ok(pose) = record.expected_view::<Pose>(block_index, block) else {
            return false;
        };
        for field in [&pose.x, &pose.y, &pose.z] {
            self.total += field.get(block).unwrap_or_default();
        }
        true
    }

    fn on_image_read(
        &mut self,
        record: &mut CurrentRecord<'_>,
        _block_index: usize,
        _block: &ContentBlock,
    ) -> bool {
        self.image_bytes += record.read_to_end().map_or(0, |bytes| bytes.len());
        true
    }
}

fn make_file(n_records: usize, format: &str) -> anyhow::Result<RecordFile> {
    let schema = RawSchema::new(
        "pose",
        vec![
            FieldDescription::new("x", FieldType::F64),
            FieldDescription::new("y", FieldType::F64),
            FieldDescription::new("z", FieldType::F64),
            FieldDescription::new("label", FieldType::String),
        ],
    )?;
    let mut catalog = StreamCatalog::new();
    catalog
        .add_stream(STREAM)
        .add_format(RecordKind::Data, 1, format.parse()?)
        .with_schema(0, schema);

    let mut file = RecordFile::new(catalog);
    for index in 0..n_records {
        let mut payload = Vec::new();
        for value in [index as f64, 1.0, -1.0] {
            payload.extend(value.to_le_bytes());
        }
        payload.extend(4u32.to_le_bytes());
        payload.extend(b"pose");
        payload.extend(vec![0x7f; 64 * 48]);
        file.push(
            StoredRecord::builder()
                .timestamp(index as f64 / 30.0)
                .stream(STREAM)
                .kind(RecordKind::Data)
                .payload(payload)
                .build(),
        );
    }
    Ok(file)
}

fn bench_play(c: &mut Criterion, n_records: usize, format: &str, name: &str) -> anyhow::Result<()> {
    let file = make_file(n_records, format)?;
    c.bench_function(name, |b| {
        b.iter(|| {
            let mut player = RecordFormatPlayer::new(Sum::default());
            file.attach(&mut player, STREAM)?;
            for result in file.read_all_records(&mut player) {
                black_box(result?);
            }
            anyhow::Ok(player.into_handler().total)
        })
    });
    Ok(())
}

fn bench_read_schema_and_image_10_000_records(c: &mut Criterion) {
    bench_play(
        c,
        10_000,
        "schema+image/raw/64x48/pixel=grey8",
        "schema and image, read 10k records",
    )
    .unwrap();
}

fn bench_skip_image_10_000_records(c: &mut Criterion) {
    bench_play(
        c,
        10_000,
        "schema+custom",
        "schema and skipped block, read 10k records",
    )
    .unwrap();
}

fn bench_read_schema_1_record(c: &mut Criterion) {
    bench_play(c, 1, "schema+custom", "schema, read 1 record").unwrap();
}

criterion_group!(
    benches,
    bench_read_schema_1_record,
    bench_read_schema_and_image_10_000_records,
);

criterion_group!(
    name = long_benches;
    config = Criterion::default().sample_size(20).measurement_time(Duration::from_secs(10));
    targets =
        bench_skip_image_10_000_records,
);

criterion_main!(benches, long_benches);
