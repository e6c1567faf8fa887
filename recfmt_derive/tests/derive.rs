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

use pretty_assertions::assert_eq;
use recfmt::{Field, FieldDescription, FieldType, RawSchema, SchemaBlock, SchemaView};
use std::sync::Arc;

#[derive(SchemaView, Default, Debug)]
struct Exposure {
    duration: Field<f64>,
    #[view(rename = "iso")]
    gain: Field<u32>,
    r#type: Field<String>,
    #[view(skip)]
    frames_seen: usize,
}

#[derive(SchemaView, Default)]
struct Empty;

fn exposure_schema() -> RawSchema {
    RawSchema::new(
        "exposure",
        vec![
            FieldDescription::new("duration", FieldType::F64),
            FieldDescription::new("iso", FieldType::U32),
            FieldDescription::new("type", FieldType::String),
        ],
    )
    .unwrap()
}

#[test]
fn binds_by_member_name() {
    let schema = exposure_schema();
    let mut view = Exposure::default();
    view.bind(&schema);
    assert_eq!(view.duration.index(), Some(0));
    assert_eq!(view.gain.index(), Some(1));
    assert_eq!(view.r#type.index(), Some(2));
    assert_eq!(view.frames_seen, 0);
}

#[test]
fn reads_through_the_view() {
    let schema = Arc::new(exposure_schema());
    let mut bytes = Vec::new();
    bytes.extend(0.5f64.to_le_bytes());
    bytes.extend(800u32.to_le_bytes());
    bytes.extend(4u32.to_le_bytes());
    bytes.extend(b"auto");
    let block = SchemaBlock::new(schema.clone(), bytes).unwrap();

    let mut view = Exposure::default();
    view.bind(&schema);
    assert_eq!(view.duration.get(&block), Some(0.5));
    assert_eq!(view.gain.get(&block), Some(800));
    assert_eq!(view.r#type.get(&block).as_deref(), Some("auto"));
}

#[test]
fn missing_or_mistyped_fields_are_unavailable() {
    let schema = RawSchema::new(
        "exposure",
        vec![
            FieldDescription::new("duration", FieldType::F32),
            FieldDescription::new("gain", FieldType::U32),
        ],
    )
    .unwrap();
    let mut view = Exposure::default();
    view.bind(&schema);
    // `duration` has another type, `gain` is looked up as `iso`
    assert!(!view.duration.is_available());
    assert!(!view.gain.is_available());
    assert!(!view.r#type.is_available());
}

#[test]
fn unit_struct() {
    let mut view = Empty;
    view.bind(&exposure_schema());
}
