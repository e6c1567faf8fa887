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

//! Schema blocks: self-describing groups of fields, and the typed views bound to them.
//!
//! The description of a schema block, a [`RawSchema`], is provided by the file for every
//! [`ReaderIdentity`](crate::ReaderIdentity). Applications don't read fields from it by name on
//! every record. They declare a [`SchemaView`] made of [`Field`]s, which is bound once against the
//! description and can then read any number of [`SchemaBlock`]s cheaply.
//!
//! The bytes of a schema block are laid out as:
//! 1. every fixed size field, little endian, in declaration order;
//! 2. the length of every variable size field, as a little endian `u32`, in declaration order;
//! 3. the content of every variable size field, in declaration order.

use crate::{RecordResult, error::Details};
use log::debug;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{self, Debug, Formatter},
    marker::PhantomData,
    ops::Range,
    sync::{Arc, OnceLock},
};
use strum_macros::{Display, EnumString};

/// Size of each entry of the variable size index.
const VARIABLE_SIZE_ENTRY: usize = size_of::<u32>();

/// The type of a field in a [`RawSchema`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    /// UTF-8 text of variable size.
    String,
    /// Bytes of variable size.
    Bytes,
}

impl FieldType {
    /// Size of the field, for fixed size types.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            FieldType::Bool | FieldType::U8 | FieldType::I8 => Some(1),
            FieldType::U16 | FieldType::I16 => Some(2),
            FieldType::U32 | FieldType::I32 | FieldType::F32 => Some(4),
            FieldType::U64 | FieldType::I64 | FieldType::F64 => Some(8),
            FieldType::String | FieldType::Bytes => None,
        }
    }
}

/// One field of a [`RawSchema`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldDescription {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FieldPosition {
    Fixed { offset: usize },
    Variable { slot: usize },
}

/// The description of a schema block, as stored in the file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSchemaDefinition", into = "RawSchemaDefinition")]
pub struct RawSchema {
    name: String,
    fields: Vec<FieldDescription>,
    /// Maps field names to their position in `fields`.
    lookup: BTreeMap<String, usize>,
    positions: Vec<FieldPosition>,
    fixed_size: usize,
    variable_count: usize,
}

#[derive(Serialize, Deserialize)]
struct RawSchemaDefinition {
    name: String,
    fields: Vec<FieldDescription>,
}

impl TryFrom<RawSchemaDefinition> for RawSchema {
    type Error = crate::Error;

    fn try_from(definition: RawSchemaDefinition) -> RecordResult<Self> {
        RawSchema::new(definition.name, definition.fields)
    }
}

impl From<RawSchema> for RawSchemaDefinition {
    fn from(schema: RawSchema) -> Self {
        Self {
            name: schema.name,
            fields: schema.fields,
        }
    }
}

fn field_name_regex() -> &'static Regex {
    static FIELD_NAME_ONCE: OnceLock<Regex> = OnceLock::new();
    FIELD_NAME_ONCE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Regex is valid"))
}

impl RawSchema {
    /// Create a description, checking that field names are valid and unique.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescription>) -> RecordResult<Self> {
        let mut lookup = BTreeMap::new();
        let mut positions = Vec::with_capacity(fields.len());
        let mut fixed_size = 0;
        let mut variable_count = 0;
        for (index, field) in fields.iter().enumerate() {
            if !field_name_regex().is_match(&field.name) {
                return Err(Details::InvalidFieldName(field.name.clone()).into());
            }
            if lookup.insert(field.name.clone(), index).is_some() {
                return Err(Details::DuplicateFieldName(field.name.clone()).into());
            }
            match field.field_type.fixed_size() {
                Some(size) => {
                    positions.push(FieldPosition::Fixed { offset: fixed_size });
                    fixed_size += size;
                }
                None => {
                    positions.push(FieldPosition::Variable {
                        slot: variable_count,
                    });
                    variable_count += 1;
                }
            }
        }
        Ok(Self {
            name: name.into(),
            fields,
            lookup,
            positions,
            fixed_size,
            variable_count,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescription] {
        &self.fields
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// Number of bytes at the start of a block before the content of variable size fields.
    pub fn header_size(&self) -> usize {
        self.fixed_size + self.variable_count * VARIABLE_SIZE_ENTRY
    }

    /// Whether every field has a fixed size, making every block the same size.
    pub fn is_fixed_size(&self) -> bool {
        self.variable_count == 0
    }

    /// The total size of a block, given its first [`header_size`](Self::header_size) bytes.
    pub fn block_size(&self, header: &[u8]) -> usize {
        self.header_size() + self.variable_lengths(header).sum::<usize>()
    }

    fn variable_lengths<'a>(&self, header: &'a [u8]) -> impl Iterator<Item = usize> + 'a {
        let index = header
            .get(self.fixed_size..self.header_size())
            .unwrap_or_default();
        index.chunks_exact(VARIABLE_SIZE_ENTRY).map(|entry| {
            let mut bytes = [0u8; VARIABLE_SIZE_ENTRY];
            bytes.copy_from_slice(entry);
            u32::from_le_bytes(bytes) as usize
        })
    }
}

impl Debug for RawSchema {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSchema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// A decoded schema block: the bytes of one record's block and the description they follow.
#[derive(Clone)]
pub struct SchemaBlock {
    schema: Arc<RawSchema>,
    bytes: Vec<u8>,
    variable: Vec<Range<usize>>,
}

impl SchemaBlock {
    /// Wrap the complete bytes of a block. Returns `None` if `bytes` doesn't have the size the
    /// description implies.
    pub fn new(schema: Arc<RawSchema>, bytes: Vec<u8>) -> Option<Self> {
        if bytes.len() < schema.header_size() || bytes.len() != schema.block_size(&bytes) {
            return None;
        }
        let mut start = schema.header_size();
        let variable = schema
            .variable_lengths(&bytes)
            .map(|len| {
                let range = start..start + len;
                start += len;
                range
            })
            .collect();
        Some(Self {
            schema,
            bytes,
            variable,
        })
    }

    pub fn schema(&self) -> &RawSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The raw bytes of a field.
    pub fn field_bytes(&self, index: usize) -> Option<&[u8]> {
        let field = self.schema.fields.get(index)?;
        let range = match self.schema.positions[index] {
            FieldPosition::Fixed { offset } => offset..offset + field.field_type.fixed_size()?,
            FieldPosition::Variable { slot } => self.variable[slot].clone(),
        };
        self.bytes.get(range)
    }

    /// The value of a field, if `T` matches the field's type.
    pub fn get<T: FieldValue>(&self, index: usize) -> Option<T> {
        if self.schema.fields.get(index)?.field_type != T::FIELD_TYPE {
            return None;
        }
        T::decode(self.field_bytes(index)?)
    }

    /// The value of a field, looked up by name.
    pub fn get_by_name<T: FieldValue>(&self, name: &str) -> Option<T> {
        self.get(self.schema.field_index(name)?)
    }
}

impl Debug for SchemaBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaBlock")
            .field("schema", &self.schema.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Rust types a schema field can be read as.
pub trait FieldValue: Sized + 'static {
    const FIELD_TYPE: FieldType;

    /// Decode the value from exactly the field's bytes.
    fn decode(bytes: &[u8]) -> Option<Self>;
}

macro_rules! le_field_value {
    ($($ty:ty => $field_type:ident),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                const FIELD_TYPE: FieldType = FieldType::$field_type;

                fn decode(bytes: &[u8]) -> Option<Self> {
                    Some(<$ty>::from_le_bytes(bytes.try_into().ok()?))
                }
            }
        )*
    };
}

le_field_value!(
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
);

impl FieldValue for bool {
    const FIELD_TYPE: FieldType = FieldType::Bool;

    fn decode(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [byte] => Some(*byte != 0),
            _ => None,
        }
    }
}

impl FieldValue for String {
    const FIELD_TYPE: FieldType = FieldType::String;

    fn decode(bytes: &[u8]) -> Option<Self> {
        String::from_utf8(bytes.to_vec()).ok()
    }
}

impl FieldValue for Vec<u8> {
    const FIELD_TYPE: FieldType = FieldType::Bytes;

    fn decode(bytes: &[u8]) -> Option<Self> {
        Some(bytes.to_vec())
    }
}

/// A typed field of a [`SchemaView`].
///
/// Once bound, the field knows where its value is in every block following the same description,
/// or that the description has no field with that name and type, in which case it is unavailable.
pub struct Field<T> {
    index: Option<usize>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FieldValue> Field<T> {
    /// Resolve the field named `name` in `schema`. The field is only available when the
    /// description declares it with the type `T` is read as.
    pub fn bind(&mut self, schema: &RawSchema, name: &str) {
        self.index = schema
            .field_index(name)
            .filter(|&index| schema.fields[index].field_type == T::FIELD_TYPE);
        if self.index.is_none() {
            debug!(
                "Field `{name}` of type {} is not in schema `{}`",
                T::FIELD_TYPE,
                schema.name
            );
        }
    }

    pub fn is_available(&self) -> bool {
        self.index.is_some()
    }

    /// Position of the field in the description it was bound to.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn get(&self, block: &SchemaBlock) -> Option<T> {
        block.get(self.index?)
    }
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self {
            index: None,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            _marker: PhantomData,
        }
    }
}

impl<T> Debug for Field<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field").field("index", &self.index).finish()
    }
}

/// A typed view over the fields of a schema block.
///
/// Views are created with [`Default`] and bound once per [`ReaderIdentity`](crate::ReaderIdentity)
/// and block. They are then reused for every record, see
/// [`CurrentRecord::expected_view`](crate::CurrentRecord::expected_view).
///
/// Usually derived, when the `derive` feature is enabled:
///
/// ```ignore
/// use recfmt::{Field, SchemaView};
///
/// #[derive(Default, SchemaView)]
/// struct CameraSettings {
///     exposure: Field<f32>,
///     #[view(rename = "serial_number")]
///     serial: Field<String>,
/// }
/// ```
pub trait SchemaView: Default + 'static {
    /// Resolve every field of the view against the block's description.
    fn bind(&mut self, schema: &RawSchema);
}
