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

//! Per block caches of bound [`SchemaView`]s.

use crate::{RecordResult, error::Details, layout::RawSchema, layout::SchemaView};
use log::debug;
use std::{
    any::{Any, type_name},
    collections::{BTreeMap, btree_map::Entry},
    fmt::{self, Debug, Formatter},
};

struct CachedView {
    /// Name of the concrete type the view was created as, for error messages.
    type_name: &'static str,
    view: Box<dyn Any>,
}

/// Maps block indexes to the view that was bound for that block.
///
/// A view is created and bound the first time a block index is requested and returned as is
/// afterwards. Every slot remembers the concrete type it was created with: asking for the same block
/// index as another type is an error, not a reinterpretation.
#[derive(Default)]
pub struct SchemaCache {
    views: BTreeMap<usize, CachedView>,
    bind_count: usize,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the view of type `T` for `block_index`, creating and binding it against `schema` if
    /// this block has no view yet.
    pub fn get_or_bind<T: SchemaView>(
        &mut self,
        block_index: usize,
        schema: &RawSchema,
    ) -> RecordResult<&mut T> {
        let slot = match self.views.entry(block_index) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let mut view = T::default();
                view.bind(schema);
                self.bind_count += 1;
                debug!(
                    "Bound `{}` to schema `{}` for block #{block_index}",
                    type_name::<T>(),
                    schema.name()
                );
                entry.insert(CachedView {
                    type_name: type_name::<T>(),
                    view: Box::new(view),
                })
            }
        };
        let cached = slot.type_name;
        slot.view.downcast_mut::<T>().ok_or_else(|| {
            Details::SchemaViewMismatch {
                block_index,
                cached,
                requested: type_name::<T>(),
            }
            .into()
        })
    }

    /// The view for `block_index`, if one was bound as type `T`.
    pub fn get<T: SchemaView>(&self, block_index: usize) -> Option<&T> {
        self.views.get(&block_index)?.view.downcast_ref()
    }

    pub fn contains(&self, block_index: usize) -> bool {
        self.views.contains_key(&block_index)
    }

    /// Number of blocks with a view.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// How many views were bound since this cache was created.
    pub fn bind_count(&self) -> usize {
        self.bind_count
    }
}

impl Debug for SchemaCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.views.iter().map(|(index, slot)| (index, slot.type_name)))
            .finish()
    }
}

/// The two view caches of a [`ReaderState`](crate::ReaderState).
#[derive(Debug, Default)]
pub struct ViewCaches {
    /// Views of the fields the application currently expects.
    pub expected: SchemaCache,
    /// Views of fields that were dropped from the current layout but that older files may still
    /// have.
    pub legacy: SchemaCache,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Field, FieldDescription, FieldType};
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Temperature {
        celsius: Field<f32>,
    }

    impl SchemaView for Temperature {
        fn bind(&mut self, schema: &RawSchema) {
            self.celsius.bind(schema, "celsius");
        }
    }

    #[derive(Debug, Default)]
    struct Humidity {
        percent: Field<u8>,
    }

    impl SchemaView for Humidity {
        fn bind(&mut self, schema: &RawSchema) {
            self.percent.bind(schema, "percent");
        }
    }

    fn schema() -> RawSchema {
        RawSchema::new(
            "weather",
            vec![
                FieldDescription::new("celsius", FieldType::F32),
                FieldDescription::new("percent", FieldType::U8),
            ],
        )
        .unwrap()
    }

    #[test]
    fn binds_once_per_block() -> anyhow::Result<()> {
        let schema = schema();
        let mut cache = SchemaCache::new();
        assert!(cache.is_empty());

        let view = cache.get_or_bind::<Temperature>(0, &schema)?;
        assert_eq!(view.celsius.index(), Some(0));
        let first: *const Temperature = view;

        let again = cache.get_or_bind::<Temperature>(0, &schema)?;
        assert_eq!(first, again as *const Temperature);
        assert_eq!(cache.bind_count(), 1);
        assert_eq!(cache.len(), 1);
        Ok(())
    }

    #[test]
    fn indexes_are_sparse() -> anyhow::Result<()> {
        let schema = schema();
        let mut cache = SchemaCache::new();
        cache.get_or_bind::<Humidity>(5, &schema)?;
        assert!(cache.contains(5));
        assert!(!cache.contains(0));
        assert_eq!(cache.len(), 1);

        cache.get_or_bind::<Temperature>(2, &schema)?;
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.bind_count(), 2);
        Ok(())
    }

    #[test]
    fn type_mismatch_fails_without_rebinding() -> anyhow::Result<()> {
        let schema = schema();
        let mut cache = SchemaCache::new();
        cache.get_or_bind::<Temperature>(1, &schema)?;

        let error = cache.get_or_bind::<Humidity>(1, &schema).unwrap_err();
        match error.details() {
            Details::SchemaViewMismatch {
                block_index,
                cached,
                requested,
            } => {
                assert_eq!(*block_index, 1);
                assert!(cached.ends_with("Temperature"), "{cached}");
                assert!(requested.ends_with("Humidity"), "{requested}");
            }
            details => panic!("Unexpected error: {details:?}"),
        }
        assert_eq!(cache.bind_count(), 1);
        assert!(cache.get::<Temperature>(1).is_some());
        assert!(cache.get::<Humidity>(1).is_none());
        Ok(())
    }

    #[test]
    fn expected_and_legacy_are_independent() -> anyhow::Result<()> {
        let schema = schema();
        let mut caches = ViewCaches::default();
        caches.expected.get_or_bind::<Temperature>(0, &schema)?;
        assert!(caches.legacy.is_empty());
        caches.legacy.get_or_bind::<Humidity>(0, &schema)?;
        assert_eq!(caches.expected.bind_count(), 1);
        assert_eq!(caches.legacy.bind_count(), 1);
        Ok(())
    }
}
