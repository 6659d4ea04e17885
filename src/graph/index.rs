//! Value index for one attribute column.

use ahash::{AHashMap, AHashSet};

use crate::attribute::{AttributeColumn, AttributeValue, ValueKey};

use super::types::ElementId;

/// Elements grouped by value.
///
/// Only slots holding something other than the column default are
/// bucketed. The default usually covers most elements and is answered by
/// scanning the element table instead.
#[derive(Clone, Debug)]
pub(crate) struct ValueIndex {
    default: ValueKey,
    buckets: AHashMap<ValueKey, AHashSet<ElementId>>,
}

impl ValueIndex {
    pub fn build(column: &dyn AttributeColumn, elements: &[ElementId]) -> Self {
        let mut index = Self {
            default: ValueKey::new(column.default_value()),
            buckets: AHashMap::new(),
        };
        for &element in elements {
            index.insert(element, column.get(element));
        }
        index
    }

    pub fn is_default(&self, key: &ValueKey) -> bool {
        self.default == *key
    }

    pub fn insert(&mut self, element: ElementId, value: AttributeValue) {
        if self.default.matches(&value) {
            return;
        }
        self.buckets
            .entry(ValueKey::new(value))
            .or_default()
            .insert(element);
    }

    pub fn remove(&mut self, element: ElementId, value: AttributeValue) {
        let key = ValueKey::new(value);
        if let Some(bucket) = self.buckets.get_mut(&key) {
            bucket.remove(&element);
            if bucket.is_empty() {
                self.buckets.remove(&key);
            }
        }
    }

    /// Elements holding `key`, unordered. Empty for the default value.
    pub fn lookup(&self, key: &ValueKey) -> impl Iterator<Item = ElementId> + '_ {
        self.buckets.get(key).into_iter().flatten().copied()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}
