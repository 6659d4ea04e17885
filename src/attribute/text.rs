//! Nullable text and date/time columns.
//!
//! Both store `Option<T>` per slot: `None` means the slot was never set (or
//! was cleared) and reads as the column default, so "explicitly set to the
//! default" and "never set" stay distinguishable through `is_set`.

use std::any::Any;

use chrono::{DateTime, Utc};

use crate::errors::GraphError;
use crate::graph::ElementId;

use super::value::datetime_from_millis;
use super::{AttributeColumn, AttributeValue, ColumnFactory, NativeType, type_names};

#[derive(Clone, Debug, Default)]
pub struct TextColumn {
    slots: Vec<Option<String>>,
    default: Option<String>,
}

impl TextColumn {
    pub fn new(default: Option<String>) -> Self {
        Self {
            slots: Vec::new(),
            default,
        }
    }

    fn convert(value: AttributeValue) -> Result<Option<String>, GraphError> {
        match value {
            AttributeValue::Null => Ok(None),
            AttributeValue::Text(s) => Ok(Some(s)),
            AttributeValue::DateTime(dt) => Ok(Some(dt.to_rfc3339())),
            AttributeValue::Object(_) => Err(GraphError::invalid_value(
                "cannot store object value in string column",
            )),
            other => Ok(Some(other.to_string())),
        }
    }

    fn current(&self, id: ElementId) -> Option<&String> {
        match self.slots.get(id) {
            Some(Some(s)) => Some(s),
            _ => self.default.as_ref(),
        }
    }
}

impl AttributeColumn for TextColumn {
    fn type_name(&self) -> &str {
        type_names::STRING
    }

    fn native_type(&self) -> NativeType {
        NativeType::Text
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn ensure_capacity(&mut self, capacity: usize) {
        if capacity > self.slots.len() {
            self.slots.resize(capacity, None);
        }
    }

    fn get(&self, id: ElementId) -> AttributeValue {
        self.current(id)
            .map(|s| AttributeValue::Text(s.clone()))
            .unwrap_or(AttributeValue::Null)
    }

    fn set(&mut self, id: ElementId, value: AttributeValue) -> Result<(), GraphError> {
        match Self::convert(value)? {
            Some(s) => {
                self.ensure_capacity(id + 1);
                self.slots[id] = Some(s);
            }
            None => self.clear(id),
        }
        Ok(())
    }

    fn is_default(&self, id: ElementId) -> bool {
        self.current(id) == self.default.as_ref()
    }

    fn is_set(&self, id: ElementId) -> bool {
        matches!(self.slots.get(id), Some(Some(_)))
    }

    fn clear(&mut self, id: ElementId) {
        if let Some(slot) = self.slots.get_mut(id) {
            *slot = None;
        }
    }

    fn default_value(&self) -> AttributeValue {
        self.default.clone().into()
    }

    fn set_default_value(&mut self, value: AttributeValue) -> Result<(), GraphError> {
        self.default = Self::convert(value)?;
        Ok(())
    }

    fn normalise(&self, value: AttributeValue) -> Result<AttributeValue, GraphError> {
        Ok(Self::convert(value)?.or_else(|| self.default.clone()).into())
    }

    fn copy(&self) -> Box<dyn AttributeColumn> {
        Box::new(self.clone())
    }

    fn copy_from(&mut self, source: &dyn AttributeColumn) -> bool {
        let Some(source) = source.as_any().downcast_ref::<Self>() else {
            return false;
        };
        self.slots.clone_from(&source.slots);
        self.default.clone_from(&source.default);
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct DateTimeColumn {
    slots: Vec<Option<DateTime<Utc>>>,
    default: Option<DateTime<Utc>>,
}

impl DateTimeColumn {
    pub fn new(default: Option<DateTime<Utc>>) -> Self {
        Self {
            slots: Vec::new(),
            default,
        }
    }

    fn convert(value: &AttributeValue) -> Result<Option<DateTime<Utc>>, GraphError> {
        match value {
            AttributeValue::Null => Ok(None),
            AttributeValue::DateTime(dt) => Ok(Some(*dt)),
            AttributeValue::Long(millis) => datetime_from_millis(*millis).map(Some).ok_or_else(
                || GraphError::invalid_value(format!("{millis} ms is out of datetime range")),
            ),
            AttributeValue::Text(s) => DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(|e| GraphError::invalid_value(format!("'{s}' is not a datetime: {e}"))),
            other => Err(GraphError::invalid_value(format!(
                "cannot store {} value in datetime column",
                other.kind_name()
            ))),
        }
    }

    fn current(&self, id: ElementId) -> Option<DateTime<Utc>> {
        match self.slots.get(id) {
            Some(Some(dt)) => Some(*dt),
            _ => self.default,
        }
    }
}

impl AttributeColumn for DateTimeColumn {
    fn type_name(&self) -> &str {
        type_names::DATETIME
    }

    fn native_type(&self) -> NativeType {
        NativeType::DateTime
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn ensure_capacity(&mut self, capacity: usize) {
        if capacity > self.slots.len() {
            self.slots.resize(capacity, None);
        }
    }

    fn get(&self, id: ElementId) -> AttributeValue {
        self.current(id).into()
    }

    fn set(&mut self, id: ElementId, value: AttributeValue) -> Result<(), GraphError> {
        match Self::convert(&value)? {
            Some(dt) => {
                self.ensure_capacity(id + 1);
                self.slots[id] = Some(dt);
            }
            None => self.clear(id),
        }
        Ok(())
    }

    fn is_default(&self, id: ElementId) -> bool {
        self.current(id) == self.default
    }

    fn is_set(&self, id: ElementId) -> bool {
        matches!(self.slots.get(id), Some(Some(_)))
    }

    fn clear(&mut self, id: ElementId) {
        if let Some(slot) = self.slots.get_mut(id) {
            *slot = None;
        }
    }

    fn default_value(&self) -> AttributeValue {
        self.default.into()
    }

    fn set_default_value(&mut self, value: AttributeValue) -> Result<(), GraphError> {
        self.default = Self::convert(&value)?;
        Ok(())
    }

    fn normalise(&self, value: AttributeValue) -> Result<AttributeValue, GraphError> {
        Ok(Self::convert(&value)?.or(self.default).into())
    }

    fn copy(&self) -> Box<dyn AttributeColumn> {
        Box::new(self.clone())
    }

    fn copy_from(&mut self, source: &dyn AttributeColumn) -> bool {
        let Some(source) = source.as_any().downcast_ref::<Self>() else {
            return false;
        };
        self.slots.clone_from(&source.slots);
        self.default.clone_from(&source.default);
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct TextColumnFactory;

impl ColumnFactory for TextColumnFactory {
    fn type_name(&self) -> &str {
        type_names::STRING
    }

    fn native_type(&self) -> NativeType {
        NativeType::Text
    }

    fn create(&self, default: AttributeValue) -> Result<Box<dyn AttributeColumn>, GraphError> {
        Ok(Box::new(TextColumn::new(TextColumn::convert(default)?)))
    }
}

pub struct DateTimeColumnFactory;

impl ColumnFactory for DateTimeColumnFactory {
    fn type_name(&self) -> &str {
        type_names::DATETIME
    }

    fn native_type(&self) -> NativeType {
        NativeType::DateTime
    }

    fn create(&self, default: AttributeValue) -> Result<Box<dyn AttributeColumn>, GraphError> {
        Ok(Box::new(DateTimeColumn::new(DateTimeColumn::convert(
            &default,
        )?)))
    }
}
