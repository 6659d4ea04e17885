//! Fixed-width columns for boolean and numeric attributes.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use crate::errors::GraphError;
use crate::graph::ElementId;

use super::{AttributeColumn, AttributeValue, ColumnFactory, NativeType, type_names};

/// A fixed-width value stored inline in a [`PrimitiveColumn`].
pub trait Primitive: Copy + PartialEq + fmt::Debug + Send + Sync + 'static {
    const NATIVE: NativeType;
    const TYPE_NAME: &'static str;

    fn zero() -> Self;

    /// Apply the column's conversion rules. `Ok(None)` means "reset to default".
    fn convert(value: &AttributeValue) -> Result<Option<Self>, GraphError>;

    fn to_value(self) -> AttributeValue;

    fn identical(self, other: Self) -> bool {
        self == other
    }
}

fn reject<P: Primitive>(value: &AttributeValue) -> GraphError {
    GraphError::invalid_value(format!(
        "cannot store {} value '{}' in {} column",
        value.kind_name(),
        value,
        P::TYPE_NAME
    ))
}

fn parse<P, T>(text: &str) -> Result<T, GraphError>
where
    P: Primitive,
    T: std::str::FromStr,
{
    text.trim().parse::<T>().map_err(|_| {
        GraphError::invalid_value(format!("'{text}' is not a valid {}", P::TYPE_NAME))
    })
}

/// Parse a float, refusing finite text that only fits as infinity.
fn parse_float<P: Primitive>(text: &str) -> Result<f64, GraphError> {
    let parsed = parse::<P, f64>(text)?;
    if parsed.is_infinite() && !text.trim().to_ascii_lowercase().contains("inf") {
        return Err(GraphError::invalid_value(format!(
            "'{text}' is out of range for {}",
            P::TYPE_NAME
        )));
    }
    Ok(parsed)
}

fn narrow(value: &AttributeValue, wide: f64) -> Result<f32, GraphError> {
    let narrowed = wide as f32;
    if wide.is_finite() && !narrowed.is_finite() {
        Err(reject::<f32>(value))
    } else {
        Ok(narrowed)
    }
}

impl Primitive for bool {
    const NATIVE: NativeType = NativeType::Boolean;
    const TYPE_NAME: &'static str = type_names::BOOLEAN;

    fn zero() -> Self {
        false
    }

    fn convert(value: &AttributeValue) -> Result<Option<Self>, GraphError> {
        match value {
            AttributeValue::Null => Ok(None),
            AttributeValue::Boolean(b) => Ok(Some(*b)),
            AttributeValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(reject::<Self>(value)),
            },
            _ => Err(reject::<Self>(value)),
        }
    }

    fn to_value(self) -> AttributeValue {
        AttributeValue::Boolean(self)
    }
}

impl Primitive for i32 {
    const NATIVE: NativeType = NativeType::Integer;
    const TYPE_NAME: &'static str = type_names::INTEGER;

    fn zero() -> Self {
        0
    }

    fn convert(value: &AttributeValue) -> Result<Option<Self>, GraphError> {
        match value {
            AttributeValue::Null => Ok(None),
            AttributeValue::Integer(v) => Ok(Some(*v)),
            AttributeValue::Long(v) => i32::try_from(*v)
                .map(Some)
                .map_err(|_| reject::<Self>(value)),
            AttributeValue::Text(s) => parse::<Self, i32>(s).map(Some),
            _ => Err(reject::<Self>(value)),
        }
    }

    fn to_value(self) -> AttributeValue {
        AttributeValue::Integer(self)
    }
}

impl Primitive for i64 {
    const NATIVE: NativeType = NativeType::Long;
    const TYPE_NAME: &'static str = type_names::LONG;

    fn zero() -> Self {
        0
    }

    fn convert(value: &AttributeValue) -> Result<Option<Self>, GraphError> {
        match value {
            AttributeValue::Null => Ok(None),
            AttributeValue::Integer(v) => Ok(Some(i64::from(*v))),
            AttributeValue::Long(v) => Ok(Some(*v)),
            AttributeValue::Text(s) => parse::<Self, i64>(s).map(Some),
            _ => Err(reject::<Self>(value)),
        }
    }

    fn to_value(self) -> AttributeValue {
        AttributeValue::Long(self)
    }
}

impl Primitive for f32 {
    const NATIVE: NativeType = NativeType::Float;
    const TYPE_NAME: &'static str = type_names::FLOAT;

    fn zero() -> Self {
        0.0
    }

    fn convert(value: &AttributeValue) -> Result<Option<Self>, GraphError> {
        match value {
            AttributeValue::Null => Ok(None),
            AttributeValue::Integer(v) => Ok(Some(*v as f32)),
            AttributeValue::Long(v) => Ok(Some(*v as f32)),
            AttributeValue::Float(v) => Ok(Some(*v)),
            AttributeValue::Double(v) => narrow(value, *v).map(Some),
            AttributeValue::Text(s) => narrow(value, parse_float::<Self>(s)?).map(Some),
            _ => Err(reject::<Self>(value)),
        }
    }

    fn to_value(self) -> AttributeValue {
        AttributeValue::Float(self)
    }

    fn identical(self, other: Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl Primitive for f64 {
    const NATIVE: NativeType = NativeType::Double;
    const TYPE_NAME: &'static str = type_names::DOUBLE;

    fn zero() -> Self {
        0.0
    }

    fn convert(value: &AttributeValue) -> Result<Option<Self>, GraphError> {
        match value {
            AttributeValue::Null => Ok(None),
            AttributeValue::Integer(v) => Ok(Some(f64::from(*v))),
            AttributeValue::Long(v) => Ok(Some(*v as f64)),
            AttributeValue::Float(v) => Ok(Some(f64::from(*v))),
            AttributeValue::Double(v) => Ok(Some(*v)),
            AttributeValue::Text(s) => parse_float::<Self>(s).map(Some),
            _ => Err(reject::<Self>(value)),
        }
    }

    fn to_value(self) -> AttributeValue {
        AttributeValue::Double(self)
    }

    fn identical(self, other: Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

/// Dense column of primitive values, one slot per element id.
#[derive(Clone, Debug)]
pub struct PrimitiveColumn<P: Primitive> {
    values: Vec<P>,
    default: P,
}

impl<P: Primitive> PrimitiveColumn<P> {
    pub fn new(default: P) -> Self {
        Self {
            values: Vec::new(),
            default,
        }
    }

    /// Typed read, bypassing [`AttributeValue`].
    pub fn get_native(&self, id: ElementId) -> P {
        self.values.get(id).copied().unwrap_or(self.default)
    }
}

impl<P: Primitive> AttributeColumn for PrimitiveColumn<P> {
    fn type_name(&self) -> &str {
        P::TYPE_NAME
    }

    fn native_type(&self) -> NativeType {
        P::NATIVE
    }

    fn capacity(&self) -> usize {
        self.values.len()
    }

    fn ensure_capacity(&mut self, capacity: usize) {
        if capacity > self.values.len() {
            self.values.resize(capacity, self.default);
        }
    }

    fn get(&self, id: ElementId) -> AttributeValue {
        self.get_native(id).to_value()
    }

    fn set(&mut self, id: ElementId, value: AttributeValue) -> Result<(), GraphError> {
        match P::convert(&value)? {
            Some(v) => {
                self.ensure_capacity(id + 1);
                self.values[id] = v;
            }
            None => self.clear(id),
        }
        Ok(())
    }

    fn is_default(&self, id: ElementId) -> bool {
        self.get_native(id).identical(self.default)
    }

    fn clear(&mut self, id: ElementId) {
        if let Some(slot) = self.values.get_mut(id) {
            *slot = self.default;
        }
    }

    fn default_value(&self) -> AttributeValue {
        self.default.to_value()
    }

    fn set_default_value(&mut self, value: AttributeValue) -> Result<(), GraphError> {
        let new_default = P::convert(&value)?.unwrap_or_else(P::zero);
        let old_default = self.default;
        for slot in self.values.iter_mut() {
            if slot.identical(old_default) {
                *slot = new_default;
            }
        }
        self.default = new_default;
        Ok(())
    }

    fn normalise(&self, value: AttributeValue) -> Result<AttributeValue, GraphError> {
        Ok(P::convert(&value)?.unwrap_or(self.default).to_value())
    }

    fn copy(&self) -> Box<dyn AttributeColumn> {
        Box::new(self.clone())
    }

    fn copy_from(&mut self, source: &dyn AttributeColumn) -> bool {
        let Some(source) = source.as_any().downcast_ref::<Self>() else {
            return false;
        };
        self.values.clone_from(&source.values);
        self.default = source.default;
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Builds [`PrimitiveColumn`]s for one primitive type.
pub struct PrimitiveColumnFactory<P> {
    _marker: PhantomData<fn() -> P>,
}

impl<P> PrimitiveColumnFactory<P> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<P> Default for PrimitiveColumnFactory<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Primitive> ColumnFactory for PrimitiveColumnFactory<P> {
    fn type_name(&self) -> &str {
        P::TYPE_NAME
    }

    fn native_type(&self) -> NativeType {
        P::NATIVE
    }

    fn create(&self, default: AttributeValue) -> Result<Box<dyn AttributeColumn>, GraphError> {
        let default = P::convert(&default)?.unwrap_or_else(P::zero);
        Ok(Box::new(PrimitiveColumn::new(default)))
    }
}

pub type BooleanColumn = PrimitiveColumn<bool>;
pub type IntegerColumn = PrimitiveColumn<i32>;
pub type LongColumn = PrimitiveColumn<i64>;
pub type FloatColumn = PrimitiveColumn<f32>;
pub type DoubleColumn = PrimitiveColumn<f64>;
