//! Registration-time shape detection.
//!
//! Runs a type's derived `Deserialize` impl against a deserializer that
//! answers nothing and only records which shape was asked for.

use std::fmt;

use serde::de::{self, DeserializeOwned, Visitor};
use serde::forward_to_deserialize_any;

/// Shape a type asks its deserializer for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    Struct,
    Other(&'static str),
}

/// Report whether `T` deserializes as a struct (through `Option`, `Box`
/// and newtype wrappers).
pub(crate) fn shape_of<T: DeserializeOwned>() -> Shape {
    match T::deserialize(ShapeProbe) {
        Err(ProbeSignal(shape)) => shape,
        Ok(_) => Shape::Other("value"),
    }
}

#[derive(Debug)]
struct ProbeSignal(Shape);

impl fmt::Display for ProbeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shape {:?}", self.0)
    }
}

impl std::error::Error for ProbeSignal {}

impl de::Error for ProbeSignal {
    fn custom<T: fmt::Display>(_msg: T) -> Self {
        ProbeSignal(Shape::Other("custom"))
    }
}

struct ShapeProbe;

impl<'de> de::Deserializer<'de> for ShapeProbe {
    type Error = ProbeSignal;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, ProbeSignal> {
        Err(ProbeSignal(Shape::Other("scalar")))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, ProbeSignal> {
        Err(ProbeSignal(Shape::Struct))
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _visitor: V,
    ) -> Result<V::Value, ProbeSignal> {
        Err(ProbeSignal(Shape::Struct))
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ProbeSignal> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ProbeSignal> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_map<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, ProbeSignal> {
        Err(ProbeSignal(Shape::Other("map")))
    }

    fn deserialize_seq<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, ProbeSignal> {
        Err(ProbeSignal(Shape::Other("sequence")))
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str string bytes byte_buf
        unit tuple tuple_struct enum identifier ignored_any
    }
}
