//! Typed value → query string.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::ser::{self, Impossible, Serialize, SerializeStruct};

use super::{BindError, QueryParams};

/// Render `value` as query parameters.
///
/// `None` fields are omitted; fields marked `skip_serializing_if` are never
/// seen. A `None`/unit input yields an empty parameter set.
pub fn to_query<T: Serialize + ?Sized>(value: &T) -> Result<QueryParams, BindError> {
    let mut params = QueryParams::new();
    value.serialize(StructSerializer {
        params: &mut params,
    })?;
    Ok(params)
}

struct StructSerializer<'a> {
    params: &'a mut QueryParams,
}

struct FieldSerializer<'a> {
    params: &'a mut QueryParams,
}

impl<'a> ser::Serializer for StructSerializer<'a> {
    type Ok = ();
    type Error = BindError;
    type SerializeSeq = Impossible<(), BindError>;
    type SerializeTuple = Impossible<(), BindError>;
    type SerializeTupleStruct = Impossible<(), BindError>;
    type SerializeTupleVariant = Impossible<(), BindError>;
    type SerializeMap = Impossible<(), BindError>;
    type SerializeStruct = FieldSerializer<'a>;
    type SerializeStructVariant = Impossible<(), BindError>;

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<FieldSerializer<'a>, BindError> {
        Ok(FieldSerializer {
            params: self.params,
        })
    }

    fn serialize_none(self) -> Result<(), BindError> {
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), BindError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), BindError> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), BindError> {
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), BindError> {
        value.serialize(self)
    }

    fn serialize_bool(self, _v: bool) -> Result<(), BindError> {
        Err(BindError::NotStruct("bool"))
    }

    fn serialize_i8(self, _v: i8) -> Result<(), BindError> {
        Err(BindError::NotStruct("integer"))
    }

    fn serialize_i16(self, _v: i16) -> Result<(), BindError> {
        Err(BindError::NotStruct("integer"))
    }

    fn serialize_i32(self, _v: i32) -> Result<(), BindError> {
        Err(BindError::NotStruct("integer"))
    }

    fn serialize_i64(self, _v: i64) -> Result<(), BindError> {
        Err(BindError::NotStruct("integer"))
    }

    fn serialize_u8(self, _v: u8) -> Result<(), BindError> {
        Err(BindError::NotStruct("integer"))
    }

    fn serialize_u16(self, _v: u16) -> Result<(), BindError> {
        Err(BindError::NotStruct("integer"))
    }

    fn serialize_u32(self, _v: u32) -> Result<(), BindError> {
        Err(BindError::NotStruct("integer"))
    }

    fn serialize_u64(self, _v: u64) -> Result<(), BindError> {
        Err(BindError::NotStruct("integer"))
    }

    fn serialize_f32(self, _v: f32) -> Result<(), BindError> {
        Err(BindError::NotStruct("float"))
    }

    fn serialize_f64(self, _v: f64) -> Result<(), BindError> {
        Err(BindError::NotStruct("float"))
    }

    fn serialize_char(self, _v: char) -> Result<(), BindError> {
        Err(BindError::NotStruct("char"))
    }

    fn serialize_str(self, _v: &str) -> Result<(), BindError> {
        Err(BindError::NotStruct("string"))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<(), BindError> {
        Err(BindError::NotStruct("bytes"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<(), BindError> {
        Err(BindError::NotStruct("enum"))
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<(), BindError> {
        Err(BindError::NotStruct("enum"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, BindError> {
        Err(BindError::NotStruct("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, BindError> {
        Err(BindError::NotStruct("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, BindError> {
        Err(BindError::NotStruct("tuple struct"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, BindError> {
        Err(BindError::NotStruct("enum"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, BindError> {
        Err(BindError::NotStruct("map"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, BindError> {
        Err(BindError::NotStruct("enum"))
    }
}

impl SerializeStruct for FieldSerializer<'_> {
    type Ok = ();
    type Error = BindError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), BindError> {
        let rendered = value
            .serialize(ValueSerializer { field: key })
            .map_err(|e| match e {
                BindError::Custom(reason) => BindError::InvalidValue {
                    field: key.to_string(),
                    value: String::new(),
                    reason,
                },
                other => other,
            })?;
        if let Some(text) = rendered {
            self.params.append(key, text);
        }
        Ok(())
    }

    fn end(self) -> Result<(), BindError> {
        Ok(())
    }
}

/// Renders one field. `None` means "omit the key".
struct ValueSerializer {
    field: &'static str,
}

impl ValueSerializer {
    fn unsupported(&self, kind: &'static str) -> BindError {
        BindError::Unsupported {
            field: self.field.to_string(),
            kind,
        }
    }

    fn float(&self, text: String, finite: bool) -> Result<Option<String>, BindError> {
        if finite {
            Ok(Some(text))
        } else {
            Err(BindError::InvalidValue {
                field: self.field.to_string(),
                value: text,
                reason: "non-finite float has no JSON form".into(),
            })
        }
    }
}

impl ser::Serializer for ValueSerializer {
    type Ok = Option<String>;
    type Error = BindError;
    type SerializeSeq = Impossible<Option<String>, BindError>;
    type SerializeTuple = Impossible<Option<String>, BindError>;
    type SerializeTupleStruct = Impossible<Option<String>, BindError>;
    type SerializeTupleVariant = Impossible<Option<String>, BindError>;
    type SerializeMap = Impossible<Option<String>, BindError>;
    type SerializeStruct = Impossible<Option<String>, BindError>;
    type SerializeStructVariant = Impossible<Option<String>, BindError>;

    fn serialize_bool(self, v: bool) -> Result<Option<String>, BindError> {
        Ok(Some(v.to_string()))
    }

    fn serialize_i8(self, v: i8) -> Result<Option<String>, BindError> {
        Ok(Some(v.to_string()))
    }

    fn serialize_i16(self, v: i16) -> Result<Option<String>, BindError> {
        Ok(Some(v.to_string()))
    }

    fn serialize_i32(self, v: i32) -> Result<Option<String>, BindError> {
        Ok(Some(v.to_string()))
    }

    fn serialize_i64(self, v: i64) -> Result<Option<String>, BindError> {
        Ok(Some(v.to_string()))
    }

    fn serialize_u8(self, v: u8) -> Result<Option<String>, BindError> {
        Ok(Some(v.to_string()))
    }

    fn serialize_u16(self, v: u16) -> Result<Option<String>, BindError> {
        Ok(Some(v.to_string()))
    }

    fn serialize_u32(self, v: u32) -> Result<Option<String>, BindError> {
        Ok(Some(v.to_string()))
    }

    fn serialize_u64(self, v: u64) -> Result<Option<String>, BindError> {
        Ok(Some(v.to_string()))
    }

    fn serialize_f32(self, v: f32) -> Result<Option<String>, BindError> {
        self.float(v.to_string(), v.is_finite())
    }

    fn serialize_f64(self, v: f64) -> Result<Option<String>, BindError> {
        self.float(v.to_string(), v.is_finite())
    }

    fn serialize_char(self, v: char) -> Result<Option<String>, BindError> {
        Ok(Some(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Option<String>, BindError> {
        Ok(Some(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Option<String>, BindError> {
        Ok(Some(STANDARD.encode(v)))
    }

    fn serialize_none(self) -> Result<Option<String>, BindError> {
        Ok(None)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Option<String>, BindError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Option<String>, BindError> {
        Ok(None)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Option<String>, BindError> {
        Ok(None)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Option<String>, BindError> {
        Ok(Some(variant.to_string()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Option<String>, BindError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Option<String>, BindError> {
        Err(self.unsupported("enum"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, BindError> {
        Err(self.unsupported("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, BindError> {
        Err(self.unsupported("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, BindError> {
        Err(self.unsupported("tuple struct"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, BindError> {
        Err(self.unsupported("enum"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, BindError> {
        Err(self.unsupported("map"))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, BindError> {
        Err(self.unsupported("struct"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, BindError> {
        Err(self.unsupported("enum"))
    }
}
