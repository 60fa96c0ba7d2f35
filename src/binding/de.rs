//! Query string → typed value.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::value::StrDeserializer;
use serde::de::{self, DeserializeOwned, DeserializeSeed, IntoDeserializer, MapAccess, Visitor};
use serde::forward_to_deserialize_any;

use super::{BindError, QueryParams};

/// Decode query parameters into `T`.
///
/// `T` must have a struct shape. Keys that `T` does not declare are ignored,
/// keys that are absent are left to serde's defaulting rules.
pub fn from_query<T: DeserializeOwned>(params: &QueryParams) -> Result<T, BindError> {
    T::deserialize(StructDeserializer { params })
}

struct StructDeserializer<'a> {
    params: &'a QueryParams,
}

impl<'de> de::Deserializer<'de> for StructDeserializer<'_> {
    type Error = BindError;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, BindError> {
        Err(BindError::NotStruct("non-struct value"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        visitor.visit_map(FieldAccess {
            fields: fields.iter(),
            params: self.params,
            current: None,
        })
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        visitor.visit_unit()
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_map<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, BindError> {
        Err(BindError::NotStruct("map"))
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str string bytes byte_buf
        unit seq tuple tuple_struct enum identifier ignored_any
    }
}

struct FieldAccess<'a> {
    fields: std::slice::Iter<'static, &'static str>,
    params: &'a QueryParams,
    current: Option<(&'static str, &'a str)>,
}

impl<'de> MapAccess<'de> for FieldAccess<'_> {
    type Error = BindError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, BindError> {
        for &field in self.fields.by_ref() {
            if let Some(value) = self.params.get(field) {
                self.current = Some((field, value));
                let key: StrDeserializer<'_, BindError> = field.into_deserializer();
                return seed.deserialize(key).map(Some);
            }
        }
        Ok(None)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, BindError> {
        let (field, value) = self
            .current
            .take()
            .ok_or_else(|| BindError::Custom("value requested before key".into()))?;
        seed.deserialize(ValueDeserializer { field, value })
            .map_err(|e| e.in_field(field, value))
    }
}

struct ValueDeserializer<'a> {
    field: &'static str,
    value: &'a str,
}

impl ValueDeserializer<'_> {
    fn invalid(&self, reason: impl ToString) -> BindError {
        BindError::InvalidValue {
            field: self.field.to_string(),
            value: self.value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn unsupported(&self, kind: &'static str) -> BindError {
        BindError::Unsupported {
            field: self.field.to_string(),
            kind,
        }
    }

    fn parse<T>(&self) -> Result<T, BindError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.value.parse::<T>().map_err(|e| self.invalid(e))
    }
}

macro_rules! deserialize_parsed {
    ($($method:ident => $visit:ident: $ty:ty,)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
                let parsed: $ty = self.parse()?;
                visitor.$visit(parsed)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for ValueDeserializer<'_> {
    type Error = BindError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_str(self.value)
    }

    deserialize_parsed! {
        deserialize_bool => visit_bool: bool,
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_f32 => visit_f32: f32,
        deserialize_f64 => visit_f64: f64,
        deserialize_char => visit_char: char,
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_str(self.value)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_string(self.value.to_string())
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        let decoded = STANDARD.decode(self.value).map_err(|e| self.invalid(e))?;
        visitor.visit_byte_buf(decoded)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_some(self)
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        if self.value.is_empty() {
            visitor.visit_unit()
        } else {
            Err(self.invalid("expected empty value"))
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        let variant: StrDeserializer<'_, BindError> = self.value.into_deserializer();
        visitor.visit_enum(variant)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, BindError> {
        Err(self.unsupported("sequence"))
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, BindError> {
        Err(self.unsupported("tuple"))
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, BindError> {
        Err(self.unsupported("tuple struct"))
    }

    fn deserialize_map<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, BindError> {
        Err(self.unsupported("map"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, BindError> {
        Err(self.unsupported("struct"))
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_str(self.value)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_unit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Base64, Empty};
    use chrono::{DateTime, TimeZone, Utc};
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Scalars {
        flag: bool,
        small: i8,
        big: i64,
        unsigned: u32,
        ratio: f64,
        #[serde(rename = "label")]
        name: String,
        raw: Base64,
        at: Option<DateTime<Utc>>,
        #[serde(skip)]
        hidden: u8,
    }

    #[test]
    fn test_decodes_scalar_fields() {
        let params = QueryParams::parse(
            "flag=true&small=-8&big=9000000000&unsigned=7&ratio=1.5&label=hi&raw=AQID&at=2024-01-02T03:04:05Z&hidden=9",
        );
        let decoded: Scalars = from_query(&params).unwrap();
        assert!(decoded.flag);
        assert_eq!(decoded.small, -8);
        assert_eq!(decoded.big, 9_000_000_000);
        assert_eq!(decoded.unsigned, 7);
        assert_eq!(decoded.ratio, 1.5);
        assert_eq!(decoded.name, "hi");
        assert_eq!(decoded.raw, Base64(vec![1, 2, 3]));
        assert_eq!(
            decoded.at,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
        );
        assert_eq!(decoded.hidden, 0);
    }

    #[test]
    fn test_missing_keys_keep_defaults() {
        let decoded: Scalars = from_query(&QueryParams::parse("small=3")).unwrap();
        assert_eq!(
            decoded,
            Scalars {
                small: 3,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_invalid_value_names_field() {
        let err = from_query::<Scalars>(&QueryParams::parse("small=300")).unwrap_err();
        match err {
            BindError::InvalidValue { field, value, .. } => {
                assert_eq!(field, "small");
                assert_eq!(value, "300");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_timestamp_names_field() {
        let err = from_query::<Scalars>(&QueryParams::parse("at=yesterday")).unwrap_err();
        assert!(matches!(err, BindError::InvalidValue { ref field, .. } if field == "at"));
    }

    #[test]
    fn test_unsupported_field_type() {
        #[derive(Debug, Default, Deserialize)]
        #[serde(default)]
        struct Nested {
            #[allow(dead_code)]
            items: Vec<u8>,
        }

        let err = from_query::<Nested>(&QueryParams::parse("items=1")).unwrap_err();
        assert_eq!(
            err,
            BindError::Unsupported {
                field: "items".into(),
                kind: "sequence"
            }
        );
    }

    #[test]
    fn test_non_struct_rejected() {
        let err = from_query::<u32>(&QueryParams::parse("a=1")).unwrap_err();
        assert!(matches!(err, BindError::NotStruct(_)));
    }

    #[test]
    fn test_empty_struct_ignores_everything() {
        let decoded: Empty = from_query(&QueryParams::parse("anything=1")).unwrap();
        assert_eq!(decoded, Empty {});
    }

    #[test]
    fn test_unit_enum_variant() {
        #[derive(Debug, Default, Deserialize, PartialEq)]
        #[serde(rename_all = "lowercase")]
        enum Order {
            #[default]
            Asc,
            Desc,
        }

        #[derive(Debug, Default, Deserialize)]
        #[serde(default)]
        struct Listing {
            order: Order,
        }

        let decoded: Listing = from_query(&QueryParams::parse("order=desc")).unwrap();
        assert_eq!(decoded.order, Order::Desc);
    }
}
