//! Input type descriptors.

use std::any::type_name;
use std::fmt;

use serde::de::DeserializeOwned;

use crate::binding::{from_query, shape_of, BindError, QueryParams, Shape};
use crate::http::request::Input;

/// Describes the input type a method handler binds. Holds decode functions
/// monomorphised for that type, never a value.
#[derive(Clone, Copy)]
pub struct Prototype {
    type_name: &'static str,
    decoders: Option<Decoders>,
}

#[derive(Clone, Copy)]
struct Decoders {
    query: fn(&QueryParams) -> Result<Input, BindError>,
    json: fn(&[u8]) -> Result<Input, serde_json::Error>,
    shape: fn() -> Shape,
}

fn decode_query<T>(params: &QueryParams) -> Result<Input, BindError>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    from_query::<T>(params).map(|value| Box::new(value) as Input)
}

fn decode_json<T>(body: &[u8]) -> Result<Input, serde_json::Error>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    serde_json::from_slice::<T>(body).map(|value| Box::new(value) as Input)
}

impl Prototype {
    /// Bind requests into a fresh `T` each time.
    pub fn of<T>() -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        Self {
            type_name: type_name::<T>(),
            decoders: Some(Decoders {
                query: decode_query::<T>,
                json: decode_json::<T>,
                shape: shape_of::<T>,
            }),
        }
    }

    /// No input: nothing is decoded and handlers see `()`.
    pub fn none() -> Self {
        Self {
            type_name: "()",
            decoders: None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_none(&self) -> bool {
        self.decoders.is_none()
    }

    pub(crate) fn shape(&self) -> Option<Shape> {
        self.decoders.map(|d| (d.shape)())
    }

    pub(crate) fn from_query(&self, params: &QueryParams) -> Result<Input, BindError> {
        match &self.decoders {
            Some(d) => (d.query)(params),
            None => Ok(Box::new(())),
        }
    }

    pub(crate) fn from_json(&self, body: &[u8]) -> Result<Input, serde_json::Error> {
        match &self.decoders {
            Some(d) => (d.json)(body),
            None => Ok(Box::new(())),
        }
    }
}

impl fmt::Debug for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Prototype").field(&self.type_name).finish()
    }
}
