//! Case-folding deserializer over `serde_json::Value`.
//!
//! Object keys are matched against the field names a struct declares and
//! renamed to the declared spelling when they differ only by ASCII case.
//! Folding recurses through nested structs, sequences, maps and options.
//! Enum payloads are handed to `serde_json` unchanged.

use serde::de::{self, DeserializeSeed, IntoDeserializer, MapAccess, SeqAccess, Visitor};
use serde::{forward_to_deserialize_any, Deserializer};
use serde_json::{Map, Value};

type Error = serde_json::Error;

/// A JSON value that deserializes with case-insensitive field matching.
pub(crate) struct Folded(pub(crate) Value);

impl<'de> Deserializer<'de> for Folded {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.0 {
            Value::Array(items) => visitor.visit_seq(FoldedSeq {
                iter: items.into_iter(),
            }),
            Value::Object(map) => visitor.visit_map(FoldedMap::new(map)),
            scalar => scalar.deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.0 {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(Folded(other)),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self.0 {
            Value::Object(map) => visitor.visit_map(FoldedMap::new(fold_keys(map, fields))),
            other => Folded(other).deserialize_any(visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.0.deserialize_enum(name, variants, visitor)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map identifier
        ignored_any
    }
}

/// Rename keys that match a declared field except for ASCII case.
///
/// A field already present under its exact name keeps that value; case
/// variants of it are left untouched.
fn fold_keys(map: Map<String, Value>, fields: &[&str]) -> Map<String, Value> {
    let exact: Vec<&str> = fields
        .iter()
        .copied()
        .filter(|field| map.contains_key(*field))
        .collect();
    map.into_iter()
        .map(|(key, value)| {
            if fields.contains(&key.as_str()) {
                return (key, value);
            }
            let target = fields
                .iter()
                .find(|field| field.eq_ignore_ascii_case(&key))
                .filter(|field| !exact.contains(*field));
            match target {
                Some(field) => ((*field).to_string(), value),
                None => (key, value),
            }
        })
        .collect()
}

struct FoldedSeq {
    iter: std::vec::IntoIter<Value>,
}

impl<'de> SeqAccess<'de> for FoldedSeq {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Error> {
        self.iter
            .next()
            .map(|value| seed.deserialize(Folded(value)))
            .transpose()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct FoldedMap {
    iter: serde_json::map::IntoIter,
    value: Option<Value>,
}

impl FoldedMap {
    fn new(map: Map<String, Value>) -> Self {
        Self {
            iter: map.into_iter(),
            value: None,
        }
    }
}

impl<'de> MapAccess<'de> for FoldedMap {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, Error> {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                let key: de::value::StringDeserializer<Error> = key.into_deserializer();
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Error> {
        match self.value.take() {
            Some(value) => seed.deserialize(Folded(value)),
            None => Err(de::Error::custom("value is missing")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}
