//! Firestore typed values and their mapping to plain JSON.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value as Json};
use std::collections::BTreeMap;

/// A single Firestore field value as it appears on the REST wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    /// int64 is sent as a decimal string.
    IntegerValue(#[serde(deserialize_with = "string_or_number")] String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(LatLng),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(n) => n.to_string(),
    })
}

impl Value {
    pub fn from_json(json: Json) -> Self {
        match json {
            Json::Null => Value::NullValue(()),
            Json::Bool(b) => Value::BooleanValue(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::IntegerValue(i.to_string()),
                None => Value::DoubleValue(n.as_f64().unwrap_or_default()),
            },
            Json::String(s) => Value::StringValue(s),
            Json::Array(items) => Value::ArrayValue(ArrayValue {
                values: items.into_iter().map(Value::from_json).collect(),
            }),
            Json::Object(map) => Value::MapValue(MapValue {
                fields: fields_from_json(map),
            }),
        }
    }

    pub fn into_json(self) -> Json {
        match self {
            Value::NullValue(()) => Json::Null,
            Value::BooleanValue(b) => Json::Bool(b),
            Value::IntegerValue(text) => match text.parse::<i64>() {
                Ok(i) => Json::Number(i.into()),
                Err(_) => Json::String(text),
            },
            Value::DoubleValue(f) => Number::from_f64(f).map_or(Json::Null, Json::Number),
            Value::TimestampValue(s)
            | Value::StringValue(s)
            | Value::BytesValue(s)
            | Value::ReferenceValue(s) => Json::String(s),
            Value::GeoPointValue(point) => serde_json::json!({
                "latitude": point.latitude,
                "longitude": point.longitude,
            }),
            Value::ArrayValue(array) => {
                Json::Array(array.values.into_iter().map(Value::into_json).collect())
            }
            Value::MapValue(map) => Json::Object(fields_into_json(map.fields)),
        }
    }
}

pub fn fields_from_json(map: Map<String, Json>) -> BTreeMap<String, Value> {
    map.into_iter()
        .map(|(key, value)| (key, Value::from_json(value)))
        .collect()
}

pub fn fields_into_json(fields: BTreeMap<String, Value>) -> Map<String, Json> {
    fields
        .into_iter()
        .map(|(key, value)| (key, value.into_json()))
        .collect()
}
