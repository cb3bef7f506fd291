// Response-shape normalization
//
// Endpoints are inconsistent about their success bodies: some return a bare
// array, some a {data: [...]} envelope, some a single resource object. The
// gateway normalizes once, here, so no consumer ever sniffs shapes.

use serde_json::{Map, Value};

/// Normalized success payload exposed to consumers
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    /// A list of resources
    Collection(Vec<Value>),
    /// A single resource object
    Resource(Map<String, Value>),
    /// Nothing useful in the body
    Empty,
}

impl ResponseData {
    /// Normalize a response body by fixed precedence:
    /// 1. a bare array is used as-is
    /// 2. otherwise a `.data` array field is used
    /// 3. otherwise a non-array object passes through unchanged
    /// 4. anything else (null, scalar, string) is empty
    pub fn normalize(body: Value) -> Self {
        match body {
            Value::Array(items) => ResponseData::Collection(items),
            Value::Object(mut map) => {
                // Only an array-valued `data` field is an envelope; any other
                // `data` is part of the resource and stays in place
                if matches!(map.get("data"), Some(Value::Array(_))) {
                    if let Some(Value::Array(items)) = map.remove("data") {
                        return ResponseData::Collection(items);
                    }
                }
                ResponseData::Resource(map)
            }
            _ => ResponseData::Empty,
        }
    }

    /// The collection items, empty for the other variants
    pub fn items(&self) -> &[Value] {
        match self {
            ResponseData::Collection(items) => items,
            _ => &[],
        }
    }

    /// The resource object, if this is a single resource
    pub fn resource(&self) -> Option<&Map<String, Value>> {
        match self {
            ResponseData::Resource(map) => Some(map),
            _ => None,
        }
    }

    /// Whether there is no payload
    pub fn is_empty(&self) -> bool {
        matches!(self, ResponseData::Empty)
    }
}

impl Default for ResponseData {
    fn default() -> Self {
        ResponseData::Empty
    }
}
