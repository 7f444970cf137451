//! Parsing of consolidated Zarr v2 metadata (`.zmetadata`).

use crate::store::{ArrayInfo, Attributes, StoreError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

const ARRAY_DIMENSIONS: &str = "_ARRAY_DIMENSIONS";

#[derive(Debug, Deserialize)]
struct ConsolidatedFile {
    metadata: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ZArray {
    shape: Vec<u64>,
    #[serde(default)]
    fill_value: Value,
    dtype: Value,
}

/// Root attributes and top-level arrays of one store.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ConsolidatedMetadata {
    pub attributes: Attributes,
    pub arrays: BTreeMap<String, ArrayInfo>,
}

impl ConsolidatedMetadata {
    pub(crate) fn parse(url: &str, bytes: &[u8]) -> Result<Self, StoreError> {
        let file: ConsolidatedFile = serde_json::from_slice(bytes)
            .map_err(|e| StoreError::MetadataParse(url.to_string(), e))?;
        let invalid = |message: String| StoreError::InvalidMetadata {
            url: url.to_string(),
            message,
        };

        let attributes = match file.metadata.get(".zattrs") {
            Some(Value::Object(map)) => map.clone(),
            _ => Attributes::new(),
        };

        let mut arrays = BTreeMap::new();
        for (key, value) in &file.metadata {
            let Some(name) = key.strip_suffix("/.zarray") else {
                continue;
            };
            // Nested groups are not part of the ERA5 layout
            if name.contains('/') {
                continue;
            }
            let zarray: ZArray = serde_json::from_value(value.clone())
                .map_err(|e| StoreError::MetadataParse(format!("{url}/{key}"), e))?;
            if zarray.dtype.is_null() {
                return Err(invalid(format!("array '{name}' has no dtype")));
            }
            let mut array_attributes = match file.metadata.get(&format!("{name}/.zattrs")) {
                Some(Value::Object(map)) => map.clone(),
                _ => Attributes::new(),
            };
            let dims = match array_attributes.remove(ARRAY_DIMENSIONS) {
                Some(Value::Array(items)) => items
                    .iter()
                    .map(|item| {
                        item.as_str().map(str::to_string).ok_or_else(|| {
                            invalid(format!("non-string entry in {ARRAY_DIMENSIONS} of '{name}'"))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                _ => return Err(invalid(format!("array '{name}' has no {ARRAY_DIMENSIONS}"))),
            };
            if dims.len() != zarray.shape.len() {
                return Err(invalid(format!(
                    "array '{name}' has {} dimension names for a {}-d shape",
                    dims.len(),
                    zarray.shape.len()
                )));
            }
            arrays.insert(
                name.to_string(),
                ArrayInfo {
                    name: name.to_string(),
                    dims,
                    shape: zarray.shape,
                    attributes: array_attributes,
                    fill_value: fill_value(&zarray.fill_value),
                },
            );
        }
        if arrays.is_empty() {
            return Err(invalid("no arrays in consolidated metadata".to_string()));
        }
        Ok(Self { attributes, arrays })
    }

    /// One-dimensional arrays named after their own dimension.
    pub(crate) fn coordinate_names(&self) -> impl Iterator<Item = &str> {
        self.arrays
            .values()
            .filter(|array| array.dims.len() == 1 && array.dims[0] == array.name)
            .map(|array| array.name.as_str())
    }
}

fn fill_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s == "NaN" => Some(f64::NAN),
        Value::String(s) if s == "Infinity" => Some(f64::INFINITY),
        Value::String(s) if s == "-Infinity" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}
