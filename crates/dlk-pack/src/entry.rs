use std::collections::BTreeMap;

use dlk_types::Grid;
use serde::{Deserialize, Serialize};

use crate::error::{PackError, PackResult};

/// Scalar attribute attached to a file or a group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Text(String),
    Float(f64),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Float(_) => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// Element storage of a dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DatasetValues {
    Float(Vec<f64>),
    Bool(Vec<bool>),
}

impl DatasetValues {
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> &'static str {
        match self {
            Self::Float(_) => "f64",
            Self::Bool(_) => "bool",
        }
    }
}

/// N-dimensional, row-major numeric array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub shape: Vec<usize>,
    pub values: DatasetValues,
}

impl Dataset {
    /// Build a dataset, checking that the shape covers every element.
    pub fn new(shape: Vec<usize>, values: DatasetValues) -> PackResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(PackError::Corrupt {
                offset: 0,
                reason: format!(
                    "dataset shape {shape:?} needs {expected} elements, got {}",
                    values.len()
                ),
            });
        }
        Ok(Self { shape, values })
    }

    /// 1-D float dataset.
    pub fn vector(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len()],
            values: DatasetValues::Float(values),
        }
    }

    pub fn from_grid(grid: &Grid<f64>) -> Self {
        Self {
            shape: vec![grid.rows(), grid.cols()],
            values: DatasetValues::Float(grid.values().to_vec()),
        }
    }

    pub fn from_mask(mask: &Grid<bool>) -> Self {
        Self {
            shape: vec![mask.rows(), mask.cols()],
            values: DatasetValues::Bool(mask.values().to_vec()),
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match &self.values {
            DatasetValues::Float(v) => Some(v),
            DatasetValues::Bool(_) => None,
        }
    }

    pub fn as_bools(&self) -> Option<&[bool]> {
        match &self.values {
            DatasetValues::Bool(v) => Some(v),
            DatasetValues::Float(_) => None,
        }
    }
}

/// One named group of a workspace file: attributes plus named datasets.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub attrs: BTreeMap<String, AttrValue>,
    pub datasets: BTreeMap<String, Dataset>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<AttrValue>) {
        self.attrs.insert(key.to_string(), value.into());
    }

    pub fn attr_text(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(AttrValue::as_text)
    }

    pub fn attr_float(&self, key: &str) -> Option<f64> {
        self.attrs.get(key).and_then(AttrValue::as_float)
    }

    pub fn set_dataset(&mut self, key: &str, dataset: Dataset) {
        self.datasets.insert(key.to_string(), dataset);
    }

    pub fn dataset(&self, key: &str) -> Option<&Dataset> {
        self.datasets.get(key)
    }

    pub fn has_dataset(&self, key: &str) -> bool {
        self.datasets.contains_key(key)
    }
}
