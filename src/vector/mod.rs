//! Vector features and their conversion to the processing grid.

pub mod rasterize;

use geo::Geometry;
use std::collections::HashMap;

pub use rasterize::{centroids, count_overlaps, rasterize, select_intersecting};

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttributeValue {
    /// Numeric view of the value; text is parsed, null is `None`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Null => None,
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Key usable for attribute joins
    pub fn join_key(&self) -> Option<String> {
        match self {
            AttributeValue::Null => None,
            AttributeValue::Int(v) => Some(v.to_string()),
            // NHDPlus ids are stored as doubles in some releases
            AttributeValue::Float(v) if v.fract() == 0.0 => Some(format!("{}", *v as i64)),
            AttributeValue::Float(v) => Some(v.to_string()),
            AttributeValue::Text(s) => Some(s.trim().to_string()),
        }
    }
}

/// A geometry with the attributes read alongside it
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    pub properties: HashMap<String, AttributeValue>,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry,
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }
}

/// A point with a value, used for interpolation and density surfaces
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl SamplePoint {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }

    pub fn dist_sq(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy
    }
}
