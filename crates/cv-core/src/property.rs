//! Dynamically typed property values for runtime reconfiguration.
//!
//! Segments accept `set_property(name, value)` while a line is being edited
//! or between runs.  Values arrive untyped; each segment checks the type it
//! expects and either applies the change or reverts it with a reason.

use std::fmt;

use crate::{CvError, CvResult};

#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl PropertyValue {
    pub fn as_bool(&self, name: &str) -> CvResult<bool> {
        match self {
            PropertyValue::Bool(b) => Ok(*b),
            _ => Err(type_error(name, "a boolean")),
        }
    }

    pub fn as_int(&self, name: &str) -> CvResult<i64> {
        match self {
            PropertyValue::Int(i) => Ok(*i),
            _ => Err(type_error(name, "an integer")),
        }
    }

    /// Integers are accepted wherever a float is expected.
    pub fn as_float(&self, name: &str) -> CvResult<f64> {
        match self {
            PropertyValue::Float(f) => Ok(*f),
            PropertyValue::Int(i)   => Ok(*i as f64),
            _ => Err(type_error(name, "a number")),
        }
    }

    pub fn as_text(&self, name: &str) -> CvResult<&str> {
        match self {
            PropertyValue::Text(s) => Ok(s),
            _ => Err(type_error(name, "text")),
        }
    }
}

fn type_error(name: &str, expected: &'static str) -> CvError {
    CvError::PropertyType { name: name.to_owned(), expected }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Int(i)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_owned())
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b)  => write!(f, "{b}"),
            PropertyValue::Int(i)   => write!(f, "{i}"),
            PropertyValue::Float(x) => write!(f, "{x}"),
            PropertyValue::Text(s)  => write!(f, "{s:?}"),
        }
    }
}

/// What happened to a property change.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyOutcome {
    Applied,
    /// The value violated a soft constraint; the previous value was kept.
    Reverted { reason: String },
}
