use serde::{Deserialize, Serialize};

use super::color::Rgb;

/// A raw light-parameter value: a normalized float, a semantic label
/// awaiting mapping resolution, or an RGB triple for color parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Label(String),
    Rgb(Rgb),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            Value::Label(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_rgb(&self) -> Option<Rgb> {
        match self {
            Value::Rgb(c) => Some(*c),
            _ => None,
        }
    }

    /// Numeric view with a fallback for non-numeric values.
    pub fn number_or(&self, default: f64) -> f64 {
        self.as_number().unwrap_or(default)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Label(s.to_owned())
    }
}

impl From<Rgb> for Value {
    fn from(c: Rgb) -> Self {
        Value::Rgb(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        assert_eq!(Value::Number(0.5).as_number(), Some(0.5));
        assert_eq!(Value::from("swirl").as_label(), Some("swirl"));
        assert_eq!(Value::Label("x".into()).as_number(), None);
        assert_eq!(Value::Number(1.0).number_or(0.0), 1.0);
        assert_eq!(Value::from("x").number_or(0.25), 0.25);
    }

    #[test]
    fn serde_shapes() {
        // Untagged: numbers and strings serialize bare.
        assert_eq!(serde_json::to_string(&Value::Number(0.5)).ok(), Some("0.5".into()));
        assert_eq!(
            serde_json::to_string(&Value::Label("swirl".into())).ok(),
            Some("\"swirl\"".into())
        );
    }
}
