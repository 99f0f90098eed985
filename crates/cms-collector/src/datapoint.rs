use std::{collections::HashSet, fmt};

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::resource::ResourceIndex;

/// Fields that carry values or bookkeeping and never become labels.
pub const RESERVED_FIELDS: [&str; 5] = ["timestamp", "Maximum", "Minimum", "Average", "userId"];

/// Field used to cross-reference a datapoint with a [`ResourceIndex`].
pub const INSTANCE_ID_FIELD: &str = "instanceId";

pub fn is_reserved(field: &str) -> bool {
    RESERVED_FIELDS.contains(&field)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("value {0:?} is not numeric")]
    NotNumeric(String),
    #[error("value {0:?} is not text")]
    NotText(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Integral JSON number, kept exact for label use.
    Integer(i128),
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl FieldValue {
    /// Numbers pass through and numeric text is parsed.
    pub fn as_f64(&self) -> Result<f64, FieldError> {
        match self {
            Self::Integer(value) => Ok(*value as f64),
            Self::Number(value) => Ok(*value),
            Self::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| FieldError::NotNumeric(text.clone())),
            other => Err(FieldError::NotNumeric(other.to_string())),
        }
    }

    pub fn as_str(&self) -> Result<&str, FieldError> {
        match self {
            Self::Text(text) => Ok(text),
            other => Err(FieldError::NotText(other.to_string())),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Number(number) => {
                if let Some(value) = number.as_i64() {
                    Self::Integer(i128::from(value))
                } else if let Some(value) = number.as_u64() {
                    Self::Integer(i128::from(value))
                } else {
                    number
                        .as_f64()
                        .map(Self::Number)
                        .unwrap_or_else(|| Self::Text(number.to_string()))
                }
            }
            Value::String(text) => Self::Text(text),
            Value::Bool(flag) => Self::Bool(flag),
            Value::Null => Self::Null,
            nested @ (Value::Array(_) | Value::Object(_)) => Self::Text(nested.to_string()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Number(value) if value.is_finite() && value.fract() == 0.0 => {
                write!(f, "{value:.0}")
            }
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Null => Ok(()),
        }
    }
}

/// One raw sample returned by the monitoring API. Field order follows the
/// response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct Datapoint {
    fields: Vec<(String, FieldValue)>,
}

impl Datapoint {
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let mut datapoint = Self::default();
        for (name, value) in fields {
            datapoint.insert(name.into(), value.into());
        }
        datapoint
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.get(INSTANCE_ID_FIELD)?.as_str().ok()
    }

    /// Value of `field`, or zero when the field is absent or not numeric.
    pub fn measure(&self, field: &str) -> f64 {
        self.get(field)
            .and_then(|value| value.as_f64().ok())
            .unwrap_or(0.0)
    }

    /// Own non-reserved fields in response order, followed by every requested
    /// dimension the datapoint does not carry, in configuration order.
    pub fn label_names<S: AsRef<str>>(&self, dimensions: &[S]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut labels = Vec::new();

        for (name, _) in &self.fields {
            if !is_reserved(name) && seen.insert(name.as_str()) {
                labels.push(name.clone());
            }
        }

        for dimension in dimensions {
            let dimension = dimension.as_ref();
            if !is_reserved(dimension) && seen.insert(dimension) {
                labels.push(dimension.to_string());
            }
        }

        labels
    }

    /// Resolves one value per label name. Labels missing from the datapoint
    /// are looked up through its `instanceId`; anything unresolved is empty.
    pub fn label_values<S: AsRef<str>>(&self, labels: &[S], index: &ResourceIndex) -> Vec<String> {
        labels
            .iter()
            .map(|label| {
                let label = label.as_ref();
                match self.get(label) {
                    Some(value) => value.to_string(),
                    None => self
                        .instance_id()
                        .and_then(|instance_id| index.attribute(instance_id, label))
                        .unwrap_or_default()
                        .to_string(),
                }
            })
            .collect()
    }

    fn insert(&mut self, name: String, value: FieldValue) {
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }
}

impl From<Map<String, Value>> for Datapoint {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            fields: map
                .into_iter()
                .map(|(name, value)| (name, FieldValue::from(value)))
                .collect(),
        }
    }
}

/// Decodes the JSON array embedded in a monitoring response.
pub fn parse_datapoints(raw: &str) -> Result<Vec<Datapoint>, serde_json::Error> {
    serde_json::from_str(raw)
}
