use crate::errors::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Scalar value of a feature, tagged with the type it was declared with
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl FeatureValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FeatureValue::Int(_) => "int",
            FeatureValue::Long(_) => "long",
            FeatureValue::Float(_) => "float",
            FeatureValue::Double(_) => "double",
        }
    }

    /// Value as stored in the binary trace: floating point values are truncated.
    /// Consumers of the trace format rely on this coercion.
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_i64(&self) -> i64 {
        match *self {
            FeatureValue::Int(v) => i64::from(v),
            FeatureValue::Long(v) => v,
            FeatureValue::Float(v) => v as i64,
            FeatureValue::Double(v) => v as i64,
        }
    }

    pub fn parse(type_name: &str, value: &str) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedFeature {
            token: format!("{type_name}&{value}"),
            reason,
        };
        match type_name {
            "int" => value
                .parse::<i32>()
                .map(FeatureValue::Int)
                .map_err(|e| malformed(e.to_string())),
            "long" => value
                .parse::<i64>()
                .map(FeatureValue::Long)
                .map_err(|e| malformed(e.to_string())),
            "float" => value
                .parse::<f32>()
                .map(FeatureValue::Float)
                .map_err(|e| malformed(e.to_string())),
            "double" => value
                .parse::<f64>()
                .map(FeatureValue::Double)
                .map_err(|e| malformed(e.to_string())),
            other => Err(Error::UnknownFeatureType(other.to_owned())),
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Int(v) => write!(f, "{v}"),
            FeatureValue::Long(v) => write!(f, "{v}"),
            FeatureValue::Float(v) => write!(f, "{v}"),
            FeatureValue::Double(v) => write!(f, "{v}"),
        }
    }
}

impl From<i32> for FeatureValue {
    fn from(v: i32) -> Self {
        FeatureValue::Int(v)
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        FeatureValue::Long(v)
    }
}

impl From<f32> for FeatureValue {
    fn from(v: f32) -> Self {
        FeatureValue::Float(v)
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Double(v)
    }
}

/// Named attribute of an invocation, declared when the invocation starts.
///
/// Rendered on `FUNC_START` lines as `name=type&value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub name: String,
    pub value: FeatureValue,
}

impl Feature {
    pub fn new(name: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Feature {
    /// Fails on names that would not read back from a `name=type&value` token
    pub fn check_name(&self) -> Result<()> {
        let reason = if self.name.is_empty() {
            "empty feature name"
        } else if self.name.contains(char::is_whitespace) {
            "feature name contains whitespace"
        } else if self.name.contains(['=', '&']) {
            "feature name contains '=' or '&'"
        } else {
            return Ok(());
        };
        Err(Error::InvalidName {
            name: self.name.clone(),
            reason: reason.to_owned(),
        })
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}&{}", self.name, self.value.type_name(), self.value)
    }
}

impl FromStr for Feature {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        let malformed = |reason: &str| Error::MalformedFeature {
            token: token.to_owned(),
            reason: reason.to_owned(),
        };
        let (name, typed_value) = token.split_once('=').ok_or_else(|| malformed("missing '='"))?;
        let (type_name, value) = typed_value
            .split_once('&')
            .ok_or_else(|| malformed("missing '&'"))?;
        if name.is_empty() {
            return Err(malformed("empty name"));
        }
        let value = FeatureValue::parse(type_name, value).map_err(|e| match e {
            Error::MalformedFeature { reason, .. } => malformed(&reason),
            other => other,
        })?;
        Ok(Self {
            name: name.to_owned(),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_and_parse() {
        let features = [
            Feature::new("msg_len", 5),
            Feature::new("total", 1_i64 << 40),
            Feature::new("ratio", 0.75_f32),
            Feature::new("scale", -2.5_f64),
        ];
        let rendered: Vec<String> = features.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "msg_len=int&5",
                "total=long&1099511627776",
                "ratio=float&0.75",
                "scale=double&-2.5"
            ]
        );
        for (text, feature) in rendered.iter().zip(features.iter()) {
            assert_eq!(&text.parse::<Feature>().unwrap(), feature);
        }
    }

    #[test]
    fn test_feature_names() {
        assert!(Feature::new("msg_len", 1).check_name().is_ok());
        for name in ["", "msg len", "a=b", "a&b"] {
            assert!(
                matches!(
                    Feature::new(name, 1).check_name(),
                    Err(Error::InvalidName { .. })
                ),
                "{name:?}"
            );
        }
    }

    #[test]
    fn test_truncation() {
        assert_eq!(FeatureValue::Float(3.9).to_i64(), 3);
        assert_eq!(FeatureValue::Double(-3.9).to_i64(), -3);
        assert_eq!(FeatureValue::Int(-7).to_i64(), -7);
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(matches!(
            "x".parse::<Feature>(),
            Err(Error::MalformedFeature { .. })
        ));
        assert!(matches!(
            "x=int".parse::<Feature>(),
            Err(Error::MalformedFeature { .. })
        ));
        assert!(matches!(
            "x=int&abc".parse::<Feature>(),
            Err(Error::MalformedFeature { .. })
        ));
        assert!(matches!(
            "x=string&abc".parse::<Feature>(),
            Err(Error::UnknownFeatureType(t)) if t == "string"
        ));
    }
}
