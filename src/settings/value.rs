use std::fmt;

/// A setting value with the type inferred from its text.
#[derive(Clone, Debug, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Text(String),
}

impl SettingValue {
    /// Tries bool (any case), then integer, then float, then falls back to text.
    pub fn infer(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("true") {
            SettingValue::Bool(true)
        } else if raw.eq_ignore_ascii_case("false") {
            SettingValue::Bool(false)
        } else if let Ok(int) = raw.parse::<i32>() {
            SettingValue::Int(int)
        } else if let Ok(float) = raw.parse::<f32>() {
            SettingValue::Float(float)
        } else {
            SettingValue::Text(raw.to_string())
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            SettingValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            SettingValue::Float(f) => Some(*f),
            SettingValue::Int(i) => Some(*i as f32),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{b}"),
            SettingValue::Int(i) => write!(f, "{i}"),
            SettingValue::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            SettingValue::Float(v) => write!(f, "{v}"),
            SettingValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<i32> for SettingValue {
    fn from(value: i32) -> Self {
        SettingValue::Int(value)
    }
}

impl From<f32> for SettingValue {
    fn from(value: f32) -> Self {
        SettingValue::Float(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Text(value.to_string())
    }
}
