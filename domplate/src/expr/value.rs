//! Dynamic values produced by expression evaluation
//!
//! Coercions follow JavaScript: truthiness, `ToNumber`, `ToString`, loose and
//! strict equality. Composite values are reference counted so that scope
//! lookups and loop bindings are cheap to clone.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A built-in function, optionally bound to the value it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Qualified name, e.g. `Math.max` or `toUpperCase`
    pub name: &'static str,
    /// Receiver for methods (`"abc".toUpperCase`)
    pub this: Option<Box<Value>>,
}

impl Function {
    pub fn free(name: &'static str) -> Self {
        Self { name, this: None }
    }

    pub fn method(name: &'static str, this: Value) -> Self {
        Self {
            name,
            this: Some(Box::new(this)),
        }
    }
}

/// An expression value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Rc<Vec<Value>>),
    Object(Rc<BTreeMap<String, Value>>),
    Function(Function),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(items))
    }

    pub fn object(fields: BTreeMap<String, Value>) -> Self {
        Value::Object(Rc::new(fields))
    }

    /// `null` or `undefined`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// JavaScript truthiness
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// Result of the `typeof` operator
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
        }
    }

    /// Text used when binding a value into content or an attribute
    ///
    /// `undefined` and `null` bind as the empty string.
    pub fn to_display_string(&self) -> String {
        if self.is_nullish() {
            String::new()
        } else {
            self.to_string()
        }
    }

    /// JavaScript `ToNumber`
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Array(_) => string_to_number(&self.to_string()),
            Value::Object(_) | Value::Function(_) => f64::NAN,
        }
    }

    /// Whether this value is a string after primitive conversion
    fn is_stringish(&self) -> bool {
        matches!(
            self,
            Value::String(_) | Value::Array(_) | Value::Object(_) | Value::Function(_)
        )
    }

    /// `===`
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `==`
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (Value::Bool(b), _) => Value::Number(if *b { 1.0 } else { 0.0 }).loose_equals(other),
            (_, Value::Bool(b)) => self.loose_equals(&Value::Number(if *b { 1.0 } else { 0.0 })),
            (Value::Array(_) | Value::Object(_), Value::Number(_) | Value::String(_)) => {
                Value::String(self.to_string()).loose_equals(other)
            }
            (Value::Number(_) | Value::String(_), Value::Array(_) | Value::Object(_)) => {
                self.loose_equals(&Value::String(other.to_string()))
            }
            _ => self.strict_equals(other),
        }
    }

    /// Ordering used by `<`, `<=`, `>`, `>=`; `None` when incomparable (NaN)
    pub fn compare(&self, other: &Value) -> Option<std::cmp::Ordering> {
        let left_str = self.is_stringish();
        let right_str = other.is_stringish();
        if left_str && right_str {
            return Some(self.to_string().cmp(&other.to_string()));
        }
        self.to_number().partial_cmp(&other.to_number())
    }

    /// `+` with string concatenation when either side is textual
    pub fn add(&self, other: &Value) -> Value {
        if self.is_stringish() || other.is_stringish() {
            Value::String(format!("{}{}", self, other))
        } else {
            Value::Number(self.to_number() + other.to_number())
        }
    }

    /// Convert to JSON; `undefined` and functions have no JSON form
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Value::Undefined | Value::Function(_) => None,
            Value::Null => Some(serde_json::Value::Null),
            Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
            Value::Number(n) => Some(
                serde_json::Number::from_f64(*n)
                    .map(|num| {
                        if n.fract() == 0.0 && n.abs() < 9.0e15 {
                            serde_json::Value::from(*n as i64)
                        } else {
                            serde_json::Value::Number(num)
                        }
                    })
                    .unwrap_or(serde_json::Value::Null),
            ),
            Value::String(s) => Some(serde_json::Value::String(s.clone())),
            Value::Array(items) => Some(serde_json::Value::Array(
                items
                    .iter()
                    .map(|v| v.to_json().unwrap_or(serde_json::Value::Null))
                    .collect(),
            )),
            Value::Object(fields) => Some(serde_json::Value::Object(
                fields
                    .iter()
                    .filter_map(|(k, v)| v.to_json().map(|j| (k.clone(), j)))
                    .collect(),
            )),
        }
    }
}

/// JavaScript `ToNumber` for strings
fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

/// JavaScript `Number.prototype.toString()` for finite and special values
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        // `{:e}` already picks the shortest mantissa; JS also signs positive exponents
        let formatted = format!("{:e}", n);
        match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => formatted,
        }
    } else if n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    /// JavaScript `ToString`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item.to_display_string())?;
                }
                Ok(())
            }
            Value::Object(_) => write!(f, "[object Object]"),
            Value::Function(func) => write!(f, "function {}() {{ [native code] }}", func.name),
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::array(items.iter().map(Value::from).collect()),
            serde_json::Value::Object(fields) => Value::object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from(&json)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::Bool(false).is_truthy());

        // Empty containers are truthy
        assert!(Value::from(json!([])).is_truthy());
        assert!(Value::from(json!({})).is_truthy());
        assert!(Value::from("0").is_truthy());
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(999.0), "999");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(10.5), "10.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_number_formatting_switches_to_exponent() {
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(-1.5e-7), "-1.5e-7");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(-1.2345e25), "-1.2345e+25");
    }

    #[test]
    fn test_display_string() {
        assert_eq!(Value::Undefined.to_display_string(), "");
        assert_eq!(Value::Null.to_display_string(), "");
        assert_eq!(Value::Bool(false).to_display_string(), "false");
        assert_eq!(Value::from(json!([1, null, "a"])).to_display_string(), "1,,a");
        assert_eq!(Value::from(json!({"a": 1})).to_display_string(), "[object Object]");
    }

    #[test]
    fn test_loose_equality() {
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(!Value::Null.loose_equals(&Value::Number(0.0)));
        assert!(Value::Number(1.0).loose_equals(&Value::from("1")));
        assert!(Value::Bool(true).loose_equals(&Value::Number(1.0)));
        assert!(Value::from("").loose_equals(&Value::Number(0.0)));
        assert!(!Value::Number(f64::NAN).loose_equals(&Value::Number(f64::NAN)));
    }

    #[test]
    fn test_strict_equality() {
        assert!(Value::from("a").strict_equals(&Value::from("a")));
        assert!(!Value::Number(1.0).strict_equals(&Value::from("1")));
        assert!(!Value::Null.strict_equals(&Value::Undefined));

        let arr = Value::from(json!([1]));
        assert!(arr.strict_equals(&arr.clone()));
        assert!(!arr.strict_equals(&Value::from(json!([1]))));
    }

    #[test]
    fn test_add_concatenates_strings() {
        assert_eq!(Value::from("$").add(&Value::Number(999.0)), Value::from("$999"));
        assert_eq!(Value::Number(1.0).add(&Value::Number(2.0)), Value::Number(3.0));
        assert_eq!(Value::Null.add(&Value::Number(2.0)), Value::Number(2.0));
        assert_eq!(Value::from(json!([1, 2])).add(&Value::from("x")), Value::from("1,2x"));
    }

    #[test]
    fn test_compare() {
        use std::cmp::Ordering;
        assert_eq!(Value::Number(2.0).compare(&Value::from("10")), Some(Ordering::Less));
        assert_eq!(Value::from("2").compare(&Value::from("10")), Some(Ordering::Greater));
        assert_eq!(Value::Undefined.compare(&Value::Number(1.0)), None);
    }

    #[test]
    fn test_json_round_trip_of_integers() {
        let value = Value::from(json!({"n": 5, "f": 1.5, "s": "x", "nested": [true, null]}));
        assert_eq!(
            value.to_json(),
            Some(json!({"n": 5, "f": 1.5, "s": "x", "nested": [true, null]}))
        );
        assert_eq!(Value::Undefined.to_json(), None);
    }
}
