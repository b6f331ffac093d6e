//! Built-in globals, property access and allow-listed methods

use std::collections::BTreeMap;

use super::eval::EvalError;
use super::value::{Function, Value, format_number};

const STRING_METHODS: &[&str] = &[
    "toUpperCase",
    "toLowerCase",
    "trim",
    "includes",
    "startsWith",
    "endsWith",
    "indexOf",
    "slice",
    "substring",
    "split",
    "replace",
    "padStart",
    "padEnd",
    "toString",
];

const ARRAY_METHODS: &[&str] = &["includes", "indexOf", "join", "slice", "toString"];

const NUMBER_METHODS: &[&str] = &["toFixed", "toString"];

/// Longest string a method may build, in characters (V8's limit)
const MAX_STRING_LENGTH: f64 = 1_073_741_823.0;

const MATH_FUNCTIONS: &[&str] = &[
    "Math.max",
    "Math.min",
    "Math.abs",
    "Math.floor",
    "Math.ceil",
    "Math.round",
    "Math.pow",
    "Math.sqrt",
    "Math.trunc",
    "Math.sign",
];

const CONVERSION_FUNCTIONS: &[&str] = &[
    "String",
    "Number",
    "Boolean",
    "parseInt",
    "parseFloat",
    "isNaN",
];

/// Resolve a built-in global name
pub fn lookup_global(name: &str) -> Option<Value> {
    match name {
        "Math" => {
            let mut fields = BTreeMap::new();
            for &qualified in MATH_FUNCTIONS {
                let short = qualified.trim_start_matches("Math.");
                fields.insert(short.to_string(), Value::Function(Function::free(qualified)));
            }
            fields.insert("PI".to_string(), Value::Number(std::f64::consts::PI));
            fields.insert("E".to_string(), Value::Number(std::f64::consts::E));
            Some(Value::object(fields))
        }
        "JSON" => {
            let mut fields = BTreeMap::new();
            fields.insert(
                "stringify".to_string(),
                Value::Function(Function::free("JSON.stringify")),
            );
            Some(Value::object(fields))
        }
        "NaN" => Some(Value::Number(f64::NAN)),
        "Infinity" => Some(Value::Number(f64::INFINITY)),
        _ => CONVERSION_FUNCTIONS
            .iter()
            .find(|&&f| f == name)
            .map(|&f| Value::Function(Function::free(f))),
    }
}

fn find_method(list: &[&'static str], key: &str) -> Option<&'static str> {
    list.iter().find(|&&m| m == key).copied()
}

/// Read `target[key]`
///
/// Reading from `undefined` or `null` is a type error; any other value that
/// lacks the member yields `undefined`.
pub fn property(target: &Value, key: &str) -> Result<Value, EvalError> {
    let value = match target {
        Value::Undefined | Value::Null => {
            return Err(EvalError::Type(format!(
                "Cannot read properties of {} (reading '{}')",
                target, key
            )));
        }
        Value::String(s) => {
            if key == "length" {
                Value::Number(s.chars().count() as f64)
            } else if let Ok(index) = key.parse::<usize>() {
                s.chars()
                    .nth(index)
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or_default()
            } else {
                find_method(STRING_METHODS, key)
                    .map(|m| Value::Function(Function::method(m, target.clone())))
                    .unwrap_or_default()
            }
        }
        Value::Array(items) => {
            if key == "length" {
                Value::Number(items.len() as f64)
            } else if let Ok(index) = key.parse::<usize>() {
                items.get(index).cloned().unwrap_or_default()
            } else {
                find_method(ARRAY_METHODS, key)
                    .map(|m| Value::Function(Function::method(m, target.clone())))
                    .unwrap_or_default()
            }
        }
        Value::Object(fields) => fields.get(key).cloned().unwrap_or_default(),
        Value::Number(_) => find_method(NUMBER_METHODS, key)
            .map(|m| Value::Function(Function::method(m, target.clone())))
            .unwrap_or_default(),
        Value::Bool(_) => match key {
            "toString" => Value::Function(Function::method("toString", target.clone())),
            _ => Value::Undefined,
        },
        Value::Function(_) => Value::Undefined,
    };
    Ok(value)
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

/// Integer argument, `default` when absent or undefined
fn int_arg(args: &[Value], i: usize, default: f64) -> f64 {
    match args.get(i) {
        None | Some(Value::Undefined) => default,
        Some(v) => {
            let n = v.to_number();
            if n.is_nan() { 0.0 } else { n.trunc() }
        }
    }
}

/// Clamp a relative index (negative counts from the end) into `0..=len`
fn relative_index(n: f64, len: usize) -> usize {
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

/// Invoke a built-in function
pub fn call(func: &Function, args: &[Value]) -> Result<Value, EvalError> {
    match &func.this {
        Some(this) => call_method(func.name, this, args),
        None => call_free(func.name, args),
    }
}

fn call_free(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let num = |i: usize| arg(args, i).to_number();
    let value = match name {
        "Math.max" => Value::Number(
            args.iter()
                .map(Value::to_number)
                .try_fold(f64::NEG_INFINITY, |acc, n| {
                    if n.is_nan() { None } else { Some(acc.max(n)) }
                })
                .unwrap_or(f64::NAN),
        ),
        "Math.min" => Value::Number(
            args.iter()
                .map(Value::to_number)
                .try_fold(f64::INFINITY, |acc, n| {
                    if n.is_nan() { None } else { Some(acc.min(n)) }
                })
                .unwrap_or(f64::NAN),
        ),
        "Math.abs" => Value::Number(num(0).abs()),
        "Math.floor" => Value::Number(num(0).floor()),
        "Math.ceil" => Value::Number(num(0).ceil()),
        // Halves round towards +Infinity
        "Math.round" => Value::Number((num(0) + 0.5).floor()),
        "Math.pow" => Value::Number(num(0).powf(num(1))),
        "Math.sqrt" => Value::Number(num(0).sqrt()),
        "Math.trunc" => Value::Number(num(0).trunc()),
        "Math.sign" => {
            let n = num(0);
            Value::Number(if n.is_nan() || n == 0.0 { n } else { n.signum() })
        }
        "JSON.stringify" => match arg(args, 0).to_json() {
            Some(json) => Value::String(json.to_string()),
            None => Value::Undefined,
        },
        "String" => match args.first() {
            Some(v) => Value::String(v.to_string()),
            None => Value::String(String::new()),
        },
        "Number" => Value::Number(args.first().map_or(0.0, Value::to_number)),
        "Boolean" => Value::Bool(arg(args, 0).is_truthy()),
        "parseInt" => Value::Number(parse_int(&arg(args, 0).to_string(), int_arg(args, 1, 0.0))),
        "parseFloat" => Value::Number(parse_float(&arg(args, 0).to_string())),
        "isNaN" => Value::Bool(num(0).is_nan()),
        other => return Err(EvalError::Type(format!("{} is not a function", other))),
    };
    Ok(value)
}

fn call_method(name: &str, this: &Value, args: &[Value]) -> Result<Value, EvalError> {
    match this {
        Value::String(s) => string_method(name, s, args),
        Value::Array(items) => array_method(name, items, args),
        Value::Number(n) => number_method(name, *n, args),
        Value::Bool(b) if name == "toString" => Ok(Value::String(b.to_string())),
        other => Err(EvalError::Type(format!(
            "{}.{} is not a function",
            other.type_of(),
            name
        ))),
    }
}

fn string_method(name: &str, s: &str, args: &[Value]) -> Result<Value, EvalError> {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    let text = |i: usize| arg(args, i).to_string();

    let value = match name {
        "toUpperCase" => Value::String(s.to_uppercase()),
        "toLowerCase" => Value::String(s.to_lowercase()),
        "trim" => Value::String(s.trim().to_string()),
        "toString" => Value::String(s.to_string()),
        "includes" => {
            let start = relative_index(int_arg(args, 1, 0.0).max(0.0), len);
            let rest: String = chars[start..].iter().collect();
            Value::Bool(rest.contains(&text(0)))
        }
        "startsWith" => {
            let start = relative_index(int_arg(args, 1, 0.0).max(0.0), len);
            let rest: String = chars[start..].iter().collect();
            Value::Bool(rest.starts_with(&text(0)))
        }
        "endsWith" => {
            let end = relative_index(int_arg(args, 1, len as f64).max(0.0), len);
            let head: String = chars[..end].iter().collect();
            Value::Bool(head.ends_with(&text(0)))
        }
        "indexOf" => {
            let needle = text(0);
            let index = s
                .find(&needle)
                .map(|byte| s[..byte].chars().count() as f64)
                .unwrap_or(-1.0);
            Value::Number(index)
        }
        "slice" => {
            let start = relative_index(int_arg(args, 0, 0.0), len);
            let end = relative_index(int_arg(args, 1, len as f64), len);
            let out: String = if start < end {
                chars[start..end].iter().collect()
            } else {
                String::new()
            };
            Value::String(out)
        }
        "substring" => {
            let a = int_arg(args, 0, 0.0).clamp(0.0, len as f64) as usize;
            let b = int_arg(args, 1, len as f64).clamp(0.0, len as f64) as usize;
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            Value::String(chars[start..end].iter().collect())
        }
        "split" => match args.first() {
            None | Some(Value::Undefined) => Value::array(vec![Value::from(s)]),
            Some(sep) => {
                let sep = sep.to_string();
                let parts: Vec<Value> = if sep.is_empty() {
                    chars.iter().map(|c| Value::String(c.to_string())).collect()
                } else {
                    s.split(sep.as_str()).map(Value::from).collect()
                };
                Value::array(parts)
            }
        },
        "replace" => Value::String(s.replacen(&text(0), &text(1), 1)),
        "padStart" | "padEnd" => {
            let target = int_arg(args, 0, 0.0).max(0.0);
            let fill = match args.get(1) {
                None | Some(Value::Undefined) => " ".to_string(),
                Some(v) => v.to_string(),
            };
            if target <= len as f64 || fill.is_empty() {
                Value::String(s.to_string())
            } else if target > MAX_STRING_LENGTH {
                return Err(EvalError::Range("Invalid string length".to_string()));
            } else {
                let target = target as usize;
                let padding: String = fill.chars().cycle().take(target - len).collect();
                if name == "padStart" {
                    Value::String(format!("{}{}", padding, s))
                } else {
                    Value::String(format!("{}{}", s, padding))
                }
            }
        }
        other => {
            return Err(EvalError::Type(format!("string.{} is not a function", other)));
        }
    };
    Ok(value)
}

/// `SameValueZero`, used by `Array.prototype.includes`
fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => a.strict_equals(b),
    }
}

fn array_method(name: &str, items: &[Value], args: &[Value]) -> Result<Value, EvalError> {
    let len = items.len();
    let value = match name {
        "includes" => {
            let needle = arg(args, 0);
            Value::Bool(items.iter().any(|item| same_value_zero(item, &needle)))
        }
        "indexOf" => {
            let needle = arg(args, 0);
            let index = items
                .iter()
                .position(|item| item.strict_equals(&needle))
                .map_or(-1.0, |i| i as f64);
            Value::Number(index)
        }
        "join" => {
            let sep = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(v) => v.to_string(),
            };
            let joined = items
                .iter()
                .map(Value::to_display_string)
                .collect::<Vec<_>>()
                .join(&sep);
            Value::String(joined)
        }
        "slice" => {
            let start = relative_index(int_arg(args, 0, 0.0), len);
            let end = relative_index(int_arg(args, 1, len as f64), len);
            let out = if start < end {
                items[start..end].to_vec()
            } else {
                Vec::new()
            };
            Value::array(out)
        }
        "toString" => Value::String(Value::array(items.to_vec()).to_string()),
        other => {
            return Err(EvalError::Type(format!("array.{} is not a function", other)));
        }
    };
    Ok(value)
}

/// Fixed-point text for a finite `n` below 1e21
///
/// Rounds the exact binary value with ties away from zero, where `{:.N}`
/// would round ties to even.
fn to_fixed(n: f64, digits: usize) -> String {
    // 1100 fractional digits hold every f64 exactly
    let exact = format!("{:.1100}", n.abs());
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));

    let mut kept: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(digits))
        .collect();
    if frac_part.as_bytes().get(digits).is_some_and(|&d| d >= b'5') {
        let mut i = kept.len();
        loop {
            if i == 0 {
                kept.insert(0, b'1');
                break;
            }
            i -= 1;
            if kept[i] == b'9' {
                kept[i] = b'0';
            } else {
                kept[i] += 1;
                break;
            }
        }
    }

    let int_len = kept.len() - digits;
    let mut out = String::with_capacity(kept.len() + 2);
    if n < 0.0 {
        out.push('-');
    }
    out.extend(kept[..int_len].iter().map(|&d| char::from(d)));
    if digits > 0 {
        out.push('.');
        out.extend(kept[int_len..].iter().map(|&d| char::from(d)));
    }
    out
}

fn number_method(name: &str, n: f64, args: &[Value]) -> Result<Value, EvalError> {
    match name {
        "toFixed" => {
            let digits = int_arg(args, 0, 0.0);
            if !(0.0..=100.0).contains(&digits) {
                return Err(EvalError::Range(
                    "toFixed() digits argument must be between 0 and 100".to_string(),
                ));
            }
            if !n.is_finite() || n.abs() >= 1e21 {
                return Ok(Value::String(format_number(n)));
            }
            Ok(Value::String(to_fixed(n, digits as usize)))
        }
        "toString" => {
            let radix = int_arg(args, 0, 10.0);
            if !(2.0..=36.0).contains(&radix) {
                return Err(EvalError::Range(
                    "toString() radix must be between 2 and 36".to_string(),
                ));
            }
            if radix == 10.0 || !n.is_finite() || n.fract() != 0.0 {
                return Ok(Value::String(format_number(n)));
            }
            Ok(Value::String(integer_to_radix(n, radix as u32)))
        }
        other => Err(EvalError::Type(format!("number.{} is not a function", other))),
    }
}

fn integer_to_radix(n: f64, radix: u32) -> String {
    let negative = n < 0.0;
    let mut rest = n.abs() as u64;
    let mut digits = Vec::new();
    loop {
        let digit = (rest % radix as u64) as u32;
        digits.push(char::from_digit(digit, radix).unwrap_or('0'));
        rest /= radix as u64;
        if rest == 0 {
            break;
        }
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

/// `parseInt`: leading integer in the given radix, NaN when none
///
/// A radix of 0 means unspecified: base 10, or 16 with a `0x` prefix.
fn parse_int(input: &str, radix: f64) -> f64 {
    let trimmed = input.trim_start();
    let (negative, mut body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let mut radix = radix as u32;
    if radix == 0 || radix == 16 {
        if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
            radix = 16;
            body = hex;
        }
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }

    let digits: Vec<u32> = body.chars().map_while(|c| c.to_digit(radix)).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let magnitude = digits
        .iter()
        .fold(0.0, |acc, &d| acc * radix as f64 + d as f64);
    if negative { -magnitude } else { magnitude }
}

/// `parseFloat`: longest numeric prefix, NaN when none
fn parse_float(input: &str) -> f64 {
    let trimmed = input.trim_start();
    for literal in ["Infinity", "+Infinity"] {
        if trimmed.starts_with(literal) {
            return f64::INFINITY;
        }
    }
    if trimmed.starts_with("-Infinity") {
        return f64::NEG_INFINITY;
    }

    // Longest prefix that parses wins
    let mut best = f64::NAN;
    for (i, c) in trimmed.char_indices() {
        if !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')) {
            break;
        }
        if let Ok(n) = trimmed[..i + c.len_utf8()].parse::<f64>() {
            best = n;
        }
    }
    best
}
