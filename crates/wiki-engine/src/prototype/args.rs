//! Call argument splitting and binding.
//!
//! Binds the raw text between a call's parentheses to a prototype's
//! parameters: `##Image(logo.png, scale=50, "Company logo")`.

use std::collections::HashMap;

use super::{FunctionPrototype, ParamType, PrototypeParameter, is_valid_name};
use crate::CompileError;

/// A bound argument value, coerced to the parameter's declared type.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgValue {
    /// String, infinite string and untyped parameters.
    Text(String),
    /// Integer parameters.
    Integer(i64),
    /// Double parameters.
    Double(f64),
    /// Boolean parameters.
    Boolean(bool),
}

/// Arguments of a call, bound and validated against its prototype.
///
/// Parameters that were omitted and have no default are absent.
///
/// # Example
///
/// ```
/// use wiki_engine::{FunctionArgs, FunctionPrototype};
///
/// let proto = FunctionPrototype::parse("##Image: <string>{name} | <integer>[scale=100]").unwrap();
/// let args = FunctionArgs::bind(&proto, "logo.png").unwrap();
/// assert_eq!(args.text("name"), Some("logo.png"));
/// assert_eq!(args.integer("scale"), Some(100));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FunctionArgs {
    values: HashMap<String, ArgValue>,
}

impl FunctionArgs {
    /// Bind raw argument text against a prototype.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::PrototypeSyntaxError`] for missing, surplus,
    /// duplicated or mistyped arguments.
    pub fn bind(prototype: &FunctionPrototype, raw: &str) -> Result<Self, CompileError> {
        bind(prototype, raw)
    }

    /// Get a bound value by parameter name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(&name.to_ascii_lowercase())
    }

    /// Get a text value.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            ArgValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get an integer value.
    #[must_use]
    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            ArgValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get a double value.
    #[must_use]
    pub fn double(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            ArgValue::Double(n) => Some(*n),
            _ => None,
        }
    }

    /// Get a boolean value.
    #[must_use]
    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            ArgValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Number of bound parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no parameter is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub(crate) fn bind(prototype: &FunctionPrototype, raw: &str) -> Result<FunctionArgs, CompileError> {
    let name = prototype.name.as_str();
    let params = &prototype.parameters;
    let mut values: Vec<Option<ArgValue>> = vec![None; params.len()];
    let mut cursor = 0;

    let segments = if raw.trim().is_empty() {
        Vec::new()
    } else {
        split_arguments(raw)
    };

    for (position, (offset, segment)) in segments.into_iter().enumerate() {
        // Named argument: key=value where key is a declared parameter
        if let Some((key, value_offset)) = named_argument(segment)
            && let Some(index) = params.iter().position(|p| p.name.eq_ignore_ascii_case(key))
        {
            if values[index].is_some() {
                return Err(CompileError::syntax(
                    name,
                    format!("argument `{}` given more than once", params[index].name),
                ));
            }
            let param = &params[index];
            if param.param_type == ParamType::InfiniteString {
                let rest = raw[offset + value_offset..].trim();
                values[index] = Some(coerce_for_call(name, param, &unquote(rest))?);
                break;
            }
            let value = unquote(segment[value_offset..].trim());
            values[index] = Some(coerce_for_call(name, param, &value)?);
            continue;
        }

        while cursor < params.len() && values[cursor].is_some() {
            cursor += 1;
        }
        let Some(param) = params.get(cursor) else {
            return Err(CompileError::syntax(
                name,
                format!("too many arguments (expected at most {})", params.len()),
            ));
        };

        if param.param_type == ParamType::InfiniteString {
            let rest = raw[offset..].trim();
            values[cursor] = Some(coerce_for_call(name, param, &unquote(rest))?);
            break;
        }

        let trimmed = segment.trim();
        if trimmed.is_empty() {
            return Err(CompileError::syntax(
                name,
                format!("empty argument at position {}", position + 1),
            ));
        }
        values[cursor] = Some(coerce_for_call(name, param, &unquote(trimmed))?);
        cursor += 1;
    }

    let mut bound = HashMap::with_capacity(params.len());
    for (param, value) in params.iter().zip(values) {
        let value = match (value, &param.default) {
            (Some(value), _) => value,
            (None, Some(default)) => coerce_for_call(name, param, default)?,
            (None, None) if param.required => {
                return Err(CompileError::syntax(
                    name,
                    format!("missing required argument `{}`", param.name),
                ));
            }
            (None, None) => continue,
        };
        bound.insert(param.name.to_ascii_lowercase(), value);
    }

    Ok(FunctionArgs { values: bound })
}

fn coerce_for_call(
    name: &str,
    param: &PrototypeParameter,
    raw: &str,
) -> Result<ArgValue, CompileError> {
    coerce(param, raw).map_err(|message| CompileError::syntax(name, message))
}

/// Coerce raw text to the parameter's type and check allowed values.
pub(super) fn coerce(param: &PrototypeParameter, raw: &str) -> Result<ArgValue, String> {
    let value = match param.param_type {
        ParamType::Integer => raw
            .trim()
            .parse::<i64>()
            .map(ArgValue::Integer)
            .map_err(|_| format!("`{}` expects an integer, got `{raw}`", param.name))?,
        ParamType::Double => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(ArgValue::Double)
            .ok_or_else(|| format!("`{}` expects a number, got `{raw}`", param.name))?,
        ParamType::Boolean => parse_bool(raw)
            .map(ArgValue::Boolean)
            .ok_or_else(|| format!("`{}` expects true or false, got `{raw}`", param.name))?,
        ParamType::String | ParamType::InfiniteString | ParamType::Undefined => {
            ArgValue::Text(raw.to_owned())
        }
    };

    if !param.allowed_values.is_empty()
        && let ArgValue::Text(text) = &value
        && !param
            .allowed_values
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(text.trim()))
    {
        return Err(format!(
            "`{}` must be one of {}, got `{text}`",
            param.name,
            param.allowed_values.join(", ")
        ));
    }

    Ok(value)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Split argument text on top-level commas.
///
/// Commas inside double quotes or nested parentheses do not split.
/// Returns `(byte offset, segment)` pairs.
fn split_arguments(raw: &str) -> Vec<(usize, &str)> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in raw.char_indices() {
        if in_quotes {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_quotes = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                segments.push((start, &raw[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }

    segments.push((start, &raw[start..]));
    segments
}

/// Detect `key=value`, returning the key and the byte offset of the value.
fn named_argument(segment: &str) -> Option<(&str, usize)> {
    let eq_pos = segment.find('=')?;
    let key = segment[..eq_pos].trim();
    is_valid_name(key).then_some((key, eq_pos + 1))
}

/// Remove surrounding double quotes and unescape `\"` and `\\`.
///
/// Text that is not a single quoted string is returned unchanged.
fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"') else {
        return value.to_owned();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                if let Some((_, next)) = chars.next() {
                    out.push(next);
                }
            }
            '"' => {
                return if i + 1 == inner.len() {
                    out
                } else {
                    value.to_owned()
                };
            }
            _ => out.push(c),
        }
    }

    value.to_owned()
}

/// Find the `)` matching the `(` at the start of `s`.
///
/// Quoted strings and nested parentheses are skipped. Returns the byte index
/// of the closing parenthesis.
pub(crate) fn matching_paren(s: &str) -> Option<usize> {
    if !s.starts_with('(') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_quotes {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_quotes = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}
