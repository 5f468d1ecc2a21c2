//! Prototype definition parsing.
//!
//! Parses `##Name: <type>{required} | <type>[optional=default]` strings.

use super::args::coerce;
use super::{FunctionKind, FunctionPrototype, ParamType, PrototypeParameter, is_valid_name};
use crate::PrototypeError;

/// Parse a prototype definition string.
pub(super) fn parse(definition: &str) -> Result<FunctionPrototype, PrototypeError> {
    let trimmed = definition.trim();

    let kind = trimmed
        .get(..2)
        .and_then(FunctionKind::from_sigil)
        .ok_or_else(|| PrototypeError::invalid(definition, "expected ##, {{ or @@ sigil"))?;

    let rest = &trimmed[2..];
    let (name, params) = match rest.split_once(':') {
        Some((name, params)) => (name.trim(), Some(params)),
        None => (rest.trim(), None),
    };

    if !is_valid_name(name) {
        return Err(PrototypeError::invalid(
            definition,
            format!("invalid function name `{name}`"),
        ));
    }

    let mut parameters: Vec<PrototypeParameter> = Vec::new();
    for raw in params.into_iter().flat_map(|p| p.split('|')) {
        let param = parse_parameter(definition, raw.trim())?;

        if parameters
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(&param.name))
        {
            return Err(PrototypeError::invalid(
                definition,
                format!("duplicate parameter `{}`", param.name),
            ));
        }
        if parameters
            .last()
            .is_some_and(|p| p.param_type == ParamType::InfiniteString)
        {
            return Err(PrototypeError::invalid(
                definition,
                "infinitestring parameter must be the last parameter",
            ));
        }

        parameters.push(param);
    }

    Ok(FunctionPrototype {
        kind,
        name: name.to_owned(),
        parameters,
    })
}

fn parse_parameter(definition: &str, raw: &str) -> Result<PrototypeParameter, PrototypeError> {
    if raw.is_empty() {
        return Err(PrototypeError::invalid(definition, "empty parameter"));
    }

    // Optional type prefix: <type> or <type:a,b,c>
    let (param_type, allowed_values, rest) = if let Some(stripped) = raw.strip_prefix('<') {
        let end = stripped
            .find('>')
            .ok_or_else(|| PrototypeError::invalid(definition, "unterminated <type>"))?;
        let (type_name, allowed) = match stripped[..end].split_once(':') {
            Some((type_name, allowed)) => (type_name, Some(allowed)),
            None => (&stripped[..end], None),
        };
        let param_type = parse_type(definition, type_name.trim())?;
        let allowed_values: Vec<String> = allowed
            .into_iter()
            .flat_map(|a| a.split(','))
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .collect();
        if !allowed_values.is_empty()
            && !matches!(param_type, ParamType::String | ParamType::Undefined)
        {
            return Err(PrototypeError::invalid(
                definition,
                "allowed values are only supported for string parameters",
            ));
        }
        (param_type, allowed_values, stripped[end + 1..].trim())
    } else {
        (ParamType::Undefined, Vec::new(), raw)
    };

    let (required, name, default) = if let Some(inner) = rest
        .strip_prefix('{')
        .and_then(|r| r.strip_suffix('}'))
    {
        (true, inner.trim(), None)
    } else if let Some(inner) = rest.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        match inner.split_once('=') {
            Some((name, default)) => (false, name.trim(), Some(default.trim().to_owned())),
            None => (false, inner.trim(), None),
        }
    } else {
        return Err(PrototypeError::invalid(
            definition,
            format!("parameter `{rest}` must be written as {{name}} or [name]"),
        ));
    };

    if !is_valid_name(name) {
        return Err(PrototypeError::invalid(
            definition,
            format!("invalid parameter name `{name}`"),
        ));
    }

    let param = PrototypeParameter {
        name: name.to_owned(),
        param_type,
        required,
        default,
        allowed_values,
    };

    if let Some(default) = &param.default {
        coerce(&param, default).map_err(|message| {
            PrototypeError::invalid(definition, format!("default for `{name}`: {message}"))
        })?;
    }

    Ok(param)
}

fn parse_type(definition: &str, name: &str) -> Result<ParamType, PrototypeError> {
    match name.to_ascii_lowercase().as_str() {
        "string" => Ok(ParamType::String),
        "infinitestring" => Ok(ParamType::InfiniteString),
        "integer" | "int" => Ok(ParamType::Integer),
        "double" | "float" => Ok(ParamType::Double),
        "boolean" | "bool" => Ok(ParamType::Boolean),
        "" | "undefined" => Ok(ParamType::Undefined),
        other => Err(PrototypeError::invalid(
            definition,
            format!("unknown parameter type `{other}`"),
        )),
    }
}
