//! Function prototypes: declaration, parsing and argument binding.
//!
//! A prototype declares the name, kind and parameters of a wiki function.
//! Prototypes are written as definition strings and parsed when the function
//! is registered:
//!
//! ```text
//! ##Image: <string>{name} | <integer>[scale=100] | <string>[alt]
//! {{Alert: <string:info,warning,danger,success>[kind=info] | <string>[title]
//! @@Tags: <infinitestring>{tags}
//! ```
//!
//! The sigil selects the [`FunctionKind`]. `{name}` declares a required
//! parameter, `[name]` an optional one and `[name=default]` an optional one
//! with a default. The `<type>` prefix is optional; a parameter without one
//! is [`ParamType::Undefined`] and receives raw text.

mod args;
mod definition;
mod registry;

use std::fmt;

pub use args::{ArgValue, FunctionArgs};
pub(crate) use args::{bind, matching_paren};
pub use registry::FunctionRegistry;

/// How a function is invoked and what its handler receives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FunctionKind {
    /// `##Name(args)`: arguments only.
    Standard,
    /// `{{Name(args) body }}`: arguments plus a compiled body.
    Scoped,
    /// `@@Name(args)`: arguments only, no output, state side effects.
    Instruction,
}

impl FunctionKind {
    /// Source sigil introducing a call of this kind.
    #[must_use]
    pub fn sigil(self) -> &'static str {
        match self {
            Self::Standard => "##",
            Self::Scoped => "{{",
            Self::Instruction => "@@",
        }
    }

    pub(crate) fn from_sigil(s: &str) -> Option<Self> {
        match s {
            "##" => Some(Self::Standard),
            "{{" => Some(Self::Scoped),
            "@@" => Some(Self::Instruction),
            _ => None,
        }
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sigil())
    }
}

/// Declared type of a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ParamType {
    /// No declared type: raw text, no coercion.
    Undefined,
    /// A single text value.
    String,
    /// The rest of the call's raw argument text, verbatim. Must be last.
    InfiniteString,
    /// Signed integer.
    Integer,
    /// Floating point number.
    Double,
    /// `true`/`false` (also `yes`/`no`, `1`/`0`).
    Boolean,
}

impl ParamType {
    fn keyword(self) -> &'static str {
        match self {
            Self::Undefined => "",
            Self::String => "string",
            Self::InfiniteString => "infinitestring",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::Boolean => "boolean",
        }
    }
}

/// One declared parameter of a prototype.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PrototypeParameter {
    /// Parameter name, as declared.
    pub name: String,
    /// Declared type.
    pub param_type: ParamType,
    /// Whether the call must supply a value.
    pub required: bool,
    /// Value used when an optional parameter is omitted.
    pub default: Option<String>,
    /// Permitted values (case-insensitive); empty means unrestricted.
    pub allowed_values: Vec<String>,
}

/// Declared signature of a wiki function.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FunctionPrototype {
    /// Kind selected by the sigil.
    pub kind: FunctionKind,
    /// Function name, as declared.
    pub name: String,
    /// Parameters in positional order.
    pub parameters: Vec<PrototypeParameter>,
}

impl FunctionPrototype {
    /// Parse a prototype definition string.
    ///
    /// # Example
    ///
    /// ```
    /// use wiki_engine::{FunctionKind, FunctionPrototype, ParamType};
    ///
    /// let proto = FunctionPrototype::parse("##Color: <string>{color} | <infinitestring>{text}").unwrap();
    /// assert_eq!(proto.kind, FunctionKind::Standard);
    /// assert_eq!(proto.name, "Color");
    /// assert_eq!(proto.parameters[1].param_type, ParamType::InfiniteString);
    /// ```
    pub fn parse(definition: &str) -> Result<Self, crate::PrototypeError> {
        definition::parse(definition)
    }

    /// Find a parameter by name (case-insensitive).
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&PrototypeParameter> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Render the prototype back to definition syntax.
    #[must_use]
    pub fn signature(&self) -> String {
        let mut out = format!("{}{}", self.kind.sigil(), self.name);
        if self.parameters.is_empty() {
            return out;
        }

        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                let mut s = String::new();
                if p.param_type != ParamType::Undefined {
                    s.push('<');
                    s.push_str(p.param_type.keyword());
                    if !p.allowed_values.is_empty() {
                        s.push(':');
                        s.push_str(&p.allowed_values.join(","));
                    }
                    s.push('>');
                }
                match (&p.default, p.required) {
                    (_, true) => s.push_str(&format!("{{{}}}", p.name)),
                    (Some(default), false) => s.push_str(&format!("[{}={default}]", p.name)),
                    (None, false) => s.push_str(&format!("[{}]", p.name)),
                }
                s
            })
            .collect();
        out.push_str(": ");
        out.push_str(&params.join(" | "));
        out
    }
}

/// Whether `name` is a valid function or parameter name.
pub(crate) fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
