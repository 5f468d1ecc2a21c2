//! Process-wide function registry.

use std::collections::HashMap;

use super::{FunctionKind, FunctionPrototype};
use crate::PrototypeError;
use crate::functions::{
    InstructionFunction, ScopedFunction, StandardFunction, register_instruction_builtins,
    register_scoped_builtins, register_standard_builtins,
};

struct Registered<H: ?Sized> {
    prototype: FunctionPrototype,
    handler: Box<H>,
}

/// Registry of wiki functions and their prototypes.
///
/// Built once at startup and then shared read-only (typically behind an
/// `Arc`) by every compile. Names are matched case-insensitively and are
/// unique per [`FunctionKind`].
///
/// # Example
///
/// ```
/// use wiki_engine::{FunctionKind, FunctionRegistry};
///
/// let registry = FunctionRegistry::with_builtins().unwrap();
/// assert!(registry.prototype(FunctionKind::Standard, "emoji").is_some());
/// assert!(registry.prototype(FunctionKind::Scoped, "emoji").is_none());
/// ```
#[derive(Default)]
pub struct FunctionRegistry {
    standard: HashMap<String, Registered<dyn StandardFunction>>,
    scoped: HashMap<String, Registered<dyn ScopedFunction>>,
    instruction: HashMap<String, Registered<dyn InstructionFunction>>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in function library.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in prototype fails to parse.
    pub fn with_builtins() -> Result<Self, PrototypeError> {
        let mut registry = Self::new();
        register_standard_builtins(&mut registry)?;
        register_scoped_builtins(&mut registry)?;
        register_instruction_builtins(&mut registry)?;
        Ok(registry)
    }

    /// Register a standard function handler.
    ///
    /// # Errors
    ///
    /// Returns an error if the prototype is invalid, is not a `##` prototype,
    /// or the name is already taken.
    pub fn register_standard<F: StandardFunction + 'static>(
        &mut self,
        handler: F,
    ) -> Result<(), PrototypeError> {
        let prototype = checked_prototype(handler.prototype(), FunctionKind::Standard)?;
        insert(&mut self.standard, prototype, Box::new(handler))
    }

    /// Register a scoped function handler.
    ///
    /// # Errors
    ///
    /// Returns an error if the prototype is invalid, is not a `{{` prototype,
    /// or the name is already taken.
    pub fn register_scoped<F: ScopedFunction + 'static>(
        &mut self,
        handler: F,
    ) -> Result<(), PrototypeError> {
        let prototype = checked_prototype(handler.prototype(), FunctionKind::Scoped)?;
        insert(&mut self.scoped, prototype, Box::new(handler))
    }

    /// Register an instruction function handler.
    ///
    /// # Errors
    ///
    /// Returns an error if the prototype is invalid, is not a `@@` prototype,
    /// or the name is already taken.
    pub fn register_instruction<F: InstructionFunction + 'static>(
        &mut self,
        handler: F,
    ) -> Result<(), PrototypeError> {
        let prototype = checked_prototype(handler.prototype(), FunctionKind::Instruction)?;
        insert(&mut self.instruction, prototype, Box::new(handler))
    }

    /// Look up a prototype by kind and name.
    #[must_use]
    pub fn prototype(&self, kind: FunctionKind, name: &str) -> Option<&FunctionPrototype> {
        let key = name.to_ascii_lowercase();
        match kind {
            FunctionKind::Standard => self.standard.get(&key).map(|r| &r.prototype),
            FunctionKind::Scoped => self.scoped.get(&key).map(|r| &r.prototype),
            FunctionKind::Instruction => self.instruction.get(&key).map(|r| &r.prototype),
        }
    }

    pub(crate) fn standard(
        &self,
        name: &str,
    ) -> Option<(&FunctionPrototype, &dyn StandardFunction)> {
        self.standard
            .get(&name.to_ascii_lowercase())
            .map(|r| (&r.prototype, r.handler.as_ref()))
    }

    pub(crate) fn scoped(&self, name: &str) -> Option<(&FunctionPrototype, &dyn ScopedFunction)> {
        self.scoped
            .get(&name.to_ascii_lowercase())
            .map(|r| (&r.prototype, r.handler.as_ref()))
    }

    pub(crate) fn instruction(
        &self,
        name: &str,
    ) -> Option<(&FunctionPrototype, &dyn InstructionFunction)> {
        self.instruction
            .get(&name.to_ascii_lowercase())
            .map(|r| (&r.prototype, r.handler.as_ref()))
    }

    /// All registered prototypes, ordered by kind then name.
    #[must_use]
    pub fn prototypes(&self) -> Vec<&FunctionPrototype> {
        let mut all: Vec<&FunctionPrototype> = self
            .standard
            .values()
            .map(|r| &r.prototype)
            .chain(self.scoped.values().map(|r| &r.prototype))
            .chain(self.instruction.values().map(|r| &r.prototype))
            .collect();
        all.sort_by(|a, b| {
            a.kind
                .cmp(&b.kind)
                .then_with(|| a.name.to_ascii_lowercase().cmp(&b.name.to_ascii_lowercase()))
        });
        all
    }

    /// Total number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.standard.len() + self.scoped.len() + self.instruction.len()
    }

    /// Whether no function is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn checked_prototype(
    definition: &str,
    expected: FunctionKind,
) -> Result<FunctionPrototype, PrototypeError> {
    let prototype = FunctionPrototype::parse(definition)?;
    if prototype.kind != expected {
        return Err(PrototypeError::KindMismatch {
            name: prototype.name,
            expected,
            found: prototype.kind,
        });
    }
    Ok(prototype)
}

fn insert<H: ?Sized>(
    map: &mut HashMap<String, Registered<H>>,
    prototype: FunctionPrototype,
    handler: Box<H>,
) -> Result<(), PrototypeError> {
    let key = prototype.name.to_ascii_lowercase();
    if map.contains_key(&key) {
        return Err(PrototypeError::Duplicate {
            kind: prototype.kind,
            name: key,
        });
    }
    map.insert(key, Registered { prototype, handler });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompileError, EngineState, FunctionArgs, HandlerResult};

    struct Echo(&'static str);

    impl StandardFunction for Echo {
        fn prototype(&self) -> &str {
            self.0
        }

        fn call(
            &self,
            _state: &mut EngineState<'_>,
            _args: &FunctionArgs,
        ) -> Result<HandlerResult, CompileError> {
            Ok(HandlerResult::html("echo"))
        }
    }

    #[test]
    fn test_register_and_lookup_case_insensitive() {
        let mut registry = FunctionRegistry::new();
        registry.register_standard(Echo("##Echo: {value}")).unwrap();

        assert!(registry.standard("ECHO").is_some());
        assert!(registry.prototype(FunctionKind::Standard, "echo").is_some());
        assert!(registry.scoped("echo").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = FunctionRegistry::new();
        registry.register_standard(Echo("##Echo")).unwrap();
        let err = registry.register_standard(Echo("##echo")).unwrap_err();
        assert!(matches!(err, PrototypeError::Duplicate { .. }));
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let mut registry = FunctionRegistry::new();
        let err = registry.register_standard(Echo("@@Echo")).unwrap_err();
        assert_eq!(
            err,
            PrototypeError::KindMismatch {
                name: "Echo".to_owned(),
                expected: FunctionKind::Standard,
                found: FunctionKind::Instruction,
            }
        );
    }

    #[test]
    fn test_invalid_prototype_rejected() {
        let mut registry = FunctionRegistry::new();
        let err = registry
            .register_standard(Echo("##Bad: <infinitestring>{a} | {b}"))
            .unwrap_err();
        assert!(matches!(err, PrototypeError::InvalidDefinition { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_builtins_registered() {
        let registry = FunctionRegistry::with_builtins().unwrap();
        for (kind, name) in [
            (FunctionKind::Standard, "Emoji"),
            (FunctionKind::Standard, "Image"),
            (FunctionKind::Standard, "Color"),
            (FunctionKind::Standard, "Snippet"),
            (FunctionKind::Scoped, "Bullets"),
            (FunctionKind::Scoped, "Code"),
            (FunctionKind::Scoped, "DefineSnippet"),
            (FunctionKind::Instruction, "Tags"),
            (FunctionKind::Instruction, "Draft"),
        ] {
            assert!(
                registry.prototype(kind, name).is_some(),
                "missing built-in {kind}{name}"
            );
        }
    }

    #[test]
    fn test_prototypes_sorted_by_kind_then_name() {
        let registry = FunctionRegistry::with_builtins().unwrap();
        let protos = registry.prototypes();
        assert_eq!(protos.len(), registry.len());
        for pair in protos.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(
                a.kind < b.kind
                    || (a.kind == b.kind
                        && a.name.to_ascii_lowercase() <= b.name.to_ascii_lowercase())
            );
        }
    }

    #[test]
    fn test_registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FunctionRegistry>();
    }
}
