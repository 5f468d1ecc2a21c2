//! Built-in instruction functions (`@@Name(args)`).

use super::InstructionFunction;
use crate::{
    CompileError, EngineState, FunctionArgs, FunctionRegistry, PageFlag, PrototypeError,
};

pub(crate) fn register_builtins(registry: &mut FunctionRegistry) -> Result<(), PrototypeError> {
    registry.register_instruction(Tags)?;
    for flag in PageFlag::ALL {
        registry.register_instruction(SetFlag::new(flag))?;
    }
    Ok(())
}

/// `@@Tags(a, b, c)`: comma-separated page tags.
struct Tags;

impl InstructionFunction for Tags {
    fn prototype(&self) -> &str {
        "@@Tags: <infinitestring>{tags}"
    }

    fn call(&self, state: &mut EngineState<'_>, args: &FunctionArgs) -> Result<(), CompileError> {
        for tag in args.text("tags").unwrap_or_default().split(',') {
            state.add_tag(tag);
        }
        Ok(())
    }
}

/// `@@Draft`, `@@NoCache`, ...: sets one [`PageFlag`].
struct SetFlag {
    flag: PageFlag,
    prototype: String,
}

impl SetFlag {
    fn new(flag: PageFlag) -> Self {
        Self {
            flag,
            prototype: format!("@@{}", flag.name()),
        }
    }
}

impl InstructionFunction for SetFlag {
    fn prototype(&self) -> &str {
        &self.prototype
    }

    fn call(&self, state: &mut EngineState<'_>, _args: &FunctionArgs) -> Result<(), CompileError> {
        state.set_flag(self.flag);
        Ok(())
    }
}
