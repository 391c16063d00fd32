use std::any::Any;

use crate::cell::DataCell;
use crate::error::VmError;

/// A native function a host embeds into a running program. `argv` holds
/// exactly the callee's declared parameter cells; the return value is a
/// single cell (zeroed for a void-returning prototype), matching the
/// compiler's rule that a host function's return type fits in one cell.
pub type HostCallback = fn(argv: &[DataCell], host_data: &mut dyn Any) -> DataCell;

#[derive(Clone, Copy)]
struct HostFunction {
    prototype: &'static str,
    callback: HostCallback,
}

/// The native functions a host makes available to programs it loads.
/// Linking happens once per [`crate::vm::Vm::load`] call, not per call
/// site: each function-table entry's prototype hash is matched against
/// every registered prototype's hash exactly once while the program is
/// being loaded, and the resolved callback is cached in the loaded
/// function table from then on.
#[derive(Default)]
pub struct HostRegistry {
    functions: Vec<HostFunction>,
}

impl HostRegistry {
    pub fn new() -> Self {
        HostRegistry::default()
    }

    pub fn register(&mut self, prototype: &'static str, callback: HostCallback) {
        self.functions.push(HostFunction { prototype, callback });
    }

    pub(crate) fn resolve(&self, prototype_hash: u32) -> Result<HostCallback, VmError> {
        let mut found: Option<HostCallback> = None;
        for function in &self.functions {
            if tinyc_codegen::djb2(function.prototype) != prototype_hash {
                continue;
            }
            if found.is_some() {
                return Err(VmError::DuplicateHostPrototype { prototype: function.prototype.to_string() });
            }
            found = Some(function.callback);
        }
        found.ok_or(VmError::UnresolvedHostFunction { prototype_hash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy(_argv: &[DataCell], _host_data: &mut dyn Any) -> DataCell {
        DataCell::from_s32(0)
    }

    #[test]
    fn resolves_by_prototype_hash() {
        let mut registry = HostRegistry::new();
        registry.register("void exit()", dummy);
        let hash = tinyc_codegen::djb2("void exit()");
        assert!(registry.resolve(hash).is_ok());
    }

    #[test]
    fn unknown_hash_is_unresolved() {
        let registry = HostRegistry::new();
        assert!(matches!(registry.resolve(123), Err(VmError::UnresolvedHostFunction { .. })));
    }

    #[test]
    fn colliding_prototypes_are_rejected_even_if_distinct_strings() {
        let mut registry = HostRegistry::new();
        registry.register("void exit()", dummy);
        registry.register("void exit()", dummy);
        let hash = tinyc_codegen::djb2("void exit()");
        assert!(matches!(registry.resolve(hash), Err(VmError::DuplicateHostPrototype { .. })));
    }
}
