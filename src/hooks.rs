//! Hook registry
//!
//! The host identifies hooks by opaque numeric addresses. Each address is bound
//! to exactly one [`HookKind`], and the tracer dispatches on the kind with a
//! single exhaustive match.

use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

/// What a hook address means to the tracer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HookKind {
    /// Section entry on the open path; register 0 holds the section index
    SectionOpen,
    /// Section entry on the post path; register 0 holds the section index
    SectionPost,
    /// Division routine; register 0 is the dividend, register 1 the divisor
    DivisionOp {
        #[serde(default)]
        signed: bool,
    },
    PeriodicStart,
    PeriodicEnd,
    SessionReset,
    SessionFinalize,
    /// Generated entity; register 0 is its id, register 1 an opaque payload
    EntityGenerated,
    /// Selection confirmed; register 0 is the selected identifier
    SelectionMade,
}

/// General-purpose register values captured when a hook fires
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSnapshot {
    pub r0: u32,
    pub r1: u32,
}

impl RegisterSnapshot {
    pub fn new(r0: u32, r1: u32) -> Self {
        Self { r0, r1 }
    }
}

impl From<[u32; 2]> for RegisterSnapshot {
    fn from(regs: [u32; 2]) -> Self {
        Self::new(regs[0], regs[1])
    }
}

/// One address-to-kind binding as written in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookBinding {
    pub address: u32,
    #[serde(flatten)]
    pub kind: HookKind,
}

impl HookBinding {
    pub fn new(address: u32, kind: HookKind) -> Self {
        Self { address, kind }
    }
}

/// Address-keyed lookup of hook kinds
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    kinds: FnvHashMap<u32, HookKind>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry, failing on the first address bound twice
    pub fn from_bindings(bindings: &[HookBinding]) -> Result<Self, u32> {
        let mut registry = Self::new();
        for binding in bindings {
            if registry.register(binding.address, binding.kind).is_some() {
                return Err(binding.address);
            }
        }
        Ok(registry)
    }

    /// Bind an address, returning the kind it was previously bound to
    pub fn register(&mut self, address: u32, kind: HookKind) -> Option<HookKind> {
        self.kinds.insert(address, kind)
    }

    pub fn resolve(&self, address: u32) -> Option<HookKind> {
        self.kinds.get(&address).copied()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let mut registry = HookRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.register(0x0800_1000, HookKind::SectionOpen), None);
        assert_eq!(
            registry.resolve(0x0800_1000),
            Some(HookKind::SectionOpen)
        );
        assert_eq!(registry.resolve(0x0800_1004), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_from_bindings_rejects_duplicates() {
        let bindings = [
            HookBinding::new(1, HookKind::SessionReset),
            HookBinding::new(2, HookKind::SessionFinalize),
            HookBinding::new(1, HookKind::PeriodicStart),
        ];
        assert_eq!(HookRegistry::from_bindings(&bindings).unwrap_err(), 1);
    }

    #[test]
    fn test_binding_json_shape() {
        let binding = HookBinding::new(16, HookKind::DivisionOp { signed: true });
        let json = serde_json::to_string(&binding).unwrap();
        assert_eq!(json, r#"{"address":16,"kind":"division_op","signed":true}"#);

        let parsed: HookBinding =
            serde_json::from_str(r#"{"address":16,"kind":"division_op"}"#).unwrap();
        assert_eq!(parsed.kind, HookKind::DivisionOp { signed: false });
    }

    #[test]
    fn test_register_snapshot_from_array() {
        let regs: RegisterSnapshot = [7, 9].into();
        assert_eq!(regs, RegisterSnapshot::new(7, 9));
    }
}
