//! Alias queries between memory locations.
//!
//! The CSE pass only needs an [`AliasOracle`]; the two oracles here are the
//! ones the command line driver can pick from. Any oracle must be sound: it may
//! answer [`AliasResult::NoAlias`] only for locations that can never overlap.

use std::collections::{HashMap, HashSet};

use crate::ir::{
    block::{BlockInstruction, MemoryLocation},
    Function, InstRef, ValueRef,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AliasResult {
    NoAlias,
    MayAlias,
    MustAlias,
}

pub trait AliasOracle {
    fn alias(&self, a: &MemoryLocation, b: &MemoryLocation) -> AliasResult;
}
impl<F> AliasOracle for F
where
    F: Fn(&MemoryLocation, &MemoryLocation) -> AliasResult,
{
    #[inline(always)]
    fn alias(&self, a: &MemoryLocation, b: &MemoryLocation) -> AliasResult {
        self(a, b)
    }
}

/// Knows nothing beyond "the same pointer and width is the same memory".
#[derive(Debug, Clone, Copy, Default)]
pub struct ConservativeAliasOracle;
impl AliasOracle for ConservativeAliasOracle {
    fn alias(&self, a: &MemoryLocation, b: &MemoryLocation) -> AliasResult {
        if a == b {
            AliasResult::MustAlias
        } else {
            AliasResult::MayAlias
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PointerOrigin {
    base: ValueRef,
    offset: Option<i64>,
}

/// Stateless local alias analysis over a snapshot of one function.
///
/// Pointers are decomposed through chains of `gep` into an underlying base and
/// a byte offset (known only when every index is a constant). Allocas and
/// globals are identified objects: two distinct identified objects never
/// overlap. The snapshot stays valid while uses are redirected between
/// structurally identical instructions, since those decompose identically.
#[derive(Debug, Clone, Default)]
pub struct BasicAliasOracle {
    geps: HashMap<InstRef, PointerOrigin>,
    allocas: HashSet<InstRef>,
}
impl BasicAliasOracle {
    pub fn analyze(function: &Function) -> Self {
        let mut geps = HashMap::new();
        let mut allocas = HashSet::new();

        for (n, x) in function.instructions.iter().enumerate() {
            match x {
                BlockInstruction::Alloca(_) => {
                    allocas.insert(InstRef(n));
                }
                BlockInstruction::GetElementPtr {
                    element,
                    base,
                    indices,
                } => {
                    let stride = element.byte_size() as i64;
                    let offset = indices.iter().try_fold(0i64, |acc, x| match x {
                        &ValueRef::Const(c) => acc.checked_add(c.checked_mul(stride)?),
                        _ => None,
                    });
                    geps.insert(
                        InstRef(n),
                        PointerOrigin {
                            base: *base,
                            offset,
                        },
                    );
                }
                _ => (),
            }
        }

        Self { geps, allocas }
    }

    fn decompose(&self, ptr: ValueRef) -> PointerOrigin {
        let mut origin = PointerOrigin {
            base: ptr,
            offset: Some(0),
        };

        // malformed input may contain gep cycles; a chain never revisits a gep
        for _ in 0..=self.geps.len() {
            let Some(r) = origin.base.as_inst() else {
                return origin;
            };
            let Some(step) = self.geps.get(&r) else {
                return origin;
            };

            origin = PointerOrigin {
                base: step.base,
                offset: match (origin.offset, step.offset) {
                    (Some(a), Some(b)) => a.checked_add(b),
                    _ => None,
                },
            };
        }

        PointerOrigin { base: ptr, offset: None }
    }

    fn is_identified_object(&self, v: ValueRef) -> bool {
        match v {
            ValueRef::Global(_) => true,
            ValueRef::Inst(r) => self.allocas.contains(&r),
            ValueRef::Argument(_) | ValueRef::Const(_) => false,
        }
    }
}
impl AliasOracle for BasicAliasOracle {
    fn alias(&self, a: &MemoryLocation, b: &MemoryLocation) -> AliasResult {
        if a == b {
            return AliasResult::MustAlias;
        }

        let (oa, ob) = (self.decompose(a.ptr), self.decompose(b.ptr));
        if oa.base != ob.base {
            if self.is_identified_object(oa.base) && self.is_identified_object(ob.base) {
                return AliasResult::NoAlias;
            }

            return AliasResult::MayAlias;
        }

        match (oa.offset, ob.offset) {
            (Some(x), Some(y)) => {
                let (x, y) = (x as i128, y as i128);
                let (xe, ye) = (x + a.size as i128, y + b.size as i128);
                if x == y && a.size == b.size {
                    AliasResult::MustAlias
                } else if xe <= y || ye <= x {
                    AliasResult::NoAlias
                } else {
                    AliasResult::MayAlias
                }
            }
            _ => AliasResult::MayAlias,
        }
    }
}
