//! Local common subexpression elimination.
//!
//! A single forward scan over one block. Every reusable instruction is keyed by
//! its opcode and its first [`MAX_KEY_OPERANDS`] operands; a later instruction
//! with an equal key has all of its uses redirected to the first one. Loads stay
//! in the table only until an instruction that may write memory comes along,
//! unless that instruction is a store the alias oracle proves disjoint.
//!
//! Duplicates are left in place for a later dead code pass.

use std::collections::{hash_map::Entry, HashMap};

use crate::{
    alias::{AliasOracle, AliasResult},
    ir::{
        block::{BlockInstruction, Opcode},
        BlockRef, Function, InstRef, ValueRef,
    },
};

use super::FunctionPass;

/// Operands past this index do not take part in the expression key. Two
/// instructions agreeing on opcode and the first five operands are treated as
/// equal even if they differ afterwards (e.g. wide phis or long geps).
pub const MAX_KEY_OPERANDS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpressionKey {
    pub opcode: Opcode,
    pub operands: [Option<ValueRef>; MAX_KEY_OPERANDS],
}
impl ExpressionKey {
    /// `None` for instructions that never take part in CSE.
    pub fn build(inst: &BlockInstruction) -> Option<Self> {
        if !inst.is_reusable() {
            return None;
        }

        let mut operands = [None; MAX_KEY_OPERANDS];
        for (slot, x) in operands.iter_mut().zip(inst.operands()) {
            *slot = Some(x);
        }

        Some(Self {
            opcode: inst.opcode(),
            operands,
        })
    }
}

/// Live expressions of the block being scanned, each mapped to its
/// representative (the first instruction that produced the key and has not
/// been invalidated since).
#[derive(Debug, Clone, Default)]
pub struct ExpressionTable {
    entries: HashMap<ExpressionKey, InstRef>,
}
impl ExpressionTable {
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the representative's value if `key` is live, leaving the table
    /// untouched. Otherwise `inst` becomes the representative.
    pub fn lookup_or_insert(&mut self, key: ExpressionKey, inst: InstRef) -> Option<ValueRef> {
        match self.entries.entry(key) {
            Entry::Occupied(e) => Some(ValueRef::Inst(*e.get())),
            Entry::Vacant(e) => {
                e.insert(inst);
                None
            }
        }
    }

    /// Makes `inst` the representative of `key`, returning the one it replaced.
    #[inline]
    pub fn insert(&mut self, key: ExpressionKey, inst: InstRef) -> Option<InstRef> {
        self.entries.insert(key, inst)
    }

    #[inline]
    pub fn remove(&mut self, key: &ExpressionKey) -> Option<InstRef> {
        self.entries.remove(key)
    }

    /// Drops the entry `inst` represents, if any.
    #[inline]
    pub fn remove_representative(&mut self, inst: InstRef) {
        self.entries.retain(|_, r| *r != inst);
    }

    /// Drops every entry for which `keep` returns false. Each decision is made
    /// independently, so iteration order does not affect the outcome.
    #[inline]
    pub fn retain(&mut self, mut keep: impl FnMut(&ExpressionKey, InstRef) -> bool) {
        self.entries.retain(|k, r| keep(k, *r));
    }

    #[inline(always)]
    pub fn get(&self, key: &ExpressionKey) -> Option<InstRef> {
        self.entries.get(key).copied()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Removes the memory-reading representatives `writer` may clobber and
/// returns how many were removed.
///
/// Only a store can be proven harmless, and only against a load whose
/// location the oracle reports as [`AliasResult::NoAlias`]. Any other writer
/// (calls, fences, volatile accesses) flushes every memory reader.
pub fn invalidate_memory_readers(
    table: &mut ExpressionTable,
    function: &Function,
    writer: &BlockInstruction,
    oracle: &dyn AliasOracle,
) -> usize {
    let store_location = if writer.is_store() {
        writer.memory_location()
    } else {
        None
    };

    let before = table.len();
    table.retain(|_, r| {
        let rep = function.instruction(r);
        if !rep.may_read_memory() {
            return true;
        }

        match (store_location, rep.is_load(), rep.memory_location()) {
            (Some(s), true, Some(l)) => oracle.alias(&l, &s) == AliasResult::NoAlias,
            _ => false,
        }
    });

    before - table.len()
}

/// Runs CSE over one block. Uses of redirected instructions are rewritten
/// throughout `function`. Returns whether any operand was rewritten.
pub fn eliminate_block(
    function: &mut Function,
    block: BlockRef,
    oracle: &dyn AliasOracle,
) -> bool {
    let mut table = ExpressionTable::new();
    let mut modified = false;

    // operands change while scanning, the instruction sequence does not
    let order = function.block(block).instructions.clone();
    let mut scanned = HashMap::with_capacity(order.len());
    for (pos, &r) in order.iter().enumerate() {
        let inst = function.instruction(r);

        if inst.may_write_memory() {
            let removed = invalidate_memory_readers(&mut table, function, inst, oracle);
            if removed > 0 {
                log::debug!(
                    "[cse] {} invalidated {removed} memory read(s) in {}",
                    ValueRef::Inst(r).display(function),
                    function.block(block).label
                );
            }
        }

        scanned.insert(r, pos);
        let Some(key) = ExpressionKey::build(inst) else {
            continue;
        };

        match table.lookup_or_insert(key, r) {
            Some(prev) => {
                let m = redirect(function, &mut table, &scanned, r, prev);
                modified = modified || m;
            }
            None => {
                log::trace!("[cse] new expression {}", ValueRef::Inst(r).display(function));
            }
        }
    }

    modified
}

/// Redirects the uses of `from` to `to`.
///
/// Instructions the scan has already passed can be among the rewritten users
/// (phis reached over a back edge). Their table entries are keyed again under
/// the new operands, and a clash with another live entry is resolved towards
/// the instruction earlier in the block, the same way a fresh scan would.
fn redirect(
    function: &mut Function,
    table: &mut ExpressionTable,
    scanned: &HashMap<InstRef, usize>,
    from: InstRef,
    to: ValueRef,
) -> bool {
    let mut modified = false;

    // every redirection points uses at an earlier instruction, so this ends
    let mut pending = vec![(from, to)];
    while let Some((from, to)) = pending.pop() {
        let rewritten = function.replace_all_uses(from, to);
        log::debug!(
            "[cse] {} = {} ({} user(s) rewritten)",
            ValueRef::Inst(from).display(function),
            to.display(function),
            rewritten.len()
        );
        modified = modified || !rewritten.is_empty();

        for w in rewritten {
            let Some(&pos) = scanned.get(&w) else {
                continue;
            };
            table.remove_representative(w);

            // a scanned load cannot be revalidated against the writes since
            let inst = function.instruction(w);
            if inst.may_read_memory() {
                continue;
            }
            let Some(key) = ExpressionKey::build(inst) else {
                continue;
            };

            match table.get(&key) {
                None => {
                    table.insert(key, w);
                }
                Some(e) if scanned.get(&e).is_some_and(|&p| p > pos) => {
                    table.insert(key, w);
                    pending.push((e, ValueRef::Inst(w)));
                }
                Some(e) => pending.push((w, ValueRef::Inst(e))),
            }
        }
    }

    modified
}

/// Runs [`eliminate_block`] on every block. Blocks do not share state.
pub fn eliminate_function(function: &mut Function, oracle: &dyn AliasOracle) -> bool {
    (0..function.blocks.len()).fold(false, |modified, n| {
        let m = eliminate_block(function, BlockRef(n), oracle);
        m || modified
    })
}

pub struct LocalCse<'o> {
    oracle: &'o dyn AliasOracle,
}
impl<'o> LocalCse<'o> {
    pub fn new(oracle: &'o dyn AliasOracle) -> Self {
        Self { oracle }
    }
}
impl FunctionPass for LocalCse<'_> {
    fn name(&self) -> &'static str {
        "local-cse"
    }

    fn run(&mut self, function: &mut Function) -> bool {
        eliminate_function(function, self.oracle)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::{
        alias::ConservativeAliasOracle,
        ir::{
            block::{BinaryOp, CastOp, ComparePredicate, MemoryEffects, MemoryLocation},
            Type,
        },
    };

    fn oracle_answering(r: AliasResult) -> impl Fn(&MemoryLocation, &MemoryLocation) -> AliasResult {
        move |_: &MemoryLocation, _: &MemoryLocation| r
    }

    fn add(l: ValueRef, r: ValueRef) -> BlockInstruction {
        BlockInstruction::Binary(BinaryOp::Add, l, r)
    }

    fn load(ptr: ValueRef) -> BlockInstruction {
        BlockInstruction::Load {
            ty: Type::Int(32),
            ptr,
            volatile: false,
        }
    }

    fn store(value: ValueRef, ptr: ValueRef) -> BlockInstruction {
        BlockInstruction::Store {
            ty: Type::Int(32),
            value,
            ptr,
            volatile: false,
        }
    }

    fn ret(v: impl Into<ValueRef>) -> BlockInstruction {
        BlockInstruction::Return(Some(v.into()))
    }

    /// `f(x, y, p, q)` with one empty entry block.
    fn function() -> (Function<'static>, BlockRef) {
        let mut f = Function::new("f", vec!["x", "y", "p", "q"]);
        let b = f.push_block("entry");
        (f, b)
    }

    #[test]
    fn duplicate_add_is_redirected() {
        let (mut f, b) = function();
        let (x, y) = (f.argument(0), f.argument(1));
        let a = f.push_instruction(b, add(x, y));
        let d = f.push_instruction(b, add(x, y));
        let m = f.push_instruction(
            b,
            BlockInstruction::Binary(BinaryOp::Mul, d.into(), d.into()),
        );

        assert!(eliminate_block(&mut f, b, &ConservativeAliasOracle));
        assert_eq!(
            f.instruction(m),
            &BlockInstruction::Binary(BinaryOp::Mul, a.into(), a.into())
        );
        assert_eq!(f.use_count(d), 0);
        // the duplicate stays in the block
        assert_eq!(f.block(b).instructions.len(), 3);
    }

    #[test]
    fn second_run_reports_no_change() {
        let (mut f, b) = function();
        let (x, y) = (f.argument(0), f.argument(1));
        f.push_instruction(b, add(x, y));
        let d = f.push_instruction(b, add(x, y));
        f.push_instruction(b, ret(d));

        assert!(eliminate_block(&mut f, b, &ConservativeAliasOracle));
        let after_first = f.instructions.clone();
        assert!(!eliminate_block(&mut f, b, &ConservativeAliasOracle));
        assert_eq!(f.instructions, after_first);
    }

    #[test]
    fn load_survives_store_proven_disjoint() {
        let (mut f, b) = function();
        let (x, p, q) = (f.argument(0), f.argument(2), f.argument(3));
        let l1 = f.push_instruction(b, load(p));
        f.push_instruction(b, store(x, q));
        let l2 = f.push_instruction(b, load(p));
        let r = f.push_instruction(b, ret(l2));

        assert!(eliminate_block(
            &mut f,
            b,
            &oracle_answering(AliasResult::NoAlias)
        ));
        assert_eq!(f.instruction(r), &ret(l1));
    }

    #[test]
    fn load_is_invalidated_by_possibly_aliasing_store() {
        for answer in [AliasResult::MayAlias, AliasResult::MustAlias] {
            let (mut f, b) = function();
            let (x, p, q) = (f.argument(0), f.argument(2), f.argument(3));
            f.push_instruction(b, load(p));
            f.push_instruction(b, store(x, q));
            let l2 = f.push_instruction(b, load(p));
            let r = f.push_instruction(b, ret(l2));

            assert!(!eliminate_block(&mut f, b, &oracle_answering(answer)));
            assert_eq!(f.instruction(r), &ret(l2));
        }
    }

    #[test]
    fn calls_are_never_merged_and_flush_loads() {
        let (mut f, b) = function();
        let p = f.argument(2);
        let callee = f.global("ext");
        let call = BlockInstruction::Call {
            callee,
            args: vec![p],
            effects: MemoryEffects::all(),
        };
        f.push_instruction(b, load(p));
        let c1 = f.push_instruction(b, call.clone());
        let c2 = f.push_instruction(b, call);
        let l2 = f.push_instruction(b, load(p));
        f.push_instruction(b, ret(c1));
        f.push_instruction(b, ret(c2));
        let r = f.push_instruction(b, ret(l2));

        // even an oracle that claims nothing ever aliases cannot save the load
        assert!(!eliminate_block(
            &mut f,
            b,
            &oracle_answering(AliasResult::NoAlias)
        ));
        assert_eq!(f.instruction(r), &ret(l2));
        assert_eq!(f.use_count(c1), 1);
        assert_eq!(f.use_count(c2), 1);
    }

    #[test]
    fn pure_expressions_survive_writes() {
        let (mut f, b) = function();
        let (x, y, q) = (f.argument(0), f.argument(1), f.argument(3));
        let a = f.push_instruction(b, add(x, y));
        f.push_instruction(b, store(x, q));
        f.push_instruction(b, BlockInstruction::Fence);
        let d = f.push_instruction(b, add(x, y));
        let r = f.push_instruction(b, ret(d));

        assert!(eliminate_block(&mut f, b, &ConservativeAliasOracle));
        assert_eq!(f.instruction(r), &ret(a));
    }

    #[test]
    fn oracle_is_not_consulted_for_non_store_writers() {
        let queries = Cell::new(0);
        let counting = |_: &MemoryLocation, _: &MemoryLocation| {
            queries.set(queries.get() + 1);
            AliasResult::NoAlias
        };

        let (mut f, b) = function();
        let p = f.argument(2);
        f.push_instruction(b, load(p));
        f.push_instruction(b, BlockInstruction::Fence);
        f.push_instruction(
            b,
            BlockInstruction::Load {
                ty: Type::Int(32),
                ptr: p,
                volatile: true,
            },
        );

        eliminate_block(&mut f, b, &counting);
        assert_eq!(queries.get(), 0);
    }

    #[test]
    fn invalidation_reports_removed_entries() {
        let (mut f, b) = function();
        let (x, y, p, q) = (f.argument(0), f.argument(1), f.argument(2), f.argument(3));
        let l = f.push_instruction(b, load(p));
        let a = f.push_instruction(b, add(x, y));
        let s = f.push_instruction(b, store(x, q));

        let mut table = ExpressionTable::new();
        for r in [l, a] {
            let key = ExpressionKey::build(f.instruction(r)).unwrap();
            assert_eq!(table.lookup_or_insert(key, r), None);
        }

        let writer = f.instruction(s).clone();
        let removed = invalidate_memory_readers(
            &mut table,
            &f,
            &writer,
            &oracle_answering(AliasResult::MayAlias),
        );
        assert_eq!(removed, 1);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&ExpressionKey::build(f.instruction(a)).unwrap()), Some(a));
    }

    #[test]
    fn store_queries_use_both_locations() {
        let seen = Cell::new(None);
        let recording = |a: &MemoryLocation, b: &MemoryLocation| {
            seen.set(Some((*a, *b)));
            AliasResult::MayAlias
        };

        let (mut f, b) = function();
        let (x, p, q) = (f.argument(0), f.argument(2), f.argument(3));
        f.push_instruction(b, load(p));
        f.push_instruction(
            b,
            BlockInstruction::Store {
                ty: Type::Int(64),
                value: x,
                ptr: q,
                volatile: false,
            },
        );

        eliminate_block(&mut f, b, &recording);
        assert_eq!(
            seen.get(),
            Some((
                MemoryLocation { ptr: p, size: 4 },
                MemoryLocation { ptr: q, size: 8 }
            ))
        );
    }

    #[test]
    fn table_keeps_first_representative() {
        let (f, _) = function();
        let key = ExpressionKey::build(&add(f.argument(0), f.argument(1))).unwrap();
        let mut table = ExpressionTable::new();

        assert_eq!(table.lookup_or_insert(key.clone(), InstRef(3)), None);
        assert_eq!(
            table.lookup_or_insert(key.clone(), InstRef(7)),
            Some(ValueRef::Inst(InstRef(3)))
        );
        assert_eq!(table.remove(&key), Some(InstRef(3)));
        assert!(table.is_empty());
        assert_eq!(table.lookup_or_insert(key, InstRef(7)), None);
    }

    #[test]
    fn redirection_exposes_dependent_duplicates() {
        let (mut f, b) = function();
        let (x, y) = (f.argument(0), f.argument(1));
        let a = f.push_instruction(b, add(x, y));
        let shl = |v: InstRef| BlockInstruction::Binary(BinaryOp::Shl, v.into(), ValueRef::Const(1));
        let s1 = f.push_instruction(b, shl(a));
        let d = f.push_instruction(b, add(x, y));
        let s2 = f.push_instruction(b, shl(d));
        let r = f.push_instruction(b, ret(s2));

        assert!(eliminate_block(&mut f, b, &ConservativeAliasOracle));
        assert_eq!(f.instruction(r), &ret(s1));
    }

    #[test]
    fn volatile_loads_never_merge() {
        let (mut f, b) = function();
        let p = f.argument(2);
        let v = BlockInstruction::Load {
            ty: Type::Int(32),
            ptr: p,
            volatile: true,
        };
        f.push_instruction(b, v.clone());
        let l2 = f.push_instruction(b, v);
        let r = f.push_instruction(b, ret(l2));

        assert!(!eliminate_block(
            &mut f,
            b,
            &oracle_answering(AliasResult::NoAlias)
        ));
        assert_eq!(f.instruction(r), &ret(l2));
    }

    #[test]
    fn loads_of_different_width_are_distinct() {
        let (mut f, b) = function();
        let p = f.argument(2);
        f.push_instruction(b, load(p));
        let wide = f.push_instruction(
            b,
            BlockInstruction::Load {
                ty: Type::Int(64),
                ptr: p,
                volatile: false,
            },
        );
        f.push_instruction(b, ret(wide));

        assert!(!eliminate_block(&mut f, b, &ConservativeAliasOracle));
    }

    #[test]
    fn non_operand_attributes_distinguish_keys() {
        let (f, _) = function();
        let (x, y) = (f.argument(0), f.argument(1));

        let lt = ExpressionKey::build(&BlockInstruction::Compare(ComparePredicate::IntSlt, x, y));
        let gt = ExpressionKey::build(&BlockInstruction::Compare(ComparePredicate::IntSgt, x, y));
        assert_ne!(lt, gt);

        let z32 = ExpressionKey::build(&BlockInstruction::Cast(CastOp::ZExt, x, Type::Int(32)));
        let z64 = ExpressionKey::build(&BlockInstruction::Cast(CastOp::ZExt, x, Type::Int(64)));
        assert_ne!(z32, z64);

        let e0 = ExpressionKey::build(&BlockInstruction::ExtractValue {
            aggregate: x,
            path: vec![0],
        });
        let e1 = ExpressionKey::build(&BlockInstruction::ExtractValue {
            aggregate: x,
            path: vec![1],
        });
        assert_ne!(e0, e1);
    }

    #[test]
    fn operand_order_matters() {
        let (f, _) = function();
        let (x, y) = (f.argument(0), f.argument(1));

        assert_ne!(ExpressionKey::build(&add(x, y)), ExpressionKey::build(&add(y, x)));
    }

    #[test]
    fn operands_past_the_cap_are_ignored() {
        let (mut f, b) = function();
        let p = f.argument(2);
        let gep = |last: i64| BlockInstruction::GetElementPtr {
            element: Type::Int(8),
            base: p,
            indices: (1..=4).map(ValueRef::Const).chain([ValueRef::Const(last)]).collect(),
        };
        let g1 = f.push_instruction(b, gep(100));
        let g2 = f.push_instruction(b, gep(200));
        let r = f.push_instruction(b, ret(g2));

        assert_eq!(f.instruction(g1).operands().len(), MAX_KEY_OPERANDS + 1);
        assert!(eliminate_block(&mut f, b, &ConservativeAliasOracle));
        assert_eq!(f.instruction(r), &ret(g1));
    }

    #[test]
    fn ineligible_instructions_build_no_key() {
        let (f, _) = function();
        let p = f.argument(2);

        assert_eq!(ExpressionKey::build(&BlockInstruction::Alloca(Type::Int(32))), None);
        assert_eq!(ExpressionKey::build(&store(p, p)), None);
        assert_eq!(ExpressionKey::build(&BlockInstruction::Fence), None);
        assert_eq!(ExpressionKey::build(&ret(p)), None);
    }

    #[test]
    fn blocks_do_not_share_expressions() {
        let (mut f, b0) = function();
        let b1 = f.push_block("next");
        let (x, y) = (f.argument(0), f.argument(1));
        f.push_instruction(b0, add(x, y));
        f.push_instruction(b0, BlockInstruction::Branch(b1));
        let d = f.push_instruction(b1, add(x, y));
        f.push_instruction(b1, ret(d));

        assert!(!eliminate_function(&mut f, &ConservativeAliasOracle));
        assert!(!LocalCse::new(&ConservativeAliasOracle).run(&mut f));
    }

    #[test]
    fn uses_in_other_blocks_are_rewritten() {
        let (mut f, b0) = function();
        let b1 = f.push_block("next");
        let (x, y) = (f.argument(0), f.argument(1));
        let a = f.push_instruction(b0, add(x, y));
        let d = f.push_instruction(b0, add(x, y));
        f.push_instruction(b0, BlockInstruction::Branch(b1));
        let r = f.push_instruction(b1, ret(d));

        assert!(eliminate_function(&mut f, &ConservativeAliasOracle));
        assert_eq!(f.instruction(r), &ret(a));
    }

    #[test]
    fn phis_over_a_back_edge_are_keyed_again() {
        let (mut f, entry) = function();
        let body = f.push_block("loop");
        let (x, y) = (f.argument(0), f.argument(1));
        f.push_instruction(entry, BlockInstruction::Branch(body));
        // both phis refer forward to the adds below
        let p1 = f.push_instruction(
            body,
            BlockInstruction::Phi(vec![
                (entry, ValueRef::Const(0)),
                (body, ValueRef::Inst(InstRef(4))),
            ]),
        );
        let p2 = f.push_instruction(
            body,
            BlockInstruction::Phi(vec![
                (entry, ValueRef::Const(0)),
                (body, ValueRef::Inst(InstRef(3))),
            ]),
        );
        let a = f.push_instruction(body, add(x, y));
        let d = f.push_instruction(body, add(x, y));
        assert_eq!(d, InstRef(4));
        let s = f.push_instruction(body, add(p1.into(), p2.into()));
        f.push_instruction(
            body,
            BlockInstruction::CondBranch {
                condition: x,
                r#true: body,
                r#false: entry,
            },
        );

        assert!(eliminate_block(&mut f, body, &ConservativeAliasOracle));
        assert_eq!(f.instruction(p1), f.instruction(p2));
        assert_eq!(f.instruction(s), &add(p1.into(), p1.into()));
        assert_eq!(f.use_count(p2), 0);
        assert_eq!(f.use_count(a), 2);

        assert!(!eliminate_block(&mut f, body, &ConservativeAliasOracle));
    }

    #[test]
    fn repeated_runs_on_copies_agree() {
        let (mut f, b) = function();
        let (x, y, p, q) = (f.argument(0), f.argument(1), f.argument(2), f.argument(3));
        let mut last = Vec::new();
        for ptr in [p, q, p, q] {
            let l = f.push_instruction(b, load(ptr));
            let a = f.push_instruction(b, add(l.into(), x));
            last.push(a);
        }
        f.push_instruction(b, store(y, p));
        for ptr in [p, q, q] {
            f.push_instruction(b, load(ptr));
        }
        f.push_instruction(
            b,
            BlockInstruction::Call {
                callee: ValueRef::Const(0),
                args: vec![x],
                effects: MemoryEffects::WRITE,
            },
        );
        f.push_instruction(b, store(x, q));
        for ptr in [q, p, p] {
            f.push_instruction(b, load(ptr));
        }
        f.push_instruction(b, add(last[0].into(), last[3].into()));

        let by_pointer = |a: &MemoryLocation, b: &MemoryLocation| {
            if a.ptr == b.ptr {
                AliasResult::MustAlias
            } else {
                AliasResult::NoAlias
            }
        };

        // every run starts from a fresh table with its own hash seed
        let mut reference = f.clone();
        let changed = eliminate_block(&mut reference, b, &by_pointer);
        assert!(changed);
        for _ in 0..8 {
            let mut copy = f.clone();
            assert_eq!(eliminate_block(&mut copy, b, &by_pointer), changed);
            assert_eq!(copy.instructions, reference.instructions);
        }
    }
}
