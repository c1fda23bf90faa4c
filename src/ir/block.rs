use crate::utils::CommaSeparated;

use super::{BlockRef, Function, InstRef, Type, ValueRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    Shl,
    LShr,
    AShr,
    And,
    Or,
    Xor,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
}
impl BinaryOp {
    pub const ALL: &'static [(Self, &'static str)] = &[
        (Self::Add, "add"),
        (Self::Sub, "sub"),
        (Self::Mul, "mul"),
        (Self::UDiv, "udiv"),
        (Self::SDiv, "sdiv"),
        (Self::URem, "urem"),
        (Self::SRem, "srem"),
        (Self::Shl, "shl"),
        (Self::LShr, "lshr"),
        (Self::AShr, "ashr"),
        (Self::And, "and"),
        (Self::Or, "or"),
        (Self::Xor, "xor"),
        (Self::FAdd, "fadd"),
        (Self::FSub, "fsub"),
        (Self::FMul, "fmul"),
        (Self::FDiv, "fdiv"),
        (Self::FRem, "frem"),
    ];

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Self::ALL.iter().find(|(_, m)| *m == s).map(|&(op, _)| op)
    }

    pub fn mnemonic(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|&&(op, _)| op == self)
            .map_or("?", |&(_, m)| m)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparePredicate {
    IntEq,
    IntNe,
    IntUgt,
    IntUge,
    IntUlt,
    IntUle,
    IntSgt,
    IntSge,
    IntSlt,
    IntSle,
    FloatOeq,
    FloatOne,
    FloatOgt,
    FloatOge,
    FloatOlt,
    FloatOle,
    FloatOrd,
    FloatUno,
}
impl ComparePredicate {
    pub const INT: &'static [(Self, &'static str)] = &[
        (Self::IntEq, "eq"),
        (Self::IntNe, "ne"),
        (Self::IntUgt, "ugt"),
        (Self::IntUge, "uge"),
        (Self::IntUlt, "ult"),
        (Self::IntUle, "ule"),
        (Self::IntSgt, "sgt"),
        (Self::IntSge, "sge"),
        (Self::IntSlt, "slt"),
        (Self::IntSle, "sle"),
    ];
    pub const FLOAT: &'static [(Self, &'static str)] = &[
        (Self::FloatOeq, "oeq"),
        (Self::FloatOne, "one"),
        (Self::FloatOgt, "ogt"),
        (Self::FloatOge, "oge"),
        (Self::FloatOlt, "olt"),
        (Self::FloatOle, "ole"),
        (Self::FloatOrd, "ord"),
        (Self::FloatUno, "uno"),
    ];

    #[inline(always)]
    pub const fn is_float(self) -> bool {
        matches!(
            self,
            Self::FloatOeq
                | Self::FloatOne
                | Self::FloatOgt
                | Self::FloatOge
                | Self::FloatOlt
                | Self::FloatOle
                | Self::FloatOrd
                | Self::FloatUno
        )
    }

    pub fn mnemonic(self) -> &'static str {
        Self::INT
            .iter()
            .chain(Self::FLOAT.iter())
            .find(|&&(p, _)| p == self)
            .map_or("?", |&(_, m)| m)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    FpTrunc,
    FpExt,
    FpToUi,
    FpToSi,
    UiToFp,
    SiToFp,
    PtrToInt,
    IntToPtr,
    Bitcast,
}
impl CastOp {
    pub const ALL: &'static [(Self, &'static str)] = &[
        (Self::Trunc, "trunc"),
        (Self::ZExt, "zext"),
        (Self::SExt, "sext"),
        (Self::FpTrunc, "fptrunc"),
        (Self::FpExt, "fpext"),
        (Self::FpToUi, "fptoui"),
        (Self::FpToSi, "fptosi"),
        (Self::UiToFp, "uitofp"),
        (Self::SiToFp, "sitofp"),
        (Self::PtrToInt, "ptrtoint"),
        (Self::IntToPtr, "inttoptr"),
        (Self::Bitcast, "bitcast"),
    ];

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Self::ALL.iter().find(|(_, m)| *m == s).map(|&(op, _)| op)
    }

    pub fn mnemonic(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|&&(op, _)| op == self)
            .map_or("?", |&(_, m)| m)
    }
}

bitflags::bitflags! {
    #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
    pub struct MemoryEffects : u8 {
        const NONE = 0x00;
        const READ = 0x01;
        const WRITE = 0x02;
    }
}

/// The bytes a load or store touches, starting at `ptr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryLocation {
    pub ptr: ValueRef,
    pub size: u64,
}

/// Instruction kind plus every non-operand attribute that participates in the
/// computed value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Opcode {
    Binary(BinaryOp),
    Compare(ComparePredicate),
    ExtractElement,
    InsertElement,
    ShuffleVector,
    GetElementPtr(Type),
    ExtractValue(Vec<u32>),
    InsertValue(Vec<u32>),
    Phi(Vec<BlockRef>),
    Select,
    Cast(CastOp, Type),
    Load(Type),
    Store(Type),
    Alloca(Type),
    Call,
    Fence,
    Branch,
    CondBranch,
    Return,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockInstruction {
    Binary(BinaryOp, ValueRef, ValueRef),
    Compare(ComparePredicate, ValueRef, ValueRef),
    ExtractElement {
        vector: ValueRef,
        index: ValueRef,
    },
    InsertElement {
        vector: ValueRef,
        value: ValueRef,
        index: ValueRef,
    },
    ShuffleVector {
        left: ValueRef,
        right: ValueRef,
        mask: ValueRef,
    },
    GetElementPtr {
        element: Type,
        base: ValueRef,
        indices: Vec<ValueRef>,
    },
    ExtractValue {
        aggregate: ValueRef,
        path: Vec<u32>,
    },
    InsertValue {
        aggregate: ValueRef,
        value: ValueRef,
        path: Vec<u32>,
    },
    Phi(Vec<(BlockRef, ValueRef)>),
    Select {
        condition: ValueRef,
        if_true: ValueRef,
        if_false: ValueRef,
    },
    Cast(CastOp, ValueRef, Type),
    Load {
        ty: Type,
        ptr: ValueRef,
        volatile: bool,
    },
    Store {
        ty: Type,
        value: ValueRef,
        ptr: ValueRef,
        volatile: bool,
    },
    Alloca(Type),
    Call {
        callee: ValueRef,
        args: Vec<ValueRef>,
        effects: MemoryEffects,
    },
    Fence,
    Branch(BlockRef),
    CondBranch {
        condition: ValueRef,
        r#true: BlockRef,
        r#false: BlockRef,
    },
    Return(Option<ValueRef>),
}
impl BlockInstruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Binary(op, _, _) => Opcode::Binary(*op),
            Self::Compare(p, _, _) => Opcode::Compare(*p),
            Self::ExtractElement { .. } => Opcode::ExtractElement,
            Self::InsertElement { .. } => Opcode::InsertElement,
            Self::ShuffleVector { .. } => Opcode::ShuffleVector,
            Self::GetElementPtr { element, .. } => Opcode::GetElementPtr(*element),
            Self::ExtractValue { path, .. } => Opcode::ExtractValue(path.clone()),
            Self::InsertValue { path, .. } => Opcode::InsertValue(path.clone()),
            Self::Phi(incomings) => Opcode::Phi(incomings.iter().map(|&(b, _)| b).collect()),
            Self::Select { .. } => Opcode::Select,
            Self::Cast(op, _, ty) => Opcode::Cast(*op, *ty),
            Self::Load { ty, .. } => Opcode::Load(*ty),
            Self::Store { ty, .. } => Opcode::Store(*ty),
            Self::Alloca(ty) => Opcode::Alloca(*ty),
            Self::Call { .. } => Opcode::Call,
            Self::Fence => Opcode::Fence,
            Self::Branch(_) => Opcode::Branch,
            Self::CondBranch { .. } => Opcode::CondBranch,
            Self::Return(_) => Opcode::Return,
        }
    }

    /// Operands in their canonical order. Calls list their arguments before
    /// the callee.
    pub fn operands(&self) -> Vec<ValueRef> {
        match self {
            Self::Binary(_, l, r) | Self::Compare(_, l, r) => vec![*l, *r],
            Self::ExtractElement { vector, index } => vec![*vector, *index],
            Self::InsertElement {
                vector,
                value,
                index,
            } => vec![*vector, *value, *index],
            Self::ShuffleVector { left, right, mask } => vec![*left, *right, *mask],
            Self::GetElementPtr { base, indices, .. } => {
                core::iter::once(*base).chain(indices.iter().copied()).collect()
            }
            Self::ExtractValue { aggregate, .. } => vec![*aggregate],
            Self::InsertValue {
                aggregate, value, ..
            } => vec![*aggregate, *value],
            Self::Phi(incomings) => incomings.iter().map(|&(_, v)| v).collect(),
            Self::Select {
                condition,
                if_true,
                if_false,
            } => vec![*condition, *if_true, *if_false],
            Self::Cast(_, v, _) => vec![*v],
            Self::Load { ptr, .. } => vec![*ptr],
            Self::Store { value, ptr, .. } => vec![*value, *ptr],
            Self::Call { callee, args, .. } => {
                args.iter().copied().chain(core::iter::once(*callee)).collect()
            }
            Self::CondBranch { condition, .. } => vec![*condition],
            Self::Return(Some(v)) => vec![*v],
            Self::Alloca(_) | Self::Fence | Self::Branch(_) | Self::Return(None) => Vec::new(),
        }
    }

    pub const fn memory_effects(&self) -> MemoryEffects {
        match self {
            Self::Load {
                volatile: false, ..
            } => MemoryEffects::READ,
            Self::Load { volatile: true, .. }
            | Self::Store { volatile: true, .. }
            | Self::Fence => MemoryEffects::READ.union(MemoryEffects::WRITE),
            Self::Store {
                volatile: false, ..
            } => MemoryEffects::WRITE,
            Self::Call { effects, .. } => *effects,
            Self::Binary(..)
            | Self::Compare(..)
            | Self::ExtractElement { .. }
            | Self::InsertElement { .. }
            | Self::ShuffleVector { .. }
            | Self::GetElementPtr { .. }
            | Self::ExtractValue { .. }
            | Self::InsertValue { .. }
            | Self::Phi(_)
            | Self::Select { .. }
            | Self::Cast(..)
            | Self::Alloca(_)
            | Self::Branch(_)
            | Self::CondBranch { .. }
            | Self::Return(_) => MemoryEffects::NONE,
        }
    }

    #[inline(always)]
    pub const fn may_read_memory(&self) -> bool {
        self.memory_effects().contains(MemoryEffects::READ)
    }

    #[inline(always)]
    pub const fn may_write_memory(&self) -> bool {
        self.memory_effects().contains(MemoryEffects::WRITE)
    }

    pub const fn memory_location(&self) -> Option<MemoryLocation> {
        match self {
            &Self::Load { ty, ptr, .. } | &Self::Store { ty, ptr, .. } => Some(MemoryLocation {
                ptr,
                size: ty.byte_size(),
            }),
            _ => None,
        }
    }

    #[inline(always)]
    pub const fn is_store(&self) -> bool {
        matches!(self, Self::Store { .. })
    }

    #[inline(always)]
    pub const fn is_load(&self) -> bool {
        matches!(self, Self::Load { .. })
    }

    /// Whether the result depends only on the opcode and operand identities
    /// (plus memory contents, for loads). The match has no wildcard arm so
    /// that new kinds must be classified explicitly.
    pub const fn is_reusable(&self) -> bool {
        match self {
            Self::Binary(..)
            | Self::Compare(..)
            | Self::ExtractElement { .. }
            | Self::InsertElement { .. }
            | Self::ShuffleVector { .. }
            | Self::GetElementPtr { .. }
            | Self::ExtractValue { .. }
            | Self::InsertValue { .. }
            | Self::Phi(_)
            | Self::Select { .. }
            | Self::Cast(..) => true,
            Self::Load { volatile, .. } => !*volatile,
            Self::Store { .. }
            | Self::Alloca(_)
            | Self::Call { .. }
            | Self::Fence
            | Self::Branch(_)
            | Self::CondBranch { .. }
            | Self::Return(_) => false,
        }
    }

    pub const fn produces_value(&self) -> bool {
        !matches!(
            self,
            Self::Store { .. }
                | Self::Fence
                | Self::Branch(_)
                | Self::CondBranch { .. }
                | Self::Return(_)
        )
    }

    pub fn relocate_operands(&mut self, mut relocator: impl FnMut(&mut ValueRef)) -> bool {
        let mut reloc = |x: &mut ValueRef| {
            let x0 = *x;
            relocator(x);
            *x != x0
        };

        match self {
            Self::Binary(_, ref mut l, ref mut r) | Self::Compare(_, ref mut l, ref mut r) => {
                let a = reloc(l);
                let b = reloc(r);
                a || b
            }
            Self::ExtractElement {
                ref mut vector,
                ref mut index,
            } => {
                let a = reloc(vector);
                let b = reloc(index);
                a || b
            }
            Self::InsertElement {
                ref mut vector,
                ref mut value,
                ref mut index,
            } => {
                let a = reloc(vector);
                let b = reloc(value);
                let c = reloc(index);
                a || b || c
            }
            Self::ShuffleVector {
                ref mut left,
                ref mut right,
                ref mut mask,
            } => {
                let a = reloc(left);
                let b = reloc(right);
                let c = reloc(mask);
                a || b || c
            }
            Self::Select {
                ref mut condition,
                ref mut if_true,
                ref mut if_false,
            } => {
                let a = reloc(condition);
                let b = reloc(if_true);
                let c = reloc(if_false);
                a || b || c
            }
            Self::GetElementPtr {
                ref mut base,
                ref mut indices,
                ..
            } => {
                let a = reloc(base);
                indices.iter_mut().fold(a, |modified, x| reloc(x) || modified)
            }
            Self::ExtractValue {
                ref mut aggregate, ..
            }
            | Self::Cast(_, ref mut aggregate, _)
            | Self::Load {
                ptr: ref mut aggregate,
                ..
            }
            | Self::CondBranch {
                condition: ref mut aggregate,
                ..
            }
            | Self::Return(Some(ref mut aggregate)) => reloc(aggregate),
            Self::InsertValue {
                ref mut aggregate,
                ref mut value,
                ..
            }
            | Self::Store {
                ptr: ref mut aggregate,
                ref mut value,
                ..
            } => {
                let a = reloc(aggregate);
                let b = reloc(value);
                a || b
            }
            Self::Phi(ref mut incomings) => incomings
                .iter_mut()
                .fold(false, |modified, (_, x)| reloc(x) || modified),
            Self::Call {
                ref mut callee,
                ref mut args,
                ..
            } => {
                let a = args.iter_mut().fold(false, |modified, x| reloc(x) || modified);
                let c = reloc(callee);
                a || c
            }
            Self::Alloca(_) | Self::Fence | Self::Branch(_) | Self::Return(None) => false,
        }
    }

    pub fn dump(
        &self,
        function: &Function,
        w: &mut (impl std::io::Write + ?Sized),
    ) -> std::io::Result<()> {
        let v = |x: &ValueRef| x.display(function).to_string();
        let vs = |xs: &[ValueRef]| xs.iter().map(v).collect::<Vec<_>>();
        let label = |b: &BlockRef| {
            function
                .blocks
                .get(b.0)
                .map_or_else(|| format!("b{}", b.0), |x| x.label.to_string())
        };

        match self {
            Self::Binary(op, l, r) => write!(w, "{} {}, {}", op.mnemonic(), v(l), v(r)),
            Self::Compare(p, l, r) => write!(
                w,
                "{} {} {}, {}",
                if p.is_float() { "fcmp" } else { "icmp" },
                p.mnemonic(),
                v(l),
                v(r)
            ),
            Self::ExtractElement { vector, index } => {
                write!(w, "extractelement {}, {}", v(vector), v(index))
            }
            Self::InsertElement {
                vector,
                value,
                index,
            } => write!(
                w,
                "insertelement {}, {}, {}",
                v(vector),
                v(value),
                v(index)
            ),
            Self::ShuffleVector { left, right, mask } => write!(
                w,
                "shufflevector {}, {}, {}",
                v(left),
                v(right),
                v(mask)
            ),
            Self::GetElementPtr {
                element,
                base,
                indices,
            } => {
                write!(w, "gep {element} {}", v(base))?;
                for x in indices.iter() {
                    write!(w, ", {}", v(x))?;
                }
                Ok(())
            }
            Self::ExtractValue { aggregate, path } => {
                write!(w, "extractvalue {}, {}", v(aggregate), CommaSeparated(&path[..]))
            }
            Self::InsertValue {
                aggregate,
                value,
                path,
            } => write!(
                w,
                "insertvalue {}, {}, {}",
                v(aggregate),
                v(value),
                CommaSeparated(&path[..])
            ),
            Self::Phi(incomings) => {
                let xs = incomings
                    .iter()
                    .map(|(b, x)| format!("[{}, {}]", label(b), v(x)))
                    .collect::<Vec<_>>();
                write!(w, "phi {}", CommaSeparated(&xs[..]))
            }
            Self::Select {
                condition,
                if_true,
                if_false,
            } => write!(
                w,
                "select {}, {}, {}",
                v(condition),
                v(if_true),
                v(if_false)
            ),
            Self::Cast(op, x, ty) => write!(w, "{} {} to {ty}", op.mnemonic(), v(x)),
            Self::Load { ty, ptr, volatile } => write!(
                w,
                "load {}{ty}, {}",
                if *volatile { "volatile " } else { "" },
                v(ptr)
            ),
            Self::Store {
                ty,
                value,
                ptr,
                volatile,
            } => write!(
                w,
                "store {}{ty} {}, {}",
                if *volatile { "volatile " } else { "" },
                v(value),
                v(ptr)
            ),
            Self::Alloca(ty) => write!(w, "alloca {ty}"),
            Self::Call {
                callee,
                args,
                effects,
            } => {
                let attr = if effects.is_empty() {
                    "readnone "
                } else if *effects == MemoryEffects::READ {
                    "readonly "
                } else {
                    ""
                };
                write!(w, "call {attr}{}({})", v(callee), CommaSeparated(&vs(&args[..])[..]))
            }
            Self::Fence => write!(w, "fence"),
            Self::Branch(b) => write!(w, "br {}", label(b)),
            Self::CondBranch {
                condition,
                r#true,
                r#false,
            } => write!(
                w,
                "br {}, {}, {}",
                v(condition),
                label(r#true),
                label(r#false)
            ),
            Self::Return(Some(x)) => write!(w, "ret {}", v(x)),
            Self::Return(None) => write!(w, "ret"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Block<'s> {
    pub label: &'s str,
    pub instructions: Vec<InstRef>,
}
impl<'s> Block<'s> {
    #[inline(always)]
    pub fn new(label: &'s str) -> Self {
        Self {
            label,
            instructions: Vec::new(),
        }
    }
}
