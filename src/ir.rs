use block::{Block, BlockInstruction};

use crate::utils::CommaSeparated;

pub mod block;
pub mod opt;

#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstRef(pub usize);
impl core::fmt::Debug for InstRef {
    #[inline(always)]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%r{}", self.0)
    }
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockRef(pub usize);

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArgRef(pub usize);

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalRef(pub usize);

/// An operand reference. Equality is identity: two `ValueRef`s are equal only
/// when they name the same instruction result, argument or global. Integer
/// constants are uniqued, so equal constants are the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueRef {
    Inst(InstRef),
    Argument(ArgRef),
    Global(GlobalRef),
    Const(i64),
}
impl ValueRef {
    #[inline(always)]
    pub const fn as_inst(self) -> Option<InstRef> {
        match self {
            Self::Inst(r) => Some(r),
            _ => None,
        }
    }

    #[inline]
    pub fn display<'f, 's>(self, function: &'f Function<'s>) -> ValueDisplay<'f, 's> {
        ValueDisplay(self, function)
    }
}
impl From<InstRef> for ValueRef {
    #[inline(always)]
    fn from(value: InstRef) -> Self {
        Self::Inst(value)
    }
}

pub struct ValueDisplay<'f, 's>(ValueRef, &'f Function<'s>);
impl core::fmt::Display for ValueDisplay<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            ValueRef::Inst(r) => match self.1.names.get(r.0).copied().flatten() {
                Some(name) => write!(f, "%{name}"),
                None => write!(f, "%{}", self.1.generated_name(r)),
            },
            ValueRef::Argument(ArgRef(n)) => match self.1.arguments.get(n) {
                Some(name) => write!(f, "%{name}"),
                None => write!(f, "%arg{n}"),
            },
            ValueRef::Global(GlobalRef(n)) => match self.1.globals.get(n) {
                Some(name) => write!(f, "@{name}"),
                None => write!(f, "@g{n}"),
            },
            ValueRef::Const(c) => write!(f, "{c}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Int(u16),
    F32,
    F64,
    Ptr,
}
impl Type {
    pub const fn byte_size(self) -> u64 {
        match self {
            Self::Int(bits) if bits <= 8 => 1,
            Self::Int(bits) => (bits as u64 + 7) / 8,
            Self::F32 => 4,
            Self::F64 | Self::Ptr => 8,
        }
    }
}
impl core::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(bits) => write!(f, "i{bits}"),
            Self::F32 => f.write_str("f32"),
            Self::F64 => f.write_str("f64"),
            Self::Ptr => f.write_str("ptr"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Function<'s> {
    pub name: &'s str,
    pub arguments: Vec<&'s str>,
    pub globals: Vec<&'s str>,
    pub instructions: Vec<BlockInstruction>,
    /// Source result names, parallel to `instructions`.
    pub names: Vec<Option<&'s str>>,
    pub blocks: Vec<Block<'s>>,
}
impl<'s> Function<'s> {
    pub fn new(name: &'s str, arguments: Vec<&'s str>) -> Self {
        Self {
            name,
            arguments,
            globals: Vec::new(),
            instructions: Vec::new(),
            names: Vec::new(),
            blocks: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn argument(&self, n: usize) -> ValueRef {
        ValueRef::Argument(ArgRef(n))
    }

    pub fn global(&mut self, name: &'s str) -> ValueRef {
        let n = match self.globals.iter().position(|&g| g == name) {
            Some(n) => n,
            None => {
                self.globals.push(name);
                self.globals.len() - 1
            }
        };

        ValueRef::Global(GlobalRef(n))
    }

    pub fn push_block(&mut self, label: &'s str) -> BlockRef {
        self.blocks.push(Block::new(label));
        BlockRef(self.blocks.len() - 1)
    }

    pub fn push_instruction(&mut self, block: BlockRef, inst: BlockInstruction) -> InstRef {
        let r = InstRef(self.instructions.len());
        self.instructions.push(inst);
        self.names.push(None);
        self.blocks[block.0].instructions.push(r);

        r
    }

    #[inline]
    pub fn set_name(&mut self, inst: InstRef, name: &'s str) {
        self.names[inst.0] = Some(name);
    }

    fn is_name_taken(&self, name: &str) -> bool {
        self.arguments.iter().any(|&a| a == name) || self.names.iter().any(|&n| n == Some(name))
    }

    /// `r{n}` for unnamed results, suffixed with `.{k}` while it collides with
    /// an argument or a source name.
    fn generated_name(&self, inst: InstRef) -> String {
        let mut name = format!("r{}", inst.0);
        let mut k = 1;
        while self.is_name_taken(&name) {
            name = format!("r{}.{k}", inst.0);
            k += 1;
        }

        name
    }

    #[inline(always)]
    pub fn block(&self, block: BlockRef) -> &Block<'s> {
        &self.blocks[block.0]
    }

    #[inline(always)]
    pub fn instruction(&self, inst: InstRef) -> &BlockInstruction {
        &self.instructions[inst.0]
    }

    /// Rewrites every operand referring to `from` so that it refers to `to`.
    /// Returns the instructions that had an operand changed, in order.
    pub fn replace_all_uses(&mut self, from: InstRef, to: ValueRef) -> Vec<InstRef> {
        let from = ValueRef::Inst(from);
        if from == to {
            return Vec::new();
        }

        self.instructions
            .iter_mut()
            .enumerate()
            .filter_map(|(n, x)| {
                x.relocate_operands(|v| {
                    if *v == from {
                        *v = to;
                    }
                })
                .then_some(InstRef(n))
            })
            .collect()
    }

    pub fn use_count(&self, inst: InstRef) -> usize {
        let v = ValueRef::Inst(inst);
        self.instructions
            .iter()
            .map(|x| x.operands().into_iter().filter(|&o| o == v).count())
            .sum()
    }

    pub fn dump(&self, w: &mut (impl std::io::Write + ?Sized)) -> std::io::Result<()> {
        let args = self
            .arguments
            .iter()
            .map(|a| format!("%{a}"))
            .collect::<Vec<_>>();
        writeln!(w, "fn @{}({}) {{", self.name, CommaSeparated(&args[..]))?;
        for b in self.blocks.iter() {
            writeln!(w, "{}:", b.label)?;
            for &r in b.instructions.iter() {
                write!(w, "  ")?;
                if self.instruction(r).produces_value() {
                    write!(w, "{} = ", ValueRef::Inst(r).display(self))?;
                }
                self.instruction(r).dump(self, w)?;
                writeln!(w)?;
            }
        }
        writeln!(w, "}}")
    }

    pub fn dump_to_string(&self) -> String {
        let mut sink = Vec::new();
        // writing into a Vec never fails
        let _ = self.dump(&mut sink);

        String::from_utf8_lossy(&sink).into_owned()
    }
}
