//! Textual form of [`Function`]s, close to the dump format.
//!
//! ```text
//! fn @name(%a, %b) {
//! entry:
//!   %x = add %a, %b
//!   %l = load i32, %a
//!   store i32 %x, %b
//!   ret %l
//! }
//! ```

use std::collections::HashMap;

use thiserror::Error;

mod tokenizer;
use crate::{
    ir::{
        block::{BinaryOp, BlockInstruction, CastOp, ComparePredicate, MemoryEffects},
        BlockRef, Function, InstRef, Type, ValueRef,
    },
    utils::{BoolToErrorHelper, Located},
};

pub use self::tokenizer::*;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),
    #[error("expected {0}")]
    Expected(&'static str),
    #[error("unknown instruction `{0}`")]
    UnknownInstruction(String),
    #[error("unknown type `{0}`")]
    UnknownType(String),
    #[error("unknown compare predicate `{0}`")]
    UnknownPredicate(String),
    #[error("integer literal `{0}` is out of range")]
    InvalidNumber(String),
    #[error("undefined value `%{0}`")]
    UndefinedValue(String),
    #[error("undefined block `{0}`")]
    UndefinedBlock(String),
    #[error("`%{0}` is defined more than once")]
    Redefinition(String),
    #[error("block `{0}` is defined more than once")]
    DuplicateBlock(String),
    #[error("`{0}` produces a value and needs a result name")]
    MissingResult(String),
    #[error("`{0}` does not produce a value")]
    UnexpectedResult(String),
    #[error("instruction before the first block label")]
    InstructionOutsideBlock,
}

pub type ParseResult<T> = Result<T, Located<ParseError>>;

impl From<Located<TokenizerError>> for Located<ParseError> {
    #[inline]
    fn from(value: Located<TokenizerError>) -> Self {
        Located {
            t: value.t.into(),
            line: value.line,
            col: value.col,
        }
    }
}

pub struct ParseState<'s> {
    pub token_list: Vec<Token<'s>>,
    pub token_ptr: usize,
}
impl<'s> ParseState<'s> {
    pub fn new(token_list: Vec<Token<'s>>) -> Self {
        Self {
            token_list,
            token_ptr: 0,
        }
    }

    #[inline]
    pub fn current_token(&self) -> Option<&Token<'s>> {
        self.token_list.get(self.token_ptr)
    }

    #[inline]
    pub fn peek_token(&self, offset: usize) -> Option<&Token<'s>> {
        self.token_list.get(self.token_ptr + offset)
    }

    #[inline]
    pub fn consume_token(&mut self) {
        self.token_ptr += 1;
    }

    #[inline]
    pub fn current_kind_is(&self, kind: TokenKind) -> bool {
        self.current_token().is_some_and(|t| t.kind == kind)
    }

    #[inline]
    pub fn consume_by_kind(
        &mut self,
        kind: TokenKind,
        expected: &'static str,
    ) -> ParseResult<Token<'s>> {
        match self.token_list.get(self.token_ptr) {
            Some(x) if x.kind == kind => {
                self.token_ptr += 1;
                Ok(x.clone())
            }
            t => Err(self.err_on(ParseError::Expected(expected), t)),
        }
    }

    #[inline]
    pub fn consume_keyword(&mut self, kw: &'static str) -> ParseResult<()> {
        match self.token_list.get(self.token_ptr) {
            Some(x) if x.kind == TokenKind::Identifier && x.slice == kw => {
                self.token_ptr += 1;
                Ok(())
            }
            t => Err(self.err_on(ParseError::Expected(kw), t)),
        }
    }

    /// Consumes `kw` if it is next.
    #[inline]
    pub fn check_keyword(&mut self, kw: &str) -> bool {
        let found = self
            .current_token()
            .is_some_and(|t| t.kind == TokenKind::Identifier && t.slice == kw);
        if found {
            self.token_ptr += 1;
        }

        found
    }

    #[inline]
    pub fn err_on(&self, kind: ParseError, tref: Option<&Token<'s>>) -> Located<ParseError> {
        let t = tref.or_else(|| self.token_list.last());
        Located {
            t: kind,
            line: t.map_or(0, |t| t.line),
            col: t.map_or(0, |t| t.col),
        }
    }

    #[inline]
    pub fn err(&self, kind: ParseError) -> Located<ParseError> {
        self.err_on(kind, self.current_token())
    }
}

struct FunctionParseContext<'s> {
    function: Function<'s>,
    values: HashMap<&'s str, ValueRef>,
    forward_refs: Vec<Token<'s>>,
    forward_index: HashMap<&'s str, usize>,
    labels: HashMap<&'s str, BlockRef>,
    current_block: Option<BlockRef>,
}
impl<'s> FunctionParseContext<'s> {
    /// Stand-in for a name used before its definition; replaced once the whole
    /// body has been read.
    #[inline]
    fn forward_ref(&mut self, token: &Token<'s>) -> ValueRef {
        let k = match self.forward_index.get(token.slice) {
            Some(&k) => k,
            None => {
                self.forward_refs.push(token.clone());
                self.forward_index
                    .insert(token.slice, self.forward_refs.len() - 1);
                self.forward_refs.len() - 1
            }
        };

        ValueRef::Inst(InstRef(usize::MAX - k))
    }

    fn resolve_forward_refs(&mut self, state: &ParseState<'s>) -> ParseResult<()> {
        let resolved = self
            .forward_refs
            .iter()
            .map(|t| {
                self.values.get(t.slice).copied().ok_or_else(|| {
                    state.err_on(ParseError::UndefinedValue(t.slice.to_string()), Some(t))
                })
            })
            .collect::<ParseResult<Vec<_>>>()?;

        for x in self.function.instructions.iter_mut() {
            x.relocate_operands(|v| {
                if let ValueRef::Inst(InstRef(n)) = *v {
                    if let Some(&to) = resolved.get(usize::MAX - n) {
                        *v = to;
                    }
                }
            });
        }

        Ok(())
    }
}

pub fn parse_module(source: &str) -> ParseResult<Vec<Function<'_>>> {
    let mut state = ParseState::new(Tokenizer::new(source).tokenize()?);

    let mut functions = Vec::new();
    while state.current_token().is_some() {
        functions.push(parse_function(&mut state)?);
    }

    Ok(functions)
}

pub fn parse_function<'s>(state: &mut ParseState<'s>) -> ParseResult<Function<'s>> {
    state.consume_keyword("fn")?;
    let name = state.consume_by_kind(TokenKind::GlobalName, "function name")?;
    state.consume_by_kind(TokenKind::OpenParenthese, "`(`")?;
    let mut arguments = Vec::new();
    while !state.current_kind_is(TokenKind::CloseParenthese) {
        if !arguments.is_empty() {
            state.consume_by_kind(TokenKind::Comma, "`,`")?;
        }
        let a = state.consume_by_kind(TokenKind::LocalName, "argument name")?;
        arguments.push(a);
    }
    state.consume_token();
    state.consume_by_kind(TokenKind::OpenBrace, "`{`")?;

    let mut ctx = FunctionParseContext {
        function: Function::new(name.slice, arguments.iter().map(|a| a.slice).collect()),
        values: HashMap::new(),
        forward_refs: Vec::new(),
        forward_index: HashMap::new(),
        labels: HashMap::new(),
        current_block: None,
    };
    for (n, a) in arguments.iter().enumerate() {
        let prev = ctx.values.insert(a.slice, ctx.function.argument(n));
        prev.is_none().or_err(|| {
            state.err_on(ParseError::Redefinition(a.slice.to_string()), Some(a))
        })?;
    }

    // labels may be referenced before they appear
    let body = &state.token_list[state.token_ptr..];
    for w in body
        .windows(2)
        .take_while(|w| w[0].kind != TokenKind::CloseBrace)
    {
        if w[0].kind == TokenKind::Identifier && w[1].kind == TokenKind::Colon {
            let b = ctx.function.push_block(w[0].slice);
            if ctx.labels.insert(w[0].slice, b).is_some() {
                return Err(
                    state.err_on(ParseError::DuplicateBlock(w[0].slice.to_string()), Some(&w[0]))
                );
            }
        }
    }

    loop {
        match (state.current_token(), state.peek_token(1)) {
            (None, _) => return Err(state.err(ParseError::Expected("`}`"))),
            (Some(t), _) if t.kind == TokenKind::CloseBrace => {
                state.consume_token();
                break;
            }
            (Some(t), Some(n)) if t.kind == TokenKind::Identifier && n.kind == TokenKind::Colon => {
                ctx.current_block = ctx.labels.get(t.slice).copied();
                state.consume_token();
                state.consume_token();
            }
            _ => parse_statement(state, &mut ctx)?,
        }
    }

    ctx.resolve_forward_refs(state)?;
    Ok(ctx.function)
}

fn parse_statement<'s>(
    state: &mut ParseState<'s>,
    ctx: &mut FunctionParseContext<'s>,
) -> ParseResult<()> {
    let result = match (state.current_token(), state.peek_token(1)) {
        (Some(t), Some(n)) if t.kind == TokenKind::LocalName && n.kind == TokenKind::Eq => {
            let t = t.clone();
            state.consume_token();
            state.consume_token();
            Some(t)
        }
        _ => None,
    };
    let mnemonic = state.consume_by_kind(TokenKind::Identifier, "instruction")?;
    let block = ctx
        .current_block
        .ok_or_else(|| state.err_on(ParseError::InstructionOutsideBlock, Some(&mnemonic)))?;

    let inst = parse_instruction(state, ctx, &mnemonic)?;
    let void_call = matches!(inst, BlockInstruction::Call { .. });
    match (&result, inst.produces_value()) {
        (None, true) if !void_call => {
            return Err(state.err_on(
                ParseError::MissingResult(mnemonic.slice.to_string()),
                Some(&mnemonic),
            ))
        }
        (Some(_), false) => {
            return Err(state.err_on(
                ParseError::UnexpectedResult(mnemonic.slice.to_string()),
                Some(&mnemonic),
            ))
        }
        _ => (),
    }

    let r = ctx.function.push_instruction(block, inst);
    if let Some(t) = result {
        if ctx.values.insert(t.slice, ValueRef::Inst(r)).is_some() {
            return Err(state.err_on(ParseError::Redefinition(t.slice.to_string()), Some(&t)));
        }
        ctx.function.set_name(r, t.slice);
    }

    Ok(())
}

fn parse_instruction<'s>(
    state: &mut ParseState<'s>,
    ctx: &mut FunctionParseContext<'s>,
    mnemonic: &Token<'s>,
) -> ParseResult<BlockInstruction> {
    if let Some(op) = BinaryOp::from_mnemonic(mnemonic.slice) {
        let [l, r] = parse_values(state, ctx)?;
        return Ok(BlockInstruction::Binary(op, l, r));
    }
    if let Some(op) = CastOp::from_mnemonic(mnemonic.slice) {
        let v = parse_value(state, ctx)?;
        state.consume_keyword("to")?;
        let ty = parse_type(state)?;
        return Ok(BlockInstruction::Cast(op, v, ty));
    }

    let inst = match mnemonic.slice {
        "icmp" | "fcmp" => {
            let table = if mnemonic.slice == "icmp" {
                ComparePredicate::INT
            } else {
                ComparePredicate::FLOAT
            };
            let p = state.consume_by_kind(TokenKind::Identifier, "compare predicate")?;
            let Some(&(predicate, _)) = table.iter().find(|(_, m)| *m == p.slice) else {
                return Err(
                    state.err_on(ParseError::UnknownPredicate(p.slice.to_string()), Some(&p))
                );
            };
            let [l, r] = parse_values(state, ctx)?;
            BlockInstruction::Compare(predicate, l, r)
        }
        "extractelement" => {
            let [vector, index] = parse_values(state, ctx)?;
            BlockInstruction::ExtractElement { vector, index }
        }
        "insertelement" => {
            let [vector, value, index] = parse_values(state, ctx)?;
            BlockInstruction::InsertElement {
                vector,
                value,
                index,
            }
        }
        "shufflevector" => {
            let [left, right, mask] = parse_values(state, ctx)?;
            BlockInstruction::ShuffleVector { left, right, mask }
        }
        "select" => {
            let [condition, if_true, if_false] = parse_values(state, ctx)?;
            BlockInstruction::Select {
                condition,
                if_true,
                if_false,
            }
        }
        "gep" => {
            let element = parse_type(state)?;
            let base = parse_value(state, ctx)?;
            let mut indices = Vec::new();
            while state.current_kind_is(TokenKind::Comma) {
                state.consume_token();
                indices.push(parse_value(state, ctx)?);
            }
            BlockInstruction::GetElementPtr {
                element,
                base,
                indices,
            }
        }
        "extractvalue" => {
            let aggregate = parse_value(state, ctx)?;
            let path = parse_index_path(state)?;
            BlockInstruction::ExtractValue { aggregate, path }
        }
        "insertvalue" => {
            let [aggregate, value] = parse_values(state, ctx)?;
            let path = parse_index_path(state)?;
            BlockInstruction::InsertValue {
                aggregate,
                value,
                path,
            }
        }
        "phi" => {
            let mut incomings = Vec::new();
            loop {
                state.consume_by_kind(TokenKind::OpenBracket, "`[`")?;
                let label = state.consume_by_kind(TokenKind::Identifier, "block label")?;
                let Some(&from) = ctx.labels.get(label.slice) else {
                    return Err(state.err_on(
                        ParseError::UndefinedBlock(label.slice.to_string()),
                        Some(&label),
                    ));
                };
                state.consume_by_kind(TokenKind::Comma, "`,`")?;
                let v = parse_value(state, ctx)?;
                state.consume_by_kind(TokenKind::CloseBracket, "`]`")?;
                incomings.push((from, v));

                if !state.current_kind_is(TokenKind::Comma) {
                    break;
                }
                state.consume_token();
            }
            BlockInstruction::Phi(incomings)
        }
        "load" => {
            let volatile = state.check_keyword("volatile");
            let ty = parse_type(state)?;
            state.consume_by_kind(TokenKind::Comma, "`,`")?;
            let ptr = parse_value(state, ctx)?;
            BlockInstruction::Load { ty, ptr, volatile }
        }
        "store" => {
            let volatile = state.check_keyword("volatile");
            let ty = parse_type(state)?;
            let [value, ptr] = parse_values(state, ctx)?;
            BlockInstruction::Store {
                ty,
                value,
                ptr,
                volatile,
            }
        }
        "alloca" => BlockInstruction::Alloca(parse_type(state)?),
        "call" => {
            let effects = if state.check_keyword("readnone") {
                MemoryEffects::NONE
            } else if state.check_keyword("readonly") {
                MemoryEffects::READ
            } else {
                MemoryEffects::READ | MemoryEffects::WRITE
            };
            let callee = parse_value(state, ctx)?;
            state.consume_by_kind(TokenKind::OpenParenthese, "`(`")?;
            let mut args = Vec::new();
            while !state.current_kind_is(TokenKind::CloseParenthese) {
                if !args.is_empty() {
                    state.consume_by_kind(TokenKind::Comma, "`,`")?;
                }
                args.push(parse_value(state, ctx)?);
            }
            state.consume_token();
            BlockInstruction::Call {
                callee,
                args,
                effects,
            }
        }
        "fence" => BlockInstruction::Fence,
        "br" => {
            if state.current_kind_is(TokenKind::Identifier) {
                BlockInstruction::Branch(parse_block_ref(state, ctx)?)
            } else {
                let condition = parse_value(state, ctx)?;
                state.consume_by_kind(TokenKind::Comma, "`,`")?;
                let r#true = parse_block_ref(state, ctx)?;
                state.consume_by_kind(TokenKind::Comma, "`,`")?;
                let r#false = parse_block_ref(state, ctx)?;
                BlockInstruction::CondBranch {
                    condition,
                    r#true,
                    r#false,
                }
            }
        }
        "ret" => {
            // a following `%x = ...` starts the next statement
            let has_value = match (state.current_token(), state.peek_token(1)) {
                (Some(t), Some(n)) if t.kind == TokenKind::LocalName => n.kind != TokenKind::Eq,
                (Some(t), _) => matches!(
                    t.kind,
                    TokenKind::LocalName | TokenKind::GlobalName | TokenKind::Number
                ),
                (None, _) => false,
            };
            BlockInstruction::Return(if has_value {
                Some(parse_value(state, ctx)?)
            } else {
                None
            })
        }
        other => {
            return Err(state.err_on(
                ParseError::UnknownInstruction(other.to_string()),
                Some(mnemonic),
            ))
        }
    };

    Ok(inst)
}

/// `N` comma separated values.
fn parse_values<'s, const N: usize>(
    state: &mut ParseState<'s>,
    ctx: &mut FunctionParseContext<'s>,
) -> ParseResult<[ValueRef; N]> {
    let mut values = [ValueRef::Const(0); N];
    for (n, v) in values.iter_mut().enumerate() {
        if n > 0 {
            state.consume_by_kind(TokenKind::Comma, "`,`")?;
        }
        *v = parse_value(state, ctx)?;
    }

    Ok(values)
}

fn parse_value<'s>(
    state: &mut ParseState<'s>,
    ctx: &mut FunctionParseContext<'s>,
) -> ParseResult<ValueRef> {
    let Some(t) = state.current_token().cloned() else {
        return Err(state.err(ParseError::Expected("value")));
    };

    let v = match t.kind {
        TokenKind::LocalName => match ctx.values.get(t.slice) {
            Some(&v) => v,
            None => ctx.forward_ref(&t),
        },
        TokenKind::GlobalName => ctx.function.global(t.slice),
        TokenKind::Number => ValueRef::Const(parse_number(state, &t)?),
        _ => return Err(state.err(ParseError::Expected("value"))),
    };
    state.consume_token();

    Ok(v)
}

fn parse_number(state: &ParseState, t: &Token) -> ParseResult<i64> {
    let (negative, digits) = match t.slice.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t.slice),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i128::from_str_radix(hex, 16),
        None => digits.parse::<i128>(),
    };

    magnitude
        .ok()
        .map(|m| if negative { -m } else { m })
        .and_then(|m| i64::try_from(m).ok())
        .ok_or_else(|| state.err_on(ParseError::InvalidNumber(t.slice.to_string()), Some(t)))
}

fn parse_index_path(state: &mut ParseState) -> ParseResult<Vec<u32>> {
    let mut path = Vec::new();
    while state.current_kind_is(TokenKind::Comma) {
        state.consume_token();
        let t = state.consume_by_kind(TokenKind::Number, "aggregate index")?;
        let index = t
            .slice
            .parse::<u32>()
            .map_err(|_| state.err_on(ParseError::InvalidNumber(t.slice.to_string()), Some(&t)))?;
        path.push(index);
    }
    (!path.is_empty()).or_err(|| state.err(ParseError::Expected("aggregate index")))?;

    Ok(path)
}

fn parse_block_ref<'s>(
    state: &mut ParseState<'s>,
    ctx: &FunctionParseContext<'s>,
) -> ParseResult<BlockRef> {
    let t = state.consume_by_kind(TokenKind::Identifier, "block label")?;
    ctx.labels
        .get(t.slice)
        .copied()
        .ok_or_else(|| state.err_on(ParseError::UndefinedBlock(t.slice.to_string()), Some(&t)))
}

fn parse_type(state: &mut ParseState) -> ParseResult<Type> {
    let t = state.consume_by_kind(TokenKind::Identifier, "type")?;
    let ty = match t.slice {
        "ptr" => Some(Type::Ptr),
        "f32" => Some(Type::F32),
        "f64" => Some(Type::F64),
        s => s
            .strip_prefix('i')
            .and_then(|bits| bits.parse::<u16>().ok())
            .filter(|&bits| bits > 0)
            .map(Type::Int),
    };

    ty.ok_or_else(|| state.err_on(ParseError::UnknownType(t.slice.to_string()), Some(&t)))
}
