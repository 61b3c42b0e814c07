//! Operator statements.
//!
//! An operator statement is a flat chain of operands and binary operators,
//! optionally with unary operators on variable operands. The composite
//! kinds split the operand budget into chunks: arithmetic/bitwise chunks
//! are cast to a bitwise-eligible type and joined, logical composites
//! compare chunks relationally and join the comparisons with logical
//! operators.
//!
//! Divisions are the only operators that can fail. A literal divisor is
//! never zero; a variable divisor is collected while the chain is built
//! and, in the no-div-by-zero safety mode, the statement is wrapped in
//! `if (d1 != 0 && d2 != 0 ...)`. Inside branch conditions there is nothing
//! to wrap, so every divisor there is a literal.

use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::SliceRandom;

use super::{Session, wrap};
use crate::ast::{BinaryOp, Expr, Stmt, UnaryOp};
use crate::resolver::{DestSource, pick_destination, pick_initialized_of_type};
use crate::symbols::MethodId;
use crate::types::{Literal, PrimitiveKind, Type, nonzero_literal, random_primitive_literal};

/// Statement family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Arithmetic,
    Logical,
    Bitwise,
    ArithmeticBitwise,
    ArithmeticLogical,
    BitwiseLogical,
    ArithmeticLogicalBitwise,
}

impl OperatorKind {
    pub const ALL: [OperatorKind; 7] = [
        OperatorKind::Arithmetic,
        OperatorKind::Logical,
        OperatorKind::Bitwise,
        OperatorKind::ArithmeticBitwise,
        OperatorKind::ArithmeticLogical,
        OperatorKind::BitwiseLogical,
        OperatorKind::ArithmeticLogicalBitwise,
    ];

    /// Kinds whose value is a `boolean`.
    pub const LOGICAL_MODES: [OperatorKind; 4] = [
        OperatorKind::Logical,
        OperatorKind::ArithmeticLogical,
        OperatorKind::BitwiseLogical,
        OperatorKind::ArithmeticLogicalBitwise,
    ];

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    pub fn yields_boolean(self) -> bool {
        Self::LOGICAL_MODES.contains(&self)
    }
}

/// The three single-family chains every kind is assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Simple {
    Arithmetic,
    Logical,
    Bitwise,
}

impl Simple {
    fn operand_kinds(self) -> &'static [PrimitiveKind] {
        match self {
            Simple::Arithmetic => &PrimitiveKind::ARITHMETIC,
            Simple::Logical => &[PrimitiveKind::Boolean],
            Simple::Bitwise => &PrimitiveKind::BITWISE,
        }
    }

    fn binary_ops(self) -> &'static [BinaryOp] {
        match self {
            Simple::Arithmetic => &BinaryOp::ARITHMETIC,
            Simple::Logical => &BinaryOp::LOGICAL,
            Simple::Bitwise => &BinaryOp::BITWISE,
        }
    }

    fn unary_ops(self) -> &'static [UnaryOp] {
        match self {
            Simple::Arithmetic => &[
                UnaryOp::PreInc,
                UnaryOp::PostInc,
                UnaryOp::PreDec,
                UnaryOp::PostDec,
                UnaryOp::Neg,
            ],
            Simple::Logical => &[UnaryOp::Not],
            Simple::Bitwise => &[UnaryOp::BitNot],
        }
    }
}

/// Bookkeeping shared by every chunk of one statement.
#[derive(Debug, Default)]
struct ChainState {
    /// Variable divisors, first occurrence first.
    divisors: Vec<String>,
    /// Variables with a `++`/`--` somewhere earlier in the statement.
    inc_dec: BTreeSet<String>,
    /// Variables that already carry a unary operator.
    unaried: BTreeSet<String>,
    /// Every divisor must be a literal.
    literal_divisors: bool,
    /// Collect variable divisors for a guard.
    track_divisors: bool,
}

impl ChainState {
    fn guard(&self) -> Option<Expr> {
        Expr::all_of(
            self.divisors
                .iter()
                .map(|d| Expr::binary(BinaryOp::Ne, Expr::var(d), Expr::int(0)))
                .collect(),
        )
    }
}

/// One step of a chain: either an operator to use or a unary to apply.
#[derive(Debug, Clone, Copy)]
enum Pick {
    Binary(BinaryOp),
    Unary(UnaryOp),
}

/// `first op e op e ...`, or `first` alone.
fn chain(first: Expr, rest: Vec<(BinaryOp, Expr)>) -> Expr {
    if rest.is_empty() {
        first
    } else {
        Expr::Chain {
            first: Box::new(first),
            rest,
        }
    }
}

/// Join `parts` with the operators between them.
fn join(parts: Vec<(Expr, BinaryOp)>) -> Option<Expr> {
    let mut iter = parts.into_iter();
    let (first, mut op) = iter.next()?;
    let mut rest = Vec::new();
    for (expr, next) in iter {
        rest.push((op, expr));
        op = next;
    }
    Some(chain(first, rest))
}

impl Session<'_> {
    /// Number of operands of one statement: `2 ..= max_operators`.
    fn operand_count(&mut self) -> usize {
        let max = self.config.max_operators;
        2 + if max > 1 { self.emit.gen_range(0..max - 1) } else { 0 }
    }

    /// `chain;`, wrapped in a divisor guard when needed.
    pub fn operator_statement(&mut self, method: MethodId, kind: OperatorKind) -> Option<Stmt> {
        let (expr, guard) = self.operator_expr(method, kind, false);
        Some(wrap(Stmt::Expr(expr), guard))
    }

    /// `dest = (T) (chain);` into a non-final field or local: boolean for
    /// logical kinds, numeric otherwise.
    pub fn assign_operator_statement(
        &mut self,
        method: MethodId,
        kind: OperatorKind,
        source: DestSource,
    ) -> Option<Stmt> {
        let boolean = kind.yields_boolean();
        let dest = pick_destination(&self.class, method, source, &mut self.emit, |ty| {
            matches!(ty, Type::Primitive(k) if (*k == PrimitiveKind::Boolean) == boolean)
        })?;
        let (expr, guard) = self.operator_expr(method, kind, false);
        let assign = Stmt::assign(dest.name.clone(), Expr::cast(dest.ty.source_name(), expr));
        self.note_assignment(method, &dest, guard.is_some());
        Some(wrap(assign, guard))
    }

    /// A `boolean` operator expression for a branch condition. Divisors are
    /// non-zero literals.
    pub fn condition(&mut self, method: MethodId) -> Expr {
        let kind = *OperatorKind::LOGICAL_MODES
            .choose(&mut self.emit)
            .unwrap_or(&OperatorKind::Logical);
        self.operator_expr(method, kind, true).0
    }

    /// The chain of `kind` and the divisor guard it needs, if any.
    fn operator_expr(
        &mut self,
        method: MethodId,
        kind: OperatorKind,
        literal_divisors: bool,
    ) -> (Expr, Option<Expr>) {
        let mut state = ChainState {
            literal_divisors,
            track_divisors: self.config.no_div_by_zero && !literal_divisors,
            ..ChainState::default()
        };
        let n = self.operand_count();
        let expr = match kind {
            OperatorKind::Arithmetic => self.chain_of_kind(method, n, Simple::Arithmetic, &mut state),
            OperatorKind::Logical => self.chain_of_kind(method, n, Simple::Logical, &mut state),
            OperatorKind::Bitwise => self.chain_of_kind(method, n, Simple::Bitwise, &mut state),
            OperatorKind::ArithmeticBitwise => self.arithmetic_bitwise(method, n, &mut state),
            OperatorKind::ArithmeticLogical
            | OperatorKind::BitwiseLogical
            | OperatorKind::ArithmeticLogicalBitwise => {
                self.combined_with_logical(method, n, kind, &mut state)
            }
        };
        (expr, state.guard())
    }

    /// `1 + rand(max - 1)` operands per chunk, where `max` is half the
    /// statement's operands.
    fn partition_size(&mut self, total: usize) -> usize {
        let max = total / 2;
        1 + if max > 1 { self.emit.gen_range(0..max - 1) } else { 0 }
    }

    /// Chunks cast to a bitwise-eligible type and joined by non-dividing
    /// arithmetic or bitwise operators.
    fn arithmetic_bitwise(&mut self, method: MethodId, total: usize, state: &mut ChainState) -> Expr {
        let mut remaining = total;
        let mut parts = Vec::new();
        while remaining > 0 {
            let size = self.partition_size(total);
            let (chunk, op) = if self.emit.gen_bool(0.5) {
                let chunk = self.chain_of_kind(method, size, Simple::Arithmetic, state);
                (chunk, pick(&mut self.emit, &BinaryOp::NON_DIVIDING_ARITHMETIC))
            } else {
                let chunk = self.chain_of_kind(method, size, Simple::Bitwise, state);
                (chunk, pick(&mut self.emit, &BinaryOp::BITWISE))
            };
            let target = *PrimitiveKind::BITWISE
                .choose(&mut self.emit)
                .unwrap_or(&PrimitiveKind::Int);
            parts.push((Expr::cast(target.as_str(), Expr::paren(chunk)), op));
            remaining = remaining.saturating_sub(size);
        }
        join(parts).unwrap_or_else(|| Expr::int(0))
    }

    /// Logical chunks and relational comparisons of `kind`'s inner chunks,
    /// joined by logical operators.
    fn combined_with_logical(
        &mut self,
        method: MethodId,
        total: usize,
        kind: OperatorKind,
        state: &mut ChainState,
    ) -> Expr {
        let mut remaining = total;
        let mut parts = Vec::new();
        // Left side and operator of a comparison waiting for its right side.
        let mut open: Option<(Expr, BinaryOp)> = None;
        while remaining > 0 || open.is_some() {
            let size = self.partition_size(total);
            if open.is_none() && self.emit.gen_bool(0.5) {
                let chunk = self.chain_of_kind(method, size, Simple::Logical, state);
                parts.push((Expr::paren(chunk), pick(&mut self.emit, &BinaryOp::LOGICAL)));
            } else {
                let chunk = Expr::paren(match kind {
                    OperatorKind::ArithmeticLogical => {
                        self.chain_of_kind(method, size, Simple::Arithmetic, state)
                    }
                    OperatorKind::BitwiseLogical => {
                        self.chain_of_kind(method, size, Simple::Bitwise, state)
                    }
                    _ => self.arithmetic_bitwise(method, size, state),
                });
                match open.take() {
                    None => open = Some((chunk, pick(&mut self.emit, &BinaryOp::RELATIONAL))),
                    Some((lhs, rel)) => {
                        let comparison = Expr::paren(Expr::binary(rel, lhs, chunk));
                        parts.push((comparison, pick(&mut self.emit, &BinaryOp::LOGICAL)));
                    }
                }
            }
            remaining = remaining.saturating_sub(size);
        }
        join(parts).unwrap_or_else(|| Expr::Literal(Literal::Boolean(true)))
    }

    /// A flat chain of `n` operands of one family.
    fn chain_of_kind(
        &mut self,
        method: MethodId,
        n: usize,
        simple: Simple,
        state: &mut ChainState,
    ) -> Expr {
        let mut first: Option<Expr> = None;
        let mut rest = Vec::new();
        let mut op: Option<BinaryOp> = None;
        for _ in 0..n.max(1) {
            let after_division = op.is_some_and(BinaryOp::is_dividing);
            let kind = *simple
                .operand_kinds()
                .choose(&mut self.emit)
                .unwrap_or(&PrimitiveKind::Int);
            let var = pick_initialized_of_type(&self.class, method, &Type::Primitive(kind), &mut self.emit)
                .map(|v| (v.name.clone(), v.is_final()))
                .filter(|(name, _)| {
                    !(after_division && (state.literal_divisors || state.inc_dec.contains(name)))
                });

            let (operand, next) = match var {
                Some((name, is_final)) => {
                    if after_division && state.track_divisors && !state.divisors.contains(&name) {
                        state.divisors.push(name.clone());
                    }
                    let may_unary = !after_division && !state.unaried.contains(&name);
                    match self.pick_step(simple, may_unary, is_final) {
                        Pick::Binary(next) => (Expr::var(name), next),
                        Pick::Unary(unary) => {
                            if unary.is_inc_dec() {
                                state.inc_dec.insert(name.clone());
                            }
                            state.unaried.insert(name.clone());
                            let next = pick(&mut self.emit, simple.binary_ops());
                            (Expr::unary(unary, Expr::var(name)), next)
                        }
                    }
                }
                None => {
                    let literal = if after_division {
                        nonzero_literal(kind, &mut self.emit)
                    } else {
                        random_primitive_literal(kind, false, &mut self.emit)
                    };
                    (Expr::Literal(literal), pick(&mut self.emit, simple.binary_ops()))
                }
            };

            match (first.is_some(), op) {
                (true, Some(prev)) => rest.push((prev, operand)),
                _ => first = Some(operand),
            }
            op = Some(next);
        }
        chain(first.unwrap_or_else(|| Expr::int(1)), rest)
    }

    /// Uniform over the family's binary operators and, when allowed, its
    /// unary operators. `++`/`--` never apply to finals.
    fn pick_step(&mut self, simple: Simple, may_unary: bool, is_final: bool) -> Pick {
        let mut steps: Vec<Pick> = simple.binary_ops().iter().copied().map(Pick::Binary).collect();
        if may_unary {
            steps.extend(
                simple
                    .unary_ops()
                    .iter()
                    .filter(|u| !(is_final && u.is_inc_dec()))
                    .copied()
                    .map(Pick::Unary),
            );
        }
        steps
            .choose(&mut self.emit)
            .copied()
            .unwrap_or(Pick::Binary(BinaryOp::Add))
    }
}

fn pick<R: Rng + ?Sized>(rng: &mut R, ops: &[BinaryOp]) -> BinaryOp {
    ops.choose(rng).copied().unwrap_or(BinaryOp::Add)
}
