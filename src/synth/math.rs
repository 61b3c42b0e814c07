//! Guarded `java.lang.Math` calls.
//!
//! The exact-arithmetic methods throw on overflow and `floorDiv`/`floorMod`
//! throw on a zero divisor. When the matching safety mode is on, the call is
//! wrapped in `if (guard) { ... }` with a guard derived from the argument
//! expressions.

use rand::seq::SliceRandom;

use super::{Session, wrap};
use crate::ast::{BinaryOp, Expr, Stmt};
use crate::emit::GenerationConfig;
use crate::resolver::{DestSource, pick_destination, resolve};
use crate::symbols::MethodId;
use crate::types::PrimitiveKind::{Double as D, Float as F, Int as I, Long as J};
use crate::types::{PrimitiveKind, Type};

use Precondition as P;

/// What a call needs to be safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    None,
    AddOverflow,
    SubtractOverflow,
    MultiplyOverflow,
    IncrementOverflow,
    DecrementOverflow,
    NegateOverflow,
    IntConversion,
    NonZeroDivisor,
}

impl Precondition {
    /// Whether `config` asks for this precondition to be guarded.
    pub fn enabled_by(self, config: &GenerationConfig) -> bool {
        match self {
            Precondition::None => false,
            Precondition::NonZeroDivisor => config.no_div_by_zero,
            _ => config.no_overflow,
        }
    }
}

/// One `Math` method overload.
#[derive(Debug, Clone, Copy)]
pub struct MathMethod {
    pub name: &'static str,
    pub params: &'static [PrimitiveKind],
    pub ret: PrimitiveKind,
    pub precondition: Precondition,
}

impl MathMethod {
    pub fn return_type(&self) -> Type {
        Type::Primitive(self.ret)
    }
}

const fn m(
    name: &'static str,
    params: &'static [PrimitiveKind],
    ret: PrimitiveKind,
    precondition: Precondition,
) -> MathMethod {
    MathMethod {
        name,
        params,
        ret,
        precondition,
    }
}

/// The deterministic overloads of `java.lang.Math` over `int`, `long`,
/// `float` and `double`. `random()` is left out.
pub const MATH_METHODS: &[MathMethod] = &[
    m("abs", &[I], I, P::None),
    m("abs", &[J], J, P::None),
    m("abs", &[F], F, P::None),
    m("abs", &[D], D, P::None),
    m("max", &[I, I], I, P::None),
    m("max", &[J, J], J, P::None),
    m("max", &[F, F], F, P::None),
    m("max", &[D, D], D, P::None),
    m("min", &[I, I], I, P::None),
    m("min", &[J, J], J, P::None),
    m("min", &[F, F], F, P::None),
    m("min", &[D, D], D, P::None),
    m("sqrt", &[D], D, P::None),
    m("cbrt", &[D], D, P::None),
    m("pow", &[D, D], D, P::None),
    m("exp", &[D], D, P::None),
    m("log", &[D], D, P::None),
    m("log10", &[D], D, P::None),
    m("sin", &[D], D, P::None),
    m("cos", &[D], D, P::None),
    m("tan", &[D], D, P::None),
    m("atan2", &[D, D], D, P::None),
    m("hypot", &[D, D], D, P::None),
    m("floor", &[D], D, P::None),
    m("ceil", &[D], D, P::None),
    m("rint", &[D], D, P::None),
    m("round", &[F], I, P::None),
    m("round", &[D], J, P::None),
    m("signum", &[F], F, P::None),
    m("signum", &[D], D, P::None),
    m("toRadians", &[D], D, P::None),
    m("toDegrees", &[D], D, P::None),
    m("addExact", &[I, I], I, P::AddOverflow),
    m("addExact", &[J, J], J, P::AddOverflow),
    m("subtractExact", &[I, I], I, P::SubtractOverflow),
    m("subtractExact", &[J, J], J, P::SubtractOverflow),
    m("multiplyExact", &[I, I], I, P::MultiplyOverflow),
    m("multiplyExact", &[J, I], J, P::MultiplyOverflow),
    m("multiplyExact", &[J, J], J, P::MultiplyOverflow),
    m("incrementExact", &[I], I, P::IncrementOverflow),
    m("incrementExact", &[J], J, P::IncrementOverflow),
    m("decrementExact", &[I], I, P::DecrementOverflow),
    m("decrementExact", &[J], J, P::DecrementOverflow),
    m("negateExact", &[I], I, P::NegateOverflow),
    m("negateExact", &[J], J, P::NegateOverflow),
    m("toIntExact", &[J], I, P::IntConversion),
    m("floorDiv", &[I, I], I, P::NonZeroDivisor),
    m("floorDiv", &[J, I], J, P::NonZeroDivisor),
    m("floorDiv", &[J, J], J, P::NonZeroDivisor),
    m("floorMod", &[I, I], I, P::NonZeroDivisor),
    m("floorMod", &[J, I], I, P::NonZeroDivisor),
    m("floorMod", &[J, J], J, P::NonZeroDivisor),
];

/// `Integer` or `Long`, whichever bounds a result of `kind`.
fn bounds_class(kind: PrimitiveKind) -> &'static str {
    if kind == PrimitiveKind::Long { "Long" } else { "Integer" }
}

fn min_of(kind: PrimitiveKind) -> Expr {
    Expr::StaticField {
        class: bounds_class(kind),
        name: "MIN_VALUE",
    }
}

fn max_of(kind: PrimitiveKind) -> Expr {
    Expr::StaticField {
        class: bounds_class(kind),
        name: "MAX_VALUE",
    }
}

fn bin(lhs: Expr, op: BinaryOp, rhs: Expr) -> Expr {
    Expr::binary(op, lhs, rhs)
}

/// `lhs op1 mid op2 rhs`, flat.
fn bin3(lhs: Expr, op1: BinaryOp, mid: Expr, op2: BinaryOp, rhs: Expr) -> Expr {
    Expr::Chain {
        first: Box::new(lhs),
        rest: vec![(op1, mid), (op2, rhs)],
    }
}

/// The condition under which `method(args)` cannot throw, or `None` when
/// the method has no precondition or the arguments do not fit it.
pub fn derive_guard(method: &MathMethod, args: &[Expr]) -> Option<Expr> {
    use BinaryOp::*;

    let zero = || Expr::int(0);
    let bound = method.ret;
    let guard = match (method.precondition, args) {
        (Precondition::AddOverflow, [a, b]) => Expr::ternary(
            bin(b.clone(), Gt, zero()),
            bin3(max_of(bound), Sub, b.clone(), Gt, a.clone()),
            bin3(min_of(bound), Sub, b.clone(), Lt, a.clone()),
        ),
        (Precondition::SubtractOverflow, [a, b]) => Expr::ternary(
            bin(b.clone(), Gt, zero()),
            bin3(min_of(bound), Add, b.clone(), Lt, a.clone()),
            bin3(max_of(bound), Add, b.clone(), Gt, a.clone()),
        ),
        (Precondition::MultiplyOverflow, [a, b]) => {
            let abs = |e: Expr| Expr::static_call("Math", "abs", vec![e]);
            Expr::Chain {
                first: Box::new(bin(a.clone(), Eq, zero())),
                rest: vec![
                    (
                        Or,
                        bin(
                            abs(bin(min_of(bound), Div, a.clone())),
                            Gt,
                            abs(b.clone()),
                        ),
                    ),
                    (And, bin(b.clone(), Ne, min_of(bound))),
                ],
            }
        }
        (Precondition::IncrementOverflow, [a]) => bin(a.clone(), Lt, max_of(bound)),
        (Precondition::DecrementOverflow | Precondition::NegateOverflow, [a]) => {
            bin(a.clone(), Gt, min_of(bound))
        }
        (Precondition::IntConversion, [a]) => bin3(
            bin(a.clone(), Le, max_of(PrimitiveKind::Int)),
            And,
            a.clone(),
            Ge,
            min_of(PrimitiveKind::Int),
        ),
        (Precondition::NonZeroDivisor, [_, b]) => bin(b.clone(), Ne, zero()),
        _ => return None,
    };
    Some(guard)
}

impl Session<'_> {
    /// `Math.f(args)` with every argument resolved to its parameter type,
    /// and the guard it needs under the current safety modes.
    fn math_expr(&mut self, method: MethodId, callee: &MathMethod) -> Option<(Expr, Option<Expr>)> {
        let args = callee
            .params
            .iter()
            .map(|&kind| resolve(&self.class, method, &Type::Primitive(kind), &mut self.emit))
            .collect::<Option<Vec<_>>>()?;
        let guard = if callee.precondition.enabled_by(&self.config) {
            let guard = derive_guard(callee, &args);
            if guard.is_none() {
                tracing::trace!(name = callee.name, "no guard derivable");
                return None;
            }
            guard
        } else {
            None
        };
        Some((Expr::static_call("Math", callee.name, args), guard))
    }

    /// `Math.f(args);`, guarded when needed.
    pub fn math_call(&mut self, method: MethodId) -> Option<Stmt> {
        let callee = *MATH_METHODS.choose(&mut self.emit)?;
        let (call, guard) = self.math_expr(method, &callee)?;
        Some(wrap(Stmt::Expr(call), guard))
    }

    /// `dest = Math.f(args);` into a non-final variable that accepts the
    /// return type.
    pub fn assign_math_call(&mut self, method: MethodId, source: DestSource) -> Option<Stmt> {
        let dest = pick_destination(&self.class, method, source, &mut self.emit, |ty| {
            MATH_METHODS.iter().any(|m| ty.is_assignable_from(&m.return_type()))
        })?;
        let candidates: Vec<&MathMethod> = MATH_METHODS
            .iter()
            .filter(|m| dest.ty.is_assignable_from(&m.return_type()))
            .collect();
        let callee = **candidates.choose(&mut self.emit)?;
        let (call, guard) = self.math_expr(method, &callee)?;
        self.note_assignment(method, &dest, guard.is_some());
        Some(wrap(Stmt::assign(dest.name.clone(), call), guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(name: &str, params: &[PrimitiveKind]) -> MathMethod {
        *MATH_METHODS
            .iter()
            .find(|m| m.name == name && m.params == params)
            .unwrap()
    }

    fn ab() -> Vec<Expr> {
        vec![Expr::var("a"), Expr::var("b")]
    }

    #[test]
    fn add_guard() {
        let guard = derive_guard(&find("addExact", &[I, I]), &ab()).unwrap();
        assert_eq!(
            guard.to_string(),
            "b > 0 ? Integer.MAX_VALUE - b > a : Integer.MIN_VALUE - b < a"
        );
    }

    #[test]
    fn subtract_guard() {
        let guard = derive_guard(&find("subtractExact", &[J, J]), &ab()).unwrap();
        assert_eq!(
            guard.to_string(),
            "b > 0 ? Long.MIN_VALUE + b < a : Long.MAX_VALUE + b > a"
        );
    }

    #[test]
    fn multiply_guard() {
        let guard = derive_guard(&find("multiplyExact", &[J, I]), &ab()).unwrap();
        assert_eq!(
            guard.to_string(),
            "a == 0 || Math.abs(Long.MIN_VALUE / a) > Math.abs(b) && b != Long.MIN_VALUE"
        );
    }

    #[test]
    fn unary_guards() {
        let a = vec![Expr::var("a")];
        let inc = derive_guard(&find("incrementExact", &[I]), &a).unwrap();
        assert_eq!(inc.to_string(), "a < Integer.MAX_VALUE");
        let neg = derive_guard(&find("negateExact", &[J]), &a).unwrap();
        assert_eq!(neg.to_string(), "a > Long.MIN_VALUE");
        let conv = derive_guard(&find("toIntExact", &[J]), &a).unwrap();
        assert_eq!(
            conv.to_string(),
            "a <= Integer.MAX_VALUE && a >= Integer.MIN_VALUE"
        );
    }

    #[test]
    fn division_guard() {
        let guard = derive_guard(&find("floorMod", &[J, I]), &ab()).unwrap();
        assert_eq!(guard.to_string(), "b != 0");
    }

    #[test]
    fn no_guard_without_precondition_or_with_wrong_arity() {
        assert!(derive_guard(&find("sqrt", &[D]), &[Expr::var("a")]).is_none());
        assert!(derive_guard(&find("addExact", &[I, I]), &[Expr::var("a")]).is_none());
    }

    #[test]
    fn safety_modes_select_preconditions() {
        let overflow = GenerationConfig {
            no_overflow: true,
            ..GenerationConfig::default()
        };
        assert!(Precondition::AddOverflow.enabled_by(&overflow));
        assert!(!Precondition::NonZeroDivisor.enabled_by(&overflow));
        assert!(!Precondition::None.enabled_by(&overflow));
        let div = GenerationConfig {
            no_div_by_zero: true,
            ..GenerationConfig::default()
        };
        assert!(Precondition::NonZeroDivisor.enabled_by(&div));
        assert!(!Precondition::IntConversion.enabled_by(&div));
    }

    #[test]
    fn table_has_no_random() {
        assert!(MATH_METHODS.iter().all(|m| m.name != "random" && !m.params.is_empty()));
    }
}
