//! Ways of constructing values of reference and array types.

use super::{ArrayType, ClassRef, IntRange, RestrictedInt, Type, TypeError};
use crate::ast::Expr;
use crate::types::Literal;

/// Minimum length of every generated array dimension.
pub const MIN_ARRAY_LENGTH: i32 = 10;

/// Upper bound on generated array dimensions, keeping allocations small.
pub const MAX_ARRAY_LENGTH: i32 = 64;

/// How a [`Builder`] assembles its expression.
#[derive(Debug, Clone, PartialEq)]
pub enum BuilderKind {
    /// The `null` constant.
    Null,
    /// `new C(args...)`.
    Constructor { class: String },
    /// `new T[len0][len1]...`.
    ArrayInit { element: String },
}

/// One way of producing a value of some type: the operand types it needs
/// and how to assemble them.
#[derive(Debug, Clone)]
pub struct Builder {
    kind: BuilderKind,
    requires: Vec<Type>,
}

impl Builder {
    pub fn null() -> Self {
        Self {
            kind: BuilderKind::Null,
            requires: Vec::new(),
        }
    }

    pub fn constructor(class: impl Into<String>, params: Vec<Type>) -> Self {
        Self {
            kind: BuilderKind::Constructor {
                class: class.into(),
            },
            requires: params,
        }
    }

    /// `new T[..]..` with one restricted length per dimension. A dimension
    /// with an access restriction is always long enough to cover it.
    pub fn array_init(array: &ArrayType) -> Self {
        let requires = (0..array.dim())
            .map(|d| {
                let covered = array
                    .restrictions()
                    .and_then(|r| r[d])
                    .map_or(0, |range| range.max.saturating_add(1));
                let min = covered.max(MIN_ARRAY_LENGTH);
                Type::RestrictedInt(RestrictedInt::with_range(IntRange {
                    min,
                    max: min.max(MAX_ARRAY_LENGTH),
                }))
            })
            .collect();
        Self {
            kind: BuilderKind::ArrayInit {
                element: array.inner().source_name(),
            },
            requires,
        }
    }

    pub fn kind(&self) -> &BuilderKind {
        &self.kind
    }

    pub fn is_null(&self) -> bool {
        self.kind == BuilderKind::Null
    }

    /// Operand types, in order.
    pub fn requires(&self) -> &[Type] {
        &self.requires
    }

    /// Assemble the expression from operands matching [`requires`](Self::requires).
    pub fn build(&self, args: Vec<Expr>) -> Result<Expr, TypeError> {
        if args.len() != self.requires.len() {
            return Err(TypeError::BuilderArity {
                ty: format!("{:?}", self.kind),
                expected: self.requires.len(),
                found: args.len(),
            });
        }
        Ok(match &self.kind {
            BuilderKind::Null => Expr::Literal(Literal::Null),
            BuilderKind::Constructor { class } => Expr::New {
                class: class.clone(),
                args,
            },
            BuilderKind::ArrayInit { element } => Expr::NewArray {
                element: element.clone(),
                lengths: args,
            },
        })
    }
}

/// A `dim`-dimensional array of `inner` whose accesses stay within the
/// first [`MIN_ARRAY_LENGTH`] indices of every dimension.
pub fn indexable_array(inner: Type, dim: usize) -> Result<ArrayType, TypeError> {
    let indices = IntRange::new(0, MIN_ARRAY_LENGTH - 1)?;
    ArrayType::new(inner, dim)?.with_restrictions(vec![Some(indices); dim])
}

/// All builders offered by `ty`. Primitives, restricted ints and `void` have
/// none; they are produced as literals.
pub fn builders(ty: &Type) -> Vec<Builder> {
    match ty {
        Type::Text => vec![Builder::null(), Builder::constructor("String", Vec::new())],
        Type::Instance(class) => instance_builders(class),
        Type::Array(array) => vec![Builder::null(), Builder::array_init(array)],
        Type::Primitive(_) | Type::RestrictedInt(_) | Type::Void => Vec::new(),
    }
}

fn instance_builders(class: &ClassRef) -> Vec<Builder> {
    // `new Date()` reads the clock, which would make runs incomparable.
    if class.name == "java.util.Date" {
        return vec![Builder::null(), Builder::constructor(&class.name, vec![Type::LONG])];
    }
    vec![Builder::null(), Builder::constructor(&class.name, Vec::new())]
}
