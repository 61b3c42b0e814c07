//! Random literal synthesis.

use rand::Rng;
use rand::seq::SliceRandom;

use super::{PrimitiveKind, Type, builders};
use crate::ast::Expr;

/// Characters drawn for `char` and string literals.
const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Strings are shorter than this.
const MAX_TEXT_LEN: usize = 20;

/// Chance that a reference-typed literal is `null` rather than constructed.
const NULL_PROBABILITY: f64 = 0.25;

/// Magnitude bound for integral `int`/`long` literals.
const INTEGRAL_BOUND: i64 = 1_000_000;

/// A source-level constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Char(char),
    Text(String),
    Null,
}

impl Literal {
    pub fn is_zero(&self) -> bool {
        match self {
            Literal::Byte(v) => *v == 0,
            Literal::Short(v) => *v == 0,
            Literal::Int(v) => *v == 0,
            Literal::Long(v) => *v == 0,
            Literal::Float(v) => *v == 0.0,
            Literal::Double(v) => *v == 0.0,
            Literal::Char(c) => *c == '\0',
            Literal::Boolean(_) | Literal::Text(_) | Literal::Null => false,
        }
    }

    /// Source text of the constant.
    pub fn render(&self) -> String {
        match self {
            Literal::Byte(v) => format!("(byte){v}"),
            Literal::Short(v) => format!("(short){v}"),
            Literal::Int(v) => v.to_string(),
            Literal::Long(v) => format!("{v}L"),
            Literal::Float(v) => format!("{v}f"),
            Literal::Double(v) => format!("{v}d"),
            Literal::Boolean(v) => v.to_string(),
            Literal::Char(c) => format!("'{c}'"),
            Literal::Text(s) => format!("\"{s}\""),
            Literal::Null => "null".to_string(),
        }
    }
}

/// A random constant of a primitive kind. `nonzero` excludes zero, for
/// divisors.
pub fn random_primitive_literal<R: Rng + ?Sized>(
    kind: PrimitiveKind,
    nonzero: bool,
    rng: &mut R,
) -> Literal {
    loop {
        let lit = match kind {
            PrimitiveKind::Byte => Literal::Byte(rng.gen_range(i8::MIN..=i8::MAX)),
            PrimitiveKind::Short => Literal::Short(rng.gen_range(-1000..=1000)),
            PrimitiveKind::Int => Literal::Int(rng.gen_range(-INTEGRAL_BOUND..=INTEGRAL_BOUND) as i32),
            PrimitiveKind::Long => Literal::Long(rng.gen_range(-INTEGRAL_BOUND..=INTEGRAL_BOUND) * 1000),
            // Two decimals keep the rendered text short and exact.
            PrimitiveKind::Float => Literal::Float(rng.gen_range(-100_000..=100_000) as f32 / 100.0),
            PrimitiveKind::Double => {
                Literal::Double(rng.gen_range(-10_000_000..=10_000_000) as f64 / 100.0)
            }
            PrimitiveKind::Boolean => Literal::Boolean(rng.gen_bool(0.5)),
            PrimitiveKind::Char => Literal::Char(random_char(rng)),
        };
        if !nonzero || !lit.is_zero() {
            return lit;
        }
    }
}

/// A non-zero numeric constant of `kind`.
pub fn nonzero_literal<R: Rng + ?Sized>(kind: PrimitiveKind, rng: &mut R) -> Literal {
    random_primitive_literal(kind, true, rng)
}

/// A random value expression of `ty`.
///
/// Primitives and text yield constants; restricted ints sample an admissible
/// value; reference and array types go through one of their builders with
/// recursively synthesized operands. `None` for `void` and for restricted
/// ints that admit no value.
pub fn random_literal<R: Rng + ?Sized>(ty: &Type, rng: &mut R) -> Option<Expr> {
    match ty {
        Type::Void => None,
        Type::Primitive(kind) => Some(Expr::Literal(random_primitive_literal(*kind, false, rng))),
        Type::RestrictedInt(r) => r.sample(rng).map(|v| Expr::Literal(Literal::Int(v))),
        Type::Text => {
            if rng.gen_bool(NULL_PROBABILITY) {
                return Some(Expr::Literal(Literal::Null));
            }
            Some(Expr::Literal(random_text_literal(rng)))
        }
        Type::Instance(_) | Type::Array(_) => {
            let options = builders(ty);
            let constructed: Vec<_> = options.iter().filter(|b| !b.is_null()).collect();
            let builder = if constructed.is_empty() || rng.gen_bool(NULL_PROBABILITY) {
                options.iter().find(|b| b.is_null())?
            } else {
                constructed.choose(rng).copied()?
            };
            let args = builder
                .requires()
                .iter()
                .map(|t| random_literal(t, rng))
                .collect::<Option<Vec<_>>>()?;
            builder.build(args).ok()
        }
    }
}

/// A non-null string constant.
pub fn random_text_literal<R: Rng + ?Sized>(rng: &mut R) -> Literal {
    let len = rng.gen_range(0..MAX_TEXT_LEN);
    Literal::Text((0..len).map(|_| random_char(rng)).collect())
}

fn random_char<R: Rng + ?Sized>(rng: &mut R) -> char {
    char::from(ALPHANUMERIC[rng.gen_range(0..ALPHANUMERIC.len())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArrayType;
    use rand::SeedableRng;

    #[test]
    fn nonzero_literals_are_never_zero() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        for kind in PrimitiveKind::ARITHMETIC {
            for _ in 0..500 {
                assert!(!nonzero_literal(kind, &mut rng).is_zero());
            }
        }
    }

    #[test]
    fn rendering_matches_source_syntax() {
        assert_eq!(Literal::Byte(-5).render(), "(byte)-5");
        assert_eq!(Literal::Long(12).render(), "12L");
        assert_eq!(Literal::Float(1.25).render(), "1.25f");
        assert_eq!(Literal::Double(3.0).render(), "3d");
        assert_eq!(Literal::Char('x').render(), "'x'");
        assert_eq!(Literal::Text("ab".into()).render(), "\"ab\"");
    }

    #[test]
    fn void_has_no_literal() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        assert!(random_literal(&Type::Void, &mut rng).is_none());
    }

    #[test]
    fn text_literals_are_short_alphanumeric() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        for _ in 0..200 {
            match random_literal(&Type::Text, &mut rng) {
                Some(Expr::Literal(Literal::Text(s))) => {
                    assert!(s.len() < MAX_TEXT_LEN);
                    assert!(s.bytes().all(|b| b.is_ascii_alphanumeric()));
                }
                Some(Expr::Literal(Literal::Null)) => {}
                other => panic!("unexpected text literal {other:?}"),
            }
        }
    }

    #[test]
    fn array_literals_have_safe_lengths() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let ty = Type::Array(ArrayType::new(Type::INT, 3).unwrap());
        let mut constructed = 0;
        for _ in 0..300 {
            if let Some(Expr::NewArray { lengths, .. }) = random_literal(&ty, &mut rng) {
                constructed += 1;
                assert_eq!(lengths.len(), 3);
                for len in lengths {
                    let Expr::Literal(Literal::Int(v)) = len else {
                        panic!("length is not an int literal: {len:?}");
                    };
                    assert!(v >= crate::types::MIN_ARRAY_LENGTH);
                }
            }
        }
        assert!(constructed > 0);
    }
}
