//! The type lattice of generated programs.
//!
//! [`Type`] is a closed sum over every value type the generator can produce.
//! Equality and hashing go through [`Type::descriptor`], a canonical string
//! that is stable for the whole run. Assignability follows the target
//! language: one-way primitive widening along `byte/short/char -> int -> long`
//! and `float -> double`, nominal subtyping for instances, exact descriptor
//! match for arrays, and set inclusion for restricted ints.

mod array;
mod builder;
mod literal;
mod restricted;

use std::fmt;
use std::hash::{Hash, Hasher};

use thiserror::Error;

pub use array::ArrayType;
pub use builder::{
    Builder, BuilderKind, MAX_ARRAY_LENGTH, MIN_ARRAY_LENGTH, builders, indexable_array,
};
pub use literal::{
    Literal, nonzero_literal, random_literal, random_primitive_literal, random_text_literal,
};
pub use restricted::{IntRange, RestrictedInt};

/// Invalid type construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("array dimension must be positive")]
    ZeroDimension,
    #[error("array element type cannot be `{0}`")]
    InvalidElement(String),
    #[error("array restrictions cover {found} dimensions, expected {expected}")]
    RestrictionArity { expected: usize, found: usize },
    #[error("restricted int needs a range or at least one inclusion")]
    UnconstrainedRestrictedInt,
    #[error("empty range [{min},{max}]")]
    EmptyRange { min: i32, max: i32 },
    #[error("builder for `{ty}` expects {expected} operands, got {found}")]
    BuilderArity {
        ty: String,
        expected: usize,
        found: usize,
    },
}

// ---------------------------------------------------------------------------
// PrimitiveKind
// ---------------------------------------------------------------------------

/// The eight JVM primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Char,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
        PrimitiveKind::Boolean,
        PrimitiveKind::Char,
    ];

    /// Operand types of arithmetic operator statements.
    pub const ARITHMETIC: [PrimitiveKind; 6] = [
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    /// Operand types of bitwise operator statements.
    pub const BITWISE: [PrimitiveKind; 3] =
        [PrimitiveKind::Byte, PrimitiveKind::Short, PrimitiveKind::Int];

    /// Source-level keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Char => "char",
        }
    }

    /// JVM descriptor character.
    pub fn descriptor_char(self) -> char {
        match self {
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Double => 'D',
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Char => 'C',
        }
    }

    /// Kinds whose values widen to `self` without a cast, including `self`.
    pub fn widening_sources(self) -> &'static [PrimitiveKind] {
        use PrimitiveKind::*;
        match self {
            Byte => &[Byte],
            Short => &[Byte, Short],
            Int => &[Byte, Short, Char, Int],
            Long => &[Byte, Short, Char, Int, Long],
            Float => &[Float],
            Double => &[Float, Double],
            Boolean => &[Boolean],
            Char => &[Char],
        }
    }

    /// `self = source` is legal without a cast.
    pub fn widens_from(self, source: PrimitiveKind) -> bool {
        self.widening_sources().contains(&source)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ClassRef
// ---------------------------------------------------------------------------

/// A nominal class reference with its ancestor chain resolved up front.
#[derive(Debug, Clone)]
pub struct ClassRef {
    /// Fully qualified dotted name, e.g. `java.util.Date`.
    pub name: String,
    /// Superclasses and interfaces, nearest first.
    pub ancestors: Vec<String>,
}

impl ClassRef {
    pub fn new(name: impl Into<String>, ancestors: Vec<String>) -> Self {
        Self {
            name: name.into(),
            ancestors,
        }
    }

    pub fn object() -> Self {
        Self::new("java.lang.Object", Vec::new())
    }

    pub fn date() -> Self {
        Self::new(
            "java.util.Date",
            vec![
                "java.lang.Object".to_string(),
                "java.io.Serializable".to_string(),
                "java.lang.Cloneable".to_string(),
                "java.lang.Comparable".to_string(),
            ],
        )
    }

    /// The simple name used in generated source.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Whether a value of class `other` may be stored in a `self` slot.
    pub fn is_supertype_of(&self, other: &ClassRef) -> bool {
        self.name == other.name || other.ancestors.iter().any(|a| *a == self.name)
    }
}

// ---------------------------------------------------------------------------
// Type
// ---------------------------------------------------------------------------

/// Every value type a generated program can mention.
#[derive(Debug, Clone)]
pub enum Type {
    Primitive(PrimitiveKind),
    /// `java.lang.String`.
    Text,
    Instance(ClassRef),
    Array(ArrayType),
    RestrictedInt(RestrictedInt),
    Void,
}

impl Type {
    pub const INT: Type = Type::Primitive(PrimitiveKind::Int);
    pub const LONG: Type = Type::Primitive(PrimitiveKind::Long);
    pub const BOOLEAN: Type = Type::Primitive(PrimitiveKind::Boolean);

    pub fn date() -> Type {
        Type::Instance(ClassRef::date())
    }

    /// Canonical descriptor used for equality and hashing.
    pub fn descriptor(&self) -> String {
        match self {
            Type::Primitive(kind) => kind.descriptor_char().to_string(),
            Type::Text => "Ljava/lang/String;".to_string(),
            Type::Instance(class) => format!("L{};", class.name.replace('.', "/")),
            Type::Array(array) => array.descriptor(),
            Type::RestrictedInt(r) => r.descriptor(),
            Type::Void => "V".to_string(),
        }
    }

    /// The type as written in generated source.
    pub fn source_name(&self) -> String {
        match self {
            Type::Primitive(kind) => kind.as_str().to_string(),
            Type::Text => "String".to_string(),
            Type::Instance(class) => class.name.clone(),
            Type::Array(array) => array.source_name(),
            Type::RestrictedInt(_) => "int".to_string(),
            Type::Void => "void".to_string(),
        }
    }

    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self {
            Type::Primitive(kind) => Some(*kind),
            Type::RestrictedInt(_) => Some(PrimitiveKind::Int),
            _ => None,
        }
    }

    /// Primitive, non-boolean: may appear on either side of a numeric cast.
    pub fn is_castable_primitive(&self) -> bool {
        self.as_primitive().is_some_and(|k| k != PrimitiveKind::Boolean)
    }

    /// `self = source` is legal without a cast.
    pub fn is_assignable_from(&self, source: &Type) -> bool {
        match (self, source) {
            (Type::Void, _) | (_, Type::Void) => false,
            (Type::Primitive(target), Type::Primitive(src)) => target.widens_from(*src),
            // A restricted int is an `int` at runtime.
            (Type::Primitive(target), Type::RestrictedInt(_)) => {
                target.widens_from(PrimitiveKind::Int)
            }
            (Type::RestrictedInt(target), Type::RestrictedInt(src)) => {
                target.is_assignable_from(src)
            }
            (Type::Text, Type::Text) => true,
            (Type::Instance(target), Type::Text) => target.name == "java.lang.Object",
            (Type::Instance(target), Type::Instance(src)) => target.is_supertype_of(src),
            (Type::Instance(target), Type::Array(_)) => target.name == "java.lang.Object",
            (Type::Array(target), Type::Array(src)) => target.descriptor() == src.descriptor(),
            _ => false,
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor() == other.descriptor()
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.descriptor().hash(state);
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source_name())
    }
}

impl From<PrimitiveKind> for Type {
    fn from(kind: PrimitiveKind) -> Self {
        Type::Primitive(kind)
    }
}
