//! Value and destination selection.
//!
//! [`resolve`] answers "give me an expression of type T usable in this
//! method": an initialized field, an initialized local or parameter, or a
//! fresh literal, tried in that spirit with the two variable tiers in a
//! per-call random order. Destinations are picked separately through
//! [`pick_destination`].

use rand::Rng;
use rand::seq::SliceRandom;

use crate::ast::Expr;
use crate::scope::Variable;
use crate::symbols::{ClassScope, MethodId};
use crate::types::{Type, random_literal};

/// Which table an assignment target comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestSource {
    Field,
    Local,
}

/// A chosen assignment target.
#[derive(Debug, Clone)]
pub struct Destination {
    pub name: String,
    pub ty: Type,
    pub is_field: bool,
}

impl From<&Variable> for Destination {
    fn from(var: &Variable) -> Self {
        Self {
            name: var.name.clone(),
            ty: var.ty.clone(),
            is_field: var.is_field(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Tier {
    Field,
    Local,
}

/// An expression of type `ty` usable from `method`, or `None` when neither a
/// variable nor a literal can be produced.
pub fn resolve<R: Rng + ?Sized>(
    class: &ClassScope,
    method: MethodId,
    ty: &Type,
    rng: &mut R,
) -> Option<Expr> {
    if *ty == Type::Void {
        return None;
    }
    let mut tiers = [Tier::Field, Tier::Local];
    tiers.shuffle(rng);
    for tier in tiers {
        let found = match tier {
            Tier::Field => class.pick_field(method, rng, |f| {
                f.is_initialized() && ty.is_assignable_from(&f.ty)
            }),
            Tier::Local => class.method(method).scope.pick_initialized_compatible(ty, rng),
        };
        if let Some(var) = found {
            return Some(read_as(var, ty));
        }
    }
    let literal = random_literal(ty, rng);
    if literal.is_none() {
        tracing::trace!(%ty, "no value for type");
    }
    literal
}

/// `var`, cast to `ty` when the types differ so overloads resolve exactly.
fn read_as(var: &Variable, ty: &Type) -> Expr {
    if var.ty == *ty {
        Expr::var(&var.name)
    } else {
        Expr::cast(ty.source_name(), Expr::var(&var.name))
    }
}

/// Uniform pick over every field usable from `method` and every visible
/// local or parameter satisfying `pred`.
pub fn pick_variable<'c, R: Rng + ?Sized>(
    class: &'c ClassScope,
    method: MethodId,
    rng: &mut R,
    pred: impl Fn(&Variable) -> bool,
) -> Option<&'c Variable> {
    let candidates: Vec<&Variable> = class
        .fields()
        .iter()
        .filter(|f| class.field_usable_from(f, method))
        .chain(class.method(method).scope.visible())
        .filter(|v| pred(v))
        .collect();
    candidates.choose(rng).copied()
}

/// An initialized variable of exactly `ty`.
pub fn pick_initialized_of_type<'c, R: Rng + ?Sized>(
    class: &'c ClassScope,
    method: MethodId,
    ty: &Type,
    rng: &mut R,
) -> Option<&'c Variable> {
    pick_variable(class, method, rng, |v| v.is_initialized() && v.ty == *ty)
}

/// A non-final assignment target from `source` whose type satisfies
/// `accepts`.
pub fn pick_destination<R: Rng + ?Sized>(
    class: &ClassScope,
    method: MethodId,
    source: DestSource,
    rng: &mut R,
    accepts: impl Fn(&Type) -> bool,
) -> Option<Destination> {
    let found = match source {
        DestSource::Field => class.pick_field(method, rng, |f| !f.is_final() && accepts(&f.ty)),
        DestSource::Local => class
            .method(method)
            .scope
            .pick_matching(rng, |v| !v.is_final() && accepts(&v.ty)),
    };
    if found.is_none() {
        tracing::trace!(?source, "no destination");
    }
    found.map(Destination::from)
}
