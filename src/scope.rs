//! Variables and the per-method scope.
//!
//! A [`MethodScope`] owns a method's parameters and locals. Locals are
//! block-scoped: the control-flow engine calls
//! [`enter_block`](MethodScope::enter_block) and
//! [`exit_block`](MethodScope::exit_block) around every compound body, and
//! locals declared inside disappear when their block closes.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::types::Type;

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

/// Access level of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    Package,
    Public,
    Protected,
    Private,
}

impl Access {
    pub const ALL: [Access; 4] = [Access::Package, Access::Public, Access::Protected, Access::Private];

    pub fn keyword(self) -> Option<&'static str> {
        match self {
            Access::Package => None,
            Access::Public => Some("public"),
            Access::Protected => Some("protected"),
            Access::Private => Some("private"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub access: Access,
    pub is_static: bool,
    pub is_final: bool,
}

impl Modifiers {
    /// Source prefix, e.g. `"private static final "`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(kw) = self.access.keyword() {
            out.push_str(kw);
            out.push(' ');
        }
        if self.is_static {
            out.push_str("static ");
        }
        if self.is_final {
            out.push_str("final ");
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Variable
// ---------------------------------------------------------------------------

/// Where a variable is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Field,
    Param,
    Local,
}

/// A field, parameter, or local.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub ty: Type,
    pub modifiers: Modifiers,
    pub kind: VarKind,
    initialized: bool,
    /// Block nesting level of the declaration; always 0 for fields and
    /// parameters.
    block_depth: usize,
}

impl Variable {
    pub fn field(name: impl Into<String>, ty: Type, modifiers: Modifiers, initialized: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            modifiers,
            kind: VarKind::Field,
            initialized,
            block_depth: 0,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_final(&self) -> bool {
        self.modifiers.is_final
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.is_static
    }

    pub fn is_field(&self) -> bool {
        self.kind == VarKind::Field
    }

    /// Record the first assignment. The flag never reverts.
    pub(crate) fn set_initialized(&mut self) {
        self.initialized = true;
    }
}

// ---------------------------------------------------------------------------
// MethodScope
// ---------------------------------------------------------------------------

/// Parameters and block-scoped locals of one method.
#[derive(Debug, Clone, Default)]
pub struct MethodScope {
    params: Vec<Variable>,
    locals: Vec<Variable>,
    /// `locals.len()` at each open block's entry.
    blocks: Vec<usize>,
}

impl MethodScope {
    pub fn new(params: Vec<(String, Type)>) -> Self {
        let params = params
            .into_iter()
            .map(|(name, ty)| Variable {
                name,
                ty,
                modifiers: Modifiers::default(),
                kind: VarKind::Param,
                initialized: true,
                block_depth: 0,
            })
            .collect();
        Self {
            params,
            locals: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn params(&self) -> &[Variable] {
        &self.params
    }

    /// Locals currently in scope, in declaration order.
    pub fn locals(&self) -> &[Variable] {
        &self.locals
    }

    /// Current block nesting level.
    pub fn depth(&self) -> usize {
        self.blocks.len()
    }

    /// Declare a local in the current block.
    pub fn add_local(&mut self, name: impl Into<String>, ty: Type, is_final: bool, initialized: bool) {
        self.locals.push(Variable {
            name: name.into(),
            ty,
            modifiers: Modifiers {
                is_final,
                ..Modifiers::default()
            },
            kind: VarKind::Local,
            initialized,
            block_depth: self.blocks.len(),
        });
    }

    pub fn enter_block(&mut self) {
        self.blocks.push(self.locals.len());
    }

    /// Close the innermost block, dropping the locals it declared.
    pub fn exit_block(&mut self) {
        if let Some(mark) = self.blocks.pop() {
            self.locals.truncate(mark);
        }
    }

    /// Parameters then locals.
    pub fn visible(&self) -> impl Iterator<Item = &Variable> {
        self.params.iter().chain(self.locals.iter())
    }

    pub fn lookup(&self, name: &str) -> Option<&Variable> {
        self.locals
            .iter()
            .rev()
            .chain(self.params.iter())
            .find(|v| v.name == name)
    }

    /// Mark a local or parameter as assigned.
    ///
    /// A local declared outside the current block is only definitely assigned
    /// after the block if every path assigns it, so it keeps its state.
    /// Returns whether the flag is now set.
    pub fn mark_initialized(&mut self, name: &str) -> bool {
        let depth = self.blocks.len();
        let Some(var) = self.locals.iter_mut().rev().find(|v| v.name == name) else {
            return self.params.iter().any(|p| p.name == name);
        };
        if var.block_depth == depth {
            var.set_initialized();
        }
        var.initialized
    }

    /// Uniformly pick a visible variable satisfying `pred`.
    pub fn pick_matching<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        pred: impl Fn(&Variable) -> bool,
    ) -> Option<&Variable> {
        let candidates: Vec<&Variable> = self.visible().filter(|v| pred(v)).collect();
        candidates.choose(rng).copied()
    }

    /// A non-final variable of exactly `ty`.
    pub fn pick_non_final_of_type<R: Rng + ?Sized>(&self, ty: &Type, rng: &mut R) -> Option<&Variable> {
        self.pick_matching(rng, |v| !v.is_final() && v.ty == *ty)
    }

    /// An initialized variable of exactly `ty`.
    pub fn pick_initialized_of_type<R: Rng + ?Sized>(&self, ty: &Type, rng: &mut R) -> Option<&Variable> {
        self.pick_matching(rng, |v| v.is_initialized() && v.ty == *ty)
    }

    /// An initialized variable whose value can be used where `ty` is expected.
    pub fn pick_initialized_compatible<R: Rng + ?Sized>(
        &self,
        ty: &Type,
        rng: &mut R,
    ) -> Option<&Variable> {
        self.pick_matching(rng, |v| v.is_initialized() && ty.is_assignable_from(&v.ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrimitiveKind;
    use rand::SeedableRng;

    fn scope() -> MethodScope {
        let mut s = MethodScope::new(vec![("p0".into(), Type::LONG)]);
        s.add_local("a", Type::INT, false, true);
        s.add_local("b", Type::INT, true, true);
        s.add_local("c", Type::Primitive(PrimitiveKind::Short), false, false);
        s
    }

    #[test]
    fn predicate_queries() {
        let s = scope();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let v = s.pick_non_final_of_type(&Type::INT, &mut rng).unwrap();
            assert_eq!(v.name, "a");
            let v = s.pick_initialized_compatible(&Type::LONG, &mut rng).unwrap();
            assert!(["a", "b", "p0"].contains(&v.name.as_str()));
        }
        assert!(
            s.pick_initialized_of_type(&Type::Primitive(PrimitiveKind::Short), &mut rng)
                .is_none()
        );
    }

    #[test]
    fn block_locals_go_out_of_scope() {
        let mut s = scope();
        s.enter_block();
        s.add_local("d", Type::INT, false, true);
        assert!(s.lookup("d").is_some());
        s.exit_block();
        assert!(s.lookup("d").is_none());
        assert!(s.lookup("a").is_some());
    }

    #[test]
    fn assignment_inside_block_does_not_initialize_outer_local() {
        let mut s = scope();
        s.enter_block();
        assert!(!s.mark_initialized("c"));
        s.exit_block();
        assert!(!s.lookup("c").unwrap().is_initialized());
        assert!(s.mark_initialized("c"));
        assert!(s.lookup("c").unwrap().is_initialized());
    }

    #[test]
    fn params_are_initialized() {
        let s = scope();
        assert!(s.lookup("p0").unwrap().is_initialized());
        assert_eq!(s.params().len(), 1);
    }

    #[test]
    fn modifiers_render_in_order() {
        let m = Modifiers {
            access: Access::Private,
            is_static: true,
            is_final: true,
        };
        assert_eq!(m.render(), "private static final ");
        assert_eq!(Modifiers::default().render(), "");
    }
}
