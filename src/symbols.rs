//! Class-wide symbol table and call graph.
//!
//! [`ClassScope`] owns every field and method of the class being generated.
//! Methods live in an index arena addressed by [`MethodId`]; call edges are
//! index sets on each [`Method`]. Two closures are maintained eagerly on
//! every edge insertion:
//!
//! - `excluded_for_calling`: every method that reaches this one, i.e. every
//!   method this one must never call.
//! - `called_by_this_method`: every method this one reaches.
//!
//! A method is only offered as a callee when it is outside the caller's
//! exclusion set, so the realized call graph stays acyclic and generated
//! programs cannot recurse forever.

use std::collections::BTreeSet;
use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::scope::{Access, MethodScope, Modifiers, Variable};
use crate::types::{ArrayType, Type};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Index of a method in its [`ClassScope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub usize);

/// Name plus parameter descriptors: what the emitter keys fragments by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct MethodSignature {
    pub name: String,
    pub params: Vec<String>,
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.params.join(""))
    }
}

/// The part a method plays in the generated class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodRole {
    /// `public static void main(String[] args)`.
    Main,
    /// The instance entry point `main` drives.
    Run,
    /// The hash reporter called after the runs.
    Hash,
    /// An ordinary generated method; the only kind offered as a callee.
    Generated,
}

// ---------------------------------------------------------------------------
// Method
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub modifiers: Modifiers,
    pub return_type: Type,
    pub role: MethodRole,
    pub scope: MethodScope,
    excluded_for_calling: BTreeSet<MethodId>,
    called_by_this_method: BTreeSet<MethodId>,
    direct_calls: BTreeSet<MethodId>,
}

impl Method {
    pub fn new(
        name: impl Into<String>,
        modifiers: Modifiers,
        return_type: Type,
        params: Vec<(String, Type)>,
        role: MethodRole,
    ) -> Self {
        Self {
            name: name.into(),
            modifiers,
            return_type,
            role,
            scope: MethodScope::new(params),
            excluded_for_calling: BTreeSet::new(),
            called_by_this_method: BTreeSet::new(),
            direct_calls: BTreeSet::new(),
        }
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.is_static
    }

    pub fn signature(&self) -> MethodSignature {
        MethodSignature {
            name: self.name.clone(),
            params: self.scope.params().iter().map(|p| p.ty.descriptor()).collect(),
        }
    }

    /// Methods this one must never call: everything that reaches it.
    pub fn excluded_for_calling(&self) -> &BTreeSet<MethodId> {
        &self.excluded_for_calling
    }

    /// Everything this method reaches, directly or transitively.
    pub fn called_by_this_method(&self) -> &BTreeSet<MethodId> {
        &self.called_by_this_method
    }

    /// Callees registered with this method as the caller.
    pub fn direct_calls(&self) -> &BTreeSet<MethodId> {
        &self.direct_calls
    }
}

// ---------------------------------------------------------------------------
// ClassScope
// ---------------------------------------------------------------------------

/// Fields, methods and call graph of the generated class.
#[derive(Debug, Clone)]
pub struct ClassScope {
    pub name: String,
    fields: Vec<Variable>,
    methods: Vec<Method>,
    main: MethodId,
    run: Option<MethodId>,
}

impl ClassScope {
    /// A class containing only `public static void main(String[] args)`.
    pub fn new(name: impl Into<String>) -> Self {
        let args_ty = ArrayType::new(Type::Text, 1)
            .map(Type::Array)
            .unwrap_or(Type::Text);
        let main = Method::new(
            "main",
            Modifiers {
                access: Access::Public,
                is_static: true,
                is_final: false,
            },
            Type::Void,
            vec![("args".to_string(), args_ty)],
            MethodRole::Main,
        );
        Self {
            name: name.into(),
            fields: Vec::new(),
            methods: vec![main],
            main: MethodId(0),
            run: None,
        }
    }

    pub fn add_field(&mut self, field: Variable) {
        self.fields.push(field);
    }

    pub fn add_method(&mut self, method: Method) -> MethodId {
        let id = MethodId(self.methods.len());
        self.methods.push(method);
        id
    }

    /// Designate the run method. Only the first call has an effect.
    pub fn set_run(&mut self, id: MethodId) -> bool {
        if self.run.is_some() {
            return false;
        }
        self.run = Some(id);
        true
    }

    pub fn main(&self) -> MethodId {
        self.main
    }

    pub fn run(&self) -> Option<MethodId> {
        self.run
    }

    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.0]
    }

    pub fn method_mut(&mut self, id: MethodId) -> &mut Method {
        &mut self.methods[id.0]
    }

    /// Methods in declaration order.
    pub fn methods(&self) -> impl Iterator<Item = (MethodId, &Method)> {
        self.methods.iter().enumerate().map(|(i, m)| (MethodId(i), m))
    }

    pub fn method_by_signature(&self, sig: &MethodSignature) -> Option<MethodId> {
        self.methods().find(|(_, m)| m.signature() == *sig).map(|(id, _)| id)
    }

    pub fn fields(&self) -> &[Variable] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Variable> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Static methods can only see static fields.
    pub fn field_usable_from(&self, field: &Variable, method: MethodId) -> bool {
        field.is_static() || !self.method(method).is_static()
    }

    /// Uniformly pick a field usable from `method` satisfying `pred`.
    pub fn pick_field<R: Rng + ?Sized>(
        &self,
        method: MethodId,
        rng: &mut R,
        pred: impl Fn(&Variable) -> bool,
    ) -> Option<&Variable> {
        let candidates: Vec<&Variable> = self
            .fields
            .iter()
            .filter(|f| self.field_usable_from(f, method) && pred(f))
            .collect();
        candidates.choose(rng).copied()
    }

    /// Uniformly pick a method satisfying `pred`.
    pub fn pick_method<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        pred: impl Fn(MethodId, &Method) -> bool,
    ) -> Option<MethodId> {
        let candidates: Vec<MethodId> = self
            .methods()
            .filter(|(id, m)| pred(*id, m))
            .map(|(id, _)| id)
            .collect();
        candidates.choose(rng).copied()
    }

    /// Whether `caller` may call `callee` without closing a cycle or
    /// leaving static context.
    pub fn can_call(&self, caller: MethodId, callee: MethodId) -> bool {
        let from = self.method(caller);
        let to = self.method(callee);
        to.role == MethodRole::Generated
            && callee != caller
            && !from.excluded_for_calling.contains(&callee)
            && (!from.is_static() || to.is_static())
    }

    /// Generated methods `caller` may call without closing a cycle.
    pub fn callable_methods(&self, caller: MethodId) -> Vec<MethodId> {
        self.methods()
            .map(|(id, _)| id)
            .filter(|&id| self.can_call(caller, id))
            .collect()
    }

    /// Record `caller -> callee` and update both closures.
    ///
    /// Everything at or above `caller` is excluded from everything at or
    /// below `callee`; everything at or below `callee` is reached from
    /// everything at or above `caller`.
    pub fn register_call(&mut self, caller: MethodId, callee: MethodId) {
        let mut upstream = self.method(caller).excluded_for_calling.clone();
        upstream.insert(caller);
        let mut downstream = self.method(callee).called_by_this_method.clone();
        downstream.insert(callee);

        for id in &downstream {
            self.methods[id.0].excluded_for_calling.extend(upstream.iter().copied());
        }
        for id in &upstream {
            self.methods[id.0].called_by_this_method.extend(downstream.iter().copied());
        }
        self.methods[caller.0].direct_calls.insert(callee);
        tracing::trace!(
            caller = %self.method(caller).name,
            callee = %self.method(callee).name,
            "registered call edge"
        );
    }

    /// Resolve `name` as seen from `method`: locals and parameters shadow
    /// fields.
    pub fn lookup_var(&self, method: MethodId, name: &str) -> Option<&Variable> {
        self.method(method)
            .scope
            .lookup(name)
            .or_else(|| self.field(name).filter(|f| self.field_usable_from(f, method)))
    }

    /// Record an assignment to `name` from `method`.
    pub fn mark_initialized(&mut self, method: MethodId, name: &str) {
        if self.method(method).scope.lookup(name).is_some() {
            self.method_mut(method).scope.mark_initialized(name);
        } else if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
            field.set_initialized();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn method(name: &str, is_static: bool) -> Method {
        Method::new(
            name,
            Modifiers {
                is_static,
                ..Modifiers::default()
            },
            Type::INT,
            Vec::new(),
            MethodRole::Generated,
        )
    }

    fn class_with(n: usize) -> (ClassScope, Vec<MethodId>) {
        let mut class = ClassScope::new("Test");
        let ids = (0..n)
            .map(|i| class.add_method(method(&format!("method{i}"), false)))
            .collect();
        (class, ids)
    }

    #[test]
    fn chain_scenario() {
        let (mut class, ids) = class_with(3);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        class.register_call(a, b);
        class.register_call(b, c);
        let callable_c = class.callable_methods(c);
        assert!(!callable_c.contains(&a));
        assert!(!callable_c.contains(&b));
        assert!(class.callable_methods(a).contains(&c));
    }

    #[test]
    fn closure_holds_when_edges_arrive_bottom_up() {
        let (mut class, ids) = class_with(3);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        class.register_call(b, c);
        class.register_call(a, b);
        assert!(!class.callable_methods(c).contains(&a));
        assert!(class.method(a).called_by_this_method().contains(&c));
    }

    #[test]
    fn callee_never_sees_caller() {
        let (mut class, ids) = class_with(2);
        class.register_call(ids[0], ids[1]);
        assert!(!class.callable_methods(ids[1]).contains(&ids[0]));
        assert!(!class.callable_methods(ids[0]).contains(&ids[0]));
    }

    fn reaches(class: &ClassScope, from: MethodId, to: MethodId) -> bool {
        let mut stack: Vec<MethodId> = class.method(from).direct_calls().iter().copied().collect();
        let mut seen = BTreeSet::new();
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if seen.insert(id) {
                stack.extend(class.method(id).direct_calls().iter().copied());
            }
        }
        false
    }

    #[test]
    fn random_edge_sequences_stay_acyclic() {
        for seed in 0..100 {
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            let (mut class, ids) = class_with(8);
            for _ in 0..40 {
                let caller = *ids.choose(&mut rng).unwrap();
                let options = class.callable_methods(caller);
                if let Some(&callee) = options.choose(&mut rng) {
                    class.register_call(caller, callee);
                }
            }
            for &id in &ids {
                assert!(!reaches(&class, id, id), "seed {seed}: cycle through {id:?}");
                for &excluded in class.method(id).excluded_for_calling() {
                    assert!(reaches(&class, excluded, id));
                }
            }
        }
    }

    #[test]
    fn static_callers_see_static_callees_only() {
        let mut class = ClassScope::new("Test");
        let s = class.add_method(method("s", true));
        let i = class.add_method(method("i", false));
        let s2 = class.add_method(method("s2", true));
        assert_eq!(class.callable_methods(s), vec![s2]);
        assert_eq!(class.callable_methods(i), vec![s, s2]);
    }

    #[test]
    fn pick_method_honors_predicate_and_static_context() {
        let mut class = ClassScope::new("Test");
        let s = class.add_method(method("s", true));
        let i = class.add_method(method("i", false));
        let s2 = class.add_method(method("s2", true));
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let picked = class.pick_method(&mut rng, |id, m| id != class.main() && !m.is_static());
            assert_eq!(picked, Some(i));
            let from_static = class.pick_method(&mut rng, |id, _| class.can_call(s, id));
            assert_eq!(from_static, Some(s2));
        }
        assert_eq!(class.pick_method(&mut rng, |_, m| m.name == "missing"), None);

        class.register_call(i, s);
        let seen: BTreeSet<MethodId> = (0..100)
            .filter_map(|_| class.pick_method(&mut rng, |id, _| class.can_call(i, id)))
            .collect();
        assert_eq!(seen, BTreeSet::from([s, s2]));
        assert_eq!(class.pick_method(&mut rng, |id, _| class.can_call(s, id)), Some(s2));
        assert!(!class.can_call(s, i));
        assert!(!class.can_call(s, class.main()));
    }

    #[test]
    fn main_and_run_are_not_callees() {
        let (mut class, ids) = class_with(1);
        let run = class.add_method(Method::new(
            "run",
            Modifiers::default(),
            Type::Void,
            Vec::new(),
            MethodRole::Run,
        ));
        assert!(class.set_run(run));
        assert!(!class.set_run(ids[0]));
        assert_eq!(class.run(), Some(run));
        assert_eq!(class.callable_methods(run), ids);
        assert!(!class.callable_methods(ids[0]).contains(&class.main()));
    }

    #[test]
    fn static_methods_do_not_see_instance_fields() {
        let mut class = ClassScope::new("Test");
        let s = class.add_method(method("s", true));
        class.add_field(Variable::field("a", Type::INT, Modifiers::default(), true));
        assert!(class.lookup_var(s, "a").is_none());
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        assert!(class.pick_field(s, &mut rng, |_| true).is_none());
    }

    #[test]
    fn signature_uses_descriptors() {
        let class = ClassScope::new("Test");
        let sig = class.method(class.main()).signature();
        assert_eq!(sig.to_string(), "main([Ljava/lang/String;)");
        assert_eq!(class.method_by_signature(&sig), Some(class.main()));
    }
}
