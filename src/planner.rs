//! Plan phase: the class skeleton.
//!
//! The planner decides every declaration of the generated class before any
//! body is filled:
//! - fields with random types, modifiers and optional initializers
//! - generated methods with random modifiers, return types and parameters
//! - the private `run()` entry point and the `computeHash()` reporter
//!
//! Bodies are left to the driver, so a method may call any other planned
//! method regardless of declaration order.

use rand::Rng;

use crate::emitter::FieldDecl;
use crate::names::{NameGen, param_name};
use crate::scope::{Access, Modifiers, Variable};
use crate::symbols::{ClassScope, Method, MethodId, MethodRole};
use crate::types::{PrimitiveKind, Type, indexable_array, random_literal};

/// Name of the instance entry point `main` calls once per run.
pub const RUN_METHOD: &str = "run";

/// Name of the method printing the final field hash.
pub const HASH_METHOD: &str = "computeHash";

/// Configuration for the planning phase.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Number of fields (range).
    pub fields: (usize, usize),
    /// Number of generated methods besides `run` (range).
    pub methods: (usize, usize),
    /// Number of parameters per generated method (range).
    pub params_per_method: (usize, usize),
    /// Probability (0.0-1.0) that a field or method is static.
    pub static_probability: f64,
    /// Probability (0.0-1.0) that a field is final. Final fields always
    /// get an initializer.
    pub final_field_probability: f64,
    /// Probability (0.0-1.0) that a non-final field gets an initializer.
    pub field_init_probability: f64,
    /// Probability (0.0-1.0) that a generated method returns `void`.
    pub void_probability: f64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            fields: (3, 8),
            methods: (2, 6),
            params_per_method: (0, 3),
            static_probability: 0.3,
            final_field_probability: 0.2,
            field_init_probability: 0.6,
            void_probability: 0.3,
        }
    }
}

/// The planned class: symbol table plus the field declarations (with
/// initializers) the emitter needs.
#[derive(Debug, Clone)]
pub struct PlannedClass {
    pub scope: ClassScope,
    pub fields: Vec<FieldDecl>,
    /// Generated methods in declaration order.
    pub generated: Vec<MethodId>,
    pub run: MethodId,
    pub hash: MethodId,
}

/// A random field, local or parameter type: mostly primitives, sometimes
/// `String`, `Date` or an array of up to three dimensions.
pub fn random_type<R: Rng + ?Sized>(rng: &mut R) -> Type {
    match rng.gen_range(0..10) {
        0..=6 => random_primitive(rng),
        7 => Type::Text,
        8 => Type::date(),
        _ => {
            let inner = if rng.gen_bool(0.8) {
                random_primitive(rng)
            } else {
                Type::Text
            };
            let dim = rng.gen_range(1..=3);
            match indexable_array(inner.clone(), dim) {
                Ok(array) => Type::Array(array),
                Err(_) => inner,
            }
        }
    }
}

fn random_primitive<R: Rng + ?Sized>(rng: &mut R) -> Type {
    Type::Primitive(PrimitiveKind::ALL[rng.gen_range(0..PrimitiveKind::ALL.len())])
}

fn random_access<R: Rng + ?Sized>(rng: &mut R) -> Access {
    Access::ALL[rng.gen_range(0..Access::ALL.len())]
}

/// Plan the class `class_name`.
pub fn plan<R: Rng + ?Sized>(
    rng: &mut R,
    config: &PlanConfig,
    class_name: &str,
    names: &mut NameGen,
) -> PlannedClass {
    let mut scope = ClassScope::new(class_name);

    let field_count = in_range(rng, config.fields);
    let mut fields = Vec::with_capacity(field_count);
    for _ in 0..field_count {
        let decl = plan_field(rng, config, names);
        scope.add_field(Variable::field(
            decl.name.clone(),
            decl.ty.clone(),
            decl.modifiers,
            decl.init.is_some(),
        ));
        fields.push(decl);
    }

    let private_instance = Modifiers {
        access: Access::Private,
        is_static: false,
        is_final: false,
    };
    let run = scope.add_method(Method::new(
        RUN_METHOD,
        private_instance,
        Type::Void,
        Vec::new(),
        MethodRole::Run,
    ));
    scope.set_run(run);

    let method_count = in_range(rng, config.methods);
    let generated = (0..method_count)
        .map(|_| {
            let method = plan_method(rng, config, names);
            scope.add_method(method)
        })
        .collect();

    let hash = scope.add_method(Method::new(
        HASH_METHOD,
        private_instance,
        Type::Void,
        Vec::new(),
        MethodRole::Hash,
    ));

    tracing::debug!(
        class = class_name,
        fields = field_count,
        methods = method_count,
        "planned class"
    );

    PlannedClass {
        scope,
        fields,
        generated,
        run,
        hash,
    }
}

fn plan_field<R: Rng + ?Sized>(rng: &mut R, config: &PlanConfig, names: &mut NameGen) -> FieldDecl {
    let ty = random_type(rng);
    let mut modifiers = Modifiers {
        access: random_access(rng),
        is_static: rng.gen_bool(config.static_probability),
        is_final: rng.gen_bool(config.final_field_probability),
    };
    let init = if modifiers.is_final || rng.gen_bool(config.field_init_probability) {
        random_literal(&ty, rng)
    } else {
        None
    };
    if init.is_none() {
        modifiers.is_final = false;
    }
    FieldDecl {
        modifiers,
        ty,
        name: names.var(),
        init,
    }
}

fn plan_method<R: Rng + ?Sized>(rng: &mut R, config: &PlanConfig, names: &mut NameGen) -> Method {
    let modifiers = Modifiers {
        access: random_access(rng),
        is_static: rng.gen_bool(config.static_probability),
        is_final: false,
    };
    let return_type = if rng.gen_bool(config.void_probability) {
        Type::Void
    } else {
        random_type(rng)
    };
    let params = (0..in_range(rng, config.params_per_method))
        .map(|i| (param_name(i), random_type(rng)))
        .collect();
    Method::new(names.method(), modifiers, return_type, params, MethodRole::Generated)
}

fn in_range<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (usize, usize)) -> usize {
    if lo >= hi { lo } else { rng.gen_range(lo..=hi) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn planned(seed: u64) -> PlannedClass {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut names = NameGen::default();
        plan(&mut rng, &PlanConfig::default(), "Planned", &mut names)
    }

    #[test]
    fn final_fields_have_initializers() {
        for seed in 0..50 {
            let class = planned(seed);
            for field in &class.fields {
                if field.modifiers.is_final {
                    assert!(field.init.is_some(), "seed {seed}: {}", field.name);
                }
            }
        }
    }

    #[test]
    fn field_initialization_follows_initializer() {
        let class = planned(42);
        for decl in &class.fields {
            let var = class.scope.field(&decl.name).unwrap();
            assert_eq!(var.is_initialized(), decl.init.is_some());
        }
    }

    #[test]
    fn run_and_hash_are_private_instance_methods() {
        let class = planned(42);
        assert_eq!(class.scope.run(), Some(class.run));
        for id in [class.run, class.hash] {
            let method = class.scope.method(id);
            assert!(!method.is_static());
            assert_eq!(method.modifiers.access, Access::Private);
            assert_eq!(method.return_type, Type::Void);
        }
        assert_eq!(class.scope.method(class.hash).name, HASH_METHOD);
    }

    #[test]
    fn signatures_are_unique() {
        for seed in 0..20 {
            let class = planned(seed);
            let sigs: HashSet<_> = class.scope.methods().map(|(_, m)| m.signature()).collect();
            assert_eq!(sigs.len(), class.scope.methods().count());
        }
    }

    #[test]
    fn only_generated_methods_are_callable() {
        let class = planned(7);
        let callable = class.scope.callable_methods(class.run);
        for id in &callable {
            assert!(class.generated.contains(id));
        }
        assert!(!callable.contains(&class.hash));
    }

    #[test]
    fn random_types_are_never_void() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let ty = random_type(&mut rng);
            assert_ne!(ty, Type::Void);
            if let Type::Array(array) = &ty {
                assert!((1..=3).contains(&array.dim()));
                assert_eq!(array.restrictions().map(<[_]>::len), Some(array.dim()));
            }
        }
    }
}
