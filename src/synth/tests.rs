use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::ast::{BinaryOp, CallTarget, Expr, Stmt};
use crate::emit::{Action, Emit, GenerationConfig};
use crate::emitter::{FieldDecl, MethodDecl, SourceEmitter};
use crate::scope::{Modifiers, Variable};
use crate::symbols::{ClassScope, Method, MethodId, MethodRole};
use crate::types::{Literal, PrimitiveKind, Type};

/// Fields `f0: int`, `f1: boolean`, `f2: String` and two void instance
/// methods.
fn scenario_class() -> (ClassScope, [MethodId; 2]) {
    let mut class = ClassScope::new("Scenario");
    for (name, ty) in [("f0", Type::INT), ("f1", Type::BOOLEAN), ("f2", Type::Text)] {
        class.add_field(Variable::field(name, ty, Modifiers::default(), true));
    }
    let mut add = |name: &str| {
        class.add_method(Method::new(
            name,
            Modifiers::default(),
            Type::Void,
            Vec::new(),
            MethodRole::Generated,
        ))
    };
    let methods = [add("methodA"), add("methodB")];
    (class, methods)
}

fn emitter_for(class: &ClassScope) -> SourceEmitter {
    let mut emitter = SourceEmitter::new(&class.name);
    for field in class.fields() {
        emitter
            .declare_field(FieldDecl {
                modifiers: field.modifiers,
                ty: field.ty.clone(),
                name: field.name.clone(),
                init: None,
            })
            .unwrap();
    }
    for (_, method) in class.methods() {
        emitter.declare_method(MethodDecl::from(method)).unwrap();
    }
    emitter
}

/// Every `/` or `%` in `expr` with its right operand.
fn divisors(expr: &Expr) -> Vec<Expr> {
    let mut found = Vec::new();
    expr.visit(&mut |e| {
        if let Expr::Chain { rest, .. } = e {
            for (op, rhs) in rest {
                if op.is_dividing() {
                    found.push(rhs.clone());
                }
            }
        }
    });
    found
}

/// Performs a bounded number of nested actions per body.
struct Nester {
    budget: usize,
}

impl Driver for Nester {
    fn fill_body(&mut self, session: &mut Session<'_>, method: MethodId) -> Result<(), GenerateError> {
        const ACTIONS: [Action; 7] = [
            Action::IfElse,
            Action::IfElse,
            Action::While,
            Action::For,
            Action::DoWhile,
            Action::DeclareLocal,
            Action::AssignOperatorToLocal,
        ];
        session.perform(Action::DeclareLocal, method, self)?;
        if self.budget == 0 {
            return Ok(());
        }
        self.budget -= 1;
        let action = ACTIONS[session.emit.gen_range(0..ACTIONS.len())];
        session.perform(action, method, self)?;
        Ok(())
    }
}

#[test]
fn arithmetic_divisors_are_guarded_or_nonzero() {
    let (mut class, [method, _]) = scenario_class();
    for name in ["x", "y"] {
        class.method_mut(method).scope.add_local(name, Type::INT, false, true);
    }
    class
        .method_mut(method)
        .scope
        .add_local("z", Type::Primitive(PrimitiveKind::Long), false, true);
    let mut emitter = emitter_for(&class);
    // The emitter has to know the hand-declared locals too.
    emitter
        .insert(
            &class.method(method).signature(),
            &["x", "y", "z"]
                .map(|name| Stmt::Local {
                    ty: if name == "z" { "long" } else { "int" }.into(),
                    name: name.into(),
                    is_final: false,
                    init: Some(Expr::int(1)),
                }),
        )
        .unwrap();

    let config = GenerationConfig {
        no_div_by_zero: true,
        seed: 42,
        ..GenerationConfig::default()
    };
    let mut rng = StdRng::seed_from_u64(42);
    let mut session = Session::new(class, config, NameGen::default(), Emit::new(&mut rng), &mut emitter);

    let mut variable_divisors = 0;
    for _ in 0..100 {
        let stmt = session.operator_statement(method, OperatorKind::Arithmetic).unwrap();
        let (guard, inner) = match &stmt {
            Stmt::If { cond, then, .. } => (Some(cond.to_string()), &then[0]),
            other => (None, other),
        };
        let Stmt::Expr(expr) = inner else {
            panic!("unexpected statement {inner}");
        };
        for divisor in divisors(expr) {
            match divisor {
                Expr::Literal(lit) => assert!(!lit.is_zero(), "zero literal divisor in {stmt}"),
                Expr::Var(name) => {
                    variable_divisors += 1;
                    let guard = guard.as_deref().unwrap_or_else(|| panic!("unguarded {stmt}"));
                    assert!(guard.contains(&format!("{name} != 0")), "{name} not guarded in {stmt}");
                }
                other => panic!("divisor `{other}` is neither literal nor variable"),
            }
        }
        session.submit(method, vec![stmt]).unwrap();
    }
    assert!(variable_divisors > 0, "scenario never divided by a variable");
}

#[test]
fn unguarded_mode_emits_no_wrappers() {
    let (class, [method, _]) = scenario_class();
    let mut emitter = emitter_for(&class);
    let mut rng = StdRng::seed_from_u64(42);
    let mut session = Session::new(
        class,
        GenerationConfig::default(),
        NameGen::default(),
        Emit::new(&mut rng),
        &mut emitter,
    );
    for _ in 0..50 {
        let stmt = session.operator_statement(method, OperatorKind::Arithmetic).unwrap();
        assert!(matches!(stmt, Stmt::Expr(_)), "{stmt}");
    }
}

#[test]
fn conditions_divide_by_nonzero_literals_only() {
    let (mut class, [method, _]) = scenario_class();
    class.method_mut(method).scope.add_local("x", Type::INT, false, true);
    let mut emitter = emitter_for(&class);
    let mut rng = StdRng::seed_from_u64(42);
    let mut session = Session::new(
        class,
        GenerationConfig::default(),
        NameGen::default(),
        Emit::new(&mut rng),
        &mut emitter,
    );
    for _ in 0..200 {
        let cond = session.condition(method);
        for divisor in divisors(&cond) {
            match divisor {
                Expr::Literal(lit) => assert!(!lit.is_zero(), "{cond}"),
                other => panic!("non-literal divisor `{other}` in {cond}"),
            }
        }
    }
}

#[test]
fn operator_assignments_match_destination_kind() {
    let (mut class, [method, _]) = scenario_class();
    class.method_mut(method).scope.add_local("x", Type::INT, false, true);
    class.method_mut(method).scope.add_local("y", Type::BOOLEAN, false, true);
    let mut emitter = emitter_for(&class);
    let mut rng = StdRng::seed_from_u64(42);
    let mut session = Session::new(
        class,
        GenerationConfig::default(),
        NameGen::default(),
        Emit::new(&mut rng),
        &mut emitter,
    );
    for kind in OperatorKind::ALL {
        for _ in 0..10 {
            let Some(Stmt::Assign { target, value, .. }) =
                session.assign_operator_statement(method, kind, DestSource::Local)
            else {
                panic!("no assignment for {kind:?}");
            };
            let expected = if kind.yields_boolean() { "y" } else { "x" };
            assert_eq!(target, expected, "{kind:?}");
            let Expr::Cast { ty, .. } = value else {
                panic!("assignment value is not cast");
            };
            assert_eq!(ty, if kind.yields_boolean() { "boolean" } else { "int" });
        }
    }
}

#[test]
fn compound_actions_keep_nesting_balanced() {
    let (class, [method, _]) = scenario_class();
    let mut emitter = emitter_for(&class);
    let config = GenerationConfig {
        if_branching_factor: 2,
        ..GenerationConfig::default()
    };
    let mut rng = StdRng::seed_from_u64(42);
    let mut session = Session::new(class, config, NameGen::default(), Emit::new(&mut rng), &mut emitter);
    let mut driver = Nester { budget: 0 };
    for i in 0..40 {
        driver.budget = 4;
        let action = [Action::IfElse, Action::While, Action::For, Action::DoWhile][i % 4];
        assert!(session.perform(action, method, &mut driver).unwrap());
        assert_eq!(session.depth(), 0);
        let (opened, closed) = session.control.counts();
        assert_eq!(opened, closed);
        assert_eq!(session.class.method(method).scope.depth(), 0);
    }
    let sig = session.class.method(method).signature();
    drop(session);

    let body = emitter.body(&sig).unwrap();
    let mut ifs = 0;
    let mut stack: Vec<&Stmt> = body.iter().collect();
    while let Some(stmt) = stack.pop() {
        match stmt {
            Stmt::If {
                then,
                else_ifs,
                otherwise,
                ..
            } => {
                ifs += 1;
                assert!(else_ifs.len() <= 2);
                stack.extend(then);
                stack.extend(else_ifs.iter().flat_map(|(_, b)| b));
                stack.extend(otherwise.iter().flatten());
            }
            Stmt::While { body, .. } | Stmt::DoWhile { body, .. } | Stmt::For { body, .. } => {
                stack.extend(body)
            }
            _ => {}
        }
    }
    assert!(ifs >= 10);
}

#[test]
fn loops_count_with_an_undeclared_counter() {
    let (class, [method, _]) = scenario_class();
    let mut emitter = emitter_for(&class);
    let mut rng = StdRng::seed_from_u64(42);
    let mut session = Session::new(
        class,
        GenerationConfig::default(),
        NameGen::default(),
        Emit::new(&mut rng),
        &mut emitter,
    );
    let mut driver = Nester { budget: 0 };
    session.perform(Action::While, method, &mut driver).unwrap();
    session.perform(Action::DoWhile, method, &mut driver).unwrap();
    // Loop counters never become visible to the resolver.
    assert!(session.class.method(method).scope.locals().is_empty());
    let sig = session.class.method(method).signature();
    drop(session);

    let body = emitter.body(&sig).unwrap();
    assert_eq!(body.len(), 4);
    for pair in body.chunks(2) {
        let Stmt::Local { name, ty, .. } = &pair[0] else {
            panic!("loop without counter: {}", pair[0]);
        };
        assert_eq!(ty, "int");
        let (Stmt::While { body, .. } | Stmt::DoWhile { body, .. }) = &pair[1] else {
            panic!("expected a loop: {}", pair[1]);
        };
        let step = body[0].to_string();
        assert!(step == format!("{name}++;\n") || step == format!("{name}--;\n"), "{step}");
    }
}

#[test]
fn else_needs_an_open_if() {
    let (class, [method, _]) = scenario_class();
    let mut emitter = emitter_for(&class);
    let mut rng = StdRng::seed_from_u64(7);
    let mut session = Session::new(
        class,
        GenerationConfig {
            if_branching_factor: 0,
            ..GenerationConfig::default()
        },
        NameGen::default(),
        Emit::new(&mut rng),
        &mut emitter,
    );
    let mut driver = Nester { budget: 6 };
    for _ in 0..20 {
        driver.budget = 6;
        session.perform(Action::IfElse, method, &mut driver).unwrap();
    }
    let sig = session.class.method(method).signature();
    drop(session);
    for stmt in emitter.body(&sig).unwrap() {
        if let Stmt::If { else_ifs, .. } = stmt {
            assert!(else_ifs.is_empty());
        }
    }
}

#[test]
fn declared_locals_enter_scope() {
    let (class, [method, _]) = scenario_class();
    let mut emitter = emitter_for(&class);
    let mut rng = StdRng::seed_from_u64(42);
    let mut session = Session::new(
        class,
        GenerationConfig::default(),
        NameGen::default(),
        Emit::new(&mut rng),
        &mut emitter,
    );
    let mut driver = Nester { budget: 0 };
    for _ in 0..20 {
        session.perform(Action::DeclareLocal, method, &mut driver).unwrap();
    }
    let locals = session.class.method(method).scope.locals();
    assert_eq!(locals.len(), 20);
    for local in locals {
        if local.is_final() {
            assert!(local.is_initialized(), "{}", local.name);
        }
    }
    assert_eq!(session.emit.trace().len(), 20);
    assert!(session.emit.trace().iter().all(|e| e.produced));
}

#[test]
fn method_calls_never_close_a_cycle() {
    let (class, [a, b]) = scenario_class();
    let mut emitter = emitter_for(&class);
    let mut rng = StdRng::seed_from_u64(42);
    let mut session = Session::new(
        class,
        GenerationConfig::default(),
        NameGen::default(),
        Emit::new(&mut rng),
        &mut emitter,
    );
    let Some(Stmt::Expr(Expr::Call { target, name, .. })) = session.method_call(a) else {
        panic!("methodA should be able to call methodB");
    };
    assert_eq!(target, CallTarget::Implicit);
    assert_eq!(name, "methodB");
    assert!(session.class.method(a).direct_calls().contains(&b));
    // methodB may no longer call methodA.
    assert!(session.method_call(b).is_none());
}

#[test]
fn cast_assignments_convert_between_primitives() {
    let (mut class, [method, _]) = scenario_class();
    class
        .method_mut(method)
        .scope
        .add_local("d", Type::Primitive(PrimitiveKind::Double), false, true);
    let mut emitter = emitter_for(&class);
    let mut rng = StdRng::seed_from_u64(42);
    let mut session = Session::new(
        class,
        GenerationConfig::default(),
        NameGen::default(),
        Emit::new(&mut rng),
        &mut emitter,
    );
    for _ in 0..20 {
        let Some(Stmt::Assign { target, value, .. }) = session.cast_assignment(method) else {
            panic!("int and double variables are both available");
        };
        let rendered = value.to_string();
        match target.as_str() {
            "f0" => assert_eq!(rendered, "(int) d"),
            "d" => assert_eq!(rendered, "(double) f0"),
            other => panic!("unexpected destination {other}"),
        }
    }
}

#[test]
fn guarded_assignment_leaves_local_uninitialized() {
    let (mut class, [method, _]) = scenario_class();
    class.method_mut(method).scope.add_local("x", Type::INT, false, false);
    let mut emitter = emitter_for(&class);
    let mut rng = StdRng::seed_from_u64(3);
    let mut session = Session::new(
        class,
        GenerationConfig::default(),
        NameGen::default(),
        Emit::new(&mut rng),
        &mut emitter,
    );
    let dest = Destination {
        name: "x".into(),
        ty: Type::INT,
        is_field: false,
    };
    session.note_assignment(method, &dest, true);
    assert!(!session.class.method(method).scope.locals()[0].is_initialized());
    session.note_assignment(method, &dest, false);
    assert!(session.class.method(method).scope.locals()[0].is_initialized());
}

#[test]
fn rejected_fragment_carries_repro_context() {
    let (class, [method, _]) = scenario_class();
    let mut emitter = emitter_for(&class);
    let mut rng = StdRng::seed_from_u64(42);
    let config = GenerationConfig {
        seed: 42,
        ..GenerationConfig::default()
    };
    let mut session = Session::new(class, config, NameGen::default(), Emit::new(&mut rng), &mut emitter);
    let bad = Stmt::assign("undeclared", Expr::Literal(Literal::Int(1)));
    let err = session.submit(method, vec![bad]).unwrap_err();
    let repro = err.repro().expect("rejection carries context");
    assert_eq!(repro.seed, 42);
    assert_eq!(repro.method, "methodA()");
    assert!(repro.fragment.contains("undeclared = 1;"));
    assert!(repro.reason.contains("undeclared"));
}

#[test]
fn flush_requires_a_declared_method() {
    let (class, [declared, missing]) = scenario_class();
    let mut emitter = SourceEmitter::new(&class.name);
    emitter.declare_method(MethodDecl::from(class.method(declared))).unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    let mut session = Session::new(
        class,
        GenerationConfig::default(),
        NameGen::default(),
        Emit::new(&mut rng),
        &mut emitter,
    );
    let stmt = Stmt::Local {
        ty: "int".into(),
        name: "v0".into(),
        is_final: false,
        init: Some(Expr::int(1)),
    };
    session.submit(declared, vec![stmt.clone()]).unwrap();
    let err = session.submit(missing, vec![stmt]).unwrap_err();
    let repro = err.repro().expect("missing method carries context");
    assert_eq!(repro.method, "methodB()");
    assert!(repro.reason.contains("not declared"), "{}", repro.reason);
    assert!(repro.fragment.contains("int v0 = 1;"));
}

#[test]
fn same_seed_same_statements() {
    let run = |seed: u64| {
        let (class, [method, _]) = scenario_class();
        let mut emitter = emitter_for(&class);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut session = Session::new(
            class,
            GenerationConfig::default(),
            NameGen::default(),
            Emit::new(&mut rng),
            &mut emitter,
        );
        let mut driver = Nester { budget: 3 };
        for action in Action::ALL {
            driver.budget = 3;
            session.perform(action, method, &mut driver).unwrap();
        }
        drop(session);
        emitter.render()
    };
    assert_eq!(run(42), run(42));
    assert_ne!(run(42), run(43));
}

#[test]
fn logical_comparisons_use_relational_ops() {
    let (class, [method, _]) = scenario_class();
    let mut emitter = emitter_for(&class);
    let mut rng = StdRng::seed_from_u64(42);
    let mut session = Session::new(
        class,
        GenerationConfig::default(),
        NameGen::default(),
        Emit::new(&mut rng),
        &mut emitter,
    );
    let mut saw_relational = false;
    for _ in 0..50 {
        let cond = session.condition(method);
        cond.visit(&mut |e| {
            if let Expr::Chain { rest, .. } = e {
                saw_relational |= rest.iter().any(|(op, _)| BinaryOp::RELATIONAL.contains(op));
            }
        });
    }
    assert!(saw_relational);
}
