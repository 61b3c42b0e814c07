//! Fill phase: drives the synthesizer over every planned method.
//!
//! [`RandomDriver`] picks generation actions by profile weights and is the
//! [`Driver`] the control-flow engine calls back into for compound bodies.
//! [`generate`] runs a whole class: plan, declare, fill each method, set
//! the trailing returns, then wire `computeHash()` and `main`.

use rand::SeedableRng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;

use crate::ast::{BinaryOp, CallTarget, Expr, Stmt, UnaryOp};
use crate::control_flow::Driver;
use crate::emit::{Action, Emit, TraceEntry};
use crate::emitter::{Emitter, MethodDecl};
use crate::error::GenerateError;
use crate::names::NameGen;
use crate::planner::{HASH_METHOD, RUN_METHOD, plan};
use crate::profile::Profile;
use crate::resolver::pick_initialized_of_type;
use crate::scope::Variable;
use crate::symbols::{ClassScope, MethodId};
use crate::synth::Session;
use crate::types::{Literal, PrimitiveKind, Type, random_literal};

/// Relative weight of each generation action.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ActionWeights {
    pub declare_local: u32,
    pub operator_statement: u32,
    pub assign_operator_to_field: u32,
    pub assign_operator_to_local: u32,
    pub math_call: u32,
    pub assign_math_to_field: u32,
    pub assign_math_to_local: u32,
    pub cast: u32,
    pub method_call: u32,
    pub assign_return_to_field: u32,
    pub assign_return_to_local: u32,
    pub if_else: u32,
    pub while_loop: u32,
    pub for_loop: u32,
    pub do_while: u32,
}

impl Default for ActionWeights {
    fn default() -> Self {
        Self {
            declare_local: 6,
            operator_statement: 3,
            assign_operator_to_field: 4,
            assign_operator_to_local: 4,
            math_call: 1,
            assign_math_to_field: 2,
            assign_math_to_local: 2,
            cast: 2,
            method_call: 2,
            assign_return_to_field: 2,
            assign_return_to_local: 2,
            if_else: 2,
            while_loop: 1,
            for_loop: 1,
            do_while: 1,
        }
    }
}

impl ActionWeights {
    pub fn weight(&self, action: Action) -> u32 {
        match action {
            Action::DeclareLocal => self.declare_local,
            Action::OperatorStatement => self.operator_statement,
            Action::AssignOperatorToField => self.assign_operator_to_field,
            Action::AssignOperatorToLocal => self.assign_operator_to_local,
            Action::MathCall => self.math_call,
            Action::AssignMathToField => self.assign_math_to_field,
            Action::AssignMathToLocal => self.assign_math_to_local,
            Action::Cast => self.cast,
            Action::MethodCall => self.method_call,
            Action::AssignReturnToField => self.assign_return_to_field,
            Action::AssignReturnToLocal => self.assign_return_to_local,
            Action::IfElse => self.if_else,
            Action::While => self.while_loop,
            Action::For => self.for_loop,
            Action::DoWhile => self.do_while,
        }
    }
}

/// Configuration for the fill phase.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Actions performed at the top level of each method (range).
    pub statements_per_method: (usize, usize),
    /// Actions performed inside each compound body (range).
    pub statements_per_block: (usize, usize),
    /// Compound statements are only opened below this depth.
    pub max_nesting: usize,
    /// How many times `main` calls `run()`.
    pub runs: u32,
    pub weights: ActionWeights,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            statements_per_method: (10, 30),
            statements_per_block: (1, 5),
            max_nesting: 3,
            runs: 3,
            weights: ActionWeights::default(),
        }
    }
}

/// Chooses actions by weight and fills compound bodies.
#[derive(Debug, Clone)]
pub struct RandomDriver {
    config: DriverConfig,
}

impl RandomDriver {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    /// Generate the top-level statements of `method`.
    pub fn fill_method(&mut self, session: &mut Session<'_>, method: MethodId) -> Result<(), GenerateError> {
        let count = session.emit.in_range(self.config.statements_per_method);
        self.perform_many(session, method, count)?;
        tracing::debug!(
            method = %session.class.method(method).name,
            actions = count,
            "filled method"
        );
        Ok(())
    }

    fn perform_many(
        &mut self,
        session: &mut Session<'_>,
        method: MethodId,
        count: usize,
    ) -> Result<(), GenerateError> {
        for _ in 0..count {
            let Some(action) = self.next_action(session) else {
                tracing::warn!("every action weight is zero");
                break;
            };
            session.perform(action, method, self)?;
        }
        Ok(())
    }

    fn next_action(&self, session: &mut Session<'_>) -> Option<Action> {
        let allow_compound = session.depth() < self.config.max_nesting;
        let weights = Action::ALL.map(|action| {
            if action.is_compound() && !allow_compound {
                0
            } else {
                self.config.weights.weight(action)
            }
        });
        let dist = WeightedIndex::new(weights).ok()?;
        Some(Action::ALL[dist.sample(&mut session.emit)])
    }
}

impl Driver for RandomDriver {
    fn fill_body(&mut self, session: &mut Session<'_>, method: MethodId) -> Result<(), GenerateError> {
        let count = session.emit.in_range(self.config.statements_per_block);
        self.perform_many(session, method, count)
    }
}

// ---------------------------------------------------------------------------
// Whole-class generation
// ---------------------------------------------------------------------------

/// Result of a successful run. The source itself stays with the emitter.
#[derive(Debug, Clone)]
pub struct Generated {
    pub class: ClassScope,
    pub trace: Vec<TraceEntry>,
}

/// Generate the class `class_name` from `seed` into `emitter`.
pub fn generate(
    profile: &Profile,
    seed: u64,
    class_name: &str,
    emitter: &mut dyn Emitter,
) -> Result<Generated, GenerateError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut names = NameGen::default();
    let planned = plan(&mut rng, &profile.plan, class_name, &mut names);

    for decl in planned.fields {
        let name = decl.name.clone();
        emitter
            .declare_field(decl)
            .map_err(|rejection| declaration_error(name, rejection.reason))?;
    }
    for (_, method) in planned.scope.methods() {
        emitter
            .declare_method(MethodDecl::from(method))
            .map_err(|rejection| declaration_error(method.name.clone(), rejection.reason))?;
    }

    let mut config = profile.generation.clone();
    config.seed = seed;
    let mut session = Session::new(planned.scope, config, names, Emit::new(&mut rng), emitter);
    let mut driver = RandomDriver::new(profile.driver.clone());

    for method in std::iter::once(planned.run).chain(planned.generated.iter().copied()) {
        driver.fill_method(&mut session, method)?;
        if session.class.method(method).return_type != Type::Void {
            let value = return_value(&mut session, method);
            session.set_return(method, value)?;
        }
    }
    fill_hash(&mut session, planned.hash)?;
    fill_main(&mut session, profile.driver.runs)?;

    tracing::debug!(
        class = class_name,
        actions = session.emit.trace().len(),
        "generated class"
    );
    let trace = session.emit.trace().to_vec();
    Ok(Generated {
        class: session.class,
        trace,
    })
}

fn declaration_error(name: String, reason: String) -> GenerateError {
    tracing::error!(%name, %reason, "emitter rejected declaration");
    GenerateError::Declaration { name, reason }
}

/// An initialized variable of the return type, or a literal.
fn return_value(session: &mut Session<'_>, method: MethodId) -> Expr {
    let ty = session.class.method(method).return_type.clone();
    pick_initialized_of_type(&session.class, method, &ty, &mut session.emit)
        .map(|var| Expr::var(&var.name))
        .or_else(|| random_literal(&ty, &mut session.emit))
        // Only restricted ints without admissible values lack a literal;
        // the planner never declares those.
        .unwrap_or(Expr::Literal(Literal::Null))
}

/// `computeHash()`: fold every initialized field into a `long` and print it.
fn fill_hash(session: &mut Session<'_>, method: MethodId) -> Result<(), GenerateError> {
    let acc = session.names.var();
    let mut body = vec![Stmt::Local {
        ty: "long".into(),
        name: acc.clone(),
        is_final: false,
        init: Some(Expr::Literal(Literal::Long(0))),
    }];
    for field in session.class.fields().iter().filter(|f| f.is_initialized()) {
        let folded = Expr::Chain {
            first: Box::new(Expr::var(&acc)),
            rest: vec![
                (BinaryOp::Mul, Expr::int(31)),
                (BinaryOp::Add, Expr::paren(field_hash(field))),
            ],
        };
        body.push(Stmt::assign(acc.clone(), folded));
    }
    body.push(Stmt::Expr(Expr::static_call(
        "System.out",
        "println",
        vec![Expr::var(&acc)],
    )));
    session.flush(method, body)
}

/// A `long`-compatible summary of one field's value.
fn field_hash(field: &Variable) -> Expr {
    let value = Expr::var(&field.name);
    let null_checked = |summary: Expr| {
        Expr::ternary(
            Expr::binary(BinaryOp::Eq, Expr::var(&field.name), Expr::Literal(Literal::Null)),
            Expr::int(0),
            summary,
        )
    };
    match &field.ty {
        Type::Primitive(PrimitiveKind::Boolean) => Expr::ternary(value, Expr::int(1), Expr::int(0)),
        Type::Primitive(_) | Type::RestrictedInt(_) => Expr::cast("long", value),
        Type::Text => null_checked(method_on(value, "hashCode")),
        Type::Array(_) => null_checked(Expr::Member {
            receiver: Box::new(value),
            name: "length".into(),
        }),
        Type::Instance(class) if class.name == "java.util.Date" => {
            null_checked(method_on(value, "getTime"))
        }
        Type::Instance(_) => null_checked(method_on(
            method_on(method_on(value, "getClass"), "getName"),
            "hashCode",
        )),
        Type::Void => Expr::int(0),
    }
}

fn method_on(receiver: Expr, name: &str) -> Expr {
    Expr::Call {
        target: CallTarget::Value(Box::new(receiver)),
        name: name.into(),
        args: Vec::new(),
    }
}

/// `main`: instantiate the class, call `run()` `runs` times, then report
/// the hash.
fn fill_main(session: &mut Session<'_>, runs: u32) -> Result<(), GenerateError> {
    let main = session.class.main();
    let instance = session.names.var();
    let counter = session.names.var();
    let class_name = session.class.name.clone();
    let body = vec![
        Stmt::Local {
            ty: class_name.clone(),
            name: instance.clone(),
            is_final: false,
            init: Some(Expr::New {
                class: class_name,
                args: Vec::new(),
            }),
        },
        Stmt::For {
            init: Box::new(Stmt::Local {
                ty: "int".into(),
                name: counter.clone(),
                is_final: false,
                init: Some(Expr::int(0)),
            }),
            cond: Expr::binary(
                BinaryOp::Lt,
                Expr::var(&counter),
                Expr::int(i32::try_from(runs).unwrap_or(i32::MAX)),
            ),
            update: Expr::unary(UnaryOp::PostInc, Expr::var(&counter)),
            body: vec![Stmt::Expr(method_on(Expr::var(&instance), RUN_METHOD))],
        },
        Stmt::Expr(method_on(Expr::var(instance), HASH_METHOD)),
    ];
    session.flush(main, body)
}
