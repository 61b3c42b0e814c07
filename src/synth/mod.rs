//! Fragment synthesis.
//!
//! A [`Session`] bundles everything one generation run mutates: the class
//! symbol table, the RNG and trace handle, the open control-flow state and
//! the emitter. Each generation action is a method on `Session` that builds
//! a statement tree or gives up with `None`; [`Session::perform`] records
//! the action and hands whatever was built to the control-flow buffer or
//! straight to the emitter.
//!
//! The synthesizers live in submodules by family:
//!
//! - `operators`: operator statements and the conditions of branches
//! - `math`: guarded `java.lang.Math` calls
//! - `cast`: primitive cast assignments
//! - `calls`: calls to generated methods

mod calls;
mod cast;
mod math;
mod operators;

#[cfg(test)]
mod tests;

use rand::Rng;

use crate::ast::{Expr, Stmt, render_body};
use crate::control_flow::{ControlFlow, Driver};
use crate::emit::{Action, Emit, GenerationConfig};
use crate::emitter::{Emitter, Rejection};
use crate::error::{GenerateError, ReproContext};
use crate::names::NameGen;
use crate::planner::random_type;
use crate::resolver::{DestSource, Destination, resolve};
use crate::symbols::{ClassScope, MethodId, MethodSignature};

pub use math::{MATH_METHODS, MathMethod, Precondition};
pub use operators::OperatorKind;

/// Chance that a declared local is `final`.
const FINAL_LOCAL_PROBABILITY: f64 = 0.2;

/// Chance that a non-final local is declared without an initializer.
const UNINITIALIZED_LOCAL_PROBABILITY: f64 = 0.3;

/// Mutable state of one generation run.
pub struct Session<'a> {
    pub class: ClassScope,
    pub config: GenerationConfig,
    pub emit: Emit<'a>,
    pub names: NameGen,
    pub(crate) control: ControlFlow,
    pub(crate) emitter: &'a mut dyn Emitter,
}

impl<'a> Session<'a> {
    pub fn new(
        class: ClassScope,
        config: GenerationConfig,
        names: NameGen,
        emit: Emit<'a>,
        emitter: &'a mut dyn Emitter,
    ) -> Self {
        Self {
            class,
            config,
            emit,
            names,
            control: ControlFlow::default(),
            emitter,
        }
    }
}

impl Session<'_> {
    pub fn emitter(&self) -> &dyn Emitter {
        &*self.emitter
    }

    /// Nesting depth of the open compound statements.
    pub fn depth(&self) -> usize {
        self.control.depth()
    }

    /// Run one generation action in `method`. Returns whether it produced
    /// anything; only an emitter rejection is an error.
    pub fn perform(
        &mut self,
        action: Action,
        method: MethodId,
        driver: &mut dyn Driver,
    ) -> Result<bool, GenerateError> {
        let name = self.class.method(method).name.clone();
        let index = self.emit.record(action, &name, false);
        let stmt = match action {
            Action::DeclareLocal => self.declare_local(method),
            Action::OperatorStatement => {
                let kind = OperatorKind::random(&mut self.emit);
                self.operator_statement(method, kind)
            }
            Action::AssignOperatorToField | Action::AssignOperatorToLocal => {
                let kind = OperatorKind::random(&mut self.emit);
                self.assign_operator_statement(method, kind, dest_source(action))
            }
            Action::MathCall => self.math_call(method),
            Action::AssignMathToField | Action::AssignMathToLocal => {
                self.assign_math_call(method, dest_source(action))
            }
            Action::Cast => self.cast_assignment(method),
            Action::MethodCall => self.method_call(method),
            Action::AssignReturnToField | Action::AssignReturnToLocal => {
                self.assign_return_value(method, dest_source(action))
            }
            Action::IfElse | Action::While | Action::For | Action::DoWhile => {
                let produced = match action {
                    Action::IfElse => self.if_else(method, driver)?,
                    Action::While => self.while_loop(method, driver)?,
                    Action::For => self.for_loop(method, driver)?,
                    _ => self.do_while_loop(method, driver)?,
                };
                self.emit.set_produced(index, produced);
                return Ok(produced);
            }
        };
        let Some(stmt) = stmt else {
            tracing::trace!(%action, method = %name, "nothing to generate");
            return Ok(false);
        };
        self.submit(method, vec![stmt])?;
        self.emit.set_produced(index, true);
        Ok(true)
    }

    /// Hand finished statements on: into the innermost open block, or to
    /// the emitter when no block is open.
    pub(crate) fn submit(&mut self, method: MethodId, stmts: Vec<Stmt>) -> Result<(), GenerateError> {
        match self.control.append(stmts) {
            None => Ok(()),
            Some(fragment) => self.flush(method, fragment),
        }
    }

    /// Insert a complete fragment into `method`'s body. The method must
    /// already be known to the emitter.
    pub(crate) fn flush(&mut self, method: MethodId, fragment: Vec<Stmt>) -> Result<(), GenerateError> {
        let sig = self.class.method(method).signature();
        let inserted = if self.emitter.has_method(&sig) {
            self.emitter.insert(&sig, &fragment)
        } else {
            Err(Rejection::new(format!("`{sig}` is not declared to the emitter")))
        };
        match inserted {
            Ok(()) => Ok(()),
            Err(rejection) => {
                let mut text = String::new();
                render_body(&fragment, 0, &mut text);
                Err(self.rejected(&sig, text, rejection))
            }
        }
    }

    /// Set the trailing `return` of `method`.
    pub fn set_return(&mut self, method: MethodId, value: Expr) -> Result<(), GenerateError> {
        let sig = self.class.method(method).signature();
        let text = format!("return {value};");
        self.emitter
            .set_return(&sig, value)
            .map_err(|rejection| self.rejected(&sig, text, rejection))
    }

    fn rejected(&self, sig: &MethodSignature, fragment: String, rejection: Rejection) -> GenerateError {
        tracing::error!(method = %sig, reason = %rejection, "emitter rejected fragment");
        GenerateError::Rejected(Box::new(ReproContext {
            method: sig.to_string(),
            fragment,
            reason: rejection.reason,
            seed: self.config.seed,
            config: self.config.clone(),
            trace: self.emit.trace().to_vec(),
        }))
    }

    /// `T x = value;`, `final T x = value;` or `T x;`.
    pub fn declare_local(&mut self, method: MethodId) -> Option<Stmt> {
        let ty = random_type(&mut self.emit);
        let is_final = self.emit.gen_bool(FINAL_LOCAL_PROBABILITY);
        let init = if is_final || !self.emit.gen_bool(UNINITIALIZED_LOCAL_PROBABILITY) {
            Some(resolve(&self.class, method, &ty, &mut self.emit)?)
        } else {
            None
        };
        let name = self.names.var();
        let source_name = ty.source_name();
        self.class
            .method_mut(method)
            .scope
            .add_local(name.clone(), ty, is_final, init.is_some());
        Some(Stmt::Local {
            ty: source_name,
            name,
            is_final,
            init,
        })
    }

    /// Record an assignment to `dest`. A local written under a guard is not
    /// definitely assigned afterwards, so it keeps its state.
    fn note_assignment(&mut self, method: MethodId, dest: &Destination, guarded: bool) {
        if dest.is_field || !guarded {
            self.class.mark_initialized(method, &dest.name);
        }
    }
}

fn dest_source(action: Action) -> DestSource {
    match action {
        Action::AssignOperatorToField | Action::AssignMathToField | Action::AssignReturnToField => {
            DestSource::Field
        }
        _ => DestSource::Local,
    }
}

/// `if (guard) { stmt }`, or `stmt` alone without a guard.
fn wrap(stmt: Stmt, guard: Option<Expr>) -> Stmt {
    match guard {
        Some(cond) => Stmt::guarded(cond, vec![stmt]),
        None => stmt,
    }
}
