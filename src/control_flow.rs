//! Nested compound statements.
//!
//! [`ControlFlow`] is a stack of open frames (`if` chains and loops). While
//! any frame is open, finished statements go into the innermost frame's
//! current body instead of the emitter. Closing the outermost frame turns
//! the whole construct, loop counter declarations included, into one
//! fragment that is flushed at once, so the emitter never sees half a
//! block.
//!
//! Bodies are not generated here: every open hands control back to the
//! [`Driver`], which performs more actions against the session before the
//! frame is closed.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::ast::{BinaryOp, CallTarget, Expr, Stmt, UnaryOp};
use crate::error::GenerateError;
use crate::resolver::pick_initialized_of_type;
use crate::symbols::MethodId;
use crate::synth::Session;
use crate::types::{Literal, PrimitiveKind, Type, random_primitive_literal, random_text_literal};

/// Fills the bodies of compound statements.
pub trait Driver {
    /// Generate statements into the innermost open block of `method`.
    fn fill_body(&mut self, session: &mut Session<'_>, method: MethodId)
    -> Result<(), GenerateError>;
}

/// Branch usage of one open `if` chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfContext {
    /// Depth of the chain's bodies.
    pub depth: usize,
    pub has_else: bool,
    pub else_if_count: usize,
}

#[derive(Debug)]
enum Frame {
    If {
        ctx: IfContext,
        cond: Expr,
        then: Vec<Stmt>,
        else_ifs: Vec<(Expr, Vec<Stmt>)>,
        otherwise: Option<Vec<Stmt>>,
    },
    While {
        counter: Stmt,
        cond: Expr,
        body: Vec<Stmt>,
    },
    DoWhile {
        counter: Stmt,
        cond: Expr,
        body: Vec<Stmt>,
    },
    For {
        init: Stmt,
        cond: Expr,
        update: Expr,
        body: Vec<Stmt>,
    },
}

impl Frame {
    /// The body currently receiving statements.
    fn body_mut(&mut self) -> &mut Vec<Stmt> {
        match self {
            Frame::If {
                then,
                else_ifs,
                otherwise,
                ..
            } => {
                if let Some(body) = otherwise {
                    body
                } else if let Some((_, body)) = else_ifs.last_mut() {
                    body
                } else {
                    then
                }
            }
            Frame::While { body, .. } | Frame::DoWhile { body, .. } | Frame::For { body, .. } => body,
        }
    }

    fn into_stmts(self) -> Vec<Stmt> {
        match self {
            Frame::If {
                cond,
                then,
                else_ifs,
                otherwise,
                ..
            } => vec![Stmt::If {
                cond,
                then,
                else_ifs,
                otherwise,
            }],
            Frame::While {
                counter,
                cond,
                body,
            } => vec![counter, Stmt::While { cond, body }],
            Frame::DoWhile {
                counter,
                cond,
                body,
            } => vec![counter, Stmt::DoWhile { body, cond }],
            Frame::For {
                init,
                cond,
                update,
                body,
            } => vec![Stmt::For {
                init: Box::new(init),
                cond,
                update,
                body,
            }],
        }
    }
}

/// Open frames of the method being generated.
#[derive(Debug, Default)]
pub struct ControlFlow {
    frames: Vec<Frame>,
    opened: usize,
    closed: usize,
}

impl ControlFlow {
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Frames opened and closed so far.
    pub fn counts(&self) -> (usize, usize) {
        (self.opened, self.closed)
    }

    /// The innermost open `if` chain.
    pub fn if_context(&self) -> Option<&IfContext> {
        self.frames.iter().rev().find_map(|f| match f {
            Frame::If { ctx, .. } => Some(ctx),
            _ => None,
        })
    }

    /// Buffer `stmts` in the innermost frame, or give them back when no
    /// frame is open.
    pub(crate) fn append(&mut self, stmts: Vec<Stmt>) -> Option<Vec<Stmt>> {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.body_mut().extend(stmts);
                None
            }
            None => Some(stmts),
        }
    }

    fn open(&mut self, frame: Frame) {
        self.frames.push(frame);
        self.opened += 1;
    }

    /// Close the innermost frame. Returns the finished construct once the
    /// outermost frame closes.
    fn close(&mut self) -> Option<Vec<Stmt>> {
        let frame = self.frames.pop()?;
        self.closed += 1;
        let stmts = frame.into_stmts();
        let fragment = self.append(stmts);
        if fragment.is_some() {
            debug_assert_eq!(self.opened, self.closed);
        }
        fragment
    }

    fn top_if_mut(&mut self) -> Option<(&mut IfContext, &mut Vec<(Expr, Vec<Stmt>)>, &mut Option<Vec<Stmt>>)> {
        match self.frames.last_mut()? {
            Frame::If {
                ctx,
                else_ifs,
                otherwise,
                ..
            } => Some((ctx, else_ifs, otherwise)),
            _ => None,
        }
    }
}

impl Session<'_> {
    fn open_frame(&mut self, method: MethodId, frame: Frame) {
        self.control.open(frame);
        self.class.method_mut(method).scope.enter_block();
    }

    fn close_frame(&mut self, method: MethodId) -> Result<(), GenerateError> {
        self.class.method_mut(method).scope.exit_block();
        match self.control.close() {
            Some(fragment) => self.flush(method, fragment),
            None => Ok(()),
        }
    }

    /// Start a sibling branch of the innermost `if`: locals of the previous
    /// branch go out of scope.
    fn switch_branch(&mut self, method: MethodId) {
        let scope = &mut self.class.method_mut(method).scope;
        scope.exit_block();
        scope.enter_block();
    }

    /// Open an `if`, or when directly inside an `if` chain's body, randomly
    /// add an `else if`, add an `else`, or nest a new `if`.
    pub fn if_else(&mut self, method: MethodId, driver: &mut dyn Driver) -> Result<bool, GenerateError> {
        let depth = self.control.depth();
        let innermost = self.control.if_context().filter(|c| c.depth == depth).copied();
        if let Some(ctx) = innermost {
            match self.emit.gen_range(0..3) {
                0 => {
                    if ctx.has_else || ctx.else_if_count >= self.config.if_branching_factor {
                        return Ok(false);
                    }
                    // The condition sits outside the previous branch's block.
                    self.class.method_mut(method).scope.exit_block();
                    let cond = self.branch_condition(method);
                    self.class.method_mut(method).scope.enter_block();
                    if let Some((ctx, else_ifs, _)) = self.control.top_if_mut() {
                        ctx.else_if_count += 1;
                        else_ifs.push((cond, Vec::new()));
                    }
                    driver.fill_body(self, method)?;
                    return Ok(true);
                }
                1 => {
                    if ctx.has_else {
                        return Ok(false);
                    }
                    if let Some((ctx, _, otherwise)) = self.control.top_if_mut() {
                        ctx.has_else = true;
                        *otherwise = Some(Vec::new());
                    }
                    self.switch_branch(method);
                    driver.fill_body(self, method)?;
                    return Ok(true);
                }
                _ => {}
            }
        }

        let cond = self.branch_condition(method);
        let frame = Frame::If {
            ctx: IfContext {
                depth: depth + 1,
                has_else: false,
                else_if_count: 0,
            },
            cond,
            then: Vec::new(),
            else_ifs: Vec::new(),
            otherwise: None,
        };
        self.open_frame(method, frame);
        driver.fill_body(self, method)?;
        self.close_frame(method)?;
        Ok(true)
    }

    /// Counter declaration, loop condition and first body statement of a
    /// counting loop, ascending from 0 or descending to 0.
    fn counted_loop(&mut self) -> (Stmt, Expr, Stmt) {
        let counter = self.names.var();
        let bound = self.emit.below(self.config.max_loop_iterations) as i32;
        let (start, cond, step) = if self.emit.gen_bool(0.5) {
            (
                0,
                Expr::binary(BinaryOp::Lt, Expr::var(&counter), Expr::int(bound)),
                UnaryOp::PostInc,
            )
        } else {
            (
                bound,
                Expr::binary(BinaryOp::Gt, Expr::var(&counter), Expr::int(0)),
                UnaryOp::PostDec,
            )
        };
        let decl = Stmt::Local {
            ty: "int".into(),
            name: counter.clone(),
            is_final: false,
            init: Some(Expr::int(start)),
        };
        (decl, cond, Stmt::Expr(Expr::unary(step, Expr::var(counter))))
    }

    /// `int c = ..; while (cond) { c++/c--; body }`.
    pub fn while_loop(&mut self, method: MethodId, driver: &mut dyn Driver) -> Result<bool, GenerateError> {
        let (counter, cond, step) = self.counted_loop();
        let frame = Frame::While {
            counter,
            cond,
            body: vec![step],
        };
        self.open_frame(method, frame);
        driver.fill_body(self, method)?;
        self.close_frame(method)?;
        Ok(true)
    }

    /// `int c = ..; do { c++/c--; body } while (cond);`. The condition is
    /// fixed when the loop opens.
    pub fn do_while_loop(&mut self, method: MethodId, driver: &mut dyn Driver) -> Result<bool, GenerateError> {
        let (counter, cond, step) = self.counted_loop();
        let frame = Frame::DoWhile {
            counter,
            cond,
            body: vec![step],
        };
        self.open_frame(method, frame);
        driver.fill_body(self, method)?;
        self.close_frame(method)?;
        Ok(true)
    }

    /// `for (int c = 0; c < n; c++) { body }` with `n <= max_loop_iterations`.
    pub fn for_loop(&mut self, method: MethodId, driver: &mut dyn Driver) -> Result<bool, GenerateError> {
        let counter = self.names.var();
        let bound = self.emit.below(self.config.max_loop_iterations.saturating_add(1)) as i32;
        let frame = Frame::For {
            init: Stmt::Local {
                ty: "int".into(),
                name: counter.clone(),
                is_final: false,
                init: Some(Expr::int(0)),
            },
            cond: Expr::binary(BinaryOp::Lt, Expr::var(&counter), Expr::int(bound)),
            update: Expr::unary(UnaryOp::PostInc, Expr::var(&counter)),
            body: Vec::new(),
        };
        self.open_frame(method, frame);
        driver.fill_body(self, method)?;
        self.close_frame(method)?;
        Ok(true)
    }

    /// An `if`/`else if` condition: a comparison of two values of one
    /// random type, or a boolean operator expression.
    fn branch_condition(&mut self, method: MethodId) -> Expr {
        if self.emit.gen_bool(0.5) {
            self.comparison(method)
        } else {
            self.condition(method)
        }
    }

    fn comparison(&mut self, method: MethodId) -> Expr {
        let choice = self.emit.gen_range(0..=PrimitiveKind::ALL.len());
        let Some(&kind) = PrimitiveKind::ALL.get(choice) else {
            return self.text_comparison(method);
        };
        let ty = Type::Primitive(kind);
        let lhs = self.comparison_operand(method, &ty, kind);
        let rhs = self.comparison_operand(method, &ty, kind);
        let ops: &[BinaryOp] = if kind == PrimitiveKind::Boolean {
            &[BinaryOp::Eq, BinaryOp::Ne]
        } else {
            &BinaryOp::RELATIONAL
        };
        let op = ops.choose(&mut self.emit).copied().unwrap_or(BinaryOp::Eq);
        Expr::binary(op, lhs, rhs)
    }

    fn comparison_operand(&mut self, method: MethodId, ty: &Type, kind: PrimitiveKind) -> Expr {
        match pick_initialized_of_type(&self.class, method, ty, &mut self.emit) {
            Some(var) => Expr::var(&var.name),
            None => Expr::Literal(random_primitive_literal(kind, false, &mut self.emit)),
        }
    }

    /// `s != null && s.equals(t)`, possibly negated, or `"lit".equals(t)`
    /// when no string variable is initialized.
    fn text_comparison(&mut self, method: MethodId) -> Expr {
        let receiver = pick_initialized_of_type(&self.class, method, &Type::Text, &mut self.emit)
            .map(|v| v.name.clone());
        let argument = match pick_initialized_of_type(&self.class, method, &Type::Text, &mut self.emit) {
            Some(var) => Expr::var(&var.name),
            None => Expr::Literal(random_text_literal(&mut self.emit)),
        };
        let target = match &receiver {
            Some(name) => Expr::var(name),
            None => Expr::Literal(random_text_literal(&mut self.emit)),
        };
        let mut equals = Expr::Call {
            target: CallTarget::Value(Box::new(target)),
            name: "equals".into(),
            args: vec![argument],
        };
        if self.emit.gen_bool(0.5) {
            equals = Expr::unary(UnaryOp::Not, equals);
        }
        match receiver {
            Some(name) => Expr::binary(
                BinaryOp::And,
                Expr::binary(BinaryOp::Ne, Expr::var(name), Expr::Literal(Literal::Null)),
                equals,
            ),
            None => equals,
        }
    }
}
