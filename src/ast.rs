//! Syntax tree of generated fragments.
//!
//! The synthesizer builds [`Stmt`] and [`Expr`] values and never concatenates
//! source text itself; rendering happens once, at the emitter boundary, via
//! the `Display` impls here. Operator statements are kept as flat
//! [`Expr::Chain`]s because their meaning is the target language's
//! precedence over the rendered token sequence.

use std::fmt;

use crate::types::Literal;

/// Number of spaces per indentation level.
const INDENT_WIDTH: usize = 4;

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    PreInc,
    PreDec,
    PostInc,
    PostDec,
    Neg,
    Not,
    BitNot,
}

impl UnaryOp {
    /// `++`/`--` in either position.
    pub fn is_inc_dec(self) -> bool {
        matches!(
            self,
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec
        )
    }

    fn symbol(self) -> &'static str {
        match self {
            UnaryOp::PreInc | UnaryOp::PostInc => "++",
            UnaryOp::PreDec | UnaryOp::PostDec => "--",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }

    fn is_postfix(self) -> bool {
        matches!(self, UnaryOp::PostInc | UnaryOp::PostDec)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    And,
    Or,
    /// Boolean `^`.
    Xor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub const ARITHMETIC: [BinaryOp; 5] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Rem,
    ];
    pub const NON_DIVIDING_ARITHMETIC: [BinaryOp; 3] = [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul];
    pub const BITWISE: [BinaryOp; 6] = [
        BinaryOp::BitAnd,
        BinaryOp::BitOr,
        BinaryOp::BitXor,
        BinaryOp::Shl,
        BinaryOp::Shr,
        BinaryOp::UShr,
    ];
    pub const LOGICAL: [BinaryOp; 3] = [BinaryOp::And, BinaryOp::Or, BinaryOp::Xor];
    pub const RELATIONAL: [BinaryOp; 6] = [
        BinaryOp::Eq,
        BinaryOp::Ne,
        BinaryOp::Lt,
        BinaryOp::Le,
        BinaryOp::Gt,
        BinaryOp::Ge,
    ];

    /// `/` or `%`: the right operand is a divisor.
    pub fn is_dividing(self) -> bool {
        matches!(self, BinaryOp::Div | BinaryOp::Rem)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor | BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// Who a call is made on.
#[derive(Debug, Clone, PartialEq)]
pub enum CallTarget {
    /// Unqualified: a method of the generated class.
    Implicit,
    /// A static member of a library class, e.g. `Math` or `System.out`.
    Class(String),
    /// An instance method of a value.
    Value(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A field, local, or parameter.
    Var(String),
    Literal(Literal),
    /// A library constant such as `Integer.MAX_VALUE`.
    StaticField {
        class: &'static str,
        name: &'static str,
    },
    Unary(UnaryOp, Box<Expr>),
    /// `first op1 e1 op2 e2 ...`, rendered without added parentheses.
    Chain {
        first: Box<Expr>,
        rest: Vec<(BinaryOp, Expr)>,
    },
    Paren(Box<Expr>),
    Cast {
        ty: String,
        expr: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call {
        target: CallTarget,
        name: String,
        args: Vec<Expr>,
    },
    New {
        class: String,
        args: Vec<Expr>,
    },
    NewArray {
        element: String,
        lengths: Vec<Expr>,
    },
    /// Field access on a value, e.g. `arr.length`.
    Member {
        receiver: Box<Expr>,
        name: String,
    },
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn int(value: i32) -> Self {
        Expr::Literal(Literal::Int(value))
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Chain {
            first: Box::new(lhs),
            rest: vec![(op, rhs)],
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary(op, Box::new(operand))
    }

    pub fn paren(inner: Expr) -> Self {
        Expr::Paren(Box::new(inner))
    }

    /// `(ty) expr`, parenthesizing `expr` unless it is atomic.
    pub fn cast(ty: impl Into<String>, expr: Expr) -> Self {
        let expr = match expr {
            Expr::Chain { .. } | Expr::Ternary { .. } | Expr::Cast { .. } | Expr::Unary(..) => {
                Expr::paren(expr)
            }
            other => other,
        };
        Expr::Cast {
            ty: ty.into(),
            expr: Box::new(expr),
        }
    }

    pub fn ternary(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::Ternary {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn static_call(class: impl Into<String>, name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            target: CallTarget::Class(class.into()),
            name: name.into(),
            args,
        }
    }

    /// `a && b && ...`; `None` for an empty list.
    pub fn all_of(conditions: Vec<Expr>) -> Option<Expr> {
        let mut iter = conditions.into_iter();
        let first = iter.next()?;
        let rest: Vec<_> = iter.map(|c| (BinaryOp::And, c)).collect();
        if rest.is_empty() {
            return Some(first);
        }
        Some(Expr::Chain {
            first: Box::new(first),
            rest,
        })
    }

    /// Pre-order traversal of this expression and all sub-expressions.
    pub fn visit(&self, f: &mut dyn FnMut(&Expr)) {
        f(self);
        match self {
            Expr::Var(_) | Expr::Literal(_) | Expr::StaticField { .. } => {}
            Expr::Unary(_, inner) | Expr::Paren(inner) | Expr::Cast { expr: inner, .. } => {
                inner.visit(f)
            }
            Expr::Chain { first, rest } => {
                first.visit(f);
                for (_, e) in rest {
                    e.visit(f);
                }
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                cond.visit(f);
                then.visit(f);
                otherwise.visit(f);
            }
            Expr::Call { target, args, .. } => {
                if let CallTarget::Value(receiver) = target {
                    receiver.visit(f);
                }
                args.iter().for_each(|a| a.visit(f));
            }
            Expr::New { args, .. } => args.iter().for_each(|a| a.visit(f)),
            Expr::NewArray { lengths, .. } => lengths.iter().for_each(|a| a.visit(f)),
            Expr::Member { receiver, .. } => receiver.visit(f),
        }
    }
}

impl From<Literal> for Expr {
    fn from(lit: Literal) -> Self {
        Expr::Literal(lit)
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(name) => f.write_str(name),
            Expr::Literal(lit) => f.write_str(&lit.render()),
            Expr::StaticField { class, name } => write!(f, "{class}.{name}"),
            Expr::Unary(op, inner) if op.is_postfix() => write!(f, "{inner}{}", op.symbol()),
            Expr::Unary(op, inner) => write!(f, "{}{inner}", op.symbol()),
            Expr::Chain { first, rest } => {
                write!(f, "{first}")?;
                for (op, e) in rest {
                    write!(f, " {} {e}", op.symbol())?;
                }
                Ok(())
            }
            Expr::Paren(inner) => write!(f, "({inner})"),
            Expr::Cast { ty, expr } => write!(f, "({ty}) {expr}"),
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => write!(f, "{cond} ? {then} : {otherwise}"),
            Expr::Call { target, name, args } => {
                match target {
                    CallTarget::Implicit => {}
                    CallTarget::Class(class) => write!(f, "{class}.")?,
                    CallTarget::Value(receiver) => write!(f, "{receiver}.")?,
                }
                write!(f, "{name}(")?;
                write_args(f, args)?;
                f.write_str(")")
            }
            Expr::New { class, args } => {
                write!(f, "new {class}(")?;
                write_args(f, args)?;
                f.write_str(")")
            }
            Expr::NewArray { element, lengths } => {
                write!(f, "new {element}")?;
                for len in lengths {
                    write!(f, "[{len}]")?;
                }
                Ok(())
            }
            Expr::Member { receiver, name } => write!(f, "{receiver}.{name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// An expression evaluated for its effect.
    Expr(Expr),
    /// `target = value;`.
    Assign { target: String, value: Expr },
    Local {
        ty: String,
        name: String,
        is_final: bool,
        init: Option<Expr>,
    },
    If {
        cond: Expr,
        then: Vec<Stmt>,
        else_ifs: Vec<(Expr, Vec<Stmt>)>,
        otherwise: Option<Vec<Stmt>>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    DoWhile {
        body: Vec<Stmt>,
        cond: Expr,
    },
    For {
        init: Box<Stmt>,
        cond: Expr,
        update: Expr,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
}

impl Stmt {
    pub fn assign(target: impl Into<String>, value: Expr) -> Self {
        Stmt::Assign {
            target: target.into(),
            value,
        }
    }

    /// `if (cond) { body }`.
    pub fn guarded(cond: Expr, body: Vec<Stmt>) -> Self {
        Stmt::If {
            cond,
            then: body,
            else_ifs: Vec::new(),
            otherwise: None,
        }
    }

    /// Visit every expression in this statement and nested statements,
    /// passing the enclosing guard conditions (innermost last).
    pub fn visit_exprs<'s>(&'s self, guards: &mut Vec<&'s Expr>, f: &mut dyn FnMut(&Expr, &[&Expr])) {
        match self {
            Stmt::Expr(e) | Stmt::Assign { value: e, .. } => e.visit(&mut |x| f(x, guards.as_slice())),
            Stmt::Local { init, .. } => {
                if let Some(e) = init {
                    e.visit(&mut |x| f(x, guards.as_slice()));
                }
            }
            Stmt::Return(value) => {
                if let Some(e) = value {
                    e.visit(&mut |x| f(x, guards.as_slice()));
                }
            }
            Stmt::If {
                cond,
                then,
                else_ifs,
                otherwise,
            } => {
                cond.visit(&mut |x| f(x, guards.as_slice()));
                guards.push(cond);
                then.iter().for_each(|s| s.visit_exprs(guards, f));
                guards.pop();
                for (c, body) in else_ifs {
                    c.visit(&mut |x| f(x, guards.as_slice()));
                    guards.push(c);
                    body.iter().for_each(|s| s.visit_exprs(guards, f));
                    guards.pop();
                }
                if let Some(body) = otherwise {
                    body.iter().for_each(|s| s.visit_exprs(guards, f));
                }
            }
            Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
                cond.visit(&mut |x| f(x, guards.as_slice()));
                body.iter().for_each(|s| s.visit_exprs(guards, f));
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                init.visit_exprs(guards, f);
                cond.visit(&mut |x| f(x, guards.as_slice()));
                update.visit(&mut |x| f(x, guards.as_slice()));
                body.iter().for_each(|s| s.visit_exprs(guards, f));
            }
        }
    }

    /// Append this statement to `out` at the given indentation level.
    pub fn render(&self, indent: usize, out: &mut String) {
        let pad = " ".repeat(indent * INDENT_WIDTH);
        match self {
            Stmt::Expr(e) => out.push_str(&format!("{pad}{e};\n")),
            Stmt::Assign { target, value } => out.push_str(&format!("{pad}{target} = {value};\n")),
            Stmt::Local {
                ty,
                name,
                is_final,
                init,
            } => {
                let fin = if *is_final { "final " } else { "" };
                match init {
                    Some(e) => out.push_str(&format!("{pad}{fin}{ty} {name} = {e};\n")),
                    None => out.push_str(&format!("{pad}{fin}{ty} {name};\n")),
                }
            }
            Stmt::If {
                cond,
                then,
                else_ifs,
                otherwise,
            } => {
                out.push_str(&format!("{pad}if ({cond}) {{\n"));
                render_body(then, indent + 1, out);
                for (c, body) in else_ifs {
                    out.push_str(&format!("{pad}}} else if ({c}) {{\n"));
                    render_body(body, indent + 1, out);
                }
                if let Some(body) = otherwise {
                    out.push_str(&format!("{pad}}} else {{\n"));
                    render_body(body, indent + 1, out);
                }
                out.push_str(&format!("{pad}}}\n"));
            }
            Stmt::While { cond, body } => {
                out.push_str(&format!("{pad}while ({cond}) {{\n"));
                render_body(body, indent + 1, out);
                out.push_str(&format!("{pad}}}\n"));
            }
            Stmt::DoWhile { body, cond } => {
                out.push_str(&format!("{pad}do {{\n"));
                render_body(body, indent + 1, out);
                out.push_str(&format!("{pad}}} while ({cond});\n"));
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                let mut header = String::new();
                init.render(0, &mut header);
                let header = header.trim_end().trim_end_matches(';');
                out.push_str(&format!("{pad}for ({header}; {cond}; {update}) {{\n"));
                render_body(body, indent + 1, out);
                out.push_str(&format!("{pad}}}\n"));
            }
            Stmt::Return(None) => out.push_str(&format!("{pad}return;\n")),
            Stmt::Return(Some(e)) => out.push_str(&format!("{pad}return {e};\n")),
        }
    }
}

/// Render a statement list at `indent`.
pub fn render_body(stmts: &[Stmt], indent: usize, out: &mut String) {
    for stmt in stmts {
        stmt.render(indent, out);
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(0, &mut out);
        f.write_str(out.trim_end())
    }
}
