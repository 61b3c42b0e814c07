//! The boundary between synthesis and the artifact being built.
//!
//! An [`Emitter`] receives the class skeleton (fields and methods) and then
//! finished fragments keyed by method signature. It either accepts a
//! fragment or rejects it; rejection is fatal to the run.
//!
//! [`SourceEmitter`] is the reference implementation. It checks each
//! fragment the way a compiler front end would (identifiers resolve,
//! finals are not reassigned, static methods stay static, locals do not
//! shadow each other) and renders the finished class as Java source.

use thiserror::Error;

use crate::ast::{CallTarget, Expr, Stmt, UnaryOp, render_body};
use crate::scope::Modifiers;
use crate::symbols::{Method, MethodSignature};
use crate::types::Type;

/// Why an emitter refused a declaration or fragment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct Rejection {
    pub reason: String,
}

impl Rejection {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub modifiers: Modifiers,
    pub ty: Type,
    pub name: String,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub modifiers: Modifiers,
    pub return_type: Type,
    pub name: String,
    pub params: Vec<(String, Type)>,
}

impl MethodDecl {
    pub fn signature(&self) -> MethodSignature {
        MethodSignature {
            name: self.name.clone(),
            params: self.params.iter().map(|(_, ty)| ty.descriptor()).collect(),
        }
    }
}

impl From<&Method> for MethodDecl {
    fn from(method: &Method) -> Self {
        Self {
            modifiers: method.modifiers,
            return_type: method.return_type.clone(),
            name: method.name.clone(),
            params: method
                .scope
                .params()
                .iter()
                .map(|p| (p.name.clone(), p.ty.clone()))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Consumer of declarations and finished fragments.
pub trait Emitter {
    fn declare_field(&mut self, decl: FieldDecl) -> Result<(), Rejection>;

    fn declare_method(&mut self, decl: MethodDecl) -> Result<(), Rejection>;

    /// Append `fragment` to the body of `method`, or refuse it as a whole.
    fn insert(&mut self, method: &MethodSignature, fragment: &[Stmt]) -> Result<(), Rejection>;

    /// Set the trailing `return` of a non-void method.
    fn set_return(&mut self, method: &MethodSignature, value: Expr) -> Result<(), Rejection>;

    fn has_method(&self, method: &MethodSignature) -> bool;
}

// ---------------------------------------------------------------------------
// SourceEmitter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Local {
    name: String,
    is_final: bool,
}

#[derive(Debug, Clone)]
struct MethodBody {
    decl: MethodDecl,
    body: Vec<Stmt>,
    /// Top-level locals declared by accepted fragments.
    locals: Vec<Local>,
    ret: Option<Expr>,
}

/// Validating emitter that renders Java source.
#[derive(Debug, Clone)]
pub struct SourceEmitter {
    class_name: String,
    fields: Vec<FieldDecl>,
    methods: Vec<MethodBody>,
}

impl SourceEmitter {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Accepted statements of `method`, in insertion order.
    pub fn body(&self, method: &MethodSignature) -> Option<&[Stmt]> {
        self.find(method).map(|m| m.body.as_slice())
    }

    /// Every accepted statement of every method.
    pub fn statements(&self) -> impl Iterator<Item = &Stmt> {
        self.methods.iter().flat_map(|m| m.body.iter())
    }

    fn find(&self, sig: &MethodSignature) -> Option<&MethodBody> {
        self.methods.iter().find(|m| m.decl.signature() == *sig)
    }

    fn find_index(&self, sig: &MethodSignature) -> Option<usize> {
        self.methods.iter().position(|m| m.decl.signature() == *sig)
    }

    /// The whole class as Java source.
    pub fn render(&self) -> String {
        let mut out = format!("public class {} {{\n", self.class_name);
        for field in &self.fields {
            out.push_str(&format!(
                "    {}{} {}",
                field.modifiers.render(),
                field.ty.source_name(),
                field.name
            ));
            if let Some(init) = &field.init {
                out.push_str(&format!(" = {init}"));
            }
            out.push_str(";\n");
        }
        for method in &self.methods {
            let params: Vec<String> = method
                .decl
                .params
                .iter()
                .map(|(name, ty)| format!("{} {name}", ty.source_name()))
                .collect();
            out.push_str(&format!(
                "\n    {}{} {}({}) {{\n",
                method.decl.modifiers.render(),
                method.decl.return_type.source_name(),
                method.decl.name,
                params.join(", ")
            ));
            render_body(&method.body, 2, &mut out);
            if let Some(ret) = &method.ret {
                out.push_str(&format!("        return {ret};\n"));
            }
            out.push_str("    }\n");
        }
        out.push_str("}\n");
        out
    }
}

impl Emitter for SourceEmitter {
    fn declare_field(&mut self, decl: FieldDecl) -> Result<(), Rejection> {
        if self.fields.iter().any(|f| f.name == decl.name) {
            return Err(Rejection::new(format!("duplicate field `{}`", decl.name)));
        }
        if decl.modifiers.is_final && decl.init.is_none() {
            return Err(Rejection::new(format!("final field `{}` has no initializer", decl.name)));
        }
        self.fields.push(decl);
        Ok(())
    }

    fn declare_method(&mut self, decl: MethodDecl) -> Result<(), Rejection> {
        let sig = decl.signature();
        if self.find(&sig).is_some() {
            return Err(Rejection::new(format!("duplicate method `{sig}`")));
        }
        self.methods.push(MethodBody {
            decl,
            body: Vec::new(),
            locals: Vec::new(),
            ret: None,
        });
        Ok(())
    }

    fn insert(&mut self, method: &MethodSignature, fragment: &[Stmt]) -> Result<(), Rejection> {
        let index = self
            .find_index(method)
            .ok_or_else(|| Rejection::new(format!("no method `{method}`")))?;
        let mut checker = Checker::new(self, &self.methods[index]);
        for stmt in fragment {
            checker.stmt(stmt)?;
        }
        let declared = checker.finish();
        let target = &mut self.methods[index];
        target.locals.extend(declared);
        target.body.extend(fragment.iter().cloned());
        Ok(())
    }

    fn set_return(&mut self, method: &MethodSignature, value: Expr) -> Result<(), Rejection> {
        let index = self
            .find_index(method)
            .ok_or_else(|| Rejection::new(format!("no method `{method}`")))?;
        if self.methods[index].decl.return_type == Type::Void {
            return Err(Rejection::new(format!("`{method}` returns void")));
        }
        Checker::new(self, &self.methods[index]).expr(&value)?;
        self.methods[index].ret = Some(value);
        Ok(())
    }

    fn has_method(&self, method: &MethodSignature) -> bool {
        self.find(method).is_some()
    }
}

// ---------------------------------------------------------------------------
// Checker
// ---------------------------------------------------------------------------

/// Name resolution over one fragment.
struct Checker<'e> {
    emitter: &'e SourceEmitter,
    method: &'e MethodBody,
    /// Block scopes of the fragment; the first is its top level.
    scopes: Vec<Vec<Local>>,
}

impl<'e> Checker<'e> {
    fn new(emitter: &'e SourceEmitter, method: &'e MethodBody) -> Self {
        Self {
            emitter,
            method,
            scopes: vec![Vec::new()],
        }
    }

    /// Top-level locals the fragment declared.
    fn finish(mut self) -> Vec<Local> {
        self.scopes.swap_remove(0)
    }

    fn is_static(&self) -> bool {
        self.method.decl.modifiers.is_static
    }

    /// `Some(is_final)` for a local or parameter named `name`.
    fn local(&self, name: &str) -> Option<bool> {
        self.scopes
            .iter()
            .rev()
            .flatten()
            .chain(self.method.locals.iter())
            .find(|l| l.name == name)
            .map(|l| l.is_final)
            .or_else(|| {
                self.method
                    .decl
                    .params
                    .iter()
                    .any(|(p, _)| p == name)
                    .then_some(false)
            })
    }

    /// Resolve `name`; returns whether it is final.
    fn resolve(&self, name: &str) -> Result<bool, Rejection> {
        if let Some(is_final) = self.local(name) {
            return Ok(is_final);
        }
        let field = self
            .emitter
            .fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| Rejection::new(format!("unknown identifier `{name}`")))?;
        if self.is_static() && !field.modifiers.is_static {
            return Err(Rejection::new(format!(
                "instance field `{name}` used from static method `{}`",
                self.method.decl.name
            )));
        }
        Ok(field.modifiers.is_final)
    }

    fn writable(&self, name: &str) -> Result<(), Rejection> {
        if self.resolve(name)? {
            return Err(Rejection::new(format!("assignment to final `{name}`")));
        }
        Ok(())
    }

    fn block(&mut self, stmts: &[Stmt]) -> Result<(), Rejection> {
        self.scopes.push(Vec::new());
        let result = stmts.iter().try_for_each(|s| self.stmt(s));
        self.scopes.pop();
        result
    }

    fn declare(&mut self, name: &str, is_final: bool) -> Result<(), Rejection> {
        if self.local(name).is_some() {
            return Err(Rejection::new(format!("`{name}` is already defined")));
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(Local {
                name: name.to_string(),
                is_final,
            });
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), Rejection> {
        match stmt {
            Stmt::Expr(e) => self.expr(e),
            Stmt::Assign { target, value, .. } => {
                self.expr(value)?;
                self.writable(target)
            }
            Stmt::Local {
                name,
                is_final,
                init,
                ..
            } => {
                if let Some(e) = init {
                    self.expr(e)?;
                } else if *is_final {
                    return Err(Rejection::new(format!("final local `{name}` has no initializer")));
                }
                self.declare(name, *is_final)
            }
            Stmt::If {
                cond,
                then,
                else_ifs,
                otherwise,
            } => {
                self.expr(cond)?;
                self.block(then)?;
                for (c, body) in else_ifs {
                    self.expr(c)?;
                    self.block(body)?;
                }
                match otherwise {
                    Some(body) => self.block(body),
                    None => Ok(()),
                }
            }
            Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
                self.expr(cond)?;
                self.block(body)
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                self.scopes.push(Vec::new());
                let result = self
                    .stmt(init)
                    .and_then(|()| self.expr(cond))
                    .and_then(|()| self.expr(update))
                    .and_then(|()| self.block(body));
                self.scopes.pop();
                result
            }
            Stmt::Return(value) => match value {
                Some(e) => self.expr(e),
                None => Ok(()),
            },
        }
    }

    fn expr(&self, expr: &Expr) -> Result<(), Rejection> {
        match expr {
            Expr::Var(name) => self.resolve(name).map(|_| ()),
            Expr::Literal(_) | Expr::StaticField { .. } => Ok(()),
            Expr::Unary(op, inner) => {
                if op.is_inc_dec() {
                    let Expr::Var(name) = inner.as_ref() else {
                        return Err(Rejection::new(format!("`{}` applied to a non-variable", unary_name(*op))));
                    };
                    self.writable(name)?;
                }
                self.expr(inner)
            }
            Expr::Chain { first, rest } => {
                self.expr(first)?;
                rest.iter().try_for_each(|(_, e)| self.expr(e))
            }
            Expr::Paren(inner) | Expr::Cast { expr: inner, .. } => self.expr(inner),
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                self.expr(cond)?;
                self.expr(then)?;
                self.expr(otherwise)
            }
            Expr::Call { target, name, args } => {
                match target {
                    CallTarget::Implicit => self.implicit_call(name, args.len())?,
                    CallTarget::Value(receiver) => self.expr(receiver)?,
                    CallTarget::Class(_) => {}
                }
                args.iter().try_for_each(|a| self.expr(a))
            }
            Expr::New { args, .. } => args.iter().try_for_each(|a| self.expr(a)),
            Expr::NewArray { lengths, .. } => lengths.iter().try_for_each(|a| self.expr(a)),
            Expr::Member { receiver, .. } => self.expr(receiver),
        }
    }

    fn implicit_call(&self, name: &str, arity: usize) -> Result<(), Rejection> {
        let candidates: Vec<&MethodBody> = self
            .emitter
            .methods
            .iter()
            .filter(|m| m.decl.name == name && m.decl.params.len() == arity)
            .collect();
        if candidates.is_empty() {
            return Err(Rejection::new(format!("no method `{name}` taking {arity} arguments")));
        }
        if self.is_static() && candidates.iter().all(|m| !m.decl.modifiers.is_static) {
            return Err(Rejection::new(format!(
                "instance method `{name}` called from static method `{}`",
                self.method.decl.name
            )));
        }
        Ok(())
    }
}

fn unary_name(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::PreInc | UnaryOp::PostInc => "++",
        _ => "--",
    }
}
