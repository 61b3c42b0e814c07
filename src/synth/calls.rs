//! Calls to generated methods.
//!
//! A callee is always picked through [`ClassScope::can_call`] and the
//! edge is registered before the call expression leaves this module, so a
//! method that has been called can never call back into its callers.

use super::Session;
use crate::ast::{CallTarget, Expr, Stmt};
use crate::resolver::{DestSource, pick_destination, resolve};
use crate::symbols::{ClassScope, Method, MethodId};
use crate::types::{Literal, Type};

impl Session<'_> {
    /// `methodX(args)` for a callee chosen by the caller, with the edge
    /// registered. `None` when an argument cannot be resolved.
    fn call_expr(&mut self, caller: MethodId, callee: MethodId) -> Option<Expr> {
        let params: Vec<_> = self
            .class
            .method(callee)
            .scope
            .params()
            .iter()
            .map(|p| p.ty.clone())
            .collect();
        let mut args = Vec::with_capacity(params.len());
        for ty in &params {
            let arg = resolve(&self.class, caller, ty, &mut self.emit)?;
            // A bare `null` would make overload selection ambiguous.
            let arg = match arg {
                Expr::Literal(Literal::Null) => Expr::cast(ty.source_name(), arg),
                other => other,
            };
            args.push(arg);
        }
        self.class.register_call(caller, callee);
        Some(Expr::Call {
            target: CallTarget::Implicit,
            name: self.class.method(callee).name.clone(),
            args,
        })
    }

    /// `methodX(args);`
    pub fn method_call(&mut self, method: MethodId) -> Option<Stmt> {
        let class = &self.class;
        let callee = class.pick_method(&mut self.emit, |id, _| class.can_call(method, id))?;
        self.call_expr(method, callee).map(Stmt::Expr)
    }

    /// `dest = methodX(args);` into a non-final variable that accepts the
    /// callee's return type.
    pub fn assign_return_value(&mut self, method: MethodId, source: DestSource) -> Option<Stmt> {
        let class = &self.class;
        let dest = pick_destination(class, method, source, &mut self.emit, |ty| {
            class
                .methods()
                .any(|(id, m)| returns_into(class, method, id, m, ty))
        })?;
        let callee = class.pick_method(&mut self.emit, |id, m| {
            returns_into(class, method, id, m, &dest.ty)
        })?;
        let call = self.call_expr(method, callee)?;
        self.note_assignment(method, &dest, false);
        Some(Stmt::assign(dest.name.clone(), call))
    }
}

/// Whether `caller` may call `callee` and store its result in `ty`.
fn returns_into(class: &ClassScope, caller: MethodId, callee: MethodId, m: &Method, ty: &Type) -> bool {
    class.can_call(caller, callee) && ty.is_assignable_from(&m.return_type)
}
