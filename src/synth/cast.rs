//! Primitive cast assignments.

use super::Session;
use crate::ast::{Expr, Stmt};
use crate::resolver::{Destination, pick_variable};
use crate::symbols::MethodId;

impl Session<'_> {
    /// `dest = (T) source;` between two different non-boolean primitive
    /// types. The destination is non-final, the source initialized.
    pub fn cast_assignment(&mut self, method: MethodId) -> Option<Stmt> {
        let dest = pick_variable(&self.class, method, &mut self.emit, |v| {
            !v.is_final() && v.ty.is_castable_primitive()
        })
        .map(Destination::from)?;
        let source = pick_variable(&self.class, method, &mut self.emit, |v| {
            v.is_initialized() && v.ty.is_castable_primitive() && v.ty != dest.ty
        })?
        .name
        .clone();
        self.note_assignment(method, &dest, false);
        Some(Stmt::assign(
            dest.name.clone(),
            Expr::cast(dest.ty.source_name(), Expr::var(source)),
        ))
    }
}
