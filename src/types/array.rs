use super::{IntRange, Type, TypeError};

/// An array of `dim` dimensions over a non-array, non-void element type.
#[derive(Debug, Clone)]
pub struct ArrayType {
    inner: Box<Type>,
    dim: usize,
    /// Optional per-dimension index ranges; when present, one per dimension.
    restrictions: Option<Vec<Option<IntRange>>>,
}

impl ArrayType {
    pub fn new(inner: Type, dim: usize) -> Result<Self, TypeError> {
        if dim == 0 {
            return Err(TypeError::ZeroDimension);
        }
        if matches!(inner, Type::Array(_) | Type::Void) {
            return Err(TypeError::InvalidElement(inner.source_name()));
        }
        Ok(Self {
            inner: Box::new(inner),
            dim,
            restrictions: None,
        })
    }

    /// Attach per-dimension access ranges.
    pub fn with_restrictions(
        mut self,
        restrictions: Vec<Option<IntRange>>,
    ) -> Result<Self, TypeError> {
        if restrictions.len() != self.dim {
            return Err(TypeError::RestrictionArity {
                expected: self.dim,
                found: restrictions.len(),
            });
        }
        self.restrictions = Some(restrictions);
        Ok(self)
    }

    pub fn inner(&self) -> &Type {
        &self.inner
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn restrictions(&self) -> Option<&[Option<IntRange>]> {
        self.restrictions.as_deref()
    }

    pub fn descriptor(&self) -> String {
        format!("{}{}", "[".repeat(self.dim), self.inner.descriptor())
    }

    pub fn source_name(&self) -> String {
        format!("{}{}", self.inner.source_name(), "[]".repeat(self.dim))
    }
}
