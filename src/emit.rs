//! The [`Emit`] handle: the single random source of a generation run, plus
//! the record of every action performed so far.
//!
//! `Emit` owns the RNG exclusively; every component draws through it, so a
//! seed, a [`GenerationConfig`] and a driver reproduce the same program byte
//! for byte. It implements [`RngCore`] so it can be handed to anything that
//! takes `&mut impl Rng`.

use std::fmt;

use rand::{Rng, RngCore};

// ---------------------------------------------------------------------------
// GenerationConfig
// ---------------------------------------------------------------------------

/// Knobs read by the synthesizer and the control-flow engine.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Loop bounds are drawn below this.
    pub max_loop_iterations: u32,
    /// Maximum number of `else if` branches per `if`.
    pub if_branching_factor: usize,
    /// Maximum operand count of an operator statement.
    pub max_operators: usize,
    /// Guard library calls that may overflow.
    pub no_overflow: bool,
    /// Guard divisions and library calls that may divide by zero.
    pub no_div_by_zero: bool,
    /// Random seed; recorded in every failure report.
    pub seed: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_loop_iterations: 10,
            if_branching_factor: 2,
            max_operators: 4,
            no_overflow: false,
            no_div_by_zero: false,
            seed: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Actions and trace
// ---------------------------------------------------------------------------

/// A top-level generation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    DeclareLocal,
    OperatorStatement,
    AssignOperatorToField,
    AssignOperatorToLocal,
    MathCall,
    AssignMathToField,
    AssignMathToLocal,
    Cast,
    MethodCall,
    AssignReturnToField,
    AssignReturnToLocal,
    IfElse,
    While,
    For,
    DoWhile,
}

impl Action {
    pub const ALL: [Action; 15] = [
        Action::DeclareLocal,
        Action::OperatorStatement,
        Action::AssignOperatorToField,
        Action::AssignOperatorToLocal,
        Action::MathCall,
        Action::AssignMathToField,
        Action::AssignMathToLocal,
        Action::Cast,
        Action::MethodCall,
        Action::AssignReturnToField,
        Action::AssignReturnToLocal,
        Action::IfElse,
        Action::While,
        Action::For,
        Action::DoWhile,
    ];

    /// Opens a compound statement whose body the driver fills.
    pub fn is_compound(self) -> bool {
        matches!(self, Action::IfElse | Action::While | Action::For | Action::DoWhile)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("{self:?}"));
        f.write_str(&name)
    }
}

/// One performed action, in call order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TraceEntry {
    pub action: Action,
    pub method: String,
    /// `false` when the action found nothing to generate.
    pub produced: bool,
}

// ---------------------------------------------------------------------------
// Emit
// ---------------------------------------------------------------------------

/// Random source and action log of one run.
pub struct Emit<'a> {
    /// Type-erased to avoid generic explosion.
    rng: &'a mut dyn RngCore,
    trace: Vec<TraceEntry>,
}

impl<'a> Emit<'a> {
    pub fn new(rng: &'a mut dyn RngCore) -> Self {
        Self {
            rng,
            trace: Vec::new(),
        }
    }
}

impl Emit<'_> {
    /// Append an action to the trace and return its position.
    pub fn record(&mut self, action: Action, method: &str, produced: bool) -> usize {
        tracing::trace!(%action, method, "action");
        self.trace.push(TraceEntry {
            action,
            method: method.to_string(),
            produced,
        });
        self.trace.len() - 1
    }

    /// Update the outcome of a recorded action once it has finished.
    pub fn set_produced(&mut self, index: usize, produced: bool) {
        if let Some(entry) = self.trace.get_mut(index) {
            entry.produced = produced;
        }
    }

    /// Everything recorded so far.
    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// Uniform draw from `0..max`, or 0 when `max` is 0.
    pub fn below(&mut self, max: u32) -> u32 {
        if max == 0 { 0 } else { self.gen_range(0..max) }
    }

    /// Uniform draw from the inclusive `(lo, hi)` pair, tolerating `lo > hi`.
    pub fn in_range(&mut self, (lo, hi): (usize, usize)) -> usize {
        if lo >= hi { lo } else { self.gen_range(lo..=hi) }
    }
}

impl RngCore for Emit<'_> {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}
