//! Constrained random generation of valid Java programs for JVM stress
//! testing.
//!
//! A run plans a class skeleton ([`planner`]), then fills every method by
//! performing random generation actions against a [`synth::Session`]. Each
//! action builds a statement tree ([`ast`]) from values the [`resolver`]
//! finds in the symbol tables ([`symbols`], [`scope`]); compound statements
//! are buffered by [`control_flow`] and handed to an [`emitter::Emitter`]
//! only once complete.

pub mod ast;
pub mod control_flow;
pub mod driver;
pub mod emit;
pub mod emitter;
pub mod error;
pub mod manifest;
pub mod names;
pub mod planner;
pub mod profile;
pub mod resolver;
pub mod scope;
pub mod symbols;
pub mod synth;
pub mod types;
