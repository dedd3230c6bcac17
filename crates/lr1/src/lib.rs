//! Canonical LR(1) analysis of context-free grammars.
//!
//! The pipeline runs in a fixed order: FIRST/FOLLOW sets, the canonical
//! collection of LR(1) states, the ACTION/GOTO table, and optionally a
//! traced shift/reduce simulation over an input token sequence.

pub mod analysis;
pub mod automaton;
pub mod first_follow;
pub mod grammar;
pub mod item_set;
pub mod simulate;
pub mod table;
pub mod tree;
pub mod types;
mod util;

pub use crate::{
    analysis::{analyze, simulate, Analysis, AnalysisError, Config},
    grammar::{Grammar, GrammarDef, GrammarError},
    simulate::{ParseResult, ParseStep, Rejection, SimulateError, StepAction},
    table::{Action, ParseTable},
};
