//! The end-to-end pipeline from a grammar to its parse table.

use crate::{
    automaton::{self, Automaton, BuildError, Limit},
    first_follow::FirstFollow,
    grammar::{Grammar, GrammarError},
    simulate::{ParseResult, SimulateError},
    table::{self, ParseTable},
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Resource ceilings and switches applied while analyzing a grammar.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) max_productions: usize,
    pub(crate) max_states: usize,
    pub(crate) max_items: usize,
    pub(crate) retain_partial: bool,
    pub(crate) cancel: Option<Arc<AtomicBool>>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub const fn new() -> Self {
        Self {
            max_productions: 1000,
            max_states: 10_000,
            max_items: 1_000_000,
            retain_partial: false,
            cancel: None,
        }
    }

    /// Reject grammars with more user productions than `max`.
    pub fn max_productions(&mut self, max: usize) -> &mut Self {
        self.max_productions = max;
        self
    }

    /// Abort the automaton construction once it would exceed `max` states.
    pub fn max_states(&mut self, max: usize) -> &mut Self {
        self.max_states = max;
        self
    }

    /// Abort the automaton construction once the states together would
    /// hold more than `max` items.
    pub fn max_items(&mut self, max: usize) -> &mut Self {
        self.max_items = max;
        self
    }

    /// Attach the states built so far to a resource limit error.
    pub fn retain_partial(&mut self, enabled: bool) -> &mut Self {
        self.retain_partial = enabled;
        self
    }

    /// Observe `flag` between the pipeline phases and stop with
    /// [`AnalysisError::Cancelled`] once it is set.
    pub fn cancel_flag(&mut self, flag: Arc<AtomicBool>) -> &mut Self {
        self.cancel = Some(flag);
        self
    }

    fn check_cancelled(&self) -> Result<(), AnalysisError> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(AnalysisError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Run every analysis phase over `grammar`.
    pub fn analyze(&self, grammar: &Grammar) -> Result<Analysis, AnalysisError> {
        let productions = grammar.productions.len() - 1;
        if productions > self.max_productions {
            return Err(BuildError::ResourceLimitExceeded {
                limit: Limit::Productions,
                max: self.max_productions,
                partial: None,
            }
            .into());
        }

        self.check_cancelled()?;
        let first_follow = FirstFollow::compute(grammar);
        tracing::debug!("computed FIRST/FOLLOW sets");

        self.check_cancelled()?;
        let automaton = automaton::build(grammar, &first_follow.first, self)?;

        self.check_cancelled()?;
        let table = table::synthesize(grammar, &automaton);

        Ok(Analysis {
            first_follow,
            automaton,
            table,
        })
    }
}

/// Everything derived from a grammar.
#[derive(Debug)]
pub struct Analysis {
    pub first_follow: FirstFollow,
    pub automaton: Automaton,
    pub table: ParseTable,
}

impl Analysis {
    /// Run the table-driven parser over `tokens`.
    pub fn simulate(&self, grammar: &Grammar, tokens: &[&str]) -> Result<ParseResult, SimulateError> {
        crate::simulate::simulate(grammar, &self.table, tokens)
    }
}

/// Analyze `grammar` with the default configuration.
pub fn analyze(grammar: &Grammar) -> Result<Analysis, AnalysisError> {
    Config::new().analyze(grammar)
}

/// Analyze `grammar` with the default configuration and parse `tokens`.
pub fn simulate(grammar: &Grammar, tokens: &[&str]) -> Result<ParseResult, AnalysisError> {
    let analysis = analyze(grammar)?;
    Ok(analysis.simulate(grammar, tokens)?)
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Simulate(#[from] SimulateError),

    #[error("the analysis was cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    fn list_grammar() -> Grammar {
        // L -> L , x | x
        Grammar::define(|g| {
            let comma = g.terminal(",")?;
            let x = g.terminal("x")?;
            let l = g.nonterminal("L")?;
            g.production(l, [N(l), T(comma), T(x)])?;
            g.production(l, [T(x)])?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn default_pipeline() {
        let g = list_grammar();
        let analysis = analyze(&g).unwrap();
        assert_eq!(analysis.table.states.len(), analysis.automaton.len());
        assert!(!analysis.table.has_conflicts());

        let result = analysis.simulate(&g, &["x", ",", "x"]).unwrap();
        assert!(result.accepted);
    }

    #[test]
    fn production_limit() {
        let g = list_grammar();
        let err = Config::new().max_productions(1).analyze(&g).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Build(BuildError::ResourceLimitExceeded {
                limit: Limit::Productions,
                max: 1,
                ..
            })
        ));
        assert!(Config::new().max_productions(2).analyze(&g).is_ok());
    }

    #[test]
    fn cancellation_is_observed() {
        let g = list_grammar();
        let flag = Arc::new(AtomicBool::new(true));
        let err = Config::new()
            .cancel_flag(flag.clone())
            .analyze(&g)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled));

        flag.store(false, Ordering::Relaxed);
        assert!(Config::new().cancel_flag(flag).analyze(&g).is_ok());
    }

    #[test]
    fn unknown_token_surfaces_through_simulate() {
        let g = list_grammar();
        let err = simulate(&g, &["x", "y"]).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Simulate(SimulateError::UnknownTerminalInInput { position: 1, .. })
        ));
    }
}
