//! Table-driven shift/reduce simulation with a full step trace.

use crate::{
    automaton::StateID,
    grammar::{Grammar, NonterminalID, ProductionID, SymbolID, TerminalID, EOI_NAME},
    table::{Action, ConflictKind, ParseTable},
    tree::{self, ParseTree},
    util::{display_fn, write_joined},
};
use std::fmt;

/// What the simulator did in a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    Shift(StateID),
    Reduce {
        production: ProductionID,
        goto: StateID,
    },
    Accept,
    Error(Rejection),
}

impl StepAction {
    // `"shift 4"`, `"reduce E -> E + T"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| match self {
            Self::Shift(next) => write!(f, "shift {}", next),
            Self::Reduce { production, .. } => {
                write!(f, "reduce {}", g.production(*production).display(g))
            }
            Self::Accept => f.write_str("accept"),
            Self::Error(rejection) => write!(f, "error: {}", rejection),
        })
    }
}

/// The reason a well-formed input was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("no action in state {} on `{}'", state, token)]
    NoAction { state: StateID, token: String },

    #[error("{} conflict in state {} on `{}'", kind, state, token)]
    Conflict {
        state: StateID,
        token: String,
        kind: ConflictKind,
    },

    #[error("no goto in state {} on `{}'", state, symbol)]
    MissingGoto { state: StateID, symbol: String },

    #[error("the stack is too shallow to reduce by production {}", production)]
    StackUnderflow { production: ProductionID },
}

/// A snapshot of the parser configuration taken right before `action`.
#[derive(Debug, Clone)]
pub struct ParseStep {
    /// 1-based position of this step in the trace.
    pub index: usize,
    pub state_stack: Vec<StateID>,
    pub symbol_stack: Vec<SymbolID>,
    /// The unread input, always terminated by `$`.
    pub remaining_input: Vec<TerminalID>,
    pub action: StepAction,
    pub production: Option<ProductionID>,
}

impl ParseStep {
    pub fn current_state(&self) -> StateID {
        self.state_stack.last().copied().unwrap_or(StateID::START)
    }

    pub fn current_token(&self) -> TerminalID {
        self.remaining_input.first().copied().unwrap_or(TerminalID::EOI)
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{:>3} | ", self.index)?;
            write_joined(f, " ", &self.state_stack)?;
            f.write_str(" | ")?;
            write_joined(f, " ", self.symbol_stack.iter().map(|s| g.symbol_name(*s)))?;
            f.write_str(" | ")?;
            write_joined(
                f,
                " ",
                self.remaining_input.iter().map(|t| g.terminals[t].name()),
            )?;
            write!(f, " | {}", self.action.display(g))
        })
    }
}

#[derive(Debug, Clone)]
pub struct ParseResult {
    pub accepted: bool,
    pub steps: Vec<ParseStep>,
    /// Present iff `accepted` is false.
    pub error: Option<Rejection>,
    /// The tokenized input, without the end marker.
    pub input: Vec<TerminalID>,
}

impl ParseResult {
    pub fn input_len(&self) -> usize {
        self.input.len()
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// The productions used by the reduce steps, in reverse order.
    ///
    /// For an accepted input this is the rightmost derivation from the
    /// start symbol.
    pub fn rightmost_derivation(&self) -> Vec<ProductionID> {
        let mut productions: Vec<_> = self.steps.iter().filter_map(|s| s.production).collect();
        productions.reverse();
        productions
    }

    /// Rebuild the parse tree by replaying the recorded shifts and reductions.
    ///
    /// Returns `None` unless the input was accepted.
    pub fn tree(&self, g: &Grammar) -> Option<ParseTree> {
        if !self.accepted {
            return None;
        }
        tree::replay(g, &self.steps)
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            f.write_str("## input: ")?;
            write_joined(f, " ", self.input.iter().map(|t| g.terminals[t].name()))?;
            writeln!(f, " ({} token(s))", self.input_len())?;
            writeln!(f, "## trace:")?;
            for step in &self.steps {
                writeln!(f, "{}", step.display(g))?;
            }
            match &self.error {
                None => writeln!(f, "## accepted after {} step(s)", self.total_steps()),
                Some(err) => writeln!(
                    f,
                    "## rejected after {} step(s): {}",
                    self.total_steps(),
                    err
                ),
            }
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SimulateError {
    #[error("unknown terminal `{}' at position {}", token, position)]
    UnknownTerminalInInput { token: String, position: usize },
}

/// Map token names onto the terminal alphabet of `g`.
///
/// A trailing `$` is taken as an explicit end marker and dropped.
pub fn tokenize(g: &Grammar, tokens: &[&str]) -> Result<Vec<TerminalID>, SimulateError> {
    let tokens = match tokens.split_last() {
        Some((&last, init)) if last == EOI_NAME => init,
        _ => tokens,
    };
    tokens
        .iter()
        .enumerate()
        .map(|(position, &token)| match g.terminal_by_name(token) {
            Some(t) if t != TerminalID::EOI => Ok(t),
            _ => Err(SimulateError::UnknownTerminalInInput {
                token: token.into(),
                position,
            }),
        })
        .collect()
}

/// Drive `table` over `tokens` until it accepts or rejects.
pub fn simulate(
    g: &Grammar,
    table: &ParseTable,
    tokens: &[&str],
) -> Result<ParseResult, SimulateError> {
    let input = tokenize(g, tokens)?;
    let mut parser = Parser::new(g, table, &input);
    let error = parser.run().err();

    tracing::debug!(
        "simulation {} after {} step(s)",
        if error.is_none() { "accepted" } else { "rejected" },
        parser.steps.len()
    );

    Ok(ParseResult {
        accepted: error.is_none(),
        steps: parser.steps,
        error,
        input,
    })
}

struct Parser<'a> {
    g: &'a Grammar,
    table: &'a ParseTable,
    input: &'a [TerminalID],
    cursor: usize,
    // The bottom entry carries no symbol.
    stack: Vec<(StateID, Option<SymbolID>)>,
    steps: Vec<ParseStep>,
}

impl<'a> Parser<'a> {
    fn new(g: &'a Grammar, table: &'a ParseTable, input: &'a [TerminalID]) -> Self {
        Self {
            g,
            table,
            input,
            cursor: 0,
            stack: vec![(StateID::START, None)],
            steps: vec![],
        }
    }

    fn lookahead(&self) -> TerminalID {
        self.input.get(self.cursor).copied().unwrap_or(TerminalID::EOI)
    }

    fn top(&self) -> StateID {
        self.stack.last().map_or(StateID::START, |(s, _)| *s)
    }

    fn run(&mut self) -> Result<(), Rejection> {
        loop {
            let state = self.top();
            let lookahead = self.lookahead();
            let token = self.g.terminals[&lookahead].name();

            let action = match self.table.action(state, lookahead) {
                Some(Action::Shift(next)) => StepAction::Shift(*next),
                Some(Action::Reduce(p)) => match self.goto_after_reduce(*p) {
                    Ok(goto) => StepAction::Reduce {
                        production: *p,
                        goto,
                    },
                    Err(rejection) => StepAction::Error(rejection),
                },
                Some(Action::Accept) => StepAction::Accept,
                Some(Action::Conflict(conflict)) => StepAction::Error(Rejection::Conflict {
                    state,
                    token: token.into(),
                    kind: conflict.kind(),
                }),
                None => StepAction::Error(Rejection::NoAction {
                    state,
                    token: token.into(),
                }),
            };
            self.record(action.clone());

            match action {
                StepAction::Shift(next) => {
                    self.stack.push((next, Some(SymbolID::T(lookahead))));
                    self.cursor += 1;
                }
                StepAction::Reduce { production, goto } => {
                    let production = self.g.production(production);
                    let len = self.stack.len() - production.right().len();
                    self.stack.truncate(len);
                    self.stack.push((goto, Some(SymbolID::N(production.left()))));
                }
                StepAction::Accept => return Ok(()),
                StepAction::Error(rejection) => return Err(rejection),
            }
        }
    }

    /// The state exposed after popping the right-hand side of `p`, followed by its goto.
    fn goto_after_reduce(&self, p: ProductionID) -> Result<StateID, Rejection> {
        let production = self.g.production(p);
        let depth = production.right().len();
        if depth >= self.stack.len() {
            return Err(Rejection::StackUnderflow { production: p });
        }
        let (exposed, _) = self.stack[self.stack.len() - depth - 1];
        let left: NonterminalID = production.left();
        self.table
            .goto(exposed, left)
            .ok_or_else(|| Rejection::MissingGoto {
                state: exposed,
                symbol: self.g.nonterminals[&left].name().into(),
            })
    }

    fn record(&mut self, action: StepAction) {
        let production = match action {
            StepAction::Reduce { production, .. } => Some(production),
            _ => None,
        };
        let mut remaining_input = self.input[self.cursor.min(self.input.len())..].to_vec();
        remaining_input.push(TerminalID::EOI);

        self.steps.push(ParseStep {
            index: self.steps.len() + 1,
            state_stack: self.stack.iter().map(|(s, _)| *s).collect(),
            symbol_stack: self.stack.iter().filter_map(|(_, sym)| *sym).collect(),
            remaining_input,
            action,
            production,
        });
    }
}
