//! Synthesis of the ACTION/GOTO parse table from an LR(1) automaton.

use crate::{
    automaton::{Automaton, StateID},
    grammar::{Grammar, NonterminalID, ProductionID, SymbolID, TerminalID},
    types::Map,
    util::{display_fn, write_joined},
};
use std::fmt;

/// The action that the LR automaton in a state performs on a particular
/// lookahead symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Read a lookahead symbol and transition to the specified state.
    Shift(StateID),

    /// Reduce to the specified production rule.
    Reduce(ProductionID),

    Accept,

    /// There are multiple conflicting actions for the lookahead symbol.
    Conflict(Conflict),
}

impl Action {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| match self {
            Self::Shift(next) => write!(f, "shift({})", next),
            Self::Reduce(p) => write!(f, "reduce({})", g.production(*p).display(g)),
            Self::Accept => f.write_str("accept"),
            Self::Conflict(conflict) => {
                write!(f, "conflict({}: ", conflict.kind)?;
                write_joined(f, " | ", conflict.candidates.iter().map(|c| c.display(g)))?;
                f.write_str(")")
            }
        })
    }
}

/// One of the competing actions recorded in a conflicting cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Candidate {
    Shift(StateID),
    Reduce(ProductionID),
    Accept,
}

impl Candidate {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| match self {
            Self::Shift(next) => write!(f, "shift({})", next),
            Self::Reduce(p) => write!(f, "reduce({})", g.production(*p).display(g)),
            Self::Accept => f.write_str("accept"),
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShiftReduce => f.write_str("shift/reduce"),
            Self::ReduceReduce => f.write_str("reduce/reduce"),
        }
    }
}

/// A table cell claimed by more than one action.
///
/// Only built by [`synthesize`], so there are always at least two candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    kind: ConflictKind,
    candidates: Vec<Candidate>,
}

impl Conflict {
    pub fn kind(&self) -> ConflictKind {
        self.kind
    }

    /// The shift first (if any), then the accept (if any), then the
    /// reductions in production order.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// The default resolution shown in the table: the shift when there is
    /// one, otherwise the first candidate.
    pub fn preferred(&self) -> Candidate {
        // candidates are never empty, and a shift always comes first.
        self.candidates[0]
    }
}

#[derive(Debug, Default)]
#[non_exhaustive]
pub struct ParseTableRow {
    pub actions: Map<TerminalID, Action>,
    pub gotos: Map<NonterminalID, StateID>,
}

#[derive(Debug)]
pub struct ParseTable {
    pub states: Map<StateID, ParseTableRow>,
}

impl ParseTable {
    pub fn action(&self, state: StateID, lookahead: TerminalID) -> Option<&Action> {
        self.states.get(&state)?.actions.get(&lookahead)
    }

    pub fn goto(&self, state: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.states.get(&state)?.gotos.get(&symbol).copied()
    }

    /// Iterate over every conflicting cell.
    pub fn conflicts(&self) -> impl Iterator<Item = (StateID, TerminalID, &Conflict)> + '_ {
        self.states.iter().flat_map(|(&state, row)| {
            row.actions.iter().filter_map(move |(&t, action)| match action {
                Action::Conflict(conflict) => Some((state, t, conflict)),
                _ => None,
            })
        })
    }

    pub fn has_conflicts(&self) -> bool {
        self.conflicts().next().is_some()
    }

    /// The ACTION column headers: user terminals followed by `$`.
    pub fn terminals<'g>(&self, g: &'g Grammar) -> Vec<&'g str> {
        g.user_terminals()
            .map(|t| t.name())
            .chain(Some(g.terminals[&TerminalID::EOI].name()))
            .collect()
    }

    /// The GOTO column headers: user nonterminals.
    pub fn nonterminals<'g>(&self, g: &'g Grammar) -> Vec<&'g str> {
        g.user_nonterminals().map(|n| n.name()).collect()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (i, (id, row)) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }

                writeln!(f, "#### State {:02}", id)?;
                writeln!(f, "## actions")?;
                for (token, action) in &row.actions {
                    let token = &g.terminals[token];
                    writeln!(f, "- {} => {}", token, action.display(g))?;
                    if let Action::Conflict(conflict) = action {
                        writeln!(f, "  (default: {})", conflict.preferred().display(g))?;
                    }
                }

                if !row.gotos.is_empty() {
                    writeln!(f, "## gotos")?;
                    for (symbol, goto) in &row.gotos {
                        writeln!(f, "- {} => goto({})", g.nonterminals[symbol], goto)?;
                    }
                }
            }
            Ok(())
        })
    }
}

/// Derive the ACTION/GOTO table from the automaton.
///
/// Conflicts never abort the synthesis; they become [`Action::Conflict`] cells.
pub fn synthesize(g: &Grammar, automaton: &Automaton) -> ParseTable {
    let mut states = Map::default();
    for state in automaton.states() {
        #[derive(Default)]
        struct PendingAction {
            shift: Option<StateID>,
            accept: bool,
            reduces: Vec<ProductionID>,
        }
        let mut pending_actions = Map::<TerminalID, PendingAction>::default();
        let mut gotos = Map::default();

        for item in state.items() {
            match item.next_symbol(g) {
                Some(SymbolID::T(t)) => {
                    if let Some(next) = automaton.transition(state.id(), SymbolID::T(t)) {
                        pending_actions.entry(t).or_default().shift.replace(next);
                    }
                }
                Some(SymbolID::N(n)) => {
                    if let Some(next) = automaton.transition(state.id(), SymbolID::N(n)) {
                        gotos.insert(n, next);
                    }
                }
                None if item.production == ProductionID::ACCEPT => {
                    pending_actions.entry(item.lookahead).or_default().accept = true;
                }
                None => {
                    let action = pending_actions.entry(item.lookahead).or_default();
                    if !action.reduces.contains(&item.production) {
                        action.reduces.push(item.production);
                    }
                }
            }
        }

        let mut actions: Map<TerminalID, Action> = Map::default();
        for (t, mut pending) in pending_actions {
            pending.reduces.sort();
            let action = match (pending.shift, pending.accept, &pending.reduces[..]) {
                (Some(next), false, []) => Action::Shift(next),
                (None, true, []) => Action::Accept,
                (None, false, [reduce]) => Action::Reduce(*reduce),
                (shift, accept, reduces) => {
                    let candidates: Vec<Candidate> = shift
                        .map(Candidate::Shift)
                        .into_iter()
                        .chain(accept.then_some(Candidate::Accept))
                        .chain(reduces.iter().copied().map(Candidate::Reduce))
                        .collect();
                    let kind = if shift.is_some() {
                        ConflictKind::ShiftReduce
                    } else {
                        ConflictKind::ReduceReduce
                    };
                    tracing::debug!(
                        "{} conflict in state {} on `{}'",
                        kind,
                        state.id(),
                        g.terminals[&t]
                    );
                    Action::Conflict(Conflict { kind, candidates })
                }
            };
            actions.insert(t, action);
        }
        actions.sort_keys();
        gotos.sort_keys();

        states.insert(state.id(), ParseTableRow { actions, gotos });
    }

    let table = ParseTable { states };
    tracing::debug!(
        "synthesized parse table: {} row(s), {} conflict(s)",
        table.states.len(),
        table.conflicts().count()
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::Config, automaton::build, first_follow::compute_first, grammar::SymbolID::*,
    };

    fn generate(g: &Grammar) -> (Automaton, ParseTable) {
        let first = compute_first(g);
        let automaton = build(g, &first, &Config::new()).unwrap();
        let table = synthesize(g, &automaton);
        (automaton, table)
    }

    #[test]
    fn expression_table_has_no_conflicts() {
        let g = Grammar::define(|g| {
            let plus = g.terminal("+")?;
            let id = g.terminal("id")?;
            let s = g.nonterminal("S")?;
            let e = g.nonterminal("E")?;
            let t = g.nonterminal("T")?;
            g.production(s, [N(e)])?;
            g.production(e, [N(e), T(plus), N(t)])?;
            g.production(e, [N(t)])?;
            g.production(t, [T(id)])?;
            Ok(())
        })
        .unwrap();
        let (automaton, table) = generate(&g);
        eprintln!("{}", table.display(&g));

        assert!(!table.has_conflicts());
        assert_eq!(table.states.len(), automaton.len());

        let id = g.terminal_by_name("id").unwrap();
        let next = automaton.transition(StateID::START, T(id)).unwrap();
        assert_eq!(table.action(StateID::START, id), Some(&Action::Shift(next)));
        assert_eq!(table.action(StateID::START, TerminalID::EOI), None);

        let accept = automaton.accept_states().next().unwrap().id();
        assert_eq!(table.action(accept, TerminalID::EOI), Some(&Action::Accept));
        assert_eq!(
            table.goto(StateID::START, g.start_symbol),
            Some(accept)
        );

        assert_eq!(table.terminals(&g), ["+", "id", "$"]);
        assert_eq!(table.nonterminals(&g), ["S", "E", "T"]);
    }

    #[test]
    fn duplicate_production_yields_reduce_reduce_conflict() {
        // A -> a | a
        let g = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let aa = g.nonterminal("A")?;
            g.production(aa, [T(a)])?;
            g.production(aa, [T(a)])?;
            Ok(())
        })
        .unwrap();
        let (automaton, table) = generate(&g);

        let conflicts: Vec<_> = table.conflicts().collect();
        assert_eq!(conflicts.len(), 1);

        let a = g.terminal_by_name("a").unwrap();
        let (state, lookahead, conflict) = conflicts[0];
        assert_eq!(automaton.transition(StateID::START, T(a)), Some(state));
        assert_eq!(lookahead, TerminalID::EOI);
        assert_eq!(conflict.kind(), ConflictKind::ReduceReduce);
        assert_eq!(
            conflict.candidates(),
            [
                Candidate::Reduce(ProductionID::from_raw(1)),
                Candidate::Reduce(ProductionID::from_raw(2)),
            ]
        );
        assert_eq!(
            conflict.preferred(),
            Candidate::Reduce(ProductionID::from_raw(1))
        );
    }

    #[test]
    fn ambiguous_grammar_yields_shift_reduce_conflict() {
        // E -> E + E | id
        let g = Grammar::define(|g| {
            let plus = g.terminal("+")?;
            let id = g.terminal("id")?;
            let e = g.nonterminal("E")?;
            g.production(e, [N(e), T(plus), N(e)])?;
            g.production(e, [T(id)])?;
            Ok(())
        })
        .unwrap();
        let (_automaton, table) = generate(&g);
        eprintln!("{}", table.display(&g));

        let plus = g.terminal_by_name("+").unwrap();
        let conflicts: Vec<_> = table.conflicts().collect();
        assert!(!conflicts.is_empty());
        for (_, lookahead, conflict) in conflicts {
            assert_eq!(lookahead, plus);
            assert_eq!(conflict.kind(), ConflictKind::ShiftReduce);
            assert!(matches!(conflict.preferred(), Candidate::Shift(..)));
            assert!(conflict
                .candidates()
                .contains(&Candidate::Reduce(ProductionID::from_raw(1))));
        }
    }

    #[test]
    fn lr1_but_not_lalr1_grammar_is_conflict_free() {
        // S -> a A d | b B d | a B e | b A e
        // A -> c
        // B -> c
        let g = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let b = g.terminal("b")?;
            let c = g.terminal("c")?;
            let d = g.terminal("d")?;
            let e = g.terminal("e")?;
            let s = g.nonterminal("S")?;
            let aa = g.nonterminal("A")?;
            let bb = g.nonterminal("B")?;
            g.production(s, [T(a), N(aa), T(d)])?;
            g.production(s, [T(b), N(bb), T(d)])?;
            g.production(s, [T(a), N(bb), T(e)])?;
            g.production(s, [T(b), N(aa), T(e)])?;
            g.production(aa, [T(c)])?;
            g.production(bb, [T(c)])?;
            Ok(())
        })
        .unwrap();
        let (_automaton, table) = generate(&g);
        assert!(!table.has_conflicts());
    }
}
