//! Calculation of FIRST and FOLLOW sets.

use crate::{
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID},
    types::{Map, Set, TerminalSet},
    util::{display_fn, write_joined},
};
use std::fmt;

/// The FIRST sets of every nonterminal, including the augmented start symbol.
///
/// ε is never stored as a member of a set. Whether a nonterminal derives
/// the empty string is tracked separately, see [`FirstSets::is_nullable`].
#[derive(Debug)]
pub struct FirstSets {
    nullables: Set<NonterminalID>,
    map: Map<NonterminalID, TerminalSet>,
}

impl FirstSets {
    pub fn first(&self, n: NonterminalID) -> &TerminalSet {
        &self.map[&n]
    }

    pub fn is_nullable(&self, n: NonterminalID) -> bool {
        self.nullables.contains(&n)
    }

    fn is_symbol_nullable(&self, symbol: &SymbolID) -> bool {
        matches!(symbol, SymbolID::N(n) if self.nullables.contains(n))
    }

    /// `First(seq)`, along with whether the whole sequence derives ε.
    pub fn first_of(&self, seq: &[SymbolID]) -> (TerminalSet, bool) {
        let mut res = TerminalSet::default();
        for symbol in seq {
            match symbol {
                SymbolID::T(t) => {
                    res.insert(*t);
                }
                SymbolID::N(n) => {
                    res.union_with(&self.map[n]);
                }
            }
            if !self.is_symbol_nullable(symbol) {
                return (res, false);
            }
        }
        (res, true)
    }

    /// `First(seq lookahead)`
    pub fn first_with_lookahead(&self, seq: &[SymbolID], lookahead: TerminalID) -> TerminalSet {
        let (mut res, nullable) = self.first_of(seq);
        if nullable {
            res.insert(lookahead);
        }
        res
    }
}

/// Compute the FIRST sets of all nonterminals by fixed-point iteration.
pub fn compute_first(grammar: &Grammar) -> FirstSets {
    let nullables = nulls_set(grammar);

    let mut map: Map<NonterminalID, TerminalSet> = grammar
        .nonterminals
        .keys()
        .map(|&n| (n, TerminalSet::default()))
        .collect();

    // For `X -> Y1 Y2 ... Yn`, walk Y1, Y2, ... up to and including the
    // first non-nullable Yk. Terminals go straight into First(X); every
    // nonterminal Yi yields the constraint First(X) ⊇ First(Yi).
    #[derive(Debug)]
    struct Constraint {
        sup: NonterminalID,
        sub: NonterminalID,
    }
    let mut constraints = vec![];
    for production in grammar.productions.values() {
        for symbol in production.right() {
            match *symbol {
                SymbolID::T(t) => {
                    map[&production.left()].insert(t);
                    break;
                }
                SymbolID::N(n) => {
                    if n != production.left() {
                        constraints.push(Constraint {
                            sup: production.left(),
                            sub: n,
                        });
                    }
                    if !nullables.contains(&n) {
                        break;
                    }
                }
            }
        }
    }

    let mut passes = 0;
    let mut changed = true;
    while changed {
        changed = false;
        passes += 1;
        for Constraint { sup, sub } in &constraints {
            let subset = map[sub].clone();
            changed |= map[sup].union_with(&subset);
        }
    }
    tracing::trace!("FIRST sets converged after {} pass(es)", passes);

    FirstSets { nullables, map }
}

/// Calculate the set of nullable symbols in this grammar.
fn nulls_set(grammar: &Grammar) -> Set<NonterminalID> {
    let mut nulls: Set<NonterminalID> = grammar
        .productions
        .values()
        .filter_map(|p| p.right().is_empty().then(|| p.left()))
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for production in grammar.productions.values() {
            if nulls.contains(&production.left()) {
                continue;
            }
            let is_rhs_nullable = production
                .right()
                .iter()
                .all(|symbol| matches!(symbol, SymbolID::N(n) if nulls.contains(n)));
            if is_rhs_nullable {
                changed = true;
                nulls.insert(production.left());
            }
        }
    }

    nulls
}

/// The FOLLOW sets of every nonterminal.
#[derive(Debug)]
pub struct FollowSets {
    map: Map<NonterminalID, TerminalSet>,
}

impl FollowSets {
    pub fn follow(&self, n: NonterminalID) -> &TerminalSet {
        &self.map[&n]
    }
}

/// Compute the FOLLOW sets of all nonterminals by fixed-point iteration.
pub fn compute_follow(grammar: &Grammar, first: &FirstSets) -> FollowSets {
    let mut map: Map<NonterminalID, TerminalSet> = grammar
        .nonterminals
        .keys()
        .map(|&n| (n, TerminalSet::default()))
        .collect();
    map[&NonterminalID::START].insert(TerminalID::EOI);
    map[&grammar.start_symbol].insert(TerminalID::EOI);

    let mut passes = 0;
    let mut changed = true;
    while changed {
        changed = false;
        passes += 1;
        for production in grammar.productions.values() {
            let right = production.right();
            for (i, symbol) in right.iter().enumerate() {
                let b = match symbol {
                    SymbolID::N(b) => *b,
                    SymbolID::T(..) => continue,
                };
                // A -> alpha B beta
                let (beta_first, beta_nullable) = first.first_of(&right[i + 1..]);
                changed |= map[&b].union_with(&beta_first);
                if beta_nullable && b != production.left() {
                    let follow_a = map[&production.left()].clone();
                    changed |= map[&b].union_with(&follow_a);
                }
            }
        }
    }
    tracing::trace!("FOLLOW sets converged after {} pass(es)", passes);

    FollowSets { map }
}

/// The FIRST and FOLLOW sets of a grammar.
#[derive(Debug)]
pub struct FirstFollow {
    pub first: FirstSets,
    pub follow: FollowSets,
}

impl FirstFollow {
    pub fn compute(grammar: &Grammar) -> Self {
        let first = compute_first(grammar);
        let follow = compute_follow(grammar, &first);
        Self { first, follow }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for n in g.user_nonterminals() {
                write!(f, "FIRST({}) = {{", n)?;
                let mut names: Vec<&str> = self
                    .first
                    .first(n.id())
                    .iter()
                    .map(|t| g.terminals[&t].name())
                    .collect();
                if self.first.is_nullable(n.id()) {
                    names.push("ε");
                }
                write_joined(f, ", ", names)?;
                writeln!(f, "}}")?;
            }
            for n in g.user_nonterminals() {
                write!(f, "FOLLOW({}) = {{", n)?;
                write_joined(
                    f,
                    ", ",
                    self.follow
                        .follow(n.id())
                        .iter()
                        .map(|t| g.terminals[&t].name()),
                )?;
                writeln!(f, "}}")?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    fn names(g: &Grammar, set: &TerminalSet) -> Vec<String> {
        set.iter().map(|t| g.terminals[&t].name().to_owned()).collect()
    }

    // E -> T E'
    // E' -> + T E' | ε
    // T -> F T'
    // T' -> * F T' | ε
    // F -> ( E ) | id
    fn dragon_book() -> Grammar {
        Grammar::define(|g| {
            let plus = g.terminal("+")?;
            let star = g.terminal("*")?;
            let lparen = g.terminal("(")?;
            let rparen = g.terminal(")")?;
            let id = g.terminal("id")?;

            let e = g.nonterminal("E")?;
            let e_ = g.nonterminal("E_")?;
            let t = g.nonterminal("T")?;
            let t_ = g.nonterminal("T_")?;
            let f = g.nonterminal("F")?;

            g.production(e, [N(t), N(e_)])?;
            g.production(e_, [T(plus), N(t), N(e_)])?;
            g.production(e_, [])?;
            g.production(t, [N(f), N(t_)])?;
            g.production(t_, [T(star), N(f), N(t_)])?;
            g.production(t_, [])?;
            g.production(f, [T(lparen), N(e), T(rparen)])?;
            g.production(f, [T(id)])?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn first_sets_with_epsilon() {
        let g = dragon_book();
        let first = compute_first(&g);
        let n = |name| g.nonterminal_by_name(name).unwrap();

        assert_eq!(names(&g, first.first(n("E"))), ["(", "id"]);
        assert_eq!(names(&g, first.first(n("T"))), ["(", "id"]);
        assert_eq!(names(&g, first.first(n("F"))), ["(", "id"]);
        assert_eq!(names(&g, first.first(n("E_"))), ["+"]);
        assert_eq!(names(&g, first.first(n("T_"))), ["*"]);

        assert!(first.is_nullable(n("E_")));
        assert!(first.is_nullable(n("T_")));
        assert!(!first.is_nullable(n("E")));
        assert!(!first.is_nullable(NonterminalID::START));
    }

    #[test]
    fn follow_sets() {
        let g = dragon_book();
        let ff = FirstFollow::compute(&g);
        let n = |name| g.nonterminal_by_name(name).unwrap();
        eprintln!("{}", ff.display(&g));

        assert_eq!(names(&g, ff.follow.follow(n("E"))), ["$", ")"]);
        assert_eq!(names(&g, ff.follow.follow(n("E_"))), ["$", ")"]);
        assert_eq!(names(&g, ff.follow.follow(n("T"))), ["$", "+", ")"]);
        assert_eq!(names(&g, ff.follow.follow(n("T_"))), ["$", "+", ")"]);
        assert_eq!(names(&g, ff.follow.follow(n("F"))), ["$", "+", "*", ")"]);
    }

    #[test]
    fn first_sets_are_terminal_subsets() {
        let g = dragon_book();
        let first = compute_first(&g);
        let alphabet: TerminalSet = g.user_terminals().map(|t| t.id()).collect();
        for n in g.nonterminals.keys() {
            assert!(first.first(*n).is_subset(&alphabet));
        }
    }

    #[test]
    fn first_of_sequence_appends_lookahead_when_nullable() {
        let g = dragon_book();
        let first = compute_first(&g);
        let e_ = g.nonterminal_by_name("E_").unwrap();
        let t_ = g.nonterminal_by_name("T_").unwrap();
        let rparen = g.terminal_by_name(")").unwrap();

        let (set, nullable) = first.first_of(&[N(t_), N(e_)]);
        assert!(nullable);
        assert_eq!(names(&g, &set), ["+", "*"]);

        let set = first.first_with_lookahead(&[N(t_), T(rparen)], TerminalID::EOI);
        assert_eq!(names(&g, &set), ["*", ")"]);

        let set = first.first_with_lookahead(&[], TerminalID::EOI);
        assert_eq!(names(&g, &set), ["$"]);
    }

    #[test]
    fn left_recursion_converges() {
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
        let ff = FirstFollow::compute(&g);
        let n = |name| g.nonterminal_by_name(name).unwrap();

        assert_eq!(names(&g, ff.first.first(n("E"))), ["id"]);
        assert_eq!(names(&g, ff.first.first(n("T"))), ["id"]);
        assert_eq!(names(&g, ff.follow.follow(n("S"))), ["$"]);
        assert_eq!(names(&g, ff.follow.follow(n("E"))), ["$", "+"]);
    }
}
