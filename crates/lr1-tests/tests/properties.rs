//! Invariants that must hold for every grammar in the test corpus.

use lr1::{
    analyze,
    automaton::StateID,
    grammar::{Grammar, SymbolID},
    item_set::{self, Item},
    types::{Set, TerminalSet},
};
use lr1_tests::grammars;

fn for_each_grammar(mut f: impl FnMut(&str, &Grammar)) {
    for (name, define) in grammars::ALL {
        let grammar = Grammar::define(*define).unwrap();
        f(name, &grammar);
    }
}

#[test]
fn first_and_follow_stay_within_alphabet() {
    for_each_grammar(|name, g| {
        let analysis = analyze(g).unwrap();
        let mut alphabet: TerminalSet = g.user_terminals().map(|t| t.id()).collect();
        for n in g.nonterminals.keys() {
            assert!(
                analysis.first_follow.first.first(*n).is_subset(&alphabet),
                "{}: FIRST({}) escapes the alphabet",
                name,
                g.nonterminals[n]
            );
        }

        alphabet.insert(lr1::grammar::TerminalID::EOI);
        for n in g.user_nonterminals() {
            assert!(analysis
                .first_follow
                .follow
                .follow(n.id())
                .is_subset(&alphabet));
        }
        assert!(analysis
            .first_follow
            .follow
            .follow(g.start_symbol)
            .contains(lr1::grammar::TerminalID::EOI));
    });
}

#[test]
fn initial_state_and_accept_state() {
    for_each_grammar(|name, g| {
        let analysis = analyze(g).unwrap();
        let automaton = &analysis.automaton;

        let start = automaton.state(StateID::START);
        assert_eq!(
            start.kernel().iter().copied().collect::<Vec<_>>(),
            [Item::START],
            "{}",
            name
        );

        let accept: Vec<_> = automaton.accept_states().collect();
        assert_eq!(accept.len(), 1, "{}", name);
        assert_eq!(
            automaton.transition(StateID::START, SymbolID::N(g.start_symbol)),
            Some(accept[0].id())
        );
    });
}

#[test]
fn transitions_are_deterministic_and_states_unique() {
    for_each_grammar(|name, g| {
        let analysis = analyze(g).unwrap();
        let automaton = &analysis.automaton;

        let mut edges = Set::default();
        for t in automaton.transitions() {
            assert!(edges.insert((t.from, t.symbol)), "{}: {:?}", name, t);
        }

        let contents: Set<_> = automaton.states().map(|s| s.items().clone()).collect();
        assert_eq!(contents.len(), automaton.len(), "{}", name);
    });
}

#[test]
fn every_state_is_the_closed_goto_of_its_predecessor() {
    for_each_grammar(|name, g| {
        let analysis = analyze(g).unwrap();
        let automaton = &analysis.automaton;
        let first = &analysis.first_follow.first;
        for t in automaton.transitions() {
            let expected = item_set::goto(g, first, automaton.state(t.from).items(), t.symbol);
            assert_eq!(&expected, automaton.state(t.to).items(), "{}", name);
        }
    });
}

#[test]
fn table_covers_every_state() {
    for_each_grammar(|name, g| {
        let analysis = analyze(g).unwrap();
        assert_eq!(
            analysis.table.states.len(),
            analysis.automaton.len(),
            "{}",
            name
        );
        assert_eq!(
            analysis.table.conflicts().next().is_some(),
            matches!(name, "duplicate" | "dangling_else"),
            "{}",
            name
        );
    });
}

#[test]
fn replayed_tree_matches_input_and_derivation() {
    let cases: &[(grammars::Define, &[&str])] = &[
        (grammars::expr_sum, &["id", "+", "id", "+", "id"]),
        (grammars::cc, &["c", "d", "c", "c", "d"]),
        (grammars::lr1_not_lalr, &["b", "c", "e"]),
        (grammars::nested_lists, &["(", "(", "atom", ")", ",", "atom", ")"]),
    ];
    for (define, tokens) in cases {
        let g = Grammar::define(*define).unwrap();
        let result = lr1::simulate(&g, tokens).unwrap();
        assert!(result.accepted, "{}", result.display(&g));

        let tree = result.tree(&g).unwrap();
        assert_eq!(tree.frontier(), result.input);
        assert_eq!(tree.rightmost_derivation(), result.rightmost_derivation());
        assert!(matches!(
            tree,
            lr1::tree::ParseTree::Node { production, .. }
                if g.production(production).left() == g.start_symbol
        ));
    }
}
