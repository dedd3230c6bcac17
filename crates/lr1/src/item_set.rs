//! LR(1) items and the closure/goto operations over item sets.

use crate::{
    first_follow::FirstSets,
    grammar::{Grammar, NonterminalID, ProductionID, SymbolID, TerminalID},
    types::{Queue, Set},
    util::display_fn,
};
use std::{collections::BTreeSet, fmt};

/// An LR(1) item `[A -> alpha . beta, lookahead]`.
///
/// The derived ordering (production, dot, lookahead) is the canonical
/// ordering used for display and for comparing item sets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item {
    pub production: ProductionID,
    pub dot: u16,
    pub lookahead: TerminalID,
}

impl Item {
    /// The item `[S' -> . start_symbol, $]` that generates the initial state.
    pub const START: Self = Self {
        production: ProductionID::ACCEPT,
        dot: 0,
        lookahead: TerminalID::EOI,
    };

    /// The item `[S' -> start_symbol ., $]` that marks an accepting state.
    pub const ACCEPT: Self = Self {
        production: ProductionID::ACCEPT,
        dot: 1,
        lookahead: TerminalID::EOI,
    };

    /// The symbol right after the dot, if any.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        g.production(self.production)
            .right()
            .get(usize::from(self.dot))
            .copied()
    }

    /// The symbols after the one following the dot, i.e. `beta` in `A -> alpha . X beta`.
    fn rest<'g>(&self, g: &'g Grammar) -> &'g [SymbolID] {
        let right = g.production(self.production).right();
        right.get(usize::from(self.dot) + 1..).unwrap_or(&[])
    }

    pub fn is_complete(&self, g: &Grammar) -> bool {
        usize::from(self.dot) >= g.production(self.production).right().len()
    }

    fn advance(&self) -> Self {
        Self {
            dot: self.dot + 1,
            ..*self
        }
    }

    // `"A -> alpha . beta, a"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let production = g.production(self.production);
            write!(f, "{} ->", g.nonterminals[&production.left()])?;
            for (i, symbol) in production.right().iter().enumerate() {
                if i == usize::from(self.dot) {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if usize::from(self.dot) == production.right().len() {
                f.write_str(" .")?;
            }
            write!(f, ", {}", g.terminals[&self.lookahead])
        })
    }
}

/// A set of unique LR(1) items, kept in canonical order.
///
/// Two item sets are equal iff they contain exactly the same items.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemSet {
    items: BTreeSet<Item>,
}

impl ItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: Item) -> bool {
        self.items.insert(item)
    }

    pub fn contains(&self, item: &Item) -> bool {
        self.items.contains(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over the items in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> + '_ {
        self.items.iter()
    }

    /// The grammar symbols appearing right after a dot, in order of first
    /// appearance within the canonical item order.
    pub fn symbols_after_dot(&self, g: &Grammar) -> Vec<SymbolID> {
        let symbols: Set<SymbolID> = self.iter().filter_map(|item| item.next_symbol(g)).collect();
        symbols.into_iter().collect()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for item in &self.items {
                writeln!(f, "- [{}]", item.display(g))?;
            }
            Ok(())
        })
    }
}

impl FromIterator<Item> for ItemSet {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ItemSet {
    type Item = &'a Item;
    type IntoIter = std::collections::btree_set::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Expand `kernel` with every item reachable through ε-moves over
/// nonterminals right after a dot.
pub fn closure<I>(g: &Grammar, first: &FirstSets, kernel: I) -> ItemSet
where
    I: IntoIterator<Item = Item>,
{
    let mut items = ItemSet::new();
    let mut pending = Queue::default();
    for item in kernel {
        if items.insert(item) {
            pending.push(item);
        }
    }

    while let Some(item) = pending.pop() {
        // [A -> alpha . B beta, a]
        let b: NonterminalID = match item.next_symbol(g) {
            Some(SymbolID::N(b)) => b,
            _ => continue,
        };
        let lookaheads = first.first_with_lookahead(item.rest(g), item.lookahead);
        for production in g.productions_of(b) {
            for lookahead in lookaheads.iter() {
                let new_item = Item {
                    production: production.id(),
                    dot: 0,
                    lookahead,
                };
                if items.insert(new_item) {
                    pending.push(new_item);
                }
            }
        }
    }

    items
}

/// The kernel reached from `items` by moving the dot over `symbol`, before closure.
pub fn goto_kernel(g: &Grammar, items: &ItemSet, symbol: SymbolID) -> ItemSet {
    items
        .iter()
        .filter(|item| item.next_symbol(g) == Some(symbol))
        .map(Item::advance)
        .collect()
}

/// `goto(items, symbol)`: advance the dot over `symbol` and close the result.
///
/// The result is empty when no item in `items` expects `symbol`.
pub fn goto(g: &Grammar, first: &FirstSets, items: &ItemSet, symbol: SymbolID) -> ItemSet {
    let kernel = goto_kernel(g, items, symbol);
    closure(g, first, kernel.items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{first_follow::compute_first, grammar::SymbolID::*};

    // S -> C C
    // C -> c C | d
    fn cc_grammar() -> Grammar {
        Grammar::define(|g| {
            let c = g.terminal("c")?;
            let d = g.terminal("d")?;
            let s = g.nonterminal("S")?;
            let cc = g.nonterminal("C")?;
            g.production(s, [N(cc), N(cc)])?;
            g.production(cc, [T(c), N(cc)])?;
            g.production(cc, [T(d)])?;
            Ok(())
        })
        .unwrap()
    }

    fn rendered(g: &Grammar, items: &ItemSet) -> Vec<String> {
        items.iter().map(|i| i.display(g).to_string()).collect()
    }

    #[test]
    fn closure_of_start_item() {
        let g = cc_grammar();
        let first = compute_first(&g);
        let items = closure(&g, &first, [Item::START]);

        assert_eq!(
            rendered(&g, &items),
            [
                "S' -> . S, $",
                "S -> . C C, $",
                "C -> . c C, c",
                "C -> . c C, d",
                "C -> . d, c",
                "C -> . d, d",
            ]
        );
    }

    #[test]
    fn goto_over_terminal() {
        let g = cc_grammar();
        let first = compute_first(&g);
        let c = T(g.terminal_by_name("c").unwrap());
        let cc = N(g.nonterminal_by_name("C").unwrap());

        let i0 = closure(&g, &first, [Item::START]);
        let i2 = goto(&g, &first, &i0, cc);
        assert_eq!(
            rendered(&g, &i2),
            [
                "S -> C . C, $",
                "C -> . c C, $",
                "C -> . d, $",
            ]
        );

        let i6 = goto(&g, &first, &i2, c);
        assert_eq!(
            rendered(&g, &i6),
            [
                "C -> . c C, $",
                "C -> c . C, $",
                "C -> . d, $",
            ]
        );
    }

    #[test]
    fn goto_on_unexpected_symbol_is_empty() {
        let g = cc_grammar();
        let first = compute_first(&g);
        let i0 = closure(&g, &first, [Item::START]);
        let i1 = goto(&g, &first, &i0, N(g.start_symbol));
        assert!(i1.contains(&Item::ACCEPT));
        assert!(goto(&g, &first, &i1, N(g.start_symbol)).is_empty());
    }

    #[test]
    fn item_sets_compare_by_content() {
        let g = cc_grammar();
        let first = compute_first(&g);
        let c = T(g.terminal_by_name("c").unwrap());

        let i0 = closure(&g, &first, [Item::START]);
        let i3 = goto(&g, &first, &i0, c);
        let again = goto(&g, &first, &i3, c);
        assert_eq!(i3, again);
    }

    #[test]
    fn symbols_after_dot_keep_item_order() {
        let g = cc_grammar();
        let first = compute_first(&g);
        let i0 = closure(&g, &first, [Item::START]);
        let names: Vec<_> = i0
            .symbols_after_dot(&g)
            .into_iter()
            .map(|s| g.symbol_name(s).to_owned())
            .collect();
        assert_eq!(names, ["S", "C", "c", "d"]);
    }

    #[test]
    fn rest_outlives_the_item() {
        let g = cc_grammar();
        let rest = {
            let item = Item {
                production: ProductionID::from_raw(1),
                dot: 0,
                lookahead: TerminalID::EOI,
            };
            item.rest(&g)
        };
        let cc = N(g.nonterminal_by_name("C").unwrap());
        assert_eq!(rest, [cc]);
    }

    #[test]
    fn closure_through_nullable_suffix() {
        // S -> A b ; A -> B ; B -> a | ε
        let g = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let b = g.terminal("b")?;
            let s = g.nonterminal("S")?;
            let aa = g.nonterminal("A")?;
            let bb = g.nonterminal("B")?;
            g.production(s, [N(aa), T(b)])?;
            g.production(aa, [N(bb)])?;
            g.production(bb, [T(a)])?;
            g.production(bb, [])?;
            Ok(())
        })
        .unwrap();
        let first = compute_first(&g);
        let items = closure(&g, &first, [Item::START]);
        assert_eq!(
            rendered(&g, &items),
            [
                "S' -> . S, $",
                "S -> . A b, $",
                "A -> . B, b",
                "B -> . a, b",
                "B -> ., b",
            ]
        );
    }
}
