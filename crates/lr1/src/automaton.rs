//! Construction of the canonical collection of LR(1) states.

use crate::{
    analysis::Config,
    first_follow::FirstSets,
    grammar::{Grammar, SymbolID},
    item_set::{self, Item, ItemSet},
    types::Map,
    util::display_fn,
};
use std::{collections::VecDeque, fmt};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u32);

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StateID {
    pub const START: Self = Self(0);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A state of the LR(1) automaton.
#[derive(Debug)]
pub struct State {
    id: StateID,
    kernel: ItemSet,
    items: ItemSet,
    accessing_symbol: Option<SymbolID>,
    is_accept: bool,
}

impl State {
    pub fn id(&self) -> StateID {
        self.id
    }

    /// The items that generated this state, before closure.
    pub fn kernel(&self) -> &ItemSet {
        &self.kernel
    }

    /// All items of this state, i.e. the closure of the kernel.
    pub fn items(&self) -> &ItemSet {
        &self.items
    }

    /// The symbol every incoming transition is labeled with.
    ///
    /// `None` only for the initial state.
    pub fn accessing_symbol(&self) -> Option<SymbolID> {
        self.accessing_symbol
    }

    /// Whether this state contains `[S' -> start_symbol ., $]`.
    pub fn is_accept(&self) -> bool {
        self.is_accept
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Transition {
    pub from: StateID,
    pub symbol: SymbolID,
    pub to: StateID,
}

/// The canonical LR(1) automaton.
///
/// States reference each other only by ID through the transitions.
#[derive(Debug)]
pub struct Automaton {
    states: Vec<State>,
    transitions: Vec<Transition>,
    edges: Map<(StateID, SymbolID), StateID>,
}

impl Automaton {
    pub fn start_state(&self) -> StateID {
        StateID::START
    }

    /// Iterate over the states in creation order.
    pub fn states(&self) -> impl Iterator<Item = &State> + '_ {
        self.states.iter()
    }

    pub fn state(&self, id: StateID) -> &State {
        &self.states[id.index()]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Iterate over the transitions in discovery order.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> + '_ {
        self.transitions.iter()
    }

    pub fn transition(&self, from: StateID, symbol: SymbolID) -> Option<StateID> {
        self.edges.get(&(from, symbol)).copied()
    }

    pub fn accept_states(&self) -> impl Iterator<Item = &State> + '_ {
        self.states.iter().filter(|s| s.is_accept)
    }

    /// The total number of items over all states.
    pub fn item_count(&self) -> usize {
        self.states.iter().map(|s| s.items.len()).sum()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (i, state) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }

                write!(f, "#### State {:02}", state.id)?;
                if let Some(symbol) = state.accessing_symbol {
                    write!(f, " (goto on {})", g.symbol_name(symbol))?;
                }
                if state.is_accept {
                    write!(f, " (accept)")?;
                }
                writeln!(f)?;

                writeln!(f, "## kernel")?;
                write!(f, "{}", state.kernel.display(g))?;
                writeln!(f, "## closure")?;
                write!(f, "{}", state.items.display(g))?;

                let mut edges = self
                    .transitions
                    .iter()
                    .filter(|t| t.from == state.id)
                    .peekable();
                if edges.peek().is_some() {
                    writeln!(f, "## transitions")?;
                    for t in edges {
                        writeln!(f, "- {} => {:02}", g.symbol_name(t.symbol), t.to)?;
                    }
                }
            }
            Ok(())
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Limit {
    Productions,
    States,
    Items,
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Productions => f.write_str("productions"),
            Self::States => f.write_str("states"),
            Self::Items => f.write_str("items"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The automaton grew past a configured ceiling.
    ///
    /// `partial` holds the states built so far when the configuration
    /// asks for partial diagnostics.
    #[error("resource limit exceeded: more than {} {}", max, limit)]
    ResourceLimitExceeded {
        limit: Limit,
        max: usize,
        partial: Option<Box<Automaton>>,
    },
}

/// Build the canonical LR(1) automaton of `grammar`.
pub fn build(grammar: &Grammar, first: &FirstSets, config: &Config) -> Result<Automaton, BuildError> {
    let mut builder = Builder::new(grammar, first, config);
    builder.populate_states()?;
    Ok(builder.finish())
}

#[derive(Debug)]
struct Builder<'g> {
    grammar: &'g Grammar,
    first: &'g FirstSets,
    config: &'g Config,
    states: Vec<State>,
    transitions: Vec<Transition>,
    edges: Map<(StateID, SymbolID), StateID>,
    lookup: Map<ItemSet, StateID>,
    pending: VecDeque<StateID>,
    item_count: usize,
}

impl<'g> Builder<'g> {
    fn new(grammar: &'g Grammar, first: &'g FirstSets, config: &'g Config) -> Self {
        Self {
            grammar,
            first,
            config,
            states: vec![],
            transitions: vec![],
            edges: Map::default(),
            lookup: Map::default(),
            pending: VecDeque::new(),
            item_count: 0,
        }
    }

    fn populate_states(&mut self) -> Result<(), BuildError> {
        let kernel: ItemSet = Some(Item::START).into_iter().collect();
        let items = item_set::closure(self.grammar, self.first, Some(Item::START));
        self.add_state(kernel, items, None)?;

        while let Some(current) = self.pending.pop_front() {
            let symbols = self.states[current.index()].items.symbols_after_dot(self.grammar);
            for symbol in symbols {
                let source = &self.states[current.index()].items;
                let kernel = item_set::goto_kernel(self.grammar, source, symbol);
                if kernel.is_empty() {
                    continue;
                }
                let items = item_set::closure(self.grammar, self.first, kernel.iter().copied());

                let next = match self.lookup.get(&items) {
                    Some(&id) => id,
                    None => self.add_state(kernel, items, Some(symbol))?,
                };
                self.transitions.push(Transition {
                    from: current,
                    symbol,
                    to: next,
                });
                self.edges.insert((current, symbol), next);
            }
        }

        Ok(())
    }

    fn add_state(
        &mut self,
        kernel: ItemSet,
        items: ItemSet,
        accessing_symbol: Option<SymbolID>,
    ) -> Result<StateID, BuildError> {
        if self.states.len() >= self.config.max_states {
            return Err(self.limit_exceeded(Limit::States, self.config.max_states));
        }
        if self.item_count + items.len() > self.config.max_items {
            return Err(self.limit_exceeded(Limit::Items, self.config.max_items));
        }

        let raw = u32::try_from(self.states.len())
            .map_err(|_| self.limit_exceeded(Limit::States, self.config.max_states))?;
        let id = StateID::from_raw(raw);
        tracing::trace!("new state {:?} with {} item(s)", id, items.len());

        self.item_count += items.len();
        self.lookup.insert(items.clone(), id);
        self.pending.push_back(id);
        self.states.push(State {
            id,
            is_accept: items.contains(&Item::ACCEPT),
            kernel,
            items,
            accessing_symbol,
        });

        Ok(id)
    }

    fn limit_exceeded(&mut self, limit: Limit, max: usize) -> BuildError {
        tracing::debug!(
            "automaton construction aborted after {} state(s): more than {} {}",
            self.states.len(),
            max,
            limit
        );
        let partial = self.config.retain_partial.then(|| {
            Box::new(Automaton {
                states: std::mem::take(&mut self.states),
                transitions: std::mem::take(&mut self.transitions),
                edges: std::mem::take(&mut self.edges),
            })
        });
        BuildError::ResourceLimitExceeded {
            limit,
            max,
            partial,
        }
    }

    fn finish(self) -> Automaton {
        tracing::debug!(
            "built {} state(s), {} transition(s), {} item(s)",
            self.states.len(),
            self.transitions.len(),
            self.item_count
        );
        Automaton {
            states: self.states,
            transitions: self.transitions,
            edges: self.edges,
        }
    }
}
