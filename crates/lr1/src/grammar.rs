//! Grammar types.

use crate::{
    types::{Map, Set},
    util::display_fn,
};
use std::fmt;

/// The name reserved for the end-of-input marker.
pub const EOI_NAME: &str = "$";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}

impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self::from_raw(0);

    const OFFSET: u16 = 1;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

#[derive(Debug)]
pub struct Terminal {
    id: TerminalID,
    name: String,
}

impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}

impl NonterminalID {
    /// The augmented start symbol `S'`.
    pub const START: Self = Self::from_raw(0);

    const OFFSET: u16 = 1;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

#[derive(Debug)]
pub struct Nonterminal {
    id: NonterminalID,
    name: String,
}

impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ProductionID {
    raw: u16,
}

impl ProductionID {
    /// The augmented production `S' -> start_symbol`.
    pub const ACCEPT: Self = Self::from_raw(0);

    const OFFSET: u16 = 1;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

impl fmt::Display for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// The type that represents a production rule in grammar.
#[derive(Debug)]
pub struct Production {
    id: ProductionID,
    left: NonterminalID,
    right: Vec<SymbolID>,
}

impl Production {
    pub fn id(&self) -> ProductionID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    /// Return the right-hand side of this production.
    ///
    /// An empty slice means the production derives ε.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    // `"LHS -> R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{} ->", g.nonterminals[&self.left])?;
            if self.right.is_empty() {
                return f.write_str(" ε");
            }
            for symbol in &self.right {
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            Ok(())
        })
    }
}

/// The grammar definition used to derive the parser tables.
///
/// A `Grammar` is always augmented: production `0` is `S' -> start_symbol`.
#[derive(Debug)]
#[non_exhaustive]
pub struct Grammar {
    pub terminals: Map<TerminalID, Terminal>,
    pub nonterminals: Map<NonterminalID, Nonterminal>,
    pub productions: Map<ProductionID, Production>,
    pub start_symbol: NonterminalID,
    by_left: Map<NonterminalID, Vec<ProductionID>>,
    names: Map<String, SymbolID>,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals.values() {
            writeln!(f, "{}", terminal)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals.values() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id() == self.start_symbol {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## productions:")?;
        for production in self.productions.values() {
            writeln!(f, "{:>3}: {}", production.id(), production.display(self))?;
        }

        Ok(())
    }
}

impl Grammar {
    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarError>,
    {
        let mut def = GrammarDef::default();
        f(&mut def)?;
        def.end()
    }

    pub fn production(&self, id: ProductionID) -> &Production {
        &self.productions[&id]
    }

    /// Iterate over the productions whose left-hand side is `n`, in declaration order.
    pub fn productions_of(&self, n: NonterminalID) -> impl Iterator<Item = &Production> + '_ {
        self.by_left
            .get(&n)
            .into_iter()
            .flatten()
            .map(|id| &self.productions[id])
    }

    /// Iterate over the terminals declared by the user, excluding `$`.
    pub fn user_terminals(&self) -> impl Iterator<Item = &Terminal> + '_ {
        self.terminals
            .values()
            .filter(|t| t.id() != TerminalID::EOI)
    }

    /// Iterate over the nonterminals declared by the user, excluding `S'`.
    pub fn user_nonterminals(&self) -> impl Iterator<Item = &Nonterminal> + '_ {
        self.nonterminals
            .values()
            .filter(|n| n.id() != NonterminalID::START)
    }

    pub fn terminal_by_name(&self, name: &str) -> Option<TerminalID> {
        match self.names.get(name) {
            Some(SymbolID::T(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn nonterminal_by_name(&self, name: &str) -> Option<NonterminalID> {
        match self.names.get(name) {
            Some(SymbolID::N(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminals[&t].name(),
            SymbolID::N(n) => self.nonterminals[&n].name(),
        }
    }
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    productions: Map<ProductionID, Production>,
    names: Map<String, SymbolID>,
    start: Option<NonterminalID>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_production_id: u16,
}

impl Default for GrammarDef {
    fn default() -> Self {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            productions: Map::default(),
            names: Map::default(),
            start: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: NonterminalID::OFFSET,
            next_production_id: ProductionID::OFFSET,
        };

        def.terminals.insert(
            TerminalID::EOI,
            Terminal {
                id: TerminalID::EOI,
                name: EOI_NAME.into(),
            },
        );
        def.names
            .insert(EOI_NAME.into(), SymbolID::T(TerminalID::EOI));

        // The name of `S'` is fixed up once the start symbol is known.
        def.nonterminals.insert(
            NonterminalID::START,
            Nonterminal {
                id: NonterminalID::START,
                name: String::new(),
            },
        );

        def
    }
}

impl GrammarDef {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarError> {
        self.check_name(name)?;

        let id = TerminalID::from_raw(self.next_terminal_id);
        self.next_terminal_id = self
            .next_terminal_id
            .checked_add(1)
            .ok_or(GrammarError::TooManySymbols)?;

        self.names.insert(name.into(), SymbolID::T(id));
        self.terminals.insert(
            id,
            Terminal {
                id,
                name: name.into(),
            },
        );

        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarError> {
        self.check_name(name)?;

        let id = NonterminalID::from_raw(self.next_nonterminal_id);
        self.next_nonterminal_id = self
            .next_nonterminal_id
            .checked_add(1)
            .ok_or(GrammarError::TooManySymbols)?;

        self.names.insert(name.into(), SymbolID::N(id));
        self.nonterminals.insert(
            id,
            Nonterminal {
                id,
                name: name.into(),
            },
        );

        Ok(id)
    }

    /// Specify a production rule into this grammar.
    ///
    /// Production IDs are assigned in declaration order, starting from `1`.
    pub fn production<I>(&mut self, left: NonterminalID, right: I) -> Result<ProductionID, GrammarError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        self.check_nonterminal(left)?;
        let right: Vec<SymbolID> = right.into_iter().collect();
        // the dot position of an item is a u16.
        if right.len() > usize::from(u16::MAX) {
            return Err(GrammarError::TooManySymbols);
        }
        for symbol in &right {
            match *symbol {
                SymbolID::T(t) if t == TerminalID::EOI => {
                    return Err(GrammarError::ReservedSymbol {
                        name: EOI_NAME.into(),
                    })
                }
                SymbolID::T(t) if !self.terminals.contains_key(&t) => {
                    return Err(GrammarError::ForeignSymbol)
                }
                SymbolID::N(n) => self.check_nonterminal(n)?,
                SymbolID::T(..) => (),
            }
        }

        if self
            .productions
            .values()
            .any(|p| p.left == left && p.right == right)
        {
            tracing::warn!(
                "duplicate production for `{}'; it will surface as a reduce/reduce conflict",
                self.nonterminals[&left].name
            );
        }

        let id = ProductionID::from_raw(self.next_production_id);
        self.next_production_id = self
            .next_production_id
            .checked_add(1)
            .ok_or(GrammarError::TooManySymbols)?;
        self.productions.insert(id, Production { id, left, right });

        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarError> {
        self.check_nonterminal(symbol)?;
        self.start.replace(symbol);
        Ok(())
    }

    fn check_name(&self, name: &str) -> Result<(), GrammarError> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(GrammarError::InvalidName { name: name.into() });
        }
        if name == EOI_NAME {
            return Err(GrammarError::ReservedSymbol { name: name.into() });
        }
        if self.names.contains_key(name) {
            return Err(GrammarError::DuplicateSymbol { name: name.into() });
        }
        Ok(())
    }

    fn check_nonterminal(&self, id: NonterminalID) -> Result<(), GrammarError> {
        if id == NonterminalID::START {
            return Err(GrammarError::ReservedSymbol {
                name: "the augmented start symbol".into(),
            });
        }
        if !self.nonterminals.contains_key(&id) {
            return Err(GrammarError::ForeignSymbol);
        }
        Ok(())
    }

    fn end(mut self) -> Result<Grammar, GrammarError> {
        // fall back to the first declared nonterminal.
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .nonterminals
                .keys()
                .find(|id| **id != NonterminalID::START)
                .copied()
                .ok_or(GrammarError::EmptyGrammar)?,
        };

        let mut by_left: Map<NonterminalID, Vec<ProductionID>> = Map::default();
        for production in self.productions.values() {
            by_left
                .entry(production.left)
                .or_default()
                .push(production.id);
        }

        let start_name = self.nonterminals[&start].name.clone();
        if !by_left.contains_key(&start) {
            return Err(GrammarError::UnreachableStart { name: start_name });
        }

        for production in self.productions.values() {
            for symbol in &production.right {
                if let SymbolID::N(n) = symbol {
                    if !by_left.contains_key(n) {
                        return Err(GrammarError::UndefinedSymbol {
                            name: self.nonterminals[n].name.clone(),
                            lhs: self.nonterminals[&production.left].name.clone(),
                        });
                    }
                }
            }
        }

        self.productions.insert(
            ProductionID::ACCEPT,
            Production {
                id: ProductionID::ACCEPT,
                left: NonterminalID::START,
                right: vec![SymbolID::N(start)],
            },
        );
        self.productions.sort_keys();
        by_left.insert(NonterminalID::START, vec![ProductionID::ACCEPT]);

        let start_prime = format!("{}'", start_name);
        self.nonterminals[&NonterminalID::START].name = start_prime;

        let grammar = Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            productions: self.productions,
            start_symbol: start,
            by_left,
            names: self.names,
        };
        warn_unreachable(&grammar);

        Ok(grammar)
    }
}

/// Nonterminals that the start symbol never derives are legal but suspicious.
fn warn_unreachable(g: &Grammar) {
    let mut reachable = Set::default();
    reachable.insert(NonterminalID::START);
    let mut cursor = 0;
    while let Some(&n) = reachable.get_index(cursor) {
        cursor += 1;
        for production in g.productions_of(n) {
            for symbol in production.right() {
                if let SymbolID::N(next) = symbol {
                    reachable.insert(*next);
                }
            }
        }
    }

    for nonterminal in g.user_nonterminals() {
        if !reachable.contains(&nonterminal.id()) {
            tracing::warn!(
                "nonterminal `{}' is not reachable from the start symbol",
                nonterminal
            );
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("nonterminal `{}' is used in a production of `{}' but has no production", name, lhs)]
    UndefinedSymbol { name: String, lhs: String },

    #[error("the start symbol `{}' has no production", name)]
    UnreachableStart { name: String },

    #[error("the grammar declares no nonterminal symbols")]
    EmptyGrammar,

    #[error("the symbol `{}' has already been declared", name)]
    DuplicateSymbol { name: String },

    #[error("incorrect symbol name: {:?}", name)]
    InvalidName { name: String },

    #[error("{} is reserved and cannot be used here", name)]
    ReservedSymbol { name: String },

    #[error("the symbol was not declared by this grammar definition")]
    ForeignSymbol,

    #[error("too many symbols or productions")]
    TooManySymbols,
}
