//! Parse trees rebuilt from a simulation trace.

use crate::{
    grammar::{Grammar, ProductionID, TerminalID},
    simulate::{ParseStep, StepAction},
    util::display_fn,
};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseTree {
    Leaf(TerminalID),
    Node {
        production: ProductionID,
        children: Vec<ParseTree>,
    },
}

impl ParseTree {
    /// The terminals at the leaves, left to right.
    pub fn frontier(&self) -> Vec<TerminalID> {
        let mut leaves = vec![];
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves(&self, leaves: &mut Vec<TerminalID>) {
        match self {
            Self::Leaf(t) => leaves.push(*t),
            Self::Node { children, .. } => {
                for child in children {
                    child.collect_leaves(leaves);
                }
            }
        }
    }

    /// The productions of a rightmost derivation of this tree.
    ///
    /// Expands the rightmost nonterminal first, i.e. a preorder walk that
    /// visits children from right to left.
    pub fn rightmost_derivation(&self) -> Vec<ProductionID> {
        let mut productions = vec![];
        let mut pending = vec![self];
        while let Some(tree) = pending.pop() {
            if let Self::Node {
                production,
                children,
            } = tree
            {
                productions.push(*production);
                pending.extend(children.iter());
            }
        }
        productions
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| self.fmt_indented(g, f, 0))
    }

    fn fmt_indented(&self, g: &Grammar, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:width$}", "", width = depth * 2)?;
        match self {
            Self::Leaf(t) => writeln!(f, "{}", g.terminals[t]),
            Self::Node {
                production,
                children,
            } => {
                writeln!(f, "{}", g.production(*production).display(g))?;
                for child in children {
                    child.fmt_indented(g, f, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}

/// Replay the shifts and reductions of `steps` against a stack of subtrees.
///
/// Returns `None` if the trace does not end in `accept` with exactly one
/// tree on the stack.
pub(crate) fn replay(g: &Grammar, steps: &[ParseStep]) -> Option<ParseTree> {
    let mut stack: Vec<ParseTree> = vec![];
    for step in steps {
        match &step.action {
            StepAction::Shift(..) => stack.push(ParseTree::Leaf(step.current_token())),
            StepAction::Reduce { production, .. } => {
                let arity = g.production(*production).right().len();
                let children = stack.split_off(stack.len().checked_sub(arity)?);
                stack.push(ParseTree::Node {
                    production: *production,
                    children,
                });
            }
            StepAction::Accept => {
                let root = stack.pop()?;
                return stack.is_empty().then_some(root);
            }
            StepAction::Error(..) => return None,
        }
    }
    None
}
