//! Grammar definitions for integration tests.

use lr1::grammar::{GrammarDef, GrammarError, SymbolID::*};

pub type Define = fn(&mut GrammarDef) -> Result<(), GrammarError>;

/// Every grammar in this module, by name.
pub const ALL: &[(&str, Define)] = &[
    ("expr_sum", expr_sum),
    ("duplicate", duplicate),
    ("arithmetic", arithmetic),
    ("cc", cc),
    ("lr1_not_lalr", lr1_not_lalr),
    ("dangling_else", dangling_else),
    ("nested_lists", nested_lists),
    ("json", json),
];

pub fn expr_sum(g: &mut GrammarDef) -> Result<(), GrammarError> {
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
}

/// `A -> a | a`
pub fn duplicate(g: &mut GrammarDef) -> Result<(), GrammarError> {
    let a = g.terminal("a")?;
    let aa = g.nonterminal("A")?;
    g.production(aa, [T(a)])?;
    g.production(aa, [T(a)])?;
    Ok(())
}

pub fn arithmetic(g: &mut GrammarDef) -> Result<(), GrammarError> {
    // declare terminal symbols.
    let lparen = g.terminal("(")?;
    let rparen = g.terminal(")")?;
    let plus = g.terminal("+")?;
    let minus = g.terminal("-")?;
    let star = g.terminal("*")?;
    let slash = g.terminal("/")?;
    let num = g.terminal("NUM")?;

    // declare nonterminal symbols.
    let expr = g.nonterminal("EXPR")?;
    let factor = g.nonterminal("FACTOR")?;
    let term = g.nonterminal("TERM")?;

    g.start_symbol(expr)?;

    g.production(expr, [N(expr), T(plus), N(factor)])?;
    g.production(expr, [N(expr), T(minus), N(factor)])?;
    g.production(expr, [N(factor)])?;
    g.production(factor, [N(factor), T(star), N(term)])?;
    g.production(factor, [N(factor), T(slash), N(term)])?;
    g.production(factor, [N(term)])?;
    g.production(term, [T(num)])?;
    g.production(term, [T(lparen), N(expr), T(rparen)])?;
    Ok(())
}

/// `S -> C C ; C -> c C | d`
pub fn cc(g: &mut GrammarDef) -> Result<(), GrammarError> {
    let c = g.terminal("c")?;
    let d = g.terminal("d")?;
    let s = g.nonterminal("S")?;
    let cc = g.nonterminal("C")?;
    g.production(s, [N(cc), N(cc)])?;
    g.production(cc, [T(c), N(cc)])?;
    g.production(cc, [T(d)])?;
    Ok(())
}

/// A grammar that is LR(1) but whose LALR(1) table has a reduce/reduce conflict.
pub fn lr1_not_lalr(g: &mut GrammarDef) -> Result<(), GrammarError> {
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
}

pub fn dangling_else(g: &mut GrammarDef) -> Result<(), GrammarError> {
    let if_ = g.terminal("if")?;
    let then = g.terminal("then")?;
    let else_ = g.terminal("else")?;
    let cond = g.terminal("cond")?;
    let other = g.terminal("other")?;

    let stmt = g.nonterminal("STMT")?;

    g.production(stmt, [T(if_), T(cond), T(then), N(stmt)])?;
    g.production(stmt, [T(if_), T(cond), T(then), N(stmt), T(else_), N(stmt)])?;
    g.production(stmt, [T(other)])?;
    Ok(())
}

/// Parenthesized, possibly empty, comma-separated lists of atoms.
pub fn nested_lists(g: &mut GrammarDef) -> Result<(), GrammarError> {
    let lparen = g.terminal("(")?;
    let rparen = g.terminal(")")?;
    let comma = g.terminal(",")?;
    let atom = g.terminal("atom")?;

    let list = g.nonterminal("LIST")?;
    let items = g.nonterminal("ITEMS")?;
    let more = g.nonterminal("MORE")?;
    let item = g.nonterminal("ITEM")?;

    g.production(list, [T(lparen), N(items), T(rparen)])?;
    g.production(items, [N(item), N(more)])?;
    g.production(items, [])?;
    g.production(more, [T(comma), N(item), N(more)])?;
    g.production(more, [])?;
    g.production(item, [T(atom)])?;
    g.production(item, [N(list)])?;
    Ok(())
}

pub fn json(g: &mut GrammarDef) -> Result<(), GrammarError> {
    let lbrace = g.terminal("{")?;
    let rbrace = g.terminal("}")?;
    let lbracket = g.terminal("[")?;
    let rbracket = g.terminal("]")?;
    let comma = g.terminal(",")?;
    let colon = g.terminal(":")?;
    let string = g.terminal("STRING")?;
    let number = g.terminal("NUMBER")?;
    let true_ = g.terminal("true")?;
    let false_ = g.terminal("false")?;
    let null = g.terminal("null")?;

    let value = g.nonterminal("VALUE")?;
    let object = g.nonterminal("OBJECT")?;
    let members = g.nonterminal("MEMBERS")?;
    let member = g.nonterminal("MEMBER")?;
    let array = g.nonterminal("ARRAY")?;
    let elements = g.nonterminal("ELEMENTS")?;

    for token in [string, number, true_, false_, null] {
        g.production(value, [T(token)])?;
    }
    g.production(value, [N(object)])?;
    g.production(value, [N(array)])?;

    g.production(object, [T(lbrace), T(rbrace)])?;
    g.production(object, [T(lbrace), N(members), T(rbrace)])?;
    g.production(members, [N(member)])?;
    g.production(members, [N(members), T(comma), N(member)])?;
    g.production(member, [T(string), T(colon), N(value)])?;

    g.production(array, [T(lbracket), T(rbracket)])?;
    g.production(array, [T(lbracket), N(elements), T(rbracket)])?;
    g.production(elements, [N(value)])?;
    g.production(elements, [N(elements), T(comma), N(value)])?;
    Ok(())
}
