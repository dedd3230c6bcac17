use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use lr1::{
    grammar::{NonterminalID, SymbolID},
    types::Map,
    Config, Grammar,
};
use std::{fs, path::PathBuf, time::Instant};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// A production rule written as `LHS [->] SYMBOL...`; an LHS alone is an ε-production.
    ///
    /// Every name appearing as an LHS is a nonterminal, any other name is a terminal.
    #[arg(short = 'p', long = "production", required = true)]
    productions: Vec<String>,

    /// The start symbol. Defaults to the LHS of the first production.
    #[arg(long)]
    start: Option<String>,

    /// Whitespace-separated input tokens to run through the parser.
    #[arg(long)]
    input: Option<String>,

    /// The results to print. Defaults to the parse table.
    #[arg(long, value_enum)]
    dump: Vec<Dump>,

    /// Write every dump into this directory instead of printing.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    #[arg(long)]
    max_productions: Option<usize>,

    #[arg(long)]
    max_states: Option<usize>,

    #[arg(long)]
    max_items: Option<usize>,

    /// Report the states built so far when a limit is exceeded.
    #[arg(long)]
    retain_partial: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Dump {
    Grammar,
    Sets,
    Automaton,
    Table,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::trace!("CLI args = {:?}", args);

    let grammar = build_grammar(&args.productions, args.start.as_deref())
        .context("failed to load the grammar")?;

    let mut config = Config::new();
    if let Some(max) = args.max_productions {
        config.max_productions(max);
    }
    if let Some(max) = args.max_states {
        config.max_states(max);
    }
    if let Some(max) = args.max_items {
        config.max_items(max);
    }
    config.retain_partial(args.retain_partial);

    let started = Instant::now();
    let analysis = match config.analyze(&grammar) {
        Ok(analysis) => analysis,
        Err(lr1::AnalysisError::Build(lr1::automaton::BuildError::ResourceLimitExceeded {
            limit,
            max,
            partial: Some(partial),
        })) => {
            println!("{}", partial.display(&grammar));
            anyhow::bail!(
                "resource limit exceeded: more than {} {} ({} state(s) shown above)",
                max,
                limit,
                partial.len()
            );
        }
        Err(err) => return Err(err).context("failed to analyze the grammar"),
    };
    tracing::info!(
        "analysis finished in {:?}: {} state(s), {} transition(s)",
        started.elapsed(),
        analysis.automaton.len(),
        analysis.automaton.transitions().count()
    );

    let num_conflicts = analysis.table.conflicts().count();
    if num_conflicts > 0 {
        let suffix = if num_conflicts == 1 { "" } else { "s" };
        println!(
            "[warning] The parse table has {} conflicting cell{}.",
            num_conflicts, suffix
        );
    }

    let dumps = if args.dump.is_empty() {
        vec![Dump::Table]
    } else {
        args.dump.clone()
    };
    for dump in dumps {
        let (name, contents) = match dump {
            Dump::Grammar => ("grammar", grammar.to_string()),
            Dump::Sets => ("sets", analysis.first_follow.display(&grammar).to_string()),
            Dump::Automaton => ("automaton", analysis.automaton.display(&grammar).to_string()),
            Dump::Table => ("table", analysis.table.display(&grammar).to_string()),
        };
        match &args.out_dir {
            Some(dir) => {
                let path = dir.join(name).with_extension("txt");
                fs::write(&path, contents).with_context(|| {
                    anyhow::anyhow!("failed to write the {} dump to {}", name, path.display())
                })?;
            }
            None => println!("{}", contents),
        }
    }

    if let Some(input) = &args.input {
        let tokens: Vec<&str> = input.split_whitespace().collect();
        let started = Instant::now();
        let result = analysis
            .simulate(&grammar, &tokens)
            .context("failed to tokenize the input")?;
        tracing::info!("simulation finished in {:?}", started.elapsed());

        println!("{}", result.display(&grammar));
        if let Some(err) = result.error {
            anyhow::bail!("the input was rejected: {}", err);
        }
    }

    Ok(())
}

/// Assemble a grammar from `LHS [->] SYMBOL...` strings.
fn build_grammar(productions: &[String], start: Option<&str>) -> anyhow::Result<Grammar> {
    let mut rules: Vec<(&str, Vec<&str>)> = vec![];
    for production in productions {
        let mut symbols = production.split_whitespace();
        let left = symbols
            .next()
            .with_context(|| anyhow::anyhow!("empty production: {:?}", production))?;
        let right: Vec<&str> = symbols.skip_while(|s| *s == "->").collect();
        rules.push((left, right));
    }

    if let Some(start) = start {
        anyhow::ensure!(
            rules.iter().any(|(left, _)| *left == start),
            "the start symbol `{}' has no production",
            start
        );
    }

    let grammar = Grammar::define(|g| {
        let mut nonterminals: Map<&str, NonterminalID> = Map::default();
        for (left, _) in &rules {
            if !nonterminals.contains_key(left) {
                nonterminals.insert(*left, g.nonterminal(left)?);
            }
        }

        let mut terminals = Map::default();
        for (left, right) in &rules {
            let mut rhs = Vec::with_capacity(right.len());
            for name in right {
                let symbol = match nonterminals.get(name) {
                    Some(&n) => SymbolID::N(n),
                    None => match terminals.get(name) {
                        Some(&t) => SymbolID::T(t),
                        None => {
                            let t = g.terminal(name)?;
                            terminals.insert(*name, t);
                            SymbolID::T(t)
                        }
                    },
                };
                rhs.push(symbol);
            }
            g.production(nonterminals[left], rhs)?;
        }

        if let Some(start) = start.and_then(|name| nonterminals.get(name)) {
            g.start_symbol(*start)?;
        }

        Ok(())
    })?;

    Ok(grammar)
}
