//! `latexsym` - parse a LaTeX math expression, print its canonical form and
//! hand it to a simplification backend.

mod config;
mod engines;

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use latex_sym::{Bindings, Canonical, Expression, ParseOptions, Registers};
use log::{debug, info};

use config::{Cli, EngineKind};
use engines::{Passthrough, Sympy};

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .filter_level(cli.log_level.into())
        .init();
    debug!("Configuration: {cli:?}");

    run(&cli, &mut std::io::stdout().lock())
}

fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let options = ParseOptions {
        require_eof: !cli.partial,
    };
    let parsed = Expression::parse_with(&cli.expression, options)
        .with_context(|| format!("failed to parse {:?}", cli.expression))?;
    let canonical = parsed.tree.canonicalize();

    writeln!(out, "Parsed Text: {:?}", parsed.tree)?;
    writeln!(out, "Unparsed Text: {}", parsed.remainder)?;
    writeln!(out, "Value: {}", canonical.text)?;
    writeln!(out, "Variables: {}", canonical.variables.to_names().join(" "))?;

    if cli.evaluate || !cli.bind.is_empty() {
        let values = evaluate(cli, &parsed.tree)?;
        let values: Vec<String> = values.iter().map(f64::to_string).collect();
        writeln!(out, "Evaluated: {}", values.join(" "))?;
    }

    writeln!(out, "Simplify: {}", simplify(cli, &canonical)?)?;
    Ok(())
}

fn evaluate(cli: &Cli, tree: &Expression) -> Result<Vec<f64>> {
    let length = cli.bind.first().map_or(1, |b| b.values.len());
    let mut bindings = Bindings::<f64>::new();
    for binding in &cli.bind {
        bindings.insert(binding.name, binding.values.as_slice());
    }
    let mut registers = Registers::new(length);
    let values = tree
        .evaluate(&bindings, &mut registers)
        .context("failed to evaluate")?;
    info!("evaluated with {} register(s)", registers.num_allocations());
    Ok(values)
}

fn simplify(cli: &Cli, canonical: &Canonical) -> Result<String> {
    match cli.engine {
        EngineKind::None => Ok(canonical.simplify_with(&Passthrough)?),
        EngineKind::Sympy => canonical
            .simplify_with(&Sympy::new(&cli.python))
            .context("sympy simplification failed"),
    }
}
