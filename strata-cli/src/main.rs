//! Strata CLI - run, check and explore Datalog programs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use serde_json::json;
use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use strata_core::output::answers_to_maps;
use strata_core::{
    init_tracing, parse_program, render_answers, Bindings, Engine, EngineConfig, LoggingConfig,
    Statement, StrataError,
};

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Strata - embeddable Datalog engine with stratified negation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format for query answers
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute Datalog files and print the answers of every query
    Run {
        /// Program files, executed in order against one engine
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Parse and validate Datalog files without answering queries
    Check {
        /// Program files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Load files, then read statements interactively
    Shell {
        /// Program files to load first
        files: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = if cli.verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig::default()
    };
    init_tracing(&logging)?;

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    strata_core::monitoring::register_metrics();

    match cli.command {
        Commands::Run { files } => run_command(&files, config, cli.format),
        Commands::Check { files } => check_command(&files, config),
        Commands::Shell { files } => shell_command(&files, config, cli.format),
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Execute `source` statement by statement, printing each query's answers
fn execute_source(engine: &mut Engine, source: &str, format: Format) -> Result<(), StrataError> {
    for parsed in parse_program(source)? {
        let start = Instant::now();
        let answers = parsed
            .statement
            .execute(engine, None)
            .map_err(|e| StrataError::Statement {
                line: parsed.line,
                source: Box::new(e),
            })?;

        if let (Statement::Query(_), Some(answers)) = (&parsed.statement, answers) {
            print_answers(&parsed.statement, &answers, format, start.elapsed().as_secs_f64());
        }
    }
    Ok(())
}

fn print_answers(query: &Statement, answers: &[Bindings], format: Format, seconds: f64) {
    match format {
        Format::Json => {
            let record = json!({
                "query": query.to_string(),
                "answers": answers_to_maps(answers),
            });
            println!("{}", record);
        }
        Format::Text => {
            println!("{} {}", "→".blue(), query);
            println!("{}", render_answers(answers));
            tracing::debug!(answers = answers.len(), seconds, "Query printed");
        }
    }
}

fn run_command(files: &[PathBuf], config: EngineConfig, format: Format) -> Result<()> {
    let start = Instant::now();
    let mut engine = Engine::with_config(config);

    for file in files {
        let source = read_source(file)?;
        execute_source(&mut engine, &source, format)
            .with_context(|| format!("Failed to execute {}", file.display()))?;
    }

    tracing::info!(
        files = files.len(),
        facts = engine.facts().len(),
        rules = engine.rules().len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Run finished"
    );
    Ok(())
}

fn check_file(file: &Path, config: &EngineConfig) -> Result<(usize, usize)> {
    let source = read_source(file)?;
    let mut engine = Engine::with_config(config.clone());

    for parsed in parse_program(&source)? {
        // Queries and deletions are only parsed; nothing is evaluated
        let loaded = match &parsed.statement {
            Statement::InsertFact(fact) => engine.fact(fact.clone()),
            Statement::InsertRule(rule) => engine.rule(rule.clone()),
            Statement::Query(_) | Statement::Delete(_) => Ok(()),
        };
        loaded.map_err(|e| StrataError::Statement {
            line: parsed.line,
            source: Box::new(e),
        })?;
    }
    engine.validate()?;
    Ok((engine.facts().len(), engine.rules().len()))
}

fn check_command(files: &[PathBuf], config: EngineConfig) -> Result<()> {
    let mut failed = 0;

    for file in files {
        println!("{} Checking {}...", "→".blue(), file.display());
        match check_file(file, &config) {
            Ok((facts, rules)) => {
                println!("{} Program is valid!", "✓".green());
                println!("  Facts: {}", facts);
                println!("  Rules: {}", rules);
            }
            Err(e) => {
                println!("{} Program is invalid:", "✗".red());
                println!("  {:#}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

const SHELL_HELP: &str = "\
Statements:
  fact(a, b).            add a fact
  head(X) :- body(X).    add a rule
  goal(X), other(X)?     run a query
  goal(X)~               delete matching facts
Commands:
  dump                   print all facts and rules
  validate               check the rules and facts
  load <file>            execute a file
  help                   show this message
  exit                   leave the shell";

fn shell_command(files: &[PathBuf], config: EngineConfig, format: Format) -> Result<()> {
    let mut engine = Engine::with_config(config);
    for file in files {
        let source = read_source(file)?;
        execute_source(&mut engine, &source, format)
            .with_context(|| format!("Failed to execute {}", file.display()))?;
        println!("{} Loaded {}", "✓".green(), file.display());
    }

    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut pending = String::new();

    loop {
        if interactive {
            print!("{}", if pending.is_empty() { "strata> " } else { "   ...> " });
            io::stdout().flush()?;
        }

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim();

        if pending.is_empty() {
            match trimmed {
                "" => continue,
                "exit" | "quit" => break,
                "help" => {
                    println!("{}", SHELL_HELP);
                    continue;
                }
                "dump" => {
                    print!("{}", engine);
                    continue;
                }
                "validate" => {
                    match engine.validate() {
                        Ok(()) => println!("{} OK", "✓".green()),
                        Err(e) => println!("{} {}", "✗".red(), e),
                    }
                    continue;
                }
                _ => {}
            }
            if let Some(path) = trimmed.strip_prefix("load ") {
                let loaded = read_source(Path::new(path.trim()))
                    .and_then(|source| Ok(execute_source(&mut engine, &source, format)?));
                match loaded {
                    Ok(()) => println!("{} Loaded {}", "✓".green(), path.trim()),
                    Err(e) => println!("{} {:#}", "✗".red(), e),
                }
                continue;
            }
        }

        pending.push_str(&line);
        if !ends_statement(pending.trim_end()) {
            continue;
        }
        if let Err(e) = execute_source(&mut engine, &pending, format) {
            println!("{} {}", "✗".red(), e);
        }
        pending.clear();
    }

    if !pending.trim().is_empty() {
        println!("{} Incomplete statement discarded", "!".yellow());
    }
    Ok(())
}

/// Whether the buffered text ends with a statement terminator
///
/// `%` starts a comment only outside quoted strings.
fn ends_statement(text: &str) -> bool {
    let mut last = None;
    let mut quote = None;
    let mut escaped = false;
    let mut comment = false;

    for c in text.chars() {
        if comment {
            comment = c != '\n';
            continue;
        }
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == open {
                quote = None;
            }
            last = Some(c);
            continue;
        }
        match c {
            '%' => comment = true,
            '"' | '\'' => {
                quote = Some(c);
                last = Some(c);
            }
            c if !c.is_whitespace() => last = Some(c),
            _ => {}
        }
    }

    quote.is_none() && matches!(last, Some('.' | '?' | '~'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ends_statement() {
        assert!(ends_statement("a(1)."));
        assert!(ends_statement("p(X) :-\n  q(X)."));
        assert!(ends_statement("a(X)? % ask"));
        assert!(ends_statement("a(X)~"));
        assert!(!ends_statement("p(X) :-"));
        assert!(!ends_statement("% just a comment."));
    }

    #[test]
    fn test_percent_inside_strings_is_not_a_comment() {
        assert!(ends_statement("says(\"50%\")."));
        assert!(ends_statement("says('a%b'). % trailing"));
        assert!(ends_statement("says(\"say \\\"100%\\\"\")."));
        assert!(!ends_statement("says(\"50%\")"));
        assert!(!ends_statement("says(\"unfinished."));
    }
}
