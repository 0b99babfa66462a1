use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use serde::Serialize;

use krust::ast::{ExprId, ExprIds};
use krust::ast_printer::AstPrinter;
use krust::driver::{decode_source, Outcome, Session};
use krust::parser::Parser;
use krust::resolver::Resolver;
use krust::scanner::Scanner;

#[derive(ClapParser, Debug)]
#[command(version, about = "Krust language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: Option<PathBuf> },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: Option<PathBuf> },

    /// Resolves a program and prints its local-variable distance map as JSON
    Resolve { filename: Option<PathBuf> },

    /// Runs input from a file as a Krust program
    Run { filename: Option<PathBuf> },

    /// Starts an interactive session
    Repl,
}

/// JSON shape printed by `resolve`.
#[derive(Serialize)]
struct ResolveReport {
    locals: BTreeMap<ExprId, usize>,
}

/// Reads the raw contents of a file.
fn read_file(filename: PathBuf) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

/// Reads a script, exiting with the error's own code if it is not UTF-8.
fn read_source(filename: PathBuf) -> Result<String> {
    match decode_source(read_file(filename)?) {
        Ok(source) => Ok(source),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(e.exit_code());
        }
    }
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // `[module:line] - message`, written to app.log
    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("krust::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn report(outcome: &Outcome) {
    for error in outcome.errors() {
        eprintln!("{}", error);
    }
}

fn no_input() {
    info!("No filepath provided");
    println!("No input filepath was provided. Exiting...");
    std::process::exit(0);
}

fn run_prompt() -> Result<()> {
    let mut session = Session::new();
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        match line.trim() {
            ":q" | ":quit" | ":exit" => break,
            "" => continue,
            input => {
                let outcome = session.run(input);
                debug!("REPL outcome: {:?}", outcome);
                report(&outcome);
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename } => {
            let Some(filename) = filename else {
                no_input();
                return Ok(());
            };

            let source = read_source(filename)?;
            let mut tokenized = true;

            for token in Scanner::new(&source) {
                match token {
                    Ok(token) => println!("{}", token),
                    Err(e) => {
                        tokenized = false;
                        eprintln!("{}", e);
                    }
                }
            }

            if !tokenized {
                debug!("Tokenization failed, exiting with code 65");
                std::process::exit(65);
            }
        }

        Commands::Parse { filename } => {
            let Some(filename) = filename else {
                no_input();
                return Ok(());
            };

            let source = read_source(filename)?;
            let (tokens, errors) = Scanner::scan_all(&source);
            let mut ids = ExprIds::new();
            let mut parser = Parser::new(tokens, &mut ids);

            match parser.parse_expression() {
                Ok(expr) if errors.is_empty() => println!("{}", AstPrinter::print(&expr)),
                Ok(_) => {
                    errors.iter().for_each(|e| eprintln!("{}", e));
                    std::process::exit(65);
                }
                Err(e) => {
                    errors.iter().for_each(|e| eprintln!("{}", e));
                    eprintln!("{}", e);
                    std::process::exit(65);
                }
            }
        }

        Commands::Resolve { filename } => {
            let Some(filename) = filename else {
                no_input();
                return Ok(());
            };

            let source = read_source(filename)?;
            let mut session = Session::new();

            let statements = match session.parse(&source) {
                Ok(statements) => statements,
                Err(errors) => {
                    report(&Outcome::StaticErrors(errors));
                    std::process::exit(65);
                }
            };

            let mut resolver = Resolver::with_globals(session.interpreter().global_names());
            match resolver.resolve(&statements) {
                Ok(locals) => {
                    let report = ResolveReport {
                        locals: locals.into_iter().collect(),
                    };
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                Err(errors) => {
                    report(&Outcome::StaticErrors(errors));
                    std::process::exit(65);
                }
            }
        }

        Commands::Run { filename } => {
            let Some(filename) = filename else {
                no_input();
                return Ok(());
            };

            info!("Running Run subcommand");
            let source = read_source(filename)?;
            info!("Provided input:\n {}", source);

            let mut session = Session::new();
            let outcome = session.run(&source);

            if !outcome.is_ok() {
                report(&outcome);
                std::process::exit(outcome.exit_code());
            }
        }

        Commands::Repl => run_prompt()?,
    }

    Ok(())
}
