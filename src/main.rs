use anyhow::{Context, Result, bail};
use clap::{Arg, ArgMatches, Command};
use lmx::{
    EvaluationOptions, TokenSequence, WriteDiagnostics, delinearize_text, evaluate_musicxml,
    linearize, read_part,
};
use std::path::{Path, PathBuf};
use tracing::{Level, debug, info};

fn linearize_file(input: &Path, to_stdout: bool) -> Result<Option<PathBuf>> {
    let xml = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read MusicXML file: {}", input.display()))?;
    let part = read_part(&xml)
        .with_context(|| format!("Failed to read part from: {}", input.display()))?;
    let text = TokenSequence::from_tokens(linearize(&part)).to_string();

    if to_stdout {
        println!("{}", text);
        return Ok(None);
    }

    let output = input.with_extension("lmx");
    std::fs::write(&output, text + "\n")
        .with_context(|| format!("Failed to write LMX file: {}", output.display()))?;
    Ok(Some(output))
}

fn run_linearize(matches: &ArgMatches) -> Result<()> {
    let to_stdout = matches.get_flag("stdout");
    let files: Vec<&String> = matches.get_many::<String>("files").unwrap_or_default().collect();

    let mut failed = 0;
    for file in &files {
        match linearize_file(Path::new(file), to_stdout) {
            Ok(Some(output)) => info!("{} -> {}", file, output.display()),
            Ok(None) => {}
            Err(e) => {
                failed += 1;
                eprintln!("{}: {:#}", file, e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} files failed", failed, files.len());
    }
    Ok(())
}

fn run_repair(matches: &ArgMatches) -> Result<()> {
    let file = matches
        .get_one::<String>("file")
        .context("Missing input file")?;
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read LMX file: {}", file))?;

    let mut diagnostics = WriteDiagnostics::new(std::io::stderr());
    let part = delinearize_text(&text, &mut diagnostics);
    println!("{}", TokenSequence::from_tokens(linearize(&part)));
    Ok(())
}

fn run_evaluate(matches: &ArgMatches) -> Result<()> {
    let predicted_file = matches
        .get_one::<String>("predicted")
        .context("Missing predicted file")?;
    let gold_file = matches
        .get_one::<String>("gold")
        .context("Missing gold file")?;

    let predicted = std::fs::read_to_string(predicted_file)
        .with_context(|| format!("Failed to read LMX file: {}", predicted_file))?;
    let gold = std::fs::read_to_string(gold_file)
        .with_context(|| format!("Failed to read MusicXML file: {}", gold_file))?;

    let options = EvaluationOptions {
        prune: !matches.get_flag("no-prune"),
        debug: matches.get_flag("debug"),
        ..Default::default()
    };
    debug!("Evaluating with {:?}", options);

    let mut diagnostics = WriteDiagnostics::new(std::io::stderr());
    let result = evaluate_musicxml(&predicted, &gold, &options, &mut diagnostics)
        .with_context(|| format!("Failed to evaluate against: {}", gold_file))?;
    println!("{}", result);
    Ok(())
}

fn main() -> Result<()> {
    let matches = Command::new("lmx")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Linearized MusicXML encoder, decoder and evaluator")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .help("Enable verbose output")
                .short('v')
                .long("verbose")
                .global(true)
                .action(clap::ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("linearize")
                .about("Encode MusicXML files as LMX, writing <name>.lmx beside each input")
                .arg(
                    Arg::new("files")
                        .help("Input MusicXML files")
                        .required(true)
                        .num_args(1..)
                        .value_name("FILES"),
                )
                .arg(
                    Arg::new("stdout")
                        .help("Print to stdout instead of writing files")
                        .long("stdout")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("repair")
                .about("Decode an LMX file and print its canonical encoding")
                .arg(
                    Arg::new("file")
                        .help("Input LMX file")
                        .required(true)
                        .value_name("FILE")
                        .index(1),
                ),
        )
        .subcommand(
            Command::new("evaluate")
                .about("Tree edit distance between a predicted LMX file and a gold MusicXML file")
                .arg(
                    Arg::new("predicted")
                        .help("Predicted LMX file")
                        .required(true)
                        .value_name("PREDICTED")
                        .index(1),
                )
                .arg(
                    Arg::new("gold")
                        .help("Gold MusicXML file")
                        .required(true)
                        .value_name("GOLD")
                        .index(2),
                )
                .arg(
                    Arg::new("no-prune")
                        .help("Compare the trees without pruning")
                        .long("no-prune")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("debug")
                        .help("Print a measure-by-measure comparison to stderr")
                        .long("debug")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match matches.subcommand() {
        Some(("linearize", sub)) => run_linearize(sub),
        Some(("repair", sub)) => run_repair(sub),
        Some(("evaluate", sub)) => run_evaluate(sub),
        _ => bail!("Unknown command"),
    }
}
