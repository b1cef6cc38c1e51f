//! Main binary entry point for the spdx-converter.

use clap::error::ErrorKind as ClapErrorKind;
use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{info, warn};
use spdx_converter::errors::ConverterError;
use spdx_converter::{ConvertConfig, Format};
use std::path::PathBuf;
use std::process::ExitCode;

const EXCLUDE_LICENSE_DETAILS: &str = "excludelicensedetails";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert an SPDX file into another serialization format
    Convert {
        /// File to convert from
        from: PathBuf,

        /// Output file, must not exist yet
        to: PathBuf,

        /// [fromFormat] [toFormat] [excludeLicenseDetails]. Formats are one of
        /// JSON, XLS, XLSX, TAG, RDFXML, RDFTTL, YAML or XML; if not given
        /// both are inferred from the file extensions.
        #[arg(value_name = "ARGS", num_args = 0..)]
        rest: Vec<String>,

        /// Skip RDF/XML constructs that can not be read instead of failing
        #[arg(long)]
        lenient_rdf: bool,
    },
    /// Verify an SPDX file against the schema and the SPDX rules
    Verify {
        file: PathBuf,

        /// [format]; inferred from the file extension if not given.
        #[arg(value_name = "ARGS", num_args = 0..)]
        rest: Vec<String>,

        /// Print the verification report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn setup_logging(verbose: bool) {
    let filter_level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter(None, filter_level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

/// Outcome of a command that ran to completion.
enum Outcome {
    Success,
    /// Verification found problems.
    Invalid,
}

fn run_convert(
    from: PathBuf,
    to: PathBuf,
    rest: &[String],
    lenient_rdf: bool,
) -> Result<Outcome, ConverterError> {
    if rest.len() > 3 {
        warn!("Extra arguments will be ignored");
    }
    if rest.len() == 1 {
        warn!("Only the input file type specified - it will be ignored");
    }

    let mut config = ConvertConfig::new(from, to).with_lenient_rdf_reader(lenient_rdf);
    if rest.len() >= 2 {
        let from_format: Format = rest[0].parse()?;
        let to_format: Format = rest[1].parse()?;
        config = config.with_formats(from_format, to_format);
    }
    if let Some(flag) = rest.get(2) {
        if flag.to_lowercase() == EXCLUDE_LICENSE_DETAILS {
            config = config.excluding_license_details(true);
        } else {
            warn!("Unrecognized option {flag} will be ignored");
        }
    }

    let stats = spdx_converter::convert(&config)?;
    info!(
        "Converted {} to {} ({} records, {} skipped)",
        config.input_file.display(),
        config.output_file.display(),
        stats.copied,
        stats.skipped
    );
    Ok(Outcome::Success)
}

fn run_verify(file: PathBuf, rest: &[String], json: bool) -> Result<Outcome, ConverterError> {
    if rest.len() > 1 {
        warn!("Extra arguments will be ignored");
    }
    let format = match rest.first() {
        Some(token) => token.parse()?,
        None => Format::from_file_name(&file)?,
    };

    let report = spdx_converter::verify_report(&file, format)?;
    if json {
        let text = report
            .to_json()
            .map_err(|e| ConverterError::Encode(format!("Failed to write report: {e}")))?;
        println!("{text}");
    } else if report.is_valid() {
        println!("{}", "This SPDX Document is valid.".green());
    } else {
        println!("{}", "This SPDX Document is not valid due to:".red());
        for message in report.messages() {
            println!("\t{message}");
        }
    }

    Ok(if report.is_valid() {
        Outcome::Success
    } else {
        Outcome::Invalid
    })
}

fn run_app(cli: Cli) -> Result<Outcome, ConverterError> {
    setup_logging(cli.verbose);
    spdx_converter::initialize();

    match cli.command {
        Command::Convert {
            from,
            to,
            rest,
            lenient_rdf,
        } => run_convert(from, to, &rest, lenient_rdf),
        Command::Verify { file, rest, json } => run_verify(file, &rest, json),
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    match run_app(cli) {
        Ok(Outcome::Success) => ExitCode::SUCCESS,
        Ok(Outcome::Invalid) => ExitCode::FAILURE,
        Err(e) => {
            for line in e.report_lines() {
                log::error!("{line}");
            }
            ExitCode::FAILURE
        }
    }
}
