mod builder;
mod dispatch;
mod emitter;
mod errors;
mod mappers;
mod model;
mod plan;
mod reference;
mod variables;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use crate::errors::TranslationError;
use crate::plan::ParsedPlan;

/// Cache filename a Terraform-collaborator run leaves behind under the
/// input directory; reading it (rather than shelling out to `terraform`
/// ourselves) keeps CLI invocation of the Terraform binary out of scope.
const PARSED_PLAN_FILENAME: &str = "terraform-plan.json";

#[derive(Parser, Debug)]
#[command(name = "tf2tosca")]
#[command(about = "Translates a parsed Terraform plan into a TOSCA 2.0 Simple Profile topology", long_about = None)]
struct Args {
    /// Directory containing Terraform sources (and a parsed
    /// `terraform-plan.json` produced by the Terraform collaborator).
    input_directory: PathBuf,

    /// Path to write the TOSCA YAML document; extension must be `.yaml` or `.yml`.
    output_file: PathBuf,

    /// Enable verbose logging.
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn validate_inputs(input_directory: &Path, output_file: &Path) -> Result<(), TranslationError> {
    if !input_directory.exists() {
        return Err(TranslationError::InvalidInput(format!(
            "input directory does not exist: {}",
            input_directory.display()
        )));
    }
    if !input_directory.is_dir() {
        return Err(TranslationError::InvalidInput(format!(
            "input path is not a directory: {}",
            input_directory.display()
        )));
    }
    match output_file.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => {}
        _ => {
            return Err(TranslationError::InvalidInput(format!(
                "output file must have a .yaml or .yml extension: {}",
                output_file.display()
            )))
        }
    }
    Ok(())
}

fn run(args: &Args) -> Result<(), TranslationError> {
    validate_inputs(&args.input_directory, &args.output_file)?;

    let plan_path = args.input_directory.join(PARSED_PLAN_FILENAME);
    if args.debug {
        eprintln!("debug: reading parsed plan from {}", plan_path.display());
    }
    let raw = std::fs::read_to_string(&plan_path)
        .with_context(|| format!("reading parsed plan from {}", plan_path.display()))
        .map_err(|e| TranslationError::ParseInputMalformed(format!("{e:#}")))?;
    let parsed_plan = ParsedPlan::from_json(&raw)
        .with_context(|| format!("parsing {}", plan_path.display()))
        .map_err(|e| TranslationError::ParseInputMalformed(format!("{e:#}")))?;

    if args.debug {
        eprintln!(
            "debug: parsed {} resource(s) from plan",
            parsed_plan.all_planned_resources().len()
        );
    }

    let tosca_file = dispatch::translate(&parsed_plan)?;

    let generation_timestamp = env_generation_timestamp();
    emitter::write_to_file(&tosca_file, &generation_timestamp, &args.output_file)?;

    if args.debug {
        eprintln!("debug: wrote {}", args.output_file.display());
    }
    Ok(())
}

/// Timestamp for the `generation_timestamp` metadata field (§6.3). Reads
/// the wall clock directly rather than going through an injected clock —
/// this engine has no replay/determinism requirement on that field.
fn env_generation_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
