//! Command-line interface for regenerate
//! Regenerates one document per invocation, either in place or into an output path.
//!
//! Usage:
//!   regenerate `<path>`                                   - Regenerate in place
//!   regenerate `<path>` --output `<out>` [--verify]        - Regenerate into another file
//!   regenerate `<path>` --inspect json|tree                - Print the parsed components

use clap::{Arg, ArgAction, ArgMatches, Command};
use regenerate::page_state::PageState;
use regenerate::script::{ScriptExecutor, ScriptResult};
use regenerate::{
    inspect, Document, NoScripts, ProcessExecutor, RegenerateOptions, Regenerator,
};
use regenerate_config::{Loader, RegenerateConfig};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit status when verification found a change and rolled it back
const EXIT_CHANGED: u8 = 2;

fn main() -> ExitCode {
    let matches = Command::new("regenerate")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Regenerates HTML/XML documents from their embedded comment directives")
        .arg_required_else_help(true)
        .arg(
            Arg::new("path")
                .help("Path to the document to regenerate")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("Write the regenerated document here instead of in place"),
        )
        .arg(
            Arg::new("verify")
                .long("verify")
                .help("Fail and roll back if the output would change")
                .requires("output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("published")
                .long("published")
                .help("Strip directives from the output")
                .requires("output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("inspect")
                .long("inspect")
                .help("Print the parsed components instead of regenerating")
                .value_parser(["json", "tree"])
                .conflicts_with("output"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Additional configuration file layered over the project configuration"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Increase log detail (-v debug, -vv trace)")
                .action(ArgAction::Count),
        )
        .get_matches();

    let path = matches
        .get_one::<String>("path")
        .expect("path is a required argument");

    let config = match load_config(path, &matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.logging.level);

    if let Some(format) = matches.get_one::<String>("inspect") {
        return handle_inspect_command(path, format, &config);
    }
    handle_regenerate_command(path, matches.get_one::<String>("output"), &config)
}

fn load_config(path: &str, matches: &ArgMatches) -> Result<RegenerateConfig, String> {
    let mut loader = Loader::new().with_project_file_for(path);
    if let Some(file) = matches.get_one::<String>("config") {
        loader = loader.with_file(file);
    }
    if matches.get_flag("published") {
        loader = loader
            .set_override("output.mode", "published")
            .map_err(|e| e.to_string())?;
    }
    if matches.get_flag("verify") {
        loader = loader
            .set_override("verify.enabled", true)
            .map_err(|e| e.to_string())?;
    }
    match matches.get_count("verbose") {
        0 => {}
        1 => loader = loader.set_override("logging.level", "debug").map_err(|e| e.to_string())?,
        _ => loader = loader.set_override("logging.level", "trace").map_err(|e| e.to_string())?,
    }
    loader.build().map_err(|e| e.to_string())
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Handle the inspect command
fn handle_inspect_command(path: &str, format: &str, config: &RegenerateConfig) -> ExitCode {
    let shapes = config.shape_registry();
    let document = match Document::open(path, &shapes) {
        Ok(document) => document,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    match format {
        "json" => match inspect::to_json(&document) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error formatting components: {}", e);
                return ExitCode::FAILURE;
            }
        },
        _ => print!("{}", inspect::to_tree(&document)),
    }
    ExitCode::SUCCESS
}

/// Scripts run through the configured interpreter, or not at all.
enum CliExecutor {
    Process(ProcessExecutor),
    Disabled(NoScripts),
}

impl ScriptExecutor for CliExecutor {
    fn execute(&mut self, source: &str, line_number: usize, state: &mut PageState) -> ScriptResult {
        match self {
            CliExecutor::Process(executor) => executor.execute(source, line_number, state),
            CliExecutor::Disabled(executor) => executor.execute(source, line_number, state),
        }
    }
}

/// Handle the regenerate command
fn handle_regenerate_command(
    path: &str,
    output: Option<&String>,
    config: &RegenerateConfig,
) -> ExitCode {
    let shapes = config.shape_registry();
    let executor = match config.process_executor() {
        Some(executor) => CliExecutor::Process(executor),
        None => CliExecutor::Disabled(NoScripts),
    };
    let options = RegenerateOptions {
        mode: config.output.mode,
        writer: config.writer_options(),
    };
    let mut regenerator = Regenerator::new(&shapes, executor, options);

    let result = match output {
        Some(output) => regenerator.regenerate_to_output(path, output, config.verify.enabled),
        None => regenerator.regenerate_in_place(path),
    };
    match result {
        Ok(report) => {
            println!(
                "Regenerated {} ({} components, {} scripts)",
                report.target.display(),
                report.components,
                report.scripts
            );
            ExitCode::SUCCESS
        }
        Err(e) if e.is_change_detected() => {
            eprintln!("Change detected: {}", e);
            ExitCode::from(EXIT_CHANGED)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
