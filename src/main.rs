//! PatternRunner CLI Entry Point
//!
//! Provides command-line interface for pipeline execution.
//!
//! # Usage
//!
//! ```bash
//! # Execute a pipeline
//! patternrunner pipeline.yaml
//!
//! # Generate job scripts without running them
//! patternrunner pipeline.yaml --simulate
//!
//! # Point job headers at a different tools installation
//! patternrunner pipeline.yaml --ctools /opt/cwsl-ctools
//! ```

use std::env;
use std::process::ExitCode;

use log::{error, info};

use patternrunner::discovery::lister::GlobLister;
use patternrunner::schedule::runner::LocalShellRunner;
use patternrunner::{execute_pipeline, load_pipeline, EngineConfig, APP_NAME, VERSION};

/// Default pipeline file used when none is specified.
const DEFAULT_PIPELINE: &str = "pipeline.yaml";

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    pipeline_path: String,
    simulate: bool,
    ctools: Option<String>,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline_path: DEFAULT_PIPELINE.to_string(),
            simulate: false,
            ctools: None,
            verbose: false,
        }
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME, VERSION);
    println!("Declarative Pipeline Engine");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: patternrunner [OPTIONS] <PIPELINE_FILE>");
    println!();
    println!("Arguments:");
    println!("  <PIPELINE_FILE>     Path to pipeline YAML file");
    println!();
    println!("Options:");
    println!("  --simulate          Generate job scripts without running them");
    println!("  --ctools PATH       Tools installation exported in job headers");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Examples:");
    println!("  patternrunner pipeline.yaml");
    println!("  patternrunner pipeline.yaml --simulate");
    println!("  patternrunner pipeline.yaml --ctools /opt/cwsl-ctools");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut positional_index = 0;
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--simulate" => {
                config.simulate = true;
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--ctools" => {
                i += 1;
                if i >= args.len() {
                    return Err("--ctools requires a path argument".to_string());
                }
                config.ctools = Some(args[i].clone());
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                // Positional argument
                match positional_index {
                    0 => config.pipeline_path = arg.clone(),
                    _ => return Err(format!("Unexpected argument: {}", arg)),
                }
                positional_index += 1;
            }
        }
        i += 1;
    }

    Ok(config)
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    // Setup logging
    setup_logging(config.verbose);

    // Print banner
    print_banner();

    if config.simulate {
        info!("Mode: SIMULATE (job scripts will not run)");
        println!();
    }

    // Resolve the engine configuration
    let engine_config = match config.ctools.as_deref() {
        Some(path) => EngineConfig::with_ctools(path),
        None => EngineConfig::from_env(),
    };
    info!("Tools path: {}", engine_config.ctools_path);

    // Load pipeline
    info!("Loading pipeline: {}", config.pipeline_path);
    let doc = load_pipeline(&config.pipeline_path).map_err(|e| {
        error!("Failed to load pipeline: {}", e);
        format!(
            "Could not load pipeline from '{}': {}",
            config.pipeline_path, e
        )
    })?;

    // Execute pipeline
    let reports = execute_pipeline(
        &doc,
        &engine_config,
        &GlobLister,
        &LocalShellRunner::new(),
        config.simulate,
    )?;

    if config.simulate {
        for report in &reports {
            println!();
            println!("[SIMULATE] Step: {}", report.name);
            println!("  Output template: {}", report.output_template);
            println!("  Output combinations: {}", report.combination_count);
            println!("  Script:");
            for line in report.script.lines() {
                println!("    {}", line);
            }
        }
    }

    println!();
    println!("Pipeline completed successfully");
    println!("Steps run: {}", reports.len());

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
