use runbox::cli::commands::{CliArgs, Commands};
use runbox::cli::handlers::{
    handle_build_images, handle_config, handle_emit, handle_fmt, handle_generate, handle_languages,
    handle_lint, handle_parse, handle_run,
};
use runbox::util::logging::{self, LoggingConfig};
use runbox::{NAME, VERSION};

use clap::Parser;
use std::env;
use std::process;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("{} v{} starting", NAME, VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Parse(parse_args) => handle_parse(parse_args),
        Commands::Lint(lint_args) => handle_lint(lint_args),
        Commands::Fmt(fmt_args) => handle_fmt(fmt_args, args.quiet),
        Commands::Emit(emit_args) => handle_emit(emit_args, args.quiet),
        Commands::Generate(generate_args) => handle_generate(generate_args, args.quiet),
        Commands::Languages(format_args) => handle_languages(format_args),
        Commands::BuildImages(build_args) => handle_build_images(build_args, args.quiet).await,
        Commands::Run(run_args) => handle_run(run_args).await,
        Commands::Config(format_args) => handle_config(format_args),
    };

    process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        logging::parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        let level_str = env::var("RUNBOX_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        logging::parse_level(&level_str)
    };

    let use_json = env::var("RUNBOX_LOG_JSON")
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false);

    logging::init_logging(LoggingConfig {
        level,
        use_json,
        ..Default::default()
    });
}
