//! Reify command-line inspector
//!
//! Loads `reify.toml` and type catalogs into a fresh runtime, then encodes
//! and decodes stub names, checks reifiability, shows method eligibility,
//! resolves overloads, synthesizes stubs and invokes operations through them.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod context;
mod logging;
mod output;

use context::Context;

#[derive(Parser)]
#[command(name = "reify")]
#[command(about = "Inspect stub synthesis and call reification", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Configuration file (default: ./reify.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Extra type catalog (TOML or JSON); repeatable
    #[arg(long = "catalog", global = true)]
    pub catalogs: Vec<PathBuf>,

    /// Log filter directive, e.g. `debug` or `reify_core=trace`
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_parser = ["text", "json"])]
    pub log_format: Option<String>,

    /// Colored output: auto, always, never
    #[arg(long, global = true, value_parser = ["auto", "always", "never"])]
    pub color: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the stub name for a target, e.g. `acme.Box<String>`
    Encode {
        /// Target type
        target: String,
    },

    /// Print the target encoded in a stub name
    Decode {
        /// Stub type name
        name: String,
    },

    /// Check whether targets can receive a stub
    Check {
        /// Target types
        #[arg(required = true)]
        targets: Vec<String>,
    },

    /// Show which operations of a type a stub would intercept
    Methods {
        /// Type name
        type_name: String,
        /// Only list intercepted operations
        #[arg(long)]
        eligible: bool,
    },

    /// Resolve the constructor (or a method overload) for argument types
    Resolve {
        /// Type name
        type_name: String,
        /// Argument runtime types; `null` for a null argument
        args: Vec<String>,
        /// Resolve an overload of this method instead of a constructor
        #[arg(short, long)]
        method: Option<String>,
    },

    /// Synthesize a stub and print its layout
    Stub {
        /// Target type
        target: String,
    },

    /// Synthesize the configured warm targets plus any given here
    Warm {
        /// Additional targets
        targets: Vec<String>,
    },

    /// Create a reified instance and invoke one operation through its stub
    Invoke {
        /// Target type
        target: String,
        /// Operation name
        method: String,
        /// Operation arguments: 7, 7L, 2.5, true, null or text
        #[arg(allow_negative_numbers = true)]
        args: Vec<String>,
        /// Constructor argument, same notation; repeatable
        #[arg(long = "new")]
        constructor_args: Vec<String>,
        /// Dispatcher type (default: [stubs] default-dispatcher)
        #[arg(short, long)]
        dispatcher: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = context::load_config(&cli.global)?;
    let level = cli
        .global
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let format = match cli.global.log_format.as_deref() {
        Some("json") => reify_core::config::LogFormat::Json,
        Some(_) => reify_core::config::LogFormat::Text,
        None => config.logging.format,
    };
    logging::init(&level, format)?;

    let mut ctx = Context::new(config, &cli.global)?;
    match cli.command {
        Commands::Encode { target } => commands::encode::execute(&mut ctx, &target),
        Commands::Decode { name } => commands::decode::execute(&mut ctx, &name),
        Commands::Check { targets } => commands::check::execute(&mut ctx, &targets),
        Commands::Methods {
            type_name,
            eligible,
        } => commands::methods::execute(&mut ctx, &type_name, eligible),
        Commands::Resolve {
            type_name,
            args,
            method,
        } => commands::resolve::execute(&mut ctx, &type_name, method.as_deref(), &args),
        Commands::Stub { target } => commands::stub::execute(&mut ctx, &target),
        Commands::Warm { targets } => commands::warm::execute(&mut ctx, &targets),
        Commands::Invoke {
            target,
            method,
            args,
            constructor_args,
            dispatcher,
        } => commands::invoke::execute(
            &mut ctx,
            &target,
            &method,
            &args,
            &constructor_args,
            dispatcher.as_deref(),
        ),
    }
}
