//! glia-fn CLI: scaffold serverless functions, applets and projects from templates.
//!
//! Commands: `create`, `list`, `show`, `validate` and `merge`. Templates come
//! from the built-in catalog, optionally layered with a directory on disk
//! (`--templates` or `templatesDir` in the config file).

mod commands;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use glia_fn_core::config::{CliConfig, CONFIG_FILE};
use glia_fn_core::registry::TemplateKind;

#[derive(Parser)]
#[command(
    name = "glia-fn",
    about = "Scaffold serverless functions, applets and projects from templates",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to glia-fn.config.json
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Template directory layered over the built-in catalog
    #[arg(long, global = true, env = "GLIA_FN_TEMPLATES")]
    templates: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a project from a template
    Create {
        /// Template name (prompts when omitted)
        template: Option<String>,

        /// Output directory (default: the projectName variable)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Template variable, repeatable
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
        vars: Vec<(String, String)>,

        /// Require the template to be of this type
        #[arg(long = "type", value_enum)]
        kind: Option<KindChoice>,

        /// Template engine (simple or handlebars)
        #[arg(long)]
        engine: Option<String>,

        /// Write into a non-empty directory without asking
        #[arg(long)]
        force: bool,
    },

    /// List available templates
    List {
        /// Only templates of this type
        #[arg(long = "type", value_enum)]
        kind: Option<KindChoice>,

        /// Only templates with this tag
        #[arg(long)]
        tag: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a template with its inheritance resolved
    Show {
        /// Template name
        template: String,
    },

    /// Check the template catalog for errors
    Validate,

    /// Merge two project manifests (child over parent)
    Merge {
        /// Parent manifest file
        parent: PathBuf,

        /// Child manifest file
        child: PathBuf,

        /// Write the result here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum KindChoice {
    Function,
    Project,
    Applet,
}

impl KindChoice {
    pub fn kind(self) -> TemplateKind {
        match self {
            Self::Function => TemplateKind::Function,
            Self::Project => TemplateKind::Project,
            Self::Applet => TemplateKind::Applet,
        }
    }
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = CliConfig::load_or_default(&cli.config)?;
    let ctx = commands::Context::new(config, cli.templates);

    match cli.command {
        Commands::Create {
            template,
            output,
            vars,
            kind,
            engine,
            force,
        } => commands::create::run(
            &ctx,
            template.as_deref(),
            output.as_deref(),
            &vars,
            kind.map(KindChoice::kind),
            engine.as_deref(),
            force,
        ),
        Commands::List { kind, tag, json } => {
            commands::list::run(&ctx, kind.map(KindChoice::kind), tag.as_deref(), json)
        }
        Commands::Show { template } => commands::show::run(&ctx, &template),
        Commands::Validate => commands::validate::run(&ctx),
        Commands::Merge {
            parent,
            child,
            output,
        } => commands::merge::run(&parent, &child, output.as_deref()),
    }
}
