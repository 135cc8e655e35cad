// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use orapack::{
    package::{manifest::bill_of_lading, templating::VarTemplater},
    MatchPolicy, Packager, ProjectDefinition,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::{
    fs,
    path::{Path, PathBuf},
    process::exit,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  orapack [options] <orapack-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        match self.command {
            Command::Init(opts) => run_init(opts),
            Command::Classify(opts) => run_classify(opts),
            Command::Manifest(opts) => run_manifest(opts),
            Command::Package(opts) => run_package(opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Write a starter project definition file.
    #[command(override_usage = "orapack init [options]")]
    Init(InitOptions),

    /// Show which database object a file path maps to.
    #[command(override_usage = "orapack classify [options] <path>...")]
    Classify(ClassifyOptions),

    /// Print the bill of lading for the packaging input set.
    #[command(override_usage = "orapack manifest [options] [<path>]...")]
    Manifest(ManifestOptions),

    /// Package tracked source files into per-schema deploy scripts.
    #[command(override_usage = "orapack package [options]")]
    Package(PackageOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InitOptions {
    /// Path of the project definition file to create.
    #[arg(short, long, value_name = "path", default_value = "./orapack.toml")]
    pub config: PathBuf,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ClassifyOptions {
    /// File paths to classify.
    #[arg(required = true, value_name = "path")]
    pub paths: Vec<String>,

    /// Path of the project definition file.
    #[arg(short, long, value_name = "path", default_value = "./orapack.toml")]
    pub config: PathBuf,

    /// Refuse paths that match more than one source pattern.
    #[arg(short, long)]
    pub strict: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ManifestOptions {
    /// File paths to list. Defaults to the configured packaging input set.
    #[arg(value_name = "path")]
    pub paths: Vec<String>,

    /// Path of the project definition file.
    #[arg(short, long, value_name = "path", default_value = "./orapack.toml")]
    pub config: PathBuf,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct PackageOptions {
    /// Path of the project definition file.
    #[arg(short, long, value_name = "path", default_value = "./orapack.toml")]
    pub config: PathBuf,

    /// Print generated scripts instead of writing them to disk.
    #[arg(short, long)]
    pub dry_run: bool,
}

fn main() {
    let layer = fmt::layer().compact().with_target(false).without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn load_definition(path: &Path) -> Result<ProjectDefinition> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("cannot read project definition at {:?}", path.display()))?;
    let definition = data
        .parse()
        .with_context(|| format!("cannot parse project definition at {:?}", path.display()))?;
    Ok(definition)
}

fn run_init(opts: InitOptions) -> Result<()> {
    if opts.config.exists() {
        bail!(
            "project definition already exists at {:?}",
            opts.config.display()
        );
    }

    fs::write(&opts.config, ProjectDefinition::default().to_string())?;
    info!(
        "wrote starter project definition to {:?}",
        opts.config.display()
    );

    Ok(())
}

fn run_classify(opts: ClassifyOptions) -> Result<()> {
    let definition = load_definition(&opts.config)?;
    let mut resolver = definition.resolver()?;
    if opts.strict {
        resolver = resolver.with_policy(MatchPolicy::Strict);
    }

    for path in &opts.paths {
        let identity = resolver.classify(path)?;
        println!("{path}: {identity}");
    }

    Ok(())
}

fn run_manifest(opts: ManifestOptions) -> Result<()> {
    let definition = load_definition(&opts.config)?;
    let resolver = definition.resolver()?;

    let paths = if opts.paths.is_empty() {
        let mut patterns = definition.package.input.clone();
        patterns.extend(
            definition
                .package
                .exclude
                .iter()
                .map(|pattern| format!("!{}", pattern.trim_start_matches('!'))),
        );
        orapack::changeset::expand(&patterns)?
    } else {
        opts.paths
    };

    print!("{}", bill_of_lading(&resolver, &paths)?);

    Ok(())
}

fn run_package(opts: PackageOptions) -> Result<()> {
    let definition = load_definition(&opts.config)?;

    // Environment variables back the templating context when enabled.
    let scripts = Packager::new(definition)?
        .with_renderer(VarTemplater::new(std::env::vars()))
        .package()?;

    for (output, script) in scripts {
        if opts.dry_run {
            println!("{script}");
            continue;
        }

        if let Some(parent) = Path::new(&output).parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output, script)?;
        info!("wrote deploy script {output}");
    }

    Ok(())
}
