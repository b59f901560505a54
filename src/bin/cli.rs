//! Atlas CLI - analyse Java/Spring sources and render endpoint class diagrams.

use anyhow::{Context, Result};
use atlas::{Atlas, AtlasConfig, DependencyKind};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "atlas")]
#[command(about = "Atlas CLI - dependency graphs and class diagrams for Spring projects", long_about = None)]
struct Cli {
    /// Configuration file (default: ./atlas.toml, optional)
    #[arg(short, long, default_value = "atlas.toml")]
    config: PathBuf,

    /// Store snapshot (default: [store].snapshot_path from the config)
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a project and store its dependency graph
    Analyze {
        /// Project root
        root: PathBuf,

        /// Package pattern, e.g. com.shop.** (default: all packages)
        #[arg(short, long, default_value = "**")]
        pattern: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-analyse a project and list its HTTP endpoints
    Endpoints {
        /// Project root
        root: PathBuf,

        /// Package pattern, e.g. com.shop.** (default: all packages)
        #[arg(short, long, default_value = "**")]
        pattern: String,

        /// Print endpoints as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render the class diagram of an endpoint
    Diagram {
        /// Endpoint id (from `atlas endpoints`)
        endpoint: Uuid,

        /// Project id (default: the project owning the endpoint)
        #[arg(short, long)]
        project: Option<Uuid>,

        /// Print the full diagram data as JSON
        #[arg(long)]
        json: bool,

        /// Also write the concatenated sources of the diagram's classes
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Print the dependency kind taxonomy
    Kinds {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct KindRow {
    code: &'static str,
    description: &'static str,
    category: atlas::kind::Category,
}

fn init_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("atlas=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("atlas=info"))
    };
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn open(cli_store: Option<&Path>, config: AtlasConfig) -> Result<Atlas> {
    let snapshot = match cli_store {
        Some(path) => path.to_path_buf(),
        None => config.resolve_snapshot_path(&std::env::current_dir()?),
    };
    Atlas::open(config, &snapshot)
        .with_context(|| format!("failed to open store {}", snapshot.display()))
}

fn run(cli: Cli) -> Result<()> {
    let config = AtlasConfig::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;

    match cli.command {
        Commands::Analyze { root, pattern, json } => {
            let mut atlas = open(cli.store.as_deref(), config)?;
            let report = atlas
                .execute_analysis(&root, &pattern)
                .with_context(|| format!("analysis of {} failed", root.display()))?;
            atlas.save()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            println!("✓ Analysed {}", report.root.display());
            println!("  Project: {}", report.project_id);
            println!(
                "  Files: {} ({} skipped)  Classes: {}  Edges: {}  Endpoints: {}",
                report.files_scanned,
                report.parse_errors.len(),
                report.classes,
                report.edges,
                report.endpoints
            );
            for failure in &report.parse_errors {
                println!("  ! {}: {}", failure.path.display(), failure.message);
            }
            for package in &report.packages {
                println!();
                println!("{} ({} classes)", package.package, package.class_count);
                println!("  {}", package.classes.join(", "));
                for (code, count) in &package.kind_counts {
                    let description = DependencyKind::from_code(code)
                        .map(|k| k.description())
                        .unwrap_or("?");
                    println!("    {} {:<40} {}", code, description, count);
                }
            }
        }

        Commands::Endpoints { root, pattern, json } => {
            let mut atlas = open(cli.store.as_deref(), config)?;
            let endpoints = atlas.extract_endpoints(&root, &pattern)?;
            atlas.save()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&endpoints)?);
            } else if endpoints.is_empty() {
                println!("No endpoints found.");
            } else {
                println!("Endpoints ({}):", endpoints.len());
                for e in &endpoints {
                    println!("  {}  {:<7} {}  [{}]", e.id, e.method.as_str(), e.uri, e.class_fqn);
                }
            }
        }

        Commands::Diagram {
            endpoint,
            project,
            json,
            export,
        } => {
            let atlas = open(cli.store.as_deref(), config)?;
            let project_id = match project {
                Some(id) => id,
                None => atlas.store().find_endpoint(endpoint)?.0.id(),
            };
            let diagram = atlas.generate_class_diagram(endpoint, project_id)?;

            if let Some(path) = export {
                let content = atlas.export_sources(project_id, &diagram)?;
                fs::write(&path, content)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                eprintln!("✓ Wrote {} source files to {}", diagram.class_file_paths.len(), path.display());
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&diagram)?);
            } else {
                print!("{}", diagram.diagram_text);
            }
        }

        Commands::Kinds { json } => {
            let rows: Vec<KindRow> = DependencyKind::all()
                .map(|k| KindRow {
                    code: k.code(),
                    description: k.description(),
                    category: k.category(),
                })
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for row in rows {
                    println!("{}  {}", row.code, row.description);
                }
            }
        }
    }

    Ok(())
}
