use std::io::Read;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kni_reconcile::{merge_manifests, SiteLayout, CLUSTER_MODS_PHASE};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "knictl", version, about = "KNI site manifest tooling")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Build directory holding one sub-directory per site (default: $HOME/.kni)
    #[arg(long = "build-path", env = "KNI_BUILD_PATH", global = true)]
    build_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge a rendered overlay into the site's manifests and promote them to final_manifests
    Merge {
        site: String,
        /// Rendered multi-document overlay ("-" for stdin)
        #[arg(long = "overlay", default_value = "-")]
        overlay: String,
    },
    /// Move generated installer assets into place as the working tree
    Stage { site: String },
    /// Write kustomization.yaml for the site's generated assets
    Index { site: String },
    /// Print the resource keys found in a manifest file or stream ("-" for stdin)
    Keys { path: String },
}

fn init_tracing() {
    let env = std::env::var("KNI_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("KNI_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid KNI_METRICS_ADDR; expected host:port");
        }
    }
}

fn default_build_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".kni"),
        None => PathBuf::from(".kni"),
    }
}

fn read_input(src: &str) -> Result<String> {
    if src == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(src).with_context(|| format!("reading {}", src))
    }
}

fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();
    let build_path = cli.build_path.clone().unwrap_or_else(default_build_path);

    match cli.command {
        Commands::Merge { site, overlay } => {
            let layout = SiteLayout::new(&build_path, &site);
            info!(site = %site, overlay = %overlay, "merge invoked");
            let text = read_input(&overlay)?;
            if text.trim().is_empty() {
                bail!(
                    "overlay is empty; render {} and pass its output via --overlay",
                    layout.phase_dir(CLUSTER_MODS_PHASE).display()
                );
            }
            let report = merge_manifests(&text, &layout).with_context(|| format!("merging manifests for site {}", site))?;
            match cli.output {
                Output::Human => print!("{}", report),
                Output::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }
        Commands::Stage { site } => {
            let layout = SiteLayout::new(&build_path, &site);
            let working = layout.stage_generated_assets().with_context(|| format!("staging assets for site {}", site))?;
            match cli.output {
                Output::Human => println!("staged {}", working.display()),
                Output::Json => println!("{}", serde_json::json!({ "working_tree": working })),
            }
        }
        Commands::Index { site } => {
            let layout = SiteLayout::new(&build_path, &site);
            let (path, entries) = kni_corpus::write_kustomization_index(&layout.generated_assets())
                .with_context(|| format!("indexing assets for site {}", site))?;
            match cli.output {
                Output::Human => {
                    println!("{}", path.display());
                    for e in &entries {
                        println!("  - {}", e);
                    }
                }
                Output::Json => println!("{}", serde_json::json!({ "path": path, "resources": entries })),
            }
        }
        Commands::Keys { path } => {
            let text = read_input(&path)?;
            let set = kni_corpus::load_overlay(&text).with_context(|| format!("loading {}", path))?;
            match cli.output {
                Output::Human => {
                    for key in set.keys() {
                        println!("{}", key);
                    }
                }
                Output::Json => {
                    let keys: Vec<_> = set.keys().collect();
                    println!("{}", serde_json::to_string_pretty(&keys)?);
                }
            }
        }
    }

    Ok(())
}
