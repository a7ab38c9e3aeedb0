use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::fs;
use std::path::PathBuf;

use sciontopo::builder::{BuildOptions, TopologyBuilder};
use sciontopo::config::TopologySpec;
use sciontopo::config_loader;
use sciontopo::naming::{HostnameAssigner, NamingScope, WordCorpus, DEFAULT_WORDS_PATH};
use sciontopo::repository::InMemoryRepository;

/// Build a SCIONLab test topology and dump the resulting entities
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a topology YAML file
    #[arg(short, long, conflicts_with = "builtin")]
    topology: Option<PathBuf>,

    /// Name of a built-in topology
    #[arg(short, long, default_value = "testtopo")]
    builtin: String,

    /// Word list used for host labels
    #[arg(short, long, default_value = DEFAULT_WORDS_PATH)]
    words: PathBuf,

    /// Seed for host label sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Only label hosts that do not have a label yet
    #[arg(long)]
    unlabeled_only: bool,

    /// Bootstrap trust material of independent ISDs in parallel
    #[arg(long)]
    parallel: bool,

    /// Write the built topology as JSON to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Args {
    fn topology_spec(&self) -> Result<TopologySpec> {
        match &self.topology {
            Some(path) => config_loader::load_topology(path)
                .wrap_err_with(|| format!("Failed to load topology '{}'", path.display())),
            None => TopologySpec::builtin(&self.builtin)
                .ok_or_else(|| eyre!("Unknown built-in topology '{}'", self.builtin)),
        }
    }

    fn hostname_assigner(&self) -> Result<HostnameAssigner> {
        let corpus = WordCorpus::load(&self.words)
            .wrap_err_with(|| format!("Failed to load word list '{}'", self.words.display()))?;
        let scope = if self.unlabeled_only {
            NamingScope::UnlabeledOnly
        } else {
            NamingScope::AllInfrastructure
        };
        let mut assigner = HostnameAssigner::new(corpus).with_scope(scope);
        if let Some(seed) = self.seed {
            assigner = assigner.with_seed(seed);
        }
        Ok(assigner)
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Starting sciontopo");
    let spec = args.topology_spec()?;
    let assigner = args.hostname_assigner()?;

    let repo = InMemoryRepository::new();
    let report = TopologyBuilder::new(&repo)
        .with_options(BuildOptions {
            parallel_trust_bootstrap: args.parallel,
        })
        .with_hostnames(assigner)
        .build(&spec)
        .wrap_err("Topology construction failed")?;

    info!(
        "Built {} ISDs, {} ASes, {} links, {} VPNs, {} extra services; named {} hosts",
        report.isds, report.ases, report.links, report.vpns, report.extra_services, report.hosts_named
    );

    if let Some(output) = &args.output {
        let json = serde_json::to_string_pretty(&repo.snapshot())
            .wrap_err("Failed to serialize topology")?;
        fs::write(output, json)
            .wrap_err_with(|| format!("Failed to write topology to '{}'", output.display()))?;
        info!("Wrote topology snapshot to {:?}", output);
    }

    Ok(())
}
