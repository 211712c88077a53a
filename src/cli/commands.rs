//! CLI command definitions for the coordinator.
//!
//! Each subcommand maps onto one coordinator operation and wires the
//! bollard runtime, registry client and worker client from environment
//! configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use crate::config::CoordinatorConfig;
use crate::error::BatchFailure;
use crate::execution::{DockerClient, ResourceLifecycleManager};
use crate::pipeline::{merge_files, BuildRequest, PipelineMerger};
use crate::registry::{RegistryClient, VersionResolver};
use crate::scheduler::BoundedTaskPool;
use crate::session::{SessionOrchestrator, StartPlan};
use crate::template::{load_document, TemplateVersion, TemplateWarmer};
use crate::worker::{HttpWorkerClient, WorkerApi};

/// Container coordinator for cyanprint template builds.
#[derive(Parser)]
#[command(name = "cyanprint-coordinator")]
#[command(about = "Warm, start, run and clean containerized template build sessions")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create the coordinator bridge network if it does not exist.
    Setup,

    /// Pull, unpack and start a template version's shared resources.
    WarmTemplate(TemplateArgs),

    /// Pull a session's images and create its working volume.
    Warm(SessionTemplateArgs),

    /// Start and probe a session's processor, plugin and merger containers.
    Start(StartArgs),

    /// Run a build request through a started session.
    Build(BuildArgs),

    /// Remove a session's containers and volumes.
    Clean(SessionArgs),

    /// Overlay directories into a target directory, later sources winning.
    MergeFiles(MergeFilesArgs),
}

#[derive(Parser, Debug)]
pub struct TemplateArgs {
    /// Template manifest (JSON, or YAML with a .yaml/.yml extension).
    #[arg(short, long)]
    pub template: PathBuf,
}

#[derive(Parser, Debug)]
pub struct SessionArgs {
    /// Session id ([A-Za-z0-9_.], no dashes).
    #[arg(short, long)]
    pub session: String,
}

#[derive(Parser, Debug)]
pub struct SessionTemplateArgs {
    #[arg(short, long)]
    pub session: String,

    #[arg(short, long)]
    pub template: PathBuf,
}

#[derive(Parser, Debug)]
pub struct StartArgs {
    #[arg(short, long)]
    pub session: String,

    #[arg(short, long)]
    pub template: PathBuf,

    /// Id used to name the session's merger container.
    #[arg(short, long)]
    pub merger_id: String,
}

#[derive(Parser, Debug)]
pub struct BuildArgs {
    #[arg(short, long)]
    pub session: String,

    /// Build request (template, cyan, merger_id).
    #[arg(short, long)]
    pub request: PathBuf,
}

#[derive(Parser, Debug)]
pub struct MergeFilesArgs {
    /// Target directory.
    #[arg(long)]
    pub to: PathBuf,

    /// Source directories, applied in order.
    #[arg(required = true)]
    pub from: Vec<PathBuf>,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Setup => {
            Services::connect()?.lifecycle.ensure_network().await?;
            info!("Network ready");
            Ok(())
        }
        Commands::WarmTemplate(args) => Services::connect()?.warm_template(args).await,
        Commands::Warm(args) => Services::connect()?.warm_session(args).await,
        Commands::Start(args) => Services::connect()?.start_session(args).await,
        Commands::Build(args) => Services::connect()?.build(args).await,
        Commands::Clean(args) => Services::connect()?.clean(args).await,
        Commands::MergeFiles(args) => run_merge_files_command(args).await,
    }
}

/// Runtime, registry and worker clients wired from configuration.
struct Services {
    lifecycle: ResourceLifecycleManager,
    workers: Arc<dyn WorkerApi>,
    resolver: VersionResolver,
    pool: BoundedTaskPool,
}

impl Services {
    fn connect() -> anyhow::Result<Self> {
        let config = CoordinatorConfig::from_env()?;
        Self::from_config(&config)
    }

    fn from_config(config: &CoordinatorConfig) -> anyhow::Result<Self> {
        let pool = BoundedTaskPool::new(config.parallelism);
        let runtime = Arc::new(DockerClient::new().context("Failed to connect to Docker")?);
        let lifecycle = ResourceLifecycleManager::new(runtime, pool.clone())
            .with_coordinator_label(config.coordinator_image_label.clone());
        let workers: Arc<dyn WorkerApi> = Arc::new(HttpWorkerClient::from_config(config)?);
        let resolver = VersionResolver::new(Arc::new(RegistryClient::from_config(config)?));

        Ok(Self {
            lifecycle,
            workers,
            resolver,
            pool,
        })
    }

    async fn warm_template(&self, args: TemplateArgs) -> anyhow::Result<()> {
        let template = load_template(&args.template)?;
        self.lifecycle.ensure_network().await?;

        let warmer = TemplateWarmer::new(self.lifecycle.clone(), self.workers.clone());
        report(warmer.warm(&template).await)?;
        info!(template = %template.id(), "Template ready");
        Ok(())
    }

    async fn warm_session(&self, args: SessionTemplateArgs) -> anyhow::Result<()> {
        let template = load_template(&args.template)?;
        self.lifecycle.ensure_network().await?;

        let (volume, outcome) = self.sessions().warm(&args.session, &template).await;
        println!("{}", serde_json::to_string_pretty(&volume)?);
        report(outcome)
    }

    async fn start_session(&self, args: StartArgs) -> anyhow::Result<()> {
        let template = load_template(&args.template)?;
        self.lifecycle.ensure_network().await?;

        let plan = StartPlan::for_template(args.session, template, args.merger_id);
        report(self.sessions().start(&plan).await)?;
        info!(session = %plan.session, "Session started");
        Ok(())
    }

    async fn build(&self, args: BuildArgs) -> anyhow::Result<()> {
        let request: BuildRequest = load_document(&args.request)
            .with_context(|| format!("Failed to load build request {}", args.request.display()))?;

        let merger = PipelineMerger::new(self.resolver.clone(), self.workers.clone(), self.pool.clone());
        let output = report(merger.merge(&args.session, &request).await)?;
        println!("{}", serde_json::json!({ "outputDir": output }));
        Ok(())
    }

    async fn clean(&self, args: SessionArgs) -> anyhow::Result<()> {
        report(self.sessions().clean(&args.session).await)?;
        info!(session = %args.session, "Session cleaned");
        Ok(())
    }

    fn sessions(&self) -> SessionOrchestrator {
        SessionOrchestrator::new(self.lifecycle.clone(), self.workers.clone())
    }
}

async fn run_merge_files_command(args: MergeFilesArgs) -> anyhow::Result<()> {
    let MergeFilesArgs { to, from } = args;
    tokio::task::spawn_blocking(move || merge_files(&from, &to)).await??;
    info!("Directories merged");
    Ok(())
}

fn load_template(path: &Path) -> anyhow::Result<TemplateVersion> {
    TemplateVersion::from_file(path)
        .with_context(|| format!("Failed to load template manifest {}", path.display()))
}

/// Logs each aggregated error before handing the failure to anyhow.
fn report<T>(result: Result<T, BatchFailure>) -> anyhow::Result<T> {
    result.map_err(|failure| {
        for e in &failure.errors {
            error!(error = %e, "Operation failed");
        }
        anyhow::Error::new(failure)
    })
}
