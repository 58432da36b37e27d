//! Plexus CLI - Main entry point

mod builtin;
mod commands;
mod host;
mod watch;

use anyhow::Context;
use clap::{Parser, Subcommand};
use host::{DeploymentUnit, HostContainer, LocalHost};
use plexus_core::{
    ArtifactResolver, DependencySorter, EndpointPublisher, InMemoryEndpointHost, LoadReport,
    LocalRepositoryResolver, ManifestParser, PluginRuntime, RuntimeConfig,
};
use plexus_foundation::HostConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use watch::ManifestWatcher;

/// Plexus - plugin runtime with dependency ordering and hot reload
#[derive(Parser, Debug)]
#[command(name = "plexus")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the deployment order of a manifest
    Order {
        /// Plugin manifest (XML)
        manifest: PathBuf,
    },
    /// Print parsed plugin descriptors as JSON
    Inspect {
        /// Plugin manifest (XML)
        manifest: PathBuf,
    },
    /// Show structural parents, children and the impact set of a plugin
    Impact {
        /// Plugin manifest (XML)
        manifest: PathBuf,
        /// Plugin identity (groupId:artifactId)
        key: String,
    },
    /// Load the manifest and run the host until Ctrl-C or /shutdown
    Run {
        /// Plugin manifest (XML)
        manifest: PathBuf,

        /// First port to try
        #[arg(short, long)]
        port: Option<u16>,

        /// Local artifact repository
        #[arg(long)]
        repository: Option<PathBuf>,

        /// Rebuild structural children of changed plugins on reload
        #[arg(long)]
        cascade: bool,

        /// Reload when the manifest changes
        #[arg(short, long)]
        watch: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match args.command {
        Command::Order { manifest } => print(commands::order(&manifest)),
        Command::Inspect { manifest } => print(commands::inspect(&manifest)),
        Command::Impact { manifest, key } => print(commands::impact(&manifest, &key)),
        Command::Run {
            manifest,
            port,
            repository,
            cascade,
            watch,
        } => {
            let mut config = HostConfig::load().unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config: {}", e);
                HostConfig::default()
            });
            if let Some(port) = port {
                config = config.with_port(port);
            }
            if let Some(repository) = repository {
                config = config.with_repository(expand_home(&repository));
            }
            if cascade {
                config = config.with_cascade_reload(true);
            }
            run(&manifest, config, watch).await
        }
    }
}

fn print(output: anyhow::Result<String>) -> anyhow::Result<()> {
    println!("{}", output?.trim_end());
    Ok(())
}

/// `~/` 로 시작하는 경로를 홈 디렉토리 기준으로 확장
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

async fn run(manifest: &Path, config: HostConfig, watch: bool) -> anyhow::Result<()> {
    let descriptors = ManifestParser::parse_file(manifest)
        .with_context(|| format!("Failed to parse manifest {}", manifest.display()))?;
    let ordered = DependencySorter::sort(&descriptors);

    let resolver: Arc<dyn ArtifactResolver> =
        Arc::new(LocalRepositoryResolver::new(config.repository()));

    let mut host = LocalHost::new();
    host.deploy(DeploymentUnit::from_descriptors(
        &ordered,
        resolver.as_ref(),
        config.temp_directory(),
    )?)?;
    let port = host.bind(config.port())?;
    if let Some(unit) = host.unit() {
        for line in &unit.plugins_list {
            tracing::debug!("Plugin classpath: {}", line);
        }
    }

    let runtime = Arc::new(PluginRuntime::new(
        Arc::clone(&resolver),
        Arc::new(builtin::loader()),
        RuntimeConfig::from(&config),
    ));
    let endpoints = Arc::new(InMemoryEndpointHost::new());
    let publisher = Arc::new(EndpointPublisher::new(endpoints.clone(), config.cache_capacity()));
    runtime.register_cache(publisher.definitions());
    runtime.add_listener(publisher.clone());

    let report = runtime.load(&ordered)?;
    log_report(&report);

    host.start().await?;
    info!(
        "Plexus running on port {} ({} plugins, {} endpoints) since {}",
        port,
        runtime.active_keys().len(),
        endpoints.active().len(),
        chrono::Local::now().format("%H:%M:%S")
    );

    // 개발용 플러그인이 선언되어 있으면 자동으로 감시
    let watch = watch || ordered.iter().any(|d| d.is_development_plugin());
    let mut watcher = if watch {
        info!("Watching {} for changes", manifest.display());
        Some(ManifestWatcher::start(manifest, config.reload_debounce())?)
    } else {
        None
    };
    let mut shutdown = host.shutdown_trigger().subscribe();
    let deployer = Deployer {
        resolver,
        temp_directory: config.temp_directory(),
    };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Received Ctrl-C");
                break;
            }
            _ = shutdown.changed() => {
                info!("Shutdown requested");
                break;
            }
            change = next_change(&mut watcher) => match change {
                Some(()) => deployer.reload(&runtime, &mut host, manifest).await,
                None => {
                    warn!("Manifest watch stopped, hot reload disabled");
                    watcher = None;
                }
            },
        }
    }

    runtime.shutdown();
    host.stop().await?;
    Ok(())
}

/// 감시하지 않으면 영원히 대기
async fn next_change(watcher: &mut Option<ManifestWatcher>) -> Option<()> {
    match watcher {
        Some(watcher) => watcher.changed().await,
        None => std::future::pending().await,
    }
}

/// 리로드 때 런타임과 호스트의 배포 단위를 함께 갱신
struct Deployer {
    resolver: Arc<dyn ArtifactResolver>,
    temp_directory: PathBuf,
}

impl Deployer {
    async fn reload(&self, runtime: &Arc<PluginRuntime>, host: &mut LocalHost, manifest: &Path) {
        let descriptors = match ManifestParser::parse_file(manifest) {
            Ok(descriptors) => descriptors,
            Err(e) => {
                warn!("Keeping current plugins, manifest is invalid: {}", e);
                return;
            }
        };

        let runtime = Arc::clone(runtime);
        let resolver = Arc::clone(&self.resolver);
        let temp_directory = self.temp_directory.clone();
        let task = tokio::task::spawn_blocking(move || -> plexus_core::Result<_> {
            let ordered = DependencySorter::sort(&descriptors);
            let unit =
                DeploymentUnit::from_descriptors(&ordered, resolver.as_ref(), temp_directory)?;
            let report = runtime.reload(&descriptors)?;
            Ok((unit, report))
        });

        match task.await {
            Ok(Ok((unit, report))) => {
                log_report(&report);
                if let Err(e) = host.redeploy(unit) {
                    error!("Failed to redeploy host: {}", e);
                }
            }
            Ok(Err(e)) => error!("Reload failed: {}", e),
            Err(e) => error!("Reload task panicked: {}", e),
        }
    }
}

fn log_report(report: &LoadReport) {
    info!(
        "Generation {}: {} loaded, {} reused, {} torn down",
        report.generation,
        report.loaded.len(),
        report.reused.len(),
        report.torn_down.len()
    );
    for failure in &report.failures {
        warn!("Skipped {}: {}", failure.coordinates, failure.message);
    }
    for failure in &report.listener_failures {
        warn!(
            "Listener {} failed on {} at {}: {}",
            failure.listener,
            failure.event,
            failure.at.format("%H:%M:%S"),
            failure.message
        );
    }
    for (from, to) in &report.cycles {
        warn!("Dependency cycle accepted: {} -> {}", from, to);
    }
}
