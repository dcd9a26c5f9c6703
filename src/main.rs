//! Inflo - reflection logging core of the Lucen17 dashboard
//!
//! Runs the memory service, logs reflections from the terminal, and edits
//! per-entry routing.

use anyhow::Result;
use clap::{Parser, Subcommand};
use inflo::{
    bus::{self, NotificationBus},
    config::InfloConfig,
    dashboard::{scheduler, Dashboard, Mode, TickIntervals},
    routing::{flow, GateTarget, PacketDraft, Scope, SourceFilter, TracingIndicators},
    storage::{ClientStorage, FileKv},
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "inflo")]
#[command(author = "Lucen17 Team")]
#[command(version)]
#[command(about = "Reflection logging core with packet routing and a memory service")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "INFLO_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the memory service
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long, env = "PORT")]
        port: Option<u16>,

        /// Directory holding memory.json and tolls.json
        #[arg(long, env = "DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Payment provider secret key
        #[arg(long, env = "STRIPE_SECRET_KEY", hide_env_values = true)]
        stripe_secret_key: Option<String>,
    },

    /// Log a reflection
    Log {
        /// Reflection text
        text: String,

        /// Division the reflection belongs to
        #[arg(short, long)]
        division: Option<String>,
    },

    /// Send a packet from a journal entry using its outbound routing
    Send {
        /// Division of the entry
        #[arg(short, long)]
        division: String,

        /// Entry name
        #[arg(short, long)]
        entry: String,

        /// Packet text
        text: String,

        /// Gate tag of the packet
        #[arg(short, long)]
        gate: Option<String>,
    },

    /// Show or change per-entry routing
    Route {
        #[command(subcommand)]
        action: RouteAction,
    },

    /// Print the flow index of the local memory log
    Flow,

    /// Show or set the dashboard mode
    Mode {
        /// New mode (Creation or Guidance)
        mode: Option<Mode>,
    },

    /// Save the memory service URL and check it
    Api {
        /// Base URL of the memory service
        url: String,
    },

    /// Pay a gate toll
    Pay {
        /// Gate key
        #[arg(short, long)]
        gate: Option<String>,

        /// Amount in major units
        #[arg(short, long)]
        amount: Option<f64>,
    },

    /// Run periodic syncing and accept returned packets until Ctrl+C
    Watch {
        /// Exchange bus messages as JSON lines: `lucenReturn` in on stdin,
        /// `lucenRoute`/`lucenUpdate` out on stdout. Meant for piped use.
        #[arg(long)]
        stdio: bool,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[derive(Subcommand)]
enum RouteAction {
    /// Print an entry's routing
    Show {
        division: String,
        entry: String,
    },

    /// Change an entry's routing; omitted fields keep their value
    Set {
        division: String,
        entry: String,

        /// Outbound storage (None, Local, Global, Both)
        #[arg(long)]
        out_mode: Option<Scope>,

        /// Gate notified on send, or None
        #[arg(long)]
        out_target: Option<GateTarget>,

        /// Accepted inbound origin (None, Local, Global, Both)
        #[arg(long)]
        in_mode: Option<Scope>,

        /// Accepted inbound gate, Any, or None
        #[arg(long)]
        in_source: Option<SourceFilter>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("inflo={},tower_http=debug", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = match cli.config {
        Some(path) => InfloConfig::load(&path)?,
        None => InfloConfig::default(),
    };

    match cli.command {
        Commands::Serve {
            host,
            port,
            data_dir,
            stripe_secret_key,
        } => {
            let mut config = config;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(data_dir) = data_dir {
                config.server.data_dir = data_dir;
            }
            if stripe_secret_key.is_some() {
                config.payments.secret_key = stripe_secret_key;
            }
            run_server(config).await?;
        }
        Commands::Log { text, division } => {
            let dashboard = open_dashboard(&config).await?;
            let outcome = dashboard.log_reflection(&text, division.as_deref()).await?;
            println!(
                "Logged {} reflection in {} (flow index {})",
                outcome.packet.tone,
                outcome.bridge.division,
                flow::format_flow_index(outcome.dispatch.flow_index)
            );
            if outcome.dispatch.remote.map_or(false, |r| !r.is_delivered()) {
                println!("Memory service unreachable; kept locally");
            }
        }
        Commands::Send {
            division,
            entry,
            text,
            gate,
        } => {
            let dashboard = open_dashboard(&config).await?;
            let mut draft = PacketDraft::new().text(text);
            if let Some(gate) = gate {
                draft = draft.gate(gate);
            }
            let outcome = dashboard.send_from_entry(&division, &entry, draft).await;
            println!(
                "Sent from {}/{}: local={} remote={} notified={}",
                division,
                entry,
                outcome.stored_local,
                match &outcome.remote {
                    Some(r) if r.is_delivered() => "delivered",
                    Some(_) => "unreachable",
                    None => "-",
                },
                outcome.notified.as_deref().unwrap_or("-")
            );
        }
        Commands::Route { action } => {
            let dashboard = open_dashboard(&config).await?;
            run_route(&dashboard, action).await?;
        }
        Commands::Flow => {
            let dashboard = open_dashboard(&config).await?;
            let value = dashboard.flow_index().await;
            println!("{}", flow::format_flow_index(value));
        }
        Commands::Mode { mode } => {
            let dashboard = open_dashboard(&config).await?;
            if let Some(mode) = mode {
                dashboard.set_mode(mode).await?;
            }
            let dials = dashboard.dials().await;
            println!(
                "{} (rc {:.1}, ge {:.1})",
                dashboard.mode().await,
                dials.rc,
                dials.ge
            );
        }
        Commands::Api { url } => {
            let dashboard = open_dashboard(&config).await?;
            let online = dashboard.save_api_base(&url).await?;
            println!(
                "Memory service {}: {}",
                dashboard.api_base().await,
                if online { "online" } else { "offline" }
            );
        }
        Commands::Pay { gate, amount } => {
            let dashboard = open_dashboard(&config).await?;
            let response = dashboard.pay(gate.as_deref(), amount).await?;
            if response.simulated {
                println!("Simulated payment ok");
            } else if let Some(secret) = response.client_secret {
                println!("Payment intent created: {}", secret);
            }
        }
        Commands::Watch { stdio } => {
            let dashboard = open_dashboard(&config).await?;
            run_watch(Arc::new(dashboard), &config, stdio).await?;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn open_dashboard(config: &InfloConfig) -> Result<Dashboard> {
    let kv = FileKv::open(&config.client.state_file).await?;
    let storage = ClientStorage::new(Arc::new(kv));
    let dashboard = Dashboard::open(
        config,
        storage,
        NotificationBus::default(),
        Arc::new(TracingIndicators),
    )
    .await?;
    Ok(dashboard)
}

async fn run_server(config: InfloConfig) -> Result<()> {
    config.validate()?;
    tracing::info!("Starting Inflo memory service");

    let shutdown = CancellationToken::new();
    let server = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { inflo::api::serve(&config, shutdown).await })
    };

    tracing::info!("Memory service is running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");
    shutdown.cancel();
    server.await??;

    Ok(())
}

async fn run_route(dashboard: &Dashboard, action: RouteAction) -> Result<()> {
    match action {
        RouteAction::Show { division, entry } => {
            let cfg = dashboard.route_config(&division, &entry).await;
            println!("{}/{}", division, entry);
            println!("  out: {} -> {}", cfg.out_mode, cfg.out_target);
            println!("  in:  {} <- {}", cfg.in_mode, cfg.in_source);
        }
        RouteAction::Set {
            division,
            entry,
            out_mode,
            out_target,
            in_mode,
            in_source,
        } => {
            let mut cfg = dashboard.route_config(&division, &entry).await;
            if let Some(out_mode) = out_mode {
                cfg.out_mode = out_mode;
            }
            if let Some(out_target) = out_target {
                cfg.out_target = out_target;
            }
            if let Some(in_mode) = in_mode {
                cfg.in_mode = in_mode;
            }
            if let Some(in_source) = in_source {
                cfg.in_source = in_source;
            }
            dashboard.set_route_config(&division, &entry, &cfg).await?;
            println!("Saved routing for {}/{}", division, entry);
        }
    }
    Ok(())
}

async fn run_watch(dashboard: Arc<Dashboard>, config: &InfloConfig, stdio: bool) -> Result<()> {
    let shutdown = CancellationToken::new();
    let ticks = scheduler::spawn(
        dashboard.clone(),
        TickIntervals::from(&config.schedule),
        shutdown.clone(),
    );
    let returns = dashboard.clone().spawn_return_listener(shutdown.clone());

    let outgoing = stdio.then(|| {
        let subscription = dashboard.bus().subscribe_all();
        tokio::spawn(bus::forward_lines(
            subscription,
            tokio::io::stdout(),
            shutdown.clone(),
        ))
    });
    if stdio {
        let inbound = dashboard.bus().clone();
        tokio::spawn(async move {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            match inbound.publish_lines(stdin).await {
                Ok(n) => tracing::info!(messages = n, "Stdin closed"),
                Err(e) => tracing::warn!("Stopped reading stdin: {}", e),
            }
        });
    }

    tracing::info!(api_base = %dashboard.api_base().await, "Watching. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");
    shutdown.cancel();
    ticks.await?;
    returns.await?;
    if let Some(outgoing) = outgoing {
        outgoing.await??;
    }

    Ok(())
}

fn show_config(config: Option<&InfloConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
