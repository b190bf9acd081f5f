mod logs;

use std::{path::PathBuf, sync::Arc};

use {
    clap::Parser,
    portico_channels::{ChannelRegistry, EventBus, HostEvent, MessageChain, ParsedEvent},
    portico_config::{LoggingConfig, PorticoConfig},
    portico_console::{
        CONSOLE_ACCOUNT_ID, ConsoleAccountConfig, ConsolePlugin, LineFrontend, LogSink,
    },
    tokio::sync::broadcast::error::RecvError,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::logs::LogSinkLayer;

const GREETING: &str = "Hello, portico!";

#[derive(Parser)]
#[command(name = "portico", about = "Portico: interactive console for the host")]
struct Cli {
    /// Log level (trace, debug, info, warn, error). Overrides the config file.
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Custom config directory (overrides default ~/.config/portico/).
    #[arg(long, env = "PORTICO_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Do not answer operator messages.
    #[arg(long, default_value_t = false)]
    no_echo: bool,
}

/// Initialise tracing. With `capture` set, events go to the console
/// scrollback instead of stderr.
fn init_telemetry(cli: &Cli, logging: &LoggingConfig, capture: Option<LogSink>) {
    let level = cli.log_level.as_deref().unwrap_or(&logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    let stderr = capture.is_none();
    let capture_layer = capture.map(LogSinkLayer::new);

    if cli.json_logs || logging.json {
        registry
            .with(stderr.then(|| {
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr)
            }))
            .with(capture_layer)
            .init();
    } else {
        registry
            .with(stderr.then(|| {
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr)
            }))
            .with(capture_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Apply directory overrides before loading config
    if let Some(ref dir) = cli.config_dir {
        portico_config::set_config_dir(dir.clone());
    }
    let (config, load_error) = match portico_config::discover_and_load() {
        Ok(config) => (config, None),
        Err(e) => (PorticoConfig::default(), Some(e)),
    };

    let log_sink = LogSink::default();
    init_telemetry(
        &cli,
        &config.logging,
        config.logging.capture.then(|| log_sink.clone()),
    );
    if let Some(e) = load_error {
        warn!(error = %e, "failed to load config, using defaults");
    }

    info!(version = env!("CARGO_PKG_VERSION"), "portico starting");

    let account_config = config.console_account(CONSOLE_ACCOUNT_ID)?;
    let console_config: ConsoleAccountConfig = serde_json::from_value(account_config.clone())?;

    let bus = EventBus::default();
    let mut events = bus.subscribe();

    let plugin = ConsolePlugin::new(Arc::new(LineFrontend::new(&console_config)))?
        .with_event_sink(Arc::new(bus.clone()))
        .with_log_sink(log_sink);
    let outbound = plugin.shared_outbound();

    let mut registry = ChannelRegistry::new();
    registry.register(Box::new(plugin))?;
    if let Some(console) = registry.get_mut("console") {
        console
            .start_account(CONSOLE_ACCOUNT_ID, account_config)
            .await?;
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            },
            event = events.recv() => match event {
                Ok(ParsedEvent { event: HostEvent::MessageReceived { message }, .. }) => {
                    if cli.no_echo {
                        continue;
                    }
                    if let Err(e) = outbound
                        .send_message(
                            CONSOLE_ACCOUNT_ID,
                            &message.scene,
                            &MessageChain::from(GREETING),
                            Some(&message.to_selector()),
                        )
                        .await
                    {
                        warn!(error = %e, "failed to answer console message");
                    }
                },
                Ok(ParsedEvent { event: HostEvent::AccountUnavailable { account }, .. }) => {
                    info!(%account, "console closed");
                    break;
                },
                Ok(_) => {},
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "host event receiver lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    registry.stop_all(CONSOLE_ACCOUNT_ID).await;
    info!("portico stopped");
    Ok(())
}
