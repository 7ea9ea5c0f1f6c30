//! CLI entry point for the AstroPi control panel.
//!
//! # Usage
//!
//! Shoot ten 30-second lights:
//! ```bash
//! astropi --server pi.local capture lights --shutter 30 --count 10
//! ```
//!
//! Query or stop whatever the server is doing:
//! ```bash
//! astropi status
//! astropi stop
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;

use astropi_control::camera_settings::{CameraSettings, WELL_KNOWN};
use astropi_control::config::PanelConfig;
use astropi_control::connection::resolve_address;
use astropi_control::exposure::BULB;
use astropi_control::notifications::{ConsoleSink, NotificationSink};
use astropi_control::poller::{PollOutcome, StatusPoller};
use astropi_control::system::SystemActions;
use astropi_control::tracing_setup;
use astropi_control::transport::{CaptureTransport, ClientConfig, PanelApi, PanelClient};
use astropi_control::{CaptureForm, CaptureSessionController, FrameType, SessionState};

#[derive(Parser)]
#[command(name = "astropi")]
#[command(about = "Control panel for a remote AstroPi capture server", long_about = None)]
struct Cli {
    /// Capture server URL (overrides ASTROPI_URL and the config file)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Diagnostic log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Diagnostic log format (pretty, compact, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a capture sequence to completion (Ctrl-C stops it)
    Capture {
        /// Frame type
        #[arg(value_enum)]
        frame_type: FrameArg,

        /// Shutter-speed token, e.g. 30, 2.5, 1/100 or bulb
        #[arg(long)]
        shutter: Option<String>,

        /// Exposure in seconds when the shutter is bulb
        #[arg(long)]
        bulb: Option<String>,

        /// Number of frames
        #[arg(long)]
        count: String,
    },

    /// Show the server's capture status
    Status,

    /// Stop the running capture
    Stop,

    /// Read or change camera settings
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Host system actions
    #[command(subcommand)]
    System(SystemCommand),
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show one setting and its accepted values
    Get { name: String },
    /// Change a setting
    Set { name: String, value: String },
    /// Show shutter speed, ISO and aperture
    List,
}

#[derive(Subcommand)]
enum SystemCommand {
    /// List supported actions
    List,
    /// Run an action (e.g. shutdown)
    Run { action: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum FrameArg {
    Lights,
    Darks,
    Offsets,
}

impl From<FrameArg> for FrameType {
    fn from(arg: FrameArg) -> Self {
        match arg {
            FrameArg::Lights => FrameType::Lights,
            FrameArg::Darks => FrameType::Darks,
            FrameArg::Offsets => FrameType::Offsets,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = PanelConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(level) = &cli.log_level {
        config.logging.level.clone_from(level);
    }
    if let Some(format) = &cli.log_format {
        config.logging.format.clone_from(format);
    }
    tracing_setup::init_from_config(&config).context("initializing diagnostics")?;

    let address = resolve_address(cli.server.as_deref(), Some(&config.server.url));
    tracing::info!(
        "Using capture server {} ({})",
        address.as_str(),
        address.source().label()
    );
    let client = Arc::new(PanelClient::with_config(
        address,
        ClientConfig::from(&config.server),
    )?);
    let sink = Arc::new(ConsoleSink::new(false));

    match cli.command {
        Commands::Capture {
            frame_type,
            shutter,
            bulb,
            count,
        } => {
            let frame_type = FrameType::from(frame_type);
            let form = CaptureForm {
                frame_type,
                shutter_speed: default_shutter(frame_type, shutter, bulb.is_some())?,
                bulb_duration: bulb.unwrap_or_default(),
                count,
            };
            run_capture(client, sink, &config, form).await
        }
        Commands::Status => show_status(client).await,
        Commands::Stop => stop_capture(client).await,
        Commands::Config(command) => run_config(client, sink, command).await,
        Commands::System(command) => run_system(client, sink, command).await,
    }
}

/// Offsets shoot at the shortest exposure; `--bulb` alone implies bulb.
fn default_shutter(frame_type: FrameType, shutter: Option<String>, has_bulb: bool) -> Result<String> {
    match (shutter, frame_type) {
        (Some(token), _) => Ok(token),
        (None, _) if has_bulb => Ok(BULB.to_string()),
        (None, FrameType::Offsets) => Ok("0".to_string()),
        (None, _) => bail!("--shutter is required for {frame_type}"),
    }
}

async fn run_capture(
    client: Arc<PanelClient>,
    sink: Arc<ConsoleSink>,
    config: &PanelConfig,
    form: CaptureForm,
) -> Result<()> {
    let request = form.into_request()?;
    let transport: Arc<dyn CaptureTransport> = client;
    let mut controller =
        CaptureSessionController::new(transport, Arc::clone(&sink) as Arc<dyn NotificationSink>, Handle::current())
            .with_poll_interval(config.capture.poll_interval);

    let seen = sink.history().len();
    controller.try_start(request)?;

    let mut interrupted = false;
    loop {
        tokio::select! {
            state = controller.next_event() => match state {
                None => break,
                // An interrupt that arrived while starting takes effect now
                Some(SessionState::Capturing) if interrupted => {
                    controller.cancel();
                }
                Some(_) => {}
            },
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                signal.context("listening for Ctrl-C")?;
                interrupted = true;
                if !controller.cancel() {
                    tracing::info!(state = %controller.state(), "Interrupt received, waiting for the server");
                }
            }
        }
    }

    if sink.history().entries_since(seen).iter().any(|e| e.is_error()) {
        bail!("capture did not complete cleanly");
    }
    Ok(())
}

async fn show_status(client: Arc<PanelClient>) -> Result<()> {
    let poller = StatusPoller::new(client);
    match poller.poll_once().await {
        PollOutcome::Status(status) => {
            println!("{}: {}", status.status, status.message);
            Ok(())
        }
        PollOutcome::Lost(e) => Err(e).context("status check failed"),
    }
}

async fn stop_capture(client: Arc<PanelClient>) -> Result<()> {
    let reply = client.stop_capture().await.context("stop request failed")?;
    println!("{}", reply.message);
    Ok(())
}

async fn run_config(client: Arc<PanelClient>, sink: Arc<ConsoleSink>, command: ConfigCommand) -> Result<()> {
    let settings = CameraSettings::new(client as Arc<dyn PanelApi>, sink);
    match command {
        ConfigCommand::Get { name } => {
            let setting = settings.fetch(&name).await?;
            println!("{setting}");
            for choice in &setting.choices {
                let marker = if *choice == setting.current { "*" } else { " " };
                println!(" {marker} {choice}");
            }
        }
        ConfigCommand::Set { name, value } => {
            settings.apply(&name, &value).await?;
        }
        ConfigCommand::List => {
            let loaded = settings.fetch_all().await;
            if loaded.len() < WELL_KNOWN.len() {
                bail!("some camera settings could not be loaded");
            }
        }
    }
    Ok(())
}

async fn run_system(client: Arc<PanelClient>, sink: Arc<ConsoleSink>, command: SystemCommand) -> Result<()> {
    let system = SystemActions::new(client as Arc<dyn PanelApi>, sink);
    match command {
        SystemCommand::List => {
            for action in system.actions().await? {
                println!("{action}");
            }
        }
        SystemCommand::Run { action } => {
            system.run(&action).await?;
        }
    }
    Ok(())
}
