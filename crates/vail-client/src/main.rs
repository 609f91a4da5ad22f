//! Vail client entry point.
//!
//! Loads the configuration, brings up the hardware, joins the relay channel
//! and runs the four session tasks until the relay connection ends.
//!
//! # Startup order
//!
//! ```text
//! main()
//!  └─ ToneDriver::new()            -- startup-fatal on failure
//!  └─ KeyerMode::select()          -- paddles sampled once, before interrupts
//!  └─ enable_interrupts()          -- iambic mode only
//!  └─ network::connect()           -- TCP + upgrade handshake
//!  └─ startup chirp
//!  └─ LocalSet
//!       ├─ keyer    (spawn_local)
//!       ├─ status   (spawn_local)
//!       ├─ sender   (spawn_local)
//!       └─ receiver (runs until the relay stream fails or closes)
//! ```
//!
//! # Why a current-thread runtime? (for beginners)
//!
//! The tasks share `Rc<Session>` and `Rc<VirtualPins>`, which are not `Send`.
//! A `LocalSet` on a current-thread runtime runs `!Send` futures, and since
//! only one task runs at a time no locks are needed between them.  The only
//! other thread is the paddle line driver, which talks to the keyer through
//! the lock-free interrupt ring.

use std::path::PathBuf;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio::task::LocalSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vail_client::application::hardware::Hardware;
use vail_client::application::keyer::{Keyer, KeyerMode};
use vail_client::application::outbox;
use vail_client::application::receive::Receiver;
use vail_client::application::send::run_sender;
use vail_client::application::session::{LocalClock, Session};
use vail_client::application::status::run_status;
use vail_client::infrastructure::hardware::{spawn_line_driver, ToneDriver, VirtualPins};
use vail_client::infrastructure::network::{self, RelayEndpoint};
use vail_client::infrastructure::storage::config::{load_config, to_toml, AppConfig};
use vail_core::{Contact, EpochAnchor};

/// Paddle to treat as held at power-on.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum HeldPaddle {
    Dit,
    Dah,
}

impl From<HeldPaddle> for Contact {
    fn from(p: HeldPaddle) -> Self {
        match p {
            HeldPaddle::Dit => Contact::Dit,
            HeldPaddle::Dah => Contact::Dah,
        }
    }
}

/// Command-line arguments.
///
/// Relay and keyer flags override the matching configuration file values.
#[derive(Debug, Parser)]
#[command(
    name = "vail-client",
    about = "Iambic and straight-key Morse client for Vail relays",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "vail-client.toml", env = "VAIL_CONFIG")]
    config: PathBuf,

    /// Relay host name.
    #[arg(long, env = "VAIL_HOST")]
    host: Option<String>,

    /// Relay TCP port.
    #[arg(long, env = "VAIL_PORT")]
    port: Option<u16>,

    /// Channel to join.
    #[arg(long, env = "VAIL_CHANNEL")]
    channel: Option<String>,

    /// Keying speed in words per minute.
    #[arg(long)]
    wpm: Option<u16>,

    /// Start with this paddle held, selecting straight-key mode on it.
    #[arg(long, value_enum)]
    hold: Option<HeldPaddle>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn apply_overrides(&self, cfg: &mut AppConfig) {
        if let Some(host) = &self.host {
            cfg.relay.host = host.clone();
        }
        if let Some(port) = self.port {
            cfg.relay.port = port;
        }
        if let Some(channel) = &self.channel {
            cfg.relay.channel = channel.clone();
        }
        if let Some(wpm) = self.wpm {
            cfg.keyer.wpm = wpm;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = load_config(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    cli.apply_overrides(&mut cfg);

    if cli.print_config {
        print!("{}", to_toml(&cfg)?);
        return Ok(());
    }

    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level)),
        )
        .init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    LocalSet::new().block_on(&runtime, run(cfg, cli.hold))
}

async fn run(cfg: AppConfig, hold: Option<HeldPaddle>) -> anyhow::Result<()> {
    info!("Vail client starting");

    // ── Hardware ──────────────────────────────────────────────────────────────
    let tone = ToneDriver::new(cfg.audio.tx_tone_hz, cfg.audio.rx_tone_hz)
        .context("initialising tone driver")?;
    let (pins, pin_handle) = VirtualPins::new(cfg.keyer.polarity(), tone);
    let hw = Rc::new(pins);

    let clock = LocalClock::start();
    let epoch_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before 1970")?
        .as_millis() as u64;
    let anchor = EpochAnchor::new(epoch_ms, clock.now_ms());

    // ── Boot-time mode selection ──────────────────────────────────────────────
    if let Some(held) = hold {
        pin_handle.press(held.into(), true);
    }
    let mode = KeyerMode::select(hw.read_paddles());
    if let Some(held) = hold {
        pin_handle.press(held.into(), false);
    }
    match mode {
        KeyerMode::Straight(contact) => info!(?contact, "boot: paddle held, straight key"),
        KeyerMode::Iambic => {
            info!(mode = ?cfg.keyer.iambic_mode, "boot: iambic keyer");
            hw.enable_interrupts();
        }
    }
    spawn_line_driver(pin_handle, std::io::BufReader::new(std::io::stdin()));

    // ── Relay session ─────────────────────────────────────────────────────────
    let endpoint = RelayEndpoint::from_config(&cfg.relay);
    let stream = network::connect(&endpoint)
        .await
        .with_context(|| format!("joining relay {}", endpoint.socket_addr()))?;
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = tokio::io::BufReader::new(reader);

    hw.tone().startup_chirp().await;

    // ── Tasks ─────────────────────────────────────────────────────────────────
    let session = Rc::new(Session::new());
    let (outbox, queue) = outbox::channel(Rc::clone(&session));

    let keyer = Keyer::new(
        Rc::clone(&hw),
        outbox,
        clock,
        anchor,
        cfg.keyer.timing(),
        cfg.keyer.iambic_mode,
    );
    let keyer_task = tokio::task::spawn_local(keyer.run(mode));
    let status_task = tokio::task::spawn_local(run_status(Rc::clone(&hw), Rc::clone(&session)));
    let mut sender_task =
        tokio::task::spawn_local(async move { run_sender(queue, &mut writer).await });

    let mut receiver = Receiver::new(
        Rc::clone(&hw),
        Rc::clone(&session),
        clock,
        cfg.receiver.jitter_buffer_ms,
    );

    info!(channel = %cfg.relay.channel, "Vail client ready");

    tokio::select! {
        reason = receiver.run(&mut reader) => {
            error!(%reason, "receive pipeline stopped; ending session");
        }
        result = &mut sender_task => match result {
            Ok(Ok(())) => warn!("send task finished"),
            Ok(Err(e)) => error!(error = %e, "send task failed; ending session"),
            Err(e) => error!(error = %e, "send task panicked"),
        },
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    // ── Shutdown ──────────────────────────────────────────────────────────────
    keyer_task.abort();
    status_task.abort();
    sender_task.abort();
    hw.tx_tone(false);
    hw.rx_tone(false);
    hw.set_indicator(false);

    info!("Vail client stopped");
    Ok(())
}
