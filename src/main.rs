//! Optical Link CLI
//!
//! Command-line interface for simulating and testing the optical link
//! receiver against a scripted sender.

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use optical_link::{
    analysis::{SelfTest, SelfTestConfig},
    capture::{Camera, ScriptedCamera},
    config::LinkConfig,
    metrics::{MetricsRegistry, MetricsSnapshot},
    receiver::{CancellationToken, NullSink, Receiver, ReceiverEvent, StopReason},
    sampling::SamplingMode,
    sender::{encode_frame, SenderSchedule},
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send messages through a simulated screen and camera and decode them
    Simulate {
        /// Message to send; repeat for several transmissions
        #[arg(short, long, required = true)]
        message: Vec<String>,
        /// Pixel noise amplitude added by the simulated camera
        #[arg(long, default_value_t = 0)]
        noise: u8,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Sample this many luminance bands per tick instead of one color
        #[arg(long)]
        lines: Option<usize>,
        /// Print Prometheus metrics after the session
        #[arg(long)]
        metrics: bool,
        /// Serve the session's metrics on this port until Ctrl-C
        #[cfg(feature = "metrics")]
        #[arg(long)]
        serve_metrics: Option<u16>,
    },
    /// Measure bit error rate on a known pattern and adapt the capture rate
    SelfTest {
        #[arg(short, long, default_value_t = 5)]
        rounds: usize,
        #[arg(long, default_value_t = 64)]
        pattern_bits: usize,
        #[arg(short, long, default_value_t = 0.0)]
        flip_probability: f64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let handle = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handle.cancel()) {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }

    if let Err(e) = run(cli, &cancel) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli, cancel: &CancellationToken) -> Result<(), Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => LinkConfig::from_file(path)?,
        None => LinkConfig::default(),
    };

    match cli.command {
        Commands::Simulate {
            message,
            noise,
            seed,
            lines,
            metrics,
            #[cfg(feature = "metrics")]
            serve_metrics,
        } => {
            if let Some(bits) = lines {
                config.sampling.mode = SamplingMode::Lines;
                config.sampling.bits_per_tick = bits;
            }
            let snapshot = simulate(&config, &message, noise, seed, cancel)?;
            if metrics {
                let registry = MetricsRegistry::new()?;
                registry.update(&snapshot);
                print!("{}", registry.encode()?);
            }
            #[cfg(feature = "metrics")]
            if let Some(port) = serve_metrics {
                serve(port, &snapshot, cancel)?;
            }
            Ok(())
        }
        Commands::SelfTest {
            rounds,
            pattern_bits,
            flip_probability,
            seed,
        } => self_test(
            config,
            SelfTestConfig {
                rounds,
                pattern_bits,
                flip_probability,
                seed,
                ..Default::default()
            },
            cancel,
        ),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn simulate(
    config: &LinkConfig,
    messages: &[String],
    noise: u8,
    seed: u64,
    cancel: &CancellationToken,
) -> Result<MetricsSnapshot, Box<dyn Error>> {
    info!("Optical Link v{}", optical_link::VERSION);

    let transmissions = messages
        .iter()
        .map(|text| encode_frame(text, &config.protocol))
        .collect::<Result<Vec<_>, _>>()?;
    let schedule = SenderSchedule::for_transmissions(
        &transmissions,
        &config.channel,
        &config.sender,
        config.sampling.bits_per_tick(),
    );
    info!(
        messages = messages.len(),
        duration_s = schedule.total_duration().as_secs_f64(),
        mode = ?config.sampling.mode,
        "Simulating sender"
    );

    let screen = ScriptedCamera::centered_screen(&config.capture, 0.6);
    let mut camera = ScriptedCamera::new(schedule, screen).with_noise(noise, seed);
    camera.open(&config.capture)?;

    let mut receiver = Receiver::new(config)?;
    let summary = receiver.run(&mut camera, cancel, &mut NullSink, |event| match event {
        ReceiverEvent::Decoded(message) => {
            println!("[{}] {}", message.received_at.format("%H:%M:%S%.3f"), message.text)
        }
        ReceiverEvent::Discarded { reason, .. } => println!("discarded: {}", reason),
        _ => {}
    })?;

    let stats = &summary.stats;
    println!(
        "{} of {} message(s) decoded, {} discarded, {} bits sampled over {} frames",
        stats.messages_decoded,
        messages.len(),
        stats.frames_discarded(),
        stats.bits_sampled,
        stats.frames_seen
    );
    if summary.stop == StopReason::Cancelled {
        println!("Session cancelled");
    }
    Ok(MetricsSnapshot::from_receiver(&receiver))
}

#[cfg(feature = "metrics")]
fn serve(port: u16, snapshot: &MetricsSnapshot, cancel: &CancellationToken) -> Result<(), Box<dyn Error>> {
    use optical_link::metrics::{MetricsServer, MetricsServerConfig};

    let server = MetricsServer::new(MetricsServerConfig::with_port(port), MetricsRegistry::new()?);
    let state = server.state();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async { state.write().await.update(snapshot) });
    runtime.spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!("Metrics server failed: {}", e);
        }
    });

    info!(port, "Serving metrics until Ctrl-C");
    while !cancel.is_cancelled() {
        std::thread::sleep(std::time::Duration::from_millis(200));
    }
    Ok(())
}

fn self_test(
    config: LinkConfig,
    options: SelfTestConfig,
    cancel: &CancellationToken,
) -> Result<(), Box<dyn Error>> {
    let mut test = SelfTest::new(config, options)?;
    info!(pattern_bits = test.pattern().len(), "Starting self-test");

    let rounds = test.run(cancel)?;
    println!("round  interval  received  ber     window  next");
    for round in &rounds {
        println!(
            "{:>5}  {:>8.2}  {:>8}  {:.4}  {:.4}  {:.2} ({:?})",
            round.round,
            round.interval,
            round.received_bits,
            round.ber,
            round.window_ber,
            round.next_interval,
            round.adjustment
        );
    }
    Ok(())
}
