use anyhow::Result;
use clap::Parser;
use tracing::info;

use debleed_core::{frame, Config, DebleedProcessor};

mod source;

use source::SyntheticDuplexSource;

/// Real-time separation of voice from loudspeaker bleed.
///
/// Runs a synthetic full-duplex session (simulated echo path plus a voice
/// tone) through the separation engine and reports quality metrics.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Named preset: balanced, aggressive, gentle, or a config file name
    #[arg(short, long, default_value = "balanced")]
    preset: String,

    /// Cancellation mode: adaptive, spectral, cross-correlation, hybrid
    #[arg(short, long)]
    mode: Option<String>,

    /// Number of frames to process
    #[arg(long, default_value_t = 500)]
    frames: usize,

    /// Frame size in samples
    #[arg(long)]
    frame_size: Option<usize>,

    /// Sample rate in Hz
    #[arg(long)]
    samplerate: Option<u32>,

    /// NLMS step size mu
    #[arg(long)]
    step_size: Option<f32>,

    /// Spectral subtraction strength alpha
    #[arg(long)]
    spectral_strength: Option<f32>,

    /// Noise gate threshold (linear amplitude)
    #[arg(long)]
    gate_threshold: Option<f32>,

    /// Delay search bound in samples
    #[arg(long)]
    max_lag: Option<usize>,

    /// Simulated echo path delay in samples
    #[arg(long, default_value_t = 96)]
    echo_delay: usize,

    /// Simulated echo path gain
    #[arg(long, default_value_t = 0.4)]
    echo_gain: f32,

    /// Print the final metrics snapshot as JSON on stdout
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("debleed={},debleed_core={}", level, level))
        .init();

    let mut config = Config::load(&args.preset)?
        .with_overrides(args.samplerate, args.frame_size);
    if let Some(mode) = &args.mode {
        config.params.mode = mode.parse()?;
    }
    if let Some(mu) = args.step_size {
        config.params.step_size = mu;
    }
    if let Some(alpha) = args.spectral_strength {
        config.params.spectral_strength = alpha;
    }
    if let Some(threshold) = args.gate_threshold {
        config.params.gate_threshold = threshold;
    }
    if let Some(max_lag) = args.max_lag {
        config.params.max_lag = max_lag;
    }

    info!("debleed demo session starting");
    info!(
        "  preset {}, mode {} ({})",
        args.preset,
        config.params.mode,
        config.params.mode.description()
    );
    info!(
        "  {}Hz, {} frames of {} samples, echo path: {} samples at gain {}",
        config.session.sample_rate,
        args.frames,
        config.session.frame_size,
        args.echo_delay,
        args.echo_gain
    );

    let frame_size = config.session.frame_size;
    let mut processor = DebleedProcessor::new(config.clone())?;
    let mut frame_source = SyntheticDuplexSource::new(
        config.session.sample_rate,
        args.echo_delay,
        args.echo_gain,
        args.frames,
    );

    let mut mic = vec![0.0f32; frame_size];
    let mut reference = vec![0.0f32; frame_size];
    let mut output = vec![0.0f32; frame_size];

    let mut frame_index = 0u64;
    while frame_source.next_frame(&mut mic, &mut reference) {
        processor.process_frame(&mic, &reference, &mut output)?;
        frame_index += 1;

        if frame_index % 100 == 0 {
            let metrics = processor.metrics();
            info!(
                "frame {:>5}: echo reduction {:5.1}%, SNR improvement {:+5.1} dB, \
                 latency {:.3} ms, load {:4.1}%, level {:.1} -> {:.1} dB",
                frame_index,
                metrics.echo_reduction_pct,
                metrics.snr_improvement_db,
                metrics.processing_latency_ms,
                metrics.cpu_load_pct,
                level_db(frame::rms(&mic)),
                level_db(frame::rms(&output))
            );
        }
    }

    info!(
        "final frame peak: mic {:.3}, output {:.3}",
        frame::peak(&mic),
        frame::peak(&output)
    );

    let metrics = processor.metrics();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        info!("session complete: {} frames", metrics.frames_processed);
        info!("  echo reduction:  {:.1}%", metrics.echo_reduction_pct);
        info!("  SNR improvement: {:+.1} dB", metrics.snr_improvement_db);
        info!("  frame latency:   {:.3} ms", metrics.processing_latency_ms);
        info!("  estimated load:  {:.1}%", metrics.cpu_load_pct);
        if let Some(delay) = metrics.delay_estimate {
            info!(
                "  delay estimate:  {} samples (score {:.2})",
                delay.lag, delay.score
            );
        }
        if metrics.overload_count > 0 {
            info!(
                "  overloaded frames: {} (processing exceeded the frame period)",
                metrics.overload_count
            );
        }
    }

    Ok(())
}

fn level_db(linear: f32) -> f32 {
    20.0 * linear.max(1e-10).log10()
}
