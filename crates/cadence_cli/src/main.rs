//! Cadence CLI
//!
//! Simulate animators frame by frame and inspect easing curves.

use anyhow::Result;
use cadence_animation::{Easing, RepeatMode};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod simulate;

use simulate::{sample_curve, FrameRecord, Simulation};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Frame-synchronized animation timing simulator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an animator against a simulated frame clock
    Simulate {
        /// Duration in milliseconds
        #[arg(short, long, default_value = "300")]
        duration: i64,

        /// Start delay in milliseconds
        #[arg(long, default_value = "0")]
        delay: i64,

        /// Extra iterations (-1 repeats forever)
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        repeat: i32,

        /// What happens between iterations
        #[arg(short, long, value_enum, default_value = "restart")]
        mode: ModeArg,

        /// Duration scale applied to duration and delay
        #[arg(short, long, default_value = "1.0")]
        scale: f32,

        /// Milliseconds between frames
        #[arg(long, default_value = "16")]
        frame_interval: i64,

        /// Milliseconds between each frame and its commit
        #[arg(long, default_value = "0")]
        commit_lag: i64,

        /// Easing curve
        #[arg(short, long, value_enum, default_value = "accelerate-decelerate")]
        easing: EasingArg,

        /// Start from the end
        #[arg(long)]
        reverse: bool,

        /// Start value
        #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
        from: f32,

        /// End value
        #[arg(long, default_value = "1.0", allow_hyphen_values = true)]
        to: f32,

        /// Print one JSON object per frame
        #[arg(long)]
        json: bool,

        /// Stop after this many frames
        #[arg(long, default_value = "10000")]
        max_frames: u32,
    },

    /// Print samples of an easing curve
    Curve {
        #[arg(value_enum)]
        easing: EasingArg,

        /// Number of intervals to sample
        #[arg(short, long, default_value = "10")]
        samples: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Restart,
    Reverse,
}

impl From<ModeArg> for RepeatMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Restart => RepeatMode::Restart,
            ModeArg::Reverse => RepeatMode::Reverse,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum EasingArg {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    AccelerateDecelerate,
}

impl From<EasingArg> for Easing {
    fn from(easing: EasingArg) -> Self {
        match easing {
            EasingArg::Linear => Easing::Linear,
            EasingArg::EaseIn => Easing::EaseIn,
            EasingArg::EaseOut => Easing::EaseOut,
            EasingArg::EaseInOut => Easing::EaseInOut,
            EasingArg::EaseInCubic => Easing::EaseInCubic,
            EasingArg::EaseOutCubic => Easing::EaseOutCubic,
            EasingArg::EaseInOutCubic => Easing::EaseInOutCubic,
            EasingArg::AccelerateDecelerate => Easing::AccelerateDecelerate,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Simulate {
            duration,
            delay,
            repeat,
            mode,
            scale,
            frame_interval,
            commit_lag,
            easing,
            reverse,
            from,
            to,
            json,
            max_frames,
        } => {
            let simulation = Simulation {
                duration_ms: duration,
                start_delay_ms: delay,
                repeat_count: repeat,
                repeat_mode: mode.into(),
                duration_scale: scale,
                frame_interval_ms: frame_interval,
                commit_lag_ms: commit_lag,
                easing: easing.into(),
                reverse,
                from,
                to,
                max_frames,
            };
            cmd_simulate(&simulation, json)
        }

        Commands::Curve { easing, samples } => cmd_curve(easing.into(), samples),
    }
}

fn cmd_simulate(simulation: &Simulation, json: bool) -> Result<()> {
    let records = simulation.run()?;
    if json {
        for record in &records {
            println!("{}", serde_json::to_string(record)?);
        }
    } else {
        print_table(&records);
    }
    Ok(())
}

fn print_table(records: &[FrameRecord]) {
    println!(
        "{:>6} {:>8} {:>9} {:>10} {:>5}  {:<8} events",
        "frame", "time", "fraction", "value", "iter", "state"
    );
    for record in records {
        println!(
            "{:>6} {:>8} {:>9.4} {:>10.4} {:>5}  {:<8} {}",
            record.frame,
            record.time_ms,
            record.fraction,
            record.value,
            record.iteration,
            record.lifecycle,
            record.events.join(",")
        );
    }
}

fn cmd_curve(easing: Easing, samples: u32) -> Result<()> {
    println!("{:?}", easing);
    for (t, eased) in sample_curve(easing, samples) {
        let bar = "#".repeat((eased.clamp(0.0, 1.0) * 40.0).round() as usize);
        println!("{:>5.2} {:>8.4} {}", t, eased, bar);
    }
    Ok(())
}
