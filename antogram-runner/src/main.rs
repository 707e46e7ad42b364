mod error;
mod loader;
mod stats;

use antogram_config::{ConfigLoader, Config, TargetingKind};
use antogram_core::{scheduler::TickScheduler, PreparedField, SimulationMode};
use antogram_field::{ContentDescriptor, FieldError, LocalFieldSource};
use antogram_simulation::Simulation;
use antogram_transport::TransportController;
use clap::{Parser, ValueEnum};
use crossbeam_channel::{Receiver, TryRecvError};
use env_logger::Env;
use error::RunnerError;
use loader::{spawn_loader, FieldRequest};
use log::{error, info, warn};
use stats::TickStats;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

const DEFAULT_CONFIG: &str = "config.json";
const DEFAULT_MESSAGE: &str = "ANTOGRAM";

#[derive(Parser, Debug)]
#[command(author, version, about = "Ant swarm that assembles text and images from colored bits", long_about = None)]
struct Args {
    /// Path to the simulation configuration file (JSON or TOML)
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Message for the ants to write
    #[arg(short, long, conflicts_with_all = ["image", "id"])]
    text: Option<String>,

    /// Image path or data URL for the ants to assemble
    #[arg(short, long, conflicts_with = "id")]
    image: Option<String>,

    /// Shareable content id, as printed by --print-id
    #[arg(long)]
    id: Option<String>,

    /// Assemble the content or take it apart
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Number of agents
    #[arg(short, long)]
    agents: Option<usize>,

    /// Fixed RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Print the content id and exit
    #[arg(long)]
    print_id: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ModeArg {
    Forward,
    Reverse,
}

impl From<ModeArg> for SimulationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Forward => SimulationMode::Forward,
            ModeArg::Reverse => SimulationMode::Reverse,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StrategyArg {
    JobQueue,
    TargetPool,
}

impl From<StrategyArg> for TargetingKind {
    fn from(strategy: StrategyArg) -> Self {
        match strategy {
            StrategyArg::JobQueue => TargetingKind::JobQueue,
            StrategyArg::TargetPool => TargetingKind::TargetPool,
        }
    }
}

impl Args {
    fn descriptor(&self) -> Result<ContentDescriptor, FieldError> {
        if let Some(id) = &self.id {
            ContentDescriptor::decode_id(id)
        } else if let Some(image) = &self.image {
            ContentDescriptor::image(image.as_str())
        } else {
            ContentDescriptor::text(self.text.as_deref().unwrap_or(DEFAULT_MESSAGE))
        }
    }

    fn apply_overrides(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }
        if let Some(strategy) = self.strategy {
            config.targeting.strategy = strategy.into();
        }
        if let Some(agents) = self.agents {
            config.agents.count = agents;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{}", e);
        process::exit(1);
    }
}

fn load(args: &Args) -> Result<Config, RunnerError> {
    let mut config = if args.config.exists() {
        info!("Using configuration from {}", args.config.display());
        ConfigLoader::from_file(&args.config)?
    } else if args.config.as_os_str() == DEFAULT_CONFIG {
        warn!("{} not found, using built-in defaults", DEFAULT_CONFIG);
        Config::default()
    } else {
        // Reports the missing file as a read error
        ConfigLoader::from_file(&args.config)?
    };
    args.apply_overrides(&mut config);
    ConfigLoader::validate(&config)?;
    Ok(config)
}

fn run(args: &Args) -> Result<(), RunnerError> {
    let descriptor = args.descriptor()?;
    if args.print_id {
        println!("{}", descriptor.encode_id());
        return Ok(());
    }

    let config = load(args)?;
    let canvas = config.canvas();
    let mut simulation = Simulation::new(&config);
    let mut transport = TransportController::from_config(&config.transport, canvas)?;

    let loader = spawn_loader(
        FieldRequest {
            descriptor,
            settings: config.field.clone(),
            canvas,
            mode: config.mode,
            seed: config.seed,
        },
        LocalFieldSource::new(),
    );

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || handler_stop.store(true, Ordering::SeqCst))?;

    let mut run = Run {
        loader: Some(loader),
        stats: TickStats::new(),
        completed_at: None,
        max_ticks: args.ticks,
        linger_ticks: config.linger_ticks,
    };
    let mut failure = None;

    info!(
        "Running {:?} simulation at {} ticks/s on a {}x{} canvas",
        config.mode,
        config.effective_framerate(),
        canvas.width,
        canvas.height
    );
    let mut scheduler = TickScheduler::new(config.effective_framerate());
    scheduler.run_while(|tick| {
        if stop.load(Ordering::SeqCst) {
            info!("Interrupted at tick {}", tick);
            return false;
        }
        match run.step(tick, &mut simulation, &mut transport) {
            Ok(keep_going) => keep_going,
            Err(e) => {
                failure = Some(e);
                false
            }
        }
    });

    let snapshot = simulation.snapshot();
    transport.finish(&snapshot)?;
    run.stats.log_summary();
    info!(
        "Stopped after {} ticks at {:.1}% progress, {} frames sent",
        scheduler.ticks(),
        simulation.progress() * 100.0,
        transport.frames_sent()
    );

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Per-run loop state.
struct Run {
    loader: Option<Receiver<Result<PreparedField, FieldError>>>,
    stats: TickStats,
    completed_at: Option<u64>,
    max_ticks: Option<u64>,
    linger_ticks: u64,
}

impl Run {
    /// One tick of the loop. Returns whether to keep running.
    fn step(
        &mut self,
        tick: u64,
        simulation: &mut Simulation,
        transport: &mut TransportController,
    ) -> Result<bool, RunnerError> {
        let start = Instant::now();
        self.poll_loader(simulation)?;
        simulation.tick()?;
        transport.publish(&simulation.snapshot())?;
        self.stats.record(start.elapsed());

        if self.max_ticks.map_or(false, |max| tick + 1 >= max) {
            info!("Reached tick limit");
            return Ok(false);
        }
        if self.loader.is_none() && simulation.is_complete() {
            let completed_at = *self.completed_at.get_or_insert_with(|| {
                info!("All bits delivered at tick {}", tick);
                tick
            });
            if tick - completed_at >= self.linger_ticks {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn poll_loader(&mut self, simulation: &mut Simulation) -> Result<(), RunnerError> {
        let Some(rx) = self.loader.as_ref() else {
            return Ok(());
        };
        match rx.try_recv() {
            Ok(result) => {
                self.loader = None;
                let field = result?;
                info!("Field ready: {} bits", field.bits.len());
                simulation.load_field(field)?;
                Ok(())
            }
            Err(TryRecvError::Empty) => Ok(()),
            Err(TryRecvError::Disconnected) => {
                self.loader = None;
                Err(RunnerError::LoaderDisconnected)
            }
        }
    }
}
