//! synthgen command line
//!
//! - `synthgen render --scene scene.json` renders a dataset
//! - `synthgen sample --scene scene.json --constraint volume` prints positions
//!   drawn from a constraint, to check its limits before a long run

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use synthgen_algorithms::{ConstraintGeometry, Distribution};
use synthgen_io::load_scene;
use synthgen_render::{render_dataset, ProgressReporter, ProgressUpdate};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Domain-randomized synthetic image datasets
#[derive(Parser)]
#[command(name = "synthgen")]
#[command(about = "Render labeled synthetic image datasets from a scene file", long_about = None)]
#[command(version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a dataset
    Render {
        /// Scene file
        #[arg(long)]
        scene: PathBuf,

        /// Number of frames, overriding the scene file
        #[arg(long)]
        count: Option<usize>,

        /// Random seed, overriding the scene file
        #[arg(long)]
        seed: Option<u64>,

        /// Output root directory, overriding the scene file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Hide the progress bar
        #[arg(long)]
        quiet: bool,
    },

    /// Print positions sampled from a constraint object
    Sample {
        /// Scene file
        #[arg(long)]
        scene: PathBuf,

        /// Name of the constraint object
        #[arg(long)]
        constraint: String,

        #[arg(long, default_value_t = 10)]
        count: usize,

        #[arg(long, value_enum, default_value_t = DistributionArg::Uniform)]
        distribution: DistributionArg,

        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DistributionArg {
    Uniform,
    Normal,
}

impl From<DistributionArg> for Distribution {
    fn from(arg: DistributionArg) -> Self {
        match arg {
            DistributionArg::Uniform => Distribution::Uniform,
            DistributionArg::Normal => Distribution::Normal,
        }
    }
}

/// Progress bar on stderr
#[derive(Default)]
struct BarProgress {
    bar: Option<ProgressBar>,
}

impl ProgressReporter for BarProgress {
    fn on_start(&mut self, total: usize) {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.green/blue}] {pos}/{len} frames ({percent}%) eta {eta} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        self.bar = Some(bar);
    }

    fn on_frame(&mut self, update: &ProgressUpdate) {
        if let Some(bar) = &self.bar {
            bar.set_position(update.completed as u64);
            bar.set_message(format!("{:.0?}/frame", update.frame_time));
        }
    }

    fn on_finish(&mut self, completed: usize) {
        if let Some(bar) = self.bar.take() {
            bar.finish_with_message(format!("{} frames", completed));
        }
    }
}

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn render(
    scene: PathBuf,
    count: Option<usize>,
    seed: Option<u64>,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let mut loaded = load_scene(&scene).with_context(|| format!("failed to load {}", scene.display()))?;
    if let Some(count) = count {
        loaded.run.render_count = count;
    }
    if seed.is_some() {
        loaded.run.seed = seed;
    }
    if let Some(output) = output {
        loaded.run.output.root = output;
    }

    let mut rng = rng_from(loaded.run.seed);
    let progress: Box<dyn ProgressReporter> = if quiet {
        Box::new(synthgen_render::LogProgress)
    } else {
        Box::new(BarProgress::default())
    };
    let summary = render_dataset(&mut loaded, progress, &mut rng)?;
    info!(
        frames = summary.frames,
        labels = summary.labels,
        dir = %loaded.run.output.root.join(&loaded.run.output.file_name).display(),
        "Dataset written"
    );
    Ok(())
}

fn sample(
    scene: PathBuf,
    constraint: String,
    count: usize,
    distribution: DistributionArg,
    seed: Option<u64>,
) -> Result<()> {
    let loaded = load_scene(&scene).with_context(|| format!("failed to load {}", scene.display()))?;
    if loaded.scene.object_index(&constraint).is_none() {
        bail!("no object named '{}' in {}", constraint, scene.display());
    }

    let mesh = loaded.scene.world_mesh_by_name(&constraint)?;
    let geometry = match loaded.constraint_kinds.get(&constraint) {
        Some(kind) => ConstraintGeometry::new(mesh, *kind)?,
        None => ConstraintGeometry::inferred(mesh)?,
    };
    let reference = geometry.region().center();
    let mut rng = rng_from(seed);
    let points = geometry.sample(distribution.into(), &reference, count, &loaded.run.sampling, &mut rng)?;

    info!(constraint = %constraint, kind = ?geometry.kind(), accepted = points.len(), requested = count, "Sampled");
    for p in &points {
        println!("{:.4} {:.4} {:.4}", p.x, p.y, p.z);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match cli.command {
        Commands::Render { scene, count, seed, output, quiet } => render(scene, count, seed, output, quiet),
        Commands::Sample { scene, constraint, count, distribution, seed } => {
            sample(scene, constraint, count, distribution, seed)
        }
    }
}
