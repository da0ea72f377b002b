//! tbshower CLI
//!
//! Runs the cluster and layer analysis over event files and prepares
//! batch jobs for the cluster pool.
#![allow(clippy::uninlined_format_args, clippy::too_many_lines)]

use clap::{Args, Parser, Subcommand, ValueEnum};

use std::path::{Path, PathBuf};
use std::time::Instant;
use tbshower_algorithms::{analyze_run, EventInput, RunAnalysis};
use tbshower_core::{AnalysisConfig, ShowerType, ZeroWeightSentinel};
use tbshower_io::{DataFileWriter, DataType, EventFileReader, JobMode, Pipeline};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    TbshowerIo(#[from] tbshower_io::Error),

    #[error("Analysis error: {0}")]
    Core(#[from] tbshower_core::Error),

    #[error("--ids is required for datatype data")]
    MissingIds,
}

/// Shower type selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Shower {
    /// Electromagnetic showers, 28 layers
    Em,
    /// Hadronic showers, 40 layers
    Had,
}

/// Zero-weight policy of the uncut estimator.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Sentinel {
    /// Report the origin
    Origin,
    /// Report -99 for both coordinates
    Marker,
}

/// Kind of input processed by batch jobs.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum DataKind {
    /// Test-beam data
    Data,
    /// Simulation with the beam's proton component
    #[value(name = "sim_proton")]
    SimProton,
    /// Simulation without the proton component
    #[value(name = "sim_noproton")]
    SimNoproton,
}

impl From<DataKind> for DataType {
    fn from(kind: DataKind) -> Self {
        match kind {
            DataKind::Data => DataType::Data,
            DataKind::SimProton => DataType::SimProton,
            DataKind::SimNoproton => DataType::SimNoProton,
        }
    }
}

/// Options shared by the analysis subcommands.
#[derive(Debug, Args)]
struct AnalysisArgs {
    /// Input event file (JSON lines)
    input: PathBuf,

    /// Shower type of the run
    #[arg(short, long, value_enum, default_value = "em")]
    shower_type: Shower,

    /// Logarithmic weighting offset (W0)
    #[arg(long)]
    w0: Option<f64>,

    /// Radius around the highest-energy hit entering the centroid
    #[arg(long)]
    distance_cut: Option<f64>,

    /// Override the number of layers of the shower type
    #[arg(long)]
    max_layers: Option<usize>,

    /// Zero-weight policy of the uncut estimator
    #[arg(long, value_enum, default_value = "origin")]
    sentinel: Sentinel,

    /// Skip invalid events instead of failing
    #[arg(long)]
    skip_invalid: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl AnalysisArgs {
    fn config(&self) -> Result<AnalysisConfig> {
        let shower = match self.shower_type {
            Shower::Em => ShowerType::Em,
            Shower::Had => ShowerType::Had,
        };
        let mut config = AnalysisConfig::for_shower(shower).with_zero_weight_sentinel(
            match self.sentinel {
                Sentinel::Origin => ZeroWeightSentinel::Origin,
                Sentinel::Marker => ZeroWeightSentinel::Marker,
            },
        );
        if let Some(w0) = self.w0 {
            config = config.with_log_weight_floor(w0);
        }
        if let Some(cut) = self.distance_cut {
            config = config.with_distance_cut(cut);
        }
        if let Some(max_layers) = self.max_layers {
            config = config.with_max_layers(max_layers);
        }
        config.validate()?;
        Ok(config)
    }

    fn read_events(&self, shower_type: ShowerType) -> Result<Vec<EventInput>> {
        let reader = EventFileReader::open(&self.input)?.with_shower_type(shower_type);
        if self.verbose {
            eprintln!(
                "Reading: {} ({} bytes)",
                self.input.display(),
                reader.file_size()
            );
        }
        let events = if self.skip_invalid {
            reader.read_valid()
        } else {
            reader.read_all()?
        };
        Ok(events)
    }

    /// Reads the input and analyzes every event.
    fn run(&self) -> Result<RunAnalysis> {
        let config = self.config()?;
        if self.verbose {
            eprintln!("Shower type: {}", config.shower_type);
            eprintln!("Layers: {}", config.max_layers);
            eprintln!("W0: {}", config.log_weight_floor);
            eprintln!("Distance cut: {}", config.distance_cut);
        }

        let start = Instant::now();
        let events = self.read_events(config.shower_type)?;
        let run = analyze_run(&events, &config)?;

        println!(
            "Analyzed {} events in {:.2}s",
            run.events.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(run)
    }
}

/// Cluster and layer analysis of calorimeter test-beam showers.
#[derive(Parser)]
#[command(name = "tbshower")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the cluster dumps of a run
    Clusters {
        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Also write a JSON run summary
        #[arg(long)]
        json: bool,
    },

    /// Write the per-layer summary of a run
    Layers {
        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write the position residuals against the track impact points
    Resolution {
        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write HTCondor submission files and the DAG linking them
    Condor {
        /// Directory holding selector.sh, analyzer.sh, out/ and log/
        #[arg(long)]
        base: PathBuf,

        /// Directory receiving the submission and DAG files
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Kind of input the jobs process
        #[arg(long, value_enum, default_value = "data")]
        datatype: DataKind,

        /// Ntuple ids of a data run, one selection and one analysis job each
        #[arg(long, num_args = 1.., value_delimiter = ',')]
        ids: Vec<usize>,

        /// Submit only the analysis stage of a simulated sample
        #[arg(long)]
        last_step_only: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Clusters { analysis, .. }
            | Self::Layers { analysis, .. }
            | Self::Resolution { analysis, .. } => analysis.verbose,
            Self::Condor { verbose, .. } => *verbose,
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn write_clusters(run: &RunAnalysis, output_dir: &Path, json: bool) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;

    let outputs = run.accumulator.cluster_outputs();
    let mut writer = DataFileWriter::create(output_dir.join("clusters.txt"))?;
    writer.write_individual_clusters(&outputs)?;

    let total = run.accumulator.total_energy()?;
    let mut writer = DataFileWriter::create(output_dir.join("total_energy.txt"))?;
    writer.write_total_energy(total)?;

    let mut writer = DataFileWriter::create(output_dir.join("clusters.csv"))?;
    writer.write_clusters_csv(run)?;
    writer.flush()?;

    if json {
        let mut writer = DataFileWriter::create(output_dir.join("summary.json"))?;
        writer.write_summary_json(&run.summary())?;
        writer.flush()?;
    }

    println!("Clusters: {}", run.n_clusters());
    println!("Cluster entries: {}", outputs.len());
    println!("Total clustered energy: {}", total);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.command.verbose());

    match cli.command {
        Commands::Clusters {
            analysis,
            output_dir,
            json,
        } => {
            let run = analysis.run()?;
            write_clusters(&run, &output_dir, json)?;
            println!("Output written to: {}", output_dir.display());
        }

        Commands::Layers { analysis, output } => {
            let run = analysis.run()?;
            let mut writer = DataFileWriter::create(&output)?;
            writer.write_layers_csv(&run)?;
            writer.flush()?;

            println!(
                "{:<6} | {:>10} | {:>14} | {:>16}",
                "Layer", "Hits", "Hits fraction", "Energy fraction"
            );
            println!("{:-<56}", "");
            for layer in run.layer_totals() {
                println!(
                    "{:<6} | {:>10} | {:>14.4} | {:>16.4}",
                    layer.layer,
                    layer.n_hits,
                    layer.hits_fraction(),
                    layer.energy_fraction()
                );
            }
            println!("Output written to: {}", output.display());
        }

        Commands::Resolution { analysis, output } => {
            let run = analysis.run()?;
            let mut writer = DataFileWriter::create(&output)?;
            writer.write_resolution_csv(&run)?;
            writer.flush()?;

            for (layer, moments) in run.resolution.iter() {
                if let (Some((mx, my)), Some((sx, sy))) = (moments.mean(), moments.std_dev()) {
                    println!(
                        "Layer {:>2}: {} residuals, mean ({:.4}, {:.4}), sigma ({:.4}, {:.4})",
                        layer, moments.count, mx, my, sx, sy
                    );
                }
            }
            println!("Output written to: {}", output.display());
        }

        Commands::Condor {
            base,
            output_dir,
            datatype,
            ids,
            last_step_only,
            verbose,
        } => {
            let pipeline = Pipeline {
                base,
                datatype: datatype.into(),
                ids,
                last_step_only,
            };
            if !pipeline.datatype.is_simulation() && pipeline.ids.is_empty() {
                return Err(CliError::MissingIds);
            }
            if verbose {
                eprintln!("Datatype: {}", pipeline.datatype);
                eprintln!("Stages: {}", pipeline.stages().len());
                eprintln!("Jobs per stage: {}", pipeline.jobs(JobMode::Analysis).len());
            }
            let dag = pipeline.write(&output_dir)?;
            println!("DAG written to: {}", dag.display());
        }
    }

    Ok(())
}
