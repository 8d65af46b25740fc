use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use bumpscan::comparison::Category;
use bumpscan::{
    analyze_xray, compare_bias, compare_files, read_enable_mask, run_xtalk, save_png,
    write_toy_histograms, BiasScanParams, ChipKey, ErrorPolicy, GridSource, HistogramFile, MapNames,
    RenderOptions, RunConfig, SCurveMaps, ToyParams, XrayParams, PIXEL_ALIVE,
};

#[derive(Parser)]
#[command(name = "bumpscan", version, about = "Bump-bond defect analyses for pixel detector modules")]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Directory for rolling log files
    #[arg(long, global = true, default_value = "logs")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify disconnected bump bonds from three injection-pattern runs
    Xtalk {
        /// Run configuration (.yaml, .yml, .json or .toml)
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides `on_error` from the configuration
        #[arg(long, value_enum)]
        on_error: Option<ErrorPolicy>,
    },
    /// Compare forward- and reverse-bias S-curve runs
    Bias {
        #[arg(long)]
        forward: PathBuf,
        #[arg(long)]
        reverse: PathBuf,
        #[command(flatten)]
        chip: ChipArgs,
        #[arg(long, default_value_t = bumpscan::bias_scan::DEFAULT_MAX_DISTANCE)]
        max_distance: f64,
        #[arg(short, long)]
        output: PathBuf,
        /// Render the missing map to this PNG
        #[arg(long)]
        plot: Option<PathBuf>,
    },
    /// Find missing bumps in an X-ray occupancy run
    Xray {
        #[arg(long)]
        occupancy: PathBuf,
        /// Chip configuration text file holding the enable mask
        #[arg(long)]
        mask: PathBuf,
        #[command(flatten)]
        chip: ChipArgs,
        #[arg(long, default_value_t = 1.0)]
        missing_hits: f64,
        #[arg(long, default_value_t = 1000.0)]
        low_occupancy_hits: f64,
        #[arg(long, default_value_t = 1e7)]
        triggers: f64,
        #[arg(long, default_value_t = 10.0)]
        bursts: f64,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        plot: Option<PathBuf>,
    },
    /// Split the X-ray, cross-talk and bias-scan maps into overlap categories
    Compare {
        #[arg(long)]
        xray: PathBuf,
        #[arg(long)]
        xtalk: PathBuf,
        #[arg(long)]
        frbias: PathBuf,
        #[arg(long, default_value = bumpscan::xray::MISSING_MAP_HISTOGRAM)]
        xray_name: String,
        #[arg(long, default_value = bumpscan::classifier::CONFIRMED_HISTOGRAM)]
        xtalk_name: String,
        #[arg(long, default_value = bumpscan::bias_scan::MISSING_MAP_HISTOGRAM)]
        frbias_name: String,
        #[arg(short, long)]
        output: PathBuf,
        /// Directory for one PNG per category
        #[arg(long)]
        plot_dir: Option<PathBuf>,
    },
    /// Write synthetic hist1/hist2/hist3 maps
    Toy {
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 432)]
        x_bins: usize,
        #[arg(long, default_value_t = 336)]
        y_bins: usize,
        #[arg(long, default_value_t = 150.0)]
        radius: f64,
    },
}

#[derive(Args)]
struct ChipArgs {
    #[arg(long)]
    chip: u32,
    #[arg(long, default_value_t = 0)]
    board: u32,
    #[arg(long, default_value_t = 0)]
    optical_group: u32,
    #[arg(long, default_value_t = 0)]
    hybrid: u32,
}

impl ChipArgs {
    fn key(&self) -> ChipKey {
        ChipKey::with_location(self.board, self.optical_group, self.hybrid, self.chip)
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    common::log_setup::setup_logging(&cli.log_level, &cli.log_dir)?;

    match cli.command {
        Command::Xtalk { config, on_error } => xtalk(&config, on_error),
        Command::Bias {
            forward,
            reverse,
            chip,
            max_distance,
            output,
            plot,
        } => {
            let key = chip.key();
            let forward = SCurveMaps::load(&open(&forward)?, &key)?;
            let reverse = SCurveMaps::load(&open(&reverse)?, &key)?;
            let params = BiasScanParams { max_distance };
            let result = compare_bias(&forward, &reverse, &params)?;

            let mut file = HistogramFile::create(&output)?;
            result.write_to(&mut file, &params);
            file.save()?;
            if let Some(plot) = plot {
                save_png(&result.missing_map, &plot, &RenderOptions::default())?;
            }
            tracing::info!(path = %output.display(), missing = result.missing_count(), "Bias scan written");
            Ok(ExitCode::SUCCESS)
        }
        Command::Xray {
            occupancy,
            mask,
            chip,
            missing_hits,
            low_occupancy_hits,
            triggers,
            bursts,
            output,
            plot,
        } => {
            let key = chip.key();
            let occupancy = open(&occupancy)?.fetch_histogram(&key.object_path(PIXEL_ALIVE))?;
            let mask = read_enable_mask(&mask, occupancy.rows(), occupancy.cols())?;
            let params = XrayParams {
                missing_hits,
                low_occupancy_hits,
                triggers,
                bursts,
            };
            let result = analyze_xray(&occupancy, &mask, &params)?;

            let mut file = HistogramFile::create(&output)?;
            result.write_to(&mut file);
            file.save()?;
            if let Some(plot) = plot {
                save_png(&result.missing_map(), &plot, &RenderOptions::default())?;
            }
            tracing::info!(path = %output.display(), "X-ray analysis written");
            Ok(ExitCode::SUCCESS)
        }
        Command::Compare {
            xray,
            xtalk,
            frbias,
            xray_name,
            xtalk_name,
            frbias_name,
            output,
            plot_dir,
        } => {
            let names = MapNames {
                xray: xray_name,
                xtalk: xtalk_name,
                frbias: frbias_name,
            };
            let result = compare_files(&open(&xray)?, &open(&xtalk)?, &open(&frbias)?, &names)?;

            let mut file = HistogramFile::create(&output)?;
            result.write_to(&mut file);
            file.save()?;
            if let Some(dir) = plot_dir {
                for (category, hist) in &result.maps {
                    let path = dir.join(format!("histogram_{}.png", hist.name));
                    save_png(hist, &path, &RenderOptions::binary(Category::color(*category)))?;
                }
            }
            tracing::info!(path = %output.display(), "Comparison written");
            Ok(ExitCode::SUCCESS)
        }
        Command::Toy {
            output,
            x_bins,
            y_bins,
            radius,
        } => {
            let mut file = HistogramFile::create(&output)?;
            write_toy_histograms(
                &mut file,
                &ToyParams {
                    x_bins,
                    y_bins,
                    radius,
                },
            );
            file.save()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn open(path: &Path) -> anyhow::Result<HistogramFile> {
    HistogramFile::open(path).with_context(|| format!("Failed to load input {}", path.display()))
}

fn xtalk(config_path: &Path, on_error: Option<ErrorPolicy>) -> anyhow::Result<ExitCode> {
    let mut config = RunConfig::load(config_path)
        .with_context(|| format!("Failed to load run configuration {}", config_path.display()))?;
    if let Some(policy) = on_error {
        config.on_error = policy;
    }
    tracing::info!(
        module = %config.module,
        chips = ?config.chips,
        output_dir = %config.output_dir.display(),
        "Starting cross-talk run"
    );

    let summary = run_xtalk(&config)?;
    for failure in &summary.failed {
        eprintln!("chip {}: {}", failure.chip, failure.error);
    }

    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
