//! Marker Model Generator CLI
//!
//! Usage:
//!   marker-model-generator --ids <IDS> [OPTIONS]
//!
//! IDs are a single number (`2`), an inclusive range (`0-5`) or a list
//! (`0,1,2,3`). Lengths on the command line are in centimeters.

use std::io;
use std::path::PathBuf;

use clap::Parser;

use marker_model_generator::{
    generate, BatchOptions, GenerateError, GeneratorConfig, Geometry, MarkerSpec, MarkerType,
    OutputLayout, Settings,
};

#[derive(Parser)]
#[command(name = "marker-model-generator")]
#[command(about = "Create fiducial marker models for robot simulators")]
struct Cli {
    /// Marker IDs: a number (2), a range (0-5) or a list (0,1,2,3)
    #[arg(short, long)]
    ids: String,

    /// Marker family to generate
    #[arg(long, value_enum, default_value_t = MarkerType::Aruco)]
    marker_type: MarkerType,

    /// ArUco dictionary number (OpenCV numbering). The built-in renderer draws
    /// dictionary 16; others need a command renderer in the settings file
    #[arg(short, long)]
    dictionary: Option<u32>,

    /// Geometry the marker texture is applied to
    #[arg(short, long, value_enum, default_value_t = Geometry::Box)]
    geometry: Geometry,

    /// Marker edge length in cm
    #[arg(short, long, default_value_t = 9.0)]
    size: f64,

    /// Box thickness in cm
    #[arg(short, long, default_value_t = 0.1)]
    thickness: f64,

    /// White border around the marker in cm
    #[arg(short = 'b', long, default_value_t = 0.0)]
    white_border_size: f64,

    /// Directory the models are written to
    #[arg(short, long, default_value = "./")]
    output_dir: PathBuf,

    /// Write marker directories straight into the output directory
    #[arg(long)]
    no_root_dir: bool,

    /// Also collect every texture in one tag images directory
    #[arg(long)]
    copy_tag_images: bool,

    #[arg(long, default_value_t = 1.0)]
    model_version: f64,

    #[arg(long, default_value_t = 1.5)]
    sdf_version: f64,

    /// Author written into each model config
    #[arg(short, long, default_value = "User")]
    author: String,

    /// Print a line per marker instead of a progress bar
    #[arg(short, long)]
    verbose: bool,

    /// Settings file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory with model.config, model.sdf and marker.material templates
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short, long)]
    jobs: Option<usize>,
}

/// Centimeters from the command line to meters in model files
fn cm_to_m(value: f64) -> f64 {
    value / 100.0
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    // Load settings
    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            match &cli.config {
                Some(path) => eprintln!("Error loading settings '{}': {}", path.display(), e),
                None => eprintln!("Error loading settings: {}", e),
            }
            std::process::exit(1);
        }
    };

    let mut spec = MarkerSpec::new()
        .with_marker_type(cli.marker_type)
        .with_geometry(cli.geometry)
        .with_size(cm_to_m(cli.size))
        .with_thickness(cm_to_m(cli.thickness))
        .with_border_size(cm_to_m(cli.white_border_size))
        .with_versions(cli.model_version, cli.sdf_version)
        .with_author(cli.author);
    if let Some(dictionary) = cli.dictionary {
        spec = spec.with_dictionary(dictionary);
    }
    let layout = OutputLayout::new(cli.output_dir)
        .with_root_dir(!cli.no_root_dir)
        .with_tag_images(cli.copy_tag_images);

    let mut config = GeneratorConfig::new()
        .with_spec(spec)
        .with_layout(layout)
        .with_batch(BatchOptions::new().with_verbose(cli.verbose))
        .with_settings(settings);
    if let Some(jobs) = cli.jobs {
        config.batch = config.batch.with_workers(jobs);
    }
    if cli.templates.is_some() {
        config.templates_dir = cli.templates;
    }

    let mut stdout = io::stdout();
    let result = generate(&cli.ids, &config, &mut stdout).and_then(|report| report.into_result());
    match result {
        Ok(artifacts) => {
            log::info!("{} marker models written", artifacts.len());
        }
        Err(GenerateError::Format(e)) => {
            eprint!("{}", e.format("--ids"));
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
