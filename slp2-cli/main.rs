use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{error, info};
use slp2_cli::{init_thread_pool, load_config, load_image, vis, CliError, CliResult, Slp2};
use slp2_pyramid::Slp2Config;

const USAGE: &str = "usage: slp2 <image> [config.toml|config.json] [output.png]";

struct Args {
    image: PathBuf,
    config: Option<PathBuf>,
    output: PathBuf,
}

fn is_config(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("toml") | Some("json"))
}

fn parse_args() -> CliResult<Args> {
    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let image = args.next().ok_or_else(|| CliError::Usage(USAGE.to_string()))?;
    let mut config = None;
    let mut output = None;
    for arg in args {
        if config.is_none() && output.is_none() && is_config(&arg) {
            config = Some(arg);
        } else if output.is_none() {
            output = Some(arg);
        } else {
            return Err(CliError::Usage(USAGE.to_string()));
        }
    }
    let output = output.unwrap_or_else(|| {
        let stem = image.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        image.with_file_name(format!("{}_keypoints.png", stem))
    });
    Ok(Args { image, config, output })
}

fn run() -> CliResult<()> {
    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => Slp2Config::new(),
    };
    info!("{}", config.summary());
    init_thread_pool(config.n_threads)?;

    let img = load_image(&args.image)?;
    let slp2 = Slp2::new(config)?;

    // Time the full pipeline
    let t0 = Instant::now();
    let output = slp2.run(&img)?;
    let elapsed = t0.elapsed();

    println!("Time taken: {:.2?}", elapsed);
    println!("Levels: {:?}", output.features.level_indices());
    println!("Histogram layers: {}", output.histogram.len());
    println!("Detected {} keypoints", output.keypoints.len());

    vis::draw_keypoints(&img, &output.keypoints).save(&args.output)?;
    println!("Saved result image as {}", args.output.display());
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        error!("{}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
