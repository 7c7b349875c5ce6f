mod output;
mod script;

use clap::Parser;
use log::info;
use output::SampleWriter;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use script::ScriptFile;
use std::path::PathBuf;
use std::time::Instant;
use stencil_core::{OutputFormat, StencilConfig};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// TOML script describing the fields to generate.
    script: PathBuf,
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    #[clap(short, long)]
    seed: Option<u64>,
    #[clap(short = 'n', long)]
    count: Option<u64>,
    #[clap(short, long)]
    format: Option<OutputFormat>,
    #[clap(short, long)]
    output_dir: Option<PathBuf>,
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match cli.config_file {
        Some(config_path) => {
            info!("Loading configuration from {config_path:?}");
            StencilConfig::load_from_file(&config_path)?
        }
        None => {
            let default_config_path = PathBuf::from("stencil.toml");
            if default_config_path.exists() {
                info!("Loading default configuration from {default_config_path:?}");
                StencilConfig::load_from_file(&default_config_path)?
            } else {
                StencilConfig::default()
            }
        }
    };

    if let Some(seed) = cli.seed {
        config.generator.seed = Some(seed);
    }
    if let Some(count) = cli.count {
        config.generator.count = count;
    }
    if let Some(format) = cli.format {
        config.output.format = format;
    }
    if let Some(dir) = cli.output_dir {
        config.output.directory = Some(dir);
    }
    log::debug!("Effective configuration: {config:#?}");

    let script = ScriptFile::load(&cli.script)?
        .compile()
        .map_err(|e| anyhow::anyhow!("Failed to compile script {:?}: {}", cli.script, e))?;

    let seed = config.generator.resolve_seed();
    info!(
        "Generating {} sample(s) from {:?} with seed {}",
        config.generator.count, cli.script, seed
    );
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let writer = SampleWriter::new(config.output.format, config.output.directory.clone())?;

    let start_time = Instant::now();
    let mut total_bytes = 0usize;
    for index in 0..config.generator.count {
        let root = script
            .materializer(&mut rng)
            .with_max_depth(config.generator.max_depth)
            .materialize_root()
            .map_err(|e| anyhow::anyhow!("Sample {index} failed: {e}"))?;
        total_bytes += root.len();
        writer.write(index, &root, script.mapper())?;
    }

    info!(
        "Generated {} sample(s), {} bytes in {:.2?}",
        config.generator.count,
        total_bytes,
        start_time.elapsed()
    );
    Ok(())
}
