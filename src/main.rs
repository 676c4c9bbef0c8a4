use clap::Parser;
use env_logger::Env;
use geotiff_patch_split::cli::Args;
use geotiff_patch_split::{split_to_patches, Result, RunConfig};
use log::info;

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    info!("=== GeoTIFF Patch Splitter ===");

    let config = RunConfig::from_args(&args)?;
    let summary = split_to_patches(&config)?;

    println!("{}", summary);
    Ok(())
}
