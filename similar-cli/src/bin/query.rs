use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use similar_cli::utility::{MatchesResponse, WireMatch, build_finder, clean_path};
use similar_core::app_config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "similar-query")]
#[command(version)]
#[command(about = "finds the images in a directory that look most like a query image", long_about = None)]
struct Args {
    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,
    /// Image to compare against
    image: PathBuf,
    /// Directory searched recursively for candidate images
    assets_dir: PathBuf,
    /// The number of matches to return, defaults to default_top_k from the config file (3)
    #[arg(short = 'n', long)]
    top_k: Option<usize>,
    /// Print matches as JSON
    #[arg(long)]
    json: bool,
    /// Directory containing the ONNX Runtime library, otherwise the system search path is used
    #[arg(long)]
    onnx_lib_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default()
        .default_filter_or(if args.verbose { "debug" } else { "warn" }))
        .init();

    let config = AppConfig::load().context("Could not load configuration")?;
    let image = clean_path(args.image)?;
    let assets_dir = clean_path(args.assets_dir)?;
    let onnx_lib_dir = args.onnx_lib_dir.map(clean_path).transpose()?;
    let top_k = args.top_k.unwrap_or(config.default_top_k);

    let mut finder = build_finder(&config, onnx_lib_dir.as_deref())?;
    if !args.json {
        println!("Finding {} closest matches to {} in {}", top_k, image, assets_dir);
    }

    // Inference is CPU bound, keep it off the async workers
    let matches = tokio::task::spawn_blocking(move || finder.find_similar_assets(&image, &assets_dir, top_k))
        .await??;
    let response = MatchesResponse { matches: matches.into_iter().map(WireMatch::from).collect() };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else if response.matches.is_empty() {
        println!("No results!");
    } else {
        println!("Results ({}):", response.matches.len());
        for (i, m) in response.matches.iter().enumerate() {
            println!("{}: {}, {:.4}", i + 1, m.path, m.similarity);
        }
    }

    Ok(())
}
