use std::{path::PathBuf, sync::{Arc, Mutex}};

use anyhow::Context;
use clap::Parser;
use similar_cli::{http::HttpServer, utility::{build_finder, clean_path}};
use similar_core::app_config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "similar-http")]
#[command(version)]
#[command(about = "serves POST /findSimilarAssets over HTTP", long_about = None)]
struct Args {
    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,
    /// Port to listen on
    #[arg(short, long, default_value_t = 8000)]
    port: u16,
    /// Directory containing the ONNX Runtime library, otherwise the system search path is used
    #[arg(long)]
    onnx_lib_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default()
        .default_filter_or(if args.verbose { "debug" } else { "info" }))
        .init();

    let config = AppConfig::load().context("Could not load configuration")?;
    let onnx_lib_dir = args.onnx_lib_dir.map(clean_path).transpose()?;
    let finder = build_finder(&config, onnx_lib_dir.as_deref())?;

    HttpServer::new(Arc::new(Mutex::new(finder)), config.default_top_k)
        .serve(&format!("{}:{}", args.bind, args.port))
}
