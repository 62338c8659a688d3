use std::{path::PathBuf, sync::{Arc, Mutex}};

use anyhow::Context;
use clap::Parser;
use similar_cli::{mcp::McpServer, utility::{build_finder, clean_path}};
use similar_core::app_config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "similar-mcp")]
#[command(version)]
#[command(about = "serves find_similar_images to MCP clients over stdio", long_about = None)]
struct Args {
    /// Verbose mode, logs go to stderr
    #[arg(short, long)]
    verbose: bool,
    /// Directory containing the ONNX Runtime library, otherwise the system search path is used
    #[arg(long)]
    onnx_lib_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    // stdout carries protocol messages only
    env_logger::Builder::from_env(env_logger::Env::default()
        .default_filter_or(if args.verbose { "debug" } else { "info" }))
        .target(env_logger::Target::Stderr)
        .init();

    let config = AppConfig::load().context("Could not load configuration")?;
    let onnx_lib_dir = args.onnx_lib_dir.map(clean_path).transpose()?;
    let finder = build_finder(&config, onnx_lib_dir.as_deref())?;

    McpServer::new(Arc::new(Mutex::new(finder)), config.default_top_k)
        .serve_stdio()
        .await
}
