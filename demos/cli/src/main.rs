use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trellis_core::{EngineConfig, GroupBy};
use trellis_engine::{default_group_bys, Dataset, TrellisDiscoverer};

#[derive(Parser, Debug)]
#[command(
    name = "trellis-cli",
    about = "Liệt kê trellis options của một bộ dữ liệu lâm sàng JSON."
)]
struct Args {
    /// Đường dẫn tới file JSON dữ liệu (subjects + events).
    #[arg(short, long)]
    input: PathBuf,

    /// File JSON chứa danh sách group-by. Mặc định: mọi trục, không tham số.
    #[arg(short, long)]
    group_by: Option<PathBuf>,

    /// File JSON cấu hình engine.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Không đọc được file {path:?}"))?;
    serde_json::from_str(&data).with_context(|| format!("JSON không hợp lệ: {path:?}"))
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let args = Args::parse();
    let data = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Không đọc được file {:?}", args.input))?;

    let config: EngineConfig = match &args.config {
        Some(path) => read_json(path)?,
        None => EngineConfig::default(),
    };
    let group_bys: Vec<GroupBy> = match &args.group_by {
        Some(path) => read_json(path)?,
        None => default_group_bys(),
    };

    let dataset = Dataset::from_json_str(&data)?;
    let options = TrellisDiscoverer::new(&config).discover(dataset.events(), &group_bys)?;
    info!(axes = options.len(), "trellis options ready");

    println!("{}", serde_json::to_string_pretty(&options)?);

    Ok(())
}
