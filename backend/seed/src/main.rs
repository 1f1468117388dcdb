use std::path::PathBuf;

use clap::Parser;
use server::{config::Config, database::init_pool, init_tracing};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory holding topics.json, users.json, articles.json and comments.json
    #[arg(long, env = "SEED_DATA_DIR", default_value = "data/test")]
    data: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = Config::load()?;
    let pool = init_pool(&config.database_url, config.max_connections).await?;

    seed::run(&pool, &args.data).await
}
