use anyhow::Result;
use clap::Parser;
use sample_pusher::utils::logging;
use sample_pusher::{App, Args};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    let args = Args::parse();

    // 初始化并运行应用
    App::initialize(args).await?.run().await?;

    Ok(())
}
