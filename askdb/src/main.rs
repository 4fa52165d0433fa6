use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod cmd;
mod repl;
mod table;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env values feed the clap `env` fallbacks below
    dotenvy::dotenv().ok();

    let args = cmd::Cli::parse();
    args.execute().await
}
