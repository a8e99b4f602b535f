use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ixinventory_lib::run(ixinventory_lib::Cli::parse()).await
}
