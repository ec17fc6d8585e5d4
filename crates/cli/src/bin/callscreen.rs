use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    callscreen_cli::main_entry().await
}
