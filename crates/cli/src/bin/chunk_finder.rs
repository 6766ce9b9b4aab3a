use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    chunk_cli::main_entry().await
}
