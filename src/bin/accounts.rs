use accounts::cli::start;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let action = start()?;

    action.execute().await
}
