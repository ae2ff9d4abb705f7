use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    cybermetric_eval::eval::main().await
}
