#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = examhall_rust::run().await {
        eprintln!("examhall-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
