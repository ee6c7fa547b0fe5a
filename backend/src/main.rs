#[tokio::main]
async fn main() -> anyhow::Result<()> {
    banner::start_server().await
}
