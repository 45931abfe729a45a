#[tokio::main]
async fn main() -> anyhow::Result<()> {
    smartexam_lib::run().await
}
