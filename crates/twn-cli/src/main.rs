#[tokio::main]
async fn main() {
    twn_cli::run().await;
}
