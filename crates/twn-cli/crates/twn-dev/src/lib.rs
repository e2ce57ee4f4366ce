mod server;
pub mod session;
mod watcher;

pub async fn start(port: u16) -> anyhow::Result<()> {
    server::run(port).await
}
