use anyhow::Result;

pub async fn run(port: u16) -> Result<()> {
    twn_dev::start(port).await
}
