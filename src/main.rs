#[tokio::main]
async fn main() -> anyhow::Result<()> {
    qubetalk_proxy_lib::run().await
}
