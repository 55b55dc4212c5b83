mod bridge;
mod bus;
mod host;
mod rtc;
mod sync;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
