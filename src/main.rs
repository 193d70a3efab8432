use std::env;

use stucon::app;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Port from the first argument, then STUCON_PORT, then the default.
    let args: Vec<String> = env::args().collect();
    let port: u16 = args
        .get(1)
        .cloned()
        .or_else(|| env::var("STUCON_PORT").ok())
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    app::run(port).await
}
