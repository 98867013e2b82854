use wealthgoals_server::config::Config;
use wealthgoals_server::main_lib;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env()?;
    main_lib::init_tracing(config.log_format);
    main_lib::run(config).await
}
