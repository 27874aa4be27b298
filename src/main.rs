use newsdesk::app::{self, AppConfig};
use tracing_subscriber::{fmt, EnvFilter};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // 環境変数を読み込み（.envファイルがあれば使用）
    let _ = dotenvy::dotenv();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    tracing::info!("=== newsdesk 起動 ===");

    app::run(config).await
}
