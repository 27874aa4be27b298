use crate::app::config::DatabaseConfig;
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// データベース接続プールを作成
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
        .context("データベースへの接続に失敗しました")
}

/// データベースの初期化（マイグレーション実行）
pub async fn initialize_database(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("データベースマイグレーションの実行に失敗しました")
}

/// プールの作成とデータベース初期化を一括で行う便利関数
pub async fn setup_database(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = create_pool(config).await?;
    initialize_database(&pool).await?;
    tracing::info!(max_connections = config.max_connections, "データベース初期化完了");
    Ok(pool)
}
