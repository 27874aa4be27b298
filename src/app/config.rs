use crate::infra::storage::file::load_yaml_from_file;
use crate::types::{ConfigError, ConfigResult};
use serde::Deserialize;

/// 設定ファイルのパスを指定する環境変数
pub const CONFIG_FILE_ENV: &str = "NEWSDESK_CONFIG";

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
    pub workers: Option<usize>,
    /// 未設定なら誰も特権を持たない
    pub admin_token: Option<String>,
}

/// アプリケーション設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

// YAML設定ファイルの構造（すべて省略可能）
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub database_url: Option<String>,
    pub max_connections: Option<u32>,
    pub bind: Option<String>,
    pub workers: Option<usize>,
    pub admin_token: Option<String>,
}

impl AppConfig {
    /// 環境変数（と任意の設定ファイル）から設定を読み込む
    ///
    /// 優先順位: 環境変数 > 設定ファイル > 既定値
    pub fn load() -> ConfigResult<Self> {
        let file = match std::env::var(CONFIG_FILE_ENV) {
            Ok(path) => Some(
                load_yaml_from_file::<FileConfig, _>(&path)
                    .map_err(|e| ConfigError::unreadable_config_file(&path, format!("{:#}", e)))?,
            ),
            Err(_) => None,
        };
        Self::from_sources(file.unwrap_or_default(), |name| std::env::var(name).ok())
    }

    /// 設定ファイルの内容と環境変数の参照関数から設定を組み立てる
    pub fn from_sources<F>(file: FileConfig, env: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = env("DATABASE_URL")
            .or(file.database_url)
            .ok_or_else(|| ConfigError::missing_env_var("DATABASE_URL"))?;

        let max_connections = match env("NEWSDESK_MAX_CONNECTIONS") {
            Some(raw) => parse_positive("NEWSDESK_MAX_CONNECTIONS", &raw)?,
            None => file.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
        };

        let workers = match env("NEWSDESK_WORKERS") {
            Some(raw) => Some(parse_positive("NEWSDESK_WORKERS", &raw)?),
            None => file.workers,
        };

        let bind = env("NEWSDESK_BIND")
            .or(file.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let admin_token = env("NEWSDESK_ADMIN_TOKEN")
            .or(file.admin_token)
            .filter(|token| !token.trim().is_empty());

        Ok(Self {
            database: DatabaseConfig {
                url,
                max_connections,
            },
            server: ServerConfig {
                bind,
                workers,
                admin_token,
            },
        })
    }
}

fn parse_positive<T>(name: &str, raw: &str) -> ConfigResult<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(ConfigError::invalid_value(name, raw)),
    }
}
