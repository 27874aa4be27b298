//! 型定義モジュール
//!
//! アプリケーション全体で使用される共通的な型定義を管理します。
//! - 記事サービスのエラー型: HTTPステータスへの変換元
//! - 設定エラー型: 起動時の設定読み込み失敗

pub mod config;
pub mod error;

// 便利な再エクスポート
pub use config::{ConfigError, ConfigResult};
pub use error::{FieldErrors, NewsError, NewsResult};
