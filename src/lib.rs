//! ニュース記事の管理バックエンド
//!
//! - `domain::article`: 記事モデル・検索条件・ストア・サービス
//! - `app`: HTTP API（actix-web）、設定、認証
//! - `infra`: データベース接続、ファイル読み込み
//! - `types`: エラー型

pub mod app;
pub mod domain;
pub mod infra;
pub mod types;
