use thiserror::Error;

/// 設定関連のエラー型
/// 環境変数、設定ファイル、設定値の検証など設定に関するエラーを定義
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 環境変数が見つからない
    #[error("環境変数が見つかりません: {name}")]
    MissingEnvironmentVariable { name: String },

    /// 設定値が不正
    #[error("設定値が不正です: {name} = {value}")]
    InvalidValue { name: String, value: String },

    /// 設定ファイルを読み込めない
    #[error("設定ファイルを読み込めません: {path} - {reason}")]
    UnreadableConfigFile { path: String, reason: String },
}

impl ConfigError {
    /// 環境変数不足エラーを作成
    pub fn missing_env_var<N: Into<String>>(name: N) -> Self {
        Self::MissingEnvironmentVariable { name: name.into() }
    }

    /// 不正な設定値エラーを作成
    pub fn invalid_value<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self::InvalidValue {
            name: name.into(),
            value: value.into(),
        }
    }

    /// 設定ファイル読み込みエラーを作成
    pub fn unreadable_config_file<P: Into<String>, R: Into<String>>(path: P, reason: R) -> Self {
        Self::UnreadableConfigFile {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// 設定エラーのResult型エイリアス
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
