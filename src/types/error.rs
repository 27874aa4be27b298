use std::collections::BTreeMap;
use thiserror::Error;

/// フィールド名 → エラーメッセージ一覧
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// 記事サービス全体で使用するエラー型
/// HTTPレイヤーではこの列挙子ごとにステータスコードへ変換される
#[derive(Error, Debug)]
pub enum NewsError {
    /// 入力値の検証エラー（フィールド単位の詳細付き）
    #[error("入力値が不正です: {}", summarize(.fields))]
    Validation { fields: FieldErrors },

    /// 記事が存在しない、または閲覧権限がない
    ///
    /// 非公開記事と存在しない記事は区別しない。
    #[error("記事が見つかりません")]
    NotFound,

    /// 特権操作に必要な認証情報がない
    #[error("この操作には管理者権限が必要です")]
    Unauthorized,

    /// データストアのエラー
    #[error("データベースエラー: {operation} - {source}")]
    Store {
        operation: String,
        #[source]
        source: sqlx::Error,
    },
}

impl NewsError {
    /// 単一フィールドの検証エラーを作成
    pub fn invalid_field<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.into(), vec![message.into()]);
        Self::Validation { fields }
    }

    /// データストアエラーを作成
    pub fn store<O: Into<String>>(operation: O, source: sqlx::Error) -> Self {
        Self::Store {
            operation: operation.into(),
            source,
        }
    }

    /// `validator`クレートの検証結果から変換する
    ///
    /// フィールド名はJSONペイロードと揃えるためcamelCaseに変換する。
    pub fn from_validation(errors: &validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            let messages = errs
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => e.code.to_string(),
                })
                .collect();
            fields.insert(to_camel_case(&field.to_string()), messages);
        }
        Self::Validation { fields }
    }
}

impl From<validator::ValidationErrors> for NewsError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::from_validation(&errors)
    }
}

/// 記事サービスのResult型エイリアス
pub type NewsResult<T> = std::result::Result<T, NewsError>;

fn summarize(fields: &FieldErrors) -> String {
    fields
        .iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
