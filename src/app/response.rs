use crate::domain::article::Pagination;
use crate::types::{FieldErrors, NewsError};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

/// APIレスポンスの共通エンベロープ
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl<T> ApiResponse<T> {
    /// データのみの成功レスポンス
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            pagination: None,
            errors: None,
        }
    }

    /// ページ情報付きの成功レスポンス
    pub fn paginated(data: T, pagination: Pagination) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::ok(data)
        }
    }

    pub fn with_message<M: Into<String>>(mut self, message: M) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// メッセージのみの成功レスポンス
    pub fn message<M: Into<String>>(message: M) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            pagination: None,
            errors: None,
        }
    }

    /// 失敗レスポンス
    pub fn failure<M: Into<String>>(message: M, errors: Option<FieldErrors>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            pagination: None,
            errors,
        }
    }
}

impl ResponseError for NewsError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::Validation { fields } => {
                ApiResponse::failure("入力値が不正です", Some(fields.clone()))
            }
            Self::NotFound | Self::Unauthorized => ApiResponse::failure(self.to_string(), None),
            Self::Store { operation, source } => {
                // 内部の詳細はログにのみ出力する
                tracing::error!(error = ?source, %operation, "データストア操作に失敗");
                ApiResponse::failure("サーバー内部エラーが発生しました", None)
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_json(err: NewsError) -> (StatusCode, serde_json::Value) {
        let response = err.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_envelope_omits_empty_fields() {
        let json = serde_json::to_value(ApiResponse::ok(vec![1, 2])).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": [1, 2]}));

        let json = serde_json::to_value(ApiResponse::message("削除しました")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": true, "message": "削除しました"})
        );
    }

    #[actix_web::test]
    async fn test_store_error_hides_details() {
        let err = NewsError::store("記事の取得", sqlx::Error::PoolTimedOut);
        let (status, json) = body_json(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["success"], false);
        let message = json["message"].as_str().unwrap();
        assert!(!message.contains("記事の取得"), "内部情報を返してはならない");
        assert!(!message.to_lowercase().contains("pool"));
    }

    #[actix_web::test]
    async fn test_validation_error_lists_fields() {
        let err = NewsError::invalid_field("readTime", "1以上を指定してください");
        let (status, json) = body_json(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errors"]["readTime"][0], "1以上を指定してください");
    }

    #[actix_web::test]
    async fn test_not_found_shape() {
        let (status, json) = body_json(NewsError::NotFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            json,
            serde_json::json!({"success": false, "message": "記事が見つかりません"})
        );
    }
}
