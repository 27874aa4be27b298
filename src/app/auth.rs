use crate::domain::article::Viewer;
use crate::types::NewsError;
use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use std::future::{ready, Ready};

/// 管理者トークンの設定
///
/// `Authorization: Bearer <token>`が一致したリクエストを特権扱いにする。
#[derive(Debug, Clone, Default)]
pub struct AdminToken(Option<String>);

impl AdminToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|t| !t.is_empty()))
    }

    /// リクエストヘッダーから呼び出し元の権限を判定する
    pub fn viewer_for(&self, req: &HttpRequest) -> Viewer {
        let Some(ref expected) = self.0 else {
            return Viewer::Public;
        };
        let presented = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim);

        match presented {
            Some(token) if token == expected.as_str() => Viewer::Privileged,
            _ => Viewer::Public,
        }
    }
}

fn viewer_of(req: &HttpRequest) -> Viewer {
    req.app_data::<web::Data<AdminToken>>()
        .map(|token| token.viewer_for(req))
        .unwrap_or(Viewer::Public)
}

impl FromRequest for Viewer {
    type Error = NewsError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(viewer_of(req)))
    }
}

/// 特権が必要なハンドラー用のエクストラクター
///
/// 特権がなければストアに触れる前に`Unauthorized`で拒否する。
#[derive(Debug, Clone, Copy)]
pub struct RequirePrivileged;

impl FromRequest for RequirePrivileged {
    type Error = NewsError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = match viewer_of(req) {
            Viewer::Privileged => Ok(RequirePrivileged),
            Viewer::Public => {
                tracing::warn!(path = %req.path(), "特権操作を拒否");
                Err(NewsError::Unauthorized)
            }
        };
        ready(result)
    }
}
