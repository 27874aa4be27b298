pub mod mock;
pub mod model;
pub mod query;
pub mod repository;
pub mod service;

// 公開APIの再エクスポート

// model.rsから
pub use model::{
    estimate_read_time, Article, ArticleChanges, CreateArticleRequest, PublicationState,
    UpdateArticleRequest,
};

// query.rsから
pub use query::{ArticleFilter, ArticleQuery, ListParams, Pagination, SortKey, SortOrder};

// repository.rs / mock.rsから
pub use mock::MockArticleStore;
pub use repository::{ArticleStore, PgArticleStore};

// service.rsから
pub use service::{ArticlePage, ArticleService, Viewer};
