pub mod auth;
pub mod cache_page;

pub use auth::{issue_token, AuthUser, Authentication, CurrentUser, Viewer};
pub use cache_page::CachePage;
