//! Business logic between handlers and repositories.

pub mod comments;
pub mod feed;
pub mod follow;
pub mod posts;

pub use comments::CommentService;
pub use feed::{FeedService, ProfileFeed};
pub use follow::{FollowOutcome, FollowService, UnfollowOutcome};
pub use posts::{DeleteOutcome, EditOutcome, PostDetail, PostService, Submission};
