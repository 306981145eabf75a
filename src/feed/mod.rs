mod comments;
mod likes;

pub use comments::{author_name, CommentThread, UNKNOWN_AUTHOR};
pub use likes::LikeTracker;
