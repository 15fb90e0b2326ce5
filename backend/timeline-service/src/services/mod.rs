/// Business logic layer for timeline-service
///
/// - Graph: in-network resolution for a viewer
/// - Feed: home/explore/saved composition, search, single post reads and edits
/// - Annotation: per-viewer likes/saves and counts for a page of posts
/// - Interactions: like/save/follow mutations and their notifications
/// - Comments, notifications, users: the surrounding read/write paths
///
/// Services are cheap to build; handlers construct them per request from the
/// shared `FeedStore` handle.
pub mod annotation;
pub mod comments;
pub mod feed;
pub mod graph;
pub mod interactions;
pub mod notifications;
pub mod users;

pub use annotation::Annotator;
pub use comments::CommentService;
pub use feed::{FeedMode, FeedService};
pub use graph::GraphResolver;
pub use interactions::InteractionService;
pub use notifications::NotificationService;
pub use users::{FollowDirection, UserService};
