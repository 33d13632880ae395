//! Per-kind stores built on the shared caches.
//!
//! Activities, articles and prompts use a bare [`EntityCache`](crate::cache::EntityCache).
//! Events, users, friends, notifications and avatars add the derived collections
//! and mutations specific to them.

pub mod avatar;
pub mod cloud;
pub mod content;
pub mod event;
pub mod friends;
pub mod notification;
pub mod user;

pub use avatar::{AvatarStore, AVATAR_SIZES};
pub use cloud::{CloudClient, Place};
pub use content::{ActivityStore, ArticleStore, PromptStore};
pub use event::{EventStore, THUMBNAIL_SIZE};
pub use friends::FriendsStore;
pub use notification::NotificationStore;
pub use user::UserStore;
