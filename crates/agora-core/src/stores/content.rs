//! Content kinds with no behavior beyond the shared entity cache.

use crate::{
    cache::EntityCache,
    types::{Activity, Article, Prompt},
};

pub type ActivityStore = EntityCache<Activity>;
pub type ArticleStore = EntityCache<Article>;
pub type PromptStore = EntityCache<Prompt>;
