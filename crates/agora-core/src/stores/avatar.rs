//! User avatars as object URLs, keyed by avatar URL.

use crate::{
    api::RequestExecutor,
    cache::{
        blob::download_variants, BlobCache, BlobRegistry, BlobSet, DerivedCollection, FetchMode,
    },
    session::TokenProvider,
    types::User,
};
use std::sync::Arc;
use url::Url;

/// Pixel sizes downloaded for every avatar.
pub const AVATAR_SIZES: [u32; 2] = [32, 128];

const AVATAR_CONTENT_TYPE: &str = "image/";

pub struct AvatarStore {
    executor: Arc<RequestExecutor>,
    session: Arc<dyn TokenProvider>,
    avatars: BlobCache,
}

impl AvatarStore {
    #[must_use]
    pub fn new(
        executor: Arc<RequestExecutor>,
        session: Arc<dyn TokenProvider>,
        registry: Arc<BlobRegistry>,
    ) -> Self {
        Self { executor, session, avatars: BlobCache::new("avatars", registry) }
    }

    #[must_use]
    pub fn cached(&self, avatar_url: &str) -> Option<BlobSet> {
        self.avatars.get(&self.executor.resolve(avatar_url))
    }

    /// Downloads every size of the avatar at `avatar_url`.
    ///
    /// Relative URLs resolve against the API base. Either all sizes are stored or
    /// none are.
    pub async fn fetch(&self, avatar_url: &str, mode: FetchMode) -> Option<BlobSet> {
        if avatar_url.is_empty() {
            return None;
        }
        let resolved = self.executor.resolve(avatar_url);
        let variants: Vec<(u32, String)> =
            AVATAR_SIZES.iter().map(|size| (*size, sized_url(&resolved, *size))).collect();
        let variants = variants.as_slice();
        let token = self.session.token();
        let token = token.as_deref();
        let executor = self.executor.as_ref();
        self.avatars
            .fetch(&resolved, mode, move || {
                download_variants(executor, token, variants, AVATAR_CONTENT_TYPE)
            })
            .await
    }

    /// Avatar of `user`, if they have one.
    pub async fn for_user(&self, user: &User, mode: FetchMode) -> Option<BlobSet> {
        self.fetch(user.avatar.as_deref()?, mode).await
    }

    /// Drops an avatar after the user changed it, revoking its URLs.
    pub fn clear(&self, avatar_url: &str) -> bool {
        self.avatars.clear(&self.executor.resolve(avatar_url))
    }

    pub fn clear_all(&self) {
        self.avatars.clear_all();
    }

    #[must_use]
    pub fn blobs(&self) -> &BlobCache {
        &self.avatars
    }
}

fn sized_url(base: &str, size: u32) -> String {
    match Url::parse(base) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("size", &size.to_string());
            url.into()
        }
        Err(_) => format!("{base}?size={size}"),
    }
}
