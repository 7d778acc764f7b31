//! Application state

use crate::config::Config;
use crate::mailer::Mailer;
use crate::store::Store;
use crate::upload::ImageStore;

/// Shared application state, generic over the backing store and the
/// upload/mail collaborators so tests can substitute fakes.
pub struct AppState<S, I, M> {
    pub config: Config,
    pub store: S,
    pub images: I,
    pub mailer: M,
}

impl<S, I, M> AppState<S, I, M>
where
    S: Store,
    I: ImageStore,
    M: Mailer,
{
    pub fn new(config: Config, store: S, images: I, mailer: M) -> Self {
        Self {
            config,
            store,
            images,
            mailer,
        }
    }
}
