//! The cart lifecycle manager.
//!
//! `CartManager` owns "the current cart" across both modes:
//! - guest: the cart lives in the local store, every mutation is written
//!   through before the operation returns
//! - authenticated: the backend owns the cart, every mutation is a remote
//!   call and the view is replaced by the list the backend returns
//!
//! Login runs the one-time guest-to-user merge (see [`crate::merge`]).

use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

use bookstore_cart::{BookSnapshot, CartItem, CartLines, CartSummary, Quantity};
use bookstore_core::CartItemId;

use crate::config::DEFAULT_REQUEST_TIMEOUT;
use crate::guest::LocalCartStore;
use crate::merge::{self, MergeReport};
use crate::mode::CartMode;
use crate::remote::{with_timeout, CartService, RemoteError};
use crate::session::Identity;
use crate::store::{KeyValueStore, StoreError};

/// Cart operation error.
#[derive(Debug, Error)]
pub enum CartError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The operation needs a logged-in user.
    #[error("no user is logged in")]
    NotAuthenticated,
}

pub type CartResult<T> = Result<T, CartError>;

/// One cart view over the local store and the remote Cart Service.
///
/// Operations take `&mut self`: the manager is a single logical actor and
/// never has two operations in flight.
#[derive(Debug)]
pub struct CartManager<S, R> {
    local: LocalCartStore<S>,
    remote: R,
    mode: CartMode,
    lines: CartLines,
    request_timeout: Duration,
}

impl<S, R> CartManager<S, R>
where
    S: KeyValueStore,
    R: CartService,
{
    /// A guest-mode manager with an empty view; call [`CartManager::load`]
    /// to read the stored guest cart.
    pub fn new(store: S, remote: R) -> Self {
        Self {
            local: LocalCartStore::new(store),
            remote,
            mode: CartMode::Guest,
            lines: CartLines::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Bound every remote call by `timeout`.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn mode(&self) -> &CartMode {
        &self.mode
    }

    pub fn local(&self) -> &LocalCartStore<S> {
        &self.local
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn lines(&self) -> &CartLines {
        &self.lines
    }

    pub fn items(&self) -> &[CartItem] {
        self.lines.items()
    }

    pub fn total(&self) -> Decimal {
        self.lines.total()
    }

    pub fn count(&self) -> u64 {
        self.lines.count()
    }

    pub fn summary(&self) -> CartSummary {
        self.lines.summary()
    }

    /// Read the current cart from its owner.
    ///
    /// Guest mode reads the local store (malformed data is an empty cart).
    /// Authenticated mode fetches the user's cart, creating it if the user
    /// has none, and consumes the reload flag.
    pub async fn load(&mut self) -> CartResult<&[CartItem]> {
        match self.mode.identity().cloned() {
            None => {
                self.lines = self.local.load().await?;
            }
            Some(identity) => {
                let fetched = self.call(self.remote.fetch_cart(&identity)).await?;
                self.lines = match fetched {
                    Some(lines) => lines,
                    None => {
                        tracing::info!(user_id = %identity.user_id, "user has no cart yet, creating one");
                        self.call(self.remote.create_cart(&identity)).await?
                    }
                };
                self.local.clear_reload_flag().await?;
            }
        }
        Ok(self.lines.items())
    }

    /// The current items, refetched first if a merge asked for a reload.
    pub async fn view(&mut self) -> CartResult<&[CartItem]> {
        if self.mode.is_authenticated() && self.local.reload_needed().await? {
            tracing::debug!("reload flag set, refetching cart");
            return self.load().await;
        }
        Ok(self.lines.items())
    }

    /// Add `quantity` copies of `book`; an existing line for the same book
    /// grows instead of a second line appearing.
    pub async fn add_item(
        &mut self,
        book: BookSnapshot,
        quantity: Quantity,
    ) -> CartResult<&[CartItem]> {
        match self.mode.identity().cloned() {
            None => {
                let mut next = self.lines.clone();
                next.add(book, quantity);
                self.commit_guest(next).await?;
            }
            Some(identity) => {
                self.lines = self
                    .call(self.remote.add_item(&identity, book.book_id, quantity))
                    .await?;
            }
        }
        Ok(self.lines.items())
    }

    pub async fn remove_item(&mut self, id: CartItemId) -> CartResult<&[CartItem]> {
        match self.mode.identity().cloned() {
            None => {
                let mut next = self.lines.clone();
                if next.remove(&id) {
                    self.commit_guest(next).await?;
                }
            }
            Some(identity) => {
                self.lines = self.call(self.remote.remove_item(&identity, id)).await?;
            }
        }
        Ok(self.lines.items())
    }

    /// Increase a line by one. Unknown ids leave the cart untouched.
    pub async fn increase_qty(&mut self, id: CartItemId) -> CartResult<&[CartItem]> {
        let Some(current) = self.lines.find(&id).map(|item| item.quantity) else {
            tracing::debug!(%id, "increase on unknown cart item ignored");
            return Ok(self.lines.items());
        };

        match self.mode.identity().cloned() {
            None => {
                let mut next = self.lines.clone();
                next.increase(&id);
                self.commit_guest(next).await?;
            }
            Some(identity) => {
                let quantity = current.incremented();
                self.lines = self
                    .call(self.remote.update_item_quantity(&identity, id, quantity))
                    .await?;
            }
        }
        Ok(self.lines.items())
    }

    /// Decrease a line by one; a line at one is removed. Unknown ids leave
    /// the cart untouched.
    pub async fn decrease_qty(&mut self, id: CartItemId) -> CartResult<&[CartItem]> {
        let Some(current) = self.lines.find(&id).map(|item| item.quantity) else {
            tracing::debug!(%id, "decrease on unknown cart item ignored");
            return Ok(self.lines.items());
        };

        match self.mode.identity().cloned() {
            None => {
                let mut next = self.lines.clone();
                next.decrease(&id);
                self.commit_guest(next).await?;
            }
            Some(identity) => {
                let call = match current.decremented() {
                    Some(quantity) => {
                        self.call(self.remote.update_item_quantity(&identity, id, quantity))
                            .await
                    }
                    None => self.call(self.remote.remove_item(&identity, id)).await,
                };
                self.lines = call?;
            }
        }
        Ok(self.lines.items())
    }

    pub async fn clear(&mut self) -> CartResult<&[CartItem]> {
        match self.mode.identity().cloned() {
            None => self.commit_guest(CartLines::new()).await?,
            Some(identity) => {
                self.lines = self.call(self.remote.clear_cart(&identity)).await?;
            }
        }
        Ok(self.lines.items())
    }

    /// Switch to authenticated mode for `identity`.
    ///
    /// Loads (or creates) the user's server cart, then merges the guest cart
    /// into it once per login. Logging in as a different user than the
    /// current one logs the current user out first. Per-line merge failures
    /// are reported, not returned as errors.
    pub async fn login(&mut self, identity: Identity) -> CartResult<MergeReport> {
        if let Some(current) = self.mode.identity() {
            if current.user_id != identity.user_id {
                tracing::info!(
                    from = %current.user_id,
                    to = %identity.user_id,
                    "switching user, logging out first"
                );
                self.logout().await?;
            }
        }

        tracing::info!(user_id = %identity.user_id, "logging in");
        self.mode = CartMode::Authenticated(identity);
        self.load().await?;
        self.merge().await
    }

    /// Restore an authenticated session without merging.
    ///
    /// Sets the mode and loads the user's cart. A guest cart left behind by
    /// an incomplete merge stays in the local store until
    /// [`CartManager::retry_merge`] or the next [`CartManager::login`].
    pub async fn resume(&mut self, identity: Identity) -> CartResult<&[CartItem]> {
        if self.mode.identity().is_some_and(|current| current.user_id != identity.user_id) {
            self.logout().await?;
        }
        tracing::debug!(user_id = %identity.user_id, "resuming session");
        self.mode = CartMode::Authenticated(identity);
        self.load().await
    }

    /// Retry an incomplete merge for the logged-in user.
    pub async fn retry_merge(&mut self) -> CartResult<MergeReport> {
        if self.mode.is_guest() {
            return Err(CartError::NotAuthenticated);
        }
        self.merge().await
    }

    /// Return to guest mode.
    ///
    /// The login markers are removed and the view shows the guest store
    /// again: empty after a completed merge, the untransferred guest lines
    /// after a partial one. The server cart is not copied into the guest
    /// store.
    pub async fn logout(&mut self) -> CartResult<()> {
        if let Some(identity) = self.mode.identity() {
            tracing::info!(user_id = %identity.user_id, "logging out");
        }
        self.mode = CartMode::Guest;
        self.lines = self.local.load().await?;
        self.local.clear_merged_marker().await?;
        self.local.clear_reload_flag().await?;
        Ok(())
    }

    async fn merge(&mut self) -> CartResult<MergeReport> {
        let identity = self
            .mode
            .identity()
            .cloned()
            .ok_or(CartError::NotAuthenticated)?;

        let report = merge::run(&self.local, &self.remote, &identity, self.request_timeout).await?;

        if report.transferred_any() {
            // The flag stays set if this fails, so the next view() retries.
            if let Err(err) = self.load().await {
                tracing::warn!(user_id = %identity.user_id, "failed to reload cart after merge: {err}");
            }
        }
        Ok(report)
    }

    async fn commit_guest(&mut self, next: CartLines) -> CartResult<()> {
        self.local.save(&next).await?;
        self.lines = next;
        Ok(())
    }

    async fn call<T, F>(&self, call: F) -> Result<T, RemoteError>
    where
        F: std::future::Future<Output = Result<T, RemoteError>>,
    {
        with_timeout(self.request_timeout, call).await
    }
}
