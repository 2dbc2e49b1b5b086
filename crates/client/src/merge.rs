//! Guest-to-user cart merge at login.
//!
//! The merge replays the guest cart into the user's server cart, one add-item
//! call per guest line, strictly in order. The backend folds same-book lines
//! together, so the client never computes the merged result itself.
//!
//! Progress is durable: the quantity transferred for each book is recorded
//! before the next call is issued. A retry adds only what a guest line holds
//! beyond that, so nothing is added twice and copies the guest added after a
//! partial merge are not lost.

use std::time::Duration;

use serde::Serialize;

use bookstore_cart::Quantity;
use bookstore_core::{BookId, UserId};

use crate::guest::{LocalCartStore, TransferredLine};
use crate::remote::{with_timeout, CartService, RemoteError};
use crate::session::Identity;
use crate::store::{KeyValueStore, StoreError};

/// How a merge attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeOutcome {
    /// Every guest line is in the server cart; the guest cart is gone.
    Completed,
    /// Some lines failed; the guest cart was kept for a retry.
    Partial,
    /// This user's merge already completed.
    SkippedAlreadyMerged,
    /// Nothing to merge.
    SkippedEmptyGuestCart,
}

/// A guest line the backend did not accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeFailure {
    pub book_id: BookId,
    pub quantity: u32,
    #[serde(serialize_with = "serialize_error")]
    pub error: RemoteError,
}

/// Result of one merge attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub user_id: UserId,
    pub outcome: MergeOutcome,
    /// Books transferred by this attempt, in call order.
    pub merged: Vec<BookId>,
    /// Books a previous attempt had already transferred in full.
    pub skipped: Vec<BookId>,
    pub failed: Vec<MergeFailure>,
}

impl MergeReport {
    fn empty(user_id: UserId, outcome: MergeOutcome) -> Self {
        Self {
            user_id,
            outcome,
            merged: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Whether the server cart changed during this attempt.
    pub fn transferred_any(&self) -> bool {
        !self.merged.is_empty()
    }
}

fn serialize_error<S: serde::Serializer>(error: &RemoteError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(error)
}

/// Merge the guest cart into `identity`'s server cart.
///
/// Remote failures are collected into the report; only local store failures
/// abort the merge.
pub(crate) async fn run<S, R>(
    local: &LocalCartStore<S>,
    remote: &R,
    identity: &Identity,
    timeout: Duration,
) -> Result<MergeReport, StoreError>
where
    S: KeyValueStore,
    R: CartService,
{
    let user_id = identity.user_id;

    if local.merged_for().await? == Some(user_id) {
        tracing::debug!(%user_id, "guest cart already merged for this login");
        return Ok(MergeReport::empty(user_id, MergeOutcome::SkippedAlreadyMerged));
    }

    let guest = local.load().await?;
    if guest.is_empty() {
        local.mark_merged_for(user_id).await?;
        return Ok(MergeReport::empty(user_id, MergeOutcome::SkippedEmptyGuestCart));
    }

    let mut done = local.merge_progress(user_id).await?;
    let mut report = MergeReport::empty(user_id, MergeOutcome::Completed);
    tracing::info!(%user_id, lines = guest.len(), resumed = done.len(), "merging guest cart");

    for item in guest.items() {
        let book_id = item.book_id();
        let transferred = done
            .iter()
            .find(|line| line.book_id == book_id)
            .map_or(0, |line| line.quantity);
        let Ok(remaining) = Quantity::new(item.quantity.get().saturating_sub(transferred)) else {
            report.skipped.push(book_id);
            continue;
        };

        match with_timeout(timeout, remote.add_item(identity, book_id, remaining)).await {
            Ok(_) => {
                record_transfer(&mut done, book_id, item.quantity.get());
                local.record_merge_progress(user_id, &done).await?;
                report.merged.push(book_id);
            }
            Err(error) => {
                tracing::warn!(%user_id, %book_id, "failed to merge guest cart line: {error}");
                report.failed.push(MergeFailure {
                    book_id,
                    quantity: remaining.get(),
                    error,
                });
            }
        }
    }

    if report.failed.is_empty() {
        local.clear().await?;
        local.clear_merge_progress().await?;
        local.mark_reload_needed().await?;
        local.mark_merged_for(user_id).await?;
        tracing::info!(%user_id, merged = report.merged.len(), "guest cart merged");
    } else {
        report.outcome = MergeOutcome::Partial;
        if report.transferred_any() {
            local.mark_reload_needed().await?;
        }
        tracing::warn!(
            %user_id,
            merged = report.merged.len(),
            failed = report.failed.len(),
            "guest cart merge incomplete; guest cart kept for retry"
        );
    }

    Ok(report)
}

fn record_transfer(done: &mut Vec<TransferredLine>, book_id: BookId, quantity: u32) {
    match done.iter_mut().find(|line| line.book_id == book_id) {
        Some(line) => line.quantity = quantity,
        None => done.push(TransferredLine { book_id, quantity }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookstore_cart::{BookSnapshot, CartLines};
    use bookstore_core::Price;

    use crate::remote::{InMemoryCartService, RecordedCall};
    use crate::session::AuthToken;
    use crate::store::InMemoryStore;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn book(id: i64) -> BookSnapshot {
        BookSnapshot::new(
            BookId::new(id),
            format!("Book {id}"),
            "Author",
            Price::from_minor_units(999).unwrap(),
        )
    }

    fn identity(id: i64) -> Identity {
        Identity::new(UserId::new(id), AuthToken::new("token"))
    }

    async fn guest_store(lines: &[(i64, u32)]) -> LocalCartStore<InMemoryStore> {
        let local = LocalCartStore::new(InMemoryStore::new());
        let mut cart = CartLines::new();
        for &(id, qty) in lines {
            cart.add(book(id), Quantity::new(qty).unwrap());
        }
        local.save(&cart).await.unwrap();
        local
    }

    fn service(user: i64, books: &[i64]) -> InMemoryCartService {
        books
            .iter()
            .fold(InMemoryCartService::new(), |svc, &id| svc.with_book(book(id)))
            .with_cart(UserId::new(user), Vec::new())
    }

    #[tokio::test]
    async fn single_line_becomes_one_add_and_guest_cart_is_cleared() {
        let local = guest_store(&[(7, 2)]).await;
        let remote = service(1, &[7]);

        let report = run(&local, &remote, &identity(1), TIMEOUT).await.unwrap();

        assert_eq!(report.outcome, MergeOutcome::Completed);
        assert_eq!(
            remote.add_calls(),
            vec![RecordedCall::Add {
                user_id: UserId::new(1),
                book_id: BookId::new(7),
                quantity: 2,
            }]
        );
        assert!(local.load().await.unwrap().is_empty());
        assert!(local.reload_needed().await.unwrap());
        assert_eq!(local.merged_for().await.unwrap(), Some(UserId::new(1)));
    }

    #[tokio::test]
    async fn lines_are_added_in_insertion_order() {
        let local = guest_store(&[(5, 1), (3, 4)]).await;
        let remote = service(1, &[3, 5]);

        let report = run(&local, &remote, &identity(1), TIMEOUT).await.unwrap();

        assert_eq!(report.merged, vec![BookId::new(5), BookId::new(3)]);
        let books: Vec<BookId> = remote
            .add_calls()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCall::Add { book_id, .. } => Some(book_id),
                _ => None,
            })
            .collect();
        assert_eq!(books, vec![BookId::new(5), BookId::new(3)]);
    }

    #[tokio::test]
    async fn server_folds_guest_lines_into_existing_cart() {
        let local = guest_store(&[(7, 2)]).await;
        let remote = InMemoryCartService::new()
            .with_cart(UserId::new(1), vec![(book(7), Quantity::new(1).unwrap())]);

        run(&local, &remote, &identity(1), TIMEOUT).await.unwrap();

        let cart = remote.cart(UserId::new(1)).unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].quantity.get(), 3);
    }

    #[tokio::test]
    async fn second_run_for_same_user_is_a_no_op() {
        let local = guest_store(&[(7, 2)]).await;
        let remote = service(1, &[7]);

        run(&local, &remote, &identity(1), TIMEOUT).await.unwrap();
        // A guest line written after the merge must not be replayed for the
        // same login.
        let mut extra = CartLines::new();
        extra.add(book(7), Quantity::ONE);
        local.save(&extra).await.unwrap();

        let again = run(&local, &remote, &identity(1), TIMEOUT).await.unwrap();

        assert_eq!(again.outcome, MergeOutcome::SkippedAlreadyMerged);
        assert_eq!(remote.add_calls().len(), 1);
        assert_eq!(remote.cart(UserId::new(1)).unwrap()[0].quantity.get(), 2);
    }

    #[tokio::test]
    async fn empty_guest_cart_makes_no_calls() {
        let local = LocalCartStore::new(InMemoryStore::new());
        let remote = service(1, &[]);

        let report = run(&local, &remote, &identity(1), TIMEOUT).await.unwrap();

        assert_eq!(report.outcome, MergeOutcome::SkippedEmptyGuestCart);
        assert!(remote.calls().is_empty());
        assert!(!local.reload_needed().await.unwrap());
    }

    #[tokio::test]
    async fn partial_failure_keeps_guest_cart_and_retry_skips_transferred_books() {
        let local = guest_store(&[(1, 1), (2, 2), (3, 3)]).await;
        let remote = service(9, &[1, 2, 3]);
        remote.fail_adds_for(BookId::new(2));

        let first = run(&local, &remote, &identity(9), TIMEOUT).await.unwrap();

        assert_eq!(first.outcome, MergeOutcome::Partial);
        assert_eq!(first.merged, vec![BookId::new(1), BookId::new(3)]);
        assert_eq!(first.failed.len(), 1);
        assert_eq!(first.failed[0].book_id, BookId::new(2));
        assert_eq!(first.failed[0].quantity, 2);
        assert_eq!(local.load().await.unwrap().len(), 3);
        assert_eq!(local.merged_for().await.unwrap(), None);
        assert!(local.reload_needed().await.unwrap());

        remote.clear_failures();
        let retry = run(&local, &remote, &identity(9), TIMEOUT).await.unwrap();

        assert_eq!(retry.outcome, MergeOutcome::Completed);
        assert_eq!(retry.merged, vec![BookId::new(2)]);
        assert_eq!(retry.skipped, vec![BookId::new(1), BookId::new(3)]);
        assert!(local.load().await.unwrap().is_empty());
        assert!(local.merge_progress(UserId::new(9)).await.unwrap().is_empty());

        let quantities: Vec<u32> = remote
            .cart(UserId::new(9))
            .unwrap()
            .iter()
            .map(|i| i.quantity.get())
            .collect();
        assert_eq!(quantities, vec![1, 3, 2]);
    }

    #[tokio::test]
    async fn retry_adds_copies_the_guest_added_after_a_partial_merge() {
        let local = guest_store(&[(1, 1), (2, 1)]).await;
        let remote = service(4, &[1, 2]);
        remote.fail_adds_for(BookId::new(2));

        let first = run(&local, &remote, &identity(4), TIMEOUT).await.unwrap();
        assert_eq!(first.outcome, MergeOutcome::Partial);

        let mut guest = local.load().await.unwrap();
        guest.add(book(1), Quantity::new(5).unwrap());
        local.save(&guest).await.unwrap();
        remote.clear_failures();

        let retry = run(&local, &remote, &identity(4), TIMEOUT).await.unwrap();

        assert_eq!(retry.outcome, MergeOutcome::Completed);
        assert_eq!(retry.merged, vec![BookId::new(1), BookId::new(2)]);
        assert_eq!(
            remote.add_calls()[2..],
            [
                RecordedCall::Add {
                    user_id: UserId::new(4),
                    book_id: BookId::new(1),
                    quantity: 5,
                },
                RecordedCall::Add {
                    user_id: UserId::new(4),
                    book_id: BookId::new(2),
                    quantity: 1,
                },
            ]
        );
        let server: Vec<(BookId, u32)> = remote
            .cart(UserId::new(4))
            .unwrap()
            .iter()
            .map(|i| (i.book_id(), i.quantity.get()))
            .collect();
        assert_eq!(server, vec![(BookId::new(1), 6), (BookId::new(2), 1)]);
        assert!(local.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stalled_backend_is_reported_as_timeout() {
        let local = guest_store(&[(7, 1)]).await;
        let remote = service(1, &[7]);
        remote.stall();

        let limit = Duration::from_millis(20);
        let report = run(&local, &remote, &identity(1), limit).await.unwrap();

        assert_eq!(report.outcome, MergeOutcome::Partial);
        assert_eq!(report.failed[0].error, RemoteError::Timeout(limit));
        assert_eq!(local.load().await.unwrap().len(), 1);
    }
}
