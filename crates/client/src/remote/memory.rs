use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use bookstore_cart::{BookSnapshot, CartItem, CartLines, Quantity};
use bookstore_core::{BookId, CartItemId, UserId};

use super::{CartService, RemoteError};
use crate::session::Identity;

/// A call received by [`InMemoryCartService`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Fetch(UserId),
    Create(UserId),
    Add {
        user_id: UserId,
        book_id: BookId,
        quantity: u32,
    },
    Update {
        user_id: UserId,
        item_id: CartItemId,
        quantity: u32,
    },
    Remove {
        user_id: UserId,
        item_id: CartItemId,
    },
    Clear(UserId),
}

#[derive(Debug, Default)]
struct State {
    carts: HashMap<UserId, Vec<CartItem>>,
    catalog: HashMap<BookId, BookSnapshot>,
    calls: Vec<RecordedCall>,
    failing_books: HashSet<BookId>,
    stalled: bool,
    next_item_id: i64,
}

/// In-memory Cart Service with the backend's semantics.
///
/// Intended for tests/dev: it records every call, can be told to fail adds
/// for specific books, and can stall every request to exercise timeouts.
#[derive(Debug, Default)]
pub struct InMemoryCartService {
    state: Mutex<State>,
}

impl InMemoryCartService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `book` known to the catalog so it can be added.
    pub fn with_book(self, book: BookSnapshot) -> Self {
        self.lock().catalog.insert(book.book_id, book);
        self
    }

    /// Give `user_id` an existing cart with these books and quantities.
    pub fn with_cart(self, user_id: UserId, lines: Vec<(BookSnapshot, Quantity)>) -> Self {
        {
            let mut state = self.lock();
            let mut items = Vec::with_capacity(lines.len());
            for (book, quantity) in lines {
                state.next_item_id += 1;
                state.catalog.insert(book.book_id, book.clone());
                items.push(CartItem::new(
                    CartItemId::Server(state.next_item_id),
                    book,
                    quantity,
                ));
            }
            state.carts.insert(user_id, items);
        }
        self
    }

    /// Reject every add of `book_id` with a server error.
    pub fn fail_adds_for(&self, book_id: BookId) {
        self.lock().failing_books.insert(book_id);
    }

    pub fn clear_failures(&self) {
        self.lock().failing_books.clear();
    }

    /// Never answer any request.
    pub fn stall(&self) {
        self.lock().stalled = true;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Only the add calls, in order.
    pub fn add_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, RecordedCall::Add { .. }))
            .collect()
    }

    pub fn cart(&self, user_id: UserId) -> Option<Vec<CartItem>> {
        self.lock().carts.get(&user_id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock only happens in a failing test.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn begin(&self, call: RecordedCall) {
        let stalled = {
            let mut state = self.lock();
            state.calls.push(call);
            state.stalled
        };
        if stalled {
            std::future::pending::<()>().await;
        }
    }

    fn with_cart_mut<F>(&self, user_id: UserId, f: F) -> Result<CartLines, RemoteError>
    where
        F: FnOnce(&mut State) -> Result<(), RemoteError>,
    {
        let mut state = self.lock();
        if !state.carts.contains_key(&user_id) {
            return Err(not_found(format!("Cart not found for user: {user_id}")));
        }
        f(&mut *state)?;
        let items = state.carts.get(&user_id).cloned().unwrap_or_default();
        Ok(CartLines::from_items(items))
    }
}

fn not_found(body: String) -> RemoteError {
    RemoteError::Api { status: 404, body }
}

fn cart_of(state: &mut State, user_id: UserId) -> Result<&mut Vec<CartItem>, RemoteError> {
    state
        .carts
        .get_mut(&user_id)
        .ok_or_else(|| not_found(format!("Cart not found for user: {user_id}")))
}

#[async_trait]
impl CartService for InMemoryCartService {
    async fn fetch_cart(&self, identity: &Identity) -> Result<Option<CartLines>, RemoteError> {
        self.begin(RecordedCall::Fetch(identity.user_id)).await;
        Ok(self
            .lock()
            .carts
            .get(&identity.user_id)
            .cloned()
            .map(CartLines::from_items))
    }

    async fn create_cart(&self, identity: &Identity) -> Result<CartLines, RemoteError> {
        self.begin(RecordedCall::Create(identity.user_id)).await;
        let mut state = self.lock();
        let items = state.carts.entry(identity.user_id).or_default().clone();
        Ok(CartLines::from_items(items))
    }

    async fn add_item(
        &self,
        identity: &Identity,
        book_id: BookId,
        quantity: Quantity,
    ) -> Result<CartLines, RemoteError> {
        let user_id = identity.user_id;
        self.begin(RecordedCall::Add {
            user_id,
            book_id,
            quantity: quantity.get(),
        })
        .await;

        self.with_cart_mut(user_id, |state| {
            if state.failing_books.contains(&book_id) {
                return Err(RemoteError::Api {
                    status: 500,
                    body: format!("failed to add book {book_id}"),
                });
            }
            let book = state
                .catalog
                .get(&book_id)
                .cloned()
                .ok_or_else(|| not_found(format!("Book not found with id: {book_id}")))?;

            state.next_item_id += 1;
            let next_id = state.next_item_id;
            let cart = cart_of(state, user_id)?;
            match cart.iter_mut().find(|i| i.book_id() == book_id) {
                Some(existing) => existing.quantity = existing.quantity.saturating_add(quantity),
                None => cart.push(CartItem::new(CartItemId::Server(next_id), book, quantity)),
            }
            Ok(())
        })
    }

    async fn update_item_quantity(
        &self,
        identity: &Identity,
        item_id: CartItemId,
        quantity: Quantity,
    ) -> Result<CartLines, RemoteError> {
        let user_id = identity.user_id;
        self.begin(RecordedCall::Update {
            user_id,
            item_id,
            quantity: quantity.get(),
        })
        .await;

        self.with_cart_mut(user_id, |state| {
            let cart = cart_of(state, user_id)?;
            let item = cart
                .iter_mut()
                .find(|i| i.cart_item_id == item_id)
                .ok_or_else(|| not_found(format!("Cart item not found: {item_id}")))?;
            item.quantity = quantity;
            Ok(())
        })
    }

    async fn remove_item(
        &self,
        identity: &Identity,
        item_id: CartItemId,
    ) -> Result<CartLines, RemoteError> {
        let user_id = identity.user_id;
        self.begin(RecordedCall::Remove { user_id, item_id }).await;

        self.with_cart_mut(user_id, |state| {
            let cart = cart_of(state, user_id)?;
            let before = cart.len();
            cart.retain(|i| i.cart_item_id != item_id);
            if cart.len() == before {
                return Err(not_found(format!("Cart item not found: {item_id}")));
            }
            Ok(())
        })
    }

    async fn clear_cart(&self, identity: &Identity) -> Result<CartLines, RemoteError> {
        let user_id = identity.user_id;
        self.begin(RecordedCall::Clear(user_id)).await;

        self.with_cart_mut(user_id, |state| {
            cart_of(state, user_id)?.clear();
            Ok(())
        })
    }
}
