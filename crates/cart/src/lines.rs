//! Ordered collection of cart lines and its derived totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bookstore_core::{format_amount, BookId, CartItemId, Entity};

use crate::book::BookSnapshot;
use crate::item::CartItem;
use crate::quantity::Quantity;

/// The lines of one cart, in insertion order.
///
/// Invariants:
/// - at most one line per `BookId`
/// - every quantity is at least one (enforced by [`Quantity`])
///
/// `total` and `count` are computed from the lines on every call and never
/// cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartItem>", into = "Vec<CartItem>")]
pub struct CartLines {
    items: Vec<CartItem>,
}

/// Point-in-time view of a cart: its lines plus the derived values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub items: Vec<CartItem>,
    /// Sum of line totals, two decimals.
    pub total: String,
    /// Sum of quantities.
    pub count: u64,
}

impl CartLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an arbitrary list, folding duplicate books into the first
    /// line for that book (quantities are summed).
    pub fn from_items(items: impl IntoIterator<Item = CartItem>) -> Self {
        let mut lines = Self::new();
        for item in items {
            match lines.position_of_book(item.book_id()) {
                Some(idx) => {
                    if let Some(existing) = lines.items.get_mut(idx) {
                        existing.quantity = existing.quantity.saturating_add(item.quantity);
                    }
                }
                None => lines.items.push(item),
            }
        }
        lines
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn find(&self, id: &CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.id() == id)
    }

    pub fn find_by_book(&self, book_id: BookId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.book_id() == book_id)
    }

    fn position_of_book(&self, book_id: BookId) -> Option<usize> {
        self.items.iter().position(|i| i.book_id() == book_id)
    }

    /// Add `quantity` copies of `book`.
    ///
    /// If the book already has a line its quantity grows; otherwise a new line
    /// with a freshly generated local id is appended. Returns the affected line's id.
    pub fn add(&mut self, book: BookSnapshot, quantity: Quantity) -> CartItemId {
        if let Some(existing) = self.items.iter_mut().find(|i| i.book_id() == book.book_id) {
            existing.quantity = existing.quantity.saturating_add(quantity);
            return existing.cart_item_id;
        }

        let id = CartItemId::generate();
        self.items.push(CartItem::new(id, book, quantity));
        id
    }

    /// Remove the line with `id`. Returns whether a line was removed.
    pub fn remove(&mut self, id: &CartItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| &i.cart_item_id != id);
        self.items.len() != before
    }

    /// Add one copy to the line with `id`. Returns whether a line matched.
    pub fn increase(&mut self, id: &CartItemId) -> bool {
        match self.items.iter_mut().find(|i| &i.cart_item_id == id) {
            Some(item) => {
                item.quantity = item.quantity.incremented();
                true
            }
            None => false,
        }
    }

    /// Take one copy off the line with `id`, removing the line when it would
    /// reach zero. Returns whether a line matched.
    pub fn decrease(&mut self, id: &CartItemId) -> bool {
        let Some(idx) = self.items.iter().position(|i| &i.cart_item_id == id) else {
            return false;
        };

        let next = self.items.get(idx).and_then(|i| i.quantity.decremented());
        match (next, self.items.get_mut(idx)) {
            (Some(quantity), Some(item)) => item.quantity = quantity,
            _ => {
                self.items.remove(idx);
            }
        }
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Exact sum of `price × quantity` over all lines, saturating at the
    /// decimal range.
    pub fn total(&self) -> Decimal {
        self.items
            .iter()
            .map(CartItem::line_total)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// [`Self::total`] rendered with two decimals.
    pub fn formatted_total(&self) -> String {
        format_amount(self.total())
    }

    /// Sum of quantities over all lines.
    pub fn count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity.get())).sum()
    }

    pub fn summary(&self) -> CartSummary {
        CartSummary {
            items: self.items.clone(),
            total: self.formatted_total(),
            count: self.count(),
        }
    }
}

impl From<Vec<CartItem>> for CartLines {
    fn from(items: Vec<CartItem>) -> Self {
        Self::from_items(items)
    }
}

impl From<CartLines> for Vec<CartItem> {
    fn from(lines: CartLines) -> Self {
        lines.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookstore_core::Price;

    fn book(id: i64, cents: i64) -> BookSnapshot {
        BookSnapshot::new(
            BookId::new(id),
            format!("Book {id}"),
            "Some Author",
            Price::from_minor_units(cents).unwrap(),
        )
    }

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[test]
    fn add_same_book_merges_lines() {
        let mut lines = CartLines::new();
        let first = lines.add(book(7, 1000), qty(2));
        let second = lines.add(book(7, 1000), qty(3));

        assert_eq!(first, second);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.items()[0].quantity, qty(5));
    }

    #[test]
    fn add_distinct_books_preserves_insertion_order() {
        let mut lines = CartLines::new();
        lines.add(book(2, 100), qty(1));
        lines.add(book(1, 100), qty(1));

        let ids: Vec<_> = lines.items().iter().map(CartItem::book_id).collect();
        assert_eq!(ids, vec![BookId::new(2), BookId::new(1)]);
    }

    #[test]
    fn decrease_to_zero_removes_line_and_then_is_noop() {
        let mut lines = CartLines::new();
        let id = lines.add(book(1, 500), qty(2));

        assert!(lines.decrease(&id));
        assert_eq!(lines.find(&id).unwrap().quantity, qty(1));

        assert!(lines.decrease(&id));
        assert!(lines.find(&id).is_none());
        assert!(lines.is_empty());

        assert!(!lines.decrease(&id));
        assert!(lines.is_empty());
    }

    #[test]
    fn increase_and_remove_unknown_ids_are_noops() {
        let mut lines = CartLines::new();
        lines.add(book(1, 500), qty(1));
        let unknown = CartItemId::Server(999);

        assert!(!lines.increase(&unknown));
        assert!(!lines.remove(&unknown));
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn totals_round_to_two_decimals() {
        let mut lines = CartLines::new();
        lines.add(book(1, 1299), qty(2));
        lines.add(book(2, 1), qty(3));

        assert_eq!(lines.formatted_total(), "26.01");
        assert_eq!(lines.count(), 5);

        let summary = lines.summary();
        assert_eq!(summary.total, "26.01");
        assert_eq!(summary.count, 5);
        assert_eq!(summary.items.len(), 2);
    }

    #[test]
    fn empty_cart_totals() {
        let lines = CartLines::new();
        assert_eq!(lines.formatted_total(), "0.00");
        assert_eq!(lines.count(), 0);
    }

    #[test]
    fn out_of_range_price_is_a_decode_error() {
        let raw = r#"[{"cartItemId":1,"book":{"bookId":1,"title":"T","price":5e28},"quantity":2}]"#;
        assert!(serde_json::from_str::<CartLines>(raw).is_err());

        let negative = r#"[{"cartItemId":1,"book":{"bookId":1,"title":"T","price":-3},"quantity":2}]"#;
        assert!(serde_json::from_str::<CartLines>(negative).is_err());
    }

    #[test]
    fn largest_lines_total_without_overflow() {
        let mut lines = CartLines::new();
        let max_price = Price::new(Price::MAX).unwrap();
        for id in 0..8 {
            lines.add(
                BookSnapshot::new(BookId::new(id), "Big", "", max_price),
                Quantity::MAX,
            );
        }

        let expected = Price::MAX * Decimal::from(Quantity::MAX.get()) * Decimal::from(8u32);
        assert_eq!(lines.total(), expected);
        assert_eq!(lines.count(), 8 * u64::from(Quantity::MAX.get()));
        assert!(!lines.summary().total.is_empty());
    }

    #[test]
    fn from_items_folds_duplicate_books() {
        let a = CartItem::new(CartItemId::generate(), book(4, 100), qty(1));
        let b = CartItem::new(CartItemId::generate(), book(4, 100), qty(2));
        let first_id = a.cart_item_id;

        let lines = CartLines::from_items(vec![a, b]);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.items()[0].cart_item_id, first_id);
        assert_eq!(lines.items()[0].quantity, qty(3));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: repeated adds of one book collapse into a single line
            /// whose quantity is the sum of all added quantities.
            #[test]
            fn repeated_adds_sum_quantities(quantities in prop::collection::vec(1u32..1_000, 1..20)) {
                let mut lines = CartLines::new();
                for q in &quantities {
                    lines.add(book(42, 250), qty(*q));
                }

                let expected: u32 = quantities.iter().sum();
                prop_assert_eq!(lines.len(), 1);
                prop_assert_eq!(lines.items()[0].quantity.get(), expected);
            }

            /// Property: count and total always agree with the lines.
            #[test]
            fn count_and_total_match_lines(
                entries in prop::collection::vec((1i64..50, 0i64..100_000, 1u32..100), 0..30)
            ) {
                let mut lines = CartLines::new();
                for (id, cents, q) in &entries {
                    lines.add(book(*id, *cents), qty(*q));
                }

                let count: u64 = lines.items().iter().map(|i| u64::from(i.quantity.get())).sum();
                let total: Decimal = lines
                    .items()
                    .iter()
                    .map(|i| i.book.price.amount() * Decimal::from(i.quantity.get()))
                    .sum();

                prop_assert_eq!(lines.count(), count);
                prop_assert_eq!(lines.formatted_total(), format_amount(total));

                let mut seen = std::collections::HashSet::new();
                for item in lines.items() {
                    prop_assert!(seen.insert(item.book_id()));
                }
            }

            /// Property: decreasing a line `n` times removes it exactly when it
            /// held `n` copies.
            #[test]
            fn decrease_removes_at_zero(start in 1u32..20, steps in 1u32..25) {
                let mut lines = CartLines::new();
                let id = lines.add(book(1, 100), qty(start));
                for _ in 0..steps {
                    lines.decrease(&id);
                }

                match lines.find(&id) {
                    Some(item) => {
                        prop_assert!(steps < start);
                        prop_assert_eq!(item.quantity.get(), start - steps);
                    }
                    None => prop_assert!(steps >= start),
                }
            }
        }
    }
}
