use serde::{Deserialize, Serialize};

use bookstore_core::{BookId, Price, ValueObject};

/// Catalog data copied into a cart line when the book is added.
///
/// The cart never re-validates price or availability against the catalog; the
/// snapshot is what the shopper saw. Extra catalog fields sent by the backend
/// (description, isbn, genres, stock) are ignored on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSnapshot {
    pub book_id: BookId,
    pub title: String,
    #[serde(default)]
    pub author: String,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ValueObject for BookSnapshot {}

impl BookSnapshot {
    pub fn new(book_id: BookId, title: impl Into<String>, author: impl Into<String>, price: Price) -> Self {
        Self {
            book_id,
            title: title.into(),
            author: author.into(),
            price,
            image_url: None,
        }
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}
