//! In-memory shopping cart.
//!
//! A `Cart` is an owned value living inside a session, not shared state: it is
//! created empty when the session starts and dropped with it. Lines borrow the
//! book's identity and cache the display fields as they were at insertion.

use crate::models::{Book, BookId};

/// One book-plus-quantity entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub id: BookId,
    pub quantity: i64,
    pub title: String,
    pub author: String,
    /// Kept as `None` when the book has no price, so the UI can show
    /// "price unavailable" while totals count it as zero
    pub price: Option<f64>,
    pub image: Option<String>,
}

/// Acknowledgment returned by checkout before the cart is cleared.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub total: f64,
    pub lines: usize,
}

/// The working set of a shopping session.
#[derive(Debug, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add a book: an existing line gains one unit, otherwise a new line is
    /// inserted with quantity 1 and the book's display fields copied over.
    pub fn add(&mut self, book: &Book) {
        if let Some(line) = self.lines.iter_mut().find(|line| line.id == book.id) {
            line.quantity += 1;
            return;
        }
        self.lines.push(CartLine {
            id: book.id,
            quantity: 1,
            title: book.title.clone(),
            author: book.author.clone(),
            price: book.price,
            image: book.image.clone(),
        });
    }

    /// Adjust a line's quantity by `delta`, clamped so it never drops below 1.
    /// Removing a line goes through `remove`, not through this path.
    pub fn update_quantity(&mut self, id: BookId, delta: i64) {
        if let Some(line) = self.lines.iter_mut().find(|line| line.id == id) {
            line.quantity = (line.quantity + delta).max(1);
        }
    }

    /// Drop a line unconditionally, whatever its quantity.
    pub fn remove(&mut self, id: BookId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.id != id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of `price * quantity` over all lines; a missing price counts as 0.
    pub fn total(&self) -> f64 {
        self.lines
            .iter()
            .map(|line| line.price.unwrap_or(0.0) * line.quantity as f64)
            .sum()
    }

    /// Purely local checkout: returns the summary and empties the cart.
    /// No order record is written and no payment happens.
    pub fn checkout(&mut self) -> Receipt {
        let receipt = Receipt {
            total: self.total(),
            lines: self.lines.len(),
        };
        self.clear();
        receipt
    }
}
