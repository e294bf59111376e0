use crate::model::SessionLineItem;
use crate::payment::to_minor_units;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line of a shopping cart. Unique by `line_id`; uniqueness by product
/// is maintained by [`Cart::add`], which collapses repeat products into the
/// existing line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLineItem {
    pub line_id: Uuid,
    pub product_id: Uuid,
    pub title: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub image_ref: Option<String>,
    pub seller_id: Uuid,
}

/// In-memory ordered cart state for one shopping session.
///
/// Pure state transitions only; persistence and checkout I/O live elsewhere.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    items: Vec<CartLineItem>,
}

/// Insert payload for [`Cart::add`]; the cart assigns the `line_id`.
#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub product_id: Uuid,
    pub title: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub image_ref: Option<String>,
    pub seller_id: Uuid,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item. If the product is already in the cart the quantities are
    /// summed on the existing line and its `line_id` is returned; otherwise a
    /// new line is appended at the end.
    pub fn add(&mut self, new_item: NewCartItem) -> Uuid {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|item| item.product_id == new_item.product_id)
        {
            existing.quantity = existing.quantity.saturating_add(new_item.quantity);
            return existing.line_id;
        }

        let line_id = Uuid::new_v4();
        self.items.push(CartLineItem {
            line_id,
            product_id: new_item.product_id,
            title: new_item.title,
            unit_price: new_item.unit_price,
            quantity: new_item.quantity,
            image_ref: new_item.image_ref,
            seller_id: new_item.seller_id,
        });
        line_id
    }

    /// Remove a line entirely. Unknown ids are a no-op.
    pub fn remove(&mut self, line_id: Uuid) {
        self.items.retain(|item| item.line_id != line_id);
    }

    /// Set a line's quantity. A quantity of zero removes the line, keeping
    /// the `quantity >= 1` invariant for every line that stays.
    pub fn update_quantity(&mut self, line_id: Uuid, quantity: u32) {
        if quantity == 0 {
            self.remove(line_id);
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|item| item.line_id == line_id) {
            item.quantity = quantity;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Sum of unit_price x quantity across all lines, in major units.
    pub fn total(&self) -> Decimal {
        self.items
            .iter()
            .map(|item| item.unit_price * Decimal::from(item.quantity))
            .sum()
    }

    /// Render the cart as gateway line items with minor-unit amounts, for a
    /// payment session request. Fails if any unit price has sub-minor-unit
    /// precision.
    pub fn session_items(&self) -> Result<Vec<SessionLineItem>, crate::error::ServiceError> {
        self.items
            .iter()
            .map(|item| {
                Ok(SessionLineItem {
                    name: item.title.clone(),
                    amount_cents: to_minor_units(&item.unit_price)?,
                    quantity: i64::from(item.quantity),
                })
            })
            .collect()
    }
}
