use super::money::{Amount, Money};
use super::role::UserId;
use crate::error::OrderError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuItemId(pub String);

impl MenuItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for MenuItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the menu catalogue hands over when an item is put in a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItemSnapshot {
    pub id: MenuItemId,
    pub name: String,
    pub unit_price: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub menu_item: MenuItemId,
    pub name: String,
    pub quantity: u32,
    pub special_instructions: Option<String>,
    pub price: Money,
    pub total_price: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    Active,
    Ordered,
    Abandoned,
}

/// A customer's single cart. The subtotal is recomputed by every mutator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub customer: UserId,
    pub items: Vec<CartItem>,
    pub status: CartStatus,
    pub subtotal: Money,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(customer: UserId, now: DateTime<Utc>) -> Self {
        Self {
            customer,
            items: Vec::new(),
            status: CartStatus::Active,
            subtotal: Money::ZERO,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds `quantity` of an item. Lines for the same menu item are merged.
    pub fn add_item(
        &mut self,
        item: MenuItemSnapshot,
        quantity: u32,
        special_instructions: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if quantity == 0 {
            return Err(OrderError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }
        let reset = self.status != CartStatus::Active;
        let existing = if reset {
            None
        } else {
            self.items.iter().position(|line| line.menu_item == item.id)
        };
        let price: Money = item.unit_price.into();
        let merged_quantity = match existing {
            Some(index) => self.items[index]
                .quantity
                .checked_add(quantity)
                .ok_or_else(|| OrderError::Validation("quantity is too large".to_string()))?,
            None => quantity,
        };
        let total_price = price.checked_mul(merged_quantity)?;
        let kept: &[CartItem] = if reset { &[] } else { &self.items };
        let subtotal = subtotal_with(kept, &item.id, total_price)?;

        if reset {
            self.items.clear();
            self.status = CartStatus::Active;
        }
        match existing {
            Some(index) => {
                let line = &mut self.items[index];
                line.quantity = merged_quantity;
                line.price = price;
                line.total_price = total_price;
                if special_instructions.is_some() {
                    line.special_instructions = special_instructions;
                }
            }
            None => self.items.push(CartItem {
                menu_item: item.id,
                name: item.name,
                quantity,
                special_instructions,
                price,
                total_price,
            }),
        }
        self.subtotal = subtotal;
        self.updated_at = now;
        Ok(())
    }

    /// Sets a line's quantity. Zero removes the line.
    pub fn update_quantity(
        &mut self,
        menu_item: &MenuItemId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if quantity == 0 {
            return self.remove_item(menu_item, now);
        }
        let index = self
            .items
            .iter()
            .position(|line| &line.menu_item == menu_item)
            .ok_or_else(|| OrderError::not_found("Cart item", menu_item))?;
        let total_price = self.items[index].price.checked_mul(quantity)?;
        let subtotal = subtotal_with(&self.items, menu_item, total_price)?;

        let line = &mut self.items[index];
        line.quantity = quantity;
        line.total_price = total_price;
        self.subtotal = subtotal;
        self.updated_at = now;
        Ok(())
    }

    pub fn remove_item(&mut self, menu_item: &MenuItemId, now: DateTime<Utc>) -> Result<(), OrderError> {
        let before = self.items.len();
        self.items.retain(|line| &line.menu_item != menu_item);
        if self.items.len() == before {
            return Err(OrderError::not_found("Cart item", menu_item));
        }
        self.touch(now);
        Ok(())
    }

    pub fn clear(&mut self, now: DateTime<Utc>) {
        self.items.clear();
        self.touch(now);
    }

    /// Hands the cart's contents over to a freshly created order.
    pub fn mark_ordered(&mut self, now: DateTime<Utc>) {
        self.items.clear();
        self.status = CartStatus::Ordered;
        self.touch(now);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.subtotal = self.items.iter().map(|line| line.total_price).sum();
        self.updated_at = now;
    }
}

/// Subtotal after `menu_item`'s line is replaced by one totalling `line_total`.
fn subtotal_with(
    items: &[CartItem],
    menu_item: &MenuItemId,
    line_total: Money,
) -> Result<Money, OrderError> {
    items
        .iter()
        .filter(|line| &line.menu_item != menu_item)
        .try_fold(line_total, |acc, line| acc.checked_add(line.total_price))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn item(id: &str, price: Decimal) -> MenuItemSnapshot {
        MenuItemSnapshot {
            id: MenuItemId::new(id),
            name: format!("dish {id}"),
            unit_price: Amount::new(price).unwrap(),
        }
    }

    fn cart() -> Cart {
        Cart::new(UserId::new("cust-1"), Utc::now())
    }

    #[test]
    fn test_subtotal_tracks_every_mutation() {
        let mut cart = cart();
        cart.add_item(item("injera", dec!(12.50)), 4, None, Utc::now())
            .unwrap();
        cart.add_item(item("tibs", dec!(30)), 1, None, Utc::now())
            .unwrap();
        assert_eq!(cart.subtotal, Money::new(dec!(80)));

        cart.update_quantity(&MenuItemId::new("tibs"), 2, Utc::now())
            .unwrap();
        assert_eq!(cart.subtotal, Money::new(dec!(110)));

        cart.remove_item(&MenuItemId::new("injera"), Utc::now())
            .unwrap();
        assert_eq!(cart.subtotal, Money::new(dec!(60)));
    }

    #[test]
    fn test_same_item_lines_are_merged() {
        let mut cart = cart();
        cart.add_item(item("doro", dec!(20)), 1, None, Utc::now())
            .unwrap();
        cart.add_item(item("doro", dec!(20)), 2, Some("extra spicy".into()), Utc::now())
            .unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.items[0].total_price, Money::new(dec!(60)));
        assert_eq!(
            cart.items[0].special_instructions.as_deref(),
            Some("extra spicy")
        );
    }

    #[test]
    fn test_zero_quantity_is_rejected_on_add() {
        let mut cart = cart();
        let result = cart.add_item(item("doro", dec!(20)), 0, None, Utc::now());
        assert!(matches!(result, Err(OrderError::Validation(_))));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_zero_quantity_update_removes_line() {
        let mut cart = cart();
        cart.add_item(item("doro", dec!(20)), 1, None, Utc::now())
            .unwrap();
        cart.update_quantity(&MenuItemId::new("doro"), 0, Utc::now())
            .unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal, Money::ZERO);
    }

    #[test]
    fn test_mark_ordered_empties_cart() {
        let mut cart = cart();
        cart.add_item(item("doro", dec!(20)), 1, None, Utc::now())
            .unwrap();
        cart.mark_ordered(Utc::now());
        assert!(cart.is_empty());
        assert_eq!(cart.status, CartStatus::Ordered);
        assert_eq!(cart.subtotal, Money::ZERO);
    }

    #[test]
    fn test_ordered_cart_reactivates_on_add() {
        let mut cart = cart();
        cart.mark_ordered(Utc::now());
        cart.add_item(item("doro", dec!(20)), 1, None, Utc::now())
            .unwrap();
        assert_eq!(cart.status, CartStatus::Active);
        assert_eq!(cart.items.len(), 1);
    }

    #[test]
    fn test_quantity_overflow_leaves_cart_untouched() {
        let mut cart = cart();
        cart.add_item(item("injera", dec!(0.01)), u32::MAX, None, Utc::now())
            .unwrap();
        let before = cart.clone();

        let result = cart.add_item(item("injera", dec!(0.01)), 1, None, Utc::now());
        assert!(matches!(result, Err(OrderError::Validation(_))));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_price_overflow_is_rejected() {
        let mut cart = cart();
        let result = cart.add_item(item("gold", Decimal::MAX), 2, None, Utc::now());
        assert!(matches!(result, Err(OrderError::Validation(_))));
        assert!(cart.is_empty());

        cart.add_item(item("gold", Decimal::MAX), 1, None, Utc::now())
            .unwrap();
        let result = cart.update_quantity(&MenuItemId::new("gold"), 2, Utc::now());
        assert!(matches!(result, Err(OrderError::Validation(_))));
        assert_eq!(cart.items[0].quantity, 1);
    }

    #[test]
    fn test_subtotal_overflow_is_rejected() {
        let mut cart = cart();
        cart.add_item(item("gold", Decimal::MAX), 1, None, Utc::now())
            .unwrap();
        let result = cart.add_item(item("silver", dec!(1)), 1, None, Utc::now());
        assert!(matches!(result, Err(OrderError::Validation(_))));
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.subtotal, Money::new(Decimal::MAX));
    }

    #[test]
    fn test_unknown_line_update_is_not_found() {
        let mut cart = cart();
        let result = cart.update_quantity(&MenuItemId::new("ghost"), 3, Utc::now());
        assert!(matches!(result, Err(OrderError::NotFound { .. })));
    }
}
