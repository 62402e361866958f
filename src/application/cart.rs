use crate::domain::cart::{Cart, MenuItemId, MenuItemSnapshot};
use crate::domain::ports::{SharedCartStore, SharedClock};
use crate::domain::role::UserId;
use crate::error::Result;

/// Mutations on a customer's single active cart.
pub struct CartService {
    carts: SharedCartStore,
    clock: SharedClock,
}

impl CartService {
    pub fn new(carts: SharedCartStore, clock: SharedClock) -> Self {
        Self { carts, clock }
    }

    /// Returns the customer's cart, or a fresh empty one.
    pub async fn view(&self, customer: &UserId) -> Result<Cart> {
        Ok(self
            .carts
            .get(customer)
            .await?
            .unwrap_or_else(|| Cart::new(customer.clone(), self.clock.now())))
    }

    pub async fn add_item(
        &self,
        customer: &UserId,
        item: MenuItemSnapshot,
        quantity: u32,
        special_instructions: Option<String>,
    ) -> Result<Cart> {
        let mut cart = self.view(customer).await?;
        cart.add_item(item, quantity, special_instructions, self.clock.now())?;
        self.carts.put(cart.clone()).await?;
        Ok(cart)
    }

    pub async fn update_quantity(
        &self,
        customer: &UserId,
        menu_item: &MenuItemId,
        quantity: u32,
    ) -> Result<Cart> {
        let mut cart = self.view(customer).await?;
        cart.update_quantity(menu_item, quantity, self.clock.now())?;
        self.carts.put(cart.clone()).await?;
        Ok(cart)
    }

    pub async fn remove_item(&self, customer: &UserId, menu_item: &MenuItemId) -> Result<Cart> {
        let mut cart = self.view(customer).await?;
        cart.remove_item(menu_item, self.clock.now())?;
        self.carts.put(cart.clone()).await?;
        Ok(cart)
    }

    pub async fn clear(&self, customer: &UserId) -> Result<Cart> {
        let mut cart = self.view(customer).await?;
        cart.clear(self.clock.now());
        self.carts.put(cart.clone()).await?;
        Ok(cart)
    }
}
