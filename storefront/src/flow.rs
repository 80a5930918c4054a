use crate::cart::CartView;
use crate::client::ShopClient;
use crate::error::ClientError;
use crate::session::SessionStore;
use common::api::{MeOut, ModelId, OrderOut, PaymentCreateIn, PaymentCreateOut, PaymentOut, ProductOut};
use common::phone::PhoneNumber;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    GoToPayment,
}

/// Actions offered next to an order. Only a `CREATED` order can be paid.
pub fn order_actions(order: &OrderOut) -> Vec<OrderAction> {
    if order.status.is_payable() {
        vec![OrderAction::GoToPayment]
    } else {
        vec![]
    }
}

/// Storefront session: the REST client plus the persisted token, cart and checkout draft.
pub struct Storefront {
    client: ShopClient,
    session: SessionStore,
}

impl Storefront {
    pub fn new(client: ShopClient, session: SessionStore) -> Self {
        Self { client, session }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionStore {
        &mut self.session
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.token().is_some()
    }

    fn require_token(&self) -> Result<String, ClientError> {
        self.session
            .token()
            .map(str::to_string)
            .ok_or(ClientError::NotLoggedIn)
    }

    /// Drops the stored token when a service rejected it.
    fn forget_expired<T>(&mut self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Err(ClientError::SessionExpired) = &result {
            warn!("Clearing expired session token");
            self.session.set_token(None)?;
        }
        result
    }

    pub async fn register(&mut self, email: &str, password: &str) -> Result<MeOut, ClientError> {
        let user = self.client.register(email, password).await?;
        info!(user_id = user.id, "Registered");
        Ok(user)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), ClientError> {
        let token = self.client.login(email, password).await?;
        self.session.set_token(Some(token.access_token))?;
        info!("Logged in");
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), ClientError> {
        self.session.set_token(None)
    }

    pub async fn me(&mut self) -> Result<MeOut, ClientError> {
        let token = self.require_token()?;
        let result = self.client.me(&token).await;
        self.forget_expired(result)
    }

    pub async fn products(&self) -> Result<Vec<ProductOut>, ClientError> {
        self.client.list_products().await
    }

    /// Cart priced against the published catalogue.
    pub async fn cart_view(&self) -> Result<CartView, ClientError> {
        let products = self.client.list_products().await?;
        Ok(self.session.cart().enrich(&products))
    }

    pub fn add_to_cart(&mut self, product_id: ModelId, qty: i64) -> Result<(), ClientError> {
        self.session.update_cart(|cart| cart.add(product_id, qty))
    }

    pub fn set_cart_quantity(&mut self, product_id: ModelId, raw_qty: &str) -> Result<bool, ClientError> {
        self.session.update_cart(|cart| cart.set_quantity(product_id, raw_qty))
    }

    pub fn remove_from_cart(&mut self, product_id: ModelId) -> Result<bool, ClientError> {
        self.session.update_cart(|cart| cart.remove(product_id))
    }

    pub fn clear_cart(&mut self) -> Result<(), ClientError> {
        self.session.update_cart(|cart| cart.clear())
    }

    /// Turns the cart into an order. The cart is emptied only once the order exists.
    pub async fn checkout(&mut self) -> Result<OrderOut, ClientError> {
        let token = self.require_token()?;
        if self.session.cart().is_empty() {
            return Err(ClientError::EmptyCart);
        }

        let request = self.session.cart().to_order_request();
        let result = self.client.create_order(&token, &request).await;
        let order = self.forget_expired(result)?;

        self.session.update_cart(|cart| cart.clear())?;
        info!(order_id = order.id, "Order created");
        Ok(order)
    }

    /// Pays for an order with the given shipping details.
    ///
    /// The draft is saved before anything is checked so a failed attempt can be retried
    /// without retyping; it is cleared once the payment is accepted.
    pub async fn pay(&mut self, order_id: ModelId, address: &str, phone: &str) -> Result<PaymentCreateOut, ClientError> {
        self.session.set_draft(address, phone)?;
        let token = self.require_token()?;

        let address = address.trim();
        if address.is_empty() {
            return Err(ClientError::validation("Shipping address is required"));
        }
        let phone = PhoneNumber::parse(phone).map_err(|_| ClientError::validation("Invalid phone number"))?;

        let result = self.client.get_order(&token, order_id).await;
        let order = self.forget_expired(result)?;
        if !order.status.is_payable() {
            return Err(ClientError::validation(format!(
                "Order #{} cannot be paid in status {}",
                order.id, order.status
            )));
        }

        let payment = PaymentCreateIn {
            shipping_address: address.to_string(),
            phone_number: phone.into_string(),
        };
        let result = self.client.create_payment(&token, order_id, &payment).await;
        let created = self.forget_expired(result)?;

        self.session.clear_draft()?;
        info!(order_id, payment_id = created.payment_id, "Payment accepted");
        Ok(created)
    }

    pub async fn orders(&mut self) -> Result<Vec<OrderOut>, ClientError> {
        let token = self.require_token()?;
        let result = self.client.list_orders(&token).await;
        self.forget_expired(result)
    }

    pub async fn order(&mut self, order_id: ModelId) -> Result<OrderOut, ClientError> {
        let token = self.require_token()?;
        let result = self.client.get_order(&token, order_id).await;
        self.forget_expired(result)
    }

    pub async fn payments(&mut self) -> Result<Vec<PaymentOut>, ClientError> {
        let token = self.require_token()?;
        let result = self.client.list_payments(&token).await;
        self.forget_expired(result)
    }
}
