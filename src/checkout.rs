use crate::cart::Cart;
use crate::error::CheckoutError;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

pub const FREE_SHIPPING_THRESHOLD: f64 = 50.0;
pub const SHIPPING_FEE: f64 = 4.95;
const ORDER_NUMBER_LEN: usize = 9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Country {
    #[default]
    Spain,
    Portugal,
    France,
    Italy,
}

impl Country {
    pub const ALL: [Country; 4] = [
        Country::Spain,
        Country::Portugal,
        Country::France,
        Country::Italy,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spain => "Spain",
            Self::Portugal => "Portugal",
            Self::France => "France",
            Self::Italy => "Italy",
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contact and shipping details. Every text field is required.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckoutForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: Country,
}

impl CheckoutForm {
    pub fn validate(&self) -> Result<(), CheckoutError> {
        let required = [
            ("name", &self.name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("address", &self.address),
            ("city", &self.city),
            ("postal code", &self.postal_code),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(CheckoutError::MissingField(*field));
        }
        if !looks_like_email(self.email.trim()) {
            return Err(CheckoutError::InvalidEmail(self.email.trim().to_string()));
        }
        Ok(())
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderSummary {
    pub subtotal: f64,
    pub shipping: f64,
    pub total: f64,
}

impl OrderSummary {
    pub fn for_cart(cart: &Cart) -> Self {
        let subtotal = cart.total();
        let shipping = shipping_for(subtotal);
        Self {
            subtotal,
            shipping,
            total: subtotal + shipping,
        }
    }

    pub fn free_shipping(&self) -> bool {
        self.shipping == 0.0
    }
}

/// Shipping is free strictly above the threshold.
pub fn shipping_for(subtotal: f64) -> f64 {
    if subtotal > FREE_SHIPPING_THRESHOLD {
        0.0
    } else {
        SHIPPING_FEE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderReceipt {
    pub order_number: String,
    pub email: String,
    pub summary: OrderSummary,
    pub item_count: u32,
}

/// Validates the form, totals the cart and empties it. The cart is left
/// untouched when the order is rejected.
pub fn place_order(form: &CheckoutForm, cart: &mut Cart) -> Result<OrderReceipt, CheckoutError> {
    place_order_at(form, cart, unix_nanos())
}

fn place_order_at(
    form: &CheckoutForm,
    cart: &mut Cart,
    placed_at: u128,
) -> Result<OrderReceipt, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    form.validate()?;

    let receipt = OrderReceipt {
        order_number: order_number(placed_at),
        email: form.email.trim().to_string(),
        summary: OrderSummary::for_cart(cart),
        item_count: cart.item_count(),
    };
    cart.clear();
    info!(
        order = %receipt.order_number,
        items = receipt.item_count,
        total = receipt.summary.total,
        country = %form.country,
        "order placed"
    );
    Ok(receipt)
}

fn unix_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_nanos())
        .unwrap_or_default()
}

fn order_number(seed: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut value = seed;
    let mut digits = Vec::with_capacity(ORDER_NUMBER_LEN);
    for _ in 0..ORDER_NUMBER_LEN {
        digits.push(char::from(DIGITS[(value % 36) as usize]));
        value /= 36;
    }
    digits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::{
        order_number, place_order_at, shipping_for, CheckoutForm, Country, OrderSummary,
        SHIPPING_FEE,
    };
    use crate::api::ProductSummary;
    use crate::cart::Cart;
    use crate::error::CheckoutError;

    fn product(id: i64, price: f64) -> ProductSummary {
        ProductSummary {
            product_id: id,
            product_name: format!("Product {id}"),
            product_description: None,
            product_price: price,
            product_images_urls: Vec::new(),
            product_rank: None,
            product_characteristics: Vec::new(),
        }
    }

    fn filled_form() -> CheckoutForm {
        CheckoutForm {
            name: "Ana Ruiz".to_string(),
            email: "ana@example.com".to_string(),
            phone: "600000000".to_string(),
            address: "Calle Mayor 1".to_string(),
            city: "Madrid".to_string(),
            postal_code: "28013".to_string(),
            country: Country::Spain,
        }
    }

    #[test]
    fn shipping_is_free_only_above_threshold() {
        assert_eq!(shipping_for(50.01), 0.0);
        assert_eq!(shipping_for(50.0), SHIPPING_FEE);
        assert_eq!(shipping_for(0.0), SHIPPING_FEE);
    }

    #[test]
    fn summary_adds_shipping_to_small_orders() {
        let mut cart = Cart::default();
        cart.add(product(1, 20.0), 2, Some("M".to_string()), Some("Black".to_string()));
        let summary = OrderSummary::for_cart(&cart);
        assert!((summary.subtotal - 40.0).abs() < 1e-9);
        assert!((summary.total - 44.95).abs() < 1e-9);
        assert!(!summary.free_shipping());

        cart.add(product(2, 15.0), 1, None, None);
        let summary = OrderSummary::for_cart(&cart);
        assert!(summary.free_shipping());
        assert!((summary.total - 55.0).abs() < 1e-9);
    }

    #[test]
    fn every_contact_and_address_field_is_required() {
        assert_eq!(filled_form().validate(), Ok(()));

        let mut form = filled_form();
        form.city = "   ".to_string();
        assert_eq!(form.validate(), Err(CheckoutError::MissingField("city")));

        let mut form = filled_form();
        form.postal_code.clear();
        assert_eq!(
            form.validate(),
            Err(CheckoutError::MissingField("postal code"))
        );

        let mut form = filled_form();
        form.email = "ana.example.com".to_string();
        assert!(matches!(form.validate(), Err(CheckoutError::InvalidEmail(_))));
    }

    #[test]
    fn successful_order_clears_the_cart() {
        let mut cart = Cart::default();
        cart.add(product(1, 30.0), 2, Some("S".to_string()), Some("Blue".to_string()));

        let receipt =
            place_order_at(&filled_form(), &mut cart, 123_456_789).expect("order should be placed");
        assert!(cart.is_empty());
        assert_eq!(receipt.item_count, 2);
        assert_eq!(receipt.email, "ana@example.com");
        assert!(receipt.summary.free_shipping());
        assert!((receipt.summary.total - 60.0).abs() < 1e-9);
        assert_eq!(receipt.order_number, order_number(123_456_789));
        assert_eq!(receipt.order_number.len(), 9);
    }

    #[test]
    fn rejected_order_keeps_the_cart() {
        let mut cart = Cart::default();
        assert_eq!(
            place_order_at(&filled_form(), &mut cart, 1),
            Err(CheckoutError::EmptyCart)
        );

        cart.add(product(1, 10.0), 1, None, None);
        let mut form = filled_form();
        form.phone.clear();
        assert_eq!(
            place_order_at(&form, &mut cart, 1),
            Err(CheckoutError::MissingField("phone"))
        );
        assert_eq!(cart.item_count(), 1);
    }
}
