use crate::api::{ProductId, ProductSummary};

pub const SIZES: [&str; 5] = ["XS", "S", "M", "L", "XL"];
pub const COLORS: [&str; 4] = ["Black", "White", "Grey", "Blue"];

#[derive(Debug, Clone, PartialEq)]
pub struct CartItem {
    pub product: ProductSummary,
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl CartItem {
    fn is_line(&self, product_id: ProductId, size: Option<&str>, color: Option<&str>) -> bool {
        self.product.product_id == product_id
            && self.size.as_deref() == size
            && self.color.as_deref() == color
    }

    pub fn subtotal(&self) -> f64 {
        self.product.product_price * f64::from(self.quantity)
    }

    /// "Size: M | Color: Black", or an empty string for a plain line.
    pub fn variant_label(&self) -> String {
        let size = self.size.as_deref().map(|size| format!("Size: {size}"));
        let color = self.color.as_deref().map(|color| format!("Color: {color}"));
        [size, color].into_iter().flatten().collect::<Vec<_>>().join(" | ")
    }
}

/// Cart lines are keyed by product, size and color; adding an existing
/// line merges quantities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn add(
        &mut self,
        product: ProductSummary,
        quantity: u32,
        size: Option<String>,
        color: Option<String>,
    ) {
        if quantity == 0 {
            return;
        }
        let existing = self.items.iter_mut().find(|item| {
            item.is_line(product.product_id, size.as_deref(), color.as_deref())
        });
        match existing {
            Some(item) => item.quantity = item.quantity.saturating_add(quantity),
            None => self.items.push(CartItem {
                product,
                quantity,
                size,
                color,
            }),
        }
    }

    pub fn remove(&mut self, product_id: ProductId, size: Option<&str>, color: Option<&str>) {
        self.items
            .retain(|item| !item.is_line(product_id, size, color));
    }

    pub fn update_quantity(
        &mut self,
        product_id: ProductId,
        size: Option<&str>,
        color: Option<&str>,
        quantity: u32,
    ) {
        if quantity == 0 {
            self.remove(product_id, size, color);
            return;
        }
        if let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.is_line(product_id, size, color))
        {
            item.quantity = quantity;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn total(&self) -> f64 {
        self.items.iter().map(CartItem::subtotal).sum()
    }

    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |count, item| count.saturating_add(item.quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::Cart;
    use crate::api::ProductSummary;

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

    fn m() -> Option<String> {
        Some("M".to_string())
    }

    #[test]
    fn same_line_merges_and_different_size_splits() {
        let mut cart = Cart::default();
        cart.add(product(1, 20.0), 1, m(), None);
        cart.add(product(1, 20.0), 2, m(), None);
        cart.add(product(1, 20.0), 1, Some("L".to_string()), None);

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.items()[0].quantity, 3);
        assert_eq!(cart.items()[1].variant_label(), "Size: L");
        assert_eq!(cart.item_count(), 4);
        assert!((cart.total() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn update_and_remove_target_a_single_line() {
        let mut cart = Cart::default();
        cart.add(product(1, 10.0), 1, m(), None);
        cart.add(product(2, 5.5), 2, None, Some("red".to_string()));

        cart.update_quantity(2, None, Some("red"), 4);
        assert_eq!(cart.items()[1].quantity, 4);
        assert!((cart.total() - 32.0).abs() < 1e-9);

        cart.update_quantity(2, None, Some("blue"), 9);
        assert_eq!(cart.items()[1].quantity, 4);

        cart.remove(1, Some("M"), None);
        assert_eq!(cart.items().len(), 1);

        cart.update_quantity(2, None, Some("red"), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn zero_quantity_add_is_ignored_and_clear_empties() {
        let mut cart = Cart::default();
        cart.add(product(1, 10.0), 0, None, None);
        assert!(cart.is_empty());

        cart.add(product(1, 10.0), 1, None, None);
        cart.clear();
        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.total(), 0.0);
    }
}
