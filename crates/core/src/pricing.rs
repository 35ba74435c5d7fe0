//! Monetary computations for products, carts and coupons.
//!
//! Every function here is pure and total: malformed numeric input coerces to
//! zero instead of failing, and no result is ever negative. The guest preview
//! endpoint and the account cart endpoint both go through
//! [`calculate_cart_total`], so the two views cannot disagree.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Stock limit applied by [`validate_quantity`] when no explicit limit is given.
pub const DEFAULT_MAX_STOCK: u32 = 1000;

/// Decimal places kept in cart totals.
const CURRENCY_SCALE: f64 = 100.0;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// A loosely-typed numeric value as it arrives from clients or NUMERIC
/// columns: either a JSON number or a numeric string.
///
/// Absence (`null` / missing field) is modelled as `Option::None` at the use
/// site; see [`to_number`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl From<f64> for Numeric {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Numeric {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// How a product or coupon discount is applied.
///
/// Unrecognised values and `null` deserialize as [`DiscountType::None`], so an
/// unknown discount never changes a price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Fixed,
    Percentage,
    #[default]
    #[serde(other)]
    None,
}

impl DiscountType {
    /// Parse the textual form stored in the database (`none`, `fixed`,
    /// `percentage`). Anything else is treated as no discount.
    pub fn from_db(value: &str) -> Self {
        match value {
            "fixed" => Self::Fixed,
            "percentage" => Self::Percentage,
            _ => Self::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Fixed => "fixed",
            Self::Percentage => "percentage",
        }
    }
}

/// Deserialize an explicit `null` the same way as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The pricing-relevant view of a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPricing {
    #[serde(default)]
    pub price: Option<Numeric>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub discount_type: DiscountType,
    #[serde(default)]
    pub discount_value: Option<Numeric>,
}

impl ProductPricing {
    /// Build a pricing view from already-numeric values (e.g. database rows).
    pub fn new(price: f64, discount_type: DiscountType, discount_value: f64) -> Self {
        Self {
            price: Some(Numeric::Number(price)),
            discount_type,
            discount_value: Some(Numeric::Number(discount_value)),
        }
    }
}

/// The pricing-relevant view of a coupon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponPricing {
    #[serde(default, deserialize_with = "null_as_default")]
    pub discount_type: DiscountType,
    #[serde(default)]
    pub discount_value: Option<Numeric>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_active: bool,
}

/// A cart line: product pricing plus a positive quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product: ProductPricing,
    pub quantity: u32,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Cart totals, each rounded to two decimal places.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: f64,
    pub discount: f64,
    pub total: f64,
}

/// Result of [`validate_quantity`]: `error` is set exactly when `valid` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuantityCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QuantityCheck {
    fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn rejected(reason: String) -> Self {
        Self {
            valid: false,
            error: Some(reason),
        }
    }
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Coerce a loosely-typed value into a finite number.
///
/// Strings are trimmed and parsed; `None`, empty or unparseable strings and
/// non-finite results all become `0.0`.
pub fn to_number(value: Option<&Numeric>) -> f64 {
    let parsed = match value {
        Some(Numeric::Number(n)) => *n,
        Some(Numeric::Text(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        None => 0.0,
    };
    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

/// Round a monetary amount to two decimal places (half away from zero).
pub fn round_currency(amount: f64) -> f64 {
    (amount * CURRENCY_SCALE).round() / CURRENCY_SCALE
}

// ---------------------------------------------------------------------------
// Price calculation
// ---------------------------------------------------------------------------

/// Effective unit price after the product-level discount. Never negative.
pub fn calculate_product_price(product: &ProductPricing) -> f64 {
    let price = to_number(product.price.as_ref());
    let discount_value = to_number(product.discount_value.as_ref());

    let discounted = match product.discount_type {
        DiscountType::Percentage => price - price * discount_value / 100.0,
        DiscountType::Fixed => price - discount_value,
        DiscountType::None => price,
    };
    discounted.max(0.0)
}

/// Sum of effective unit price times quantity over all lines.
pub fn calculate_items_total(items: &[LineItem]) -> f64 {
    items
        .iter()
        .map(|item| calculate_product_price(&item.product) * f64::from(item.quantity))
        .sum()
}

/// Discount granted by a coupon on the given subtotal.
///
/// Absent or inactive coupons grant nothing. A fixed coupon never discounts
/// more than the subtotal.
pub fn calculate_coupon_discount(subtotal: f64, coupon: Option<&CouponPricing>) -> f64 {
    let Some(coupon) = coupon.filter(|c| c.is_active) else {
        return 0.0;
    };
    let value = to_number(coupon.discount_value.as_ref());

    match coupon.discount_type {
        DiscountType::Percentage => subtotal * value / 100.0,
        DiscountType::Fixed => value.min(subtotal),
        DiscountType::None => 0.0,
    }
}

/// Subtotal, coupon discount and total for a cart.
pub fn calculate_cart_total(items: &[LineItem], coupon: Option<&CouponPricing>) -> CartTotals {
    let subtotal = calculate_items_total(items);
    let discount = calculate_coupon_discount(subtotal, coupon);
    let total = (subtotal - discount).max(0.0);

    CartTotals {
        subtotal: round_currency(subtotal),
        discount: round_currency(discount),
        total: round_currency(total),
    }
}

// ---------------------------------------------------------------------------
// Quantity validation
// ---------------------------------------------------------------------------

/// Validate a requested quantity against [`DEFAULT_MAX_STOCK`].
pub fn validate_quantity(quantity: f64) -> QuantityCheck {
    validate_quantity_with_limit(quantity, DEFAULT_MAX_STOCK)
}

/// Validate a requested quantity against an explicit stock limit.
///
/// Rules, in order:
/// - Must be strictly positive.
/// - Must be a whole number.
/// - Must not exceed `max_stock`.
pub fn validate_quantity_with_limit(quantity: f64, max_stock: u32) -> QuantityCheck {
    if quantity.is_nan() || quantity <= 0.0 {
        return QuantityCheck::rejected("Quantity must be positive".to_string());
    }
    if quantity.fract() != 0.0 {
        return QuantityCheck::rejected("Quantity must be a whole number".to_string());
    }
    if quantity > f64::from(max_stock) {
        return QuantityCheck::rejected(format!(
            "Quantity cannot exceed {max_stock} (stock limit)"
        ));
    }
    QuantityCheck::ok()
}

/// Same rules as [`validate_quantity_with_limit`], surfaced as a
/// [`CoreError::Validation`] and returning the quantity as an integer.
pub fn require_valid_quantity(quantity: f64, max_stock: u32) -> Result<u32, CoreError> {
    let check = validate_quantity_with_limit(quantity, max_stock);
    match check.error {
        Some(reason) => Err(CoreError::Validation(reason)),
        // Whole, positive and bounded by a u32 limit.
        None => Ok(quantity as u32),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
