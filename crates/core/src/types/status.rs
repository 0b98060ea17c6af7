//! Status enums shared across the storefront.

use serde::{Deserialize, Serialize};

/// How an order is paid.
///
/// `Cod` settles immediately at order creation (cash on delivery); `VnPay`
/// requires redirection to a hosted payment page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    Cod,
    /// Hosted VNPay payment page.
    Vnpay,
}

impl PaymentMethod {
    /// Whether this method settles at order creation, without an external
    /// payment step.
    #[must_use]
    pub const fn settles_immediately(&self) -> bool {
        matches!(self, Self::Cod)
    }
}

/// How an order is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    /// 3-5 business days.
    #[default]
    Standard,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_serde() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Cod).unwrap(),
            "\"COD\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Vnpay).unwrap(),
            "\"VNPAY\""
        );
        let m: PaymentMethod = serde_json::from_str("\"VNPAY\"").unwrap();
        assert_eq!(m, PaymentMethod::Vnpay);
    }

    #[test]
    fn test_settles_immediately() {
        assert!(PaymentMethod::Cod.settles_immediately());
        assert!(!PaymentMethod::Vnpay.settles_immediately());
    }

    #[test]
    fn test_delivery_method_serde() {
        assert_eq!(
            serde_json::to_string(&DeliveryMethod::Standard).unwrap(),
            "\"standard\""
        );
    }
}
