//! Status enums for orders and delivery.
//!
//! Database enum names live in the `storefront` schema and use the same
//! `SCREAMING_SNAKE_CASE` labels as the JSON API.

use serde::{Deserialize, Serialize};

/// Call-center (fulfillment-center) progress of an order.
///
/// Every order starts as `New`; agents move it forward after phoning the
/// customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.call_center_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallCenterStatus {
    #[default]
    New,
    Confirmed,
    Cancelled,
    NoAnswer,
    Postponed,
}

/// Delivery progress of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.delivery_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    #[default]
    NotReady,
    Ready,
    Shipped,
    Delivered,
    Returned,
}

/// How the customer receives the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.delivery_type", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryType {
    /// Courier delivery to a street address.
    Home,
    /// Customer collects from a delivery desk in their city.
    Desk,
}

impl std::fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Home => write!(f, "HOME"),
            Self::Desk => write!(f, "DESK"),
        }
    }
}

impl std::str::FromStr for DeliveryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HOME" => Ok(Self::Home),
            "DESK" => Ok(Self::Desk),
            _ => Err(format!("invalid delivery type: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_order_defaults() {
        assert_eq!(CallCenterStatus::default(), CallCenterStatus::New);
        assert_eq!(DeliveryStatus::default(), DeliveryStatus::NotReady);
    }

    #[test]
    fn test_status_json_labels() {
        assert_eq!(
            serde_json::to_string(&DeliveryStatus::NotReady).unwrap(),
            "\"NOT_READY\""
        );
        assert_eq!(
            serde_json::to_string(&CallCenterStatus::NoAnswer).unwrap(),
            "\"NO_ANSWER\""
        );
    }

    #[test]
    fn test_delivery_type_parse() {
        assert_eq!("home".parse::<DeliveryType>().unwrap(), DeliveryType::Home);
        assert_eq!(" DESK ".parse::<DeliveryType>().unwrap(), DeliveryType::Desk);
        assert!("drone".parse::<DeliveryType>().is_err());
    }
}
