//! Raw order request and structural validation.

use serde::{Deserialize, Serialize};

use super::{DeliverySelection, LineItem, OrderDraft, OrderError};
use crate::types::{CityId, DeliveryType, DeskId, Price, ProductId, Quantity, UserId};

/// Maximum length of a free-text client note.
pub const MAX_CLIENT_NOTE_LEN: usize = 1000;

/// Order request body as submitted by the checkout page.
///
/// Every field is optional at the serde level so that a missing field is
/// reported as `MissingRequiredField` with its JSON name instead of a
/// generic deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub total: Option<Price>,
    pub delivery_type: Option<String>,
    pub delivery_city_id: Option<i32>,
    pub delivery_desk_id: Option<i32>,
    pub address: Option<String>,
    pub client_note: Option<String>,
    pub user_id: Option<i32>,
    pub order_items: Option<Vec<RequestedLineItem>>,
}

/// One cart line as submitted by the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedLineItem {
    pub product_id: Option<i32>,
    pub quantity: Option<i64>,
    pub size: Option<String>,
    pub price: Option<Price>,
}

impl PlaceOrderRequest {
    /// Check the request shape and build an [`OrderDraft`].
    ///
    /// No store is consulted; this runs before any transaction opens.
    ///
    /// # Errors
    ///
    /// - `OrderError::MissingRequiredField` naming the JSON field.
    /// - `OrderError::InvalidField` for unusable values (unknown delivery
    ///   type, non-positive quantity, negative price, oversized note).
    pub fn into_draft(self) -> Result<OrderDraft, OrderError> {
        let raw_items = match self.order_items {
            Some(items) if !items.is_empty() => items,
            _ => return Err(OrderError::MissingRequiredField("orderItems")),
        };

        let delivery_type: DeliveryType = non_blank(self.delivery_type)
            .ok_or(OrderError::MissingRequiredField("deliveryType"))?
            .parse()
            .map_err(|e: String| OrderError::invalid("deliveryType", e))?;

        let city_id = self
            .delivery_city_id
            .map(CityId::new)
            .ok_or(OrderError::MissingRequiredField("deliveryCityId"))?;

        let delivery = match delivery_type {
            DeliveryType::Home => DeliverySelection::Home {
                city_id,
                address: non_blank(self.address)
                    .ok_or(OrderError::MissingRequiredField("address"))?,
            },
            DeliveryType::Desk => DeliverySelection::Desk {
                city_id,
                desk_id: self
                    .delivery_desk_id
                    .map(DeskId::new)
                    .ok_or(OrderError::MissingRequiredField("deliveryDeskId"))?,
            },
        };

        let client_note = non_blank(self.client_note);
        if client_note
            .as_ref()
            .is_some_and(|note| note.chars().count() > MAX_CLIENT_NOTE_LEN)
        {
            return Err(OrderError::invalid(
                "clientNote",
                format!("must be at most {MAX_CLIENT_NOTE_LEN} characters"),
            ));
        }

        let items = raw_items
            .into_iter()
            .map(RequestedLineItem::into_line_item)
            .collect::<Result<Vec<_>, _>>()?;

        if self.total.is_some_and(|total| total.is_negative()) {
            return Err(OrderError::invalid("total", "must not be negative"));
        }

        Ok(OrderDraft {
            delivery,
            client_note,
            user_id: self.user_id.map(UserId::new),
            items,
            submitted_total: self.total,
        })
    }
}

impl RequestedLineItem {
    fn into_line_item(self) -> Result<LineItem, OrderError> {
        let product_id = self
            .product_id
            .map(ProductId::new)
            .ok_or(OrderError::MissingRequiredField("productId"))?;

        let quantity = self
            .quantity
            .ok_or(OrderError::MissingRequiredField("quantity"))
            .and_then(|q| {
                Quantity::try_from(q).map_err(|e| OrderError::invalid("quantity", e.to_string()))
            })?;

        let price = self
            .price
            .ok_or(OrderError::MissingRequiredField("price"))?;
        if price.is_negative() {
            return Err(OrderError::invalid("price", "must not be negative"));
        }

        Ok(LineItem {
            product_id,
            quantity,
            size: non_blank(self.size),
            price,
        })
    }
}

/// Trim a string field and treat blank as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}
