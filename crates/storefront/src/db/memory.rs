//! In-process inventory store.
//!
//! All state sits behind one mutex, and `commit_order` checks and applies
//! every effect while holding it, so concurrent orders serialize exactly as
//! they would on locked product rows. The mutex is never held across an
//! `.await`.
//!
//! Used by the test suites and by `STOREFRONT_INVENTORY_BACKEND=memory`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use souk_core::{
    CallCenterStatus, CatalogReader, CategoryId, City, CityId, DeliveryDesk, DeliverySelection,
    DeliveryStatus, DeskId, InventoryReports, InventoryStore, LowStockProduct, Order,
    OrderDraft, OrderError, OrderId, OrderItem, OrderItemId, OrderReceipt, OrderStatusCount,
    OrderedProduct, Price, ProductId, ProductSnapshot, SoldProduct, StoreError,
};

use super::seed::{CatalogSeed, SeedError};

/// Inventory store that keeps everything in memory.
///
/// Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct MemoryInventoryStore {
    state: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    categories: BTreeMap<CategoryId, String>,
    products: BTreeMap<ProductId, ProductRecord>,
    cities: BTreeMap<CityId, CityRecord>,
    desks: BTreeMap<DeskId, DeliveryDesk>,
    orders: BTreeMap<OrderId, Order>,
    last_id: i32,
    unavailable: bool,
    commit_delay: Option<Duration>,
}

struct ProductRecord {
    name: String,
    reference: String,
    category_id: CategoryId,
    price: Price,
    stock: i32,
}

struct CityRecord {
    name: String,
    home_delivery_fee: Price,
}

impl State {
    /// Ids come from one sequence; each table only needs uniqueness.
    const fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Backend(Box::new(std::io::Error::other(
                "memory store is unavailable",
            ))));
        }
        Ok(())
    }
}

impl MemoryInventoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from seed data.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Invalid` if the seed fails validation.
    pub fn from_seed(seed: &CatalogSeed) -> Result<Self, SeedError> {
        let errors = seed.validate();
        if !errors.is_empty() {
            return Err(SeedError::Invalid(errors));
        }

        let store = Self::new();
        let categories: HashMap<&str, CategoryId> = seed
            .categories
            .iter()
            .map(|c| (c.name.as_str(), store.add_category(&c.name)))
            .collect();

        for product in &seed.products {
            if let Some(&category) = categories.get(product.category.as_str()) {
                store.add_product(
                    category,
                    &product.name,
                    &product.reference,
                    product.price,
                    product.stock,
                );
            }
        }

        for city in &seed.cities {
            let city_id = store.add_city(&city.name, city.home_delivery_fee);
            for desk in &city.desks {
                store.add_desk(city_id, &desk.name, desk.address.as_deref(), desk.fee);
            }
        }

        Ok(store)
    }

    /// Add a category and return its id.
    pub fn add_category(&self, name: &str) -> CategoryId {
        let mut state = self.state.lock();
        let id = CategoryId::new(state.next_id());
        state.categories.insert(id, name.to_string());
        id
    }

    /// Add a product with an initial stock level.
    pub fn add_product(
        &self,
        category_id: CategoryId,
        name: &str,
        reference: &str,
        price: Price,
        stock: i32,
    ) -> ProductId {
        let mut state = self.state.lock();
        let id = ProductId::new(state.next_id());
        state.products.insert(
            id,
            ProductRecord {
                name: name.to_string(),
                reference: reference.to_string(),
                category_id,
                price,
                stock,
            },
        );
        id
    }

    /// Add a city with its home delivery fee.
    pub fn add_city(&self, name: &str, home_delivery_fee: Price) -> CityId {
        let mut state = self.state.lock();
        let id = CityId::new(state.next_id());
        state.cities.insert(
            id,
            CityRecord {
                name: name.to_string(),
                home_delivery_fee,
            },
        );
        id
    }

    /// Add a pickup desk to a city.
    pub fn add_desk(
        &self,
        city_id: CityId,
        name: &str,
        address: Option<&str>,
        fee: Price,
    ) -> DeskId {
        let mut state = self.state.lock();
        let id = DeskId::new(state.next_id());
        state.desks.insert(
            id,
            DeliveryDesk {
                id,
                city_id,
                name: name.to_string(),
                address: address.map(String::from),
                fee,
            },
        );
        id
    }

    /// Current stock of a product.
    #[must_use]
    pub fn stock(&self, id: ProductId) -> Option<i32> {
        self.state.lock().products.get(&id).map(|p| p.stock)
    }

    /// Change the catalog price of a product. Placed orders keep their price.
    pub fn set_price(&self, id: ProductId, price: Price) {
        if let Some(product) = self.state.lock().products.get_mut(&id) {
            product.price = price;
        }
    }

    /// Number of placed orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.state.lock().orders.len()
    }

    /// Make every operation fail with a backend error, as if the database
    /// connection were lost.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// Delay each commit before it touches any state, standing in for slow
    /// lock acquisition. The delay is cut short by the commit deadline.
    pub fn set_commit_delay(&self, delay: Option<Duration>) {
        self.state.lock().commit_delay = delay;
    }
}

#[async_trait]
impl CatalogReader for MemoryInventoryStore {
    async fn product(&self, id: ProductId) -> Result<Option<ProductSnapshot>, StoreError> {
        let state = self.state.lock();
        state.ensure_available()?;
        Ok(state.products.get(&id).map(|p| ProductSnapshot {
            id,
            name: p.name.clone(),
            price: p.price,
            stock: p.stock,
        }))
    }

    async fn delivery_fee(
        &self,
        delivery: &DeliverySelection,
    ) -> Result<Option<Price>, StoreError> {
        let state = self.state.lock();
        state.ensure_available()?;
        Ok(match delivery {
            DeliverySelection::Home { city_id, .. } => {
                state.cities.get(city_id).map(|c| c.home_delivery_fee)
            }
            DeliverySelection::Desk { city_id, desk_id } => state
                .desks
                .get(desk_id)
                .filter(|desk| desk.city_id == *city_id)
                .map(|desk| desk.fee),
        })
    }

    async fn cities(&self) -> Result<Vec<City>, StoreError> {
        let state = self.state.lock();
        state.ensure_available()?;
        Ok(state
            .cities
            .iter()
            .map(|(&id, city)| City {
                id,
                name: city.name.clone(),
                home_delivery_fee: city.home_delivery_fee,
                delivery_desks: state
                    .desks
                    .values()
                    .filter(|desk| desk.city_id == id)
                    .cloned()
                    .collect(),
            })
            .collect())
    }
}

#[async_trait]
impl InventoryStore for MemoryInventoryStore {
    async fn commit_order(
        &self,
        draft: &OrderDraft,
        total: Price,
        deadline: Instant,
    ) -> Result<OrderReceipt, OrderError> {
        let delay = {
            let state = self.state.lock();
            state.ensure_available()?;
            state.commit_delay
        };
        if let Some(delay) = delay {
            let deadline = tokio::time::Instant::from_std(deadline);
            if tokio::time::timeout_at(deadline, tokio::time::sleep(delay))
                .await
                .is_err()
            {
                return Err(StoreError::Timeout.into());
            }
        }
        if Instant::now() >= deadline {
            return Err(StoreError::Timeout.into());
        }

        let requests = draft.stock_requests()?;

        let mut state = self.state.lock();
        state.ensure_available()?;

        for request in &requests {
            let product = state
                .products
                .get(&request.product_id)
                .ok_or(OrderError::ProductNotFound(request.product_id))?;
            if product.stock < request.quantity.get() {
                return Err(OrderError::InsufficientStock {
                    product_id: request.product_id,
                    product_name: product.name.clone(),
                    available: product.stock,
                    requested: request.quantity.get(),
                });
            }
        }

        for request in &requests {
            if let Some(product) = state.products.get_mut(&request.product_id) {
                product.stock -= request.quantity.get();
            }
        }

        let order_id = OrderId::new(state.next_id());
        let order_items: Vec<OrderItem> = draft
            .items
            .iter()
            .map(|item| OrderItem {
                id: OrderItemId::new(state.next_id()),
                product_id: item.product_id,
                quantity: item.quantity,
                size: item.size.clone(),
                price: item.price,
            })
            .collect();

        let created_at = Utc::now();
        state.orders.insert(
            order_id,
            Order {
                id: order_id,
                user_id: draft.user_id,
                total,
                delivery_type: draft.delivery.delivery_type(),
                delivery_city_id: draft.delivery.city_id(),
                delivery_desk_id: draft.delivery.desk_id(),
                address: draft.delivery.address().map(String::from),
                client_note: draft.client_note.clone(),
                call_center_status: CallCenterStatus::default(),
                delivery_status: DeliveryStatus::default(),
                created_at,
                order_items,
            },
        );

        Ok(OrderReceipt {
            order_id,
            total,
            created_at,
        })
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let state = self.state.lock();
        state.ensure_available()?;
        Ok(state.orders.get(&id).cloned())
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        call_center: Option<CallCenterStatus>,
        delivery: Option<DeliveryStatus>,
    ) -> Result<Option<Order>, StoreError> {
        let mut state = self.state.lock();
        state.ensure_available()?;
        Ok(state.orders.get_mut(&id).map(|order| {
            if let Some(status) = call_center {
                order.call_center_status = status;
            }
            if let Some(status) = delivery {
                order.delivery_status = status;
            }
            order.clone()
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.state.lock().ensure_available()
    }
}

#[async_trait]
impl InventoryReports for MemoryInventoryStore {
    async fn low_stock_products(
        &self,
        threshold: i32,
    ) -> Result<Vec<LowStockProduct>, StoreError> {
        let state = self.state.lock();
        state.ensure_available()?;
        let mut rows: Vec<LowStockProduct> = state
            .products
            .iter()
            .filter(|(_, p)| p.stock < threshold)
            .map(|(&id, p)| LowStockProduct {
                id,
                name: p.name.clone(),
                reference: p.reference.clone(),
                stock: p.stock,
                category: state
                    .categories
                    .get(&p.category_id)
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect();
        rows.sort_by_key(|row| (row.stock, row.id));
        Ok(rows)
    }

    async fn orders_by_status(&self) -> Result<Vec<OrderStatusCount>, StoreError> {
        let state = self.state.lock();
        state.ensure_available()?;
        let mut counts: Vec<OrderStatusCount> = Vec::new();
        for order in state.orders.values() {
            match counts.iter_mut().find(|c| {
                c.call_center_status == order.call_center_status
                    && c.delivery_status == order.delivery_status
            }) {
                Some(count) => count.count += 1,
                None => counts.push(OrderStatusCount {
                    call_center_status: order.call_center_status,
                    delivery_status: order.delivery_status,
                    count: 1,
                }),
            }
        }
        counts.sort_by_key(|c| (c.call_center_status as u8, c.delivery_status as u8));
        Ok(counts)
    }

    async fn top_sold_products(&self, limit: i64) -> Result<Vec<SoldProduct>, StoreError> {
        let state = self.state.lock();
        state.ensure_available()?;
        let mut sold: BTreeMap<ProductId, i64> = BTreeMap::new();
        for item in state.orders.values().flat_map(|o| &o.order_items) {
            *sold.entry(item.product_id).or_default() += i64::from(item.quantity.get());
        }

        let mut rows: Vec<SoldProduct> = sold
            .into_iter()
            .filter_map(|(id, total)| {
                state.products.get(&id).map(|p| SoldProduct {
                    id,
                    name: p.name.clone(),
                    reference: p.reference.clone(),
                    total_quantity_sold: total,
                })
            })
            .collect();
        rows.sort_by_key(|row| (std::cmp::Reverse(row.total_quantity_sold), row.id));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn top_ordered_products(&self, limit: i64) -> Result<Vec<OrderedProduct>, StoreError> {
        let state = self.state.lock();
        state.ensure_available()?;
        let mut orders: BTreeMap<ProductId, BTreeSet<OrderId>> = BTreeMap::new();
        for order in state.orders.values() {
            for item in &order.order_items {
                orders.entry(item.product_id).or_default().insert(order.id);
            }
        }

        let mut rows: Vec<OrderedProduct> = orders
            .into_iter()
            .filter_map(|(id, placed)| {
                state.products.get(&id).map(|p| OrderedProduct {
                    id,
                    name: p.name.clone(),
                    reference: p.reference.clone(),
                    order_count: i64::try_from(placed.len()).unwrap_or(i64::MAX),
                })
            })
            .collect();
        rows.sort_by_key(|row| (std::cmp::Reverse(row.order_count), row.id));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }
}
