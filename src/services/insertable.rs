use chrono::{DateTime, Utc};
use diesel::{AsChangeset, Insertable};
use serde::Deserialize;

use crate::schema::{
    addresses, cart_items, carts, categories, dishes, order_items, orders, payments, reviews,
    status_updates, users,
};

#[derive(Insertable, Clone)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub password_hash: String,
}

#[derive(AsChangeset, Deserialize, Clone, Default)]
#[diesel(table_name = users)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.role.is_none()
    }
}

#[derive(Insertable, Deserialize, Clone)]
#[diesel(table_name = addresses)]
pub struct NewAddress {
    #[serde(skip)]
    pub user_id: i64,
    pub city: String,
    pub street: String,
    pub building_number: String,
    #[serde(default)]
    pub floor: String,
    #[serde(default)]
    pub apartment_number: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(AsChangeset, Deserialize, Clone, Default)]
#[diesel(table_name = addresses)]
pub struct AddressChanges {
    pub city: Option<String>,
    pub street: Option<String>,
    pub building_number: Option<String>,
    pub floor: Option<String>,
    pub apartment_number: Option<String>,
    pub is_default: Option<bool>,
}

impl AddressChanges {
    pub fn is_empty(&self) -> bool {
        self.city.is_none()
            && self.street.is_none()
            && self.building_number.is_none()
            && self.floor.is_none()
            && self.apartment_number.is_none()
            && self.is_default.is_none()
    }
}

#[derive(Insertable, Deserialize, Clone)]
#[diesel(table_name = categories)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
}

#[derive(Insertable, Deserialize, Clone)]
#[diesel(table_name = dishes)]
pub struct NewDish {
    pub category_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    #[serde(default)]
    pub image_url: String,
    #[serde(default = "available_by_default")]
    pub is_available: bool,
}

fn available_by_default() -> bool {
    true
}

#[derive(AsChangeset, Deserialize, Clone, Default)]
#[diesel(table_name = dishes)]
pub struct DishChanges {
    pub category_id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub image_url: Option<String>,
    pub is_available: Option<bool>,
}

impl DishChanges {
    pub fn is_empty(&self) -> bool {
        self.category_id.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.price_cents.is_none()
            && self.image_url.is_none()
            && self.is_available.is_none()
    }
}

#[derive(Insertable, Clone)]
#[diesel(table_name = reviews)]
pub struct NewReview {
    pub user_id: i64,
    pub dish_id: i64,
    pub rating: i16,
    pub comment: String,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = carts)]
pub struct NewCart {
    pub user_id: i64,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = cart_items)]
pub struct NewCartItem {
    pub cart_id: i64,
    pub dish_id: i64,
    pub quantity: i32,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = orders)]
pub struct NewOrder {
    pub user_id: i64,
    pub address_id: i64,
    pub placed_at: DateTime<Utc>,
    pub estimated_delivery: DateTime<Utc>,
    pub subtotal_cents: i64,
    pub delivery_fee_cents: i64,
    pub total_amount_cents: i64,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = order_items)]
pub struct NewOrderItem {
    pub order_id: i64,
    pub dish_id: i64,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = payments)]
pub struct NewPayment {
    pub order_id: i64,
    pub amount_cents: i64,
    pub method: String,
    pub status: String,
    pub transaction_id: String,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = status_updates)]
pub struct NewStatusUpdate {
    pub order_id: i64,
    pub status: String,
    pub time: DateTime<Utc>,
}
