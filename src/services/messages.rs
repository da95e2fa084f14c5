use actix::Message;

use crate::auth::Principal;
use crate::error::ServiceError;
use crate::services::db_models::{
    Address, CartItem, CartView, Category, CurrentStatus, Dish, DishReviews, MenuEntry, Order,
    OrderDetail, Payment, Review, StatusUpdate, User,
};
use crate::services::insertable::{
    AddressChanges, DishChanges, NewAddress, NewCategory, NewDish, UserChanges,
};
use crate::types::{OrderStatus, PaymentMethod, PaymentStatus};

// identity

#[derive(Message)]
#[rtype(result = "Result<User, ServiceError>")]
pub struct RegisterUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

#[derive(Message)]
#[rtype(result = "Result<User, ServiceError>")]
pub struct FetchUserByEmail(pub String);

#[derive(Message)]
#[rtype(result = "Result<User, ServiceError>")]
pub struct FetchUser {
    pub principal: Principal,
    pub user_id: i64,
}

#[derive(Message)]
#[rtype(result = "Result<User, ServiceError>")]
pub struct UpdateUser {
    pub principal: Principal,
    pub user_id: i64,
    pub changes: UserChanges,
}

#[derive(Message)]
#[rtype(result = "Result<(), ServiceError>")]
pub struct ChangePassword {
    pub principal: Principal,
    pub current_password: String,
    pub new_password: String,
}

#[derive(Message)]
#[rtype(result = "Result<(), ServiceError>")]
pub struct DeleteUser {
    pub principal: Principal,
    pub user_id: i64,
}

// address book

#[derive(Message)]
#[rtype(result = "Result<Vec<Address>, ServiceError>")]
pub struct FetchAddresses(pub Principal);

#[derive(Message)]
#[rtype(result = "Result<Address, ServiceError>")]
pub struct CreateAddress {
    pub principal: Principal,
    pub address: NewAddress,
}

#[derive(Message)]
#[rtype(result = "Result<Address, ServiceError>")]
pub struct UpdateAddress {
    pub principal: Principal,
    pub address_id: i64,
    pub changes: AddressChanges,
}

#[derive(Message)]
#[rtype(result = "Result<(), ServiceError>")]
pub struct DeleteAddress {
    pub principal: Principal,
    pub address_id: i64,
}

// catalog

#[derive(Message)]
#[rtype(result = "Result<Vec<Category>, ServiceError>")]
pub struct FetchCategories;

#[derive(Message)]
#[rtype(result = "Result<Category, ServiceError>")]
pub struct CreateCategory(pub NewCategory);

#[derive(Message)]
#[rtype(result = "Result<Vec<Dish>, ServiceError>")]
pub struct FetchDishes {
    pub category_id: Option<i64>,
}

#[derive(Message)]
#[rtype(result = "Result<Dish, ServiceError>")]
pub struct FetchDish(pub i64);

#[derive(Message)]
#[rtype(result = "Result<Dish, ServiceError>")]
pub struct CreateDish(pub NewDish);

#[derive(Message)]
#[rtype(result = "Result<Dish, ServiceError>")]
pub struct UpdateDish {
    pub dish_id: i64,
    pub changes: DishChanges,
}

#[derive(Message)]
#[rtype(result = "Result<(), ServiceError>")]
pub struct DeleteDish(pub i64);

#[derive(Message)]
#[rtype(result = "Result<Vec<MenuEntry>, ServiceError>")]
pub struct FetchMenu;

// reviews

#[derive(Message)]
#[rtype(result = "Result<Review, ServiceError>")]
pub struct CreateReview {
    pub principal: Principal,
    pub dish_id: i64,
    pub rating: i16,
    pub comment: String,
}

#[derive(Message)]
#[rtype(result = "Result<DishReviews, ServiceError>")]
pub struct FetchReviews(pub i64);

#[derive(Message)]
#[rtype(result = "Result<(), ServiceError>")]
pub struct DeleteReview {
    pub principal: Principal,
    pub review_id: i64,
}

// cart

#[derive(Message)]
#[rtype(result = "Result<CartView, ServiceError>")]
pub struct GetOrCreateCart(pub Principal);

#[derive(Message)]
#[rtype(result = "Result<CartView, ServiceError>")]
pub struct ClearCart(pub Principal);

#[derive(Message)]
#[rtype(result = "Result<CartItem, ServiceError>")]
pub struct AddCartItem {
    pub principal: Principal,
    pub dish_id: i64,
    pub quantity: i32,
}

#[derive(Message)]
#[rtype(result = "Result<CartItem, ServiceError>")]
pub struct UpdateCartItem {
    pub principal: Principal,
    pub item_id: i64,
    pub quantity: i32,
}

#[derive(Message)]
#[rtype(result = "Result<(), ServiceError>")]
pub struct RemoveCartItem {
    pub principal: Principal,
    pub item_id: i64,
}

// orders, payments, status timeline

#[derive(Message)]
#[rtype(result = "Result<OrderDetail, ServiceError>")]
pub struct PlaceOrder {
    pub principal: Principal,
    pub address_id: i64,
    pub delivery_fee_cents: i64,
    pub estimated_delivery_minutes: i64,
    pub method: PaymentMethod,
}

#[derive(Message)]
#[rtype(result = "Result<Vec<Order>, ServiceError>")]
pub struct FetchOrders {
    pub principal: Principal,
    pub all_users: bool,
}

#[derive(Message)]
#[rtype(result = "Result<OrderDetail, ServiceError>")]
pub struct FetchOrder {
    pub principal: Principal,
    pub order_id: i64,
}

#[derive(Message)]
#[rtype(result = "Result<Payment, ServiceError>")]
pub struct RecordPayment {
    pub principal: Principal,
    pub order_id: i64,
    pub method: PaymentMethod,
    pub amount_cents: i64,
}

#[derive(Message)]
#[rtype(result = "Result<Payment, ServiceError>")]
pub struct FetchPayment {
    pub principal: Principal,
    pub order_id: i64,
}

#[derive(Message)]
#[rtype(result = "Result<Payment, ServiceError>")]
pub struct TransitionPayment {
    pub principal: Principal,
    pub payment_id: i64,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
}

#[derive(Message)]
#[rtype(result = "Result<StatusUpdate, ServiceError>")]
pub struct AppendStatus {
    pub principal: Principal,
    pub order_id: i64,
    pub status: OrderStatus,
}

#[derive(Message)]
#[rtype(result = "Result<CurrentStatus, ServiceError>")]
pub struct FetchCurrentStatus {
    pub principal: Principal,
    pub order_id: i64,
}

#[derive(Message)]
#[rtype(result = "Result<Vec<StatusUpdate>, ServiceError>")]
pub struct FetchStatusUpdates {
    pub principal: Principal,
    pub order_id: i64,
}
