use actix_web::{get, HttpResponse, Responder};
use actix_web::web::Data;

use crate::error::ServiceError;
use crate::services::db_models::MenuEntry;
use crate::services::db_utils::AppState;
use crate::services::messages::FetchMenu;
use crate::services::redis_handling::CachedMenu;

pub mod checkout;
pub mod db_models;
pub mod db_utils;
pub mod insertable;
pub mod messages;
pub mod pg_handling;
pub mod redis_handling;
pub mod validate;

#[get("/")]
pub async fn home_page() -> impl Responder {
    HttpResponse::Ok().body("Food ordering service")
}

// Cache writes are best effort: the database stays the source of truth.
async fn refresh_menu_cache(state: &Data<AppState>, menu: Vec<MenuEntry>, version: u64) {
    let redis_db = state.redis_db.clone();
    let ttl_s = state.settings.menu_cache_ttl_s;

    match tokio::task::spawn_blocking(move || redis_handling::put_menu_to_cache(&redis_db, &menu, version, ttl_s)).await {
        Ok(Ok(Some(key))) => tracing::debug!(key = %key, "menu cached"),
        Ok(Ok(None)) => tracing::debug!(version, "catalog changed during load, menu not cached"),
        Ok(Err(err)) => tracing::warn!(error = %err, "unable to cache menu"),
        Err(err) => tracing::warn!(error = %err, "menu cache task failed"),
    }
}

/// Serves the menu from redis when possible, otherwise from postgres.
async fn load_menu(state: &Data<AppState>) -> Result<Vec<MenuEntry>, ServiceError> {
    let redis_db = state.redis_db.clone();

    let version = match tokio::task::spawn_blocking(move || redis_handling::get_menu(&redis_db)).await {
        Ok(Ok(CachedMenu::Hit(menu))) => return Ok(menu),
        Ok(Ok(CachedMenu::Miss { version })) => {
            tracing::debug!(version, "menu cache miss");
            Some(version)
        }
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "menu cache unavailable");
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, "menu cache task failed");
            None
        }
    };

    let menu = state.pg_db.send(FetchMenu).await??;
    if let Some(version) = version {
        refresh_menu_cache(state, menu.clone(), version).await;
    }

    Ok(menu)
}

async fn drop_menu_cache(state: &Data<AppState>) {
    let redis_db = state.redis_db.clone();

    match tokio::task::spawn_blocking(move || redis_handling::invalidate_menu(&redis_db)).await {
        Ok(Ok(())) => tracing::debug!("menu cache invalidated"),
        Ok(Err(err)) => tracing::warn!(error = %err, "unable to invalidate menu cache"),
        Err(err) => tracing::warn!(error = %err, "menu cache task failed"),
    }
}

// sub-route "/users"
pub mod users_route {
    use actix_web::web::{Data, Json, Path};
    use actix_web::{delete, get, post, put, HttpResponse};
    use serde::{Deserialize, Serialize};

    use crate::auth::{check_login, JwtKeys, Principal};
    use crate::error::ServiceError;
    use crate::services::db_models::User;
    use crate::services::db_utils::AppState;
    use crate::services::insertable::UserChanges;
    use crate::services::messages::{
        ChangePassword, DeleteUser, FetchUser, FetchUserByEmail, RegisterUser, UpdateUser,
    };
    use crate::services::validate;

    #[derive(Deserialize)]
    pub struct RegisterBody {
        pub first_name: String,
        pub last_name: String,
        pub email: String,
        pub phone: String,
        pub password: String,
        pub confirm_password: String,
    }

    #[derive(Deserialize)]
    pub struct LoginBody {
        pub email: String,
        pub password: String,
    }

    #[derive(Deserialize)]
    pub struct PasswordBody {
        pub current_password: String,
        pub new_password: String,
        pub confirm_password: String,
    }

    #[derive(Serialize)]
    pub struct Session {
        pub user: User,
        pub access_token: String,
    }

    #[post("/register")]
    pub async fn register(
        state: Data<AppState>,
        keys: Data<JwtKeys>,
        body: Json<RegisterBody>,
    ) -> Result<HttpResponse, ServiceError> {
        let body = body.into_inner();
        validate::registration(&body.email, &body.phone, &body.password, &body.confirm_password)?;

        let user = state
            .pg_db
            .send(RegisterUser {
                first_name: body.first_name,
                last_name: body.last_name,
                email: body.email,
                phone: body.phone,
                password: body.password,
            })
            .await??;

        let access_token = keys.issue(user.id, user.role.parse()?)?;

        Ok(HttpResponse::Created().json(Session { user, access_token }))
    }

    #[post("/login")]
    pub async fn login(
        state: Data<AppState>,
        keys: Data<JwtKeys>,
        body: Json<LoginBody>,
    ) -> Result<HttpResponse, ServiceError> {
        let invalid = || ServiceError::Unauthorized("Invalid email or password".to_owned());

        let body = body.into_inner();

        let user = match state.pg_db.send(FetchUserByEmail(body.email)).await? {
            Ok(user) => Some(user),
            Err(ServiceError::NotFound(_)) => None,
            Err(err) => return Err(err),
        };

        // An unknown email still costs one hash verification.
        let stored = user.as_ref().map(|user| user.password_hash.clone());
        let verified = tokio::task::spawn_blocking(move || check_login(&body.password, stored.as_deref())).await?;

        let user = match user {
            Some(user) if verified => user,
            Some(user) => {
                tracing::info!(user_id = user.id, "rejected login");
                return Err(invalid());
            }
            None => return Err(invalid()),
        };

        let access_token = keys.issue(user.id, user.role.parse()?)?;

        Ok(HttpResponse::Ok().json(Session { user, access_token }))
    }

    #[get("/me")]
    pub async fn current_user(state: Data<AppState>, principal: Principal) -> Result<HttpResponse, ServiceError> {
        let user = state
            .pg_db
            .send(FetchUser { principal, user_id: principal.user_id })
            .await??;

        Ok(HttpResponse::Ok().json(user))
    }

    #[put("/me/password")]
    pub async fn change_password(
        state: Data<AppState>,
        principal: Principal,
        body: Json<PasswordBody>,
    ) -> Result<HttpResponse, ServiceError> {
        let body = body.into_inner();
        validate::new_password(&body.new_password, &body.confirm_password)?;

        state
            .pg_db
            .send(ChangePassword {
                principal,
                current_password: body.current_password,
                new_password: body.new_password,
            })
            .await??;

        Ok(HttpResponse::NoContent().finish())
    }

    #[get("/{user_id}")]
    pub async fn get_user(
        state: Data<AppState>,
        principal: Principal,
        path: Path<i64>,
    ) -> Result<HttpResponse, ServiceError> {
        let user = state
            .pg_db
            .send(FetchUser { principal, user_id: path.into_inner() })
            .await??;

        Ok(HttpResponse::Ok().json(user))
    }

    #[put("/{user_id}")]
    pub async fn update_user(
        state: Data<AppState>,
        principal: Principal,
        path: Path<i64>,
        body: Json<UserChanges>,
    ) -> Result<HttpResponse, ServiceError> {
        let user = state
            .pg_db
            .send(UpdateUser {
                principal,
                user_id: path.into_inner(),
                changes: body.into_inner(),
            })
            .await??;

        Ok(HttpResponse::Ok().json(user))
    }

    #[delete("/{user_id}")]
    pub async fn delete_user(
        state: Data<AppState>,
        principal: Principal,
        path: Path<i64>,
    ) -> Result<HttpResponse, ServiceError> {
        state
            .pg_db
            .send(DeleteUser { principal, user_id: path.into_inner() })
            .await??;

        Ok(HttpResponse::NoContent().finish())
    }
}

// sub-route "/addresses"
pub mod address_route {
    use actix_web::web::{Data, Json, Path};
    use actix_web::{delete, get, post, put, HttpResponse};

    use crate::auth::Principal;
    use crate::error::ServiceError;
    use crate::services::db_utils::AppState;
    use crate::services::insertable::{AddressChanges, NewAddress};
    use crate::services::messages::{CreateAddress, DeleteAddress, FetchAddresses, UpdateAddress};

    #[get("")]
    pub async fn list_addresses(state: Data<AppState>, principal: Principal) -> Result<HttpResponse, ServiceError> {
        let addresses = state.pg_db.send(FetchAddresses(principal)).await??;

        Ok(HttpResponse::Ok().json(addresses))
    }

    #[post("")]
    pub async fn create_address(
        state: Data<AppState>,
        principal: Principal,
        body: Json<NewAddress>,
    ) -> Result<HttpResponse, ServiceError> {
        let address = state
            .pg_db
            .send(CreateAddress { principal, address: body.into_inner() })
            .await??;

        Ok(HttpResponse::Created().json(address))
    }

    #[put("/{address_id}")]
    pub async fn update_address(
        state: Data<AppState>,
        principal: Principal,
        path: Path<i64>,
        body: Json<AddressChanges>,
    ) -> Result<HttpResponse, ServiceError> {
        let address = state
            .pg_db
            .send(UpdateAddress {
                principal,
                address_id: path.into_inner(),
                changes: body.into_inner(),
            })
            .await??;

        Ok(HttpResponse::Ok().json(address))
    }

    #[post("/{address_id}/default")]
    pub async fn set_default_address(
        state: Data<AppState>,
        principal: Principal,
        path: Path<i64>,
    ) -> Result<HttpResponse, ServiceError> {
        let address = state
            .pg_db
            .send(UpdateAddress {
                principal,
                address_id: path.into_inner(),
                changes: AddressChanges { is_default: Some(true), ..Default::default() },
            })
            .await??;

        Ok(HttpResponse::Ok().json(address))
    }

    #[delete("/{address_id}")]
    pub async fn delete_address(
        state: Data<AppState>,
        principal: Principal,
        path: Path<i64>,
    ) -> Result<HttpResponse, ServiceError> {
        state
            .pg_db
            .send(DeleteAddress { principal, address_id: path.into_inner() })
            .await??;

        Ok(HttpResponse::NoContent().finish())
    }
}

// sub-route "/menu"
pub mod menu_route {
    use actix_web::web::{Data, Json, Path, Query};
    use actix_web::{delete, get, post, put, HttpResponse};
    use serde::Deserialize;

    use super::{drop_menu_cache, load_menu};
    use crate::auth::{require_admin, Principal};
    use crate::error::ServiceError;
    use crate::services::db_utils::AppState;
    use crate::services::insertable::{DishChanges, NewCategory, NewDish};
    use crate::services::messages::{
        CreateCategory, CreateDish, DeleteDish, FetchCategories, FetchDish, FetchDishes, UpdateDish,
    };

    #[get("")]
    pub async fn view_menu(state: Data<AppState>) -> Result<HttpResponse, ServiceError> {
        let menu = load_menu(&state).await?;

        Ok(HttpResponse::Ok().json(menu))
    }

    #[get("/categories")]
    pub async fn list_categories(state: Data<AppState>) -> Result<HttpResponse, ServiceError> {
        let categories = state.pg_db.send(FetchCategories).await??;

        Ok(HttpResponse::Ok().json(categories))
    }

    #[post("/categories")]
    pub async fn create_category(
        state: Data<AppState>,
        principal: Principal,
        body: Json<NewCategory>,
    ) -> Result<HttpResponse, ServiceError> {
        require_admin(&principal)?;

        let category = state.pg_db.send(CreateCategory(body.into_inner())).await??;

        Ok(HttpResponse::Created().json(category))
    }

    #[derive(Deserialize)]
    pub struct DishFilter {
        pub category_id: Option<i64>,
    }

    #[get("/dishes")]
    pub async fn list_dishes(state: Data<AppState>, filter: Query<DishFilter>) -> Result<HttpResponse, ServiceError> {
        let dishes = state
            .pg_db
            .send(FetchDishes { category_id: filter.category_id })
            .await??;

        Ok(HttpResponse::Ok().json(dishes))
    }

    #[get("/dish/{id}")]
    pub async fn get_dish(state: Data<AppState>, path: Path<i64>) -> Result<HttpResponse, ServiceError> {
        let dish = state.pg_db.send(FetchDish(path.into_inner())).await??;

        Ok(HttpResponse::Ok().json(dish))
    }

    #[post("/dishes")]
    pub async fn create_dish(
        state: Data<AppState>,
        principal: Principal,
        body: Json<NewDish>,
    ) -> Result<HttpResponse, ServiceError> {
        require_admin(&principal)?;

        let dish = state.pg_db.send(CreateDish(body.into_inner())).await??;
        drop_menu_cache(&state).await;

        Ok(HttpResponse::Created().json(dish))
    }

    #[put("/dish/{id}")]
    pub async fn update_dish(
        state: Data<AppState>,
        principal: Principal,
        path: Path<i64>,
        body: Json<DishChanges>,
    ) -> Result<HttpResponse, ServiceError> {
        require_admin(&principal)?;

        let dish = state
            .pg_db
            .send(UpdateDish { dish_id: path.into_inner(), changes: body.into_inner() })
            .await??;
        drop_menu_cache(&state).await;

        Ok(HttpResponse::Ok().json(dish))
    }

    #[delete("/dish/{id}")]
    pub async fn delete_dish(
        state: Data<AppState>,
        principal: Principal,
        path: Path<i64>,
    ) -> Result<HttpResponse, ServiceError> {
        require_admin(&principal)?;

        state.pg_db.send(DeleteDish(path.into_inner())).await??;
        drop_menu_cache(&state).await;

        Ok(HttpResponse::NoContent().finish())
    }
}

// sub-route "/reviews"
pub mod review_route {
    use actix_web::web::{Data, Json, Path};
    use actix_web::{delete, get, post, HttpResponse};
    use serde::Deserialize;

    use crate::auth::Principal;
    use crate::error::ServiceError;
    use crate::services::db_utils::AppState;
    use crate::services::messages::{CreateReview, DeleteReview, FetchReviews};

    #[derive(Deserialize)]
    pub struct ReviewBody {
        pub dish_id: i64,
        pub rating: i16,
        #[serde(default)]
        pub comment: String,
    }

    #[get("/dish/{dish_id}")]
    pub async fn list_reviews(state: Data<AppState>, path: Path<i64>) -> Result<HttpResponse, ServiceError> {
        let reviews = state.pg_db.send(FetchReviews(path.into_inner())).await??;

        Ok(HttpResponse::Ok().json(reviews))
    }

    #[post("")]
    pub async fn create_review(
        state: Data<AppState>,
        principal: Principal,
        body: Json<ReviewBody>,
    ) -> Result<HttpResponse, ServiceError> {
        let body = body.into_inner();
        let review = state
            .pg_db
            .send(CreateReview {
                principal,
                dish_id: body.dish_id,
                rating: body.rating,
                comment: body.comment,
            })
            .await??;

        Ok(HttpResponse::Created().json(review))
    }

    #[delete("/{review_id}")]
    pub async fn delete_review(
        state: Data<AppState>,
        principal: Principal,
        path: Path<i64>,
    ) -> Result<HttpResponse, ServiceError> {
        state
            .pg_db
            .send(DeleteReview { principal, review_id: path.into_inner() })
            .await??;

        Ok(HttpResponse::NoContent().finish())
    }
}

// sub-route "/cart"
pub mod cart_route {
    use actix_web::web::{Data, Json, Path};
    use actix_web::{delete, get, post, put, HttpResponse};
    use serde::Deserialize;

    use crate::auth::Principal;
    use crate::error::ServiceError;
    use crate::services::db_utils::AppState;
    use crate::services::messages::{
        AddCartItem, ClearCart, GetOrCreateCart, RemoveCartItem, UpdateCartItem,
    };

    #[derive(Deserialize)]
    pub struct AddItemBody {
        pub dish_id: i64,
        #[serde(default = "one")]
        pub quantity: i32,
    }

    fn one() -> i32 {
        1
    }

    #[derive(Deserialize)]
    pub struct QuantityBody {
        pub quantity: i32,
    }

    #[get("")]
    pub async fn view_cart(state: Data<AppState>, principal: Principal) -> Result<HttpResponse, ServiceError> {
        let cart = state.pg_db.send(GetOrCreateCart(principal)).await??;

        Ok(HttpResponse::Ok().json(cart))
    }

    #[delete("")]
    pub async fn clear_cart(state: Data<AppState>, principal: Principal) -> Result<HttpResponse, ServiceError> {
        let cart = state.pg_db.send(ClearCart(principal)).await??;

        Ok(HttpResponse::Ok().json(cart))
    }

    #[post("/items")]
    pub async fn add_item(
        state: Data<AppState>,
        principal: Principal,
        body: Json<AddItemBody>,
    ) -> Result<HttpResponse, ServiceError> {
        let item = state
            .pg_db
            .send(AddCartItem {
                principal,
                dish_id: body.dish_id,
                quantity: body.quantity,
            })
            .await??;

        Ok(HttpResponse::Created().json(item))
    }

    #[put("/items/{item_id}")]
    pub async fn update_item(
        state: Data<AppState>,
        principal: Principal,
        path: Path<i64>,
        body: Json<QuantityBody>,
    ) -> Result<HttpResponse, ServiceError> {
        let item = state
            .pg_db
            .send(UpdateCartItem {
                principal,
                item_id: path.into_inner(),
                quantity: body.quantity,
            })
            .await??;

        Ok(HttpResponse::Ok().json(item))
    }

    #[delete("/items/{item_id}")]
    pub async fn remove_item(
        state: Data<AppState>,
        principal: Principal,
        path: Path<i64>,
    ) -> Result<HttpResponse, ServiceError> {
        state
            .pg_db
            .send(RemoveCartItem { principal, item_id: path.into_inner() })
            .await??;

        Ok(HttpResponse::NoContent().finish())
    }
}

// sub-route "/orders"
pub mod order_route {
    use actix_web::web::{Data, Json, Path};
    use actix_web::{get, post, HttpResponse};
    use serde::Deserialize;

    use crate::auth::Principal;
    use crate::error::ServiceError;
    use crate::services::db_utils::AppState;
    use crate::services::messages::{
        AppendStatus, FetchCurrentStatus, FetchOrder, FetchOrders, FetchPayment, FetchStatusUpdates,
        PlaceOrder, RecordPayment,
    };
    use crate::types::{OrderStatus, PaymentMethod};

    #[derive(Deserialize)]
    pub struct CheckoutBody {
        pub address_id: i64,
        #[serde(default)]
        pub payment_method: PaymentMethod,
    }

    #[derive(Deserialize)]
    pub struct PaymentBody {
        #[serde(default)]
        pub method: PaymentMethod,
        pub amount_cents: i64,
    }

    #[derive(Deserialize)]
    pub struct StatusBody {
        pub status: OrderStatus,
    }

    #[post("")]
    pub async fn place_order(
        state: Data<AppState>,
        principal: Principal,
        body: Json<CheckoutBody>,
    ) -> Result<HttpResponse, ServiceError> {
        let order = state
            .pg_db
            .send(PlaceOrder {
                principal,
                address_id: body.address_id,
                delivery_fee_cents: state.settings.delivery_fee_cents,
                estimated_delivery_minutes: state.settings.estimated_delivery_minutes,
                method: body.payment_method,
            })
            .await??;

        Ok(HttpResponse::Created().json(order))
    }

    #[get("")]
    pub async fn list_orders(state: Data<AppState>, principal: Principal) -> Result<HttpResponse, ServiceError> {
        let orders = state
            .pg_db
            .send(FetchOrders { principal, all_users: false })
            .await??;

        Ok(HttpResponse::Ok().json(orders))
    }

    #[get("/admin/all")]
    pub async fn list_all_orders(state: Data<AppState>, principal: Principal) -> Result<HttpResponse, ServiceError> {
        let orders = state
            .pg_db
            .send(FetchOrders { principal, all_users: true })
            .await??;

        Ok(HttpResponse::Ok().json(orders))
    }

    #[get("/{order_id}")]
    pub async fn get_order(
        state: Data<AppState>,
        principal: Principal,
        path: Path<i64>,
    ) -> Result<HttpResponse, ServiceError> {
        let order = state
            .pg_db
            .send(FetchOrder { principal, order_id: path.into_inner() })
            .await??;

        Ok(HttpResponse::Ok().json(order))
    }

    #[get("/{order_id}/payment")]
    pub async fn get_payment(
        state: Data<AppState>,
        principal: Principal,
        path: Path<i64>,
    ) -> Result<HttpResponse, ServiceError> {
        let payment = state
            .pg_db
            .send(FetchPayment { principal, order_id: path.into_inner() })
            .await??;

        Ok(HttpResponse::Ok().json(payment))
    }

    #[post("/{order_id}/payment")]
    pub async fn record_payment(
        state: Data<AppState>,
        principal: Principal,
        path: Path<i64>,
        body: Json<PaymentBody>,
    ) -> Result<HttpResponse, ServiceError> {
        let payment = state
            .pg_db
            .send(RecordPayment {
                principal,
                order_id: path.into_inner(),
                method: body.method,
                amount_cents: body.amount_cents,
            })
            .await??;

        Ok(HttpResponse::Created().json(payment))
    }

    #[post("/{order_id}/status")]
    pub async fn append_status(
        state: Data<AppState>,
        principal: Principal,
        path: Path<i64>,
        body: Json<StatusBody>,
    ) -> Result<HttpResponse, ServiceError> {
        let update = state
            .pg_db
            .send(AppendStatus {
                principal,
                order_id: path.into_inner(),
                status: body.status,
            })
            .await??;

        Ok(HttpResponse::Created().json(update))
    }

    #[get("/{order_id}/status")]
    pub async fn current_status(
        state: Data<AppState>,
        principal: Principal,
        path: Path<i64>,
    ) -> Result<HttpResponse, ServiceError> {
        let status = state
            .pg_db
            .send(FetchCurrentStatus { principal, order_id: path.into_inner() })
            .await??;

        Ok(HttpResponse::Ok().json(status))
    }

    #[get("/{order_id}/status-updates")]
    pub async fn list_status_updates(
        state: Data<AppState>,
        principal: Principal,
        path: Path<i64>,
    ) -> Result<HttpResponse, ServiceError> {
        let updates = state
            .pg_db
            .send(FetchStatusUpdates { principal, order_id: path.into_inner() })
            .await??;

        Ok(HttpResponse::Ok().json(updates))
    }
}

// sub-route "/payments"
pub mod payment_route {
    use actix_web::web::{Data, Json, Path};
    use actix_web::{put, HttpResponse};
    use serde::Deserialize;

    use crate::auth::Principal;
    use crate::error::ServiceError;
    use crate::services::db_utils::AppState;
    use crate::services::messages::TransitionPayment;
    use crate::types::PaymentStatus;

    #[derive(Deserialize)]
    pub struct TransitionBody {
        pub status: PaymentStatus,
        pub transaction_id: Option<String>,
    }

    #[put("/{payment_id}/status")]
    pub async fn transition_payment(
        state: Data<AppState>,
        principal: Principal,
        path: Path<i64>,
        body: Json<TransitionBody>,
    ) -> Result<HttpResponse, ServiceError> {
        let body = body.into_inner();
        let payment = state
            .pg_db
            .send(TransitionPayment {
                principal,
                payment_id: path.into_inner(),
                status: body.status,
                transaction_id: body.transaction_id,
            })
            .await??;

        Ok(HttpResponse::Ok().json(payment))
    }
}

// sub-route "/test"
pub mod test_route {
    use actix_web::web::Data;
    use actix_web::{get, post, HttpResponse, Responder};

    use super::{drop_menu_cache, load_menu};
    use crate::auth::{require_admin, Principal};
    use crate::error::ServiceError;
    use crate::services::db_utils::AppState;

    #[get("/healthcheck")]
    pub async fn healthcheck() -> impl Responder {
        HttpResponse::Ok().body("I'm alive!")
    }

    #[post("/warm-menu")]
    pub async fn warm_menu(state: Data<AppState>, principal: Principal) -> Result<HttpResponse, ServiceError> {
        require_admin(&principal)?;

        drop_menu_cache(&state).await;
        let dish_count = load_menu(&state).await?.len();

        Ok(HttpResponse::Ok().json(format!("Menu with {dish_count} dishes is placed into redis")))
    }
}

/// Registers every resource scope; shared by `main` and the route tests.
pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    use actix_web::web;

    cfg.service(home_page)
        .service(
            web::scope("/users")
                .service(users_route::register)
                .service(users_route::login)
                .service(users_route::current_user)
                .service(users_route::change_password)
                .service(users_route::get_user)
                .service(users_route::update_user)
                .service(users_route::delete_user),
        )
        .service(
            web::scope("/addresses")
                .service(address_route::list_addresses)
                .service(address_route::create_address)
                .service(address_route::update_address)
                .service(address_route::set_default_address)
                .service(address_route::delete_address),
        )
        .service(
            web::scope("/menu")
                .service(menu_route::view_menu)
                .service(menu_route::list_categories)
                .service(menu_route::create_category)
                .service(menu_route::list_dishes)
                .service(menu_route::get_dish)
                .service(menu_route::create_dish)
                .service(menu_route::update_dish)
                .service(menu_route::delete_dish),
        )
        .service(
            web::scope("/reviews")
                .service(review_route::list_reviews)
                .service(review_route::create_review)
                .service(review_route::delete_review),
        )
        .service(
            web::scope("/cart")
                .service(cart_route::view_cart)
                .service(cart_route::clear_cart)
                .service(cart_route::add_item)
                .service(cart_route::update_item)
                .service(cart_route::remove_item),
        )
        .service(
            web::scope("/orders")
                .service(order_route::list_all_orders)
                .service(order_route::place_order)
                .service(order_route::list_orders)
                .service(order_route::get_order)
                .service(order_route::get_payment)
                .service(order_route::record_payment)
                .service(order_route::append_status)
                .service(order_route::current_status)
                .service(order_route::list_status_updates),
        )
        .service(web::scope("/payments").service(payment_route::transition_payment))
        .service(
            web::scope("/test")
                .service(test_route::healthcheck)
                .service(test_route::warm_menu),
        );
}

#[cfg(test)]
mod tests {
    use actix::SyncArbiter;
    use actix_web::http::header::AUTHORIZATION;
    use actix_web::http::StatusCode;
    use actix_web::web::Data;
    use actix_web::test as actix_test;
    use actix_web::App;
    use diesel::r2d2::{ConnectionManager, Pool};
    use diesel::PgConnection;
    use serde_json::json;

    use super::configure;
    use crate::auth::JwtKeys;
    use crate::config::Settings;
    use crate::services::db_utils::{AppState, PgActor};
    use crate::types::Role;

    const SECRET: &str = "route-test-secret";

    // The pool is never asked for a connection: every request below is
    // rejected before it reaches postgres.
    fn offline_state() -> AppState {
        let manager = ConnectionManager::<PgConnection>::new("postgres://offline.invalid/food");
        let pool = Pool::builder().max_size(1).build_unchecked(manager);
        let pg_db = SyncArbiter::start(1, move || PgActor(pool.clone()));

        AppState {
            pg_db,
            redis_db: redis::Client::open("redis://offline.invalid/").unwrap(),
            settings: Settings {
                pg_database_url: "postgres://offline.invalid/food".to_owned(),
                redis_database_uri: "redis://offline.invalid/".to_owned(),
                jwt_secret: SECRET.to_owned(),
                bind_address: "127.0.0.1:0".to_owned(),
                pg_workers: 1,
                token_ttl_minutes: 5,
                delivery_fee_cents: 300,
                estimated_delivery_minutes: 45,
                menu_cache_ttl_s: 60,
            },
        }
    }

    fn bearer(role: Role) -> (actix_web::http::header::HeaderName, String) {
        let token = JwtKeys::new(SECRET, 5).issue(11, role).unwrap();
        (AUTHORIZATION, format!("Bearer {token}"))
    }

    macro_rules! app {
        () => {
            actix_test::init_service(
                App::new()
                    .app_data(Data::new(offline_state()))
                    .app_data(Data::new(JwtKeys::new(SECRET, 5)))
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn healthcheck_is_public() {
        let app = app!();
        let req = actix_test::TestRequest::get().uri("/test/healthcheck").to_request();

        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn cart_requires_authentication() {
        let app = app!();
        let req = actix_test::TestRequest::get().uri("/cart").to_request();

        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn mismatched_password_confirmation_is_rejected() {
        let app = app!();
        let req = actix_test::TestRequest::post()
            .uri("/users/register")
            .set_json(json!({
                "first_name": "Ada",
                "last_name": "L",
                "email": "ada@example.com",
                "phone": "+100200",
                "password": "password-one",
                "confirm_password": "password-two",
            }))
            .to_request();

        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn zero_quantity_is_a_validation_error() {
        let app = app!();
        let req = actix_test::TestRequest::post()
            .uri("/cart/items")
            .insert_header(bearer(Role::Customer))
            .set_json(json!({ "dish_id": 7, "quantity": 0 }))
            .to_request();

        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["error"], "validation_error");
    }

    #[actix_web::test]
    async fn out_of_range_rating_is_rejected() {
        let app = app!();
        let req = actix_test::TestRequest::post()
            .uri("/reviews")
            .insert_header(bearer(Role::Customer))
            .set_json(json!({ "dish_id": 1, "rating": 6 }))
            .to_request();

        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn catalog_writes_need_admin() {
        let app = app!();
        let req = actix_test::TestRequest::post()
            .uri("/menu/dishes")
            .insert_header(bearer(Role::Customer))
            .set_json(json!({ "category_id": 1, "name": "Soup", "price_cents": 500 }))
            .to_request();

        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn all_orders_listing_needs_admin() {
        let app = app!();
        let req = actix_test::TestRequest::get()
            .uri("/orders/admin/all")
            .insert_header(bearer(Role::Customer))
            .to_request();

        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn unknown_status_value_is_a_bad_request() {
        let app = app!();
        let req = actix_test::TestRequest::post()
            .uri("/orders/1/status")
            .insert_header(bearer(Role::Customer))
            .set_json(json!({ "status": "teleported" }))
            .to_request();

        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn clearing_the_cart_requires_authentication() {
        let app = app!();
        let req = actix_test::TestRequest::delete().uri("/cart").to_request();

        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn new_password_must_be_confirmed() {
        let app = app!();
        let req = actix_test::TestRequest::put()
            .uri("/users/me/password")
            .insert_header(bearer(Role::Customer))
            .set_json(json!({
                "current_password": "old-password",
                "new_password": "new-password-1",
                "confirm_password": "new-password-2",
            }))
            .to_request();

        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["error"], "validation_error");
    }
}
