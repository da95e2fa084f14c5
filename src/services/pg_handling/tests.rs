//! Handler tests against a scratch postgres named by `TEST_DATABASE_URL`.
//! Every test creates its own users and dishes, so runs never collide.
//! Without the variable the tests return early.

use std::sync::Once;

use actix::{Addr, SyncArbiter};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::auth::{verify_password, Principal};
use crate::error::ServiceError;
use crate::services::db_models::{Address, Dish, User};
use crate::services::db_utils::{get_db_pool, PgActor};
use crate::services::insertable::{AddressChanges, DishChanges, NewAddress, NewCategory, NewDish};
use crate::services::messages::*;
use crate::types::{OrderStatus, PaymentMethod, Role};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
static MIGRATE: Once = Once::new();

fn scratch_db() -> Option<Addr<PgActor>> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = get_db_pool(&url, 4).expect("TEST_DATABASE_URL must be reachable");

    MIGRATE.call_once(|| {
        let mut conn = pool.get().unwrap();
        conn.run_pending_migrations(MIGRATIONS).unwrap();
    });

    Some(SyncArbiter::start(2, move || PgActor(pool.clone())))
}

macro_rules! db_or_skip {
    () => {
        match scratch_db() {
            Some(db) => db,
            None => {
                eprintln!("TEST_DATABASE_URL not set, skipping");
                return;
            }
        }
    };
}

fn unique() -> u64 {
    rand::random::<u64>() % 10_000_000_000_000
}

async fn customer(db: &Addr<PgActor>) -> (User, Principal) {
    let tag = unique();
    let user = db
        .send(RegisterUser {
            first_name: "Test".to_owned(),
            last_name: "Customer".to_owned(),
            email: format!("customer-{tag}@example.com"),
            phone: format!("+{tag}"),
            password: "password-1".to_owned(),
        })
        .await
        .unwrap()
        .unwrap();
    let principal = Principal { user_id: user.id, role: Role::Customer };

    (user, principal)
}

async fn dish(db: &Addr<PgActor>, price_cents: i64) -> Dish {
    let category = db
        .send(CreateCategory(NewCategory {
            name: format!("Category {}", unique() % 100_000),
            description: String::new(),
            image_url: String::new(),
        }))
        .await
        .unwrap()
        .unwrap();

    db.send(CreateDish(NewDish {
        category_id: category.id,
        name: format!("Dish {}", unique() % 100_000),
        description: String::new(),
        price_cents,
        image_url: String::new(),
        is_available: true,
    }))
    .await
    .unwrap()
    .unwrap()
}

async fn address(db: &Addr<PgActor>, principal: Principal, is_default: bool) -> Address {
    db.send(CreateAddress {
        principal,
        address: NewAddress {
            user_id: 0,
            city: "Lviv".to_owned(),
            street: "Shevchenka".to_owned(),
            building_number: "12".to_owned(),
            floor: String::new(),
            apartment_number: String::new(),
            is_default,
        },
    })
    .await
    .unwrap()
    .unwrap()
}

async fn add(db: &Addr<PgActor>, principal: Principal, dish_id: i64, quantity: i32) -> Result<i32, ServiceError> {
    db.send(AddCartItem { principal, dish_id, quantity })
        .await
        .unwrap()
        .map(|item| item.quantity)
}

fn place(principal: Principal, address_id: i64) -> PlaceOrder {
    PlaceOrder {
        principal,
        address_id,
        delivery_fee_cents: 300,
        estimated_delivery_minutes: 45,
        method: PaymentMethod::Cash,
    }
}

#[actix_web::test]
async fn adding_the_same_dish_twice_merges_lines() {
    let db = db_or_skip!();
    let (_, alice) = customer(&db).await;
    let soup = dish(&db, 1000).await;

    assert_eq!(add(&db, alice, soup.id, 2).await.unwrap(), 2);
    assert_eq!(add(&db, alice, soup.id, 3).await.unwrap(), 5);

    let cart = db.send(GetOrCreateCart(alice)).await.unwrap().unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 5);
}

#[actix_web::test]
async fn quantity_overflow_is_a_validation_error() {
    let db = db_or_skip!();
    let (_, alice) = customer(&db).await;
    let soup = dish(&db, 1000).await;

    add(&db, alice, soup.id, i32::MAX).await.unwrap();
    let overflow = add(&db, alice, soup.id, 1).await;
    assert!(matches!(overflow, Err(ServiceError::Validation(_))), "{overflow:?}");

    let cart = db.send(GetOrCreateCart(alice)).await.unwrap().unwrap();
    assert_eq!(cart.items[0].quantity, i32::MAX);
}

#[actix_web::test]
async fn unavailable_dish_aborts_checkout_and_keeps_cart() {
    let db = db_or_skip!();
    let (_, alice) = customer(&db).await;
    let home = address(&db, alice, true).await;
    let soup = dish(&db, 1000).await;
    let salad = dish(&db, 500).await;

    add(&db, alice, soup.id, 2).await.unwrap();
    add(&db, alice, salad.id, 1).await.unwrap();

    db.send(UpdateDish {
        dish_id: salad.id,
        changes: DishChanges { is_available: Some(false), ..Default::default() },
    })
    .await
    .unwrap()
    .unwrap();

    let placed = db.send(place(alice, home.id)).await.unwrap();
    assert!(matches!(placed, Err(ServiceError::DishUnavailable(id)) if id == salad.id));

    let orders = db
        .send(FetchOrders { principal: alice, all_users: false })
        .await
        .unwrap()
        .unwrap();
    assert!(orders.is_empty());

    let cart = db.send(GetOrCreateCart(alice)).await.unwrap().unwrap();
    assert_eq!(cart.items.len(), 2);
}

#[actix_web::test]
async fn order_prices_are_frozen_at_checkout() {
    let db = db_or_skip!();
    let (_, alice) = customer(&db).await;
    let home = address(&db, alice, true).await;
    let soup = dish(&db, 1000).await;
    let salad = dish(&db, 500).await;

    add(&db, alice, soup.id, 2).await.unwrap();
    add(&db, alice, salad.id, 1).await.unwrap();

    let placed = db.send(place(alice, home.id)).await.unwrap().unwrap();
    assert_eq!(placed.order.subtotal_cents, 2500);
    assert_eq!(placed.order.total_amount_cents, 2800);
    assert_eq!(placed.status, OrderStatus::Placed);

    let payment = placed.payment.as_ref().unwrap();
    assert_eq!(payment.amount_cents, 2800);
    assert_eq!(payment.status, "pending");

    let cart = db.send(GetOrCreateCart(alice)).await.unwrap().unwrap();
    assert!(cart.items.is_empty());

    db.send(UpdateDish {
        dish_id: soup.id,
        changes: DishChanges { price_cents: Some(9900), ..Default::default() },
    })
    .await
    .unwrap()
    .unwrap();

    let detail = db
        .send(FetchOrder { principal: alice, order_id: placed.order.id })
        .await
        .unwrap()
        .unwrap();
    let subtotals: Vec<i64> = detail.items.iter().map(|item| item.subtotal_cents).collect();
    assert_eq!(subtotals, vec![2000, 500]);
    assert_eq!(detail.order.total_amount_cents, 2800);
}

#[actix_web::test]
async fn empty_cart_cannot_be_checked_out() {
    let db = db_or_skip!();
    let (_, alice) = customer(&db).await;
    let home = address(&db, alice, true).await;

    let placed = db.send(place(alice, home.id)).await.unwrap();
    assert!(matches!(placed, Err(ServiceError::EmptyCart)));
}

#[actix_web::test]
async fn other_users_order_is_forbidden() {
    let db = db_or_skip!();
    let (_, alice) = customer(&db).await;
    let (_, bob) = customer(&db).await;
    let home = address(&db, alice, true).await;
    let soup = dish(&db, 1000).await;

    add(&db, alice, soup.id, 1).await.unwrap();
    let order_id = db.send(place(alice, home.id)).await.unwrap().unwrap().order.id;

    let read = db.send(FetchOrder { principal: bob, order_id }).await.unwrap();
    assert!(matches!(read, Err(ServiceError::Forbidden(_))));

    let payment = db.send(FetchPayment { principal: bob, order_id }).await.unwrap();
    assert!(matches!(payment, Err(ServiceError::Forbidden(_))));

    let status = db
        .send(AppendStatus { principal: bob, order_id, status: OrderStatus::Ready })
        .await
        .unwrap();
    assert!(matches!(status, Err(ServiceError::Forbidden(_))));

    let current = db.send(FetchCurrentStatus { principal: bob, order_id }).await.unwrap();
    assert!(matches!(current, Err(ServiceError::Forbidden(_))));

    let staff = Principal { user_id: bob.user_id, role: Role::Admin };
    assert!(db.send(FetchOrder { principal: staff, order_id }).await.unwrap().is_ok());
}

#[actix_web::test]
async fn checkout_rejects_someone_elses_address() {
    let db = db_or_skip!();
    let (_, alice) = customer(&db).await;
    let (_, bob) = customer(&db).await;
    let bobs_home = address(&db, bob, true).await;
    let soup = dish(&db, 1000).await;

    add(&db, alice, soup.id, 1).await.unwrap();

    let placed = db.send(place(alice, bobs_home.id)).await.unwrap();
    assert!(matches!(placed, Err(ServiceError::Forbidden(_))));
}

#[actix_web::test]
async fn only_one_default_address_per_user() {
    let db = db_or_skip!();
    let (_, alice) = customer(&db).await;

    let first = address(&db, alice, true).await;
    let second = address(&db, alice, true).await;
    let third = address(&db, alice, false).await;

    let defaults = |list: Vec<Address>| list.into_iter().filter(|a| a.is_default).map(|a| a.id).collect::<Vec<_>>();

    let listed = db.send(FetchAddresses(alice)).await.unwrap().unwrap();
    assert_eq!(listed[0].id, second.id);
    assert_eq!(defaults(listed), vec![second.id]);

    db.send(UpdateAddress {
        principal: alice,
        address_id: third.id,
        changes: AddressChanges { is_default: Some(true), ..Default::default() },
    })
    .await
    .unwrap()
    .unwrap();

    let listed = db.send(FetchAddresses(alice)).await.unwrap().unwrap();
    assert_eq!(defaults(listed), vec![third.id]);
    assert_ne!(first.id, third.id);
}

#[actix_web::test]
async fn status_timeline_reports_latest_entry() {
    let db = db_or_skip!();
    let (_, alice) = customer(&db).await;
    let home = address(&db, alice, true).await;
    let soup = dish(&db, 1000).await;

    add(&db, alice, soup.id, 1).await.unwrap();
    let order_id = db.send(place(alice, home.id)).await.unwrap().unwrap().order.id;

    let current = db.send(FetchCurrentStatus { principal: alice, order_id }).await.unwrap().unwrap();
    assert_eq!(current.status, OrderStatus::Placed);
    assert!(current.since.is_none());

    for status in [OrderStatus::Ready, OrderStatus::OnTheWay] {
        db.send(AppendStatus { principal: alice, order_id, status })
            .await
            .unwrap()
            .unwrap();
    }

    let current = db.send(FetchCurrentStatus { principal: alice, order_id }).await.unwrap().unwrap();
    assert_eq!(current.status, OrderStatus::OnTheWay);

    let timeline = db.send(FetchStatusUpdates { principal: alice, order_id }).await.unwrap().unwrap();
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[0].status, "on_the_way");
}

#[actix_web::test]
async fn clearing_the_cart_removes_every_line() {
    let db = db_or_skip!();
    let (_, alice) = customer(&db).await;
    let soup = dish(&db, 1000).await;
    let salad = dish(&db, 500).await;

    add(&db, alice, soup.id, 1).await.unwrap();
    add(&db, alice, salad.id, 4).await.unwrap();

    let cleared = db.send(ClearCart(alice)).await.unwrap().unwrap();
    assert!(cleared.items.is_empty());

    let cart = db.send(GetOrCreateCart(alice)).await.unwrap().unwrap();
    assert_eq!(cart.cart.id, cleared.cart.id);
    assert!(cart.items.is_empty());
}

#[actix_web::test]
async fn password_change_checks_current_password() {
    let db = db_or_skip!();
    let (user, alice) = customer(&db).await;

    let wrong = db
        .send(ChangePassword {
            principal: alice,
            current_password: "not-my-password".to_owned(),
            new_password: "password-2".to_owned(),
        })
        .await
        .unwrap();
    assert!(matches!(wrong, Err(ServiceError::Unauthorized(_))));

    db.send(ChangePassword {
        principal: alice,
        current_password: "password-1".to_owned(),
        new_password: "password-2".to_owned(),
    })
    .await
    .unwrap()
    .unwrap();

    let stored = db.send(FetchUserByEmail(user.email)).await.unwrap().unwrap();
    assert!(verify_password("password-2", &stored.password_hash));
    assert!(!verify_password("password-1", &stored.password_hash));
}
