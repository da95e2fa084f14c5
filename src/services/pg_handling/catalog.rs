use actix::Handler;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper};

use crate::error::ServiceError;
use crate::services::db_models::{Category, Dish, MenuEntry};
use crate::services::db_utils::PgActor;
use crate::services::messages::{
    CreateCategory, CreateDish, DeleteDish, FetchCategories, FetchDish, FetchDishes, FetchMenu,
    UpdateDish,
};
use crate::services::validate;

impl Handler<FetchCategories> for PgActor {
    type Result = Result<Vec<Category>, ServiceError>;

    fn handle(&mut self, _msg: FetchCategories, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::categories::{dsl::categories, id};

        let mut conn = self.connection()?;

        Ok(categories
            .order(id.asc())
            .select(Category::as_select())
            .load(&mut conn)?)
    }
}

impl Handler<CreateCategory> for PgActor {
    type Result = Result<Category, ServiceError>;

    fn handle(&mut self, msg: CreateCategory, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::categories::dsl::categories;

        if msg.0.name.trim().is_empty() {
            return Err(ServiceError::Validation("Category name is required".to_owned()));
        }

        let mut conn = self.connection()?;

        Ok(diesel::insert_into(categories)
            .values(&msg.0)
            .returning(Category::as_returning())
            .get_result(&mut conn)?)
    }
}

impl Handler<FetchDishes> for PgActor {
    type Result = Result<Vec<Dish>, ServiceError>;

    fn handle(&mut self, msg: FetchDishes, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::dishes::{category_id, dsl::dishes, id};

        let mut conn = self.connection()?;

        let mut query = dishes.order(id.asc()).select(Dish::as_select()).into_boxed();
        if let Some(category) = msg.category_id {
            query = query.filter(category_id.eq(category));
        }

        Ok(query.load(&mut conn)?)
    }
}

impl Handler<FetchDish> for PgActor {
    type Result = Result<Dish, ServiceError>;

    fn handle(&mut self, msg: FetchDish, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::dishes::dsl::dishes;

        let mut conn = self.connection()?;

        dishes
            .find(msg.0)
            .select(Dish::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| ServiceError::not_found(format!("Dish {}", msg.0)))
    }
}

impl Handler<CreateDish> for PgActor {
    type Result = Result<Dish, ServiceError>;

    fn handle(&mut self, msg: CreateDish, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::categories::dsl::categories;
        use crate::schema::dishes::dsl::dishes;

        validate::price(msg.0.price_cents)?;

        let mut conn = self.connection()?;

        conn.build_transaction().run(|trx_conn| {
            categories
                .find(msg.0.category_id)
                .select(crate::schema::categories::id)
                .first::<i64>(trx_conn)
                .optional()?
                .ok_or_else(|| ServiceError::not_found(format!("Category {}", msg.0.category_id)))?;

            let dish = diesel::insert_into(dishes)
                .values(&msg.0)
                .returning(Dish::as_returning())
                .get_result(trx_conn)?;

            tracing::info!(dish_id = dish.id, price_cents = dish.price_cents, "created dish");

            Ok(dish)
        })
    }
}

impl Handler<UpdateDish> for PgActor {
    type Result = Result<Dish, ServiceError>;

    fn handle(&mut self, msg: UpdateDish, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::dishes::dsl::dishes;

        if let Some(price) = msg.changes.price_cents {
            validate::price(price)?;
        }

        let mut conn = self.connection()?;

        if msg.changes.is_empty() {
            return dishes
                .find(msg.dish_id)
                .select(Dish::as_select())
                .first(&mut conn)
                .optional()?
                .ok_or_else(|| ServiceError::not_found(format!("Dish {}", msg.dish_id)));
        }

        // Orders keep their own frozen prices, so a price edit only affects future checkouts.
        diesel::update(dishes.find(msg.dish_id))
            .set(&msg.changes)
            .returning(Dish::as_returning())
            .get_result(&mut conn)
            .optional()?
            .ok_or_else(|| ServiceError::not_found(format!("Dish {}", msg.dish_id)))
    }
}

impl Handler<DeleteDish> for PgActor {
    type Result = Result<(), ServiceError>;

    fn handle(&mut self, msg: DeleteDish, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::dishes::dsl::dishes;

        let mut conn = self.connection()?;

        let deleted = diesel::delete(dishes.find(msg.0))
            .execute(&mut conn)
            .map_err(|err| match ServiceError::from(err) {
                ServiceError::Conflict(_) => ServiceError::Conflict(format!(
                    "Dish {} is referenced by existing orders",
                    msg.0
                )),
                other => other,
            })?;

        if deleted == 0 {
            return Err(ServiceError::not_found(format!("Dish {}", msg.0)));
        }

        Ok(())
    }
}

impl Handler<FetchMenu> for PgActor {
    type Result = Result<Vec<MenuEntry>, ServiceError>;

    fn handle(&mut self, _msg: FetchMenu, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::categories::{dsl::categories, id as category_pk, name as category_name};
        use crate::schema::dishes::{id as dish_pk, is_available};

        let mut conn = self.connection()?;

        let rows = crate::schema::dishes::table
            .inner_join(categories)
            .filter(is_available.eq(true))
            .order((category_pk.asc(), dish_pk.asc()))
            .select((Dish::as_select(), category_name))
            .load::<(Dish, String)>(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|(dish, category)| MenuEntry { dish, category_name: category })
            .collect())
    }
}
