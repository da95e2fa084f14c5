use actix::Handler;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper};

use crate::auth::authorize;
use crate::error::ServiceError;
use crate::services::db_models::{DishReviews, Review};
use crate::services::db_utils::PgActor;
use crate::services::insertable::NewReview;
use crate::services::messages::{CreateReview, DeleteReview, FetchReviews};
use crate::services::validate;

pub fn average_rating(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }

    let total: i64 = reviews.iter().map(|review| i64::from(review.rating)).sum();
    Some(total as f64 / reviews.len() as f64)
}

impl Handler<CreateReview> for PgActor {
    type Result = Result<Review, ServiceError>;

    fn handle(&mut self, msg: CreateReview, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::dishes::dsl::dishes;
        use crate::schema::reviews::dsl::reviews;

        validate::rating(msg.rating)?;

        let mut conn = self.connection()?;

        dishes
            .find(msg.dish_id)
            .select(crate::schema::dishes::id)
            .first::<i64>(&mut conn)
            .optional()?
            .ok_or_else(|| ServiceError::not_found(format!("Dish {}", msg.dish_id)))?;

        diesel::insert_into(reviews)
            .values(NewReview {
                user_id: msg.principal.user_id,
                dish_id: msg.dish_id,
                rating: msg.rating,
                comment: msg.comment,
            })
            .returning(Review::as_returning())
            .get_result(&mut conn)
            .map_err(|err| match ServiceError::from(err) {
                ServiceError::Conflict(_) => {
                    ServiceError::Conflict("You have already reviewed this dish".to_owned())
                }
                other => other,
            })
    }
}

impl Handler<FetchReviews> for PgActor {
    type Result = Result<DishReviews, ServiceError>;

    fn handle(&mut self, msg: FetchReviews, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::reviews::{created_at, dish_id, dsl::reviews, id};

        let mut conn = self.connection()?;

        let found = reviews
            .filter(dish_id.eq(msg.0))
            .order((created_at.desc(), id.desc()))
            .select(Review::as_select())
            .load(&mut conn)?;

        Ok(DishReviews {
            dish_id: msg.0,
            average_rating: average_rating(&found),
            reviews: found,
        })
    }
}

impl Handler<DeleteReview> for PgActor {
    type Result = Result<(), ServiceError>;

    fn handle(&mut self, msg: DeleteReview, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::reviews::{dsl::reviews, user_id};

        let mut conn = self.connection()?;

        let author = reviews
            .find(msg.review_id)
            .select(user_id)
            .first::<i64>(&mut conn)
            .optional()?
            .ok_or_else(|| ServiceError::not_found(format!("Review {}", msg.review_id)))?;

        authorize(&msg.principal, author)?;

        diesel::delete(reviews.find(msg.review_id)).execute(&mut conn)?;

        Ok(())
    }
}
