use chrono::{NaiveDateTime, Utc};
use diesel::{prelude::*, PgConnection};
use serde::Serialize;

use super::user::User;
use crate::{
    app::AppError,
    schema::{likes, users},
};

#[derive(Debug, Queryable, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub id: i32,
    pub user_id: i32,
    pub post_id: Option<i32>,
    pub comment_id: Option<i32>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct LikeWithUser {
    #[serde(flatten)]
    pub like: Like,
    pub user: User,
}

/// What a like points at, a like has exactly one target
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LikeTarget {
    Post(i32),
    Comment(i32),
}

impl LikeTarget {
    fn columns(self) -> (Option<i32>, Option<i32>) {
        match self {
            LikeTarget::Post(id) => (Some(id), None),
            LikeTarget::Comment(id) => (None, Some(id)),
        }
    }

    fn already_liked(self) -> AppError {
        match self {
            LikeTarget::Post(_) => AppError::BadRequest("Already liked this post."),
            LikeTarget::Comment(_) => AppError::BadRequest("Already liked this comment."),
        }
    }
}

#[derive(Insertable)]
#[table_name = "likes"]
struct LikeInsert {
    pub user_id: i32,
    pub post_id: Option<i32>,
    pub comment_id: Option<i32>,
    pub created_at: NaiveDateTime,
}

impl Like {
    pub fn find(conn: &PgConnection, user_id: i32, target: LikeTarget) -> Result<Option<Like>, AppError> {
        let by_user = likes::table.filter(likes::user_id.eq(user_id));
        let found = match target {
            LikeTarget::Post(id) => by_user.filter(likes::post_id.eq(id)).first::<Like>(conn),
            LikeTarget::Comment(id) => by_user.filter(likes::comment_id.eq(id)).first::<Like>(conn),
        };
        Ok(found.optional()?)
    }

    /// Records the like, a user may like a target only once
    pub fn new(conn: &PgConnection, user_id: i32, target: LikeTarget) -> Result<Like, AppError> {
        if Like::find(conn, user_id, target)?.is_some() {
            return Err(target.already_liked());
        }

        let (post_id, comment_id) = target.columns();
        let like = LikeInsert {
            user_id,
            post_id,
            comment_id,
            created_at: Utc::now().naive_utc(),
        };

        diesel::insert_into(likes::table)
            .values(&like)
            .get_result::<Like>(conn)
            .map_err(|err| match AppError::from(err) {
                AppError::BadRequest("Already exists.") => target.already_liked(),
                other => other,
            })
    }

    /// Removes the like, fails with not found when the user never liked the target
    pub fn delete(conn: &PgConnection, user_id: i32, target: LikeTarget) -> Result<(), AppError> {
        let by_user = likes::table.filter(likes::user_id.eq(user_id));
        let removed = match target {
            LikeTarget::Post(id) => {
                diesel::delete(by_user.filter(likes::post_id.eq(id))).execute(conn)?
            }
            LikeTarget::Comment(id) => {
                diesel::delete(by_user.filter(likes::comment_id.eq(id))).execute(conn)?
            }
        };

        if removed == 0 {
            return Err(AppError::NotFound("Like not found."));
        }
        Ok(())
    }

    pub fn for_target(conn: &PgConnection, target: LikeTarget) -> Result<Vec<LikeWithUser>, AppError> {
        let joined = likes::table.inner_join(users::table);
        let rows = match target {
            LikeTarget::Post(id) => joined
                .filter(likes::post_id.eq(id))
                .order(likes::created_at.asc())
                .load::<(Like, User)>(conn)?,
            LikeTarget::Comment(id) => joined
                .filter(likes::comment_id.eq(id))
                .order(likes::created_at.asc())
                .load::<(Like, User)>(conn)?,
        };

        Ok(rows
            .into_iter()
            .map(|(like, user)| LikeWithUser { like, user })
            .collect())
    }

    pub fn count_for_post(conn: &PgConnection, post_id: i32) -> Result<i64, AppError> {
        Ok(likes::table
            .filter(likes::post_id.eq(post_id))
            .count()
            .get_result::<i64>(conn)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_columns() {
        pretty_assertions::assert_eq!(LikeTarget::Post(4).columns(), (Some(4), None));
        pretty_assertions::assert_eq!(LikeTarget::Comment(9).columns(), (None, Some(9)));
    }

    #[test]
    fn test_already_liked_messages() {
        pretty_assertions::assert_eq!(
            LikeTarget::Post(1).already_liked(),
            AppError::BadRequest("Already liked this post.")
        );
        pretty_assertions::assert_eq!(
            LikeTarget::Comment(1).already_liked(),
            AppError::BadRequest("Already liked this comment.")
        );
    }
}
