use chrono::{NaiveDateTime, Utc};
use diesel::{prelude::*, PgConnection};
use serde::Serialize;

use super::user::User;
use crate::{
    app::AppError,
    schema::{comments, users},
};

#[derive(Debug, Queryable, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i32,
    pub content: String,
    pub post_id: i32,
    pub user_id: i32,
    pub created_at: NaiveDateTime,
}

/// A comment as sent to clients, with its author
#[derive(Debug, Clone, Serialize)]
pub struct CommentWithUser {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: User,
}

#[derive(Insertable)]
#[table_name = "comments"]
struct CommentInsert<'a> {
    pub content: &'a str,
    pub post_id: i32,
    pub user_id: i32,
    pub created_at: NaiveDateTime,
}

pub fn validate_content(content: &str) -> Result<&str, AppError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("Content is required."));
    }
    Ok(content)
}

impl Comment {
    /** Creates a comment on the post specified, the post must exist */
    pub fn new(conn: &PgConnection, post_id: i32, user_id: i32, content: &str) -> Result<Comment, AppError> {
        let record = CommentInsert {
            content: validate_content(content)?,
            post_id,
            user_id,
            created_at: Utc::now().naive_utc(),
        };

        Ok(diesel::insert_into(comments::table)
            .values(&record)
            .get_result::<Comment>(conn)?)
    }

    /** Returns comment with the id specified */
    pub fn find_by_id(conn: &PgConnection, comment_id: i32) -> Result<Comment, AppError> {
        comments::table
            .find(comment_id)
            .first::<Comment>(conn)
            .optional()?
            .ok_or(AppError::NotFound("Comment not found."))
    }

    /** Returns all comments posted on a post, oldest first */
    pub fn for_post(conn: &PgConnection, post_id: i32) -> Result<Vec<CommentWithUser>, AppError> {
        let rows = comments::table
            .inner_join(users::table)
            .filter(comments::post_id.eq(post_id))
            .order((comments::created_at.asc(), comments::id.asc()))
            .load::<(Comment, User)>(conn)?;

        Ok(rows
            .into_iter()
            .map(|(comment, user)| CommentWithUser { comment, user })
            .collect())
    }

    pub fn update_content(&self, conn: &PgConnection, content: &str) -> Result<Comment, AppError> {
        let content = validate_content(content)?;

        Ok(diesel::update(comments::table.find(self.id))
            .set(comments::content.eq(content))
            .get_result::<Comment>(conn)?)
    }

    /** Deletes a comment from database, its likes go with it */
    pub fn delete(&self, conn: &PgConnection) -> Result<(), AppError> {
        diesel::delete(comments::table.find(self.id)).execute(conn)?;
        Ok(())
    }
}
