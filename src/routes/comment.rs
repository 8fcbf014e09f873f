use actix_web::{
    delete, get, post, put,
    web::{self, Data, Query},
    HttpRequest, HttpResponse,
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    app::{AppError, AppState},
    auth::AuthUser,
    database::models::{
        comment::{validate_content, Comment, CommentWithUser},
        post::Post,
    },
};

#[derive(Deserialize)]
pub struct CommentQuery {
    #[serde(rename = "postId")]
    pub post_id: Option<String>,
}

#[derive(Deserialize, Serialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct NewComment {
    pub content: String,
    pub post_id: Option<i32>,
}

#[derive(Deserialize, Serialize, Default)]
#[serde(default)]
struct EditedComment {
    pub content: String,
}

/// Pipe for getting comments of a post, oldest first
/// - url: `{domain}/api/comments?postId={post_id}`
///
/// # Response
/// ## Ok
/// - json formatted array of comments with their user
/// ```
/// [
///     {
///         "id": 12,
///         "content": "Nice post",
///         "postId": 73,
///         "userId": 4,
///         "createdAt": "2022-08-04T09:22:30.664361",
///         "user": { "id": 4, "email": "jane@example.com", "username": "jane", .. }
///     }
/// ]
/// ```
/// ## Error
/// - Bad request, `postId` missing or not a number
#[get("/api/comments")]
pub async fn get_comments(query: Query<CommentQuery>, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let post_id = query
        .into_inner()
        .post_id
        .ok_or(AppError::BadRequest("postId is required."))?
        .trim()
        .parse::<i32>()?;

    let comments = web::block(move || -> Result<Vec<CommentWithUser>, AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        Comment::for_post(&psql_conn, post_id)
    })
    .await??;

    Ok(HttpResponse::Ok().json(comments))
}

/// Pipe for commenting on a post as the logged in user
/// - url: `{domain}/api/comments`
///
/// # HTTP request requirements
/// ## header
/// - `Authorization: Bearer {token}`
/// ## body
/// - json containing `content` and `postId`
///
/// # Response
/// ## Created
/// - the new comment with its user
/// ## Error
/// - Bad request
/// - Unauthorized
/// - Not found, the post doesn't exist
#[post("/api/comments")]
pub async fn create_comment(
    auth: AuthUser,
    req_body: String,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let new_comment = serde_json::from_str::<NewComment>(&req_body)?;
    let post_id = new_comment
        .post_id
        .ok_or(AppError::BadRequest("postId is required."))?;
    validate_content(&new_comment.content)?;

    let comment = web::block(move || -> Result<CommentWithUser, AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        Post::find_by_id(&psql_conn, post_id)?;

        let comment = Comment::new(&psql_conn, post_id, auth.user.id, &new_comment.content)?;
        Ok(CommentWithUser {
            comment,
            user: auth.user,
        })
    })
    .await??;

    info!("user {} commented on post {}", comment.user.id, post_id);
    Ok(HttpResponse::Created().json(comment))
}

/// Pipe for editing a comment, only its owner can
/// - url: `{domain}/api/comments/{comment_id}`
///
/// # HTTP request requirements
/// ## body
/// - json containing `content`
#[put("/api/comments/{comment_id}")]
pub async fn update_comment(
    req: HttpRequest,
    auth: AuthUser,
    req_body: String,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let comment_id = req.match_info().query("comment_id").parse::<i32>()?;
    let edited = serde_json::from_str::<EditedComment>(&req_body)?;

    let comment = web::block(move || -> Result<Comment, AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        let comment = Comment::find_by_id(&psql_conn, comment_id)?;
        if comment.user_id != auth.user.id {
            return Err(AppError::Forbidden("You can only update your own comments."));
        }

        comment.update_content(&psql_conn, &edited.content)
    })
    .await??;

    Ok(HttpResponse::Ok().json(comment))
}

/// Pipe for deleting a comment, allowed for its owner and admins
/// - url: `{domain}/api/comments/{comment_id}`
///
/// # Response
/// ## No content
/// ## Error
/// - Unauthorized
/// - Forbidden
/// - Not found
#[delete("/api/comments/{comment_id}")]
pub async fn delete_comment(
    req: HttpRequest,
    auth: AuthUser,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let comment_id = req.match_info().query("comment_id").parse::<i32>()?;

    web::block(move || -> Result<(), AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        let comment = Comment::find_by_id(&psql_conn, comment_id)?;
        if !auth.can_manage(comment.user_id) {
            return Err(AppError::Forbidden("You can only delete your own comments."));
        }

        comment.delete(&psql_conn)
    })
    .await??;

    Ok(HttpResponse::NoContent().finish())
}
