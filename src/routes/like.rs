use actix_web::{
    delete, get, post,
    web::{self, Data},
    HttpRequest, HttpResponse,
};
use log::info;

use crate::{
    app::{AppError, AppState},
    auth::AuthUser,
    database::models::{
        comment::Comment,
        like::{Like, LikeTarget, LikeWithUser},
        post::Post,
    },
};

fn post_target(req: &HttpRequest) -> Result<LikeTarget, AppError> {
    Ok(LikeTarget::Post(req.match_info().query("post_id").parse::<i32>()?))
}

fn comment_target(req: &HttpRequest) -> Result<LikeTarget, AppError> {
    Ok(LikeTarget::Comment(req.match_info().query("comment_id").parse::<i32>()?))
}

async fn add_like(auth: AuthUser, app_state: Data<AppState>, target: LikeTarget) -> Result<HttpResponse, AppError> {
    let user_id = auth.user.id;
    let like = web::block(move || -> Result<Like, AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        match target {
            LikeTarget::Post(post_id) => {
                Post::find_by_id(&psql_conn, post_id)?;
            }
            LikeTarget::Comment(comment_id) => {
                Comment::find_by_id(&psql_conn, comment_id)?;
            }
        };

        Like::new(&psql_conn, user_id, target)
    })
    .await??;

    info!("user {} liked {:?}", user_id, target);
    Ok(HttpResponse::Created().json(like))
}

async fn remove_like(auth: AuthUser, app_state: Data<AppState>, target: LikeTarget) -> Result<HttpResponse, AppError> {
    let user_id = auth.user.id;
    web::block(move || -> Result<(), AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        Like::delete(&psql_conn, user_id, target)
    })
    .await??;

    Ok(HttpResponse::NoContent().finish())
}

async fn list_likes(app_state: Data<AppState>, target: LikeTarget) -> Result<HttpResponse, AppError> {
    let likes = web::block(move || -> Result<Vec<LikeWithUser>, AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        Like::for_target(&psql_conn, target)
    })
    .await??;

    Ok(HttpResponse::Ok().json(likes))
}

/// Pipe for liking a post as the logged in user
/// - url: `{domain}/api/likes/post-likes/{post_id}`
///
/// # Response
/// ## Created
/// - the like
/// ```
/// { "id": 5, "userId": 4, "postId": 73, "commentId": null, "createdAt": "2022-08-04T09:22:30.664361" }
/// ```
/// ## Error
/// - Bad request, already liked
/// - Unauthorized
/// - Not found
#[post("/api/likes/post-likes/{post_id}")]
pub async fn like_post(req: HttpRequest, auth: AuthUser, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    add_like(auth, app_state, post_target(&req)?).await
}

/// Pipe for taking back a like on a post
/// - url: `{domain}/api/likes/post-likes/{post_id}`
///
/// # Response
/// ## No content
/// ## Error
/// - Unauthorized
/// - Not found, the post wasn't liked
#[delete("/api/likes/post-likes/{post_id}")]
pub async fn unlike_post(req: HttpRequest, auth: AuthUser, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    remove_like(auth, app_state, post_target(&req)?).await
}

/// Pipe listing who liked a post
/// - url: `{domain}/api/likes/post-likes/{post_id}`
#[get("/api/likes/post-likes/{post_id}")]
pub async fn get_post_likes(req: HttpRequest, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    list_likes(app_state, post_target(&req)?).await
}

/// Pipe for liking a comment, same responses as liking a post
/// - url: `{domain}/api/likes/comment-likes/{comment_id}`
#[post("/api/likes/comment-likes/{comment_id}")]
pub async fn like_comment(req: HttpRequest, auth: AuthUser, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    add_like(auth, app_state, comment_target(&req)?).await
}

#[delete("/api/likes/comment-likes/{comment_id}")]
pub async fn unlike_comment(
    req: HttpRequest,
    auth: AuthUser,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    remove_like(auth, app_state, comment_target(&req)?).await
}

#[get("/api/likes/comment-likes/{comment_id}")]
pub async fn get_comment_likes(req: HttpRequest, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    list_likes(app_state, comment_target(&req)?).await
}

#[cfg(test)]
mod tests {
    use actix_web::{test, test::call_service, App};
    use serde_json::json;

    use super::*;
    use crate::{
        database::models::post::NewPost,
        routes::{configure, test_utils},
    };

    #[actix_rt::test]
    async fn test_like_routes_without_database() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(AppState::unchecked()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post().uri("/api/likes/post-likes/1").to_request();
        pretty_assertions::assert_eq!(call_service(&app, req).await.status().as_u16(), 401);

        let req = test::TestRequest::delete().uri("/api/likes/comment-likes/1").to_request();
        pretty_assertions::assert_eq!(call_service(&app, req).await.status().as_u16(), 401);

        let req = test::TestRequest::get().uri("/api/likes/post-likes/first").to_request();
        pretty_assertions::assert_eq!(call_service(&app, req).await.status().as_u16(), 400);
    }

    #[actix_rt::test]
    #[ignore = "needs postgres and redis"]
    async fn test_like_flow() {
        let app_state = AppState::unchecked();
        let app = test::init_service(
            App::new()
                .app_data(Data::new(app_state.clone()))
                .configure(configure),
        )
        .await;

        let (user, token) = test_utils::user_with_token(&app_state, false);
        let psql_conn = app_state.psql_pool.get().unwrap();
        let post = Post::new(
            &psql_conn,
            &user,
            &NewPost {
                title: String::from("Test title"),
                content: String::from("Test body"),
                published: true,
                image: None,
                tag_names: vec![],
            },
        )
        .unwrap();
        let comment = Comment::new(&psql_conn, post.id, user.id, "Test comment").unwrap();

        let like_uri = format!("/api/likes/post-likes/{}", post.id);
        let req = test::TestRequest::post()
            .uri(&like_uri)
            .insert_header(test_utils::bearer(&token))
            .to_request();
        pretty_assertions::assert_eq!(call_service(&app, req).await.status().as_u16(), 201);

        let req = test::TestRequest::post()
            .uri(&like_uri)
            .insert_header(test_utils::bearer(&token))
            .to_request();
        let resp = call_service(&app, req).await;
        pretty_assertions::assert_eq!(resp.status().as_u16(), 400);
        let body: serde_json::Value = test::read_body_json(resp).await;
        pretty_assertions::assert_eq!(body, json!({ "error": "Already liked this post." }));

        let req = test::TestRequest::get().uri(&like_uri).to_request();
        let likes: serde_json::Value = test::read_body_json(call_service(&app, req).await).await;
        pretty_assertions::assert_eq!(likes[0]["user"]["id"], json!(user.id));

        let req = test::TestRequest::delete()
            .uri(&like_uri)
            .insert_header(test_utils::bearer(&token))
            .to_request();
        pretty_assertions::assert_eq!(call_service(&app, req).await.status().as_u16(), 204);

        let req = test::TestRequest::delete()
            .uri(&like_uri)
            .insert_header(test_utils::bearer(&token))
            .to_request();
        pretty_assertions::assert_eq!(call_service(&app, req).await.status().as_u16(), 404);

        //Comment likes are kept apart from post likes
        let req = test::TestRequest::post()
            .uri(format!("/api/likes/comment-likes/{}", comment.id).as_str())
            .insert_header(test_utils::bearer(&token))
            .to_request();
        let like: serde_json::Value = test::read_body_json(call_service(&app, req).await).await;
        pretty_assertions::assert_eq!(like["commentId"], json!(comment.id));
        assert!(like["postId"].is_null());

        let req = test::TestRequest::post()
            .uri("/api/likes/comment-likes/-1")
            .insert_header(test_utils::bearer(&token))
            .to_request();
        pretty_assertions::assert_eq!(call_service(&app, req).await.status().as_u16(), 404);

        user.delete(&psql_conn).unwrap();
    }
}
