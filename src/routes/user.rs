use actix_web::{
    delete, get, post, put,
    web::{self, Data},
    HttpRequest, HttpResponse,
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    app::{AppError, AppState},
    auth::{token::Token, AuthUser},
    database::models::user::{validate_new_user, User, UserUpdate},
    uploads,
};

#[derive(Deserialize, Serialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct NewUser {
    pub email: String,
    pub username: String,
    pub password: String,
    pub is_admin: bool,
}

#[derive(Deserialize, Serialize, Default)]
struct EditedUser {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Pipe listing every user, admins only
/// - url: `{domain}/api/users`
///
/// # Response
/// ## Ok
/// - json array of users, passwords are never included
/// ## Error
/// - Unauthorized
/// - Forbidden
#[get("/api/users")]
pub async fn get_users(auth: AuthUser, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let users = web::block(move || -> Result<Vec<User>, AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        User::all(&psql_conn)
    })
    .await??;

    Ok(HttpResponse::Ok().json(users))
}

/// Pipe for creating an user, admins only. Unlike registering this can create admins.
/// - url: `{domain}/api/users`
///
/// # HTTP request requirements
/// ## body
/// - json containing `email`, `username`, `password` and optionally `isAdmin`
///
/// # Response
/// ## Created
/// - the new user
/// ## Error
/// - Bad request
/// - Unauthorized
/// - Forbidden
#[post("/api/users")]
pub async fn create_user(
    auth: AuthUser,
    req_body: String,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let new_user = serde_json::from_str::<NewUser>(&req_body)?;
    validate_new_user(&new_user.email, &new_user.username, &new_user.password)?;

    let user = web::block(move || -> Result<User, AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        User::new(
            &psql_conn,
            &new_user.email,
            &new_user.username,
            &new_user.password,
            new_user.is_admin,
        )
    })
    .await??;

    info!("user {} created user {}", auth.user.id, user.id);
    Ok(HttpResponse::Created().json(user))
}

/// Pipe for editing an user, allowed for the user themselves and admins
/// - url: `{domain}/api/users/{user_id}`
///
/// # HTTP request requirements
/// - `{user_id}` as parameter
/// ## body
/// - json with the fields being changed: `email`, `username` and/or `password`
///
/// # Response
/// ## Ok
/// - the updated user
/// ## Error
/// - Bad request
/// - Unauthorized
/// - Forbidden
/// - Not found
#[put("/api/users/{user_id}")]
pub async fn update_user(
    req: HttpRequest,
    auth: AuthUser,
    req_body: String,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user_id = req.match_info().query("user_id").parse::<i32>()?;
    let edited = serde_json::from_str::<EditedUser>(&req_body)?;

    let user = web::block(move || -> Result<User, AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        let to_edit = User::find_by_id(&psql_conn, user_id)?;
        if !auth.can_manage(to_edit.id) {
            return Err(AppError::Forbidden("You can only update your own account."));
        }

        to_edit.update(
            &psql_conn,
            UserUpdate {
                email: edited.email,
                username: edited.username,
                password: edited.password,
            },
        )
    })
    .await??;

    Ok(HttpResponse::Ok().json(user))
}

/// Pipe for deleting an user along with their posts, comments, likes and uploaded images.
/// Users deleting their own account are logged out.
/// - url: `{domain}/api/users/{user_id}`
///
/// # HTTP request requirements
/// - `{user_id}` as parameter
/// ## header
/// - `Authorization: Bearer {token}`
///
/// # Response
/// ## No content
/// ## Error
/// - Bad request
/// - Unauthorized
/// - Forbidden
/// - Not found
#[delete("/api/users/{user_id}")]
pub async fn delete_user(
    req: HttpRequest,
    auth: AuthUser,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user_id = req.match_info().query("user_id").parse::<i32>()?;

    let deleted_by = auth.user.id;
    web::block(move || -> Result<(), AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        let to_delete = User::find_by_id(&psql_conn, user_id)?;
        if !auth.can_manage(to_delete.id) {
            return Err(AppError::Forbidden("You can only delete your own account."));
        }

        let images = to_delete.delete(&psql_conn)?;
        for image in images {
            uploads::remove_image(&app_state.upload_dir, &image);
        }

        if auth.user.id == to_delete.id {
            let mut redis_conn = app_state.redis_pool.get()?;
            Token::delete(&mut redis_conn, &auth.token)?;
        }
        Ok(())
    })
    .await??;

    info!("user {} deleted user {}", deleted_by, user_id);
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use actix_web::{test, test::call_service, App};
    use serde_json::json;

    use super::*;
    use crate::{
        database::models::post::{NewPost, Post},
        routes::{configure, test_utils},
    };

    #[actix_rt::test]
    async fn test_users_need_token() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(AppState::unchecked()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/users").to_request();
        pretty_assertions::assert_eq!(call_service(&app, req).await.status().as_u16(), 401);

        let req = test::TestRequest::delete().uri("/api/users/1").to_request();
        pretty_assertions::assert_eq!(call_service(&app, req).await.status().as_u16(), 401);
    }

    #[actix_rt::test]
    #[ignore = "needs postgres and redis"]
    async fn test_user_admin_flow() {
        let app_state = AppState::unchecked();
        let app = test::init_service(
            App::new()
                .app_data(Data::new(app_state.clone()))
                .configure(configure),
        )
        .await;

        let (admin, admin_token) = test_utils::user_with_token(&app_state, true);
        let (user, user_token) = test_utils::user_with_token(&app_state, false);

        //Regular users can't list
        let req = test::TestRequest::get()
            .uri("/api/users")
            .insert_header(test_utils::bearer(&user_token))
            .to_request();
        pretty_assertions::assert_eq!(call_service(&app, req).await.status().as_u16(), 403);

        let req = test::TestRequest::get()
            .uri("/api/users")
            .insert_header(test_utils::bearer(&admin_token))
            .to_request();
        pretty_assertions::assert_eq!(call_service(&app, req).await.status().as_u16(), 200);

        //Regular users can't edit others
        let req = test::TestRequest::put()
            .uri(format!("/api/users/{}", admin.id).as_str())
            .insert_header(test_utils::bearer(&user_token))
            .set_json(json!({ "username": "hijacked" }))
            .to_request();
        pretty_assertions::assert_eq!(call_service(&app, req).await.status().as_u16(), 403);

        let req = test::TestRequest::put()
            .uri(format!("/api/users/{}", user.id).as_str())
            .insert_header(test_utils::bearer(&user_token))
            .set_json(json!({ "username": "renamed" }))
            .to_request();
        let resp = call_service(&app, req).await;
        pretty_assertions::assert_eq!(resp.status().as_u16(), 200);
        let body: serde_json::Value = test::read_body_json(resp).await;
        pretty_assertions::assert_eq!(body["username"], json!("renamed"));

        //A post with an uploaded image, removed along with the user
        std::fs::create_dir_all(&app_state.upload_dir).unwrap();
        let image = format!("{}{}.png", uploads::PUBLIC_PREFIX, uuid::Uuid::new_v4());
        let image_path = uploads::disk_path(&app_state.upload_dir, &image).unwrap();
        std::fs::write(&image_path, b"user image").unwrap();
        Post::new(
            &app_state.psql_pool.get().unwrap(),
            &user,
            &NewPost {
                title: String::from("Test title"),
                content: String::from("Test body"),
                published: true,
                image: Some(image),
                tag_names: vec![],
            },
        )
        .unwrap();

        //Deleting yourself revokes the token
        let req = test::TestRequest::delete()
            .uri(format!("/api/users/{}", user.id).as_str())
            .insert_header(test_utils::bearer(&user_token))
            .to_request();
        pretty_assertions::assert_eq!(call_service(&app, req).await.status().as_u16(), 204);
        assert!(User::find_by_id(&app_state.psql_pool.get().unwrap(), user.id).is_err());
        assert!(!image_path.exists());
        pretty_assertions::assert_eq!(
            Token::find(&mut app_state.redis_pool.get().unwrap(), &user_token).unwrap(),
            None
        );

        let req = test::TestRequest::get()
            .uri("/api/auth/profile")
            .insert_header(test_utils::bearer(&user_token))
            .to_request();
        pretty_assertions::assert_eq!(call_service(&app, req).await.status().as_u16(), 401);

        let req = test::TestRequest::delete()
            .uri(format!("/api/users/{}", user.id).as_str())
            .insert_header(test_utils::bearer(&admin_token))
            .to_request();
        pretty_assertions::assert_eq!(call_service(&app, req).await.status().as_u16(), 404);

        admin.delete(&app_state.psql_pool.get().unwrap()).unwrap();
    }
}
