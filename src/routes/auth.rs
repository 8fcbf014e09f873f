use actix_web::{
    get, post, put,
    web::{self, Data},
    HttpResponse,
};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    app::{AppError, AppState},
    auth::{token::Token, AuthUser},
    database::models::user::{validate_new_user, User},
};

#[derive(Deserialize, Serialize, Default)]
#[serde(default)]
struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Serialize, Default)]
#[serde(default)]
struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Pipe for logging in
/// - url: `{domain}/api/auth/login`
///
/// # HTTP request requirements
/// ## body
/// - json containing `email` and `password` keys
///
/// # Example
/// ```
/// let data = "{ \"email\": \"jane@example.com\", \"password\": \"test_password123\" }";
/// let request = actix_web::test::TestRequest::post()
///     .uri("localhost/api/auth/login")
///     .set_payload(data)
///     .to_request();
/// ```
///
/// # Response
/// ## Ok
/// ```
/// { "message": "Login successful", "token": "QqkD0zUe5n0Z9V2aQmS4d3yOa3k8v1Lx" }
/// ```
/// ## Error
/// - Bad request, missing fields or wrong credentials
/// - Internal server error
#[post("/api/auth/login")]
pub async fn login(req_body: String, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let credentials = serde_json::from_str::<Credentials>(&req_body)?;
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(AppError::BadRequest("Email and password are required."));
    }

    let (token, user_id) = web::block(move || -> Result<(String, i32), AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        let user = User::find_by_email(&psql_conn, &credentials.email)?
            .filter(|user| user.check_password(&credentials.password))
            .ok_or(AppError::BadRequest("Invalid email or password."))?;

        let mut redis_conn = app_state.redis_pool.get()?;
        let token = Token::new(&mut redis_conn, user.id, app_state.token_ttl_secs)?;
        Ok((token, user.id))
    })
    .await??;

    info!("user {} logged in", user_id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Login successful", "token": token })))
}

/// Pipe for creating an account, registered users are never admins
/// - url: `{domain}/api/auth/register`
///
/// # HTTP request requirements
/// ## body
/// - json containing `email`, `username` and `password` keys
/// - `password` must be at least 8 characters long
///
/// # Response
/// ## Created
/// - `{ "message": "User created successfully", "user": {..} }`
/// ## Error
/// - Bad request
#[post("/api/auth/register")]
pub async fn register(req_body: String, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let registration = serde_json::from_str::<Registration>(&req_body)?;
    validate_new_user(&registration.email, &registration.username, &registration.password)?;

    let user = web::block(move || -> Result<User, AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        User::new(
            &psql_conn,
            &registration.email,
            &registration.username,
            &registration.password,
            false,
        )
    })
    .await??;

    info!("registered user {}", user.id);
    Ok(HttpResponse::Created().json(json!({ "message": "User created successfully", "user": user })))
}

/// Pipe for logging out, the token stops working right away
/// - url: `{domain}/api/auth/logout`
///
/// # HTTP request requirements
/// ## header
/// - `Authorization: Bearer {token}`
///
/// # Response
/// ## Ok
/// ## Error
/// - Unauthorized
#[post("/api/auth/logout")]
pub async fn logout(auth: AuthUser, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let AuthUser { user, token } = auth;
    web::block(move || -> Result<(), AppError> {
        let mut redis_conn = app_state.redis_pool.get()?;
        Ok(Token::delete(&mut redis_conn, &token)?)
    })
    .await??;

    info!("user {} logged out", user.id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully logged out." })))
}

/// Pipe returning the logged in user
/// - url: `{domain}/api/auth/profile`
#[get("/api/auth/profile")]
pub async fn profile(auth: AuthUser) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(auth.user))
}

/// Pipe for refreshing a token for a server specified duration
/// - url: `{domain}/api/auth/refresh`
///
/// # HTTP request requirements
/// ## header
/// - `Authorization: Bearer {token}`
///
/// # Response
/// ## Ok
/// - `{ "message": "Token refreshed", "token": "{token}" }`
/// ## Error
/// - Unauthorized
#[put("/api/auth/refresh")]
pub async fn refresh_token(auth: AuthUser, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let token = auth.token;
    let refreshed = web::block(move || -> Result<String, AppError> {
        let mut redis_conn = app_state.redis_pool.get()?;
        if !Token::refresh(&mut redis_conn, &token, app_state.token_ttl_secs)? {
            return Err(AppError::UnauthorizedError);
        }
        Ok(token)
    })
    .await??;

    Ok(HttpResponse::Ok().json(json!({ "message": "Token refreshed", "token": refreshed })))
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};

    use super::*;
    use crate::routes::{configure, test_utils};

    #[actix_rt::test]
    async fn test_login_requires_fields() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(AppState::unchecked()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_payload("{ \"email\": \"jane@example.com\" }")
            .to_request();
        let resp = test::call_service(&app, req).await;
        pretty_assertions::assert_eq!(resp.status().as_u16(), 400);

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_payload("not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        pretty_assertions::assert_eq!(resp.status().as_u16(), 400);
    }

    #[actix_rt::test]
    async fn test_register_validates_before_touching_database() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(AppState::unchecked()))
                .configure(configure),
        )
        .await;

        let payload = Registration {
            email: String::from("not-an-email"),
            username: String::from("Test_user123"),
            password: String::from("test_password123"),
        };
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        pretty_assertions::assert_eq!(resp.status().as_u16(), 400);

        let body: serde_json::Value = test::read_body_json(resp).await;
        pretty_assertions::assert_eq!(body, json!({ "error": "Invalid email format." }));
    }

    #[actix_rt::test]
    async fn test_protected_routes_need_token() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(AppState::unchecked()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/auth/profile").to_request();
        pretty_assertions::assert_eq!(test::call_service(&app, req).await.status().as_u16(), 401);

        let req = test::TestRequest::post().uri("/api/auth/logout").to_request();
        pretty_assertions::assert_eq!(test::call_service(&app, req).await.status().as_u16(), 401);

        let req = test::TestRequest::put().uri("/api/auth/refresh").to_request();
        pretty_assertions::assert_eq!(test::call_service(&app, req).await.status().as_u16(), 401);
    }

    #[actix_rt::test]
    #[ignore = "needs postgres and redis"]
    async fn test_register_login_logout() {
        let app_state = AppState::unchecked();
        let app = test::init_service(
            App::new()
                .app_data(Data::new(app_state.clone()))
                .configure(configure),
        )
        .await;

        let email = test_utils::unique_email();
        let payload = Registration {
            email: email.clone(),
            username: String::from("Test_user123"),
            password: String::from("test_password123"),
        };
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        pretty_assertions::assert_eq!(resp.status().as_u16(), 201);

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(Credentials {
                email: email.clone(),
                password: String::from("wrong_password"),
            })
            .to_request();
        pretty_assertions::assert_eq!(test::call_service(&app, req).await.status().as_u16(), 400);

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(Credentials {
                email: email.clone(),
                password: String::from("test_password123"),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        pretty_assertions::assert_eq!(resp.status().as_u16(), 200);
        let body: serde_json::Value = test::read_body_json(resp).await;
        let token = body["token"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri("/api/auth/profile")
            .insert_header(test_utils::bearer(&token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        pretty_assertions::assert_eq!(resp.status().as_u16(), 200);
        let me: serde_json::Value = test::read_body_json(resp).await;
        pretty_assertions::assert_eq!(me["email"], json!(email));
        pretty_assertions::assert_eq!(me["isAdmin"], json!(false));

        let req = test::TestRequest::post()
            .uri("/api/auth/logout")
            .insert_header(test_utils::bearer(&token))
            .to_request();
        pretty_assertions::assert_eq!(test::call_service(&app, req).await.status().as_u16(), 200);

        let req = test::TestRequest::get()
            .uri("/api/auth/profile")
            .insert_header(test_utils::bearer(&token))
            .to_request();
        pretty_assertions::assert_eq!(test::call_service(&app, req).await.status().as_u16(), 401);

        let user = User::find_by_id(
            &app_state.psql_pool.get().unwrap(),
            me["id"].as_i64().unwrap() as i32,
        )
        .unwrap();
        user.delete(&app_state.psql_pool.get().unwrap()).unwrap();
    }
}
