use actix_web::http::header::AUTHORIZATION;
use uuid::Uuid;

use crate::{
    app::AppState,
    auth::token::Token,
    database::models::user::User,
};

pub fn unique_email() -> String {
    format!("test-{}@example.com", Uuid::new_v4())
}

pub fn bearer(token: &str) -> (actix_web::http::header::HeaderName, String) {
    (AUTHORIZATION, format!("Bearer {}", token))
}

/// Creates a user straight in the database and logs them in
pub fn user_with_token(app_state: &AppState, admin: bool) -> (User, String) {
    let user = User::new(
        &app_state.psql_pool.get().unwrap(),
        &unique_email(),
        "Test_user123",
        "test_password123",
        admin,
    )
    .unwrap();
    let token = Token::new(
        &mut app_state.redis_pool.get().unwrap(),
        user.id,
        app_state.token_ttl_secs,
    )
    .unwrap();

    (user, token)
}
