use actix_web::{
    get, post,
    web::{self, Data},
    HttpResponse,
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    app::{AppError, AppState},
    auth::AuthUser,
    database::models::tag::Tag,
};

#[derive(Deserialize, Serialize, Default)]
#[serde(default)]
struct NewTag {
    pub name: String,
}

/// Pipe listing every tag ordered by name
/// - url: `{domain}/api/tags`
///
/// # Response
/// ## Ok
/// ```
/// [{ "id": 1, "name": "actix" }, { "id": 2, "name": "rust" }]
/// ```
#[get("/api/tags")]
pub async fn get_tags(app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let tags = web::block(move || -> Result<Vec<Tag>, AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        Tag::all(&psql_conn)
    })
    .await??;

    Ok(HttpResponse::Ok().json(tags))
}

/// Pipe for creating a tag, admins only. Names are stored trimmed and lowercase.
/// - url: `{domain}/api/tags`
///
/// # HTTP request requirements
/// ## body
/// - json containing `name`
///
/// # Response
/// ## Created
/// - the new tag
/// ## Error
/// - Bad request, empty or taken name
/// - Unauthorized
/// - Forbidden
#[post("/api/tags")]
pub async fn create_tag(auth: AuthUser, req_body: String, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let new_tag = serde_json::from_str::<NewTag>(&req_body)?;

    let tag = web::block(move || -> Result<Tag, AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        Tag::create(&psql_conn, &new_tag.name)
    })
    .await??;

    info!("user {} created tag {}", auth.user.id, tag.name);
    Ok(HttpResponse::Created().json(tag))
}
