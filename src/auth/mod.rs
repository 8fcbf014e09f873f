pub mod password;
pub mod token;

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use futures::future::LocalBoxFuture;

use crate::{
    app::{AppError, AppState},
    database::models::user::User,
};
use token::Token;

/** The user behind the `Authorization: Bearer` token of a request.
 * Extracting it fails with `401` when the header is missing, or the token is
 * unknown, expired or belongs to a deleted user.
 */
pub struct AuthUser {
    pub user: User,
    pub token: String,
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.user.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("Access denied. Admins only."))
        }
    }

    /// Owners and admins may change a record
    pub fn can_manage(&self, owner_id: i32) -> bool {
        self.user.id == owner_id || self.user.is_admin
    }
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let credentials = BearerAuth::from_request(req, payload);
        let app_state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let token = credentials
                .await
                .map_err(|_| AppError::UnauthorizedError)?
                .token()
                .to_string();
            let app_state = app_state.ok_or(AppError::InternalServerError)?;

            let lookup_token = token.clone();
            let user = web::block(move || -> Result<User, AppError> {
                let mut redis_conn = app_state.redis_pool.get()?;
                let user_id =
                    Token::find(&mut redis_conn, &lookup_token)?.ok_or(AppError::UnauthorizedError)?;

                let psql_conn = app_state.psql_pool.get()?;
                User::find_by_id(&psql_conn, user_id).map_err(|err| match err {
                    AppError::NotFound(_) => AppError::UnauthorizedError,
                    other => other,
                })
            })
            .await??;

            Ok(AuthUser { user, token })
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{get, test, App, HttpResponse};

    use super::*;

    #[get("/whoami")]
    async fn whoami(auth: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(auth.user.username)
    }

    #[actix_rt::test]
    async fn test_missing_bearer_is_unauthorized() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::unchecked()))
                .service(whoami),
        )
        .await;

        let req = test::TestRequest::get().uri("/whoami").to_request();
        let resp = test::call_service(&app, req).await;
        pretty_assertions::assert_eq!(resp.status().as_u16(), 401);

        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", "Basic dXNlcjpwYXNz"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        pretty_assertions::assert_eq!(resp.status().as_u16(), 401);
    }
}
