use std::fs;

use actix_web::{
    get,
    web::{self, Data},
    HttpRequest, HttpResponse,
};

use crate::{
    app::{AppError, AppState},
    uploads,
};

/// Pipe for getting an uploaded image
/// - url: `{domain}/uploads/{file_name}`
///
/// # Response
/// ## Ok
/// - the file, with a content type guessed from its extension
/// ## Error
/// - Bad request, the name tries to leave the upload directory
/// - Not found
#[get("/uploads/{file_name}")]
pub async fn get_upload(req: HttpRequest, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let file_name = req.match_info().query("file_name").to_string();
    if !uploads::is_safe_file_name(&file_name) {
        return Err(AppError::BadRequest("Invalid file name."));
    }

    let file_path = app_state.upload_dir.join(&file_name);
    let file = web::block(move || fs::read(file_path)).await??;

    Ok(HttpResponse::Ok()
        .content_type(uploads::content_type_for(&file_name))
        .body(file))
}

#[cfg(test)]
mod tests {
    use actix_web::{body::to_bytes, http::header, test, App};

    use super::*;

    #[actix_rt::test]
    async fn test_get_upload() {
        let app_state = AppState::unchecked();
        fs::create_dir_all(&app_state.upload_dir).unwrap();
        fs::write(app_state.upload_dir.join("test-image.png"), b"test image").unwrap();

        let app = test::init_service(
            App::new()
                .app_data(Data::new(app_state.clone()))
                .service(get_upload),
        )
        .await;

        let req = test::TestRequest::get().uri("/uploads/test-image.png").to_request();
        let resp = test::call_service(&app, req).await;
        pretty_assertions::assert_eq!(resp.status().as_u16(), 200);
        pretty_assertions::assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap(),
            "image/png"
        );
        let body = to_bytes(resp.into_body()).await.unwrap();
        pretty_assertions::assert_eq!(&body[..], b"test image");

        fs::remove_file(app_state.upload_dir.join("test-image.png")).unwrap();
    }

    #[actix_rt::test]
    async fn test_get_upload_errors() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(AppState::unchecked()))
                .service(get_upload),
        )
        .await;

        let req = test::TestRequest::get().uri("/uploads/missing.png").to_request();
        pretty_assertions::assert_eq!(test::call_service(&app, req).await.status().as_u16(), 404);

        let req = test::TestRequest::get().uri("/uploads/..secret").to_request();
        pretty_assertions::assert_eq!(test::call_service(&app, req).await.status().as_u16(), 400);
    }
}
