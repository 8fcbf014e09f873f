pub mod auth;
pub mod comment;
pub mod like;
pub mod post;
pub mod tag;
pub mod upload;
pub mod user;

#[cfg(test)]
pub(crate) mod test_utils;

use actix_web::{get, web::ServiceConfig, HttpResponse, Responder};

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("Welcome to the Blog API")
}

/// Registers every route of the api
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(index)
        //Auth routes
        .service(auth::login)
        .service(auth::register)
        .service(auth::logout)
        .service(auth::profile)
        .service(auth::refresh_token)
        //User routes
        .service(user::get_users)
        .service(user::create_user)
        .service(user::update_user)
        .service(user::delete_user)
        //Post routes, `/all` has to come before `/{post_id}`
        .service(post::get_posts)
        .service(post::get_all_posts)
        .service(post::get_post)
        .service(post::create_post)
        .service(post::update_post)
        .service(post::delete_post)
        .service(post::publish_post)
        .service(post::unpublish_post)
        //Comment routes
        .service(comment::get_comments)
        .service(comment::create_comment)
        .service(comment::update_comment)
        .service(comment::delete_comment)
        //Like routes
        .service(like::like_post)
        .service(like::unlike_post)
        .service(like::get_post_likes)
        .service(like::like_comment)
        .service(like::unlike_comment)
        .service(like::get_comment_likes)
        //Tag routes
        .service(tag::get_tags)
        .service(tag::create_tag)
        //Uploaded images
        .service(upload::get_upload);
}
