use std::path::Path;

use actix_multipart::{Field, Multipart};
use actix_web::{
    delete, get, patch, post, put,
    web::{self, Data, Query},
    HttpRequest, HttpResponse,
};
use chrono::Utc;
use futures::{StreamExt as _, TryStreamExt};
use log::info;
use serde::Deserialize;

use crate::{
    app::{AppError, AppState},
    auth::AuthUser,
    database::models::post::{NewPost, Post, PostChangeset, PostDetails},
    uploads,
};

const MAX_TEXT_FIELD_LEN: usize = 1024 * 1024;

#[derive(Deserialize)]
pub struct PostQuery {
    pub tag: Option<String>,
}

/// Fields of the multipart form used to create and edit posts, all optional
#[derive(Debug, Default)]
struct PostForm {
    pub title: Option<String>,
    pub content: Option<String>,
    pub published: Option<bool>,
    pub tag_names: Option<Vec<String>>,
    /// Public path of the image saved while parsing
    pub image: Option<String>,
}

impl PostForm {
    fn discard_image(&mut self, upload_dir: &Path) {
        if let Some(image) = self.image.take() {
            uploads::remove_image(upload_dir, &image);
        }
    }
}

fn parse_bool(value: &str) -> Result<bool, AppError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "on" => Ok(true),
        "false" | "0" | "off" | "" => Ok(false),
        _ => Err(AppError::BadRequest("Published must be true or false.")),
    }
}

async fn read_text(field: &mut Field) -> Result<String, AppError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let data = chunk?;
        if bytes.len() + data.len() > MAX_TEXT_FIELD_LEN {
            return Err(AppError::BadRequest("Form field is too large."));
        }
        bytes.extend_from_slice(&data);
    }

    String::from_utf8(bytes).map_err(|_| AppError::BadRequest("Form fields must be UTF-8 text."))
}

async fn read_fields(payload: &mut Multipart, upload_dir: &Path, form: &mut PostForm) -> Result<(), AppError> {
    while let Some(mut field) = payload.try_next().await? {
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let file_name = disposition.get_filename().map(str::to_string);

        match name.as_str() {
            "image" => {
                //Browsers send an empty file part when nothing was picked
                let file_name = match file_name.filter(|name| !name.is_empty()) {
                    Some(file_name) => file_name,
                    None => {
                        read_text(&mut field).await?;
                        continue;
                    }
                };
                let ext = uploads::image_extension(&file_name).ok_or(AppError::BadRequest(
                    "Only png, jpg, jpeg, gif and webp images are allowed.",
                ))?;

                form.discard_image(upload_dir);
                form.image = Some(uploads::save_image(&mut field, upload_dir, &ext).await?);
            }
            "title" => form.title = Some(read_text(&mut field).await?),
            "content" => form.content = Some(read_text(&mut field).await?),
            "published" => form.published = Some(parse_bool(&read_text(&mut field).await?)?),
            "tagNames[]" | "tagNames" => {
                let value = read_text(&mut field).await?;
                form.tag_names
                    .get_or_insert_with(Vec::new)
                    .extend(value.split(',').map(str::to_string));
            }
            _ => {
                read_text(&mut field).await?;
            }
        };
    }

    Ok(())
}

/// Reads the multipart post form, saving the image to the upload directory.
/// The image is removed again if the form turns out to be invalid.
async fn parse_post_form(payload: &mut Multipart, upload_dir: &Path) -> Result<PostForm, AppError> {
    let mut form = PostForm::default();
    if let Err(err) = read_fields(payload, upload_dir, &mut form).await {
        form.discard_image(upload_dir);
        return Err(err);
    }

    Ok(form)
}

/// Removes the freshly uploaded image when storing the post failed
fn discard_on_error<T>(
    result: Result<T, AppError>,
    upload_dir: &Path,
    image: Option<&str>,
) -> Result<T, AppError> {
    if result.is_err() {
        if let Some(image) = image {
            uploads::remove_image(upload_dir, image);
        }
    }
    result
}

/// Pipe for getting published posts, latest published first
/// - url: `{domain}/api/posts?tag={tag}`
///
/// # HTTP request requirements
/// - `tag` (optional) query parameter, only posts carrying that tag are returned
///
/// # Response
/// ## Ok
/// - json array of posts with `author`, `tags`, `comments`, `likeCount` and `excerpt`
/// ```
/// [
///     {
///         "id": 73,
///         "title": "Post title",
///         "content": "Post content",
///         "published": true,
///         "publishedAt": "2022-08-04T09:22:30.664361",
///         "imageUrl": "/uploads/b600b24f-9414-4009-b538-8b9ac77292be.png",
///         "authorId": 4,
///         "createdAt": "2022-08-04T09:22:30.664361",
///         "updatedAt": "2022-08-04T09:22:30.664361",
///         "excerpt": "Post content",
///         "author": { "id": 4, "email": "jane@example.com", "username": "jane", .. },
///         "tags": [{ "id": 1, "name": "rust" }],
///         "comments": [],
///         "likeCount": 0
///     }
/// ]
/// ```
/// ## Error
/// - Internal server error
#[get("/api/posts")]
pub async fn get_posts(query: Query<PostQuery>, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let tag = query.into_inner().tag;

    let posts = web::block(move || -> Result<Vec<PostDetails>, AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        let posts = Post::published(&psql_conn, tag.as_deref())?;
        Post::details_many(&psql_conn, posts)
    })
    .await??;

    Ok(HttpResponse::Ok().json(posts))
}

/// Pipe for getting every post including drafts, admins only
/// - url: `{domain}/api/posts/all`
#[get("/api/posts/all")]
pub async fn get_all_posts(auth: AuthUser, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let posts = web::block(move || -> Result<Vec<PostDetails>, AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        let posts = Post::all(&psql_conn)?;
        Post::details_many(&psql_conn, posts)
    })
    .await??;

    Ok(HttpResponse::Ok().json(posts))
}

/// Pipe for getting a single post
/// - url: `{domain}/api/posts/{post_id}`
///
/// # Response
/// ## Ok
/// - the post, same shape as the entries of `/api/posts`
/// ## Error
/// - Bad request
/// - Not found
#[get("/api/posts/{post_id}")]
pub async fn get_post(req: HttpRequest, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let post_id = req.match_info().query("post_id").parse::<i32>()?;

    let post = web::block(move || -> Result<PostDetails, AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        Post::find_by_id(&psql_conn, post_id)?.details(&psql_conn)
    })
    .await??;

    Ok(HttpResponse::Ok().json(post))
}

/// Pipe for creating a new post, it is of type multipart
/// - url: `{domain}/api/posts`
///
/// # HTTP request requirements
/// ## header
/// - `Authorization: Bearer {token}`
/// ## body
/// - title: [String] - title of the post
/// - content: [String] - body of the post
/// - published: `true`/`false` (optional) - only honored for admins
/// - tagNames[]: [String] (optional, repeatable) - tags, created when missing
/// - image: file (optional) - png, jpg, jpeg, gif or webp
///
/// # Response
/// ## Created
/// - the new post
/// ## Error
/// - Bad request
/// - Unauthorized
/// - Internal server error
#[post("/api/posts")]
pub async fn create_post(
    auth: AuthUser,
    mut mp: Multipart,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let upload_dir = app_state.upload_dir.clone();
    let mut form = parse_post_form(&mut mp, &upload_dir).await?;

    let new_post = NewPost {
        title: form.title.take().unwrap_or_default(),
        content: form.content.take().unwrap_or_default(),
        published: auth.user.is_admin && form.published.unwrap_or(false),
        image: form.image.clone(),
        tag_names: form.tag_names.take().unwrap_or_default(),
    };
    if new_post.title.trim().is_empty() || new_post.content.trim().is_empty() {
        form.discard_image(&upload_dir);
        return Err(AppError::BadRequest("Title and content are required."));
    }

    let result = web::block(move || -> Result<PostDetails, AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        Post::new(&psql_conn, &auth.user, &new_post)?.details(&psql_conn)
    })
    .await?;
    let post = discard_on_error(result, &upload_dir, form.image.as_deref())?;

    info!("user {} created post {}", post.author.id, post.post.id);
    Ok(HttpResponse::Created().json(post))
}

/// Pipe for editing a post, allowed for its author and admins. Multipart, same
/// fields as creating, every field optional. Sent tags replace the current ones,
/// a sent image replaces the current one.
/// - url: `{domain}/api/posts/{post_id}`
///
/// # Response
/// ## Ok
/// - the updated post
/// ## Error
/// - Bad request
/// - Unauthorized
/// - Forbidden
/// - Not found
#[put("/api/posts/{post_id}")]
pub async fn update_post(
    req: HttpRequest,
    auth: AuthUser,
    mut mp: Multipart,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let post_id = req.match_info().query("post_id").parse::<i32>()?;
    let upload_dir = app_state.upload_dir.clone();
    let form = parse_post_form(&mut mp, &upload_dir).await?;
    let new_image = form.image.clone();

    let result = web::block(move || -> Result<(PostDetails, Option<String>), AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        let post = Post::find_by_id(&psql_conn, post_id)?;
        if !auth.can_manage(post.author_id) {
            return Err(AppError::Forbidden("You can only update your own posts."));
        }

        let mut changes = PostChangeset {
            title: form.title,
            content: form.content,
            ..Default::default()
        };
        if let Some(published) = form.published.filter(|_| auth.user.is_admin) {
            if published != post.published {
                changes.published = Some(published);
                changes.published_at = Some(if published {
                    Some(Utc::now().naive_utc())
                } else {
                    None
                });
            }
        }
        let replaced_image = match form.image {
            Some(image) => {
                changes.image = Some(Some(image));
                post.image.clone()
            }
            None => None,
        };

        let updated = post.edit(&psql_conn, changes, form.tag_names.as_deref())?;
        Ok((updated.details(&psql_conn)?, replaced_image))
    })
    .await?;
    let (post, replaced_image) = discard_on_error(result, &upload_dir, new_image.as_deref())?;

    if let Some(old_image) = replaced_image {
        uploads::remove_image(&upload_dir, &old_image);
    }

    Ok(HttpResponse::Ok().json(post))
}

/// Pipe for deleting a post and its image, allowed for its author and admins
/// - url: `{domain}/api/posts/{post_id}`
///
/// # Response
/// ## No content
/// ## Error
/// - Bad request
/// - Unauthorized
/// - Forbidden
/// - Not found
#[delete("/api/posts/{post_id}")]
pub async fn delete_post(
    req: HttpRequest,
    auth: AuthUser,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let post_id = req.match_info().query("post_id").parse::<i32>()?;

    let deleted_by = auth.user.id;
    web::block(move || -> Result<(), AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        let post = Post::find_by_id(&psql_conn, post_id)?;
        if !auth.can_manage(post.author_id) {
            return Err(AppError::Forbidden("You can only delete your own posts."));
        }

        post.delete(&psql_conn)?;
        if let Some(image) = &post.image {
            uploads::remove_image(&app_state.upload_dir, image);
        }
        Ok(())
    })
    .await??;

    info!("user {} deleted post {}", deleted_by, post_id);
    Ok(HttpResponse::NoContent().finish())
}

async fn set_published(
    req: HttpRequest,
    auth: AuthUser,
    app_state: Data<AppState>,
    published: bool,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let post_id = req.match_info().query("post_id").parse::<i32>()?;

    let post = web::block(move || -> Result<PostDetails, AppError> {
        let psql_conn = app_state.psql_pool.get()?;
        Post::find_by_id(&psql_conn, post_id)?
            .set_published(&psql_conn, published)?
            .details(&psql_conn)
    })
    .await??;

    info!("post {} published: {}", post_id, published);
    Ok(HttpResponse::Ok().json(post))
}

/// Pipe for publishing a post, admins only
/// - url: `{domain}/api/posts/{post_id}/publish`
#[post("/api/posts/{post_id}/publish")]
pub async fn publish_post(
    req: HttpRequest,
    auth: AuthUser,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    set_published(req, auth, app_state, true).await
}

/// Pipe for turning a post back into a draft, admins only
/// - url: `{domain}/api/posts/{post_id}/unpublish`
#[patch("/api/posts/{post_id}/unpublish")]
pub async fn unpublish_post(
    req: HttpRequest,
    auth: AuthUser,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    set_published(req, auth, app_state, false).await
}
