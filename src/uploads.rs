use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use actix_multipart::Field;
use actix_web::web;
use futures::StreamExt as _;
use log::warn;
use uuid::Uuid;

use crate::app::AppError;

pub const PUBLIC_PREFIX: &str = "/uploads/";
const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Lowercase extension of an uploaded file name, if it is an accepted image type
pub fn image_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_lowercase();
    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Some(ext)
    } else {
        None
    }
}

/// Rejects anything that could leave the upload directory
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
        && !name.starts_with('.')
}

pub fn content_type_for(name: &str) -> &'static str {
    match image_extension(name).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Maps a stored `/uploads/{file}` path back to the file on disk
pub fn disk_path(upload_dir: &Path, public_path: &str) -> Option<PathBuf> {
    let name = public_path.strip_prefix(PUBLIC_PREFIX)?;
    if !is_safe_file_name(name) {
        return None;
    }
    Some(upload_dir.join(name))
}

/// Streams a multipart file field into the upload directory as `{uuid}.{ext}`
/// and returns its public path.
pub async fn save_image(field: &mut Field, upload_dir: &Path, ext: &str) -> Result<String, AppError> {
    let file_name = format!("{}.{}", Uuid::new_v4(), ext);
    let path = upload_dir.join(&file_name);

    let dir = upload_dir.to_path_buf();
    let create_path = path.clone();
    let mut file = web::block(move || {
        fs::create_dir_all(&dir)?;
        fs::File::create(create_path)
    })
    .await??;

    let mut written = 0;
    while let Some(chunk) = field.next().await {
        let data = match chunk {
            Ok(data) => data,
            Err(err) => {
                remove_file(&path);
                return Err(err.into());
            }
        };
        written += data.len();
        file = web::block(move || file.write_all(&data).map(|_| file)).await??;
    }

    if written == 0 {
        remove_file(&path);
        return Err(AppError::BadRequest("Uploaded image is empty."));
    }

    Ok(format!("{}{}", PUBLIC_PREFIX, file_name))
}

/// Removes the file behind a public path, failures are only logged
pub fn remove_image(upload_dir: &Path, public_path: &str) {
    if let Some(path) = disk_path(upload_dir, public_path) {
        remove_file(&path);
    }
}

fn remove_file(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        warn!("could not remove {}: {}", path.display(), err);
    }
}
