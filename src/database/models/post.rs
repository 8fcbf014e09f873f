use chrono::{NaiveDateTime, Utc};
use diesel::{prelude::*, PgConnection};
use serde::Serialize;

use super::{
    comment::{Comment, CommentWithUser},
    like::Like,
    tag::Tag,
    user::User,
};
use crate::{app::AppError, schema::posts};

const EXCERPT_LEN: usize = 150;

#[derive(Debug, PartialEq, Queryable, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub published: bool,
    pub published_at: Option<NaiveDateTime>,
    /// Public path of the uploaded image, `/uploads/{file}`
    #[serde(rename = "imageUrl")]
    pub image: Option<String>,
    pub author_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[table_name = "posts"]
struct PostInsert<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub published: bool,
    pub published_at: Option<NaiveDateTime>,
    pub image: Option<&'a str>,
    pub author_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// `Some(None)` clears a nullable column
#[derive(AsChangeset, Default)]
#[table_name = "posts"]
pub struct PostChangeset {
    pub title: Option<String>,
    pub content: Option<String>,
    pub published: Option<bool>,
    pub published_at: Option<Option<NaiveDateTime>>,
    pub image: Option<Option<String>>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Input for a new post
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub published: bool,
    pub image: Option<String>,
    pub tag_names: Vec<String>,
}

/// A post as sent to clients, with its author, tags, comments and like count
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetails {
    #[serde(flatten)]
    pub post: Post,
    pub excerpt: String,
    pub author: User,
    pub tags: Vec<Tag>,
    pub comments: Vec<CommentWithUser>,
    pub like_count: i64,
}

/// First `max_chars` characters of the content, with `...` appended when cut
pub fn excerpt(content: &str, max_chars: usize) -> String {
    let content = content.trim();
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", content[..cut].trim_end()),
        None => content.to_string(),
    }
}

impl Post {
    /// Inserts the post and attaches its tags
    pub fn new(conn: &PgConnection, author: &User, post: &NewPost) -> Result<Post, AppError> {
        let title = post.title.trim();
        let content = post.content.trim();
        if title.is_empty() || content.is_empty() {
            return Err(AppError::BadRequest("Title and content are required."));
        }

        let time = Utc::now().naive_utc();
        let to_insert = PostInsert {
            title,
            content,
            published: post.published,
            published_at: if post.published { Some(time) } else { None },
            image: post.image.as_deref(),
            author_id: author.id,
            created_at: time,
            updated_at: time,
        };

        conn.transaction::<_, AppError, _>(|| {
            let created = diesel::insert_into(posts::table)
                .values(&to_insert)
                .get_result::<Post>(conn)?;
            Tag::set_for_post(conn, created.id, &post.tag_names)?;

            Ok(created)
        })
    }

    pub fn find_by_id(conn: &PgConnection, post_id: i32) -> Result<Post, AppError> {
        posts::table
            .find(post_id)
            .first::<Post>(conn)
            .optional()?
            .ok_or(AppError::NotFound("Post not found."))
    }

    /** Returns published posts, latest published first, optionally only those carrying a tag */
    pub fn published(conn: &PgConnection, tag: Option<&str>) -> Result<Vec<Post>, AppError> {
        let mut query = posts::table
            .filter(posts::published.eq(true))
            .order((posts::published_at.desc(), posts::id.desc()))
            .into_boxed();

        if let Some(tag) = tag.filter(|tag| !tag.trim().is_empty()) {
            let post_ids = match Tag::find_by_name(conn, tag)? {
                Some(tag) => tag.post_ids(conn)?,
                None => return Ok(Vec::new()),
            };
            query = query.filter(posts::id.eq_any(post_ids));
        }

        Ok(query.load::<Post>(conn)?)
    }

    /** Returns every post, drafts included, newest first */
    pub fn all(conn: &PgConnection) -> Result<Vec<Post>, AppError> {
        Ok(posts::table
            .order((posts::created_at.desc(), posts::id.desc()))
            .load::<Post>(conn)?)
    }

    /// Applies the changeset, replacing the tags when `tag_names` is given
    pub fn edit(
        &self,
        conn: &PgConnection,
        mut changes: PostChangeset,
        tag_names: Option<&[String]>,
    ) -> Result<Post, AppError> {
        if let Some(title) = &changes.title {
            if title.trim().is_empty() {
                return Err(AppError::BadRequest("Title cannot be empty."));
            }
        }
        if let Some(content) = &changes.content {
            if content.trim().is_empty() {
                return Err(AppError::BadRequest("Content cannot be empty."));
            }
        }
        changes.title = changes.title.map(|title| title.trim().to_string());
        changes.content = changes.content.map(|content| content.trim().to_string());
        changes.updated_at = Some(Utc::now().naive_utc());

        conn.transaction::<_, AppError, _>(|| {
            let updated = diesel::update(posts::table.find(self.id))
                .set(&changes)
                .get_result::<Post>(conn)?;
            if let Some(names) = tag_names {
                Tag::set_for_post(conn, self.id, names)?;
            }

            Ok(updated)
        })
    }

    /// Publishing stamps `published_at`, unpublishing clears it
    pub fn set_published(&self, conn: &PgConnection, published: bool) -> Result<Post, AppError> {
        let now = Utc::now().naive_utc();
        let changes = PostChangeset {
            published: Some(published),
            published_at: Some(if published { Some(now) } else { None }),
            ..Default::default()
        };

        self.edit(conn, changes, None)
    }

    /** Deletes the post, comments, likes and tag links cascade */
    pub fn delete(&self, conn: &PgConnection) -> Result<(), AppError> {
        diesel::delete(posts::table.find(self.id)).execute(conn)?;
        Ok(())
    }

    /// Loads everything a client shows next to the post
    pub fn details(self, conn: &PgConnection) -> Result<PostDetails, AppError> {
        let author = User::find_by_id(conn, self.author_id)?;
        let tags = Tag::for_post(conn, self.id)?;
        let comments = Comment::for_post(conn, self.id)?;
        let like_count = Like::count_for_post(conn, self.id)?;

        Ok(PostDetails {
            excerpt: excerpt(&self.content, EXCERPT_LEN),
            post: self,
            author,
            tags,
            comments,
            like_count,
        })
    }

    pub fn details_many(conn: &PgConnection, posts: Vec<Post>) -> Result<Vec<PostDetails>, AppError> {
        posts.into_iter().map(|post| post.details(conn)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_content_kept() {
        pretty_assertions::assert_eq!(excerpt("  short post  ", 150), "short post");
    }

    #[test]
    fn test_long_content_cut() {
        let content = "word ".repeat(100);
        let cut = excerpt(&content, 12);

        pretty_assertions::assert_eq!(cut, "word word wo...");
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        pretty_assertions::assert_eq!(excerpt("ääääää", 3), "äää...");
        pretty_assertions::assert_eq!(excerpt("ääà", 3), "ääà");
    }

    #[test]
    fn test_serialized_field_names() {
        let now = Utc::now().naive_utc();
        let post = Post {
            id: 1,
            title: "Title".to_string(),
            content: "Body".to_string(),
            published: true,
            published_at: Some(now),
            image: Some("/uploads/a.png".to_string()),
            author_id: 2,
            created_at: now,
            updated_at: now,
        };

        let value = serde_json::to_value(&post).unwrap();
        pretty_assertions::assert_eq!(value["imageUrl"], serde_json::json!("/uploads/a.png"));
        pretty_assertions::assert_eq!(value["authorId"], serde_json::json!(2));
        assert!(value.get("publishedAt").is_some());
    }
}
