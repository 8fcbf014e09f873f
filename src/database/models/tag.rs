use diesel::{prelude::*, PgConnection};
use serde::Serialize;

use crate::{
    app::AppError,
    schema::{post_tags, tags},
};

#[derive(Debug, Queryable, Clone, Serialize, PartialEq)]
pub struct Tag {
    pub id: i32,
    pub name: String,
}

#[derive(Insertable)]
#[table_name = "tags"]
struct TagInsert<'a> {
    pub name: &'a str,
}

#[derive(Insertable)]
#[table_name = "post_tags"]
struct PostTagInsert {
    pub post_id: i32,
    pub tag_id: i32,
}

/// Tag names are stored trimmed and lowercase
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Normalizes every name, dropping empty ones and duplicates while keeping the first-seen order
pub fn normalize_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut ret: Vec<String> = Vec::new();
    for name in names {
        let name = normalize_name(name.as_ref());
        if !name.is_empty() && !ret.contains(&name) {
            ret.push(name);
        }
    }
    ret
}

impl Tag {
    pub fn all(conn: &PgConnection) -> Result<Vec<Tag>, AppError> {
        Ok(tags::table.order(tags::name.asc()).load::<Tag>(conn)?)
    }

    pub fn create(conn: &PgConnection, name: &str) -> Result<Tag, AppError> {
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(AppError::BadRequest("Tag name is required."));
        }
        if Tag::find_by_name(conn, &name)?.is_some() {
            return Err(AppError::BadRequest("Tag already exists."));
        }

        Ok(diesel::insert_into(tags::table)
            .values(&TagInsert { name: &name })
            .get_result::<Tag>(conn)?)
    }

    pub fn find_by_name(conn: &PgConnection, name: &str) -> Result<Option<Tag>, AppError> {
        Ok(tags::table
            .filter(tags::name.eq(normalize_name(name)))
            .first::<Tag>(conn)
            .optional()?)
    }

    /// Expects an already normalized name
    fn find_or_create(conn: &PgConnection, name: &str) -> Result<Tag, AppError> {
        diesel::insert_into(tags::table)
            .values(&TagInsert { name })
            .on_conflict(tags::name)
            .do_nothing()
            .execute(conn)?;

        Ok(tags::table.filter(tags::name.eq(name)).first::<Tag>(conn)?)
    }

    /** Returns the tags attached to a post, by name */
    pub fn for_post(conn: &PgConnection, post_id: i32) -> Result<Vec<Tag>, AppError> {
        Ok(post_tags::table
            .inner_join(tags::table)
            .filter(post_tags::post_id.eq(post_id))
            .select(tags::all_columns)
            .order(tags::name.asc())
            .load::<Tag>(conn)?)
    }

    /** Replaces the tags of a post, creating the tags that don't exist yet */
    pub fn set_for_post<S: AsRef<str>>(
        conn: &PgConnection,
        post_id: i32,
        names: &[S],
    ) -> Result<Vec<Tag>, AppError> {
        let mut attached = Vec::new();
        for name in normalize_names(names) {
            attached.push(Tag::find_or_create(conn, &name)?);
        }

        diesel::delete(post_tags::table.filter(post_tags::post_id.eq(post_id))).execute(conn)?;

        let rows: Vec<PostTagInsert> = attached
            .iter()
            .map(|tag| PostTagInsert {
                post_id,
                tag_id: tag.id,
            })
            .collect();
        if !rows.is_empty() {
            diesel::insert_into(post_tags::table)
                .values(&rows)
                .execute(conn)?;
        }

        attached.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(attached)
    }

    /** Ids of every post carrying this tag */
    pub fn post_ids(&self, conn: &PgConnection) -> Result<Vec<i32>, AppError> {
        Ok(post_tags::table
            .filter(post_tags::tag_id.eq(self.id))
            .select(post_tags::post_id)
            .load::<i32>(conn)?)
    }
}
