use chrono::NaiveDateTime;
use diesel::{prelude::*, PgConnection};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::{
    app::AppError,
    auth::password::{hash_password, verify_password},
    schema::{posts, users},
};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Queryable, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub email: String,
    pub username: String,
    /// `salt$sha256`, never sent to clients
    #[serde(skip_serializing)]
    pub password: String,
    pub is_admin: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[table_name = "users"]
struct UserInsert<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub is_admin: bool,
}

#[derive(AsChangeset)]
#[table_name = "users"]
struct UserChangeset {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Fields an update may touch, `None` leaves the stored value alone
#[derive(Debug, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest("Password must be at least 8 characters long."));
    }
    Ok(())
}

/// Checks the fields of a new account, without touching the database
pub fn validate_new_user(email: &str, username: &str, password: &str) -> Result<(), AppError> {
    if !is_valid_email(email.trim()) {
        return Err(AppError::BadRequest("Invalid email format."));
    }
    if username.trim().is_empty() {
        return Err(AppError::BadRequest("Username is required."));
    }
    validate_password(password)
}

impl User {
    /// Validates the input, hashes the password and pushes a new user in the database
    ///
    /// # Example
    /// ```
    /// let user = User::new(&conn, "jane@example.com", "jane", "hunter2hunter2", false)?;
    /// ```
    pub fn new(
        conn: &PgConnection,
        email: &str,
        username: &str,
        password: &str,
        admin: bool,
    ) -> Result<User, AppError> {
        validate_new_user(email, username, password)?;
        let email = email.trim();
        let username = username.trim();

        if User::find_by_email(conn, email)?.is_some() {
            return Err(AppError::BadRequest("Email already exists."));
        }

        let hashed = hash_password(password);
        let to_insert = UserInsert {
            email,
            username,
            password: &hashed,
            is_admin: admin,
        };

        let user = diesel::insert_into(users::table)
            .values(&to_insert)
            .get_result::<User>(conn)?;

        Ok(user)
    }

    pub fn all(conn: &PgConnection) -> Result<Vec<User>, AppError> {
        Ok(users::table.order(users::id.asc()).load::<User>(conn)?)
    }

    /** Returns an user with the id specified */
    pub fn find_by_id(conn: &PgConnection, user_id: i32) -> Result<User, AppError> {
        users::table
            .find(user_id)
            .first::<User>(conn)
            .optional()?
            .ok_or(AppError::NotFound("User not found."))
    }

    pub fn find_by_email(conn: &PgConnection, email: &str) -> Result<Option<User>, AppError> {
        Ok(users::table
            .filter(users::email.eq(email.trim()))
            .first::<User>(conn)
            .optional()?)
    }

    pub fn check_password(&self, password: &str) -> bool {
        verify_password(password, &self.password)
    }

    /// Applies the update and returns the stored user
    pub fn update(&self, conn: &PgConnection, update: UserUpdate) -> Result<User, AppError> {
        let email = match update.email {
            Some(email) => {
                let email = email.trim().to_string();
                if !is_valid_email(&email) {
                    return Err(AppError::BadRequest("Invalid email format."));
                }
                if email != self.email && User::find_by_email(conn, &email)?.is_some() {
                    return Err(AppError::BadRequest("Email already exists."));
                }
                Some(email)
            }
            None => None,
        };
        let username = match update.username {
            Some(username) if username.trim().is_empty() => {
                return Err(AppError::BadRequest("Username is required."));
            }
            Some(username) => Some(username.trim().to_string()),
            None => None,
        };
        let password = match update.password {
            Some(password) => {
                validate_password(&password)?;
                Some(hash_password(&password))
            }
            None => None,
        };

        if email.is_none() && username.is_none() && password.is_none() {
            return Ok(self.clone());
        }

        let changes = UserChangeset {
            email,
            username,
            password,
        };
        Ok(diesel::update(users::table.find(self.id))
            .set(&changes)
            .get_result::<User>(conn)?)
    }

    /** Deletes an user, the database cascades to their posts, comments and likes.
     * Returns the images of the deleted posts so the caller can remove the files.
     */
    pub fn delete(&self, conn: &PgConnection) -> Result<Vec<String>, AppError> {
        conn.transaction::<_, AppError, _>(|| {
            let images: Vec<String> = posts::table
                .filter(posts::author_id.eq(self.id))
                .filter(posts::image.is_not_null())
                .select(posts::image)
                .load::<Option<String>>(conn)?
                .into_iter()
                .flatten()
                .collect();

            diesel::delete(users::table.find(self.id)).execute(conn)?;

            Ok(images)
        })
    }
}
