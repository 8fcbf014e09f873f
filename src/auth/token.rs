use r2d2_redis::redis::{self, Commands, RedisError};
use rand::distributions::{Alphanumeric, DistString};

const TOKEN_LEN: usize = 32;
const KEY_PREFIX: &str = "token:";

/** Login tokens, stored in redis as `token:{token} -> user id` with an expiry */
pub struct Token {}

impl Token {
    /// Creates a token for the user that expires after `ttl_secs`
    pub fn new(redis_conn: &mut redis::Connection, user_id: i32, ttl_secs: usize) -> Result<String, RedisError> {
        let token = Alphanumeric.sample_string(&mut rand::thread_rng(), TOKEN_LEN);

        redis_conn.set_ex::<String, i32, ()>(Token::key(&token), user_id, ttl_secs)?;

        Ok(token)
    }

    pub fn delete(redis_conn: &mut redis::Connection, token: &str) -> Result<(), RedisError> {
        redis_conn.del::<String, ()>(Token::key(token))
    }

    /// Returns the id of the user owning the token, `None` if the token is unknown or expired
    pub fn find(redis_conn: &mut redis::Connection, token: &str) -> Result<Option<i32>, RedisError> {
        redis_conn.get::<String, Option<i32>>(Token::key(token))
    }

    /// Pushes the expiry of an existing token `ttl_secs` into the future.
    /// Returns false if the token doesn't exist.
    pub fn refresh(redis_conn: &mut redis::Connection, token: &str, ttl_secs: usize) -> Result<bool, RedisError> {
        redis_conn.expire::<String, bool>(Token::key(token), ttl_secs)
    }

    fn key(token: &str) -> String {
        format!("{}{}", KEY_PREFIX, token)
    }
}
