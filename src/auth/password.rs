use rand::distributions::{Alphanumeric, DistString};
use sha256::digest;

const SALT_LEN: usize = 16;

/// Returns `salt$hex` where hex is the SHA256 of the salt followed by the password
pub fn hash_password(password: &str) -> String {
    let salt = Alphanumeric.sample_string(&mut rand::thread_rng(), SALT_LEN);
    format!("{}${}", salt, salted_digest(&salt, password))
}

/// Checks a plain password against a value produced by [hash_password]
pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, hash)) => salted_digest(salt, password) == hash,
        None => false,
    }
}

fn salted_digest(salt: &str, password: &str) -> String {
    digest(format!("{}{}", salt, password))
}
