//! UserAuth repository (§3, §4.4). Distinguishes "never seen this owner"
//! from "wrong token for a known owner" so the hello handshake can decide
//! between registering a new user and rejecting with 4401 (P8).

use gridx_domain_models::auth::AuthCheck;
use libsql::{params, Connection};

use crate::errors::StoreError;

pub(crate) async fn check(
    conn: &Connection,
    user_id: &str,
    auth_token: &str,
) -> Result<AuthCheck, StoreError> {
    let mut rows = conn
        .query("SELECT auth_token FROM user_auth WHERE user_id = ?1", params![user_id])
        .await?;
    match rows.next().await? {
        Some(row) => {
            let stored: String = row.get(0)?;
            if stored == auth_token {
                Ok(AuthCheck::Match)
            } else {
                Ok(AuthCheck::Mismatch)
            }
        }
        None => Ok(AuthCheck::NewUser),
    }
}

pub(crate) async fn register(
    conn: &Connection,
    user_id: &str,
    auth_token: &str,
    now: f64,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO user_auth (user_id, auth_token, created_at) VALUES (?1, ?2, ?3)",
        params![user_id, auth_token, now],
    )
    .await?;
    Ok(())
}
