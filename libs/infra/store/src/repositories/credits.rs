//! Credit ledger repository (§4.1, §4.3). `deduct` is the single-statement
//! conditional update that makes I5 (balance never negative) hold under
//! concurrent submitters without an explicit transaction.

use gridx_domain_models::credit::UserCredits;
use libsql::{params, Connection};

use crate::errors::StoreError;

pub(crate) async fn ensure_user(
    conn: &Connection,
    user_id: &str,
    initial_balance: f64,
    now: f64,
) -> Result<f64, StoreError> {
    if let Some(balance) = get_balance_raw(conn, user_id).await? {
        return Ok(balance);
    }
    conn.execute(
        "INSERT INTO user_credits (user_id, balance, last_updated) VALUES (?1, ?2, ?3)",
        params![user_id, initial_balance, now],
    )
    .await?;
    Ok(initial_balance)
}

/// Returns 0 for an unknown user rather than creating a row (§9 resolved
/// open question — GET /credits does not mutate state).
pub(crate) async fn get_balance(conn: &Connection, user_id: &str) -> Result<f64, StoreError> {
    Ok(get_balance_raw(conn, user_id).await?.unwrap_or(0.0))
}

async fn get_balance_raw(conn: &Connection, user_id: &str) -> Result<Option<f64>, StoreError> {
    let mut rows = conn
        .query("SELECT balance FROM user_credits WHERE user_id = ?1", params![user_id])
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row.get::<f64>(0)?)),
        None => Ok(None),
    }
}

pub(crate) async fn deduct(
    conn: &Connection,
    user_id: &str,
    amount: f64,
    now: f64,
) -> Result<bool, StoreError> {
    if amount <= 0.0 {
        return Ok(true);
    }
    let affected = conn
        .execute(
            "UPDATE user_credits SET balance = balance - ?1, total_spent = total_spent + ?1, \
             last_updated = ?2 WHERE user_id = ?3 AND balance >= ?1",
            params![amount, now, user_id],
        )
        .await?;
    Ok(affected > 0)
}

pub(crate) async fn credit(
    conn: &Connection,
    user_id: &str,
    amount: f64,
    now: f64,
) -> Result<(), StoreError> {
    if amount <= 0.0 {
        return Ok(());
    }
    ensure_user(conn, user_id, 0.0, now).await?;
    conn.execute(
        "UPDATE user_credits SET balance = balance + ?1, total_earned = total_earned + ?1, \
         last_updated = ?2 WHERE user_id = ?3",
        params![amount, now, user_id],
    )
    .await?;
    Ok(())
}

pub(crate) async fn get(conn: &Connection, user_id: &str) -> Result<Option<UserCredits>, StoreError> {
    let mut rows = conn
        .query(
            "SELECT balance, total_earned, total_spent, last_updated FROM user_credits \
             WHERE user_id = ?1",
            params![user_id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(UserCredits {
            balance: row.get(0)?,
            total_earned: row.get(1)?,
            total_spent: row.get(2)?,
            last_updated: row.get(3)?,
        })),
        None => Ok(None),
    }
}
