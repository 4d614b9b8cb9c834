use serde::{Deserialize, Serialize};

/// A registered owner/token pair (§3 UserAuth). Established on a worker's
/// first hello for a given owner; distinguishes "new user" from "wrong
/// password for known user" (P8).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserAuth {
    pub user_id: String,
    pub auth_token: String,
    pub created_at: f64,
}

/// Outcome of checking a hello's `(owner_id, auth_token)` against the store,
/// per the decision table in §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthCheck {
    /// No UserAuth row for this owner yet: accept and register it.
    NewUser,
    /// Row exists and the token matches.
    Match,
    /// Row exists but the token differs: reject, mutate nothing.
    Mismatch,
}
