use serde::{Deserialize, Serialize};

/// A user's credit balance (§3 UserCredits). Created on first reference
/// with a configurable initial balance; never goes negative (I5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct UserCredits {
    pub balance: f64,
    pub total_earned: f64,
    pub total_spent: f64,
    pub last_updated: f64,
}
