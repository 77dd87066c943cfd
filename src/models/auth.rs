use serde::{Deserialize, Serialize};

/// Account privilege level carried in the JWT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    User,
    Admin,
    Owner,
}

impl AccountType {
    /// ADMIN and OWNER accounts
    pub fn is_elevated(self) -> bool {
        matches!(self, AccountType::Admin | AccountType::Owner)
    }
}

impl Default for AccountType {
    fn default() -> Self {
        AccountType::User
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    #[serde(default)]
    pub account_type: AccountType,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    /// Numeric user id from the subject claim
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}
