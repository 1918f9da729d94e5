use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account.
///
/// `phash` is a PHC-format Argon2 hash produced by
/// [`crate::security::Passwords`] and never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_roundtrip() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            phash: "$argon2id$...".into(),
        };
        let raw = serde_json::to_string(&user).unwrap();
        let back: User = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, user);
    }
}
