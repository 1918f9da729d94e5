use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

/// Hashes and verifies account passwords.
///
/// Carries the server-wide pepper from the startup configuration so nothing
/// password-related lives in a process static. Hashes are PHC strings with a
/// fresh random salt per password; the pepper is appended to the password
/// before hashing on both sides.
#[derive(Clone)]
pub struct Passwords {
    pepper: String,
}

impl Passwords {
    pub fn new<S: Into<String>>(pepper: S) -> Self {
        Self { pepper: pepper.into() }
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
        let argon2 = Argon2::default();
        let phc = argon2
            .hash_password(self.peppered(password).as_bytes(), &salt)
            .map_err(|e| anyhow!(e.to_string()))?
            .to_string();
        Ok(phc)
    }

    /// Verify a password against a stored PHC hash. Malformed hashes verify false.
    pub fn verify(&self, hash: &str, password: &str) -> bool {
        if let Ok(parsed) = PasswordHash::new(hash) {
            let argon2 = Argon2::default();
            argon2.verify_password(self.peppered(password).as_bytes(), &parsed).is_ok()
        } else {
            false
        }
    }

    fn peppered(&self, password: &str) -> String {
        format!("{}{}", password, self.pepper)
    }
}

impl std::fmt::Debug for Passwords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Passwords").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let passwords = Passwords::new("pepper");
        let phc = passwords.hash("hunter2").unwrap();
        assert!(phc.starts_with("$argon2"));
        assert!(passwords.verify(&phc, "hunter2"));
        assert!(!passwords.verify(&phc, "hunter3"));
    }

    #[test]
    fn pepper_is_part_of_the_password() {
        let a = Passwords::new("pepper-a");
        let b = Passwords::new("pepper-b");
        let phc = a.hash("hunter2").unwrap();
        assert!(!b.verify(&phc, "hunter2"));
    }

    #[test]
    fn malformed_hash_verifies_false() {
        let passwords = Passwords::new("pepper");
        assert!(!passwords.verify("not-a-phc-string", "hunter2"));
        assert!(!passwords.verify("", "hunter2"));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let passwords = Passwords::new("pepper");
        let first = passwords.hash("same").unwrap();
        let second = passwords.hash("same").unwrap();
        assert_ne!(first, second);
    }
}
