//! Privilege checks for mutating intents.
//!
//! An [`AdminCapability`] can only be obtained from [`AdminKey::verify`], so any
//! code holding one has proven knowledge of the shared secret.

use std::fmt;

/// Shared secret guarding privileged intents.
#[derive(Clone, Default)]
pub struct AdminKey {
    secret: Option<String>,
}

impl AdminKey {
    /// Blank secrets are treated as unconfigured.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|value| !value.trim().is_empty()),
        }
    }

    /// Whether a non-empty key was configured.
    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Mint a capability when `presented` matches the configured secret.
    pub fn verify(&self, presented: &str) -> Option<AdminCapability> {
        let secret = self.secret.as_deref()?;
        constant_time_eq(secret.as_bytes(), presented.as_bytes()).then_some(AdminCapability(()))
    }
}

impl fmt::Debug for AdminKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminKey")
            .field("configured", &self.is_configured())
            .finish()
    }
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

/// Proof that the caller presented the admin secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminCapability(());

/// Who submitted an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// Anonymous caller; may only register players.
    Public,
    Admin(AdminCapability),
}

impl Actor {
    /// Admin capability, if the caller holds one.
    pub fn capability(&self) -> Option<AdminCapability> {
        match self {
            Actor::Public => None,
            Actor::Admin(capability) => Some(*capability),
        }
    }

    /// Whether the caller may run privileged intents.
    pub fn is_admin(&self) -> bool {
        self.capability().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_configured_secret_mints_a_capability() {
        let key = AdminKey::new(Some("courtside".into()));
        assert!(key.verify("courtside").is_some());
        assert!(key.verify("courtsid").is_none());
        assert!(key.verify("").is_none());
    }

    #[test]
    fn missing_or_blank_secret_rejects_everyone() {
        for key in [AdminKey::new(None), AdminKey::new(Some("  ".into()))] {
            assert!(!key.is_configured());
            assert!(key.verify("").is_none());
            assert!(key.verify("  ").is_none());
        }
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let key = AdminKey::new(Some("courtside".into()));
        assert!(!format!("{key:?}").contains("courtside"));
    }
}
