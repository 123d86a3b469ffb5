//! Outbound reminder delivery.

pub mod telegram;

pub use telegram::TelegramNotifier;

use crate::error::NotifyError;

/// A channel that can deliver one text message to one recipient.
pub trait Notifier: Send + Sync {
    /// Short channel name used in logs.
    fn channel(&self) -> &str;

    fn send(&self, recipient: &str, text: &str) -> Result<(), NotifyError>;
}

/// Thin wrapper around the OS keyring for credential storage.
pub mod keyring_store {
    use crate::error::NotifyError;

    const SERVICE: &str = "habitloop";

    pub fn get(key: &str) -> Result<Option<String>, NotifyError> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(key: &str, value: &str) -> Result<(), NotifyError> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        entry.set_password(value)?;
        Ok(())
    }

    /// Remove a credential. Missing entries are not an error.
    pub fn delete(key: &str) -> Result<(), NotifyError> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
