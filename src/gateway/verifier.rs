//! Password verification against stored SHA-512 digests.

use secrecy::ExposeSecret;
use sha2::{Digest, Sha512};
use std::{hint::black_box, sync::Arc};
use subtle::ConstantTimeEq;
use tracing::{Instrument, error, info_span};

use super::{Credential, GatewayError};
use crate::store::UserStore;

/// Compared against on the unknown-user path; no hex digest can match it.
const UNKNOWN_USER_DIGEST: [u8; 128] = [b'x'; 128];

/// Hex encoded SHA-512 of a password, as stored in `users.password`.
#[must_use]
pub fn digest_password(password: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Clone)]
pub struct CredentialVerifier {
    users: Arc<dyn UserStore>,
}

impl CredentialVerifier {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Check the credential against the stored record and return the verified username.
    ///
    /// # Errors
    /// `UnknownUser` or `BadPassword` on a mismatch, `LookupError` if the store fails.
    pub async fn verify(&self, credential: &Credential) -> Result<String, GatewayError> {
        let span = info_span!("auth.lookup", user.name = credential.username());
        let record = self
            .users
            .find_user_by_name(credential.username())
            .instrument(span)
            .await
            .map_err(|err| {
                error!("Failed to look up user record: {err}");
                GatewayError::LookupError(err)
            })?;

        let Some(record) = record.filter(|record| !record.username.is_empty()) else {
            // Unknown users cost the same digest and compare work as known ones.
            let supplied = digest_password(credential.password().expose_secret());
            let _ = black_box(ct_eq(supplied.as_bytes(), &UNKNOWN_USER_DIGEST));
            return Err(GatewayError::UnknownUser);
        };

        let supplied = digest_password(credential.password().expose_secret());
        if !ct_eq(supplied.as_bytes(), record.password_digest.as_bytes()) {
            return Err(GatewayError::BadPassword);
        }

        Ok(record.username)
    }
}

fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.ct_eq(b).into()
}
