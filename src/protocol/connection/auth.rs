use sha1::{Digest, Sha1};

use crate::error::{Error, Result};
use crate::opts::{Credentials, Salt};
use crate::protocol::connection::HandshakeResponse;

/// mysql_native_password scramble the client must send back
///
/// Formula: SHA1(password) XOR SHA1(salt + SHA1(SHA1(password)))
pub fn scramble_native_password(password: &str, salt: &Salt) -> [u8; 20] {
    // stage1_hash = SHA1(password)
    let stage1_hash = Sha1::digest(password.as_bytes());

    // stage2_hash = SHA1(stage1_hash)
    let stage2_hash = Sha1::digest(stage1_hash);

    // token_hash = SHA1(salt + stage2_hash)
    let mut hasher = Sha1::new();
    hasher.update(salt.as_bytes());
    hasher.update(stage2_hash);
    let token_hash = hasher.finalize();

    let mut result = [0u8; 20];
    for ((out, a), b) in result.iter_mut().zip(stage1_hash.iter()).zip(token_hash.iter()) {
        *out = a ^ b;
    }
    result
}

/// Check a handshake response against the configured account
///
/// Every rejection is the same [`Error::AccessDenied`]; the caller cannot
/// tell an unknown user from a bad password.
pub fn authenticate(
    credentials: &Credentials,
    salt: &Salt,
    response: &HandshakeResponse<'_>,
) -> Result<()> {
    if response.username != credentials.username {
        tracing::warn!(
            username = %response.username,
            "authentication failed: unknown user"
        );
        return Err(Error::AccessDenied(response.username.clone()));
    }

    if let Some(password) = credentials.password() {
        let expected = scramble_native_password(password, salt);
        if response.auth_response != expected.as_slice() {
            tracing::warn!(
                username = %response.username,
                "authentication failed: wrong password"
            );
            return Err(Error::AccessDenied(response.username.clone()));
        }
    }

    Ok(())
}
