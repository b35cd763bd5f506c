//! Signed, expiring tokens for account activation and password reset links.
//!
//! A link token signs over the user's password hash, so changing the password
//! invalidates any previously emailed reset links. Tokens carry their creation
//! time so they expire without any server side state.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use time::{Duration, OffsetDateTime};

use crate::{Error, auth::UserID, auth::user::User};

type HmacSha256 = Hmac<Sha256>;

/// How long an emailed link stays valid.
pub const LINK_TOKEN_DURATION: Duration = Duration::days(3);

/// What an emailed link is allowed to do.
///
/// A token minted for one purpose does not verify for the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    /// Confirm the email address and activate the account.
    Activation,
    /// Authorize a password reset.
    PasswordReset,
}

impl TokenPurpose {
    fn label(self) -> &'static str {
        match self {
            TokenPurpose::Activation => "activate",
            TokenPurpose::PasswordReset => "reset-password",
        }
    }
}

/// The secret key used to sign link tokens.
#[derive(Clone)]
pub struct LinkTokenKey(Vec<u8>);

impl LinkTokenKey {
    /// Derive a signing key from the application secret.
    pub fn new(secret: &str) -> Self {
        Self(Sha512::digest(secret.as_bytes()).to_vec())
    }
}

impl std::fmt::Debug for LinkTokenKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LinkTokenKey(..)")
    }
}

fn compute_mac(
    key: &LinkTokenKey,
    purpose: TokenPurpose,
    user: &User,
    timestamp_hex: &str,
) -> HmacSha256 {
    // HMAC keys of any length are accepted, so this cannot fail.
    let mut mac = HmacSha256::new_from_slice(&key.0).expect("HMAC accepts keys of any length");
    mac.update(purpose.label().as_bytes());
    mac.update(b"\x00");
    mac.update(user.id.as_i64().to_string().as_bytes());
    mac.update(b"\x00");
    mac.update(timestamp_hex.as_bytes());
    mac.update(b"\x00");
    mac.update(user.password_hash.as_ref().as_bytes());

    mac
}

/// Create a link token for `user`.
///
/// The token format is `{timestamp_hex}.{mac}` where the MAC covers the
/// purpose, user ID, timestamp and current password hash.
pub fn generate_link_token(key: &LinkTokenKey, purpose: TokenPurpose, user: &User) -> String {
    let timestamp_hex = format!("{:x}", OffsetDateTime::now_utc().unix_timestamp());
    let mac = compute_mac(key, purpose, user, &timestamp_hex);
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    format!("{timestamp_hex}.{signature}")
}

/// Check that `token` was minted for `user` and `purpose` and has not expired.
///
/// # Errors
///
/// Returns [Error::InvalidOrExpiredLink] if the token is malformed, the
/// signature does not match, or the token is older than [LINK_TOKEN_DURATION].
pub fn verify_link_token(
    key: &LinkTokenKey,
    purpose: TokenPurpose,
    user: &User,
    token: &str,
) -> Result<(), Error> {
    let (timestamp_hex, signature) = token.split_once('.').ok_or(Error::InvalidOrExpiredLink)?;
    let timestamp =
        i64::from_str_radix(timestamp_hex, 16).map_err(|_| Error::InvalidOrExpiredLink)?;
    let created_at = OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|_| Error::InvalidOrExpiredLink)?;

    let now = OffsetDateTime::now_utc();
    if created_at > now || now - created_at > LINK_TOKEN_DURATION {
        return Err(Error::InvalidOrExpiredLink);
    }

    let signature_bytes = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| Error::InvalidOrExpiredLink)?;

    compute_mac(key, purpose, user, timestamp_hex)
        .verify_slice(&signature_bytes)
        .map_err(|_| Error::InvalidOrExpiredLink)
}

/// Encode a user ID for use in an emailed link.
pub fn encode_user_reference(user_id: UserID) -> String {
    URL_SAFE_NO_PAD.encode(user_id.as_i64().to_string())
}

/// Decode the user reference from an emailed link.
///
/// # Errors
///
/// Returns [Error::InvalidLink] if `reference` is not a base64 encoded ID.
pub fn decode_user_reference(reference: &str) -> Result<UserID, Error> {
    let bytes = URL_SAFE_NO_PAD
        .decode(reference)
        .map_err(|_| Error::InvalidLink)?;
    let id_string = String::from_utf8(bytes).map_err(|_| Error::InvalidLink)?;
    let id: i64 = id_string.parse().map_err(|_| Error::InvalidLink)?;

    Ok(UserID::new(id))
}
