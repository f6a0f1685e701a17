//! Login flow: auth-info → key derivation → login → master-key ring →
//! base folder.
//!
//! 2FA is the caller's problem by design: a `FilenError::AuthChallenge`
//! tells the CLI to prompt for a code and call [`login`] again.

use secrecy::SecretString;
use std::time::Duration;
use tracing::{debug, warn};

use filen_core::config::ApiConfig;
use filen_core::{Identity, Result};
use filen_crypto::envelope::decrypt_with_keyring;
use filen_crypto::kdf::derive_credentials;

use crate::api::{AuthInfo, BaseFolder, LoginData, MasterKeysField};
use crate::transport::HttpTransport;

/// Placeholder the login endpoint expects when no 2FA code applies.
const NO_TWO_FACTOR: &str = "XXXXXX";

/// Authenticate and build the session identity.
///
/// The returned identity's master-key list is ordered oldest→newest with
/// the password-derived key guaranteed last (it is the account's current
/// encryption key).
pub async fn login(
    api: &ApiConfig,
    email: &str,
    password: &SecretString,
    two_factor_code: Option<&str>,
) -> Result<Identity> {
    let anon = HttpTransport::new(api, None, Duration::from_secs(30))?;

    let info: AuthInfo = anon
        .post_data("/v3/auth/info", &serde_json::json!({ "email": email }))
        .await?;
    debug!(auth_version = info.auth_version, "auth info fetched");

    let derived = derive_credentials(password, &info.salt, info.auth_version);

    let data: LoginData = anon
        .post_data(
            "/v3/login",
            &serde_json::json!({
                "email": email,
                "password": derived.login_password,
                "authVersion": info.auth_version,
                "twoFactorCode": two_factor_code.unwrap_or(NO_TWO_FACTOR),
            }),
        )
        .await?;

    let master_keys = decode_master_keys(&data.master_keys, &derived.master_key);

    let authed = HttpTransport::new(api, Some(data.api_key.clone()), Duration::from_secs(30))?;
    let base_folder_uuid = match data.base_folder_uuid {
        Some(uuid) if !uuid.is_empty() => uuid,
        _ => {
            let base: BaseFolder = authed.get_data("/v3/user/baseFolder").await?;
            base.uuid
        }
    };

    Ok(Identity {
        email: email.to_string(),
        api_key: data.api_key,
        master_keys,
        base_folder_uuid,
        user_id: data.id,
    })
}

/// Unwrap the server's master-key material with the password-derived key.
///
/// Accepts both wire shapes. Anything that fails to decrypt is dropped with
/// a warning; the derived key is always appended last so new envelopes use
/// the current password's key.
fn decode_master_keys(field: &MasterKeysField, derived_key: &str) -> Vec<String> {
    let ring = vec![derived_key.to_string()];
    let mut keys: Vec<String> = match field {
        MasterKeysField::Single(envelope) if envelope.is_empty() => Vec::new(),
        MasterKeysField::Single(envelope) => match decrypt_with_keyring(envelope, &ring) {
            Ok(joined) => joined
                .split('|')
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => {
                warn!("master key envelope did not decrypt; continuing with the derived key only");
                Vec::new()
            }
        },
        MasterKeysField::Many(envelopes) => envelopes
            .iter()
            .filter_map(|envelope| match decrypt_with_keyring(envelope, &ring) {
                Ok(key) => Some(key),
                Err(_) => {
                    warn!("skipping master key envelope that did not decrypt");
                    None
                }
            })
            .collect(),
    };

    keys.retain(|k| k != derived_key);
    keys.push(derived_key.to_string());
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use filen_crypto::envelope::encrypt_envelope;

    #[test]
    fn single_envelope_decodes_pipe_joined_ring() {
        let derived = "derived-master-key";
        let sealed = encrypt_envelope("old-key-1|old-key-2", derived).unwrap();
        let keys = decode_master_keys(&MasterKeysField::Single(sealed), derived);
        assert_eq!(keys, vec!["old-key-1", "old-key-2", derived]);
    }

    #[test]
    fn many_envelopes_decode_individually() {
        let derived = "derived-master-key";
        let sealed = vec![
            encrypt_envelope("old-key", derived).unwrap(),
            encrypt_envelope(derived, derived).unwrap(),
        ];
        let keys = decode_master_keys(&MasterKeysField::Many(sealed), derived);
        // derived key deduplicated and moved last
        assert_eq!(keys, vec!["old-key", derived]);
    }

    #[test]
    fn undecryptable_material_falls_back_to_derived() {
        let keys = decode_master_keys(
            &MasterKeysField::Single("002garbagegarbage".into()),
            "derived",
        );
        assert_eq!(keys, vec!["derived"]);
    }

    #[test]
    fn empty_field_yields_derived_only() {
        let keys = decode_master_keys(&MasterKeysField::Single(String::new()), "derived");
        assert_eq!(keys, vec!["derived"]);
    }
}
