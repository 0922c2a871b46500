use base64::{URL_SAFE_NO_PAD, encode_config};
use jwt_simple::prelude::ES256KeyPair;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::config;
use crate::types::reminders::VapidConfig;

#[derive(Debug, Clone)]
pub struct VapidCredentials {
    pub private_key: String,
    pub public_key: String,
}

#[derive(Debug, Clone)]
pub enum VapidConfigStatus {
    Missing,
    Incomplete,
    Ready(VapidConfig),
}

/// All three VAPID values must be present (and non-blank) for reminders to run.
pub fn load_vapid_config(config: &config::AppConfig) -> VapidConfigStatus {
    let present = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };
    let private_key = present(&config.vapid_private_key);
    let public_key = present(&config.vapid_public_key);
    let subject = present(&config.vapid_subject);
    let has_any = private_key.is_some() || public_key.is_some() || subject.is_some();

    match (private_key, public_key, subject) {
        (Some(private_key), Some(public_key), Some(subject)) => {
            VapidConfigStatus::Ready(VapidConfig {
                private_key,
                public_key,
                subject,
            })
        }
        _ if has_any => VapidConfigStatus::Incomplete,
        _ => VapidConfigStatus::Missing,
    }
}

/// A fresh key pair for the `init` subcommand.
pub fn generate_vapid_credentials() -> Result<VapidCredentials, web_push::WebPushError> {
    generate_vapid_credentials_with_rng(&mut OsRng)
}

pub(crate) fn generate_vapid_credentials_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<VapidCredentials, web_push::WebPushError> {
    // Not every 32-byte string is a valid P-256 scalar; draw until one is.
    let key_pair = std::iter::repeat_with(|| {
        let mut scalar = [0u8; 32];
        rng.fill_bytes(&mut scalar);
        scalar
    })
    .find_map(|scalar| ES256KeyPair::from_bytes(&scalar).ok())
    .ok_or(web_push::WebPushError::Unspecified)?;

    VapidCredentials::from_private_key(encode_config(key_pair.to_bytes(), URL_SAFE_NO_PAD))
}

impl VapidCredentials {
    /// Derives the uncompressed public point browsers expect as `applicationServerKey`.
    pub fn from_private_key(private_key: String) -> Result<Self, web_push::WebPushError> {
        let public_key =
            web_push::VapidSignatureBuilder::from_base64_no_sub(&private_key, URL_SAFE_NO_PAD)?
                .get_public_key();
        Ok(Self {
            public_key: encode_config(public_key, URL_SAFE_NO_PAD),
            private_key,
        })
    }

    pub fn into_config(self, subject: impl Into<String>) -> VapidConfig {
        VapidConfig {
            private_key: self.private_key,
            public_key: self.public_key,
            subject: subject.into(),
        }
    }
}
