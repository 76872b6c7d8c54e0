//! Environment configuration for different deployment stages

use std::env;

use media_reference::KeyNormalizer;

use crate::media_storage::{StorageConfig, DEFAULT_SIGNED_URL_EXPIRY_SECS};
use crate::middleware::UploadAuth;

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment
    Development {
        /// Optional override for signed URL expiry in seconds
        signed_url_expiry_override: Option<u64>,
    },
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => {
                let signed_url_expiry_override = env::var("SIGNED_URL_EXPIRY_SECS")
                    .ok()
                    .and_then(|val| val.parse::<u64>().ok());

                Self::Development {
                    signed_url_expiry_override,
                }
            }
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Object-store settings, `None` when any required `B2_*` variable is missing
    #[must_use]
    pub fn storage_config(&self) -> Option<StorageConfig> {
        StorageConfig::from_env()
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development { .. } | Self::Staging)
    }

    /// Whether logs should be emitted as JSON
    #[must_use]
    pub const fn json_logs(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }

    /// Signed URL expiry time in seconds
    #[must_use]
    pub fn signed_url_expiry_secs(&self) -> u64 {
        match self {
            Self::Production | Self::Staging => DEFAULT_SIGNED_URL_EXPIRY_SECS,
            Self::Development {
                signed_url_expiry_override,
            } => signed_url_expiry_override.unwrap_or(DEFAULT_SIGNED_URL_EXPIRY_SECS),
        }
    }

    /// Key normalizer aware of every host that serves objects natively.
    ///
    /// Besides the Backblaze default, this includes the configured endpoint host
    /// and any host listed in `B2_NATIVE_HOSTS` (comma separated).
    #[must_use]
    pub fn key_normalizer(&self, storage: Option<&StorageConfig>) -> KeyNormalizer {
        let extra_hosts = env::var("B2_NATIVE_HOSTS").unwrap_or_default();

        storage
            .and_then(StorageConfig::endpoint_host)
            .into_iter()
            .chain(extra_hosts.split(',').map(str::to_string))
            .fold(KeyNormalizer::new(), |normalizer, host| {
                normalizer.with_native_host(&host)
            })
    }

    /// Who may upload files
    #[must_use]
    pub fn upload_auth(&self) -> UploadAuth {
        let allow_public = env::var("ALLOW_PUBLIC_UPLOADS")
            .is_ok_and(|val| val.trim().eq_ignore_ascii_case("true"));

        if allow_public {
            return UploadAuth::Public;
        }

        env::var("UPLOAD_API_TOKEN")
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .map_or(UploadAuth::Disabled, UploadAuth::Token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_environment_from_env() {
        // Test development (default)
        env::remove_var("APP_ENV");
        env::remove_var("SIGNED_URL_EXPIRY_SECS");
        assert_eq!(
            Environment::from_env(),
            Environment::Development {
                signed_url_expiry_override: None
            }
        );

        env::set_var("APP_ENV", " Staging ");
        assert_eq!(Environment::from_env(), Environment::Staging);

        env::set_var("APP_ENV", "production");
        assert_eq!(Environment::from_env(), Environment::Production);

        env::remove_var("APP_ENV");
    }

    #[test]
    #[serial]
    #[should_panic(expected = "Invalid environment: invalid")]
    fn test_invalid_environment() {
        env::set_var("APP_ENV", "invalid");
        let _ = Environment::from_env();
    }

    #[test]
    #[serial]
    fn test_signed_url_expiry_secs() {
        let env = Environment::Development {
            signed_url_expiry_override: None,
        };
        assert_eq!(env.signed_url_expiry_secs(), 3600);

        let env = Environment::Development {
            signed_url_expiry_override: Some(30),
        };
        assert_eq!(env.signed_url_expiry_secs(), 30);

        assert_eq!(Environment::Production.signed_url_expiry_secs(), 3600);
        assert_eq!(Environment::Staging.signed_url_expiry_secs(), 3600);
    }

    #[test]
    #[serial]
    fn test_development_with_env_override() {
        env::set_var("APP_ENV", "development");
        env::set_var("SIGNED_URL_EXPIRY_SECS", "120");

        let env = Environment::from_env();
        assert_eq!(env.signed_url_expiry_secs(), 120);

        // Invalid values fall back to the default
        env::set_var("SIGNED_URL_EXPIRY_SECS", "invalid");
        assert_eq!(Environment::from_env().signed_url_expiry_secs(), 3600);

        env::remove_var("SIGNED_URL_EXPIRY_SECS");
        env::remove_var("APP_ENV");
    }

    #[test]
    #[serial]
    fn test_upload_auth() {
        let env = Environment::Production;

        env::remove_var("ALLOW_PUBLIC_UPLOADS");
        env::remove_var("UPLOAD_API_TOKEN");
        assert_eq!(env.upload_auth(), UploadAuth::Disabled);

        env::set_var("UPLOAD_API_TOKEN", " s3cret ");
        assert_eq!(env.upload_auth(), UploadAuth::Token("s3cret".to_string()));

        env::set_var("ALLOW_PUBLIC_UPLOADS", "TRUE");
        assert_eq!(env.upload_auth(), UploadAuth::Public);

        env::remove_var("ALLOW_PUBLIC_UPLOADS");
        env::remove_var("UPLOAD_API_TOKEN");
    }

    #[test]
    #[serial]
    fn test_key_normalizer_native_hosts() {
        env::set_var("B2_NATIVE_HOSTS", "media.example.org, ,cdn.example.net");
        let storage = StorageConfig {
            endpoint: "https://s3.eu-central-003.backblazeb2.com".to_string(),
            region: "eu-central-003".to_string(),
            access_key_id: "id".to_string(),
            secret_access_key: "secret".to_string(),
            bucket: "bucket".to_string(),
            public_url_base: None,
        };

        let normalizer = Environment::Production.key_normalizer(Some(&storage));
        assert_eq!(
            normalizer.native_hosts(),
            [
                "backblazeb2.com",
                "s3.eu-central-003.backblazeb2.com",
                "media.example.org",
                "cdn.example.net"
            ]
        );

        env::remove_var("B2_NATIVE_HOSTS");
        let normalizer = Environment::Production.key_normalizer(None);
        assert_eq!(normalizer.native_hosts(), ["backblazeb2.com"]);
    }
}
