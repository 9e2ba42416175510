//! Login handles and initial secrets for newly created records.

use boxfinder_core::{fallback_slug, DirectoryStore, SlugTranslator, StoreError};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Used when neither translation nor the fallback yields any ASCII.
pub const DEFAULT_LOGIN_BASE: &str = "box";

/// Highest numeric suffix tried before giving up on a base.
pub const MAX_LOGIN_SUFFIX: u32 = 500;

const SECRET_LEN: usize = 24;

/// ASCII slug for `name`: translated if possible, naive otherwise.
pub async fn base_login<T: SlugTranslator>(translator: &T, name: &str) -> String {
    let translated = match translator.translate(name).await {
        Ok(slug) => fallback_slug(&slug),
        Err(e) => {
            tracing::warn!(name, error = %e, "slug translation failed; using naive slug");
            String::new()
        }
    };
    if !translated.is_empty() {
        return translated;
    }
    let naive = fallback_slug(name);
    if naive.is_empty() {
        DEFAULT_LOGIN_BASE.to_owned()
    } else {
        naive
    }
}

/// First free login among `base`, `base-2`, `base-3`, ...
///
/// # Errors
///
/// Returns [`StoreError::LoginTaken`] once every suffix up to
/// [`MAX_LOGIN_SUFFIX`] is in use, or the store's error if a lookup fails.
pub async fn unique_login<S: DirectoryStore>(store: &S, base: &str) -> Result<String, StoreError> {
    if !store.login_exists(base).await? {
        return Ok(base.to_owned());
    }
    for n in 2..=MAX_LOGIN_SUFFIX {
        let candidate = format!("{base}-{n}");
        if !store.login_exists(&candidate).await? {
            return Ok(candidate);
        }
    }
    Err(StoreError::LoginTaken(base.to_owned()))
}

#[must_use]
pub fn generate_secret() -> String {
    rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(SECRET_LEN)
        .map(char::from)
        .collect()
}

/// Lower-case hex SHA-256 of `secret`.
#[must_use]
pub fn hash_secret(secret: &str) -> String {
    format!("{:x}", Sha256::digest(secret.as_bytes()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use boxfinder_core::{DirectoryRecord, NewDirectoryRecord};

    use super::*;

    struct Taken(Mutex<HashSet<String>>);

    impl Taken {
        fn with(logins: &[&str]) -> Self {
            Self(Mutex::new(logins.iter().map(|l| (*l).to_owned()).collect()))
        }
    }

    impl DirectoryStore for Taken {
        async fn find_all(&self) -> Result<Vec<DirectoryRecord>, StoreError> {
            Ok(Vec::new())
        }

        async fn login_exists(&self, login: &str) -> Result<bool, StoreError> {
            Ok(self.0.lock().unwrap().contains(login))
        }

        async fn create(&self, _record: NewDirectoryRecord) -> Result<DirectoryRecord, StoreError> {
            Err(StoreError::Backend("not used".into()))
        }
    }

    struct Broken;

    impl SlugTranslator for Broken {
        async fn translate(&self, _display_name: &str) -> Result<String, StoreError> {
            Err(StoreError::Backend("offline".into()))
        }
    }

    struct Echo;

    impl SlugTranslator for Echo {
        async fn translate(&self, display_name: &str) -> Result<String, StoreError> {
            Ok(display_name.to_owned())
        }
    }

    #[tokio::test]
    async fn free_base_is_used_as_is() {
        let login = unique_login(&Taken::with(&[]), "cf-gangnam").await.unwrap();
        assert_eq!(login, "cf-gangnam");
    }

    #[tokio::test]
    async fn taken_base_gets_first_free_suffix() {
        let store = Taken::with(&["cf-gangnam", "cf-gangnam-2"]);
        let login = unique_login(&store, "cf-gangnam").await.unwrap();
        assert_eq!(login, "cf-gangnam-3");
    }

    #[tokio::test]
    async fn exhausted_suffixes_report_login_taken() {
        let mut taken = vec!["box".to_owned()];
        taken.extend((2..=MAX_LOGIN_SUFFIX).map(|n| format!("box-{n}")));
        let refs: Vec<&str> = taken.iter().map(String::as_str).collect();
        let result = unique_login(&Taken::with(&refs), "box").await;
        assert!(matches!(result, Err(StoreError::LoginTaken(base)) if base == "box"));
    }

    #[tokio::test]
    async fn failed_translation_uses_naive_slug() {
        assert_eq!(base_login(&Broken, "CF 강남").await, "cf");
    }

    #[tokio::test]
    async fn nothing_ascii_falls_back_to_default_base() {
        assert_eq!(base_login(&Broken, "크로스핏").await, DEFAULT_LOGIN_BASE);
    }

    #[tokio::test]
    async fn translator_output_is_sanitized() {
        assert_eq!(base_login(&Echo, "Iron Works!").await, "iron-works");
    }

    #[test]
    fn secrets_are_alphanumeric_and_distinct() {
        let a = generate_secret();
        let b = generate_secret();
        assert_eq!(a.len(), SECRET_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_hex_sha256() {
        assert_eq!(
            hash_secret("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
