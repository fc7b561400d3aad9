use std::sync::Arc;

use rand::{distr::Alphanumeric, Rng};

use crate::{
    database::{error::RepositoryError, queries::ShortLinkStore},
    errors::AppError,
};

/// Base length of a generated code; 62^3 values.
const CODE_LEN: usize = 3;
/// Collision retries per length before widening or giving up.
const MAX_ATTEMPTS_PER_LEN: usize = 5;

/// Mints collision-free redirect codes and resolves them back to their
/// target URLs while counting clicks.
pub struct ShortLinkService {
    store: Arc<dyn ShortLinkStore>,
}

impl ShortLinkService {
    pub fn new(store: Arc<dyn ShortLinkStore>) -> Self {
        Self { store }
    }

    /// Creates a link record for `url` under a freshly generated unique
    /// code and returns the code. Every call mints a new code; repeated
    /// shortenings of the same URL are not deduplicated.
    ///
    /// Candidates are drawn at the base length a bounded number of times;
    /// on exhaustion one more bounded round runs at length + 1 before the
    /// operation fails, so a saturated code space cannot loop forever.
    pub async fn short_url(&self, url: &str) -> Result<String, AppError> {
        if url.is_empty() {
            return Err(AppError::InvalidInput("url must not be empty".to_owned()));
        }

        for len in [CODE_LEN, CODE_LEN + 1] {
            for _ in 0..MAX_ATTEMPTS_PER_LEN {
                let code = generate_code(len);
                if !self.store.is_unique(&code).await? {
                    continue;
                }
                return match self.store.create(url, &code).await {
                    Ok(link) => Ok(link.code),
                    // lost a race to another creator between the
                    // uniqueness check and the insert
                    Err(RepositoryError::AlreadyExists) => continue,
                    Err(err) => Err(err.into()),
                };
            }
            tracing::warn!("no unused short code found at length {len}");
        }

        Err(AppError::Internal(
            "could not generate a unique short code".to_owned(),
        ))
    }

    /// Resolves a code to its target URL, counting the click. The call
    /// fails unless the increment is confirmed to have been applied.
    pub async fn get_url(&self, code: &str) -> Result<String, AppError> {
        let link = self.store.find_by_code(code).await.map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound,
            other => other.into(),
        })?;

        self.store.increment_click_count(link.id).await?;
        Ok(link.url)
    }
}

/// Fixed-length code over [a-zA-Z0-9], drawn from a CSPRNG.
fn generate_code(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
