use super::domain::{KycApplication, KycApplicationId, KycStatus};

/// Storage abstraction so the service module can be exercised in isolation.
pub trait KycRepository: Send + Sync {
    fn insert(&self, application: KycApplication) -> Result<KycApplication, RepositoryError>;
    fn update(&self, application: KycApplication) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &KycApplicationId) -> Result<Option<KycApplication>, RepositoryError>;
    fn with_status(
        &self,
        statuses: &[KycStatus],
        limit: usize,
    ) -> Result<Vec<KycApplication>, RepositoryError>;
    fn all(&self) -> Result<Vec<KycApplication>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
