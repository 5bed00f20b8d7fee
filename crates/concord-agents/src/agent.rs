use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use concord_models::{Dataset, Signal};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::AgentError;

/// Anything that can analyze a subject given a dataset. Mockable for testing.
///
/// Implementations must be safe to invoke concurrently for different subjects
/// and must treat the dataset as read-only.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(&self, subject_id: &str, dataset: &Dataset) -> Result<Signal, AgentError>;
}

type Factory<T> = Box<dyn Fn() -> Result<Arc<T>, String> + Send + Sync>;

/// A helper capability built on first use and reused for the agent's lifetime.
///
/// Concurrent first access initializes at most once. A failed construction is
/// reported as [`AgentError::Dependency`] and not cached, so a later call retries.
pub struct LazyCapability<T: ?Sized> {
    name: String,
    cell: OnceCell<Arc<T>>,
    factory: Factory<T>,
}

impl<T: ?Sized + Send + Sync> LazyCapability<T> {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<T>, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            cell: OnceCell::new(),
            factory: Box::new(factory),
        }
    }

    /// Wrap an already-built capability.
    pub fn ready(name: impl Into<String>, value: Arc<T>) -> Self {
        Self {
            name: name.into(),
            cell: OnceCell::new_with(Some(value)),
            factory: Box::new(|| Err("capability was pre-built".to_string())),
        }
    }

    /// A capability that can never be built.
    pub fn unavailable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(name, move || Err(reason.clone()))
    }

    pub async fn get(&self) -> Result<Arc<T>, AgentError> {
        let value = self
            .cell
            .get_or_try_init(|| async {
                debug!(capability = %self.name, "Initializing capability");
                (self.factory)().map_err(|e| AgentError::Dependency(format!("{}: {e}", self.name)))
            })
            .await?;
        Ok(Arc::clone(value))
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

impl<T: ?Sized> fmt::Debug for LazyCapability<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyCapability")
            .field("name", &self.name)
            .field("initialized", &self.cell.initialized())
            .finish()
    }
}
