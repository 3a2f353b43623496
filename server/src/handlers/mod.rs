//! Request handlers.
//!
//! Handlers take what they need from the session under its lock, run the
//! CPU-bound work on the blocking pool and store results back with a whole
//! table replacement.

mod data;
mod predict;
mod preprocess;

pub use data::{data_info, download_results, generate_eda, root, upload_csv};
pub use predict::predict;
pub use preprocess::preprocess;

use crate::error::Result;

/// Run `work` on the blocking thread pool. A panic inside becomes a 500.
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}
