use std::thread;

use anyhow::{anyhow, Context, Result};
use futures::channel::oneshot;

/// Runs `job` on its own named thread and resolves once it finishes.
///
/// The event loop keeps polling other work meanwhile. A panicking job
/// surfaces as an error rather than a hung future.
pub async fn off_thread<T, F>(name: String, job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    thread::Builder::new()
        .name(format!("load {name}"))
        .spawn(move || {
            sender.send(job()).ok();
        })
        .with_context(|| format!("Failed to start loader thread for {name}"))?;

    receiver
        .await
        .map_err(|_| anyhow!("Loader thread for {name} stopped before finishing"))?
}
