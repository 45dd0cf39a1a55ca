use std::future::Future;

/// Run `fut` in the background on the active runtime.
///
/// Returns `false` when there is no runtime to spawn on.
#[cfg(feature = "redis-tokio")]
pub(crate) fn spawn_task<F>(fut: F) -> bool
where
    F: Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(fut);
            true
        }
        Err(_) => false,
    }
}

#[cfg(all(feature = "redis-smol", not(feature = "redis-tokio")))]
pub(crate) fn spawn_task<F>(fut: F) -> bool
where
    F: Future<Output = ()> + Send + 'static,
{
    smol::spawn(fut).detach();
    true
}
