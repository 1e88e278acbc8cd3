use std::future::Future;

use pr_load_core::prelude::{ShutdownHandle, ShutdownSignalError};

#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
    shutdown_handle: ShutdownHandle,
}

impl Executor {
    pub(crate) fn new(runtime: tokio::runtime::Runtime, shutdown_handle: ShutdownHandle) -> Self {
        Self {
            runtime,
            shutdown_handle,
        }
    }

    /// Run async code in place, blocking until it completes.
    ///
    /// The future is cancelled if the run is stopped, in which case a [ShutdownSignalError] is
    /// returned. Agent behaviours should use this for every network call and for pacing so that
    /// the stop signal is honoured promptly.
    pub fn execute_in_place<T>(
        &self,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        let mut shutdown_listener = self.shutdown_handle.new_listener();
        self.runtime.block_on(async move {
            tokio::select! {
                // Prefer the stop signal so that nothing new starts once it has fired.
                biased;
                _ = shutdown_listener.wait_for_shutdown() => {
                    Err(anyhow::anyhow!(ShutdownSignalError::default()))
                },
                result = fut => result,
            }
        })
    }

    /// Run async code in place to completion, ignoring the stop signal.
    ///
    /// Used for setup and teardown, and for requests that must be recorded once sent even if the
    /// run is stopped meanwhile.
    pub fn execute_to_completion<T>(&self, fut: impl Future<Output = T>) -> T {
        self.runtime.block_on(fut)
    }

    /// Submit async code to be run in the background.
    ///
    /// The future is not cancelled by the stop signal and the runner does not wait for it before
    /// finishing.
    pub fn spawn(&self, fut: impl Future<Output = ()> + Send + 'static) {
        self.runtime.spawn(fut);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn executor() -> (Executor, ShutdownHandle) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let handle = ShutdownHandle::new();
        (Executor::new(runtime, handle.clone()), handle)
    }

    #[test]
    fn execute_in_place_returns_result() {
        let (executor, _) = executor();
        let value = executor.execute_in_place(async { Ok(42) }).unwrap();
        assert_eq!(42, value);
    }

    #[test]
    fn execute_in_place_is_cancelled_by_shutdown() {
        let (executor, handle) = executor();
        let stopper = handle.clone();
        executor.spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stopper.shutdown();
        });

        let started = std::time::Instant::now();
        let result = executor.execute_in_place(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        });

        let err = result.unwrap_err();
        assert!(err.is::<ShutdownSignalError>());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn nothing_starts_after_shutdown() {
        let (executor, handle) = executor();
        handle.shutdown();

        let result = executor.execute_in_place(async { Ok(()) });
        assert!(result.unwrap_err().is::<ShutdownSignalError>());

        assert_eq!(7, executor.execute_to_completion(async { 7 }));
    }
}
