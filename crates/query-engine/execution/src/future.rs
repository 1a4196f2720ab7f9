//! A future that resolves exactly once with the outcome of one execution.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::error::Error;

/// The pending outcome of an execution: the full result, or a single error.
///
/// Resolves once. Dropping it does not cancel the execution, which still runs
/// to completion and releases its resources. If the backend panics, or the
/// execution dies without publishing, e.g. because its runtime shut down, the
/// future resolves to [`Error::Abandoned`].
#[derive(Debug)]
pub struct QueryFuture<T> {
    receiver: oneshot::Receiver<Result<T, Error>>,
}

/// The publishing side of a [`QueryFuture`].
#[derive(Debug)]
pub(crate) struct Publisher<T> {
    sender: oneshot::Sender<Result<T, Error>>,
}

impl<T> QueryFuture<T> {
    pub(crate) fn channel() -> (Publisher<T>, QueryFuture<T>) {
        let (sender, receiver) = oneshot::channel();
        (Publisher { sender }, QueryFuture { receiver })
    }

    /// A future that is already resolved.
    pub fn ready(result: Result<T, Error>) -> Self {
        let (publisher, future) = QueryFuture::channel();
        publisher.publish(result);
        future
    }

    /// The outcome, if it has been published.
    pub fn try_take(&mut self) -> Option<Result<T, Error>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(Error::Abandoned)),
        }
    }

    /// Block the current thread until the outcome is published.
    ///
    /// An outcome that is already published is returned from any thread. To
    /// wait for one that is still pending this must not be called from within
    /// an asynchronous runtime, where blocking panics; `.await` it instead.
    pub fn wait(mut self) -> Result<T, Error> {
        if let Some(result) = self.try_take() {
            return result;
        }
        self.receiver
            .blocking_recv()
            .unwrap_or_else(|_| Err(Error::Abandoned))
    }
}

impl<T> Future for QueryFuture<T> {
    type Output = Result<T, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(Error::Abandoned)))
    }
}

impl<T> Publisher<T> {
    pub(crate) fn publish(self, result: Result<T, Error>) {
        if self.sender.send(result).is_err() {
            tracing::debug!("query outcome dropped, nobody is waiting for it");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_futures_resolve_without_a_runtime() {
        let future = QueryFuture::ready(Ok(vec![1, 2]));
        assert_eq!(future.wait().unwrap(), vec![1, 2]);
    }

    #[test]
    fn a_vanished_publisher_abandons_the_future() {
        let (publisher, mut future) = QueryFuture::<()>::channel();
        assert!(future.try_take().is_none());
        drop(publisher);
        assert!(matches!(future.try_take(), Some(Err(Error::Abandoned))));
    }

    #[tokio::test]
    async fn futures_resolve_once_published() {
        let (publisher, future) = QueryFuture::channel();
        tokio::spawn(async move { publisher.publish(Ok("done")) });
        assert_eq!(future.await.unwrap(), "done");
    }

    #[test]
    fn wait_blocks_until_published() {
        let (publisher, future) = QueryFuture::channel();
        let waiter = std::thread::spawn(move || future.wait());
        std::thread::sleep(std::time::Duration::from_millis(10));
        publisher.publish(Ok(5));
        assert_eq!(waiter.join().unwrap().unwrap(), 5);
    }
}
