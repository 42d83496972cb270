//! # Cross-thread signals between a controller and its worker.
//!
//! Every activation of a [`SupervisedTask`](crate::SupervisedTask) wires up three signals:
//!
//! ```text
//!   controller                                   worker
//!   ──────────                                   ──────
//!   StartAck   ◄──── oneshot<bool> ───────────── InitAck::ack(bool)
//!   stop()     ───── CancellationToken ────────► StopSignal::is_set()
//!   Completion ◄──── Shared<oneshot<outcome>> ── task function returns / panics
//! ```
//!
//! ## Rules
//! - [`InitAck`] is consumed by value: a worker acknowledges **at most once**.
//! - A dropped `InitAck` leaves [`StartAck`] pending forever; bounded waiters see a timeout.
//! - [`StopSignal`] is read-only; only the controller can set it.
//! - [`Completion`] is cloneable; clones observe the same outcome without consuming it.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::oneshot;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{Failure, TaskError};

/// One-shot init acknowledgment handed to the task function.
///
/// Call [`InitAck::succeed`] once startup work is done, or [`InitAck::fail`]
/// if the worker cannot enter steady state.
#[must_use = "a worker that never acknowledges is indistinguishable from one still starting"]
pub struct InitAck {
    tx: oneshot::Sender<bool>,
}

impl InitAck {
    pub(crate) fn channel() -> (Self, StartAck) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, StartAck::new(rx))
    }

    /// Reports whether startup succeeded.
    pub fn ack(self, success: bool) {
        let _ = self.tx.send(success);
    }

    /// Reports a successful startup.
    pub fn succeed(self) {
        self.ack(true)
    }

    /// Reports a failed startup.
    pub fn fail(self) {
        self.ack(false)
    }
}

impl fmt::Debug for InitAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitAck").finish_non_exhaustive()
    }
}

/// Read-only view of the cancellation signal for one activation.
#[derive(Clone, Debug)]
pub struct StopSignal {
    token: CancellationToken,
}

impl StopSignal {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Returns `true` once the controller has requested shutdown.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the controller requests shutdown.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// Future resolving to the worker's init acknowledgment.
///
/// Resolves to `true` (started) or `false` (start rejected). If the worker never
/// acknowledges, it never resolves: use [`StartAck::wait_until`] or
/// [`StartAck::wait_for`] for a bounded wait.
pub struct StartAck {
    inner: BoxFuture<'static, bool>,
}

impl StartAck {
    fn new(rx: oneshot::Receiver<bool>) -> Self {
        let inner = async move {
            match rx.await {
                Ok(success) => success,
                Err(_dropped) => std::future::pending().await,
            }
        }
        .boxed();
        Self { inner }
    }

    /// Waits for the acknowledgment until `deadline`.
    ///
    /// Returns `Ok(())` on a positive ack, [`Failure::StartRejected`] on a negative
    /// one and [`Failure::StartTimeout`] when the deadline passes first.
    pub async fn wait_until(self, deadline: Instant) -> Result<(), Failure> {
        match time::timeout_at(deadline, self).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(Failure::StartRejected),
            Err(_elapsed) => Err(Failure::StartTimeout),
        }
    }

    /// Waits for the acknowledgment for at most `timeout`.
    pub async fn wait_for(self, timeout: Duration) -> Result<(), Failure> {
        self.wait_until(Instant::now() + timeout).await
    }
}

impl Future for StartAck {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        self.inner.as_mut().poll(cx)
    }
}

impl fmt::Debug for StartAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartAck").finish_non_exhaustive()
    }
}

/// Outcome of one worker activation.
pub type Outcome<T> = Result<T, TaskError>;

/// Shared, cloneable completion future of one worker activation.
///
/// Every clone resolves to the same [`Outcome`]. Awaiting one clone never
/// consumes the outcome for the others.
pub struct Completion<T> {
    inner: Shared<BoxFuture<'static, Outcome<T>>>,
}

impl<T> Completion<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn channel() -> (oneshot::Sender<Outcome<T>>, Self) {
        let (tx, rx) = oneshot::channel::<Outcome<T>>();
        let inner = rx
            .map(|res| res.unwrap_or(Err(TaskError::Aborted)))
            .boxed()
            .shared();
        (tx, Self { inner })
    }

    /// Completion that is already resolved with `outcome`.
    pub(crate) fn ready(outcome: Outcome<T>) -> Self {
        Self {
            inner: futures::future::ready(outcome).boxed().shared(),
        }
    }

    /// Returns the outcome if the worker has already finished, without waiting.
    ///
    /// Polls the shared future once, so an outcome delivered while nobody was awaiting
    /// is observed here.
    pub fn peek(&self) -> Option<&Outcome<T>> {
        if self.inner.peek().is_none() {
            let _ = self.inner.clone().now_or_never();
        }
        self.inner.peek()
    }

    /// Returns `true` if the worker has already finished.
    pub fn is_finished(&self) -> bool {
        self.peek().is_some()
    }

    /// Waits until `deadline`; `None` means the worker was still executing.
    pub async fn wait_until(&self, deadline: Instant) -> Option<Outcome<T>> {
        time::timeout_at(deadline, self.clone()).await.ok()
    }

    /// Waits for at most `timeout`; `None` means the worker was still executing.
    pub async fn wait_for(&self, timeout: Duration) -> Option<Outcome<T>> {
        self.wait_until(Instant::now() + timeout).await
    }

    /// Returns `true` if both handles belong to the same activation.
    pub fn same_activation(&self, other: &Self) -> bool {
        self.inner.ptr_eq(&other.inner)
    }
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Future for Completion<T>
where
    T: Clone,
{
    type Output = Outcome<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ack_resolves_start_future() {
        let (ack, start) = InitAck::channel();
        ack.succeed();
        assert!(start.await);

        let (ack, start) = InitAck::channel();
        ack.fail();
        assert_eq!(
            start.wait_for(Duration::from_millis(50)).await,
            Err(Failure::StartRejected)
        );
    }

    #[tokio::test]
    async fn dropped_ack_reports_timeout() {
        let (ack, start) = InitAck::channel();
        drop(ack);
        assert_eq!(
            start.wait_for(Duration::from_millis(20)).await,
            Err(Failure::StartTimeout)
        );
    }

    #[tokio::test]
    async fn completion_clones_share_outcome() {
        let (tx, done) = Completion::<u32>::channel();
        let other = done.clone();
        assert!(!done.is_finished());
        assert!(done.same_activation(&other));

        tx.send(Ok(7)).unwrap();
        assert_eq!(done.clone().await, Ok(7));
        assert_eq!(other.await, Ok(7));
        assert_eq!(done.peek(), Some(&Ok(7)));
    }

    #[tokio::test]
    async fn outcome_is_visible_without_awaiting() {
        let (tx, done) = Completion::<u32>::channel();
        tx.send(Ok(3)).unwrap();

        assert!(done.is_finished());
        assert_eq!(done.clone().peek(), Some(&Ok(3)));
        assert_eq!(done.peek(), Some(&Ok(3)));
    }

    #[tokio::test]
    async fn dropped_sender_means_aborted() {
        let (tx, done) = Completion::<()>::channel();
        drop(tx);
        assert_eq!(done.await, Err(TaskError::Aborted));
    }

    #[tokio::test]
    async fn completion_wait_is_bounded() {
        let (_tx, done) = Completion::<()>::channel();
        assert!(done.wait_for(Duration::from_millis(10)).await.is_none());
    }
}
