use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex as TokioMutex, OwnedMutexGuard};

/// The Network Stream Interface the session is generic over: a raw
/// byte-stream capability set supplied by the HTTP layer after a
/// successful Upgrade, or by an in-process test transport.
///
/// Both session flavors are built on top of this single async trait: the
/// blocking facade does not need its own stream abstraction because it
/// drives the same async core from a background-runtime thread (see
/// [`crate::blocking`]).
pub trait WsIo: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T> WsIo for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

type LockFuture<W> = Pin<Box<dyn Future<Output = OwnedMutexGuard<W>> + Send>>;

/// The write half fastwebsockets writes frames through, built around an
/// `Arc<Mutex<_>>` instead of a bare owned half so that closing the
/// session can reach the same underlying stream independently of the
/// frame writer, which buries its half with no accessor of its own.
pub(crate) struct SharedWriteHalf<W> {
    inner: Arc<TokioMutex<W>>,
    guard: Option<OwnedMutexGuard<W>>,
    lock_fut: Option<LockFuture<W>>,
}

impl<W> SharedWriteHalf<W> {
    pub(crate) fn new(inner: Arc<TokioMutex<W>>) -> Self {
        SharedWriteHalf { inner, guard: None, lock_fut: None }
    }
}

impl<W: Send + 'static> SharedWriteHalf<W> {
    fn poll_acquire(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        if self.guard.is_some() {
            return Poll::Ready(());
        }
        let inner = self.inner.clone();
        let fut = self.lock_fut.get_or_insert_with(|| Box::pin(async move { inner.lock_owned().await }));
        match fut.as_mut().poll(cx) {
            Poll::Ready(guard) => {
                self.guard = Some(guard);
                self.lock_fut = None;
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<W: AsyncWrite + Unpin + Send + 'static> AsyncWrite for SharedWriteHalf<W> {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.poll_acquire(cx).is_pending() {
            return Poll::Pending;
        }
        let guard = this.guard.as_mut().expect("guard populated by poll_acquire");
        let res = Pin::new(&mut **guard).poll_write(cx, buf);
        if res.is_ready() {
            this.guard = None;
        }
        res
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.poll_acquire(cx).is_pending() {
            return Poll::Pending;
        }
        let guard = this.guard.as_mut().expect("guard populated by poll_acquire");
        let res = Pin::new(&mut **guard).poll_flush(cx);
        if res.is_ready() {
            this.guard = None;
        }
        res
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.poll_acquire(cx).is_pending() {
            return Poll::Pending;
        }
        let guard = this.guard.as_mut().expect("guard populated by poll_acquire");
        let res = Pin::new(&mut **guard).poll_shutdown(cx);
        if res.is_ready() {
            this.guard = None;
        }
        res
    }
}
