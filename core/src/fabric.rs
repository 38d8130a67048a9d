//! The Communication Fabric
//!
//! Every managed object is connected to its parent by a pair of crossed
//! single-directional channels: what one endpoint calls inbound, the
//! other calls outbound. A managed object's link list reserves index 0
//! for the link to its parent; indices ≥ 1 are links to its own
//! children, in child-registration order.
//!
//! Each handler task waits on all of its inbound links at once through a
//! [`Multiplexer`]: a registry mapping link index to channel with a
//! single primitive that blocks until any registered channel is ready
//! and returns `(index, event)`. New links are registered at runtime
//! without disturbing in-flight waits, because the registration channel
//! participates in the same select. There is no fairness guarantee
//! across simultaneously-ready links.
//!
//! Handlers observe a cooperative shutdown signal at every suspension
//! point, and hold a [`CompletionGuard`] so the session can wait for a
//! whole subtree of handlers to exit at teardown.

use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{StreamExt, StreamMap};

use crate::event::Event;

/// Index of a link in a managed object's link list. Index 0 is the link
/// to the parent.
pub type LinkIndex = usize;

/// One endpoint of a crossed channel pair.
#[derive(Debug)]
pub struct CommLink {
    /// Sends toward the other endpoint.
    pub tx: mpsc::Sender<Event>,
    /// Receives from the other endpoint.
    pub rx: mpsc::Receiver<Event>,
}

impl CommLink {
    /// Allocate a crossed channel pair: the first endpoint's outbound is
    /// the second endpoint's inbound and vice versa.
    #[must_use]
    pub fn pair(capacity: usize) -> (CommLink, CommLink) {
        let (a_tx, a_rx) = mpsc::channel(capacity);
        let (b_tx, b_rx) = mpsc::channel(capacity);
        (
            CommLink { tx: a_tx, rx: b_rx },
            CommLink { tx: b_tx, rx: a_rx },
        )
    }

    /// Split the endpoint into its halves.
    #[must_use]
    pub fn into_parts(self) -> (mpsc::Sender<Event>, mpsc::Receiver<Event>) {
        (self.tx, self.rx)
    }
}

/// Registers new inbound links with a running [`Multiplexer`].
#[derive(Clone, Debug)]
pub struct MuxHandle {
    reg_tx: mpsc::UnboundedSender<(LinkIndex, mpsc::Receiver<Event>)>,
}

impl MuxHandle {
    /// Register a new inbound link. Safe to call while the owning
    /// handler is blocked in [`Multiplexer::recv`].
    pub fn register(&self, index: LinkIndex, rx: mpsc::Receiver<Event>) {
        // The receiver side only disappears when the handler exited; a
        // registration after that point has nobody left to deliver to.
        let _ = self.reg_tx.send((index, rx));
    }
}

/// Fan-in over a runtime-variable set of inbound links.
#[derive(Debug)]
pub struct Multiplexer {
    sources: StreamMap<LinkIndex, ReceiverStream<Event>>,
    registrations: mpsc::UnboundedReceiver<(LinkIndex, mpsc::Receiver<Event>)>,
    shutdown: watch::Receiver<bool>,
}

impl Multiplexer {
    /// Create a multiplexer observing the given shutdown signal, and the
    /// handle used to register links with it at runtime.
    #[must_use]
    pub fn new(shutdown: watch::Receiver<bool>) -> (Self, MuxHandle) {
        let (reg_tx, registrations) = mpsc::unbounded_channel();
        (
            Self {
                sources: StreamMap::new(),
                registrations,
                shutdown,
            },
            MuxHandle { reg_tx },
        )
    }

    /// Register a link directly, before the owning handler starts.
    pub fn register(&mut self, index: LinkIndex, rx: mpsc::Receiver<Event>) {
        self.sources.insert(index, ReceiverStream::new(rx));
    }

    /// Wait until any registered link is ready and return which link
    /// produced the event.
    ///
    /// Resolves to `None` once shutdown is requested. If several links
    /// are ready simultaneously, which one is serviced first is
    /// unspecified.
    pub async fn recv(&mut self) -> Option<(LinkIndex, Event)> {
        loop {
            if *self.shutdown.borrow() {
                return None;
            }

            // An empty StreamMap yields immediately; only poll it while
            // at least one link is registered.
            if self.sources.is_empty() {
                tokio::select! {
                    changed = self.shutdown.changed() => {
                        if changed.is_err() || *self.shutdown.borrow() {
                            return None;
                        }
                    }
                    reg = self.registrations.recv() => {
                        if let Some((index, rx)) = reg {
                            self.sources.insert(index, ReceiverStream::new(rx));
                        }
                    }
                }
                continue;
            }

            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        return None;
                    }
                }
                reg = self.registrations.recv() => {
                    if let Some((index, rx)) = reg {
                        self.sources.insert(index, ReceiverStream::new(rx));
                    }
                }
                next = self.sources.next() => {
                    // A `None` here means every registered sender
                    // dropped; fall back to waiting for registrations
                    // or shutdown.
                    if let Some((index, event)) = next {
                        return Some((index, event));
                    }
                }
            }
        }
    }
}

/// Counts live handler tasks so teardown can wait for all of them.
///
/// Every spawned handler holds a [`CompletionGuard`]; when the last
/// guard drops, [`Completion::wait`] resolves.
#[derive(Debug)]
pub struct Completion {
    tx: mpsc::Sender<()>,
    rx: mpsc::Receiver<()>,
}

/// Held by a handler task for its lifetime.
#[derive(Clone, Debug)]
pub struct CompletionGuard {
    _tx: mpsc::Sender<()>,
}

impl Completion {
    /// A completion counter with no outstanding guards.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self { tx, rx }
    }

    /// Issue a guard for a handler about to be spawned.
    #[must_use]
    pub fn guard(&self) -> CompletionGuard {
        CompletionGuard {
            _tx: self.tx.clone(),
        }
    }

    /// Wait until every issued guard has been dropped.
    pub async fn wait(self) {
        let Self { tx, mut rx } = self;
        drop(tx);
        // The channel never carries data; recv resolves with None once
        // the last guard's sender is gone.
        while rx.recv().await.is_some() {}
    }
}

impl Default for Completion {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, EventKind};
    use crate::fsm::RetCode;
    use std::time::Duration;

    #[tokio::test]
    async fn test_link_pair_is_crossed() {
        let (parent, child) = CommLink::pair(4);
        let (parent_tx, mut parent_rx) = parent.into_parts();
        let (child_tx, mut child_rx) = child.into_parts();

        // What the parent sends arrives on the child's inbound...
        parent_tx
            .send(Event::output(RetCode::Ok).with_ints([42]))
            .await
            .unwrap();
        let got = child_rx.recv().await.unwrap();
        assert_eq!(got.outcome.payload.ints(), Some(&[42][..]));

        // ...and vice versa, unchanged.
        child_tx
            .send(Event::new(EventKind::Error).with_strs(["boom"]))
            .await
            .unwrap();
        let got = parent_rx.recv().await.unwrap();
        assert_eq!(got.kind, EventKind::Error);
        assert_eq!(got.outcome.payload.strs().unwrap(), ["boom"]);
    }

    #[tokio::test]
    async fn test_mux_reports_which_link_fired() {
        let (_sd_tx, sd_rx) = watch::channel(false);
        let (mut mux, _handle) = Multiplexer::new(sd_rx);

        let (tx0, rx0) = mpsc::channel(4);
        let (tx1, rx1) = mpsc::channel(4);
        mux.register(0, rx0);
        mux.register(1, rx1);

        tx1.send(Event::output(RetCode::Repeat)).await.unwrap();
        let (idx, ev) = mux.recv().await.unwrap();
        assert_eq!(idx, 1);
        assert_eq!(ev.rc(), RetCode::Repeat);

        tx0.send(Event::output(RetCode::Fail)).await.unwrap();
        let (idx, ev) = mux.recv().await.unwrap();
        assert_eq!(idx, 0);
        assert_eq!(ev.rc(), RetCode::Fail);
    }

    #[tokio::test]
    async fn test_mux_pending_until_a_link_is_ready() {
        let (_sd_tx, sd_rx) = watch::channel(false);
        let (mut mux, _handle) = Multiplexer::new(sd_rx);
        let (tx0, rx0) = mpsc::channel(4);
        mux.register(0, rx0);

        let mut recv = tokio_test::task::spawn(mux.recv());
        tokio_test::assert_pending!(recv.poll());

        tx0.send(Event::output(RetCode::Ok)).await.unwrap();
        let (idx, ev) = recv.await.unwrap();
        assert_eq!(idx, 0);
        assert_eq!(ev.rc(), RetCode::Ok);
    }

    #[tokio::test]
    async fn test_mux_registration_during_blocked_wait() {
        let (_sd_tx, sd_rx) = watch::channel(false);
        let (mut mux, handle) = Multiplexer::new(sd_rx);

        let (tx0, rx0) = mpsc::channel(4);
        mux.register(0, rx0);

        let waiter = tokio::spawn(async move { mux.recv().await });

        // Give the waiter time to block, then wire a brand-new link and
        // deliver on it.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let (tx1, rx1) = mpsc::channel(4);
        handle.register(1, rx1);
        tx1.send(Event::output(RetCode::Ok).with_ints([7]))
            .await
            .unwrap();

        let (idx, ev) = waiter.await.unwrap().unwrap();
        assert_eq!(idx, 1);
        assert_eq!(ev.outcome.payload.ints(), Some(&[7][..]));
        drop(tx0);
    }

    #[tokio::test]
    async fn test_mux_shutdown_wakes_blocked_handler() {
        let (sd_tx, sd_rx) = watch::channel(false);
        let (mut mux, _handle) = Multiplexer::new(sd_rx);
        let (_tx0, rx0) = mpsc::channel::<Event>(4);
        mux.register(0, rx0);

        let waiter = tokio::spawn(async move { mux.recv().await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        sd_tx.send(true).unwrap();
        assert!(waiter.await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_completion_waits_for_all_guards() {
        let completion = Completion::new();
        let g1 = completion.guard();
        let g2 = completion.guard();

        let t1 = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(g1);
        });
        let t2 = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            drop(g2);
        });

        completion.wait().await;
        t1.await.unwrap();
        t2.await.unwrap();
    }
}
