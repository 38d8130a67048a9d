//! Input Event Router
//!
//! One router task per display session, running for the session's
//! lifetime. It owns the focus slot and the clickable-region registry;
//! registrations arrive over a control channel so no state is shared.
//!
//! - Keyboard events go to whichever widget last requested focus. A new
//!   focus request replaces the holder wholesale; the previous holder's
//!   channel is dropped, which it observes as revocation.
//! - Mouse events are matched against the registered clickable regions
//!   (absolute screen coordinates, fixed at registration time) and
//!   delivered with coordinates translated into the region's local
//!   frame. Overlap resolution is governed by [`MousePolicy`].
//! - A fatal backend condition terminates the router; the session
//!   surfaces it to the application as a terminal error event.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, trace};

use crate::backend::{InputSource, MouseEvent, RawEvent};
use crate::fabric::CompletionGuard;

/// How a mouse event that falls within several registered clickable
/// regions is delivered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MousePolicy {
    /// Deliver exclusively to the most recently registered containing
    /// region. Registration order follows child-registration order, so
    /// the widget painted on top receives the click.
    #[default]
    TopmostWins,
    /// Deliver to every containing region.
    Broadcast,
}

/// A clickable region in absolute screen coordinates.
#[derive(Debug)]
struct Clickable {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    tx: mpsc::Sender<RawEvent>,
}

impl Clickable {
    fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.w && y >= self.y && y < self.y + self.h
    }
}

/// Control messages from the session to the router.
#[derive(Debug)]
pub(crate) enum RouterCommand {
    /// Register interest in mouse events within a region.
    RegisterClickable {
        /// Left column, absolute.
        x: i32,
        /// Top row, absolute.
        y: i32,
        /// Width.
        w: i32,
        /// Height.
        h: i32,
        /// Delivery channel for translated events.
        tx: mpsc::Sender<RawEvent>,
    },
    /// Become the keyboard focus holder, revoking the previous one.
    RequestFocus {
        /// Delivery channel for key events.
        tx: mpsc::Sender<RawEvent>,
    },
}

/// The session's handle to its router task.
#[derive(Clone, Debug)]
pub(crate) struct RouterHandle {
    tx: mpsc::Sender<RouterCommand>,
}

impl RouterHandle {
    pub(crate) async fn register_clickable(
        &self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        tx: mpsc::Sender<RawEvent>,
    ) {
        let _ = self
            .tx
            .send(RouterCommand::RegisterClickable { x, y, w, h, tx })
            .await;
    }

    pub(crate) async fn request_focus(&self, tx: mpsc::Sender<RawEvent>) {
        let _ = self.tx.send(RouterCommand::RequestFocus { tx }).await;
    }
}

/// The router task state.
pub(crate) struct Router<I: InputSource> {
    input: I,
    commands: mpsc::Receiver<RouterCommand>,
    clickables: Vec<Clickable>,
    focus: Option<mpsc::Sender<RawEvent>>,
    fatal_tx: mpsc::Sender<String>,
    shutdown: watch::Receiver<bool>,
    policy: MousePolicy,
}

impl<I: InputSource> Router<I> {
    /// Spawn the router task. Returns the control handle and the channel
    /// on which a fatal backend condition is reported.
    pub(crate) fn spawn(
        input: I,
        policy: MousePolicy,
        shutdown: watch::Receiver<bool>,
        guard: CompletionGuard,
    ) -> (RouterHandle, mpsc::Receiver<String>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (fatal_tx, fatal_rx) = mpsc::channel(1);

        let router = Self {
            input,
            commands: cmd_rx,
            clickables: Vec::new(),
            focus: None,
            fatal_tx,
            shutdown,
            policy,
        };
        tokio::spawn(router.run(guard));

        (RouterHandle { tx: cmd_tx }, fatal_rx)
    }

    async fn run(mut self, _guard: CompletionGuard) {
        loop {
            if *self.shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;

                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }

                cmd = self.commands.recv() => {
                    // A closed command channel means the session dropped
                    // its handle; input keeps flowing regardless.
                    if let Some(cmd) = cmd {
                        self.apply(cmd);
                    }
                }

                ev = self.input.next_event() => {
                    if !self.dispatch(ev).await {
                        break;
                    }
                }
            }
        }
        debug!("input router exited");
    }

    fn apply(&mut self, cmd: RouterCommand) {
        match cmd {
            RouterCommand::RegisterClickable { x, y, w, h, tx } => {
                trace!(x, y, w, h, "clickable region registered");
                self.clickables.push(Clickable { x, y, w, h, tx });
            }
            RouterCommand::RequestFocus { tx } => {
                // Dropping the previous sender closes that holder's
                // channel, which it observes as revocation.
                if self.focus.is_some() {
                    trace!("keyboard focus reassigned");
                }
                self.focus = Some(tx);
            }
        }
    }

    /// Handle one raw event. Returns `false` when the router must stop.
    async fn dispatch(&mut self, ev: RawEvent) -> bool {
        match ev {
            RawEvent::Key(_) => {
                if let Some(tx) = &self.focus {
                    if tx.send(ev).await.is_err() {
                        // Holder went away without a new focus request.
                        self.focus = None;
                    }
                }
                true
            }
            RawEvent::Mouse(m) => {
                self.route_mouse(m).await;
                true
            }
            RawEvent::Resize { width, height } => {
                trace!(width, height, "resize event ignored by router");
                true
            }
            RawEvent::Fatal(msg) => {
                error!(error = %msg, "fatal backend condition, terminating router");
                let _ = self.fatal_tx.send(msg).await;
                false
            }
        }
    }

    async fn route_mouse(&mut self, m: MouseEvent) {
        // Walk most recent registrations first so topmost-wins picks the
        // widget painted on top.
        let hits: Vec<usize> = self
            .clickables
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, r)| r.contains(m.x, m.y))
            .map(|(i, _)| i)
            .collect();

        let mut delivered_any = false;
        let mut dead: Vec<usize> = Vec::new();
        for i in hits {
            let r = &self.clickables[i];
            let local = RawEvent::Mouse(MouseEvent {
                x: m.x - r.x,
                y: m.y - r.y,
                button: m.button,
            });
            if r.tx.send(local).await.is_err() {
                dead.push(i);
                continue;
            }
            delivered_any = true;
            if self.policy == MousePolicy::TopmostWins {
                break;
            }
        }

        // Indices were collected in descending order, so removal is
        // stable.
        for i in dead {
            self.clickables.remove(i);
        }
        if !delivered_any {
            trace!(m.x, m.y, "mouse event matched no live clickable region");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::ScriptedInput;
    use crate::backend::Key;
    use crate::fabric::Completion;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn recv_soon(rx: &mut mpsc::Receiver<RawEvent>) -> RawEvent {
        timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed")
    }

    struct Rig {
        handle: RouterHandle,
        fatal_rx: mpsc::Receiver<String>,
        feed: mpsc::Sender<RawEvent>,
        _shutdown: watch::Sender<bool>,
    }

    fn rig(policy: MousePolicy) -> Rig {
        let (input, feed) = ScriptedInput::new();
        let (sd_tx, sd_rx) = watch::channel(false);
        let completion = Completion::new();
        let (handle, fatal_rx) = Router::spawn(input, policy, sd_rx, completion.guard());
        Rig {
            handle,
            fatal_rx,
            feed,
            _shutdown: sd_tx,
        }
    }

    #[tokio::test]
    async fn test_mouse_translated_into_local_frame() {
        let rig = rig(MousePolicy::TopmostWins);
        let (tx, mut rx) = mpsc::channel(4);
        rig.handle.register_clickable(10, 5, 8, 3, tx).await;

        rig.feed.send(RawEvent::left_click(12, 6)).await.unwrap();
        let got = recv_soon(&mut rx).await;
        match got {
            RawEvent::Mouse(m) => {
                assert_eq!((m.x, m.y), (2, 1));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_miss_is_not_delivered() {
        let rig = rig(MousePolicy::TopmostWins);
        let (tx, mut rx) = mpsc::channel(4);
        rig.handle.register_clickable(10, 5, 8, 3, tx).await;

        rig.feed.send(RawEvent::left_click(0, 0)).await.unwrap();
        rig.feed.send(RawEvent::left_click(10, 5)).await.unwrap();

        // Only the hit arrives; the miss was silently discarded.
        let got = recv_soon(&mut rx).await;
        assert_eq!(got, RawEvent::left_click(0, 0));
    }

    #[tokio::test]
    async fn test_overlap_topmost_wins() {
        let rig = rig(MousePolicy::TopmostWins);
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        // b registered after a: b is on top.
        rig.handle.register_clickable(0, 0, 10, 10, tx_a).await;
        rig.handle.register_clickable(5, 5, 10, 10, tx_b).await;

        rig.feed.send(RawEvent::left_click(6, 6)).await.unwrap();
        let got = recv_soon(&mut rx_b).await;
        assert_eq!(got, RawEvent::left_click(1, 1));

        // The older region never hears about it; the next event proves
        // the channel stayed silent.
        rig.feed.send(RawEvent::left_click(1, 1)).await.unwrap();
        let got = recv_soon(&mut rx_a).await;
        assert_eq!(got, RawEvent::left_click(1, 1));
    }

    #[tokio::test]
    async fn test_overlap_broadcast_delivers_to_all() {
        let rig = rig(MousePolicy::Broadcast);
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        rig.handle.register_clickable(0, 0, 10, 10, tx_a).await;
        rig.handle.register_clickable(5, 5, 10, 10, tx_b).await;

        rig.feed.send(RawEvent::left_click(6, 6)).await.unwrap();
        assert_eq!(recv_soon(&mut rx_b).await, RawEvent::left_click(1, 1));
        assert_eq!(recv_soon(&mut rx_a).await, RawEvent::left_click(6, 6));
    }

    #[tokio::test]
    async fn test_focus_follows_latest_request_and_revokes() {
        let rig = rig(MousePolicy::TopmostWins);
        let (tx_a, mut rx_a) = mpsc::channel(4);
        rig.handle.request_focus(tx_a).await;

        rig.feed.send(RawEvent::key(Key::Char('a'))).await.unwrap();
        assert_eq!(recv_soon(&mut rx_a).await, RawEvent::key(Key::Char('a')));

        let (tx_b, mut rx_b) = mpsc::channel(4);
        rig.handle.request_focus(tx_b).await;

        rig.feed.send(RawEvent::key(Key::Char('b'))).await.unwrap();
        assert_eq!(recv_soon(&mut rx_b).await, RawEvent::key(Key::Char('b')));

        // The first holder's channel was closed: revocation signal.
        assert!(timeout(Duration::from_millis(500), async {
            loop {
                if rx_a.recv().await.is_none() {
                    break;
                }
            }
        })
        .await
        .is_ok());
    }

    #[tokio::test]
    async fn test_fatal_terminates_router() {
        let mut rig = rig(MousePolicy::TopmostWins);
        rig.feed
            .send(RawEvent::Fatal("terminal went away".to_string()))
            .await
            .unwrap();

        let msg = timeout(Duration::from_millis(500), rig.fatal_rx.recv())
            .await
            .expect("timed out")
            .expect("fatal channel closed");
        assert_eq!(msg, "terminal went away");
    }
}
