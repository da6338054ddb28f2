//! Render scheduling.
//!
//! Nodes never repaint themselves. When overlay state changes or an async
//! load completes they post their id here and the host drains the receiver,
//! re-rendering each node it still holds.

use async_channel::{Receiver, Sender};
use tracing::trace;

use crate::node::NodeId;

/// Stream of node ids that need a fresh render.
pub type RenderUpdates = Receiver<NodeId>;

/// Sending half of the render queue.
#[derive(Debug, Clone)]
pub struct RenderQueue {
    sender: Sender<NodeId>,
}

impl RenderQueue {
    /// Creates an unbounded queue.
    #[must_use]
    pub fn unbounded() -> (Self, RenderUpdates) {
        let (sender, receiver) = async_channel::unbounded();
        (Self { sender }, receiver)
    }

    /// Asks the host to re-render `id`.
    pub fn request(&self, id: NodeId) {
        if self.sender.try_send(id).is_err() {
            trace!(?id, "render queue closed, dropping request");
        }
    }
}
