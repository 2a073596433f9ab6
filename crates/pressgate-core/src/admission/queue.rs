use std::collections::VecDeque;
use std::time::Instant;

use pressgate_model::JobId;
use tokio::sync::oneshot;

/// One caller waiting for a slot.
///
/// The sender is the wake handle: the slot is handed over by sending on it. The
/// caller's cancellation signal stays with the caller, which removes the ticket itself.
pub(crate) struct WaitTicket {
    pub id: JobId,
    pub enqueued_at: Instant,
    notify: oneshot::Sender<()>,
}

impl WaitTicket {
    pub fn new(id: JobId) -> (Self, oneshot::Receiver<()>) {
        let (notify, rx) = oneshot::channel();
        let ticket = Self {
            id,
            enqueued_at: Instant::now(),
            notify,
        };
        (ticket, rx)
    }

    /// Wake the waiter. A waiter that is already gone is fine: its drop guard
    /// finds the ticket missing from the queue and passes the slot on.
    pub fn serve(self) {
        let _ = self.notify.send(());
    }
}

/// Bounded FIFO of waiting callers.
pub(crate) struct WaitQueue {
    capacity: usize,
    tickets: VecDeque<WaitTicket>,
}

impl WaitQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            tickets: VecDeque::new(),
        }
    }

    /// Append at the tail; returns the 0-based position, or the ticket back when full.
    pub fn enqueue(&mut self, ticket: WaitTicket) -> Result<usize, WaitTicket> {
        if self.is_full() {
            return Err(ticket);
        }
        self.tickets.push_back(ticket);
        Ok(self.tickets.len() - 1)
    }

    /// Remove and return the longest-waiting ticket.
    pub fn dequeue(&mut self) -> Option<WaitTicket> {
        self.tickets.pop_front()
    }

    /// Remove a specific ticket. `None` if it was already served or removed.
    pub fn remove(&mut self, id: JobId) -> Option<WaitTicket> {
        let idx = self.tickets.iter().position(|t| t.id == id)?;
        self.tickets.remove(idx)
    }

    pub fn position(&self, id: JobId) -> Option<usize> {
        self.tickets.iter().position(|t| t.id == id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.tickets.len() >= self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
