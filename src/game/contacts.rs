//! Lock-free queue for collision-triggered effects
//!
//! Contact callbacks may fire on the physics engine's own thread. They never
//! touch the grid directly; they push a `ContactEffect` through a cloned
//! `ContactSender` and the tick thread drains everything before AI runs.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::game::constants::coordinator::CONTACT_QUEUE_CAPACITY;
use crate::game::entity::HovercraftId;
use crate::util::vec2::Vec2;

/// A deferred mutation produced by a collision
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContactEffect {
    /// Knock a hovercraft to a new ground position
    Reposition { id: HovercraftId, position: Vec2 },
    /// Hovercraft was destroyed and must leave the grid
    Destroyed { id: HovercraftId },
}

impl ContactEffect {
    #[inline]
    pub fn hovercraft(&self) -> HovercraftId {
        match *self {
            ContactEffect::Reposition { id, .. } | ContactEffect::Destroyed { id } => id,
        }
    }
}

/// Bounded multi-producer queue drained once per tick
pub struct ContactQueue {
    sender: Sender<ContactEffect>,
    receiver: Receiver<ContactEffect>,
    capacity: usize,
}

impl ContactQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Handle for a contact callback; clone freely across threads
    pub fn sender(&self) -> ContactSender {
        ContactSender {
            sender: self.sender.clone(),
        }
    }

    /// Push from the tick thread itself. Returns false when full.
    #[inline]
    pub fn try_push(&self, effect: ContactEffect) -> bool {
        self.sender.try_send(effect).is_ok()
    }

    /// Take every pending effect in arrival order
    pub fn drain(&self) -> Vec<ContactEffect> {
        self.receiver.try_iter().collect()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ContactQueue {
    fn default() -> Self {
        Self::new(CONTACT_QUEUE_CAPACITY)
    }
}

/// Clonable producer side of a [`ContactQueue`]
#[derive(Debug, Clone)]
pub struct ContactSender {
    sender: Sender<ContactEffect>,
}

impl ContactSender {
    /// Enqueue without blocking
    #[inline]
    pub fn try_send(&self, effect: ContactEffect) -> Result<(), ContactQueueError> {
        self.sender.try_send(effect).map_err(|e| match e {
            TrySendError::Full(_) => ContactQueueError::Full,
            TrySendError::Disconnected(_) => ContactQueueError::Disconnected,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContactQueueError {
    #[error("contact queue is full")]
    Full,
    /// The owning world was dropped
    #[error("contact queue disconnected")]
    Disconnected,
}
