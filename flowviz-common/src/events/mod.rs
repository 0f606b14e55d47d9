//! Event types for the flowviz event system
//!
//! Provides shared event definitions and the EventBus that carries
//! display-service notifications to rendering backends.

// Sub-modules (supporting types)
mod layout_types;
mod sequencer_types;

pub use layout_types::{DiagramStatus, LayoutSummary};
pub use sequencer_types::{HighlightCursor, SequencerState, Side};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Flowviz event types
///
/// Events are broadcast via EventBus and can be serialized for delivery to
/// a browser or any other rendering backend. Every event names the display
/// instance it came from so several diagrams can share one bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FlowEvent {
    /// Highlight cursor moved, was cleared, or was frozen by a pause
    ///
    /// Triggers:
    /// - Renderer: dim everything except the focused node and its edges
    /// - Renderer: restore the full view when `cursor` is None
    CursorChanged {
        /// Display instance
        display_id: Uuid,
        /// New cursor (None = full, unhighlighted view)
        cursor: Option<HighlightCursor>,
        /// Sequencer state after the change
        state: SequencerState,
        /// When the cursor changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Layout recomputed (field pair, record set, filter or viewport changed)
    ///
    /// Triggers:
    /// - Renderer: fetch a fresh snapshot and animate to it
    /// - Renderer: show "insufficient data" when status is not Ready
    LayoutChanged {
        /// Display instance
        display_id: Uuid,
        /// What was laid out
        summary: LayoutSummary,
        /// When the layout was computed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Sequencer moved between states
    SequencerStateChanged {
        /// Display instance
        display_id: Uuid,
        /// State before change
        old_state: SequencerState,
        /// State after change
        new_state: SequencerState,
        /// When state changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Display service shut down; no further events follow for this id
    DisplayStopped {
        /// Display instance
        display_id: Uuid,
        /// When the service stopped
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl FlowEvent {
    /// Display instance that emitted the event
    pub fn display_id(&self) -> Uuid {
        match self {
            FlowEvent::CursorChanged { display_id, .. }
            | FlowEvent::LayoutChanged { display_id, .. }
            | FlowEvent::SequencerStateChanged { display_id, .. }
            | FlowEvent::DisplayStopped { display_id, .. } => *display_id,
        }
    }

    /// Short event name for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            FlowEvent::CursorChanged { .. } => "CursorChanged",
            FlowEvent::LayoutChanged { .. } => "LayoutChanged",
            FlowEvent::SequencerStateChanged { .. } => "SequencerStateChanged",
            FlowEvent::DisplayStopped { .. } => "DisplayStopped",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block the display task)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use flowviz_common::events::{EventBus, FlowEvent};
/// use uuid::Uuid;
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(FlowEvent::DisplayStopped {
///     display_id: Uuid::new_v4(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FlowEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: FlowEvent,
    ) -> Result<usize, broadcast::error::SendError<FlowEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: FlowEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
