//! Display service
//!
//! Runs a `FlowDisplay` inside one tokio task. Commands from the
//! `DisplayHandle` and dwell ticks from the `DwellScheduler` are handled
//! strictly one at a time, so the cursor has a single writer and the
//! scheduler holds at most one live timer. Every observable change is
//! published on the shared `EventBus`.

use super::{DisplaySnapshot, FlowDisplay};
use crate::error::{Error, Result};
use crate::record::ResponseRecord;
use crate::sequencer::{DwellScheduler, DwellTick, Step};
use flowviz_common::events::{EventBus, FlowEvent, HighlightCursor, SequencerState};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Commands accepted by the display task
#[derive(Debug)]
pub enum DisplayCommand {
    /// User hover started
    Pause,
    /// User hover ended
    Resume,
    SetFieldPair {
        source: String,
        target: String,
        reply: oneshot::Sender<Result<()>>,
    },
    SetIncludeTestData(bool),
    SetAutoplay(bool),
    SetRecords(Vec<ResponseRecord>),
    Resize {
        width: f64,
        height: f64,
    },
    Snapshot(oneshot::Sender<DisplaySnapshot>),
    /// Cancel the timer, emit `DisplayStopped`, then acknowledge
    Shutdown(oneshot::Sender<()>),
}

/// Cheap, cloneable handle to a running display task
#[derive(Debug, Clone)]
pub struct DisplayHandle {
    display_id: Uuid,
    tx: mpsc::UnboundedSender<DisplayCommand>,
}

impl DisplayHandle {
    pub fn display_id(&self) -> Uuid {
        self.display_id
    }

    pub fn pause(&self) -> Result<()> {
        self.send(DisplayCommand::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(DisplayCommand::Resume)
    }

    /// Switch field pair; rejected pairs leave the display unchanged
    pub async fn set_field_pair(&self, source: &str, target: &str) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(DisplayCommand::SetFieldPair {
            source: source.to_string(),
            target: target.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| Error::ServiceStopped)?
    }

    pub fn set_include_test_data(&self, include: bool) -> Result<()> {
        self.send(DisplayCommand::SetIncludeTestData(include))
    }

    pub fn set_autoplay(&self, enabled: bool) -> Result<()> {
        self.send(DisplayCommand::SetAutoplay(enabled))
    }

    pub fn set_records(&self, records: Vec<ResponseRecord>) -> Result<()> {
        self.send(DisplayCommand::SetRecords(records))
    }

    pub fn resize(&self, width: f64, height: f64) -> Result<()> {
        self.send(DisplayCommand::Resize { width, height })
    }

    pub async fn snapshot(&self) -> Result<DisplaySnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(DisplayCommand::Snapshot(reply))?;
        rx.await.map_err(|_| Error::ServiceStopped)
    }

    /// Stop the task; returns once no further events can be emitted
    pub async fn shutdown(&self) -> Result<()> {
        let (ack, rx) = oneshot::channel();
        self.send(DisplayCommand::Shutdown(ack))?;
        rx.await.map_err(|_| Error::ServiceStopped)
    }

    fn send(&self, command: DisplayCommand) -> Result<()> {
        self.tx.send(command).map_err(|_| Error::ServiceStopped)
    }
}

/// State observed before a change, compared after it
struct Observed {
    state: SequencerState,
    cursor: Option<HighlightCursor>,
    layout_version: u64,
}

impl Observed {
    fn capture(display: &FlowDisplay) -> Self {
        Self {
            state: display.state(),
            cursor: display.cursor(),
            layout_version: display.layout_version(),
        }
    }
}

/// Display task: one `FlowDisplay`, one timer, one event bus
pub struct DisplayService {
    display: FlowDisplay,
    bus: EventBus,
    scheduler: DwellScheduler,
}

impl DisplayService {
    /// Spawn the display task and start autoplay
    ///
    /// Emits an initial `LayoutChanged` before the first focus change.
    pub fn spawn(display: FlowDisplay, bus: EventBus) -> DisplayHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        let display_id = display.id();

        let service = Self {
            display,
            bus,
            scheduler: DwellScheduler::new(tick_tx),
        };
        tokio::spawn(service.run(rx, tick_rx));

        info!("Display {} started", display_id);
        DisplayHandle { display_id, tx }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<DisplayCommand>,
        mut ticks: mpsc::UnboundedReceiver<DwellTick>,
    ) {
        self.emit_layout();
        let before = Observed::capture(&self.display);
        let step = self.display.start();
        self.apply(before, step);

        let mut shutdown_ack = None;
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(DisplayCommand::Shutdown(ack)) => {
                        shutdown_ack = Some(ack);
                        break;
                    }
                    Some(command) => self.handle(command),
                    None => {
                        debug!("All handles for display {} dropped", self.display.id());
                        break;
                    }
                },
                Some(tick) = ticks.recv() => {
                    if self.scheduler.accept(tick) {
                        let before = Observed::capture(&self.display);
                        match self.display.on_dwell_expired() {
                            Ok(step) => self.apply(before, step),
                            Err(e) => error!("Dwell step failed: {}", e),
                        }
                    }
                }
            }
        }

        self.scheduler.cancel();
        self.bus.emit_lossy(FlowEvent::DisplayStopped {
            display_id: self.display.id(),
            timestamp: chrono::Utc::now(),
        });
        info!("Display {} stopped", self.display.id());
        if let Some(ack) = shutdown_ack {
            let _ = ack.send(());
        }
    }

    fn handle(&mut self, command: DisplayCommand) {
        let before = Observed::capture(&self.display);
        let step = match command {
            DisplayCommand::Pause => Ok(self.display.pause()),
            DisplayCommand::Resume => Ok(self.display.resume()),
            DisplayCommand::SetFieldPair {
                source,
                target,
                reply,
            } => match self.display.set_field_pair(&source, &target) {
                Ok(step) => {
                    let _ = reply.send(Ok(()));
                    Ok(step)
                }
                Err(e) => {
                    warn!("Rejected field pair {} → {}: {}", source, target, e);
                    let _ = reply.send(Err(e));
                    return;
                }
            },
            DisplayCommand::SetIncludeTestData(include) => self.display.set_include_test_data(include),
            DisplayCommand::SetAutoplay(enabled) => Ok(self.display.set_autoplay(enabled)),
            DisplayCommand::SetRecords(records) => self.display.set_records(records),
            DisplayCommand::Resize { width, height } => self.display.resize(width, height),
            DisplayCommand::Snapshot(reply) => {
                let _ = reply.send(self.display.snapshot());
                return;
            }
            DisplayCommand::Shutdown(_) => return,
        };

        match step {
            Ok(step) => self.apply(before, step),
            Err(e) => error!("Display command failed: {}", e),
        }
    }

    /// Publish what changed and bring the timer in line with `step`
    fn apply(&mut self, before: Observed, step: Step) {
        let after = Observed::capture(&self.display);
        let display_id = self.display.id();

        if after.layout_version != before.layout_version {
            self.emit_layout();
        }
        if after.state != before.state {
            debug!("Display {} sequencer: {} → {}", display_id, before.state, after.state);
            self.bus.emit_lossy(FlowEvent::SequencerStateChanged {
                display_id,
                old_state: before.state,
                new_state: after.state,
                timestamp: chrono::Utc::now(),
            });
        }
        let moved = after.cursor != before.cursor || after.state != before.state;
        if moved {
            self.bus.emit_lossy(FlowEvent::CursorChanged {
                display_id,
                cursor: step.focus.clone(),
                state: after.state,
                timestamp: chrono::Utc::now(),
            });
        }

        match step.dwell {
            None => self.scheduler.cancel(),
            Some(dwell) if moved || step.pair_changed || !self.scheduler.is_pending() => {
                self.scheduler.schedule(dwell);
            }
            Some(_) => {}
        }
    }

    fn emit_layout(&self) {
        self.bus.emit_lossy(FlowEvent::LayoutChanged {
            display_id: self.display.id(),
            summary: self.display.summary(),
            timestamp: chrono::Utc::now(),
        });
    }
}
