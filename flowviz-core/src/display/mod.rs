//! Display model
//!
//! `FlowDisplay` ties the pipeline together for one diagram instance:
//! records → aggregate → node order → linear and radial frames, plus the
//! highlight sequencer. It is synchronous and clock-free; `service` wraps
//! it in a tokio task that owns the dwell timer and publishes events.

mod service;

pub use service::{DisplayCommand, DisplayHandle, DisplayService};

use crate::aggregate::{aggregate, FieldPair, FlowGraph};
use crate::catalog::FieldCatalog;
use crate::error::Result;
use crate::layout::{LinearFrame, LinearLayout, NodeOrder, RadialFrame, RadialLayout, VisualOrder};
use crate::record::ResponseRecord;
use crate::sequencer::{DwellSchedule, HighlightSequencer, Step};
use crate::theme::{ConfiguredTheme, NodeColors, ThemeProvider};
use flowviz_common::config::{DisplaySettings, TomlConfig};
use flowviz_common::events::{DiagramStatus, HighlightCursor, LayoutSummary, SequencerState};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Everything a renderer needs to draw the current view
#[derive(Debug, Clone, Serialize)]
pub struct DisplaySnapshot {
    pub display_id: Uuid,
    pub graph: FlowGraph,
    pub linear: LinearFrame,
    pub radial: RadialFrame,
    pub cursor: Option<HighlightCursor>,
    pub state: SequencerState,
    pub status: DiagramStatus,
    pub layout_version: u64,
}

/// Synchronous model of one diagram
pub struct FlowDisplay {
    id: Uuid,
    catalog: Arc<FieldCatalog>,
    theme: Arc<dyn ThemeProvider>,
    settings: DisplaySettings,
    linear: LinearLayout,
    radial: RadialLayout,
    records: Vec<ResponseRecord>,
    graph: FlowGraph,
    order: NodeOrder,
    visual_order: VisualOrder,
    linear_frame: LinearFrame,
    radial_frame: RadialFrame,
    sequencer: HighlightSequencer,
    layout_version: u64,
}

impl FlowDisplay {
    /// Build a display from a loaded config
    ///
    /// Uses the config's field overrides (or the survey catalog) and its
    /// color tables. The initial pair comes from `[display]`; a
    /// self-referential pair is corrected to the first other field.
    pub fn from_config(config: &TomlConfig, records: Vec<ResponseRecord>) -> Result<Self> {
        let catalog = Arc::new(FieldCatalog::from_config(config)?);
        let theme: Arc<dyn ThemeProvider> = Arc::new(ConfiguredTheme::new(config.theme.clone()));
        Self::new(config, catalog, theme, records)
    }

    pub fn new(
        config: &TomlConfig,
        catalog: Arc<FieldCatalog>,
        theme: Arc<dyn ThemeProvider>,
        records: Vec<ResponseRecord>,
    ) -> Result<Self> {
        let settings = config.display.clone();
        let pair = initial_pair(&catalog, &settings)?;
        let rotation: Vec<String> = catalog.names().map(str::to_string).collect();
        let sequencer = HighlightSequencer::new(
            rotation,
            pair.clone(),
            DwellSchedule::from_speed(settings.autoplay_speed()),
            settings.autoplay,
        );

        let mut display = Self {
            id: Uuid::new_v4(),
            catalog,
            theme,
            settings,
            linear: LinearLayout::new(config.linear.clone()),
            radial: RadialLayout::new(config.radial.clone()),
            records,
            graph: FlowGraph::empty(pair),
            order: NodeOrder {
                source: Vec::new(),
                target: Vec::new(),
            },
            visual_order: VisualOrder::new(),
            linear_frame: LinearFrame::default(),
            radial_frame: RadialFrame::default(),
            sequencer,
            layout_version: 0,
        };
        display.relayout()?;
        display.graph.quality.log_summary();
        Ok(display)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &DisplaySettings {
        &self.settings
    }

    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    pub fn linear_frame(&self) -> &LinearFrame {
        &self.linear_frame
    }

    pub fn radial_frame(&self) -> &RadialFrame {
        &self.radial_frame
    }

    pub fn field_pair(&self) -> &FieldPair {
        self.sequencer.field_pair()
    }

    pub fn state(&self) -> SequencerState {
        self.sequencer.state()
    }

    pub fn cursor(&self) -> Option<HighlightCursor> {
        self.sequencer.cursor()
    }

    pub fn layout_version(&self) -> u64 {
        self.layout_version
    }

    pub fn status(&self) -> DiagramStatus {
        self.graph.status(self.settings.min_active_nodes)
    }

    pub fn summary(&self) -> LayoutSummary {
        self.graph.summary(self.settings.min_active_nodes)
    }

    pub fn snapshot(&self) -> DisplaySnapshot {
        DisplaySnapshot {
            display_id: self.id,
            graph: self.graph.clone(),
            linear: self.linear_frame.clone(),
            radial: self.radial_frame.clone(),
            cursor: self.cursor(),
            state: self.state(),
            status: self.status(),
            layout_version: self.layout_version,
        }
    }

    /// Source nodes the sequencer may walk; zero while data is insufficient
    pub fn cycle_count(&self) -> usize {
        if self.status().is_ready() {
            self.order.source.len()
        } else {
            0
        }
    }

    /// Start autoplay (no-op step when autoplay is off or data is missing)
    pub fn start(&mut self) -> Step {
        let count = self.cycle_count();
        self.sequencer.start(count)
    }

    /// Advance autoplay
    ///
    /// A pair the rotation lands on without enough data is skipped like a
    /// self pair would be. After one full rotation of undrawable pairs the
    /// sequencer goes idle.
    pub fn on_dwell_expired(&mut self) -> Result<Step> {
        let count = self.cycle_count();
        let mut step = self.sequencer.on_dwell_expired(count);
        if !step.pair_changed {
            return Ok(step);
        }

        self.relayout()?;
        let mut checked = 1;
        while !self.status().is_ready() {
            if checked >= self.sequencer.rotation_len() {
                info!("Display {}: no field pair has enough data, autoplay idle", self.id);
                let mut idle = self.sequencer.start(0);
                idle.pair_changed = true;
                return Ok(idle);
            }
            debug!("Display {} skipping {}: {:?}", self.id, self.field_pair(), self.status());
            step = self.sequencer.skip_pair();
            self.relayout()?;
            checked += 1;
        }
        Ok(step)
    }

    pub fn pause(&mut self) -> Step {
        self.sequencer.pause()
    }

    pub fn resume(&mut self) -> Step {
        self.sequencer.resume()
    }

    pub fn set_autoplay(&mut self, enabled: bool) -> Step {
        self.settings.autoplay = enabled;
        let count = self.cycle_count();
        self.sequencer.set_autoplay(enabled, count)
    }

    /// Show a caller-chosen pair; unknown fields and self pairs are rejected
    pub fn set_field_pair(&mut self, source: &str, target: &str) -> Result<Step> {
        let pair = FieldPair::validated(&self.catalog, source, target)?;
        let step = self.sequencer.set_field_pair(pair);
        self.relayout()?;
        Ok(self.settle(step))
    }

    pub fn set_include_test_data(&mut self, include: bool) -> Result<Step> {
        self.settings.include_test_data = include;
        self.relayout()?;
        Ok(self.refresh_sequencer())
    }

    /// Replace the record snapshot
    pub fn set_records(&mut self, records: Vec<ResponseRecord>) -> Result<Step> {
        info!("Display {} received {} records", self.id, records.len());
        self.records = records;
        self.relayout()?;
        self.graph.quality.log_summary();
        Ok(self.refresh_sequencer())
    }

    /// New viewport; the radial radii keep their ring thickness
    pub fn resize(&mut self, width: f64, height: f64) -> Result<Step> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(width) || !valid(height) {
            return Err(flowviz_common::Error::Config(format!(
                "viewport must be positive, got {}x{}",
                width, height
            ))
            .into());
        }

        let mut linear = self.linear.settings().clone();
        linear.width = width;
        linear.height = height;

        let mut radial = self.radial.settings().clone();
        let thickness = (radial.outer_radius - radial.inner_radius).max(0.0);
        radial.outer_radius = (width.min(height) / 2.0 - linear.margin).max(thickness);
        radial.inner_radius = radial.outer_radius - thickness;

        self.linear = LinearLayout::new(linear);
        self.radial = RadialLayout::new(radial);
        self.relayout()?;
        Ok(self.refresh_sequencer())
    }

    /// Re-check the sequencer after the node set changed
    fn refresh_sequencer(&mut self) -> Step {
        let count = self.cycle_count();
        let state = self.sequencer.state();
        if count == 0 && state != SequencerState::Idle {
            return self.sequencer.start(0);
        }
        if count > 0 && state == SequencerState::Idle {
            return self.sequencer.start(count);
        }
        self.sequencer.clamp_index(count);
        self.current_step()
    }

    /// A caller-driven pair change on a pair with no data goes idle
    fn settle(&mut self, step: Step) -> Step {
        if self.cycle_count() == 0 || self.sequencer.state() == SequencerState::Idle {
            let mut settled = self.refresh_sequencer();
            settled.pair_changed = step.pair_changed;
            return settled;
        }
        step
    }

    fn current_step(&self) -> Step {
        Step {
            focus: self.sequencer.cursor(),
            dwell: self.sequencer.schedule().for_state(self.sequencer.state()),
            pair_changed: false,
        }
    }

    fn relayout(&mut self) -> Result<()> {
        let pair = self.sequencer.field_pair().clone();
        self.graph = aggregate(&self.records, &pair, &self.catalog, self.settings.include_test_data)?;
        self.order = NodeOrder::resolve(&self.graph, &self.catalog, &self.visual_order);
        if !self.graph.is_empty() {
            self.visual_order
                .remember(pair.source(), self.order.source_labels(&self.graph));
        }

        let colors = NodeColors::new(self.theme.as_ref(), self.settings.dark_mode);
        self.linear_frame = self.linear.compute(&self.graph, &self.order, &colors);
        self.radial_frame = self.radial.compute(&self.graph, &self.order, &colors);
        self.layout_version += 1;

        debug!(
            "Display {} layout v{}: {} ({} records, {:?})",
            self.id,
            self.layout_version,
            pair,
            self.graph.total,
            self.status()
        );
        Ok(())
    }
}

fn initial_pair(catalog: &FieldCatalog, settings: &DisplaySettings) -> Result<FieldPair> {
    let default = FieldPair::default_for(catalog)?;
    let source = settings.source_field.as_deref().unwrap_or(default.source());
    let target = match settings.target_field.as_deref() {
        Some(target) => target,
        None if source == default.source() => default.target(),
        None => default.source(),
    };
    FieldPair::resolve(catalog, source, target)
}
