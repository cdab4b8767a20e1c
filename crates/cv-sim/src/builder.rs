//! Fluent builder for constructing a [`Sim`].

use std::collections::HashMap;

use cv_core::{SegmentId, SimConfig};
use cv_schedule::SignalBoard;
use cv_transfer::{Port, SegmentConfig};

use crate::{Link, LinkConfig, Plant, Router, Sim, SimError, SimResult};

/// Fluent builder for [`Sim<P, R>`].
///
/// # Required inputs
///
/// - [`SimConfig`]: clock resolution, end time, stall guard
/// - `P: Plant`: what produces sensor edges (e.g. [`BeltPlant`][crate::BeltPlant])
/// - `R: Router`: picks an exit after `Process` (e.g. [`FirstLink`][crate::FirstLink])
///
/// Segments get `SegmentId`s in the order they are added.  A segment without
/// outgoing links is a sink.
///
/// # Example
///
/// ```rust,ignore
/// let mut sim = SimBuilder::new(SimConfig::default(), BeltPlant::new(), FirstLink)
///     .segment(SegmentConfig::Conveyor(infeed))
///     .segment(SegmentConfig::Conveyor(buffer))
///     .link(LinkConfig::new("infeed", "buffer"))
///     .build()?;
/// sim.run(&mut NoopObserver)?;
/// ```
pub struct SimBuilder<P: Plant, R: Router> {
    config:   SimConfig,
    segments: Vec<SegmentConfig>,
    links:    Vec<LinkConfig>,
    plant:    P,
    router:   R,
}

impl<P: Plant, R: Router> SimBuilder<P, R> {
    pub fn new(config: SimConfig, plant: P, router: R) -> Self {
        Self {
            config,
            segments: Vec::new(),
            links:    Vec::new(),
            plant,
            router,
        }
    }

    pub fn segment(mut self, segment: SegmentConfig) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn segments(mut self, segments: impl IntoIterator<Item = SegmentConfig>) -> Self {
        self.segments.extend(segments);
        self
    }

    pub fn link(mut self, link: LinkConfig) -> Self {
        self.links.push(link);
        self
    }

    pub fn links(mut self, links: impl IntoIterator<Item = LinkConfig>) -> Self {
        self.links.extend(links);
        self
    }

    /// Validate the layout, construct and initialize every handler, and
    /// return a ready-to-run [`Sim`].
    pub fn build(self) -> SimResult<Sim<P, R>> {
        // ── Validate config ───────────────────────────────────────────────
        if self.config.ticks_per_sec == 0 {
            return Err(SimError::Config("ticks_per_sec must be positive".into()));
        }
        if let Some(end) = self.config.end_secs {
            if end.is_nan() || end < 0.0 {
                return Err(SimError::Config(format!("end_secs must be non-negative, got {end}")));
            }
        }

        // ── Segments ──────────────────────────────────────────────────────
        let mut ids: HashMap<&str, SegmentId> = HashMap::new();
        for (i, cfg) in self.segments.iter().enumerate() {
            let name = cfg.name();
            if name.is_empty() {
                return Err(SimError::Config(format!("segment #{i} has no name")));
            }
            if ids.insert(name, SegmentId(i as u32)).is_some() {
                return Err(SimError::DuplicateSegment(name.to_owned()));
            }
        }

        let mut signals = SignalBoard::new();
        let mut handlers = Vec::with_capacity(self.segments.len());
        for cfg in &self.segments {
            let handler = cfg.build(&mut signals).map_err(|source| SimError::Segment {
                segment: cfg.name().to_owned(),
                source,
            })?;
            handlers.push(handler);
        }

        // ── Links ─────────────────────────────────────────────────────────
        let resolve = |name: &str| {
            ids.get(name).copied().ok_or_else(|| SimError::UnknownSegment(name.to_owned()))
        };
        let mut links = Vec::with_capacity(self.links.len());
        for cfg in &self.links {
            let from = resolve(&cfg.from)?;
            let to = resolve(&cfg.to)?;
            if from == to {
                return Err(SimError::Config(format!("segment {:?} is linked to itself", cfg.from)));
            }
            links.push(Link {
                from,
                to,
                tx: Port { connector: cfg.tx.clone(), side: cfg.tx_side },
                rx: Port { connector: cfg.rx.clone(), side: cfg.rx_side },
            });
        }

        tracing::info!(
            segments = handlers.len(),
            links = links.len(),
            signals = signals.len(),
            "line built"
        );
        Ok(Sim::assemble(self.config, signals, handlers, links, self.plant, self.router))
    }
}
