//! End-to-end carousel creation
//!
//! [`Orchestrator::create_carousel`] sequences one request: load the template,
//! acquire the user images, materialize, composite, add the export
//! instructions and slices, then attach everything to the page. Progress is
//! reported to the UI at fixed checkpoints:
//!
//! | percent | message |
//! |---|---|
//! | 5 | Loading template... |
//! | 20 | Acquiring images... |
//! | 45 | Processing images... |
//! | 55 | Creating slides... |
//! | 70 | Applying template styles... |
//! | 80 | Adding export instructions... |
//! | 90 | Creating export slices... |
//! | 100 | Carousel created successfully! |
//!
//! Only a missing template or an empty materialization abort the request.
//! Later stages degrade: their failure is reported and the carousel is still
//! attached.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::canvas::{Canvas, CanvasError, ElementId, Severity};
use crate::codec;
use crate::composite::{CompositeReport, Compositor};
use crate::config::EngineConfig;
use crate::export::{instructions_frame, partition, stack_on_page, SlicePlan};
use crate::font::FontResolver;
use crate::materialize::{MaterializeStats, Materializer};
use crate::protocol::{CreateCarousel, InboundMessage, OutboundEvent};
use crate::template::{CatalogError, TemplateCatalog};

/// Request stages that can abort creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Images,
    Materialize,
    Attach,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Images => "image acquisition",
            Stage::Materialize => "materialization",
            Stage::Attach => "page attachment",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// The request cannot start; nothing was created
    #[error("cannot start carousel: {0}")]
    Fatal(#[from] CatalogError),

    #[error("{stage} failed: {reason}")]
    Stage { stage: Stage, reason: String },

    #[error("UI bridge closed before images arrived")]
    BridgeClosed,
}

/// A stage that failed without aborting the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degradation {
    Compositing(String),
    Instructions(String),
    Layout(String),
    Slices(String),
}

/// Everything created for one request
#[derive(Debug, Clone)]
pub struct CarouselOutcome {
    pub template_id: String,
    pub root: ElementId,
    pub instructions: Option<ElementId>,
    pub slices: Vec<ElementId>,
    pub stats: MaterializeStats,
    pub composite: CompositeReport,
    pub degraded: Vec<Degradation>,
}

impl CarouselOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// The engine's link to the UI
#[async_trait]
pub trait UiBridge: Send {
    fn emit(&mut self, event: OutboundEvent);

    /// Wait for the UI's reply to a `request-images` event
    async fn receive_images(&mut self) -> Result<Vec<Vec<u8>>, OrchestrationError>;
}

/// Creates carousels from a read-only template catalog
#[derive(Debug, Clone)]
pub struct Orchestrator {
    catalog: Arc<TemplateCatalog>,
    config: EngineConfig,
    compositor: Compositor,
}

impl Orchestrator {
    pub fn new(catalog: Arc<TemplateCatalog>, config: EngineConfig) -> Self {
        let compositor = Compositor::new(&config.compositing);
        Self {
            catalog,
            config,
            compositor,
        }
    }

    /// Replace the compositor (e.g. with custom typography tables)
    pub fn with_compositor(mut self, compositor: Compositor) -> Self {
        self.compositor = compositor;
        self
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn create_carousel<C, B>(
        &self,
        canvas: &mut C,
        request: &CreateCarousel,
        bridge: &mut B,
    ) -> Result<CarouselOutcome, OrchestrationError>
    where
        C: Canvas + ?Sized,
        B: UiBridge + ?Sized,
    {
        bridge.emit(OutboundEvent::progress(5, "Loading template..."));
        let template = match self.catalog.require(&request.template_id) {
            Ok(template) => template,
            Err(e) => {
                canvas.notify(
                    &format!("Template \"{}\" not found", request.template_id),
                    Severity::Error,
                );
                return Err(e.into());
            }
        };
        info!(template = %template.id, slides = template.slides, "creating carousel");

        bridge.emit(OutboundEvent::progress(20, "Acquiring images..."));
        let images = match request.inline_images() {
            Some(encoded) => decode_inline_images(encoded),
            None => {
                bridge.emit(OutboundEvent::RequestImages {
                    count: request.images_metadata.len(),
                });
                match bridge.receive_images().await {
                    Ok(images) => images,
                    Err(e) => {
                        canvas.notify("Could not receive the images", Severity::Error);
                        return Err(OrchestrationError::Stage {
                            stage: Stage::Images,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        };
        debug!(count = images.len(), "images acquired");

        bridge.emit(OutboundEvent::progress(45, "Processing images..."));
        bridge.emit(OutboundEvent::progress(55, "Creating slides..."));

        let mut fonts = FontResolver::new(&self.config.fonts);
        let mut materializer =
            Materializer::new(&mut *canvas, &mut fonts, &images, template, &self.config);
        let root = materializer.run().await;
        let stats = materializer.stats().clone();
        let Some(root) = root else {
            canvas.notify("Could not create the carousel", Severity::Error);
            return Err(OrchestrationError::Stage {
                stage: Stage::Materialize,
                reason: format!("template {} produced no root element", template.id),
            });
        };

        let mut degraded = Vec::new();

        bridge.emit(OutboundEvent::progress(70, "Applying template styles..."));
        let composite = match self.compositor.apply(canvas, root, template) {
            Ok(report) => report,
            Err(e) => {
                warn!(template = %template.id, error = %e, "compositing failed");
                canvas.notify("Template styles were not fully applied", Severity::Warning);
                degraded.push(Degradation::Compositing(e.to_string()));
                CompositeReport::default()
            }
        };

        bridge.emit(OutboundEvent::progress(80, "Adding export instructions..."));
        let mut instructions = None;
        if self.config.export.instructions {
            match instructions_frame(canvas, &mut fonts, template.width, template.slides).await {
                Ok(frame) => instructions = Some(frame),
                Err(e) => {
                    warn!(error = %e, "instructions frame not created");
                    canvas.notify("Instructions frame not created", Severity::Warning);
                    degraded.push(Degradation::Instructions(e.to_string()));
                }
            }
        }
        if let Err(e) = stack_on_page(canvas, instructions, root, self.config.export.gap) {
            warn!(error = %e, "could not position the carousel");
            degraded.push(Degradation::Layout(e.to_string()));
        }

        bridge.emit(OutboundEvent::progress(90, "Creating export slices..."));
        let slices = match partition(canvas, root, &SlicePlan::from_template(template)) {
            Ok(slices) => slices,
            Err(e) => {
                warn!(error = %e, "export slices not created");
                canvas.notify("Export slices not created", Severity::Warning);
                degraded.push(Degradation::Slices(e.to_string()));
                Vec::new()
            }
        };

        if let Err(e) = attach(canvas, instructions, root) {
            canvas.notify("Could not create the carousel", Severity::Error);
            return Err(OrchestrationError::Stage {
                stage: Stage::Attach,
                reason: e.to_string(),
            });
        }
        let focus: Vec<ElementId> = instructions.into_iter().chain([root]).collect();
        canvas.focus(&focus);

        bridge.emit(OutboundEvent::progress(100, "Carousel created successfully!"));
        bridge.emit(OutboundEvent::CarouselComplete);
        canvas.notify(
            &format!("Carousel \"{}\" created successfully!", template.name),
            Severity::Info,
        );
        info!(
            template = %template.id,
            slices = slices.len(),
            degraded = degraded.len(),
            "carousel created"
        );

        Ok(CarouselOutcome {
            template_id: template.id.clone(),
            root,
            instructions,
            slices,
            stats,
            composite,
            degraded,
        })
    }
}

/// Attach the instructions frame (if any) then the carousel root
fn attach<C: Canvas + ?Sized>(
    canvas: &mut C,
    instructions: Option<ElementId>,
    root: ElementId,
) -> Result<(), CanvasError> {
    if let Some(frame) = instructions {
        canvas.attach_to_page(frame)?;
    }
    canvas.attach_to_page(root)
}

/// Decode inline images, keeping positions aligned: an entry that fails to
/// decode becomes an empty payload the host will later reject
pub fn decode_inline_images(encoded: &[String]) -> Vec<Vec<u8>> {
    encoded
        .iter()
        .enumerate()
        .map(|(index, data)| {
            codec::decode(data).unwrap_or_else(|e| {
                warn!(index, error = %e, "inline image could not be decoded");
                Vec::new()
            })
        })
        .collect()
}

/// Bridge answering the image request with images known up front.
///
/// Events are logged and kept for inspection.
#[derive(Debug, Default)]
pub struct PreloadedBridge {
    images: Option<Vec<Vec<u8>>>,
    events: Vec<OutboundEvent>,
}

impl PreloadedBridge {
    pub fn new(images: Vec<Vec<u8>>) -> Self {
        Self {
            images: Some(images),
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[OutboundEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<OutboundEvent> {
        self.events
    }
}

#[async_trait]
impl UiBridge for PreloadedBridge {
    fn emit(&mut self, event: OutboundEvent) {
        match &event {
            OutboundEvent::Progress { percent, log } => info!(percent, "{log}"),
            OutboundEvent::RequestImages { count } => debug!(count, "images requested"),
            OutboundEvent::CarouselComplete => debug!("carousel complete"),
        }
        self.events.push(event);
    }

    async fn receive_images(&mut self) -> Result<Vec<Vec<u8>>, OrchestrationError> {
        self.images.take().ok_or(OrchestrationError::BridgeClosed)
    }
}

/// UI bridge over tokio channels
#[derive(Debug)]
pub struct ChannelBridge {
    events: mpsc::UnboundedSender<OutboundEvent>,
    inbound: mpsc::Receiver<InboundMessage>,
}

/// The UI's ends of a [`ChannelBridge`]
#[derive(Debug)]
pub struct UiHandle {
    pub messages: mpsc::Sender<InboundMessage>,
    pub events: mpsc::UnboundedReceiver<OutboundEvent>,
}

impl ChannelBridge {
    pub fn new(
        events: mpsc::UnboundedSender<OutboundEvent>,
        inbound: mpsc::Receiver<InboundMessage>,
    ) -> Self {
        Self { events, inbound }
    }

    /// A connected bridge and UI handle
    pub fn pair(capacity: usize) -> (Self, UiHandle) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (message_tx, message_rx) = mpsc::channel(capacity);
        (
            Self::new(event_tx, message_rx),
            UiHandle {
                messages: message_tx,
                events: event_rx,
            },
        )
    }

    /// Next message from the UI, `None` once every sender is gone
    pub async fn next_message(&mut self) -> Option<InboundMessage> {
        self.inbound.recv().await
    }
}

#[async_trait]
impl UiBridge for ChannelBridge {
    fn emit(&mut self, event: OutboundEvent) {
        if self.events.send(event).is_err() {
            debug!("UI stopped listening for events");
        }
    }

    async fn receive_images(&mut self) -> Result<Vec<Vec<u8>>, OrchestrationError> {
        while let Some(message) = self.inbound.recv().await {
            match message {
                InboundMessage::ImagesData { images } => return Ok(images),
                other => warn!(kind = other.kind(), "ignoring message while waiting for images"),
            }
        }
        Err(OrchestrationError::BridgeClosed)
    }
}

/// Message loop serving one UI over a [`ChannelBridge`]
pub struct PluginSession<C: Canvas> {
    orchestrator: Orchestrator,
    canvas: C,
    bridge: ChannelBridge,
}

impl<C: Canvas> PluginSession<C> {
    pub fn new(orchestrator: Orchestrator, canvas: C, bridge: ChannelBridge) -> Self {
        Self {
            orchestrator,
            canvas,
            bridge,
        }
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn into_canvas(self) -> C {
        self.canvas
    }

    /// Serve messages until the UI disconnects, returning each request's result
    pub async fn run(&mut self) -> Vec<Result<CarouselOutcome, OrchestrationError>> {
        let mut results = Vec::new();
        while let Some(message) = self.bridge.next_message().await {
            match message {
                InboundMessage::CreateCarousel(request) => {
                    let result = self
                        .orchestrator
                        .create_carousel(&mut self.canvas, &request, &mut self.bridge)
                        .await;
                    if let Err(e) = &result {
                        warn!(template = %request.template_id, error = %e, "carousel request failed");
                    }
                    results.push(result);
                }
                other => warn!(kind = other.kind(), "unexpected message"),
            }
        }
        debug!(requests = results.len(), "UI disconnected");
        results
    }
}
