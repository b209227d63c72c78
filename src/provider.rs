use crate::{
    host::{has_instances, publish, InstanceId, WidgetHost, WidgetKind},
    playback::{ChangeCategory, MediaService, PlaybackSnapshot, RenderPath, StorageState},
    render::{render_default, render_full, render_progress, ErrorState},
    resources::WidgetResources,
};

/// Request for the media service to answer with a full render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub kind: WidgetKind,
    /// `None` targets every instance of the kind.
    pub ids: Option<Vec<InstanceId>>,
}

impl UpdateRequest {
    pub const COMMAND: &'static str = "appwidgetupdate";

    pub fn ids(&self) -> Option<&[InstanceId]> {
        self.ids.as_deref()
    }
}

/// Entry point for the widget's triggers.
///
/// Holds only immutable resources; every call reads the service afresh and
/// builds a new view.
#[derive(Debug, Clone, Default)]
pub struct WidgetProvider {
    kind: WidgetKind,
    resources: WidgetResources,
}

impl WidgetProvider {
    pub fn new(kind: WidgetKind, resources: WidgetResources) -> Self {
        Self { kind, resources }
    }

    pub fn kind(&self) -> &WidgetKind {
        &self.kind
    }

    pub fn resources(&self) -> &WidgetResources {
        &self.resources
    }

    pub fn set_resources(&mut self, resources: WidgetResources) {
        self.resources = resources;
    }

    /// Initializes freshly placed instances with the default view and
    /// returns the request to forward to a running service.
    pub fn on_update<H: WidgetHost + ?Sized>(
        &self,
        host: &mut H,
        ids: &[InstanceId],
    ) -> UpdateRequest {
        let view = render_default(&self.resources);
        publish(host, &self.kind, Some(ids), &view);
        UpdateRequest {
            kind: self.kind.clone(),
            ids: Some(ids.to_vec()),
        }
    }

    /// Full render of the service's current state.
    pub fn perform_update<S, H>(
        &self,
        service: &S,
        storage: StorageState,
        host: &mut H,
        ids: Option<&[InstanceId]>,
    ) -> usize
    where
        S: MediaService + ?Sized,
        H: WidgetHost + ?Sized,
    {
        let snapshot = PlaybackSnapshot::read(service);
        let view = render_full(&snapshot, storage, &self.resources, |s| {
            service.artwork(s.track_id, s.album_id)
        });
        publish(host, &self.kind, ids, &view)
    }

    /// Pushes the progress bar only, keeping everything else the instances
    /// show. Nothing is published while an error message is on screen.
    pub fn progress_update<S, H>(
        &self,
        service: &S,
        storage: StorageState,
        host: &mut H,
        ids: Option<&[InstanceId]>,
    ) -> usize
    where
        S: MediaService + ?Sized,
        H: WidgetHost + ?Sized,
    {
        let snapshot = PlaybackSnapshot::read(service);
        if let Some(error) = ErrorState::detect(storage, &snapshot) {
            tracing::trace!("Skipping progress update under {error:?}");
            return 0;
        }
        let view = render_progress(&snapshot);
        if view.is_empty() {
            return 0;
        }
        publish(host, &self.kind, ids, &view)
    }

    /// Handles a change notification from the service. Returns the number
    /// of instances updated.
    pub fn notify_change<S, H>(
        &self,
        service: &S,
        storage: StorageState,
        host: &mut H,
        category: &ChangeCategory,
    ) -> usize
    where
        S: MediaService + ?Sized,
        H: WidgetHost + ?Sized,
    {
        if !has_instances(host, &self.kind) {
            tracing::debug!("No {} instances, ignoring {category}", self.kind);
            return 0;
        }

        match category.render_path() {
            RenderPath::Full => self.perform_update(service, storage, host, None),
            RenderPath::ProgressOnly => self.progress_update(service, storage, host, None),
            RenderPath::Ignore => {
                tracing::trace!("Ignoring change notification {category}");
                0
            }
        }
    }
}
