//! Remote view descriptor and the state a host realizes from it.
//!
//! A [`WidgetView`] is an ordered list of assignments to named elements of
//! the widget layout. The host applies it to a [`WidgetState`]: a full view
//! starts over from the layout template, a partial view is merged into
//! whatever the instance currently shows.

use std::{collections::BTreeMap, sync::Arc};

use image::RgbaImage;

use crate::actions::PendingAction;

/// Named element of the widget layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewId {
    Root,
    Title,
    Artist,
    AlbumName,
    AlbumArt,
    AlbumArtReflection,
    Progress,
    ControlPlay,
    ControlNext,
    ControlPrev,
    Shuffle,
    Repeat,
}

impl ViewId {
    /// Elements that must always carry a click action.
    pub const CONTROLS: [ViewId; 6] = [
        ViewId::Root,
        ViewId::ControlPlay,
        ViewId::ControlNext,
        ViewId::ControlPrev,
        ViewId::Shuffle,
        ViewId::Repeat,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Gone,
}

/// Icon resources the layout ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Drawable {
    PlayButton,
    PauseButton,
    ShuffleOff,
    PartyShuffle,
    ShuffleOn,
    RepeatOff,
    RepeatOnce,
    RepeatAll,
}

impl Drawable {
    pub fn glyph(self) -> &'static str {
        match self {
            Drawable::PlayButton => "▶",
            Drawable::PauseButton => "⏸",
            Drawable::ShuffleOff => "⇉",
            Drawable::PartyShuffle => "🎉",
            Drawable::ShuffleOn => "🔀",
            Drawable::RepeatOff => "⇥",
            Drawable::RepeatOnce => "🔂",
            Drawable::RepeatAll => "🔁",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Drawable::PlayButton => "Play",
            Drawable::PauseButton => "Pause",
            Drawable::ShuffleOff => "Shuffle off",
            Drawable::PartyShuffle => "Party shuffle",
            Drawable::ShuffleOn => "Shuffle on",
            Drawable::RepeatOff => "Repeat off",
            Drawable::RepeatOnce => "Repeat current",
            Drawable::RepeatAll => "Repeat all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub max: u16,
    pub value: u16,
}

impl Progress {
    pub fn fraction(&self) -> f32 {
        if self.max == 0 {
            0.0
        } else {
            f32::from(self.value.min(self.max)) / f32::from(self.max)
        }
    }
}

#[derive(Debug, Clone)]
pub enum ViewOp {
    Text(String),
    Visibility(Visibility),
    Bitmap(Arc<RgbaImage>),
    Drawable(Drawable),
    Progress(Progress),
    Click(PendingAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// Replace everything the instance shows.
    #[default]
    Full,
    /// Merge into what the instance already shows.
    Partial,
}

#[derive(Debug, Clone, Default)]
pub struct WidgetView {
    mode: UpdateMode,
    ops: Vec<(ViewId, ViewOp)>,
}

impl WidgetView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partial() -> Self {
        Self {
            mode: UpdateMode::Partial,
            ops: Vec::new(),
        }
    }

    pub fn mode(&self) -> UpdateMode {
        self.mode
    }

    pub fn ops(&self) -> &[(ViewId, ViewOp)] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn set_text(&mut self, id: ViewId, text: impl Into<String>) {
        self.ops.push((id, ViewOp::Text(text.into())));
    }

    pub fn set_visibility(&mut self, id: ViewId, visibility: Visibility) {
        self.ops.push((id, ViewOp::Visibility(visibility)));
    }

    pub fn set_image_bitmap(&mut self, id: ViewId, bitmap: Arc<RgbaImage>) {
        self.ops.push((id, ViewOp::Bitmap(bitmap)));
    }

    pub fn set_image_drawable(&mut self, id: ViewId, drawable: Drawable) {
        self.ops.push((id, ViewOp::Drawable(drawable)));
    }

    pub fn set_progress(&mut self, id: ViewId, max: u16, value: u16) {
        self.ops.push((id, ViewOp::Progress(Progress { max, value })));
    }

    pub fn set_on_click(&mut self, id: ViewId, action: PendingAction) {
        self.ops.push((id, ViewOp::Click(action)));
    }

    fn last_op<T>(&self, id: ViewId, pick: impl Fn(&ViewOp) -> Option<T>) -> Option<T> {
        self.ops
            .iter()
            .rev()
            .filter(|(target, _)| *target == id)
            .find_map(|(_, op)| pick(op))
    }

    pub fn text(&self, id: ViewId) -> Option<&str> {
        self.ops
            .iter()
            .rev()
            .filter(|(target, _)| *target == id)
            .find_map(|(_, op)| match op {
                ViewOp::Text(text) => Some(text.as_str()),
                _ => None,
            })
    }

    pub fn visibility(&self, id: ViewId) -> Option<Visibility> {
        self.last_op(id, |op| match op {
            ViewOp::Visibility(visibility) => Some(*visibility),
            _ => None,
        })
    }

    pub fn bitmap(&self, id: ViewId) -> Option<Arc<RgbaImage>> {
        self.last_op(id, |op| match op {
            ViewOp::Bitmap(bitmap) => Some(Arc::clone(bitmap)),
            _ => None,
        })
    }

    pub fn drawable(&self, id: ViewId) -> Option<Drawable> {
        self.last_op(id, |op| match op {
            ViewOp::Drawable(drawable) => Some(*drawable),
            _ => None,
        })
    }

    pub fn progress(&self, id: ViewId) -> Option<Progress> {
        self.last_op(id, |op| match op {
            ViewOp::Progress(progress) => Some(*progress),
            _ => None,
        })
    }

    pub fn click(&self, id: ViewId) -> Option<PendingAction> {
        self.last_op(id, |op| match op {
            ViewOp::Click(action) => Some(*action),
            _ => None,
        })
    }
}

/// What a single layout element currently shows.
#[derive(Debug, Clone, Default)]
pub struct ElementState {
    pub visibility: Visibility,
    pub text: Option<String>,
    pub bitmap: Option<Arc<RgbaImage>>,
    pub drawable: Option<Drawable>,
    pub progress: Option<Progress>,
    pub click: Option<PendingAction>,
}

/// Realized contents of one widget instance.
#[derive(Debug, Clone)]
pub struct WidgetState {
    elements: BTreeMap<ViewId, ElementState>,
}

impl Default for WidgetState {
    fn default() -> Self {
        Self::template()
    }
}

impl WidgetState {
    /// Layout defaults: everything visible, empty texts and images, idle
    /// icons, empty progress bar, nothing clickable.
    pub fn template() -> Self {
        let mut elements = BTreeMap::new();
        let drawables = [
            (ViewId::ControlPlay, Drawable::PlayButton),
            (ViewId::Shuffle, Drawable::ShuffleOff),
            (ViewId::Repeat, Drawable::RepeatOff),
        ];
        for (id, drawable) in drawables {
            elements.insert(
                id,
                ElementState {
                    drawable: Some(drawable),
                    ..ElementState::default()
                },
            );
        }
        elements.insert(
            ViewId::Progress,
            ElementState {
                progress: Some(Progress {
                    max: 1000,
                    value: 0,
                }),
                ..ElementState::default()
            },
        );
        Self { elements }
    }

    pub fn apply(&mut self, view: &WidgetView) {
        if view.mode() == UpdateMode::Full {
            *self = Self::template();
        }

        for (id, op) in view.ops() {
            let element = self.elements.entry(*id).or_default();
            match op {
                ViewOp::Text(text) => element.text = Some(text.clone()),
                ViewOp::Visibility(visibility) => element.visibility = *visibility,
                ViewOp::Bitmap(bitmap) => {
                    element.bitmap = Some(Arc::clone(bitmap));
                    element.drawable = None;
                }
                ViewOp::Drawable(drawable) => {
                    element.drawable = Some(*drawable);
                    element.bitmap = None;
                }
                ViewOp::Progress(progress) => element.progress = Some(*progress),
                ViewOp::Click(action) => element.click = Some(*action),
            }
        }
    }

    pub fn element(&self, id: ViewId) -> ElementState {
        self.elements.get(&id).cloned().unwrap_or_default()
    }

    pub fn is_visible(&self, id: ViewId) -> bool {
        self.elements
            .get(&id)
            .map(|element| element.visibility == Visibility::Visible)
            .unwrap_or(true)
    }

    pub fn text(&self, id: ViewId) -> Option<&str> {
        self.elements.get(&id).and_then(|e| e.text.as_deref())
    }

    pub fn click(&self, id: ViewId) -> Option<PendingAction> {
        self.elements.get(&id).and_then(|e| e.click)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{Screen, ServiceCommand};

    #[test]
    fn later_assignments_win() {
        let mut view = WidgetView::new();
        view.set_text(ViewId::Artist, "first");
        view.set_visibility(ViewId::Artist, Visibility::Gone);
        view.set_text(ViewId::Artist, "second");
        assert_eq!(view.text(ViewId::Artist), Some("second"));
        assert_eq!(view.visibility(ViewId::Artist), Some(Visibility::Gone));
        assert_eq!(view.text(ViewId::Title), None);
    }

    #[test]
    fn template_has_idle_defaults() {
        let state = WidgetState::template();
        assert!(state.is_visible(ViewId::Title));
        assert_eq!(
            state.element(ViewId::ControlPlay).drawable,
            Some(Drawable::PlayButton)
        );
        assert_eq!(
            state.element(ViewId::Progress).progress,
            Some(Progress {
                max: 1000,
                value: 0
            })
        );
        assert_eq!(state.click(ViewId::Root), None);
    }

    #[test]
    fn full_view_resets_to_template() {
        let mut state = WidgetState::template();
        let mut first = WidgetView::new();
        first.set_text(ViewId::Title, "Song");
        first.set_on_click(ViewId::Root, PendingAction::Open(Screen::Browse));
        state.apply(&first);
        assert_eq!(state.text(ViewId::Title), Some("Song"));

        let mut second = WidgetView::new();
        second.set_progress(ViewId::Progress, 1000, 10);
        state.apply(&second);
        assert_eq!(state.text(ViewId::Title), None);
        assert_eq!(state.click(ViewId::Root), None);
    }

    #[test]
    fn partial_view_merges() {
        let mut state = WidgetState::template();
        let mut full = WidgetView::new();
        full.set_text(ViewId::Title, "Song");
        full.set_on_click(
            ViewId::ControlNext,
            PendingAction::Service(ServiceCommand::Next),
        );
        state.apply(&full);

        let mut partial = WidgetView::partial();
        partial.set_progress(ViewId::Progress, 1000, 420);
        state.apply(&partial);
        assert_eq!(state.text(ViewId::Title), Some("Song"));
        assert_eq!(
            state.click(ViewId::ControlNext),
            Some(PendingAction::Service(ServiceCommand::Next))
        );
        assert_eq!(state.element(ViewId::Progress).progress.map(|p| p.value), Some(420));
    }

    #[test]
    fn bitmap_replaces_drawable() {
        let mut state = WidgetState::template();
        let mut view = WidgetView::partial();
        view.set_image_bitmap(ViewId::ControlPlay, Arc::new(RgbaImage::new(1, 1)));
        state.apply(&view);
        let element = state.element(ViewId::ControlPlay);
        assert!(element.bitmap.is_some());
        assert_eq!(element.drawable, None);
    }

    #[test]
    fn progress_fraction_handles_zero_max() {
        assert_eq!(Progress { max: 0, value: 3 }.fraction(), 0.0);
        assert_eq!(Progress { max: 1000, value: 500 }.fraction(), 0.5);
    }
}
