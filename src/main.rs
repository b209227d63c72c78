use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        mpsc::{self, Receiver},
        Arc,
    },
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context};
use eframe::egui::{
    self, Color32, ColorImage, RichText, TextureHandle, TextureOptions, ViewportBuilder,
};
use image::RgbaImage;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use nowplaying_widget::{
    demo::DemoService, ChangeCategory, CommandSink, Config, InMemoryHost, InstanceId,
    MediaService, PendingAction, StorageState, UpdateRequest, ViewId, WidgetKind, WidgetProvider,
    WidgetResources, WidgetState,
};

#[cfg(windows)]
use nowplaying_widget::session::SystemSession;

const WIDGET_WIDTH: f32 = 320.0;
const ART_MAX_SIDE: f32 = 220.0;

enum PlaybackSource {
    Demo(DemoService),
    #[cfg(windows)]
    System(SystemSession),
}

impl PlaybackSource {
    fn from_config(config: &Config) -> Self {
        #[cfg(windows)]
        if config.preview.use_system_session {
            match SystemSession::connect() {
                Ok(session) => return PlaybackSource::System(session),
                Err(err) => tracing::warn!("Falling back to the demo playlist: {err}"),
            }
        }
        #[cfg(not(windows))]
        if config.preview.use_system_session {
            tracing::warn!(
                "The system media session is only available on Windows; using the demo playlist"
            );
        }
        PlaybackSource::Demo(DemoService::new(config.demo.tracks.clone()))
    }

    fn service(&self) -> &dyn MediaService {
        match self {
            PlaybackSource::Demo(demo) => demo,
            #[cfg(windows)]
            PlaybackSource::System(session) => session,
        }
    }

    fn commands(&mut self) -> &mut dyn CommandSink {
        match self {
            PlaybackSource::Demo(demo) => demo,
            #[cfg(windows)]
            PlaybackSource::System(session) => session,
        }
    }

    fn poll(&mut self, elapsed: Duration) -> Option<ChangeCategory> {
        match self {
            PlaybackSource::Demo(demo) => demo.tick(elapsed),
            #[cfg(windows)]
            PlaybackSource::System(session) => match session.refresh() {
                Ok(change) => change,
                Err(err) => {
                    tracing::warn!("{err}");
                    None
                }
            },
        }
    }
}

struct TextureSlot {
    source: Arc<RgbaImage>,
    texture: TextureHandle,
}

/// Preview shell hosting a single widget instance.
struct App {
    config: Config,
    config_path: Option<PathBuf>,
    provider: WidgetProvider,
    host: InMemoryHost,
    instance: InstanceId,
    source: PlaybackSource,
    textures: HashMap<ViewId, TextureSlot>,
    last_poll: Instant,
    _watcher: Option<RecommendedWatcher>,
    changes_rx: Option<Receiver<notify::Result<notify::Event>>>,
    status: Option<String>,
}

impl App {
    fn new(config: Config, config_path: Option<PathBuf>) -> Self {
        let resources = WidgetResources::from_config(&config).unwrap_or_else(|err| {
            tracing::warn!("Using built-in widget resources: {err}");
            WidgetResources::default()
        });
        let provider = WidgetProvider::new(WidgetKind::default(), resources);
        let mut host = InMemoryHost::new();
        let instance = host.add_instance(provider.kind().clone());
        let source = PlaybackSource::from_config(&config);

        let mut app = Self {
            config,
            config_path,
            provider,
            host,
            instance,
            source,
            textures: HashMap::new(),
            last_poll: Instant::now(),
            _watcher: None,
            changes_rx: None,
            status: None,
        };

        app.watch_config();
        let request = app.provider.on_update(&mut app.host, &[instance]);
        tracing::info!(
            "Placed widget {instance}, sending {} to the service",
            UpdateRequest::COMMAND
        );
        app.handle_update_request(&request);
        app
    }

    fn storage(&self) -> StorageState {
        StorageState::probe(self.config.storage.media_root.as_deref())
    }

    fn handle_update_request(&mut self, request: &UpdateRequest) {
        let storage = self.storage();
        self.provider.perform_update(
            self.source.service(),
            storage,
            &mut self.host,
            request.ids(),
        );
    }

    fn notify(&mut self, category: &ChangeCategory) {
        let storage = self.storage();
        let updated =
            self.provider
                .notify_change(self.source.service(), storage, &mut self.host, category);
        tracing::trace!("{category} updated {updated} widget(s)");
    }

    fn dispatch(&mut self, action: PendingAction) {
        tracing::debug!("Widget tap: {action}");
        match action {
            PendingAction::Open(screen) => {
                self.status = Some(format!("Would open the {screen:?} screen"));
            }
            PendingAction::Service(command) => match self.source.commands().execute(command) {
                Ok(()) => {
                    self.status = None;
                    self.notify(&command.resulting_change());
                }
                Err(err) => {
                    tracing::warn!("{err}");
                    self.status = Some(err.to_string());
                }
            },
        }
    }

    fn watch_config(&mut self) {
        if !self.config.preview.watch_config {
            return;
        }
        let Some(path) = self.config_path.as_deref() else {
            return;
        };
        let dir = config_watch_dir(path);

        let (tx, rx) = mpsc::channel();
        let watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })
        .and_then(|mut watcher| {
            watcher.watch(&dir, RecursiveMode::NonRecursive)?;
            Ok(watcher)
        });

        match watcher {
            Ok(watcher) => {
                self._watcher = Some(watcher);
                self.changes_rx = Some(rx);
            }
            Err(err) => tracing::warn!("Config hot reload unavailable: {err}"),
        }
    }

    fn poll_config_changes(&mut self) {
        let Some(path) = self.config_path.as_deref() else {
            return;
        };
        let mut changed = false;
        if let Some(rx) = self.changes_rx.as_ref() {
            while let Ok(event) = rx.try_recv() {
                match event {
                    Ok(evt) => changed |= touches_config(&evt, path),
                    Err(err) => tracing::warn!("Config watcher error: {err}"),
                }
            }
        }
        if changed {
            self.reload_config();
        }
    }

    fn reload_config(&mut self) {
        let Some(path) = self.config_path.clone() else {
            return;
        };
        let reloaded = Config::load_from(&path)
            .and_then(|config| WidgetResources::from_config(&config).map(|res| (config, res)));

        match reloaded {
            Ok((config, resources)) => {
                tracing::info!("Reloaded {}", path.display());
                if config.demo != self.config.demo {
                    self.source = PlaybackSource::from_config(&config);
                }
                self.config = config;
                self.provider.set_resources(resources);
                let request = UpdateRequest {
                    kind: self.provider.kind().clone(),
                    ids: None,
                };
                self.handle_update_request(&request);
            }
            Err(err) => {
                tracing::warn!("Keeping previous config: {err}");
                self.status = Some(err.to_string());
            }
        }
    }

    fn texture(
        &mut self,
        ctx: &egui::Context,
        id: ViewId,
        bitmap: &Arc<RgbaImage>,
    ) -> TextureHandle {
        if let Some(slot) = self.textures.get(&id) {
            if Arc::ptr_eq(&slot.source, bitmap) {
                return slot.texture.clone();
            }
        }

        let size = [bitmap.width() as usize, bitmap.height() as usize];
        let image = ColorImage::from_rgba_unmultiplied(size, bitmap.as_raw());
        let texture = ctx.load_texture(format!("widget.{id:?}"), image, TextureOptions::LINEAR);
        self.textures.insert(
            id,
            TextureSlot {
                source: Arc::clone(bitmap),
                texture: texture.clone(),
            },
        );
        texture
    }

    fn render_widget(&mut self, ui: &mut egui::Ui, state: &WidgetState) -> Option<PendingAction> {
        let mut tapped = None;

        ui.vertical_centered(|ui| {
            ui.spacing_mut().item_spacing.y = 6.0;

            for id in [ViewId::AlbumArt, ViewId::AlbumArtReflection] {
                if !state.is_visible(id) {
                    continue;
                }
                let Some(bitmap) = state.element(id).bitmap else {
                    continue;
                };
                let texture = self.texture(ui.ctx(), id, &bitmap);
                let size = fit_within(texture.size_vec2(), ART_MAX_SIDE);
                let response = ui.add(
                    egui::Image::new(&texture)
                        .fit_to_exact_size(size)
                        .sense(egui::Sense::click()),
                );
                if response.clicked() {
                    tapped = state.click(ViewId::Root);
                }
            }

            for id in [ViewId::Title, ViewId::Artist, ViewId::AlbumName] {
                if !state.is_visible(id) {
                    continue;
                }
                if let Some(text) = state.text(id) {
                    let rich = match id {
                        ViewId::Title => RichText::new(text).strong().size(18.0),
                        _ => RichText::new(text),
                    };
                    ui.label(rich);
                }
            }

            if let Some(progress) = state.element(ViewId::Progress).progress {
                ui.add(egui::ProgressBar::new(progress.fraction()).desired_width(WIDGET_WIDTH));
            }

            ui.horizontal(|row| {
                for id in [
                    ViewId::Shuffle,
                    ViewId::ControlPrev,
                    ViewId::ControlPlay,
                    ViewId::ControlNext,
                    ViewId::Repeat,
                ] {
                    let element = state.element(id);
                    let (glyph, hint) = match id {
                        ViewId::ControlPrev => ("⏮", "Previous track"),
                        ViewId::ControlNext => ("⏭", "Next track"),
                        _ => element
                            .drawable
                            .map(|d| (d.glyph(), d.label()))
                            .unwrap_or(("•", "")),
                    };
                    let response = row
                        .add_enabled(element.click.is_some(), egui::Button::new(glyph))
                        .on_hover_text(hint);
                    if response.clicked() {
                        tapped = element.click;
                    }
                }
            });

            if let Some(status) = &self.status {
                ui.colored_label(Color32::from_rgb(240, 200, 80), status);
            }
        });

        tapped
    }
}

/// Directory to watch for config edits. Editors save by renaming over the
/// file, which drops a watch placed on the file itself.
fn config_watch_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Whether a directory event writes or replaces the config file.
fn touches_config(event: &notify::Event, config_path: &Path) -> bool {
    if !(event.kind.is_modify() || event.kind.is_create()) {
        return false;
    }
    let Some(name) = config_path.file_name() else {
        return false;
    };
    event.paths.iter().any(|p| p.file_name() == Some(name))
}

fn fit_within(size: egui::Vec2, max_side: f32) -> egui::Vec2 {
    if size.x <= 0.0 || size.y <= 0.0 {
        return egui::vec2(max_side, max_side);
    }
    let scale = (max_side / size.x).min(max_side / size.y).min(1.0);
    size * scale
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_config_changes();

        let interval = self.config.preview.poll_interval();
        let elapsed = self.last_poll.elapsed();
        if elapsed >= interval {
            self.last_poll = Instant::now();
            if let Some(category) = self.source.poll(elapsed) {
                self.notify(&category);
            }
        }

        let state = self
            .host
            .state(self.instance)
            .cloned()
            .unwrap_or_default();

        let mut tapped = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            tapped = self.render_widget(ui, &state);
        });
        if let Some(action) = tapped {
            self.dispatch(action);
        }

        ctx.request_repaint_after(interval);
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let config_path = Config::locate();
    let config = match &config_path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => Config::default(),
    };

    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_inner_size([WIDGET_WIDTH + 40.0, 560.0])
            .with_title("Now Playing Widget"),
        ..Default::default()
    };
    eframe::run_native(
        "Now Playing Widget",
        native_options,
        Box::new(
            move |_cc| -> std::result::Result<
                Box<dyn eframe::App>,
                Box<dyn std::error::Error + Send + Sync>,
            > { Ok(Box::new(App::new(config, config_path))) },
        ),
    )
    .map_err(|err| anyhow!("Preview window failed: {err}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_within_scales_down_only() {
        let big = fit_within(egui::vec2(440.0, 220.0), 220.0);
        assert_eq!(big, egui::vec2(220.0, 110.0));
        let small = fit_within(egui::vec2(100.0, 50.0), 220.0);
        assert_eq!(small, egui::vec2(100.0, 50.0));
        let empty = fit_within(egui::vec2(0.0, 0.0), 220.0);
        assert_eq!(empty, egui::vec2(220.0, 220.0));
    }

    #[test]
    fn config_events_are_filtered_by_file_name() {
        use notify::{
            event::{CreateKind, DataChange, ModifyKind, RemoveKind, RenameMode},
            Event, EventKind,
        };

        let config = Path::new("/widget/config/nowplaying-widget.toml");
        let rename = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from("/widget/config/.nowplaying-widget.toml.swp"))
            .add_path(PathBuf::from("/widget/config/nowplaying-widget.toml"));
        assert!(touches_config(&rename, config));

        let write = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(PathBuf::from("/widget/config/nowplaying-widget.toml"));
        assert!(touches_config(&write, config));

        let created = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/widget/config/nowplaying-widget.toml"));
        assert!(touches_config(&created, config));

        let temp = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/widget/config/nowplaying-widget.toml~"));
        assert!(!touches_config(&temp, config));

        let other = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(PathBuf::from("/widget/config/other.toml"));
        assert!(!touches_config(&other, config));

        let removed = Event::new(EventKind::Remove(RemoveKind::File))
            .add_path(PathBuf::from("/widget/config/nowplaying-widget.toml"));
        assert!(!touches_config(&removed, config));
    }

    #[test]
    fn config_watch_targets_the_parent_directory() {
        assert_eq!(
            config_watch_dir(Path::new("/widget/config/nowplaying-widget.toml")),
            PathBuf::from("/widget/config")
        );
        assert_eq!(config_watch_dir(Path::new("config.toml")), PathBuf::from("."));
    }

    #[cfg(not(windows))]
    #[test]
    fn system_session_request_falls_back_to_demo() {
        let mut config = Config::default();
        config.preview.use_system_session = true;
        config.demo.tracks = vec![nowplaying_widget::config::DemoTrack {
            title: "Xtal".into(),
            artist: "Aphex Twin".into(),
            album: "Selected Ambient Works 85-92".into(),
            duration_ms: 294_000,
            art: None,
        }];
        let source = PlaybackSource::from_config(&config);
        assert_eq!(source.service().track_name().as_deref(), Some("Xtal"));
    }

    #[test]
    fn demo_source_follows_config() {
        let mut config = Config::default();
        config.preview.use_system_session = false;
        let source = PlaybackSource::from_config(&config);
        assert!(source.service().track_name().is_none());
    }
}
