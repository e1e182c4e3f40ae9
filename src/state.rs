// Application state for the iced daemon.
// Owns the settings store, the render loop and the two windows (overlay and
// settings panel), and turns timer, tray and window events into updates.

use iced::widget::{column, container, row, text};
use iced::{window, Alignment, Element, Font, Length, Point, Size, Subscription, Task, Theme};
use log::{debug, info, warn};

use crate::audio::{start_audio, AudioProvider};
use crate::data_colouring::{level_color, text_color};
use crate::foreground::DesktopForeground;
use crate::gpu_data_nvidia::start_gpu;
use crate::monitors::{self, Monitor};
use crate::placement::{measure_block, place, Placement, PADDING};
use crate::render_loop::{RenderLoop, Screen, TickOutcome};
use crate::settings::{Settings, TextAlign};
use crate::settings_panel::{installed_families, PanelAction, PanelMessage, SettingsPanel};
use crate::settings_store::SettingsStore;
use crate::styles;
use crate::subscriptions::{ticks, TickKind};
use crate::system_stats::SysinfoSource;
use crate::telemetry::{Budget, Gated};
use crate::text_block::Line;
use crate::tray::{TrayEvent, TrayManager};

const PANEL_SIZE: Size = Size::new(480.0, 600.0);

#[derive(Debug, Clone)]
pub enum Message {
    /// Full telemetry refresh
    Tick,
    /// Audio bars only
    AudioTick,
    Tray(TrayEvent),
    OverlayOpened(window::Id),
    SettingsOpened(window::Id),
    WindowClosed(window::Id),
    Panel(PanelMessage),
}

/// `Font::with_name` needs a `'static` family name; the name is leaked once
/// per distinct family the user picks.
struct FontCache {
    family: String,
    font: Font,
}

impl FontCache {
    fn new(family: &str) -> Self {
        Self {
            family: family.to_string(),
            font: Font::with_name(Box::leak(family.to_string().into_boxed_str())),
        }
    }

    fn refresh(&mut self, family: &str) {
        if self.family != family {
            *self = Self::new(family);
        }
    }
}

pub struct State {
    store: SettingsStore,
    render: RenderLoop,
    monitors: Vec<Monitor>,
    target: Monitor,
    placement: Option<Placement>,
    overlay: Option<window::Id>,
    panel: Option<(window::Id, SettingsPanel)>,
    tray: Option<TrayManager>,
    font: FontCache,
    running: bool,
}

impl State {
    pub fn boot() -> (Self, Task<Message>) {
        let store = SettingsStore::load(SettingsStore::default_path());
        let settings = store.settings().clone();
        info!("Settings loaded from {}", store.path().display());

        let audio: AudioProvider = if settings.audio_enabled {
            start_audio(settings.analyzer_config())
        } else {
            Gated::Incapable
        };
        let render = RenderLoop::new(
            Box::new(SysinfoSource::new()),
            start_gpu(),
            audio,
            Box::new(DesktopForeground),
            Budget::default(),
        );
        info!(
            "GPU telemetry {}, audio capture {}",
            if render.gpu_capable() { "on" } else { "off" },
            if render.audio_capable() { "on" } else { "off" }
        );

        let tray = match TrayManager::new() {
            Ok(tray) => Some(tray),
            Err(e) => {
                warn!("Tray icon unavailable: {:#}", e);
                None
            }
        };

        let monitors = monitors::enumerate();
        let target = monitors::resolve(&monitors, settings.monitor_device.as_deref());

        let mut state = Self {
            store,
            render,
            monitors,
            target,
            placement: None,
            overlay: None,
            panel: None,
            tray,
            font: FontCache::new(&settings.font_family),
            running: true,
        };

        // First block before the window exists so it opens at its final size
        let screen = Screen {
            target: &state.target,
            monitors: &state.monitors,
        };
        state.render.tick(&settings, &screen);
        let placement = state.compute_placement();
        state.placement = Some(placement);

        let (id, open) = window::open(overlay_settings(placement));
        state.overlay = Some(id);
        (state, open.map(Message::OverlayOpened))
    }

    pub fn title(&self, id: window::Id) -> String {
        if self.is_panel(id) {
            "deskstat Settings".to_string()
        } else {
            "deskstat".to_string()
        }
    }

    pub fn theme(&self, id: window::Id) -> Theme {
        if self.is_panel(id) {
            styles::panel_theme()
        } else {
            styles::overlay_theme()
        }
    }

    fn is_panel(&self, id: window::Id) -> bool {
        self.panel.as_ref().is_some_and(|(panel_id, _)| *panel_id == id)
    }

    fn settings(&self) -> &Settings {
        self.store.settings()
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                if !self.running {
                    return Task::none();
                }
                self.refresh_monitors();
                let settings = self.store.settings();
                let screen = Screen {
                    target: &self.target,
                    monitors: &self.monitors,
                };
                match self.render.tick(settings, &screen) {
                    TickOutcome::Rendered => self.replace(),
                    TickOutcome::Skipped => Task::none(),
                }
            }
            Message::AudioTick => {
                if !self.running {
                    return Task::none();
                }
                let settings = self.store.settings();
                let screen = Screen {
                    target: &self.target,
                    monitors: &self.monitors,
                };
                match self.render.audio_tick(settings, &screen) {
                    TickOutcome::Rendered => self.replace(),
                    TickOutcome::Skipped => Task::none(),
                }
            }
            Message::Tray(TrayEvent::OpenSettings) => self.open_panel(),
            Message::Tray(TrayEvent::Exit) => self.exit(),
            Message::OverlayOpened(id) => {
                debug!("Overlay window opened");
                window::enable_mouse_passthrough(id)
            }
            Message::SettingsOpened(_) => {
                debug!("Settings window opened");
                Task::none()
            }
            Message::WindowClosed(id) => {
                if self.is_panel(id) {
                    self.panel = None;
                    Task::none()
                } else if self.overlay == Some(id) {
                    warn!("Overlay window closed, exiting");
                    self.overlay = None;
                    self.exit()
                } else {
                    Task::none()
                }
            }
            Message::Panel(message) => self.update_panel(message),
        }
    }

    fn update_panel(&mut self, message: PanelMessage) -> Task<Message> {
        let Some((id, panel)) = self.panel.as_mut() else {
            return Task::none();
        };
        match panel.update(message) {
            PanelAction::None => Task::none(),
            PanelAction::Close => window::close(*id),
            PanelAction::Save => {
                let before = self.store.settings().clone();
                let rejected = self.store.apply_all(&panel.changes());
                panel.show_result(&rejected);
                self.settings_changed(&before)
            }
        }
    }

    /// Applies side effects of a settings write: audio capture, font, target
    /// monitor and placement
    fn settings_changed(&mut self, before: &Settings) -> Task<Message> {
        let settings = self.store.settings().clone();

        if settings.audio_enabled != before.audio_enabled {
            if settings.audio_enabled {
                info!("Audio visualizer enabled");
                self.render.set_audio(start_audio(settings.analyzer_config()));
            } else {
                info!("Audio visualizer disabled");
                self.render.stop_audio();
            }
        }

        self.font.refresh(&settings.font_family);
        self.target = monitors::resolve(&self.monitors, settings.monitor_device.as_deref());
        self.replace()
    }

    /// Re-enumerates monitors; the target is re-resolved when the layout changed
    fn refresh_monitors(&mut self) {
        let monitors = monitors::enumerate();
        if monitors != self.monitors {
            info!("Monitor layout changed, {} connected", monitors.len());
            self.monitors = monitors;
        }
        let target = monitors::resolve(&self.monitors, self.settings().monitor_device.as_deref());
        if target != self.target {
            info!("Overlay moves to {}", target.name);
            self.target = target;
        }
    }

    fn compute_placement(&self) -> Placement {
        let settings = self.settings();
        let block = self.render.block();
        let size = measure_block(block.longest_line(), block.line_count(), settings.font_size);
        place(
            settings.anchor,
            settings.margin_x,
            settings.margin_y,
            &self.target.logical_work_area(),
            size,
        )
    }

    /// Moves and resizes the overlay when its placement changed
    fn replace(&mut self) -> Task<Message> {
        let placement = self.compute_placement();
        if self.placement == Some(placement) {
            return Task::none();
        }
        self.placement = Some(placement);
        let Some(id) = self.overlay else {
            return Task::none();
        };
        debug!("Overlay placed at {:?}", placement.rect());
        Task::batch([
            window::resize(id, window_size(placement)),
            window::move_to(id, window_position(placement)),
        ])
    }

    fn open_panel(&mut self) -> Task<Message> {
        if let Some((id, _)) = &self.panel {
            return window::gain_focus(*id);
        }
        let panel = SettingsPanel::new(self.store.settings(), &self.monitors, &self.target, installed_families());
        let (id, open) = window::open(window::Settings {
            size: PANEL_SIZE,
            resizable: false,
            level: window::Level::AlwaysOnTop,
            ..Default::default()
        });
        self.panel = Some((id, panel));
        open.map(Message::SettingsOpened)
    }

    /// Stops the timers, releases audio and NVML, removes the tray icon and
    /// leaves the event loop, in that order
    fn exit(&mut self) -> Task<Message> {
        info!("Exiting");
        self.running = false;
        self.render.shutdown();
        self.tray = None;
        iced::exit()
    }

    pub fn view(&self, id: window::Id) -> Element<'_, Message> {
        if let Some((panel_id, panel)) = &self.panel {
            if *panel_id == id {
                return panel.view().map(Message::Panel);
            }
        }
        self.overlay_view()
    }

    fn overlay_view(&self) -> Element<'_, Message> {
        let settings = self.settings();
        let color = text_color(&settings.text_color);
        let align = match settings.text_align {
            TextAlign::Left => Alignment::Start,
            TextAlign::Right => Alignment::End,
        };

        let lines = self
            .render
            .block()
            .lines()
            .map(|line| self.overlay_line(line, settings.font_size, color));

        container(column(lines).align_x(align).width(Length::Fill))
            .padding(PADDING as u16)
            .width(Length::Fill)
            .height(Length::Fill)
            .style(styles::overlay_backdrop)
            .into()
    }

    fn overlay_line(&self, line: &Line, size: u16, color: iced::Color) -> Element<'_, Message> {
        let font = self.font.font;
        match line.level() {
            Some(level) => row![
                text(line.label_text()).font(font).size(size).color(color),
                text(format!(" {}", line.value_text()))
                    .font(font)
                    .size(size)
                    .color(level_color(level)),
            ]
            .into(),
            None => text(line.text()).font(font).size(size).color(color).into(),
        }
    }

    pub fn subscription(&self) -> Subscription<Message> {
        if !self.running {
            return Subscription::none();
        }
        let settings = self.settings();
        let mut subscriptions = vec![
            ticks(TickKind::Stats, settings.update_interval),
            window::close_events().map(Message::WindowClosed),
        ];
        // Keeps running one more round after disabling so the bars get cleared
        if settings.audio_enabled || !self.render.block().audio.is_empty() {
            subscriptions.push(ticks(TickKind::Audio, settings.audio_update_interval));
        }
        if let Some(tray) = &self.tray {
            subscriptions.push(tray.subscription().map(Message::Tray));
        }
        Subscription::batch(subscriptions)
    }
}

fn window_size(placement: Placement) -> Size {
    Size::new(placement.size.width as f32, placement.size.height as f32)
}

fn window_position(placement: Placement) -> Point {
    Point::new(placement.x as f32, placement.y as f32)
}

fn overlay_settings(placement: Placement) -> window::Settings {
    window::Settings {
        size: window_size(placement),
        position: window::Position::Specific(window_position(placement)),
        resizable: false,
        decorations: false,
        transparent: true,
        level: window::Level::AlwaysOnTop,
        exit_on_close_request: false,
        #[cfg(windows)]
        platform_specific: window::settings::PlatformSpecific {
            skip_taskbar: true,
            ..Default::default()
        },
        ..Default::default()
    }
}
