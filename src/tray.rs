//! Notification-area icon with the overlay's two actions.
//!
//! The icon is drawn in code (a ring with a green cross) so no image asset is
//! needed. Menu clicks are queued by the tray library; [`TrayManager::subscription`]
//! drains that queue on the iced executor and turns clicks into [`TrayEvent`]s.
//! Outside Windows there is no tray and the subscription never fires.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayEvent {
    OpenSettings,
    Exit,
}

pub const ICON_SIZE: u32 = 32;

const RING_RGBA: [u8; 4] = [255, 255, 255, 200];
const CROSS_RGBA: [u8; 4] = [0, 200, 0, 220];

/// RGBA pixels of a square `size` x `size` icon
pub fn icon_rgba(size: u32) -> Vec<u8> {
    let s = size as f32;
    let center = s / 2.0;
    let ring_outer = s * 0.375;
    let ring_inner = ring_outer - (s * 3.0 / 64.0).max(1.0);
    let arm = s * 12.0 / 64.0;
    let half_stroke = (s * 2.0 / 64.0).max(0.5);

    let mut pixels = vec![0u8; (size * size * 4) as usize];
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 + 0.5 - center;
            let dy = y as f32 + 0.5 - center;
            let on_cross = (dx.abs() <= half_stroke && dy.abs() <= arm) || (dy.abs() <= half_stroke && dx.abs() <= arm);
            let dist = (dx * dx + dy * dy).sqrt();
            let color = if on_cross {
                CROSS_RGBA
            } else if dist >= ring_inner && dist <= ring_outer {
                RING_RGBA
            } else {
                continue;
            };
            let i = ((y * size + x) * 4) as usize;
            pixels[i..i + 4].copy_from_slice(&color);
        }
    }
    pixels
}

#[cfg(windows)]
mod platform {
    use super::{icon_rgba, TrayEvent, ICON_SIZE};
    use anyhow::{Context, Result};
    use iced_futures::stream;
    use log::{debug, info};
    use tray_icon::menu::{Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem};
    use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

    /// How often queued menu clicks are checked
    const POLL_INTERVAL_MS: u64 = 100;

    #[derive(Clone)]
    struct MenuIds {
        settings: MenuId,
        exit: MenuId,
    }

    impl MenuIds {
        fn classify(&self, id: &MenuId) -> Option<TrayEvent> {
            if *id == self.settings {
                Some(TrayEvent::OpenSettings)
            } else if *id == self.exit {
                Some(TrayEvent::Exit)
            } else {
                None
            }
        }
    }

    /// Owns the tray icon; dropping it removes the icon from the taskbar
    pub struct TrayManager {
        _icon: TrayIcon,
        ids: MenuIds,
    }

    impl TrayManager {
        /// Must run on the thread that pumps window messages
        pub fn new() -> Result<Self> {
            let menu = Menu::new();
            let settings_item = MenuItem::new("Open Settings", true, None);
            let exit_item = MenuItem::new("Exit", true, None);
            menu.append(&settings_item).context("Failed to build tray menu")?;
            menu.append(&PredefinedMenuItem::separator())
                .context("Failed to build tray menu")?;
            menu.append(&exit_item).context("Failed to build tray menu")?;

            let icon = Icon::from_rgba(icon_rgba(ICON_SIZE), ICON_SIZE, ICON_SIZE).context("Invalid tray icon")?;
            let tray = TrayIconBuilder::new()
                .with_menu(Box::new(menu))
                .with_tooltip("deskstat")
                .with_icon(icon)
                .build()
                .context("Failed to create tray icon")?;
            info!("Tray icon created");

            Ok(Self {
                _icon: tray,
                ids: MenuIds {
                    settings: settings_item.id().clone(),
                    exit: exit_item.id().clone(),
                },
            })
        }

        pub fn subscription(&self) -> iced::Subscription<TrayEvent> {
            let ids = self.ids.clone();
            let stream = stream::channel(16, move |mut sender| async move {
                let receiver = MenuEvent::receiver();
                loop {
                    while let Ok(event) = receiver.try_recv() {
                        if let Some(tray_event) = ids.classify(&event.id) {
                            debug!("Tray event: {:?}", tray_event);
                            let _ = sender.try_send(tray_event);
                        }
                    }
                    tokio::time::sleep(std::time::Duration::from_millis(POLL_INTERVAL_MS)).await;
                }
            });
            iced::Subscription::run_with_id("tray-menu", stream)
        }
    }

    impl Drop for TrayManager {
        fn drop(&mut self) {
            debug!("Removing tray icon");
        }
    }
}

#[cfg(not(windows))]
mod platform {
    use super::TrayEvent;
    use anyhow::Result;

    /// No notification area integration on this platform
    pub struct TrayManager;

    impl TrayManager {
        pub fn new() -> Result<Self> {
            log::info!("Tray icon not supported on this platform");
            Ok(Self)
        }

        pub fn subscription(&self) -> iced::Subscription<TrayEvent> {
            iced::Subscription::none()
        }
    }
}

pub use platform::TrayManager;

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(pixels: &[u8], size: u32, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * size + x) * 4) as usize;
        [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
    }

    #[test]
    fn test_icon_layout() {
        let pixels = icon_rgba(ICON_SIZE);
        assert_eq!(pixels.len(), (ICON_SIZE * ICON_SIZE * 4) as usize);
        // Cross at the center, transparent corners, ring near the top edge
        assert_eq!(pixel(&pixels, ICON_SIZE, 16, 16), CROSS_RGBA);
        assert_eq!(pixel(&pixels, ICON_SIZE, 0, 0), [0, 0, 0, 0]);
        assert_eq!(pixel(&pixels, ICON_SIZE, 15, 4), RING_RGBA);
        // Gap between the cross arms and the ring
        assert_eq!(pixel(&pixels, ICON_SIZE, 16, 7), [0, 0, 0, 0]);
    }
}
