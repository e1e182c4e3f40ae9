// Fullscreen detection for pause-on-foreground
use crate::monitors::{monitor_at, Monitor};
use crate::placement::Rect;

/// Pixels a window edge may be off and still count as covering the monitor
pub const FULLSCREEN_TOLERANCE: i32 = 8;

/// Reports the rectangle of the window that currently has input focus
pub trait ForegroundProbe {
    fn foreground_rect(&self) -> Option<Rect>;
}

/// Queries the real desktop
#[derive(Debug, Default)]
pub struct DesktopForeground;

impl ForegroundProbe for DesktopForeground {
    #[cfg(windows)]
    fn foreground_rect(&self) -> Option<Rect> {
        use windows::Win32::Foundation::RECT;
        use windows::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowRect};

        // SAFETY: plain Win32 queries on a handle we only read from
        unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd.0 == 0 {
                return None;
            }
            let mut rect = RECT::default();
            GetWindowRect(hwnd, &mut rect).ok()?;
            Some(Rect::from_edges(rect.left, rect.top, rect.right, rect.bottom))
        }
    }

    #[cfg(not(windows))]
    fn foreground_rect(&self) -> Option<Rect> {
        None
    }
}

/// Every edge of `window` within the tolerance of the matching edge of `bounds`
pub fn covers(window: &Rect, bounds: &Rect) -> bool {
    (window.x - bounds.x).abs() <= FULLSCREEN_TOLERANCE
        && (window.y - bounds.y).abs() <= FULLSCREEN_TOLERANCE
        && (window.right() - bounds.right()).abs() <= FULLSCREEN_TOLERANCE
        && (window.bottom() - bounds.bottom()).abs() <= FULLSCREEN_TOLERANCE
}

/// True when the focused window is fullscreen on the overlay's monitor.
/// A fullscreen window on another monitor doesn't count.
pub fn is_fullscreen_on(window: Option<Rect>, target: &Monitor, monitors: &[Monitor]) -> bool {
    let Some(window) = window else {
        return false;
    };
    let (cx, cy) = window.center();
    let on_target = monitor_at(monitors, cx, cy).is_some_and(|m| m.name == target.name);
    on_target && (covers(&window, &target.bounds) || covers(&window, &target.work_area))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitors() -> Vec<Monitor> {
        vec![
            Monitor {
                name: "DISPLAY1".to_string(),
                bounds: Rect::new(0, 0, 1920, 1080),
                work_area: Rect::new(0, 0, 1920, 1040),
                primary: true,
                dpi: 96,
            },
            Monitor {
                name: "DISPLAY2".to_string(),
                bounds: Rect::new(1920, 0, 1920, 1080),
                work_area: Rect::new(1920, 0, 1920, 1040),
                primary: false,
                dpi: 96,
            },
        ]
    }

    #[test]
    fn test_no_foreground_window() {
        let list = monitors();
        assert!(!is_fullscreen_on(None, &list[0], &list));
    }

    #[test]
    fn test_fullscreen_on_same_monitor() {
        let list = monitors();
        // Borderless windows often overhang by a few pixels
        let game = Rect::new(-4, -4, 1928, 1088);
        assert!(is_fullscreen_on(Some(game), &list[0], &list));
        // Maximized window fills the work area
        let maximized = Rect::new(0, 0, 1920, 1040);
        assert!(is_fullscreen_on(Some(maximized), &list[0], &list));
    }

    #[test]
    fn test_fullscreen_on_other_monitor_does_not_pause() {
        let list = monitors();
        let game = Rect::new(1920, 0, 1920, 1080);
        assert!(!is_fullscreen_on(Some(game), &list[0], &list));
        assert!(is_fullscreen_on(Some(game), &list[1], &list));
    }

    #[test]
    fn test_windowed_app_does_not_pause() {
        let list = monitors();
        let editor = Rect::new(100, 100, 1200, 800);
        assert!(!is_fullscreen_on(Some(editor), &list[0], &list));
        let almost = Rect::new(0, 0, 1920, 1060);
        assert!(!is_fullscreen_on(Some(almost), &list[0], &list));
    }
}
