// Display enumeration and choosing the monitor the overlay lives on.
// Win32 geometry is in physical pixels; each monitor carries its DPI so the
// caller can convert to the logical units windows are placed in.

use crate::placement::Rect;

/// One display as reported by the OS
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Monitor {
    /// Device name, e.g. `\\.\DISPLAY1`; this is what `monitor_device` stores
    pub name: String,
    /// Full monitor rectangle in virtual-desktop coordinates
    pub bounds: Rect,
    /// Bounds minus the taskbar and docked toolbars
    pub work_area: Rect,
    pub primary: bool,
    /// Effective DPI; 96 is 100% scaling
    pub dpi: u32,
}

/// DPI at 100% display scaling
pub const BASE_DPI: u32 = 96;

impl Monitor {
    /// Display scaling factor, 1.5 at 150%
    pub fn scale(&self) -> f32 {
        // max(1) keeps a zero DPI from dividing into infinity
        self.dpi.max(1) as f32 / BASE_DPI as f32
    }

    /// Work area in the logical units iced positions and sizes windows in.
    /// Win32 reports monitor geometry in physical pixels.
    pub fn logical_work_area(&self) -> Rect {
        self.work_area.to_logical(self.scale())
    }
}

/// Used when enumeration returns nothing or isn't supported
pub fn fallback_monitor() -> Monitor {
    // Common 1080p desktop; off Windows this is the only monitor there is
    let rect = Rect::new(0, 0, 1920, 1080);
    Monitor {
        name: "Primary".to_string(),
        bounds: rect,
        work_area: rect,
        primary: true,
        dpi: BASE_DPI,
    }
}

/// The monitor to draw on: the configured device if it is connected, else the
/// primary, else the first one, else [`fallback_monitor`]
pub fn resolve(monitors: &[Monitor], device: Option<&str>) -> Monitor {
    device
        .and_then(|name| find_by_name(monitors, name))
        .or_else(|| monitors.iter().find(|m| m.primary))
        .or_else(|| monitors.first())
        .cloned()
        .unwrap_or_else(fallback_monitor)
}

pub fn find_by_name<'a>(monitors: &'a [Monitor], name: &str) -> Option<&'a Monitor> {
    monitors.iter().find(|m| m.name == name)
}

/// Monitor whose bounds contain the point
pub fn monitor_at(monitors: &[Monitor], x: i32, y: i32) -> Option<&Monitor> {
    monitors.iter().find(|m| m.bounds.contains(x, y))
}

/// Currently connected monitors; never empty
pub fn enumerate() -> Vec<Monitor> {
    let monitors = platform::enumerate();
    if monitors.is_empty() {
        log::debug!("Monitor enumeration returned nothing, using fallback geometry");
        return vec![fallback_monitor()];
    }
    monitors
}

#[cfg(windows)]
mod platform {
    use super::{Monitor, BASE_DPI};
    use crate::placement::Rect;
    use windows::Win32::Foundation::{BOOL, LPARAM, RECT};
    use windows::Win32::Graphics::Gdi::{EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFO, MONITORINFOEXW};
    use windows::Win32::UI::HiDpi::{GetDpiForMonitor, MDT_EFFECTIVE_DPI};

    const MONITORINFOF_PRIMARY: u32 = 1;

    // EnumDisplayMonitors callback; `data` points at the Vec being filled
    unsafe extern "system" fn collect(monitor: HMONITOR, _hdc: HDC, _clip: *mut RECT, data: LPARAM) -> BOOL {
        let handles = &mut *(data.0 as *mut Vec<HMONITOR>);
        handles.push(monitor);
        // Non-zero continues the enumeration
        BOOL(1)
    }

    /// Effective DPI of the monitor; falls back to 100% when the query fails
    fn dpi_of(monitor: HMONITOR) -> u32 {
        let (mut dpi_x, mut dpi_y) = (0u32, 0u32);
        // SAFETY: both out pointers are valid locals
        match unsafe { GetDpiForMonitor(monitor, MDT_EFFECTIVE_DPI, &mut dpi_x, &mut dpi_y) } {
            Ok(()) if dpi_x > 0 => dpi_x,
            Ok(()) => BASE_DPI,
            Err(e) => {
                log::debug!("GetDpiForMonitor failed: {}", e);
                BASE_DPI
            }
        }
    }

    fn to_rect(r: &RECT) -> Rect {
        Rect::from_edges(r.left, r.top, r.right, r.bottom)
    }

    pub fn enumerate() -> Vec<Monitor> {
        let mut handles: Vec<HMONITOR> = Vec::new();
        // SAFETY: the callback only runs during this call and `handles` outlives it
        let ok = unsafe {
            EnumDisplayMonitors(
                HDC::default(),
                None,
                Some(collect),
                LPARAM(&mut handles as *mut Vec<HMONITOR> as isize),
            )
        };
        if !ok.as_bool() {
            log::warn!("EnumDisplayMonitors failed");
        }

        let mut monitors = Vec::with_capacity(handles.len());
        for handle in handles {
            let mut info = MONITORINFOEXW::default();
            info.monitorInfo.cbSize = std::mem::size_of::<MONITORINFOEXW>() as u32;
            // SAFETY: cbSize tells the API it may fill the extended struct
            let ok = unsafe { GetMonitorInfoW(handle, &mut info as *mut MONITORINFOEXW as *mut MONITORINFO) };
            // Monitor unplugged between the two calls
            if !ok.as_bool() {
                continue;
            }
            // szDevice is a fixed UTF-16 buffer terminated by the first NUL
            let len = info.szDevice.iter().position(|c| *c == 0).unwrap_or(info.szDevice.len());
            monitors.push(Monitor {
                name: String::from_utf16_lossy(&info.szDevice[..len]),
                bounds: to_rect(&info.monitorInfo.rcMonitor),
                work_area: to_rect(&info.monitorInfo.rcWork),
                primary: info.monitorInfo.dwFlags & MONITORINFOF_PRIMARY != 0,
                dpi: dpi_of(handle),
            });
        }
        monitors
    }
}

#[cfg(not(windows))]
mod platform {
    use super::Monitor;

    pub fn enumerate() -> Vec<Monitor> {
        Vec::new()
    }
}
