// Overlay geometry: rectangles, the estimated size of the text block and
// where the block goes on the target monitor.
// Everything here is in whatever unit the caller passes; State hands in the
// logical work area so the result can go straight to iced.

use crate::settings::Anchor;

/// Screen rectangle in pixels; `x`/`y` is the top-left corner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Half-open: the right and bottom edges belong to the neighbour
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Physical pixels to logical units at `scale` (1.5 on a 150% display).
    /// Edges round inward so scaling the result back up never leaves `self`.
    pub fn to_logical(&self, scale: f32) -> Rect {
        // A bad DPI reading leaves the geometry untouched
        if scale <= 0.0 || !scale.is_finite() {
            return *self;
        }
        let inward = |edge: i32, round: fn(f32) -> f32| round(edge as f32 / scale) as i32;
        Rect::from_edges(
            inward(self.x, f32::ceil),
            inward(self.y, f32::ceil),
            inward(self.right(), f32::floor),
            inward(self.bottom(), f32::floor),
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

/// Where the overlay window goes and how big it is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub size: Size,
}

impl Placement {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.size.width, self.size.height)
    }
}

/// Character width and line height as fractions of the font size.
/// Consolas and most other monospace faces advance about 0.55 to 0.6 em.
const CHAR_WIDTH_RATIO: f32 = 0.6;
const LINE_HEIGHT_RATIO: f32 = 1.3;

/// Space around the text inside the overlay window
pub const PADDING: i32 = 8;

/// Estimated pixel size of `lines` lines whose longest has `longest_chars`
/// characters, assuming a monospace font
pub fn measure_block(longest_chars: usize, lines: usize, font_size: u16) -> Size {
    let font = font_size as f32;
    // Rounded once per axis so the size doesn't jitter between ticks
    Size {
        width: (longest_chars as f32 * CHAR_WIDTH_RATIO * font).round() as i32 + 2 * PADDING,
        height: (lines as f32 * LINE_HEIGHT_RATIO * font).round() as i32 + 2 * PADDING,
    }
}

/// Top-left position of a `block` anchored to a corner of `area`, with the
/// margins applied inward from that corner.
///
/// Text alignment is not an input: it only justifies lines inside the block.
/// A block too big for the area starts at the top/left margin.
pub fn place(anchor: Anchor, margin_x: i32, margin_y: i32, area: &Rect, block: Size) -> Placement {
    // Smallest position that still respects the margins
    let left = area.x + margin_x;
    let top = area.y + margin_y;

    // Right/bottom anchors measure from the far edge, but never past left/top
    let x = if anchor.is_right() {
        (area.right() - margin_x - block.width).max(left)
    } else {
        left
    };
    let y = if anchor.is_bottom() {
        (area.bottom() - margin_y - block.height).max(top)
    } else {
        top
    };

    Placement { x, y, size: block }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitors::Monitor;
    use proptest::prelude::*;

    const AREA: Rect = Rect::new(0, 0, 1920, 1040);

    #[test]
    fn test_corners() {
        let block = Size { width: 300, height: 200 };
        assert_eq!(place(Anchor::TopLeft, 10, 20, &AREA, block).rect(), Rect::new(10, 20, 300, 200));
        assert_eq!(place(Anchor::TopRight, 10, 20, &AREA, block).rect(), Rect::new(1610, 20, 300, 200));
        assert_eq!(place(Anchor::BottomLeft, 10, 20, &AREA, block).rect(), Rect::new(10, 820, 300, 200));
        assert_eq!(place(Anchor::BottomRight, 10, 20, &AREA, block).rect(), Rect::new(1610, 820, 300, 200));
    }

    #[test]
    fn test_secondary_monitor_offset() {
        // Monitor left of the primary has negative coordinates
        let area = Rect::new(-1280, 0, 1280, 984);
        let p = place(Anchor::TopRight, 12, 12, &area, Size { width: 200, height: 100 });
        assert_eq!((p.x, p.y), (-212, 12));
    }

    #[test]
    fn test_oversized_block_clamps_to_margin() {
        let area = Rect::new(0, 0, 400, 300);
        let p = place(Anchor::BottomRight, 12, 12, &area, Size { width: 800, height: 600 });
        assert_eq!((p.x, p.y), (12, 12));
    }

    #[test]
    fn test_measure_block() {
        let size = measure_block(40, 10, 10);
        assert_eq!(size, Size { width: 240 + 2 * PADDING, height: 130 + 2 * PADDING });
        assert_eq!(measure_block(0, 0, 12), Size { width: 2 * PADDING, height: 2 * PADDING });
    }

    #[test]
    fn test_rect_helpers() {
        let rect = Rect::from_edges(-1920, 0, 0, 1080);
        assert_eq!(rect.width, 1920);
        assert!(rect.contains(-1, 1079));
        assert!(!rect.contains(0, 0));
        assert_eq!(rect.center(), (-960, 540));
    }

    #[test]
    fn test_to_logical_rounds_inward() {
        assert_eq!(Rect::new(-2880, 0, 2880, 1560).to_logical(1.5), Rect::new(-1920, 0, 1920, 1040));
        assert_eq!(Rect::new(1, 1, 10, 10).to_logical(2.0), Rect::new(1, 1, 4, 4));
        assert_eq!(AREA.to_logical(1.0), AREA);
    }

    #[test]
    fn test_scaled_monitor_keeps_block_on_screen() {
        // 150% scaling: Win32 geometry is physical, window positions are logical
        let monitor = Monitor {
            name: "DISPLAY1".to_string(),
            bounds: Rect::new(0, 0, 1920, 1080),
            work_area: Rect::new(0, 0, 1920, 1040),
            primary: true,
            dpi: 144,
        };
        let scale = monitor.scale();
        assert_eq!(scale, 1.5);
        let block = measure_block(45, 15, 12);

        for anchor in Anchor::ALL {
            let p = place(anchor, 12, 12, &monitor.logical_work_area(), block).rect();
            let physical = |v: i32| v as f32 * scale;
            let margin = physical(12);
            assert!(physical(p.x) >= margin, "{:?}", anchor);
            assert!(physical(p.y) >= margin, "{:?}", anchor);
            assert!(physical(p.right()) <= 1920.0 - margin, "{:?}", anchor);
            assert!(physical(p.bottom()) <= 1040.0 - margin, "{:?}", anchor);
        }
    }

    fn any_anchor() -> impl Strategy<Value = Anchor> {
        prop::sample::select(Anchor::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_block_stays_inside_margins(
            anchor in any_anchor(),
            x in -4000i32..4000,
            y in -2000i32..2000,
            width in 200i32..4000,
            height in 200i32..3000,
            margin_x in 0i32..100,
            margin_y in 0i32..100,
            block_w in 1i32..10_000,
            block_h in 1i32..10_000,
        ) {
            let area = Rect::new(x, y, width, height);
            let block = Size {
                width: block_w.min(width - 2 * margin_x),
                height: block_h.min(height - 2 * margin_y),
            };
            let p = place(anchor, margin_x, margin_y, &area, block).rect();
            prop_assert!(p.x >= area.x + margin_x);
            prop_assert!(p.y >= area.y + margin_y);
            prop_assert!(p.right() <= area.right() - margin_x);
            prop_assert!(p.bottom() <= area.bottom() - margin_y);
        }

        #[test]
        fn prop_logical_area_scales_back_inside(
            x in -6000i32..6000,
            y in -3000i32..3000,
            width in 1i32..6000,
            height in 1i32..4000,
            percent in prop::sample::select(vec![100u32, 125, 150, 175, 200, 250, 300]),
        ) {
            let physical = Rect::new(x, y, width, height);
            let scale = percent as f32 / 100.0;
            let logical = physical.to_logical(scale);
            prop_assert!(logical.x as f32 * scale >= physical.x as f32 - 0.01);
            prop_assert!(logical.y as f32 * scale >= physical.y as f32 - 0.01);
            prop_assert!(logical.right() as f32 * scale <= physical.right() as f32 + 0.01);
            prop_assert!(logical.bottom() as f32 * scale <= physical.bottom() as f32 + 0.01);
        }

        #[test]
        fn prop_oversized_never_leaves_top_left_margin(
            anchor in any_anchor(),
            margin in 0i32..100,
            extra in 1i32..5000,
        ) {
            let area = Rect::new(100, 50, 800, 600);
            let block = Size { width: 800 + extra, height: 600 + extra };
            let p = place(anchor, margin, margin, &area, block);
            prop_assert_eq!((p.x, p.y), (100 + margin, 50 + margin));
        }
    }
}
