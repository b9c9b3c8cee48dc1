//! Region-of-interest selection.
//!
//! `RoiSelector` turns pointer-drag gestures (already mapped into image
//! coordinates) into a committed rectangle. `ViewportMapper` performs that
//! mapping: it inverts the aspect-fit scaling and letterbox centering a
//! display surface applies when presenting a frame, so pointer events arrive
//! here in image-pixel space.
//!
//! Ownership rule: the selector owns the committed ROI. The orchestrator and
//! filter chain read it through `get_roi()` and never mutate it.

/// Minimum committed ROI edge length, in pixels. Drags smaller than this in
/// either axis are discarded on finish.
pub const MIN_ROI_EDGE: u32 = 10;

/// A committed selection rectangle in image-pixel coordinates.
///
/// Invariant once committed: `x1 <= x2`, `y1 <= y2`, and both edges are at
/// least [`MIN_ROI_EDGE`] long.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Roi {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl Roi {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    Selecting,
    Selected,
}

/// ROI selection state machine: `Idle -> Selecting -> Selected -> Idle`.
#[derive(Debug)]
pub struct RoiSelector {
    state: SelectionState,
    start: (u32, u32),
    end: (u32, u32),
    roi: Option<Roi>,
}

impl Default for RoiSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl RoiSelector {
    pub fn new() -> Self {
        Self {
            state: SelectionState::Idle,
            start: (0, 0),
            end: (0, 0),
            roi: None,
        }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    /// Begins a drag at `point`. Valid from any state; a previously committed
    /// ROI is discarded.
    pub fn start_selection(&mut self, point: (u32, u32)) {
        self.state = SelectionState::Selecting;
        self.start = point;
        self.end = point;
        self.roi = None;
    }

    /// Moves the drag endpoint. Ignored unless a drag is in progress.
    pub fn update_selection(&mut self, point: (u32, u32)) {
        if self.state == SelectionState::Selecting {
            self.end = point;
        }
    }

    /// Ends the drag, normalizing the endpoints into a rectangle.
    ///
    /// If the rectangle is narrower or shorter than [`MIN_ROI_EDGE`] the
    /// selection is silently discarded and the selector returns to `Idle`;
    /// an accidental click is not an error.
    pub fn finish_selection(&mut self) {
        if self.state != SelectionState::Selecting {
            return;
        }
        let x1 = self.start.0.min(self.end.0);
        let y1 = self.start.1.min(self.end.1);
        let x2 = self.start.0.max(self.end.0);
        let y2 = self.start.1.max(self.end.1);

        if x2 - x1 < MIN_ROI_EDGE || y2 - y1 < MIN_ROI_EDGE {
            self.state = SelectionState::Idle;
            self.roi = None;
            return;
        }

        self.roi = Some(Roi { x1, y1, x2, y2 });
        self.state = SelectionState::Selected;
    }

    /// Discards any selection, committed or in progress.
    pub fn clear_selection(&mut self) {
        self.state = SelectionState::Idle;
        self.roi = None;
    }

    /// The committed ROI, present only in `Selected`.
    pub fn get_roi(&self) -> Option<Roi> {
        match self.state {
            SelectionState::Selected => self.roi,
            _ => None,
        }
    }

    /// The rectangle to draw while a drag is live or committed: normalized
    /// endpoints without the minimum-size rule applied.
    pub fn display_rect(&self) -> Option<(u32, u32, u32, u32)> {
        match self.state {
            SelectionState::Idle => None,
            SelectionState::Selecting | SelectionState::Selected => Some((
                self.start.0.min(self.end.0),
                self.start.1.min(self.end.1),
                self.start.0.max(self.end.0),
                self.start.1.max(self.end.1),
            )),
        }
    }
}

/// Maps pointer positions on a display surface back into image pixels.
///
/// The display sink presents frames aspect-fit: the image is scaled uniformly
/// to fit the surface and centered, leaving letterbox bars when the aspect
/// ratios differ. This mapper inverts that transform. X and Y are handled
/// with independent scale factors derived from the rendered content size, and
/// results are clamped to `[0, width-1] x [0, height-1]`.
#[derive(Clone, Copy, Debug)]
pub struct ViewportMapper {
    image_w: u32,
    image_h: u32,
    rendered_w: f64,
    rendered_h: f64,
    offset_x: f64,
    offset_y: f64,
}

impl ViewportMapper {
    pub fn new(image_size: (u32, u32), display_size: (u32, u32)) -> Self {
        let (iw, ih) = (image_size.0.max(1), image_size.1.max(1));
        let (dw, dh) = (display_size.0.max(1) as f64, display_size.1.max(1) as f64);
        let scale = (dw / iw as f64).min(dh / ih as f64);
        let rendered_w = iw as f64 * scale;
        let rendered_h = ih as f64 * scale;
        Self {
            image_w: iw,
            image_h: ih,
            rendered_w,
            rendered_h,
            offset_x: (dw - rendered_w) / 2.0,
            offset_y: (dh - rendered_h) / 2.0,
        }
    }

    /// Converts a display-space point to a clamped image-space pixel.
    pub fn to_image(&self, display_x: f64, display_y: f64) -> (u32, u32) {
        let sx = self.image_w as f64 / self.rendered_w;
        let sy = self.image_h as f64 / self.rendered_h;
        let ix = (display_x - self.offset_x) * sx;
        let iy = (display_y - self.offset_y) * sy;
        (
            (ix.floor().max(0.0) as u32).min(self.image_w - 1),
            (iy.floor().max(0.0) as u32).min(self.image_h - 1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_commits_normalized_roi() {
        let mut sel = RoiSelector::new();
        sel.start_selection((10, 10));
        sel.update_selection((50, 50));
        sel.finish_selection();
        assert_eq!(sel.state(), SelectionState::Selected);
        assert_eq!(
            sel.get_roi(),
            Some(Roi {
                x1: 10,
                y1: 10,
                x2: 50,
                y2: 50
            })
        );
    }

    #[test]
    fn reversed_drag_normalizes_endpoints() {
        let mut sel = RoiSelector::new();
        sel.start_selection((80, 90));
        sel.update_selection((20, 30));
        sel.finish_selection();
        let roi = sel.get_roi().unwrap();
        assert!(roi.x1 <= roi.x2 && roi.y1 <= roi.y2);
        assert_eq!((roi.x1, roi.y1, roi.x2, roi.y2), (20, 30, 80, 90));
    }

    #[test]
    fn tiny_drag_is_discarded() {
        let mut sel = RoiSelector::new();
        sel.start_selection((10, 10));
        sel.update_selection((12, 12));
        sel.finish_selection();
        assert_eq!(sel.state(), SelectionState::Idle);
        assert_eq!(sel.get_roi(), None);
    }

    #[test]
    fn thin_drag_is_discarded_even_when_long() {
        let mut sel = RoiSelector::new();
        sel.start_selection((0, 0));
        sel.update_selection((200, 4));
        sel.finish_selection();
        assert_eq!(sel.get_roi(), None);
    }

    #[test]
    fn clear_returns_to_idle_from_any_state() {
        let mut sel = RoiSelector::new();
        sel.clear_selection();
        assert_eq!(sel.state(), SelectionState::Idle);

        sel.start_selection((0, 0));
        sel.clear_selection();
        assert_eq!(sel.state(), SelectionState::Idle);
        assert_eq!(sel.get_roi(), None);

        sel.start_selection((0, 0));
        sel.update_selection((40, 40));
        sel.finish_selection();
        assert_eq!(sel.state(), SelectionState::Selected);
        sel.clear_selection();
        assert_eq!(sel.state(), SelectionState::Idle);
        assert_eq!(sel.get_roi(), None);
    }

    #[test]
    fn restart_discards_committed_roi() {
        let mut sel = RoiSelector::new();
        sel.start_selection((0, 0));
        sel.update_selection((40, 40));
        sel.finish_selection();
        assert!(sel.get_roi().is_some());

        sel.start_selection((5, 5));
        assert_eq!(sel.state(), SelectionState::Selecting);
        assert_eq!(sel.get_roi(), None);
    }

    #[test]
    fn update_is_ignored_outside_selecting() {
        let mut sel = RoiSelector::new();
        sel.update_selection((99, 99));
        assert_eq!(sel.state(), SelectionState::Idle);

        sel.start_selection((0, 0));
        sel.update_selection((40, 40));
        sel.finish_selection();
        sel.update_selection((99, 99));
        assert_eq!(
            sel.get_roi(),
            Some(Roi {
                x1: 0,
                y1: 0,
                x2: 40,
                y2: 40
            })
        );
    }

    #[test]
    fn identity_mapping_when_sizes_match() {
        let mapper = ViewportMapper::new((640, 480), (640, 480));
        assert_eq!(mapper.to_image(0.0, 0.0), (0, 0));
        assert_eq!(mapper.to_image(100.0, 200.0), (100, 200));
        assert_eq!(mapper.to_image(639.0, 479.0), (639, 479));
    }

    #[test]
    fn mapping_clamps_to_image_bounds() {
        let mapper = ViewportMapper::new((640, 480), (640, 480));
        assert_eq!(mapper.to_image(-20.0, -5.0), (0, 0));
        assert_eq!(mapper.to_image(5000.0, 5000.0), (639, 479));
    }

    #[test]
    fn letterboxed_mapping_accounts_for_centering() {
        // 640x480 image on a 1280x480 surface: rendered 640x480 centered with
        // 320px bars left and right.
        let mapper = ViewportMapper::new((640, 480), (1280, 480));
        assert_eq!(mapper.to_image(320.0, 0.0), (0, 0));
        assert_eq!(mapper.to_image(320.0 + 100.0, 240.0), (100, 240));
        // Clicks inside the left bar clamp to column zero.
        assert_eq!(mapper.to_image(10.0, 240.0), (0, 240));
    }

    #[test]
    fn scaled_mapping_inverts_uniform_scale() {
        // Image shown at half size.
        let mapper = ViewportMapper::new((640, 480), (320, 240));
        assert_eq!(mapper.to_image(160.0, 120.0), (320, 240));
    }
}
