/// Scroll offsets for a viewport over content measured in terminal cells.
///
/// Offsets are kept within `content - viewport` on both axes after every mutation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewportState {
    pub x: u32,
    pub y: u32,
    pub viewport_w: u16,
    pub viewport_h: u16,
    pub content_w: u32,
    pub content_h: u32,
}

impl ViewportState {
    pub fn set_viewport(&mut self, w: u16, h: u16) {
        self.viewport_w = w;
        self.viewport_h = h;
        self.clamp();
    }

    pub fn set_content(&mut self, w: u32, h: u32) {
        self.content_w = w;
        self.content_h = h;
        self.clamp();
    }

    pub fn clamp(&mut self) {
        self.y = self.y.min(self.max_y());
        self.x = self.x.min(self.max_x());
    }

    pub fn scroll_y_by(&mut self, delta: i32) {
        self.y = offset_by(self.y, delta, self.max_y());
    }

    pub fn scroll_x_by(&mut self, delta: i32) {
        self.x = offset_by(self.x, delta, self.max_x());
    }

    pub fn page_down(&mut self) {
        self.scroll_y_by(i32::from(self.viewport_h.saturating_sub(1)));
    }

    pub fn page_up(&mut self) {
        self.scroll_y_by(-i32::from(self.viewport_h.saturating_sub(1)));
    }

    pub fn to_top(&mut self) {
        self.y = 0;
    }

    pub fn to_bottom(&mut self) {
        self.y = self.max_y();
    }

    /// Scrolls the minimum amount needed for `line` to be visible.
    pub fn ensure_line_visible(&mut self, line: u32) {
        if line < self.y {
            self.y = line;
        } else if self.viewport_h > 0 && line >= self.y + u32::from(self.viewport_h) {
            self.y = line + 1 - u32::from(self.viewport_h);
        }
        self.clamp();
    }

    pub fn max_y(&self) -> u32 {
        self.content_h.saturating_sub(u32::from(self.viewport_h))
    }

    pub fn max_x(&self) -> u32 {
        self.content_w.saturating_sub(u32::from(self.viewport_w))
    }
}

fn offset_by(current: u32, delta: i32, max: u32) -> u32 {
    let next = i64::from(current) + i64::from(delta);
    next.clamp(0, i64::from(max)) as u32
}
