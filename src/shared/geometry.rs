//! Rectangle and gravity primitives
//!
//! All coordinates are root-window coordinates in pixels. Sizes are signed so
//! that deltas and intermediate results of the constraint solver never wrap.

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
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

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// True if `inner` lies entirely within `self`
    pub fn contains_rect(&self, inner: &Rect) -> bool {
        inner.x >= self.x
            && inner.y >= self.y
            && inner.right() <= self.right()
            && inner.bottom() <= self.bottom()
    }

    /// True if a rect of `inner`'s size could fit inside `self`, ignoring position
    pub fn could_fit(&self, inner: &Rect) -> bool {
        self.width >= inner.width && self.height >= inner.height
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        !(self.right() <= other.x
            || other.right() <= self.x
            || self.bottom() <= other.y
            || other.bottom() <= self.y)
    }

    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right > x && bottom > y {
            Some(Rect::new(x, y, right - x, bottom - y))
        } else {
            None
        }
    }

    pub fn area(&self) -> i64 {
        i64::from(self.width.max(0)) * i64::from(self.height.max(0))
    }

    /// Grow a client rect into the outer frame rect
    pub fn expand_by(&self, insets: &FrameInsets) -> Rect {
        Rect {
            x: self.x - insets.left,
            y: self.y - insets.top,
            width: self.width + insets.horizontal(),
            height: self.height + insets.vertical(),
        }
    }

    /// Inverse of [`Rect::expand_by`]
    pub fn shrink_by(&self, insets: &FrameInsets) -> Rect {
        Rect {
            x: self.x + insets.left,
            y: self.y + insets.top,
            width: self.width - insets.horizontal(),
            height: self.height - insets.vertical(),
        }
    }

    pub fn size_eq(&self, other: &Rect) -> bool {
        self.width == other.width && self.height == other.height
    }

    pub fn position_eq(&self, other: &Rect) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{} {}x{}", self.x, self.y, self.width, self.height)
    }
}

/// Per-side width of the decoration surrounding a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameInsets {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl FrameInsets {
    pub const fn new(left: i32, right: i32, top: i32, bottom: i32) -> Self {
        Self { left, right, top, bottom }
    }

    pub fn horizontal(&self) -> i32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> i32 {
        self.top + self.bottom
    }
}

/// X11 window gravity
///
/// The discriminants are the wire values used by `WM_NORMAL_HINTS.win_gravity`
/// and `ChangeWindowAttributes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Gravity {
    #[default]
    NorthWest = 1,
    North = 2,
    NorthEast = 3,
    West = 4,
    Center = 5,
    East = 6,
    SouthWest = 7,
    South = 8,
    SouthEast = 9,
    Static = 10,
}

impl Gravity {
    pub const ALL: [Gravity; 10] = [
        Gravity::NorthWest,
        Gravity::North,
        Gravity::NorthEast,
        Gravity::West,
        Gravity::Center,
        Gravity::East,
        Gravity::SouthWest,
        Gravity::South,
        Gravity::SouthEast,
        Gravity::Static,
    ];

    /// Decode a wire value; ForgetGravity (0) and garbage fall back to NorthWest
    pub fn from_wire(value: u32) -> Self {
        match value {
            2 => Self::North,
            3 => Self::NorthEast,
            4 => Self::West,
            5 => Self::Center,
            6 => Self::East,
            7 => Self::SouthWest,
            8 => Self::South,
            9 => Self::SouthEast,
            10 => Self::Static,
            _ => Self::NorthWest,
        }
    }

    pub fn to_wire(self) -> u32 {
        self as u32
    }

    /// Horizontal reference offset into a width: 0, half, or all of it
    fn x_reference(self, width: i32, border_width: i32) -> i32 {
        match self {
            Self::North | Self::Center | Self::South => width / 2 + border_width,
            Self::NorthEast | Self::East | Self::SouthEast => width + border_width * 2,
            _ => 0,
        }
    }

    fn y_reference(self, height: i32, border_width: i32) -> i32 {
        match self {
            Self::West | Self::Center | Self::East => height / 2 + border_width,
            Self::SouthWest | Self::South | Self::SouthEast => height + border_width * 2,
            _ => 0,
        }
    }

    /// Offset from the reference point to the client's left edge
    fn x_placement(self, frame_width: i32, child_x: i32) -> i32 {
        match self {
            Self::Static => 0,
            Self::North | Self::Center | Self::South => child_x - frame_width / 2,
            Self::NorthEast | Self::East | Self::SouthEast => child_x - frame_width,
            _ => child_x,
        }
    }

    fn y_placement(self, frame_height: i32, child_y: i32) -> i32 {
        match self {
            Self::Static => 0,
            Self::West | Self::Center | Self::East => child_y - frame_height / 2,
            Self::SouthWest | Self::South | Self::SouthEast => child_y - frame_height,
            _ => child_y,
        }
    }
}

/// Offsets used by the gravity conversion in both directions
fn gravity_offsets(
    width: i32,
    height: i32,
    insets: Option<&FrameInsets>,
    border_width: i32,
    gravity: Gravity,
) -> (i32, i32) {
    let (child_x, child_y, frame_width, frame_height) = match insets {
        Some(i) => (i.left, i.top, i.left + width + i.right, i.top + height + i.bottom),
        None => (0, 0, width, height),
    };
    // StaticGravity coordinates already name the client corner
    if gravity == Gravity::Static {
        return (0, 0);
    }
    let dx = gravity.x_reference(width, border_width) + gravity.x_placement(frame_width, child_x);
    let dy = gravity.y_reference(height, border_width) + gravity.y_placement(frame_height, child_y);
    (dx, dy)
}

/// Convert a gravity-relative outer position into the client's top-left corner
///
/// `rect.x/y` name the reference point of the outer frame selected by
/// `gravity`; `rect.width/height` are the client size. Centring gravities use
/// integer division, so odd sizes round toward zero.
pub fn adjust_for_gravity(
    rect: Rect,
    insets: Option<&FrameInsets>,
    border_width: i32,
    gravity: Gravity,
) -> Rect {
    let (dx, dy) = gravity_offsets(rect.width, rect.height, insets, border_width, gravity);
    Rect { x: rect.x + dx, y: rect.y + dy, ..rect }
}

/// Inverse of [`adjust_for_gravity`]: the outer reference point for a client rect
pub fn gravity_reference_point(
    client: Rect,
    insets: Option<&FrameInsets>,
    border_width: i32,
    gravity: Gravity,
) -> (i32, i32) {
    let (dx, dy) = gravity_offsets(client.width, client.height, insets, border_width, gravity);
    (client.x - dx, client.y - dy)
}

/// Resize `old` to `new_width` x `new_height` keeping the edge or corner named
/// by `gravity` fixed
///
/// Centring gravities shave one pixel off odd size changes so that repeated
/// resizes never drift.
pub fn resize_with_gravity(old: &Rect, gravity: Gravity, new_width: i32, new_height: i32) -> Rect {
    let mut rect = *old;

    let mut width = new_width;
    rect.x = match gravity {
        Gravity::North | Gravity::Center | Gravity::South => {
            width -= (old.width - width) % 2;
            old.x + (old.width - width) / 2
        }
        Gravity::NorthEast | Gravity::East | Gravity::SouthEast => old.x + (old.width - width),
        _ => old.x,
    };
    rect.width = width;

    let mut height = new_height;
    rect.y = match gravity {
        Gravity::West | Gravity::Center | Gravity::East => {
            height -= (old.height - height) % 2;
            old.y + (old.height - height) / 2
        }
        Gravity::SouthWest | Gravity::South | Gravity::SouthEast => old.y + (old.height - height),
        _ => old.y,
    };
    rect.height = height;

    rect
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gravity_round_trip_is_exact() {
        let insets = FrameInsets::new(4, 4, 24, 4);
        let client = Rect::new(101, 57, 301, 199);
        for gravity in Gravity::ALL {
            for bw in [0, 1] {
                let mut rect = client;
                // Repeated round trips must not drift
                for _ in 0..8 {
                    let (rx, ry) = gravity_reference_point(rect, Some(&insets), bw, gravity);
                    rect = adjust_for_gravity(
                        Rect::new(rx, ry, rect.width, rect.height),
                        Some(&insets),
                        bw,
                        gravity,
                    );
                }
                assert_eq!(rect, client, "gravity {:?} bw {}", gravity, bw);
            }
        }
    }

    #[test]
    fn north_west_configure_request_lands_inside_frame() {
        let insets = FrameInsets::new(4, 4, 24, 4);
        let rect = adjust_for_gravity(Rect::new(50, 50, 300, 200), Some(&insets), 0, Gravity::NorthWest);
        assert_eq!((rect.x, rect.y), (54, 74));
    }

    #[test]
    fn static_gravity_is_untouched() {
        let insets = FrameInsets::new(4, 4, 24, 4);
        let rect = adjust_for_gravity(Rect::new(10, 20, 30, 40), Some(&insets), 3, Gravity::Static);
        assert_eq!(rect, Rect::new(10, 20, 30, 40));
    }

    #[test]
    fn south_east_gravity_pins_outer_corner() {
        let insets = FrameInsets::new(4, 4, 24, 4);
        // Outer bottom-right at (400, 300)
        let rect = adjust_for_gravity(Rect::new(400, 300, 100, 50), Some(&insets), 0, Gravity::SouthEast);
        let frame = rect.expand_by(&insets);
        assert_eq!((frame.right(), frame.bottom()), (400, 300));
    }

    #[test]
    fn centre_gravity_rounds_toward_zero() {
        let rect = adjust_for_gravity(Rect::new(100, 100, 11, 7), None, 0, Gravity::Center);
        // ref = 100 + 5, x = ref - 5
        assert_eq!((rect.x, rect.y), (100, 100));
    }

    #[test]
    fn resize_north_west_keeps_origin() {
        let old = Rect::new(100, 100, 300, 200);
        assert_eq!(resize_with_gravity(&old, Gravity::NorthWest, 400, 250), Rect::new(100, 100, 400, 250));
    }

    #[test]
    fn resize_south_east_keeps_bottom_right() {
        let old = Rect::new(100, 100, 300, 200);
        let new = resize_with_gravity(&old, Gravity::SouthEast, 400, 250);
        assert_eq!(new, Rect::new(0, 50, 400, 250));
        assert_eq!((new.right(), new.bottom()), (old.right(), old.bottom()));
    }

    #[test]
    fn resize_center_does_not_drift() {
        let mut rect = Rect::new(100, 100, 300, 200);
        rect = resize_with_gravity(&rect, Gravity::Center, 301, 203);
        rect = resize_with_gravity(&rect, Gravity::Center, 300, 200);
        assert_eq!(rect, Rect::new(100, 100, 300, 200));
    }

    #[test]
    fn rect_helpers() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(50, 50, 100, 100);
        assert!(a.overlaps(&b));
        assert_eq!(a.intersect(&b), Some(Rect::new(50, 50, 50, 50)));
        assert!(!a.overlaps(&Rect::new(100, 0, 10, 10)));
        assert!(a.contains_rect(&Rect::new(10, 10, 10, 10)));
        let insets = FrameInsets::new(1, 2, 3, 4);
        assert_eq!(a.expand_by(&insets).shrink_by(&insets), a);
    }
}
