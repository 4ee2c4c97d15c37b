//! Hints Module
//!
//! Window hints parsing and normalisation (WM_NORMAL_HINTS, WM_HINTS,
//! _MOTIF_WM_HINTS, struts). Parsers take raw CARD32 property values so the
//! backend only has to fetch properties.

use tracing::{debug, warn};

use crate::shared::{Gravity, Rect};

/// WM_NORMAL_HINTS flag bits (ICCCM 4.1.2.3)
pub mod size_flags {
    pub const US_POSITION: u32 = 1 << 0;
    pub const US_SIZE: u32 = 1 << 1;
    pub const P_POSITION: u32 = 1 << 2;
    pub const P_SIZE: u32 = 1 << 3;
    pub const P_MIN_SIZE: u32 = 1 << 4;
    pub const P_MAX_SIZE: u32 = 1 << 5;
    pub const P_RESIZE_INC: u32 = 1 << 6;
    pub const P_ASPECT: u32 = 1 << 7;
    pub const P_BASE_SIZE: u32 = 1 << 8;
    pub const P_WIN_GRAVITY: u32 = 1 << 9;
}

use size_flags::*;

/// Aspect ratio as numerator/denominator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aspect {
    pub num: i32,
    pub den: i32,
}

impl Aspect {
    pub fn ratio(&self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

/// Size hints (XSizeHints equivalent), always normalised
#[derive(Debug, Clone, PartialEq)]
pub struct SizeHints {
    pub flags: u32,
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
    pub width_inc: i32,
    pub height_inc: i32,
    pub min_aspect: Aspect,
    pub max_aspect: Aspect,
    pub base_width: i32,
    pub base_height: i32,
    pub win_gravity: Gravity,
}

impl Default for SizeHints {
    fn default() -> Self {
        Self::from_raw(&[])
    }
}

/// Largest width or height the X protocol can express
pub const MAX_DIMENSION: i32 = 0x7fff;

fn field(values: &[u32], index: usize) -> i32 {
    values.get(index).map(|&v| v as i32).unwrap_or(0)
}

/// A size field; out-of-range client values are pulled into `0..=MAX_DIMENSION`
/// so the increment arithmetic below cannot overflow
fn size_field(values: &[u32], index: usize) -> i32 {
    field(values, index).clamp(0, MAX_DIMENSION)
}

impl SizeHints {
    /// Parse the 18 CARD32 values of WM_NORMAL_HINTS and normalise them
    ///
    /// A short or missing property behaves as if no flags were set.
    pub fn from_raw(values: &[u32]) -> Self {
        let flags = if values.len() >= 15 { values[0] } else { 0 };
        let mut hints = Self {
            flags,
            min_width: size_field(values, 5),
            min_height: size_field(values, 6),
            max_width: size_field(values, 7),
            max_height: size_field(values, 8),
            width_inc: size_field(values, 9),
            height_inc: size_field(values, 10),
            min_aspect: Aspect { num: field(values, 11), den: field(values, 12) },
            max_aspect: Aspect { num: field(values, 13), den: field(values, 14) },
            base_width: size_field(values, 15),
            base_height: size_field(values, 16),
            win_gravity: Gravity::from_wire(values.get(17).copied().unwrap_or(1)),
        };
        hints.normalize();
        hints
    }

    pub fn has(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    /// Client or user asked for a specific position
    pub fn has_position(&self) -> bool {
        self.has(US_POSITION) || self.has(P_POSITION)
    }

    fn normalize(&mut self) {
        if !self.has(P_BASE_SIZE) {
            if self.has(P_MIN_SIZE) {
                self.base_width = self.min_width;
                self.base_height = self.min_height;
            } else {
                self.base_width = 0;
                self.base_height = 0;
            }
        }
        if !self.has(P_MIN_SIZE) {
            if self.has(P_BASE_SIZE) {
                self.min_width = self.base_width;
                self.min_height = self.base_height;
            } else {
                self.min_width = 0;
                self.min_height = 0;
            }
        }
        if !self.has(P_MAX_SIZE) {
            self.max_width = i32::MAX;
            self.max_height = i32::MAX;
        }
        if !self.has(P_RESIZE_INC) {
            self.width_inc = 1;
            self.height_inc = 1;
        }
        if !self.has(P_ASPECT) {
            self.reset_aspect();
        }
        if !self.has(P_WIN_GRAVITY) {
            self.win_gravity = Gravity::NorthWest;
        }
        self.flags |= P_BASE_SIZE | P_MIN_SIZE | P_MAX_SIZE | P_RESIZE_INC | P_ASPECT | P_WIN_GRAVITY;

        // Sanity checks
        self.min_width = self.min_width.max(1);
        self.min_height = self.min_height.max(1);
        self.max_width = self.max_width.max(1);
        self.max_height = self.max_height.max(1);
        self.width_inc = self.width_inc.max(1);
        self.height_inc = self.height_inc.max(1);
        self.min_aspect.den = self.min_aspect.den.max(1);
        self.max_aspect.den = self.max_aspect.den.max(1);

        // Effective min/max have to sit on the increment grid
        let (basew, baseh) = (self.base_width, self.base_height);
        if (self.min_width - basew) % self.width_inc != 0 {
            self.min_width = basew + ((self.min_width - basew) / self.width_inc + 1) * self.width_inc;
        }
        if self.max_width != i32::MAX && (self.max_width - basew) % self.width_inc != 0 {
            self.max_width = basew + ((self.max_width - basew) / self.width_inc) * self.width_inc;
        }
        if (self.min_height - baseh) % self.height_inc != 0 {
            self.min_height = baseh + ((self.min_height - baseh) / self.height_inc + 1) * self.height_inc;
        }
        if self.max_height != i32::MAX && (self.max_height - baseh) % self.height_inc != 0 {
            self.max_height = baseh + ((self.max_height - baseh) / self.height_inc) * self.height_inc;
        }

        // Min takes precedence
        if self.max_width < self.min_width {
            debug!("max width {} below min width {}, disabling resize", self.max_width, self.min_width);
            self.max_width = self.min_width;
        }
        if self.max_height < self.min_height {
            debug!("max height {} below min height {}, disabling resize", self.max_height, self.min_height);
            self.max_height = self.min_height;
        }

        if self.min_aspect.ratio() > self.max_aspect.ratio() {
            warn!(
                "Inconsistent aspect hints {}/{} > {}/{}, ignoring them",
                self.min_aspect.num, self.min_aspect.den, self.max_aspect.num, self.max_aspect.den
            );
            self.reset_aspect();
        }
    }

    fn reset_aspect(&mut self) {
        self.min_aspect = Aspect { num: 1, den: i32::MAX };
        self.max_aspect = Aspect { num: i32::MAX, den: 1 };
    }

    /// Fixed size windows cannot be resized
    pub fn is_fixed_size(&self) -> bool {
        self.min_width == self.max_width && self.min_height == self.max_height
    }

    /// Force `rect` onto the min/max and increment grid
    pub fn ensure_satisfied(&self, rect: &mut Rect) {
        rect.width = rect.width.clamp(self.min_width, self.max_width);
        rect.height = rect.height.clamp(self.min_height, self.max_height);

        rect.width -= (rect.width - self.base_width) % self.width_inc;
        rect.height -= (rect.height - self.base_height) % self.height_inc;

        // Snapping down may undershoot the minimum again
        if rect.width < self.min_width {
            rect.width += ((self.min_width - rect.width) / self.width_inc + 1) * self.width_inc;
        }
        if rect.height < self.min_height {
            rect.height += ((self.min_height - rect.height) / self.height_inc + 1) * self.height_inc;
        }
    }
}

/// WM hints (XWMHints equivalent), only the fields the core consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WmHints {
    pub input: bool,
    pub initial_iconic: bool,
    pub urgent: bool,
    pub window_group: Option<u32>,
}

impl Default for WmHints {
    fn default() -> Self {
        Self { input: true, initial_iconic: false, urgent: false, window_group: None }
    }
}

impl WmHints {
    const INPUT_HINT: u32 = 1 << 0;
    const STATE_HINT: u32 = 1 << 1;
    const WINDOW_GROUP_HINT: u32 = 1 << 6;
    const URGENCY_HINT: u32 = 1 << 8;
    const ICONIC_STATE: u32 = 3;

    /// Parse the 9 CARD32 values of WM_HINTS
    pub fn from_raw(values: &[u32]) -> Self {
        let Some(&flags) = values.first() else {
            return Self::default();
        };
        let mut hints = Self::default();
        if flags & Self::INPUT_HINT != 0 {
            hints.input = values.get(1).copied().unwrap_or(1) != 0;
        }
        if flags & Self::STATE_HINT != 0 {
            hints.initial_iconic = values.get(2).copied() == Some(Self::ICONIC_STATE);
        }
        if flags & Self::WINDOW_GROUP_HINT != 0 {
            hints.window_group = values.get(8).copied().filter(|&w| w != 0);
        }
        hints.urgent = flags & Self::URGENCY_HINT != 0;
        hints
    }
}

/// MOTIF WM Hints, reduced to what `recalc_features` folds in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotifHints {
    pub decorated: bool,
    pub border_only: bool,
    pub has_close: bool,
    pub has_minimize: bool,
    pub has_maximize: bool,
    pub has_move: bool,
    pub has_resize: bool,
}

impl Default for MotifHints {
    fn default() -> Self {
        Self {
            decorated: true,
            border_only: false,
            has_close: true,
            has_minimize: true,
            has_maximize: true,
            has_move: true,
            has_resize: true,
        }
    }
}

impl MotifHints {
    const HINTS_FUNCTIONS: u32 = 1 << 0;
    const HINTS_DECORATIONS: u32 = 1 << 1;
    const FUNC_ALL: u32 = 1 << 0;
    const FUNC_RESIZE: u32 = 1 << 1;
    const FUNC_MOVE: u32 = 1 << 2;
    const FUNC_MINIMIZE: u32 = 1 << 3;
    const FUNC_MAXIMIZE: u32 = 1 << 4;
    const FUNC_CLOSE: u32 = 1 << 5;
    const DECOR_ALL: u32 = 1 << 0;
    const DECOR_BORDER: u32 = 1 << 1;
    const DECOR_TITLE: u32 = 1 << 3;

    pub fn from_raw(values: &[u32]) -> Self {
        let mut hints = Self::default();
        if values.len() < 3 {
            return hints;
        }
        let (flags, functions, decorations) = (values[0], values[1], values[2]);

        if flags & Self::HINTS_DECORATIONS != 0 {
            if decorations == 0 {
                hints.decorated = false;
            } else if decorations & (Self::DECOR_ALL | Self::DECOR_TITLE) == 0
                && decorations & Self::DECOR_BORDER != 0
            {
                hints.border_only = true;
            }
        }

        if flags & Self::HINTS_FUNCTIONS != 0 {
            // With FUNC_ALL the remaining bits name functions to remove
            let all = functions & Self::FUNC_ALL != 0;
            let allowed = |bit: u32| (functions & bit != 0) != all;
            hints.has_close = allowed(Self::FUNC_CLOSE);
            hints.has_minimize = allowed(Self::FUNC_MINIMIZE);
            hints.has_maximize = allowed(Self::FUNC_MAXIMIZE);
            hints.has_move = allowed(Self::FUNC_MOVE);
            hints.has_resize = allowed(Self::FUNC_RESIZE);
        }
        hints
    }
}

/// Screen edge reservation from _NET_WM_STRUT(_PARTIAL)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Strut {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl Strut {
    /// Accepts either the 4-value legacy form or the 12-value partial form
    pub fn from_raw(values: &[u32]) -> Option<Self> {
        if values.len() < 4 {
            return None;
        }
        let strut = Self {
            left: size_field(values, 0),
            right: size_field(values, 1),
            top: size_field(values, 2),
            bottom: size_field(values, 3),
        };
        (strut != Self::default()).then_some(strut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(flags: u32, fill: impl FnOnce(&mut [u32; 18])) -> [u32; 18] {
        let mut values = [0u32; 18];
        values[0] = flags;
        fill(&mut values);
        values
    }

    #[test]
    fn empty_hints_get_defaults() {
        let hints = SizeHints::from_raw(&[]);
        assert_eq!((hints.min_width, hints.min_height), (1, 1));
        assert_eq!((hints.max_width, hints.max_height), (i32::MAX, i32::MAX));
        assert_eq!((hints.width_inc, hints.height_inc), (1, 1));
        assert_eq!(hints.win_gravity, Gravity::NorthWest);
        assert!(!hints.has_position());
    }

    #[test]
    fn base_defaults_to_min() {
        let hints = SizeHints::from_raw(&raw(P_MIN_SIZE, |v| {
            v[5] = 100;
            v[6] = 50;
        }));
        assert_eq!((hints.base_width, hints.base_height), (100, 50));
    }

    #[test]
    fn min_and_max_snap_to_increments() {
        let hints = SizeHints::from_raw(&raw(P_MIN_SIZE | P_MAX_SIZE | P_RESIZE_INC | P_BASE_SIZE, |v| {
            v[5] = 25; // min w
            v[6] = 17; // min h
            v[7] = 105; // max w
            v[8] = 99; // max h
            v[9] = 10;
            v[10] = 8;
            v[15] = 4;
            v[16] = 2;
        }));
        assert_eq!(hints.min_width, 34);
        assert_eq!(hints.min_height, 18);
        assert_eq!(hints.max_width, 104);
        assert_eq!(hints.max_height, 98);
    }

    #[test]
    fn max_below_min_is_raised() {
        let hints = SizeHints::from_raw(&raw(P_MIN_SIZE | P_MAX_SIZE, |v| {
            v[5] = 200;
            v[6] = 200;
            v[7] = 100;
            v[8] = 300;
        }));
        assert_eq!(hints.max_width, 200);
        assert_eq!(hints.max_height, 300);
        assert!(!hints.is_fixed_size());
    }

    #[test]
    fn inconsistent_aspect_is_dropped() {
        let hints = SizeHints::from_raw(&raw(P_ASPECT, |v| {
            v[11] = 2;
            v[12] = 1;
            v[13] = 1;
            v[14] = 2;
        }));
        assert_eq!(hints.min_aspect, Aspect { num: 1, den: i32::MAX });
    }

    #[test]
    fn ensure_satisfied_clamps_and_snaps() {
        let hints = SizeHints::from_raw(&raw(P_MIN_SIZE | P_MAX_SIZE | P_RESIZE_INC | P_BASE_SIZE, |v| {
            v[5] = 10;
            v[6] = 10;
            v[7] = 500;
            v[8] = 500;
            v[9] = 7;
            v[10] = 5;
            v[15] = 3;
            v[16] = 0;
        }));
        let mut rect = Rect::new(0, 0, 1000, 3);
        hints.ensure_satisfied(&mut rect);
        assert_eq!(rect.width, 500);
        assert_eq!(rect.height, 10);
        let mut rect = Rect::new(0, 0, 30, 23);
        hints.ensure_satisfied(&mut rect);
        assert_eq!((rect.width, rect.height), (24, 20));
    }

    #[test]
    fn out_of_range_sizes_are_clamped() {
        let hints = SizeHints::from_raw(&raw(P_MIN_SIZE | P_BASE_SIZE | P_MAX_SIZE | P_RESIZE_INC, |v| {
            v[5] = 100;
            v[6] = 0x7fff_ffff;
            v[7] = 0xffff_ffff;
            v[8] = 0x7fff_ffff;
            v[9] = 0xffff_fff0;
            v[10] = 3;
            v[15] = 0x8000_0000;
            v[16] = 0x7fff_fffe;
        }));
        assert_eq!((hints.base_width, hints.base_height), (0, MAX_DIMENSION));
        assert_eq!(hints.min_width, 100);
        assert_eq!(hints.width_inc, 1);
        assert_eq!(hints.max_width, 100);
        assert!(hints.min_height <= MAX_DIMENSION);

        let mut rect = Rect::new(0, 0, 640, 480);
        hints.ensure_satisfied(&mut rect);
        assert_eq!(rect.width, 100);
        assert_eq!(rect.height, hints.min_height);
    }

    #[test]
    fn hostile_struts_stay_within_the_protocol_range() {
        let strut = Strut::from_raw(&[0xffff_ff00, 0, 0x7fff_ffff, 0]);
        assert_eq!(strut.map(|s| (s.left, s.top)), Some((0, MAX_DIMENSION)));
    }

    #[test]
    fn wm_hints_input_and_iconic() {
        let hints = WmHints::from_raw(&[0b11, 0, 3, 0, 0, 0, 0, 0, 0]);
        assert!(!hints.input);
        assert!(hints.initial_iconic);
        assert!(WmHints::from_raw(&[]).input);
    }

    #[test]
    fn motif_functions_with_all_bit_subtract() {
        // FUNC_ALL | FUNC_RESIZE => everything except resize
        let hints = MotifHints::from_raw(&[1, 0b11, 0]);
        assert!(!hints.has_resize);
        assert!(hints.has_move && hints.has_close);
        let undecorated = MotifHints::from_raw(&[2, 0, 0]);
        assert!(!undecorated.decorated);
    }

    #[test]
    fn empty_struts_are_ignored() {
        assert_eq!(Strut::from_raw(&[0, 0, 0, 0]), None);
        assert_eq!(Strut::from_raw(&[0, 0, 30, 0]).map(|s| s.top), Some(30));
    }
}
