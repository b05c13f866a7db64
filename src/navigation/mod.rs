//! Focus navigation over the catalog grid and the optional banner above it.
//!
//! Everything here is a pure function of the current focus, the input, and the grid shape, so
//! the event loop can recompute focus on every key press and on every resize.

/// What is selected: the banner or one entry by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Focus {
    /// The non-interactive banner above the grid.
    Banner,
    /// Entry at this index in catalog order.
    Entry(usize),
}

impl Default for Focus {
    fn default() -> Self {
        Self::Entry(0)
    }
}

impl Focus {
    /// Index of the focused entry, `None` on the banner.
    #[must_use]
    pub const fn entry(self) -> Option<usize> {
        match self {
            Self::Banner => None,
            Self::Entry(i) => Some(i),
        }
    }
}

/// Edge-triggered input signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavInput {
    /// Move one row up.
    Up,
    /// Move one row down.
    Down,
    /// Move one cell left.
    Left,
    /// Move one cell right.
    Right,
    /// Activate the focused cell.
    Activate,
}

/// Layout the navigator works against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    /// Columns per row; at least 1.
    pub columns: usize,
    /// Number of entries.
    pub len: usize,
    /// Whether a banner sits above the grid.
    pub has_banner: bool,
}

impl GridShape {
    /// Shape with `columns` clamped to at least 1.
    #[must_use]
    pub fn new(columns: usize, len: usize, has_banner: bool) -> Self {
        Self {
            columns: columns.max(1),
            len,
            has_banner,
        }
    }

    /// Number of rows the entries occupy.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.len.div_ceil(self.columns)
    }
}

/// Result of one navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavOutcome {
    /// Focus after the input.
    pub focus: Focus,
    /// Entry to start or restart, when the input activated one.
    pub activate: Option<usize>,
}

/// What: Column count for a viewport.
///
/// Inputs:
/// - `width`: Usable viewport width.
/// - `cell_width`: Approximate width of one card.
///
/// Output:
/// - `width / cell_width`, never less than 1.
#[must_use]
pub fn columns_for_width(width: u16, cell_width: u16) -> usize {
    usize::from(width.checked_div(cell_width).unwrap_or(1).max(1))
}

/// What: Apply one input to the focus.
///
/// Inputs:
/// - `focus`: Current selection; re-clamped against `shape` first.
/// - `input`: Directional or activation signal.
/// - `shape`: Grid layout and banner presence.
///
/// Output:
/// - New focus and, for activation on an entry, the entry index to start.
///
/// Details:
/// - Left/Right clamp at the ends of the list and do nothing on the banner.
/// - Down from the banner goes to entry 0; Up from the first row goes to the banner when
///   present, otherwise stays put.
/// - Vertical moves add or subtract the column count and clamp to the last entry, so a short
///   last row can land in a different column.
/// - With no entries every input is a no-op.
#[must_use]
pub fn navigate(focus: Focus, input: NavInput, shape: GridShape) -> NavOutcome {
    let focus = reconcile(focus, shape);
    let stay = NavOutcome {
        focus,
        activate: None,
    };
    if shape.len == 0 {
        return stay;
    }
    let last = shape.len - 1;
    let cols = shape.columns.max(1);
    let next = match (focus, input) {
        (Focus::Banner, NavInput::Down) => Focus::Entry(0),
        (Focus::Banner, _) => focus,
        (Focus::Entry(i), NavInput::Left) => Focus::Entry(i.saturating_sub(1)),
        (Focus::Entry(i), NavInput::Right) => Focus::Entry((i + 1).min(last)),
        (Focus::Entry(i), NavInput::Up) if i < cols => {
            if shape.has_banner {
                Focus::Banner
            } else {
                focus
            }
        }
        (Focus::Entry(i), NavInput::Up) => Focus::Entry(i - cols),
        (Focus::Entry(i), NavInput::Down) => Focus::Entry(i.saturating_add(cols).min(last)),
        (Focus::Entry(i), NavInput::Activate) => {
            return NavOutcome {
                focus,
                activate: Some(i),
            };
        }
    };
    NavOutcome {
        focus: next,
        activate: None,
    }
}

/// What: Re-clamp a focus after the catalog or viewport changed.
///
/// Output:
/// - A focus valid for `shape`: entries past the end clamp to the last one; a banner focus
///   without a banner becomes entry 0; an empty catalog yields the banner when present,
///   otherwise the `Entry(0)` placeholder.
#[must_use]
pub fn reconcile(focus: Focus, shape: GridShape) -> Focus {
    if shape.len == 0 {
        return if shape.has_banner {
            Focus::Banner
        } else {
            Focus::Entry(0)
        };
    }
    match focus {
        Focus::Banner if shape.has_banner => Focus::Banner,
        Focus::Banner => Focus::Entry(0),
        Focus::Entry(i) => Focus::Entry(i.min(shape.len - 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_INPUTS: [NavInput; 5] = [
        NavInput::Up,
        NavInput::Down,
        NavInput::Left,
        NavInput::Right,
        NavInput::Activate,
    ];

    #[test]
    /// What: Column count derives from width and never drops below one.
    fn column_count() {
        assert_eq!(columns_for_width(120, 30), 4);
        assert_eq!(columns_for_width(59, 30), 1);
        assert_eq!(columns_for_width(10, 30), 1);
        assert_eq!(columns_for_width(100, 0), 1);
        assert_eq!(GridShape::new(0, 5, false).columns, 1);
        assert_eq!(GridShape::new(2, 5, false).rows(), 3);
    }

    #[test]
    /// What: Up from the first row goes to the banner only when one exists.
    ///
    /// Inputs:
    /// - Two columns, focus on entry 0, Up pressed, with and without banner.
    ///
    /// Output:
    /// - Banner when present; otherwise entry 0.
    fn up_from_first_row() {
        let with_banner = GridShape::new(2, 5, true);
        let without = GridShape::new(2, 5, false);
        assert_eq!(
            navigate(Focus::Entry(0), NavInput::Up, with_banner).focus,
            Focus::Banner
        );
        assert_eq!(
            navigate(Focus::Entry(0), NavInput::Up, without).focus,
            Focus::Entry(0)
        );
        assert_eq!(
            navigate(Focus::Entry(1), NavInput::Up, with_banner).focus,
            Focus::Banner
        );
        assert_eq!(
            navigate(Focus::Entry(3), NavInput::Up, without).focus,
            Focus::Entry(1)
        );
    }

    #[test]
    /// What: Banner handles Down only; horizontal input and activation are no-ops there.
    fn banner_behaviour() {
        let shape = GridShape::new(3, 7, true);
        assert_eq!(navigate(Focus::Banner, NavInput::Down, shape).focus, Focus::Entry(0));
        for input in [NavInput::Left, NavInput::Right, NavInput::Up, NavInput::Activate] {
            let out = navigate(Focus::Banner, input, shape);
            assert_eq!(out.focus, Focus::Banner);
            assert_eq!(out.activate, None);
        }
    }

    #[test]
    /// What: Horizontal moves clamp at the list ends; vertical moves clamp to the last entry.
    ///
    /// Inputs:
    /// - Three columns, seven entries (short last row holding entry 6).
    ///
    /// Output:
    /// - Down from entry 5 lands on 6; Right at 6 stays; Left at 0 stays.
    fn clamping() {
        let shape = GridShape::new(3, 7, false);
        assert_eq!(navigate(Focus::Entry(5), NavInput::Down, shape).focus, Focus::Entry(6));
        assert_eq!(navigate(Focus::Entry(2), NavInput::Down, shape).focus, Focus::Entry(5));
        assert_eq!(navigate(Focus::Entry(6), NavInput::Right, shape).focus, Focus::Entry(6));
        assert_eq!(navigate(Focus::Entry(0), NavInput::Left, shape).focus, Focus::Entry(0));
        assert_eq!(navigate(Focus::Entry(2), NavInput::Right, shape).focus, Focus::Entry(3));
    }

    #[test]
    /// What: Activation reports the focused entry without moving.
    fn activation() {
        let shape = GridShape::new(2, 4, true);
        let out = navigate(Focus::Entry(3), NavInput::Activate, shape);
        assert_eq!(out, NavOutcome { focus: Focus::Entry(3), activate: Some(3) });
    }

    #[test]
    /// What: An empty catalog ignores every input.
    fn empty_catalog_is_inert() {
        for has_banner in [false, true] {
            let shape = GridShape::new(2, 0, has_banner);
            for input in ALL_INPUTS {
                let out = navigate(Focus::Entry(0), input, shape);
                assert_eq!(out.activate, None);
                assert_eq!(out.focus, reconcile(Focus::Entry(0), shape));
            }
        }
    }

    #[test]
    /// What: Focus is re-clamped after the catalog shrinks or loses its banner.
    fn reconcile_after_changes() {
        assert_eq!(reconcile(Focus::Entry(9), GridShape::new(2, 4, false)), Focus::Entry(3));
        assert_eq!(reconcile(Focus::Banner, GridShape::new(2, 4, false)), Focus::Entry(0));
        assert_eq!(reconcile(Focus::Banner, GridShape::new(2, 4, true)), Focus::Banner);
        assert_eq!(reconcile(Focus::Entry(2), GridShape::new(2, 0, true)), Focus::Banner);
    }

    #[test]
    /// What: Every input sequence keeps focus on the banner or a valid entry.
    ///
    /// Inputs:
    /// - Catalog sizes 1..=9, column counts 1..=4, with and without banner; a fixed
    ///   pseudo-random walk of 200 inputs each.
    ///
    /// Output:
    /// - Focus index always in `[0, len-1]`; banner only when the shape has one.
    fn focus_stays_in_bounds() {
        let mut seed: u32 = 0x9e37_79b9;
        for len in 1..=9 {
            for cols in 1..=4 {
                for has_banner in [false, true] {
                    let shape = GridShape::new(cols, len, has_banner);
                    let mut focus = Focus::default();
                    for _ in 0..200 {
                        seed ^= seed << 13;
                        seed ^= seed >> 17;
                        seed ^= seed << 5;
                        let input = ALL_INPUTS[(seed % 5) as usize];
                        let out = navigate(focus, input, shape);
                        focus = out.focus;
                        match focus {
                            Focus::Banner => assert!(has_banner),
                            Focus::Entry(i) => assert!(i < len),
                        }
                        if let Some(i) = out.activate {
                            assert!(i < len);
                        }
                    }
                }
            }
        }
    }
}
