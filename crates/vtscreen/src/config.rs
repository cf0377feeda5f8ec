//! Screen-level configuration.

use vtgrid::{Cell, Size, TabBehavior};

/// Options of a [`TerminalScreen`](crate::TerminalScreen).
#[derive(Debug, Clone)]
pub struct ScreenConfig {
    /// Filler for blank cells on start, clear and resize.
    pub default_character: Cell,
    /// How `\t` expands when written to the screen.
    pub tab_behavior: TabBehavior,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            default_character: Cell::default(),
            tab_behavior: TabBehavior::default(),
        }
    }
}

impl ScreenConfig {
    #[must_use]
    pub fn with_default_character(mut self, cell: Cell) -> Self {
        self.default_character = cell;
        self
    }

    #[must_use]
    pub fn with_tab_behavior(mut self, tab_behavior: TabBehavior) -> Self {
        self.tab_behavior = tab_behavior;
        self
    }
}

/// Options of a [`VirtualScreen`](crate::VirtualScreen).
#[derive(Debug, Clone)]
pub struct VirtualScreenConfig {
    /// The smallest logical size presented to the application.
    pub minimum_size: Size,
    /// Scroll with Ctrl instead of Alt.
    pub scroll_on_ctrl: bool,
}

impl Default for VirtualScreenConfig {
    fn default() -> Self {
        Self {
            minimum_size: Size::new(80, 24),
            scroll_on_ctrl: false,
        }
    }
}

impl VirtualScreenConfig {
    #[must_use]
    pub fn with_minimum_size(mut self, size: Size) -> Self {
        self.minimum_size = size;
        self
    }

    #[must_use]
    pub fn with_scroll_on_ctrl(mut self, on_ctrl: bool) -> Self {
        self.scroll_on_ctrl = on_ctrl;
        self
    }
}
