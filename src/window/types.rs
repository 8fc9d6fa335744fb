//! Window attributes and input vocabulary.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::shared::Point;

/// Visual style of the window border
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowLook {
    Titled,
    /// Titled with a resize knob inside the frame
    Document,
    Floating,
    Modal,
    Bordered,
    NoBorder,
}

/// Stacking behavior of the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowFeel {
    Normal,
    ModalApp,
    ModalSubset,
    ModalAll,
    FloatingApp,
    FloatingSubset,
    FloatingAll,
    Menu,
    WindowScreen,
    Password,
}

impl WindowFeel {
    pub fn is_modal(self) -> bool {
        matches!(
            self,
            WindowFeel::ModalApp | WindowFeel::ModalSubset | WindowFeel::ModalAll
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(
            self,
            WindowFeel::FloatingApp | WindowFeel::FloatingSubset | WindowFeel::FloatingAll
        )
    }
}

bitflags! {
    /// Client-requested window behavior
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WindowFlags: u32 {
        const NOT_MOVABLE                      = 1 << 0;
        const NOT_CLOSABLE                     = 1 << 1;
        const NOT_ZOOMABLE                     = 1 << 2;
        const NOT_MINIMIZABLE                  = 1 << 3;
        const NOT_RESIZABLE                    = 1 << 4;
        const NOT_H_RESIZABLE                  = 1 << 5;
        const NOT_V_RESIZABLE                  = 1 << 6;
        const AVOID_FOCUS                      = 1 << 7;
        const WILL_ACCEPT_FIRST_CLICK          = 1 << 8;
        const NO_SERVER_SIDE_WINDOW_MODIFIERS  = 1 << 9;
        const SAME_POSITION_IN_ALL_WORKSPACES  = 1 << 10;
    }
}

bitflags! {
    /// Why a region became dirty
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct UpdateCause: u8 {
        /// Previously obscured pixels became visible; needs a background clear
        const EXPOSE  = 1 << 0;
        /// Explicit invalidation; already drawn pixels stay consistent
        const REQUEST = 1 << 1;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u32 {
        const SHIFT   = 1 << 0;
        const COMMAND = 1 << 1;
        const CONTROL = 1 << 2;
        const OPTION  = 1 << 3;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MouseButtons: u32 {
        const PRIMARY   = 1 << 0;
        const SECONDARY = 1 << 1;
        const TERTIARY  = 1 << 2;
    }
}

/// A pointer event in screen coordinates
#[derive(Debug, Clone, Copy)]
pub struct MouseEvent {
    pub position: Point,
    pub buttons: MouseButtons,
    pub modifiers: Modifiers,
    pub when: Instant,
    /// False for coalesced history entries that only carry the path
    pub latest: bool,
}

impl MouseEvent {
    pub fn new(position: Point, buttons: MouseButtons, when: Instant) -> Self {
        Self {
            position,
            buttons,
            modifiers: Modifiers::empty(),
            when,
            latest: true,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Inclusive bounds on the frame size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    pub min_width: i32,
    pub max_width: i32,
    pub min_height: i32,
    pub max_height: i32,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            min_width: 1,
            max_width: 32_768,
            min_height: 1,
            max_height: 32_768,
        }
    }
}

impl SizeLimits {
    /// Raise the maxima so that `min <= max` holds on both axes.
    pub fn obey(&mut self) {
        self.min_width = self.min_width.max(0);
        self.min_height = self.min_height.max(0);
        if self.max_width < self.min_width {
            self.max_width = self.min_width;
        }
        if self.max_height < self.min_height {
            self.max_height = self.min_height;
        }
    }

    pub fn clamp_width(&self, width: i32) -> i32 {
        width.clamp(self.min_width, self.max_width)
    }

    pub fn clamp_height(&self, height: i32) -> i32 {
        height.clamp(self.min_height, self.max_height)
    }
}
