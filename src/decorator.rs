//! Window decorations (tab, border, buttons, resize knob)
//!
//! The window core only talks to decorations through [`Decorator`]. Two
//! variants exist: [`TabbedDecorator`] for titled looks and
//! [`BorderedDecorator`] for border-only looks. Borderless windows have no
//! decorator at all.

use std::fmt;

use tracing::trace;

use crate::config::DecoratorConfig;
use crate::engine::DrawingEngine;
use crate::region::Region;
use crate::shared::{Point, Rect};
use crate::window::types::{Modifiers, MouseButtons, SizeLimits, WindowLook};

/// What a click on the decoration asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickType {
    None,
    Close,
    Zoom,
    Minimize,
    Drag,
    Resize,
    SlideTab,
    MoveToBack,
}

impl ClickType {
    /// Button actions fire on release, not on press.
    pub fn is_button(self) -> bool {
        matches!(self, ClickType::Close | ClickType::Zoom | ClickType::Minimize)
    }
}

/// Capability interface the window core uses to drive its decoration
pub trait Decorator: Send + fmt::Debug {
    /// Screen region covered by the decoration for the current frame.
    fn footprint(&self) -> Region;

    /// Paint the parts of the decoration inside `update`.
    fn draw(&self, engine: &dyn DrawingEngine, update: Rect);

    fn set_focus(&mut self, focused: bool);

    fn clicked(&self, point: Point, buttons: MouseButtons, modifiers: Modifiers) -> ClickType;

    fn move_by(&mut self, dx: i32, dy: i32);

    /// Follow a frame resize, adding changed decoration pixels to `dirty`.
    fn resize_by(&mut self, dx: i32, dy: i32, dirty: Option<&mut Region>);

    /// Tighten `limits` to what the decoration can render.
    fn constrain_size_limits(&self, limits: &mut SizeLimits);

    fn tab_location(&self) -> f32 {
        0.0
    }

    /// Slide the tab; returns false if nothing changed.
    fn set_tab_location(&mut self, _location: f32, _dirty: Option<&mut Region>) -> bool {
        false
    }

    fn set_close(&mut self, _pressed: bool) {}

    fn set_zoom(&mut self, _pressed: bool) {}

    fn set_minimize(&mut self, _pressed: bool) {}
}

/// Build the decorator for `look`, or `None` for borderless windows.
pub fn for_look(look: WindowLook, frame: Rect, config: &DecoratorConfig) -> Option<Box<dyn Decorator>> {
    match look {
        WindowLook::NoBorder => None,
        WindowLook::Bordered => Some(Box::new(BorderedDecorator::new(frame, config.clone(), 1))),
        WindowLook::Modal => Some(Box::new(BorderedDecorator::new(
            frame,
            config.clone(),
            config.border_width,
        ))),
        WindowLook::Titled | WindowLook::Document | WindowLook::Floating => {
            Some(Box::new(TabbedDecorator::new(look, frame, config.clone())))
        }
    }
}

/// Ring of `width` pixels around `frame`.
fn border_ring(frame: Rect, width: i32) -> Region {
    let mut ring = Region::from(frame.inset_by(-width, -width));
    ring.exclude_rect(frame);
    ring
}

/// Clicks outside the decoration only count with the window-modifier chord.
pub(crate) fn modifier_action(buttons: MouseButtons, modifiers: Modifiers) -> ClickType {
    if !modifiers.contains(Modifiers::COMMAND | Modifiers::CONTROL) {
        ClickType::None
    } else if buttons.contains(MouseButtons::SECONDARY) {
        ClickType::MoveToBack
    } else {
        ClickType::Drag
    }
}

fn symmetric_difference(a: &Region, b: &Region) -> Region {
    let mut only_a = a.clone();
    only_a.exclude(b);
    let mut only_b = b.clone();
    only_b.exclude(a);
    only_a.include(&only_b);
    only_a
}

fn fill(engine: &dyn DrawingEngine, rect: Rect, update: Rect, color: u32) {
    let clipped = rect.intersection(&update);
    if clipped.is_valid() {
        engine.fill_region(&Region::from(clipped), color);
    }
}

/// Titled decoration: a sliding tab with close/minimize/zoom buttons above
/// a border, plus a resize knob inside the frame for document windows
#[derive(Debug)]
pub struct TabbedDecorator {
    look: WindowLook,
    frame: Rect,
    config: DecoratorConfig,
    /// Tab offset from the left border edge, in pixels
    tab_location: f32,
    focused: bool,
    close_pressed: bool,
    zoom_pressed: bool,
    minimize_pressed: bool,
}

impl TabbedDecorator {
    pub fn new(look: WindowLook, frame: Rect, config: DecoratorConfig) -> Self {
        Self {
            look,
            frame,
            config,
            tab_location: 0.0,
            focused: false,
            close_pressed: false,
            zoom_pressed: false,
            minimize_pressed: false,
        }
    }

    fn tab_height(&self) -> i32 {
        if self.look == WindowLook::Floating {
            self.config.tab_height * 2 / 3
        } else {
            self.config.tab_height
        }
    }

    fn border_rect(&self) -> Rect {
        self.frame
            .inset_by(-self.config.border_width, -self.config.border_width)
    }

    fn tab_width(&self) -> i32 {
        self.config.tab_width.min(self.border_rect().width())
    }

    fn max_tab_location(&self) -> f32 {
        (self.border_rect().width() - self.tab_width()).max(0) as f32
    }

    pub fn tab_rect(&self) -> Rect {
        let border = self.border_rect();
        let left = border.left + self.tab_location as i32;
        Rect::new(
            left,
            border.top - self.tab_height(),
            left + self.tab_width(),
            border.top - 1,
        )
    }

    fn button_rect(&self, slot_from_right: Option<i32>) -> Rect {
        let tab = self.tab_rect();
        let size = self.config.button_size;
        let pad = self.config.button_padding;
        let top = tab.top + (tab.height() - size) / 2;
        let left = match slot_from_right {
            None => tab.left + pad,
            Some(slot) => tab.right - pad - size - slot * (size + pad),
        };
        Rect::new(left, top, left + size, top + size)
    }

    pub fn close_rect(&self) -> Rect {
        self.button_rect(None)
    }

    pub fn zoom_rect(&self) -> Rect {
        self.button_rect(Some(0))
    }

    pub fn minimize_rect(&self) -> Rect {
        self.button_rect(Some(1))
    }

    fn resize_knob_rect(&self) -> Option<Rect> {
        (self.look == WindowLook::Document).then(|| {
            let knob = self.config.resize_knob_size;
            Rect::new(
                self.frame.right - knob,
                self.frame.bottom - knob,
                self.frame.right,
                self.frame.bottom,
            )
        })
    }

    fn in_resize_corner(&self, point: Point) -> bool {
        let corner = self.config.border_width + self.config.resize_knob_size;
        point.x > self.frame.right - corner && point.y > self.frame.bottom - corner
    }
}

impl Decorator for TabbedDecorator {
    fn footprint(&self) -> Region {
        let mut footprint = border_ring(self.frame, self.config.border_width);
        footprint.include_rect(self.tab_rect());
        if let Some(knob) = self.resize_knob_rect() {
            footprint.include_rect(knob);
        }
        footprint
    }

    fn draw(&self, engine: &dyn DrawingEngine, update: Rect) {
        let colors = &self.config.colors;
        trace!("drawing tabbed decorator, update {:?}", update);

        for rect in border_ring(self.frame, self.config.border_width).rects() {
            fill(engine, rect, update, colors.border);
        }
        let tab_color = if self.focused { colors.focused_tab } else { colors.tab };
        fill(engine, self.tab_rect(), update, tab_color);

        let buttons = [
            (self.close_rect(), self.close_pressed, colors.close_button),
            (self.zoom_rect(), self.zoom_pressed, colors.zoom_button),
            (self.minimize_rect(), self.minimize_pressed, colors.minimize_button),
        ];
        for (rect, pressed, color) in buttons {
            fill(engine, rect, update, if pressed { colors.pressed_button } else { color });
        }

        if let Some(knob) = self.resize_knob_rect() {
            fill(engine, knob, update, colors.border);
        }
    }

    fn set_focus(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn clicked(&self, point: Point, buttons: MouseButtons, modifiers: Modifiers) -> ClickType {
        let tab = self.tab_rect();
        let in_tab = tab.contains(point);
        let in_border = border_ring(self.frame, self.config.border_width).contains(point);
        let in_knob = self.resize_knob_rect().is_some_and(|knob| knob.contains(point));

        if !in_tab && !in_border && !in_knob {
            return modifier_action(buttons, modifiers);
        }
        if buttons.contains(MouseButtons::SECONDARY) {
            return ClickType::MoveToBack;
        }
        if in_tab {
            if self.close_rect().contains(point) {
                return ClickType::Close;
            }
            if self.zoom_rect().contains(point) {
                return ClickType::Zoom;
            }
            if self.minimize_rect().contains(point) {
                return ClickType::Minimize;
            }
            if modifiers.contains(Modifiers::SHIFT) {
                return ClickType::SlideTab;
            }
            return ClickType::Drag;
        }
        if in_knob || self.in_resize_corner(point) {
            return ClickType::Resize;
        }
        ClickType::Drag
    }

    fn move_by(&mut self, dx: i32, dy: i32) {
        self.frame = self.frame.offset_by(dx, dy);
    }

    fn resize_by(&mut self, dx: i32, dy: i32, dirty: Option<&mut Region>) {
        let before = self.footprint();
        self.frame.right += dx;
        self.frame.bottom += dy;
        // keep the tab inside the (possibly narrower) border
        self.tab_location = self.tab_location.min(self.max_tab_location());

        if let Some(dirty) = dirty {
            dirty.include(&symmetric_difference(&before, &self.footprint()));
            if let Some(knob) = self.resize_knob_rect() {
                dirty.include_rect(knob);
            }
        }
    }

    fn constrain_size_limits(&self, limits: &mut SizeLimits) {
        let buttons = 3 * self.config.button_size + 4 * self.config.button_padding;
        let min_width = buttons - 2 * self.config.border_width;
        limits.min_width = limits.min_width.max(min_width);
        if let Some(knob) = self.resize_knob_rect() {
            limits.min_height = limits.min_height.max(knob.height());
        }
    }

    fn tab_location(&self) -> f32 {
        self.tab_location
    }

    fn set_tab_location(&mut self, location: f32, dirty: Option<&mut Region>) -> bool {
        let location = location.clamp(0.0, self.max_tab_location());
        if location == self.tab_location {
            return false;
        }
        let old_tab = self.tab_rect();
        self.tab_location = location;
        if let Some(dirty) = dirty {
            dirty.include_rect(old_tab);
            dirty.include_rect(self.tab_rect());
        }
        true
    }

    fn set_close(&mut self, pressed: bool) {
        self.close_pressed = pressed;
    }

    fn set_zoom(&mut self, pressed: bool) {
        self.zoom_pressed = pressed;
    }

    fn set_minimize(&mut self, pressed: bool) {
        self.minimize_pressed = pressed;
    }
}

/// Border-only decoration
#[derive(Debug)]
pub struct BorderedDecorator {
    frame: Rect,
    config: DecoratorConfig,
    width: i32,
}

impl BorderedDecorator {
    pub fn new(frame: Rect, config: DecoratorConfig, width: i32) -> Self {
        Self {
            frame,
            config,
            width: width.max(1),
        }
    }
}

impl Decorator for BorderedDecorator {
    fn footprint(&self) -> Region {
        border_ring(self.frame, self.width)
    }

    fn draw(&self, engine: &dyn DrawingEngine, update: Rect) {
        for rect in self.footprint().rects() {
            fill(engine, rect, update, self.config.colors.border);
        }
    }

    fn set_focus(&mut self, _focused: bool) {}

    fn clicked(&self, point: Point, buttons: MouseButtons, modifiers: Modifiers) -> ClickType {
        if !self.footprint().contains(point) {
            return modifier_action(buttons, modifiers);
        }
        if buttons.contains(MouseButtons::SECONDARY) {
            return ClickType::MoveToBack;
        }
        let corner = self.width + self.config.resize_knob_size;
        if point.x > self.frame.right - corner && point.y > self.frame.bottom - corner {
            return ClickType::Resize;
        }
        ClickType::Drag
    }

    fn move_by(&mut self, dx: i32, dy: i32) {
        self.frame = self.frame.offset_by(dx, dy);
    }

    fn resize_by(&mut self, dx: i32, dy: i32, dirty: Option<&mut Region>) {
        let before = self.footprint();
        self.frame.right += dx;
        self.frame.bottom += dy;
        if let Some(dirty) = dirty {
            dirty.include(&symmetric_difference(&before, &self.footprint()));
        }
    }

    fn constrain_size_limits(&self, _limits: &mut SizeLimits) {}
}
