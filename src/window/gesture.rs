//! Interactive mouse handling: decoration buttons, dragging, resizing and
//! tab sliding.
//!
//! The desktop dispatches every pointer event to the window under the
//! cursor (or the window that owns the current gesture) with the write
//! lock held. Geometry changes go back through [`DesktopOps`], which may
//! clamp or refuse them; the gesture only ever advances by what was
//! actually applied.

use std::time::{Duration, Instant};

use area_ipc::ClientMessage;
use tracing::{debug, trace, warn};

use super::types::{MouseEvent, WindowFlags};
use super::Window;
use crate::config::{DesktopConfig, GestureConfig, MouseMode};
use crate::decorator::{self, ClickType};
use crate::errors::{ServerError, ServerResult};
use crate::shared::{Point, Rect, WindowId};

/// Desktop operations a gesture may trigger.
///
/// The window handling the event is passed in already locked; the
/// desktop must not lock it again.
pub trait DesktopOps {
    fn desktop_config(&self) -> &DesktopConfig;

    fn gesture_config(&self) -> &GestureConfig;

    /// Screen area windows snap to while dragged.
    fn screen_frame(&self) -> Rect;

    fn move_window_by(&mut self, window: &mut Window, dx: i32, dy: i32) -> ServerResult<()>;

    fn resize_window_by(&mut self, window: &mut Window, dx: i32, dy: i32) -> ServerResult<()>;

    /// Returns whether the tab actually moved.
    fn set_window_tab_location(&mut self, window: &mut Window, location: f32)
        -> ServerResult<bool>;

    /// Raise and focus.
    fn activate_window(&mut self, window: &mut Window) -> ServerResult<()>;

    fn set_focus_window(&mut self, window: &mut Window) -> ServerResult<()>;

    fn send_window_behind(&mut self, window: &mut Window) -> ServerResult<()>;

    /// Route further pointer events to `window` until the buttons go up.
    fn set_mouse_event_window(&mut self, window: Option<WindowId>);

    /// Whether a modal window blocks input to `window`.
    fn has_modal(&self, window: &Window) -> bool;
}

/// What became of a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseDispatch {
    /// The decoration or a gesture used it
    Consumed,
    /// Forward to the client view with this token
    View(i32),
    /// Neither the window nor a view wants it
    Ignored,
    /// The window went away while handling it; no state was changed
    NothingChanged,
}

/// Gesture bookkeeping of one window. At most one of dragging, resizing
/// and sliding the tab is active.
#[derive(Debug, Default)]
pub(crate) struct GestureState {
    dragging: bool,
    resizing: bool,
    sliding_tab: bool,
    closing: bool,
    zooming: bool,
    minimizing: bool,
    activate_on_mouse_up: bool,
    last_mouse_position: Point,
    last_move_time: Option<Instant>,
    press_time: Option<Instant>,
    /// Squared pointer travel since the press
    mouse_move_distance: f32,
    last_snap_time: Option<Instant>,
}

impl GestureState {
    fn reset(&mut self) {
        // snapping keeps its pause across gestures
        let last_snap_time = self.last_snap_time;
        *self = Self {
            last_snap_time,
            ..Self::default()
        };
    }
}

fn since(now: Instant, earlier: Option<Instant>) -> Option<Duration> {
    earlier.map(|earlier| now.saturating_duration_since(earlier))
}

impl Window {
    pub fn is_dragging(&self) -> bool {
        self.gesture.dragging
    }

    pub fn is_resizing(&self) -> bool {
        self.gesture.resizing
    }

    pub fn is_sliding_tab(&self) -> bool {
        self.gesture.sliding_tab
    }

    pub fn activates_on_mouse_up(&self) -> bool {
        self.gesture.activate_on_mouse_up
    }

    /// What the decoration makes of the event.
    fn action_for(&self, event: &MouseEvent) -> ClickType {
        match &self.decorator {
            Some(decorator) => decorator.clicked(event.position, event.buttons, event.modifiers),
            None => ClickType::None,
        }
    }

    fn abandon_gesture(&mut self, error: ServerError) -> MouseDispatch {
        debug!("Window {}: gesture abandoned: {}", self.id, error);
        self.gesture.reset();
        MouseDispatch::NothingChanged
    }

    fn show_pressed_buttons(&mut self) {
        let gesture = &self.gesture;
        let (closing, zooming, minimizing) = (gesture.closing, gesture.zooming, gesture.minimizing);
        let Some(decorator) = &mut self.decorator else {
            return;
        };
        decorator.set_close(closing);
        decorator.set_zoom(zooming);
        decorator.set_minimize(minimizing);
        if let Err(e) = self.draw_visible_border() {
            warn!("Window {}: decoration not redrawn: {}", self.id, e);
        }
    }

    pub fn mouse_down(&mut self, event: &MouseEvent, desktop: &mut dyn DesktopOps) -> MouseDispatch {
        match self.handle_mouse_down(event, desktop) {
            Ok(dispatch) => dispatch,
            Err(e) => self.abandon_gesture(e),
        }
    }

    fn handle_mouse_down(
        &mut self,
        event: &MouseEvent,
        desktop: &mut dyn DesktopOps,
    ) -> ServerResult<MouseDispatch> {
        let point = event.position;
        let in_border = self.decorator.is_some() && self.border_region().contains(point);
        let window_modifier = !self
            .flags
            .contains(WindowFlags::NO_SERVER_SIDE_WINDOW_MODIFIERS)
            && decorator::modifier_action(event.buttons, event.modifiers) != ClickType::None;

        if !in_border && !window_modifier {
            return self.content_mouse_down(event, desktop);
        }

        let mut action = if in_border {
            self.action_for(event)
        } else {
            decorator::modifier_action(event.buttons, event.modifiers)
        };

        let refused = match action {
            ClickType::Close => self.flags.contains(WindowFlags::NOT_CLOSABLE),
            ClickType::Zoom => self.flags.contains(WindowFlags::NOT_ZOOMABLE),
            ClickType::Minimize => self.flags.contains(WindowFlags::NOT_MINIMIZABLE),
            _ => false,
        };
        // the first click on an inactive window must not close it
        let first_click = !self.is_focus
            && !self.is_floating()
            && !desktop.desktop_config().accept_first_click
            && !self.flags.contains(WindowFlags::WILL_ACCEPT_FIRST_CLICK);
        if action.is_button() && (refused || first_click) {
            action = ClickType::Drag;
        }

        self.gesture.reset();
        self.gesture.press_time = Some(event.when);
        match action {
            ClickType::Close => self.gesture.closing = true,
            ClickType::Zoom => self.gesture.zooming = true,
            ClickType::Minimize => self.gesture.minimizing = true,
            ClickType::Drag => self.gesture.dragging = true,
            ClickType::Resize => self.gesture.resizing = true,
            ClickType::SlideTab => self.gesture.sliding_tab = true,
            ClickType::MoveToBack | ClickType::None => {}
        }
        self.gesture.last_mouse_position = point;
        trace!("Window {}: mouse down on decoration: {:?}", self.id, action);

        if action.is_button() {
            self.show_pressed_buttons();
        }

        let mode = desktop.desktop_config().mouse_mode;
        if action == ClickType::MoveToBack {
            if mode == MouseMode::ClickToFocus && self.full_region() != self.visible_region {
                // a covered window comes forward instead
                desktop.activate_window(self)?;
            } else {
                desktop.send_window_behind(self)?;
            }
            return Ok(MouseDispatch::Consumed);
        }

        desktop.set_mouse_event_window(Some(self.id));
        if mode == MouseMode::ClickToActivate {
            desktop.activate_window(self)?;
        } else {
            desktop.set_focus_window(self)?;
            if mode == MouseMode::FocusFollowsMouse
                && matches!(action, ClickType::Drag | ClickType::Resize)
            {
                self.gesture.activate_on_mouse_up = true;
                self.gesture.mouse_move_distance = 0.0;
            }
        }
        Ok(MouseDispatch::Consumed)
    }

    fn content_mouse_down(
        &mut self,
        event: &MouseEvent,
        desktop: &mut dyn DesktopOps,
    ) -> ServerResult<MouseDispatch> {
        let Some(token) = self.top_view.view_at(event.position) else {
            return Ok(MouseDispatch::Ignored);
        };
        if desktop.has_modal(self) {
            return Ok(MouseDispatch::Ignored);
        }

        if !self.is_focus {
            let config = desktop.desktop_config();
            let accept_first_click = config.accept_first_click
                || self.flags.contains(WindowFlags::WILL_ACCEPT_FIRST_CLICK);
            let avoid_focus = self.flags.contains(WindowFlags::AVOID_FOCUS);
            let mode = config.mouse_mode;

            if mode == MouseMode::ClickToActivate && !accept_first_click {
                desktop.activate_window(self)?;
            } else if !avoid_focus {
                desktop.set_focus_window(self)?;
            }

            // the activating click is eaten; avoid-focus windows never get
            // focus and so need the first click
            if !accept_first_click && !avoid_focus {
                return Ok(MouseDispatch::Ignored);
            }
        }
        Ok(MouseDispatch::View(token))
    }

    pub fn mouse_moved(&mut self, event: &MouseEvent, desktop: &mut dyn DesktopOps) -> MouseDispatch {
        match self.handle_mouse_moved(event, desktop) {
            Ok(dispatch) => dispatch,
            Err(e) => self.abandon_gesture(e),
        }
    }

    fn handle_mouse_moved(
        &mut self,
        event: &MouseEvent,
        desktop: &mut dyn DesktopOps,
    ) -> ServerResult<MouseDispatch> {
        let view = self.top_view.view_at(event.position);
        let in_gesture = self.gesture.dragging
            || self.gesture.resizing
            || self.gesture.sliding_tab
            || self.gesture.closing
            || self.gesture.zooming
            || self.gesture.minimizing;
        let dispatch = if in_gesture {
            MouseDispatch::Consumed
        } else {
            view.map_or(MouseDispatch::Ignored, MouseDispatch::View)
        };

        // only the newest position of a coalesced batch matters
        if !event.latest {
            return Ok(dispatch);
        }

        let now = event.when;
        let gesture_config = desktop.gesture_config().clone();
        if self.gesture.dragging || self.gesture.resizing {
            if since(now, self.gesture.last_move_time)
                .is_some_and(|elapsed| elapsed < gesture_config.move_rate_limit())
            {
                return Ok(dispatch);
            }
            if self.gesture.activate_on_mouse_up
                && since(now, self.gesture.press_time)
                    .is_some_and(|held| held >= gesture_config.activation_timeout())
            {
                // held too long to count as a click
                self.gesture.activate_on_mouse_up = false;
            }
        }

        if self.gesture.closing || self.gesture.zooming || self.gesture.minimizing {
            // a button only looks pressed while the pointer is over it
            let action = self.action_for(event);
            let (closing, zooming, minimizing) = (
                self.gesture.closing && action == ClickType::Close,
                self.gesture.zooming && action == ClickType::Zoom,
                self.gesture.minimizing && action == ClickType::Minimize,
            );
            if let Some(decorator) = &mut self.decorator {
                decorator.set_close(closing);
                decorator.set_zoom(zooming);
                decorator.set_minimize(minimizing);
            }
            if let Err(e) = self.draw_visible_border() {
                warn!("Window {}: decoration not redrawn: {}", self.id, e);
            }
        }

        let mut delta = event.position - self.gesture.last_mouse_position;

        if self.gesture.activate_on_mouse_up {
            self.gesture.mouse_move_distance += (delta.x * delta.x + delta.y * delta.y) as f32;
            if self.gesture.mouse_move_distance > gesture_config.activation_move_distance {
                self.gesture.activate_on_mouse_up = false;
            } else {
                delta = Point::ORIGIN;
            }
        }

        if self.gesture.dragging {
            if self.flags.contains(WindowFlags::NOT_MOVABLE) {
                delta = Point::ORIGIN;
            } else {
                let old_left_top = self.frame.left_top();
                let snapped = self.alter_delta_for_snap(delta, now, desktop.screen_frame(), &gesture_config);
                desktop.move_window_by(self, snapped.x, snapped.y)?;
                delta = self.frame.left_top() - old_left_top;
            }
        }

        if self.gesture.resizing {
            if self.flags.contains(WindowFlags::NOT_RESIZABLE) {
                delta = Point::ORIGIN;
            } else {
                if self.flags.contains(WindowFlags::NOT_V_RESIZABLE) {
                    delta.y = 0;
                }
                if self.flags.contains(WindowFlags::NOT_H_RESIZABLE) {
                    delta.x = 0;
                }
                let old_right_bottom = self.frame.right_bottom();
                desktop.resize_window_by(self, delta.x, delta.y)?;
                delta = self.frame.right_bottom() - old_right_bottom;
            }
        }

        if self.gesture.sliding_tab {
            let old_location = self.tab_location();
            let location = old_location + delta.x as f32;
            if desktop.set_window_tab_location(self, location)? {
                // the decorator keeps the tab inside the border
                delta.x = (self.tab_location() - old_location).round() as i32;
                delta.y = 0;
            } else {
                delta = Point::ORIGIN;
            }
        }

        // keeps the pointer anchored to whatever is being moved
        self.gesture.last_mouse_position += delta;

        if desktop.desktop_config().mouse_mode == MouseMode::FocusFollowsMouse
            && !self.is_focus
            && !self.flags.contains(WindowFlags::AVOID_FOCUS)
        {
            desktop.set_focus_window(self)?;
        }

        if self.gesture.dragging || self.gesture.resizing {
            self.gesture.last_move_time = Some(now);
        }
        Ok(dispatch)
    }

    /// Adjust a drag delta so the decorated frame sticks to the screen
    /// edges. Snapping holds for a while, then pauses so the window can be
    /// pulled free.
    fn alter_delta_for_snap(
        &mut self,
        delta: Point,
        now: Instant,
        screen: Rect,
        config: &GestureConfig,
    ) -> Point {
        let since_snap = since(now, self.gesture.last_snap_time);
        if since_snap.is_some_and(|elapsed| {
            elapsed > config.snapping_duration() && elapsed < config.snapping_pause()
        }) {
            return delta;
        }

        let mut frame = self.frame;
        let mut offset_within_frame = Point::ORIGIN;
        if let Some(decorator) = &self.decorator {
            frame = decorator.footprint().frame();
            offset_within_frame = self.frame.left_top() - frame.left_top();
        }
        let mut frame = frame.offset_by(delta.x, delta.y);

        let snap = config.snap_distance;
        let left_distance = (frame.left - screen.left).abs();
        let top_distance = (frame.top - screen.top).abs();
        let right_distance = (frame.right - screen.right).abs();
        let bottom_distance = (frame.bottom - screen.bottom).abs();

        let mut snapped = false;
        if left_distance < snap || right_distance < snap {
            snapped = true;
            let width = frame.width();
            if left_distance < right_distance {
                frame.left = screen.left;
            } else {
                frame.left = screen.right - width;
            }
            frame.right = frame.left + width;
        }
        if top_distance < snap || bottom_distance < snap {
            snapped = true;
            let height = frame.height();
            if top_distance < bottom_distance {
                frame.top = screen.top;
            } else {
                frame.top = screen.bottom - height;
            }
            frame.bottom = frame.top + height;
        }

        if snapped && since_snap.is_none_or(|elapsed| elapsed > config.snapping_pause()) {
            trace!("Window {}: snapped to screen edge", self.id);
            self.gesture.last_snap_time = Some(now);
        }

        let left_top = frame.left_top() + offset_within_frame;
        left_top - self.frame.left_top()
    }

    pub fn mouse_up(&mut self, event: &MouseEvent, desktop: &mut dyn DesktopOps) -> MouseDispatch {
        match self.handle_mouse_up(event, desktop) {
            Ok(dispatch) => dispatch,
            Err(e) => self.abandon_gesture(e),
        }
    }

    fn handle_mouse_up(
        &mut self,
        event: &MouseEvent,
        desktop: &mut dyn DesktopOps,
    ) -> ServerResult<MouseDispatch> {
        let in_gesture = self.gesture.dragging
            || self.gesture.resizing
            || self.gesture.sliding_tab
            || self.gesture.closing
            || self.gesture.zooming
            || self.gesture.minimizing;

        if self.decorator.is_some() {
            let action = self.action_for(event);
            let gesture = &self.gesture;
            // press and release have to agree on the button
            let fired = if gesture.zooming && action == ClickType::Zoom {
                Some(ClientMessage::ZoomRequested)
            } else if gesture.closing && action == ClickType::Close {
                Some(ClientMessage::QuitRequested)
            } else if gesture.minimizing && action == ClickType::Minimize {
                Some(ClientMessage::MinimizeRequested { minimize: true })
            } else {
                None
            };
            let was_pressed = gesture.closing || gesture.zooming || gesture.minimizing;

            self.gesture.closing = false;
            self.gesture.zooming = false;
            self.gesture.minimizing = false;
            if was_pressed {
                self.show_pressed_buttons();
            }
            if let Some(message) = fired {
                debug!("Window {}: decoration button fired: {:?}", self.id, message);
                self.notify_client(message);
            }
        }

        let activate = self.gesture.activate_on_mouse_up
            && since(event.when, self.gesture.press_time).is_some_and(|held| {
                held < desktop.gesture_config().activation_timeout()
            });
        self.gesture.activate_on_mouse_up = false;
        self.gesture.dragging = false;
        self.gesture.resizing = false;
        self.gesture.sliding_tab = false;
        self.gesture.last_move_time = None;

        if activate {
            // a drag click that never moved raises the window
            desktop.activate_window(self)?;
        }

        if in_gesture {
            return Ok(MouseDispatch::Consumed);
        }
        match self.top_view.view_at(event.position) {
            Some(_) if desktop.has_modal(self) => Ok(MouseDispatch::Ignored),
            Some(token) => Ok(MouseDispatch::View(token)),
            None => Ok(MouseDispatch::Ignored),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Region;
    use crate::testing::{self, DesktopCall, TestDesktop};
    use crate::window::{Modifiers, MouseButtons, WindowAttributes, WindowFeel};

    const FRAME: Rect = Rect {
        left: 100,
        top: 100,
        right: 299,
        bottom: 299,
    };

    fn press(position: Point, when: Instant) -> MouseEvent {
        MouseEvent::new(position, MouseButtons::PRIMARY, when)
    }

    /// A spot on the tab away from the buttons (border 5, tab height 21).
    fn tab_middle() -> Point {
        Point::new(FRAME.left + 60, FRAME.top - 5 - 21 + 10)
    }

    fn close_button() -> Point {
        Point::new(FRAME.left - 5 + 4 + 6, FRAME.top - 5 - 21 + 4 + 6)
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_drag_moves_window_and_stays_anchored() {
        let mut test = testing::visible_window(FRAME);
        test.window.set_focus(true);
        let mut desktop = TestDesktop::new(&test.window);
        let start = Instant::now();
        let grab = tab_middle();

        assert_eq!(
            test.window.mouse_down(&press(grab, start), &mut desktop),
            MouseDispatch::Consumed
        );
        assert!(test.window.is_dragging());

        let moved = grab.offset_by(40, 30);
        test.window
            .mouse_moved(&press(moved, start + ms(20)), &mut desktop);
        assert_eq!(test.window.frame(), FRAME.offset_by(40, 30));

        test.window
            .mouse_moved(&press(moved.offset_by(5, 0), start + ms(40)), &mut desktop);
        assert_eq!(test.window.frame(), FRAME.offset_by(45, 30));

        test.window.mouse_up(&press(moved, start + ms(60)), &mut desktop);
        assert!(!test.window.is_dragging());
        assert_eq!(desktop.mouse_event_window(), Some(test.window.id()));
    }

    #[test]
    fn test_moves_are_rate_limited() {
        let mut test = testing::visible_window(FRAME);
        test.window.set_focus(true);
        let mut desktop = TestDesktop::new(&test.window);
        let start = Instant::now();
        let grab = tab_middle();

        test.window.mouse_down(&press(grab, start), &mut desktop);
        test.window
            .mouse_moved(&press(grab.offset_by(10, 10), start + ms(20)), &mut desktop);
        // within 13.3ms of the last processed move
        test.window
            .mouse_moved(&press(grab.offset_by(20, 20), start + ms(25)), &mut desktop);
        assert_eq!(test.window.frame(), FRAME.offset_by(10, 10));

        // the next one catches up with the full delta
        test.window
            .mouse_moved(&press(grab.offset_by(20, 20), start + ms(40)), &mut desktop);
        assert_eq!(test.window.frame(), FRAME.offset_by(20, 20));
    }

    #[test]
    fn test_coalesced_moves_are_skipped() {
        let mut test = testing::visible_window(FRAME);
        test.window.set_focus(true);
        let mut desktop = TestDesktop::new(&test.window);
        let start = Instant::now();
        let grab = tab_middle();

        test.window.mouse_down(&press(grab, start), &mut desktop);
        let mut history = press(grab.offset_by(10, 10), start + ms(20));
        history.latest = false;
        test.window.mouse_moved(&history, &mut desktop);
        assert_eq!(test.window.frame(), FRAME);
    }

    #[test]
    fn test_drag_snaps_to_screen_edge() {
        let mut test = testing::visible_window(FRAME);
        test.window.set_focus(true);
        let mut desktop = TestDesktop::new(&test.window);
        let start = Instant::now();
        let grab = tab_middle();

        test.window.mouse_down(&press(grab, start), &mut desktop);
        // footprint left edge = 95; moving by -91 leaves it 4px off screen
        test.window
            .mouse_moved(&press(grab.offset_by(-91, 0), start + ms(20)), &mut desktop);

        // the border lines up with the screen edge
        assert_eq!(test.window.frame().left, 5);
    }

    #[test]
    fn test_snapping_pauses_after_duration() {
        let mut test = testing::visible_window(FRAME);
        test.window.set_focus(true);
        let mut desktop = TestDesktop::new(&test.window);
        let start = Instant::now();
        let grab = tab_middle();

        test.window.mouse_down(&press(grab, start), &mut desktop);
        test.window
            .mouse_moved(&press(grab.offset_by(-91, 0), start + ms(20)), &mut desktop);
        assert_eq!(test.window.frame().left, 5);

        // 2s after the snap: within the pause, no snapping
        let pointer = test.window.frame().left_top() - FRAME.left_top() + grab;
        test.window.mouse_moved(
            &press(pointer.offset_by(-2, 0), start + ms(2_020)),
            &mut desktop,
        );
        assert_eq!(test.window.frame().left, 3);
    }

    #[test]
    fn test_unfocused_button_click_demotes_to_drag() {
        let mut test = testing::visible_window(FRAME);
        let mut desktop = TestDesktop::new(&test.window);
        let close = close_button();

        test.window.mouse_down(&press(close, Instant::now()), &mut desktop);
        assert!(test.window.is_dragging());
        assert!(desktop.calls().contains(&DesktopCall::Activate(test.window.id())));

        test.window.mouse_up(&press(close, Instant::now()), &mut desktop);
        assert!(!test.received(&ClientMessage::QuitRequested));
    }

    #[test]
    fn test_floating_windows_take_button_clicks_unfocused() {
        let mut test = testing::visible_window_with(
            WindowAttributes::new("palette", FRAME).with_feel(WindowFeel::FloatingAll),
        );
        let mut desktop = TestDesktop::new(&test.window);
        let close = close_button();

        test.window.mouse_down(&press(close, Instant::now()), &mut desktop);
        assert!(!test.window.is_dragging());
        test.window.mouse_up(&press(close, Instant::now()), &mut desktop);
        assert!(test.received(&ClientMessage::QuitRequested));
    }

    #[test]
    fn test_button_fires_only_when_released_on_it() {
        let mut test = testing::visible_window(FRAME);
        test.window.set_focus(true);
        let mut desktop = TestDesktop::new(&test.window);
        let close = close_button();
        let start = Instant::now();

        test.window.mouse_down(&press(close, start), &mut desktop);
        test.window.mouse_moved(&press(Point::new(200, 200), start + ms(20)), &mut desktop);
        test.window.mouse_up(&press(Point::new(200, 200), start + ms(40)), &mut desktop);
        assert!(!test.received(&ClientMessage::QuitRequested));

        test.window.mouse_down(&press(close, start + ms(100)), &mut desktop);
        test.window.mouse_up(&press(close, start + ms(150)), &mut desktop);
        assert!(test.received(&ClientMessage::QuitRequested));
    }

    #[test]
    fn test_vanished_window_changes_nothing() {
        let mut test = testing::visible_window(FRAME);
        test.window.set_focus(true);
        let mut desktop = TestDesktop::new(&test.window);
        let start = Instant::now();
        let grab = tab_middle();

        test.window.mouse_down(&press(grab, start), &mut desktop);
        desktop.forget(test.window.id());

        let dispatch = test
            .window
            .mouse_moved(&press(grab.offset_by(30, 0), start + ms(20)), &mut desktop);
        assert_eq!(dispatch, MouseDispatch::NothingChanged);
        assert_eq!(test.window.frame(), FRAME);
        assert!(!test.window.is_dragging());
    }

    #[test]
    fn test_focus_follows_mouse_activates_still_drag_click_on_release() {
        let mut test = testing::visible_window(FRAME);
        let mut desktop = TestDesktop::new(&test.window);
        desktop.config.mouse_mode = MouseMode::FocusFollowsMouse;
        let start = Instant::now();
        let grab = tab_middle();

        test.window.mouse_down(&press(grab, start), &mut desktop);
        assert!(test.window.activates_on_mouse_up());
        assert!(desktop.calls().contains(&DesktopCall::Focus(test.window.id())));
        assert!(!desktop.calls().contains(&DesktopCall::Activate(test.window.id())));

        // a wobble below the distance threshold does not move the window
        test.window
            .mouse_moved(&press(grab.offset_by(1, 1), start + ms(20)), &mut desktop);
        assert_eq!(test.window.frame(), FRAME);

        test.window.mouse_up(&press(grab, start + ms(100)), &mut desktop);
        assert!(desktop.calls().contains(&DesktopCall::Activate(test.window.id())));
    }

    #[test]
    fn test_focus_follows_mouse_hold_cancels_activation() {
        let mut test = testing::visible_window(FRAME);
        let mut desktop = TestDesktop::new(&test.window);
        desktop.config.mouse_mode = MouseMode::FocusFollowsMouse;
        let start = Instant::now();
        let grab = tab_middle();

        test.window.mouse_down(&press(grab, start), &mut desktop);
        test.window.mouse_moved(&press(grab, start + ms(600)), &mut desktop);
        assert!(!test.window.activates_on_mouse_up());

        test.window.mouse_up(&press(grab, start + ms(700)), &mut desktop);
        assert!(!desktop.calls().contains(&DesktopCall::Activate(test.window.id())));
    }

    #[test]
    fn test_resize_advances_by_applied_delta() {
        let mut test = testing::visible_window(FRAME);
        test.window.set_focus(true);
        test.window.set_size_limits(50, 220, 50, 1000);
        let mut desktop = TestDesktop::new(&test.window);
        let start = Instant::now();
        let corner = Point::new(FRAME.right + 2, FRAME.bottom + 2);

        test.window.mouse_down(&press(corner, start), &mut desktop);
        assert!(test.window.is_resizing());

        // width is capped at 220: only 21 of the 50 pixels apply
        test.window
            .mouse_moved(&press(corner.offset_by(50, 10), start + ms(20)), &mut desktop);
        assert_eq!(test.window.frame().width(), 220);
        assert_eq!(test.window.frame().height(), 209);

        // moving back by the excess first does nothing
        test.window
            .mouse_moved(&press(corner.offset_by(21, 10), start + ms(40)), &mut desktop);
        assert_eq!(test.window.frame().width(), 220);
        test.window
            .mouse_moved(&press(corner.offset_by(11, 10), start + ms(60)), &mut desktop);
        assert_eq!(test.window.frame().width(), 210);
    }

    #[test]
    fn test_tab_slide_advances_by_applied_delta() {
        let mut test = testing::visible_window(FRAME);
        test.window.set_focus(true);
        let mut desktop = TestDesktop::new(&test.window);
        let start = Instant::now();
        let grab = tab_middle();

        test.window.mouse_down(
            &press(grab, start).with_modifiers(Modifiers::SHIFT),
            &mut desktop,
        );
        assert!(test.window.is_sliding_tab());

        test.window
            .mouse_moved(&press(grab.offset_by(30, 0), start + ms(20)), &mut desktop);
        assert_eq!(test.window.tab_location(), 30.0);

        // only 30 of the requested 60 pixels fit before the left edge
        test.window
            .mouse_moved(&press(grab.offset_by(-30, 0), start + ms(40)), &mut desktop);
        assert_eq!(test.window.tab_location(), 0.0);

        test.window
            .mouse_moved(&press(grab, start + ms(60)), &mut desktop);
        assert_eq!(test.window.tab_location(), 0.0);

        test.window
            .mouse_moved(&press(grab.offset_by(10, 0), start + ms(80)), &mut desktop);
        assert_eq!(test.window.tab_location(), 10.0);
        assert!(desktop
            .calls()
            .iter()
            .all(|call| matches!(call, DesktopCall::TabLocation(_) | DesktopCall::Activate(_))));
    }

    #[test]
    fn test_content_click_on_inactive_window_is_eaten() {
        let mut test = testing::visible_window(FRAME);
        let mut desktop = TestDesktop::new(&test.window);
        let inside = Point::new(150, 150);

        assert_eq!(
            test.window.mouse_down(&press(inside, Instant::now()), &mut desktop),
            MouseDispatch::Ignored
        );
        assert!(desktop.calls().contains(&DesktopCall::Activate(test.window.id())));

        test.window.set_focus(true);
        assert_eq!(
            test.window.mouse_down(&press(inside, Instant::now()), &mut desktop),
            MouseDispatch::View(0)
        );
    }

    #[test]
    fn test_first_click_flag_and_modal_block() {
        let mut test = testing::visible_window_with(
            WindowAttributes::new("tool", FRAME).with_flags(WindowFlags::WILL_ACCEPT_FIRST_CLICK),
        );
        let mut desktop = TestDesktop::new(&test.window);
        desktop.config.mouse_mode = MouseMode::ClickToFocus;
        let inside = Point::new(150, 150);

        assert_eq!(
            test.window.mouse_down(&press(inside, Instant::now()), &mut desktop),
            MouseDispatch::View(0)
        );
        assert!(desktop.calls().contains(&DesktopCall::Focus(test.window.id())));

        desktop.modal = true;
        assert_eq!(
            test.window.mouse_down(&press(inside, Instant::now()), &mut desktop),
            MouseDispatch::Ignored
        );
    }

    #[test]
    fn test_move_to_back_in_click_to_focus_raises_covered_window() {
        let mut test = testing::visible_window(FRAME);
        let mut desktop = TestDesktop::new(&test.window);
        desktop.config.mouse_mode = MouseMode::ClickToFocus;
        let grab = tab_middle();
        let secondary = MouseEvent::new(grab, MouseButtons::SECONDARY, Instant::now());

        test.window.mouse_down(&secondary, &mut desktop);
        assert!(desktop.calls().contains(&DesktopCall::SendBehind(test.window.id())));

        test.window
            .set_clipping(&Region::from(Rect::new(0, 0, 200, 1000)));
        test.window.mouse_down(&secondary, &mut desktop);
        assert!(desktop.calls().contains(&DesktopCall::Activate(test.window.id())));
    }

    #[test]
    fn test_window_modifier_drags_from_content() {
        let mut test = testing::visible_window(FRAME);
        test.window.set_focus(true);
        let mut desktop = TestDesktop::new(&test.window);
        let inside = Point::new(150, 150);
        let chord = press(inside, Instant::now()).with_modifiers(Modifiers::COMMAND | Modifiers::CONTROL);

        assert_eq!(test.window.mouse_down(&chord, &mut desktop), MouseDispatch::Consumed);
        assert!(test.window.is_dragging());

        test.window.mouse_up(&chord, &mut desktop);
        test.window
            .set_flags(WindowFlags::NO_SERVER_SIDE_WINDOW_MODIFIERS);
        assert_eq!(test.window.mouse_down(&chord, &mut desktop), MouseDispatch::View(0));
        assert!(!test.window.is_dragging());
    }
}
