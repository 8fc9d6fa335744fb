//! The desktop: stacking order, screen-wide clipping and input dispatch.
//!
//! Runs on a single desktop thread. Everything that changes which window
//! owns which screen pixels happens here under the write lock of the
//! shared [`MultiLocker`]; windows are locked only after it.
//!
//! Gesture handlers call back into the desktop through [`DesktopOps`] with
//! their own window already locked, so every helper that walks the stack
//! takes that window as `current` and uses it instead of locking it again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::config::{DesktopConfig, GestureConfig, ServerConfig};
use crate::engine::DrawingEngine;
use crate::errors::{ServerError, ServerResult};
use crate::link::DesktopEvent;
use crate::locking::MultiLocker;
use crate::region::Region;
use crate::shared::{Point, Rect, WindowId};
use crate::window::{
    lock_window, DesktopOps, MouseDispatch, MouseEvent, Window, WindowFlags,
};

pub struct Desktop {
    config: ServerConfig,
    screen: Rect,
    locker: Arc<MultiLocker>,
    engine: Arc<dyn DrawingEngine>,
    windows: HashMap<WindowId, Arc<Mutex<Window>>>,
    /// Back to front
    stack: Vec<WindowId>,
    focus: Option<WindowId>,
    mouse_event_window: Option<WindowId>,
    current_workspace: u32,
    /// Screen area no window covers
    background: Region,
    events: mpsc::UnboundedSender<DesktopEvent>,
    event_queue: mpsc::UnboundedReceiver<DesktopEvent>,
}

impl Desktop {
    pub fn new(config: ServerConfig, engine: Arc<dyn DrawingEngine>) -> Self {
        let screen = Rect::new(
            0,
            0,
            config.desktop.screen_width - 1,
            config.desktop.screen_height - 1,
        );
        let (events, event_queue) = mpsc::unbounded_channel();
        info!(
            "Desktop {}x{}, {} workspaces",
            config.desktop.screen_width, config.desktop.screen_height, config.desktop.workspace_count
        );
        Self {
            config,
            screen,
            locker: Arc::new(MultiLocker::new()),
            engine,
            windows: HashMap::new(),
            stack: Vec::new(),
            focus: None,
            mouse_event_window: None,
            current_workspace: 0,
            background: Region::from(screen),
            events,
            event_queue,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn locker(&self) -> &Arc<MultiLocker> {
        &self.locker
    }

    pub fn engine(&self) -> &Arc<dyn DrawingEngine> {
        &self.engine
    }

    /// Engine for a new window: same screen, private clipping and
    /// copy-to-front state.
    pub fn create_window_engine(&self) -> Arc<dyn DrawingEngine> {
        self.engine.create_window_engine()
    }

    pub fn window(&self, id: WindowId) -> Option<Arc<Mutex<Window>>> {
        self.windows.get(&id).cloned()
    }

    /// Window ids from back to front.
    pub fn stack(&self) -> &[WindowId] {
        &self.stack
    }

    pub fn focus_window(&self) -> Option<WindowId> {
        self.focus
    }

    pub fn current_workspace(&self) -> u32 {
        self.current_workspace
    }

    pub fn background_region(&self) -> &Region {
        &self.background
    }

    fn front_to_back(&self) -> Vec<WindowId> {
        self.stack.iter().rev().copied().collect()
    }

    fn ensure_managed(&self, id: WindowId) -> ServerResult<()> {
        if self.windows.contains_key(&id) {
            Ok(())
        } else {
            Err(ServerError::UnknownWindow(id))
        }
    }

    fn shared(&self, id: WindowId) -> ServerResult<Arc<Mutex<Window>>> {
        self.window(id).ok_or(ServerError::UnknownWindow(id))
    }

    /// Run `f` on window `id`, using `current` if it is that window.
    fn with_window<R>(
        &self,
        id: WindowId,
        current: &mut Option<&mut Window>,
        f: impl FnOnce(&mut Window) -> R,
    ) -> Option<R> {
        if let Some(window) = current.as_deref_mut().filter(|window| window.id() == id) {
            return Some(f(window));
        }
        let shared = self.windows.get(&id)?;
        let mut window = lock_window(shared);
        Some(f(&mut window))
    }

    // ------------------------------------------------------------------
    // Clipping and redraw
    // ------------------------------------------------------------------

    /// Hand out the screen front to back; what is left is background.
    fn rebuild_clipping(&mut self, current: &mut Option<&mut Window>) {
        let mut available = Region::from(self.screen);
        for id in self.front_to_back() {
            self.with_window(id, current, |window| {
                if window.is_visible() {
                    window.set_clipping(&available);
                    available.exclude(window.visible_region());
                } else {
                    window.set_clipping(&Region::new());
                }
            });
        }
        trace!("Clipping rebuilt, background {} rects", available.count_rects());
        self.background = available;
    }

    /// Send the parts of `dirty` each window shows to that window and paint
    /// the rest as background.
    fn trigger_window_redrawing(&self, dirty: &Region, current: &mut Option<&mut Window>) {
        if dirty.is_empty() {
            return;
        }
        for id in self.front_to_back() {
            self.with_window(id, current, |window| {
                if !window.is_visible() {
                    return;
                }
                let mut exposed = dirty.clone();
                exposed.intersect_with(window.visible_region());
                if !exposed.is_empty() {
                    window.process_dirty_region(&exposed);
                }
            });
        }

        let mut background = dirty.clone();
        background.intersect_with(&self.background);
        if !background.is_empty() {
            self.engine.constrain_clipping_region(Some(&background));
            self.engine
                .fill_region(&background, self.config.decorator.colors.background);
            self.engine.constrain_clipping_region(None);
        }
    }

    /// Repaint `region` of the screen, whichever windows show there.
    pub fn mark_dirty(&mut self, region: &Region) {
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();
        self.trigger_window_redrawing(region, &mut None);
    }

    /// Handle work queued by window threads. Returns the number of events.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.event_queue.try_recv() {
            match event {
                DesktopEvent::MarkDirty(region) => self.mark_dirty(&region),
            }
            handled += 1;
        }
        handled
    }

    // ------------------------------------------------------------------
    // Window management
    // ------------------------------------------------------------------

    /// Take over a (hidden) window and put it on top of the stack.
    pub fn add_window(&mut self, mut window: Window) -> Arc<Mutex<Window>> {
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();

        let id = window.id();
        window.link_mut().set_desktop(self.events.clone());
        let workspace = self.current_workspace;
        let current = window.in_workspace(workspace).then_some(workspace);
        window.set_current_workspace(current);

        let shared = Arc::new(Mutex::new(window));
        self.windows.insert(id, Arc::clone(&shared));
        self.stack.push(id);
        debug!("Window {} added", id);
        shared
    }

    pub fn show_window(&mut self, id: WindowId) -> ServerResult<()> {
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();
        let shared = self.shared(id)?;
        let mut window = lock_window(&shared);
        if !window.is_hidden() {
            return Ok(());
        }

        window.set_hidden(false);
        self.rebuild_clipping(&mut Some(&mut *window));
        let dirty = window.visible_region().clone();
        self.trigger_window_redrawing(&dirty, &mut Some(&mut *window));
        debug!("Window {} shown", id);

        if window.is_visible() && !window.flags().contains(WindowFlags::AVOID_FOCUS) {
            self.activate_window(&mut window)?;
        }
        Ok(())
    }

    pub fn hide_window(&mut self, id: WindowId) -> ServerResult<()> {
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();
        let shared = self.shared(id)?;
        let mut window = lock_window(&shared);
        if window.is_hidden() {
            return Ok(());
        }

        let exposed = window.visible_region().clone();
        window.set_hidden(true);
        self.rebuild_clipping(&mut Some(&mut *window));
        self.trigger_window_redrawing(&exposed, &mut Some(&mut *window));
        debug!("Window {} hidden", id);

        if self.mouse_event_window == Some(id) {
            self.mouse_event_window = None;
        }
        if self.focus == Some(id) {
            let next = self.front_most_focusable(Some(id));
            self.change_focus(next, &mut Some(&mut *window));
        }
        Ok(())
    }

    /// Hide and forget a window. The caller owns what is returned.
    pub fn remove_window(&mut self, id: WindowId) -> Option<Arc<Mutex<Window>>> {
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();
        if let Err(e) = self.hide_window(id) {
            debug!("Window {} not removed: {}", id, e);
            return None;
        }
        self.stack.retain(|&other| other != id);
        debug!("Window {} removed", id);
        let removed = self.windows.remove(&id)?;
        lock_window(&removed).link().quit();
        Some(removed)
    }

    pub fn activate(&mut self, id: WindowId) -> ServerResult<()> {
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();
        let shared = self.shared(id)?;
        let mut window = lock_window(&shared);
        self.activate_window(&mut window)
    }

    pub fn send_behind(&mut self, id: WindowId) -> ServerResult<()> {
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();
        let shared = self.shared(id)?;
        let mut window = lock_window(&shared);
        self.send_window_behind(&mut window)
    }

    pub fn move_window(&mut self, id: WindowId, dx: i32, dy: i32) -> ServerResult<()> {
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();
        let shared = self.shared(id)?;
        let mut window = lock_window(&shared);
        self.move_window_by(&mut window, dx, dy)
    }

    pub fn resize_window(&mut self, id: WindowId, dx: i32, dy: i32) -> ServerResult<()> {
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();
        let shared = self.shared(id)?;
        let mut window = lock_window(&shared);
        self.resize_window_by(&mut window, dx, dy)
    }

    /// Apply new size limits and repaint whatever the forced resize changed.
    pub fn set_window_size_limits(
        &mut self,
        id: WindowId,
        min_width: i32,
        max_width: i32,
        min_height: i32,
        max_height: i32,
    ) -> ServerResult<()> {
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();
        let shared = self.shared(id)?;
        let mut window = lock_window(&shared);

        let mut previously = window.visible_region().clone();
        let mut dirty = window.set_size_limits(min_width, max_width, min_height, max_height);
        if window.is_visible() {
            self.rebuild_clipping(&mut Some(&mut *window));
            previously.exclude(window.visible_region());
            dirty.intersect_with(window.visible_region());
            dirty.include(&previously);
            self.trigger_window_redrawing(&dirty, &mut Some(&mut *window));
        }
        Ok(())
    }

    /// Switch the shown workspace. Windows return to where they were when
    /// it was last shown.
    pub fn set_workspace(&mut self, index: u32) {
        if index >= self.config.desktop.workspace_count || index == self.current_workspace {
            return;
        }
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();
        let previous = self.current_workspace;
        self.current_workspace = index;

        for id in self.front_to_back() {
            self.with_window(id, &mut None, |window| {
                if window.current_workspace().is_some() {
                    window.workspace_activated(previous, false);
                }
                if !window.in_workspace(index) {
                    window.set_current_workspace(None);
                    return;
                }
                window.set_current_workspace(Some(index));
                if let Some(anchor) = window.anchor(index) {
                    let offset = anchor - window.frame().left_top();
                    window.move_by(offset.x, offset.y);
                }
                window.workspace_activated(index, true);
            });
        }

        self.rebuild_clipping(&mut None);
        self.trigger_window_redrawing(&Region::from(self.screen), &mut None);
        info!("Switched to workspace {}", index);

        let focus_gone = self.focus.is_some_and(|focus| {
            self.with_window(focus, &mut None, |window| !window.is_visible())
                .unwrap_or(true)
        });
        if focus_gone || self.focus.is_none() {
            let next = self.front_most_focusable(None);
            self.change_focus(next, &mut None);
        }
    }

    /// Change the workspaces a window lives on.
    pub fn set_window_workspaces(&mut self, id: WindowId, workspaces: u32) -> ServerResult<()> {
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();
        let shared = self.shared(id)?;
        let mut window = lock_window(&shared);

        let old = window.workspaces();
        if old == workspaces {
            return Ok(());
        }
        let previously = window.visible_region().clone();
        window.workspaces_changed(old, workspaces);
        let workspace = self.current_workspace;
        let current = window.in_workspace(workspace).then_some(workspace);
        window.set_current_workspace(current);

        self.rebuild_clipping(&mut Some(&mut *window));
        let mut dirty = previously;
        dirty.include(window.visible_region());
        self.trigger_window_redrawing(&dirty, &mut Some(&mut *window));
        Ok(())
    }

    fn front_most_focusable(&self, except: Option<WindowId>) -> Option<WindowId> {
        self.front_to_back()
            .into_iter()
            .filter(|&id| Some(id) != except)
            .find(|&id| {
                self.with_window(id, &mut None, |window| {
                    window.is_visible() && !window.flags().contains(WindowFlags::AVOID_FOCUS)
                })
                .unwrap_or(false)
            })
    }

    fn change_focus(&mut self, target: Option<WindowId>, current: &mut Option<&mut Window>) {
        if self.focus == target {
            return;
        }
        let mut dirty = Region::new();
        if let Some(old) = self.focus {
            if let Some(border) = self.with_window(old, current, |window| window.set_focus(false)) {
                dirty.include(&border);
            }
        }
        self.focus = target;
        if let Some(new) = target {
            if let Some(border) = self.with_window(new, current, |window| window.set_focus(true)) {
                dirty.include(&border);
            }
        }
        debug!("Focus moved to {:?}", target);
        self.trigger_window_redrawing(&dirty, current);
    }

    /// Move `window` to the front, followed by the windows it has to stay
    /// behind.
    fn bring_to_front(&mut self, window: &Window) {
        let id = window.id();
        self.stack.retain(|&other| other != id);
        let in_front: Vec<WindowId> = self
            .stack
            .iter()
            .copied()
            .filter(|&other| {
                self.with_window(other, &mut None, |other| other.has_in_subset(window))
                    .unwrap_or(false)
            })
            .collect();
        self.stack.retain(|other| !in_front.contains(other));
        self.stack.push(id);
        self.stack.extend(in_front);
    }

    /// Move `window` to the back, keeping the windows it covers behind it.
    fn push_to_back(&mut self, window: &Window) {
        let id = window.id();
        self.stack.retain(|&other| other != id);
        let mut stack: Vec<WindowId> = self
            .stack
            .iter()
            .copied()
            .filter(|&other| {
                self.with_window(other, &mut None, |other| window.has_in_subset(other))
                    .unwrap_or(false)
            })
            .collect();
        self.stack.retain(|other| !stack.contains(other));
        stack.push(id);
        stack.append(&mut self.stack);
        self.stack = stack;
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Front-most window showing `point`.
    pub fn window_at(&self, point: Point) -> Option<WindowId> {
        self.front_to_back().into_iter().find(|&id| {
            self.with_window(id, &mut None, |window| {
                window.is_visible() && window.visible_region().contains(point)
            })
            .unwrap_or(false)
        })
    }

    fn mouse_target(&self, point: Point) -> Option<Arc<Mutex<Window>>> {
        self.mouse_event_window
            .filter(|id| self.windows.contains_key(id))
            .or_else(|| self.window_at(point))
            .and_then(|id| self.window(id))
    }

    pub fn mouse_down(&mut self, event: &MouseEvent) -> MouseDispatch {
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();
        let Some(shared) = self.window_at(event.position).and_then(|id| self.window(id)) else {
            return MouseDispatch::Ignored;
        };
        let mut window = lock_window(&shared);
        window.mouse_down(event, self)
    }

    pub fn mouse_moved(&mut self, event: &MouseEvent) -> MouseDispatch {
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();
        let Some(shared) = self.mouse_target(event.position) else {
            return MouseDispatch::Ignored;
        };
        let mut window = lock_window(&shared);
        window.mouse_moved(event, self)
    }

    pub fn mouse_up(&mut self, event: &MouseEvent) -> MouseDispatch {
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();
        let Some(shared) = self.mouse_target(event.position) else {
            return MouseDispatch::Ignored;
        };
        let dispatch = {
            let mut window = lock_window(&shared);
            window.mouse_up(event, self)
        };
        self.mouse_event_window = None;
        dispatch
    }
}

impl DesktopOps for Desktop {
    fn desktop_config(&self) -> &DesktopConfig {
        &self.config.desktop
    }

    fn gesture_config(&self) -> &GestureConfig {
        &self.config.gesture
    }

    fn screen_frame(&self) -> Rect {
        self.screen
    }

    fn move_window_by(&mut self, window: &mut Window, dx: i32, dy: i32) -> ServerResult<()> {
        self.ensure_managed(window.id())?;
        if dx == 0 && dy == 0 {
            return Ok(());
        }
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();

        if !window.is_visible() {
            window.move_by(dx, dy);
            return Ok(());
        }

        let old_visible = window.visible_region().clone();
        window.move_by(dx, dy);
        self.rebuild_clipping(&mut Some(&mut *window));

        // pixels visible both before and after can be blitted
        let mut copy = window.visible_region().clone();
        copy.offset_by(-dx, -dy);
        copy.intersect_with(&old_visible);

        let mut dirty = old_visible;
        dirty.include(window.visible_region());
        if !copy.is_empty() {
            self.engine.copy_region(&copy, dx, dy);
        }
        copy.offset_by(dx, dy);
        dirty.exclude(&copy);

        self.trigger_window_redrawing(&dirty, &mut Some(window));
        Ok(())
    }

    fn resize_window_by(&mut self, window: &mut Window, dx: i32, dy: i32) -> ServerResult<()> {
        self.ensure_managed(window.id())?;
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();

        if !window.is_visible() {
            window.resize_by(dx, dy, None);
            return Ok(());
        }

        let mut previously = window.visible_region().clone();
        let mut dirty = Region::new();
        window.resize_by(dx, dy, Some(&mut dirty));
        self.rebuild_clipping(&mut Some(&mut *window));

        // the window only dirties what it shows; the desktop takes care of
        // what it gave up
        previously.exclude(window.visible_region());
        dirty.intersect_with(window.visible_region());
        dirty.include(&previously);

        self.trigger_window_redrawing(&dirty, &mut Some(window));
        Ok(())
    }

    fn set_window_tab_location(
        &mut self,
        window: &mut Window,
        location: f32,
    ) -> ServerResult<bool> {
        self.ensure_managed(window.id())?;
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();

        let mut dirty = Region::new();
        if !window.set_tab_location(location, &mut dirty) {
            return Ok(false);
        }
        self.rebuild_clipping(&mut Some(&mut *window));
        self.trigger_window_redrawing(&dirty, &mut Some(window));
        Ok(true)
    }

    fn activate_window(&mut self, window: &mut Window) -> ServerResult<()> {
        self.ensure_managed(window.id())?;
        if window.is_hidden() {
            return Ok(());
        }
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();

        let old_visible = window.visible_region().clone();
        self.bring_to_front(window);
        self.rebuild_clipping(&mut Some(&mut *window));

        let mut exposed = window.visible_region().clone();
        exposed.exclude(&old_visible);
        self.trigger_window_redrawing(&exposed, &mut Some(&mut *window));
        debug!("Window {} activated", window.id());

        self.set_focus_window(window)
    }

    fn set_focus_window(&mut self, window: &mut Window) -> ServerResult<()> {
        self.ensure_managed(window.id())?;
        if window.flags().contains(WindowFlags::AVOID_FOCUS) || !window.is_visible() {
            return Ok(());
        }
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();
        self.change_focus(Some(window.id()), &mut Some(window));
        Ok(())
    }

    fn send_window_behind(&mut self, window: &mut Window) -> ServerResult<()> {
        self.ensure_managed(window.id())?;
        let locker = Arc::clone(&self.locker);
        let _guard = locker.write_lock();

        let id = window.id();
        let old_visible = window.visible_region().clone();
        self.push_to_back(window);
        self.rebuild_clipping(&mut Some(&mut *window));

        let mut uncovered = old_visible;
        uncovered.exclude(window.visible_region());
        self.trigger_window_redrawing(&uncovered, &mut Some(&mut *window));
        debug!("Window {} sent behind", id);

        if self.focus == Some(id) {
            let next = self.front_most_focusable(Some(id));
            self.change_focus(next, &mut Some(window));
        }
        Ok(())
    }

    fn set_mouse_event_window(&mut self, window: Option<WindowId>) {
        self.mouse_event_window = window;
    }

    fn has_modal(&self, window: &Window) -> bool {
        self.stack
            .iter()
            .copied()
            .filter(|&id| id != window.id())
            .any(|id| {
                self.with_window(id, &mut None, |other| {
                    other.is_modal() && other.is_visible() && other.has_in_subset(window)
                })
                .unwrap_or(false)
            })
    }
}
