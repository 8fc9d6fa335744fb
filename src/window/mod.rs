//! The clipping and update core of a single window.
//!
//! A `Window` owns its frame, the regions derived from it and the two
//! update sessions that pipeline redraws to the client. It is shared as
//! `Arc<Mutex<Window>>` between the desktop thread and its window thread;
//! which of the two may touch what is decided by the [`MultiLocker`]:
//!
//! - geometry, stacking and visibility change only under the write lock
//!   (desktop thread);
//! - redraw passes and update sessions run under a read lock on the
//!   window thread, which only ever locks its own window.
//!
//! Callers take the `MultiLocker` before the window mutex, never the
//! other way around.
//!
//! [`MultiLocker`]: crate::locking::MultiLocker

mod dirty;
mod gesture;
pub mod types;
mod update;

pub use gesture::{DesktopOps, MouseDispatch};
pub use types::{
    Modifiers, MouseButtons, MouseEvent, SizeLimits, UpdateCause, WindowFeel, WindowFlags,
    WindowLook,
};
pub use update::UpdateSession;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use area_ipc::ClientMessage;
use tracing::debug;

use crate::config::{DecoratorConfig, ServerConfig};
use crate::decorator::{self, Decorator};
use crate::engine::DrawingEngine;
use crate::link::WindowLink;
use crate::region::{Region, RegionPool};
use crate::shared::{AppId, Point, Rect, WindowId};
use crate::view::View;

use gesture::GestureState;

/// Workspaces a window can be placed on
pub const MAX_WORKSPACES: usize = 32;

/// Lock a shared window, recovering from a poisoned mutex.
pub fn lock_window(window: &Mutex<Window>) -> MutexGuard<'_, Window> {
    window.lock().unwrap_or_else(PoisonError::into_inner)
}

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|since| since.as_micros() as u64)
        .unwrap_or_default()
}

/// How a client asked for its window to be created
#[derive(Debug, Clone)]
pub struct WindowAttributes {
    pub title: String,
    pub frame: Rect,
    pub look: WindowLook,
    pub feel: WindowFeel,
    pub flags: WindowFlags,
    /// Bitmask of workspaces the window lives on
    pub workspaces: u32,
    /// Drawn into a bitmap instead of the screen; never decorated
    pub offscreen: bool,
}

impl WindowAttributes {
    pub fn new(title: impl Into<String>, frame: Rect) -> Self {
        Self {
            title: title.into(),
            frame,
            look: WindowLook::Titled,
            feel: WindowFeel::Normal,
            flags: WindowFlags::empty(),
            workspaces: 1,
            offscreen: false,
        }
    }

    pub fn with_look(mut self, look: WindowLook) -> Self {
        self.look = look;
        self
    }

    pub fn with_feel(mut self, feel: WindowFeel) -> Self {
        self.feel = feel;
        self
    }

    pub fn with_flags(mut self, flags: WindowFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_workspaces(mut self, workspaces: u32) -> Self {
        self.workspaces = workspaces;
        self
    }

    pub fn offscreen(mut self) -> Self {
        self.offscreen = true;
        self
    }
}

pub struct Window {
    id: WindowId,
    app: AppId,
    title: String,
    frame: Rect,
    look: WindowLook,
    feel: WindowFeel,
    flags: WindowFlags,

    workspaces: u32,
    current_workspace: Option<u32>,
    /// Last position on each workspace
    anchors: [Option<Point>; MAX_WORKSPACES],

    hidden: bool,
    minimized: bool,
    offscreen: bool,
    is_focus: bool,
    size_limits: SizeLimits,

    decorator: Option<Box<dyn Decorator>>,
    decorator_config: DecoratorConfig,
    top_view: View,
    engine: Arc<dyn DrawingEngine>,
    link: WindowLink,
    pool: RegionPool,

    visible_region: Region,
    border_region: Region,
    border_valid: bool,
    content_region: Region,
    content_valid: bool,
    visible_content_region: Region,
    visible_content_valid: bool,
    effective_drawing_region: Region,
    effective_valid: bool,

    dirty_region: Region,
    dirty_cause: UpdateCause,
    current_session: UpdateSession,
    pending_session: UpdateSession,
    update_requested: bool,
    in_update: bool,
    update_requests_enabled: bool,

    gesture: GestureState,
    /// Windows kept behind this modal/floating window
    subsets: Vec<WindowId>,
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("frame", &self.frame)
            .field("hidden", &self.hidden)
            .field("update_requested", &self.update_requested)
            .field("in_update", &self.in_update)
            .finish_non_exhaustive()
    }
}

impl Window {
    /// Create a hidden window. The desktop shows it once it is stacked.
    pub fn new(
        id: WindowId,
        app: AppId,
        attributes: WindowAttributes,
        link: WindowLink,
        engine: Arc<dyn DrawingEngine>,
        config: &ServerConfig,
    ) -> Self {
        let WindowAttributes {
            title,
            frame,
            look,
            feel,
            flags,
            workspaces,
            offscreen,
        } = attributes;

        let decorator = if offscreen {
            None
        } else {
            decorator::for_look(look, frame, &config.decorator)
        };

        let mut size_limits = SizeLimits::default();
        if let Some(decorator) = &decorator {
            decorator.constrain_size_limits(&mut size_limits);
        }
        size_limits.obey();

        debug!("Window {} created: {:?} {:?} {:?}", id, title, frame, look);

        Self {
            id,
            app,
            top_view: View::new(0, format!("{} top view", title), frame),
            title,
            frame,
            look,
            feel,
            flags,
            workspaces,
            current_workspace: None,
            anchors: [None; MAX_WORKSPACES],
            hidden: true,
            minimized: false,
            offscreen,
            is_focus: false,
            size_limits,
            decorator,
            decorator_config: config.decorator.clone(),
            engine,
            link,
            pool: RegionPool::new(config.update.region_pool_limit),
            visible_region: Region::new(),
            border_region: Region::new(),
            border_valid: false,
            content_region: Region::new(),
            content_valid: false,
            visible_content_region: Region::new(),
            visible_content_valid: false,
            effective_drawing_region: Region::new(),
            effective_valid: false,
            dirty_region: Region::new(),
            dirty_cause: UpdateCause::empty(),
            current_session: UpdateSession::new(),
            pending_session: UpdateSession::new(),
            update_requested: false,
            in_update: false,
            update_requests_enabled: true,
            gesture: GestureState::default(),
            subsets: Vec::new(),
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn app(&self) -> AppId {
        self.app
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn look(&self) -> WindowLook {
        self.look
    }

    pub fn feel(&self) -> WindowFeel {
        self.feel
    }

    pub fn flags(&self) -> WindowFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: WindowFlags) {
        self.flags = flags;
    }

    pub fn set_feel(&mut self, feel: WindowFeel) {
        self.feel = feel;
    }

    /// Swap the decoration for `look`; returns the screen area whose
    /// decoration changed.
    pub fn set_look(&mut self, look: WindowLook) -> Region {
        self.update_border_region();
        let mut dirty = self.border_region.clone();

        self.look = look;
        self.decorator = if self.offscreen {
            None
        } else {
            decorator::for_look(look, self.frame, &self.decorator_config)
        };
        if let Some(decorator) = &mut self.decorator {
            decorator.set_focus(self.is_focus);
        }
        self.invalidate_regions();

        self.update_border_region();
        dirty.include(&self.border_region);
        let limits = self.size_limits;
        dirty.include(&self.set_size_limits(
            limits.min_width,
            limits.max_width,
            limits.min_height,
            limits.max_height,
        ));
        dirty
    }

    pub fn engine(&self) -> &Arc<dyn DrawingEngine> {
        &self.engine
    }

    pub fn link(&self) -> &WindowLink {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut WindowLink {
        &mut self.link
    }

    pub fn region_pool(&self) -> &RegionPool {
        &self.pool
    }

    pub fn top_view(&self) -> &View {
        &self.top_view
    }

    /// Install the client's view tree. The top view is moved and sized to
    /// the window frame.
    pub fn set_top_view(&mut self, mut view: View) {
        let offset = self.frame.left_top() - view.frame().left_top();
        view.move_by(offset.x, offset.y);
        let current = view.frame();
        view.resize_by(
            self.frame.width() - current.width(),
            self.frame.height() - current.height(),
            None,
        );
        self.top_view = view;
        self.effective_valid = false;
    }

    pub fn top_view_mut(&mut self) -> &mut View {
        self.effective_valid = false;
        &mut self.top_view
    }

    pub(crate) fn notify_client(&self, message: ClientMessage) {
        if let Err(e) = self.link.send_message_to_client(message) {
            debug!("Window {}: notification dropped: {}", self.id, e);
        }
    }

    // ------------------------------------------------------------------
    // Visibility
    // ------------------------------------------------------------------

    pub fn is_visible(&self) -> bool {
        if self.offscreen {
            return true;
        }
        if self.hidden {
            return false;
        }
        self.current_workspace.is_some()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Desktop only; the desktop takes care of the dirty regions.
    pub fn set_hidden(&mut self, hidden: bool) {
        if self.hidden != hidden {
            self.hidden = hidden;
            self.top_view.set_hidden(hidden);
        }
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn set_minimized(&mut self, minimized: bool) {
        self.minimized = minimized;
    }

    pub fn is_offscreen(&self) -> bool {
        self.offscreen
    }

    // ------------------------------------------------------------------
    // Regions
    // ------------------------------------------------------------------

    fn invalidate_regions(&mut self) {
        self.border_valid = false;
        self.content_valid = false;
        self.visible_content_valid = false;
        self.effective_valid = false;
    }

    fn update_border_region(&mut self) {
        if self.border_valid {
            return;
        }
        match &self.decorator {
            Some(decorator) => self.border_region = decorator.footprint(),
            None => self.border_region.make_empty(),
        }
        self.border_valid = true;
    }

    fn update_content_region(&mut self) {
        if self.content_valid {
            return;
        }
        self.update_border_region();
        self.content_region.set(self.frame);
        self.content_region.exclude(&self.border_region);
        self.content_valid = true;
    }

    fn update_visible_content_region(&mut self) {
        if self.visible_content_valid {
            return;
        }
        self.update_content_region();
        self.visible_content_region.clone_from(&self.content_region);
        self.visible_content_region
            .intersect_with(&self.visible_region);
        self.visible_content_valid = true;
    }

    /// Screen area of the decoration.
    pub fn border_region(&mut self) -> &Region {
        self.update_border_region();
        &self.border_region
    }

    /// Frame minus the parts of the decoration reaching into it.
    pub fn content_region(&mut self) -> &Region {
        self.update_content_region();
        &self.content_region
    }

    /// Decoration and frame, as if nothing obscured the window.
    pub fn full_region(&mut self) -> Region {
        self.update_border_region();
        let mut full = self.border_region.clone();
        full.include_rect(self.frame);
        full
    }

    /// Part of the full region left over by the windows in front.
    pub fn visible_region(&self) -> &Region {
        &self.visible_region
    }

    pub fn visible_content_region(&mut self) -> &Region {
        self.update_visible_content_region();
        &self.visible_content_region
    }

    /// Desktop only: clip the window to what is still available on screen.
    pub fn set_clipping(&mut self, still_available_on_screen: &Region) {
        self.visible_region = self.full_region();
        self.visible_region.intersect_with(still_available_on_screen);
        self.visible_content_valid = false;
        self.effective_valid = false;
    }

    pub fn dirty_region(&self) -> &Region {
        &self.dirty_region
    }

    pub fn dirty_cause(&self) -> UpdateCause {
        self.dirty_cause
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    /// Desktop only, write lock held. The desktop repaints what the move
    /// uncovers.
    pub fn move_by(&mut self, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }

        self.frame = self.frame.offset_by(dx, dy);

        let position = self.frame.left_top();
        if self.flags.contains(WindowFlags::SAME_POSITION_IN_ALL_WORKSPACES) {
            for (index, anchor) in self.anchors.iter_mut().enumerate() {
                if self.workspaces & (1 << index) != 0 {
                    *anchor = Some(position);
                }
            }
        } else if let Some(workspace) = self.current_workspace {
            self.anchors[workspace as usize] = Some(position);
        }

        // dirt that was not processed yet moves along
        self.dirty_region.offset_by(dx, dy);
        if self.border_valid {
            self.border_region.offset_by(dx, dy);
        }
        if self.content_valid {
            self.content_region.offset_by(dx, dy);
        }
        // until the desktop clips again, the window keeps its coverage
        self.visible_region.offset_by(dx, dy);
        if self.visible_content_valid {
            self.visible_content_region.offset_by(dx, dy);
        }
        if self.current_session.is_used() {
            self.current_session.move_by(dx, dy);
        }
        if self.pending_session.is_used() {
            self.pending_session.move_by(dx, dy);
        }
        self.effective_valid = false;

        if let Some(decorator) = &mut self.decorator {
            decorator.move_by(dx, dy);
        }
        self.top_view.move_by(dx, dy);

        self.notify_client(ClientMessage::WindowMoved {
            when_us: now_us(),
            x: self.frame.left,
            y: self.frame.top,
        });
    }

    /// Desktop only, write lock held. The requested delta is clamped to the
    /// size limits; decoration and views report what they dirtied.
    pub fn resize_by(&mut self, dx: i32, dy: i32, mut dirty: Option<&mut Region>) {
        let want_width = self
            .size_limits
            .clamp_width(self.frame.width().saturating_add(dx));
        let want_height = self
            .size_limits
            .clamp_height(self.frame.height().saturating_add(dy));

        let dx = want_width - self.frame.width();
        let dy = want_height - self.frame.height();
        if dx == 0 && dy == 0 {
            return;
        }

        self.frame.right = self.frame.right.saturating_add(dx);
        self.frame.bottom = self.frame.bottom.saturating_add(dy);
        self.invalidate_regions();

        if let Some(decorator) = &mut self.decorator {
            decorator.resize_by(dx, dy, dirty.as_deref_mut());
        }
        self.top_view.resize_by(dx, dy, dirty);

        self.notify_client(ClientMessage::WindowResized {
            when_us: now_us(),
            width: self.frame.width(),
            height: self.frame.height(),
        });
    }

    pub fn size_limits(&self) -> SizeLimits {
        self.size_limits
    }

    /// Set new size limits, merged with what the decoration needs, and
    /// resize the window into range. Returns the area dirtied by that.
    pub fn set_size_limits(
        &mut self,
        min_width: i32,
        max_width: i32,
        min_height: i32,
        max_height: i32,
    ) -> Region {
        self.size_limits = SizeLimits {
            min_width: min_width.max(0),
            max_width,
            min_height: min_height.max(0),
            max_height,
        };
        if let Some(decorator) = &self.decorator {
            decorator.constrain_size_limits(&mut self.size_limits);
        }
        self.obey_size_limits()
    }

    fn obey_size_limits(&mut self) -> Region {
        self.size_limits.obey();

        let limits = self.size_limits;
        let width = self.frame.width();
        let height = self.frame.height();
        let dx = limits.clamp_width(width) - width;
        let dy = limits.clamp_height(height) - height;

        let mut dirty = Region::new();
        self.resize_by(dx, dy, Some(&mut dirty));
        dirty
    }

    // ------------------------------------------------------------------
    // Decoration
    // ------------------------------------------------------------------

    pub fn decorator(&self) -> Option<&dyn Decorator> {
        self.decorator.as_deref()
    }

    pub fn tab_location(&self) -> f32 {
        self.decorator
            .as_ref()
            .map_or(0.0, |decorator| decorator.tab_location())
    }

    /// Desktop only. Slide the tab; `dirty` collects the old and new tab.
    pub fn set_tab_location(&mut self, location: f32, dirty: &mut Region) -> bool {
        let Some(decorator) = &mut self.decorator else {
            return false;
        };
        if !decorator.set_tab_location(location, Some(dirty)) {
            return false;
        }
        self.invalidate_regions();
        true
    }

    pub fn is_focus(&self) -> bool {
        self.is_focus
    }

    /// Desktop only. Returns the visible border, which has to be repainted
    /// to show the new focus state.
    pub fn set_focus(&mut self, focus: bool) -> Region {
        self.update_border_region();
        let mut dirty = self.border_region.clone();
        dirty.intersect_with(&self.visible_region);

        self.is_focus = focus;
        if let Some(decorator) = &mut self.decorator {
            decorator.set_focus(focus);
        }
        self.activated(focus);
        dirty
    }

    pub fn activated(&self, active: bool) {
        self.notify_client(ClientMessage::WindowActivated { active });
    }

    // ------------------------------------------------------------------
    // Workspaces
    // ------------------------------------------------------------------

    pub fn workspaces(&self) -> u32 {
        self.workspaces
    }

    pub fn in_workspace(&self, index: u32) -> bool {
        index < MAX_WORKSPACES as u32 && self.workspaces & (1 << index) != 0
    }

    pub fn current_workspace(&self) -> Option<u32> {
        self.current_workspace
    }

    pub fn set_current_workspace(&mut self, index: Option<u32>) {
        self.current_workspace = index.filter(|&index| index < MAX_WORKSPACES as u32);
    }

    /// Position of the window when `index` was last shown.
    pub fn anchor(&self, index: u32) -> Option<Point> {
        self.anchors.get(index as usize).copied().flatten()
    }

    pub fn set_anchor(&mut self, index: u32, position: Point) {
        if let Some(anchor) = self.anchors.get_mut(index as usize) {
            *anchor = Some(position);
        }
    }

    pub fn workspace_activated(&self, index: u32, active: bool) {
        self.notify_client(ClientMessage::WorkspaceActivated {
            workspace: index,
            active,
        });
    }

    pub fn workspaces_changed(&mut self, old: u32, new: u32) {
        self.workspaces = new;
        self.notify_client(ClientMessage::WorkspacesChanged { old, new });
    }

    // ------------------------------------------------------------------
    // Feel and subsets
    // ------------------------------------------------------------------

    pub fn is_modal(&self) -> bool {
        self.feel.is_modal()
    }

    pub fn is_floating(&self) -> bool {
        self.feel.is_floating()
    }

    pub fn is_normal(&self) -> bool {
        !self.is_modal() && !self.is_floating()
    }

    pub fn add_to_subset(&mut self, window: WindowId) -> bool {
        if window == self.id || self.subsets.contains(&window) {
            return false;
        }
        self.subsets.push(window);
        true
    }

    pub fn remove_from_subset(&mut self, window: WindowId) {
        self.subsets.retain(|&id| id != window);
    }

    /// Whether `window` has to stay behind this one.
    pub fn has_in_subset(&self, window: &Window) -> bool {
        if matches!(self.feel, WindowFeel::ModalAll | WindowFeel::FloatingAll) {
            return true;
        }
        if window.id == self.id {
            return false;
        }

        // these feels have a fixed order among each other
        const FIXED_ORDER: [WindowFeel; 4] = [
            WindowFeel::Password,
            WindowFeel::WindowScreen,
            WindowFeel::ModalAll,
            WindowFeel::FloatingAll,
        ];
        for feel in FIXED_ORDER {
            if self.feel == feel {
                return true;
            }
            if window.feel == feel {
                return false;
            }
        }

        if (self.feel == WindowFeel::FloatingApp && window.feel != WindowFeel::ModalApp)
            || self.feel == WindowFeel::ModalApp
        {
            return window.app == self.app;
        }

        self.subsets.contains(&window.id)
    }

    /// Whether both windows belong to one subset.
    pub fn same_subset(&self, window: &Window) -> bool {
        const SHARED_BY_ALL: [WindowFeel; 4] = [
            WindowFeel::Password,
            WindowFeel::WindowScreen,
            WindowFeel::ModalAll,
            WindowFeel::FloatingAll,
        ];
        if SHARED_BY_ALL.contains(&self.feel) || SHARED_BY_ALL.contains(&window.feel) {
            return true;
        }
        if matches!(self.feel, WindowFeel::ModalApp | WindowFeel::FloatingApp)
            || matches!(window.feel, WindowFeel::ModalApp | WindowFeel::FloatingApp)
        {
            return self.app == window.app;
        }
        self.has_in_subset(window)
            || window.has_in_subset(self)
            || self.subsets.iter().any(|id| window.subsets.contains(id))
    }

    pub fn subsets(&self) -> &[WindowId] {
        &self.subsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, TestWindow};

    #[test]
    fn test_border_and_content_partition_full_region() {
        for look in [
            WindowLook::Titled,
            WindowLook::Document,
            WindowLook::Bordered,
            WindowLook::NoBorder,
        ] {
            let mut test = testing::visible_window_with(
                WindowAttributes::new("partition", Rect::new(50, 50, 249, 199)).with_look(look),
            );
            let window = &mut test.window;

            let border = window.border_region().clone();
            let content = window.content_region().clone();
            let mut overlap = border.clone();
            overlap.intersect_with(&content);
            assert!(overlap.is_empty(), "{:?}", look);

            let mut union = border;
            union.include(&content);
            assert_eq!(union, window.full_region(), "{:?}", look);
        }
    }

    #[test]
    fn test_visible_content_is_inside_content_and_visible() {
        let mut test = testing::visible_window(Rect::new(0, 0, 99, 99));
        let window = &mut test.window;
        window.set_clipping(&Region::from(Rect::new(40, 40, 300, 300)));

        let visible_content = window.visible_content_region().clone();
        assert!(visible_content.is_subset_of(window.visible_region()));
        assert!(visible_content.is_subset_of(window.content_region()));
        assert_eq!(visible_content.frame(), Rect::new(40, 40, 99, 99));
    }

    #[test]
    fn test_move_by_moves_frame_and_notifies() {
        let mut test = testing::visible_window(Rect::new(0, 0, 100, 100));
        test.window.move_by(10, 5);

        assert_eq!(test.window.frame(), Rect::new(10, 5, 110, 105));
        assert!(matches!(
            test.next_client_message(),
            Some(ClientMessage::WindowMoved { x: 10, y: 5, .. })
        ));
        assert_eq!(test.window.anchor(0), Some(Point::new(10, 5)));
    }

    #[test]
    fn test_move_by_zero_is_silent() {
        let mut test = testing::visible_window(Rect::new(0, 0, 100, 100));
        test.window.move_by(0, 0);
        assert!(test.next_client_message().is_none());
    }

    #[test]
    fn test_move_round_trip_restores_regions() {
        let mut test = testing::visible_window(Rect::new(20, 20, 219, 219));
        let window = &mut test.window;
        window.process_dirty_region(&Region::from(Rect::new(30, 30, 60, 60)));
        window
            .trigger_content_redraw(&Region::from(Rect::new(100, 100, 150, 150)));
        assert!(window.update_requested());
        window.begin_update(&test.port).unwrap();
        window.mark_content_dirty(&Region::from(Rect::new(70, 70, 80, 120))).unwrap();

        let frame = window.frame();
        let dirty = window.dirty_region().clone();
        let current = window.current_session().dirty_region().clone();
        let pending = window.pending_session().dirty_region().clone();

        window.move_by(13, -7);
        assert_ne!(window.dirty_region(), &dirty);
        window.move_by(-13, 7);

        assert_eq!(window.frame(), frame);
        assert_eq!(window.dirty_region(), &dirty);
        assert_eq!(window.current_session().dirty_region(), &current);
        assert_eq!(window.pending_session().dirty_region(), &pending);
    }

    #[test]
    fn test_same_position_in_all_workspaces_updates_every_anchor() {
        let mut test = testing::visible_window_with(
            WindowAttributes::new("sticky", Rect::new(0, 0, 50, 50))
                .with_workspaces(0b101)
                .with_flags(WindowFlags::SAME_POSITION_IN_ALL_WORKSPACES),
        );
        test.window.move_by(5, 5);
        assert_eq!(test.window.anchor(0), Some(Point::new(5, 5)));
        assert_eq!(test.window.anchor(2), Some(Point::new(5, 5)));
        assert_eq!(test.window.anchor(1), None);
    }

    #[test]
    fn test_resize_respects_fixed_width() {
        let mut test = testing::visible_window_with(
            WindowAttributes::new("fixed", Rect::new(0, 0, 50, 50)).with_look(WindowLook::NoBorder),
        );
        let dirty = test.window.set_size_limits(50, 50, 10, 1000);
        assert!(dirty.is_empty());
        test.drain_client_messages();

        let mut dirty = Region::new();
        test.window.resize_by(20, 10, Some(&mut dirty));

        assert_eq!(test.window.frame(), Rect::new(0, 0, 50, 60));
        assert!(matches!(
            test.next_client_message(),
            Some(ClientMessage::WindowResized {
                width: 50,
                height: 60,
                ..
            })
        ));
    }

    #[test]
    fn test_resize_with_extreme_deltas_is_clamped() {
        let mut test = testing::visible_window_with(
            WindowAttributes::new("extreme", Rect::new(0, 0, 100, 100)).with_look(WindowLook::NoBorder),
        );
        let limits = test.window.size_limits();

        test.window.resize_by(i32::MAX, i32::MIN, None);
        let frame = test.window.frame();
        assert_eq!(frame.width(), limits.max_width);
        assert_eq!(frame.height(), limits.min_height);

        test.window.resize_by(i32::MIN, i32::MAX, None);
        let frame = test.window.frame();
        assert_eq!(frame.width(), limits.min_width);
        assert_eq!(frame.height(), limits.max_height);
        assert_eq!(frame.left_top(), Point::new(0, 0));
    }

    #[test]
    fn test_move_carries_visible_regions_along() {
        let mut test = testing::visible_window_with(
            WindowAttributes::new("moving", Rect::new(0, 0, 99, 99)).with_look(WindowLook::NoBorder),
        );
        test.window
            .set_clipping(&Region::from(Rect::new(0, 0, 1023, 767)));
        test.window.visible_content_region();

        test.window.move_by(50, 0);

        let moved = Region::from(Rect::new(50, 0, 149, 99));
        assert_eq!(test.window.visible_region(), &moved);
        assert_eq!(test.window.content_region().clone(), moved);
        assert_eq!(test.window.visible_content_region(), &moved);
    }

    #[test]
    fn test_resize_clamps_to_both_bounds() {
        let mut test = testing::visible_window_with(
            WindowAttributes::new("limits", Rect::new(0, 0, 100, 100)).with_look(WindowLook::NoBorder),
        );
        test.window.set_size_limits(80, 120, 80, 120);

        test.window.resize_by(-500, 500, None);
        let frame = test.window.frame();
        assert_eq!((frame.width(), frame.height()), (80, 120));
    }

    #[test]
    fn test_resize_by_zero_is_a_no_op() {
        let mut test = testing::visible_window(Rect::new(0, 0, 100, 100));
        let content = test.window.content_region().clone();
        let mut dirty = Region::new();

        test.window.resize_by(0, 0, Some(&mut dirty));

        assert!(dirty.is_empty());
        assert!(test.next_client_message().is_none());
        assert!(test.window.content_valid);
        assert_eq!(test.window.content_region(), &content);
    }

    #[test]
    fn test_size_limits_stay_ordered() {
        let mut test = testing::visible_window(Rect::new(0, 0, 300, 300));
        test.window.set_size_limits(400, 100, -3, -10);
        let limits = test.window.size_limits();
        assert!(limits.min_width <= limits.max_width);
        assert!(limits.min_height <= limits.max_height);
        assert_eq!(test.window.frame().width(), 400);
    }

    #[test]
    fn test_decorator_raises_min_width() {
        let mut test = testing::visible_window(Rect::new(0, 0, 300, 300));
        test.window.set_size_limits(0, 1000, 0, 1000);
        assert!(test.window.size_limits().min_width > 0);
    }

    #[test]
    fn test_offscreen_windows_are_visible_and_undecorated() {
        let test = testing::window_with(
            WindowAttributes::new("bitmap", Rect::new(0, 0, 10, 10)).offscreen(),
        );
        assert!(test.window.is_visible());
        assert!(test.window.decorator().is_none());
    }

    #[test]
    fn test_hidden_or_unplaced_windows_are_invisible() {
        let mut test = testing::visible_window(Rect::new(0, 0, 10, 10));
        assert!(test.window.is_visible());
        test.window.set_current_workspace(None);
        assert!(!test.window.is_visible());
        test.window.set_current_workspace(Some(0));
        test.window.set_hidden(true);
        assert!(!test.window.is_visible());
    }

    #[test]
    fn test_focus_returns_visible_border_and_notifies() {
        let mut test = testing::visible_window(Rect::new(100, 100, 200, 200));
        let dirty = test.window.set_focus(true);
        assert!(!dirty.is_empty());
        assert!(!dirty.intersects(Rect::new(120, 120, 180, 180)));
        assert_eq!(
            test.next_client_message(),
            Some(ClientMessage::WindowActivated { active: true })
        );
    }

    #[test]
    fn test_workspace_notifications() {
        let mut test = testing::visible_window(Rect::new(0, 0, 10, 10));
        test.window.workspace_activated(2, true);
        test.window.workspaces_changed(0b1, 0b110);

        assert_eq!(
            test.next_client_message(),
            Some(ClientMessage::WorkspaceActivated {
                workspace: 2,
                active: true
            })
        );
        assert_eq!(
            test.next_client_message(),
            Some(ClientMessage::WorkspacesChanged { old: 1, new: 6 })
        );
        assert!(test.window.in_workspace(2));
        assert!(!test.window.in_workspace(0));
    }

    #[test]
    fn test_subset_feel_ordering() {
        let make = |id: u32, app: u32, feel: WindowFeel| -> TestWindow {
            testing::window_with_ids(
                WindowId(id),
                AppId(app),
                WindowAttributes::new("w", Rect::new(0, 0, 10, 10)).with_feel(feel),
            )
        };
        let modal_all = make(1, 1, WindowFeel::ModalAll);
        let password = make(2, 1, WindowFeel::Password);
        let modal_app = make(3, 7, WindowFeel::ModalApp);
        let same_app = make(4, 7, WindowFeel::Normal);
        let other_app = make(5, 8, WindowFeel::Normal);
        let mut subset = make(6, 9, WindowFeel::ModalSubset);

        assert!(modal_all.window.has_in_subset(&password.window));
        assert!(password.window.has_in_subset(&modal_app.window));
        assert!(!modal_app.window.has_in_subset(&password.window));
        assert!(modal_app.window.has_in_subset(&same_app.window));
        assert!(!modal_app.window.has_in_subset(&other_app.window));

        assert!(!subset.window.has_in_subset(&other_app.window));
        assert!(subset.window.add_to_subset(WindowId(5)));
        assert!(!subset.window.add_to_subset(WindowId(5)));
        assert!(subset.window.has_in_subset(&other_app.window));
        assert!(subset.window.same_subset(&other_app.window));
        subset.window.remove_from_subset(WindowId(5));
        assert!(!subset.window.has_in_subset(&other_app.window));
    }

    #[test]
    fn test_set_look_swaps_decoration() {
        let mut test = testing::visible_window(Rect::new(100, 100, 200, 200));
        let dirty = test.window.set_look(WindowLook::NoBorder);
        assert!(!dirty.is_empty());
        assert!(test.window.decorator().is_none());
        assert!(test.window.border_region().is_empty());
        assert_eq!(
            test.window.content_region(),
            &Region::from(Rect::new(100, 100, 200, 200))
        );
    }
}
