//! Server-side view tree of a window.
//!
//! Each view's `frame` is expressed in its parent's local coordinate
//! system; the top view's frame is the window frame in screen
//! coordinates. A view's local coordinates are shifted by its scroll
//! offset, so children move on screen when their parent scrolls.

use crate::engine::DrawingEngine;
use crate::region::Region;
use crate::shared::{Point, Rect};

/// Horizontal reaction to a parent resize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FollowH {
    #[default]
    Left,
    Right,
    LeftRight,
}

/// Vertical reaction to a parent resize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FollowV {
    #[default]
    Top,
    Bottom,
    TopBottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResizeMode {
    pub horizontal: FollowH,
    pub vertical: FollowV,
}

impl ResizeMode {
    pub const FOLLOW_ALL: ResizeMode = ResizeMode {
        horizontal: FollowH::LeftRight,
        vertical: FollowV::TopBottom,
    };
}

#[derive(Debug, Clone)]
pub struct View {
    token: i32,
    name: String,
    frame: Rect,
    scroll_offset: Point,
    /// `None` is a transparent view that never clears its background
    view_color: Option<u32>,
    hidden: bool,
    resize_mode: ResizeMode,
    /// Extra clipping set by the client, in local coordinates
    user_clipping: Option<Region>,
    children: Vec<View>,
}

impl View {
    pub fn new(token: i32, name: impl Into<String>, frame: Rect) -> Self {
        Self {
            token,
            name: name.into(),
            frame,
            scroll_offset: Point::ORIGIN,
            view_color: None,
            hidden: false,
            resize_mode: ResizeMode::default(),
            user_clipping: None,
            children: Vec::new(),
        }
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.view_color = Some(color);
        self
    }

    pub fn with_resize_mode(mut self, mode: ResizeMode) -> Self {
        self.resize_mode = mode;
        self
    }

    pub fn add_child(&mut self, child: View) {
        self.children.push(child);
    }

    pub fn token(&self) -> i32 {
        self.token
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    /// Frame in local coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.scroll_offset, self.frame.width(), self.frame.height())
    }

    pub fn scroll_offset(&self) -> Point {
        self.scroll_offset
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub fn set_user_clipping(&mut self, clipping: Option<Region>) {
        self.user_clipping = clipping;
    }

    pub fn children(&self) -> &[View] {
        &self.children
    }

    /// Screen position of local (0, 0).
    fn origin(&self, parent_origin: Point) -> Point {
        parent_origin + self.frame.left_top() - self.scroll_offset
    }

    fn screen_frame(&self, parent_origin: Point) -> Rect {
        self.frame.offset_by(parent_origin.x, parent_origin.y)
    }

    fn exclude_visible_children(&self, region: &mut Region, origin: Point) {
        for child in self.children.iter().filter(|child| !child.hidden) {
            region.exclude_rect(child.screen_frame(origin));
        }
    }

    pub fn find(&self, token: i32) -> Option<&View> {
        if self.token == token {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(token))
    }

    pub fn find_mut(&mut self, token: i32) -> Option<&mut View> {
        if self.token == token {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(token))
    }

    fn origin_of(&self, token: i32, parent_origin: Point) -> Option<Point> {
        let origin = self.origin(parent_origin);
        if self.token == token {
            return Some(origin);
        }
        self.children
            .iter()
            .find_map(|child| child.origin_of(token, origin))
    }

    /// Convert a region in the local coordinates of `token` to screen space.
    pub fn convert_to_screen(&self, token: i32, region: &mut Region) -> bool {
        match self.origin_of(token, Point::ORIGIN) {
            Some(origin) => {
                region.offset_by(origin.x, origin.y);
                true
            }
            None => false,
        }
    }

    /// Whether `token` and all of its ancestors are shown.
    pub fn is_view_visible(&self, token: i32) -> bool {
        if self.hidden {
            return false;
        }
        if self.token == token {
            return true;
        }
        self.children
            .iter()
            .any(|child| child.find(token).is_some() && child.is_view_visible(token))
    }

    fn clipping_for(
        &self,
        token: i32,
        parent_origin: Point,
        parent_clip: &Region,
        with_user: bool,
    ) -> Option<Region> {
        let origin = self.origin(parent_origin);
        let mut clip = parent_clip.clone();
        clip.intersect_with_rect(self.screen_frame(parent_origin));
        if self.hidden {
            clip.make_empty();
        }
        if with_user {
            if let Some(user) = &self.user_clipping {
                let mut user = user.clone();
                user.offset_by(origin.x, origin.y);
                clip.intersect_with(&user);
            }
        }

        if self.token == token {
            self.exclude_visible_children(&mut clip, origin);
            return Some(clip);
        }
        self.children
            .iter()
            .find_map(|child| child.clipping_for(token, origin, &clip, with_user))
    }

    /// Screen pixels owned by `token` within `content`, children excluded.
    pub fn screen_clipping(&self, token: i32, content: &Region) -> Option<Region> {
        self.clipping_for(token, Point::ORIGIN, content, false)
    }

    /// Like [`View::screen_clipping`], further restricted by the user
    /// clipping of the view and its ancestors.
    pub fn screen_and_user_clipping(&self, token: i32, content: &Region) -> Option<Region> {
        self.clipping_for(token, Point::ORIGIN, content, true)
    }

    /// Token of the front-most visible view under `point`.
    pub fn view_at(&self, point: Point) -> Option<i32> {
        self.view_at_in(point, Point::ORIGIN)
    }

    fn view_at_in(&self, point: Point, parent_origin: Point) -> Option<i32> {
        if self.hidden || !self.screen_frame(parent_origin).contains(point) {
            return None;
        }
        let origin = self.origin(parent_origin);
        self.children
            .iter()
            .rev()
            .find_map(|child| child.view_at_in(point, origin))
            .or(Some(self.token))
    }

    /// Collect the tokens of all views owning pixels of `region`.
    pub fn add_tokens_for_views_in_region(
        &self,
        tokens: &mut Vec<i32>,
        region: &Region,
        content: &Region,
    ) {
        self.add_tokens_in(tokens, region, Point::ORIGIN, content);
    }

    fn add_tokens_in(
        &self,
        tokens: &mut Vec<i32>,
        region: &Region,
        parent_origin: Point,
        parent_clip: &Region,
    ) {
        let screen_frame = self.screen_frame(parent_origin);
        if self.hidden || !region.intersects(screen_frame) {
            return;
        }
        let origin = self.origin(parent_origin);
        let mut clip = parent_clip.clone();
        clip.intersect_with_rect(screen_frame);

        let mut own = clip.clone();
        self.exclude_visible_children(&mut own, origin);
        own.intersect_with(region);
        if !own.is_empty() {
            tokens.push(self.token);
        }

        for child in &self.children {
            child.add_tokens_in(tokens, region, origin, &clip);
        }
    }

    /// Clear view backgrounds inside `effective`, descending into the
    /// children when `deep` is set.
    pub fn draw(&self, engine: &dyn DrawingEngine, effective: &Region, content: &Region, deep: bool) {
        self.draw_in(engine, effective, Point::ORIGIN, content, deep);
        engine.constrain_clipping_region(None);
    }

    fn draw_in(
        &self,
        engine: &dyn DrawingEngine,
        effective: &Region,
        parent_origin: Point,
        parent_clip: &Region,
        deep: bool,
    ) {
        if self.hidden {
            return;
        }
        let origin = self.origin(parent_origin);
        let mut clip = parent_clip.clone();
        clip.intersect_with_rect(self.screen_frame(parent_origin));
        if clip.is_empty() {
            return;
        }

        if let Some(color) = self.view_color {
            let mut own = clip.clone();
            self.exclude_visible_children(&mut own, origin);
            own.intersect_with(effective);
            if !own.is_empty() {
                engine.constrain_clipping_region(Some(&own));
                engine.fill_region(&own, color);
            }
        }

        if deep {
            for child in &self.children {
                child.draw_in(engine, effective, origin, &clip, deep);
            }
        }
    }

    pub fn move_by(&mut self, dx: i32, dy: i32) {
        self.frame = self.frame.offset_by(dx, dy);
    }

    pub fn scroll_by(&mut self, dx: i32, dy: i32) {
        self.scroll_offset = self.scroll_offset.offset_by(dx, dy);
    }

    /// Grow the top view by (`dx`, `dy`); children follow their resize
    /// modes. Newly exposed background and moved children go into `dirty`.
    pub fn resize_by(&mut self, dx: i32, dy: i32, dirty: Option<&mut Region>) {
        self.resize_in(dx, dy, Point::ORIGIN, dirty);
    }

    fn resize_in(&mut self, dx: i32, dy: i32, parent_origin: Point, mut dirty: Option<&mut Region>) {
        if dx == 0 && dy == 0 {
            return;
        }
        let old_frame = self.screen_frame(parent_origin);
        self.frame.right += dx;
        self.frame.bottom += dy;

        if let Some(dirty) = dirty.as_deref_mut() {
            if self.view_color.is_some() && !self.hidden {
                let mut exposed = Region::from(self.screen_frame(parent_origin));
                exposed.exclude_rect(old_frame);
                dirty.include(&exposed);
            }
        }

        let origin = self.origin(parent_origin);
        for child in &mut self.children {
            child.follow_parent(dx, dy, origin, dirty.as_deref_mut());
        }
    }

    fn follow_parent(&mut self, dx: i32, dy: i32, parent_origin: Point, mut dirty: Option<&mut Region>) {
        let (move_x, grow_x) = match self.resize_mode.horizontal {
            FollowH::Left => (0, 0),
            FollowH::Right => (dx, 0),
            FollowH::LeftRight => (0, dx),
        };
        let (move_y, grow_y) = match self.resize_mode.vertical {
            FollowV::Top => (0, 0),
            FollowV::Bottom => (dy, 0),
            FollowV::TopBottom => (0, dy),
        };

        if move_x != 0 || move_y != 0 {
            let old_frame = self.screen_frame(parent_origin);
            self.frame = self.frame.offset_by(move_x, move_y);
            if let Some(dirty) = dirty.as_deref_mut() {
                if !self.hidden {
                    dirty.include_rect(old_frame);
                    dirty.include_rect(self.screen_frame(parent_origin));
                }
            }
        }
        self.resize_in(grow_x, grow_y, parent_origin, dirty);
    }
}
