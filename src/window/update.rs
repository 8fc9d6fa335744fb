//! Update sessions and the client redraw handshake.
//!
//! Dirt destined for the client collects in the pending session. The
//! first transfer asks the client for an update; `begin_update` turns the
//! pending session into the current one the client draws against, and
//! `end_update` flushes it to the front buffer and loops back if more dirt
//! came in meanwhile.
//!
//! ```text
//! Idle --transfer--> Requested --begin_update--> InUpdate
//!   ^                    ^                          |
//!   |                    +---- pending in use ------+
//!   +------------------- pending empty -------------+
//! ```

use area_ipc::{ClientMessage, UpdateGeometry, UpdateReply};
use tracing::{debug, error, trace, warn};

use super::types::UpdateCause;
use super::Window;
use crate::errors::{ServerError, ServerResult};
use crate::link::PortLink;
use crate::region::Region;

/// One round of dirt on its way to the client. The region is kept in
/// screen coordinates and follows the window when it moves.
#[derive(Debug, Clone, Default)]
pub struct UpdateSession {
    dirty_region: Region,
    in_use: bool,
    cause: UpdateCause,
}

impl UpdateSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(&mut self, region: &Region) {
        self.dirty_region.include(region);
    }

    pub fn exclude(&mut self, region: &Region) {
        self.dirty_region.exclude(region);
    }

    pub fn move_by(&mut self, dx: i32, dy: i32) {
        self.dirty_region.offset_by(dx, dy);
    }

    /// Marking a session unused empties its region and causes together.
    pub fn set_used(&mut self, used: bool) {
        self.in_use = used;
        if !used {
            self.dirty_region.make_empty();
            self.cause = UpdateCause::empty();
        }
    }

    pub fn is_used(&self) -> bool {
        self.in_use
    }

    pub fn add_cause(&mut self, cause: UpdateCause) {
        self.cause |= cause;
    }

    pub fn cause(&self) -> UpdateCause {
        self.cause
    }

    pub fn is_expose(&self) -> bool {
        self.cause.contains(UpdateCause::EXPOSE)
    }

    pub fn is_request(&self) -> bool {
        self.cause.contains(UpdateCause::REQUEST)
    }

    pub fn dirty_region(&self) -> &Region {
        &self.dirty_region
    }

    pub(crate) fn dirty_region_mut(&mut self) -> &mut Region {
        &mut self.dirty_region
    }
}

impl Window {
    pub fn update_requested(&self) -> bool {
        self.update_requested
    }

    pub fn in_update(&self) -> bool {
        self.in_update
    }

    pub fn current_session(&self) -> &UpdateSession {
        &self.current_session
    }

    pub fn pending_session(&self) -> &UpdateSession {
        &self.pending_session
    }

    /// Queue `dirty` (screen coordinates, already clipped to the visible
    /// content) for the client. Exposed areas get their view backgrounds
    /// cleared right away.
    pub(crate) fn trigger_content_redraw(&mut self, dirty: &Region) {
        if !self.is_visible() || dirty.is_empty() || self.feel == super::WindowFeel::WindowScreen {
            return;
        }

        let was_expose = self.pending_session.is_expose();
        self.transfer_to_update_session(dirty);

        if !self.pending_session.is_expose() {
            return;
        }
        self.update_content_region();

        // an expose arriving on a request-only session implicates all of it
        let clearing = if was_expose {
            dirty
        } else {
            self.pending_session.dirty_region()
        };

        let engine = self.engine.as_ref();
        let copy_to_front = engine.copy_to_front_enabled();
        engine.set_copy_to_front_enabled(true);
        engine.suspend_auto_sync();
        self.top_view
            .draw(engine, clearing, &self.content_region, true);
        engine.sync();
        engine.set_copy_to_front_enabled(copy_to_front);
    }

    fn transfer_to_update_session(&mut self, dirty: &Region) {
        if dirty.is_empty() {
            return;
        }

        self.pending_session.set_used(true);
        self.pending_session.add_cause(self.dirty_cause);
        self.pending_session.include(dirty);

        // one outstanding request is enough; BeginUpdate picks up the rest
        if !self.update_requested {
            self.send_update_message();
        }
    }

    fn send_update_message(&mut self) {
        if !self.update_requests_enabled {
            trace!("Window {}: update requests disabled", self.id);
            return;
        }

        if let Err(e) = self.link.send_message_to_client(ClientMessage::UpdateRequested) {
            // keep collecting dirt; the next transfer asks again
            debug!("Window {}: update request deferred: {}", self.id, e);
            return;
        }

        trace!("Window {}: update requested", self.id);
        self.update_requested = true;
        self.effective_valid = false;
    }

    pub fn update_requests_enabled(&self) -> bool {
        self.update_requests_enabled
    }

    pub fn disable_update_requests(&mut self) {
        self.update_requests_enabled = false;
    }

    /// Re-enable update requests, asking for any update held back meanwhile.
    pub fn enable_update_requests(&mut self) {
        self.update_requests_enabled = true;
        if !self.update_requested && self.pending_session.is_used() {
            self.send_update_message();
        }
    }

    /// The client is ready to draw. Replies with the frame and the views to
    /// redraw, or with an error status if no update was requested.
    pub fn begin_update(&mut self, link: &PortLink) -> ServerResult<()> {
        if !self.update_requested {
            error!("Window {}: BEGIN_UPDATE without a requested update", self.id);
            if let Err(e) = link.send_reply(&UpdateReply::Error) {
                debug!("Window {}: error reply not delivered: {}", self.id, e);
            }
            return Err(ServerError::UpdateNotRequested(self.id));
        }

        let mut dirty = match self.pool.get_copy(self.pending_session.dirty_region()) {
            Ok(dirty) => dirty,
            Err(e) => {
                warn!("Window {}: cannot begin update: {}", self.id, e);
                link.send_reply(&UpdateReply::Error)?;
                // ask again, the pending session is untouched
                self.update_requested = false;
                self.send_update_message();
                return Err(e);
            }
        };

        std::mem::swap(&mut self.current_session, &mut self.pending_session);
        self.pending_session.set_used(false);
        self.in_update = true;
        self.effective_valid = false;

        self.update_visible_content_region();
        dirty.intersect_with(&self.visible_content_region);

        let mut tokens = Vec::new();
        self.top_view
            .add_tokens_for_views_in_region(&mut tokens, &dirty, &self.content_region);

        debug!(
            "Window {}: begin update, {} rects, views {:?}",
            self.id,
            dirty.count_rects(),
            tokens
        );

        let sent = link.send_reply(&UpdateReply::Begin(UpdateGeometry {
            left: self.frame.left as f32,
            top: self.frame.top as f32,
            width: self.frame.width() as f32,
            height: self.frame.height() as f32,
            tokens,
        }));

        // the client's drawing reaches the screen at end_update
        self.engine.set_copy_to_front_enabled(false);

        if !self.current_session.is_expose() {
            let engine = self.engine.as_ref();
            engine.suspend_auto_sync();
            self.top_view
                .draw(engine, &dirty, &self.content_region, true);
            engine.sync();
        }

        sent
    }

    /// The client finished drawing the current session.
    pub fn end_update(&mut self) {
        if self.in_update {
            self.engine.set_copy_to_front_enabled(true);

            match self.pool.get_copy(self.current_session.dirty_region()) {
                Ok(mut dirty) => {
                    self.update_visible_content_region();
                    dirty.intersect_with(&self.visible_content_region);
                    self.engine.copy_to_front(&dirty);
                }
                Err(e) => warn!("Window {}: front buffer not flushed: {}", self.id, e),
            }

            self.current_session.set_used(false);
            self.in_update = false;
            self.effective_valid = false;
        }

        self.update_requested = false;
        if self.pending_session.is_used() {
            self.send_update_message();
        } else {
            trace!("Window {}: update cycle finished", self.id);
        }
    }

    /// Where the view `token` may draw right now, in screen coordinates.
    pub fn effective_drawing_region(&mut self, token: i32) -> Option<Region> {
        if !self.effective_valid {
            self.update_visible_content_region();
            self.effective_drawing_region
                .clone_from(&self.visible_content_region);
            if self.update_requested && !self.in_update {
                // the client has yet to begin; pending dirt is off limits
                self.effective_drawing_region
                    .exclude(self.pending_session.dirty_region());
            } else if self.in_update {
                self.effective_drawing_region
                    .intersect_with(self.current_session.dirty_region());
            }
            self.effective_valid = true;
        }

        self.update_content_region();
        let clipping = self
            .top_view
            .screen_and_user_clipping(token, &self.content_region)?;
        let mut region = self.effective_drawing_region.clone();
        region.intersect_with(&clipping);
        Some(region)
    }
}
