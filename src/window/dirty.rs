//! Dirty-region propagation: from desktop exposes and client
//! invalidations to the pending update session.

use tracing::trace;

use super::types::UpdateCause;
use super::Window;
use crate::errors::ServerResult;
use crate::region::{Region, RegionPool};

/// Move the part of `region` that lies in `shift` by (`dx`, `dy`).
fn shift_part_of_region(
    pool: &RegionPool,
    region: &mut Region,
    shift: &Region,
    dx: i32,
    dy: i32,
) -> ServerResult<()> {
    let mut common = pool.get_copy(shift)?;
    common.intersect_with(region);
    if !common.is_empty() {
        region.exclude(&common);
        common.offset_by(dx, dy);
        region.include(&common);
    }
    Ok(())
}

impl Window {
    /// Add exposed screen area. Runs on the desktop thread (write lock) or
    /// the window thread (read lock), never both at once. Only the
    /// empty to non-empty transition wakes the window thread.
    pub fn process_dirty_region(&mut self, region: &Region) {
        if self.dirty_region.is_empty() {
            self.link.request_redraw();
        }
        self.dirty_region.include(region);
        self.dirty_cause |= UpdateCause::EXPOSE;
    }

    /// Window thread, read lock held: repaint the border and hand the
    /// dirty content to the client. The dirty region stays set when the
    /// pass fails so the next one retries.
    pub fn redraw_dirty_region(&mut self) -> ServerResult<()> {
        if self.is_visible() {
            self.draw_border()?;

            self.update_visible_content_region();
            let mut dirty_content = self.pool.get_copy(&self.visible_content_region)?;
            dirty_content.intersect_with(&self.dirty_region);
            self.trigger_content_redraw(&dirty_content);
        }

        // the desktop thread is blocked on the write lock while we hold
        // the read lock, nobody can have added to the region meanwhile
        self.dirty_region.make_empty();
        self.dirty_cause = UpdateCause::empty();
        Ok(())
    }

    fn draw_border(&mut self) -> ServerResult<()> {
        if self.decorator.is_none() {
            return Ok(());
        }
        self.update_border_region();
        let mut dirty_border = self.pool.get_copy(&self.border_region)?;
        dirty_border.intersect_with(&self.visible_region);
        dirty_border.intersect_with(&self.dirty_region);
        if dirty_border.is_empty() {
            return Ok(());
        }

        if let Some(decorator) = &self.decorator {
            let engine = self.engine.as_ref();
            engine.constrain_clipping_region(Some(&dirty_border));
            let copy_to_front = engine.copy_to_front_enabled();
            engine.set_copy_to_front_enabled(false);
            decorator.draw(engine, dirty_border.frame());
            engine.set_copy_to_front_enabled(copy_to_front);
            engine.copy_to_front(&dirty_border);
            engine.constrain_clipping_region(None);
        }
        Ok(())
    }

    /// Redraw the whole visible border, e.g. for a pressed button.
    pub(crate) fn draw_visible_border(&mut self) -> ServerResult<()> {
        if self.decorator.is_none() {
            return Ok(());
        }
        self.update_border_region();
        let mut visible_border = self.pool.get_copy(&self.border_region)?;
        visible_border.intersect_with(&self.visible_region);

        if let Some(decorator) = &self.decorator {
            let engine = self.engine.as_ref();
            engine.constrain_clipping_region(Some(&visible_border));
            decorator.draw(engine, visible_border.frame());
            engine.constrain_clipping_region(None);
        }
        Ok(())
    }

    /// Client invalidation, handled right away on the window thread.
    pub fn mark_content_dirty(&mut self, region: &Region) -> ServerResult<()> {
        if self.hidden || self.offscreen {
            return Ok(());
        }
        self.update_visible_content_region();
        let mut dirty = self.pool.get_copy(region)?;
        dirty.intersect_with(&self.visible_content_region);
        self.dirty_cause |= UpdateCause::REQUEST;
        self.trigger_content_redraw(&dirty);
        Ok(())
    }

    /// Client invalidation batched into the next redraw pass.
    pub fn mark_content_dirty_async(&mut self, region: &Region) -> ServerResult<()> {
        if self.hidden || self.offscreen {
            return Ok(());
        }
        self.update_visible_content_region();
        let mut dirty = self.pool.get_copy(region)?;
        dirty.intersect_with(&self.visible_content_region);
        if dirty.is_empty() {
            return Ok(());
        }

        if self.dirty_region.is_empty() {
            self.link.request_redraw();
        }
        self.dirty_region.include(&dirty);
        self.dirty_cause |= UpdateCause::REQUEST;
        Ok(())
    }

    /// Invalidate `view_region` given in the local coordinates of the view
    /// `token`.
    pub fn invalidate_view(&mut self, token: i32, view_region: &Region) -> ServerResult<()> {
        if !self.is_visible() || !self.top_view.is_view_visible(token) {
            return Ok(());
        }
        self.update_visible_content_region();

        let mut dirty = self.pool.get_copy(view_region)?;
        if !self.top_view.convert_to_screen(token, &mut dirty) {
            return Ok(());
        }
        dirty.intersect_with(&self.visible_content_region);
        if dirty.is_empty() {
            return Ok(());
        }
        if let Some(clipping) = self
            .top_view
            .screen_and_user_clipping(token, &self.content_region)
        {
            dirty.intersect_with(&clipping);
        }

        self.dirty_cause |= UpdateCause::REQUEST;
        self.trigger_content_redraw(&dirty);
        Ok(())
    }

    /// Escalate a screen area to the desktop, which repaints every window
    /// under it.
    pub fn mark_dirty(&self, region: Region) -> ServerResult<()> {
        self.link.mark_dirty(region)
    }

    /// Blit the pixels of `region` (screen coordinates) by
    /// (`dx`, `dy`). Whatever cannot be sourced from clean, visible pixels
    /// is marked dirty at the destination instead.
    pub fn copy_contents(&mut self, region: &Region, dx: i32, dy: i32) -> ServerResult<()> {
        if !self.is_visible() {
            return Ok(());
        }
        self.update_visible_content_region();

        let mut new_dirty = self.pool.get_copy(region)?;
        let mut source = self.pool.get_copy(region)?;

        // clip to the visible content at the source and the destination
        source.intersect_with(&self.visible_content_region);
        if !source.is_empty() {
            source.offset_by(dx, dy);
            source.intersect_with(&self.visible_content_region);
        }
        if !source.is_empty() {
            source.offset_by(-dx, -dy);

            let mut all_dirty = self.pool.get_copy(&self.dirty_region)?;
            if self.pending_session.is_used() {
                all_dirty.include(self.pending_session.dirty_region());
            }
            if self.current_session.is_used() {
                all_dirty.include(self.current_session.dirty_region());
            }
            // the part of the dirt that travels with the copy
            all_dirty.intersect_with(&source);

            shift_part_of_region(&self.pool, &mut self.dirty_region, &source, dx, dy)?;
            if self.pending_session.is_used() {
                shift_part_of_region(
                    &self.pool,
                    self.pending_session.dirty_region_mut(),
                    &source,
                    dx,
                    dy,
                )?;
            }

            // never copy pixels that are not drawn yet
            let mut copy = self.pool.get_copy(&source)?;
            copy.exclude(&all_dirty);
            if !copy.is_empty() {
                self.engine.copy_region(&copy, dx, dy);
            }
            new_dirty.exclude(&copy);

            // the copied destination is clean, even for the pending session
            copy.offset_by(dx, dy);
            if self.pending_session.is_used() {
                self.pending_session.exclude(&copy);
            }
            self.effective_valid = false;
        }

        new_dirty.offset_by(dx, dy);
        let mut visible_part = self.pool.get_copy(&new_dirty)?;
        visible_part.intersect_with(&self.visible_content_region);
        // a destination entirely out of sight is marked dirty whole
        if !visible_part.is_empty() {
            new_dirty.intersect_with(&self.visible_content_region);
        }
        if !new_dirty.is_empty() {
            trace!(
                "Window {}: {} rects not copyable, marked dirty",
                self.id,
                new_dirty.count_rects()
            );
            self.process_dirty_region(&new_dirty);
        }
        Ok(())
    }

    /// Scroll the contents of view `token`. Pixels still on screen are
    /// blitted; the rest goes to the client.
    pub fn scroll_view_by(&mut self, token: i32, dx: i32, dy: i32) -> ServerResult<()> {
        if token == self.top_view.token() || (dx == 0 && dy == 0) {
            return Ok(());
        }
        self.update_visible_content_region();
        let Some(clipping) = self
            .top_view
            .screen_clipping(token, &self.visible_content_region)
        else {
            return Ok(());
        };

        let mut dirty = self.pool.get_copy(&clipping)?;
        let mut copy = self.pool.get_copy(&clipping)?;

        if let Some(view) = self.top_view.find_mut(token) {
            view.scroll_by(dx, dy);
        }
        self.effective_valid = false;

        if !self.is_visible() || !self.top_view.is_view_visible(token) {
            return Ok(());
        }

        // content moves against the scroll offset; keep sources whose
        // destination stays inside the view and that are already drawn
        copy.offset_by(-dx, -dy);
        copy.intersect_with(&clipping);
        copy.offset_by(dx, dy);
        copy.exclude(&self.dirty_region);
        if self.pending_session.is_used() {
            copy.exclude(self.pending_session.dirty_region());
        }
        if self.current_session.is_used() {
            copy.exclude(self.current_session.dirty_region());
        }
        if !copy.is_empty() {
            self.engine.copy_region(&copy, -dx, -dy);
        }

        copy.offset_by(-dx, -dy);
        dirty.exclude(&copy);
        dirty.intersect_with(&self.visible_content_region);
        self.trigger_content_redraw(&dirty);
        Ok(())
    }
}
