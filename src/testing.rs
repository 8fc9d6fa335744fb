//! Test support: a recording drawing engine, a scripted desktop and
//! windows wired to inspectable channels.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use area_ipc::{ClientMessage, UpdateReply};
use tokio::sync::mpsc;

use crate::config::{DesktopConfig, GestureConfig, ServerConfig};
use crate::engine::DrawingEngine;
use crate::errors::{ServerError, ServerResult};
use crate::link::{window_channels, ClientEnd, PortLink, WindowEvent};
use crate::region::Region;
use crate::shared::{AppId, Rect, WindowId};
use crate::window::{DesktopOps, Window, WindowAttributes};

/// A drawing command seen by [`RecordingEngine`]
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Clip(Option<Region>),
    Fill(Region, u32),
    CopyRegion(Region, i32, i32),
    CopyToFront(Region),
}

/// Engines created from one another append to the same log.
#[derive(Debug)]
pub struct RecordingEngine {
    calls: Arc<Mutex<Vec<EngineCall>>>,
    copy_to_front: AtomicBool,
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            copy_to_front: AtomicBool::new(true),
        }
    }
}

impl RecordingEngine {
    fn record(&self, call: EngineCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Regions filled so far, in order.
    pub fn fills(&self) -> Vec<Region> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::Fill(region, _) => Some(region),
                _ => None,
            })
            .collect()
    }

    pub fn copy_to_front_enabled_now(&self) -> bool {
        self.copy_to_front.load(Ordering::Relaxed)
    }
}

impl DrawingEngine for RecordingEngine {
    fn constrain_clipping_region(&self, region: Option<&Region>) {
        self.record(EngineCall::Clip(region.cloned()));
    }

    fn fill_region(&self, region: &Region, color: u32) {
        self.record(EngineCall::Fill(region.clone(), color));
    }

    fn copy_region(&self, region: &Region, dx: i32, dy: i32) {
        self.record(EngineCall::CopyRegion(region.clone(), dx, dy));
    }

    fn copy_to_front_enabled(&self) -> bool {
        self.copy_to_front.load(Ordering::Relaxed)
    }

    fn set_copy_to_front_enabled(&self, enabled: bool) {
        self.copy_to_front.store(enabled, Ordering::Relaxed);
    }

    fn copy_to_front(&self, region: &Region) {
        self.record(EngineCall::CopyToFront(region.clone()));
    }

    fn suspend_auto_sync(&self) {}

    fn sync(&self) {}

    fn create_window_engine(&self) -> Arc<dyn DrawingEngine> {
        Arc::new(Self {
            calls: Arc::clone(&self.calls),
            copy_to_front: AtomicBool::new(true),
        })
    }
}

/// A window plus the other ends of its channels
pub struct TestWindow {
    pub window: Window,
    pub port: PortLink,
    pub client: ClientEnd,
    pub events: mpsc::UnboundedReceiver<WindowEvent>,
    pub engine: Arc<RecordingEngine>,
}

impl TestWindow {
    pub fn next_client_message(&mut self) -> Option<ClientMessage> {
        self.client.messages.try_recv().ok()
    }

    pub fn drain_client_messages(&mut self) -> Vec<ClientMessage> {
        std::iter::from_fn(|| self.client.messages.try_recv().ok()).collect()
    }

    /// Drain the client queue, counting update requests.
    pub fn count_update_requests(&mut self) -> usize {
        self.drain_client_messages()
            .iter()
            .filter(|message| **message == ClientMessage::UpdateRequested)
            .count()
    }

    /// Drain the client queue, looking for `message`.
    pub fn received(&mut self, message: &ClientMessage) -> bool {
        self.drain_client_messages().contains(message)
    }

    /// Occupy the client queue until sends start failing.
    pub fn fill_client_queue(&mut self) {
        while self
            .window
            .link()
            .send_message_to_client(ClientMessage::ZoomRequested)
            .is_ok()
        {}
    }

    pub fn next_raw_reply(&mut self) -> Option<Vec<u8>> {
        self.client.replies.try_recv().ok()
    }

    pub fn next_reply(&mut self) -> Option<UpdateReply> {
        self.next_raw_reply()
            .map(|bytes| UpdateReply::decode(&bytes).expect("undecodable reply"))
    }

    pub fn drain_window_events(&mut self) -> Vec<WindowEvent> {
        std::iter::from_fn(|| self.events.try_recv().ok()).collect()
    }
}

fn build(id: WindowId, app: AppId, attributes: WindowAttributes, config: &ServerConfig) -> TestWindow {
    let channels = window_channels(id, config.update.client_queue_capacity);
    let engine = Arc::new(RecordingEngine::default());
    let window = Window::new(
        id,
        app,
        attributes,
        channels.link,
        engine.clone(),
        config,
    );
    TestWindow {
        window,
        port: channels.port,
        client: channels.client,
        events: channels.events,
        engine,
    }
}

fn show(mut test: TestWindow) -> TestWindow {
    test.window.set_current_workspace(Some(0));
    test.window.set_hidden(false);
    test.window
        .set_clipping(&Region::from(Rect::new(-10_000, -10_000, 10_000, 10_000)));
    test
}

/// A hidden window, as created before the desktop stacks it.
pub fn window_with(attributes: WindowAttributes) -> TestWindow {
    window_with_ids(WindowId(1), AppId(1), attributes)
}

pub fn window_with_ids(id: WindowId, app: AppId, attributes: WindowAttributes) -> TestWindow {
    build(id, app, attributes, &ServerConfig::default())
}

/// A titled window on workspace 0 with nothing in front of it.
pub fn visible_window(frame: Rect) -> TestWindow {
    visible_window_with(WindowAttributes::new("test", frame))
}

pub fn visible_window_with(attributes: WindowAttributes) -> TestWindow {
    show(window_with(attributes))
}

pub fn visible_window_with_capacity(frame: Rect, capacity: usize) -> TestWindow {
    let mut config = ServerConfig::default();
    config.update.client_queue_capacity = capacity;
    show(build(
        WindowId(1),
        AppId(1),
        WindowAttributes::new("test", frame),
        &config,
    ))
}

pub fn visible_window_with_pool(frame: Rect, limit: usize) -> TestWindow {
    let mut config = ServerConfig::default();
    config.update.region_pool_limit = limit;
    show(build(
        WindowId(1),
        AppId(1),
        WindowAttributes::new("test", frame),
        &config,
    ))
}

/// A desktop operation requested by a gesture
#[derive(Debug, Clone, PartialEq)]
pub enum DesktopCall {
    Move(WindowId, i32, i32),
    Resize(WindowId, i32, i32),
    TabLocation(WindowId),
    Activate(WindowId),
    Focus(WindowId),
    SendBehind(WindowId),
}

/// Applies gesture requests straight to the window and logs them
pub struct TestDesktop {
    pub config: DesktopConfig,
    pub gesture: GestureConfig,
    pub screen: Rect,
    pub modal: bool,
    known: HashSet<WindowId>,
    calls: Vec<DesktopCall>,
    mouse_event_window: Option<WindowId>,
}

impl TestDesktop {
    pub fn new(window: &Window) -> Self {
        let config = DesktopConfig::default();
        let screen = Rect::new(0, 0, config.screen_width - 1, config.screen_height - 1);
        Self {
            config,
            gesture: GestureConfig::default(),
            screen,
            modal: false,
            known: HashSet::from([window.id()]),
            calls: Vec::new(),
            mouse_event_window: None,
        }
    }

    /// Simulate the window being closed mid-gesture.
    pub fn forget(&mut self, id: WindowId) {
        self.known.remove(&id);
    }

    pub fn calls(&self) -> &[DesktopCall] {
        &self.calls
    }

    pub fn mouse_event_window(&self) -> Option<WindowId> {
        self.mouse_event_window
    }

    fn check(&self, window: &Window) -> ServerResult<()> {
        if self.known.contains(&window.id()) {
            Ok(())
        } else {
            Err(ServerError::UnknownWindow(window.id()))
        }
    }
}

impl DesktopOps for TestDesktop {
    fn desktop_config(&self) -> &DesktopConfig {
        &self.config
    }

    fn gesture_config(&self) -> &GestureConfig {
        &self.gesture
    }

    fn screen_frame(&self) -> Rect {
        self.screen
    }

    fn move_window_by(&mut self, window: &mut Window, dx: i32, dy: i32) -> ServerResult<()> {
        self.check(window)?;
        self.calls.push(DesktopCall::Move(window.id(), dx, dy));
        window.move_by(dx, dy);
        Ok(())
    }

    fn resize_window_by(&mut self, window: &mut Window, dx: i32, dy: i32) -> ServerResult<()> {
        self.check(window)?;
        self.calls.push(DesktopCall::Resize(window.id(), dx, dy));
        window.resize_by(dx, dy, None);
        Ok(())
    }

    fn set_window_tab_location(
        &mut self,
        window: &mut Window,
        location: f32,
    ) -> ServerResult<bool> {
        self.check(window)?;
        self.calls.push(DesktopCall::TabLocation(window.id()));
        let mut dirty = Region::new();
        Ok(window.set_tab_location(location, &mut dirty))
    }

    fn activate_window(&mut self, window: &mut Window) -> ServerResult<()> {
        self.check(window)?;
        self.calls.push(DesktopCall::Activate(window.id()));
        window.set_focus(true);
        Ok(())
    }

    fn set_focus_window(&mut self, window: &mut Window) -> ServerResult<()> {
        self.check(window)?;
        self.calls.push(DesktopCall::Focus(window.id()));
        window.set_focus(true);
        Ok(())
    }

    fn send_window_behind(&mut self, window: &mut Window) -> ServerResult<()> {
        self.check(window)?;
        self.calls.push(DesktopCall::SendBehind(window.id()));
        Ok(())
    }

    fn set_mouse_event_window(&mut self, window: Option<WindowId>) {
        self.mouse_event_window = window;
    }

    fn has_modal(&self, _window: &Window) -> bool {
        self.modal
    }
}
