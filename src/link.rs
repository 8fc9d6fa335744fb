//! Channels between a window, its client, its window thread and the desktop.
//!
//! Client notifications travel over a bounded queue: a full queue is how a
//! slow client shows up, and sends fail instead of blocking the desktop.
//! The `BeginUpdate` reply goes over a separate [`PortLink`] and does block
//! when the client is backed up, stalling only that window's thread.

use area_ipc::{ClientMessage, ClientRequest, FramedMessage, UpdateReply};
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::{ServerError, ServerResult};
use crate::region::Region;
use crate::shared::WindowId;

/// Work items for a window thread
#[derive(Debug, Clone, PartialEq)]
pub enum WindowEvent {
    /// The window's dirty region went from empty to non-empty
    Redraw,
    /// A length-prefixed JSON `ClientRequest` from the client
    Request(Vec<u8>),
    Quit,
}

/// Work a window thread hands to the desktop thread
#[derive(Debug, Clone, PartialEq)]
pub enum DesktopEvent {
    /// Screen area to repaint across all windows
    MarkDirty(Region),
}

/// Server side of a window's messaging
#[derive(Debug, Clone)]
pub struct WindowLink {
    window: WindowId,
    client: mpsc::Sender<ClientMessage>,
    events: mpsc::UnboundedSender<WindowEvent>,
    desktop: Option<mpsc::UnboundedSender<DesktopEvent>>,
}

impl WindowLink {
    pub fn new(
        window: WindowId,
        client: mpsc::Sender<ClientMessage>,
        events: mpsc::UnboundedSender<WindowEvent>,
    ) -> Self {
        Self {
            window,
            client,
            events,
            desktop: None,
        }
    }

    /// Route `mark_dirty` escalations to a desktop thread.
    pub fn set_desktop(&mut self, desktop: mpsc::UnboundedSender<DesktopEvent>) {
        self.desktop = Some(desktop);
    }

    pub fn window(&self) -> WindowId {
        self.window
    }

    /// Queue a notification for the client without blocking.
    pub fn send_message_to_client(&self, message: ClientMessage) -> ServerResult<()> {
        self.client.try_send(message).map_err(|e| {
            debug!("Window {}: client message not delivered: {}", self.window, e);
            ServerError::ClientUnreachable(self.window)
        })
    }

    /// Wake the window thread to run a redraw pass.
    pub fn request_redraw(&self) {
        if self.events.send(WindowEvent::Redraw).is_err() {
            debug!("Window {}: window thread gone, redraw dropped", self.window);
        }
    }

    /// Stop the window thread once it has handled what is queued.
    pub fn quit(&self) {
        if self.events.send(WindowEvent::Quit).is_err() {
            debug!("Window {}: window thread already gone", self.window);
        }
    }

    /// Hand a dirty screen area to the desktop thread.
    pub fn mark_dirty(&self, region: Region) -> ServerResult<()> {
        let Some(desktop) = &self.desktop else {
            return Err(ServerError::UnknownWindow(self.window));
        };
        desktop
            .send(DesktopEvent::MarkDirty(region))
            .map_err(|_| ServerError::UnknownWindow(self.window))
    }
}

/// Reply channel used while answering `BeginUpdate`
#[derive(Debug, Clone)]
pub struct PortLink {
    window: WindowId,
    replies: mpsc::Sender<Vec<u8>>,
}

impl PortLink {
    pub fn new(window: WindowId, replies: mpsc::Sender<Vec<u8>>) -> Self {
        Self { window, replies }
    }

    /// Send an encoded reply, waiting for queue space. Must not be called
    /// from inside the async runtime.
    pub fn send_reply(&self, reply: &UpdateReply) -> ServerResult<()> {
        self.replies
            .blocking_send(reply.encode())
            .map_err(|_| ServerError::ClientUnreachable(self.window))
    }
}

/// Client side of a window's messaging
#[derive(Debug)]
pub struct ClientEnd {
    pub window: WindowId,
    pub messages: mpsc::Receiver<ClientMessage>,
    pub replies: mpsc::Receiver<Vec<u8>>,
    requests: mpsc::UnboundedSender<WindowEvent>,
}

impl ClientEnd {
    /// Frame a request and forward it to the window thread.
    pub fn request(&self, request: ClientRequest) -> ServerResult<()> {
        let frame = FramedMessage::new(&request)?.encode();
        self.requests
            .send(WindowEvent::Request(frame))
            .map_err(|_| ServerError::UnknownWindow(self.window))
    }
}

/// Everything needed to wire one window
#[derive(Debug)]
pub struct WindowChannels {
    pub link: WindowLink,
    pub port: PortLink,
    pub client: ClientEnd,
    pub events: mpsc::UnboundedReceiver<WindowEvent>,
}

/// Create the channels of one window; `capacity` bounds the client queue.
pub fn window_channels(window: WindowId, capacity: usize) -> WindowChannels {
    let (message_tx, message_rx) = mpsc::channel(capacity.max(1));
    let (reply_tx, reply_rx) = mpsc::channel(capacity.max(1));
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    WindowChannels {
        link: WindowLink::new(window, message_tx, event_tx.clone()),
        port: PortLink::new(window, reply_tx),
        client: ClientEnd {
            window,
            messages: message_rx,
            replies: reply_rx,
            requests: event_tx,
        },
        events: event_rx,
    }
}
