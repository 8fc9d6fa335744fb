//! The per-window server thread.
//!
//! Each window gets one OS thread that owns the reply side of its client
//! connection. It drains the window's event queue: redraw passes woken by
//! the desktop and update requests from the client. `BeginUpdate` replies
//! block when the client is slow, which stalls only this thread.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use area_ipc::{ClientRequest, FramedMessage};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::errors::ServerResult;
use crate::link::{PortLink, WindowEvent};
use crate::locking::MultiLocker;
use crate::region::Region;
use crate::shared::{Rect, WindowId};
use crate::window::{lock_window, Window};

pub struct ServerWindow {
    id: WindowId,
    window: Arc<Mutex<Window>>,
    locker: Arc<MultiLocker>,
    port: PortLink,
    events: mpsc::UnboundedReceiver<WindowEvent>,
}

impl ServerWindow {
    pub fn new(
        window: Arc<Mutex<Window>>,
        locker: Arc<MultiLocker>,
        port: PortLink,
        events: mpsc::UnboundedReceiver<WindowEvent>,
    ) -> Self {
        let id = lock_window(&window).id();
        Self {
            id,
            window,
            locker,
            port,
            events,
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    /// Run the event loop on a thread of its own.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("w:{}", self.id))
            .spawn(move || self.run())
    }

    /// Handle events until `Quit` or until every sender is gone.
    pub fn run(mut self) {
        debug!("Window {}: thread started", self.id);
        while let Some(event) = self.events.blocking_recv() {
            if !self.handle(event) {
                break;
            }
        }
        debug!("Window {}: thread finished", self.id);
    }

    /// Returns `false` once the thread should stop.
    pub fn handle(&mut self, event: WindowEvent) -> bool {
        trace!("Window {}: {:?}", self.id, event);
        match event {
            WindowEvent::Redraw => self.redraw(),
            WindowEvent::Request(frame) => match decode_request(&frame) {
                Ok(request) => self.dispatch(request),
                // a malformed frame is dropped; the client may send more
                Err(e) => warn!("Window {}: bad request: {}", self.id, e),
            },
            WindowEvent::Quit => return false,
        }
        true
    }

    fn redraw(&mut self) {
        let _guard = self.locker.read_lock();
        let mut window = lock_window(&self.window);
        if let Err(e) = window.redraw_dirty_region() {
            if e.is_retryable() {
                debug!("Window {}: redraw deferred: {}", self.id, e);
                window.link().request_redraw();
            } else {
                warn!("Window {}: redraw failed: {}", self.id, e);
            }
        }
    }

    fn dispatch(&mut self, request: ClientRequest) {
        let _guard = self.locker.read_lock();
        let mut window = lock_window(&self.window);
        let result = match request {
            ClientRequest::BeginUpdate => window.begin_update(&self.port),
            ClientRequest::EndUpdate => {
                window.end_update();
                Ok(())
            }
            ClientRequest::Invalidate {
                token,
                left,
                top,
                right,
                bottom,
            } => window.invalidate_view(token, &Region::from(Rect::new(left, top, right, bottom))),
        };
        if let Err(e) = result {
            debug!("Window {}: request not handled: {}", self.id, e);
        }
    }
}

fn decode_request(frame: &[u8]) -> ServerResult<ClientRequest> {
    let (payload, _) = FramedMessage::split_frame(frame)?;
    Ok(FramedMessage::decode_client_request(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{visible_window, TestWindow};
    use crate::view::View;
    use area_ipc::{ClientMessage, UpdateReply};

    fn serve(test: TestWindow) -> (ServerWindow, Arc<Mutex<Window>>, crate::link::ClientEnd) {
        let TestWindow {
            window,
            port,
            client,
            events,
            ..
        } = test;
        let shared = Arc::new(Mutex::new(window));
        let server = ServerWindow::new(
            Arc::clone(&shared),
            Arc::new(MultiLocker::new()),
            port,
            events,
        );
        (server, shared, client)
    }

    fn request(request: ClientRequest) -> WindowEvent {
        WindowEvent::Request(FramedMessage::new(&request).unwrap().encode())
    }

    #[test]
    fn test_redraw_then_update_cycle() {
        let frame = Rect::new(100, 100, 299, 299);
        let mut test = visible_window(frame);
        test.window.process_dirty_region(&Region::from(frame));
        let (mut server, shared, mut client) = serve(test);

        assert!(server.handle(WindowEvent::Redraw));
        assert_eq!(
            client.messages.try_recv().ok(),
            Some(ClientMessage::UpdateRequested)
        );

        assert!(server.handle(request(ClientRequest::BeginUpdate)));
        let reply = client.replies.try_recv().expect("no reply");
        assert!(matches!(
            UpdateReply::decode(&reply).expect("undecodable reply"),
            UpdateReply::Begin(_)
        ));
        assert!(lock_window(&shared).in_update());

        assert!(server.handle(request(ClientRequest::EndUpdate)));
        let window = lock_window(&shared);
        assert!(!window.in_update());
        assert!(!window.update_requested());
    }

    #[test]
    fn test_invalidate_request_uses_view_coordinates() {
        let mut test = visible_window(Rect::new(100, 100, 299, 299));
        test.window
            .set_top_view(View::new(0, "top", Rect::new(0, 0, 199, 199)));
        let (mut server, shared, _client) = serve(test);

        server.handle(request(ClientRequest::Invalidate {
            token: 0,
            left: 0,
            top: 0,
            right: 9,
            bottom: 9,
        }));

        assert_eq!(
            lock_window(&shared).pending_session().dirty_region(),
            &Region::from(Rect::new(100, 100, 109, 109))
        );
    }

    #[test]
    fn test_malformed_requests_are_dropped() {
        let frame = Rect::new(0, 0, 99, 99);
        let mut test = visible_window(frame);
        test.window.process_dirty_region(&Region::from(frame));
        let (mut server, shared, mut client) = serve(test);
        assert!(server.handle(WindowEvent::Redraw));
        assert_eq!(
            client.messages.try_recv().ok(),
            Some(ClientMessage::UpdateRequested)
        );

        // truncated frame, then a frame that is not a request
        assert!(server.handle(WindowEvent::Request(vec![0, 0, 0, 9, b'{'])));
        let mut garbage = 2u32.to_be_bytes().to_vec();
        garbage.extend_from_slice(b"{}");
        assert!(server.handle(WindowEvent::Request(garbage)));
        assert!(client.replies.try_recv().is_err());
        assert!(!lock_window(&shared).in_update());

        assert!(server.handle(request(ClientRequest::BeginUpdate)));
        assert!(client.replies.try_recv().is_ok());
        assert!(lock_window(&shared).in_update());
    }

    #[test]
    fn test_decode_request_reports_protocol_errors() {
        let err = decode_request(&[0, 0]).unwrap_err();
        assert!(matches!(err, crate::errors::ServerError::Protocol(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_thread_answers_unrequested_update_and_quits() {
        let test = visible_window(Rect::new(0, 0, 99, 99));
        let link = test.window.link().clone();
        let (server, _shared, mut client) = serve(test);
        let handle = server.spawn().expect("thread not spawned");

        client.request(ClientRequest::BeginUpdate).unwrap();
        link.quit();
        handle.join().expect("window thread panicked");

        let reply = client.replies.try_recv().expect("no reply");
        assert_eq!(
            UpdateReply::decode(&reply).expect("undecodable reply"),
            UpdateReply::Error
        );
    }
}
