//! Area window server, headless.
//!
//! Runs the desktop against a headless drawing engine with a few simulated
//! clients that answer update requests, plays a window drag and exits.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use area_ipc::{ClientMessage, ClientRequest, UpdateReply};
use area_server::config::ServerConfig;
use area_server::engine::HeadlessEngine;
use area_server::link::{window_channels, ClientEnd};
use area_server::shared::{AppId, Point, Rect, WindowId};
use area_server::window::{MouseButtons, MouseEvent, Window, WindowAttributes, WindowFeel};
use area_server::{Desktop, ServerWindow};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Stand-in for an application: draws whatever the server asks for.
async fn run_client(mut client: ClientEnd) {
    while let Some(message) = client.messages.recv().await {
        match message {
            ClientMessage::UpdateRequested => {
                if client.request(ClientRequest::BeginUpdate).is_err() {
                    break;
                }
                let Some(reply) = client.replies.recv().await else {
                    break;
                };
                match UpdateReply::decode(&reply) {
                    Ok(UpdateReply::Begin(geometry)) => {
                        debug!(
                            "Client of window {}: drawing views {:?}",
                            client.window, geometry.tokens
                        );
                    }
                    Ok(UpdateReply::Error) => {
                        warn!("Client of window {}: update refused", client.window);
                        continue;
                    }
                    Err(e) => {
                        warn!("Client of window {}: bad reply: {}", client.window, e);
                        continue;
                    }
                }
                if client.request(ClientRequest::EndUpdate).is_err() {
                    break;
                }
            }
            ClientMessage::QuitRequested => {
                info!("Client of window {}: quit requested", client.window);
            }
            other => debug!("Client of window {}: {:?}", client.window, other),
        }
    }
    debug!("Client of window {} disconnected", client.window);
}

/// Drive the desktop. Blocking: it takes the desktop write lock and waits
/// for window threads, so it runs on a blocking thread, not a runtime worker.
/// Returns the engine's (filled, copied, flushed) counts.
fn run(config: ServerConfig) -> Result<(u64, u64, u64)> {
    let engine = Arc::new(HeadlessEngine::new());
    let mut desktop = Desktop::new(config, engine.clone());
    let mut threads: Vec<JoinHandle<()>> = Vec::new();

    let demo = [
        ("Terminal", Rect::new(80, 80, 579, 429), WindowFeel::Normal),
        ("Editor", Rect::new(300, 200, 899, 649), WindowFeel::Normal),
        ("Tools", Rect::new(700, 60, 859, 259), WindowFeel::FloatingApp),
    ];
    for (index, (title, frame, feel)) in demo.into_iter().enumerate() {
        let id = WindowId(index as u32 + 1);
        let channels = window_channels(id, desktop.config().update.client_queue_capacity);
        let window = Window::new(
            id,
            AppId(1),
            WindowAttributes::new(title, frame).with_feel(feel),
            channels.link,
            desktop.create_window_engine(),
            desktop.config(),
        );
        let shared = desktop.add_window(window);
        let server = ServerWindow::new(
            shared,
            Arc::clone(desktop.locker()),
            channels.port,
            channels.events,
        );
        threads.push(server.spawn().context("Failed to spawn window thread")?);
        tokio::spawn(run_client(channels.client));
        desktop.show_window(id)?;
    }
    settle(&mut desktop);

    // drag the terminal by its tab
    let (terminal, frame) = (WindowId(1), demo[0].1);
    let mut position = Point::new(frame.left + 40, frame.top - 16);
    let start = Instant::now();
    desktop.mouse_down(&MouseEvent::new(position, MouseButtons::PRIMARY, start));
    for step in 1..=10u64 {
        position = position.offset_by(15, 8);
        desktop.mouse_moved(&MouseEvent::new(
            position,
            MouseButtons::PRIMARY,
            start + Duration::from_millis(step * 20),
        ));
        settle(&mut desktop);
    }
    desktop.mouse_up(&MouseEvent::new(
        position,
        MouseButtons::empty(),
        start + Duration::from_millis(240),
    ));
    info!("Window {} dragged to {:?}", terminal, position);

    desktop.send_behind(terminal)?;
    desktop.set_workspace(1);
    desktop.set_workspace(0);
    settle(&mut desktop);

    let stats = engine.stats();
    let (filled, copied, flushed) = stats;
    info!(
        "Engine: {} rects filled, {} blitted, {} flushed",
        filled, copied, flushed
    );

    for id in desktop.stack().to_vec() {
        desktop.remove_window(id);
    }
    for thread in threads {
        if thread.join().is_err() {
            error!("Window thread panicked");
        }
    }
    Ok(stats)
}

/// Give window threads and clients a moment, then run desktop work they
/// queued.
fn settle(desktop: &mut Desktop) {
    std::thread::sleep(Duration::from_millis(10));
    let handled = desktop.process_events();
    if handled > 0 {
        debug!("Desktop handled {} queued events", handled);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "area_server=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Area window server (headless)");

    let config = ServerConfig::load().context("Failed to load configuration")?;

    // Setup signal handlers for graceful shutdown
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let tx = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                    let _ = tx.send(()).await;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down");
                    let _ = tx.send(()).await;
                }
            }
        });
    }
    drop(shutdown_tx);

    // clients stay on the runtime, spawned from inside `run`
    let server = tokio::task::spawn_blocking(move || run(config));

    tokio::select! {
        result = server => {
            let result = result.context("Window server task failed")?;
            if let Err(e) = result {
                error!("Window server error: {}", e);
                return Err(e);
            }
        }
        Some(()) = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}
