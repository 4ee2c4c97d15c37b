//! Strata
//!
//! An X11 window manager built around a window-geometry and state engine:
//! constraints, deferred move/resize and showing queues, interactive grabs
//! and the client sync handshake.

mod compositor;
mod config;
mod shared;
mod wm;
mod x11_async;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use x11rb::rust_connection::RustConnection;

use crate::compositor::LoggingCompositor;
use crate::wm::clock::MonotonicClock;
use crate::wm::display::X11Backend;
use crate::wm::events::EventRouter;
use crate::wm::settings::WmSettings;
use crate::wm::WindowManagerCore;

/// Command line options
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Options {
    /// Replace the existing window manager
    #[arg(short, long)]
    replace: bool,

    /// Configuration file to use instead of ~/.config/strata/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Main application state
struct StrataApp {
    x11_stream: x11_async::X11EventStream,
    router: EventRouter,
    core: WindowManagerCore,
}

impl StrataApp {
    /// Become the window manager and adopt the windows already on screen
    fn new(options: &Options) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;
        let conn: Arc<RustConnection> = Arc::new(conn);
        info!("Connected to X server, screen {}", screen_num);

        let config = match &options.config {
            Some(path) => config::Config::load_from(path, false),
            None => config::Config::load(),
        }
        .context("Failed to load configuration")?;
        let settings = WmSettings::from_config(&config);

        let backend = X11Backend::connect(conn.clone(), screen_num, options.replace)?;
        let existing = backend.existing_windows()?;
        let router = EventRouter::new(conn.clone(), backend.atoms(), backend.root(), backend.time_tracker())?;
        let x11_stream = x11_async::X11EventStream::new(conn)?;

        let mut core = WindowManagerCore::new(
            Box::new(backend),
            Box::new(LoggingCompositor::new()),
            Box::new(MonotonicClock),
            settings,
        );
        info!("Adopting {} existing windows", existing.len());
        for window in existing {
            router.manage(&mut core, window, true);
        }
        core.dispatch_pending();

        Ok(Self { x11_stream, router, core })
    }

    /// Drain everything the connection has buffered
    fn drain_events(&mut self) -> Result<()> {
        while let Some(event) = self.x11_stream.poll_next_event()? {
            self.router.route_event(&mut self.core, event);
        }
        Ok(())
    }

    async fn run(&mut self, shutdown: &mut tokio::sync::mpsc::Receiver<()>) -> Result<()> {
        info!("Entering event loop");
        loop {
            self.drain_events().context("X11 connection lost")?;
            self.core.dispatch_pending();
            if let Err(e) = self.x11_stream.flush() {
                warn!("Failed to flush X11 requests: {}", e);
            }

            let deadline = self.core.next_deadline().map(tokio::time::Instant::from_std);
            tokio::select! {
                () = self.x11_stream.wait_readable() => {}
                () = async {
                    match deadline {
                        Some(deadline) => tokio::time::sleep_until(deadline).await,
                        None => std::future::pending::<()>().await,
                    }
                } => {}
                _ = shutdown.recv() => {
                    info!("Shutdown signal received, releasing windows");
                    self.core.shutdown();
                    return Ok(());
                }
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "strata=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let options = Options::parse();
    info!("Starting strata");
    if options.replace {
        info!("--replace flag detected: will attempt to replace existing WM");
    }

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
                _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully"),
            }
            let _ = shutdown_tx.send(()).await;
        });
    }

    let mut app = StrataApp::new(&options)?;
    if let Err(e) = app.run(&mut shutdown_rx).await {
        error!("Window manager error: {:#}", e);
        return Err(e);
    }
    Ok(())
}
