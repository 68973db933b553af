//! Terminal Overlay: Renders a simulated chat flood as scrolling text.
//!
//! A producer thread floods the overlay with chat messages (some carrying
//! emotes served by an in-process transport) while the tick thread draws
//! every frame into the terminal. Each terminal cell stands in for an
//! 11x16 pixel block.
//!
//! Press 'q' or Escape to quit, 'c' to clear, 'd' to toggle density.
//! Set `RUST_LOG=danmaku=debug` to see engine logs on stderr.

use anyhow::Context as _;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue};
use danmaku::{
    ChatEvent, FetchedImage, Frame, ImageTransport, OverlayConfig, OverlayController,
    OverlayRuntime, RenderSurface, Settings,
};
use std::io::{self, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const CELL_W: f64 = 11.0;
const CELL_H: f64 = 16.0;
const SESSION: &str = "demo-room";

const LINES: [&str; 8] = [
    "hello from chat",
    "first!",
    "that play was insane",
    "666666",
    "[图片]",
    "GG WP",
    "can we get a replay?",
    "弹幕护体",
];

/// Serves a tiny generated PNG for every emote URL.
struct DemoTransport {
    png: String,
}

impl DemoTransport {
    fn new() -> anyhow::Result<Self> {
        let img = image::RgbaImage::from_pixel(8, 8, image::Rgba([255, 200, 0, 255]));
        let mut bytes = io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png)
            .context("encoding demo emote")?;
        Ok(Self {
            png: STANDARD.encode(bytes.into_inner()),
        })
    }
}

#[async_trait]
impl ImageTransport for DemoTransport {
    async fn fetch_image(
        &self,
        _session_id: &str,
        _url: &str,
        _cancel: CancellationToken,
    ) -> anyhow::Result<FetchedImage> {
        tokio::time::sleep(Duration::from_millis(150)).await;
        Ok(FetchedImage::new("image/png", self.png.clone()))
    }
}

/// Draws sprites as text cells.
struct TerminalSurface {
    out: Stdout,
}

impl TerminalSurface {
    fn draw(&mut self, frame: &Frame<'_>) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All))?;
        if frame.visible {
            let cols = (frame.viewport.width / CELL_W) as i64;
            for sprite in frame.visible_sprites() {
                let row = (sprite.y / CELL_H) as u16;
                let mut col = (sprite.x / CELL_W).round() as i64;
                let mut label = String::new();
                if sprite.has_image {
                    label.push(if sprite.image.is_some() { '◆' } else { '◇' });
                    label.push(' ');
                }
                label.push_str(sprite.text);

                // Clip on the left edge.
                let mut chars = label.chars();
                while col < 0 {
                    if chars.next().is_none() {
                        break;
                    }
                    col += 1;
                }
                let visible: String = chars.take((cols - col).max(0) as usize).collect();
                if !visible.is_empty() {
                    queue!(self.out, cursor::MoveTo(col as u16, row), Print(visible))?;
                }
            }
        }
        self.out.flush()
    }
}

impl RenderSurface for TerminalSurface {
    fn present(&mut self, frame: &Frame<'_>) {
        if let Err(err) = self.draw(frame) {
            tracing::warn!(%err, "terminal draw failed");
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("starting fetch runtime")?;

    let (cols, rows) = terminal::size()?;
    let controller = OverlayController::builder(OverlayConfig::default())
        .viewport(f64::from(cols) * CELL_W, f64::from(rows) * CELL_H)
        .transport(Arc::new(DemoTransport::new()?), runtime.handle().clone())
        .build();

    terminal::enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen, cursor::Hide)?;

    let result = run(controller);

    execute!(io::stdout(), cursor::Show, LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    result
}

fn run(controller: OverlayController) -> anyhow::Result<()> {
    let overlay = OverlayRuntime::spawn(controller, TerminalSurface { out: io::stdout() })?;
    let handle = overlay.handle();
    handle.set_session(Some(SESSION.to_string()));
    handle.set_active(true);

    let stop = Arc::new(AtomicBool::new(false));
    let producer = {
        let handle = handle.clone();
        let stop = Arc::clone(&stop);
        std::thread::Builder::new()
            .name("chat-flood".to_string())
            .spawn(move || {
                let mut n = 0usize;
                while !stop.load(Ordering::Relaxed) {
                    let text = LINES[n % LINES.len()];
                    let mut event = ChatEvent::new(SESSION, format!("viewer{}", n % 37), text);
                    if n % 5 == 0 {
                        event = event.with_image(format!("https://emotes.example/{}.png", n % 3), None);
                    }
                    handle.enqueue(event);
                    n += 1;
                    std::thread::sleep(Duration::from_millis(40));
                }
            })?
    };

    let mut sparse = false;
    loop {
        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Char('c') => handle.clear(),
                KeyCode::Char('d') => {
                    sparse = !sparse;
                    handle.apply_settings(Settings {
                        density: if sparse { 0.2 } else { 1.0 },
                        ..Settings::default()
                    });
                }
                _ => {}
            },
            Event::Resize(cols, rows) => {
                handle.resize(f64::from(cols) * CELL_W, f64::from(rows) * CELL_H);
            }
            _ => {}
        }
    }

    stop.store(true, Ordering::Relaxed);
    let _ = producer.join();
    let info = overlay.frame_info();
    overlay.join();
    tracing::info!(fps = info.fps, live = info.last.live, "demo finished");
    Ok(())
}
