//! C Foreign Function Interface (FFI) for the overlay.
//!
//! The host owns the frame loop: it creates an overlay, feeds it events,
//! calls `danmaku_overlay_tick` once per display refresh and reads the
//! resulting sprites back to draw them. All functions are `extern "C"` with
//! stable ABI. Emote loading is not available through this interface; image
//! sprites keep their reserved space and render text-only.
//!
//! # Safety
//!
//! All functions that accept pointers require valid pointers or NULL.
//! Strings must be NUL-terminated. The caller owns the overlay handle and
//! must release it with `danmaku_overlay_destroy`.
//!
//! # Example (C)
//!
//! ```c
//! #include "danmaku.h"
//!
//! int main() {
//!     DanmakuOverlay* overlay = danmaku_overlay_new(1280.0, 720.0);
//!     if (!overlay) return 1;
//!
//!     danmaku_overlay_set_active(overlay, true);
//!     danmaku_overlay_enqueue(overlay, "room-1", "alice", "hello", NULL);
//!
//!     // Per display refresh:
//!     danmaku_overlay_tick(overlay);
//!     for (size_t i = 0; i < danmaku_overlay_sprite_count(overlay); i++) {
//!         DanmakuSprite s;
//!         danmaku_overlay_sprite_at(overlay, i, &s);
//!         // draw s ...
//!     }
//!
//!     danmaku_overlay_destroy(overlay);
//!     return 0;
//! }
//! ```

// FFI modules intentionally use unsafe and no_mangle
#![allow(unsafe_op_in_unsafe_fn)]
#![allow(clippy::missing_safety_doc)]
#![allow(clippy::not_unsafe_ptr_arg_deref)]

use crate::config::{AreaMode, OverlayConfig, Settings};
use crate::controller::OverlayController;
use crate::event::ChatEvent;
use crate::ingest::IngestOutcome;
use crate::render::RecordingSurface;
use crate::sprite::ImageSlot;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::ptr;

// =============================================================================
// Opaque Handle Types
// =============================================================================

/// Opaque handle to a host-driven overlay.
pub struct DanmakuOverlay {
    controller: OverlayController,
    surface: RecordingSurface,
}

// =============================================================================
// Result and Data Types
// =============================================================================

/// Result codes for FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DanmakuResult {
    /// Operation succeeded.
    Ok = 0,
    /// Null pointer passed.
    NullPointer = 1,
    /// Invalid UTF-8 string.
    InvalidUtf8 = 2,
    /// Malformed JSON or missing session id.
    InvalidEvent = 3,
    /// Out of bounds.
    OutOfBounds = 4,
    /// Event was dropped (inactive, duplicate, blank or stale session).
    Rejected = 5,
}

/// User settings as seen from C.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DanmakuSettings {
    /// Whether the overlay is switched on.
    pub enabled: bool,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Font scale in `[0.5, 2]`.
    pub font_scale: f64,
    /// Density in `[0, 1]`.
    pub density: f64,
    /// 0 = quarter, 1 = half, 2 = three quarters, anything else = full.
    pub area: c_int,
}

/// One sprite read back after a tick.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct DanmakuSprite {
    /// Stable sprite id.
    pub id: u64,
    /// Lane index.
    pub lane: u32,
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width including the emote slot.
    pub width: f64,
    /// Font size.
    pub font_px: f64,
    /// Whether space is reserved for an emote.
    pub has_image: bool,
}

impl From<DanmakuSettings> for Settings {
    fn from(s: DanmakuSettings) -> Self {
        Self {
            enabled: s.enabled,
            opacity: s.opacity,
            font_scale: s.font_scale,
            density: s.density,
            area: match s.area {
                0 => AreaMode::Quarter,
                1 => AreaMode::Half,
                2 => AreaMode::ThreeQuarter,
                _ => AreaMode::Full,
            },
        }
    }
}

// =============================================================================
// Overlay Functions
// =============================================================================

/// Create an overlay for a drawing area of `width` x `height` pixels.
///
/// The overlay starts inactive.
#[unsafe(no_mangle)]
pub extern "C" fn danmaku_overlay_new(width: f64, height: f64) -> *mut DanmakuOverlay {
    let controller = OverlayController::builder(OverlayConfig::default())
        .viewport(width, height)
        .build();
    Box::into_raw(Box::new(DanmakuOverlay {
        controller,
        surface: RecordingSurface::new(),
    }))
}

/// Destroy an overlay.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn danmaku_overlay_destroy(overlay: *mut DanmakuOverlay) {
    if !overlay.is_null() {
        drop(Box::from_raw(overlay));
    }
}

/// Resize the drawing area.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn danmaku_overlay_resize(overlay: *mut DanmakuOverlay, width: f64, height: f64) {
    if let Some(overlay) = overlay.as_mut() {
        overlay.controller.resize(width, height);
    }
}

/// Show or hide the overlay.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn danmaku_overlay_set_active(overlay: *mut DanmakuOverlay, active: bool) {
    if let Some(overlay) = overlay.as_mut() {
        overlay.controller.set_active(active);
    }
}

/// Apply user settings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn danmaku_overlay_apply_settings(
    overlay: *mut DanmakuOverlay,
    settings: *const DanmakuSettings,
) -> DanmakuResult {
    if overlay.is_null() || settings.is_null() {
        return DanmakuResult::NullPointer;
    }
    let overlay = &mut *overlay;
    overlay.controller.apply_settings((*settings).into());
    DanmakuResult::Ok
}

/// Switch the active session. NULL admits every session.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn danmaku_overlay_set_session(
    overlay: *mut DanmakuOverlay,
    session_id: *const c_char,
) -> DanmakuResult {
    if overlay.is_null() {
        return DanmakuResult::NullPointer;
    }
    let session = match opt_str(session_id) {
        Ok(s) => s.map(str::to_string),
        Err(code) => return code,
    };
    let overlay = &mut *overlay;
    overlay.controller.set_session(session);
    DanmakuResult::Ok
}

/// Offer a chat event. `image_url` may be NULL.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn danmaku_overlay_enqueue(
    overlay: *const DanmakuOverlay,
    session_id: *const c_char,
    user: *const c_char,
    text: *const c_char,
    image_url: *const c_char,
) -> DanmakuResult {
    if overlay.is_null() || session_id.is_null() {
        return DanmakuResult::NullPointer;
    }
    let fields = (opt_str(session_id), opt_str(user), opt_str(text), opt_str(image_url));
    let (Ok(Some(session)), Ok(user), Ok(text), Ok(image_url)) = fields else {
        return DanmakuResult::InvalidUtf8;
    };

    let mut event = ChatEvent::new(session, user.unwrap_or_default(), text.unwrap_or_default());
    if let Some(url) = image_url {
        event = event.with_image(url, None);
    }
    let overlay = &*overlay;
    outcome_code(overlay.controller.enqueue(event))
}

/// Offer a chat event encoded as JSON.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn danmaku_overlay_enqueue_json(
    overlay: *const DanmakuOverlay,
    json: *const c_char,
) -> DanmakuResult {
    if overlay.is_null() || json.is_null() {
        return DanmakuResult::NullPointer;
    }
    let Ok(json) = CStr::from_ptr(json).to_str() else {
        return DanmakuResult::InvalidUtf8;
    };
    match ChatEvent::from_json(json) {
        Ok(event) => {
            let overlay = &*overlay;
            outcome_code(overlay.controller.enqueue(event))
        }
        Err(_) => DanmakuResult::InvalidEvent,
    }
}

/// Drop every queued event and live sprite.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn danmaku_overlay_clear(overlay: *mut DanmakuOverlay) {
    if let Some(overlay) = overlay.as_mut() {
        overlay.controller.clear();
    }
}

/// Advance one frame. Returns the number of sprites spawned.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn danmaku_overlay_tick(overlay: *mut DanmakuOverlay) -> usize {
    if overlay.is_null() {
        return 0;
    }
    let overlay = &mut *overlay;
    overlay.controller.tick(&mut overlay.surface).spawned
}

/// Number of sprites in the last presented frame.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn danmaku_overlay_sprite_count(overlay: *const DanmakuOverlay) -> usize {
    if overlay.is_null() {
        return 0;
    }
    let overlay = &*overlay;
    overlay.surface.last.len()
}

/// Opacity of the last presented frame, or 0 if it was hidden.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn danmaku_overlay_opacity(overlay: *const DanmakuOverlay) -> f64 {
    if overlay.is_null() {
        return 0.0;
    }
    let overlay = &*overlay;
    let surface = &overlay.surface;
    if surface.last_visible {
        surface.last_opacity
    } else {
        0.0
    }
}

/// Copy sprite `index` of the last frame into `out`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn danmaku_overlay_sprite_at(
    overlay: *const DanmakuOverlay,
    index: usize,
    out: *mut DanmakuSprite,
) -> DanmakuResult {
    if overlay.is_null() || out.is_null() {
        return DanmakuResult::NullPointer;
    }
    let overlay = &*overlay;
    let Some(sprite) = overlay.surface.last.get(index) else {
        return DanmakuResult::OutOfBounds;
    };
    *out = DanmakuSprite {
        id: sprite.id.0,
        lane: u32::try_from(sprite.lane).unwrap_or(u32::MAX),
        x: sprite.x,
        y: sprite.y,
        width: sprite.width,
        font_px: sprite.font_px,
        has_image: !matches!(sprite.image, ImageSlot::None),
    };
    DanmakuResult::Ok
}

/// Copy the UTF-8 text of sprite `index` into `buf` (NUL-terminated,
/// truncated to `buf_len - 1` bytes).
///
/// Returns the full text length in bytes, or -1 on error.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn danmaku_overlay_sprite_text(
    overlay: *const DanmakuOverlay,
    index: usize,
    buf: *mut c_char,
    buf_len: usize,
) -> c_int {
    if overlay.is_null() {
        return -1;
    }
    let overlay = &*overlay;
    let Some(sprite) = overlay.surface.last.get(index) else {
        return -1;
    };
    let bytes = sprite.text.as_bytes();
    if !buf.is_null() && buf_len > 0 {
        let n = bytes.len().min(buf_len - 1);
        ptr::copy_nonoverlapping(bytes.as_ptr().cast::<c_char>(), buf, n);
        *buf.add(n) = 0;
    }
    c_int::try_from(bytes.len()).unwrap_or(c_int::MAX)
}

// =============================================================================
// Version Information
// =============================================================================

/// Get the library version string.
#[unsafe(no_mangle)]
pub extern "C" fn danmaku_version() -> *const c_char {
    static VERSION: &[u8] = b"0.1.0\0";
    VERSION.as_ptr().cast::<c_char>()
}

// =============================================================================
// Helper Functions
// =============================================================================

unsafe fn opt_str<'a>(s: *const c_char) -> Result<Option<&'a str>, DanmakuResult> {
    if s.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(s)
        .to_str()
        .map(Some)
        .map_err(|_| DanmakuResult::InvalidUtf8)
}

const fn outcome_code(outcome: IngestOutcome) -> DanmakuResult {
    match outcome {
        IngestOutcome::Accepted { .. } => DanmakuResult::Ok,
        IngestOutcome::Rejected(_) => DanmakuResult::Rejected,
    }
}
