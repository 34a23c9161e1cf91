// SPDX-License-Identifier: CEPL-1.0
use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::path::PathBuf;

/// Frames the CPU may record ahead of the GPU.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

impl RenderSize {
    pub fn is_zero_area(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresentPreference {
    Fifo,    // vsync, always available
    Mailbox, // low latency vsync
    Immediate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatPreference {
    Bgra8Srgb,
    Bgra8Unorm,
    Rgba8Srgb,
}

/// Immutable startup configuration handed to a backend's constructor.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub app_name: String,
    pub clear_color: [f32; 4],
    pub present: PresentPreference,
    pub format: FormatPreference,
    pub validation: bool,
    pub frames_in_flight: usize,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
}

/// What one call to [`Renderer::render`] achieved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    Presented,
    /// The image chain was stale; it has been rebuilt and nothing was shown.
    SwapchainRebuilt,
    /// Zero-area surface; no GPU work was issued.
    Paused,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames_presented: u64,
    pub rebuilds: u64,
}

pub trait Renderer {
    fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        size: RenderSize,
        cfg: &RenderConfig,
    ) -> Result<Self>
    where
        Self: Sized;

    /// Records the new drawable size. The backend acts on it at the start of
    /// its next frame, never from inside this call.
    fn resize(&mut self, size: RenderSize) -> Result<()>;
    fn render(&mut self) -> Result<FrameStatus>;
    fn set_clear_color(&mut self, rgba: [f32; 4]) -> Result<()>;
    fn stats(&self) -> FrameStats {
        FrameStats::default()
    }
}
