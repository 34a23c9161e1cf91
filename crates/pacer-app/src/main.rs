// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use anyhow::{Context, Result};
use clap::Parser;
use pacer_core::config::{PresentModeCfg, SurfaceFormatCfg};
use pacer_core::{init_tracing, load_config, AppConfig, DEFAULT_CONFIG_PATH};
use pacer_platform::{resize_channel, DrawableSize, ResizeNotifier, ResizeQueue};
use pacer_render::{
    FormatPreference, FrameStatus, PresentPreference, RenderConfig, RenderSize, Renderer,
    MAX_FRAMES_IN_FLIGHT,
};
use pacer_render_vk::{VkRenderer, DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use pacer_platform::winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file; a missing file means built-in defaults
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Force the Khronos validation layer on
    #[arg(long)]
    validation: bool,
}

fn render_config(cfg: &AppConfig, force_validation: bool) -> RenderConfig {
    let r = &cfg.render;
    RenderConfig {
        app_name: cfg.window.title.clone(),
        clear_color: r.clear_color,
        present: match r.present_mode {
            PresentModeCfg::Fifo => PresentPreference::Fifo,
            PresentModeCfg::Mailbox => PresentPreference::Mailbox,
            PresentModeCfg::Immediate => PresentPreference::Immediate,
        },
        format: match r.surface_format {
            SurfaceFormatCfg::Bgra8Srgb => FormatPreference::Bgra8Srgb,
            SurfaceFormatCfg::Bgra8Unorm => FormatPreference::Bgra8Unorm,
            SurfaceFormatCfg::Rgba8Srgb => FormatPreference::Rgba8Srgb,
        },
        validation: force_validation || r.validation_enabled(),
        frames_in_flight: MAX_FRAMES_IN_FLIGHT,
        vertex_shader: r
            .vertex_shader
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_VERTEX_SHADER)),
        fragment_shader: r
            .fragment_shader
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FRAGMENT_SHADER)),
    }
}

fn render_size(s: DrawableSize) -> RenderSize {
    RenderSize {
        width: s.width,
        height: s.height,
    }
}

struct App {
    config_path: PathBuf,
    cfg: AppConfig,
    render_cfg: RenderConfig,

    // Field order matters: the renderer must go before the window it draws to.
    renderer: Option<VkRenderer>,
    window: Option<Window>,

    resize_tx: ResizeNotifier,
    resize_rx: ResizeQueue,

    paused: bool,
    exiting: bool,
    fatal: Option<anyhow::Error>,

    frames: u32,
    last_fps_instant: Instant,
}

impl App {
    fn new(config_path: PathBuf, cfg: AppConfig, render_cfg: RenderConfig) -> Self {
        let (resize_tx, resize_rx) = resize_channel();
        App {
            config_path,
            cfg,
            render_cfg,
            renderer: None,
            window: None,
            resize_tx,
            resize_rx,
            paused: false,
            exiting: false,
            fatal: None,
            frames: 0,
            last_fps_instant: Instant::now(),
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.exiting = true;
        // Renderer teardown waits for the device, then the window may go.
        self.renderer = None;
        self.window = None;
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        error!("fatal: {e:#}");
        self.fatal = Some(e);
        self.shutdown(event_loop);
    }

    fn create(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let w = &self.cfg.window;
        let attrs = Window::default_attributes()
            .with_title(w.title.clone())
            .with_inner_size(PhysicalSize::new(w.width, w.height))
            .with_resizable(w.resizable);
        let window = event_loop.create_window(attrs).context("create_window")?;

        let size = render_size(window.inner_size().into());
        let renderer = VkRenderer::new(&window, &window, size, &self.render_cfg)
            .context("vulkan renderer init")?;

        self.paused = size.is_zero_area();
        self.renderer = Some(renderer);
        self.window = Some(window);
        Ok(())
    }

    /// F5: re-read the config file and apply what can change live.
    fn reload_clear_color(&mut self) -> Result<()> {
        let cfg = load_config(&self.config_path)?;
        let rgba = cfg.render.clear_color;
        if let Some(r) = &mut self.renderer {
            r.set_clear_color(rgba)?;
        }
        info!("clear color → {:?}", rgba);
        self.cfg.render.clear_color = rgba;
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let Some(renderer) = &mut self.renderer else {
            return Ok(());
        };
        if let Some(size) = self.resize_rx.take_latest() {
            renderer.resize(render_size(size))?;
        }
        let status = renderer.render()?;
        self.paused = status == FrameStatus::Paused;
        if status == FrameStatus::Presented {
            self.frames = self.frames.saturating_add(1);
        }
        Ok(())
    }

    fn log_fps(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last_fps_instant) < Duration::from_secs(1) {
            return;
        }
        if let Some(r) = &self.renderer {
            let stats = r.stats();
            info!(
                "fps ~ {} (presented {}, rebuilds {})",
                self.frames, stats.frames_presented, stats.rebuilds
            );
        }
        self.frames = 0;
        self.last_fps_instant = now;
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create(event_loop) {
                self.fail(event_loop, e);
                return;
            }
        }
        info!("resumed → paused={}", self.paused);
        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(window) = &self.window {
            if window_id != window.id() {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("CloseRequested");
                self.shutdown(event_loop);
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match logical_key {
                Key::Named(NamedKey::Escape) => {
                    info!("Escape");
                    self.shutdown(event_loop);
                }
                Key::Named(NamedKey::F5) => {
                    if let Err(e) = self.reload_clear_color() {
                        // A bad edit to the file is not worth dying for,
                        // a device failure during re-record is.
                        match e.downcast_ref::<pacer_core::ConfigError>() {
                            Some(_) => warn!("config reload: {e:#}"),
                            None => self.fail(event_loop, e),
                        }
                    }
                }
                _ => {}
            },

            WindowEvent::Resized(new_size) => {
                let size = DrawableSize::from(new_size);
                info!("Resized → {}x{}", size.width, size.height);
                self.resize_tx.notify(size);
                if let Some(w) = &self.window {
                    w.request_redraw();
                }
            }

            WindowEvent::RedrawRequested => {
                if self.exiting {
                    return;
                }
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e);
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exiting {
            return;
        }
        if self.paused {
            // Nothing to draw until a resize arrives; it requests the redraw.
            event_loop.set_control_flow(ControlFlow::Wait);
            self.frames = 0;
            return;
        }
        // Present mode does the pacing.
        event_loop.set_control_flow(ControlFlow::Poll);
        if let Some(w) = &self.window {
            w.request_redraw();
        }
        self.log_fps();
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg = load_config(&args.config)?;
    let render_cfg = render_config(&cfg, args.validation);
    info!(
        "config: {:?}, {:?}, validation={}",
        render_cfg.present, render_cfg.format, render_cfg.validation
    );

    let event_loop: EventLoop<()> = EventLoop::new()?;
    let mut app = App::new(args.config, cfg, render_cfg);
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacer_core::config::parse_config;
    use std::path::Path;

    #[test]
    fn defaults_map_to_mailbox_srgb_and_builtin_shaders() {
        let rc = render_config(&AppConfig::default(), false);
        assert_eq!(rc.present, PresentPreference::Mailbox);
        assert_eq!(rc.format, FormatPreference::Bgra8Srgb);
        assert_eq!(rc.frames_in_flight, MAX_FRAMES_IN_FLIGHT);
        assert_eq!(rc.vertex_shader, PathBuf::from(DEFAULT_VERTEX_SHADER));
        assert_eq!(rc.fragment_shader, PathBuf::from(DEFAULT_FRAGMENT_SHADER));
        assert_eq!(rc.validation, cfg!(debug_assertions));
    }

    #[test]
    fn file_settings_carry_through() {
        let cfg = parse_config(
            r#"
            [window]
            title = "demo"
            [render]
            present_mode = "fifo"
            surface_format = "rgba8_srgb"
            validation = false
            vertex_shader = "a.spv"
            "#,
            Path::new("t.toml"),
        )
        .unwrap();
        let rc = render_config(&cfg, false);
        assert_eq!(rc.app_name, "demo");
        assert_eq!(rc.present, PresentPreference::Fifo);
        assert_eq!(rc.format, FormatPreference::Rgba8Srgb);
        assert!(!rc.validation);
        assert_eq!(rc.vertex_shader, PathBuf::from("a.spv"));
        assert_eq!(rc.fragment_shader, PathBuf::from(DEFAULT_FRAGMENT_SHADER));
    }

    #[test]
    fn cli_flag_forces_validation() {
        let cfg = parse_config("[render]\nvalidation = false\n", Path::new("t.toml")).unwrap();
        assert!(render_config(&cfg, true).validation);
    }

    #[test]
    fn args_default_to_pacer_toml() {
        let args = Args::parse_from(["pacer-app"]);
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(!args.validation);

        let args = Args::parse_from(["pacer-app", "--config", "x.toml", "--validation"]);
        assert_eq!(args.config, PathBuf::from("x.toml"));
        assert!(args.validation);
    }
}
