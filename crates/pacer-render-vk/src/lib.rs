// SPDX-License-Identifier: CEPL-1.0
#![allow(clippy::missing_safety_doc)]
//! Vulkan backend: instance/device bring-up, a self-healing swapchain and
//! the frames-in-flight protocol in [`frame`].

pub mod commands;
pub mod device;
pub mod error;
pub mod frame;
pub mod instance;
pub mod pipeline;
pub mod shader;
pub mod swapchain;

use anyhow::Result;
use ash::vk;
use pacer_render::{FrameStats, FrameStatus, RenderConfig, RenderSize, Renderer};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, info, warn};

use crate::commands::CommandRecorder;
use crate::device::DeviceContext;
use crate::error::GpuContext;
use crate::frame::{FrameSlot, FrameTarget};
use crate::instance::InstanceContext;
use crate::pipeline::FixedPipeline;
use crate::swapchain::{SwapchainManager, SwapchainPrefs};

pub use crate::error::{VkError, VkResult};
pub use crate::frame::{FrameSynchronizer, SlotState};
pub use crate::shader::{DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER};

/// Every GPU object the frame loop touches, in creation order.
pub struct VkFrameTarget {
    inst: InstanceContext,
    ctx: DeviceContext,
    pipeline: FixedPipeline,
    swapchain: SwapchainManager,
    recorder: CommandRecorder,
    window: RenderSize,
}

impl VkFrameTarget {
    // STRICT ORDER:
    // 1) Load shaders (cheap to fail, nothing to clean up)
    // 2) Instance + surface
    // 3) Physical/logical device against THAT surface
    // 4) Swapchain, then render pass + pipeline for its format
    // 5) Framebuffers, then command buffers recorded once per image
    // Each failure releases what the earlier steps built.
    unsafe fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        size: RenderSize,
        cfg: &RenderConfig,
    ) -> VkResult<Self> {
        let vs = shader::load_spirv(&cfg.vertex_shader)?;
        let fs = shader::load_spirv(&cfg.fragment_shader)?;

        let mut inst = unsafe { InstanceContext::new(window, display, cfg)? };
        let mut ctx = match unsafe { DeviceContext::new(&inst) } {
            Ok(c) => c,
            Err(e) => {
                unsafe { inst.release() };
                return Err(e);
            }
        };

        let built = unsafe { Self::build_chain(&inst, &ctx, size, cfg, vs, fs) };
        match built {
            Ok((pipeline, swapchain, recorder)) => Ok(VkFrameTarget {
                inst,
                ctx,
                pipeline,
                swapchain,
                recorder,
                window: size,
            }),
            Err(e) => {
                unsafe {
                    ctx.release();
                    inst.release();
                }
                Err(e)
            }
        }
    }

    unsafe fn build_chain(
        inst: &InstanceContext,
        ctx: &DeviceContext,
        size: RenderSize,
        cfg: &RenderConfig,
        vs: Vec<u32>,
        fs: Vec<u32>,
    ) -> VkResult<(FixedPipeline, SwapchainManager, CommandRecorder)> {
        let prefs = SwapchainPrefs::from_config(cfg);
        let mut swapchain = unsafe { SwapchainManager::new(inst, ctx, size, prefs)? };

        let pipeline = unsafe { FixedPipeline::new(&ctx.device, swapchain.format(), vs, fs) };
        let mut pipeline = match pipeline {
            Ok(p) => p,
            Err(e) => {
                unsafe { swapchain.release(ctx) };
                return Err(e);
            }
        };

        let recorder = unsafe {
            swapchain
                .attach_framebuffers(ctx, pipeline.render_pass())
                .and_then(|_| {
                    CommandRecorder::new(ctx, swapchain.image_count(), cfg.clear_color)
                })
        };
        let mut recorder = match recorder {
            Ok(r) => r,
            Err(e) => {
                unsafe {
                    swapchain.release(ctx);
                    pipeline.release(&ctx.device);
                }
                return Err(e);
            }
        };

        if let Err(e) = unsafe { recorder.record_all(&ctx.device, &swapchain, &pipeline) } {
            unsafe {
                recorder.release(&ctx.device);
                swapchain.release(ctx);
                pipeline.release(&ctx.device);
            }
            return Err(e);
        }
        Ok((pipeline, swapchain, recorder))
    }

    unsafe fn re_record(&mut self) -> VkResult<()> {
        unsafe {
            self.recorder
                .record_all(&self.ctx.device, &self.swapchain, &self.pipeline)
        }
    }

    /// Tears down everything except the frame slots, which the synchronizer
    /// hands back first. The device must be idle.
    unsafe fn release(&mut self) {
        unsafe {
            self.recorder.release(&self.ctx.device);
            self.swapchain.release(&self.ctx);
            self.pipeline.release(&self.ctx.device);
            self.ctx.release();
            self.inst.release();
        }
    }
}

impl FrameTarget for VkFrameTarget {
    type Slot = FrameSlot;

    fn create_slot(&mut self) -> VkResult<FrameSlot> {
        unsafe { FrameSlot::new(&self.ctx.device) }
    }

    fn destroy_slot(&mut self, slot: FrameSlot) {
        unsafe { slot.destroy(&self.ctx.device) }
    }

    fn is_paused(&self) -> bool {
        self.window.is_zero_area()
    }

    fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    fn wait_for_slot(&mut self, slot: &FrameSlot) -> VkResult<()> {
        unsafe {
            self.ctx
                .device
                .wait_for_fences(&[slot.in_flight], true, u64::MAX)
                .gpu("wait_for_fences")
        }
    }

    fn acquire_image(&mut self, slot: &FrameSlot) -> VkResult<u32> {
        let (index, suboptimal) = unsafe {
            self.ctx
                .swapchain_loader
                .acquire_next_image(
                    self.swapchain.swapchain(),
                    u64::MAX,
                    slot.image_acquired,
                    vk::Fence::null(),
                )
                .gpu("acquire_next_image")?
        };
        // The semaphore is already pending, so the frame goes ahead; present
        // will report the same condition and trigger the rebuild.
        if suboptimal {
            debug!("vk: acquire reported suboptimal swapchain");
        }
        Ok(index)
    }

    fn submit(&mut self, slot: &FrameSlot, image: u32) -> VkResult<()> {
        let d = &self.ctx.device;
        let cmd = self.recorder.buffer(image as usize);
        let wait_stage = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
        let submit = vk::SubmitInfo {
            s_type: vk::StructureType::SUBMIT_INFO,
            wait_semaphore_count: 1,
            p_wait_semaphores: &slot.image_acquired,
            p_wait_dst_stage_mask: &wait_stage,
            command_buffer_count: 1,
            p_command_buffers: &cmd,
            signal_semaphore_count: 1,
            p_signal_semaphores: &slot.render_finished,
            ..Default::default()
        };
        unsafe {
            // Reset only once a submit is certain to follow.
            d.reset_fences(&[slot.in_flight]).gpu("reset_fences")?;
            d.queue_submit(
                self.ctx.graphics_queue,
                std::slice::from_ref(&submit),
                slot.in_flight,
            )
            .gpu("queue_submit")
        }
    }

    fn present(&mut self, slot: &FrameSlot, image: u32) -> VkResult<()> {
        let swapchain = self.swapchain.swapchain();
        let present = vk::PresentInfoKHR {
            s_type: vk::StructureType::PRESENT_INFO_KHR,
            wait_semaphore_count: 1,
            p_wait_semaphores: &slot.render_finished,
            swapchain_count: 1,
            p_swapchains: &swapchain,
            p_image_indices: &image,
            ..Default::default()
        };
        let suboptimal = unsafe {
            self.ctx
                .swapchain_loader
                .queue_present(self.ctx.present_queue, &present)
                .gpu("queue_present")?
        };
        if suboptimal {
            return Err(VkError::SwapchainStale { suboptimal: true });
        }
        Ok(())
    }

    fn rebuild(&mut self) -> VkResult<()> {
        unsafe {
            self.swapchain
                .rebuild(&self.inst, &self.ctx, self.window, &mut self.pipeline)?;
            self.re_record()?;
        }
        let extent = self.swapchain.extent();
        info!(
            "vk: swapchain rebuilt ({}x{}, {} images)",
            extent.width,
            extent.height,
            self.swapchain.image_count()
        );
        Ok(())
    }
}

pub struct VkRenderer {
    target: VkFrameTarget,
    sync: FrameSynchronizer<FrameSlot>,
}

impl Renderer for VkRenderer {
    fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        size: RenderSize,
        cfg: &RenderConfig,
    ) -> Result<Self> {
        let mut target = unsafe { VkFrameTarget::new(window, display, size, cfg)? };
        let sync = match FrameSynchronizer::new(&mut target, cfg.frames_in_flight) {
            Ok(s) => s,
            Err(e) => {
                unsafe { target.release() };
                return Err(e.into());
            }
        };

        let extent = target.swapchain.extent();
        info!(
            "vk: renderer ready ({}x{}, {} images, {} frames in flight)",
            extent.width,
            extent.height,
            target.swapchain.image_count(),
            sync.frames_in_flight()
        );
        Ok(VkRenderer { target, sync })
    }

    fn resize(&mut self, size: RenderSize) -> Result<()> {
        if size == self.target.window {
            return Ok(());
        }
        let was_paused = self.target.is_paused();
        self.target.window = size;
        let paused = self.target.is_paused();
        if paused != was_paused {
            info!("vk: {}x{} → paused={}", size.width, size.height, paused);
        }
        self.sync.notify_resized();
        Ok(())
    }

    fn render(&mut self) -> Result<FrameStatus> {
        Ok(self.sync.tick(&mut self.target)?)
    }

    fn set_clear_color(&mut self, rgba: [f32; 4]) -> Result<()> {
        // Buffers are re-recorded in place; none may be pending.
        unsafe {
            self.target.ctx.wait_idle()?;
            self.target.recorder.set_clear_color(rgba);
            self.target.re_record()?;
        }
        Ok(())
    }

    fn stats(&self) -> FrameStats {
        self.sync.stats()
    }
}

impl Drop for VkRenderer {
    // STRICT ORDER (teardown):
    // 1) Drain the device
    // 2) Frame slots (fences + semaphores)
    // 3) Command buffers + pool
    // 4) Framebuffers, views, swapchain
    // 5) Pipeline, layout, render pass
    // 6) Device, then surface, debug messenger, instance
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.target.ctx.wait_idle() {
                warn!("vk: device_wait_idle during teardown: {e}");
            }
        }
        self.sync.release(&mut self.target);
        unsafe { self.target.release() };
        info!("vk: released");
    }
}
