// SPDX-License-Identifier: CEPL-1.0
use crate::device::DeviceContext;
use crate::error::{GpuContext, VkResult};
use crate::pipeline::FixedPipeline;
use crate::swapchain::SwapchainManager;
use ash::vk;

/// One pre-recorded command buffer per swapchain image.
pub struct CommandRecorder {
    pool: vk::CommandPool,
    bufs: Vec<vk::CommandBuffer>,
    clear: vk::ClearValue,
}

pub(crate) fn clear_value(rgba: [f32; 4]) -> vk::ClearValue {
    vk::ClearValue {
        color: vk::ClearColorValue { float32: rgba },
    }
}

unsafe fn allocate(
    device: &ash::Device,
    pool: vk::CommandPool,
    count: usize,
) -> VkResult<Vec<vk::CommandBuffer>> {
    let alloc_info = vk::CommandBufferAllocateInfo {
        s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
        command_pool: pool,
        level: vk::CommandBufferLevel::PRIMARY,
        command_buffer_count: count as u32,
        ..Default::default()
    };
    device
        .allocate_command_buffers(&alloc_info)
        .gpu("allocate_command_buffers")
}

impl CommandRecorder {
    pub unsafe fn new(ctx: &DeviceContext, image_count: usize, rgba: [f32; 4]) -> VkResult<Self> {
        let pool_info = vk::CommandPoolCreateInfo {
            s_type: vk::StructureType::COMMAND_POOL_CREATE_INFO,
            queue_family_index: ctx.families.graphics,
            flags: vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            ..Default::default()
        };
        let pool = ctx
            .device
            .create_command_pool(&pool_info, None)
            .gpu("create_command_pool")?;
        let bufs = match allocate(&ctx.device, pool, image_count) {
            Ok(b) => b,
            Err(e) => {
                ctx.device.destroy_command_pool(pool, None);
                return Err(e);
            }
        };
        Ok(CommandRecorder {
            pool,
            bufs,
            clear: clear_value(rgba),
        })
    }

    pub fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.clear = clear_value(rgba);
    }

    pub fn buffer(&self, image_index: usize) -> vk::CommandBuffer {
        self.bufs[image_index]
    }

    /// Encodes the fixed pass for one image. The buffer must not be pending.
    pub unsafe fn record(
        &self,
        device: &ash::Device,
        image_index: usize,
        swapchain: &SwapchainManager,
        pipeline: &FixedPipeline,
    ) -> VkResult<()> {
        let cmd = self.bufs[image_index];
        let extent = swapchain.extent();

        device
            .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
            .gpu("reset_command_buffer")?;
        // No ONE_TIME_SUBMIT: the same recording is submitted every time this image comes up.
        let begin = vk::CommandBufferBeginInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_BEGIN_INFO,
            ..Default::default()
        };
        device
            .begin_command_buffer(cmd, &begin)
            .gpu("begin_command_buffer")?;

        let clears = [self.clear];
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        let rp_begin = vk::RenderPassBeginInfo {
            s_type: vk::StructureType::RENDER_PASS_BEGIN_INFO,
            render_pass: pipeline.render_pass(),
            framebuffer: swapchain.framebuffer(image_index),
            render_area,
            clear_value_count: clears.len() as u32,
            p_clear_values: clears.as_ptr(),
            ..Default::default()
        };
        device.cmd_begin_render_pass(cmd, &rp_begin, vk::SubpassContents::INLINE);

        device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline.pipeline());
        let vp = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        device.cmd_set_viewport(cmd, 0, std::slice::from_ref(&vp));
        device.cmd_set_scissor(cmd, 0, std::slice::from_ref(&render_area));
        device.cmd_draw(cmd, 3, 1, 0, 0);

        device.cmd_end_render_pass(cmd);
        device.end_command_buffer(cmd).gpu("end_command_buffer")
    }

    /// Matches the buffer count to the image count, then records every image.
    /// Only called while the device is idle.
    pub unsafe fn record_all(
        &mut self,
        device: &ash::Device,
        swapchain: &SwapchainManager,
        pipeline: &FixedPipeline,
    ) -> VkResult<()> {
        let image_count = swapchain.image_count();
        if self.bufs.len() != image_count {
            if !self.bufs.is_empty() {
                device.free_command_buffers(self.pool, &self.bufs);
            }
            self.bufs = allocate(device, self.pool, image_count)?;
        }
        for i in 0..image_count {
            self.record(device, i, swapchain, pipeline)?;
        }
        Ok(())
    }

    pub unsafe fn release(&mut self, device: &ash::Device) {
        // Free command buffers before destroying their pool.
        if !self.bufs.is_empty() {
            device.free_command_buffers(self.pool, &self.bufs);
            self.bufs.clear();
        }
        device.destroy_command_pool(self.pool, None);
        self.pool = vk::CommandPool::null();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_value_carries_rgba() {
        let v = clear_value([0.1, 0.2, 0.3, 1.0]);
        let rgba = unsafe { v.color.float32 };
        assert_eq!(rgba, [0.1, 0.2, 0.3, 1.0]);
    }
}
