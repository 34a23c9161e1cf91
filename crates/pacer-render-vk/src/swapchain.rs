// SPDX-License-Identifier: CEPL-1.0
//! Presentable image chain and its per-image views and framebuffers.
//!
//! The decisions (format, present mode, extent, image count, sharing) are
//! made by [`SwapchainPlan::new`] from a [`SurfaceSupport`] snapshot and do not
//! touch the GPU. [`SwapchainManager`] turns a plan into Vulkan objects and
//! owns them until the next rebuild.

use crate::device::{DeviceContext, QueueFamilyIndices};
use crate::error::{GpuContext, VkError, VkResult};
use crate::instance::InstanceContext;
use crate::pipeline::FixedPipeline;
use ash::vk;
use pacer_render::{FormatPreference, PresentPreference, RenderConfig, RenderSize};
use tracing::info;

/// Surface properties as reported for one physical device.
#[derive(Clone, Debug, Default)]
pub struct SurfaceSupport {
    pub caps: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    pub unsafe fn query(inst: &InstanceContext, phys: vk::PhysicalDevice) -> VkResult<Self> {
        let caps = inst
            .surface_loader
            .get_physical_device_surface_capabilities(phys, inst.surface)
            .gpu("get_physical_device_surface_capabilities")?;
        let formats = inst
            .surface_loader
            .get_physical_device_surface_formats(phys, inst.surface)
            .gpu("get_physical_device_surface_formats")?;
        let present_modes = inst
            .surface_loader
            .get_physical_device_surface_present_modes(phys, inst.surface)
            .gpu("get_physical_device_surface_present_modes")?;
        Ok(SurfaceSupport {
            caps,
            formats,
            present_modes,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapchainPrefs {
    pub format: vk::Format,
    pub color_space: vk::ColorSpaceKHR,
    pub present_mode: vk::PresentModeKHR,
}

impl SwapchainPrefs {
    pub fn from_config(cfg: &RenderConfig) -> Self {
        let format = match cfg.format {
            FormatPreference::Bgra8Srgb => vk::Format::B8G8R8A8_SRGB,
            FormatPreference::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
            FormatPreference::Rgba8Srgb => vk::Format::R8G8B8A8_SRGB,
        };
        let present_mode = match cfg.present {
            PresentPreference::Fifo => vk::PresentModeKHR::FIFO,
            PresentPreference::Mailbox => vk::PresentModeKHR::MAILBOX,
            PresentPreference::Immediate => vk::PresentModeKHR::IMMEDIATE,
        };
        SwapchainPrefs {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            present_mode,
        }
    }
}

impl Default for SwapchainPrefs {
    fn default() -> Self {
        SwapchainPrefs {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            present_mode: vk::PresentModeKHR::MAILBOX,
        }
    }
}

/// First exact (format, color space) match, else the first reported format.
pub fn choose_surface_format(
    formats: &[vk::SurfaceFormatKHR],
    prefs: &SwapchainPrefs,
) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .copied()
        .find(|f| f.format == prefs.format && f.color_space == prefs.color_space)
        .or_else(|| formats.first().copied())
}

/// The preferred mode when reported, else FIFO (always available).
pub fn choose_present_mode(
    modes: &[vk::PresentModeKHR],
    preferred: vk::PresentModeKHR,
) -> vk::PresentModeKHR {
    if modes.contains(&preferred) {
        preferred
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// `current_extent.width == u32::MAX` means the surface size follows the
/// swapchain, so the window's drawable size is clamped into the bounds.
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, want: RenderSize) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        // max-then-min instead of clamp: a driver reporting min > max must not panic.
        vk::Extent2D {
            width: want
                .width
                .max(caps.min_image_extent.width)
                .min(caps.max_image_extent.width),
            height: want
                .height
                .max(caps.min_image_extent.height)
                .min(caps.max_image_extent.height),
        }
    }
}

/// One more than the minimum, capped by the maximum (0 == "no max").
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let want = caps.min_image_count + 1;
    if caps.max_image_count == 0 {
        want
    } else {
        want.min(caps.max_image_count)
    }
}

fn choose_composite_alpha(caps: &vk::SurfaceCapabilitiesKHR) -> vk::CompositeAlphaFlagsKHR {
    [
        vk::CompositeAlphaFlagsKHR::OPAQUE,
        vk::CompositeAlphaFlagsKHR::INHERIT,
        vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
    ]
    .into_iter()
    .find(|&a| caps.supported_composite_alpha.contains(a))
    .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharingPlan {
    pub mode: vk::SharingMode,
    /// Empty for exclusive sharing.
    pub queue_family_indices: Vec<u32>,
}

impl SharingPlan {
    pub fn for_families(families: QueueFamilyIndices) -> Self {
        if families.is_shared() {
            SharingPlan {
                mode: vk::SharingMode::EXCLUSIVE,
                queue_family_indices: Vec::new(),
            }
        } else {
            SharingPlan {
                mode: vk::SharingMode::CONCURRENT,
                queue_family_indices: vec![families.graphics, families.present],
            }
        }
    }
}

/// Every parameter of a swapchain, decided up front.
#[derive(Clone, Debug)]
pub struct SwapchainPlan {
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub sharing: SharingPlan,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
}

impl SwapchainPlan {
    pub fn new(
        support: &SurfaceSupport,
        window: RenderSize,
        prefs: &SwapchainPrefs,
        families: QueueFamilyIndices,
    ) -> VkResult<Self> {
        let surface_format = choose_surface_format(&support.formats, prefs).ok_or(
            VkError::Gpu {
                op: "get_physical_device_surface_formats",
                result: vk::Result::ERROR_FORMAT_NOT_SUPPORTED,
            },
        )?;
        let caps = &support.caps;

        // Prefer IDENTITY if supported, otherwise use current to avoid extra blits.
        let pre_transform = if caps
            .supported_transforms
            .contains(vk::SurfaceTransformFlagsKHR::IDENTITY)
        {
            vk::SurfaceTransformFlagsKHR::IDENTITY
        } else {
            caps.current_transform
        };

        // A minimized window can report a defined 0x0 extent before the
        // window system delivers the matching resize.
        let extent = choose_extent(caps, window);
        if extent.width == 0 || extent.height == 0 {
            return Err(VkError::SurfaceZeroArea);
        }

        Ok(SwapchainPlan {
            surface_format,
            present_mode: choose_present_mode(&support.present_modes, prefs.present_mode),
            extent,
            image_count: choose_image_count(caps),
            sharing: SharingPlan::for_families(families),
            pre_transform,
            composite_alpha: choose_composite_alpha(caps),
        })
    }
}

// Info only
fn fmt_name(f: vk::Format) -> &'static str {
    match f {
        vk::Format::B8G8R8A8_UNORM => "B8G8R8A8_UNORM",
        vk::Format::B8G8R8A8_SRGB => "B8G8R8A8_SRGB",
        vk::Format::R8G8B8A8_SRGB => "R8G8B8A8_SRGB",
        vk::Format::R8G8B8A8_UNORM => "R8G8B8A8_UNORM",
        _ => "OTHER",
    }
}
fn pm_name(m: vk::PresentModeKHR) -> &'static str {
    match m {
        vk::PresentModeKHR::FIFO => "FIFO",
        vk::PresentModeKHR::MAILBOX => "MAILBOX",
        vk::PresentModeKHR::IMMEDIATE => "IMMEDIATE",
        vk::PresentModeKHR::FIFO_RELAXED => "FIFO_RELAXED",
        _ => "OTHER",
    }
}

/// Creates one object per input. If any creation fails, the objects already
/// created are handed to `destroy` and the error is returned.
fn create_all<I, T, E>(
    inputs: I,
    mut create: impl FnMut(I::Item) -> Result<T, E>,
    mut destroy: impl FnMut(T),
) -> Result<Vec<T>, E>
where
    I: IntoIterator,
{
    let mut made = Vec::new();
    for input in inputs {
        match create(input) {
            Ok(t) => made.push(t),
            Err(e) => {
                made.into_iter().for_each(&mut destroy);
                return Err(e);
            }
        }
    }
    Ok(made)
}

/// One generation of the image chain. Replaced wholesale on rebuild.
pub struct SwapchainState {
    pub swapchain: vk::SwapchainKHR,
    pub format: vk::Format,
    pub color_space: vk::ColorSpaceKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub framebuffers: Vec<vk::Framebuffer>,
}

impl SwapchainState {
    unsafe fn destroy(&mut self, ctx: &DeviceContext) {
        let d = &ctx.device;
        // Framebuffers, then the views they reference, then the swapchain
        // that owns the images.
        for fb in self.framebuffers.drain(..) {
            d.destroy_framebuffer(fb, None);
        }
        for iv in self.image_views.drain(..) {
            d.destroy_image_view(iv, None);
        }
        self.images.clear();
        ctx.swapchain_loader.destroy_swapchain(self.swapchain, None);
        self.swapchain = vk::SwapchainKHR::null();
    }
}

pub struct SwapchainManager {
    state: SwapchainState,
    prefs: SwapchainPrefs,
}

impl SwapchainManager {
    pub unsafe fn new(
        inst: &InstanceContext,
        ctx: &DeviceContext,
        window: RenderSize,
        prefs: SwapchainPrefs,
    ) -> VkResult<Self> {
        let state = build(inst, ctx, window, &prefs, vk::SwapchainKHR::null())?;
        Ok(SwapchainManager { state, prefs })
    }

    /// Framebuffers need the render pass, which in turn depends on the image
    /// format, so they are attached as a separate step after every build.
    pub unsafe fn attach_framebuffers(
        &mut self,
        ctx: &DeviceContext,
        render_pass: vk::RenderPass,
    ) -> VkResult<()> {
        let extent = self.state.extent;
        let framebuffers = create_all(
            self.state.image_views.iter(),
            |view| {
                let fb_info = vk::FramebufferCreateInfo {
                    s_type: vk::StructureType::FRAMEBUFFER_CREATE_INFO,
                    render_pass,
                    attachment_count: 1,
                    p_attachments: view,
                    width: extent.width,
                    height: extent.height,
                    layers: 1,
                    ..Default::default()
                };
                ctx.device
                    .create_framebuffer(&fb_info, None)
                    .gpu("create_framebuffer")
            },
            |fb| ctx.device.destroy_framebuffer(fb, None),
        )?;
        self.state.framebuffers = framebuffers;
        Ok(())
    }

    // STRICT ORDER (rebuild):
    // 0) A zero-area surface fails the plan before anything is created or
    //    destroyed, leaving the current chain in place
    // 1) device_wait_idle(): no submitted work may still reference the old images
    // 2) Create the NEW swapchain with the old one as `old_swapchain`
    // 3) Destroy the OLD framebuffers, views and swapchain
    // 4) Recreate render pass + pipeline ONLY if the color format changed
    // 5) Attach framebuffers for the NEW views
    // The caller re-records command buffers afterwards.
    pub unsafe fn rebuild(
        &mut self,
        inst: &InstanceContext,
        ctx: &DeviceContext,
        window: RenderSize,
        pipeline: &mut FixedPipeline,
    ) -> VkResult<()> {
        ctx.wait_idle()?;

        let next = build(inst, ctx, window, &self.prefs, self.state.swapchain)?;
        let mut old = std::mem::replace(&mut self.state, next);
        old.destroy(ctx);

        if pipeline.ensure_format(&ctx.device, self.state.format)? {
            info!(
                "vk: surface format changed to {}, pipeline rebuilt",
                fmt_name(self.state.format)
            );
        }
        self.attach_framebuffers(ctx, pipeline.render_pass())
    }

    pub fn swapchain(&self) -> vk::SwapchainKHR {
        self.state.swapchain
    }

    pub fn format(&self) -> vk::Format {
        self.state.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.state.extent
    }

    pub fn image_count(&self) -> usize {
        self.state.images.len()
    }

    pub fn framebuffer(&self, image_index: usize) -> vk::Framebuffer {
        self.state.framebuffers[image_index]
    }

    pub unsafe fn release(&mut self, ctx: &DeviceContext) {
        self.state.destroy(ctx);
    }
}

unsafe fn build(
    inst: &InstanceContext,
    ctx: &DeviceContext,
    window: RenderSize,
    prefs: &SwapchainPrefs,
    previous: vk::SwapchainKHR,
) -> VkResult<SwapchainState> {
    let support = SurfaceSupport::query(inst, ctx.phys)?;
    let plan = SwapchainPlan::new(&support, window, prefs, ctx.families)?;

    info!(
        "vk: swapchain format: {} / {:?}, present_mode: {}, extent: {}x{}, images(min={} → picked={}), sharing: {:?}",
        fmt_name(plan.surface_format.format),
        plan.surface_format.color_space,
        pm_name(plan.present_mode),
        plan.extent.width,
        plan.extent.height,
        support.caps.min_image_count,
        plan.image_count,
        plan.sharing.mode,
    );

    let swap_info = vk::SwapchainCreateInfoKHR {
        s_type: vk::StructureType::SWAPCHAIN_CREATE_INFO_KHR,
        surface: inst.surface,
        min_image_count: plan.image_count,
        image_format: plan.surface_format.format,
        image_color_space: plan.surface_format.color_space,
        image_extent: plan.extent,
        image_array_layers: 1,
        image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
        image_sharing_mode: plan.sharing.mode,
        queue_family_index_count: plan.sharing.queue_family_indices.len() as u32,
        p_queue_family_indices: plan.sharing.queue_family_indices.as_ptr(),
        pre_transform: plan.pre_transform,
        composite_alpha: plan.composite_alpha,
        present_mode: plan.present_mode,
        clipped: vk::TRUE,
        old_swapchain: previous,
        ..Default::default()
    };

    let swapchain = ctx
        .swapchain_loader
        .create_swapchain(&swap_info, None)
        .gpu("create_swapchain")?;
    // From here on a failure must also destroy the new swapchain.
    let images = match ctx.swapchain_loader.get_swapchain_images(swapchain) {
        Ok(i) => i,
        Err(e) => {
            ctx.swapchain_loader.destroy_swapchain(swapchain, None);
            return Err(VkError::gpu("get_swapchain_images", e));
        }
    };

    // View format MUST match swapchain image format for direct rendering.
    let views = create_all(
        images.iter().copied(),
        |img| {
            let sub = vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            };
            let iv_info = vk::ImageViewCreateInfo {
                s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
                image: img,
                view_type: vk::ImageViewType::TYPE_2D,
                format: plan.surface_format.format,
                subresource_range: sub,
                ..Default::default()
            };
            ctx.device
                .create_image_view(&iv_info, None)
                .gpu("create_image_view")
        },
        |iv| ctx.device.destroy_image_view(iv, None),
    );
    let views = match views {
        Ok(v) => v,
        Err(e) => {
            ctx.swapchain_loader.destroy_swapchain(swapchain, None);
            return Err(e);
        }
    };

    Ok(SwapchainState {
        swapchain,
        format: plan.surface_format.format,
        color_space: plan.surface_format.color_space,
        present_mode: plan.present_mode,
        extent: plan.extent,
        images,
        image_views: views,
        framebuffers: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            current_extent: vk::Extent2D {
                width: 800,
                height: 600,
            },
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
            ..Default::default()
        }
    }

    fn sf(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    fn size(width: u32, height: u32) -> RenderSize {
        RenderSize { width, height }
    }

    fn shared() -> QueueFamilyIndices {
        QueueFamilyIndices {
            graphics: 0,
            present: 0,
        }
    }

    #[test]
    fn create_all_unwinds_on_failure() {
        let mut destroyed = Vec::new();
        let made = create_all(
            1..=5,
            |i| if i == 3 { Err("third") } else { Ok(i * 10) },
            |t| destroyed.push(t),
        );
        assert_eq!(made, Err("third"));
        assert_eq!(destroyed, vec![10, 20]);
    }

    #[test]
    fn create_all_keeps_everything_on_success() {
        let mut destroyed: Vec<u32> = Vec::new();
        let made: Result<Vec<u32>, ()> = create_all(1..=3, |i| Ok(i), |t| destroyed.push(t));
        assert_eq!(made, Ok(vec![1, 2, 3]));
        assert!(destroyed.is_empty());
    }

    #[test]
    fn image_count_clamped_at_max() {
        assert_eq!(choose_image_count(&caps(2, 3)), 3);
        assert_eq!(choose_image_count(&caps(3, 3)), 3);
    }

    #[test]
    fn image_count_unbounded_max() {
        assert_eq!(choose_image_count(&caps(2, 0)), 3);
        assert_eq!(choose_image_count(&caps(1, 8)), 2);
    }

    #[test]
    fn undefined_extent_uses_window_size() {
        let c = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 64,
                height: 64,
            },
            max_image_extent: vk::Extent2D {
                width: 2048,
                height: 2048,
            },
            ..Default::default()
        };
        let e = choose_extent(&c, size(1024, 768));
        assert_eq!((e.width, e.height), (1024, 768));

        let e = choose_extent(&c, size(4000, 10));
        assert_eq!((e.width, e.height), (2048, 64));
    }

    #[test]
    fn defined_extent_wins_over_window() {
        let e = choose_extent(&caps(2, 3), size(1024, 768));
        assert_eq!((e.width, e.height), (800, 600));
    }

    #[test]
    fn exact_format_match_preferred() {
        let formats = [
            sf(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            sf(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT),
            sf(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let f = choose_surface_format(&formats, &SwapchainPrefs::default()).unwrap();
        assert_eq!(f.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(f.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn format_falls_back_to_first() {
        let formats = [
            sf(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            sf(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let f = choose_surface_format(&formats, &SwapchainPrefs::default()).unwrap();
        assert_eq!(f.format, vk::Format::R8G8B8A8_UNORM);
        assert!(choose_surface_format(&[], &SwapchainPrefs::default()).is_none());
    }

    #[test]
    fn present_mode_preference_and_fallback() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(
            choose_present_mode(&modes, vk::PresentModeKHR::MAILBOX),
            vk::PresentModeKHR::MAILBOX
        );
        assert_eq!(
            choose_present_mode(&modes, vk::PresentModeKHR::IMMEDIATE),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn shared_family_is_exclusive() {
        let s = SharingPlan::for_families(shared());
        assert_eq!(s.mode, vk::SharingMode::EXCLUSIVE);
        assert!(s.queue_family_indices.is_empty());
    }

    #[test]
    fn split_families_are_concurrent() {
        let s = SharingPlan::for_families(QueueFamilyIndices {
            graphics: 0,
            present: 2,
        });
        assert_eq!(s.mode, vk::SharingMode::CONCURRENT);
        assert_eq!(s.queue_family_indices, vec![0, 2]);
    }

    #[test]
    fn config_maps_to_prefs() {
        let cfg = RenderConfig {
            app_name: "t".into(),
            clear_color: [0.0; 4],
            present: PresentPreference::Fifo,
            format: FormatPreference::Rgba8Srgb,
            validation: false,
            frames_in_flight: 2,
            vertex_shader: "a".into(),
            fragment_shader: "b".into(),
        };
        let p = SwapchainPrefs::from_config(&cfg);
        assert_eq!(p.format, vk::Format::R8G8B8A8_SRGB);
        assert_eq!(p.present_mode, vk::PresentModeKHR::FIFO);
        assert_eq!(p.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn plan_is_stable_for_identical_inputs() {
        let support = SurfaceSupport {
            caps: caps(2, 0),
            formats: vec![sf(
                vk::Format::B8G8R8A8_SRGB,
                vk::ColorSpaceKHR::SRGB_NONLINEAR,
            )],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        let prefs = SwapchainPrefs::default();
        let a = SwapchainPlan::new(&support, size(800, 600), &prefs, shared()).unwrap();
        let b = SwapchainPlan::new(&support, size(800, 600), &prefs, shared()).unwrap();
        assert_eq!(
            (a.extent.width, a.extent.height),
            (b.extent.width, b.extent.height)
        );
        assert_eq!(a.surface_format.format, b.surface_format.format);
        assert_eq!(a.present_mode, b.present_mode);
        assert_eq!(a.image_count, 3);
        assert_eq!(a.present_mode, vk::PresentModeKHR::FIFO);
        assert_eq!(a.composite_alpha, vk::CompositeAlphaFlagsKHR::OPAQUE);
    }

    fn srgb_support(c: vk::SurfaceCapabilitiesKHR) -> SurfaceSupport {
        SurfaceSupport {
            caps: c,
            formats: vec![sf(
                vk::Format::B8G8R8A8_SRGB,
                vk::ColorSpaceKHR::SRGB_NONLINEAR,
            )],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        }
    }

    #[test]
    fn zero_current_extent_refuses_to_plan() {
        let mut c = caps(2, 3);
        c.current_extent = vk::Extent2D {
            width: 0,
            height: 0,
        };
        let prefs = SwapchainPrefs::default();
        let plan = SwapchainPlan::new(&srgb_support(c), size(800, 600), &prefs, shared());
        assert!(matches!(plan, Err(VkError::SurfaceZeroArea)));
    }

    #[test]
    fn zero_window_with_undefined_extent_refuses_to_plan() {
        let mut c = caps(2, 3);
        c.current_extent = vk::Extent2D {
            width: u32::MAX,
            height: u32::MAX,
        };
        c.min_image_extent = vk::Extent2D {
            width: 0,
            height: 0,
        };
        let prefs = SwapchainPrefs::default();
        let plan = SwapchainPlan::new(&srgb_support(c), size(0, 600), &prefs, shared());
        assert!(matches!(plan, Err(VkError::SurfaceZeroArea)));
    }

    #[test]
    fn plan_without_formats_fails() {
        let support = SurfaceSupport {
            caps: caps(2, 3),
            formats: Vec::new(),
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        let err = SwapchainPlan::new(&support, size(1, 1), &SwapchainPrefs::default(), shared());
        assert!(matches!(err, Err(VkError::Gpu { .. })));
    }

    #[test]
    fn composite_alpha_fallback() {
        let mut c = caps(2, 3);
        c.supported_composite_alpha = vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED;
        assert_eq!(
            choose_composite_alpha(&c),
            vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED
        );
    }
}
