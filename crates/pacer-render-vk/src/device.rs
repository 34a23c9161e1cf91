// SPDX-License-Identifier: CEPL-1.0
//! Physical device selection and the logical device with its queues.

use crate::error::{GpuContext, VkError, VkResult};
use crate::instance::InstanceContext;
use ash::khr::swapchain;
use ash::vk;
use std::ffi::CStr;
use tracing::{debug, info};

/// Graphics and present queue families. They may be the same family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilyIndices {
    /// Picks the lowest-indexed graphics family and, independently, the
    /// lowest-indexed family that can present to the surface.
    pub fn find(
        props: &[vk::QueueFamilyProperties],
        mut supports_present: impl FnMut(u32) -> bool,
    ) -> Option<Self> {
        let mut graphics = None;
        let mut present = None;
        for (i, q) in props.iter().enumerate() {
            let i = i as u32;
            if graphics.is_none() && q.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                graphics = Some(i);
            }
            if present.is_none() && supports_present(i) {
                present = Some(i);
            }
            if graphics.is_some() && present.is_some() {
                break;
            }
        }
        Some(QueueFamilyIndices {
            graphics: graphics?,
            present: present?,
        })
    }

    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }

    /// Distinct families, ascending. One queue is requested from each.
    pub fn unique(&self) -> Vec<u32> {
        let mut v = vec![self.graphics, self.present];
        v.sort_unstable();
        v.dedup();
        v
    }
}

pub(crate) fn has_extension(props: &[vk::ExtensionProperties], name: &CStr) -> bool {
    props
        .iter()
        .any(|e| unsafe { CStr::from_ptr(e.extension_name.as_ptr()) } == name)
}

/// Everything `select` needs to know about one physical device.
#[derive(Clone, Debug)]
pub(crate) struct DeviceProbe {
    pub families: Option<QueueFamilyIndices>,
    pub has_swapchain_ext: bool,
    pub format_count: usize,
    pub present_mode_count: usize,
}

impl DeviceProbe {
    pub fn verdict(&self) -> Result<QueueFamilyIndices, &'static str> {
        let families = self
            .families
            .ok_or("missing graphics or present queue family")?;
        if !self.has_swapchain_ext {
            return Err("VK_KHR_swapchain not supported");
        }
        if self.format_count == 0 {
            return Err("surface reports no formats");
        }
        if self.present_mode_count == 0 {
            return Err("surface reports no present modes");
        }
        Ok(families)
    }
}

unsafe fn probe(inst: &InstanceContext, phys: vk::PhysicalDevice) -> VkResult<DeviceProbe> {
    let qprops = inst
        .instance
        .get_physical_device_queue_family_properties(phys);
    let families = QueueFamilyIndices::find(&qprops, |i| {
        inst.surface_loader
            .get_physical_device_surface_support(phys, i, inst.surface)
            .unwrap_or(false)
    });

    let exts = inst
        .instance
        .enumerate_device_extension_properties(phys)
        .gpu("enumerate_device_extension_properties")?;
    let has_swapchain_ext = has_extension(&exts, swapchain::NAME);

    // Surface queries are only meaningful once the extension is there.
    let (format_count, present_mode_count) = if has_swapchain_ext {
        let formats = inst
            .surface_loader
            .get_physical_device_surface_formats(phys, inst.surface)
            .gpu("get_physical_device_surface_formats")?;
        let modes = inst
            .surface_loader
            .get_physical_device_surface_present_modes(phys, inst.surface)
            .gpu("get_physical_device_surface_present_modes")?;
        (formats.len(), modes.len())
    } else {
        (0, 0)
    };

    Ok(DeviceProbe {
        families,
        has_swapchain_ext,
        format_count,
        present_mode_count,
    })
}

/// Logical device plus the queues the frame loop submits and presents on.
pub struct DeviceContext {
    pub phys: vk::PhysicalDevice,
    pub device: ash::Device,
    pub families: QueueFamilyIndices,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
    pub swapchain_loader: swapchain::Device,
}

impl DeviceContext {
    /// First enumerated device that passes [`DeviceProbe::verdict`].
    pub unsafe fn select(
        inst: &InstanceContext,
    ) -> VkResult<(vk::PhysicalDevice, QueueFamilyIndices)> {
        let devices = inst
            .instance
            .enumerate_physical_devices()
            .gpu("enumerate_physical_devices")?;
        if devices.is_empty() {
            return Err(VkError::DeviceSelection(
                "no Vulkan devices enumerated".into(),
            ));
        }

        for phys in devices {
            let props = inst.instance.get_physical_device_properties(phys);
            let name = CStr::from_ptr(props.device_name.as_ptr()).to_string_lossy();
            match probe(inst, phys)?.verdict() {
                Ok(families) => {
                    info!(
                        "vk: selected {} (graphics family {}, present family {})",
                        name, families.graphics, families.present
                    );
                    return Ok((phys, families));
                }
                Err(why) => debug!("vk: skipping {}: {}", name, why),
            }
        }
        Err(VkError::DeviceSelection(
            "no device offers graphics + present queues, VK_KHR_swapchain and surface formats"
                .into(),
        ))
    }

    pub unsafe fn create_logical_device(
        inst: &InstanceContext,
        phys: vk::PhysicalDevice,
        families: QueueFamilyIndices,
    ) -> VkResult<Self> {
        let priorities = [1.0_f32];
        let qinfos: Vec<vk::DeviceQueueCreateInfo> = families
            .unique()
            .into_iter()
            .map(|family| vk::DeviceQueueCreateInfo {
                s_type: vk::StructureType::DEVICE_QUEUE_CREATE_INFO,
                queue_family_index: family,
                queue_count: 1,
                p_queue_priorities: priorities.as_ptr(),
                ..Default::default()
            })
            .collect();

        let device_exts = [swapchain::NAME.as_ptr()];
        let features = vk::PhysicalDeviceFeatures::default();
        let dinfo = vk::DeviceCreateInfo {
            s_type: vk::StructureType::DEVICE_CREATE_INFO,
            queue_create_info_count: qinfos.len() as u32,
            p_queue_create_infos: qinfos.as_ptr(),
            enabled_extension_count: device_exts.len() as u32,
            pp_enabled_extension_names: device_exts.as_ptr(),
            p_enabled_features: &features,
            ..Default::default()
        };

        let device = inst
            .instance
            .create_device(phys, &dinfo, None)
            .gpu("create_device")?;
        let graphics_queue = device.get_device_queue(families.graphics, 0);
        let present_queue = device.get_device_queue(families.present, 0);
        let swapchain_loader = swapchain::Device::new(&inst.instance, &device);

        Ok(DeviceContext {
            phys,
            device,
            families,
            graphics_queue,
            present_queue,
            swapchain_loader,
        })
    }

    pub unsafe fn new(inst: &InstanceContext) -> VkResult<Self> {
        let (phys, families) = Self::select(inst)?;
        Self::create_logical_device(inst, phys, families)
    }

    pub unsafe fn wait_idle(&self) -> VkResult<()> {
        self.device.device_wait_idle().gpu("device_wait_idle")
    }

    /// Destroys the logical device. Everything created from it must be gone.
    pub unsafe fn release(&mut self) {
        self.device.destroy_device(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::c_char;

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    fn ext(name: &CStr) -> vk::ExtensionProperties {
        let mut props = vk::ExtensionProperties::default();
        for (dst, &src) in props.extension_name.iter_mut().zip(name.to_bytes()) {
            *dst = src as c_char;
        }
        props
    }

    #[test]
    fn same_family_for_both() {
        let props = [family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)];
        let f = QueueFamilyIndices::find(&props, |_| true).unwrap();
        assert_eq!(f, QueueFamilyIndices { graphics: 0, present: 0 });
        assert!(f.is_shared());
        assert_eq!(f.unique(), vec![0]);
    }

    #[test]
    fn lowest_index_wins_for_each_role() {
        let props = [
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::COMPUTE),
        ];
        let f = QueueFamilyIndices::find(&props, |i| i == 0 || i == 3).unwrap();
        assert_eq!(f.graphics, 1);
        assert_eq!(f.present, 0);
        assert!(!f.is_shared());
        assert_eq!(f.unique(), vec![0, 1]);
    }

    #[test]
    fn no_present_family() {
        let props = [family(vk::QueueFlags::GRAPHICS)];
        assert_eq!(QueueFamilyIndices::find(&props, |_| false), None);
    }

    #[test]
    fn no_graphics_family() {
        let props = [family(vk::QueueFlags::COMPUTE)];
        assert_eq!(QueueFamilyIndices::find(&props, |_| true), None);
    }

    #[test]
    fn extension_lookup() {
        let exts = [ext(c"VK_KHR_maintenance1"), ext(swapchain::NAME)];
        assert!(has_extension(&exts, swapchain::NAME));
        assert!(!has_extension(&exts[..1], swapchain::NAME));
    }

    fn good_probe() -> DeviceProbe {
        DeviceProbe {
            families: Some(QueueFamilyIndices { graphics: 0, present: 1 }),
            has_swapchain_ext: true,
            format_count: 2,
            present_mode_count: 1,
        }
    }

    #[test]
    fn suitable_device_passes() {
        assert_eq!(
            good_probe().verdict(),
            Ok(QueueFamilyIndices { graphics: 0, present: 1 })
        );
    }

    #[test]
    fn each_requirement_can_reject() {
        let mut p = good_probe();
        p.families = None;
        assert!(p.verdict().is_err());

        let mut p = good_probe();
        p.has_swapchain_ext = false;
        assert_eq!(p.verdict(), Err("VK_KHR_swapchain not supported"));

        let mut p = good_probe();
        p.format_count = 0;
        assert!(p.verdict().is_err());

        let mut p = good_probe();
        p.present_mode_count = 0;
        assert!(p.verdict().is_err());
    }
}
