// SPDX-License-Identifier: CEPL-1.0
use crate::error::{GpuContext, VkError, VkResult};
use ash::ext::debug_utils as ext_debug;
use ash::khr::surface;
use ash::{vk, Entry, Instance};
use pacer_render::RenderConfig;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle};
use std::ffi::{c_char, CStr, CString};
use tracing::{debug, error, info, warn};

pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Instance-scoped objects: loader, instance, debug messenger and the window
/// surface. Outlives every device-level object.
pub struct InstanceContext {
    pub entry: Entry,
    pub instance: Instance,
    pub surface_loader: surface::Instance,
    pub surface: vk::SurfaceKHR,
    debug: Option<(ext_debug::Instance, vk::DebugUtilsMessengerEXT)>,
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _types: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if data.is_null() || (*data).p_message.is_null() {
        return vk::FALSE;
    }
    let msg = CStr::from_ptr((*data).p_message).to_string_lossy();
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        error!(target: "vulkan", "{msg}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        warn!(target: "vulkan", "{msg}");
    } else {
        debug!(target: "vulkan", "{msg}");
    }
    vk::FALSE
}

pub(crate) fn layer_available(layers: &[vk::LayerProperties], name: &CStr) -> bool {
    layers
        .iter()
        .any(|l| unsafe { CStr::from_ptr(l.layer_name.as_ptr()) } == name)
}

unsafe fn create_instance(
    entry: &Entry,
    display_raw: RawDisplayHandle,
    cfg: &RenderConfig,
) -> VkResult<Instance> {
    let app = CString::new(cfg.app_name.as_str()).unwrap_or_else(|_| c"pacer".to_owned());

    let app_info = vk::ApplicationInfo {
        s_type: vk::StructureType::APPLICATION_INFO,
        p_application_name: app.as_ptr(),
        application_version: vk::make_api_version(0, 0, 1, 0),
        p_engine_name: c"pacer".as_ptr(),
        engine_version: vk::make_api_version(0, 0, 1, 0),
        api_version: vk::API_VERSION_1_0,
        ..Default::default()
    };

    let ext_slice = ash_window::enumerate_required_extensions(display_raw)
        .map_err(|e| VkError::SurfaceCreation(format!("enumerate_required_extensions: {e}")))?;
    let mut ext_vec: Vec<*const c_char> = ext_slice.to_vec();

    let mut layer_ptrs: Vec<*const c_char> = Vec::new();
    if cfg.validation {
        let layers = entry
            .enumerate_instance_layer_properties()
            .gpu("enumerate_instance_layer_properties")?;
        if !layer_available(&layers, VALIDATION_LAYER) {
            return Err(VkError::MissingLayer(
                VALIDATION_LAYER.to_string_lossy().into_owned(),
            ));
        }
        layer_ptrs.push(VALIDATION_LAYER.as_ptr());
        ext_vec.push(ext_debug::NAME.as_ptr());
    }

    let create_info = vk::InstanceCreateInfo {
        s_type: vk::StructureType::INSTANCE_CREATE_INFO,
        p_application_info: &app_info,
        enabled_extension_count: ext_vec.len() as u32,
        pp_enabled_extension_names: ext_vec.as_ptr(),
        enabled_layer_count: layer_ptrs.len() as u32,
        pp_enabled_layer_names: layer_ptrs.as_ptr(),
        ..Default::default()
    };

    entry
        .create_instance(&create_info, None)
        .gpu("create_instance")
}

unsafe fn create_debug_messenger(
    entry: &Entry,
    instance: &Instance,
) -> VkResult<(ext_debug::Instance, vk::DebugUtilsMessengerEXT)> {
    let loader = ext_debug::Instance::new(entry, instance);
    let ci = vk::DebugUtilsMessengerCreateInfoEXT {
        s_type: vk::StructureType::DEBUG_UTILS_MESSENGER_CREATE_INFO_EXT,
        message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
            | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
            | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
            | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        pfn_user_callback: Some(debug_callback),
        ..Default::default()
    };
    let messenger = loader
        .create_debug_utils_messenger(&ci, None)
        .gpu("create_debug_utils_messenger")?;
    Ok((loader, messenger))
}

impl InstanceContext {
    // STRICT ORDER:
    // 1) Load the Vulkan library and create the instance (WSI + optional debug ext)
    // 2) Create the surface FROM THIS INSTANCE
    // 3) (Later) device selection queries present support AGAINST THIS SURFACE
    pub unsafe fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        cfg: &RenderConfig,
    ) -> VkResult<Self> {
        let dh = display
            .display_handle()
            .map_err(|e| VkError::SurfaceCreation(e.to_string()))?
            .as_raw();
        let wh = window
            .window_handle()
            .map_err(|e| VkError::SurfaceCreation(e.to_string()))?
            .as_raw();

        let entry = Entry::load().map_err(|e| VkError::Loader(e.to_string()))?;
        let instance = create_instance(&entry, dh, cfg)?;

        let debug = if cfg.validation {
            match create_debug_messenger(&entry, &instance) {
                Ok(d) => Some(d),
                Err(e) => {
                    instance.destroy_instance(None);
                    return Err(e);
                }
            }
        } else {
            None
        };

        let surface_loader = surface::Instance::new(&entry, &instance);
        let surface = match ash_window::create_surface(&entry, &instance, dh, wh, None) {
            Ok(s) => s,
            Err(e) => {
                if let Some((loader, messenger)) = &debug {
                    loader.destroy_debug_utils_messenger(*messenger, None);
                }
                instance.destroy_instance(None);
                return Err(VkError::SurfaceCreation(format!("create_surface: {e}")));
            }
        };

        info!("vk: instance ready (validation={})", cfg.validation);
        Ok(InstanceContext {
            entry,
            instance,
            surface_loader,
            surface,
            debug,
        })
    }

    /// Destroys the surface, the debug messenger and the instance. Every
    /// device-level object must already be gone.
    pub unsafe fn release(&mut self) {
        self.surface_loader.destroy_surface(self.surface, None);
        if let Some((loader, messenger)) = self.debug.take() {
            loader.destroy_debug_utils_messenger(messenger, None);
        }
        self.instance.destroy_instance(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(name: &CStr) -> vk::LayerProperties {
        let mut props = vk::LayerProperties::default();
        for (dst, &src) in props.layer_name.iter_mut().zip(name.to_bytes()) {
            *dst = src as c_char;
        }
        props
    }

    #[test]
    fn finds_validation_layer() {
        let layers = [layer(c"VK_LAYER_MESA_device_select"), layer(VALIDATION_LAYER)];
        assert!(layer_available(&layers, VALIDATION_LAYER));
    }

    #[test]
    fn missing_validation_layer() {
        let layers = [layer(c"VK_LAYER_MESA_device_select")];
        assert!(!layer_available(&layers, VALIDATION_LAYER));
        assert!(!layer_available(&[], VALIDATION_LAYER));
    }
}
