// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use std::path::PathBuf;

pub type VkResult<T> = std::result::Result<T, VkError>;

/// Failures of the Vulkan backend.
///
/// Only [`VkError::SwapchainStale`] is recoverable: the frame loop turns it
/// into a swapchain rebuild. Everything else is either a startup failure or a
/// device/queue failure and ends the process.
#[derive(Debug, thiserror::Error)]
pub enum VkError {
    #[error("failed to load the Vulkan library: {0}")]
    Loader(String),

    #[error("validation layer {0} requested but not installed")]
    MissingLayer(String),

    #[error("no suitable physical device: {0}")]
    DeviceSelection(String),

    #[error("surface creation failed: {0}")]
    SurfaceCreation(String),

    #[error("failed to load shader {path}: {source}")]
    ShaderLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("swapchain is out of date (suboptimal={suboptimal})")]
    SwapchainStale { suboptimal: bool },

    /// The surface currently reports a zero-sized extent (minimized). Not an
    /// error for the frame loop: it pauses and retries the build later.
    #[error("surface has a zero-area extent")]
    SurfaceZeroArea,

    #[error("{op} failed: {result}")]
    Gpu {
        op: &'static str,
        #[source]
        result: vk::Result,
    },
}

impl VkError {
    /// Classifies a raw result from `op`. Out-of-date surfaces become
    /// [`VkError::SwapchainStale`], anything else is fatal.
    pub fn gpu(op: &'static str, result: vk::Result) -> Self {
        match result {
            vk::Result::ERROR_OUT_OF_DATE_KHR => VkError::SwapchainStale { suboptimal: false },
            vk::Result::SUBOPTIMAL_KHR => VkError::SwapchainStale { suboptimal: true },
            result => VkError::Gpu { op, result },
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, VkError::SwapchainStale { .. })
    }
}

/// `.gpu("op")` on raw `ash` results.
pub(crate) trait GpuContext<T> {
    fn gpu(self, op: &'static str) -> VkResult<T>;
}

impl<T> GpuContext<T> for std::result::Result<T, vk::Result> {
    fn gpu(self, op: &'static str) -> VkResult<T> {
        self.map_err(|e| VkError::gpu(op, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_date_is_recoverable() {
        let e = VkError::gpu("queue_present", vk::Result::ERROR_OUT_OF_DATE_KHR);
        assert!(matches!(e, VkError::SwapchainStale { suboptimal: false }));
        assert!(e.is_recoverable());
    }

    #[test]
    fn suboptimal_is_recoverable() {
        let e = VkError::gpu("queue_present", vk::Result::SUBOPTIMAL_KHR);
        assert!(matches!(e, VkError::SwapchainStale { suboptimal: true }));
    }

    #[test]
    fn device_lost_is_fatal() {
        let e = VkError::gpu("queue_submit", vk::Result::ERROR_DEVICE_LOST);
        assert!(!e.is_recoverable());
        assert!(e.to_string().starts_with("queue_submit failed"));
    }

    #[test]
    fn startup_errors_are_fatal() {
        assert!(!VkError::DeviceSelection("none".into()).is_recoverable());
        assert!(!VkError::MissingLayer("VK_LAYER_KHRONOS_validation".into()).is_recoverable());
        let shader = VkError::ShaderLoad {
            path: "tri.vert.spv".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(!shader.is_recoverable());
        assert!(shader.to_string().contains("tri.vert.spv"));
    }

    #[test]
    fn zero_area_surface_is_not_a_rebuild_trigger() {
        assert!(!VkError::SurfaceZeroArea.is_recoverable());
    }

    #[test]
    fn result_adapter_classifies() {
        let r: Result<(), vk::Result> = Err(vk::Result::ERROR_OUT_OF_DATE_KHR);
        assert!(r.gpu("acquire_next_image").unwrap_err().is_recoverable());
        let ok: Result<u32, vk::Result> = Ok(3);
        assert_eq!(ok.gpu("x").unwrap(), 3);
    }
}
