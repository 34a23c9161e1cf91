// SPDX-License-Identifier: CEPL-1.0
//! SPIR-V loading. Shaders are read once at startup; any failure is fatal.

use crate::error::{GpuContext, VkError, VkResult};
use ash::util::read_spv;
use ash::vk;
use std::fs::File;
use std::io;
use std::path::Path;

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Shaders compiled by `build.rs`.
pub const DEFAULT_VERTEX_SHADER: &str = concat!(env!("OUT_DIR"), "/tri.vert.spv");
pub const DEFAULT_FRAGMENT_SHADER: &str = concat!(env!("OUT_DIR"), "/tri.frag.spv");

/// Reads a SPIR-V binary into aligned words. Rejects files whose length is not
/// a multiple of four or that do not start with the SPIR-V magic number.
pub fn load_spirv(path: &Path) -> VkResult<Vec<u32>> {
    let shader_err = |source| VkError::ShaderLoad {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(shader_err)?;
    // read_spv fixes byte order but accepts any header.
    let words = read_spv(&mut file).map_err(shader_err)?;
    if words.first() != Some(&SPIRV_MAGIC) {
        return Err(shader_err(io::Error::new(
            io::ErrorKind::InvalidData,
            "missing SPIR-V magic number",
        )));
    }
    Ok(words)
}

pub(crate) unsafe fn create_module(
    device: &ash::Device,
    code: &[u32],
) -> VkResult<vk::ShaderModule> {
    let ci = vk::ShaderModuleCreateInfo {
        s_type: vk::StructureType::SHADER_MODULE_CREATE_INFO,
        p_code: code.as_ptr(),
        code_size: code.len() * 4,
        ..Default::default()
    };
    device
        .create_shader_module(&ci, None)
        .gpu("create_shader_module")
}
