use std::{env, fs, path::PathBuf};

// Built-in triangle. No vertex buffers: positions and colors are indexed by
// gl_VertexIndex, matching the empty vertex input state and `cmd_draw(3, 1, 0, 0)`.
const TRI_VERT: &str = r#"
#version 450
layout(location = 0) out vec3 vColor;

vec2 positions[3] = vec2[](
    vec2( 0.0, -0.6),
    vec2( 0.5,  0.4),
    vec2(-0.5,  0.4)
);

vec3 colors[3] = vec3[](
    vec3(1.0, 0.0, 0.0),
    vec3(0.0, 1.0, 0.0),
    vec3(0.0, 0.0, 1.0)
);

void main() {
    gl_Position = vec4(positions[gl_VertexIndex], 0.0, 1.0);
    vColor = colors[gl_VertexIndex];
}
"#;

const TRI_FRAG: &str = r#"
#version 450
layout(location = 0) in vec3 vColor;
layout(location = 0) out vec4 outColor;

void main() {
    outColor = vec4(vColor, 1.0);
}
"#;

fn main() {
    let out = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    let compiler = shaderc::Compiler::new().expect("shaderc compiler");
    let mut opts = shaderc::CompileOptions::new().expect("shaderc options");
    opts.set_target_env(
        shaderc::TargetEnv::Vulkan,
        shaderc::EnvVersion::Vulkan1_0 as u32,
    );
    opts.set_optimization_level(shaderc::OptimizationLevel::Performance);

    let shaders = [
        ("tri.vert", shaderc::ShaderKind::Vertex, TRI_VERT),
        ("tri.frag", shaderc::ShaderKind::Fragment, TRI_FRAG),
    ];
    for (name, kind, src) in shaders {
        let spv = compiler
            .compile_into_spirv(src, kind, name, "main", Some(&opts))
            .unwrap_or_else(|e| panic!("{name}: {e}"));
        if spv.get_num_warnings() > 0 {
            println!("cargo:warning={name}: {}", spv.get_warning_messages());
        }
        let dst = out.join(format!("{name}.spv"));
        fs::write(&dst, spv.as_binary_u8())
            .unwrap_or_else(|e| panic!("write {}: {e}", dst.display()));
    }

    println!("cargo:rerun-if-changed=build.rs");
}
