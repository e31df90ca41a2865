//! 将 shader 源码编译为 SPIR-V

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, bail};
use truvis_crate_tools::resource::TruvisPath;

use crate::stage::ShaderStage;

/// 着色器编译器
pub trait ShaderCompiler {
    /// 编译单个 stage，返回 SPIR-V 字节码
    fn compile(&self, stage: ShaderStage, source_path: &Path, source: &str) -> anyhow::Result<Vec<u32>>;
}

/// 使用 glslc (来自 Vulkan SDK) 编译 GLSL
#[derive(Debug, Clone)]
pub struct GlslcCompiler {
    include_dirs: Vec<PathBuf>,
    target_env: String,
}

impl Default for GlslcCompiler {
    fn default() -> Self {
        Self {
            include_dirs: vec![TruvisPath::shader_root_path().join("include")],
            target_env: "vulkan1.2".to_string(),
        }
    }
}

impl GlslcCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    /// 将 glslc 输出的字节流转换为 SPIR-V word
    fn spirv_words(bytes: &[u8]) -> anyhow::Result<Vec<u32>> {
        if bytes.len() % 4 != 0 {
            bail!("SPIR-V 长度不是 4 的倍数: {}", bytes.len());
        }
        Ok(bytes.chunks_exact(4).map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]])).collect())
    }
}

impl ShaderCompiler for GlslcCompiler {
    fn compile(&self, stage: ShaderStage, source_path: &Path, _source: &str) -> anyhow::Result<Vec<u32>> {
        let mut cmd = Command::new("glslc");
        cmd.arg(format!("-fshader-stage={}", stage.glslc_stage()))
            .arg(format!("--target-env={}", self.target_env))
            .arg("-g");
        for dir in &self.include_dirs {
            cmd.arg(format!("-I{}", dir.display()));
        }
        cmd.arg("-o").arg("-").arg(source_path);

        let output = cmd.output().with_context(|| format!("执行 glslc 失败: {:?}", source_path))?;
        if !output.stderr.is_empty() {
            log::warn!("glslc stderr: {}", String::from_utf8_lossy(&output.stderr));
        }
        if !output.status.success() {
            bail!("glslc 编译失败 ({}): {:?}", output.status, source_path);
        }

        Self::spirv_words(&output.stdout).with_context(|| format!("glslc 输出无效: {:?}", source_path))
    }
}
