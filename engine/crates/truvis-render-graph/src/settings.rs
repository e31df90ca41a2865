//! 渲染图工具的配置

use std::path::{Path, PathBuf};

use ash::vk;
use serde::Deserialize;
use truvis_crate_tools::config::load_toml;
use truvis_crate_tools::resource::TruvisPath;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderGraphSettings {
    /// 相对路径基于工作区根目录
    pub shader_root: PathBuf,
    pub swapchain_image_count: u32,
    pub width: u32,
    pub height: u32,
    pub print_plan: bool,
    pub frames: u32,
}

impl Default for RenderGraphSettings {
    fn default() -> Self {
        Self {
            shader_root: PathBuf::from("engine/shader"),
            swapchain_image_count: 3,
            width: 1280,
            height: 720,
            print_plan: true,
            frames: 2,
        }
    }
}

impl RenderGraphSettings {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        load_toml(path)
    }

    #[inline]
    pub fn shader_root_path(&self) -> PathBuf {
        TruvisPath::resolve(&self.shader_root)
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }
}
