use std::path::{Path, PathBuf};

/// 统一资源路径管理
///
/// 所有路径基于工作区根目录（通过 `CARGO_MANIFEST_DIR` 推导）。
/// 避免使用硬编码相对路径，确保在不同构建环境下路径一致。
///
/// # 使用示例
/// ```ignore
/// let shader_dir = TruvisPath::shader_root_path();              // engine/shader
/// let settings = TruvisPath::config_path("render-graph.toml");  // config/render-graph.toml
/// ```
pub struct TruvisPath {}
// 核心路径
impl TruvisPath {
    /// 获取工作区根目录
    pub fn workspace_path() -> PathBuf {
        // truvis-crate-tools 位于工作区根目录下
        Path::new(env!("CARGO_MANIFEST_DIR")).parent().map(Path::to_path_buf).unwrap_or_default()
    }

    pub fn engine_path() -> PathBuf {
        Self::workspace_path().join("engine")
    }

    /// 获取 `config/` 目录下的文件路径
    pub fn config_path(filename: &str) -> PathBuf {
        Self::workspace_path().join("config").join(filename)
    }

    /// shader 源码以及 layout 描述文件的根目录
    pub fn shader_root_path() -> PathBuf {
        Self::engine_path().join("shader")
    }

    /// 将相对路径解析为基于工作区的绝对路径，绝对路径原样返回
    pub fn resolve(path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() { path.to_path_buf() } else { Self::workspace_path().join(path) }
    }
}
