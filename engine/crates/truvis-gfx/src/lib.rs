//! Truvis GFX 边界
//!
//! 渲染图编译器只通过 [`backend::GfxBackend`] 与具体的图形 API 后端交互。
//! 本 crate 定义了：
//!
//! - 后端需要实现的对象创建/销毁接口
//! - 可作为缓存 key 的对象描述（整体参与 Hash/Eq）
//! - 用于录制阶段的 barrier 构建器
//! - 不依赖 GPU 的 headless 后端，用于离线规划和测试

pub mod backend;
pub mod headless;

pub mod commands {
    pub mod barrier;
}

pub mod resources {
    pub mod buffer;
    pub mod image;
    pub mod image_view;
}

pub mod pipelines {
    pub mod framebuffer;
    pub mod graphics_pipeline;
    pub mod layout;
    pub mod render_pass;
}
