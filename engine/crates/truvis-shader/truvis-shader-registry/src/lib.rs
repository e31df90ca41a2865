//! Shader 资源注册表
//!
//! 每个逻辑 shader 名称（例如 `deferred/gbuffer`）对应磁盘上的：
//!
//! - `deferred/gbuffer.json`：binding 布局描述
//! - `deferred/gbuffer.vert`、`deferred/gbuffer.frag` 等各个 stage 的源码
//!
//! 注册表将两者合并为 [`registry::ShaderResource`]，并按路径组织为层级结构，
//! 供渲染图查询 binding 的可见性，以及为 pipeline 提供编译好的 shader module。

pub mod binding;
pub mod compiler;
pub mod layout_doc;
pub mod registry;
pub mod source_scan;
pub mod stage;
