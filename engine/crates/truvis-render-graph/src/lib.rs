//! 渲染依赖图编译
//!
//! 每一帧由应用声明 Pass 图，编译器结合资源图与 shader 绑定布局：
//!
//! 1. 推导每个资源在每个 pass 中的访问状态，生成最少的 barrier
//! 2. 推导 attachment 的 load/store op 与 layout，生成 render pass 与 framebuffer 描述
//! 3. 通过对象缓存复用结构相同的后端对象
//!
//! 结果是一个按 pass 顺序排列的执行计划，录制由上层负责。

pub mod access_analyzer;
pub mod compiler;
pub mod object_cache;
pub mod pass_graph;
pub mod resource_graph;
pub mod resource_state;
pub mod settings;

#[cfg(test)]
mod test_fixtures;
