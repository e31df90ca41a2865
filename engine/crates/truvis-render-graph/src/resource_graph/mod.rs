//! 资源图
//!
//! 以名字为 key 管理逻辑资源，物理 handle 在第一次 mount 时才创建。
//! view 是其所属资源的子节点，swapchain 在第一次 mount 时展开为每个 image 一个子节点。
//!
//! 所有节点存放在 `IndexMap` 中，节点之间的父子关系用下标表示：
//!
//! ```text
//! swapchain
//! ├── swapchain/0 ── swapchain/0/swapchain/0 (view)
//! ├── swapchain/1 ── swapchain/1/swapchain/1 (view)
//! └── swapchain/2 ── swapchain/2/swapchain/2 (view)
//! ```

mod resource;

pub use resource::*;

use ash::prelude::VkResult;
use ash::vk;
use indexmap::IndexMap;
use truvis_gfx::backend::GfxBackend;
use truvis_gfx::resources::buffer::{GfxBufferDesc, GfxBufferViewDesc};
use truvis_gfx::resources::image::GfxImageDesc;
use truvis_gfx::resources::image_view::GfxImageViewDesc;

use crate::resource_state::RgAccessState;

/// image 的默认 view 的名字
#[inline]
pub fn default_view_name(origin: &str) -> String {
    format!("{origin}/{origin}")
}

#[derive(Default)]
pub struct ResourceGraph {
    nodes: IndexMap<String, RgResource>,
    /// 每次 mount 递增
    life: u64,
}

// new & init
impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }
}

// register
impl ResourceGraph {
    pub fn add_buffer(&mut self, name: &str, desc: GfxBufferDesc, residency: RgResidency) {
        let resource = RgResource::new(name, residency, RgResourcePayload::Buffer { desc, handle: None });
        self.insert(resource, None);
    }

    pub fn add_buffer_view(&mut self, name: &str, origin: &str, desc: GfxBufferViewDesc) {
        let parent = self.origin_index(origin, RgResourceType::Buffer);
        let resource = RgResource::new(
            name,
            self.nodes[parent].residency,
            RgResourcePayload::BufferView {
                desc,
                origin: origin.to_string(),
                handle: None,
            },
        );
        self.insert(resource, Some(parent));
    }

    /// 注册 image，同时注册名为 `name/name` 的默认 view
    pub fn add_image(&mut self, name: &str, desc: GfxImageDesc, residency: RgResidency) {
        let resource = RgResource::new(
            name,
            residency,
            RgResourcePayload::Image {
                desc,
                handle: None,
                external: false,
            },
        );
        self.insert(resource, None);
        self.add_image_view(&default_view_name(name), name, desc.infer_default_view());
    }

    pub fn add_image_view(&mut self, name: &str, origin: &str, desc: GfxImageViewDesc) {
        let parent = self.origin_index(origin, RgResourceType::Image);
        let resource = RgResource::new(
            name,
            self.nodes[parent].residency,
            RgResourcePayload::ImageView {
                desc,
                origin: origin.to_string(),
                handle: None,
            },
        );
        self.insert(resource, Some(parent));
    }

    /// 导入 swapchain，子节点在第一次 mount 时创建
    pub fn import(&mut self, name: &str, import: RgSwapchainImport) {
        assert!(!import.images.is_empty(), "swapchain {} has no images", name);
        let resource = RgResource::new(
            name,
            RgResidency::SwapchainImported,
            RgResourcePayload::Swapchain { import, acquired: 0 },
        );
        self.insert(resource, None);
    }

    fn insert(&mut self, resource: RgResource, parent: Option<usize>) -> usize {
        assert!(!self.nodes.contains_key(&resource.name), "resource {} already exists", resource.name);

        let (index, _) = self.nodes.insert_full(resource.name.clone(), resource);
        if let Some(parent) = parent {
            self.nodes[index].parent = Some(parent);
            self.nodes[parent].children.push(index);
        }
        index
    }

    fn origin_index(&self, origin: &str, expected: RgResourceType) -> usize {
        let index = self.index_of(origin);
        let actual = self.nodes[index].resource_type();
        assert_eq!(actual, expected, "view origin {} is a {:?}, expected {:?}", origin, actual, expected);
        index
    }
}

// mount & unmount
impl ResourceGraph {
    /// 递增 life，并为 `name` 所在的整棵资源树创建缺失的物理 handle
    ///
    /// 已经有 handle 的节点保持不变
    pub fn mount<B: GfxBackend + ?Sized>(&mut self, name: &str, backend: &mut B) -> VkResult<()> {
        let root = self.root_of(self.index_of(name));
        self.life += 1;
        let life = self.life;

        self.expand_swapchain(root);

        // 先序遍历：view 创建时其 origin 已经存在
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            self.mount_node(index, life, backend)?;
            stack.extend(self.nodes[index].children.iter().rev().copied());
        }
        Ok(())
    }

    /// 若资源记录的 life 早于 `life`，按照先 view 后 origin 的顺序释放整棵子树
    ///
    /// 返回是否执行了释放
    pub fn unmount<B: GfxBackend + ?Sized>(&mut self, name: &str, life: u64, backend: &mut B) -> bool {
        let index = self.index_of(name);
        if self.nodes[index].life >= life {
            return false;
        }
        self.release_subtree(index, backend);
        true
    }

    /// 释放所有在 `life` 之前最后一次 mount 的顶层资源，返回释放的资源数量
    pub fn unmount_expired<B: GfxBackend + ?Sized>(&mut self, life: u64, backend: &mut B) -> usize {
        let expired = (0..self.nodes.len())
            .filter(|&i| {
                let node = &self.nodes[i];
                node.parent.is_none() && node.life < life && self.has_owned_handles(i)
            })
            .collect::<Vec<_>>();

        for &index in &expired {
            log::debug!("unmount expired resource {}", self.nodes[index].name);
            self.release_subtree(index, backend);
        }
        expired.len()
    }

    /// swapchain 只在第一次 mount 时展开
    fn expand_swapchain(&mut self, index: usize) {
        let node = &self.nodes[index];
        let RgResourcePayload::Swapchain { import, .. } = &node.payload else {
            return;
        };
        if !node.children.is_empty() {
            return;
        }

        let name = node.name.clone();
        let images = import.images.clone();
        let desc = import.image_desc();
        log::info!("expand swapchain {} into {} images", name, images.len());

        for (i, image) in images.into_iter().enumerate() {
            let child_name = format!("{name}/{i}");
            let child = self.insert(
                RgResource::new(
                    child_name.as_str(),
                    RgResidency::SwapchainImported,
                    RgResourcePayload::Image {
                        desc,
                        handle: Some(image),
                        external: true,
                    },
                ),
                Some(index),
            );
            self.insert(
                RgResource::new(
                    default_view_name(&child_name),
                    RgResidency::SwapchainImported,
                    RgResourcePayload::ImageView {
                        desc: desc.infer_default_view(),
                        origin: child_name,
                        handle: None,
                    },
                ),
                Some(child),
            );
        }
    }

    fn mount_node<B: GfxBackend + ?Sized>(&mut self, index: usize, life: u64, backend: &mut B) -> VkResult<()> {
        let parent = self.nodes[index].parent.map(|p| &self.nodes[p].payload);
        let origin_buffer = match parent {
            Some(RgResourcePayload::Buffer { handle, .. }) => *handle,
            _ => None,
        };
        let origin_image = match parent {
            Some(RgResourcePayload::Image { handle, .. }) => *handle,
            _ => None,
        };

        let node = &mut self.nodes[index];
        node.life = life;
        match &mut node.payload {
            RgResourcePayload::Buffer { desc, handle } if handle.is_none() => {
                *handle = Some(backend.create_buffer(desc, &node.name)?);
            }
            RgResourcePayload::BufferView { desc, handle, origin } if handle.is_none() => {
                let buffer = origin_buffer.unwrap_or_else(|| panic!("origin {} of {} is not mounted", origin, node.name));
                *handle = Some(backend.create_buffer_view(buffer, desc, &node.name)?);
            }
            RgResourcePayload::Image { desc, handle, .. } if handle.is_none() => {
                *handle = Some(backend.create_image(desc, &node.name)?);
            }
            RgResourcePayload::ImageView { desc, handle, origin } if handle.is_none() => {
                let image = origin_image.unwrap_or_else(|| panic!("origin {} of {} is not mounted", origin, node.name));
                *handle = Some(backend.create_image_view(image, desc, &node.name)?);
            }
            _ => {}
        }
        Ok(())
    }

    /// 后序遍历：子节点（view）先于父节点释放
    fn release_subtree<B: GfxBackend + ?Sized>(&mut self, index: usize, backend: &mut B) {
        let children = self.nodes[index].children.clone();
        for child in children.into_iter().rev() {
            self.release_subtree(child, backend);
        }

        let node = &mut self.nodes[index];
        match &mut node.payload {
            RgResourcePayload::Buffer { handle, .. } => {
                if let Some(buffer) = handle.take() {
                    backend.destroy_buffer(buffer);
                }
                node.current_access = RgAccessState::UNDEFINED;
            }
            RgResourcePayload::BufferView { handle, .. } => {
                if let Some(view) = handle.take() {
                    backend.destroy_buffer_view(view);
                }
            }
            RgResourcePayload::Image { handle, external, .. } => {
                // swapchain image 属于 swapchain，只释放它的 view
                if !*external {
                    if let Some(image) = handle.take() {
                        backend.destroy_image(image);
                    }
                    node.current_access = RgAccessState::UNDEFINED;
                }
            }
            RgResourcePayload::ImageView { handle, .. } => {
                if let Some(view) = handle.take() {
                    backend.destroy_image_view(view);
                }
            }
            RgResourcePayload::Swapchain { .. } => {}
        }
    }

    fn has_owned_handles(&self, index: usize) -> bool {
        let node = &self.nodes[index];
        let owned = match &node.payload {
            RgResourcePayload::Image { handle, external, .. } => handle.is_some() && !*external,
            RgResourcePayload::Swapchain { .. } => false,
            payload => payload.is_backed(),
        };
        owned || node.children.iter().any(|&child| self.has_owned_handles(child))
    }

    fn root_of(&self, mut index: usize) -> usize {
        while let Some(parent) = self.nodes[index].parent {
            index = parent;
        }
        index
    }
}

// swapchain
impl ResourceGraph {
    /// 指定 swapchain 当前 acquire 到的 image，之后对该 swapchain 的查询都解析到这个 image
    pub fn set_acquired_image(&mut self, name: &str, image_index: usize) {
        let index = self.index_of(name);
        match &mut self.nodes[index].payload {
            RgResourcePayload::Swapchain { import, acquired } => {
                assert!(
                    image_index < import.images.len(),
                    "swapchain {} has {} images, cannot acquire {}",
                    name,
                    import.images.len(),
                    image_index
                );
                *acquired = image_index;
            }
            _ => panic!("resource {} is not a swapchain", name),
        }
    }
}

// getters
impl ResourceGraph {
    /// 当前的 life，等于 mount 被调用的次数
    #[inline]
    pub fn life(&self) -> u64 {
        self.life
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    #[inline]
    pub fn try_get(&self, name: &str) -> Option<&RgResource> {
        self.nodes.get(name)
    }

    /// 迭代所有节点（包括 view 与 swapchain 展开后的子节点）
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &RgResource> {
        self.nodes.values()
    }

    /// 获取资源，swapchain 解析为当前 acquire 的 image
    pub fn get(&self, name: &str) -> &RgResource {
        &self.nodes[self.resolve_index(name)]
    }

    /// 获取 view：view 本身，或 image 的默认 view
    pub fn get_view(&self, name: &str) -> &RgResource {
        let index = self.resolve_index(name);
        let node = &self.nodes[index];
        match node.resource_type() {
            RgResourceType::ImageView | RgResourceType::BufferView => node,
            RgResourceType::Image => {
                let view_name = default_view_name(&node.name);
                node.children
                    .iter()
                    .map(|&child| &self.nodes[child])
                    .find(|child| child.name == view_name)
                    .unwrap_or_else(|| panic!("resource {} has no default view", name))
            }
            _ => panic!("resource {} has no default view", name),
        }
    }

    pub fn get_buffer(&self, name: &str) -> vk::Buffer {
        let index = self.tracked_index(name);
        match &self.nodes[index].payload {
            RgResourcePayload::Buffer { handle, .. } => {
                handle.unwrap_or_else(|| panic!("buffer {} is not mounted", name))
            }
            _ => panic!("resource {} is not a buffer", name),
        }
    }

    pub fn get_buffer_view(&self, name: &str) -> vk::BufferView {
        match &self.get(name).payload {
            RgResourcePayload::BufferView { handle, .. } => {
                handle.unwrap_or_else(|| panic!("buffer view {} is not mounted", name))
            }
            _ => panic!("resource {} is not a buffer view", name),
        }
    }

    /// image、image view（解析到 origin）、swapchain（解析到当前 image）都可以查询
    pub fn get_image(&self, name: &str) -> vk::Image {
        let index = self.tracked_index(name);
        match &self.nodes[index].payload {
            RgResourcePayload::Image { handle, .. } => handle.unwrap_or_else(|| panic!("image {} is not mounted", name)),
            _ => panic!("resource {} is not an image", name),
        }
    }

    pub fn get_image_view(&self, name: &str) -> vk::ImageView {
        match &self.get_view(name).payload {
            RgResourcePayload::ImageView { handle, .. } => {
                handle.unwrap_or_else(|| panic!("image view {} is not mounted", name))
            }
            _ => panic!("resource {} is not an image view", name),
        }
    }

    pub(crate) fn index_of(&self, name: &str) -> usize {
        self.nodes.get_index_of(name).unwrap_or_else(|| panic!("resource {} is not registered", name))
    }

    /// 名字对应的节点，swapchain 解析为当前 acquire 的 image
    pub(crate) fn resolve_index(&self, name: &str) -> usize {
        let index = self.index_of(name);
        match &self.nodes[index].payload {
            RgResourcePayload::Swapchain { acquired, .. } => *self.nodes[index]
                .children
                .get(*acquired)
                .unwrap_or_else(|| panic!("swapchain {} has not been mounted", name)),
            _ => index,
        }
    }

    /// 访问状态记录在哪个节点上：view 记录在 origin 上
    pub(crate) fn tracked_index(&self, name: &str) -> usize {
        let index = self.resolve_index(name);
        let node = &self.nodes[index];
        match (node.payload.origin(), node.parent) {
            (Some(_), Some(parent)) => parent,
            _ => index,
        }
    }

    #[inline]
    pub(crate) fn node(&self, index: usize) -> &RgResource {
        &self.nodes[index]
    }

    #[inline]
    pub(crate) fn set_current_access(&mut self, index: usize, state: RgAccessState) {
        self.nodes[index].current_access = state;
    }
}
