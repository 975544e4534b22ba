// 该文件是 Shanan （山南西风） 项目的一部分。
// src/probe.rs - 设备能力探测
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use tracing::debug;

use crate::config::Backend;

pub trait CapabilityProbe {
  /// 当前设备是否可以使用 GPU 后端
  fn gpu_supported(&self) -> bool;

  fn supports(&self, backend: Backend) -> bool {
    match backend {
      Backend::Gpu => self.gpu_supported(),
      Backend::Cpu | Backend::NeuralAccelerator => true,
    }
  }
}

/// 固定结果的探测器
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub bool);

impl CapabilityProbe for StaticProbe {
  fn gpu_supported(&self) -> bool {
    self.0
  }
}

const DRI_RENDER_NODE: &str = "/dev/dri/renderD128";

/// 通过 DRM 渲染节点判断 GPU 是否可用
#[derive(Debug, Clone)]
pub struct DriRenderProbe {
  node: PathBuf,
}

impl Default for DriRenderProbe {
  fn default() -> Self {
    Self {
      node: PathBuf::from(DRI_RENDER_NODE),
    }
  }
}

impl DriRenderProbe {
  pub fn with_node(node: impl Into<PathBuf>) -> Self {
    Self { node: node.into() }
  }
}

impl CapabilityProbe for DriRenderProbe {
  fn gpu_supported(&self) -> bool {
    let supported = self.node.exists();
    debug!("GPU 渲染节点 {}: {}", self.node.display(), supported);
    supported
  }
}

impl<T: CapabilityProbe + ?Sized> CapabilityProbe for &T {
  fn gpu_supported(&self) -> bool {
    (**self).gpu_supported()
  }

  fn supports(&self, backend: Backend) -> bool {
    (**self).supports(backend)
  }
}

impl<T: CapabilityProbe + ?Sized> CapabilityProbe for Box<T> {
  fn gpu_supported(&self) -> bool {
    (**self).gpu_supported()
  }

  fn supports(&self, backend: Backend) -> bool {
    (**self).supports(backend)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dri_probe_checks_node() {
    let dir = tempfile::tempdir().unwrap();
    let node = dir.path().join("renderD128");
    let probe = DriRenderProbe::with_node(&node);
    assert!(!probe.gpu_supported());
    std::fs::write(&node, b"").unwrap();
    assert!(probe.gpu_supported());
  }

  #[test]
  fn static_probe() {
    assert!(StaticProbe(true).gpu_supported());
    assert!(!(&StaticProbe(false)).gpu_supported());
    assert!(!StaticProbe(false).supports(Backend::Gpu));
    assert!(StaticProbe(false).supports(Backend::NeuralAccelerator));
  }
}
