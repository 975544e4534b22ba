// 该文件是 Shanan （山南西风） 项目的一部分。
// src/region.rs - 感兴趣区域跟踪
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

/// 感兴趣区域的半边长
pub const REGION_HALF_SIDE: f32 = 112.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReferencePoint {
  pub x: f32,
  pub y: f32,
}

/// 以参考点为中心的正方形区域
///
/// 纵向符号与常见图像坐标相反：`top = y + 半边长`，`bottom = y - 半边长`。
/// 叠加层按这一约定绘制，不要在这里"修正"。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
  pub left: f32,
  pub top: f32,
  pub right: f32,
  pub bottom: f32,
}

/// 传给推理引擎的整数矩形
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoiRect {
  pub left: i32,
  pub top: i32,
  pub right: i32,
  pub bottom: i32,
}

impl Region {
  pub fn around(point: ReferencePoint, half_side: f32) -> Self {
    Region {
      left: point.x - half_side,
      top: point.y + half_side,
      right: point.x + half_side,
      bottom: point.y - half_side,
    }
  }

  pub fn width(&self) -> f32 {
    self.right - self.left
  }

  /// 按当前符号约定，高度为 `top - bottom`
  pub fn height(&self) -> f32 {
    self.top - self.bottom
  }

  pub fn center(&self) -> ReferencePoint {
    ReferencePoint {
      x: (self.left + self.right) / 2.0,
      y: (self.top + self.bottom) / 2.0,
    }
  }

  /// 向外取整：left、top 向下，right、bottom 向上
  pub fn to_rect(&self) -> RoiRect {
    RoiRect {
      left: self.left.floor() as i32,
      top: self.top.floor() as i32,
      right: self.right.ceil() as i32,
      bottom: self.bottom.ceil() as i32,
    }
  }

  /// 映射到显示坐标
  pub fn scaled(&self, factor: f32) -> Region {
    Region {
      left: self.left * factor,
      top: self.top * factor,
      right: self.right * factor,
      bottom: self.bottom * factor,
    }
  }
}

impl RoiRect {
  /// 端点排序后的 `(x_min, y_min, x_max, y_max)`
  pub fn normalized(&self) -> (i32, i32, i32, i32) {
    (
      self.left.min(self.right),
      self.top.min(self.bottom),
      self.left.max(self.right),
      self.top.max(self.bottom),
    )
  }
}

/// FILL_START 预览模式下，图像坐标到视图坐标的缩放系数
pub fn fill_start_scale(
  view_width: f32,
  view_height: f32,
  image_width: f32,
  image_height: f32,
) -> f32 {
  (view_width / image_width).max(view_height / image_height)
}

#[derive(Debug, Clone)]
pub struct RegionTracker {
  reference: ReferencePoint,
  half_side: f32,
}

impl Default for RegionTracker {
  fn default() -> Self {
    Self {
      reference: ReferencePoint::default(),
      half_side: REGION_HALF_SIDE,
    }
  }
}

impl RegionTracker {
  /// 不做校验，超出图像范围的区域由引擎处理
  pub fn set_reference(&mut self, x: f32, y: f32) {
    self.reference = ReferencePoint { x, y };
  }

  pub fn reference(&self) -> ReferencePoint {
    self.reference
  }

  pub fn half_side(&self) -> f32 {
    self.half_side
  }

  pub fn current_region(&self) -> Region {
    Region::around(self.reference, self.half_side)
  }
}
