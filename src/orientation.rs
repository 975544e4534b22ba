// 该文件是 Shanan （山南西风） 项目的一部分。
// src/orientation.rs - 设备旋转到 EXIF 方向的映射
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::fmt;

pub const ROTATION_0: i32 = 0;
pub const ROTATION_90: i32 = 1;
pub const ROTATION_180: i32 = 2;
pub const ROTATION_270: i32 = 3;

/// EXIF 方向约定，见 http://jpegclub.org/exif_orientation.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
  TopLeft,
  TopRight,
  BottomRight,
  BottomLeft,
  LeftTop,
  RightTop,
  RightBottom,
  LeftBottom,
}

impl Orientation {
  pub fn exif_value(self) -> u8 {
    match self {
      Orientation::TopLeft => 1,
      Orientation::TopRight => 2,
      Orientation::BottomRight => 3,
      Orientation::BottomLeft => 4,
      Orientation::LeftTop => 5,
      Orientation::RightTop => 6,
      Orientation::RightBottom => 7,
      Orientation::LeftBottom => 8,
    }
  }
}

impl fmt::Display for Orientation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Orientation::TopLeft => "TOP_LEFT",
      Orientation::TopRight => "TOP_RIGHT",
      Orientation::BottomRight => "BOTTOM_RIGHT",
      Orientation::BottomLeft => "BOTTOM_LEFT",
      Orientation::LeftTop => "LEFT_TOP",
      Orientation::RightTop => "RIGHT_TOP",
      Orientation::RightBottom => "RIGHT_BOTTOM",
      Orientation::LeftBottom => "LEFT_BOTTOM",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrientationMapper;

impl OrientationMapper {
  /// 全函数，未知旋转值回落到 `RightTop`
  pub fn map(&self, rotation: i32) -> Orientation {
    match rotation {
      ROTATION_270 => Orientation::BottomRight,
      ROTATION_180 => Orientation::RightBottom,
      ROTATION_90 => Orientation::TopLeft,
      _ => Orientation::RightTop,
    }
  }
}
