// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - NHWC RGB 帧定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::{RgbImage, imageops::FilterType};
use thiserror::Error;

const RGB_CHANNELS: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
  #[error("帧尺寸无效: {width}x{height}")]
  EmptyFrame { width: u32, height: u32 },
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 按 NHWC 排列的 RGB 帧，尺寸在运行时确定
#[derive(Debug, Clone, PartialEq)]
pub struct RgbFrame {
  width: u32,
  height: u32,
  data: Box<[u8]>,
}

impl RgbFrame {
  pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
    let frame = Self {
      width,
      height,
      data: data.into_boxed_slice(),
    };
    frame.validate()?;
    Ok(frame)
  }

  /// 纯色帧
  pub fn filled(width: u32, height: u32, color: [u8; 3]) -> Self {
    let data = color
      .iter()
      .copied()
      .cycle()
      .take(RGB_CHANNELS * width as usize * height as usize)
      .collect::<Vec<_>>();
    Self {
      width,
      height,
      data: data.into_boxed_slice(),
    }
  }

  /// 检查帧是否为非空的二维像素缓冲
  pub fn validate(&self) -> Result<(), FrameError> {
    if self.width == 0 || self.height == 0 {
      return Err(FrameError::EmptyFrame {
        width: self.width,
        height: self.height,
      });
    }

    let expected = RGB_CHANNELS * self.width as usize * self.height as usize;
    if self.data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: self.data.len(),
      });
    }

    Ok(())
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn as_nhwc(&self) -> &[u8] {
    &self.data
  }

  pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
    let index = (y as usize * self.width as usize + x as usize) * RGB_CHANNELS;
    [self.data[index], self.data[index + 1], self.data[index + 2]]
  }

  pub fn to_rgb_image(&self) -> RgbImage {
    RgbImage::from_raw(self.width, self.height, self.data.to_vec())
      .unwrap_or_else(|| RgbImage::new(self.width, self.height))
  }

  /// 双线性缩放到目标尺寸（整图缩放，不裁剪）
  pub fn resized(&self, width: u32, height: u32) -> RgbFrame {
    if self.width == width && self.height == height {
      return self.clone();
    }

    let image = self.to_rgb_image();
    image::imageops::resize(&image, width, height, FilterType::Triangle).into()
  }
}

impl From<RgbImage> for RgbFrame {
  fn from(image: RgbImage) -> Self {
    let (width, height) = image.dimensions();
    Self {
      width,
      height,
      data: image.into_raw().into_boxed_slice(),
    }
  }
}

impl AsRef<[u8]> for RgbFrame {
  fn as_ref(&self) -> &[u8] {
    &self.data
  }
}
