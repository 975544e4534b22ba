// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input.rs - 图像输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::RgbFrame, region::ReferencePoint};

mod read_image_file;
pub use self::read_image_file::{
  FrameHints, ImageDirectoryInput, ImageFileInput, ImageFileInputError, ImageFileIter,
};

/// 一帧相机画面及其采集时的设备状态
#[derive(Debug, Clone)]
pub struct CameraFrame {
  pub index: usize,
  pub image: RgbFrame,
  pub rotation: i32,
  pub reference: Option<ReferencePoint>,
}

#[derive(Error, Debug)]
pub enum InputError {
  #[error("图像文件输入错误: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum InputWrapper {
  ReadImageFile(ImageFileInput),
  ReadImageDirectory(ImageDirectoryInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ImageFileInput::SCHEME => Ok(InputWrapper::ReadImageFile(ImageFileInput::from_url(url)?)),
      ImageDirectoryInput::SCHEME => Ok(InputWrapper::ReadImageDirectory(
        ImageDirectoryInput::from_url(url)?,
      )),
      _ => Err(InputError::SchemeMismatch),
    }
  }
}

impl IntoIterator for InputWrapper {
  type Item = CameraFrame;
  type IntoIter = ImageFileIter;

  fn into_iter(self) -> Self::IntoIter {
    match self {
      InputWrapper::ReadImageFile(input) => input.into_iter(),
      InputWrapper::ReadImageDirectory(input) => input.into_iter(),
    }
  }
}
