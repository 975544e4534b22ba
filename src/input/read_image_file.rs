// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{
  collections::VecDeque,
  path::{Path, PathBuf},
};

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, frame::RgbFrame, input::CameraFrame, region::ReferencePoint,
};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("Invalid query: {0}")]
  InvalidQuery(String),
  #[error("No image found in {0}")]
  NoImages(String),
}

/// 从 URL 查询参数中读取的帧属性：`rotation`、`x`、`y`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameHints {
  pub rotation: i32,
  pub reference: Option<ReferencePoint>,
}

impl FrameHints {
  pub fn from_query(url: &Url) -> Result<Self, ImageFileInputError> {
    let mut rotation = 0;
    let mut x = None;
    let mut y = None;

    for (key, value) in url.query_pairs() {
      let invalid = || ImageFileInputError::InvalidQuery(format!("{}={}", key, value));
      match key.as_ref() {
        "rotation" => rotation = value.parse::<i32>().map_err(|_| invalid())?,
        "x" => x = Some(value.parse::<f32>().map_err(|_| invalid())?),
        "y" => y = Some(value.parse::<f32>().map_err(|_| invalid())?),
        _ => {}
      }
    }

    let reference = match (x, y) {
      (Some(x), Some(y)) => Some(ReferencePoint { x, y }),
      (None, None) => None,
      _ => {
        return Err(ImageFileInputError::InvalidQuery(
          "x and y must be given together".to_string(),
        ));
      }
    };

    Ok(FrameHints {
      rotation,
      reference,
    })
  }
}

fn check_scheme(url: &Url, expected: &str) -> Result<(), ImageFileInputError> {
  if url.scheme() != expected {
    error!(
      "URI scheme mismatch: expected '{}', found '{}'",
      expected,
      url.scheme()
    );
    return Err(ImageFileInputError::SchemaMismatch);
  }
  Ok(())
}

fn url_path(url: &Url) -> Result<PathBuf, ImageFileInputError> {
  let path = urlencoding::decode(url.path())
    .map_err(|e| ImageFileInputError::InvalidQuery(format!("{}: {}", url.path(), e)))?;
  Ok(PathBuf::from(path.as_ref()))
}

fn decode(path: &Path) -> Result<RgbFrame, ImageFileInputError> {
  let image = ImageReader::open(path)?.decode()?;
  Ok(RgbFrame::from(image.to_rgb8()))
}

/// 单个图像文件，`image:///path/to/file.png?rotation=1&x=120&y=80`
pub struct ImageFileInput {
  image: RgbFrame,
  hints: FrameHints,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    check_scheme(url, Self::SCHEME)?;
    let hints = FrameHints::from_query(url)?;
    let image = decode(&url_path(url)?)?;
    debug!("读取图像: {}x{}", image.width(), image.height());

    Ok(ImageFileInput { image, hints })
  }
}

impl IntoIterator for ImageFileInput {
  type Item = CameraFrame;
  type IntoIter = ImageFileIter;

  fn into_iter(self) -> Self::IntoIter {
    ImageFileIter {
      decoded: Some(self.image),
      paths: VecDeque::new(),
      hints: self.hints,
      index: 0,
    }
  }
}

/// 目录中的全部图像，按文件名排序，`images:///path/to/dir?rotation=0`
pub struct ImageDirectoryInput {
  paths: Vec<PathBuf>,
  hints: FrameHints,
}

impl FromUrlWithScheme for ImageDirectoryInput {
  const SCHEME: &'static str = "images";
}

impl FromUrl for ImageDirectoryInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    check_scheme(url, Self::SCHEME)?;
    let hints = FrameHints::from_query(url)?;

    let directory = url_path(url)?;
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(&directory)? {
      let path = entry?.path();
      let is_image = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
      if is_image {
        paths.push(path);
      }
    }

    if paths.is_empty() {
      return Err(ImageFileInputError::NoImages(directory.display().to_string()));
    }
    paths.sort();
    debug!("目录中共有 {} 张图像", paths.len());

    Ok(ImageDirectoryInput { paths, hints })
  }
}

impl IntoIterator for ImageDirectoryInput {
  type Item = CameraFrame;
  type IntoIter = ImageFileIter;

  fn into_iter(self) -> Self::IntoIter {
    ImageFileIter {
      decoded: None,
      paths: self.paths.into(),
      hints: self.hints,
      index: 0,
    }
  }
}

pub struct ImageFileIter {
  decoded: Option<RgbFrame>,
  paths: VecDeque<PathBuf>,
  hints: FrameHints,
  index: usize,
}

impl ImageFileIter {
  fn frame(&mut self, image: RgbFrame) -> CameraFrame {
    let index = self.index;
    self.index += 1;
    CameraFrame {
      index,
      image,
      rotation: self.hints.rotation,
      reference: self.hints.reference,
    }
  }
}

impl Iterator for ImageFileIter {
  type Item = CameraFrame;

  fn next(&mut self) -> Option<Self::Item> {
    if let Some(image) = self.decoded.take() {
      return Some(self.frame(image));
    }

    while let Some(path) = self.paths.pop_front() {
      match decode(&path) {
        Ok(image) => return Some(self.frame(image)),
        Err(e) => error!("跳过无法读取的图像 {}: {}", path.display(), e),
      }
    }
    None
  }
}
