// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use chrono::{Datelike, Utc};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::CameraFrame,
  output::{ClassifyReport, Render},
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("路径无效: {0}")]
  InvalidPath(String),
}

/// 按日期分目录记录分类结果，`folder:///var/record?image&always`
///
/// 每帧写一个 `.txt` 记录；带 `image` 参数时同时保存原图，
/// 带 `always` 参数时没有分类结果的帧也会记录。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counters: Arc<Mutex<u16>>,
  save_image: bool,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let directory = urlencoding::decode(uri.path())
      .map_err(|e| DirectoryRecordOutputError::InvalidPath(format!("{}: {}", uri.path(), e)))?;
    let save_image = uri.query_pairs().any(|(k, _)| k == "image");
    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(directory.as_ref()),
      frame_counters: Arc::new(Mutex::new(0)),
      save_image,
      always,
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u16 {
    let mut counter = self
      .frame_counters
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    let id = counter.wrapping_add(1);
    *counter = id;
    id
  }

  fn frame_path(&self) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!(
      "{}-{:04X}.txt",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }
}

impl Render<CameraFrame, ClassifyReport> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &CameraFrame, result: &ClassifyReport) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      return Ok(());
    }

    let path = self.frame_path()?;
    std::fs::write(&path, result.to_record())?;
    if self.save_image {
      frame.image.to_rgb_image().save(path.with_extension("png"))?;
    }
    debug!("记录帧 {} 到 {}", frame.index, path.display());

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::{
    frame::RgbFrame,
    model::Category,
    region::{ReferencePoint, Region},
  };

  fn frame() -> CameraFrame {
    CameraFrame {
      index: 0,
      image: RgbFrame::filled(4, 4, [1, 2, 3]),
      rotation: 0,
      reference: None,
    }
  }

  fn report(categories: Option<Vec<Category>>) -> ClassifyReport {
    ClassifyReport {
      categories,
      region: Region::around(ReferencePoint { x: 10.0, y: 10.0 }, 112.0),
      elapsed: Duration::from_millis(1),
    }
  }

  fn files(dir: &std::path::Path, ext: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
      for entry in std::fs::read_dir(current).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
          stack.push(path);
        } else if path.extension().and_then(|e| e.to_str()) == Some(ext) {
          found.push(path);
        }
      }
    }
    found
  }

  #[test]
  fn records_results_with_image() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}?image", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();

    let result = report(Some(vec![Category {
      index: 0,
      label: "hand".to_string(),
      score: 0.5,
    }]));
    output.render_result(&frame(), &result).unwrap();

    let records = files(dir.path(), "txt");
    assert_eq!(records.len(), 1);
    let text = std::fs::read_to_string(&records[0]).unwrap();
    assert!(text.starts_with("hand, 0.5000\n"));
    assert_eq!(files(dir.path(), "png").len(), 1);
  }

  #[test]
  fn decodes_escaped_directory() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}/my%20dir", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    output.render_result(&frame(), &report(None)).unwrap();
    output
      .render_result(
        &frame(),
        &report(Some(vec![Category {
          index: 0,
          label: "fist".to_string(),
          score: 0.7,
        }])),
      )
      .unwrap();

    assert!(dir.path().join("my dir").is_dir());
    assert!(!dir.path().join("my%20dir").exists());
    assert_eq!(files(&dir.path().join("my dir"), "txt").len(), 1);
  }

  #[test]
  fn skips_empty_results_unless_always() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    output.render_result(&frame(), &report(None)).unwrap();
    assert!(files(dir.path(), "txt").is_empty());

    let url = url::Url::parse(&format!("folder://{}?always", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    output.render_result(&frame(), &report(None)).unwrap();
    assert_eq!(files(dir.path(), "txt").len(), 1);
    assert!(files(dir.path(), "png").is_empty());
  }
}
