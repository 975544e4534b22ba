// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output.rs - 输出定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, input::CameraFrame, model::Category, region::Region};

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

/// 一次分类调用的可展示结果
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyReport {
  pub categories: Option<Vec<Category>>,
  pub region: Region,
  pub elapsed: Duration,
}

impl ClassifyReport {
  pub fn is_empty(&self) -> bool {
    self
      .categories
      .as_ref()
      .map(|categories| categories.is_empty())
      .unwrap_or(true)
  }

  /// 每个类别一行 `label, score`，最后一行为区域
  pub fn to_record(&self) -> String {
    let mut records: Vec<String> = self
      .categories
      .iter()
      .flatten()
      .map(|category| format!("{}, {:.4}", category.label, category.score))
      .collect();
    records.push(format!(
      "region, {:.1}, {:.1}, {:.1}, {:.1}",
      self.region.left, self.region.top, self.region.right, self.region.bottom
    ));
    records.join("\n")
  }
}

mod log_output;
pub use self::log_output::LogOutput;

mod directory_record;
pub use self::directory_record::{DirectoryRecordOutput, DirectoryRecordOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("目录记录输出错误: {0}")]
  DirectoryRecordOutputError(#[from] DirectoryRecordOutputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("查询参数无效: {0}")]
  InvalidQuery(String),
}

pub enum OutputWrapper {
  LogOutput(LogOutput),
  DirectoryRecordOutput(DirectoryRecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LogOutput::SCHEME => Ok(OutputWrapper::LogOutput(LogOutput::from_url(url)?)),
      DirectoryRecordOutput::SCHEME => {
        let output = DirectoryRecordOutput::from_url(url)?;
        Ok(OutputWrapper::DirectoryRecordOutput(output))
      }
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Render<CameraFrame, ClassifyReport> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &CameraFrame, result: &ClassifyReport) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::LogOutput(output) => {
        output.render_result(frame, result).map_err(|never| match never {})
      }
      OutputWrapper::DirectoryRecordOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }
}
