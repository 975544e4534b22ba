// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/log_output.rs - 日志输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::convert::Infallible;

use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::CameraFrame,
  output::{ClassifyReport, OutputError, Render},
  region::{Region, fill_start_scale},
};

/// 把分类结果写入日志，`log:stdout?view_width=1080&view_height=1920`
///
/// 给出视图尺寸时，额外打印按 FILL_START 缩放后的显示区域。
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOutput {
  view: Option<(f32, f32)>,
}

impl LogOutput {
  pub fn with_view(mut self, width: f32, height: f32) -> Self {
    self.view = Some((width, height));
    self
  }

  pub fn display_region(&self, frame: &CameraFrame, region: &Region) -> Option<Region> {
    let (view_width, view_height) = self.view?;
    let scale = fill_start_scale(
      view_width,
      view_height,
      frame.image.width() as f32,
      frame.image.height() as f32,
    );
    Some(region.scaled(scale))
  }
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch);
    }

    let mut width = None;
    let mut height = None;
    for (key, value) in url.query_pairs() {
      let parsed = value
        .parse::<f32>()
        .ok()
        .filter(|v| *v > 0.0)
        .ok_or_else(|| OutputError::InvalidQuery(format!("{}={}", key, value)));
      match key.as_ref() {
        "view_width" => width = Some(parsed?),
        "view_height" => height = Some(parsed?),
        _ => {}
      }
    }

    match (width, height) {
      (Some(width), Some(height)) => Ok(LogOutput::default().with_view(width, height)),
      (None, None) => Ok(LogOutput::default()),
      _ => Err(OutputError::InvalidQuery(
        "view_width and view_height must be given together".to_string(),
      )),
    }
  }
}

impl Render<CameraFrame, ClassifyReport> for LogOutput {
  type Error = Infallible;

  fn render_result(&self, frame: &CameraFrame, result: &ClassifyReport) -> Result<(), Self::Error> {
    let region = &result.region;
    info!(
      "帧 {} (耗时: {:.2?}): 区域 ({:.0}, {:.0}, {:.0}, {:.0})",
      frame.index, result.elapsed, region.left, region.top, region.right, region.bottom
    );
    if let Some(shown) = self.display_region(frame, region) {
      info!(
        "  显示区域 ({:.0}, {:.0}, {:.0}, {:.0})",
        shown.left, shown.top, shown.right, shown.bottom
      );
    }
    match &result.categories {
      Some(categories) if !categories.is_empty() => {
        for category in categories {
          info!("  - {}: {:.2}%", category.label, category.score * 100.0);
        }
      }
      _ => info!("  未识别到类别"),
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{frame::RgbFrame, region::ReferencePoint};

  #[test]
  fn view_size_scales_region() {
    let url = Url::parse("log:stdout?view_width=400&view_height=100").unwrap();
    let output = LogOutput::from_url(&url).unwrap();
    let frame = CameraFrame {
      index: 0,
      image: RgbFrame::filled(200, 100, [0, 0, 0]),
      rotation: 0,
      reference: None,
    };
    let region = Region::around(ReferencePoint { x: 0.0, y: 0.0 }, 10.0);
    let display = output.display_region(&frame, &region).unwrap();
    assert_eq!(display.left, -20.0);
    assert_eq!(display.top, 20.0);
  }

  #[test]
  fn plain_log_has_no_display_region() {
    let output = LogOutput::from_url(&Url::parse("log:stdout").unwrap()).unwrap();
    let frame = CameraFrame {
      index: 0,
      image: RgbFrame::filled(2, 2, [0, 0, 0]),
      rotation: 0,
      reference: None,
    };
    let region = Region::around(ReferencePoint { x: 0.0, y: 0.0 }, 1.0);
    assert!(output.display_region(&frame, &region).is_none());
    assert!(LogOutput::from_url(&Url::parse("log:stdout?view_width=3").unwrap()).is_err());
  }

  #[test]
  fn renders_report_with_view() {
    let output = LogOutput::default().with_view(1080.0, 1920.0);
    let frame = CameraFrame {
      index: 3,
      image: RgbFrame::filled(4, 8, [0, 0, 0]),
      rotation: 1,
      reference: None,
    };
    let report = ClassifyReport {
      categories: Some(vec![crate::model::Category {
        index: 0,
        label: "palm".to_string(),
        score: 0.8,
      }]),
      region: Region::around(ReferencePoint { x: 2.0, y: 4.0 }, 112.0),
      elapsed: std::time::Duration::from_millis(2),
    };
    assert!(output.render_result(&frame, &report).is_ok());
  }
}
