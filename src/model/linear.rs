// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/linear.rs - 线性参考分类模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

//! 以感兴趣区域内 RGB 均值为特征的线性分类器。
//!
//! 模型文件为 JSON：
//!
//! ```json
//! {
//!   "labels": ["red", "green", "blue"],
//!   "weights": [[8.0, 0.0, 0.0], [0.0, 8.0, 0.0], [0.0, 0.0, 8.0]],
//!   "bias": [0.0, 0.0, 0.0]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
  config::Backend,
  frame::RgbFrame,
  model::{
    Category, ClassifierOptions, Classifications, MODEL_INPUT_H, MODEL_INPUT_W, Model, ModelBuilder,
    ModelError, ProcessingOptions, rank_categories,
  },
};

#[derive(Deserialize)]
struct LinearArtifact {
  labels: Vec<String>,
  weights: Vec<[f32; 3]>,
  #[serde(default)]
  bias: Vec<f32>,
}

pub struct LinearModel {
  labels: Box<[String]>,
  weights: Box<[[f32; 3]]>,
  bias: Box<[f32]>,
  options: ClassifierOptions,
  input_size: (u32, u32),
}

#[derive(Debug, Clone)]
pub struct LinearModelBuilder {
  input_size: (u32, u32),
}

impl Default for LinearModelBuilder {
  fn default() -> Self {
    Self {
      input_size: (MODEL_INPUT_W, MODEL_INPUT_H),
    }
  }
}

impl LinearModelBuilder {
  pub fn input_size(mut self, width: u32, height: u32) -> Self {
    self.input_size = (width, height);
    self
  }
}

fn check_options(options: &ClassifierOptions) -> Result<(), ModelError> {
  if !(0.0..=1.0).contains(&options.score_threshold) {
    return Err(ModelError::InvalidOptions(format!(
      "置信度阈值必须在 [0, 1] 内, 实际为 {}",
      options.score_threshold
    )));
  }
  if options.max_results == 0 {
    return Err(ModelError::InvalidOptions("最大结果数必须为正数".to_string()));
  }
  if options.base.num_threads == 0 {
    return Err(ModelError::InvalidOptions("线程数必须为正数".to_string()));
  }
  Ok(())
}

impl ModelBuilder for LinearModelBuilder {
  type Model = LinearModel;

  fn build(&self, artifact: &Path, options: &ClassifierOptions) -> Result<LinearModel, ModelError> {
    check_options(options)?;

    info!("加载模型文件: {}", artifact.display());
    let text = std::fs::read_to_string(artifact)?;
    debug!("模型文件大小: {} 字节", text.len());

    let parsed: LinearArtifact = serde_json::from_str(&text)
      .map_err(|e| ModelError::ModelInvalid(format!("{}: {}", artifact.display(), e)))?;

    if parsed.labels.is_empty() {
      return Err(ModelError::ModelInvalid("标签列表为空".to_string()));
    }
    if parsed.weights.len() != parsed.labels.len() {
      return Err(ModelError::ModelInvalid(format!(
        "预期权重行数为 {}, 实际为 {}",
        parsed.labels.len(),
        parsed.weights.len()
      )));
    }
    let bias = if parsed.bias.is_empty() {
      vec![0.0; parsed.labels.len()]
    } else if parsed.bias.len() == parsed.labels.len() {
      parsed.bias
    } else {
      return Err(ModelError::ModelInvalid(format!(
        "预期偏置长度为 {}, 实际为 {}",
        parsed.labels.len(),
        parsed.bias.len()
      )));
    };

    if options.base.backend != Backend::Cpu {
      warn!("线性模型没有 {} 实现, 在 CPU 上计算", options.base.backend);
    }
    info!(
      "模型加载完成: {} 个类别, 后端 {}, 线程数 {}",
      parsed.labels.len(),
      options.base.backend,
      options.base.num_threads
    );

    Ok(LinearModel {
      labels: parsed.labels.into_boxed_slice(),
      weights: parsed.weights.into_boxed_slice(),
      bias: bias.into_boxed_slice(),
      options: *options,
      input_size: self.input_size,
    })
  }
}

impl LinearModel {
  pub fn backend(&self) -> Backend {
    self.options.base.backend
  }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
  let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
  let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
  let sum: f32 = exps.iter().sum();
  exps.into_iter().map(|e| e / sum).collect()
}

impl Model for LinearModel {
  fn input_size(&self) -> (u32, u32) {
    self.input_size
  }

  fn infer(
    &self,
    input: &RgbFrame,
    options: &ProcessingOptions,
  ) -> Result<Vec<Classifications>, ModelError> {
    let width = input.width() as i32;
    let height = input.height() as i32;

    let (x_min, y_min, x_max, y_max) = options.roi.normalized();
    let x0 = x_min.clamp(0, width);
    let x1 = x_max.clamp(0, width);
    let y0 = y_min.clamp(0, height);
    let y1 = y_max.clamp(0, height);
    if x1 <= x0 || y1 <= y0 {
      return Err(ModelError::InvalidRoi(options.roi));
    }
    debug!(
      "有效区域: ({}, {}) - ({}, {}), 方向 {}",
      x0, y0, x1, y1, options.orientation
    );

    let mut sum = [0f64; 3];
    for y in y0..y1 {
      for x in x0..x1 {
        let pixel = input.pixel(x as u32, y as u32);
        for (acc, value) in sum.iter_mut().zip(pixel) {
          *acc += value as f64;
        }
      }
    }
    let count = ((x1 - x0) * (y1 - y0)) as f64;
    let mean = sum.map(|s| (s / count / 255.0) as f32);

    let logits: Vec<f32> = self
      .weights
      .iter()
      .zip(self.bias.iter())
      .map(|(w, b)| b + w[0] * mean[0] + w[1] * mean[1] + w[2] * mean[2])
      .collect();

    let mut categories: Vec<Category> = softmax(&logits)
      .into_iter()
      .enumerate()
      .map(|(index, score)| Category {
        index,
        label: self.labels[index].clone(),
        score,
      })
      .collect();
    rank_categories(
      &mut categories,
      self.options.score_threshold,
      self.options.max_results as usize,
    );

    debug!("分类结果: {:?}", categories);
    Ok(vec![Classifications {
      head_index: 0,
      categories,
    }])
  }
}
