// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use thiserror::Error;

use crate::{config::Backend, frame::RgbFrame, orientation::Orientation, region::RoiRect};

pub const MODEL_INPUT_W: u32 = 224;
pub const MODEL_INPUT_H: u32 = 224;

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("选项无效: {0}")]
  InvalidOptions(String),
  #[error("感兴趣区域与图像无交集: {0:?}")]
  InvalidRoi(RoiRect),
  #[error("推理错误: {0}")]
  InferenceError(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
  pub index: usize,
  pub label: String,
  pub score: f32,
}

/// 一个分类头的输出
#[derive(Debug, Clone, PartialEq)]
pub struct Classifications {
  pub head_index: usize,
  pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseOptions {
  pub num_threads: u32,
  pub backend: Backend,
}

/// 构建引擎的选项，调度器原样透传
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierOptions {
  pub score_threshold: f32,
  pub max_results: u32,
  pub base: BaseOptions,
}

/// 单次推理的图像处理选项
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessingOptions {
  pub roi: RoiRect,
  pub orientation: Orientation,
}

pub trait Model {
  fn input_size(&self) -> (u32, u32) {
    (MODEL_INPUT_W, MODEL_INPUT_H)
  }

  fn infer(
    &self,
    input: &RgbFrame,
    options: &ProcessingOptions,
  ) -> Result<Vec<Classifications>, ModelError>;
}

pub trait ModelBuilder {
  type Model: Model;

  fn build(&self, artifact: &Path, options: &ClassifierOptions) -> Result<Self::Model, ModelError>;
}

/// 过滤低分项，按分数降序排列并截断
pub fn rank_categories(categories: &mut Vec<Category>, score_threshold: f32, max_results: usize) {
  categories.retain(|category| category.score >= score_threshold);
  categories.sort_by(|a, b| b.score.total_cmp(&a.score));
  categories.truncate(max_results);
}

mod linear;
pub use self::linear::{LinearModel, LinearModelBuilder};
