// 该文件是 Shanan （山南西风） 项目的一部分。
// src/listener.rs - 分类结果回调
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::sync::Arc;

use tracing::{error, info};

use crate::model::Classifications;

pub trait ClassifierListener {
  fn on_error(&self, message: &str);
  fn on_results(&self, results: &[Classifications], inference_time_ms: u64);
}

/// 把回调写入日志
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl ClassifierListener for TracingListener {
  fn on_error(&self, message: &str) {
    error!("分类器错误: {}", message);
  }

  fn on_results(&self, results: &[Classifications], inference_time_ms: u64) {
    let top = results
      .first()
      .and_then(|group| group.categories.first())
      .map(|category| format!("{} ({:.2})", category.label, category.score))
      .unwrap_or_else(|| "无".to_string());
    info!("推理完成，耗时: {}ms, 最高分类: {}", inference_time_ms, top);
  }
}

impl<T: ClassifierListener + ?Sized> ClassifierListener for &T {
  fn on_error(&self, message: &str) {
    (**self).on_error(message)
  }

  fn on_results(&self, results: &[Classifications], inference_time_ms: u64) {
    (**self).on_results(results, inference_time_ms)
  }
}

impl<T: ClassifierListener + ?Sized> ClassifierListener for Arc<T> {
  fn on_error(&self, message: &str) {
    (**self).on_error(message)
  }

  fn on_results(&self, results: &[Classifications], inference_time_ms: u64) {
    (**self).on_results(results, inference_time_ms)
  }
}

impl<T: ClassifierListener + ?Sized> ClassifierListener for Box<T> {
  fn on_error(&self, message: &str) {
    (**self).on_error(message)
  }

  fn on_results(&self, results: &[Classifications], inference_time_ms: u64) {
    (**self).on_results(results, inference_time_ms)
  }
}
