// 该文件是 Shanan （山南西风） 项目的一部分。
// src/dispatcher.rs - 分类调度
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

//! 分类调度器：持有配置，按需构建推理引擎，
//! 计算感兴趣区域和图像方向，并把排序后的结果和耗时通过回调交给调用方。
//!
//! 所有会改变状态的操作都需要 `&mut self`，同一个调度器不能被并发调用；
//! 多线程场景请在外层加 `Mutex`。

use std::{path::PathBuf, time::Instant};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  config::{Backend, DispatcherConfig, ModelTable, backend_policy},
  frame::{FrameError, RgbFrame},
  listener::ClassifierListener,
  model::{
    BaseOptions, Category, ClassifierOptions, Model, ModelBuilder, ProcessingOptions,
    rank_categories,
  },
  orientation::OrientationMapper,
  probe::CapabilityProbe,
  region::{Region, RegionTracker},
};

pub const INIT_FAILED_MESSAGE: &str =
  "Image classifier failed to initialize. See error logs for details";

#[derive(Error, Debug)]
pub enum DispatchError {
  #[error("输入图像无效: {0}")]
  InvalidFrame(#[from] FrameError),
}

/// 引擎句柄，要么不存在，要么已构建
#[derive(Debug)]
pub enum EngineSlot<M> {
  Absent,
  Ready(M),
}

impl<M> Default for EngineSlot<M> {
  fn default() -> Self {
    EngineSlot::Absent
  }
}

impl<M> EngineSlot<M> {
  pub fn is_ready(&self) -> bool {
    matches!(self, EngineSlot::Ready(_))
  }

  pub fn get(&self) -> Option<&M> {
    match self {
      EngineSlot::Ready(model) => Some(model),
      EngineSlot::Absent => None,
    }
  }

  pub fn clear(&mut self) -> Option<M> {
    match std::mem::take(self) {
      EngineSlot::Ready(model) => Some(model),
      EngineSlot::Absent => None,
    }
  }
}

pub struct ClassificationDispatcher<B: ModelBuilder, P, L> {
  config: DispatcherConfig,
  model_table: ModelTable,
  artifact_root: PathBuf,
  builder: B,
  probe: P,
  listener: L,
  engine: EngineSlot<B::Model>,
  tracker: RegionTracker,
  mapper: OrientationMapper,
  construction_attempts: u64,
}

impl<B, P, L> ClassificationDispatcher<B, P, L>
where
  B: ModelBuilder,
  P: CapabilityProbe,
  L: ClassifierListener,
{
  pub fn new(builder: B, probe: P, listener: L, artifact_root: impl Into<PathBuf>) -> Self {
    let dispatcher = Self {
      config: DispatcherConfig::default(),
      model_table: ModelTable::default(),
      artifact_root: artifact_root.into(),
      builder,
      probe,
      listener,
      engine: EngineSlot::Absent,
      tracker: RegionTracker::default(),
      mapper: OrientationMapper,
      construction_attempts: 0,
    };
    dispatcher.warn_duplicates();
    dispatcher
  }

  pub fn with_config(mut self, config: DispatcherConfig) -> Self {
    self.configure(config);
    self
  }

  pub fn with_model_table(mut self, table: ModelTable) -> Self {
    self.set_model_table(table);
    self
  }

  fn warn_duplicates(&self) {
    for (artifact, ids) in self.model_table.duplicates() {
      warn!("模型文件 {} 被多个模型标识共用: {:?}", artifact, ids);
    }
  }

  /// 替换配置并使当前引擎失效
  pub fn configure(&mut self, config: DispatcherConfig) {
    debug!("更新配置: {:?}", config);
    self.config = config;
    self.invalidate();
  }

  pub fn set_model_table(&mut self, table: ModelTable) {
    self.model_table = table;
    self.warn_duplicates();
    self.invalidate();
  }

  /// 丢弃当前引擎，下次分类时重新构建
  pub fn invalidate(&mut self) {
    if self.engine.clear().is_some() {
      info!("释放推理引擎");
    }
  }

  pub fn config(&self) -> &DispatcherConfig {
    &self.config
  }

  pub fn model_table(&self) -> &ModelTable {
    &self.model_table
  }

  pub fn set_reference(&mut self, x: f32, y: f32) {
    self.tracker.set_reference(x, y);
  }

  pub fn region_tracker(&self) -> &RegionTracker {
    &self.tracker
  }

  pub fn current_region(&self) -> Region {
    self.tracker.current_region()
  }

  pub fn is_engine_ready(&self) -> bool {
    self.engine.is_ready()
  }

  pub fn engine(&self) -> Option<&B::Model> {
    self.engine.get()
  }

  pub fn construction_attempts(&self) -> u64 {
    self.construction_attempts
  }

  pub fn artifact_path(&self) -> PathBuf {
    self
      .artifact_root
      .join(self.model_table.resolve(self.config.model))
  }

  /// 按后端策略表决定实际使用的后端，不可用时回落到 CPU
  fn resolve_backend(&self) -> Backend {
    let requested = self.config.backend;
    let policy = backend_policy(requested);
    if policy.probe_required && !self.probe.supports(requested) {
      let message = format!("{} is not supported on this device", requested.display_name());
      warn!("{}, 改用 CPU", message);
      self.listener.on_error(&message);
      return Backend::Cpu;
    }
    requested
  }

  /// 引擎不存在时构建一次，返回引擎是否可用
  pub fn prepare(&mut self) -> bool {
    if self.engine.is_ready() {
      return true;
    }

    self.construction_attempts += 1;
    let backend = self.resolve_backend();
    let artifact = self.artifact_path();
    let options = ClassifierOptions {
      score_threshold: self.config.score_threshold,
      max_results: self.config.max_results,
      base: BaseOptions {
        num_threads: self.config.num_threads,
        backend,
      },
    };

    info!(
      "创建推理引擎: 模型 {} (编号 {}, {}), 后端 {}",
      self.config.model,
      self.config.model.code(),
      artifact.display(),
      backend
    );
    match self.builder.build(&artifact, &options) {
      Ok(model) => {
        self.engine = EngineSlot::Ready(model);
        true
      }
      Err(e) => {
        error!("模型加载失败: {}", e);
        self.listener.on_error(INIT_FAILED_MESSAGE);
        false
      }
    }
  }

  /// 对一帧图像分类，返回第一个分类头的结果
  ///
  /// 图像为空时同步返回错误；
  /// 引擎构建或推理失败时通过回调报告并返回 `Ok(None)`，
  /// 其中构建失败时仍以空结果调用一次 `on_results`。
  pub fn classify(
    &mut self,
    image: &RgbFrame,
    rotation: i32,
  ) -> Result<Option<Vec<Category>>, DispatchError> {
    image.validate()?;

    let started = Instant::now();
    if !self.prepare() {
      let elapsed_ms = started.elapsed().as_millis() as u64;
      self.listener.on_results(&[], elapsed_ms);
      return Ok(None);
    }
    let EngineSlot::Ready(model) = &self.engine else {
      return Ok(None);
    };

    let (input_w, input_h) = model.input_size();
    let input = image.resized(input_w, input_h);

    let region = self.tracker.current_region();
    let roi = region.to_rect();
    let orientation = self.mapper.map(rotation);
    debug!(
      "ROI: {}, {}, {}, {}, 方向 {}",
      region.left, region.top, region.right, region.bottom, orientation
    );

    let now = Instant::now();
    let outcome = model.infer(&input, &ProcessingOptions { roi, orientation });
    let inference_time_ms = now.elapsed().as_millis() as u64;

    match outcome {
      Ok(mut groups) => {
        let max_results = self.config.max_results as usize;
        for group in groups.iter_mut() {
          rank_categories(
            &mut group.categories,
            self.config.score_threshold,
            max_results,
          );
        }
        debug!("推理完成，耗时: {}ms", inference_time_ms);
        self.listener.on_results(&groups, inference_time_ms);
        Ok(groups.into_iter().next().map(|group| group.categories))
      }
      Err(e) => {
        error!("推理失败: {}", e);
        self.listener.on_error(&e.to_string());
        Ok(None)
      }
    }
  }
}
