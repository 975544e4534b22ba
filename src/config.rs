// 该文件是 Shanan （山南西风） 项目的一部分。
// src/config.rs - 分类调度配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{collections::BTreeMap, fmt, path::Path, str::FromStr};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("模型表格式错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("未知的推理后端: {0}")]
  UnknownBackend(String),
  #[error("未知的模型标识: {0}")]
  UnknownModel(String),
}

/// 推理后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Backend {
  Cpu,
  Gpu,
  NeuralAccelerator,
}

impl Backend {
  /// 面向用户的名称
  pub fn display_name(self) -> &'static str {
    match self {
      Backend::Cpu => "CPU",
      Backend::Gpu => "GPU",
      Backend::NeuralAccelerator => "NNAPI",
    }
  }
}

impl fmt::Display for Backend {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Backend::Cpu => "cpu",
      Backend::Gpu => "gpu",
      Backend::NeuralAccelerator => "nnapi",
    };
    f.write_str(name)
  }
}

impl FromStr for Backend {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "cpu" | "0" => Ok(Backend::Cpu),
      "gpu" | "1" => Ok(Backend::Gpu),
      "nnapi" | "npu" | "2" => Ok(Backend::NeuralAccelerator),
      _ => Err(ConfigError::UnknownBackend(s.to_string())),
    }
  }
}

/// 构建引擎时某个后端是否需要先查询设备能力
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendPolicy {
  pub backend: Backend,
  pub probe_required: bool,
}

/// GPU 需要能力探测，NNAPI 不探测直接请求
pub const BACKEND_POLICIES: [BackendPolicy; 3] = [
  BackendPolicy {
    backend: Backend::Cpu,
    probe_required: false,
  },
  BackendPolicy {
    backend: Backend::Gpu,
    probe_required: true,
  },
  BackendPolicy {
    backend: Backend::NeuralAccelerator,
    probe_required: false,
  },
];

pub fn backend_policy(backend: Backend) -> BackendPolicy {
  BACKEND_POLICIES
    .iter()
    .find(|policy| policy.backend == backend)
    .copied()
    .unwrap_or(BackendPolicy {
      backend,
      probe_required: false,
    })
}

/// 模型变体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelId {
  MobileNetV1,
  EfficientNetV0,
  EfficientNetV1,
  EfficientNetV2,
  Other(u32),
}

impl ModelId {
  pub fn code(self) -> u32 {
    match self {
      ModelId::MobileNetV1 => 0,
      ModelId::EfficientNetV0 => 1,
      ModelId::EfficientNetV1 => 2,
      ModelId::EfficientNetV2 => 3,
      ModelId::Other(code) => code,
    }
  }

  pub fn from_code(code: u32) -> Self {
    match code {
      0 => ModelId::MobileNetV1,
      1 => ModelId::EfficientNetV0,
      2 => ModelId::EfficientNetV1,
      3 => ModelId::EfficientNetV2,
      other => ModelId::Other(other),
    }
  }
}

impl fmt::Display for ModelId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ModelId::MobileNetV1 => f.write_str("mobilenetv1"),
      ModelId::EfficientNetV0 => f.write_str("efficientnetv0"),
      ModelId::EfficientNetV1 => f.write_str("efficientnetv1"),
      ModelId::EfficientNetV2 => f.write_str("efficientnetv2"),
      ModelId::Other(code) => write!(f, "model-{}", code),
    }
  }
}

impl FromStr for ModelId {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let name = s.trim().to_ascii_lowercase();
    match name.as_str() {
      "mobilenetv1" => Ok(ModelId::MobileNetV1),
      "efficientnetv0" => Ok(ModelId::EfficientNetV0),
      "efficientnetv1" => Ok(ModelId::EfficientNetV1),
      "efficientnetv2" => Ok(ModelId::EfficientNetV2),
      _ => name
        .strip_prefix("model-")
        .unwrap_or(name.as_str())
        .parse::<u32>()
        .map(ModelId::from_code)
        .map_err(|_| ConfigError::UnknownModel(s.to_string())),
    }
  }
}

pub const FALLBACK_MODEL_ARTIFACT: &str = "mobilenetv1.tflite";

/// 模型标识到模型文件名的映射表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTable {
  models: BTreeMap<ModelId, String>,
  fallback: String,
}

impl Default for ModelTable {
  fn default() -> Self {
    // 0 和 1 指向同一个文件，保持现状，由 duplicates() 报告
    let models = [
      (ModelId::MobileNetV1, "D6E25_Val_Aug_model5_EN1_82_fp16.tflite"),
      (ModelId::EfficientNetV0, "D6E25_Val_Aug_model5_EN1_82_fp16.tflite"),
      (ModelId::EfficientNetV1, "D6E30_Val_Aug_model5_EN1_76_fp16.tflite"),
      (ModelId::EfficientNetV2, "D6E25_Val_Aug_model5_EN0_80_fp16.tflite"),
    ]
    .into_iter()
    .map(|(id, name)| (id, name.to_string()))
    .collect();

    Self {
      models,
      fallback: FALLBACK_MODEL_ARTIFACT.to_string(),
    }
  }
}

#[derive(Deserialize)]
struct ModelTableFile {
  #[serde(default = "inherit_default")]
  inherit: bool,
  fallback: Option<String>,
  #[serde(default)]
  models: BTreeMap<String, String>,
}

fn inherit_default() -> bool {
  true
}

impl ModelTable {
  pub fn empty(fallback: impl Into<String>) -> Self {
    Self {
      models: BTreeMap::new(),
      fallback: fallback.into(),
    }
  }

  pub fn with_model(mut self, id: ModelId, artifact: impl Into<String>) -> Self {
    self.models.insert(id, artifact.into());
    self
  }

  pub fn with_fallback(mut self, artifact: impl Into<String>) -> Self {
    self.fallback = artifact.into();
    self
  }

  pub fn remove(&mut self, id: ModelId) -> Option<String> {
    self.models.remove(&id)
  }

  /// 未登记的标识回落到默认模型
  pub fn resolve(&self, id: ModelId) -> &str {
    self.models.get(&id).map(String::as_str).unwrap_or(self.fallback.as_str())
  }

  pub fn entries(&self) -> impl Iterator<Item = (ModelId, &str)> {
    self.models.iter().map(|(id, name)| (*id, name.as_str()))
  }

  /// 被多个标识共用的模型文件
  pub fn duplicates(&self) -> Vec<(String, Vec<ModelId>)> {
    let mut by_artifact: BTreeMap<&str, Vec<ModelId>> = BTreeMap::new();
    for (id, name) in self.entries() {
      by_artifact.entry(name).or_default().push(id);
    }

    by_artifact
      .into_iter()
      .filter(|(_, ids)| ids.len() > 1)
      .map(|(name, ids)| (name.to_string(), ids))
      .collect()
  }

  /// 解析 JSON 形式的模型表，默认在内置表上覆盖
  ///
  /// ```json
  /// { "inherit": true, "fallback": "base.tflite", "models": { "1": "b.tflite" } }
  /// ```
  pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
    let file: ModelTableFile = serde_json::from_str(text)?;

    let mut table = if file.inherit {
      ModelTable::default()
    } else {
      ModelTable::empty(FALLBACK_MODEL_ARTIFACT)
    };

    if let Some(fallback) = file.fallback {
      table.fallback = fallback;
    }

    for (key, artifact) in file.models {
      let id = key.parse::<ModelId>()?;
      debug!("模型表覆盖: {} -> {}", id, artifact);
      table.models.insert(id, artifact);
    }

    Ok(table)
  }

  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    Self::from_json_str(&text)
  }
}

/// 调度器配置，任何改动都会使当前引擎失效
#[derive(Debug, Clone, PartialEq)]
pub struct DispatcherConfig {
  pub score_threshold: f32,
  pub num_threads: u32,
  pub max_results: u32,
  pub backend: Backend,
  pub model: ModelId,
}

impl Default for DispatcherConfig {
  fn default() -> Self {
    Self {
      score_threshold: 0.5,
      num_threads: 2,
      max_results: 3,
      backend: Backend::Cpu,
      model: ModelId::MobileNetV1,
    }
  }
}

impl DispatcherConfig {
  pub fn score_threshold(mut self, threshold: f32) -> Self {
    self.score_threshold = threshold;
    self
  }

  pub fn num_threads(mut self, num_threads: u32) -> Self {
    self.num_threads = num_threads;
    self
  }

  pub fn max_results(mut self, max_results: u32) -> Self {
    self.max_results = max_results;
    self
  }

  pub fn backend(mut self, backend: Backend) -> Self {
    self.backend = backend;
    self
  }

  pub fn model(mut self, model: ModelId) -> Self {
    self.model = model;
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_table_matches_artifacts() {
    let table = ModelTable::default();
    assert_eq!(
      table.resolve(ModelId::MobileNetV1),
      "D6E25_Val_Aug_model5_EN1_82_fp16.tflite"
    );
    assert_eq!(
      table.resolve(ModelId::EfficientNetV0),
      "D6E25_Val_Aug_model5_EN1_82_fp16.tflite"
    );
    assert_eq!(
      table.resolve(ModelId::EfficientNetV1),
      "D6E30_Val_Aug_model5_EN1_76_fp16.tflite"
    );
    assert_eq!(
      table.resolve(ModelId::EfficientNetV2),
      "D6E25_Val_Aug_model5_EN0_80_fp16.tflite"
    );
    assert_eq!(table.resolve(ModelId::Other(9)), "mobilenetv1.tflite");
  }

  #[test]
  fn reports_shared_artifact() {
    let duplicates = ModelTable::default().duplicates();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].0, "D6E25_Val_Aug_model5_EN1_82_fp16.tflite");
    assert_eq!(
      duplicates[0].1,
      vec![ModelId::MobileNetV1, ModelId::EfficientNetV0]
    );

    let fixed =
      ModelTable::default().with_model(ModelId::EfficientNetV0, "efficientnet_lite0.tflite");
    assert!(fixed.duplicates().is_empty());
  }

  #[test]
  fn removed_entry_falls_back() {
    let mut table = ModelTable::default();
    table.remove(ModelId::EfficientNetV2);
    assert_eq!(table.resolve(ModelId::EfficientNetV2), FALLBACK_MODEL_ARTIFACT);
  }

  #[test]
  fn json_overrides_default_table() {
    let table = ModelTable::from_json_str(
      r#"{
        "fallback": "base.tflite",
        "models": { "1": "lite0.tflite", "efficientnetv2": "lite2.tflite" }
      }"#,
    )
    .unwrap();
    assert_eq!(table.resolve(ModelId::EfficientNetV0), "lite0.tflite");
    assert_eq!(table.resolve(ModelId::EfficientNetV2), "lite2.tflite");
    assert_eq!(
      table.resolve(ModelId::EfficientNetV1),
      "D6E30_Val_Aug_model5_EN1_76_fp16.tflite"
    );
    assert_eq!(table.resolve(ModelId::Other(42)), "base.tflite");

    let table =
      ModelTable::from_json_str(r#"{ "inherit": false, "models": { "7": "seven.tflite" } }"#)
        .unwrap();
    assert_eq!(table.resolve(ModelId::Other(7)), "seven.tflite");
    assert_eq!(table.resolve(ModelId::MobileNetV1), FALLBACK_MODEL_ARTIFACT);
  }

  #[test]
  fn json_rejects_bad_keys() {
    let err = ModelTable::from_json_str(r#"{ "models": { "resnet": "r.tflite" } }"#).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownModel(_)));
  }

  #[test]
  fn parses_backend_and_model_names() {
    assert_eq!("GPU".parse::<Backend>().unwrap(), Backend::Gpu);
    assert_eq!("npu".parse::<Backend>().unwrap(), Backend::NeuralAccelerator);
    assert_eq!("0".parse::<Backend>().unwrap(), Backend::Cpu);
    assert!("tpu".parse::<Backend>().is_err());

    assert_eq!("2".parse::<ModelId>().unwrap(), ModelId::EfficientNetV1);
    assert_eq!("model-12".parse::<ModelId>().unwrap(), ModelId::Other(12));
    assert_eq!(ModelId::from_code(3).code(), 3);
  }

  #[test]
  fn policy_table_is_asymmetric() {
    assert!(!backend_policy(Backend::Cpu).probe_required);
    assert!(backend_policy(Backend::Gpu).probe_required);
    assert!(!backend_policy(Backend::NeuralAccelerator).probe_required);
  }
}
