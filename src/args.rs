// 该文件是 Shanan （山南西风） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use url::Url;

use shanan_classify::config::{Backend, DispatcherConfig, ModelId};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
  /// 只处理第一帧
  Oneshot,
  /// 对第一帧重复分类并统计平均耗时
  Repeat,
  /// 处理全部输入帧，Ctrl-C 退出
  Continuous,
}

/// Shanan 区域分类参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型文件所在目录
  #[arg(long, value_name = "DIR", default_value = ".")]
  pub model_dir: PathBuf,

  /// 覆盖默认模型表的 JSON 文件
  #[arg(long, value_name = "FILE")]
  pub model_table: Option<PathBuf>,

  /// 模型编号或名称（mobilenetv1, efficientnetv0..2, model-N）
  #[arg(long, default_value = "mobilenetv1", value_name = "MODEL")]
  pub model: ModelId,

  /// 推理后端（cpu, gpu, nnapi）
  #[arg(long, default_value = "cpu", value_name = "BACKEND")]
  pub backend: Backend,

  /// 分数阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub threshold: f32,

  /// 推理线程数
  #[arg(long, default_value = "2", value_name = "COUNT")]
  pub threads: u32,

  /// 最多返回的类别数
  #[arg(long, default_value = "3", value_name = "COUNT")]
  pub max_results: u32,

  /// 强制指定 GPU 是否可用，缺省时探测 DRM 渲染节点
  #[arg(long, value_name = "BOOL")]
  pub gpu: Option<bool>,

  /// 输入来源
  /// - 图片: image:///path/to/file.png?rotation=1&x=120&y=80
  /// - 目录: images:///path/to/dir
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出路径
  /// - 日志: log:stdout
  /// - 目录记录: folder:///path/to/dir?image&always
  #[arg(long, default_value = "log:stdout", value_name = "OUTPUT")]
  pub output: Url,

  /// 覆盖输入帧的设备旋转（0-3）
  #[arg(long, value_name = "ROTATION")]
  pub rotation: Option<i32>,

  /// 初始参考点横坐标
  #[arg(long, allow_hyphen_values = true, requires = "center_y", value_name = "X")]
  pub center_x: Option<f32>,

  /// 初始参考点纵坐标
  #[arg(long, allow_hyphen_values = true, requires = "center_x", value_name = "Y")]
  pub center_y: Option<f32>,

  #[arg(long, value_enum, default_value = "oneshot")]
  pub task: TaskKind,

  /// 连续任务的最大帧数
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,

  /// 重复任务的次数
  #[arg(long, value_name = "COUNT")]
  pub repeat: Option<usize>,
}

impl Args {
  pub fn dispatcher_config(&self) -> DispatcherConfig {
    DispatcherConfig::default()
      .score_threshold(self.threshold)
      .num_threads(self.threads)
      .max_results(self.max_results)
      .backend(self.backend)
      .model(self.model)
  }
}
