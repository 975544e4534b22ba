// 该文件是 Shanan （山南西风） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shanan_classify::{
  ClassificationDispatcher, FromUrl,
  config::ModelTable,
  input::InputWrapper,
  listener::TracingListener,
  model::LinearModelBuilder,
  output::OutputWrapper,
  probe::{CapabilityProbe, DriRenderProbe, StaticProbe},
  task::{ContinuousTask, OneShotTask, RepeatShotTask, Task},
};

use args::{Args, TaskKind};

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = Args::parse();

  info!("模型目录: {}", args.model_dir.display());
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let model_table = match &args.model_table {
    Some(path) => ModelTable::from_json_file(path)?,
    None => ModelTable::default(),
  };
  let probe: Box<dyn CapabilityProbe> = match args.gpu {
    Some(supported) => Box::new(StaticProbe(supported)),
    None => Box::new(DriRenderProbe::default()),
  };

  let mut dispatcher = ClassificationDispatcher::new(
    LinearModelBuilder::default(),
    probe,
    TracingListener,
    args.model_dir.clone(),
  )
  .with_model_table(model_table)
  .with_config(args.dispatcher_config());
  if let (Some(x), Some(y)) = (args.center_x, args.center_y) {
    dispatcher.set_reference(x, y);
  }

  let rotation = args.rotation;
  let input = InputWrapper::from_url(&args.input)?
    .into_iter()
    .map(move |mut frame| {
      if let Some(rotation) = rotation {
        frame.rotation = rotation;
      }
      frame
    });
  let output = OutputWrapper::from_url(&args.output)?;

  match args.task {
    TaskKind::Oneshot => OneShotTask.run_task(input, &mut dispatcher, output)?,
    TaskKind::Repeat => RepeatShotTask::default()
      .with_repeat_times(args.repeat.unwrap_or(RepeatShotTask::REPEAT_TIMES))
      .run_task(input, &mut dispatcher, output)?,
    TaskKind::Continuous => ContinuousTask::default()
      .with_frame_number(args.frame_number)
      .run_task(input, &mut dispatcher, output)?,
  }

  Ok(())
}
