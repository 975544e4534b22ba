// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 任务循环
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{
  thread,
  time::{Duration, Instant},
};
use tracing::{info, warn};

use crate::{
  dispatcher::{ClassificationDispatcher, DispatchError},
  input::CameraFrame,
  listener::ClassifierListener,
  model::ModelBuilder,
  output::{ClassifyReport, Render},
  probe::CapabilityProbe,
};

pub trait Task<I, D, O>: Sized {
  type Error;
  fn run_task(self, input: I, dispatcher: D, output: O) -> Result<(), Self::Error>;
}

/// 更新参考点后分类一帧，并整理成可输出的报告
pub fn classify_frame<B, P, L>(
  dispatcher: &mut ClassificationDispatcher<B, P, L>,
  frame: &CameraFrame,
) -> Result<ClassifyReport, DispatchError>
where
  B: ModelBuilder,
  P: CapabilityProbe,
  L: ClassifierListener,
{
  if let Some(point) = frame.reference {
    dispatcher.set_reference(point.x, point.y);
  }
  let now = Instant::now();
  let categories = dispatcher.classify(&frame.image, frame.rotation)?;
  Ok(ClassifyReport {
    categories,
    region: dispatcher.current_region(),
    elapsed: now.elapsed(),
  })
}

/// 平均耗时，跳过前 `warmup` 次
pub fn average_after_warmup(times: &[Duration], warmup: usize) -> Option<Duration> {
  let measured = times.get(warmup..)?;
  if measured.is_empty() {
    return None;
  }
  Some(measured.iter().sum::<Duration>() / measured.len() as u32)
}

pub struct OneShotTask;

impl<I, B, P, L, O, RE> Task<I, &mut ClassificationDispatcher<B, P, L>, O> for OneShotTask
where
  I: Iterator<Item = CameraFrame>,
  B: ModelBuilder,
  P: CapabilityProbe,
  L: ClassifierListener,
  O: Render<CameraFrame, ClassifyReport, Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    dispatcher: &mut ClassificationDispatcher<B, P, L>,
    output: O,
  ) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始分类...");
    let report = classify_frame(dispatcher, &frame)?;
    info!("分类完成，耗时: {:.2?}", report.elapsed);
    output.render_result(&frame, &report)?;

    Ok(())
  }
}

pub struct RepeatShotTask {
  repeat_times: usize,
}

impl RepeatShotTask {
  pub const REPEAT_TIMES: usize = 1000;
  const WARMUP: usize = 2;

  pub fn with_repeat_times(mut self, repeat_times: usize) -> Self {
    self.repeat_times = repeat_times;
    self
  }
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      repeat_times: Self::REPEAT_TIMES,
    }
  }
}

impl<I, B, P, L, O, RE> Task<I, &mut ClassificationDispatcher<B, P, L>, O> for RepeatShotTask
where
  I: Iterator<Item = CameraFrame>,
  B: ModelBuilder,
  P: CapabilityProbe,
  L: ClassifierListener,
  O: Render<CameraFrame, ClassifyReport, Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    dispatcher: &mut ClassificationDispatcher<B, P, L>,
    output: O,
  ) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，重复分类 {} 次...", self.repeat_times);
    let mut times = Vec::with_capacity(self.repeat_times);
    for i in 0..self.repeat_times {
      let report = classify_frame(dispatcher, &frame)?;
      info!("({})分类完成，耗时: {:.2?}", i, report.elapsed);
      output.render_result(&frame, &report)?;
      times.push(report.elapsed);
    }

    match average_after_warmup(&times, Self::WARMUP) {
      Some(average) => warn!("平均分类时间: {:.2?}", average),
      None => warn!("重复次数不足，无法计算平均分类时间"),
    }

    Ok(())
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }
}

impl<I, B, P, L, O, RE> Task<I, &mut ClassificationDispatcher<B, P, L>, O> for ContinuousTask
where
  I: Iterator<Item = CameraFrame>,
  B: ModelBuilder,
  P: CapabilityProbe,
  L: ClassifierListener,
  O: Render<CameraFrame, ClassifyReport, Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    input: I,
    dispatcher: &mut ClassificationDispatcher<B, P, L>,
    output: O,
  ) -> Result<(), Self::Error> {
    info!("开始任务...");
    let (tx, rx) = std::sync::mpsc::channel();

    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })
    .map_err(|e| anyhow::anyhow!("无法设置 Ctrl-C 处理函数: {}", e))?;

    let mut frame_count = 0;
    for frame in input {
      frame_count += 1;
      info!("处理第 {} 帧图像", frame_count);
      let report = classify_frame(dispatcher, &frame)?;
      output.render_result(&frame, &report)?;
      info!("分类完成，耗时: {:.2?}", report.elapsed);
      if self.frame_number.map(|n| frame_count >= n).unwrap_or(false) {
        info!("达到指定帧数 {}, 退出任务循环", frame_count);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!("任务完成，共处理 {} 帧", frame_count);
    Ok(())
  }
}
