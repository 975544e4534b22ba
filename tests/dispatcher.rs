// 该文件是 Shanan （山南西风） 项目的一部分。
// tests/dispatcher.rs - 调度器集成测试
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{
  path::Path,
  sync::{Arc, Mutex},
};

use shanan_classify::{
  ClassificationDispatcher,
  config::{Backend, DispatcherConfig, ModelId, ModelTable},
  dispatcher::INIT_FAILED_MESSAGE,
  frame::RgbFrame,
  listener::ClassifierListener,
  model::{Classifications, LinearModelBuilder},
  probe::StaticProbe,
};
use tempfile::TempDir;

const COLOR_MODEL: &str = r#"{
  "labels": ["red", "green", "blue"],
  "weights": [[8.0, 0.0, 0.0], [0.0, 8.0, 0.0], [0.0, 0.0, 8.0]]
}"#;

#[derive(Default)]
struct Recorder {
  errors: Mutex<Vec<String>>,
  results: Mutex<Vec<(Vec<Classifications>, u64)>>,
}

impl Recorder {
  fn errors(&self) -> Vec<String> {
    self.errors.lock().unwrap().clone()
  }

  fn result_count(&self) -> usize {
    self.results.lock().unwrap().len()
  }
}

impl ClassifierListener for Recorder {
  fn on_error(&self, message: &str) {
    self.errors.lock().unwrap().push(message.to_string());
  }

  fn on_results(&self, results: &[Classifications], inference_time_ms: u64) {
    self
      .results
      .lock()
      .unwrap()
      .push((results.to_vec(), inference_time_ms));
  }
}

type Dispatcher = ClassificationDispatcher<LinearModelBuilder, StaticProbe, Arc<Recorder>>;

fn write_model(dir: &Path, name: &str, body: &str) {
  std::fs::write(dir.join(name), body).unwrap();
}

fn setup(body: &str, gpu: bool) -> (TempDir, Arc<Recorder>, Dispatcher) {
  let dir = tempfile::tempdir().unwrap();
  write_model(dir.path(), "color.json", body);
  let recorder = Arc::new(Recorder::default());
  let table = ModelTable::empty("color.json");
  let dispatcher = ClassificationDispatcher::new(
    LinearModelBuilder::default(),
    StaticProbe(gpu),
    recorder.clone(),
    dir.path(),
  )
  .with_model_table(table);
  (dir, recorder, dispatcher)
}

#[test]
fn engine_is_built_once_across_calls() {
  let (_dir, recorder, mut dispatcher) = setup(COLOR_MODEL, false);
  let frame = RgbFrame::filled(320, 240, [255, 0, 0]);

  for _ in 0..3 {
    let categories = dispatcher.classify(&frame, 0).unwrap().unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].label, "red");
    assert!(categories[0].score > 0.99);
  }
  assert_eq!(dispatcher.construction_attempts(), 1);
  assert!(dispatcher.is_engine_ready());
  assert_eq!(recorder.result_count(), 3);
  assert!(recorder.errors().is_empty());
}

#[test]
fn reconfiguring_with_same_values_gives_same_output() {
  let (_dir, _recorder, mut dispatcher) = setup(COLOR_MODEL, false);
  let frame = RgbFrame::filled(64, 64, [0, 200, 40]);
  let config = DispatcherConfig::default().score_threshold(0.0);

  dispatcher.configure(config.clone());
  let first = dispatcher.classify(&frame, 1).unwrap();
  dispatcher.configure(config.clone());
  dispatcher.configure(config);
  assert!(!dispatcher.is_engine_ready());
  let second = dispatcher.classify(&frame, 1).unwrap();

  assert_eq!(first, second);
  assert_eq!(dispatcher.construction_attempts(), 2);
}

#[test]
fn results_are_filtered_sorted_and_truncated() {
  let body = format!(
    r#"{{
      "labels": ["c", "a", "d", "b"],
      "weights": [[0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0]],
      "bias": [{}, {}, {}, {}]
    }}"#,
    2f32.ln(),
    4f32.ln(),
    1f32.ln(),
    3f32.ln()
  );
  let (_dir, recorder, mut dispatcher) = setup(&body, false);
  dispatcher.configure(DispatcherConfig::default().score_threshold(0.15).max_results(2));

  let frame = RgbFrame::filled(32, 32, [0, 0, 0]);
  let categories = dispatcher.classify(&frame, 0).unwrap().unwrap();

  let labels: Vec<&str> = categories.iter().map(|c| c.label.as_str()).collect();
  assert_eq!(labels, ["a", "b"]);
  assert!((categories[0].score - 0.4).abs() < 1e-4);
  assert!((categories[1].score - 0.3).abs() < 1e-4);
  assert!(categories.iter().all(|c| c.score >= 0.15));

  let results = recorder.results.lock().unwrap();
  assert_eq!(results[0].0[0].categories, categories);
}

#[test]
fn unsupported_gpu_falls_back_to_cpu() {
  let (_dir, recorder, mut dispatcher) = setup(COLOR_MODEL, false);
  dispatcher.configure(DispatcherConfig::default().backend(Backend::Gpu));

  let frame = RgbFrame::filled(16, 16, [0, 0, 255]);
  let categories = dispatcher.classify(&frame, 2).unwrap().unwrap();
  assert_eq!(categories[0].label, "blue");
  assert_eq!(dispatcher.engine().unwrap().backend(), Backend::Cpu);
  assert_eq!(recorder.errors(), ["GPU is not supported on this device"]);

  dispatcher.classify(&frame, 2).unwrap();
  assert_eq!(recorder.errors().len(), 1);
}

#[test]
fn supported_gpu_is_requested() {
  let (_dir, recorder, mut dispatcher) = setup(COLOR_MODEL, true);
  dispatcher.configure(DispatcherConfig::default().backend(Backend::Gpu));

  let frame = RgbFrame::filled(16, 16, [0, 0, 255]);
  dispatcher.classify(&frame, 0).unwrap().unwrap();
  assert_eq!(dispatcher.engine().unwrap().backend(), Backend::Gpu);
  assert!(recorder.errors().is_empty());
}

#[test]
fn region_follows_reference_point() {
  let (_dir, _recorder, mut dispatcher) = setup(COLOR_MODEL, false);
  let frame = RgbFrame::filled(224, 224, [255, 0, 0]);

  dispatcher.set_reference(50.0, 60.0);
  dispatcher.classify(&frame, 0).unwrap().unwrap();
  let first = dispatcher.current_region();

  dispatcher.set_reference(80.0, 20.0);
  dispatcher.classify(&frame, 0).unwrap().unwrap();
  let second = dispatcher.current_region();

  assert_eq!(second.left - first.left, 30.0);
  assert_eq!(second.right - first.right, 30.0);
  assert_eq!(second.top - first.top, -40.0);
  assert_eq!(second.bottom - first.bottom, -40.0);
  assert_eq!(second.width(), 224.0);
}

#[test]
fn malformed_model_is_retried_on_every_call() {
  let (dir, recorder, mut dispatcher) = setup("{ not json", false);
  let frame = RgbFrame::filled(16, 16, [255, 0, 0]);

  assert_eq!(dispatcher.classify(&frame, 0).unwrap(), None);
  assert_eq!(dispatcher.classify(&frame, 0).unwrap(), None);
  assert_eq!(dispatcher.construction_attempts(), 2);
  assert_eq!(recorder.errors(), [INIT_FAILED_MESSAGE, INIT_FAILED_MESSAGE]);
  assert_eq!(recorder.result_count(), 2);
  assert!(
    recorder
      .results
      .lock()
      .unwrap()
      .iter()
      .all(|(groups, _)| groups.is_empty())
  );

  write_model(dir.path(), "color.json", COLOR_MODEL);
  assert!(dispatcher.classify(&frame, 0).unwrap().is_some());
  assert!(dispatcher.classify(&frame, 0).unwrap().is_some());
  assert_eq!(dispatcher.construction_attempts(), 3);
}

#[test]
fn model_selection_resolves_artifact() {
  let (dir, _recorder, mut dispatcher) = setup(COLOR_MODEL, false);
  write_model(
    dir.path(),
    "inverted.json",
    r#"{ "labels": ["dark", "light"], "weights": [[-4, -4, -4], [4, 4, 4]] }"#,
  );
  dispatcher.set_model_table(
    ModelTable::empty("color.json").with_model(ModelId::EfficientNetV2, "inverted.json"),
  );
  dispatcher.configure(DispatcherConfig::default().model(ModelId::EfficientNetV2));

  let frame = RgbFrame::filled(16, 16, [250, 250, 250]);
  let categories = dispatcher.classify(&frame, 0).unwrap().unwrap();
  assert_eq!(categories[0].label, "light");
  assert_eq!(dispatcher.artifact_path(), dir.path().join("inverted.json"));

  dispatcher.configure(DispatcherConfig::default().model(ModelId::Other(9)));
  assert_eq!(dispatcher.artifact_path(), dir.path().join("color.json"));
}

#[test]
fn empty_frame_is_rejected_before_construction() {
  let (_dir, recorder, mut dispatcher) = setup(COLOR_MODEL, false);
  assert!(RgbFrame::new(0, 0, Vec::new()).is_err());
  let frame = RgbFrame::filled(0, 0, [0, 0, 0]);
  assert!(dispatcher.classify(&frame, 0).is_err());
  assert_eq!(dispatcher.construction_attempts(), 0);
  assert!(recorder.errors().is_empty());
}
