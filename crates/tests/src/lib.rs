//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 参数表生成与读回
//! - 模拟 e2e 录制测试（无需 CARLA）
//! - 续录、覆盖与中断行为

#[cfg(test)]
mod table_tests {
    use scenario_loader::{GeneratorConfig, RowRange, ScenarioTable};

    #[test]
    fn generated_table_survives_a_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.csv");

        let table = ScenarioTable::generate(&GeneratorConfig::default()).unwrap();
        table.write_to_path(&path).unwrap();
        let loaded = ScenarioTable::load_from_path(&path).unwrap();

        assert_eq!(loaded.rows(), table.rows());
        let rows = loaded.select(RowRange::new(8, 14)).unwrap();
        assert_eq!(rows.len(), 7);
        assert!(rows.iter().all(|r| r.split == "test"));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use actor_factory::{MockConfig, MockSimulator, SimulatorClient};
    use contracts::{CameraModality, ScenarioParams, WorldSettings};
    use dispatcher::sample_info;
    use scenario_loader::{row_hash, GeneratorConfig, ScenarioTable};
    use scene_recorder::{sample_dir, CliError, Recorder, RecorderConfig};
    use tokio::sync::watch;

    const FPS: u32 = 10;

    /// Two one-second samples with 8x8 cameras
    fn rows() -> Vec<ScenarioParams> {
        let config = GeneratorConfig {
            splits: vec![("val".to_string(), 2)],
            maps: vec!["Town01_Opt".to_string(), "Town02_Opt".to_string()],
            fps: FPS,
            duration: 1,
            img_size: 8,
            ..GeneratorConfig::default()
        };
        ScenarioTable::generate(&config).unwrap().rows().to_vec()
    }

    fn recorder_config(root: &Path) -> RecorderConfig {
        let mut config = RecorderConfig::new(root);
        config.warmup_seconds = 0;
        config.sensor_timeout = Duration::from_secs(2);
        config
    }

    fn simulator() -> Arc<MockSimulator> {
        Arc::new(MockSimulator::connected(MockConfig::default()))
    }

    fn count_files(dir: &Path, ext: &str) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == ext))
            .count()
    }

    /// End-to-end: MockSimulator -> SyncWorld -> Dispatcher -> dataset on disk
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_mock_recording() {
        let dir = tempfile::tempdir().unwrap();
        let rows = rows();
        let sim = simulator();

        let mut recorder = Recorder::new(Arc::clone(&sim), recorder_config(dir.path()));
        let stats = recorder.run(&rows).await.unwrap().clone();

        assert_eq!(stats.samples_recorded, 2);
        assert_eq!(stats.samples_failed, 0);
        assert_eq!(stats.frames_written, 2 * u64::from(FPS));
        assert_eq!(stats.ticks, 2 * u64::from(FPS));

        for params in &rows {
            let sample = sample_dir(dir.path(), params);
            assert!(sample.ends_with(format!("val/{}/{}", params.map, params.hash)));

            for modality in CameraModality::RIG {
                let images = sample.join(modality.dir_name());
                assert_eq!(count_files(&images, "png"), FPS as usize, "{modality}");
            }
            assert_eq!(count_files(&sample.join("actors"), "csv"), FPS as usize);

            let mut frame_info = csv::Reader::from_path(sample.join("frame_info.csv")).unwrap();
            let header: Vec<_> = frame_info.headers().unwrap().iter().collect();
            assert_eq!(header, ["frame", "traffic_light", "speed_limit", "speed"]);
            let frames: Vec<u64> = frame_info
                .records()
                .map(|r| r.unwrap()[0].parse().unwrap())
                .collect();
            assert_eq!(frames.len(), FPS as usize);
            assert!(frames.windows(2).all(|w| w[1] == w[0] + 1));

            // Every frame has a png per camera named after it
            let rgb = sample.join("rgb").join(format!("{:08}.png", frames[0]));
            assert!(rgb.is_file());

            assert!(sample_info::is_finished(&sample));
            let info = sample_info::read(&sample).unwrap();
            assert!(info.contains_key("time"));
            assert_eq!(info["_hash"], serde_yaml::Value::from(params.hash.clone()));
            assert_eq!(info["map_name"], serde_yaml::Value::from(params.map.clone()));
        }

        // Session teardown leaves nothing behind
        assert_eq!(sim.actor_count(), 0);
        // Original (asynchronous) settings restored
        assert_eq!(sim.world_settings().await.unwrap(), WorldSettings::default());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn finished_samples_are_skipped_on_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let rows = rows();

        Recorder::new(simulator(), recorder_config(dir.path()))
            .run(&rows)
            .await
            .unwrap();
        let info_before = fs::read_to_string(sample_info::finished_path(&sample_dir(dir.path(), &rows[0]))).unwrap();

        let mut rerun = Recorder::new(simulator(), recorder_config(dir.path()));
        let stats = rerun.run(&rows).await.unwrap();
        assert_eq!(stats.samples_skipped, 2);
        assert_eq!(stats.samples_recorded, 0);
        assert_eq!(stats.frames_written, 0);

        let info_after = fs::read_to_string(sample_info::finished_path(&sample_dir(dir.path(), &rows[0]))).unwrap();
        assert_eq!(info_before, info_after);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn partial_sample_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let rows = rows();
        let sample = sample_dir(dir.path(), &rows[0]);

        // Leftover of an interrupted run
        fs::create_dir_all(sample.join("rgb")).unwrap();
        fs::write(sample.join("rgb/99999999.png"), b"junk").unwrap();
        fs::write(sample_info::pending_path(&sample), "split: val\n").unwrap();

        let mut recorder = Recorder::new(simulator(), recorder_config(dir.path()));
        let stats = recorder.run(&rows[..1]).await.unwrap();

        assert_eq!(stats.samples_recorded, 1);
        assert!(!sample.join("rgb/99999999.png").exists());
        assert!(!sample_info::pending_path(&sample).exists());
        assert!(sample_info::is_finished(&sample));
        assert_eq!(count_files(&sample.join("rgb"), "png"), FPS as usize);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failed_row_does_not_stop_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut rows = rows();
        rows[0].map = "Town99".to_string();
        rows[0].hash = row_hash(&rows[0]);

        let sim = simulator();
        let mut recorder = Recorder::new(Arc::clone(&sim), recorder_config(dir.path()));
        let stats = recorder.run(&rows).await.unwrap();

        assert_eq!(stats.samples_failed, 1);
        assert_eq!(stats.samples_recorded, 1);
        assert!(!sample_info::is_finished(&sample_dir(dir.path(), &rows[0])));
        assert!(sample_info::is_finished(&sample_dir(dir.path(), &rows[1])));
        assert_eq!(sim.actor_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn silent_camera_fails_the_sample() {
        let dir = tempfile::tempdir().unwrap();
        let rows = rows();
        let sim = Arc::new(MockSimulator::connected(MockConfig {
            silent_cameras: vec![CameraModality::OpticalFlow],
            ..MockConfig::default()
        }));

        let mut config = recorder_config(dir.path());
        config.sensor_timeout = Duration::from_millis(100);
        let mut recorder = Recorder::new(Arc::clone(&sim), config);
        let stats = recorder.run(&rows[..1]).await.unwrap();

        assert_eq!(stats.samples_failed, 1);
        assert!(!sample_info::is_finished(&sample_dir(dir.path(), &rows[0])));
        assert_eq!(sim.actor_count(), 0);
        assert_eq!(sim.world_settings().await.unwrap(), WorldSettings::default());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancelled_run_restores_settings() {
        let dir = tempfile::tempdir().unwrap();
        let rows = rows();
        let sim = simulator();

        let (cancel_tx, cancel_rx) = watch::channel(false);
        cancel_tx.send(true).unwrap();

        let mut recorder = Recorder::new(Arc::clone(&sim), recorder_config(dir.path())).with_cancel(cancel_rx);
        let result = recorder.run(&rows).await;

        assert!(matches!(result, Err(CliError::Interrupted)));
        assert_eq!(recorder.stats().samples_total(), 0);
        assert_eq!(sim.world_settings().await.unwrap(), WorldSettings::default());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn duration_override_and_warmup() {
        let dir = tempfile::tempdir().unwrap();
        let mut rows = rows();
        rows.truncate(1);
        rows[0].duration = 300;

        let mut config = recorder_config(dir.path());
        config.duration_override = Some(1);
        config.warmup_seconds = 1;
        let mut recorder = Recorder::new(simulator(), config);
        let stats = recorder.run(&rows).await.unwrap();

        assert_eq!(stats.ticks, 2 * u64::from(FPS));
        assert_eq!(stats.frames_written, u64::from(FPS));

        let info = sample_info::read(&sample_dir(dir.path(), &rows[0])).unwrap();
        assert_eq!(info["duration"], serde_yaml::Value::from(1));
    }
}
