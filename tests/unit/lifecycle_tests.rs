use acquisition_rs::acquisition::{
    AcquisitionBuilder, AcquisitionEngine, AcquisitionError, AcquisitionHandle, EngineError,
    EngineLink, EventMessage, Phase, WaitOutcome,
};
use acquisition_rs::config::AcquisitionConfig;
use acquisition_rs::event::{AcqNotification, NotificationKind};
use acquisition_rs::sequencer::MultiDSpec;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Engine that reports the data sink as finished before the event stream.
#[derive(Default)]
struct SinkFirstEngine {
    executed: Arc<AtomicUsize>,
    finished: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AcquisitionEngine for SinkFirstEngine {
    fn start(&self, link: EngineLink) -> Result<(), EngineError> {
        let executed = Arc::clone(&self.executed);
        let finished = Arc::clone(&self.finished);
        let handle = thread::spawn(move || {
            let dataset = link.dataset();
            for message in link.events.iter() {
                let EventMessage::Batch(events) = message else {
                    break;
                };
                for event in events {
                    link.notifications
                        .send(AcqNotification::for_axes(
                            NotificationKind::EventFinished,
                            event.axes.clone(),
                        ))
                        .ok();
                    link.notifications
                        .send(AcqNotification::image_saved(event.axes, dataset.clone()))
                        .ok();
                    executed.fetch_add(1, Ordering::SeqCst);
                }
            }
            finished.store(true, Ordering::SeqCst);
            link.notifications
                .send(AcqNotification::data_sink_finished())
                .ok();
            link.notifications
                .send(AcqNotification::events_finished())
                .ok();
        });
        *self.worker.lock().unwrap() = Some(handle);
        Ok(())
    }

    fn are_events_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn abort(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    }

    // --- External engines ---

    #[test]
    fn test_external_engine_with_reversed_sentinels() {
        init_tracing();
        let engine = Arc::new(SinkFirstEngine::default());
        let mut config = AcquisitionConfig::named("reversed");
        config.debug = true;

        let acq = AcquisitionBuilder::new(engine.clone())
            .config(config)
            .start()
            .unwrap();
        let events = MultiDSpec::new()
            .time_points(3)
            .z_stack(0.0, 1.0, 1.0)
            .generate()
            .unwrap();
        let future = acq.acquire(events).unwrap();

        assert_eq!(
            future
                .await_image_saved(Some(Duration::from_secs(5)))
                .unwrap(),
            WaitOutcome::Reached
        );
        acq.mark_finished();
        acq.await_completion().unwrap();

        assert_eq!(acq.phase(), Phase::Terminated);
        assert_eq!(engine.executed.load(Ordering::SeqCst), 6);
        assert_eq!(
            acq.dataset().map(|d| d.0),
            Some("memory://reversed".to_string())
        );
    }

    #[test]
    fn test_late_submission_after_engine_finished() {
        let engine = Arc::new(SinkFirstEngine::default());
        let acq = AcquisitionBuilder::new(engine.clone()).start().unwrap();

        acq.mark_finished();
        acq.await_completion().unwrap();
        assert!(engine.are_events_finished());

        let events = MultiDSpec::new().time_points(1).generate().unwrap();
        assert!(matches!(
            acq.acquire(events),
            Err(AcquisitionError::AlreadyComplete)
        ));
    }

    #[test]
    fn test_configuration_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acq.json");
        std::fs::write(
            &path,
            r#"{"name": "from-file", "notification_capacity": 8, "viewer": "napari"}"#,
        )
        .unwrap();

        let config = AcquisitionConfig::from_file(&path).unwrap();
        let acq = AcquisitionBuilder::new(Arc::new(SinkFirstEngine::default()))
            .config(config)
            .start()
            .unwrap();

        assert_eq!(acq.config().notification_capacity, 8);
        assert_eq!(acq.viewer(), Some("napari"));
        acq.finish().unwrap();
    }
}
