/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Tests for notification fan-out and dispatcher termination.

#[cfg(test)]
mod tests {
    use crate::acquisition::tests::support::time_axes;
    use crate::acquisition::{
        AcquisitionError, AcquisitionFuture, DispatchEnd, FutureRegistry, NotificationDispatcher,
        WaitOutcome,
    };
    use crate::event::{AcqNotification, NotificationKind};
    use crossbeam::channel;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn dispatcher(
        capacity: usize,
    ) -> (
        channel::Sender<AcqNotification>,
        Arc<FutureRegistry>,
        NotificationDispatcher,
    ) {
        let (tx, rx) = channel::bounded(capacity);
        let registry = Arc::new(FutureRegistry::new());
        let dispatcher = NotificationDispatcher::new(rx, Arc::clone(&registry));
        (tx, registry, dispatcher)
    }

    fn recorder(dispatcher: &mut NotificationDispatcher) -> Arc<Mutex<Vec<NotificationKind>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        dispatcher.add_listener(move |n| sink.lock().unwrap().push(n.kind));
        seen
    }

    #[test]
    fn test_stops_after_both_sentinels_events_first() {
        let (tx, _registry, mut dispatcher) = dispatcher(16);
        let seen = recorder(&mut dispatcher);

        tx.send(AcqNotification::global(NotificationKind::AcqStarted)).unwrap();
        tx.send(AcqNotification::events_finished()).unwrap();
        tx.send(AcqNotification::data_sink_finished()).unwrap();
        tx.send(AcqNotification::global(NotificationKind::AcqStarted)).unwrap();

        let summary = dispatcher.run();
        assert_eq!(summary.end, DispatchEnd::Sentinels);
        assert_eq!(summary.dispatched, 3);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                NotificationKind::AcqStarted,
                NotificationKind::AcqEventsFinished,
                NotificationKind::DataSinkFinished,
            ]
        );
        assert_eq!(tx.len(), 1);
    }

    #[test]
    fn test_stops_after_both_sentinels_sink_first() {
        let (tx, _registry, dispatcher) = dispatcher(16);

        tx.send(AcqNotification::data_sink_finished()).unwrap();
        tx.send(AcqNotification::events_finished()).unwrap();

        let summary = dispatcher.run();
        assert_eq!(summary.end, DispatchEnd::Sentinels);
        assert_eq!(summary.dispatched, 2);
    }

    #[test]
    fn test_single_sentinel_does_not_stop() {
        let (tx, _registry, mut dispatcher) = dispatcher(16);
        let seen = recorder(&mut dispatcher);

        tx.send(AcqNotification::events_finished()).unwrap();
        tx.send(AcqNotification::for_axes(
            NotificationKind::ImageSaved,
            time_axes(0),
        ))
        .unwrap();
        drop(tx);

        let summary = dispatcher.run();
        assert_eq!(summary.end, DispatchEnd::Disconnected);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_disconnect_ends_loop() {
        let (tx, _registry, dispatcher) = dispatcher(4);
        drop(tx);

        let summary = dispatcher.run();
        assert_eq!(summary.end, DispatchEnd::Disconnected);
        assert_eq!(summary.dispatched, 0);
    }

    #[test]
    fn test_listeners_called_in_registration_order() {
        let (tx, _registry, mut dispatcher) = dispatcher(4);
        let order = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            dispatcher.add_listener(move |_| order.lock().unwrap().push(name));
        }

        tx.send(AcqNotification::events_finished()).unwrap();
        tx.send(AcqNotification::data_sink_finished()).unwrap();
        dispatcher.run();

        assert_eq!(
            *order.lock().unwrap(),
            vec!["first", "second", "third", "first", "second", "third"]
        );
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let (tx, _registry, mut dispatcher) = dispatcher(8);
        dispatcher.add_listener(|n| {
            if n.kind == NotificationKind::AcqStarted {
                panic!("listener bug");
            }
        });
        let seen = recorder(&mut dispatcher);

        tx.send(AcqNotification::global(NotificationKind::AcqStarted)).unwrap();
        tx.send(AcqNotification::events_finished()).unwrap();
        tx.send(AcqNotification::data_sink_finished()).unwrap();

        let summary = dispatcher.run();
        assert_eq!(summary.end, DispatchEnd::Sentinels);
        assert_eq!(summary.listener_failures, 1);
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_futures_see_notification_before_listeners() {
        let (tx, registry, mut dispatcher) = dispatcher(8);
        let future = Arc::new(AcquisitionFuture::register(&registry, vec![time_axes(0)]));

        let observed = Arc::new(Mutex::new(None));
        {
            let future = Arc::clone(&future);
            let observed = Arc::clone(&observed);
            dispatcher.add_listener(move |n| {
                if n.kind == NotificationKind::EventFinished {
                    *observed.lock().unwrap() =
                        Some(future.has_reached(NotificationKind::EventFinished));
                }
            });
        }

        tx.send(AcqNotification::for_axes(
            NotificationKind::EventFinished,
            time_axes(0),
        ))
        .unwrap();
        tx.send(AcqNotification::events_finished()).unwrap();
        tx.send(AcqNotification::data_sink_finished()).unwrap();
        dispatcher.run();

        assert_eq!(*observed.lock().unwrap(), Some(true));
    }

    #[test]
    fn test_exit_closes_pending_futures() {
        let (tx, registry, dispatcher) = dispatcher(4);
        let future = AcquisitionFuture::register(&registry, vec![time_axes(0)]);

        tx.send(AcqNotification::events_finished()).unwrap();
        tx.send(AcqNotification::data_sink_finished()).unwrap();
        dispatcher.run();

        let outcome = future.await_image_saved(Some(Duration::from_secs(1)));
        assert_eq!(outcome.unwrap(), WaitOutcome::AcquisitionEnded);
    }

    #[test]
    fn test_disconnect_fails_pending_futures() {
        let (tx, registry, dispatcher) = dispatcher(4);
        let future = AcquisitionFuture::register(&registry, vec![time_axes(0)]);

        tx.send(AcqNotification::events_finished()).unwrap();
        drop(tx);
        assert_eq!(dispatcher.run().end, DispatchEnd::Disconnected);

        let outcome = future.await_image_saved(Some(Duration::from_secs(1)));
        assert!(matches!(outcome, Err(AcquisitionError::EngineDisconnected)));
    }

    #[test]
    fn test_spawned_dispatcher_reports_summary() {
        let (tx, _registry, dispatcher) = dispatcher(4);
        let (done_tx, done_rx) = channel::bounded(1);

        let handle = dispatcher
            .spawn(move |summary| done_tx.send(summary).unwrap())
            .unwrap();
        assert_eq!(
            handle.thread().name(),
            Some(crate::acquisition::DISPATCHER_THREAD_NAME)
        );

        tx.send(AcqNotification::data_sink_finished()).unwrap();
        tx.send(AcqNotification::events_finished()).unwrap();

        let summary = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(summary.end, DispatchEnd::Sentinels);
        handle.join().unwrap();
    }
}
