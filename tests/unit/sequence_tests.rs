use acquisition_rs::event::{AcquisitionEvent, AxisValue};
use acquisition_rs::sequencer::{MultiDSpec, SequenceError, multi_d_acquisition_events};
use serde_json::json;

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_names(events: &[AcquisitionEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| e.axes.get("channel").and_then(AxisValue::as_label))
            .map(str::to_string)
            .collect()
    }

    // --- Specs loaded from JSON ---

    #[test]
    fn test_json_spec_generates_full_product() {
        let spec = MultiDSpec::from_json_str(
            r#"{
                "num_time_points": 2,
                "time_interval_s": 1.5,
                "xy_positions": [[0.0, 0.0], [100.0, 50.0]],
                "channel_group": "Channel",
                "channels": ["DAPI", "FITC"],
                "channel_exposures_ms": [10.0, 20.0],
                "z_start": 0.0, "z_end": 1.0, "z_step": 0.5,
                "order": "tpcz"
            }"#,
        )
        .unwrap();

        let events = multi_d_acquisition_events(&spec).unwrap();
        assert_eq!(events.len(), 2 * 2 * 2 * 3);

        let last = events.last().unwrap();
        assert_eq!(last.axes.get("time"), Some(&AxisValue::Index(1)));
        assert_eq!(last.axes.get("position"), Some(&AxisValue::Index(1)));
        assert_eq!(last.axes.get("z"), Some(&AxisValue::Index(2)));
        assert_eq!(last.min_start_time, Some(1.5));
        assert_eq!((last.x, last.y, last.z), (Some(100.0), Some(50.0), Some(1.0)));
        assert_eq!(last.exposure, Some(20.0));
    }

    #[test]
    fn test_events_serialize_with_optional_fields_omitted() {
        let events = MultiDSpec::new()
            .channels("Channel", ["DAPI"])
            .generate()
            .unwrap();

        let value = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(
            value,
            json!({
                "axes": {"channel": "DAPI"},
                "config_group": ["Channel", "DAPI"]
            })
        );
    }

    #[test]
    fn test_order_changes_only_traversal() {
        let base = MultiDSpec::new()
            .time_points(2)
            .channels("Channel", ["DAPI", "FITC", "Cy5"]);

        let time_outer = base.clone().order("tc").generate().unwrap();
        let channel_outer = base.order("ct").generate().unwrap();

        assert_eq!(time_outer.len(), channel_outer.len());
        assert_eq!(
            channel_names(&time_outer),
            vec!["DAPI", "FITC", "Cy5", "DAPI", "FITC", "Cy5"]
        );
        assert_eq!(
            channel_names(&channel_outer),
            vec!["DAPI", "DAPI", "FITC", "FITC", "Cy5", "Cy5"]
        );
    }

    #[test]
    fn test_labelled_positions() {
        let events = MultiDSpec::new()
            .xy_positions(vec![[1.0, 2.0], [3.0, 4.0]])
            .position_labels(["well-A1", "well-A2"])
            .generate()
            .unwrap();

        assert_eq!(events[1].axes.get("position"), Some(&AxisValue::from("well-A2")));
        assert_eq!((events[1].x, events[1].y), (Some(3.0), Some(4.0)));
    }

    // --- Rejections ---

    #[test]
    fn test_invalid_specs_report_reason() {
        let conflicting = MultiDSpec::new()
            .xy_positions(vec![[0.0, 0.0]])
            .xyz_positions(vec![[0.0, 0.0, 0.0]]);
        assert_eq!(
            conflicting.generate().unwrap_err(),
            SequenceError::ConflictingPositions
        );

        let z_first = MultiDSpec::new().order("zp");
        assert!(matches!(
            z_first.generate(),
            Err(SequenceError::PositionAfterZ { .. })
        ));

        let intervals = MultiDSpec::new()
            .time_points(3)
            .time_interval(vec![1.0, 2.0]);
        let err = intervals.generate().unwrap_err();
        assert_eq!(
            err,
            SequenceError::TimeIntervalLength {
                expected: Some(3),
                actual: 2
            }
        );
        assert!(err.to_string().contains("num_time_points"));
    }
}
