use acquisition_rs::acquisition::{AcquisitionBuilder, LoopbackEngine};
use acquisition_rs::event::{
    AcqNotification, AxisValue, DeprecatedField, NotificationKind, ValidationError, validate_json,
};
use serde_json::json;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    // --- JSON submissions ---

    #[test]
    fn test_json_list_with_deprecated_fields() {
        let mut value = json!([
            {"axes": {"time": 0}, "row": 1, "col": 2},
            {"axes": {"time": 1}}
        ]);

        let (batch, warnings) = validate_json(&mut value).unwrap();

        assert_eq!(batch.len(), 2);
        let fields: Vec<DeprecatedField> = warnings.iter().map(|w| w.field).collect();
        assert_eq!(fields, vec![DeprecatedField::Row, DeprecatedField::Col]);
        assert_eq!(
            value[0],
            json!({"axes": {"time": 0, "row": 1, "column": 2}})
        );
        let first = batch.iter().next().unwrap();
        assert_eq!(first.axes.get("row"), Some(&AxisValue::Index(1)));
        assert_eq!(first.axes.get("column"), Some(&AxisValue::Index(2)));
    }

    #[test]
    fn test_warning_message_names_replacement_axis() {
        let mut value = json!({"axes": {}, "col": 3});
        let (_, warnings) = validate_json(&mut value).unwrap();

        let msg = warnings[0].to_string();
        assert!(msg.contains("'col'"), "unexpected warning: {msg}");
        assert!(msg.contains("'column'"), "unexpected warning: {msg}");
    }

    #[test]
    fn test_first_bad_member_is_reported() {
        let mut value = json!([{"axes": {}}, {"axes": {}}, {"z": 1.0}, "oops"]);
        let err = validate_json(&mut value).unwrap_err();

        assert_eq!(err, ValidationError::MissingAxes { index: 2 });
        assert_eq!(err.to_string(), "event at index 2 must contain an 'axes' key");
    }

    #[test]
    fn test_axes_must_be_a_dictionary_to_migrate() {
        let mut value = json!({"axes": 5, "row": 1});
        assert!(matches!(
            validate_json(&mut value),
            Err(ValidationError::Malformed { index: 0, .. })
        ));
    }

    // --- Validated events through an acquisition ---

    #[test]
    fn test_migrated_axes_reach_notifications() {
        let saved: Arc<Mutex<Vec<AcqNotification>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&saved);
        let acq = AcquisitionBuilder::new(Arc::new(LoopbackEngine::new()))
            .on_notification(move |n| {
                if n.kind == NotificationKind::ImageSaved {
                    sink.lock().unwrap().push(n.clone());
                }
            })
            .start()
            .unwrap();

        let mut value = json!({"axes": {"time": 0}, "row": "A"});
        let (batch, _) = validate_json(&mut value).unwrap();
        let future = acq.acquire(batch).unwrap();
        future.await_image_saved(None).unwrap();
        acq.finish().unwrap();

        let saved = saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        let axes = saved[0].axes.as_ref().unwrap();
        assert_eq!(axes.get("row"), Some(&AxisValue::from("A")));
        assert!(saved[0].dataset.is_some());
    }
}
