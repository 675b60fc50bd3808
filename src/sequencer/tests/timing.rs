/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Tests for time point scheduling.

#[cfg(test)]
mod tests {
    use crate::sequencer::{MultiDSpec, generate};

    fn start_times(spec: &MultiDSpec) -> Vec<Option<f64>> {
        generate(spec)
            .unwrap()
            .iter()
            .map(|e| e.min_start_time)
            .collect()
    }

    #[test]
    fn test_interval_list_is_cumulative() {
        let spec = MultiDSpec::new()
            .time_points(3)
            .time_interval(vec![5.0, 2.0, 3.0]);
        assert_eq!(start_times(&spec), vec![Some(5.0), Some(7.0), Some(10.0)]);
    }

    #[test]
    fn test_fixed_interval_scales_with_index() {
        let spec = MultiDSpec::new().time_points(3).time_interval(2.5);
        assert_eq!(start_times(&spec), vec![Some(0.0), Some(2.5), Some(5.0)]);
    }

    #[test]
    fn test_zero_interval_omits_start_time() {
        let spec = MultiDSpec::new().time_points(4);
        assert_eq!(start_times(&spec), vec![None; 4]);
    }

    #[test]
    fn test_zero_time_points_disables_axis() {
        let spec = MultiDSpec::new()
            .time_points(0)
            .channels("Channel", ["DAPI"]);
        let events = generate(&spec).unwrap();
        assert_eq!(events.len(), 1);
        assert!(!events[0].axes.contains("time"));
    }

    #[test]
    fn test_start_time_shared_by_inner_axes() {
        let spec = MultiDSpec::new()
            .time_points(2)
            .time_interval(10.0)
            .channels("Channel", ["DAPI", "FITC"])
            .order("tc");
        assert_eq!(
            start_times(&spec),
            vec![Some(0.0), Some(0.0), Some(10.0), Some(10.0)]
        );
    }
}
