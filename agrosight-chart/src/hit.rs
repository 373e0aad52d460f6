//! Nearest-point hit testing for hover.

use std::cmp::Ordering;

use agrosight_common::{Sample, SeriesKey, TemperatureUnit};

use crate::formatting::{format_clock, format_reading};
use crate::plot::PlottedSeries;

/// Default hover radius in pixels.
pub const DEFAULT_HOVER_THRESHOLD: f64 = 8.0;

/// The plotted point closest to a pointer position.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub key: SeriesKey,
    pub sample: Sample,
    /// Position of the sample in its series buffer.
    pub index: usize,
    pub x: f64,
    pub y: f64,
    /// Euclidean pixel distance from the pointer.
    pub distance: f64,
}

impl Hit {
    /// Tooltip text, e.g. `"s1 temperature: 21.5°C at 10:30"`.
    pub fn describe(&self, unit: TemperatureUnit) -> String {
        format!(
            "{} {}: {} at {}",
            self.key.entity_id,
            self.key.metric,
            format_reading(self.key.metric, self.sample.value, unit),
            format_clock(self.sample.timestamp)
        )
    }
}

/// Find the plotted point nearest to `(px, py)` within `max_distance` pixels.
///
/// On equal distances the first point wins, in series order then buffer order.
pub fn find_nearest(
    series: &[PlottedSeries],
    px: f64,
    py: f64,
    max_distance: f64,
) -> Option<Hit> {
    let mut best: Option<Hit> = None;

    for plotted in series {
        for point in &plotted.points {
            let x = f64::from(point.x);
            let y = f64::from(point.y);
            let distance = (x - px).hypot(y - py);

            // A NaN distance never matches.
            if distance.partial_cmp(&max_distance).is_none_or(Ordering::is_gt) {
                continue;
            }
            if best.as_ref().is_some_and(|b| distance >= b.distance) {
                continue;
            }

            best = Some(Hit {
                key: plotted.key.clone(),
                sample: point.sample,
                index: point.index,
                x,
                y,
                distance,
            });
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::PlottedPoint;

    fn series(id: &str, points: &[(i32, i32)]) -> PlottedSeries {
        PlottedSeries {
            key: SeriesKey::temperature(id),
            points: points
                .iter()
                .enumerate()
                .map(|(index, &(x, y))| PlottedPoint {
                    x,
                    y,
                    index,
                    sample: Sample::new(index as i64, f64::from(y)),
                })
                .collect(),
        }
    }

    #[test]
    fn test_nothing_within_threshold() {
        let plotted = vec![series("a", &[(0, 0), (100, 100)])];
        assert!(find_nearest(&plotted, 50.0, 50.0, DEFAULT_HOVER_THRESHOLD).is_none());
        assert!(find_nearest(&[], 0.0, 0.0, DEFAULT_HOVER_THRESHOLD).is_none());
    }

    #[test]
    fn test_single_point_within_threshold() {
        let plotted = vec![series("a", &[(0, 0), (100, 100), (200, 50)])];
        let hit = find_nearest(&plotted, 103.0, 104.0, DEFAULT_HOVER_THRESHOLD).unwrap();

        assert_eq!(hit.index, 1);
        assert_eq!((hit.x, hit.y), (100.0, 100.0));
        assert_eq!(hit.distance, 5.0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let plotted = vec![series("a", &[(8, 0)])];
        assert!(find_nearest(&plotted, 0.0, 0.0, 8.0).is_some());
        assert!(find_nearest(&plotted, 0.0, 0.0, 7.99).is_none());
    }

    #[test]
    fn test_nan_pointer_never_hits() {
        let plotted = vec![series("a", &[(0, 0), (5, 5)])];
        assert!(find_nearest(&plotted, f64::NAN, 0.0, DEFAULT_HOVER_THRESHOLD).is_none());
        assert!(find_nearest(&plotted, 0.0, f64::NAN, DEFAULT_HOVER_THRESHOLD).is_none());
        assert!(find_nearest(&plotted, 0.0, 0.0, f64::NAN).is_none());
    }

    #[test]
    fn test_describe_hit() {
        let hit = Hit {
            key: SeriesKey::humidity("gh-2"),
            sample: Sample::new(37_800_000, 55.0),
            index: 0,
            x: 0.0,
            y: 0.0,
            distance: 0.0,
        };
        assert_eq!(
            hit.describe(TemperatureUnit::Celsius),
            "gh-2 humidity: 55.0% at 10:30"
        );

        let hit = Hit {
            key: SeriesKey::temperature("s1"),
            sample: Sample::new(0, 20.0),
            ..hit
        };
        assert_eq!(
            hit.describe(TemperatureUnit::Fahrenheit),
            "s1 temperature: 68.0°F at 00:00"
        );
    }

    #[test]
    fn test_closest_across_series() {
        let plotted = vec![series("a", &[(10, 10)]), series("b", &[(12, 10)])];
        let hit = find_nearest(&plotted, 12.0, 11.0, DEFAULT_HOVER_THRESHOLD).unwrap();
        assert_eq!(hit.key, SeriesKey::temperature("b"));
    }

    #[test]
    fn test_tie_goes_to_first() {
        let plotted = vec![series("a", &[(0, 0), (10, 0)]), series("b", &[(5, 5)])];

        let hit = find_nearest(&plotted, 5.0, 0.0, DEFAULT_HOVER_THRESHOLD).unwrap();
        assert_eq!(hit.key, SeriesKey::temperature("a"));
        assert_eq!(hit.index, 0);
    }
}
