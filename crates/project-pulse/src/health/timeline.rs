use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

use super::{CheckInSignal, ProjectWindow};

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Percentage of the schedule that has elapsed at `now`, clamped to `[0, 100]`.
///
/// A window whose end does not follow its start has no duration to divide by; it counts as
/// fully elapsed once the start has passed and not started before that.
pub(crate) fn expected_progress(window: &ProjectWindow, now: DateTime<Utc>) -> f64 {
    let start = start_of_day(window.start_date);
    let end = start_of_day(window.end_date);

    let total_ms = (end - start).num_milliseconds();
    if total_ms <= 0 {
        return if now >= start { 100.0 } else { 0.0 };
    }

    let elapsed_ms = (now - start).num_milliseconds();
    (elapsed_ms as f64 / total_ms as f64 * 100.0).clamp(0.0, 100.0)
}

/// Timeline progress in `[0.4, 1]`, bucketed by actual versus expected completion.
///
/// Actual completion comes from the final entry of the newest-first window, which is the
/// oldest check-in it holds.
pub fn timeline_progress(
    window: &ProjectWindow,
    check_ins: &[CheckInSignal],
    now: DateTime<Utc>,
) -> f64 {
    let expected = expected_progress(window, now);
    let actual = check_ins
        .last()
        .map(|entry| entry.completion_percentage)
        .unwrap_or(0.0);

    if expected == 0.0 {
        return 1.0;
    }

    let ratio = actual / expected;
    if ratio >= 0.95 {
        1.0
    } else if ratio >= 0.8 {
        0.8
    } else if ratio >= 0.6 {
        0.6
    } else {
        0.4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn window(start: NaiveDate, end: NaiveDate) -> ProjectWindow {
        ProjectWindow {
            start_date: start,
            end_date: end,
        }
    }

    fn progress(values: &[f64]) -> Vec<CheckInSignal> {
        values
            .iter()
            .map(|value| CheckInSignal {
                confidence_level: 3,
                completion_percentage: *value,
                created_at: start_of_day(date(2025, 1, 1)),
            })
            .collect()
    }

    #[test]
    fn expected_progress_tracks_elapsed_share() {
        let window = window(date(2025, 1, 1), date(2025, 1, 11));
        let now = start_of_day(date(2025, 1, 6));
        assert_eq!(expected_progress(&window, now), 50.0);
    }

    #[test]
    fn expected_progress_clamps_outside_the_window() {
        let window = window(date(2025, 1, 1), date(2025, 1, 11));
        assert_eq!(
            expected_progress(&window, start_of_day(date(2024, 12, 1))),
            0.0
        );
        assert_eq!(
            expected_progress(&window, start_of_day(date(2025, 3, 1))),
            100.0
        );
    }

    #[test]
    fn zero_length_window_is_guarded() {
        let day = date(2025, 2, 1);
        let window = window(day, day);

        assert_eq!(expected_progress(&window, start_of_day(day)), 100.0);
        assert_eq!(
            expected_progress(&window, start_of_day(day) - Duration::hours(1)),
            0.0
        );

        let score = timeline_progress(&window, &progress(&[50.0]), start_of_day(day));
        assert_eq!(score, 0.4);
        assert!(score.is_finite());
    }

    #[test]
    fn inverted_window_is_treated_like_zero_length() {
        let window = window(date(2025, 2, 10), date(2025, 2, 1));
        assert_eq!(
            expected_progress(&window, start_of_day(date(2025, 2, 11))),
            100.0
        );
        assert_eq!(
            expected_progress(&window, start_of_day(date(2025, 2, 5))),
            0.0
        );
    }

    #[test]
    fn unstarted_project_scores_full_marks() {
        let window = window(date(2025, 6, 1), date(2025, 9, 1));
        let now = start_of_day(date(2025, 5, 1));
        assert_eq!(timeline_progress(&window, &[], now), 1.0);
    }

    #[test]
    fn ratio_thresholds_map_to_bands() {
        let window = window(date(2025, 1, 1), date(2025, 1, 11));
        let now = start_of_day(date(2025, 1, 6));

        assert_eq!(timeline_progress(&window, &progress(&[47.5]), now), 1.0);
        assert_eq!(timeline_progress(&window, &progress(&[47.0]), now), 0.8);
        assert_eq!(timeline_progress(&window, &progress(&[40.0]), now), 0.8);
        assert_eq!(timeline_progress(&window, &progress(&[30.0]), now), 0.6);
        assert_eq!(timeline_progress(&window, &progress(&[29.0]), now), 0.4);
        assert_eq!(timeline_progress(&window, &[], now), 0.4);
    }

    #[test]
    fn actual_progress_comes_from_final_window_entry() {
        let window = window(date(2025, 1, 1), date(2025, 1, 11));
        let now = start_of_day(date(2025, 1, 6));

        // Newest entry reports 60% but the final (oldest) entry reports 10%.
        assert_eq!(timeline_progress(&window, &progress(&[60.0, 10.0]), now), 0.4);
        assert_eq!(timeline_progress(&window, &progress(&[10.0, 60.0]), now), 1.0);
    }
}
