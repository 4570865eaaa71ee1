use super::{CheckInSignal, FeedbackSignal, RiskSignal};

const NEUTRAL_SCORE: f64 = 0.7;
const FLAGGED_ISSUE_PENALTY: f64 = 0.1;
const MAX_FLAGGED_PENALTY: f64 = 0.3;
const CONFIDENCE_DROP_PENALTY: f64 = 0.15;
const MAX_RISK_PENALTY: f64 = 0.8;
const MIN_RISK_SCORE: f64 = 0.2;

/// Maps a 1-5 rating average onto `[0, 1]`.
fn normalize_rating(average: f64) -> f64 {
    (average - 1.0) / 4.0
}

fn mean(values: impl Iterator<Item = f64>, count: usize) -> f64 {
    values.sum::<f64>() / count as f64
}

/// Client satisfaction in `[0, 1]`, neutral when no feedback has arrived yet.
pub fn client_satisfaction(feedback: &[FeedbackSignal]) -> f64 {
    if feedback.is_empty() {
        return NEUTRAL_SCORE;
    }

    let count = feedback.len();
    let avg_satisfaction = mean(
        feedback.iter().map(|entry| f64::from(entry.satisfaction_rating)),
        count,
    );
    let avg_communication = mean(
        feedback.iter().map(|entry| f64::from(entry.communication_rating)),
        count,
    );
    let normalized = normalize_rating((avg_satisfaction + avg_communication) / 2.0);

    let flagged = feedback.iter().filter(|entry| entry.issue_flagged).count();
    let penalty = (flagged as f64 * FLAGGED_ISSUE_PENALTY).min(MAX_FLAGGED_PENALTY);

    (normalized - penalty).max(0.0)
}

/// Employee confidence in `[0, 1]`, neutral when no check-ins exist.
///
/// The trend check reads the last two entries of the supplied list. Because the window is
/// newest-first, that pair is the two *oldest* check-ins in the window, read as older then
/// newer. This ordering is kept as-is until product confirms the intended comparison.
pub fn employee_confidence(check_ins: &[CheckInSignal]) -> f64 {
    if check_ins.is_empty() {
        return NEUTRAL_SCORE;
    }

    let avg_confidence = mean(
        check_ins.iter().map(|entry| f64::from(entry.confidence_level)),
        check_ins.len(),
    );
    let normalized = normalize_rating(avg_confidence);

    if let [.., older, newer] = check_ins {
        if f64::from(newer.confidence_level) < f64::from(older.confidence_level) - 1.0 {
            return (normalized - CONFIDENCE_DROP_PENALTY).max(0.0);
        }
    }

    normalized
}

/// Risk factor in `[0.2, 1]` from the severities of open risks.
pub fn risk_factor(open_risks: &[RiskSignal]) -> f64 {
    if open_risks.is_empty() {
        return 1.0;
    }

    let penalty = open_risks
        .iter()
        .fold(0.0, |total, risk| total + risk.severity.penalty())
        .min(MAX_RISK_PENALTY);

    (1.0 - penalty).max(MIN_RISK_SCORE)
}
