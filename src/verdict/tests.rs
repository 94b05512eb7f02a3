use super::*;
use crate::fusion::{BranchDetail, FusedResult, FusedScore};

fn detail(branch: &str, mean: f64) -> BranchDetail {
    BranchDetail {
        branch: branch.to_string(),
        mean,
        max: mean,
        min: mean,
        samples_scored: 1,
        failures: 0,
    }
}

#[test]
fn test_rich_thresholds() {
    let cases = [
        (60.0, 70.0, Verdict::Fake, RiskTier::Critical, DisplayHint::Red),
        (30.0, 90.0, Verdict::Suspicious, RiskTier::High, DisplayHint::Orange),
        (30.0, 60.0, Verdict::Uncertain, RiskTier::Moderate, DisplayHint::Orange),
        (10.0, 20.0, Verdict::Authentic, RiskTier::Low, DisplayHint::Green),
    ];
    for (avg, max, verdict, risk, hint) in cases {
        let got = classify_rich(avg, max);
        assert_eq!(got.verdict, verdict, "avg={avg} max={max}");
        assert_eq!(got.risk, risk);
        assert_eq!(got.hint, hint);
    }
}

#[test]
fn test_rich_boundaries_fall_through() {
    // avg == 50 is not FAKE; max 80 is not SUSPICIOUS.
    assert_eq!(classify_rich(50.0, 80.0).verdict, Verdict::Uncertain);
    // max == 50 is not UNCERTAIN.
    assert_eq!(classify_rich(10.0, 50.0).verdict, Verdict::Authentic);
    assert_eq!(classify_rich(50.0001, 0.0).verdict, Verdict::Fake);
    assert_eq!(classify_rich(0.0, 80.0001).verdict, Verdict::Suspicious);
}

#[test]
fn test_rich_is_pure() {
    let first = classify_rich(42.5, 81.0);
    for _ in 0..10 {
        assert_eq!(classify_rich(42.5, 81.0), first);
    }
}

#[test]
fn test_binary_threshold() {
    assert_eq!(classify_binary(0.51), Verdict::Fake);
    assert_eq!(classify_binary(0.5), Verdict::Real);
    assert_eq!(classify_binary(0.0), Verdict::Real);
}

#[test]
fn test_classifier_scenario_a() {
    let fused = FusedResult {
        score: FusedScore::MeanMax {
            mean: 0.3,
            max: 0.9,
        },
        samples_scored: 5,
        branches: vec![detail("main", 0.3)],
    };

    match VerdictClassifier.classify(&fused) {
        Classification::Rich {
            verdict,
            risk_level,
            color_code,
            confidence_avg,
            confidence_max,
        } => {
            assert_eq!(verdict, Verdict::Suspicious);
            assert_eq!(risk_level, RiskTier::High);
            assert_eq!(color_code, DisplayHint::Orange);
            assert_eq!(confidence_avg, 30.0);
            assert_eq!(confidence_max, 90.0);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_classifier_scenario_b() {
    let mean = (0.6 + 0.7 + 0.55) / 3.0;
    let fused = FusedResult {
        score: FusedScore::MeanMax { mean, max: 0.7 },
        samples_scored: 3,
        branches: vec![detail("main", mean)],
    };

    let classification = VerdictClassifier.classify(&fused);
    assert_eq!(classification.verdict(), Verdict::Fake);
    match classification {
        Classification::Rich {
            risk_level,
            confidence_avg,
            ..
        } => {
            assert_eq!(risk_level, RiskTier::Critical);
            assert_eq!(confidence_avg, 61.67);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_threshold_uses_unrounded_value() {
    // 50.004% rounds to 50.0 for display but is still strictly above 50.
    let fused = FusedResult {
        score: FusedScore::MeanMax {
            mean: 0.50004,
            max: 0.50004,
        },
        samples_scored: 1,
        branches: vec![detail("main", 0.50004)],
    };

    match VerdictClassifier.classify(&fused) {
        Classification::Rich {
            verdict,
            confidence_avg,
            ..
        } => {
            assert_eq!(verdict, Verdict::Fake);
            assert_eq!(confidence_avg, 50.0);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_classifier_binary_mode_has_branch_details() {
    let fused = FusedResult {
        score: FusedScore::MaxOfMeans {
            probability: 0.7,
            leading_branch: "local".to_string(),
        },
        samples_scored: 3,
        branches: vec![detail("remote", 0.25), detail("local", 0.7)],
    };

    match VerdictClassifier.classify(&fused) {
        Classification::Binary {
            verdict,
            confidence,
            details,
        } => {
            assert_eq!(verdict, Verdict::Fake);
            assert_eq!(confidence, 70.0);
            assert_eq!(details.get("remote"), Some(&25.0));
            assert_eq!(details.get("local"), Some(&70.0));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_serialized_labels() {
    assert_eq!(serde_json::to_string(&Verdict::Suspicious).unwrap(), "\"SUSPICIOUS\"");
    assert_eq!(serde_json::to_string(&RiskTier::Moderate).unwrap(), "\"MODERATE\"");
    assert_eq!(serde_json::to_string(&DisplayHint::Green).unwrap(), "\"green\"");
}
