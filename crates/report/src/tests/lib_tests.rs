use super::*;
use serde_json::json;

fn payload(value: Value) -> EvaluationPayload {
    EvaluationPayload::from_value(value).expect("payload object")
}

#[test]
fn classify_respects_inclusive_lower_bounds() {
    assert_eq!(classify(100), PerformanceTier::Exceptional);
    assert_eq!(classify(90), PerformanceTier::Exceptional);
    assert_eq!(classify(89), PerformanceTier::Excellent);
    assert_eq!(classify(80), PerformanceTier::Excellent);
    assert_eq!(classify(79.5), PerformanceTier::Proficient);
    assert_eq!(classify(70), PerformanceTier::Proficient);
    assert_eq!(classify(60), PerformanceTier::Developing);
    assert_eq!(classify(59), PerformanceTier::Emerging);
    assert_eq!(classify(0), PerformanceTier::Emerging);
}

#[test]
fn classify_tolerates_negative_and_nan() {
    assert_eq!(classify(-5), PerformanceTier::Emerging);
    assert_eq!(classify(f64::NAN), PerformanceTier::Emerging);
}

#[test]
fn tiers_partition_percentage_range_without_gaps() {
    let tiers: Vec<_> = (0..=100u8).map(|p| classify(p)).collect();
    // Rank grows by at most one step per percentage point.
    let rank = |tier: &PerformanceTier| match tier {
        PerformanceTier::Emerging => 0,
        PerformanceTier::Developing => 1,
        PerformanceTier::Proficient => 2,
        PerformanceTier::Excellent => 3,
        PerformanceTier::Exceptional => 4,
    };
    for pair in tiers.windows(2) {
        let step = rank(&pair[1]) - rank(&pair[0]);
        assert!(step == 0 || step == 1, "jump between {pair:?}");
    }
    assert_eq!(rank(&tiers[0]), 0);
    assert_eq!(rank(&tiers[100]), 4);
}

#[test]
fn percentage_rounds_and_defaults_to_zero() {
    assert_eq!(percentage(Some(330.0), Some(400.0)), 83);
    assert_eq!(percentage(Some(0.0), Some(0.0)), 0);
    assert_eq!(percentage(Some(5.0), None), 0);
    assert_eq!(percentage(None, Some(10.0)), 0);
    assert_eq!(percentage(Some(1.0), Some(8.0)), 13);
    assert_eq!(percentage(Some(f64::INFINITY), Some(1.0)), 0);
}

#[test]
fn percentage_is_clamped_into_range() {
    assert_eq!(percentage(Some(450.0), Some(400.0)), 100);
    assert_eq!(percentage(Some(-20.0), Some(400.0)), 0);
}

#[test]
fn radar_series_preserves_order_and_fixed_scale() {
    let scores = json!({"Communication": 85, "Leadership": 75});
    let series = to_radar_series(scores.as_object().expect("object"));
    assert_eq!(
        series,
        vec![
            RadarPoint {
                category: "Communication".to_string(),
                value: 85.0,
                scale_max: 100.0,
            },
            RadarPoint {
                category: "Leadership".to_string(),
                value: 75.0,
                scale_max: 100.0,
            },
        ]
    );
}

#[test]
fn radar_series_keeps_insertion_order_not_alphabetical() {
    let scores = json!({"Zeal": 1, "Adaptability": 2, "Mediation": 3});
    let categories: Vec<_> = to_radar_series(scores.as_object().expect("object"))
        .into_iter()
        .map(|point| point.category)
        .collect();
    assert_eq!(categories, ["Zeal", "Adaptability", "Mediation"]);
}

#[test]
fn radar_values_are_coerced() {
    let scores = json!({"a": "72", "b": null, "c": "n/a", "d": true, "e": [1], "f": 12.5});
    let values: Vec<_> = to_radar_series(scores.as_object().expect("object"))
        .into_iter()
        .map(|point| point.value)
        .collect();
    assert_eq!(values, [72.0, 0.0, 0.0, 1.0, 0.0, 12.5]);
}

#[test]
fn category_insight_bands_use_inclusive_lower_bounds() {
    assert_eq!(category_insight(100.0), INSIGHT_BANDS[0].1);
    assert_eq!(category_insight(75.0), INSIGHT_BANDS[0].1);
    assert_eq!(category_insight(74.9), INSIGHT_BANDS[1].1);
    assert_eq!(category_insight(50.0), INSIGHT_BANDS[1].1);
    assert_eq!(category_insight(49.0), INSIGHT_BANDS[2].1);
    assert_eq!(category_insight(30.0), INSIGHT_BANDS[2].1);
    assert_eq!(category_insight(29.9), LOW_SCORE_INSIGHT);
    assert_eq!(category_insight(0.0), LOW_SCORE_INSIGHT);
}

#[test]
fn breakdown_classifies_each_category_on_its_own() {
    let model = build_report_view_model(&payload(json!({
        "scores": {"Empathy": 92, "Directness": "55", "Pacing": "n/a"},
        "total": 147,
        "max": 300
    })));

    let cards: Vec<_> = model
        .category_breakdown
        .iter()
        .map(|card| (card.category.as_str(), card.value, card.tier))
        .collect();
    assert_eq!(
        cards,
        [
            ("Empathy", 92.0, PerformanceTier::Exceptional),
            ("Directness", 55.0, PerformanceTier::Emerging),
            ("Pacing", 0.0, PerformanceTier::Emerging),
        ]
    );
    assert_eq!(
        model.category_breakdown[1].insight,
        "There is room to grow. Focused practice will help."
    );
    assert_eq!(model.category_breakdown[2].insight, LOW_SCORE_INSIGHT);
    assert_eq!(model.tier, PerformanceTier::Emerging);
}

#[test]
fn view_model_for_completed_session() {
    let model = build_report_view_model(&payload(json!({
        "scores": {"Communication": 85},
        "total": 330,
        "max": 400,
        "feedback": ["Great clarity"]
    })));

    assert_eq!(model.percentage, 83);
    assert_eq!(model.tier, PerformanceTier::Excellent);
    assert_eq!(model.radar_series.len(), 1);
    assert_eq!(model.opportunities.len(), 1);
    let opportunity = &model.opportunities[0];
    assert_eq!(opportunity.evidence, "Great clarity");
    assert_eq!(opportunity.category, OpportunityCategory::Strength);
    assert_eq!(opportunity.suggestion, suggest_opportunity(Some("Great clarity")));
}

#[test]
fn view_model_tolerates_empty_payload() {
    let model = build_report_view_model(&EvaluationPayload::default());
    assert_eq!(model.total, 0.0);
    assert_eq!(model.max, None);
    assert_eq!(model.percentage, 0);
    assert_eq!(model.tier, PerformanceTier::Emerging);
    assert!(model.radar_series.is_empty());
    assert!(model.category_breakdown.is_empty());
    assert!(model.opportunities.is_empty());
}

#[test]
fn view_model_tolerates_wrong_field_types() {
    let model = build_report_view_model(&payload(json!({
        "scores": [1, 2, 3],
        "total": "45",
        "max": "50",
        "feedback": ["Strong opener", 42, null]
    })));
    assert_eq!(model.percentage, 90);
    assert_eq!(model.tier, PerformanceTier::Exceptional);
    assert!(model.radar_series.is_empty());

    let categories: Vec<_> = model.opportunities.iter().map(|o| o.category).collect();
    assert_eq!(
        categories,
        [
            OpportunityCategory::Strength,
            OpportunityCategory::Unusable,
            OpportunityCategory::Unusable
        ]
    );
    assert_eq!(model.opportunities[1].evidence, "42");
}

#[test]
fn view_model_is_idempotent() {
    let payload = sample_payload();
    assert_eq!(
        build_report_view_model(&payload),
        build_report_view_model(&payload)
    );
}

#[test]
fn load_report_degrades_to_no_data() {
    assert_eq!(load_report(None), ReportView::NoData { reason: None });
    assert!(matches!(
        load_report(Some("%7Bbroken")),
        ReportView::NoData {
            reason: Some(DecodeError::Json(_))
        }
    ));
}

#[test]
fn load_report_builds_view_from_link() {
    let base = url::Url::parse("http://127.0.0.1:3000").expect("base");
    let link = encode_report_link(&base, &sample_payload()).expect("link");
    let ReportView::Ready(model) = load_report(Some(link.as_str())) else {
        panic!("expected report");
    };
    assert_eq!(model.percentage, 83);
    assert_eq!(model.radar_series.len(), 4);
    assert_eq!(model.feedback_count(), 2);
}
