use std::fmt::Write;

use crate::{DecodeError, RadarPoint, ReportView, ReportViewModel};

const BAR_WIDTH: usize = 20;

pub fn render_view(view: &ReportView) -> String {
    match view {
        ReportView::Ready(model) => render_report(model),
        ReportView::NoData { reason } => render_no_data(reason.as_ref()),
    }
}

pub fn render_report(model: &ReportViewModel) -> String {
    let mut output = String::new();
    let max_label = model
        .max
        .map(|max| max.to_string())
        .unwrap_or_else(|| "n/a".to_string());

    let _ = writeln!(output, "# Evaluation Results");
    let _ = writeln!(output);
    let _ = writeln!(output, "Total Score      {} / {}", model.total, max_label);
    let _ = writeln!(
        output,
        "Percentile       {}% ({} performance)",
        model.percentage,
        model.tier.label()
    );
    let _ = writeln!(output, "Feedback Points  {}", model.feedback_count());
    let _ = writeln!(output);
    let _ = writeln!(output, "## Skill Radar");

    if model.radar_series.is_empty() {
        let _ = writeln!(output, "No category scores reported.");
    } else {
        let label_width = model
            .radar_series
            .iter()
            .map(|point| point.category.chars().count())
            .max()
            .unwrap_or_default();
        for point in &model.radar_series {
            let _ = writeln!(
                output,
                "{:<label_width$}  [{}] {}/{}",
                point.category,
                bar(point),
                point.value,
                point.scale_max
            );
        }
    }

    if !model.category_breakdown.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Category Breakdown");
        for card in &model.category_breakdown {
            let _ = writeln!(
                output,
                "{} {}/100 ({})",
                card.category.to_uppercase(),
                card.value,
                card.tier.label()
            );
            let _ = writeln!(output, "   {}", card.insight);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Development Opportunities");
    if model.opportunities.is_empty() {
        let _ = writeln!(output, "No feedback provided.");
    } else {
        for (index, opportunity) in model.opportunities.iter().enumerate() {
            let _ = writeln!(output, "{}. {}", index + 1, opportunity.evidence);
            let _ = writeln!(output, "   -> {}", opportunity.suggestion);
        }
    }

    output
}

pub fn render_no_data(reason: Option<&DecodeError>) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "No evaluation data found");
    if let Some(reason) = reason {
        let _ = writeln!(output, "({reason})");
    }
    let _ = writeln!(
        output,
        "Please return to complete an assessment or open the demo data."
    );
    output
}

fn bar(point: &RadarPoint) -> String {
    let ratio = if point.scale_max > 0.0 {
        (point.value / point.scale_max).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (ratio * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}
