use crate::report::{SummaryData, format_f64_2};

pub fn render_report_text(data: &SummaryData) -> String {
    let mut out = String::new();

    out.push_str("Diagnostic Assessment Rollup Report\n");
    out.push_str("===================================\n\n");

    out.push_str("1. Joins\n");
    let audit = &data.audit;
    out.push_str(&format!("Count rows read: {}\n", audit.count_rows));
    out.push_str(&format!(
        "Dropped (no dictionary entry): {}\n",
        audit.dropped_by_dictionary
    ));
    out.push_str(&format!(
        "Dropped (no rubric entry): {}\n",
        audit.dropped_by_rubric
    ));
    out.push_str(&format!("Analytic rows: {}\n", audit.output_rows));
    out.push_str(&format!("Rows without mean: {}\n", audit.null_media));
    out.push_str(&format!(
        "Rows without difficulty: {}\n\n",
        audit.null_dificultad
    ));

    out.push_str("2. Coverage\n");
    out.push_str(&format!(
        "Groups with all four levels: {}\n",
        audit.complete_groups
    ));
    out.push_str(&format!(
        "Groups not summing to 100%: {}\n",
        audit.coverage_violations
    ));
    out.push_str(&format!("{}\n\n", coverage_statement(data)));

    out.push_str("3. Response levels\n");
    for level in &data.levels {
        out.push_str(&format!(
            "{} {}: mean {}% over {} rows\n",
            level.resp,
            level.label,
            format_f64_2(level.mean_prop),
            level.rows
        ));
    }
    out.push_str(&format!(
        "Median lowest-level share: {}%\nMedian highest-level share: {}%\nMedian mean score: {}\n\n",
        format_f64_2(data.nivel_0_median),
        format_f64_2(data.nivel_3_median),
        format_f64_2(data.media_median)
    ));

    out.push_str("4. Slices\n");
    if data.slices.is_empty() {
        out.push_str("No data.\n");
    }
    for slice in &data.slices {
        out.push_str(&format!(
            "{} grado {}: {} items, {} rows\n",
            slice.nivel, slice.grado, slice.items, slice.rows
        ));
    }
    if let (Some(min), Some(max)) = (data.dificultad_min, data.dificultad_max) {
        out.push_str(&format!(
            "\nDifficulty range: {} to {}\n",
            format_f64_2(min),
            format_f64_2(max)
        ));
    }

    out
}

fn coverage_statement(data: &SummaryData) -> &'static str {
    let audit = &data.audit;
    if audit.complete_groups == 0 {
        "No item/grade has all four response levels; proportions could not be checked."
    } else if audit.coverage_violations == 0 {
        "All complete level distributions sum to 100%."
    } else {
        "Some level distributions do not sum to 100%; check the count table."
    }
}
