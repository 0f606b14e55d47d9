//! Shared fixtures for flowviz-core integration tests

#![allow(dead_code)]

use flowviz_core::ResponseRecord;

/// Years values of the ten-record reference scenario
pub const SCENARIO_YEARS: [f64; 10] = [2.0, 2.0, 7.0, 7.0, 7.0, 12.0, 22.0, 22.0, 22.0, 22.0];

/// Learning styles of the ten-record reference scenario
pub const SCENARIO_STYLES: [&str; 10] = [
    "visual",
    "visual",
    "auditory",
    "auditory",
    "visual",
    "visual",
    "kinesthetic",
    "visual",
    "visual",
    "auditory",
];

/// The ten-record reference scenario
pub fn scenario_records() -> Vec<ResponseRecord> {
    SCENARIO_YEARS
        .iter()
        .zip(SCENARIO_STYLES.iter())
        .map(|(years, style)| {
            ResponseRecord::new()
                .with_years(*years)
                .with_answer("learning_style", style)
        })
        .collect()
}

/// Deterministic mixed-quality record set: every field gets answers,
/// gaps, novel labels and out-of-range numbers
pub fn mixed_records(n: usize) -> Vec<ResponseRecord> {
    let styles = ["visual", "auditory", "kinesthetic", "reading_writing", "musical", ""];
    let shaped = ["mentor", "manager", "peers", "self", "family", "other"];
    let peaks = ["morning", "afternoon", "evening", "night"];
    let motivations = ["growth", "impact", "recognition", "stability", "autonomy"];

    (0..n)
        .map(|i| {
            let mut record = ResponseRecord::new();
            record = match i % 7 {
                0 => record,
                1 => record.with_years(-4.0),
                2 => record.with_answer("years_at_organization", "decades"),
                k => record.with_years((i * k % 31) as f64),
            };
            record = record.with_answer("learning_style", styles[i % styles.len()]);
            if i % 3 != 0 {
                record = record.with_answer("shaped_by", shaped[i % shaped.len()]);
            }
            record = record.with_answer("peak_performance", peaks[(i / 2) % peaks.len()]);
            if i % 5 != 4 {
                record = record.with_answer("motivation", motivations[(i * 3) % motivations.len()]);
            }
            if i % 11 == 0 {
                record = record.as_test_data();
            }
            record
        })
        .collect()
}
