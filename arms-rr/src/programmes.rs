//! Programme short names accepted by the review routes

/// Short name → stored programme code
pub const PROGRAMMES: [(&str, &str); 3] = [("bca", "020"), ("bba", "017"), ("bcom", "888")];

/// Batches before this year hold no result data
pub const FIRST_RESULT_BATCH: f64 = 2022.0;

/// Map a short programme name (case-insensitive) to its code
pub fn programme_code(name: &str) -> Option<&'static str> {
    let key = name.trim().to_lowercase();
    PROGRAMMES
        .iter()
        .find(|(short, _)| *short == key)
        .map(|(_, code)| *code)
}

/// Short names joined for error messages ("bca, bba, bcom")
pub fn valid_options() -> String {
    PROGRAMMES
        .iter()
        .map(|(short, _)| *short)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whether a batch could hold result data (numeric and not before 2022)
pub fn batch_has_results(batch: &str) -> bool {
    match batch.trim().parse::<f64>() {
        Ok(year) => year >= FIRST_RESULT_BATCH,
        Err(_) => false,
    }
}
