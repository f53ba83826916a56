//! Built-in sample used by the command line when no file is given.

use crate::source::SourceMap;

pub const DETERMINE_PRICE_NAME: &str = "determine_price";

/// Ticket pricing by age.
pub const DETERMINE_PRICE: &str = r#"# Ticket pricing by age.
fn determine_price(age) {
    if age < 0 {
        return "Invalid Age";
    } else if age < 3 {
        return "Free (Infant)";
    } else if age < 13 {
        return "Child Price";
    } else if age < 60 {
        return "Adult Price";
    } else {
        return "Senior Price";
    }
}
"#;

/// A resolver holding only the pricing sample.
pub fn sample_sources() -> SourceMap {
    SourceMap::new().with(DETERMINE_PRICE_NAME, DETERMINE_PRICE)
}
