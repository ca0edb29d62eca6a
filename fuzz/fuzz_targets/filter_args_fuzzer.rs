//! Fuzz target for match filter argument parsing
//!
//! # Invariants
//!
//! - NEVER panic on any input
//! - An accepted filter renders to a string that parses back to itself

#![no_main]

use libfuzzer_sys::fuzz_target;
use plugwatch_core::{MatchFilter, filter};

fuzz_target!(|args: Vec<String>| {
    let Ok(parsed) = MatchFilter::from_args(&args) else {
        return;
    };

    let vendor = parsed.vendor_id.map_or("any".to_string(), |v| format!("0x{v:04x}"));
    let product = parsed.product_id.map_or("any".to_string(), |p| format!("0x{p:04x}"));
    let class = parsed.class_code.map_or("-1".to_string(), |c| c.to_string());

    assert_eq!(filter::parse_vendor_id(&vendor), Ok(parsed.vendor_id));
    assert_eq!(filter::parse_product_id(&product), Ok(parsed.product_id));
    assert_eq!(filter::parse_class_code(&class), Ok(parsed.class_code));
});
