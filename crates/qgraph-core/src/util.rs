//! Utility functions for qgraph
//!
//! Provides number formatting for reports and composite action naming.

/// Round to two decimals for human-readable reports.
///
/// # Example
/// ```
/// use qgraph_core::util::pretty;
///
/// assert_eq!(pretty(10.0), "10");
/// assert_eq!(pretty(0.333_333), "0.33");
/// assert_eq!(pretty(-0.001), "0");
/// ```
pub fn pretty(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    // avoid printing "-0"
    if rounded == 0.0 {
        return "0".to_string();
    }
    format!("{rounded}")
}

/// Composite action name built from an origin/destination pair.
///
/// # Example
/// ```
/// use qgraph_core::util::action_name_from_to;
///
/// assert_eq!(action_name_from_to("A", "B"), "from_A_to_B");
/// ```
pub fn action_name_from_to(from: &str, to: &str) -> String {
    format!("from_{from}_to_{to}")
}
