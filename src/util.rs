//! Small formatting helpers
//!
//! Complex numbers travel through logs and debug output in the "a + bi"
//! form; these helpers round-trip that representation at a fixed decimal
//! precision.

use crate::error::AnalysisError;

/// Split an "a + bi" complex-number string into its two components
///
/// The imaginary token keeps its sign, so "1.50 + -2.30i" parses to
/// `[1.5, -2.3]`.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` when the string does not have
/// exactly two "+"-separated numeric parts.
pub fn parse_complex_str(s: &str) -> Result<[f32; 2], AnalysisError> {
    let mut parts = [0.0f32; 2];
    let mut count = 0;
    for token in s.split('+') {
        if count >= 2 {
            return Err(AnalysisError::InvalidInput(format!(
                "not a complex string: {:?}",
                s
            )));
        }
        let token = token.trim();
        let token = token.strip_suffix('i').unwrap_or(token);
        parts[count] = token.trim().parse::<f32>().map_err(|_| {
            AnalysisError::InvalidInput(format!("not a complex string: {:?}", s))
        })?;
        count += 1;
    }
    if count != 2 {
        return Err(AnalysisError::InvalidInput(format!(
            "not a complex string: {:?}",
            s
        )));
    }
    Ok(parts)
}

/// Format a complex number as "a + bi" at the given decimal precision
pub fn format_complex_str(v: &[f32; 2], precision: usize) -> String {
    format!("{:.p$} + {:.p$}i", v[0], v[1], p = precision)
}
