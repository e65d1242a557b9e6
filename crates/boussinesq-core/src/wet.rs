//! Wetted geometry of a flat-bottomed polygonal cell.
//!
//! A cell is a vertical prism over its planimetric area with the bedrock as
//! its floor. Water stored in the cell fills the pore space between the
//! bedrock and the piezometric head.

/// Saturated thickness above the bedrock (m), zero when the cell is dry.
#[inline]
pub fn thickness(eta: f64, bedrock: f64) -> f64 {
    (eta - bedrock).max(0.0)
}

/// Water volume held in the cell (m^3).
#[inline]
pub fn water_volume(eta: f64, bedrock: f64, porosity: f64, area: f64) -> f64 {
    porosity * area * thickness(eta, bedrock)
}

/// Wetted planimetric area (m^2): the whole cell once the head reaches the
/// bedrock, nothing below it.
///
/// This is the derivative of [`water_volume`] per unit porosity. At the
/// bedrock it takes the value from the wet side, so a cell sitting exactly
/// on its floor can still fill.
#[inline]
pub fn wet_area(eta: f64, bedrock: f64, area: f64) -> f64 {
    if eta >= bedrock { area } else { 0.0 }
}
