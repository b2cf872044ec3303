//! Spherical geometry for the `angular_distance` SQL function.

/// Great-circle separation between two equatorial positions, all in degrees.
///
/// Uses the Vincenty formula, which stays accurate both for tiny and for
/// near-antipodal separations.
pub fn angular_separation_deg(ra1: f64, dec1: f64, ra2: f64, dec2: f64) -> f64 {
    let (sin_dec1, cos_dec1) = dec1.to_radians().sin_cos();
    let (sin_dec2, cos_dec2) = dec2.to_radians().sin_cos();
    let (sin_dra, cos_dra) = (ra2 - ra1).to_radians().sin_cos();

    let num = ((cos_dec2 * sin_dra).powi(2)
        + (cos_dec1 * sin_dec2 - sin_dec1 * cos_dec2 * cos_dra).powi(2))
    .sqrt();
    let den = sin_dec1 * sin_dec2 + cos_dec1 * cos_dec2 * cos_dra;

    num.atan2(den).to_degrees()
}
