//! Spherical geometry kernels shared by the graph container, the spatial
//! index and the instruction synthesizer.

/// Mean radius of Earth in meters, as used by the graph pipeline.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree of latitude, used when nudging waypoints.
pub(crate) const METERS_PER_DEGREE: f64 = 111_320.0;

/// Great-circle distance in meters between two lat/lon positions, using the
/// [haversine formula](https://en.wikipedia.org/wiki/Haversine_formula).
///
/// Coincident points yield exactly 0.
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlam = (lon2 - lon1).to_radians();

    let sin_dphi_half = (dphi * 0.5).sin();
    let sin_dlam_half = (dlam * 0.5).sin();

    let a = sin_dphi_half * sin_dphi_half
        + phi1.cos() * phi2.cos() * sin_dlam_half * sin_dlam_half;

    EARTH_RADIUS_M * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Initial great-circle bearing in degrees `[0, 360)` from the first point
/// towards the second.
///
/// Undefined for coincident points; callers must not rely on it for
/// zero-length segments.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dlam = (lon2 - lon1).to_radians();

    let y = dlam.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlam.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Normalizes a raw bearing difference into a signed turn angle in
/// `[-180, 180]`. Negative angles turn left, positive turn right.
pub fn normalize_turn_angle(mut angle: f64) -> f64 {
    while angle > 180.0 {
        angle -= 360.0;
    }
    while angle < -180.0 {
        angle += 360.0;
    }
    angle
}

/// Eight-point compass direction for a bearing in degrees.
pub fn compass_direction(bearing_deg: f64) -> &'static str {
    const DIRECTIONS: [&str; 8] = [
        "north",
        "northeast",
        "east",
        "southeast",
        "south",
        "southwest",
        "west",
        "northwest",
    ];
    let idx = ((bearing_deg + 22.5) % 360.0 / 45.0) as usize % 8;
    DIRECTIONS[idx]
}

/// Equirectangular projection of a lat/lon position into meters, with a
/// fixed latitude-compression scalar. Squared Euclidean distance in this
/// plane tracks great-circle distance locally, which is all the spatial
/// index needs for pruning.
pub(crate) fn project_equirectangular(lat: f64, lon: f64, cos_lat: f64) -> (f64, f64) {
    (
        lat.to_radians() * EARTH_RADIUS_M,
        lon.to_radians() * EARTH_RADIUS_M * cos_lat,
    )
}
