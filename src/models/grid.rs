//! Lambert conformal conic projection onto the KMA 5 km forecast grid

use std::f64::consts::PI;

const EARTH_RADIUS_KM: f64 = 6371.00877;
const GRID_KM: f64 = 5.0;
const STANDARD_LAT_1: f64 = 30.0;
const STANDARD_LAT_2: f64 = 60.0;
const ORIGIN_LON: f64 = 126.0;
const ORIGIN_LAT: f64 = 38.0;
const ORIGIN_X: f64 = 43.0;
const ORIGIN_Y: f64 = 136.0;

struct Projection {
    re: f64,
    sn: f64,
    sf: f64,
    ro: f64,
    olon: f64,
}

impl Projection {
    fn new() -> Self {
        let rad = PI / 180.0;
        let re = EARTH_RADIUS_KM / GRID_KM;
        let slat1 = STANDARD_LAT_1 * rad;
        let slat2 = STANDARD_LAT_2 * rad;
        let olat = ORIGIN_LAT * rad;

        let sn = (slat1.cos() / slat2.cos()).ln()
            / ((PI * 0.25 + slat2 * 0.5).tan() / (PI * 0.25 + slat1 * 0.5).tan()).ln();
        let sf = (PI * 0.25 + slat1 * 0.5).tan().powf(sn) * slat1.cos() / sn;
        let ro = re * sf / (PI * 0.25 + olat * 0.5).tan().powf(sn);

        Self {
            re,
            sn,
            sf,
            ro,
            olon: ORIGIN_LON * rad,
        }
    }
}

/// Convert latitude/longitude to a KMA grid cell `(nx, ny)`.
///
/// Points far outside the Korean peninsula clamp to the grid's non-negative
/// range rather than wrapping.
#[must_use]
pub fn to_grid(latitude: f64, longitude: f64) -> (u16, u16) {
    let p = Projection::new();
    let rad = PI / 180.0;

    let ra = p.re * p.sf / (PI * 0.25 + latitude * rad * 0.5).tan().powf(p.sn);
    let mut theta = longitude * rad - p.olon;
    if theta > PI {
        theta -= 2.0 * PI;
    }
    if theta < -PI {
        theta += 2.0 * PI;
    }
    theta *= p.sn;

    let x = (ra * theta.sin() + ORIGIN_X + 0.5).floor();
    let y = (p.ro - ra * theta.cos() + ORIGIN_Y + 0.5).floor();

    (clamp_cell(x), clamp_cell(y))
}

fn clamp_cell(value: f64) -> u16 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, f64::from(u16::MAX)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::seoul(37.5665, 126.9780, (60, 127))]
    #[case::busan(35.1796, 129.0756, (98, 76))]
    #[case::daejeon(36.3504, 127.3845, (67, 100))]
    fn test_known_cities(#[case] lat: f64, #[case] lon: f64, #[case] expected: (u16, u16)) {
        assert_eq!(to_grid(lat, lon), expected);
    }

    #[test]
    fn test_origin_maps_to_offset() {
        assert_eq!(to_grid(ORIGIN_LAT, ORIGIN_LON), (43, 136));
    }
}
