//! WGS84 inverse problem: azimuth and distance between two positions.
//!
//! Uses Vincenty's iterative solution on the ellipsoid. Nearly antipodal
//! pairs, where the iteration does not converge, fall back to a great-circle
//! estimate so the result is always finite.

pub const WGS84_A: f64 = 6_378_137.0;
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
const MEAN_EARTH_RADIUS_M: f64 = 6_371_008.8;
const MAX_ITERATIONS: usize = 200;
const CONVERGENCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inverse {
    /// Forward azimuth at the first point, degrees in `(-180, 180]`.
    pub azimuth_deg: f64,
    pub distance_m: f64,
}

pub fn inverse(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Inverse {
    vincenty(lat1, lon1, lat2, lon2).unwrap_or_else(|| great_circle(lat1, lon1, lat2, lon2))
}

fn vincenty(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Option<Inverse> {
    let b = WGS84_A * (1.0 - WGS84_F);
    let l = (lon2 - lon1).to_radians();
    let u1 = ((1.0 - WGS84_F) * lat1.to_radians().tan()).atan();
    let u2 = ((1.0 - WGS84_F) * lat2.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    for _ in 0..MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let cross = cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda;
        let sin_sigma = ((cos_u2 * sin_lambda).powi(2) + cross.powi(2)).sqrt();
        if sin_sigma == 0.0 {
            return Some(Inverse {
                azimuth_deg: 0.0,
                distance_m: 0.0,
            });
        }
        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        // Equatorial lines have cos²α = 0.
        let cos_2sigma_m = if cos_sq_alpha != 0.0 {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        } else {
            0.0
        };
        let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));
        let previous = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))));

        if (lambda - previous).abs() < CONVERGENCE {
            let u_sq = cos_sq_alpha * (WGS84_A.powi(2) - b.powi(2)) / b.powi(2);
            let big_a =
                1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = big_b
                * sin_sigma
                * (cos_2sigma_m
                    + big_b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))
                            - big_b / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma.powi(2))
                                * (-3.0 + 4.0 * cos_2sigma_m.powi(2))));
            let distance_m = b * big_a * (sigma - delta_sigma);
            let (sin_lambda, cos_lambda) = lambda.sin_cos();
            let azimuth = (cos_u2 * sin_lambda)
                .atan2(cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda)
                .to_degrees();
            if !(distance_m.is_finite() && azimuth.is_finite()) {
                return None;
            }
            return Some(Inverse {
                azimuth_deg: azimuth,
                distance_m,
            });
        }
    }
    None
}

fn great_circle(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Inverse {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = phi2 - phi1;
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let distance_m = 2.0 * MEAN_EARTH_RADIUS_M * a.clamp(0.0, 1.0).sqrt().asin();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();
    Inverse {
        azimuth_deg: y.atan2(x).to_degrees(),
        distance_m,
    }
}
