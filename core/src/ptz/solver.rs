//! Geographic target to normalized pan/tilt/zoom.
//!
//! The solver never fails: inconsistent geometry degrades to a defined
//! fallback and every output is clamped, so the actuator never sees a NaN or
//! an infinity.

use serde::{Deserialize, Serialize};

use crate::math::MatrixHelper;
use crate::prelude::{CoreError, CoreResult, GeoPoint, PtzCommand};
use crate::ptz::geodesic;

/// Pan never reaches ±1; some heads fault at the end stops.
pub const SAFE_PAN_LIMIT: f64 = 0.9999;
const TILT_FLOOR: f64 = -0.5;
const TILT_CEILING: f64 = 1.0;

/// Mounting and optics of the PTZ camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraCalibration {
    pub latitude: f64,
    pub longitude: f64,
    /// Height above mean sea level.
    pub altitude_m: f64,
    /// True bearing the head points at when pan is zero.
    pub heading_deg: f64,
    pub lean_angle_deg: f64,
    pub lean_direction_deg: f64,
    /// Physical pan travel either side of the heading.
    pub pan_limit_deg: f64,
    pub zoom_min_m: f64,
    pub zoom_max_m: f64,
    pub zoom_tilt_offset_deg: f64,
}

impl Default for CameraCalibration {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            altitude_m: 60.0,
            heading_deg: 200.0,
            lean_angle_deg: 0.0,
            lean_direction_deg: 0.0,
            pan_limit_deg: 180.0,
            zoom_min_m: 20.0,
            zoom_max_m: 1000.0,
            zoom_tilt_offset_deg: 0.0,
        }
    }
}

impl CameraCalibration {
    pub fn validate(&self) -> CoreResult<()> {
        let fields = [
            self.latitude,
            self.longitude,
            self.altitude_m,
            self.heading_deg,
            self.lean_angle_deg,
            self.lean_direction_deg,
            self.pan_limit_deg,
            self.zoom_min_m,
            self.zoom_max_m,
            self.zoom_tilt_offset_deg,
        ];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(CoreError::InvalidCalibration(
                "camera calibration contains a non-finite value".into(),
            ));
        }
        if self.pan_limit_deg <= 0.0 {
            return Err(CoreError::InvalidCalibration(format!(
                "pan limit must be positive, got {}",
                self.pan_limit_deg
            )));
        }
        if self.zoom_max_m <= self.zoom_min_m {
            return Err(CoreError::InvalidCalibration(format!(
                "zoom range [{}, {}] is empty",
                self.zoom_min_m, self.zoom_max_m
            )));
        }
        Ok(())
    }
}

/// What the camera should look at.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PtzTarget {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: Option<f64>,
    /// Sensor-reported bearing; overrides the computed azimuth when present.
    pub azimuth_deg: Option<f64>,
    pub slant_range_m: Option<f64>,
}

impl From<&GeoPoint> for PtzTarget {
    fn from(point: &GeoPoint) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            altitude_m: None,
            azimuth_deg: point.azimuth_deg,
            slant_range_m: point.slant_range_m,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PtzSolution {
    pub pan: f64,
    pub tilt: f64,
    pub zoom: f64,
}

impl PtzSolution {
    /// Actuator command with pan/tilt rounded to four decimals.
    pub fn to_command(&self, include_zoom: bool) -> PtzCommand {
        PtzCommand {
            pan: round4(self.pan),
            tilt: round4(self.tilt),
            zoom: include_zoom.then(|| round4(self.zoom)),
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

pub fn solve(target: &PtzTarget, camera: &CameraCalibration) -> PtzSolution {
    let inverse = geodesic::inverse(
        camera.latitude,
        camera.longitude,
        target.latitude,
        target.longitude,
    );
    let azimuth = target.azimuth_deg.unwrap_or(inverse.azimuth_deg);
    let horizontal = inverse.distance_m;

    let delta = altitude_delta(target, camera.altitude_m, horizontal);
    let elevation = delta.atan2(horizontal).to_degrees();
    let pan = azimuth - camera.heading_deg;

    let (pan, elevation) = correct_lean(
        pan,
        elevation,
        camera.lean_angle_deg,
        camera.lean_direction_deg,
    );

    let zoom = normalize_zoom(horizontal.hypot(delta), camera.zoom_min_m, camera.zoom_max_m);
    let elevation = elevation + zoom * camera.zoom_tilt_offset_deg;

    PtzSolution {
        pan: normalize_pan(pan, camera.pan_limit_deg),
        tilt: normalize_tilt(elevation),
        zoom,
    }
}

/// Height of the target relative to the camera.
///
/// Without an explicit altitude, a slant range longer than the horizontal
/// distance is read as a target below the camera. A slant range shorter than
/// the horizontal distance is noise and yields zero.
fn altitude_delta(target: &PtzTarget, camera_alt: f64, horizontal: f64) -> f64 {
    if let Some(altitude) = target.altitude_m {
        return altitude - camera_alt;
    }
    match target.slant_range_m {
        Some(slant) if slant >= horizontal => -((slant - horizontal) * (slant + horizontal)).sqrt(),
        _ => 0.0,
    }
}

/// Rotates the aim vector about the lean axis of a tilted mount.
///
/// The lean axis is horizontal and perpendicular to `lean_direction_deg`;
/// the mount is tipped by `lean_angle_deg` about it.
pub fn correct_lean(
    pan_deg: f64,
    tilt_deg: f64,
    lean_angle_deg: f64,
    lean_direction_deg: f64,
) -> (f64, f64) {
    if lean_angle_deg == 0.0 {
        return (pan_deg, tilt_deg);
    }
    let direction = lean_direction_deg.to_radians();
    let to_lean_frame = MatrixHelper::rotation_z(-direction);
    let tip = MatrixHelper::rotation_y(lean_angle_deg.to_radians());
    let from_lean_frame = MatrixHelper::rotation_z(direction);
    let rotation = MatrixHelper::multiply(
        from_lean_frame.view(),
        MatrixHelper::multiply(tip.view(), to_lean_frame.view()).view(),
    );

    let aim = MatrixHelper::aim_vector(pan_deg.to_radians(), tilt_deg.to_radians());
    let corrected = MatrixHelper::apply(rotation.view(), aim.view());

    let tilt = corrected[2].clamp(-1.0, 1.0).asin();
    let pan = corrected[1].atan2(corrected[0]);
    (pan.to_degrees(), tilt.to_degrees())
}

/// Wraps into `(-180, 180]`.
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle % 360.0;
    if wrapped > 180.0 {
        wrapped - 360.0
    } else if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

pub fn normalize_pan(pan_deg: f64, pan_limit_deg: f64) -> f64 {
    let normalized = wrap_degrees(pan_deg) / pan_limit_deg;
    finite_or(normalized, 0.0).clamp(-SAFE_PAN_LIMIT, SAFE_PAN_LIMIT)
}

pub fn normalize_zoom(distance_m: f64, zoom_min_m: f64, zoom_max_m: f64) -> f64 {
    if distance_m <= zoom_min_m {
        return 0.0;
    }
    if distance_m >= zoom_max_m {
        return 1.0;
    }
    let zoom = (distance_m - zoom_min_m) / (zoom_max_m - zoom_min_m);
    finite_or(zoom, 0.0).clamp(0.0, 1.0)
}

/// Piecewise tilt mapping of the head: 0° is 1.0, +90° is 0.5, -90° is -0.5.
///
/// The head travels further below the horizon than above it, hence the two
/// slopes.
pub fn normalize_tilt(elevation_deg: f64) -> f64 {
    // Infinities saturate at straight up/down; only NaN falls back to level.
    let elevation = if elevation_deg.is_nan() {
        0.0
    } else {
        elevation_deg.clamp(-90.0, 90.0)
    };
    let tilt = if elevation >= 0.0 {
        1.0 - elevation / 180.0
    } else {
        1.0 + elevation / 60.0
    };
    tilt.clamp(TILT_FLOOR, TILT_CEILING)
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn camera() -> CameraCalibration {
        CameraCalibration {
            latitude: 10.0,
            longitude: -70.0,
            altitude_m: 60.0,
            heading_deg: 0.0,
            ..Default::default()
        }
    }

    fn target(lat: f64, lon: f64) -> PtzTarget {
        PtzTarget {
            latitude: lat,
            longitude: lon,
            ..Default::default()
        }
    }

    fn assert_finite_in_range(solution: &PtzSolution) {
        assert!(solution.pan.is_finite() && solution.pan > -1.0 && solution.pan < 1.0);
        assert!(solution.tilt.is_finite() && (-0.5..=1.0).contains(&solution.tilt));
        assert!(solution.zoom.is_finite() && (0.0..=1.0).contains(&solution.zoom));
    }

    #[test]
    fn tilt_mapping_boundaries() {
        assert_abs_diff_eq!(normalize_tilt(0.0), 1.0);
        assert_abs_diff_eq!(normalize_tilt(90.0), 0.5);
        assert_abs_diff_eq!(normalize_tilt(-90.0), -0.5);
        assert_abs_diff_eq!(normalize_tilt(-30.0), 0.5);
        assert_abs_diff_eq!(normalize_tilt(45.0), 0.75);
        assert_abs_diff_eq!(normalize_tilt(200.0), 0.5);
        assert_abs_diff_eq!(normalize_tilt(-200.0), -0.5);
    }

    #[test]
    fn tilt_saturates_on_infinite_elevation() {
        assert_abs_diff_eq!(normalize_tilt(f64::INFINITY), 0.5);
        assert_abs_diff_eq!(normalize_tilt(f64::NEG_INFINITY), -0.5);
        assert_abs_diff_eq!(normalize_tilt(f64::NAN), 1.0);
    }

    #[test]
    fn pan_never_reaches_unit_bounds() {
        for &angle in &[180.0, -180.0, 179.999, 540.0, -900.0, 1e9] {
            let pan = normalize_pan(angle, 180.0);
            assert!(pan > -1.0 && pan < 1.0, "{angle} -> {pan}");
        }
        assert_abs_diff_eq!(normalize_pan(270.0, 180.0), -0.5);
        assert_abs_diff_eq!(normalize_pan(90.0, 45.0), SAFE_PAN_LIMIT);
    }

    #[test]
    fn wrap_degrees_lands_in_half_open_range() {
        assert_abs_diff_eq!(wrap_degrees(180.0), 180.0);
        assert_abs_diff_eq!(wrap_degrees(-180.0), 180.0);
        assert_abs_diff_eq!(wrap_degrees(370.0), 10.0);
        assert_abs_diff_eq!(wrap_degrees(-190.0), 170.0);
    }

    #[test]
    fn zoom_is_linear_and_clamped() {
        assert_eq!(normalize_zoom(5.0, 20.0, 1000.0), 0.0);
        assert_eq!(normalize_zoom(5000.0, 20.0, 1000.0), 1.0);
        assert_abs_diff_eq!(normalize_zoom(510.0, 20.0, 1000.0), 0.5);
    }

    #[test]
    fn target_due_east_pans_right() {
        let solution = solve(&target(10.0, -69.999), &camera());
        assert_abs_diff_eq!(solution.pan, 0.5, epsilon = 1e-3);
        assert_abs_diff_eq!(solution.tilt, 1.0, epsilon = 1e-12);
        assert_finite_in_range(&solution);
    }

    #[test]
    fn reported_azimuth_overrides_geometry() {
        let mut t = target(10.0, -69.999);
        t.azimuth_deg = Some(-90.0);
        let solution = solve(&t, &camera());
        assert_abs_diff_eq!(solution.pan, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn slant_range_places_target_below_camera() {
        let cam = camera();
        let horizontal = geodesic::inverse(10.0, -70.0, 10.001, -70.0).distance_m;
        let mut t = target(10.001, -70.0);
        t.slant_range_m = Some(horizontal * 2.0);
        let solution = solve(&t, &cam);
        // atan2(-sqrt(3)h, h) = -60°, so tilt = 1 - 60/60.
        assert_abs_diff_eq!(solution.tilt, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn short_slant_range_falls_back_to_level() {
        let mut t = target(10.001, -70.0);
        t.slant_range_m = Some(1.0);
        let solution = solve(&t, &camera());
        assert_abs_diff_eq!(solution.tilt, 1.0, epsilon = 1e-12);
        assert_finite_in_range(&solution);
    }

    #[test]
    fn explicit_altitude_wins_over_slant_range() {
        let mut t = target(10.001, -70.0);
        t.altitude_m = Some(60.0);
        t.slant_range_m = Some(10_000.0);
        let solution = solve(&t, &camera());
        assert_abs_diff_eq!(solution.tilt, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn zoom_tilt_offset_scales_with_zoom() {
        let mut cam = camera();
        cam.zoom_tilt_offset_deg = 18.0;
        let solution = solve(&target(10.02, -70.0), &cam);
        assert_eq!(solution.zoom, 1.0);
        assert_abs_diff_eq!(solution.tilt, 1.0 - 18.0 / 180.0, epsilon = 1e-9);
    }

    #[test]
    fn lean_correction_matches_spherical_closed_form() {
        let (pan, tilt, lean, direction) = (35.0_f64, -12.0_f64, 4.0_f64, 80.0_f64);
        let (p, t, l, d) = (
            pan.to_radians(),
            tilt.to_radians(),
            lean.to_radians(),
            direction.to_radians(),
        );
        let sin_tilt = t.sin() * l.cos() - t.cos() * l.sin() * (p - d).cos();
        let expected_tilt = sin_tilt.asin().to_degrees();
        let y = (p - d).sin() * t.cos();
        let x = (p - d).cos() * t.cos() * l.cos() + t.sin() * l.sin();
        let expected_pan = (y.atan2(x) + d).to_degrees();

        let (corrected_pan, corrected_tilt) = correct_lean(pan, tilt, lean, direction);
        assert_abs_diff_eq!(wrap_degrees(corrected_pan - expected_pan), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(corrected_tilt, expected_tilt, epsilon = 1e-9);
    }

    #[test]
    fn zero_lean_is_identity() {
        assert_eq!(correct_lean(33.0, -7.0, 0.0, 120.0), (33.0, -7.0));
    }

    #[test]
    fn outputs_stay_finite_for_extreme_inputs() {
        let mut cam = camera();
        cam.lean_angle_deg = 89.9;
        cam.lean_direction_deg = -400.0;
        cam.zoom_tilt_offset_deg = 1e6;
        let cases = [
            PtzTarget { latitude: 10.0, longitude: -70.0, ..Default::default() },
            PtzTarget { latitude: -89.9, longitude: 110.0, slant_range_m: Some(1e300), ..Default::default() },
            PtzTarget { latitude: 10.0001, longitude: -70.0, slant_range_m: Some(0.0), azimuth_deg: Some(1e12), ..Default::default() },
            PtzTarget { latitude: 0.0, longitude: 109.9, altitude_m: Some(-1e308), ..Default::default() },
        ];
        for case in &cases {
            assert_finite_in_range(&solve(case, &cam));
        }

        let degenerate = CameraCalibration {
            pan_limit_deg: 0.0,
            zoom_min_m: 50.0,
            zoom_max_m: 50.0,
            ..camera()
        };
        assert_finite_in_range(&solve(&cases[2], &degenerate));
    }

    #[test]
    fn command_rounds_and_optionally_drops_zoom() {
        let solution = PtzSolution {
            pan: 0.123456,
            tilt: -0.333333,
            zoom: 0.55557,
        };
        let command = solution.to_command(false);
        assert_eq!(command.pan, 0.1235);
        assert_eq!(command.tilt, -0.3333);
        assert!(command.zoom.is_none());
        assert_eq!(solution.to_command(true).zoom, Some(0.5556));
    }

    #[test]
    fn validate_rejects_empty_zoom_range() {
        let cam = CameraCalibration {
            zoom_min_m: 100.0,
            zoom_max_m: 10.0,
            ..Default::default()
        };
        assert!(cam.validate().is_err());
        assert!(CameraCalibration::default().validate().is_ok());
    }
}
