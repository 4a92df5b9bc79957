//! Sun-position collaborator.
//!
//! The poll path only needs azimuth/altitude as a pure function of time
//! and site coordinates, so the seam is a small async trait. The shipped
//! implementation is the standard low-precision solar ephemeris (the same
//! formulas used by the suncalc family of libraries), good to a fraction
//! of a degree, which is far below the mechanical resolution of the
//! panel steppers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Horizontal coordinates of the sun, radians.
///
/// Azimuth is measured from south, positive westward; altitude is the
/// elevation above the horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunPosition {
    pub azimuth: f64,
    pub altitude: f64,
}

/// Computes the sun position for a site at an instant.
#[async_trait]
pub trait SunPositionProvider: Send + Sync {
    /// `at` is the site-local instant (already shifted by the configured
    /// UTC offset); latitude/longitude are in degrees.
    async fn position(&self, at: DateTime<Utc>, latitude: f64, longitude: f64) -> SunPosition;
}

/// Low-precision solar ephemeris, pure math, no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolarEphemeris;

const RAD: f64 = std::f64::consts::PI / 180.0;
/// Obliquity of the ecliptic.
const OBLIQUITY: f64 = RAD * 23.4397;
/// Unix days between epoch and J2000.
const J2000_UNIX_DAYS: f64 = 2451545.0 - 2440587.5;

fn to_days(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 86_400_000.0 - J2000_UNIX_DAYS
}

fn solar_mean_anomaly(days: f64) -> f64 {
    RAD * (357.5291 + 0.985_600_28 * days)
}

fn ecliptic_longitude(mean_anomaly: f64) -> f64 {
    // Equation of center plus perihelion of the Earth.
    let center = RAD
        * (1.9148 * mean_anomaly.sin()
            + 0.02 * (2.0 * mean_anomaly).sin()
            + 0.0003 * (3.0 * mean_anomaly).sin());
    let perihelion = RAD * 102.9372;
    mean_anomaly + center + perihelion + std::f64::consts::PI
}

fn declination(ecliptic_lon: f64) -> f64 {
    (OBLIQUITY.sin() * ecliptic_lon.sin()).asin()
}

fn right_ascension(ecliptic_lon: f64) -> f64 {
    (ecliptic_lon.sin() * OBLIQUITY.cos()).atan2(ecliptic_lon.cos())
}

fn sidereal_time(days: f64, lw: f64) -> f64 {
    RAD * (280.16 + 360.985_623_5 * days) - lw
}

#[async_trait]
impl SunPositionProvider for SolarEphemeris {
    async fn position(&self, at: DateTime<Utc>, latitude: f64, longitude: f64) -> SunPosition {
        let days = to_days(at);
        let lw = RAD * -longitude;
        let phi = RAD * latitude;

        let ecliptic_lon = ecliptic_longitude(solar_mean_anomaly(days));
        let dec = declination(ecliptic_lon);
        let hour_angle = sidereal_time(days, lw) - right_ascension(ecliptic_lon);

        let azimuth = hour_angle
            .sin()
            .atan2(hour_angle.cos() * phi.sin() - dec.tan() * phi.cos());
        let altitude = (phi.sin() * dec.sin() + phi.cos() * dec.cos() * hour_angle.cos()).asin();

        SunPosition { azimuth, altitude }
    }
}
