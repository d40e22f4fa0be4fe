//! Compounding formulas.
//!
//! Two strategies are available:
//!
//! - [`compound_daily`]: the closed form `100 × ((1 + apr/365)^365 − 1)`. This
//!   is the only formula used to turn an APR into an APY for display and for
//!   vault totals.
//! - [`simulated_reinvestment`]: a day-by-day simulation where one yield stream
//!   is swept into a second position that compounds on its own APR.

/// Compounding periods per year.
pub const DAYS_PER_YEAR: u32 = 365;

/// Seconds per emission year (360-day year used when annualizing reward rates).
pub const EMISSION_YEAR_SECONDS: f64 = 360.0 * 24.0 * 60.0 * 60.0;

/// Converts an APR (fraction, 0.10 = 10%) into an APY (percent) with daily
/// compounding.
///
/// ```rust
/// use harvest_core::compound_daily;
///
/// let apy = compound_daily(0.10);
/// assert!((apy - 10.5156).abs() < 1e-3);
/// assert_eq!(compound_daily(0.0), 0.0);
/// ```
pub fn compound_daily(apr: f64) -> f64 {
    let days = f64::from(DAYS_PER_YEAR);
    100.0 * ((1.0 + apr / days).powi(DAYS_PER_YEAR as i32) - 1.0)
}

/// Simulates daily reinvestment over `days` days.
///
/// Starting from a unit principal, each day the feed yield
/// (`feed_apr / 365`, fraction) is swept into a staked bucket, then the bucket
/// earns `reinvest_apr / 365` (fraction, already net of fees). Returns the
/// bucket size relative to the principal, in percent.
pub fn simulated_reinvestment(feed_apr: f64, reinvest_apr: f64, days: u32) -> f64 {
    let daily_feed = feed_apr / f64::from(DAYS_PER_YEAR);
    let daily_growth = reinvest_apr / f64::from(DAYS_PER_YEAR);

    let staked = (0..days).fold(0.0_f64, |staked, _| {
        let staked = staked + daily_feed;
        staked + staked * daily_growth
    });

    staked * 100.0
}
