//! Long/short crowding score from OI trend, OI velocity, funding, and
//! basis (§4.11). Grounded on `crowding_detector.py`'s weighted-sum
//! scoring.

use crate::components::market_context::Trend;

pub struct CrowdingConfig {
    pub crowding_threshold: f64,
    pub oi_velocity_threshold_pct: f64,
    pub funding_bullish_threshold: f64,
    pub basis_rich_threshold_pct: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct CrowdingRead {
    pub crowded_long: bool,
    pub crowded_short: bool,
    pub long_crowding_score: f64,
    pub short_crowding_score: f64,
}

/// Inputs the crowding detector reads off the market-context tracker.
#[derive(Debug, Clone, Copy)]
pub struct CrowdingInputs {
    pub oi_trend: Trend,
    pub oi_velocity_pct: f64,
    pub funding_rate: f64,
    pub basis_pct: Option<f64>,
}

fn score(
    inputs: &CrowdingInputs,
    cfg: &CrowdingConfig,
    funding_above: impl Fn(f64, f64) -> bool,
    basis_above: impl Fn(f64, f64) -> bool,
) -> f64 {
    let mut s = 0.0;
    if inputs.oi_trend == Trend::Up {
        s += 0.3;
    }
    if inputs.oi_velocity_pct.abs() > cfg.oi_velocity_threshold_pct {
        s += 0.2;
    }
    if funding_above(inputs.funding_rate, cfg.funding_bullish_threshold) {
        s += 0.3;
        if funding_above(inputs.funding_rate, 2.0 * cfg.funding_bullish_threshold) {
            s += 0.1;
        }
    }
    if let Some(basis) = inputs.basis_pct {
        if basis_above(basis, cfg.basis_rich_threshold_pct) {
            s += 0.2;
        }
    }
    s
}

pub fn classify(inputs: &CrowdingInputs, cfg: &CrowdingConfig) -> CrowdingRead {
    let long_crowding_score = score(inputs, cfg, |v, t| v > t, |v, t| v > t);
    let short_crowding_score = score(inputs, cfg, |v, t| v < -t, |v, t| v < -t);

    let crowded_long = long_crowding_score >= cfg.crowding_threshold;
    let crowded_short = short_crowding_score >= cfg.crowding_threshold;

    CrowdingRead {
        crowded_long,
        crowded_short,
        long_crowding_score,
        short_crowding_score,
    }
}

/// One-line textual summary for the `crowding.interpretation` wire
/// field. Explicitly calls out "mixed signals" when both flags fire.
pub fn interpretation(read: &CrowdingRead) -> String {
    match (read.crowded_long, read.crowded_short) {
        (true, true) => format!(
            "mixed signals: long crowding {:.2} and short crowding {:.2} both above threshold",
            read.long_crowding_score, read.short_crowding_score
        ),
        (true, false) => format!("long-crowded ({:.2})", read.long_crowding_score),
        (false, true) => format!("short-crowded ({:.2})", read.short_crowding_score),
        (false, false) => "no crowding detected".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> CrowdingConfig {
        CrowdingConfig {
            crowding_threshold: 0.6,
            oi_velocity_threshold_pct: 0.5,
            funding_bullish_threshold: 0.0001,
            basis_rich_threshold_pct: 0.1,
        }
    }

    #[test]
    fn long_crowded_on_strong_bullish_signals() {
        let inputs = CrowdingInputs {
            oi_trend: Trend::Up,
            oi_velocity_pct: 1.0,
            funding_rate: 0.0003,
            basis_pct: Some(0.2),
        };
        let read = classify(&inputs, &cfg());
        assert!(read.crowded_long);
        assert!(!read.crowded_short);
        assert!(read.long_crowding_score >= 0.6);
    }

    #[test]
    fn mixed_signals_when_both_cross_threshold() {
        // Funding/basis alone can't push both past threshold without OI
        // contributing to both halves (OI growth doesn't distinguish
        // long from short per §4.11).
        let inputs = CrowdingInputs {
            oi_trend: Trend::Up,
            oi_velocity_pct: 1.0,
            funding_rate: 0.0,
            basis_pct: None,
        };
        let cfg = CrowdingConfig {
            crowding_threshold: 0.5,
            ..cfg()
        };
        let read = classify(&inputs, &cfg);
        assert!(read.crowded_long);
        assert!(read.crowded_short);
        let msg = interpretation(&read);
        assert!(msg.contains("mixed signals"));
    }

    #[test]
    fn no_crowding_with_flat_signals() {
        let inputs = CrowdingInputs {
            oi_trend: Trend::Flat,
            oi_velocity_pct: 0.0,
            funding_rate: 0.0,
            basis_pct: Some(0.0),
        };
        let read = classify(&inputs, &cfg());
        assert!(!read.crowded_long && !read.crowded_short);
        assert_eq!(interpretation(&read), "no crowding detected");
    }
}
