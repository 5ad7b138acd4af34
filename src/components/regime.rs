//! Composite regime detector: trend / liquidity / market regime (§4.10).
//! Grounded on `regime_detector.py`'s ordered-rule classification.

use crate::components::volatility::VolRegime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendRegime {
    Up,
    Down,
    Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiquidityRegime {
    High,
    Normal,
    Thin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketRegime {
    ShortSqueeze,
    Crash,
    LiquidationEvent,
    Trend,
    Chop,
    Normal,
}

/// Every input the classifier needs for one tick; assembled by the
/// engine from the other components' reads at snapshot time.
#[derive(Debug, Clone, Copy)]
pub struct RegimeInputs {
    pub ret_1m: f64,
    pub ret_5m: f64,
    pub ret_15m: Option<f64>,
    pub spread_bps: f64,
    pub l5_bid: f64,
    pub l5_ask: f64,
    pub vol_regime: VolRegime,
    pub buy_ratio: f64,
    pub liq_count: u32,
    pub long_liq: u32,
    pub short_liq: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct RegimeRead {
    pub trend_regime: TrendRegime,
    pub trend_strength: f64,
    pub liquidity_regime: LiquidityRegime,
    pub market_regime: MarketRegime,
}

pub struct RegimeConfig {
    pub trend_threshold_pct: f64,
    pub strong_trend_threshold_pct: f64,
    pub range_threshold_pct: f64,
    pub tight_spread_bps: f64,
    pub wide_spread_bps: f64,
    pub deep_book_usd: f64,
    pub thin_book_usd: f64,
    pub elevated_liq_count: u32,
    pub high_liq_count: u32,
}

fn classify_trend(returns: &[f64], cfg: &RegimeConfig) -> (TrendRegime, f64) {
    let n = returns.len() as f64;
    let avg = returns.iter().sum::<f64>() / n.max(1.0);
    let pos = returns.iter().filter(|&&r| r > cfg.trend_threshold_pct).count();
    let neg = returns.iter().filter(|&&r| r < -cfg.trend_threshold_pct).count();

    let trend = if avg.abs() < cfg.range_threshold_pct {
        TrendRegime::Range
    } else if pos >= 2 {
        TrendRegime::Up
    } else if neg >= 2 {
        TrendRegime::Down
    } else {
        TrendRegime::Range
    };

    let strength = (avg.abs() / cfg.strong_trend_threshold_pct).min(1.0)
        * (pos.max(neg) as f64 / n.max(1.0));

    (trend, strength)
}

fn classify_liquidity(spread_bps: f64, avg_depth: f64, cfg: &RegimeConfig) -> LiquidityRegime {
    if spread_bps < cfg.tight_spread_bps && avg_depth > cfg.deep_book_usd {
        LiquidityRegime::High
    } else if spread_bps > cfg.wide_spread_bps || avg_depth < cfg.thin_book_usd {
        LiquidityRegime::Thin
    } else {
        LiquidityRegime::Normal
    }
}

/// Ordered rule list; the first matching rule wins (§4.10).
fn classify_market(
    trend: TrendRegime,
    strength: f64,
    vol_regime: VolRegime,
    inputs: &RegimeInputs,
    cfg: &RegimeConfig,
) -> MarketRegime {
    let short_liq = inputs.short_liq as f64;
    let long_liq = inputs.long_liq as f64;

    if inputs.liq_count >= cfg.high_liq_count
        && short_liq > 1.5 * long_liq
        && trend == TrendRegime::Up
    {
        return MarketRegime::ShortSqueeze;
    }
    if inputs.liq_count >= cfg.high_liq_count
        && long_liq > 1.5 * short_liq
        && trend == TrendRegime::Down
    {
        return MarketRegime::Crash;
    }
    if inputs.liq_count >= cfg.high_liq_count {
        return MarketRegime::LiquidationEvent;
    }
    if strength > 0.6
        && ((trend == TrendRegime::Up && inputs.buy_ratio > 0.6)
            || (trend == TrendRegime::Down && inputs.buy_ratio < 0.4))
    {
        return MarketRegime::Trend;
    }
    if vol_regime == VolRegime::High && trend == TrendRegime::Range {
        return MarketRegime::Chop;
    }
    MarketRegime::Normal
}

pub fn classify(inputs: &RegimeInputs, cfg: &RegimeConfig) -> RegimeRead {
    let mut returns = vec![inputs.ret_1m, inputs.ret_5m];
    if let Some(r15) = inputs.ret_15m {
        returns.push(r15);
    }
    let (trend_regime, trend_strength) = classify_trend(&returns, cfg);

    let avg_depth = (inputs.l5_bid + inputs.l5_ask) / 2.0;
    let liquidity_regime = classify_liquidity(inputs.spread_bps, avg_depth, cfg);

    let market_regime = classify_market(trend_regime, trend_strength, inputs.vol_regime, inputs, cfg);

    RegimeRead {
        trend_regime,
        trend_strength,
        liquidity_regime,
        market_regime,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> RegimeConfig {
        RegimeConfig {
            trend_threshold_pct: 0.1,
            strong_trend_threshold_pct: 0.5,
            range_threshold_pct: 0.05,
            tight_spread_bps: 5.0,
            wide_spread_bps: 20.0,
            deep_book_usd: 100_000.0,
            thin_book_usd: 20_000.0,
            elevated_liq_count: 3,
            high_liq_count: 10,
        }
    }

    #[test]
    fn short_squeeze_scenario() {
        let inputs = RegimeInputs {
            ret_1m: 0.4,
            ret_5m: 0.7,
            ret_15m: Some(1.1),
            spread_bps: 3.0,
            l5_bid: 200_000.0,
            l5_ask: 200_000.0,
            vol_regime: VolRegime::Normal,
            buy_ratio: 0.8,
            liq_count: 12,
            long_liq: 3,
            short_liq: 9,
        };
        let read = classify(&inputs, &cfg());
        assert_eq!(read.trend_regime, TrendRegime::Up);
        assert!(read.trend_strength > 0.6);
        assert_eq!(read.market_regime, MarketRegime::ShortSqueeze);
    }

    #[test]
    fn chop_when_high_vol_and_ranging() {
        let inputs = RegimeInputs {
            ret_1m: 0.01,
            ret_5m: -0.01,
            ret_15m: Some(0.0),
            spread_bps: 3.0,
            l5_bid: 200_000.0,
            l5_ask: 200_000.0,
            vol_regime: VolRegime::High,
            buy_ratio: 0.5,
            liq_count: 0,
            long_liq: 0,
            short_liq: 0,
        };
        let read = classify(&inputs, &cfg());
        assert_eq!(read.trend_regime, TrendRegime::Range);
        assert_eq!(read.market_regime, MarketRegime::Chop);
    }

    #[test]
    fn liquidity_thin_on_wide_spread() {
        let thin = classify_liquidity(25.0, 200_000.0, &cfg());
        assert_eq!(thin, LiquidityRegime::Thin);
        let high = classify_liquidity(1.0, 150_000.0, &cfg());
        assert_eq!(high, LiquidityRegime::High);
    }
}
