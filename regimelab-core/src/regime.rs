//! Regime classifier.
//!
//! Maps one [`EnrichedBar`] onto three axes (volatility, structure,
//! higher-timeframe bias) and resolves them through a fixed decision table
//! into a trade permission, a risk multiplier and a strategy bias.
//! No state is carried between bars.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ConfigError;
use crate::indicators::EnrichedBar;

/// atr_zscore below this is a dead market regardless of the compression threshold.
pub const DEAD_MARKET_ZSCORE: f64 = -2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityState {
    Compression,
    Normal,
    Expansion,
    ExtremeExpansion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureState {
    Trend,
    Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HtfTrend {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyBias {
    Trend,
    MeanReversion,
    None,
}

/// Why the regime forbids trading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeVeto {
    DeadMarket,
    WhipsawRisk,
}

impl fmt::Display for VolatilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VolatilityState::Compression => "compression",
            VolatilityState::Normal => "normal",
            VolatilityState::Expansion => "expansion",
            VolatilityState::ExtremeExpansion => "extreme_expansion",
        })
    }
}

impl fmt::Display for StructureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StructureState::Trend => "trend",
            StructureState::Range => "range",
        })
    }
}

impl fmt::Display for HtfTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HtfTrend::Up => "up",
            HtfTrend::Down => "down",
            HtfTrend::Flat => "flat",
        })
    }
}

impl fmt::Display for RegimeVeto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegimeVeto::DeadMarket => "dead market",
            RegimeVeto::WhipsawRisk => "whipsaw risk",
        })
    }
}

/// Output of the classifier for a single bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeContext {
    pub volatility_state: VolatilityState,
    pub structure_state: StructureState,
    pub htf_trend: HtfTrend,
    pub trade_allowed: bool,
    pub veto_reason: Option<RegimeVeto>,
    /// In [0, 1]; 0 whenever trading is not allowed.
    pub risk_multiplier: f64,
    pub strategy_bias: StrategyBias,
}

impl RegimeContext {
    /// `"{volatility}_{structure}_{htf}"`, e.g. `expansion_trend_up`.
    pub fn label(&self) -> String {
        format!(
            "{}_{}_{}",
            self.volatility_state, self.structure_state, self.htf_trend
        )
    }
}

/// Axis boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeThresholds {
    /// atr_zscore strictly below is compression.
    pub compression: f64,
    /// atr_zscore strictly above is expansion.
    pub expansion: f64,
    /// atr_zscore strictly above is extreme expansion.
    pub extreme: f64,
    /// ADX strictly above is a trend.
    pub adx_trend: f64,
    /// Neutral HTF band as a fraction of ema_slow.
    pub htf_band: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            compression: -1.0,
            expansion: 1.0,
            extreme: 2.0,
            adx_trend: 25.0,
            htf_band: 0.001,
        }
    }
}

impl RegimeThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.compression < self.expansion && self.expansion < self.extreme) {
            return Err(ConfigError::ThresholdOrder {
                compression: self.compression,
                expansion: self.expansion,
                extreme: self.extreme,
            });
        }
        if !(self.adx_trend >= 0.0) {
            return Err(ConfigError::Negative {
                field: "regime.adx_trend",
                value: self.adx_trend,
            });
        }
        if !(self.htf_band >= 0.0) {
            return Err(ConfigError::Negative {
                field: "regime.htf_band",
                value: self.htf_band,
            });
        }
        Ok(())
    }

    pub fn volatility_state(&self, atr_zscore: f64) -> VolatilityState {
        if atr_zscore < self.compression {
            VolatilityState::Compression
        } else if atr_zscore > self.extreme {
            VolatilityState::ExtremeExpansion
        } else if atr_zscore > self.expansion {
            VolatilityState::Expansion
        } else {
            VolatilityState::Normal
        }
    }

    pub fn structure_state(&self, adx: f64) -> StructureState {
        if adx > self.adx_trend {
            StructureState::Trend
        } else {
            StructureState::Range
        }
    }

    pub fn htf_trend(&self, close: f64, ema_slow: f64) -> HtfTrend {
        if ema_slow == 0.0 {
            return HtfTrend::Flat;
        }
        let band = ema_slow * self.htf_band;
        if close > ema_slow + band {
            HtfTrend::Up
        } else if close < ema_slow - band {
            HtfTrend::Down
        } else {
            HtfTrend::Flat
        }
    }
}

/// Classify the decision bar.
pub fn classify(enriched: &EnrichedBar, thresholds: &RegimeThresholds) -> RegimeContext {
    classify_values(
        enriched.atr_zscore,
        enriched.adx,
        enriched.bar.close,
        enriched.ema_slow,
        thresholds,
    )
}

/// The classifier on its four inputs.
pub fn classify_values(
    atr_zscore: f64,
    adx: f64,
    close: f64,
    ema_slow: f64,
    thresholds: &RegimeThresholds,
) -> RegimeContext {
    use StrategyBias as B;
    use StructureState as S;
    use VolatilityState as V;

    let volatility_state = thresholds.volatility_state(atr_zscore);
    let structure_state = thresholds.structure_state(adx);
    let htf_trend = thresholds.htf_trend(close, ema_slow);

    let (trade_allowed, veto_reason, risk_multiplier, strategy_bias) =
        if volatility_state == V::Compression || atr_zscore < DEAD_MARKET_ZSCORE {
            (false, Some(RegimeVeto::DeadMarket), 0.0, B::None)
        } else {
            match (volatility_state, structure_state) {
                (V::Expansion | V::ExtremeExpansion, S::Range) => {
                    (false, Some(RegimeVeto::WhipsawRisk), 0.0, B::None)
                }
                (V::Expansion, S::Trend) => (true, None, 0.7, B::Trend),
                (V::ExtremeExpansion, S::Trend) => (true, None, 0.5, B::Trend),
                (V::Normal, S::Trend) => (true, None, 1.0, B::Trend),
                (V::Normal, S::Range) => (true, None, 1.0, B::MeanReversion),
                // Already caught by the dead-market check.
                (V::Compression, _) => (false, Some(RegimeVeto::DeadMarket), 0.0, B::None),
            }
        };

    RegimeContext {
        volatility_state,
        structure_state,
        htf_trend,
        trade_allowed,
        veto_reason,
        risk_multiplier,
        strategy_bias,
    }
}
