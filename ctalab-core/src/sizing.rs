//! Volatility-scaled position sizing.

/// Hands to trade so that one ATR move risks `risk_fraction` of capital.
///
/// `hands = floor(capital * risk_fraction / (atr * contract_size))`, with
/// two degenerate guards: a zero/negative ATR carries no sizing signal and
/// yields 0 hands, and exhausted capital yields 0 hands.
pub fn atr_risk_hands(capital: f64, risk_fraction: f64, atr: f64, contract_size: f64) -> u32 {
    if capital <= 0.0 || risk_fraction <= 0.0 || atr <= 0.0 || contract_size <= 0.0 {
        return 0;
    }
    let hands = (capital * risk_fraction) / (atr * contract_size);
    if !hands.is_finite() {
        return 0;
    }
    hands.floor() as u32
}
