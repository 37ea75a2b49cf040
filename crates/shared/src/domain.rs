use std::{fmt, str::FromStr};

use alloy_chains::Chain;
use alloy_primitives::utils::{format_ether, parse_ether};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use alloy_primitives::{Address, B256, U256, U64};

/// Account that receives donations unless configuration says otherwise.
pub const DEFAULT_DONATION_RECIPIENT: Address =
    alloy_primitives::address!("0x786F2125BE14404b5594d4e861741E0494B2a6C1");

const WEI_PER_CENTI_ETHER: U256 = U256::from_limbs([10_000_000_000_000_000, 0, 0, 0]);
const HALF_CENTI_ETHER: U256 = U256::from_limbs([5_000_000_000_000_000, 0, 0, 0]);
const WEI_PER_ETHER: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub name: String,
    pub chain_id: u64,
}

impl NetworkInfo {
    pub fn new(name: impl Into<String>, chain_id: u64) -> Self {
        Self {
            name: name.into(),
            chain_id,
        }
    }

    /// Names the chain the way wallets report it; unnamed chains are `unknown`.
    pub fn from_chain_id(chain_id: u64) -> Self {
        let name = Chain::from_id(chain_id)
            .named()
            .map(|named| named.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Self { name, chain_id }
    }
}

/// Formats a wei amount as a human readable Ether string, e.g. `2.5` or `0.0`.
pub fn to_decimal_string(wei: U256) -> String {
    let formatted = format_ether(wei);
    match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{whole}.0")
            } else {
                format!("{whole}.{fraction}")
            }
        }
        None => format!("{formatted}.0"),
    }
}

/// Inverse of [`to_decimal_string`]. Wei amounts are unsigned, so a leading
/// `-` is rejected rather than wrapped around.
pub fn from_decimal_string(ether: &str) -> Result<U256, AmountError> {
    let trimmed = ether.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }
    if trimmed.starts_with('-') {
        return Err(AmountError::Negative {
            input: ether.to_string(),
        });
    }
    let normalized = if trimmed.starts_with('.') {
        format!("0{trimmed}")
    } else {
        trimmed.to_string()
    };
    parse_ether(&normalized).map_err(|err| AmountError::Invalid {
        input: ether.to_string(),
        reason: err.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount must not be empty")]
    Empty,
    #[error("invalid ether amount '{input}': {reason}")]
    Invalid { input: String, reason: String },
    #[error("ether amount '{input}' is negative")]
    Negative { input: String },
}

/// Donation amount held in wei and kept on a 0.01 Ether grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DonationAmount(U256);

impl DonationAmount {
    pub const ZERO: Self = Self(U256::ZERO);
    pub const STEP: Self = Self(U256::from_limbs([50_000_000_000_000_000, 0, 0, 0]));

    /// Rounds half up to two decimals.
    pub fn from_wei_rounded(wei: U256) -> Self {
        let cents = wei.saturating_add(HALF_CENTI_ETHER) / WEI_PER_CENTI_ETHER;
        Self(cents.saturating_mul(WEI_PER_CENTI_ETHER))
    }

    pub fn from_wei_floor(wei: U256) -> Self {
        Self((wei / WEI_PER_CENTI_ETHER) * WEI_PER_CENTI_ETHER)
    }

    /// Largest amount that can be donated out of `balance_wei`.
    pub fn max_for_balance(balance_wei: U256) -> Self {
        Self::from_wei_floor(balance_wei)
    }

    pub fn wei(self) -> U256 {
        self.0
    }

    /// Parses user input and bounds it to `[0, balance]` instead of failing.
    pub fn parse_clamped(input: &str, balance_wei: U256) -> Result<Self, AmountError> {
        Ok(input.parse::<Self>()?.clamp_to(balance_wei))
    }

    pub fn clamp_to(self, balance_wei: U256) -> Self {
        self.min(Self::max_for_balance(balance_wei))
    }

    pub fn step_up(self, balance_wei: U256) -> Self {
        Self(self.0.saturating_add(Self::STEP.0)).clamp_to(balance_wei)
    }

    pub fn step_down(self) -> Self {
        Self(self.0.saturating_sub(Self::STEP.0))
    }
}

impl Default for DonationAmount {
    fn default() -> Self {
        Self::STEP
    }
}

impl fmt::Display for DonationAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / WEI_PER_ETHER;
        let cents = (self.0 % WEI_PER_ETHER) / WEI_PER_CENTI_ETHER;
        write!(f, "{whole}.{:02}", cents.to::<u64>())
    }
}

impl FromStr for DonationAmount {
    type Err = AmountError;

    /// Negative input becomes zero once its magnitude parses.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(magnitude) = trimmed.strip_prefix('-') {
            from_decimal_string(magnitude)?;
            return Ok(Self::ZERO);
        }
        from_decimal_string(trimmed).map(Self::from_wei_rounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ether(value: &str) -> U256 {
        from_decimal_string(value).expect("valid ether")
    }

    #[test]
    fn formats_balances_like_wallet_ui() {
        assert_eq!(
            to_decimal_string(U256::from(2_500_000_000_000_000_000u128)),
            "2.5"
        );
        assert_eq!(to_decimal_string(U256::ZERO), "0.0");
        assert_eq!(to_decimal_string(U256::from(1u64)), "0.000000000000000001");
        assert_eq!(
            to_decimal_string(U256::from(3_000_000_000_000_000_000u128)),
            "3.0"
        );
    }

    #[test]
    fn decimal_string_accepts_leading_dot() {
        assert_eq!(ether(".5"), U256::from(500_000_000_000_000_000u64));
        assert!(matches!(from_decimal_string("  "), Err(AmountError::Empty)));
        assert!(matches!(
            from_decimal_string("abc"),
            Err(AmountError::Invalid { .. })
        ));
    }

    #[test]
    fn decimal_string_rejects_negative_wei() {
        assert_eq!(
            from_decimal_string("-1"),
            Err(AmountError::Negative { input: "-1".into() })
        );
        assert_eq!(
            from_decimal_string(" -0.5"),
            Err(AmountError::Negative { input: " -0.5".into() })
        );
    }

    #[test]
    fn parsed_negative_donation_is_zero() {
        assert_eq!("-1".parse::<DonationAmount>(), Ok(DonationAmount::ZERO));
        assert_eq!("-0.05".parse::<DonationAmount>(), Ok(DonationAmount::ZERO));
        assert!("-x".parse::<DonationAmount>().is_err());
        assert!("--1".parse::<DonationAmount>().is_err());
    }

    #[test]
    fn mainnet_is_named() {
        assert_eq!(NetworkInfo::from_chain_id(1), NetworkInfo::new("mainnet", 1));
        assert_eq!(NetworkInfo::from_chain_id(3_735_928_559).name, "unknown");
    }

    #[test]
    fn default_donation_is_one_step() {
        assert_eq!(DonationAmount::default().to_string(), "0.05");
        assert_eq!(DonationAmount::default().wei(), ether("0.05"));
    }

    #[test]
    fn donation_clamps_above_balance() {
        let amount = DonationAmount::parse_clamped("7", ether("2.5")).expect("parse");
        assert_eq!(amount.to_string(), "2.50");
    }

    #[test]
    fn donation_clamps_negative_to_zero() {
        let amount = DonationAmount::parse_clamped("-0.3", ether("2.5")).expect("parse");
        assert_eq!(amount, DonationAmount::ZERO);
    }

    #[test]
    fn donation_rounds_to_two_decimals() {
        let amount = DonationAmount::parse_clamped("0.125", ether("1")).expect("parse");
        assert_eq!(amount.to_string(), "0.13");
        let amount = DonationAmount::parse_clamped("0.124", ether("1")).expect("parse");
        assert_eq!(amount.to_string(), "0.12");
    }

    #[test]
    fn donation_never_exceeds_fractional_balance() {
        let amount = DonationAmount::parse_clamped("0.0399", ether("0.0333")).expect("parse");
        assert_eq!(amount.to_string(), "0.03");
        assert!(amount.wei() <= ether("0.0333"));
    }

    #[test]
    fn donation_rejects_garbage() {
        assert!(DonationAmount::parse_clamped("lots", ether("1")).is_err());
        assert!(DonationAmount::parse_clamped("-lots", ether("1")).is_err());
    }

    #[test]
    fn steps_stay_in_bounds() {
        let balance = ether("0.12");
        let amount = DonationAmount::default().step_up(balance);
        assert_eq!(amount.to_string(), "0.10");
        assert_eq!(amount.step_up(balance).to_string(), "0.12");
        assert_eq!(DonationAmount::default().step_down(), DonationAmount::ZERO);
        assert_eq!(DonationAmount::ZERO.step_down(), DonationAmount::ZERO);
    }
}
