//! Human-level auction configuration, as entered in a launch form

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use crate::codec::{encode_price_with_decimals, parse_units, DEFAULT_DECIMALS};
use crate::utils::{CcaError, Result};
use super::params::AuctionParameters;
use super::schedule::{encode_schedule, ReleaseSegment};

/// Allowed distance of the schedule total from 100%
pub const PERCENT_TOLERANCE: f64 = 0.1;

/// Minimum tick spacing the contract accepts
pub const MIN_TICK_SPACING: u64 = 2;

fn default_decimals() -> u8 {
    DEFAULT_DECIMALS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionDraft {
    /// Currency per token
    pub floor_price: f64,
    /// `address(0)` for ETH
    #[serde(default)]
    pub currency: Address,
    pub start_block: u64,
    pub end_block: u64,
    /// Defaults to `end_block`
    #[serde(default)]
    pub claim_block: Option<u64>,
    pub tick_spacing: u64,
    /// Decimal amount of currency, e.g. "25.5"
    #[serde(default)]
    pub required_currency_raised: Option<String>,
    pub funds_recipient: Address,
    pub tokens_recipient: Address,
    #[serde(default)]
    pub validation_hook: Address,
    #[serde(default = "default_decimals")]
    pub token_decimals: u8,
    #[serde(default = "default_decimals")]
    pub currency_decimals: u8,
    pub release_schedule: Vec<ReleaseSegment>,
}

impl AuctionDraft {
    /// Check every field, reporting the first offending one
    pub fn validate(&self) -> Result<()> {
        if !self.floor_price.is_finite() || self.floor_price <= 0.0 {
            return Err(CcaError::invalid("floor price", "must be > 0"));
        }
        if self.start_block == 0 {
            return Err(CcaError::invalid("start block", "is required"));
        }
        if self.end_block <= self.start_block {
            return Err(CcaError::invalid("end block", "must be > start block"));
        }
        if self.claim_block() < self.end_block {
            return Err(CcaError::invalid("claim block", "must not be before end block"));
        }
        if self.tick_spacing < MIN_TICK_SPACING {
            return Err(CcaError::invalid(
                "tick spacing",
                format!("must be at least {}", MIN_TICK_SPACING),
            ));
        }
        if self.funds_recipient.is_zero() {
            return Err(CcaError::invalid("funds recipient", "address is required"));
        }
        if self.tokens_recipient.is_zero() {
            return Err(CcaError::invalid("tokens recipient", "address is required"));
        }
        if self.release_schedule.is_empty() {
            return Err(CcaError::invalid("release schedule", "needs at least one segment"));
        }

        let total = self.schedule_total();
        if (total - 100.0).abs() > PERCENT_TOLERANCE {
            return Err(CcaError::invalid(
                "release schedule",
                format!("must total 100% (currently {:.1}%)", total),
            ));
        }

        if let Some(raised) = &self.required_currency_raised {
            parse_units(raised, self.currency_decimals)
                .map_err(|e| CcaError::invalid("required currency raised", e.to_string()))?;
        }

        Ok(())
    }

    pub fn claim_block(&self) -> u64 {
        self.claim_block.unwrap_or(self.end_block)
    }

    pub fn duration(&self) -> u64 {
        self.end_block.saturating_sub(self.start_block)
    }

    pub fn schedule_total(&self) -> f64 {
        self.release_schedule.iter().map(|s| s.percentage).sum()
    }

    /// Validate and compile into contract parameters
    pub fn build(&self) -> Result<AuctionParameters> {
        self.validate()?;

        let floor_price = encode_price_with_decimals(
            self.floor_price,
            self.token_decimals,
            self.currency_decimals,
        )
        .map_err(|e| relabel(e, "floor price"))?;
        if floor_price.is_zero() {
            return Err(CcaError::invalid("floor price", "rounds to zero in Q96"));
        }

        let required_currency_raised = match &self.required_currency_raised {
            Some(raised) => {
                let amount = parse_units(raised, self.currency_decimals)
                    .map_err(|e| relabel(e, "required currency raised"))?;
                if amount > U256::from(u128::MAX) {
                    return Err(CcaError::invalid("required currency raised", "exceeds uint128"));
                }
                amount.as_u128()
            }
            None => 0,
        };

        let schedule = encode_schedule(&self.release_schedule, self.duration())?;

        Ok(AuctionParameters {
            currency: self.currency,
            tokens_recipient: self.tokens_recipient,
            funds_recipient: self.funds_recipient,
            start_block: self.start_block,
            end_block: self.end_block,
            claim_block: self.claim_block(),
            tick_spacing: U256::from(self.tick_spacing),
            validation_hook: self.validation_hook,
            floor_price,
            required_currency_raised,
            auction_steps_data: schedule.to_bytes(),
        })
    }
}

/// Token minted through the launcher ahead of its auction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenLaunch {
    pub name: String,
    pub symbol: String,
    /// Decimal amount, e.g. "1000000"
    pub total_supply: String,
}

impl TokenLaunch {
    pub fn validate(&self, decimals: u8) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CcaError::invalid("token name", "is required"));
        }
        if self.symbol.trim().is_empty() {
            return Err(CcaError::invalid("token symbol", "is required"));
        }
        self.supply_units(decimals).map(|_| ())
    }

    /// Total supply in base units; the launcher takes a uint128
    pub fn supply_units(&self, decimals: u8) -> Result<u128> {
        let supply = parse_units(&self.total_supply, decimals)
            .map_err(|e| relabel(e, "total supply"))?;
        if supply.is_zero() {
            return Err(CcaError::invalid("total supply", "must be > 0"));
        }
        if supply > U256::from(u128::MAX) {
            return Err(CcaError::invalid("total supply", "exceeds uint128"));
        }
        Ok(supply.as_u128())
    }
}

/// Attribute a codec error to the form field it came from
fn relabel(error: CcaError, field: &str) -> CcaError {
    match error {
        CcaError::InvalidInput { reason, .. } => CcaError::invalid(field, reason),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::decode_schedule;

    fn draft() -> AuctionDraft {
        serde_json::from_str(
            r#"{
                "floorPrice": 0.001,
                "startBlock": 1000,
                "endBlock": 1100,
                "tickSpacing": 100,
                "requiredCurrencyRaised": "10",
                "fundsRecipient": "0x00000000000000000000000000000000000000bb",
                "tokensRecipient": "0x00000000000000000000000000000000000000aa",
                "releaseSchedule": [
                    {"percentage": 25}, {"percentage": 25},
                    {"percentage": 25}, {"percentage": 25}
                ]
            }"#,
        )
        .unwrap()
    }

    fn field_of(result: Result<()>) -> String {
        match result {
            Err(CcaError::InvalidInput { field, .. }) => field,
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults_from_json() {
        let d = draft();
        assert!(d.currency.is_zero());
        assert!(d.validation_hook.is_zero());
        assert_eq!(d.claim_block(), 1100);
        assert_eq!(d.token_decimals, 18);
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_build_produces_consistent_parameters() {
        let params = draft().build().unwrap();
        assert_eq!(params.start_block, 1000);
        assert_eq!(params.claim_block, 1100);
        assert_eq!(params.required_currency_raised, 10 * 10u128.pow(18));

        let steps = decode_schedule(&params.auction_steps_data).unwrap();
        assert_eq!(steps.len(), 4);
        assert_eq!(steps.iter().map(|s| s.block_delta).sum::<u64>(), params.duration());
    }

    #[test]
    fn test_errors_name_the_field() {
        let mut d = draft();
        d.floor_price = 0.0;
        assert_eq!(field_of(d.validate()), "floor price");

        let mut d = draft();
        d.end_block = 1000;
        assert_eq!(field_of(d.validate()), "end block");

        let mut d = draft();
        d.tick_spacing = 1;
        assert_eq!(field_of(d.validate()), "tick spacing");

        let mut d = draft();
        d.claim_block = Some(1050);
        assert_eq!(field_of(d.validate()), "claim block");

        let mut d = draft();
        d.funds_recipient = Address::zero();
        assert_eq!(field_of(d.validate()), "funds recipient");

        let mut d = draft();
        d.release_schedule[0].percentage = 20.0;
        assert_eq!(field_of(d.validate()), "release schedule");

        let mut d = draft();
        d.required_currency_raised = Some("-3".into());
        assert_eq!(field_of(d.validate()), "required currency raised");
    }

    #[test]
    fn test_schedule_tolerance() {
        let mut d = draft();
        d.release_schedule[0].percentage = 25.05;
        assert!(d.validate().is_ok());
        // the last segment absorbs the excess
        let params = d.build().unwrap();
        let steps = decode_schedule(&params.auction_steps_data).unwrap();
        let total: u128 = steps.iter().map(|s| s.released()).sum();
        assert_eq!(total, 10_000_000);
    }

    #[test]
    fn test_degenerate_schedule_blocks_build() {
        let mut d = draft();
        d.end_block = 1002;
        assert!(matches!(d.build(), Err(CcaError::DegenerateSchedule(_))));
    }

    #[test]
    fn test_token_launch_fields() {
        let token = TokenLaunch {
            name: "Test Token".into(),
            symbol: "TST".into(),
            total_supply: "1000000".into(),
        };
        assert!(token.validate(18).is_ok());
        assert_eq!(token.supply_units(6).unwrap(), 1_000_000_000_000);

        let unnamed = TokenLaunch { name: "  ".into(), ..token.clone() };
        assert_eq!(field_of(unnamed.validate(18)), "token name");
        let empty = TokenLaunch { total_supply: "0".into(), ..token.clone() };
        assert_eq!(field_of(empty.validate(18)), "total supply");
        let huge = TokenLaunch { total_supply: "1".repeat(40), ..token };
        assert_eq!(field_of(huge.validate(18)), "total supply");
    }
}
