//! Staking rewards contracts.

use harvest_config::{SourceKind, SourceSpec};
use harvest_core::units::format_ether;
use harvest_core::RewardContribution;
use harvest_traits::ContractCall;

use super::{kind_mismatch, per_second_to_year, Emission, SourceContext};
use crate::error::{SourceError, SourceResult};

/// `rewardRate()` per second against `totalSupply()` of the staked token.
pub(super) async fn staking_rewards(
    spec: &SourceSpec,
    ctx: &SourceContext,
) -> SourceResult<RewardContribution> {
    let SourceKind::StakingRewards {
        contract,
        reward_token,
        staking_token_method,
        staked_symbol,
    } = &spec.kind
    else {
        return Err(kind_mismatch(spec, "staking_rewards"));
    };

    let reward_price = ctx.prices.require(reward_token)?;

    let values = ctx
        .read_all(&[
            ContractCall::new(contract.clone(), "rewardRate"),
            ContractCall::new(contract.clone(), staking_token_method.as_str()),
            ContractCall::new(contract.clone(), "totalSupply"),
        ])
        .await?;
    let reward_rate = format_ether(values[0].as_uint()?);
    let staking_token = values[1].as_address()?.clone();
    let total_supply = format_ether(values[2].as_uint()?);

    let staked_price = ctx
        .staked_price(&staking_token, staked_symbol.as_ref())
        .await?;

    Emission {
        tokens_per_year: per_second_to_year(reward_rate),
        reward_price,
        staked_units: total_supply,
        staked_price,
    }
    .contribution(&spec.label, ctx.emission_discount(spec))
}

/// `getRewardForDuration()` spread over `rewardsDuration()` seconds.
///
/// A retired source reports `{label: 0, apr: 0}` without reading anything.
pub(super) async fn rewards_for_duration(
    spec: &SourceSpec,
    ctx: &SourceContext,
) -> SourceResult<RewardContribution> {
    let SourceKind::RewardsForDuration {
        contract,
        reward_token,
        staked_symbol,
        retired,
    } = &spec.kind
    else {
        return Err(kind_mismatch(spec, "rewards_for_duration"));
    };

    if *retired {
        return Ok(RewardContribution::new(spec.label.as_str(), 0.0).with_apr(0.0));
    }

    let reward_price = ctx.prices.require(reward_token)?;

    let values = ctx
        .read_all(&[
            ContractCall::new(contract.clone(), "rewardsDuration"),
            ContractCall::new(contract.clone(), "getRewardForDuration"),
            ContractCall::new(contract.clone(), "stakingToken"),
            ContractCall::new(contract.clone(), "totalSupply"),
        ])
        .await?;
    // plain integer, not an 18-decimal amount
    let duration = values[0].as_uint()? as f64;
    let reward_for_duration = format_ether(values[1].as_uint()?);
    let staking_token = values[2].as_address()?.clone();
    let total_supply = format_ether(values[3].as_uint()?);

    if duration <= 0.0 {
        return Err(SourceError::ComputationInvalid(format!(
            "rewards duration of {} is zero",
            spec.id
        )));
    }

    let staked_price = ctx
        .staked_price(&staking_token, staked_symbol.as_ref())
        .await?;

    Emission {
        tokens_per_year: per_second_to_year(reward_for_duration / duration),
        reward_price,
        staked_units: total_supply,
        staked_price,
    }
    .contribution(&spec.label, ctx.emission_discount(spec))
}
