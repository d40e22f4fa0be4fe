//! MasterChef-family pools: allocation-point chefs, their secondary
//! rewarders, and weighted staking pools.

use harvest_config::{RateBasis, SourceKind, SourceSpec};
use harvest_core::units::format_ether;
use harvest_core::RewardContribution;
use harvest_traits::{CallArg, ContractCall};

use super::{kind_mismatch, per_second_to_year, Emission, SourceContext};
use crate::error::{SourceError, SourceResult};

/// `perBlock x share x allocPoint / totalAllocPoint`, staked amount is the
/// chef's LP balance.
pub(super) async fn master_chef(
    spec: &SourceSpec,
    ctx: &SourceContext,
) -> SourceResult<RewardContribution> {
    let SourceKind::MasterChef {
        chef,
        pool_id,
        lp_token,
        reward_token,
        per_block_method,
        emission_share,
        staked_symbol,
    } = &spec.kind
    else {
        return Err(kind_mismatch(spec, "master_chef"));
    };

    let reward_price = ctx.prices.require(reward_token)?;

    let values = ctx
        .read_all(&[
            ContractCall::new(chef.clone(), per_block_method.as_str()),
            ContractCall::new(chef.clone(), "totalAllocPoint"),
            ContractCall::new(chef.clone(), "poolInfo.allocPoint").arg(CallArg::Uint(*pool_id)),
            ContractCall::new(lp_token.clone(), "balanceOf").arg(CallArg::Address(chef.clone())),
        ])
        .await?;
    let per_block = format_ether(values[0].as_uint()?);
    let total_alloc = values[1].as_uint()? as f64;
    let alloc = values[2].as_uint()? as f64;
    let staked = format_ether(values[3].as_uint()?);

    if total_alloc <= 0.0 {
        return Err(SourceError::ComputationInvalid(format!(
            "total allocation of {chef} is zero"
        )));
    }

    let staked_price = ctx.staked_price(lp_token, staked_symbol.as_ref()).await?;
    let pool_per_block = per_block * emission_share * alloc / total_alloc;

    Emission {
        tokens_per_year: ctx.per_block_to_year(pool_per_block),
        reward_price,
        staked_units: staked,
        staked_price,
    }
    .contribution(&spec.label, ctx.emission_discount(spec))
}

/// Secondary rewarder looked up through `chef.rewarder(pid)`.
pub(super) async fn rewarder(
    spec: &SourceSpec,
    ctx: &SourceContext,
) -> SourceResult<RewardContribution> {
    let SourceKind::Rewarder {
        chef,
        pool_id,
        lp_token,
        reward_token,
        rate,
        staked_symbol,
    } = &spec.kind
    else {
        return Err(kind_mismatch(spec, "rewarder"));
    };

    let reward_price = ctx.prices.require(reward_token)?;

    let rewarder = ctx
        .read_address(ContractCall::new(chef.clone(), "rewarder").arg(CallArg::Uint(*pool_id)))
        .await?;

    let rate_method = match rate {
        RateBasis::PerBlock => "tokenPerBlock",
        RateBasis::PerSecond => "rewardRate",
    };
    let amounts = ctx
        .read_amounts(&[
            ContractCall::new(rewarder, rate_method),
            ContractCall::new(lp_token.clone(), "balanceOf").arg(CallArg::Address(chef.clone())),
        ])
        .await?;
    let (emitted, staked) = (amounts[0], amounts[1]);

    let tokens_per_year = match rate {
        RateBasis::PerBlock => ctx.per_block_to_year(emitted),
        RateBasis::PerSecond => per_second_to_year(emitted),
    };

    let staked_price = ctx.staked_price(lp_token, staked_symbol.as_ref()).await?;

    Emission {
        tokens_per_year,
        reward_price,
        staked_units: staked,
        staked_price,
    }
    .contribution(&spec.label, ctx.emission_discount(spec))
}

/// `rewardRate() x poolWeight / totalWeight` per block.
pub(super) async fn weighted_pool(
    spec: &SourceSpec,
    ctx: &SourceContext,
) -> SourceResult<RewardContribution> {
    let SourceKind::WeightedPool {
        pools,
        pool_id,
        staked_token,
        reward_token,
        staked_symbol,
    } = &spec.kind
    else {
        return Err(kind_mismatch(spec, "weighted_pool"));
    };

    let reward_price = ctx.prices.require(reward_token)?;

    let values = ctx
        .read_all(&[
            ContractCall::new(pools.clone(), "rewardRate"),
            ContractCall::new(pools.clone(), "totalRewardWeight"),
            ContractCall::new(pools.clone(), "getPoolRewardWeight").arg(CallArg::Uint(*pool_id)),
            ContractCall::new(staked_token.clone(), "balanceOf")
                .arg(CallArg::Address(pools.clone())),
        ])
        .await?;
    let rate = format_ether(values[0].as_uint()?);
    let total_weight = values[1].as_uint()? as f64;
    let weight = values[2].as_uint()? as f64;
    let staked = format_ether(values[3].as_uint()?);

    if total_weight <= 0.0 {
        return Err(SourceError::ComputationInvalid(format!(
            "total reward weight of {pools} is zero"
        )));
    }

    let staked_price = ctx
        .staked_price(staked_token, staked_symbol.as_ref())
        .await?;

    Emission {
        tokens_per_year: ctx.per_block_to_year(rate) * weight / total_weight,
        reward_price,
        staked_units: staked,
        staked_price,
    }
    .contribution(&spec.label, ctx.emission_discount(spec))
}
