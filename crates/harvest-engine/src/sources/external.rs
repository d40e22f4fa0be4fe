//! Yields reported by off-chain collaborators.

use harvest_config::{SourceKind, SourceSpec};
use harvest_core::error::ensure_finite;
use harvest_core::RewardContribution;
use harvest_traits::{Collaborators, PoolId, YieldKey};

use super::{compounding_contribution, kind_mismatch, SourceContext};
use crate::error::{SourceError, SourceResult};

/// Reported yield for `key` as a finite fraction.
async fn reported(ctx: &SourceContext, key: &YieldKey) -> SourceResult<f64> {
    let value = ctx
        .collaborators
        .external
        .reported_yield(key)
        .await?
        .ok_or_else(|| SourceError::DependencyUnmet(format!("reported yield {key}")))?;
    Ok(ensure_finite("reported yield", value)?)
}

/// An off-chain emission APR, discounted and compounded like an on-chain one.
pub(super) async fn external_emission(
    spec: &SourceSpec,
    ctx: &SourceContext,
) -> SourceResult<RewardContribution> {
    let SourceKind::ExternalEmission { key } = &spec.kind else {
        return Err(kind_mismatch(spec, "external_emission"));
    };

    let raw = reported(ctx, key).await?;
    Ok(compounding_contribution(
        &spec.label,
        raw * ctx.emission_discount(spec),
    ))
}

/// An aggregator-reported yield shown as-is, never re-compounded.
pub(super) async fn pass_through(
    spec: &SourceSpec,
    ctx: &SourceContext,
) -> SourceResult<RewardContribution> {
    let SourceKind::PassThrough { key } = &spec.kind else {
        return Err(kind_mismatch(spec, "pass_through"));
    };

    let y = reported(ctx, key).await?;
    let value = y * 100.0 * spec.fee_discount.unwrap_or(1.0);
    Ok(RewardContribution::new(spec.label.as_str(), value).with_apr(value))
}

/// Trailing fee yield (percent) of `pool` as an `lp` contribution.
///
/// The caller relabels it when the route item names another label.
pub async fn fee_contribution(
    collaborators: &Collaborators,
    pool: &PoolId,
) -> SourceResult<RewardContribution> {
    let value = collaborators
        .fees
        .fee_apr(pool)
        .await?
        .ok_or_else(|| SourceError::DependencyUnmet(format!("fee data of {pool}")))?;
    Ok(RewardContribution::lp(ensure_finite("fee apr", value)?))
}
