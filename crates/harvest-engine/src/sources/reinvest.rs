//! Simulated daily reinvestment of one source's yield into another's pool.

use harvest_config::{SourceKind, SourceSpec};
use harvest_core::error::ensure_finite;
use harvest_core::{simulated_reinvestment, RewardContribution};
use harvest_traits::SourceId;

use super::{kind_mismatch, SourceContext};
use crate::error::{SourceError, SourceResult};

fn upstream<'a>(ctx: &'a SourceContext, id: &SourceId) -> SourceResult<&'a RewardContribution> {
    ctx.upstream
        .get(id)
        .ok_or_else(|| SourceError::DependencyUnmet(format!("result of source {id}")))
}

/// Sweeps the feed yield into the reinvest pool daily for `days` days.
///
/// Reads only results computed in earlier waves; never touches a collaborator.
pub(super) fn reinvestment(
    spec: &SourceSpec,
    ctx: &SourceContext,
) -> SourceResult<RewardContribution> {
    let SourceKind::Reinvestment {
        feed,
        feed_label,
        reinvest,
        days,
    } = &spec.kind
    else {
        return Err(kind_mismatch(spec, "reinvestment"));
    };

    let feed_result = upstream(ctx, feed)?;
    let feed_value = match feed_label {
        Some(label) => feed_result.value(label),
        None => feed_result.entries().first().map(|(_, v)| *v),
    }
    .ok_or_else(|| SourceError::DependencyUnmet(format!("yield of source {feed}")))?;

    let reinvest_apr = upstream(ctx, reinvest)?
        .apr()
        .ok_or_else(|| SourceError::DependencyUnmet(format!("apr of source {reinvest}")))?;

    let value = simulated_reinvestment(
        ensure_finite("feed yield", feed_value)? / 100.0,
        ensure_finite("reinvest apr", reinvest_apr)? / 100.0,
        *days,
    );
    let value = ensure_finite("reinvested yield", value)?;

    Ok(RewardContribution::new(spec.label.as_str(), value).with_apr(value))
}
