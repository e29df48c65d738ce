//! Copilot and skill metadata fetching.
//!
//! One registration cycle fetches the copilot, fans out one metadata fetch
//! per declared skill id (all in flight at once, joined before building),
//! and drops scheduling-only skills. A failed individual fetch is logged
//! and skipped; one bad skill never aborts the whole listing.

use crate::error::ServerError;
use crate::platform::{PlatformApi, Skill};
use futures::future::join_all;
use tracing::{debug, warn};

/// Fetch the interactive skills a copilot exposes, in declaration order.
///
/// Fails when the copilot id does not resolve or the copilot fetch itself
/// errors; individual skill failures are tolerated.
pub async fn fetch_skills(
    api: &dyn PlatformApi,
    copilot_id: &str,
) -> Result<Vec<Skill>, ServerError> {
    let copilot = api
        .get_copilot(copilot_id)
        .await?
        .ok_or_else(|| {
            ServerError::Configuration(format!("Copilot with ID '{}' not found", copilot_id))
        })?;

    let skill_ids = copilot.copilot_skill_ids;
    if skill_ids.is_empty() {
        return Ok(Vec::new());
    }

    // Fan-out: latency equals the slowest fetch, not the sum.
    let fetches = skill_ids
        .iter()
        .map(|skill_id| api.get_skill(copilot_id, skill_id));
    let results = join_all(fetches).await;

    let mut skills = Vec::with_capacity(skill_ids.len());
    for (skill_id, result) in skill_ids.iter().zip(results) {
        match result {
            Ok(Some(skill)) if skill.scheduling_only => {
                debug!("Skipping scheduling-only skill {}", skill_id);
            }
            Ok(Some(skill)) => skills.push(skill),
            Ok(None) => warn!("Skill {} not found for copilot {}", skill_id, copilot_id),
            Err(e) => warn!("Error fetching skill {}: {}", skill_id, e),
        }
    }

    Ok(skills)
}
