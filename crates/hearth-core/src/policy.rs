//! Deciding how a domain accumulates across packages.

use crate::integration::{Component, Integration};
use hearth_config::MergePolicy;

/// Resolve the merge policy for the integration's domain.
///
/// In order of priority:
/// 1. the merge hint of a config platform that carries a custom validator;
/// 2. the merge hint declared by the component;
/// 3. a platform-entry schema, which forces [`MergePolicy::List`];
/// 4. probing the component's whole-document schema.
///
/// `None` means the policy could not be determined.
pub fn merge_policy_for(integration: &Integration, component: &Component) -> Option<MergePolicy> {
    // A config platform that fails to load does not take part in merging.
    if let Ok(Some(config_platform)) = integration.config_platform() {
        if config_platform.validator.is_some() {
            if let Some(hint) = config_platform.merge_hint {
                return Some(hint);
            }
        }
    }

    if let Some(hint) = component.merge_hint {
        return Some(hint);
    }

    if component.platform_schema.is_some() {
        return Some(MergePolicy::List);
    }

    component
        .config_schema
        .as_ref()
        .and_then(|schema| schema.merge_policy(&integration.domain))
}

/// Like [`merge_policy_for`], with an undetermined policy treated as
/// [`MergePolicy::Dict`].
pub fn effective_merge_policy(integration: &Integration, component: &Component) -> MergePolicy {
    match merge_policy_for(integration, component) {
        Some(policy) => policy,
        None => {
            tracing::debug!(
                domain = %integration.domain,
                "merge policy undetermined, merging as dict"
            );
            MergePolicy::Dict
        }
    }
}
