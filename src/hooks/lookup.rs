use std::rc::Rc;

use super::{FIND_BY_ID, Feature, HookEvent, HookRegistry, HookScope};
use crate::core::Value;

/// Answers `core.find_by_id` by asking the entity type's backend whether a
/// row with that identity exists.
///
/// Installed by default on every entity type. Several lookups may compete
/// for the same event; the first one that finds the row wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendLookup;

impl Feature for BackendLookup {
    fn name(&self) -> &str {
        "backend_lookup"
    }

    fn install(&self, hooks: &mut HookRegistry) {
        hooks.listen(
            FIND_BY_ID,
            Rc::new(|scope: &HookScope<'_>, event: &mut HookEvent<'_>| {
                let HookEvent::FindById { id } = *event else {
                    return Ok(None);
                };
                let backend = scope.entity_type.backend(None)?;
                if backend.exists(scope.entity_type.storage_name(), id)? {
                    Ok(Some(Value::from(id)))
                } else {
                    Ok(None)
                }
            }),
        );
    }
}
