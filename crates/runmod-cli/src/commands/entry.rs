//! Entry routine resolution.

use runmod_bytecode::{Module, RoutineDescriptor};
use runmod_core::names::eq_ignore_case;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionFailure {
    #[error("module '{module}' declares no entry routine")]
    NoEntryPoint { module: String },
    #[error("no static routine matches '{search}'")]
    NoMatch { search: String },
}

/// Pick the routine to invoke.
///
/// Without search text this is the module's entry routine. With it, static
/// routines are searched in declaration order: first by qualified name, then
/// by bare name, both case-insensitively.
pub fn resolve_entry<'m>(
    module: &'m Module,
    search: Option<&str>,
) -> Result<&'m RoutineDescriptor, ResolutionFailure> {
    let Some(search) = search else {
        return module
            .entry()
            .map(|id| module.routine(id))
            .ok_or_else(|| ResolutionFailure::NoEntryPoint {
                module: module.name().to_owned(),
            });
    };

    let found = module
        .static_routines()
        .find(|r| eq_ignore_case(&r.qualified_name(), search))
        .or_else(|| {
            module
                .static_routines()
                .find(|r| eq_ignore_case(&r.name, search))
        });

    match found {
        Some(routine) => {
            tracing::debug!(search, routine = %routine.qualified_name(), "entry resolved");
            Ok(routine)
        }
        None => Err(ResolutionFailure::NoMatch {
            search: search.to_owned(),
        }),
    }
}
