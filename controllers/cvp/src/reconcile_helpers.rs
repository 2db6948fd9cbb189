//! Helper functions for common reconciliation patterns
//!
//! Name resolution against collected facts, shared by the container and
//! device managers.

use crate::error::ControllerError;
use crate::facts::CvpFacts;
use cvp_client::{Configlet, Container};
use tracing::debug;

/// Look up configlets by name, in the given order
///
/// A configlet missing from CVP is only acceptable when `planned` says it
/// would have been created earlier in this run (dry runs); a placeholder with
/// an empty key stands in for it.
pub fn resolve_configlets<F>(
    facts: &CvpFacts,
    names: &[String],
    planned: F,
) -> Result<Vec<Configlet>, ControllerError>
where
    F: Fn(&str) -> bool,
{
    names
        .iter()
        .map(|name| match facts.configlet(name) {
            Some(configlet) => Ok(configlet.clone()),
            None if planned(name) => {
                debug!("Configlet {} not in CVP yet, using placeholder", name);
                Ok(Configlet {
                    name: name.clone(),
                    ..Default::default()
                })
            }
            None => Err(ControllerError::ConfigletNotFound(name.clone())),
        })
        .collect()
}

/// Look up a container by name, with the same placeholder rule as configlets
pub fn resolve_container<F>(
    facts: &CvpFacts,
    name: &str,
    planned: F,
) -> Result<Container, ControllerError>
where
    F: Fn(&str) -> bool,
{
    match facts.container(name) {
        Some(container) => Ok(container.clone()),
        None if planned(name) => Ok(Container {
            name: name.to_string(),
            ..Default::default()
        }),
        None => Err(ControllerError::ContainerNotFound(name.to_string())),
    }
}

/// Comma-separated names for log lines and result entries
pub fn join_names<'a>(names: impl IntoIterator<Item = &'a String>) -> String {
    names
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
