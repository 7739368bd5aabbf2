//! Operation handlers, one module per resource
//!
//! Every handler extracts and validates its arguments first, then makes at
//! most one backend call, so a validation failure never reaches the backend.

mod access_group;
mod backup;
mod edge_job;
mod environment;
mod environment_group;
mod proxy;
mod registry;
mod settings;
mod stack;
mod system;
mod tag;
mod team;
mod template;
mod user;

use tool_args::{ArgError, Arguments, validate};

use super::catalog::OperationSpec;
use crate::Error;
use crate::portainer::{ACCESS_LEVELS, AccessLevel, AccessMap};

/// Every operation this server implements
#[must_use]
pub fn operations() -> Vec<OperationSpec> {
    [
        system::OPERATIONS,
        environment::OPERATIONS,
        environment_group::OPERATIONS,
        access_group::OPERATIONS,
        tag::OPERATIONS,
        stack::OPERATIONS,
        team::OPERATIONS,
        user::OPERATIONS,
        settings::OPERATIONS,
        registry::OPERATIONS,
        template::OPERATIONS,
        edge_job::OPERATIONS,
        backup::OPERATIONS,
        proxy::OPERATIONS,
    ]
    .concat()
}

/// Wrap a backend error with the operation that was attempted
fn failed(operation: &'static str) -> impl FnOnce(Error) -> Error {
    move |source| Error::backend(operation, source)
}

/// Required positive id
fn id(args: &Arguments, name: &str) -> tool_args::Result<i64> {
    validate::positive(name, args.integer(name, true)?)
}

/// Required array of positive ids
fn ids(args: &Arguments, name: &str) -> tool_args::Result<Vec<i64>> {
    let ids = args.integer_array(name, true)?;
    validate::all_positive(name, &ids)?;
    Ok(ids)
}

/// Optional array of positive ids; `None` when absent
fn optional_ids(args: &Arguments, name: &str) -> tool_args::Result<Option<Vec<i64>>> {
    let ids = args.optional_integer_array(name)?;
    if let Some(ids) = &ids {
        validate::all_positive(name, ids)?;
    }
    Ok(ids)
}

/// Required string that is not blank
fn name(args: &Arguments, name: &str) -> tool_args::Result<String> {
    let value = args.string(name, true)?;
    validate::non_empty(name, &value)?;
    Ok(value)
}

/// Optional string that is not blank when present
fn optional_name(args: &Arguments, name: &str) -> tool_args::Result<Option<String>> {
    let value = args.optional_string(name)?;
    if let Some(value) = &value {
        validate::non_empty(name, value)?;
    }
    Ok(value)
}

/// Optional URL, validated when present
fn optional_url(args: &Arguments, name: &str) -> tool_args::Result<Option<String>> {
    let value = args.optional_string(name)?;
    if let Some(value) = &value {
        validate::url(name, value)?;
    }
    Ok(value)
}

/// Required `[{id, access}]` list as an access map
///
/// Every entry is checked before anything is returned, so one bad access
/// level rejects the whole request.
fn access_map(args: &Arguments, name: &str) -> tool_args::Result<AccessMap> {
    let mut map = AccessMap::new();
    for entry in args.object_array(name, true)? {
        let entry = Arguments::new(entry);
        let id = entry
            .integer("id", true)
            .and_then(|id| validate::positive("id", id))
            .map_err(|e| ArgError::invalid(name, e.to_string()))?;
        let access = entry
            .string("access", true)
            .map_err(|e| ArgError::invalid(name, e.to_string()))?;
        validate::one_of(name, &access, ACCESS_LEVELS)?;
        let level: AccessLevel = access
            .parse()
            .map_err(|e: String| ArgError::invalid(name, e))?;
        map.insert(id, level);
    }
    Ok(map)
}
