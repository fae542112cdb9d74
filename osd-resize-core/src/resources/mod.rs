use std::borrow::Cow;

use thiserror::Error;

pub mod clusterdeployment;
pub mod cpms;
pub mod labels;
pub mod machinepool;
pub mod node;
pub mod provider_spec;

#[derive(Debug, Error)]
pub enum ResourceDataError {
    #[error("'{}' resource is missing required data ({})!", .0, .1)]
    MissingData(&'static str, Cow<'static, str>),
    #[error("'{}' resource contains invalid data ({})!", .0, .1)]
    InvalidData(&'static str, Cow<'static, str>),
}

#[cfg(test)]
pub(crate) mod fixtures;
