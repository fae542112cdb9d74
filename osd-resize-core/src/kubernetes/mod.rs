use kube::{core::object::HasStatus, Resource};

pub mod drain;
pub mod operations;
pub mod patch;
pub mod wait;

/// Produces a copy of an object that can be submitted to the API server as a new resource.
pub trait AsTemplate {
    fn as_template(&self) -> Self;
}

impl<T: Clone + Resource + HasStatus> AsTemplate for T {
    fn as_template(&self) -> Self {
        let mut template = self.clone();
        let metadata = template.meta_mut();

        metadata.creation_timestamp = None;
        metadata.deletion_timestamp = None;
        metadata.deletion_grace_period_seconds = None;
        metadata.resource_version = None;
        metadata.generation = None;
        metadata.uid = None;
        metadata.finalizers = None;
        metadata.managed_fields = None;
        metadata.self_link = None;

        *template.status_mut() = None;

        template
    }
}
