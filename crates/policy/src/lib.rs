//! Class-hierarchy-aware policy and behaviour dispatch.
//!
//! Policies are named extension points with one operation. Behaviours attach
//! to a policy through a [`Binding`]: a class or aspect, a class feature, a
//! single node, or a service. Firing a policy for a binding walks the class
//! hierarchy to the nearest bound behaviours, filters them through the
//! unit-of-work scoped [`BehaviourFilter`], and runs them now, once per key,
//! or just before commit according to their [`NotificationFrequency`].
//!
//! All unit-of-work state is carried by an explicit [`UnitOfWork`] passed to
//! every call; the shared state (registry, indexes and handler caches) is
//! owned by one [`PolicyComponent`].

/// Behaviours and bound definitions.
pub mod behaviour;
/// Binding keys and generalisation.
pub mod binding;
/// Registration and binding front end.
pub mod component;
/// Engine configuration.
pub mod config;
mod deferred;
/// Aggregate handlers and factories.
pub mod dispatch;
/// Error types.
pub mod error;
/// Unit-of-work scoped filtering.
pub mod filter;
/// Per-policy behaviour index.
pub mod index;
#[cfg(any(test, doc))]
pub(crate) mod invariants;
/// Policy shapes, definitions and registry.
pub mod policy;
#[cfg(any(test, doc))]
pub(crate) mod test_fixtures;
/// Unit-of-work context.
pub mod uow;

pub use behaviour::{
	Behaviour, BehaviourBuilder, BehaviourDefinition, BehaviourHandler, BehaviourId, Invocation,
	NotificationFrequency, Signature,
};
pub use binding::{Binding, Feature, ServiceId};
pub use component::{
	AssociationPolicyDelegate, ClassPolicyDelegate, PolicyComponent, PropertyPolicyDelegate,
};
pub use config::PolicyConfig;
pub use dispatch::{
	CachedPolicyFactory, Dispatch, HandlerList, PolicyFactory, PolicyHandler, PolicyHandlerFactory,
};
pub use error::{
	BindingError, BoxError, ConfigError, DefinitionError, FilterError, PolicyError, ValidationError,
};
pub use filter::{BehaviourFilter, FilterScope};
pub use index::{BehaviourChangeObserver, BehaviourIndex};
pub use policy::{ArgRole, Operation, PolicyDefinition, PolicyKind, PolicyShape};
pub use uow::{Status, UnitOfWork, UnitOfWorkId};
