use kube_core::{Resource, ResourceExt};
use std::fmt::{self, Debug, Display};
use tracing::field::DisplayValue;

/// A namespaced (if relevant) reference to a Kubernetes object, for use as a log field
///
/// The reference is only turned into a string when it is displayed, so passing it
/// as a `tracing` field with `%` (or [`ObjectRef::as_value`]) costs nothing for events
/// that are filtered out.
///
/// ```
/// use kref_logs::ObjectRef;
/// let pod = ObjectRef::new("default", "pod-1");
/// tracing::info!(pod = %pod, "reconciling");
/// assert_eq!(pod.to_string(), "default/pod-1");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct ObjectRef {
    namespace: String,
    name: String,
}

impl ObjectRef {
    /// Creates a reference from a namespace and a name
    ///
    /// An empty namespace marks a cluster-scoped object.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Creates a reference from the metadata of a resource
    ///
    /// Falls back on `generateName` when the object has no name yet.
    #[must_use]
    pub fn from_obj<K: Resource>(obj: &K) -> Self {
        Self {
            namespace: obj.namespace().unwrap_or_default(),
            name: obj.name_any(),
        }
    }

    /// The namespace of the object, empty for cluster-scoped objects
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The name of the object
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wraps the reference as a lazily formatted `tracing` field value
    ///
    /// Equivalent to `%obj_ref` inside the `tracing` macros.
    #[must_use]
    pub fn as_value(&self) -> DisplayValue<&Self> {
        tracing::field::display(self)
    }
}

/// Shorthand for [`ObjectRef::new`]
#[must_use]
pub fn kref(namespace: impl Into<String>, name: impl Into<String>) -> ObjectRef {
    ObjectRef::new(namespace, name)
}

/// Shorthand for [`ObjectRef::from_obj`]
#[must_use]
pub fn kobj<K: Resource>(obj: &K) -> ObjectRef {
    ObjectRef::from_obj(obj)
}

impl Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.namespace.is_empty() {
            write!(f, "{}/", self.namespace)?;
        }
        f.write_str(&self.name)
    }
}

impl Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}
