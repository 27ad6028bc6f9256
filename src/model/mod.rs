//! Packages, components and groups of decoded classes.
//!
//! Every level is assembled through a builder and frozen before it can be
//! queried, so no query ever runs against a partially loaded graph.

mod component;
mod group;
mod package;

use std::sync::Arc;

use crate::classfile::{ClassDescriptor, ClassType, package_of};
use crate::dependency::DependencyType;

pub use component::{Component, ComponentBuilder};
pub use group::{ComponentRole, Group, SelfReference};
pub use package::{ClassPackage, PackageBuilder};

/// The target of an import, resolved against some scope.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassRef {
    Known {
        component: String,
        descriptor: Arc<ClassDescriptor>,
    },
    /// Not found in the scope that resolved it; `component` names that scope.
    External { component: String, name: String },
}

impl ClassRef {
    pub fn name(&self) -> &str {
        match self {
            ClassRef::Known { descriptor, .. } => descriptor.name(),
            ClassRef::External { name, .. } => name,
        }
    }

    pub fn component(&self) -> &str {
        match self {
            ClassRef::Known { component, .. } | ClassRef::External { component, .. } => component,
        }
    }

    pub fn package_name(&self) -> &str {
        package_of(self.name())
    }

    pub fn class_type(&self) -> ClassType {
        match self {
            ClassRef::Known { descriptor, .. } => descriptor.class_type(),
            ClassRef::External { .. } => ClassType::ExternalClass,
        }
    }

    pub fn descriptor(&self) -> Option<&Arc<ClassDescriptor>> {
        match self {
            ClassRef::Known { descriptor, .. } => Some(descriptor),
            ClassRef::External { .. } => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, ClassRef::Known { .. })
    }
}

/// One import edge, classified by the scope that answered the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub source: Arc<ClassDescriptor>,
    pub target: ClassRef,
    pub kind: DependencyType,
}
