use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;

use crate::classfile::{ClassDescriptor, package_of};
use crate::dependency::{DependencyType, Granularity};
use crate::error::ModelError;

use super::{ClassPackage, ClassRef, Component, Dependency};

/// Where a component came from on the analysed classpath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentRole {
    Sources,
    Required,
    Libraries,
}

impl ComponentRole {
    pub fn name(self) -> &'static str {
        match self {
            ComponentRole::Sources => "sources",
            ComponentRole::Required => "required",
            ComponentRole::Libraries => "libraries",
        }
    }
}

/// Which self references of a package to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfReference {
    /// Every import naming the package, resolvable or not.
    Shallow,
    /// Imports satisfied by the package instance itself.
    DeepInternal,
    /// Imports satisfied only by an equally named package in another component.
    DeepExternal,
}

#[derive(Debug)]
struct Member {
    role: ComponentRole,
    component: Component,
}

/// Components analysed together. Resolution prefers the referencing class's
/// own component, then the first other component in insertion order.
#[derive(Debug)]
pub struct Group {
    name: String,
    members: Vec<Member>,
    by_name: HashMap<String, usize>,
    class_index: HashMap<String, Vec<usize>>,
}

impl Group {
    pub fn new(
        name: impl Into<String>,
        components: Vec<(ComponentRole, Component)>,
    ) -> Result<Self, ModelError> {
        let mut members = Vec::with_capacity(components.len());
        let mut by_name = HashMap::new();
        let mut class_index: HashMap<String, Vec<usize>> = HashMap::new();

        for (index, (role, component)) in components.into_iter().enumerate() {
            if by_name.insert(component.name().to_string(), index).is_some() {
                return Err(ModelError::DuplicateComponent(component.name().to_string()));
            }
            for class in component.classes() {
                class_index.entry(class.name().to_string()).or_default().push(index);
            }
            members.push(Member { role, component });
        }

        Ok(Self {
            name: name.into(),
            members,
            by_name,
            class_index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn components(&self) -> impl Iterator<Item = (ComponentRole, &Component)> {
        self.members.iter().map(|m| (m.role, &m.component))
    }

    pub fn component(&self, name: &str) -> Result<&Component, ModelError> {
        self.index_of(name).map(|i| &self.members[i].component)
    }

    pub fn class_count(&self) -> usize {
        self.members.iter().map(|m| m.component.class_count()).sum()
    }

    pub fn classes(&self) -> impl Iterator<Item = (&Component, &Arc<ClassDescriptor>)> {
        self.members
            .iter()
            .flat_map(|m| m.component.classes().map(move |c| (&m.component, c)))
    }

    /// Names of components holding a class called `name`, in group order.
    pub fn providers(&self, name: &str) -> Vec<&str> {
        self.class_index
            .get(name)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&i| self.members[i].component.name())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn abstraction(&self) -> f64 {
        let total = self.class_count();
        if total == 0 {
            return 0.0;
        }
        let abstract_count = self.classes().filter(|(_, c)| c.is_abstract()).count();
        abstract_count as f64 / total as f64
    }

    /// Resolves `target` as seen from a class of `from`, classifying the edge.
    pub fn link(
        &self,
        from: &Component,
        source_package: &str,
        target: &str,
    ) -> (ClassRef, DependencyType) {
        if let Some(descriptor) = from.class(target) {
            let kind = from.classify(source_package, target);
            let target = ClassRef::Known {
                component: from.name().to_string(),
                descriptor: Arc::clone(descriptor),
            };
            return (target, kind);
        }

        let provider = self.class_index.get(target).and_then(|indices| {
            indices
                .iter()
                .map(|&i| &self.members[i].component)
                .find(|c| c.name() != from.name())
        });
        match provider.and_then(|c| c.class(target).map(|d| (c, d))) {
            Some((component, descriptor)) => {
                let kind = if package_of(target) == source_package {
                    DependencyType::INTRA_PACKAGE_INTER_COMPONENT
                } else {
                    DependencyType::INTER_PACKAGE_INTER_COMPONENT
                };
                let target = ClassRef::Known {
                    component: component.name().to_string(),
                    descriptor: Arc::clone(descriptor),
                };
                (target, kind)
            }
            None => (
                ClassRef::External {
                    component: from.name().to_string(),
                    name: target.to_string(),
                },
                DependencyType::EXTRA_GROUP,
            ),
        }
    }

    pub fn classify(&self, from: &Component, source_package: &str, target: &str) -> DependencyType {
        self.link(from, source_package, target).1
    }

    pub fn efferents(
        &self,
        component: &str,
        class_name: &str,
        filter: impl Into<DependencyType>,
    ) -> Result<Vec<Dependency>, ModelError> {
        let filter = filter.into();
        Granularity::Group.check_filter(filter)?;
        let from = self.component(component)?;
        let source = from.class(class_name).ok_or_else(|| ModelError::UnknownClass {
            scope: format!("component `{component}` of group `{}`", self.name),
            class: class_name.to_string(),
        })?;

        Ok(source
            .imported_class_names()
            .iter()
            .filter_map(|import| {
                let (target, kind) = self.link(from, source.package_name(), import);
                kind.is_supported_by(filter).then(|| Dependency {
                    source: Arc::clone(source),
                    target,
                    kind,
                })
            })
            .collect())
    }

    /// Every class in the group importing `target`, each edge resolved from
    /// its own component.
    pub fn afferents(
        &self,
        target: &str,
        filter: impl Into<DependencyType>,
    ) -> Result<Vec<Dependency>, ModelError> {
        let filter = filter.into();
        Granularity::Group.check_filter(filter)?;

        let reachable = if self.class_index.contains_key(target) {
            DependencyType::INTRA_GROUP
        } else {
            DependencyType::EXTRA_GROUP
        };
        if (reachable & filter).is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .classes()
            .filter(|(_, class)| class.imports(target))
            .filter_map(|(component, class)| {
                let (target, kind) = self.link(component, class.package_name(), target);
                kind.is_supported_by(filter).then(|| Dependency {
                    source: Arc::clone(class),
                    target,
                    kind,
                })
            })
            .collect())
    }

    pub fn self_references(
        &self,
        component: &str,
        package: &str,
        strength: SelfReference,
    ) -> Result<BTreeSet<String>, ModelError> {
        let owner = self.package(component, package)?;
        Ok(match strength {
            SelfReference::Shallow => owner.shallow_self_references().clone(),
            SelfReference::DeepInternal => owner.deep_internal_self_references(),
            SelfReference::DeepExternal => owner
                .shallow_self_references()
                .iter()
                .filter(|name| !owner.contains(name))
                .filter(|name| {
                    self.members.iter().any(|m| {
                        m.component.name() != component
                            && m.component
                                .package(package)
                                .is_some_and(|p| p.contains(name))
                    })
                })
                .cloned()
                .collect(),
        })
    }

    fn package(&self, component: &str, package: &str) -> Result<&ClassPackage, ModelError> {
        self.component(component)?
            .package(package)
            .ok_or_else(|| ModelError::UnknownPackage {
                component: component.to_string(),
                package: package.to_string(),
            })
    }

    fn index_of(&self, name: &str) -> Result<usize, ModelError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::UnknownComponent(name.to_string()))
    }
}
