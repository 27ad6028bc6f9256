use std::collections::BTreeMap;
use std::sync::Arc;

use crate::classfile::{ClassDescriptor, package_of};
use crate::dependency::{DependencyType, Granularity};
use crate::error::ModelError;

use super::{ClassPackage, ClassRef, Dependency, PackageBuilder};

#[derive(Debug)]
pub struct ComponentBuilder {
    name: String,
    packages: BTreeMap<String, PackageBuilder>,
}

impl ComponentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            packages: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class_count(&self) -> usize {
        self.packages.values().map(PackageBuilder::len).sum()
    }

    /// Routes the class into the package named by its qualified name.
    pub fn add_class(&mut self, class: ClassDescriptor) -> Result<(), ModelError> {
        let package = class.package_name().to_string();
        self.packages
            .entry(package)
            .or_insert_with_key(|package| PackageBuilder::new(self.name.clone(), package.clone()))
            .add_class(class)
    }

    pub fn build(self) -> Component {
        let packages: BTreeMap<String, ClassPackage> = self
            .packages
            .into_iter()
            .map(|(name, builder)| (name, builder.build()))
            .collect();
        let class_count = packages.values().map(ClassPackage::len).sum();
        Component {
            name: self.name,
            packages,
            class_count,
        }
    }
}

/// A named set of packages, typically one jar or one classes directory.
#[derive(Debug)]
pub struct Component {
    name: String,
    packages: BTreeMap<String, ClassPackage>,
    class_count: usize,
}

impl Component {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn packages(&self) -> impl Iterator<Item = &ClassPackage> {
        self.packages.values()
    }

    pub fn package(&self, name: &str) -> Option<&ClassPackage> {
        self.packages.get(name)
    }

    pub fn class(&self, name: &str) -> Option<&Arc<ClassDescriptor>> {
        self.packages.get(package_of(name))?.class(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.class(name).is_some()
    }

    pub fn classes(&self) -> impl Iterator<Item = &Arc<ClassDescriptor>> {
        self.packages.values().flat_map(ClassPackage::classes)
    }

    pub fn class_count(&self) -> usize {
        self.class_count
    }

    pub fn is_empty(&self) -> bool {
        self.class_count == 0
    }

    pub fn abstraction(&self) -> f64 {
        if self.class_count == 0 {
            return 0.0;
        }
        let abstract_count = self.classes().filter(|c| c.is_abstract()).count();
        abstract_count as f64 / self.class_count as f64
    }

    pub fn resolve(&self, name: &str) -> ClassRef {
        match self.class(name) {
            Some(descriptor) => ClassRef::Known {
                component: self.name.clone(),
                descriptor: Arc::clone(descriptor),
            },
            None => ClassRef::External {
                component: self.name.clone(),
                name: name.to_string(),
            },
        }
    }

    /// Relationship of `target` to a class living in `source_package`.
    pub fn classify(&self, source_package: &str, target: &str) -> DependencyType {
        if !self.contains(target) {
            DependencyType::EXTRA_COMPONENT
        } else if package_of(target) == source_package {
            DependencyType::INTRA_PACKAGE_INTRA_COMPONENT
        } else {
            DependencyType::INTER_PACKAGE_INTRA_COMPONENT
        }
    }

    pub fn efferents(
        &self,
        class_name: &str,
        filter: impl Into<DependencyType>,
    ) -> Result<Vec<Dependency>, ModelError> {
        let filter = filter.into();
        Granularity::Component.check_filter(filter)?;
        let source = self.require(class_name)?;

        Ok(source
            .imported_class_names()
            .iter()
            .filter_map(|import| {
                let kind = self.classify(source.package_name(), import);
                kind.is_supported_by(filter).then(|| Dependency {
                    source: Arc::clone(source),
                    target: self.resolve(import),
                    kind,
                })
            })
            .collect())
    }

    /// Classes of this component importing `target`.
    pub fn afferents(
        &self,
        target: &str,
        filter: impl Into<DependencyType>,
    ) -> Result<Vec<Dependency>, ModelError> {
        let filter = filter.into();
        Granularity::Component.check_filter(filter)?;

        let reachable = if self.contains(target) {
            DependencyType::INTRA_COMPONENT
        } else {
            DependencyType::EXTRA_COMPONENT
        };
        if (reachable & filter).is_empty() {
            return Ok(Vec::new());
        }

        let target_ref = self.resolve(target);
        Ok(self
            .classes()
            .filter(|class| class.imports(target))
            .filter_map(|class| {
                let kind = self.classify(class.package_name(), target);
                kind.is_supported_by(filter).then(|| Dependency {
                    source: Arc::clone(class),
                    target: target_ref.clone(),
                    kind,
                })
            })
            .collect())
    }

    fn require(&self, class_name: &str) -> Result<&Arc<ClassDescriptor>, ModelError> {
        self.class(class_name).ok_or_else(|| ModelError::UnknownClass {
            scope: format!("component `{}`", self.name),
            class: class_name.to_string(),
        })
    }
}
