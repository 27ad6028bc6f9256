use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::classfile::{ClassDescriptor, package_of};
use crate::dependency::{DependencyType, Granularity};
use crate::error::ModelError;

use super::{ClassRef, Dependency};

#[derive(Debug)]
pub struct PackageBuilder {
    component: String,
    name: String,
    classes: BTreeMap<String, Arc<ClassDescriptor>>,
    efferent_packages: BTreeSet<String>,
    self_references: BTreeSet<String>,
}

impl PackageBuilder {
    pub fn new(component: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            name: name.into(),
            classes: BTreeMap::new(),
            efferent_packages: BTreeSet::new(),
            self_references: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn add_class(&mut self, class: ClassDescriptor) -> Result<(), ModelError> {
        if class.package_name() != self.name {
            return Err(ModelError::PackageMismatch {
                class: class.name().to_string(),
                expected: self.name.clone(),
                actual: class.package_name().to_string(),
            });
        }
        if self.classes.contains_key(class.name()) {
            return Err(ModelError::DuplicateClass {
                package: self.name.clone(),
                class: class.name().to_string(),
            });
        }

        for import in class.imported_class_names() {
            let package = package_of(import);
            if package == self.name {
                self.self_references.insert(import.clone());
            } else {
                self.efferent_packages.insert(package.to_string());
            }
        }
        self.classes.insert(class.name().to_string(), Arc::new(class));
        Ok(())
    }

    pub fn build(self) -> ClassPackage {
        ClassPackage {
            component: self.component,
            name: self.name,
            classes: self.classes,
            efferent_packages: self.efferent_packages,
            self_references: self.self_references,
        }
    }
}

/// Classes of one package name inside one component.
#[derive(Debug)]
pub struct ClassPackage {
    component: String,
    name: String,
    classes: BTreeMap<String, Arc<ClassDescriptor>>,
    efferent_packages: BTreeSet<String>,
    self_references: BTreeSet<String>,
}

impl ClassPackage {
    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> impl Iterator<Item = &Arc<ClassDescriptor>> {
        self.classes.values()
    }

    pub fn class(&self, name: &str) -> Option<&Arc<ClassDescriptor>> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Names of other packages imported by any class of this package.
    pub fn efferent_packages(&self) -> &BTreeSet<String> {
        &self.efferent_packages
    }

    /// Imports naming this package, whether or not the class is here.
    pub fn shallow_self_references(&self) -> &BTreeSet<String> {
        &self.self_references
    }

    /// Imports naming this package that resolve to a class in this instance.
    pub fn deep_internal_self_references(&self) -> BTreeSet<String> {
        self.self_references
            .iter()
            .filter(|name| self.contains(name))
            .cloned()
            .collect()
    }

    /// Fraction of classes that are abstract, interfaces or annotations.
    pub fn abstraction(&self) -> f64 {
        if self.classes.is_empty() {
            return 0.0;
        }
        let abstract_count = self.classes.values().filter(|c| c.is_abstract()).count();
        abstract_count as f64 / self.classes.len() as f64
    }

    pub fn resolve(&self, name: &str) -> ClassRef {
        match self.classes.get(name) {
            Some(descriptor) => ClassRef::Known {
                component: self.component.clone(),
                descriptor: Arc::clone(descriptor),
            },
            None => ClassRef::External {
                component: self.component.clone(),
                name: name.to_string(),
            },
        }
    }

    pub fn classify(&self, target: &str) -> DependencyType {
        if self.contains(target) {
            DependencyType::INTRA_PACKAGE
        } else {
            DependencyType::EXTRA_PACKAGE
        }
    }

    pub fn efferents(
        &self,
        class_name: &str,
        filter: impl Into<DependencyType>,
    ) -> Result<Vec<Dependency>, ModelError> {
        let filter = filter.into();
        Granularity::Package.check_filter(filter)?;
        let source = self.require(class_name)?;

        Ok(source
            .imported_class_names()
            .iter()
            .filter_map(|import| {
                let kind = self.classify(import);
                kind.is_supported_by(filter).then(|| Dependency {
                    source: Arc::clone(source),
                    target: self.resolve(import),
                    kind,
                })
            })
            .collect())
    }

    /// Classes of this package importing `target`.
    pub fn afferents(
        &self,
        target: &str,
        filter: impl Into<DependencyType>,
    ) -> Result<Vec<Dependency>, ModelError> {
        let filter = filter.into();
        Granularity::Package.check_filter(filter)?;

        let kind = self.classify(target);
        if !kind.is_supported_by(filter) {
            return Ok(Vec::new());
        }
        let target_ref = self.resolve(target);
        Ok(self
            .classes
            .values()
            .filter(|class| class.imports(target))
            .map(|class| Dependency {
                source: Arc::clone(class),
                target: target_ref.clone(),
                kind,
            })
            .collect())
    }

    fn require(&self, class_name: &str) -> Result<&Arc<ClassDescriptor>, ModelError> {
        self.classes.get(class_name).ok_or_else(|| ModelError::UnknownClass {
            scope: format!("package `{}` of component `{}`", self.name, self.component),
            class: class_name.to_string(),
        })
    }
}
