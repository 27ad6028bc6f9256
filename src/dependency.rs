//! How closely two classes are related, as a bitmask.
//!
//! Five exclusive fundamental flags carry the finest classification a group
//! can make. Coarser views (what a single package or component can tell) are
//! unions of those flags, so a classification made at one granularity can be
//! tested against a filter phrased at another.

use std::fmt;

use bitflags::bitflags;
use serde::{Serialize, Serializer};

use crate::error::ModelError;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct DependencyType: u8 {
        const INTRA_PACKAGE_INTRA_COMPONENT = 0b00001;
        const INTER_PACKAGE_INTRA_COMPONENT = 0b00010;
        const INTRA_PACKAGE_INTER_COMPONENT = 0b00100;
        const INTER_PACKAGE_INTER_COMPONENT = 0b01000;
        const EXTRA_GROUP = 0b10000;

        /// Resolved inside the same package instance.
        const INTRA_PACKAGE = Self::INTRA_PACKAGE_INTRA_COMPONENT.bits();
        const EXTRA_PACKAGE = Self::INTER_PACKAGE_INTRA_COMPONENT.bits()
            | Self::INTRA_PACKAGE_INTER_COMPONENT.bits()
            | Self::INTER_PACKAGE_INTER_COMPONENT.bits()
            | Self::EXTRA_GROUP.bits();
        const INTRA_COMPONENT = Self::INTRA_PACKAGE_INTRA_COMPONENT.bits()
            | Self::INTER_PACKAGE_INTRA_COMPONENT.bits();
        const INTER_COMPONENT = Self::INTRA_PACKAGE_INTER_COMPONENT.bits()
            | Self::INTER_PACKAGE_INTER_COMPONENT.bits();
        const EXTRA_COMPONENT = Self::INTER_COMPONENT.bits() | Self::EXTRA_GROUP.bits();
        const INTRA_GROUP = Self::INTRA_COMPONENT.bits() | Self::INTER_COMPONENT.bits();
        const UNIVERSAL = Self::INTRA_GROUP.bits() | Self::EXTRA_GROUP.bits();
    }
}

const NAMES: [(DependencyType, &str); 12] = [
    (DependencyType::INTRA_PACKAGE_INTRA_COMPONENT, "intra-package-intra-component"),
    (DependencyType::INTER_PACKAGE_INTRA_COMPONENT, "inter-package-intra-component"),
    (DependencyType::INTRA_PACKAGE_INTER_COMPONENT, "intra-package-inter-component"),
    (DependencyType::INTER_PACKAGE_INTER_COMPONENT, "inter-package-inter-component"),
    (DependencyType::EXTRA_GROUP, "extra-group"),
    (DependencyType::EXTRA_PACKAGE, "extra-package"),
    (DependencyType::INTRA_COMPONENT, "intra-component"),
    (DependencyType::INTER_COMPONENT, "inter-component"),
    (DependencyType::EXTRA_COMPONENT, "extra-component"),
    (DependencyType::INTRA_GROUP, "intra-group"),
    (DependencyType::UNIVERSAL, "universal"),
    (DependencyType::empty(), "none"),
];

impl DependencyType {
    pub const FUNDAMENTAL: [DependencyType; 5] = [
        DependencyType::INTRA_PACKAGE_INTRA_COMPONENT,
        DependencyType::INTER_PACKAGE_INTRA_COMPONENT,
        DependencyType::INTRA_PACKAGE_INTER_COMPONENT,
        DependencyType::INTER_PACKAGE_INTER_COMPONENT,
        DependencyType::EXTRA_GROUP,
    ];

    /// Every flag of `self` is allowed by `other`.
    pub fn is_supported_by(self, other: DependencyType) -> bool {
        self & other == self
    }

    /// `self` allows every flag of `other`.
    pub fn supports(self, other: DependencyType) -> bool {
        self & other == other
    }

    pub fn is_sub_type_of(self, other: DependencyType) -> bool {
        self != other && self.is_supported_by(other)
    }

    pub fn is_super_type_of(self, other: DependencyType) -> bool {
        self != other && self.supports(other)
    }

    pub fn name(self) -> Option<&'static str> {
        NAMES.iter().find(|(t, _)| *t == self).map(|(_, n)| *n)
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name() {
            return f.write_str(name);
        }
        let parts: Vec<&str> = Self::FUNDAMENTAL
            .iter()
            .filter(|t| self.supports(**t))
            .filter_map(|t| t.name())
            .collect();
        f.write_str(&parts.join("|"))
    }
}

impl Serialize for DependencyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Filters a package can answer on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageDependencyType {
    IntraPackage,
    ExtraPackage,
    All,
}

impl From<PackageDependencyType> for DependencyType {
    fn from(value: PackageDependencyType) -> Self {
        match value {
            PackageDependencyType::IntraPackage => DependencyType::INTRA_PACKAGE,
            PackageDependencyType::ExtraPackage => DependencyType::EXTRA_PACKAGE,
            PackageDependencyType::All => DependencyType::UNIVERSAL,
        }
    }
}

/// Filters a component can answer on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentDependencyType {
    IntraPackage,
    InterPackage,
    IntraComponent,
    ExtraComponent,
    All,
}

impl From<ComponentDependencyType> for DependencyType {
    fn from(value: ComponentDependencyType) -> Self {
        match value {
            ComponentDependencyType::IntraPackage => DependencyType::INTRA_PACKAGE_INTRA_COMPONENT,
            ComponentDependencyType::InterPackage => DependencyType::INTER_PACKAGE_INTRA_COMPONENT,
            ComponentDependencyType::IntraComponent => DependencyType::INTRA_COMPONENT,
            ComponentDependencyType::ExtraComponent => DependencyType::EXTRA_COMPONENT,
            ComponentDependencyType::All => DependencyType::UNIVERSAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupDependencyType {
    IntraPackageIntraComponent,
    InterPackageIntraComponent,
    IntraPackageInterComponent,
    InterPackageInterComponent,
    IntraComponent,
    InterComponent,
    IntraGroup,
    ExtraGroup,
    All,
}

impl From<GroupDependencyType> for DependencyType {
    fn from(value: GroupDependencyType) -> Self {
        match value {
            GroupDependencyType::IntraPackageIntraComponent => {
                DependencyType::INTRA_PACKAGE_INTRA_COMPONENT
            }
            GroupDependencyType::InterPackageIntraComponent => {
                DependencyType::INTER_PACKAGE_INTRA_COMPONENT
            }
            GroupDependencyType::IntraPackageInterComponent => {
                DependencyType::INTRA_PACKAGE_INTER_COMPONENT
            }
            GroupDependencyType::InterPackageInterComponent => {
                DependencyType::INTER_PACKAGE_INTER_COMPONENT
            }
            GroupDependencyType::IntraComponent => DependencyType::INTRA_COMPONENT,
            GroupDependencyType::InterComponent => DependencyType::INTER_COMPONENT,
            GroupDependencyType::IntraGroup => DependencyType::INTRA_GROUP,
            GroupDependencyType::ExtraGroup => DependencyType::EXTRA_GROUP,
            GroupDependencyType::All => DependencyType::UNIVERSAL,
        }
    }
}

/// The scope a dependency query is answered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Package,
    Component,
    Group,
}

impl Granularity {
    /// Every classification a query at this granularity can produce.
    pub fn classifications(self) -> &'static [DependencyType] {
        match self {
            Granularity::Package => &[DependencyType::INTRA_PACKAGE, DependencyType::EXTRA_PACKAGE],
            Granularity::Component => &[
                DependencyType::INTRA_PACKAGE_INTRA_COMPONENT,
                DependencyType::INTER_PACKAGE_INTRA_COMPONENT,
                DependencyType::EXTRA_COMPONENT,
            ],
            Granularity::Group => &DependencyType::FUNDAMENTAL,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Granularity::Package => "package",
            Granularity::Component => "component",
            Granularity::Group => "group",
        }
    }

    pub fn check_filter(self, filter: DependencyType) -> Result<(), ModelError> {
        if self
            .classifications()
            .iter()
            .any(|c| c.is_supported_by(filter))
        {
            Ok(())
        } else {
            Err(ModelError::UnsatisfiableFilter {
                filter: filter.to_string(),
                granularity: self.name(),
            })
        }
    }
}
