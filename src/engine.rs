//! Scores every node of a frozen [`Group`] at a chosen level.
//!
//! The class dependency graph is resolved once up front. Package, component
//! and group edges are class edges lifted to the owning node, with edges that
//! stay inside one node dropped.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::classfile::{ClassDescriptor, package_of};
use crate::dependency::DependencyType;
use crate::error::ModelError;
use crate::metrics::{Coverage, DependencyMetrics, FamilyMetrics, NodeMetrics, PrincipleConfig};
use crate::model::{ClassRef, Group};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Class { component: String, name: String },
    ExternalClass { name: String },
    Package { component: String, name: String },
    ExternalPackage { name: String },
    Component { name: String },
    Group { name: String },
}

impl Node {
    pub fn level(&self) -> Level {
        match self {
            Node::Class { .. } | Node::ExternalClass { .. } => Level::Class,
            Node::Package { .. } | Node::ExternalPackage { .. } => Level::Package,
            Node::Component { .. } => Level::Component,
            Node::Group { .. } => Level::Group,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Node::ExternalClass { .. } | Node::ExternalPackage { .. })
    }

    pub fn component(&self) -> Option<&str> {
        match self {
            Node::Class { component, .. } | Node::Package { component, .. } => Some(component),
            Node::Component { name } => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Class { component, name } | Node::Package { component, name } => {
                write!(f, "{component}:{name}")
            }
            Node::ExternalClass { name } | Node::ExternalPackage { name } => {
                write!(f, "{name} (external)")
            }
            Node::Component { name } | Node::Group { name } => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Class,
    Package,
    Component,
    Group,
}

impl Level {
    pub fn name(self) -> &'static str {
        match self {
            Level::Class => "class",
            Level::Package => "package",
            Level::Component => "component",
            Level::Group => "group",
        }
    }

    /// Kinds that can cross the boundary of a node at this level.
    pub fn visible_kinds(self) -> DependencyType {
        match self {
            Level::Class => DependencyType::UNIVERSAL,
            Level::Package => DependencyType::EXTRA_PACKAGE,
            Level::Component => DependencyType::INTER_COMPONENT,
            Level::Group => DependencyType::EXTRA_GROUP,
        }
    }

    pub fn check_filter(self, filter: DependencyType) -> Result<(), ModelError> {
        if (self.visible_kinds() & filter).is_empty() {
            Err(ModelError::UnsatisfiableFilter {
                filter: filter.to_string(),
                granularity: self.name(),
            })
        } else {
            Ok(())
        }
    }
}

#[derive(Debug)]
struct ClassEdge {
    source: Node,
    target: Node,
    kind: DependencyType,
    target_abstract: bool,
}

/// Edges of one node, keyed by the node at the other end.
struct Neighbourhood<'a> {
    outgoing: BTreeMap<Node, Vec<&'a ClassEdge>>,
    incoming: BTreeMap<Node, Vec<&'a ClassEdge>>,
}

pub struct MetricsEngine {
    group: String,
    config: PrincipleConfig,
    classes: HashMap<Node, Arc<ClassDescriptor>>,
    external: BTreeSet<Node>,
    edges: Vec<ClassEdge>,
    outgoing: HashMap<Node, Vec<usize>>,
    incoming: HashMap<Node, Vec<usize>>,
    members: HashMap<Node, Vec<Node>>,
}

impl MetricsEngine {
    pub fn new(group: &Group, config: PrincipleConfig) -> Self {
        let sources: Vec<_> = group.classes().collect();
        let edges: Vec<ClassEdge> = sources
            .par_iter()
            .flat_map_iter(|&(component, class)| {
                let source = Node::Class {
                    component: component.name().to_string(),
                    name: class.name().to_string(),
                };
                class
                    .imported_class_names()
                    .iter()
                    .map(|import| {
                        let (target, kind) =
                            group.link(component, class.package_name(), import);
                        let target_abstract =
                            target.descriptor().is_some_and(|d| d.is_abstract());
                        let target = match target {
                            ClassRef::Known {
                                component,
                                descriptor,
                            } => Node::Class {
                                component,
                                name: descriptor.name().to_string(),
                            },
                            ClassRef::External { name, .. } => Node::ExternalClass { name },
                        };
                        ClassEdge {
                            source: source.clone(),
                            target,
                            kind,
                            target_abstract,
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        let classes: HashMap<Node, Arc<ClassDescriptor>> = sources
            .iter()
            .map(|&(component, class)| {
                let node = Node::Class {
                    component: component.name().to_string(),
                    name: class.name().to_string(),
                };
                (node, Arc::clone(class))
            })
            .collect();

        let mut outgoing: HashMap<Node, Vec<usize>> = HashMap::new();
        let mut incoming: HashMap<Node, Vec<usize>> = HashMap::new();
        let mut external = BTreeSet::new();
        for (index, edge) in edges.iter().enumerate() {
            outgoing.entry(edge.source.clone()).or_default().push(index);
            incoming.entry(edge.target.clone()).or_default().push(index);
            if edge.target.is_external() {
                external.insert(edge.target.clone());
            }
        }

        let mut engine = Self {
            group: group.name().to_string(),
            config,
            classes,
            external,
            edges,
            outgoing,
            incoming,
            members: HashMap::new(),
        };

        let mut members: HashMap<Node, Vec<Node>> = HashMap::new();
        for node in engine.classes.keys().chain(engine.external.iter()) {
            for level in [Level::Package, Level::Component, Level::Group] {
                // External packages already collected at package level.
                if level == Level::Group && node.is_external() {
                    continue;
                }
                if let Some(owner) = engine.lift(node, level) {
                    members.entry(owner).or_default().push(node.clone());
                }
            }
        }
        engine.members = members;

        debug!(
            group = %engine.group,
            classes = engine.classes.len(),
            external = engine.external.len(),
            edges = engine.edges.len(),
            "dependency graph resolved"
        );
        engine
    }

    pub fn config(&self) -> &PrincipleConfig {
        &self.config
    }

    pub fn group_name(&self) -> &str {
        &self.group
    }

    /// Classes never resolved inside the group.
    pub fn external_classes(&self) -> impl Iterator<Item = &str> {
        self.external.iter().filter_map(|node| match node {
            Node::ExternalClass { name } => Some(name.as_str()),
            _ => None,
        })
    }

    /// Every internal node at `level`, sorted.
    pub fn nodes(&self, level: Level) -> Vec<Node> {
        let mut nodes: Vec<Node> = match level {
            Level::Class => self.classes.keys().cloned().collect(),
            _ => self
                .members
                .keys()
                .filter(|node| node.level() == level && !node.is_external())
                .cloned()
                .collect(),
        };
        nodes.sort();
        nodes
    }

    pub fn node_metrics(
        &self,
        node: &Node,
        filter: impl Into<DependencyType>,
    ) -> Result<NodeMetrics<Node>, ModelError> {
        let filter = filter.into();
        let level = node.level();
        level.check_filter(filter)?;
        self.require(node)?;
        let neighbourhood = self.neighbourhood(node, level, filter);
        Ok(self.metrics_of(node, level, &neighbourhood))
    }

    /// The node with one dependency edge per distinct neighbour, both ways.
    pub fn family(
        &self,
        node: &Node,
        filter: impl Into<DependencyType>,
    ) -> Result<FamilyMetrics<Node>, ModelError> {
        let filter = filter.into();
        let level = node.level();
        level.check_filter(filter)?;
        self.require(node)?;
        Ok(self.family_at(node, level, filter))
    }

    pub fn families(
        &self,
        level: Level,
        filter: impl Into<DependencyType>,
    ) -> Result<Vec<FamilyMetrics<Node>>, ModelError> {
        let filter = filter.into();
        level.check_filter(filter)?;
        let nodes = self.nodes(level);
        debug!(level = level.name(), nodes = nodes.len(), %filter, "scoring families");

        let neighbourhoods: Vec<Neighbourhood<'_>> = nodes
            .par_iter()
            .map(|node| self.neighbourhood(node, level, filter))
            .collect();

        // Every node is measured once, however many families it appears in.
        let mut metrics: HashMap<&Node, NodeMetrics<Node>> = nodes
            .par_iter()
            .zip(neighbourhoods.par_iter())
            .map(|(node, neighbourhood)| (node, self.metrics_of(node, level, neighbourhood)))
            .collect();
        let mut outside: Vec<&Node> = neighbourhoods
            .iter()
            .flat_map(|n| n.outgoing.keys().chain(n.incoming.keys()))
            .filter(|other| !metrics.contains_key(other))
            .collect();
        outside.sort();
        outside.dedup();
        let outside: Vec<(&Node, NodeMetrics<Node>)> = outside
            .into_par_iter()
            .map(|other| (other, self.metrics_at(other, level, filter)))
            .collect();
        metrics.extend(outside);

        Ok(nodes
            .par_iter()
            .zip(neighbourhoods.par_iter())
            .map(|(node, neighbourhood)| {
                self.family_from(node, neighbourhood, level, filter, &metrics)
            })
            .collect())
    }

    fn family_at(&self, node: &Node, level: Level, filter: DependencyType) -> FamilyMetrics<Node> {
        let neighbourhood = self.neighbourhood(node, level, filter);
        self.family_from(node, &neighbourhood, level, filter, &HashMap::new())
    }

    /// Builds the family from `known` metrics, measuring any node missing there.
    fn family_from(
        &self,
        node: &Node,
        neighbourhood: &Neighbourhood<'_>,
        level: Level,
        filter: DependencyType,
        known: &HashMap<&Node, NodeMetrics<Node>>,
    ) -> FamilyMetrics<Node> {
        let own = match known.get(node) {
            Some(metrics) => metrics.clone(),
            None => self.metrics_of(node, level, neighbourhood),
        };
        let lookup = |other: &Node| match known.get(other) {
            Some(metrics) => metrics.clone(),
            None => self.metrics_at(other, level, filter),
        };

        let mut edges =
            Vec::with_capacity(neighbourhood.outgoing.len() + neighbourhood.incoming.len());
        for other in neighbourhood.outgoing.keys() {
            edges.push(DependencyMetrics::new(own.clone(), lookup(other), &self.config));
        }
        for other in neighbourhood.incoming.keys() {
            edges.push(DependencyMetrics::new(lookup(other), own.clone(), &self.config));
        }
        FamilyMetrics::new(own, edges)
    }

    fn metrics_at(&self, node: &Node, level: Level, filter: DependencyType) -> NodeMetrics<Node> {
        let neighbourhood = self.neighbourhood(node, level, filter);
        self.metrics_of(node, level, &neighbourhood)
    }

    fn metrics_of(
        &self,
        node: &Node,
        level: Level,
        neighbourhood: &Neighbourhood<'_>,
    ) -> NodeMetrics<Node> {
        let ca = neighbourhood.incoming.len();
        let ce = neighbourhood.outgoing.len();
        let (abstraction, instantiable) = self.abstraction(node, level);

        let mut targets: BTreeMap<&Node, &ClassEdge> = BTreeMap::new();
        for edge in neighbourhood.outgoing.values().flatten() {
            targets.entry(&edge.target).or_insert(*edge);
        }
        let mut coverage = Coverage::default();
        if !targets.is_empty() {
            let (mut abstract_targets, mut intra_component, mut intra_group) = (0, 0, 0);
            for edge in targets.values() {
                if edge.target_abstract {
                    abstract_targets += 1;
                }
                if edge.kind.is_supported_by(DependencyType::INTRA_COMPONENT) {
                    intra_component += 1;
                }
                if edge.kind.is_supported_by(DependencyType::INTRA_GROUP) {
                    intra_group += 1;
                }
            }
            let total = targets.len() as f64;
            coverage = Coverage {
                abstract_share: abstract_targets as f64 / total,
                intra_component: intra_component as f64 / total,
                intra_group: intra_group as f64 / total,
            };
        }

        NodeMetrics::new(node.clone(), abstraction, ca, ce)
            .with_instantiable(instantiable)
            .with_coverage(coverage)
            .with_energy((ca * ce) as f64)
    }

    fn abstraction(&self, node: &Node, level: Level) -> (f64, bool) {
        if let Some(class) = self.classes.get(node) {
            let abstraction = if class.is_abstract() { 1.0 } else { 0.0 };
            return (abstraction, class.is_instantiable());
        }
        if level == Level::Class || node.is_external() {
            return (0.0, false);
        }

        let known: Vec<&Arc<ClassDescriptor>> = self
            .members
            .get(node)
            .into_iter()
            .flatten()
            .filter_map(|member| self.classes.get(member))
            .collect();
        if known.is_empty() {
            return (0.0, false);
        }
        let abstract_count = known.iter().filter(|c| c.is_abstract()).count();
        let abstraction = abstract_count as f64 / known.len() as f64;
        (abstraction, abstract_count == 0)
    }

    fn neighbourhood(
        &self,
        node: &Node,
        level: Level,
        filter: DependencyType,
    ) -> Neighbourhood<'_> {
        let members: Vec<&Node> = match level {
            Level::Class => vec![node],
            _ => self.members.get(node).into_iter().flatten().collect(),
        };

        let mut outgoing: BTreeMap<Node, Vec<&ClassEdge>> = BTreeMap::new();
        let mut incoming: BTreeMap<Node, Vec<&ClassEdge>> = BTreeMap::new();
        for member in members {
            for edge in self.edges_of(&self.outgoing, member) {
                if let Some(other) = self.crossing(edge, &edge.target, node, level, filter) {
                    outgoing.entry(other).or_default().push(edge);
                }
            }
            for edge in self.edges_of(&self.incoming, member) {
                if let Some(other) = self.crossing(edge, &edge.source, node, level, filter) {
                    incoming.entry(other).or_default().push(edge);
                }
            }
        }
        Neighbourhood { outgoing, incoming }
    }

    fn edges_of<'a>(
        &'a self,
        index: &'a HashMap<Node, Vec<usize>>,
        member: &Node,
    ) -> impl Iterator<Item = &'a ClassEdge> {
        index
            .get(member)
            .into_iter()
            .flatten()
            .map(|&i| &self.edges[i])
    }

    /// The far end of `edge` lifted to `level`, if it passes the filter and
    /// leaves `node`.
    fn crossing(
        &self,
        edge: &ClassEdge,
        far: &Node,
        node: &Node,
        level: Level,
        filter: DependencyType,
    ) -> Option<Node> {
        if !edge.kind.is_supported_by(filter) {
            return None;
        }
        self.lift(far, level).filter(|other| other != node)
    }

    fn lift(&self, class: &Node, level: Level) -> Option<Node> {
        match (class, level) {
            (_, Level::Class) => Some(class.clone()),
            (Node::Class { component, name }, Level::Package) => Some(Node::Package {
                component: component.clone(),
                name: package_of(name).to_string(),
            }),
            (Node::ExternalClass { name }, Level::Package | Level::Group) => {
                Some(Node::ExternalPackage {
                    name: package_of(name).to_string(),
                })
            }
            (Node::Class { component, .. }, Level::Component) => Some(Node::Component {
                name: component.clone(),
            }),
            (Node::Class { .. }, Level::Group) => Some(Node::Group {
                name: self.group.clone(),
            }),
            _ => None,
        }
    }

    fn require(&self, node: &Node) -> Result<(), ModelError> {
        let known = match node {
            Node::Class { .. } => self.classes.contains_key(node),
            Node::ExternalClass { .. } => self.external.contains(node),
            _ => self.members.contains_key(node),
        };
        if known {
            return Ok(());
        }
        Err(match node {
            Node::Class { name, .. } | Node::ExternalClass { name } => ModelError::UnknownClass {
                scope: format!("group `{}`", self.group),
                class: name.clone(),
            },
            Node::Package { component, name } => ModelError::UnknownPackage {
                component: component.clone(),
                package: name.clone(),
            },
            Node::ExternalPackage { name } => ModelError::UnknownPackage {
                component: self.group.clone(),
                package: name.clone(),
            },
            Node::Component { name } | Node::Group { name } => {
                ModelError::UnknownComponent(name.clone())
            }
        })
    }
}
