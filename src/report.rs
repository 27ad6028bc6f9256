use serde::Serialize;
use std::fmt::Write as _;

use crate::engine::{Level, Node};
use crate::load::{ComponentSummary, LoadFailure};
use crate::metrics::{DependencyMetrics, FamilyMetrics, NodeMetrics, PrincipleConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Violations {
    pub dip: bool,
    pub sdp: bool,
    pub adp: bool,
    pub sap: bool,
}

impl Violations {
    fn any(&self) -> bool {
        self.dip || self.sdp || self.adp || self.sap
    }

    fn labels(&self) -> Vec<&'static str> {
        [
            (self.dip, "DIP"),
            (self.sdp, "SDP"),
            (self.adp, "ADP"),
            (self.sap, "SAP"),
        ]
        .into_iter()
        .filter_map(|(set, label)| set.then_some(label))
        .collect()
    }
}

/// A smelly edge of a family.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeViolation {
    pub from: Node,
    pub to: Node,
    pub violations: Violations,
}

#[derive(Debug, Clone, Serialize)]
pub struct FamilySummary {
    pub metrics: NodeMetrics<Node>,
    pub instability: f64,
    pub distance: f64,
    pub mean_distance: f64,
    pub mean_abstraction: f64,
    pub mean_instability: f64,
    pub violations: Violations,
    pub edges: usize,
    pub broken_edges: usize,
    pub fragility: f64,
    pub score: f64,
    pub smelly_edges: Vec<EdgeViolation>,
}

impl From<&FamilyMetrics<Node>> for FamilySummary {
    fn from(family: &FamilyMetrics<Node>) -> Self {
        let node = family.node();
        Self {
            metrics: node.clone(),
            instability: node.instability(),
            distance: node.distance(),
            mean_distance: family.mean_distance(),
            mean_abstraction: family.mean_abstraction(),
            mean_instability: family.mean_instability(),
            violations: Violations {
                dip: family.breaks_dependency_inversion(),
                sdp: family.breaks_stable_dependency(),
                adp: family.breaks_abstract_dependency(),
                sap: family.breaks_stable_abstractions(),
            },
            edges: family.edges().len(),
            broken_edges: family.broken_dependencies(),
            fragility: family.fragility(),
            score: family.score(),
            smelly_edges: family
                .edges()
                .iter()
                .filter(|e| e.has_smell())
                .map(edge_violation)
                .collect(),
        }
    }
}

fn edge_violation(edge: &DependencyMetrics<Node>) -> EdgeViolation {
    EdgeViolation {
        from: edge.afferent().node().clone(),
        to: edge.efferent().node().clone(),
        violations: Violations {
            dip: edge.breaks_dependency_inversion(),
            sdp: edge.breaks_stable_dependency(),
            adp: edge.breaks_abstract_dependency(),
            sap: edge.breaks_stable_abstractions(),
        },
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub group: String,
    pub level: Level,
    pub filter: String,
    pub principles: PrincipleConfig,
    pub components: Vec<ComponentSummary>,
    pub external_classes: usize,
    pub duration_ms: u64,
    /// Worst score first.
    pub families: Vec<FamilySummary>,
    pub failures: Vec<LoadFailure>,
}

impl AnalysisReport {
    pub fn sort_families(&mut self) {
        self.families.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.metrics.node().cmp(b.metrics.node()))
        });
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "group: {}", self.group);
        let _ = writeln!(out, "level: {}", self.level.name());
        let _ = writeln!(out, "filter: {}", self.filter);
        let _ = writeln!(out, "duration_ms: {}", self.duration_ms);
        for c in &self.components {
            let _ = writeln!(
                out,
                "- component: {} ({}), packages: {}, classes: {}",
                c.name,
                c.role.name(),
                c.packages,
                c.classes
            );
        }
        let _ = writeln!(out, "external_classes: {}", self.external_classes);
        let healthy = self.families.iter().filter(|f| f.is_healthy()).count();
        let _ = writeln!(out, "healthy: {healthy}/{}", self.families.len());
        let _ = writeln!(out);

        for family in &self.families {
            let m = &family.metrics;
            let _ = writeln!(
                out,
                "{:>6.3}  {}  A={:.2} I={:.2} D={:+.2} Ca={} Ce={} fragility={:.2}",
                family.score,
                m.node(),
                m.abstraction(),
                family.instability,
                family.distance,
                m.afferent(),
                m.efferent(),
                family.fragility
            );
            for edge in &family.smelly_edges {
                let _ = writeln!(
                    out,
                    "        {} -> {} [{}]",
                    edge.from,
                    edge.to,
                    edge.violations.labels().join(",")
                );
            }
        }

        if !self.failures.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "failures: {}", self.failures.len());
            for f in &self.failures {
                let _ = writeln!(out, "- {}: {}", f.origin, f.reason);
            }
        }
        out
    }
}

impl FamilySummary {
    pub fn is_healthy(&self) -> bool {
        !self.violations.any() && self.distance <= 0.0
    }
}
