//! Martin coupling metrics and dependency-principle checks.
//!
//! Ca (afferent), Ce (efferent), A (abstraction), I (instability) and the
//! signed distance D = 1 - A - I from the main sequence. D > 0 is the zone of
//! pain, D < 0 the zone of uselessness.

use serde::{Deserialize, Serialize};

/// Which dependency principles are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrincipleConfig {
    pub dip: bool,
    pub sdp: bool,
    pub adp: bool,
    pub sap: bool,
}

impl Default for PrincipleConfig {
    fn default() -> Self {
        Self {
            dip: true,
            sdp: true,
            adp: true,
            sap: true,
        }
    }
}

/// Shares of a node's distinct efferent class targets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Coverage {
    /// Abstract, interface or annotation targets.
    pub abstract_share: f64,
    /// Targets resolved inside the node's own component.
    pub intra_component: f64,
    /// Targets resolved anywhere in the group.
    pub intra_group: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeMetrics<T> {
    node: T,
    abstraction: f64,
    afferent: usize,
    efferent: usize,
    coverage: Coverage,
    instantiable: bool,
    energy: f64,
    instability: f64,
    distance: f64,
}

impl<T> NodeMetrics<T> {
    pub fn new(node: T, abstraction: f64, afferent: usize, efferent: usize) -> Self {
        // I = Ce / (Ca + Ce), 1 when nothing depends on the node
        let instability = if afferent == 0 {
            1.0
        } else {
            efferent as f64 / (afferent + efferent) as f64
        };
        Self {
            node,
            abstraction,
            afferent,
            efferent,
            coverage: Coverage::default(),
            instantiable: false,
            energy: 0.0,
            instability,
            distance: 1.0 - abstraction - instability,
        }
    }

    pub fn with_coverage(mut self, coverage: Coverage) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn with_instantiable(mut self, instantiable: bool) -> Self {
        self.instantiable = instantiable;
        self
    }

    pub fn with_energy(mut self, energy: f64) -> Self {
        self.energy = energy;
        self
    }

    pub fn node(&self) -> &T {
        &self.node
    }

    pub fn abstraction(&self) -> f64 {
        self.abstraction
    }

    pub fn afferent(&self) -> usize {
        self.afferent
    }

    pub fn efferent(&self) -> usize {
        self.efferent
    }

    pub fn coverage(&self) -> Coverage {
        self.coverage
    }

    pub fn is_instantiable(&self) -> bool {
        self.instantiable
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn instability(&self) -> f64 {
        self.instability
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn in_zone_of_pain(&self) -> bool {
        self.distance > 0.0
    }
}

/// One edge, afferent depending on efferent, with its principle verdicts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyMetrics<T> {
    afferent: NodeMetrics<T>,
    efferent: NodeMetrics<T>,
    dip: bool,
    adp: bool,
    sdp: bool,
    sap: bool,
}

impl<T> DependencyMetrics<T> {
    pub fn new(
        afferent: NodeMetrics<T>,
        efferent: NodeMetrics<T>,
        config: &PrincipleConfig,
    ) -> Self {
        let dip = config.dip && efferent.instantiable;
        let adp = config.adp && efferent.abstraction < afferent.abstraction;
        let sdp = config.sdp && efferent.instability > afferent.instability;
        // Deeper into, or newly into, the zone of pain. Uselessness is never penalised.
        let sap = config.sap
            && ((afferent.distance > 0.0
                && efferent.distance > 0.0
                && efferent.distance > afferent.distance)
                || (afferent.distance <= 0.0 && efferent.distance > 0.0));
        Self {
            afferent,
            efferent,
            dip,
            adp,
            sdp,
            sap,
        }
    }

    pub fn afferent(&self) -> &NodeMetrics<T> {
        &self.afferent
    }

    pub fn efferent(&self) -> &NodeMetrics<T> {
        &self.efferent
    }

    pub fn breaks_dependency_inversion(&self) -> bool {
        self.dip
    }

    pub fn breaks_abstract_dependency(&self) -> bool {
        self.adp
    }

    pub fn breaks_stable_dependency(&self) -> bool {
        self.sdp
    }

    pub fn breaks_stable_abstractions(&self) -> bool {
        self.sap
    }

    pub fn has_smell(&self) -> bool {
        self.dip || self.adp || self.sdp || self.sap
    }
}

/// A node with every edge touching it, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilyMetrics<T> {
    node: NodeMetrics<T>,
    edges: Vec<DependencyMetrics<T>>,
    mean_distance: f64,
    mean_abstraction: f64,
    mean_instability: f64,
    dip: bool,
    adp: bool,
    sdp: bool,
    sap: bool,
    broken: usize,
    fragility: f64,
    score: f64,
}

impl<T: PartialEq> FamilyMetrics<T> {
    pub fn new(node: NodeMetrics<T>, edges: Vec<DependencyMetrics<T>>) -> Self {
        let members = edges.len() + 1;
        let mut distance = node.distance;
        let mut abstraction = node.abstraction;
        let mut instability = node.instability;
        for edge in &edges {
            let other = if edge.afferent.node == node.node {
                &edge.efferent
            } else {
                &edge.afferent
            };
            distance += other.distance;
            abstraction += other.abstraction;
            instability += other.instability;
        }

        let broken = edges.iter().filter(|e| e.has_smell()).count();
        let fragility = if edges.is_empty() {
            0.0
        } else {
            broken as f64 / edges.len() as f64
        };
        let score = 0.5 * (node.distance.max(0.0) + fragility);

        Self {
            mean_distance: distance / members as f64,
            mean_abstraction: abstraction / members as f64,
            mean_instability: instability / members as f64,
            dip: edges.iter().any(|e| e.dip),
            adp: edges.iter().any(|e| e.adp),
            sdp: edges.iter().any(|e| e.sdp),
            sap: edges.iter().any(|e| e.sap),
            broken,
            fragility,
            score,
            node,
            edges,
        }
    }
}

impl<T> FamilyMetrics<T> {
    pub fn node(&self) -> &NodeMetrics<T> {
        &self.node
    }

    pub fn edges(&self) -> &[DependencyMetrics<T>] {
        &self.edges
    }

    pub fn mean_distance(&self) -> f64 {
        self.mean_distance
    }

    pub fn mean_abstraction(&self) -> f64 {
        self.mean_abstraction
    }

    pub fn mean_instability(&self) -> f64 {
        self.mean_instability
    }

    pub fn breaks_dependency_inversion(&self) -> bool {
        self.dip
    }

    pub fn breaks_abstract_dependency(&self) -> bool {
        self.adp
    }

    pub fn breaks_stable_dependency(&self) -> bool {
        self.sdp
    }

    pub fn breaks_stable_abstractions(&self) -> bool {
        self.sap
    }

    pub fn broken_dependencies(&self) -> usize {
        self.broken
    }

    pub fn fragility(&self) -> f64 {
        self.fragility
    }

    pub fn score(&self) -> f64 {
        self.score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn node(name: &'static str, a: f64, ca: usize, ce: usize) -> NodeMetrics<&'static str> {
        NodeMetrics::new(name, a, ca, ce)
    }

    #[test]
    fn instability_follows_coupling_counts() {
        assert_eq!(node("n", 0.0, 0, 5).instability(), 1.0);
        assert_eq!(node("n", 0.0, 0, 0).instability(), 1.0);
        assert_eq!(node("n", 0.0, 5, 0).instability(), 0.0);
        assert!((node("n", 0.0, 5, 5).instability() - 0.5).abs() < EPS);
    }

    #[test]
    fn distance_is_signed() {
        assert!(node("n", 0.5, 5, 5).distance().abs() < EPS);
        let pain = node("n", 0.0, 5, 0);
        assert_eq!(pain.distance(), 1.0);
        assert!(pain.in_zone_of_pain());
        let useless = node("n", 1.0, 0, 3);
        assert_eq!(useless.distance(), -1.0);
        assert!(!useless.in_zone_of_pain());
    }

    #[test]
    fn dip_follows_efferent_instantiability_alone() {
        let config = PrincipleConfig::default();
        let afferent = node("a", 0.0, 3, 1);
        for (a, ca, ce) in [(0.0, 0, 0), (1.0, 9, 0), (0.5, 1, 1)] {
            let efferent = node("e", a, ca, ce).with_instantiable(true);
            let edge = DependencyMetrics::new(afferent.clone(), efferent, &config);
            assert!(edge.breaks_dependency_inversion());
            assert!(edge.has_smell());
        }
        let abstract_target = node("e", 1.0, 9, 0);
        let edge = DependencyMetrics::new(afferent, abstract_target, &config);
        assert!(!edge.breaks_dependency_inversion());
    }

    #[test]
    fn disabled_principles_never_fire() {
        let config = PrincipleConfig {
            dip: false,
            sdp: false,
            adp: false,
            sap: false,
        };
        let edge = DependencyMetrics::new(
            node("a", 1.0, 5, 0),
            node("e", 0.0, 0, 5).with_instantiable(true),
            &config,
        );
        assert!(!edge.has_smell());
    }

    #[test]
    fn adp_and_sdp_compare_endpoints() {
        let config = PrincipleConfig::default();
        let edge = DependencyMetrics::new(node("a", 0.5, 4, 0), node("e", 0.25, 1, 1), &config);
        assert!(edge.breaks_abstract_dependency());
        assert!(edge.breaks_stable_dependency());

        let edge = DependencyMetrics::new(node("a", 0.25, 1, 1), node("e", 0.5, 4, 0), &config);
        assert!(!edge.breaks_abstract_dependency());
        assert!(!edge.breaks_stable_dependency());
    }

    #[test]
    fn sap_penalises_only_the_zone_of_pain() {
        let config = PrincipleConfig::default();
        // Both in pain, efferent deeper.
        let deeper = DependencyMetrics::new(node("a", 0.0, 1, 1), node("e", 0.0, 3, 1), &config);
        assert!(deeper.breaks_stable_abstractions());
        // Both in pain, efferent shallower.
        let shallower = DependencyMetrics::new(node("a", 0.0, 3, 1), node("e", 0.0, 1, 1), &config);
        assert!(!shallower.breaks_stable_abstractions());
        // Entering pain from the main sequence.
        let entering = DependencyMetrics::new(node("a", 0.5, 1, 1), node("e", 0.0, 3, 1), &config);
        assert!(entering.breaks_stable_abstractions());
        // Sliding into uselessness.
        let useless = DependencyMetrics::new(node("a", 0.5, 1, 1), node("e", 1.0, 0, 1), &config);
        assert!(!useless.breaks_stable_abstractions());
    }

    #[test]
    fn fragility_is_the_broken_share_of_edges() {
        let config = PrincipleConfig::default();
        let centre = node("c", 0.5, 2, 2);
        let clean = || node("x", 0.5, 2, 2);
        let edges = vec![
            DependencyMetrics::new(centre.clone(), clean(), &config),
            DependencyMetrics::new(clean(), centre.clone(), &config),
            DependencyMetrics::new(centre.clone(), clean(), &config),
            DependencyMetrics::new(centre.clone(), clean().with_instantiable(true), &config),
        ];
        assert_eq!(edges.iter().filter(|e| e.has_smell()).count(), 1);

        let family = FamilyMetrics::new(centre, edges);
        assert_eq!(family.broken_dependencies(), 1);
        assert!((family.fragility() - 0.25).abs() < EPS);
        assert!(family.breaks_dependency_inversion());
        assert!(!family.breaks_stable_abstractions());
        assert!((family.score() - 0.125).abs() < EPS);
    }

    #[test]
    fn family_means_include_the_node_and_far_endpoints() {
        let config = PrincipleConfig::default();
        let centre = node("c", 0.0, 1, 1);
        let edges = vec![
            DependencyMetrics::new(centre.clone(), node("e", 1.0, 1, 0), &config),
            DependencyMetrics::new(node("a", 0.5, 0, 1), centre.clone(), &config),
        ];
        let family = FamilyMetrics::new(centre, edges);
        assert!((family.mean_abstraction() - 0.5).abs() < EPS);
        assert!((family.mean_instability() - (0.5 + 0.0 + 1.0) / 3.0).abs() < EPS);
        assert_eq!(family.edges().len(), 2);
    }

    #[test]
    fn lonely_family_has_no_fragility() {
        let family = FamilyMetrics::new(node("c", 0.0, 5, 0), Vec::new());
        assert_eq!(family.fragility(), 0.0);
        assert_eq!(family.mean_distance(), 1.0);
        assert!((family.score() - 0.5).abs() < EPS);
    }

    #[test]
    fn principles_default_to_enabled_when_missing_from_toml() {
        let config: PrincipleConfig = toml::from_str("sap = false").unwrap();
        assert!(config.dip && config.sdp && config.adp);
        assert!(!config.sap);
    }
}
