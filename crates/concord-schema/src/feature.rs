//! Feature declarations and their comparison behaviour.

use serde::{Deserialize, Serialize};

/// How a feature takes part in equality and position identity.
///
/// The diff engine consults this declaratively when it projects an
/// annotation onto its comparable label; no special cases live in the diff
/// algorithm itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareBehavior {
    /// The feature value is part of the label.
    #[default]
    Include,
    /// The feature is ignored when comparing annotations.
    Exclude,
    /// Link features only: the link target is the compared value and the
    /// role is the key, regardless of the caller's [`LinkCompareBehavior`].
    LinkTargetAsLabel,
    /// Link features only: the set of roles becomes part of the position,
    /// so hosts at equal offsets with different role sets are distinct.
    Discriminator,
}

impl CompareBehavior {
    /// Returns `true` if the behaviour is only meaningful on link features.
    pub fn is_link_only(&self) -> bool {
        matches!(self, Self::LinkTargetAsLabel | Self::Discriminator)
    }
}

/// Which value of a link is treated as its comparable label.
///
/// Supplied by the caller per diff.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkCompareBehavior {
    /// Links are keyed by role; two annotators agree on a role if they
    /// linked it to the same target.
    #[default]
    TargetAsLabel,
    /// Links are keyed by target; two annotators agree on a target if they
    /// assigned it the same role.
    RoleAsLabel,
}

/// Multiplicity of a link feature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMultiplicity {
    /// Each role has at most one target; a target may fill several roles.
    #[default]
    OneTargetMultipleRoles,
    /// A role may have several targets, but a target fills one role only.
    MultipleTargetsOneRole,
    /// Any combination of roles and targets, each pair at most once.
    MultipleTargetsMultipleRoles,
}

/// Declaration of a link (slot) feature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkSpec {
    #[serde(default)]
    pub multiplicity: LinkMultiplicity,
    /// Whether links carry role labels. Without role labels a link is
    /// identified by its target alone.
    #[serde(default)]
    pub role_labels: bool,
}

impl LinkSpec {
    /// Link spec with role labels enabled.
    pub fn with_roles(multiplicity: LinkMultiplicity) -> Self {
        Self {
            multiplicity,
            role_labels: true,
        }
    }

    /// Link spec without role labels.
    pub fn without_roles(multiplicity: LinkMultiplicity) -> Self {
        Self {
            multiplicity,
            role_labels: false,
        }
    }

    /// Whether a link's role distinguishes it from another link to the same
    /// target when the two are merged into one host.
    ///
    /// `MultipleTargetsOneRole` lets a target fill one role only, so a second
    /// link to the same target is a duplicate whatever its role.
    pub fn role_distinguishes_target(&self) -> bool {
        self.role_labels && self.multiplicity != LinkMultiplicity::MultipleTargetsOneRole
    }
}

/// The value shape of a feature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureKind {
    /// A primitive or structured value stored in the annotation's feature map.
    #[default]
    Primitive,
    /// An ordered list of (role, target) links.
    Link(LinkSpec),
}

/// Declaration of one feature of a layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    #[serde(default)]
    pub kind: FeatureKind,
    #[serde(default)]
    pub compare: CompareBehavior,
}

impl FeatureSpec {
    /// A primitive feature included in equality.
    pub fn primitive(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FeatureKind::Primitive,
            compare: CompareBehavior::Include,
        }
    }

    /// A link feature included in equality.
    pub fn link(name: impl Into<String>, spec: LinkSpec) -> Self {
        Self {
            name: name.into(),
            kind: FeatureKind::Link(spec),
            compare: CompareBehavior::Include,
        }
    }

    /// Replace the comparison behaviour.
    pub fn compare(mut self, compare: CompareBehavior) -> Self {
        self.compare = compare;
        self
    }

    /// The link declaration, if this is a link feature.
    pub fn link_spec(&self) -> Option<&LinkSpec> {
        match &self.kind {
            FeatureKind::Link(spec) => Some(spec),
            FeatureKind::Primitive => None,
        }
    }

    /// Returns `true` if this is a link feature.
    pub fn is_link(&self) -> bool {
        matches!(self.kind, FeatureKind::Link(_))
    }

    /// Returns `true` if the feature takes part in equality.
    pub fn is_compared(&self) -> bool {
        self.compare != CompareBehavior::Exclude
    }

    /// The effective link comparison for this feature under the caller's
    /// global flag.
    pub fn effective_link_compare(&self, global: LinkCompareBehavior) -> LinkCompareBehavior {
        match self.compare {
            CompareBehavior::LinkTargetAsLabel => LinkCompareBehavior::TargetAsLabel,
            _ => global,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        assert_eq!(CompareBehavior::default(), CompareBehavior::Include);
        assert_eq!(
            LinkCompareBehavior::default(),
            LinkCompareBehavior::TargetAsLabel
        );
        let spec = FeatureSpec::primitive("value");
        assert!(!spec.is_link());
        assert!(spec.is_compared());
    }

    #[test]
    fn link_target_as_label_overrides_global_flag() {
        let spec = FeatureSpec::link("args", LinkSpec::default())
            .compare(CompareBehavior::LinkTargetAsLabel);
        assert_eq!(
            spec.effective_link_compare(LinkCompareBehavior::RoleAsLabel),
            LinkCompareBehavior::TargetAsLabel
        );
        let plain = FeatureSpec::link("args", LinkSpec::default());
        assert_eq!(
            plain.effective_link_compare(LinkCompareBehavior::RoleAsLabel),
            LinkCompareBehavior::RoleAsLabel
        );
    }

    #[test]
    fn role_distinguishes_target() {
        let no_roles = LinkSpec::without_roles(LinkMultiplicity::OneTargetMultipleRoles);
        assert!(!no_roles.role_distinguishes_target());
        let roles = LinkSpec::with_roles(LinkMultiplicity::OneTargetMultipleRoles);
        assert!(roles.role_distinguishes_target());
        let one_role = LinkSpec::with_roles(LinkMultiplicity::MultipleTargetsOneRole);
        assert!(!one_role.role_distinguishes_target());
    }

    #[test]
    fn excluded_feature_is_not_compared() {
        let spec = FeatureSpec::primitive("comment").compare(CompareBehavior::Exclude);
        assert!(!spec.is_compared());
        assert!(!CompareBehavior::Exclude.is_link_only());
        assert!(CompareBehavior::Discriminator.is_link_only());
    }

    #[test]
    fn feature_kind_json_shape() {
        let spec = FeatureSpec::link(
            "slots",
            LinkSpec::with_roles(LinkMultiplicity::MultipleTargetsMultipleRoles),
        );
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["kind"]["type"], "link");
        assert_eq!(json["kind"]["multiplicity"], "multiple_targets_multiple_roles");
        assert_eq!(json["compare"], "include");
    }
}
