//! The schema registry and its validation rules.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SchemaError, SchemaResult};
use crate::layer::{Anchoring, Layer, LayerKind, OverlapMode};

/// Registry of all layers known to one curation project.
///
/// A `Schema` is always valid: both constructors run [`Schema::validate`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    layers: Vec<Layer>,
}

impl Schema {
    /// Build and validate a schema from layer declarations.
    pub fn new(layers: Vec<Layer>) -> SchemaResult<Self> {
        let schema = Self { layers };
        schema.validate()?;
        debug!(layers = schema.layers.len(), "schema validated");
        Ok(schema)
    }

    /// Parse and validate a schema from a TOML document.
    ///
    /// ```
    /// use concord_schema::Schema;
    ///
    /// let schema = Schema::from_toml_str(r#"
    ///     [[layers]]
    ///     name = "pos"
    ///     kind = { type = "span" }
    ///
    ///     [[layers.features]]
    ///     name = "value"
    /// "#).unwrap();
    /// assert!(schema.layer("pos").is_some());
    /// ```
    pub fn from_toml_str(text: &str) -> SchemaResult<Self> {
        let parsed: Schema = toml::from_str(text)?;
        Self::new(parsed.layers)
    }

    /// Render the schema as TOML.
    pub fn to_toml_string(&self) -> SchemaResult<String> {
        Ok(toml::to_string(self)?)
    }

    /// Look up a layer by name.
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Look up a layer by name, failing with [`SchemaError::UnknownLayer`].
    pub fn require(&self, name: &str) -> SchemaResult<&Layer> {
        self.layer(name)
            .ok_or_else(|| SchemaError::UnknownLayer(name.to_string()))
    }

    /// All layers in declaration order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    /// All layers ordered so that endpoint layers precede the relation
    /// layers that reference them. Ties keep declaration order.
    pub fn layers_in_dependency_order(&self) -> Vec<&Layer> {
        let mut ordered: Vec<&Layer> = self.layers.iter().collect();
        ordered.sort_by_key(|l| l.kind.rank());
        ordered
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if no layers are declared.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Check every structural rule of the schema.
    pub fn validate(&self) -> SchemaResult<()> {
        let mut seen = HashSet::new();
        for layer in &self.layers {
            if layer.name.trim().is_empty() {
                return Err(SchemaError::unsupported(&layer.name, "layer name is empty"));
            }
            if !seen.insert(layer.name.as_str()) {
                return Err(SchemaError::unsupported(&layer.name, "duplicate layer name"));
            }
            self.validate_layer(layer)?;
        }
        Ok(())
    }

    fn validate_layer(&self, layer: &Layer) -> SchemaResult<()> {
        let anchoring = layer.effective_anchoring();
        match &layer.kind {
            LayerKind::Document { singleton } => {
                if anchoring != Anchoring::WholeDocument {
                    return Err(SchemaError::unsupported(
                        &layer.name,
                        "document layers must be anchored on the whole document",
                    ));
                }
                if *singleton && layer.overlap != OverlapMode::NoOverlap {
                    return Err(SchemaError::unsupported(
                        &layer.name,
                        "singleton document layers cannot permit stacking",
                    ));
                }
            }
            LayerKind::Span | LayerKind::LinkHost => {
                if anchoring == Anchoring::WholeDocument {
                    return Err(SchemaError::unsupported(
                        &layer.name,
                        "span layers cannot be anchored on the whole document",
                    ));
                }
            }
            LayerKind::Relation {
                source_layer,
                target_layer,
            } => {
                if anchoring == Anchoring::WholeDocument {
                    return Err(SchemaError::unsupported(
                        &layer.name,
                        "relation layers are anchored by their endpoints",
                    ));
                }
                for endpoint in [source_layer, target_layer] {
                    let Some(endpoint_layer) = self.layer(endpoint) else {
                        return Err(SchemaError::unsupported(
                            &layer.name,
                            format!("endpoint layer '{endpoint}' is not declared"),
                        ));
                    };
                    if !endpoint_layer.kind.is_span_like() {
                        return Err(SchemaError::unsupported(
                            &layer.name,
                            format!("endpoint layer '{endpoint}' is not a span layer"),
                        ));
                    }
                }
            }
        }

        let mut names = HashSet::new();
        for feature in &layer.features {
            if !names.insert(feature.name.as_str()) {
                return Err(SchemaError::unsupported(
                    &layer.name,
                    format!("duplicate feature '{}'", feature.name),
                ));
            }
            if feature.is_link() && layer.kind != LayerKind::LinkHost {
                return Err(SchemaError::unsupported(
                    &layer.name,
                    format!(
                        "link feature '{}' requires a link-host layer, found a {} layer",
                        feature.name,
                        layer.kind.name()
                    ),
                ));
            }
            if !feature.is_link() && feature.compare.is_link_only() {
                return Err(SchemaError::unsupported(
                    &layer.name,
                    format!(
                        "feature '{}' is primitive but uses a link-only comparison",
                        feature.name
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{CompareBehavior, FeatureSpec, LinkMultiplicity, LinkSpec};

    fn base_layers() -> Vec<Layer> {
        vec![
            Layer::span("token"),
            Layer::span("pos").feature(FeatureSpec::primitive("value")),
            Layer::relation("dependency", "token", "token")
                .overlap(OverlapMode::AnyOverlap)
                .feature(FeatureSpec::primitive("label")),
            Layer::document("sentiment", true).feature(FeatureSpec::primitive("polarity")),
        ]
    }

    fn assert_unsupported(result: SchemaResult<Schema>, needle: &str) {
        match result {
            Err(SchemaError::UnsupportedLayerConfiguration { reason, .. }) => {
                assert!(reason.contains(needle), "unexpected reason: {reason}");
            }
            other => panic!("expected UnsupportedLayerConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn valid_schema_builds() {
        let schema = Schema::new(base_layers()).unwrap();
        assert_eq!(schema.len(), 4);
        assert!(schema.layer("pos").is_some());
        assert!(schema.require("missing").is_err());
    }

    #[test]
    fn dependency_order_puts_relations_last() {
        let mut layers = base_layers();
        layers.rotate_left(2);
        let schema = Schema::new(layers).unwrap();
        let names: Vec<_> = schema
            .layers_in_dependency_order()
            .iter()
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(names.first(), Some(&"sentiment"));
        assert_eq!(names.last(), Some(&"dependency"));
    }

    #[test]
    fn rejects_duplicate_layers() {
        let layers = vec![Layer::span("pos"), Layer::span("pos")];
        assert_unsupported(Schema::new(layers), "duplicate layer");
    }

    #[test]
    fn rejects_missing_relation_endpoint() {
        let layers = vec![Layer::relation("dep", "token", "token")];
        assert_unsupported(Schema::new(layers), "not declared");
    }

    #[test]
    fn rejects_relation_onto_document_layer() {
        let layers = vec![
            Layer::document("doc", false),
            Layer::relation("rel", "doc", "doc"),
        ];
        assert_unsupported(Schema::new(layers), "not a span layer");
    }

    #[test]
    fn rejects_link_feature_outside_link_host() {
        let layers = vec![Layer::span("ner").feature(FeatureSpec::link(
            "args",
            LinkSpec::with_roles(LinkMultiplicity::default()),
        ))];
        assert_unsupported(Schema::new(layers), "link-host");
    }

    #[test]
    fn rejects_link_only_behaviour_on_primitive() {
        let layers = vec![Layer::span("ner").feature(
            FeatureSpec::primitive("value").compare(CompareBehavior::Discriminator),
        )];
        assert_unsupported(Schema::new(layers), "link-only");
    }

    #[test]
    fn rejects_stacking_singleton() {
        let layers = vec![Layer::document("doc", true).overlap(OverlapMode::AnyOverlap)];
        assert_unsupported(Schema::new(layers), "singleton");
    }

    #[test]
    fn rejects_document_anchoring_on_span() {
        let layers = vec![Layer::span("pos").anchoring(Anchoring::WholeDocument)];
        assert_unsupported(Schema::new(layers), "whole document");
    }

    #[test]
    fn rejects_duplicate_feature() {
        let layers = vec![Layer::span("pos")
            .feature(FeatureSpec::primitive("value"))
            .feature(FeatureSpec::primitive("value"))];
        assert_unsupported(Schema::new(layers), "duplicate feature");
    }

    #[test]
    fn loads_from_toml() {
        let schema = Schema::from_toml_str(
            r#"
            [[layers]]
            name = "token"
            kind = { type = "span" }

            [[layers]]
            name = "event"
            kind = { type = "link_host" }
            overlap = "any_overlap"
            anchoring = "token_aligned"

            [[layers.features]]
            name = "args"
            compare = "discriminator"
            kind = { type = "link", multiplicity = "multiple_targets_one_role", role_labels = true }

            [[layers]]
            name = "dependency"
            kind = { type = "relation", source_layer = "token", target_layer = "token" }

            [[layers]]
            name = "label"
            kind = { type = "document", singleton = true }
            "#,
        )
        .unwrap();

        let event = schema.layer("event").unwrap();
        assert_eq!(event.overlap, OverlapMode::AnyOverlap);
        assert_eq!(event.effective_anchoring(), Anchoring::TokenAligned);
        let (feature, spec) = event.link_features().next().unwrap();
        assert_eq!(feature.compare, CompareBehavior::Discriminator);
        assert_eq!(spec.multiplicity, LinkMultiplicity::MultipleTargetsOneRole);
        assert!(spec.role_labels);
        assert!(schema.layer("label").unwrap().is_singleton());
    }

    #[test]
    fn invalid_toml_is_rejected_after_parsing() {
        let result = Schema::from_toml_str(
            r#"
            [[layers]]
            name = "dep"
            kind = { type = "relation", source_layer = "a", target_layer = "b" }
            "#,
        );
        assert!(matches!(
            result,
            Err(SchemaError::UnsupportedLayerConfiguration { .. })
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let result = Schema::from_toml_str("[[layers]]\nname = 3\n");
        assert!(matches!(result, Err(SchemaError::Parse(_))));
    }

    #[test]
    fn toml_roundtrip_preserves_schema() {
        let schema = Schema::new(base_layers()).unwrap();
        let text = schema.to_toml_string().unwrap();
        let parsed = Schema::from_toml_str(&text).unwrap();
        assert_eq!(parsed, schema);
    }
}
