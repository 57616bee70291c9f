//! Ordered layer registry (R1 CORE, R2 BRIDGES, R3 META, ...)
//!
//! Order matters: it defines which layers are adjacent for amplification and
//! what the positional aliases `R1..Rn` resolve to.

use burdencascade_core::{Error, Layer, Result, DEFAULT_LAYERS};

#[derive(Debug, Clone)]
pub struct LayerRegistry {
    layers: Vec<Layer>,
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self {
            layers: DEFAULT_LAYERS.iter().map(|name| Layer::from(*name)).collect(),
        }
    }
}

impl LayerRegistry {
    /// Build a registry from names in cascade order. Names are unique case-insensitively.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut layers: Vec<Layer> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                return Err(Error::unknown_layer(name));
            }
            if layers.iter().any(|l| l.as_str().eq_ignore_ascii_case(name)) {
                return Err(Error::DuplicateLayer(name.to_string()));
            }
            layers.push(Layer::from(name));
        }
        if layers.is_empty() {
            return Err(Error::NoLayers);
        }
        Ok(Self { layers })
    }

    /// Resolve a user-supplied name to its canonical layer.
    ///
    /// Accepts the registered name in any case, or the positional alias `R<n>`.
    pub fn resolve(&self, name: &str) -> Result<Layer> {
        let name = name.trim();
        if let Some(layer) = self
            .layers
            .iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(name))
        {
            return Ok(layer.clone());
        }
        if let Some(layer) = self.resolve_alias(name) {
            return Ok(layer.clone());
        }
        Err(Error::unknown_layer(name))
    }

    fn resolve_alias(&self, name: &str) -> Option<&Layer> {
        let digits = name.strip_prefix('R').or_else(|| name.strip_prefix('r'))?;
        let position: usize = digits.parse().ok()?;
        position.checked_sub(1).and_then(|i| self.layers.get(i))
    }

    pub fn contains(&self, layer: &Layer) -> bool {
        self.rank(layer).is_some()
    }

    /// Zero-based position in the cascade.
    pub fn rank(&self, layer: &Layer) -> Option<usize> {
        self.layers.iter().position(|l| l == layer)
    }

    /// `R1`, `R2`, … for a registered layer.
    pub fn alias(&self, layer: &Layer) -> Option<String> {
        self.rank(layer).map(|i| format!("R{}", i + 1))
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// `(upper, lower)` pairs for every adjacent step: (R2, R1), (R3, R2), …
    pub fn adjacent_pairs(&self) -> Vec<(Layer, Layer)> {
        self.layers
            .windows(2)
            .map(|w| (w[1].clone(), w[0].clone()))
            .collect()
    }
}
