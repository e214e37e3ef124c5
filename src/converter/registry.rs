use super::{AgentConverter, ApiConverter, GenericConverter, NodeConverter, StarterConverter};
use crate::workflow::Node;
use ahash::AHashMap;
use std::sync::Arc;

/// Registry tag of the catch-all converter consulted last.
pub const GENERIC_TAG: &str = "generic";

/// Maps type tags to converters. Registering a tag twice replaces the earlier converter.
#[derive(Clone)]
pub struct ConverterRegistry {
    converters: AHashMap<String, Arc<dyn NodeConverter>>,
    order: Vec<String>,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("starter", Arc::new(StarterConverter));
        registry.register("agent", Arc::new(AgentConverter));
        registry.register("api", Arc::new(ApiConverter));
        registry.register(GENERIC_TAG, Arc::new(GenericConverter));
        registry
    }
}

impl ConverterRegistry {
    /// A registry with no converters at all.
    pub fn empty() -> Self {
        Self {
            converters: AHashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn register(&mut self, tag: impl Into<String>, converter: Arc<dyn NodeConverter>) {
        let tag = tag.into();
        if self.converters.insert(tag.clone(), converter).is_none() {
            self.order.push(tag);
        }
    }

    /// Registers the converter already known under `builtin_tag` for `user_tag` too.
    /// Returns false if nothing is registered under `builtin_tag`.
    pub fn alias(&mut self, user_tag: &str, builtin_tag: &str) -> bool {
        match self.converters.get(builtin_tag).cloned() {
            Some(converter) => {
                self.register(user_tag, converter);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, tag: &str) -> Option<&Arc<dyn NodeConverter>> {
        self.converters.get(tag)
    }

    /// Registered tags in registration order.
    pub fn available_converters(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Picks the converter for a node: a converter registered under the node's type
    /// tag, then one registered under its `data.type`, then the first registered
    /// converter whose capability check accepts the node, then `generic`.
    /// Returns the registry tag alongside the converter.
    pub fn resolve(&self, node: &Node) -> Option<(&str, &Arc<dyn NodeConverter>)> {
        if let Some(found) = self.registered_under(&node.node_type) {
            return Some(found);
        }
        if let Some(found) = node.data_type_tag().and_then(|tag| self.registered_under(tag)) {
            return Some(found);
        }
        self.order
            .iter()
            .filter(|tag| tag.as_str() != GENERIC_TAG)
            .filter_map(|tag| self.converters.get_key_value(tag.as_str()))
            .find(|(_, converter)| converter.can_convert(node))
            .or_else(|| {
                self.converters
                    .get_key_value(GENERIC_TAG)
                    .filter(|(_, converter)| converter.can_convert(node))
            })
            .map(|(tag, converter)| (tag.as_str(), converter))
    }

    // An explicit registration counts as acceptance; that is what makes aliases work.
    fn registered_under(&self, tag: &str) -> Option<(&str, &Arc<dyn NodeConverter>)> {
        if tag.is_empty() || tag == GENERIC_TAG {
            return None;
        }
        self.converters
            .get_key_value(tag)
            .map(|(tag, converter)| (tag.as_str(), converter))
    }
}
