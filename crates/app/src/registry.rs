//! Thing registry — maps the index found in a request path to a thing.
//!
//! A server hosts either a [`SingleThing`] mounted at the base path, or
//! [`MultipleThings`] mounted at `{base}/{index}`.

use crate::thing_handle::ThingHandle;

/// Lookup of the things a server exposes.
pub trait ThingRegistry: Send + Sync + 'static {
    /// Resolve a thing from its path index. `None` means no index in the
    /// path, which only a single-thing registry accepts.
    fn thing(&self, index: Option<&str>) -> Option<ThingHandle>;

    /// Every hosted thing, in index order.
    fn things(&self) -> Vec<ThingHandle>;

    /// Human-readable name of the server.
    fn name(&self) -> String;

    /// Whether things are addressed by index.
    fn is_multiple(&self) -> bool;

    /// Assign href prefixes so every thing's links resolve under
    /// `base_path`.
    fn mount(&self, base_path: &str);
}

/// A registry holding exactly one thing.
#[derive(Debug, Clone)]
pub struct SingleThing {
    thing: ThingHandle,
}

impl SingleThing {
    #[must_use]
    pub fn new(thing: ThingHandle) -> Self {
        Self { thing }
    }
}

impl ThingRegistry for SingleThing {
    fn thing(&self, _index: Option<&str>) -> Option<ThingHandle> {
        Some(self.thing.clone())
    }

    fn things(&self) -> Vec<ThingHandle> {
        vec![self.thing.clone()]
    }

    fn name(&self) -> String {
        self.thing.title()
    }

    fn is_multiple(&self) -> bool {
        false
    }

    fn mount(&self, base_path: &str) {
        self.thing.set_href_prefix(base_path);
    }
}

/// A registry of several things addressed by their position.
#[derive(Debug, Clone)]
pub struct MultipleThings {
    things: Vec<ThingHandle>,
    name: String,
}

impl MultipleThings {
    #[must_use]
    pub fn new(things: Vec<ThingHandle>, name: impl Into<String>) -> Self {
        Self {
            things,
            name: name.into(),
        }
    }
}

impl ThingRegistry for MultipleThings {
    fn thing(&self, index: Option<&str>) -> Option<ThingHandle> {
        let index: usize = index?.parse().ok()?;
        self.things.get(index).cloned()
    }

    fn things(&self) -> Vec<ThingHandle> {
        self.things.clone()
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_multiple(&self) -> bool {
        true
    }

    fn mount(&self, base_path: &str) {
        for (index, thing) in self.things.iter().enumerate() {
            thing.set_href_prefix(&format!("{base_path}/{index}"));
        }
    }
}
