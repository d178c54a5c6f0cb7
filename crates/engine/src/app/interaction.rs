use serde::Serialize;
use tracing::debug;

use super::math::Vec3;

pub const DEFAULT_INTERACTION_RANGE: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct InteractableId(pub u64);

#[derive(Debug, Default)]
pub struct InteractableIdAllocator {
    next: u64,
}

impl InteractableIdAllocator {
    pub fn allocate(&mut self) -> InteractableId {
        let id = InteractableId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Kind-specific eligibility on top of the generic enabled/visible/range checks.
pub trait InteractionEligibility {
    fn accepts_interaction(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Interactable<K> {
    pub id: InteractableId,
    pub kind: K,
    pub position: Vec3,
    pub enabled: bool,
    pub visible: bool,
    pub range: Option<f32>,
    pub prompt: Option<String>,
}

impl<K> Interactable<K> {
    pub fn effective_range(&self) -> f32 {
        self.range.unwrap_or(DEFAULT_INTERACTION_RANGE)
    }
}

impl<K: InteractionEligibility> Interactable<K> {
    pub fn is_eligible(&self) -> bool {
        self.enabled && self.visible && self.kind.accepts_interaction()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractableDesc<K> {
    pub kind: K,
    pub position: Vec3,
    pub enabled: bool,
    pub visible: bool,
    pub range: Option<f32>,
    pub prompt: Option<String>,
}

impl<K> InteractableDesc<K> {
    pub fn new(kind: K, position: Vec3) -> Self {
        Self {
            kind,
            position,
            enabled: true,
            visible: true,
            range: None,
            prompt: None,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_range(mut self, range: Option<f32>) -> Self {
        self.range = range;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

/// Flat, registration-ordered set of entities the player may act on.
#[derive(Debug)]
pub struct InteractableRegistry<K> {
    allocator: InteractableIdAllocator,
    entries: Vec<Interactable<K>>,
}

impl<K> Default for InteractableRegistry<K> {
    fn default() -> Self {
        Self {
            allocator: InteractableIdAllocator::default(),
            entries: Vec::new(),
        }
    }
}

impl<K> InteractableRegistry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, desc: InteractableDesc<K>) -> InteractableId {
        let id = self.allocator.allocate();
        self.entries.push(Interactable {
            id,
            kind: desc.kind,
            position: desc.position,
            enabled: desc.enabled,
            visible: desc.visible,
            range: desc.range,
            prompt: desc.prompt,
        });
        id
    }

    /// Adds `entity` unless an entry with the same id is already present.
    /// Returns whether the registry changed.
    pub fn register(&mut self, entity: Interactable<K>) -> bool {
        if self.contains(entity.id) {
            return false;
        }
        self.entries.push(entity);
        true
    }

    pub fn unregister(&mut self, id: InteractableId) -> Option<Interactable<K>> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        debug!(interactable_id = id.0, "interactable_unregistered");
        Some(self.entries.remove(index))
    }

    pub fn contains(&self, id: InteractableId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    pub fn get(&self, id: InteractableId) -> Option<&Interactable<K>> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn get_mut(&mut self, id: InteractableId) -> Option<&mut Interactable<K>> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }

    pub fn set_enabled(&mut self, id: InteractableId, enabled: bool) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn set_visible(&mut self, id: InteractableId, visible: bool) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.visible = visible;
                true
            }
            None => false,
        }
    }

    pub fn set_prompt(&mut self, id: InteractableId, prompt: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.prompt = Some(prompt.into());
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interactable<K>> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Interactable<K>> {
        self.entries.iter_mut()
    }
}

impl<K: InteractionEligibility> InteractableRegistry<K> {
    /// Nearest eligible entity strictly inside its own range. Exact distance ties keep
    /// the earlier registration.
    pub fn query_nearest(&self, player_position: Vec3) -> Option<InteractableId> {
        let mut closest: Option<(InteractableId, f32)> = None;
        for entry in &self.entries {
            if !entry.is_eligible() {
                continue;
            }
            let distance = player_position.distance(entry.position);
            if distance >= entry.effective_range() {
                continue;
            }
            match closest {
                Some((_, best)) if distance >= best => {}
                _ => closest = Some((entry.id, distance)),
            }
        }
        closest.map(|(id, _)| id)
    }
}
