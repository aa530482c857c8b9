use crate::geometry::{Direction, Footprint, GridPoint};
use crate::id::{ItemKindId, PrototypeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An item kind definition in the registry.
#[derive(Debug, Clone)]
pub struct ItemKindDef {
    pub name: String,
}

/// Whether a port accepts or emits items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortKind {
    In,
    Out,
}

/// A connection point on a prototype, in pre-rotation local coordinates.
///
/// `direction` is the required flow direction through the port: belts must
/// leave an `Out` port along it and enter an `In` port along it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    pub offset: GridPoint,
    pub direction: Direction,
    pub kind: PortKind,
}

/// What a machine does when the simulation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrototypeRole {
    /// Emits a fixed item kind from its output ports, drawing from nothing.
    Pickup { output: ItemKindId },
    /// Consumes `input` units one at a time, producing `output` after a fixed
    /// cycle. Input and output storage are bounded by the given capacities.
    Processor {
        input: ItemKindId,
        output: ItemKindId,
        cycle_ticks: u32,
        input_capacity: u32,
        output_capacity: u32,
    },
    /// Absorbs arriving items into the external inventory (unbounded).
    Depot,
    /// Emits power over a coverage square of the given Chebyshev radius.
    PowerPole { radius: u32 },
}

/// A machine prototype definition.
#[derive(Debug, Clone)]
pub struct PrototypeDef {
    pub name: String,
    pub footprint: Footprint,
    pub ports: Vec<PortSpec>,
    pub role: PrototypeRole,
    pub needs_power: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid item reference: {0:?}")]
    InvalidItemRef(ItemKindId),
    #[error("port offset {offset:?} lies outside the footprint of {prototype}")]
    PortOutsideFootprint {
        prototype: String,
        offset: GridPoint,
    },
}

/// Builder for constructing an immutable Registry.
/// Three-phase lifecycle: registration -> mutation -> finalization.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    items: Vec<ItemKindDef>,
    item_name_to_id: HashMap<String, ItemKindId>,
    prototypes: Vec<PrototypeDef>,
    prototype_name_to_id: HashMap<String, PrototypeId>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register an item kind. Returns its ID.
    pub fn register_item(&mut self, name: &str) -> ItemKindId {
        let id = ItemKindId(self.items.len() as u32);
        self.items.push(ItemKindDef {
            name: name.to_string(),
        });
        self.item_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Phase 1: Register a machine prototype. Returns its ID.
    pub fn register_prototype(&mut self, def: PrototypeDef) -> PrototypeId {
        let id = PrototypeId(self.prototypes.len() as u32);
        self.prototype_name_to_id.insert(def.name.clone(), id);
        self.prototypes.push(def);
        id
    }

    /// Phase 2: Mutate an existing prototype by name.
    pub fn mutate_prototype<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut PrototypeDef),
    {
        let id = self
            .prototype_name_to_id
            .get(name)
            .ok_or(RegistryError::NotFound(name.to_string()))?;
        f(&mut self.prototypes[id.0 as usize]);
        Ok(())
    }

    /// Lookup item kind ID by name.
    pub fn item_id(&self, name: &str) -> Option<ItemKindId> {
        self.item_name_to_id.get(name).copied()
    }

    /// Lookup prototype ID by name.
    pub fn prototype_id(&self, name: &str) -> Option<PrototypeId> {
        self.prototype_name_to_id.get(name).copied()
    }

    /// Phase 3: Finalize and build the immutable registry.
    ///
    /// Validates that role item references exist and that every port offset
    /// lies inside the prototype's footprint.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let item_count = self.items.len() as u32;
        let check_item = |id: ItemKindId| {
            if id.0 >= item_count {
                Err(RegistryError::InvalidItemRef(id))
            } else {
                Ok(())
            }
        };

        for proto in &self.prototypes {
            match &proto.role {
                PrototypeRole::Pickup { output } => check_item(*output)?,
                PrototypeRole::Processor { input, output, .. } => {
                    check_item(*input)?;
                    check_item(*output)?;
                }
                PrototypeRole::Depot | PrototypeRole::PowerPole { .. } => {}
            }

            for port in &proto.ports {
                let inside = port.offset.x >= 0
                    && port.offset.y >= 0
                    && (port.offset.x as u32) < proto.footprint.width
                    && (port.offset.y as u32) < proto.footprint.height;
                if !inside {
                    return Err(RegistryError::PortOutsideFootprint {
                        prototype: proto.name.clone(),
                        offset: port.offset,
                    });
                }
            }
        }

        Ok(Registry {
            items: self.items,
            item_name_to_id: self.item_name_to_id,
            prototypes: self.prototypes,
            prototype_name_to_id: self.prototype_name_to_id,
        })
    }
}

/// Immutable registry. Frozen after build(). Thread-safe to share.
#[derive(Debug)]
pub struct Registry {
    items: Vec<ItemKindDef>,
    item_name_to_id: HashMap<String, ItemKindId>,
    prototypes: Vec<PrototypeDef>,
    prototype_name_to_id: HashMap<String, PrototypeId>,
}

impl Registry {
    pub fn get_item(&self, id: ItemKindId) -> Option<&ItemKindDef> {
        self.items.get(id.0 as usize)
    }

    pub fn get_prototype(&self, id: PrototypeId) -> Option<&PrototypeDef> {
        self.prototypes.get(id.0 as usize)
    }

    pub fn item_id(&self, name: &str) -> Option<ItemKindId> {
        self.item_name_to_id.get(name).copied()
    }

    pub fn prototype_id(&self, name: &str) -> Option<PrototypeId> {
        self.prototype_name_to_id.get(name).copied()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn prototype_count(&self) -> usize {
        self.prototypes.len()
    }
}
