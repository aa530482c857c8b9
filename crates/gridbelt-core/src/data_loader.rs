//! Data-driven registry loading from JSON.
//!
//! Feature-gated behind `data-loader`. Provides JSON deserialization into
//! [`RegistryBuilder`] for game content defined in data files.

use crate::geometry::{Direction, Footprint, GridPoint};
use crate::registry::{
    PortKind, PortSpec, PrototypeDef, PrototypeRole, Registry, RegistryBuilder, RegistryError,
};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("unknown item reference: {0}")]
    UnknownItemRef(String),
    #[error("unknown direction: {0}")]
    UnknownDirection(String),
    #[error("unknown port kind: {0}")]
    UnknownPortKind(String),
}

// ---------------------------------------------------------------------------
// JSON data structures
// ---------------------------------------------------------------------------

/// Top-level registry data structure for JSON deserialization.
#[derive(Debug, serde::Deserialize)]
pub struct RegistryData {
    #[serde(default)]
    pub items: Vec<ItemData>,
    #[serde(default)]
    pub prototypes: Vec<PrototypeData>,
}

/// JSON representation of an item kind.
#[derive(Debug, serde::Deserialize)]
pub struct ItemData {
    pub name: String,
}

/// JSON representation of a machine prototype.
#[derive(Debug, serde::Deserialize)]
pub struct PrototypeData {
    pub name: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub ports: Vec<PortData>,
    pub role: RoleData,
    #[serde(default)]
    pub needs_power: bool,
}

/// JSON representation of a port.
#[derive(Debug, serde::Deserialize)]
pub struct PortData {
    pub x: i32,
    pub y: i32,
    pub direction: String, // "north", "east", "south", "west"
    pub kind: String,      // "in", "out"
}

/// JSON representation of a prototype role.
#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoleData {
    Pickup {
        output: String,
    },
    Processor {
        input: String,
        output: String,
        cycle_ticks: u32,
        input_capacity: u32,
        output_capacity: u32,
    },
    Depot,
    PowerPole {
        radius: u32,
    },
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

fn parse_direction(s: &str) -> Result<Direction, DataLoadError> {
    match s {
        "north" => Ok(Direction::North),
        "east" => Ok(Direction::East),
        "south" => Ok(Direction::South),
        "west" => Ok(Direction::West),
        other => Err(DataLoadError::UnknownDirection(other.to_string())),
    }
}

fn parse_port_kind(s: &str) -> Result<PortKind, DataLoadError> {
    match s {
        "in" => Ok(PortKind::In),
        "out" => Ok(PortKind::Out),
        other => Err(DataLoadError::UnknownPortKind(other.to_string())),
    }
}

/// Populate a [`RegistryBuilder`] from a JSON document.
pub fn load_into_builder(
    builder: &mut RegistryBuilder,
    json: &str,
) -> Result<(), DataLoadError> {
    let data: RegistryData = serde_json::from_str(json)?;

    for item in &data.items {
        builder.register_item(&item.name);
    }

    let lookup = |builder: &RegistryBuilder, name: &str| {
        builder
            .item_id(name)
            .ok_or_else(|| DataLoadError::UnknownItemRef(name.to_string()))
    };

    for proto in &data.prototypes {
        let role = match &proto.role {
            RoleData::Pickup { output } => PrototypeRole::Pickup {
                output: lookup(builder, output)?,
            },
            RoleData::Processor {
                input,
                output,
                cycle_ticks,
                input_capacity,
                output_capacity,
            } => PrototypeRole::Processor {
                input: lookup(builder, input)?,
                output: lookup(builder, output)?,
                cycle_ticks: *cycle_ticks,
                input_capacity: *input_capacity,
                output_capacity: *output_capacity,
            },
            RoleData::Depot => PrototypeRole::Depot,
            RoleData::PowerPole { radius } => PrototypeRole::PowerPole { radius: *radius },
        };

        let ports = proto
            .ports
            .iter()
            .map(|port| {
                Ok(PortSpec {
                    offset: GridPoint::new(port.x, port.y),
                    direction: parse_direction(&port.direction)?,
                    kind: parse_port_kind(&port.kind)?,
                })
            })
            .collect::<Result<Vec<_>, DataLoadError>>()?;

        builder.register_prototype(PrototypeDef {
            name: proto.name.clone(),
            footprint: Footprint {
                width: proto.width,
                height: proto.height,
            },
            ports,
            role,
            needs_power: proto.needs_power,
        });
    }

    Ok(())
}

/// Build a complete registry from a JSON document.
pub fn load_registry(json: &str) -> Result<Registry, DataLoadError> {
    let mut builder = RegistryBuilder::new();
    load_into_builder(&mut builder, json)?;
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PrototypeRole;

    const SAMPLE: &str = r#"{
        "items": [
            { "name": "iron_ore" },
            { "name": "iron_plate" }
        ],
        "prototypes": [
            {
                "name": "miner",
                "width": 1,
                "height": 1,
                "ports": [
                    { "x": 0, "y": 0, "direction": "south", "kind": "out" }
                ],
                "role": { "type": "pickup", "output": "iron_ore" }
            },
            {
                "name": "smelter",
                "width": 2,
                "height": 2,
                "ports": [
                    { "x": 0, "y": 0, "direction": "south", "kind": "in" },
                    { "x": 1, "y": 1, "direction": "south", "kind": "out" }
                ],
                "role": {
                    "type": "processor",
                    "input": "iron_ore",
                    "output": "iron_plate",
                    "cycle_ticks": 5,
                    "input_capacity": 50,
                    "output_capacity": 50
                },
                "needs_power": true
            },
            {
                "name": "pole",
                "width": 1,
                "height": 1,
                "role": { "type": "power_pole", "radius": 3 }
            }
        ]
    }"#;

    #[test]
    fn load_sample_registry() {
        let registry = load_registry(SAMPLE).unwrap();
        assert_eq!(registry.item_count(), 2);
        assert_eq!(registry.prototype_count(), 3);

        let smelter = registry
            .get_prototype(registry.prototype_id("smelter").unwrap())
            .unwrap();
        assert!(smelter.needs_power);
        assert_eq!(smelter.ports.len(), 2);
        match &smelter.role {
            PrototypeRole::Processor {
                cycle_ticks,
                input_capacity,
                ..
            } => {
                assert_eq!(*cycle_ticks, 5);
                assert_eq!(*input_capacity, 50);
            }
            other => panic!("expected processor role, got: {other:?}"),
        }
    }

    #[test]
    fn unknown_item_reference_fails() {
        let json = r#"{
            "prototypes": [
                {
                    "name": "miner",
                    "width": 1,
                    "height": 1,
                    "role": { "type": "pickup", "output": "missing" }
                }
            ]
        }"#;
        assert!(matches!(
            load_registry(json),
            Err(DataLoadError::UnknownItemRef(_))
        ));
    }

    #[test]
    fn malformed_json_fails() {
        assert!(matches!(
            load_registry("{ not json"),
            Err(DataLoadError::JsonParse(_))
        ));
    }

    #[test]
    fn bad_direction_fails() {
        let json = r#"{
            "items": [{ "name": "x" }],
            "prototypes": [
                {
                    "name": "m",
                    "width": 1,
                    "height": 1,
                    "ports": [{ "x": 0, "y": 0, "direction": "up", "kind": "out" }],
                    "role": { "type": "pickup", "output": "x" }
                }
            ]
        }"#;
        assert!(matches!(
            load_registry(json),
            Err(DataLoadError::UnknownDirection(_))
        ));
    }
}
