//! Game objects (`{Energy Cells}`) and script objects (`[THIS]`, `[Argon]`).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::types::DataType;

const MAIN_TYPES: [&str; 30] = [
    "SSTYPE_BACKGROUND",
    "SSTYPE_SUN",
    "SSTYPE_PLANET",
    "SSTYPE_DOCK",
    "SSTYPE_FACTORY",
    "SSTYPE_SHIP",
    "SSTYPE_LASER",
    "SSTYPE_SHIELD",
    "SSTYPE_MISSILE",
    "SSTYPE_WARE_ENERGY",
    "SSTYPE_WARE_NATURAL",
    "SSTYPE_WARE_BIO",
    "SSTYPE_WARE_FOOD",
    "SSTYPE_WARE_MINERAL",
    "SSTYPE_WARE_TECH",
    "SSTYPE_ASTEROID",
    "SSTYPE_GATE",
    "SSTYPE_CAMERA",
    "SSTYPE_SPECIAL",
    "SSTYPE_NEBULA",
    "SSTYPE_STATION",
    "SSTYPE_DUMMY",
    "SSTYPE_COMMAND",
    "SSTYPE_COCKPIT",
    "SSTYPE_DATATYPE",
    "SSTYPE_UNKNOWN",
    "SSTYPE_DEBRIS",
    "SSTYPE_DOCK_WRECK",
    "SSTYPE_FACTORY_WRECK",
    "SSTYPE_SHIP_WRECK",
];

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([A-Za-z_]+)@(-?\d+)$").expect("valid placeholder pattern"))
}

fn split_placeholder(text: &str) -> Option<(&str, i32)> {
    let captures = placeholder_pattern().captures(text.trim())?;
    let name = captures.get(1)?.as_str();
    let number = captures.get(2)?.as_str().parse().ok()?;
    Some((name, number))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameObject {
    pub name: String,
    pub main_type: u8,
    pub subtype: u16,
}

impl GameObject {
    pub fn encode(main_type: u8, subtype: u16) -> i32 {
        (main_type as i32) << 16 | subtype as i32
    }

    pub fn id(&self) -> i32 {
        GameObject::encode(self.main_type, self.subtype)
    }
}

/// Wares, ships and stations addressed by `{name}`.
#[derive(Debug, Clone, Default)]
pub struct GameObjectLibrary {
    by_name: HashMap<String, GameObject>,
    by_id: HashMap<i32, GameObject>,
}

impl GameObjectLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, object: GameObject) {
        let key = object.name.to_lowercase();
        if self.by_name.contains_key(&key) {
            log::warn!("ignoring duplicate game object '{}'", object.name);
            return;
        }
        self.by_id.entry(object.id()).or_insert_with(|| object.clone());
        self.by_name.insert(key, object);
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn find(&self, name: &str) -> Option<&GameObject> {
        self.by_name.get(&name.to_lowercase())
    }

    pub fn find_by_id(&self, id: i32) -> Option<&GameObject> {
        self.by_id.get(&id)
    }

    /// Parses the `TYPE@SUBTYPE` placeholder used for objects missing from the catalog.
    pub fn parse_placeholder(text: &str) -> Option<i32> {
        let (main, subtype) = split_placeholder(text)?;
        let main_type = MAIN_TYPES.iter().position(|t| t.eq_ignore_ascii_case(main))?;
        let subtype = u16::try_from(subtype).ok()?;
        Some(GameObject::encode(main_type as u8, subtype))
    }

    /// Encoded value for a name or placeholder.
    pub fn resolve(&self, name: &str) -> Option<i32> {
        self.find(name)
            .map(GameObject::id)
            .or_else(|| GameObjectLibrary::parse_placeholder(name))
    }

    /// Display name for an encoded value, falling back to a placeholder.
    pub fn describe(&self, id: i32) -> String {
        match self.find_by_id(id) {
            Some(object) => object.name.clone(),
            None => {
                let main_type = ((id as u32) >> 16) as usize;
                let subtype = (id as u32) & 0xFFFF;
                let main = MAIN_TYPES.get(main_type).copied().unwrap_or("SSTYPE_UNKNOWN");
                format!("{}@{}", main, subtype)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptObjectGroup {
    Constant,
    Race,
    ObjectClass,
    Relation,
    Sector,
    StationSerial,
    TransportClass,
    FlightReturn,
    Operator,
}

const GROUPS: [ScriptObjectGroup; 9] = [
    ScriptObjectGroup::Constant,
    ScriptObjectGroup::Race,
    ScriptObjectGroup::ObjectClass,
    ScriptObjectGroup::Relation,
    ScriptObjectGroup::Sector,
    ScriptObjectGroup::StationSerial,
    ScriptObjectGroup::TransportClass,
    ScriptObjectGroup::FlightReturn,
    ScriptObjectGroup::Operator,
];

impl ScriptObjectGroup {
    pub fn data_type(&self) -> DataType {
        match self {
            ScriptObjectGroup::Constant => DataType::Constant,
            ScriptObjectGroup::Race => DataType::Race,
            ScriptObjectGroup::ObjectClass => DataType::ObjectClass,
            ScriptObjectGroup::Relation => DataType::Relation,
            ScriptObjectGroup::Sector => DataType::Sector,
            ScriptObjectGroup::StationSerial => DataType::StationSerial,
            ScriptObjectGroup::TransportClass => DataType::TransportClass,
            ScriptObjectGroup::FlightReturn => DataType::FlightReturn,
            ScriptObjectGroup::Operator => DataType::Operator,
        }
    }

    pub fn from_data_type(data_type: DataType) -> Option<ScriptObjectGroup> {
        GROUPS.iter().copied().find(|g| g.data_type() == data_type)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScriptObjectGroup::Constant => "Constant",
            ScriptObjectGroup::Race => "Race",
            ScriptObjectGroup::ObjectClass => "ObjectClass",
            ScriptObjectGroup::Relation => "Relation",
            ScriptObjectGroup::Sector => "Sector",
            ScriptObjectGroup::StationSerial => "StationSerial",
            ScriptObjectGroup::TransportClass => "TransportClass",
            ScriptObjectGroup::FlightReturn => "FlightReturn",
            ScriptObjectGroup::Operator => "Operator",
        }
    }

    pub fn from_name(name: &str) -> Option<ScriptObjectGroup> {
        GROUPS.iter().copied().find(|g| g.name().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptObject {
    pub name: String,
    pub group: ScriptObjectGroup,
    pub id: i32,
}

/// Constants, races, classes and other `[name]` objects.
#[derive(Debug, Clone, Default)]
pub struct ScriptObjectLibrary {
    by_name: HashMap<String, ScriptObject>,
    by_id: HashMap<(ScriptObjectGroup, i32), ScriptObject>,
}

impl ScriptObjectLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, object: ScriptObject) {
        self.by_id
            .entry((object.group, object.id))
            .or_insert_with(|| object.clone());
        let key = object.name.to_lowercase();
        if self.by_name.contains_key(&key) {
            log::warn!("script object '{}' is defined in more than one group", object.name);
            return;
        }
        self.by_name.insert(key, object);
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn find(&self, name: &str) -> Option<&ScriptObject> {
        self.by_name.get(&name.to_lowercase())
    }

    pub fn find_by_id(&self, group: ScriptObjectGroup, id: i32) -> Option<&ScriptObject> {
        self.by_id.get(&(group, id))
    }

    /// Parses the `GROUP@ID` placeholder used for objects missing from the catalog.
    pub fn parse_placeholder(text: &str) -> Option<(ScriptObjectGroup, i32)> {
        let (group, id) = split_placeholder(text)?;
        Some((ScriptObjectGroup::from_name(group)?, id))
    }

    /// Group and ID for a name or placeholder.
    pub fn resolve(&self, name: &str) -> Option<(ScriptObjectGroup, i32)> {
        self.find(name)
            .map(|object| (object.group, object.id))
            .or_else(|| ScriptObjectLibrary::parse_placeholder(name))
    }

    pub fn describe(&self, group: ScriptObjectGroup, id: i32) -> String {
        match self.find_by_id(group, id) {
            Some(object) => object.name.clone(),
            None => format!("{}@{}", group.name(), id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_objects_resolve_by_name_or_placeholder() {
        let mut library = GameObjectLibrary::new();
        library.add(GameObject {
            name: "Energy Cells".into(),
            main_type: 9,
            subtype: 0,
        });
        assert_eq!(library.resolve("energy cells"), Some(9 << 16));
        assert_eq!(library.resolve("SSTYPE_LASER@12"), Some(6 << 16 | 12));
        assert_eq!(library.resolve("Unknown Thing"), None);
        assert_eq!(library.describe(9 << 16), "Energy Cells");
        assert_eq!(library.describe(6 << 16 | 12), "SSTYPE_LASER@12");
    }

    #[test]
    fn script_objects_resolve_by_name_or_placeholder() {
        let mut library = ScriptObjectLibrary::new();
        library.add(ScriptObject {
            name: "Argon".into(),
            group: ScriptObjectGroup::Race,
            id: 1,
        });
        assert_eq!(library.resolve("ARGON"), Some((ScriptObjectGroup::Race, 1)));
        assert_eq!(library.resolve("Relation@3"), Some((ScriptObjectGroup::Relation, 3)));
        assert_eq!(library.resolve("Nope@3"), None);
        assert_eq!(library.describe(ScriptObjectGroup::Race, 7), "Race@7");
    }
}
