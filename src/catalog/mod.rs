pub mod objects;
pub mod syntax;

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{CatalogError, CompilerError};
use objects::{GameObject, GameObjectLibrary, ScriptObject, ScriptObjectLibrary};
use syntax::{SyntaxDefinition, SyntaxLibrary};

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    syntax: Vec<SyntaxDefinition>,
    #[serde(default)]
    game_objects: Vec<GameObject>,
    #[serde(default)]
    script_objects: Vec<ScriptObject>,
}

/// Read-only lookup data shared by every compilation.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub syntaxes: SyntaxLibrary,
    pub game_objects: GameObjectLibrary,
    pub script_objects: ScriptObjectLibrary,
}

impl Catalog {
    /// A catalog holding only the built-in commands.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(text)?;
        let mut catalog = Catalog::new();
        for definition in file.syntax {
            catalog.syntaxes.register(definition)?;
        }
        for object in file.game_objects {
            catalog.game_objects.add(object);
        }
        for object in file.script_objects {
            catalog.script_objects.add(object);
        }
        log::debug!(
            "catalog loaded: {} syntaxes, {} game objects, {} script objects",
            catalog.syntaxes.len(),
            catalog.game_objects.len(),
            catalog.script_objects.len()
        );
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, CompilerError> {
        if !path.exists() {
            return Err(CompilerError::FileNotFound(path.display().to_string()));
        }
        let text = fs::read_to_string(path)?;
        Ok(Catalog::from_json(&text)?)
    }
}

#[cfg(test)]
pub(crate) const TEST_CATALOG: &str = r#"{
    "syntax": [
        { "id": 200, "text": "$1 get fuel", "params": [{ "role": "ReturnValueIf" }, { "role": "ReferenceObject" }] },
        { "id": 201, "text": "$1 is docked", "params": [{ "role": "ReturnValueIf" }, { "role": "ReferenceObject" }] },
        { "id": 202, "text": "$1 fly to station $2", "execution": "Concurrent",
          "params": [{ "role": "ReturnValueIfStart" }, { "role": "ReferenceObject" }, { "role": "Value" }] },
        { "id": 203, "text": "write to player logbook $0", "params": [{ "role": "Value" }] },
        { "id": 204, "text": "$1 add $3 units of $2",
          "params": [{ "role": "ReturnValueIf" }, { "role": "ReferenceObject" }, { "role": "Value" }, { "role": "Value" }] },
        { "id": 206, "text": "display options", "varg": { "max": 4, "padding": "PadNull" },
          "params": [{ "role": "ReturnValue" }] },
        { "id": 208, "text": "$1 get jump range", "versions": 12,
          "params": [{ "role": "ReturnValueIf" }, { "role": "ReferenceObject" }] }
    ],
    "game_objects": [
        { "name": "Energy Cells", "main_type": 9, "subtype": 0 },
        { "name": "Argon Discoverer", "main_type": 5, "subtype": 12 }
    ],
    "script_objects": [
        { "name": "THIS", "group": "Constant", "id": 1 },
        { "name": "TRUE", "group": "Constant", "id": 2 },
        { "name": "Argon", "group": "Race", "id": 1 },
        { "name": "Ship", "group": "ObjectClass", "id": 2020 },
        { "name": "Friend", "group": "Relation", "id": 1 }
    ]
}"#;

#[cfg(test)]
pub(crate) fn test_catalog() -> Catalog {
    Catalog::from_json(TEST_CATALOG).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_catalog_json() {
        let catalog = test_catalog();
        assert!(catalog.syntaxes.get(202).unwrap().is_concurrent());
        assert_eq!(catalog.game_objects.resolve("Energy Cells"), Some(9 << 16));
        assert!(catalog.script_objects.contains("this"));
    }

    #[test]
    fn rejects_duplicate_catalog_entries() {
        let json = r#"{ "syntax": [
            { "id": 300, "text": "launch $0", "params": [{ "role": "Value" }] },
            { "id": 300, "text": "land $0", "params": [{ "role": "Value" }] }
        ] }"#;
        assert!(matches!(Catalog::from_json(json), Err(CatalogError::DuplicateSyntaxId(300))));
    }

    #[test]
    fn missing_file_is_reported() {
        let result = Catalog::load(Path::new("/nonexistent/catalog.json"));
        assert!(matches!(result, Err(CompilerError::FileNotFound(_))));
    }
}
