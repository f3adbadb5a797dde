use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ReconError;
use crate::tree::ExpandedName;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Tabular source holding the code -> ingredients columns.
    pub excel_path: PathBuf,
    /// `[code_column, ingredients_column]`.
    pub excel_fields: Vec<String>,
    /// Prefix -> namespace URI used to qualify element lookups.
    pub namespace: BTreeMap<String, String>,
    /// Unqualified name of the ingredients field on each product.
    pub ingredient_tag_name: String,

    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    /// Which `namespace` entry qualifies the product elements.
    #[serde(default)]
    pub namespace_prefix: Option<String>,
    #[serde(default = "default_container_tag")]
    pub container_tag: String,
    #[serde(default = "default_code_tag")]
    pub code_tag: String,
    #[serde(default)]
    pub xml_input: Option<PathBuf>,
    #[serde(default = "default_xml_output")]
    pub xml_output: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default)]
    pub duplicate_codes: DuplicatePolicy,
}

fn default_sheet_name() -> String {
    "Data - CFT".into()
}

fn default_container_tag() -> String {
    "products".into()
}

fn default_code_tag() -> String {
    "ProfileNumber".into()
}

fn default_xml_output() -> PathBuf {
    PathBuf::from("xml/output.xml")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("messages")
}

/// What to do when one code maps to more than one ingredients value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// First row in sheet order wins.
    #[default]
    First,
    /// First row wins; each ambiguous code is reported.
    Warn,
    /// Refuse to build the table.
    Reject,
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Warn => write!(f, "warn"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Config file syntax, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl SyncConfig {
    pub fn parse(input: &str, format: ConfigFormat) -> Result<Self, ReconError> {
        match format {
            ConfigFormat::Json => Self::from_json(input),
            ConfigFormat::Toml => Self::from_toml(input),
        }
    }

    pub fn from_json(input: &str) -> Result<Self, ReconError> {
        let config: SyncConfig =
            serde_json::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: SyncConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.excel_fields.len() != 2 {
            return Err(ReconError::ConfigValidation(format!(
                "excel_fields must name exactly 2 columns (code, ingredients), got {}",
                self.excel_fields.len()
            )));
        }
        if self.excel_fields.iter().any(|f| f.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(
                "excel_fields entries must not be empty".into(),
            ));
        }

        for (key, value) in [
            ("ingredient_tag_name", &self.ingredient_tag_name),
            ("container_tag", &self.container_tag),
            ("code_tag", &self.code_tag),
        ] {
            if value.is_empty() || value.contains(':') || value.contains(char::is_whitespace) {
                return Err(ReconError::ConfigValidation(format!(
                    "{key} must be a bare element name, got '{value}'"
                )));
            }
        }

        let prefix = self.prefix();
        match self.namespace.get(prefix) {
            Some(uri) if !uri.is_empty() => Ok(()),
            Some(_) => Err(ReconError::ConfigValidation(format!(
                "namespace '{prefix}' has an empty URI"
            ))),
            None => Err(ReconError::ConfigValidation(format!(
                "namespace prefix '{prefix}' is not declared in `namespace`"
            ))),
        }
    }

    /// Prefix qualifying element lookups: explicit `namespace_prefix`, else
    /// the single declared prefix, else `urn`.
    pub fn prefix(&self) -> &str {
        if let Some(p) = &self.namespace_prefix {
            return p;
        }
        match self.namespace.keys().next() {
            Some(only) if self.namespace.len() == 1 => only.as_str(),
            _ => "urn",
        }
    }

    pub fn namespace_uri(&self) -> Option<&str> {
        self.namespace.get(self.prefix()).map(String::as_str)
    }

    fn qualified(&self, local: &str) -> ExpandedName {
        ExpandedName::new(self.namespace_uri(), local)
    }

    pub fn container_name(&self) -> ExpandedName {
        self.qualified(&self.container_tag)
    }

    pub fn code_name(&self) -> ExpandedName {
        self.qualified(&self.code_tag)
    }

    pub fn ingredient_name(&self) -> ExpandedName {
        self.qualified(&self.ingredient_tag_name)
    }

    pub fn code_column(&self) -> &str {
        &self.excel_fields[0]
    }

    pub fn ingredients_column(&self) -> &str {
        &self.excel_fields[1]
    }

    /// Resolve relative paths against `base_dir` (the config file's directory).
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base_dir.join(&*p);
            }
        };
        join(&mut self.excel_path);
        join(&mut self.xml_output);
        join(&mut self.log_dir);
        if let Some(input) = self.xml_input.as_mut() {
            join(input);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_JSON: &str = r#"{
        "excel_path": "data/ingredients.xlsx",
        "excel_fields": ["Concept Code", "Ingredients"],
        "namespace": {"urn": "urn:schemas-product-text"},
        "ingredient_tag_name": "Ingredients"
    }"#;

    #[test]
    fn parse_minimal_json_applies_defaults() {
        let config = SyncConfig::from_json(VALID_JSON).unwrap();
        assert_eq!(config.code_column(), "Concept Code");
        assert_eq!(config.ingredients_column(), "Ingredients");
        assert_eq!(config.sheet_name, "Data - CFT");
        assert_eq!(config.prefix(), "urn");
        assert_eq!(config.xml_output, PathBuf::from("xml/output.xml"));
        assert_eq!(config.log_dir, PathBuf::from("messages"));
        assert_eq!(config.duplicate_codes, DuplicatePolicy::First);
        assert!(config.xml_input.is_none());

        let name = config.code_name();
        assert_eq!(name.namespace.as_deref(), Some("urn:schemas-product-text"));
        assert_eq!(name.local, "ProfileNumber");
        assert_eq!(config.container_name().local, "products");
    }

    #[test]
    fn parse_toml_with_overrides() {
        let input = r#"
excel_path = "table.csv"
excel_fields = ["code", "ing"]
ingredient_tag_name = "Ingredients"
namespace_prefix = "p"
sheet_name = "Sheet1"
xml_input = "in.xml"
duplicate_codes = "reject"

[namespace]
p = "urn:p"
q = "urn:q"
"#;
        let config = SyncConfig::from_toml(input).unwrap();
        assert_eq!(config.prefix(), "p");
        assert_eq!(config.namespace_uri(), Some("urn:p"));
        assert_eq!(config.sheet_name, "Sheet1");
        assert_eq!(config.duplicate_codes, DuplicatePolicy::Reject);
        assert_eq!(config.xml_input, Some(PathBuf::from("in.xml")));
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a/config.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("config.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("config")), ConfigFormat::Json);
    }

    #[test]
    fn reject_wrong_field_count() {
        let input = VALID_JSON.replace(r#"["Concept Code", "Ingredients"]"#, r#"["Concept Code"]"#);
        let err = SyncConfig::from_json(&input).unwrap_err();
        assert!(err.to_string().contains("exactly 2 columns"));
    }

    #[test]
    fn reject_undeclared_prefix() {
        let input = VALID_JSON.replace(
            r#""ingredient_tag_name""#,
            r#""namespace_prefix": "x", "ingredient_tag_name""#,
        );
        let err = SyncConfig::from_json(&input).unwrap_err();
        assert!(err.to_string().contains("'x' is not declared"));
    }

    #[test]
    fn reject_qualified_tag_name() {
        let input = VALID_JSON.replace(
            r#""ingredient_tag_name": "Ingredients""#,
            r#""ingredient_tag_name": "urn:Ingredients""#,
        );
        let err = SyncConfig::from_json(&input).unwrap_err();
        assert!(err.to_string().contains("bare element name"));
    }

    #[test]
    fn reject_unknown_duplicate_policy() {
        let input = VALID_JSON.replace(
            r#""ingredient_tag_name""#,
            r#""duplicate_codes": "last", "ingredient_tag_name""#,
        );
        assert!(matches!(
            SyncConfig::from_json(&input),
            Err(ReconError::ConfigParse(_))
        ));
    }

    #[test]
    fn resolve_paths_joins_relative_only() {
        let mut config = SyncConfig::from_json(VALID_JSON).unwrap();
        config.xml_input = Some(PathBuf::from("/abs/in.xml"));
        config.resolve_paths(Path::new("/work"));
        assert_eq!(config.excel_path, PathBuf::from("/work/data/ingredients.xlsx"));
        assert_eq!(config.xml_output, PathBuf::from("/work/xml/output.xml"));
        assert_eq!(config.log_dir, PathBuf::from("/work/messages"));
        assert_eq!(config.xml_input, Some(PathBuf::from("/abs/in.xml")));
    }
}
