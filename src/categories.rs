//! Category descriptors, the four fixed legacy categories, and the keyer that
//! folds dynamic categories into the same flat table as the fixed ones.
//!
//! Dynamic keys have the shape `<type tag>_<name slug>`. Fixed category names
//! never contain an underscore, so a generated key can never shadow one.
//!
//! The name slug is capped at [`NAME_SLUG_LEN`] characters, so two categories
//! of the same type whose names agree on their first sanitized characters map
//! to the same key. Reverse lookups return the first descriptor that matches.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use unicode_normalization::UnicodeNormalization;

/// Maximum length of the name component of a category key.
pub const NAME_SLUG_LEN: usize = 20;

/// Path used when a key matches no known descriptor.
pub const CATEGORY_LIST_PATH: &str = "/costos/categorias";

/// Financial classification of an account category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CategoryType {
    ManoObra,
    Maquinaria,
    Materiales,
    Combustibles,
    GastosGenerales,
    /// A classification added server-side after this build.
    Other(String),
}

impl CategoryType {
    pub fn as_str(&self) -> &str {
        match self {
            CategoryType::ManoObra => "mano_obra",
            CategoryType::Maquinaria => "maquinaria",
            CategoryType::Materiales => "materiales",
            CategoryType::Combustibles => "combustibles",
            CategoryType::GastosGenerales => "gastos_generales",
            CategoryType::Other(raw) => raw,
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "mano_obra" => CategoryType::ManoObra,
            "maquinaria" => CategoryType::Maquinaria,
            "materiales" => CategoryType::Materiales,
            "combustibles" => CategoryType::Combustibles,
            "gastos_generales" => CategoryType::GastosGenerales,
            other => CategoryType::Other(other.to_string()),
        }
    }

    /// Navigation path for categories of this type.
    pub fn path(&self) -> &'static str {
        match self {
            CategoryType::ManoObra => "/costos/mano-obra",
            CategoryType::Maquinaria => "/costos/maquinaria",
            CategoryType::Materiales => "/costos/materiales",
            CategoryType::Combustibles => "/costos/combustibles",
            CategoryType::GastosGenerales => "/costos/gastos-generales",
            CategoryType::Other(_) => "/costos/otros",
        }
    }

    /// Key prefix: the type name lowercased with everything but ASCII
    /// alphanumerics removed (`gastos_generales` -> `gastosgenerales`).
    fn tag(&self) -> String {
        self.as_str()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect()
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CategoryType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CategoryType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(CategoryType::parse(&raw))
    }
}

/// An account category as published by the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDescriptor {
    pub id: u64,
    #[serde(default)]
    pub code: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
}

impl CategoryDescriptor {
    pub fn new(
        id: u64,
        code: impl Into<String>,
        name: impl Into<String>,
        category_type: CategoryType,
    ) -> Self {
        Self {
            id,
            code: code.into(),
            name: name.into(),
            category_type,
            group_name: None,
        }
    }

    pub fn with_group(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = Some(group_name.into());
        self
    }
}

/// The legacy categories present in every aggregation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixedCategory {
    Remuneraciones,
    Factoring,
    Previsionales,
    CostosFijos,
}

impl FixedCategory {
    /// Declaration order; result tables list fixed categories in this order.
    pub const ALL: [FixedCategory; 4] = [
        FixedCategory::Remuneraciones,
        FixedCategory::Factoring,
        FixedCategory::Previsionales,
        FixedCategory::CostosFijos,
    ];

    /// Reserved table key.
    pub fn key(&self) -> &'static str {
        match self {
            FixedCategory::Remuneraciones => "remuneraciones",
            FixedCategory::Factoring => "factoring",
            FixedCategory::Previsionales => "previsionales",
            FixedCategory::CostosFijos => "costosFijos",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FixedCategory::Remuneraciones => "Remuneraciones",
            FixedCategory::Factoring => "Factoring",
            FixedCategory::Previsionales => "Previsionales",
            FixedCategory::CostosFijos => "Costos Fijos",
        }
    }

    /// URL segment of the by-period endpoint for this category.
    pub fn slug(&self) -> &'static str {
        match self {
            FixedCategory::Remuneraciones => "remuneraciones",
            FixedCategory::Factoring => "factoring",
            FixedCategory::Previsionales => "previsionales",
            FixedCategory::CostosFijos => "costos-fijos",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }

    pub fn is_reserved(key: &str) -> bool {
        Self::from_key(key).is_some()
    }
}

/// Derive the table key for a dynamic category.
pub fn category_key(descriptor: &CategoryDescriptor) -> String {
    format!(
        "{}_{}",
        descriptor.category_type.tag(),
        name_slug(&descriptor.name)
    )
}

/// Lowercase ASCII slug of a name: accents folded to their base letter,
/// everything else non-alphanumeric dropped, capped at [`NAME_SLUG_LEN`].
fn name_slug(name: &str) -> String {
    name.nfd()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .take(NAME_SLUG_LEN)
        .collect()
}

fn find_descriptor<'a>(
    key: &str,
    known: &'a [CategoryDescriptor],
) -> Option<&'a CategoryDescriptor> {
    known.iter().find(|descriptor| category_key(descriptor) == key)
}

fn camel_boundary() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([a-z])([A-Z])").ok()).as_ref()
}

/// Human-readable name for a category key.
///
/// Exact match against `known` when possible. Otherwise the name is rebuilt
/// from the key itself, which is lossy: accents, spaces and anything past the
/// slug cap are gone.
pub fn display_name(key: &str, known: &[CategoryDescriptor]) -> String {
    if let Some(descriptor) = find_descriptor(key, known) {
        return descriptor.name.clone();
    }

    let parts: Vec<&str> = key.split('_').collect();
    if parts.len() >= 2 {
        let joined = parts[1..].join(" ");
        return match camel_boundary() {
            Some(re) => re.replace_all(&joined, "$1 $2").into_owned(),
            None => joined,
        };
    }

    key.to_string()
}

/// Navigation path for a category key.
pub fn navigation_path(key: &str, known: &[CategoryDescriptor]) -> &'static str {
    match find_descriptor(key, known) {
        Some(descriptor) => descriptor.category_type.path(),
        None => CATEGORY_LIST_PATH,
    }
}

/// Group a catalog by category type, preserving catalog order within a group.
pub fn categories_by_type(
    descriptors: &[CategoryDescriptor],
) -> BTreeMap<CategoryType, Vec<CategoryDescriptor>> {
    let mut grouped: BTreeMap<CategoryType, Vec<CategoryDescriptor>> = BTreeMap::new();
    for descriptor in descriptors {
        grouped
            .entry(descriptor.category_type.clone())
            .or_default()
            .push(descriptor.clone());
    }
    grouped
}
