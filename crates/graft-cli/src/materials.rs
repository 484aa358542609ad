//! Material lookup table
//!
//! `;`-delimited text with a header row and the columns
//! `materialID;materialName;materialCategory;materialCategoryID`.

use std::path::Path;

/// Error loading or querying the material table
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("material table has no header row")]
    MissingHeader,

    #[error("line {line}: expected 4 columns, found {found}")]
    Columns { line: usize, found: usize },

    #[error("unknown material category {0:?}")]
    UnknownCategory(String),

    #[error("no material {material:?} in category {category:?}")]
    UnknownMaterial { material: String, category: String },
}

/// One row of the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Material {
    pub id: String,
    pub name: String,
    pub category: String,
    pub category_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct MaterialTable {
    rows: Vec<Material>,
}

impl MaterialTable {
    /// Parse table text
    pub fn parse(text: &str) -> Result<Self, TableError> {
        let mut lines = text.lines().enumerate();
        lines.next().ok_or(TableError::MissingHeader)?;

        let mut rows = Vec::new();
        for (index, line) in lines {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(';').map(str::trim).collect();
            let &[id, name, category, category_id] = fields.as_slice() else {
                return Err(TableError::Columns {
                    line: index + 1,
                    found: fields.len(),
                });
            };
            rows.push(Material {
                id: id.to_string(),
                name: name.to_string(),
                category: category.to_string(),
                category_id: category_id.to_string(),
            });
        }

        tracing::debug!("Material table has {} rows", rows.len());
        Ok(Self { rows })
    }

    /// Read and parse a table file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| TableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Material] {
        &self.rows
    }

    /// Category code, taken from the first row of the category
    pub fn category_id(&self, category: &str) -> Result<&str, TableError> {
        self.rows
            .iter()
            .find(|row| row.category == category)
            .map(|row| row.category_id.as_str())
            .ok_or_else(|| TableError::UnknownCategory(category.to_string()))
    }

    /// `(material_id, category_id)` for a material within a category
    pub fn codes(&self, material: &str, category: &str) -> Result<(&str, &str), TableError> {
        let category_id = self.category_id(category)?;
        let row = self
            .rows
            .iter()
            .find(|row| row.category == category && row.name == material)
            .ok_or_else(|| TableError::UnknownMaterial {
                material: material.to_string(),
                category: category.to_string(),
            })?;
        Ok((row.id.as_str(), category_id))
    }

    /// Names of every material in a category, in table order
    pub fn materials_in_category(&self, category: &str) -> Vec<&str> {
        self.rows
            .iter()
            .filter(|row| row.category == category)
            .map(|row| row.name.as_str())
            .collect()
    }
}
