use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::csvfile::{self, Table};
use crate::parser::content::PriceQuote;
use crate::parser::fields::ProductFields;

/// Column layout of a fresh catalog, as the shop importer expects it.
pub const COLUMNS: &[&str] = &[
    "ID",
    "Type",
    "UGS",
    "Nom",
    "Publié",
    "Visibilité dans le catalogue",
    "Description",
    "En stock ?",
    "Stock",
    "Poids (kg)",
    "Longueur (cm)",
    "Largeur (cm)",
    "Tarif promo",
    "Tarif régulier",
    "Catégories",
    "Images",
    "Produits suggérés",
    "Ventes croisées",
    "Marques",
    "Méta : dimensions",
    "Méta : poids_machine",
    "Méta : charges",
    "Méta : poids_max_de_l039utilisateur",
    "Méta : gamme_produit",
    "Méta : reference",
];

const ID_COLUMN: &str = "ID";

/// One catalog row, keyed by column name.
pub struct CatalogRecord {
    values: Vec<(&'static str, String)>,
}

impl CatalogRecord {
    pub fn new(id: u64, fields: &ProductFields, prices: &PriceQuote) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        let reference = text(&fields.reference);

        let values = COLUMNS
            .iter()
            .map(|&col| {
                let value = match col {
                    "ID" => id.to_string(),
                    "Type" => "Simple".to_string(),
                    "UGS" | "Méta : reference" => reference.clone(),
                    "Nom" => text(&fields.name),
                    "Publié" | "En stock ?" | "Stock" => "1".to_string(),
                    "Visibilité dans le catalogue" => "Visible".to_string(),
                    "Description" => fields.full_description.clone(),
                    "Tarif promo" => prices.promo.clone(),
                    "Tarif régulier" => prices.regular.clone(),
                    "Catégories" => text(&fields.kind),
                    "Marques" => text(&fields.brand),
                    "Méta : dimensions" => text(&fields.dimensions),
                    "Méta : poids_machine" => text(&fields.weight),
                    "Méta : gamme_produit" => text(&fields.range),
                    _ => String::new(),
                };
                (col, value)
            })
            .collect();

        Self { values }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v.as_str())
    }
}

pub struct CatalogSummary {
    pub rows: usize,
    pub next_id: u64,
}

fn parse_id(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    raw.parse::<u64>().ok().or_else(|| {
        // spreadsheet exports may write integer IDs as floats ("12.0")
        let f = raw.parse::<f64>().ok()?;
        let whole = f.is_finite() && f >= 0.0 && f.fract() == 0.0;
        (whole && f < u64::MAX as f64).then_some(f as u64)
    })
}

fn next_id_in(table: &Table, path: &Path) -> Result<u64> {
    if table.rows.is_empty() {
        return Ok(1);
    }
    let Some(col) = table.column(ID_COLUMN) else {
        bail!("{} has no {} column", path.display(), ID_COLUMN);
    };

    let mut max = 0u64;
    for (i, row) in table.rows.iter().enumerate() {
        let raw = row[col].as_str();
        if raw.trim().is_empty() {
            continue;
        }
        let id = parse_id(raw).with_context(|| {
            format!("Invalid ID {:?} on row {} of {}", raw, i + 2, path.display())
        })?;
        max = max.max(id);
    }
    max.checked_add(1)
        .with_context(|| format!("No ID left after {} in {}", max, path.display()))
}

/// Next free ID: one past the highest existing ID, or 1 for a missing or
/// empty catalog. A catalog that exists but cannot be parsed is an error.
pub fn next_id(path: &Path) -> Result<u64> {
    if !path.exists() {
        return Ok(1);
    }
    let table = csvfile::read_table(path)?;
    next_id_in(&table, path)
}

/// Append one product to an existing catalog and return its ID.
///
/// The row is matched to the file's header by column name; columns the file
/// does not have yet are added at the end.
pub fn append(path: &Path, fields: &ProductFields, prices: &PriceQuote) -> Result<u64> {
    if !path.exists() {
        bail!("Catalog {} not found", path.display());
    }

    let mut table = csvfile::read_table(path)?;
    let id = next_id_in(&table, path)?;
    let record = CatalogRecord::new(id, fields, prices);

    if table.headers.is_empty() {
        table.headers = COLUMNS.iter().map(|c| c.to_string()).collect();
    }
    for col in COLUMNS {
        if table.column(col).is_none() {
            table.add_column(col);
        }
    }

    let row = table
        .headers
        .iter()
        .map(|h| record.get(h).unwrap_or_default().to_string())
        .collect();
    table.rows.push(row);

    csvfile::write_table(path, &table)?;
    Ok(id)
}

pub fn summary(path: &Path) -> Result<CatalogSummary> {
    if !path.exists() {
        return Ok(CatalogSummary { rows: 0, next_id: 1 });
    }
    let table = csvfile::read_table(path)?;
    Ok(CatalogSummary {
        rows: table.rows.len(),
        next_id: next_id_in(&table, path)?,
    })
}
