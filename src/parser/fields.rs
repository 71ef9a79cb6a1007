use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:référence|reference)\s*:?\s*(.+)").unwrap());
static NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)nom\s*:?\s*(.+)").unwrap());
static BRAND_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)marque\s*:?\s*(.+)").unwrap());
static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)gamme\s*:?\s*(.+)").unwrap());
static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)type\s*:?\s*(.+)").unwrap());
static WEIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)poids\s*:?\s*(\d+)\s*kg").unwrap());
static DIMENSIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)dimension\w*\s*:?\s*(.+)").unwrap());

/// Line break marker used in the catalog's description column.
pub const LINE_BREAK: &str = "<br>";

/// Labelled values pulled out of a listing description.
///
/// `None` means no line matched the label. `full_description` is always set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductFields {
    pub reference: Option<String>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub range: Option<String>,
    pub kind: Option<String>,
    pub weight: Option<String>,
    pub dimensions: Option<String>,
    pub full_description: String,
}

#[derive(Clone, Copy)]
enum Field {
    Reference,
    Name,
    Brand,
    Range,
    Kind,
    Weight,
    Dimensions,
}

/// Which field a line is about. A line claims at most one field.
fn classify(line: &str) -> Option<Field> {
    let lower = line.to_lowercase();
    if lower.starts_with("référence") || lower.starts_with("reference") {
        Some(Field::Reference)
    } else if lower.starts_with("nom") {
        Some(Field::Name)
    } else if lower.starts_with("marque") {
        Some(Field::Brand)
    } else if lower.starts_with("gamme") {
        Some(Field::Range)
    } else if lower.starts_with("type") {
        Some(Field::Kind)
    } else if lower.contains("poids") {
        Some(Field::Weight)
    } else if lower.contains("dimension") {
        Some(Field::Dimensions)
    } else {
        None
    }
}

fn capture(re: &Regex, line: &str) -> Option<String> {
    re.captures(line).map(|caps| caps[1].trim().to_string())
}

/// Parse "Label : value" lines of a description. Later lines win.
pub fn parse_fields(description: &str) -> ProductFields {
    let mut fields = ProductFields {
        full_description: description.replace('\n', LINE_BREAK),
        ..Default::default()
    };

    for line in description.lines().map(str::trim) {
        let Some(field) = classify(line) else {
            continue;
        };

        let (slot, value) = match field {
            Field::Reference => (&mut fields.reference, capture(&REFERENCE_RE, line)),
            Field::Name => (&mut fields.name, capture(&NAME_RE, line)),
            Field::Brand => (&mut fields.brand, capture(&BRAND_RE, line)),
            Field::Range => (&mut fields.range, capture(&RANGE_RE, line)),
            Field::Kind => (&mut fields.kind, capture(&TYPE_RE, line)),
            Field::Weight => (
                &mut fields.weight,
                WEIGHT_RE.captures(line).map(|caps| format!("{}Kg", &caps[1])),
            ),
            Field::Dimensions => (&mut fields.dimensions, capture(&DIMENSIONS_RE, line)),
        };

        if value.is_some() {
            *slot = value;
        }
    }

    fields
}
