//! Static template catalog. Read-only configuration; the browser renders
//! the templates, the backend only needs ids, flags and prices.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStyle {
    Classic,
    Modern,
    Creative,
    Minimal,
    Executive,
    Technical,
}

/// Hex colors used by a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorPalette {
    pub primary: &'static str,
    pub secondary: &'static str,
    pub accent: &'static str,
    pub text: &'static str,
    pub background: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub style: TemplateStyle,
    pub palette: ColorPalette,
    pub premium: bool,
    /// Price in cents. Zero for free templates.
    pub price_cents: u32,
}

impl Template {
    pub fn is_free(&self) -> bool {
        !self.premium
    }
}

const CATALOG: &[Template] = &[
    Template {
        id: "classic",
        name: "Classic",
        style: TemplateStyle::Classic,
        palette: ColorPalette {
            primary: "#1f2937",
            secondary: "#4b5563",
            accent: "#2563eb",
            text: "#111827",
            background: "#ffffff",
        },
        premium: false,
        price_cents: 0,
    },
    Template {
        id: "modern",
        name: "Modern",
        style: TemplateStyle::Modern,
        palette: ColorPalette {
            primary: "#0f766e",
            secondary: "#14b8a6",
            accent: "#f59e0b",
            text: "#1e293b",
            background: "#ffffff",
        },
        premium: false,
        price_cents: 0,
    },
    Template {
        id: "minimal",
        name: "Minimal",
        style: TemplateStyle::Minimal,
        palette: ColorPalette {
            primary: "#000000",
            secondary: "#6b7280",
            accent: "#000000",
            text: "#111111",
            background: "#ffffff",
        },
        premium: false,
        price_cents: 0,
    },
    Template {
        id: "creative",
        name: "Creative",
        style: TemplateStyle::Creative,
        palette: ColorPalette {
            primary: "#7c3aed",
            secondary: "#c084fc",
            accent: "#f472b6",
            text: "#1f1b2e",
            background: "#faf5ff",
        },
        premium: true,
        price_cents: 990,
    },
    Template {
        id: "executive",
        name: "Executive",
        style: TemplateStyle::Executive,
        palette: ColorPalette {
            primary: "#1e3a8a",
            secondary: "#b45309",
            accent: "#d4af37",
            text: "#0f172a",
            background: "#fdfcf9",
        },
        premium: true,
        price_cents: 1490,
    },
    Template {
        id: "technical",
        name: "Technical",
        style: TemplateStyle::Technical,
        palette: ColorPalette {
            primary: "#0f172a",
            secondary: "#334155",
            accent: "#22c55e",
            text: "#0f172a",
            background: "#f8fafc",
        },
        premium: true,
        price_cents: 990,
    },
];

pub fn all() -> &'static [Template] {
    CATALOG
}

pub fn find(id: &str) -> Option<&'static Template> {
    CATALOG.iter().find(|t| t.id == id)
}

pub fn by_premium(premium: bool) -> impl Iterator<Item = &'static Template> {
    CATALOG.iter().filter(move |t| t.premium == premium)
}
