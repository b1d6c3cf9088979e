//! Tool catalog and ChatGPT prompt worksheets.

use crate::error::{AppError, AppResult};
use crate::records::{append_record, get_all_records, Record};
use crate::sheet::Worksheet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Header row for a freshly created catalog worksheet.
pub const CATALOG_HEADERS: [&str; 7] = [
    "category",
    "name",
    "description",
    "logo_url",
    "store_link",
    "button_name",
    "used",
];

/// Header row for a freshly created prompts worksheet.
pub const PROMPT_HEADERS: [&str; 2] = ["description", "prompt"];

/// Category offered by the add form when the catalog has none yet.
pub const DEFAULT_CATEGORY: &str = "Default";

/// Output key to worksheet column pairs used when projecting records.
pub type FieldMapping = Vec<(String, String)>;

/// Mapping used for category pages.
pub fn default_tool_mapping() -> FieldMapping {
    ["name", "description", "logo_url", "store_link", "button_name"]
        .iter()
        .map(|k| (k.to_string(), k.to_string()))
        .collect()
}

/// Rows whose `category_field` equals `target`, projected through `mapping`.
pub fn filter_by_category(
    records: &[Record],
    category_field: &str,
    target: &str,
    mapping: &FieldMapping,
) -> Vec<Record> {
    records
        .iter()
        .filter(|r| r.get(category_field).map(String::as_str) == Some(target))
        .map(|r| {
            mapping
                .iter()
                .map(|(out, col)| (out.clone(), r.get(col).cloned().unwrap_or_default()))
                .collect()
        })
        .collect()
}

/// Sorted distinct categories, ignoring blanks.
pub fn distinct_categories(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.get("category"))
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Usage {
    Yes,
    #[default]
    No,
}

impl Usage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Usage::Yes => "Yes",
            Usage::No => "No",
        }
    }

    pub fn from_cell(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("yes") {
            Usage::Yes
        } else {
            Usage::No
        }
    }
}

/// A catalog entry rendered as a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tool {
    pub category: String,
    pub name: String,
    pub description: String,
    pub logo_url: String,
    pub store_link: String,
    pub button_name: String,
    pub used: Usage,
}

impl Tool {
    pub fn from_record(record: &Record) -> Self {
        let field = |key: &str| record.get(key).cloned().unwrap_or_default();
        Self {
            category: field("category"),
            name: field("name"),
            description: field("description"),
            logo_url: field("logo_url"),
            store_link: field("store_link"),
            button_name: field("button_name"),
            used: Usage::from_cell(&field("used")),
        }
    }
}

/// Case-insensitive substring match on the tool name.
pub fn search_by_name<'a>(tools: &'a [Tool], query: &str) -> Vec<&'a Tool> {
    let query = query.trim().to_lowercase();
    tools
        .iter()
        .filter(|t| query.is_empty() || t.name.to_lowercase().contains(&query))
        .collect()
}

/// Input for a new catalog entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTool {
    pub category: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub logo_url: String,
    #[serde(default)]
    pub store_link: String,
    #[serde(default)]
    pub button_name: String,
    #[serde(default)]
    pub used: Usage,
}

impl NewTool {
    fn validate(&self) -> AppResult<()> {
        if self.category.trim().is_empty() {
            return Err(AppError::missing_field("category"));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::missing_field("name"));
        }
        Ok(())
    }

    fn into_record(self) -> Record {
        [
            ("category", self.category.trim().to_string()),
            ("name", self.name.trim().to_string()),
            ("description", self.description),
            ("logo_url", self.logo_url),
            ("store_link", self.store_link),
            ("button_name", self.button_name),
            ("used", self.used.as_str().to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}

/// Catalog of categorized tools.
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    sheet: Worksheet,
}

impl ToolCatalog {
    pub fn new(sheet: Worksheet) -> Self {
        Self { sheet }
    }

    pub async fn ensure(&self) -> AppResult<()> {
        self.sheet.ensure(&CATALOG_HEADERS).await?;
        Ok(())
    }

    pub async fn records(&self) -> AppResult<Vec<Record>> {
        get_all_records(&self.sheet).await
    }

    pub async fn tools(&self) -> AppResult<Vec<Tool>> {
        Ok(self.records().await?.iter().map(Tool::from_record).collect())
    }

    /// Tools whose category matches exactly.
    pub async fn tools_in_category(&self, category: &str) -> AppResult<Vec<Tool>> {
        let records = self.records().await?;
        let mut mapping = default_tool_mapping();
        mapping.push(("category".to_string(), "category".to_string()));
        mapping.push(("used".to_string(), "used".to_string()));
        Ok(filter_by_category(&records, "category", category, &mapping)
            .iter()
            .map(Tool::from_record)
            .collect())
    }

    pub async fn categories(&self) -> AppResult<Vec<String>> {
        Ok(distinct_categories(&self.records().await?))
    }

    /// Categories for the add form; never empty.
    pub async fn categories_or_default(&self) -> AppResult<Vec<String>> {
        let categories = self.categories().await?;
        if categories.is_empty() {
            Ok(vec![DEFAULT_CATEGORY.to_string()])
        } else {
            Ok(categories)
        }
    }

    pub async fn add_tool(&self, tool: NewTool) -> AppResult<()> {
        tool.validate()?;
        let name = tool.name.trim().to_string();
        append_record(&self.sheet, &tool.into_record()).await?;
        info!(name = %name, "Added catalog item");
        Ok(())
    }
}

/// A saved ChatGPT prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub description: String,
    pub prompt: String,
}

/// Worksheet of ChatGPT prompts.
#[derive(Debug, Clone)]
pub struct PromptBook {
    sheet: Worksheet,
}

impl PromptBook {
    pub fn new(sheet: Worksheet) -> Self {
        Self { sheet }
    }

    pub async fn ensure(&self) -> AppResult<()> {
        self.sheet.ensure(&PROMPT_HEADERS).await?;
        Ok(())
    }

    pub async fn prompts(&self) -> AppResult<Vec<Prompt>> {
        Ok(get_all_records(&self.sheet)
            .await?
            .iter()
            .map(|r| Prompt {
                description: r.get("description").cloned().unwrap_or_default(),
                prompt: r.get("prompt").cloned().unwrap_or_default(),
            })
            .collect())
    }

    pub async fn add_prompt(&self, description: &str, prompt: &str) -> AppResult<()> {
        if description.trim().is_empty() {
            return Err(AppError::missing_field("description"));
        }
        if prompt.trim().is_empty() {
            return Err(AppError::missing_field("prompt"));
        }
        let record: Record = [("description", description), ("prompt", prompt)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        append_record(&self.sheet, &record).await?;
        info!("Added prompt");
        Ok(())
    }
}

/// Headline numbers for the home page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total_tools: usize,
    pub categories: usize,
    pub used: usize,
    pub unused: usize,
    pub prompts: usize,
}

impl DashboardSummary {
    pub fn from_records(records: &[Record], prompts: usize) -> Self {
        let total_tools = records.len();
        let used = records
            .iter()
            .filter(|r| r.get("used").is_some_and(|u| Usage::from_cell(u) == Usage::Yes))
            .count();
        Self {
            total_tools,
            categories: distinct_categories(records).len(),
            used,
            unused: total_tools.saturating_sub(used),
            prompts,
        }
    }

    /// A failing prompts worksheet counts as zero prompts.
    pub async fn collect(catalog: &ToolCatalog, prompts: &PromptBook) -> AppResult<Self> {
        let records = catalog.records().await?;
        let prompt_count = match prompts.prompts().await {
            Ok(p) => p.len(),
            Err(e) => {
                warn!(error = %e, "Failed to count prompts");
                0
            }
        };
        Ok(Self::from_records(&records, prompt_count))
    }
}
