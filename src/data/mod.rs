//! Dashboard chart and KPI payloads.
//!
//! Route handlers never build payloads themselves: they ask a
//! [`DashboardDataProvider`]. The gateway ships [`StaticDataProvider`],
//! which serves fixed sample data; a real source only has to implement the
//! trait.

mod mock;

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use mock::StaticDataProvider;

// ---------------------------------------------------------------------------
// Plot data
// ---------------------------------------------------------------------------

/// Chart style requested for a plot payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotType {
    Bar,
    Line,
}

/// An AI-generated plot: a narrative answer plus tabular series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotData {
    pub response: String,
    pub task: String,
    pub plot_type: PlotType,
    pub columns: Vec<String>,
    pub filters: BTreeMap<String, String>,
    pub title: String,
    /// One row per x-axis point, keyed by column name.
    pub data: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Parameters for a plot request, taken from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlotQuery {
    pub params: BTreeMap<String, String>,
}

impl PlotQuery {
    /// Parse the part of the URL after `?`.
    pub fn from_query_string(query: &str) -> Self {
        Self {
            params: crate::query::parse(query),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Business vitality
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginEntry {
    pub name: String,
    pub margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioEntry {
    pub name: String,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GmroiEntry {
    pub name: String,
    pub gmroi: f64,
}

/// The four business-vitality metric series shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessVitality {
    pub gross_profit_margin: Vec<MarginEntry>,
    pub net_profit_margin: Vec<MarginEntry>,
    pub quick_ratio: Vec<RatioEntry>,
    pub gmroi: Vec<GmroiEntry>,
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Source of dashboard payloads.
pub trait DashboardDataProvider: Send + Sync {
    /// Fetch plot data for the given parameters.
    fn plot_data(&self, query: &PlotQuery) -> Result<PlotData>;

    /// Fetch the business-vitality metric series.
    fn business_vitality(&self) -> Result<BusinessVitality>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
