/// Fixed sample payloads for local development and demos.
use std::collections::BTreeMap;

use anyhow::Result;
use serde_json::json;

use super::{
    BusinessVitality, DashboardDataProvider, GmroiEntry, MarginEntry, PlotData, PlotQuery,
    PlotType, RatioEntry,
};

const DATE: &str = "Date";
const NET_SALES: &str = "Net Sales (₹)";
const COGS: &str = "COGS (₹)";

/// `(date, net sales, cogs)` rows of the sample plot.
const SALES_ROWS: &[(&str, f64, f64)] = &[
    ("14th June 2025", 125000.0, 85000.0),
    ("15th June 2025", 125000.0, 85000.0),
    ("16th June 2025", 125000.0, 85000.0),
    ("17th June 2025", 126000.0, 85500.0),
    ("18th June 2025", 126500.0, 86000.0),
    ("1st July 2025", 133000.0, 92500.0),
    ("2nd July 2025", 133500.0, 93000.0),
    ("3rd July 2025", 134000.0, 93500.0),
    ("4th July 2025", 134500.0, 94000.0),
];

/// Serves the same payloads regardless of parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticDataProvider;

impl DashboardDataProvider for StaticDataProvider {
    fn plot_data(&self, _query: &PlotQuery) -> Result<PlotData> {
        let data = SALES_ROWS
            .iter()
            .map(|&(date, net_sales, cogs)| {
                let mut row = serde_json::Map::new();
                row.insert(DATE.to_string(), json!(date));
                row.insert(NET_SALES.to_string(), json!(net_sales));
                row.insert(COGS.to_string(), json!(cogs));
                row
            })
            .collect();

        Ok(PlotData {
            response: "The net sales of Pilkhan Tree at 1st July 2025 is ₹133000.0 and the COGS is ₹92500.0"
                .to_string(),
            task: "plot".to_string(),
            plot_type: PlotType::Bar,
            columns: vec![DATE.to_string(), NET_SALES.to_string(), COGS.to_string()],
            filters: BTreeMap::from([(DATE.to_string(), "1st July 2025".to_string())]),
            title: "Net Sales and COGS of Pilkhan Tree on 1st July 2025".to_string(),
            data,
        })
    }

    fn business_vitality(&self) -> Result<BusinessVitality> {
        let margin = |name: &str, margin: f64| MarginEntry {
            name: name.to_string(),
            margin,
        };
        let ratio = |name: &str, ratio: f64| RatioEntry {
            name: name.to_string(),
            ratio,
        };
        let gmroi = |name: &str, gmroi: f64| GmroiEntry {
            name: name.to_string(),
            gmroi,
        };

        Ok(BusinessVitality {
            gross_profit_margin: vec![
                margin("Darbar Craft", 50.0),
                margin("Shield Industries", 45.0),
                margin("Horticulture Mall", 42.0),
            ],
            net_profit_margin: vec![
                margin("Horticulture Mall", 18.0),
                margin("Shield Industries", 15.0),
                margin("Darbar Craft", 12.0),
            ],
            quick_ratio: vec![
                ratio("Shield Industries", 2.0),
                ratio("Horticulture Mall", 1.3),
                ratio("Darbar Craft", 1.1),
            ],
            gmroi: vec![
                gmroi("Shield Industries", 2.5),
                gmroi("Horticulture Mall", 2.0),
                gmroi("Darbar Craft", 1.5),
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_rows_match_columns() {
        let plot = StaticDataProvider.plot_data(&PlotQuery::default()).unwrap();
        assert_eq!(plot.data.len(), SALES_ROWS.len());
        for row in &plot.data {
            for column in &plot.columns {
                assert!(row.contains_key(column), "row missing column {column}");
            }
        }
        assert_eq!(plot.filters.get(DATE).map(String::as_str), Some("1st July 2025"));
    }

    #[test]
    fn plot_serializes_with_lowercase_type() {
        let plot = StaticDataProvider.plot_data(&PlotQuery::default()).unwrap();
        let json = serde_json::to_value(&plot).unwrap();
        assert_eq!(json["plot_type"], "bar");
        assert_eq!(json["task"], "plot");
        assert_eq!(json["data"][5]["Net Sales (₹)"], 133000.0);
    }

    #[test]
    fn business_vitality_has_three_companies_per_series() {
        let bv = StaticDataProvider.business_vitality().unwrap();
        assert_eq!(bv.gross_profit_margin.len(), 3);
        assert_eq!(bv.net_profit_margin[0].name, "Horticulture Mall");
        assert_eq!(bv.quick_ratio[0].ratio, 2.0);
        assert_eq!(bv.gmroi[2].gmroi, 1.5);
    }
}
