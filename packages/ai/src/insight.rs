//! Structured insight extraction from generated text.
//!
//! Generated text may carry a fenced ```json block (or end with a bare JSON
//! object) holding `explanation`, `stats`, and `chart`. Nothing about that
//! block is trusted: a missing or malformed block, or missing fields,
//! fall back to the full text as explanation and fixed placeholder stats
//! and chart.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use strum_macros::{AsRefStr, Display, EnumString};

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[jJ][sS][oO][nN][ \t]*\r?\n(.*?)\r?\n[ \t]*```")
        .unwrap_or_else(|_| unreachable!())
});

/// Chart rendering style.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChartType {
    /// Bar chart.
    #[default]
    Bar,
    /// Pie chart.
    Pie,
    /// Line chart.
    Line,
}

/// A headline figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    /// Label.
    pub label: String,
    /// Value.
    pub value: f64,
    /// Unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// A chart specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    /// Rendering style.
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    /// Chart title.
    pub title: String,
    /// Key of the category field in each point.
    pub x_key: String,
    /// Key of the value field in each point.
    pub y_key: String,
    /// Data points.
    pub data: Vec<Map<String, Value>>,
}

/// Explanation plus display data derived from generated text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    /// Prose answer.
    pub explanation: String,
    /// Headline figures.
    pub stats: Vec<Stat>,
    /// Chart to render.
    pub chart: ChartSpec,
    /// Whether any part of `stats` or `chart` is placeholder content.
    pub placeholder: bool,
}

impl Insight {
    /// Insight with placeholder stats and chart and the given explanation.
    #[must_use]
    pub fn placeholder(explanation: String) -> Self {
        Self {
            explanation,
            stats: placeholder_stats(),
            chart: placeholder_chart(),
            placeholder: true,
        }
    }
}

/// Stats shown when the generated text supplies none.
#[must_use]
pub fn placeholder_stats() -> Vec<Stat> {
    vec![
        Stat {
            label: "Extraction Ratio".to_string(),
            value: 92.0,
            unit: Some("%".to_string()),
        },
        Stat {
            label: "Recharge Rate".to_string(),
            value: 58.0,
            unit: Some("mm/yr".to_string()),
        },
        Stat {
            label: "Critical Units".to_string(),
            value: 12.0,
            unit: None,
        },
    ]
}

/// Chart shown when the generated text supplies none.
#[must_use]
pub fn placeholder_chart() -> ChartSpec {
    let point = |name: &str, value: i64| match json!({ "name": name, "value": value }) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    ChartSpec {
        chart_type: ChartType::Bar,
        title: "Demo: Extraction vs Recharge".to_string(),
        x_key: "name".to_string(),
        y_key: "value".to_string(),
        data: vec![point("Extraction", 92), point("Recharge", 58)],
    }
}

/// Finds the JSON payload in generated text: the first fenced ```json
/// block, else a trailing `{...}` running from the first `{` to the end.
fn find_json_block(text: &str) -> Option<&str> {
    if let Some(caps) = FENCED_JSON.captures(text) {
        return caps.get(1).map(|m| m.as_str());
    }
    let trimmed = text.trim_end();
    if !trimmed.ends_with('}') {
        return None;
    }
    trimmed.find('{').map(|start| &trimmed[start..])
}

fn parse_stats(value: Option<&Value>) -> Vec<Stat> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(Stat {
                        label: item.get("label")?.as_str()?.to_string(),
                        value: item.get("value")?.as_f64()?,
                        unit: item
                            .get("unit")
                            .and_then(Value::as_str)
                            .map(ToString::to_string),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_chart(value: Option<&Value>) -> Option<ChartSpec> {
    let chart = value?.as_object()?;
    let data: Vec<Map<String, Value>> = chart
        .get("data")?
        .as_array()?
        .iter()
        .filter_map(|p| p.as_object().cloned())
        .collect();
    if data.is_empty() {
        return None;
    }

    let text = |key: &str| chart.get(key).and_then(Value::as_str).map(str::trim);

    Some(ChartSpec {
        chart_type: text("type")
            .and_then(|t| t.to_lowercase().parse().ok())
            .unwrap_or_default(),
        title: text("title").unwrap_or_default().to_string(),
        x_key: text("xKey")
            .filter(|k| !k.is_empty())
            .unwrap_or("name")
            .to_string(),
        y_key: text("yKey")
            .filter(|k| !k.is_empty())
            .unwrap_or("value")
            .to_string(),
        data,
    })
}

/// Extracts an [`Insight`] from generated text. Never fails.
#[must_use]
pub fn parse_insight(text: &str) -> Insight {
    let parsed: Option<Value> = find_json_block(text).and_then(|block| {
        serde_json::from_str(block)
            .inspect_err(|e| log::debug!("Ignoring malformed JSON block in generated text: {e}"))
            .ok()
    });

    let explanation = parsed
        .as_ref()
        .and_then(|v| v.get("explanation"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map_or_else(|| text.to_string(), ToString::to_string);

    let stats = parse_stats(parsed.as_ref().and_then(|v| v.get("stats")));
    let chart = parse_chart(parsed.as_ref().and_then(|v| v.get("chart")));

    let placeholder = stats.is_empty() || chart.is_none();

    Insight {
        explanation,
        stats: if stats.is_empty() {
            placeholder_stats()
        } else {
            stats
        },
        chart: chart.unwrap_or_else(placeholder_chart),
        placeholder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"## Karnataka

Extraction is high in Bangalore Urban.

```json
{
  "explanation": "Bangalore Urban is over-exploited.",
  "stats": [
    { "label": "Extraction Ratio", "value": 120, "unit": "%" },
    { "label": "Units" }
  ],
  "chart": {
    "type": "PIE",
    "title": "Stage mix",
    "data": [ { "name": "Safe", "value": 3 }, { "name": "Critical", "value": 2 } ]
  }
}
```
"#;

    #[test]
    fn fenced_block_is_used() {
        let insight = parse_insight(FULL);
        assert_eq!(insight.explanation, "Bangalore Urban is over-exploited.");
        assert!(!insight.placeholder);

        // The stat without a value is dropped.
        assert_eq!(insight.stats.len(), 1);
        assert_eq!(insight.stats[0].value, 120.0);

        assert_eq!(insight.chart.chart_type, ChartType::Pie);
        assert_eq!(insight.chart.title, "Stage mix");
        assert_eq!(insight.chart.x_key, "name");
        assert_eq!(insight.chart.y_key, "value");
        assert_eq!(insight.chart.data.len(), 2);
    }

    #[test]
    fn trailing_object_is_used() {
        let text = r#"Summary first. {"explanation": "Short.", "stats": [{"label": "A", "value": 1.5}]}"#;
        let insight = parse_insight(text);
        assert_eq!(insight.explanation, "Short.");
        assert_eq!(insight.stats[0].label, "A");
        assert!(insight.stats[0].unit.is_none());
        // No chart supplied.
        assert_eq!(insight.chart, placeholder_chart());
        assert!(insight.placeholder);
    }

    #[test]
    fn plain_text_falls_back_entirely() {
        let text = "Groundwater in Punjab is heavily over-exploited.";
        let insight = parse_insight(text);
        assert_eq!(insight, Insight::placeholder(text.to_string()));
    }

    #[test]
    fn malformed_block_falls_back() {
        let text = "Answer.\n```json\n{ \"explanation\": \"cut off\n```\n";
        let insight = parse_insight(text);
        assert_eq!(insight.explanation, text);
        assert_eq!(insight.stats, placeholder_stats());
    }

    #[test]
    fn chart_without_points_is_replaced() {
        let text = "```json\n{\"chart\": {\"type\": \"line\", \"data\": []}}\n```";
        let insight = parse_insight(text);
        assert_eq!(insight.chart.title, "Demo: Extraction vs Recharge");
        assert_eq!(insight.explanation, text);
    }

    #[test]
    fn placeholder_serializes_in_wire_shape() {
        let value = serde_json::to_value(placeholder_chart()).unwrap();
        assert_eq!(value["type"], "bar");
        assert_eq!(value["xKey"], "name");
        assert_eq!(value["data"][1]["name"], "Recharge");

        let stats = serde_json::to_value(placeholder_stats()).unwrap();
        assert!(stats[2].get("unit").is_none());
    }
}
