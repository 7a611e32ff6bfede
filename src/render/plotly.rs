//! Serializable subset of the Plotly figure schema.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Plotly's default qualitative palette
pub const PALETTE: [&str; 10] = [
    "#636efa", "#EF553B", "#00cc96", "#ab63fa", "#FFA15A",
    "#19d3f3", "#FF6692", "#B6E880", "#FF97FF", "#FECB52",
];

pub fn color_for(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[derive(Debug, Clone, Serialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub x: Vec<Value>,
    pub y: Vec<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stackgroup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,
}

impl Trace {
    fn new(kind: &'static str, name: &str, x: Vec<Value>, y: Vec<Option<f64>>) -> Self {
        Self {
            kind,
            name: name.to_string(),
            x,
            y,
            mode: None,
            stackgroup: None,
            xaxis: None,
            yaxis: None,
            marker: None,
            line: None,
        }
    }

    pub fn line(name: &str, x: Vec<Value>, y: Vec<Option<f64>>) -> Self {
        Self {
            mode: Some("lines"),
            ..Self::new("scatter", name, x, y)
        }
    }

    /// Filled line, the way plotly express draws area charts
    pub fn area(name: &str, x: Vec<Value>, y: Vec<Option<f64>>, group: &str) -> Self {
        Self {
            mode: Some("lines"),
            stackgroup: Some(group.to_string()),
            ..Self::new("scatter", name, x, y)
        }
    }

    pub fn markers(name: &str, x: Vec<Value>, y: Vec<Option<f64>>) -> Self {
        Self {
            mode: Some("markers"),
            ..Self::new("scatter", name, x, y)
        }
    }

    pub fn bar(name: &str, x: Vec<Value>, y: Vec<Option<f64>>) -> Self {
        Self::new("bar", name, x, y)
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.marker = Some(Marker { color: color.to_string() });
        self.line = Some(Line { color: color.to_string() });
        self
    }

    /// Places the trace on the `index`-th subplot (0-based)
    pub fn on_subplot(mut self, index: usize) -> Self {
        if index > 0 {
            self.xaxis = Some(format!("x{}", index + 1));
            self.yaxis = Some(format!("y{}", index + 1));
        }
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Line {
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Title {
    pub text: String,
}

impl Title {
    pub fn new(text: &str) -> Self {
        Self { text: text.to_string() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Axis {
    pub title: Title,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<String>,
}

impl Axis {
    pub fn titled(text: &str) -> Self {
        Self {
            title: Title::new(text),
            matches: None,
        }
    }

    pub fn matching(mut self, axis: &str) -> Self {
        self.matches = Some(axis.to_string());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Grid {
    pub rows: usize,
    pub columns: usize,
    pub pattern: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Annotation {
    pub text: String,
    pub xref: String,
    pub yref: String,
    pub x: f64,
    pub y: f64,
    pub xanchor: &'static str,
    pub yanchor: &'static str,
    pub showarrow: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub title: Title,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<Grid>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barmode: Option<&'static str>,
    /// `xaxis`, `yaxis`, `xaxis2`, ...
    #[serde(flatten)]
    pub axes: BTreeMap<String, Axis>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Legend {
    pub title: Title,
}

impl Layout {
    pub fn new(title: &str, x_title: &str, y_title: &str) -> Self {
        let mut axes = BTreeMap::new();
        axes.insert("xaxis".to_string(), Axis::titled(x_title));
        axes.insert("yaxis".to_string(), Axis::titled(y_title));
        Self {
            title: Title::new(title),
            legend: None,
            grid: None,
            annotations: Vec::new(),
            barmode: None,
            axes,
        }
    }

    pub fn with_legend(mut self, title: &str) -> Self {
        self.legend = Some(Legend { title: Title::new(title) });
        self
    }

    pub fn with_barmode(mut self, mode: &'static str) -> Self {
        self.barmode = Some(mode);
        self
    }

    /// Lays out one subplot per label, filling rows of `columns` panels.
    /// Panels share the first panel's axes ranges.
    pub fn with_facets(mut self, labels: &[String], columns: usize, x_title: &str, y_title: &str) -> Self {
        let n = labels.len().max(1);
        let columns = columns.clamp(1, n);
        let rows = (n + columns - 1) / columns;
        self.grid = Some(Grid { rows, columns, pattern: "independent" });

        for (i, label) in labels.iter().enumerate() {
            let (x_key, y_key, x_ref, y_ref) = if i == 0 {
                ("xaxis".to_string(), "yaxis".to_string(), "x".to_string(), "y".to_string())
            } else {
                let k = i + 1;
                (format!("xaxis{}", k), format!("yaxis{}", k), format!("x{}", k), format!("y{}", k))
            };

            let (x_axis, y_axis) = if i == 0 {
                (Axis::titled(x_title), Axis::titled(y_title))
            } else {
                (Axis::titled(x_title).matching("x"), Axis::titled(y_title).matching("y"))
            };
            self.axes.insert(x_key, x_axis);
            self.axes.insert(y_key, y_axis);

            self.annotations.push(Annotation {
                text: label.clone(),
                xref: format!("{} domain", x_ref),
                yref: format!("{} domain", y_ref),
                x: 0.5,
                y: 1.0,
                xanchor: "center",
                yanchor: "bottom",
                showarrow: false,
            });
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_flattened_axes_and_skips_empty_fields() {
        let layout = Layout::new("t", "Date", "Close");
        let value = serde_json::to_value(&layout).unwrap();
        assert_eq!(value["xaxis"]["title"]["text"], "Date");
        assert_eq!(value["yaxis"]["title"]["text"], "Close");
        assert!(value.get("grid").is_none());
        assert!(value.get("annotations").is_none());

        let trace = Trace::line("a", vec![json!("2024-01-01")], vec![None]);
        let value = serde_json::to_value(&trace).unwrap();
        assert_eq!(value["type"], "scatter");
        assert_eq!(value["y"], json!([null]));
        assert!(value.get("xaxis").is_none());
    }

    #[test]
    fn facets_wrap_into_rows() {
        let labels: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let layout = Layout::new("t", "x", "y").with_facets(&labels, 2, "x", "y");
        let grid = layout.grid.as_ref().unwrap();
        assert_eq!((grid.rows, grid.columns), (2, 2));
        assert_eq!(layout.annotations.len(), 3);
        assert_eq!(layout.annotations[2].xref, "x3 domain");
        assert_eq!(layout.axes["yaxis3"].matches.as_deref(), Some("y"));

        let trace = Trace::bar("c", vec![], vec![]).on_subplot(2);
        assert_eq!(trace.xaxis.as_deref(), Some("x3"));
    }
}
