// Interactive plots as single HTML files that load plotly.js from its CDN.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{json, Value};

use super::charts::escape_xml;
use crate::topics::NOISE_TOPIC;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

// `<` is escaped so no string in the data can close the script tag.
fn script_json(value: &Value) -> String {
    value.to_string().replace('<', "\\u003c")
}

fn page(title: &str, traces: Value, layout: Value) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{PLOTLY_CDN}"></script>
</head>
<body>
<div id="plot" style="width:100%;height:90vh;"></div>
<script>
Plotly.newPlot("plot", {traces}, {layout});
</script>
</body>
</html>
"#,
        title = escape_xml(title),
        traces = script_json(&traces),
        layout = script_json(&layout),
    )
}

fn trace_name(topic: i32) -> String {
    if topic == NOISE_TOPIC {
        "noise".to_string()
    } else {
        format!("topic {topic}")
    }
}

/// 2-D scatter of documents, one trace per topic, hover text = label.
pub fn write_scatter(
    title: &str,
    points: &[Vec<f64>],
    topics: &[i32],
    labels: &[String],
    path: &Path,
) -> Result<()> {
    if points.len() != topics.len() {
        anyhow::bail!("{} points for {} topic assignments", points.len(), topics.len());
    }
    let mut groups: BTreeMap<i32, (Vec<f64>, Vec<f64>, Vec<&str>)> = BTreeMap::new();
    for (i, (p, &t)) in points.iter().zip(topics).enumerate() {
        let entry = groups.entry(t).or_default();
        entry.0.push(p.first().copied().unwrap_or(0.0));
        entry.1.push(p.get(1).copied().unwrap_or(0.0));
        entry.2.push(labels.get(i).map(String::as_str).unwrap_or(""));
    }
    let traces: Vec<Value> = groups
        .into_iter()
        .map(|(t, (x, y, text))| {
            json!({
                "type": "scatter",
                "mode": "markers",
                "name": trace_name(t),
                "x": x,
                "y": y,
                "text": text,
            })
        })
        .collect();
    let layout = json!({
        "title": title,
        "xaxis": {"title": "component 1"},
        "yaxis": {"title": "component 2"},
    });
    std::fs::write(path, page(title, Value::Array(traces), layout))
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// One box per topic over the given weight samples.
pub fn write_box_plot(title: &str, samples: &[(i32, Vec<f64>)], path: &Path) -> Result<()> {
    if samples.is_empty() {
        anyhow::bail!("Box plot needs at least one topic");
    }
    let traces: Vec<Value> = samples
        .iter()
        .map(|(t, values)| json!({"type": "box", "name": trace_name(*t), "y": values}))
        .collect();
    let layout = json!({"title": title, "yaxis": {"title": "weight"}});
    std::fs::write(path, page(title, Value::Array(traces), layout))
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scatter_groups_by_topic() {
        let path = std::env::temp_dir().join(format!("artscope_scatter_{}.html", std::process::id()));
        let points = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.5, 0.5]];
        write_scatter("Docs", &points, &[0, 1, NOISE_TOPIC], &["a".into(), "b".into(), "c".into()], &path)
            .unwrap();
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains(PLOTLY_CDN));
        assert!(html.contains("\"noise\""));
        assert!(html.contains("\"topic 1\""));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_labels_cannot_close_the_script_tag() {
        let path = std::env::temp_dir().join(format!("artscope_scatter_tag_{}.html", std::process::id()));
        let labels = vec!["</script><b>x</b>".to_string()];
        write_scatter("Docs", &[vec![0.0, 1.0]], &[0], &labels, &path).unwrap();
        let html = std::fs::read_to_string(&path).unwrap();
        assert_eq!(html.matches("</script>").count(), 2);
        assert!(html.contains("\\u003c/script>\\u003cb>x\\u003c/b>"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_scatter_length_mismatch() {
        let path = std::env::temp_dir().join("artscope_never_written.html");
        assert!(write_scatter("x", &[vec![0.0, 0.0]], &[], &[], &path).is_err());
    }
}
