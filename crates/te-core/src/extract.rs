//! Regex-driven metric extraction
//!
//! One command's output and one [`MetricDefinition`] produce zero or more
//! samples. The pattern is applied once; the first match wins.

use std::sync::Arc;

use crate::config::MetricDefinition;
use crate::error::ExtractionError;
use crate::types::Sample;

/// Label value used when a dynamic label names a group the regex lacks
pub const MISSING_GROUP: &str = "!! match group not found !!";

/// Name of the capture group holding the value when dynamic labels are used
pub const VALUE_GROUP: &str = "value";

/// Extract samples for `metric` from `output`
///
/// No match yields no samples. A missing `value` group (with dynamic labels)
/// or a regex without any group (without dynamic labels) is an error and
/// the metric is skipped.
pub fn extract(metric: &MetricDefinition, output: &str) -> Result<Vec<Sample>, ExtractionError> {
    let Some(captures) = metric.regex.captures(output) else {
        return Ok(Vec::new());
    };

    let Some(dynamic_labels) = &metric.dynamic_labels else {
        if metric.regex.captures_len() < 2 {
            return Err(ExtractionError::MissingCaptureGroup {
                metric: metric.name.clone(),
            });
        }
        let value = captures.get(1).map_or("", |m| m.as_str());
        return Ok(materialize(metric, value, Vec::new()));
    };

    let label_values = dynamic_labels
        .iter()
        .map(|name| {
            if has_group(metric, name) {
                captures
                    .name(name)
                    .map_or_else(String::new, |m| m.as_str().to_string())
            } else {
                MISSING_GROUP.to_string()
            }
        })
        .collect();

    if !has_group(metric, VALUE_GROUP) {
        return Err(ExtractionError::MissingValueGroup {
            metric: metric.name.clone(),
        });
    }
    let value = captures.name(VALUE_GROUP).map_or("", |m| m.as_str());

    Ok(materialize(metric, value, label_values))
}

/// Parse captured text as a float
///
/// The text is parsed exactly as captured; surrounding whitespace is an
/// error.
pub fn parse_value(text: &str) -> Result<f64, ExtractionError> {
    text.parse::<f64>()
        .map_err(|_| ExtractionError::InvalidNumber {
            value: text.to_string(),
        })
}

fn has_group(metric: &MetricDefinition, name: &str) -> bool {
    metric.regex.capture_names().flatten().any(|n| n == name)
}

fn materialize(metric: &MetricDefinition, value: &str, label_values: Vec<String>) -> Vec<Sample> {
    let desc = &metric.desc;

    if metric.value_as_label.is_none() {
        let number = parse_value(value).unwrap_or_else(|e| {
            tracing::error!(metric = %metric.name, error = %e, "Could not parse value as float");
            0.0
        });
        return vec![Sample::new(Arc::clone(desc), label_values, number)];
    }

    match &metric.value_enum {
        None => {
            let mut labels = label_values;
            labels.push(value.to_string());
            vec![Sample::new(Arc::clone(desc), labels, 1.0)]
        }
        Some(entries) => entries
            .iter()
            .map(|entry| {
                let mut labels = label_values.clone();
                labels.push(entry.clone());
                let hit = if entry == value { 1.0 } else { 0.0 };
                Sample::new(Arc::clone(desc), labels, hit)
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DescriptorRegistry, ExporterConfig};

    /// Compile a single metric definition from a TOML metric table body
    fn metric(body: &str) -> MetricDefinition {
        let text = format!(
            "[hosts.sw1]\n[[hosts.sw1.commands]]\ncommand = \"show\"\n[hosts.sw1.commands.metrics.m]\n{}",
            body
        );
        let config: ExporterConfig = toml::from_str(&text).unwrap();
        let mut registry = DescriptorRegistry::new().unwrap();
        let snapshot = config.compile(&mut registry).unwrap();
        let host = snapshot.host("sw1").unwrap();
        host.commands[0].metrics["m"].clone()
    }

    #[test]
    fn test_plain_value_from_first_group() {
        let m = metric(r#"regex = 'Temp: (?P<value>[\d.]+)'"#);
        let samples = extract(&m, "Temp: 42.5 C").unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 42.5);
        assert!(samples[0].label_values.is_empty());
    }

    #[test]
    fn test_no_match_yields_nothing() {
        let m = metric(r#"regex = 'Temp: ([\d.]+)'"#);
        assert!(extract(&m, "Fan: 1200 rpm").unwrap().is_empty());
    }

    #[test]
    fn test_first_match_only() {
        let m = metric(r#"regex = 'load=(\d+)'"#);
        let samples = extract(&m, "load=3\nload=7\n").unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 3.0);
    }

    #[test]
    fn test_unparsable_value_becomes_zero() {
        let m = metric(r#"regex = 'Temp: (\S+)'"#);
        let samples = extract(&m, "Temp: N/A").unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 0.0);
    }

    #[test]
    fn test_captured_whitespace_becomes_zero() {
        let m = metric(r#"regex = 'Temp:(.*)C'"#);
        let samples = extract(&m, "Temp: 42 C").unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 0.0);
    }

    #[test]
    fn test_regex_without_group_is_reported() {
        let m = metric(r#"regex = 'Temp'"#);
        assert_eq!(
            extract(&m, "Temp: 1").unwrap_err(),
            ExtractionError::MissingCaptureGroup {
                metric: "m".to_string()
            }
        );
    }

    #[test]
    fn test_dynamic_labels_from_named_groups() {
        let m = metric(
            r#"
regex = 'Port (?P<port>\d+) (?P<speed>\w+): (?P<value>\d+) errors'
dynamic_labels = ["port", "speed"]
"#,
        );
        let samples = extract(&m, "Port 7 gig: 12 errors").unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].label_values, vec!["7".to_string(), "gig".to_string()]);
        assert_eq!(samples[0].value, 12.0);
    }

    #[test]
    fn test_missing_label_group_uses_placeholder() {
        let m = metric(
            r#"
regex = 'Port (?P<port>\d+): (?P<value>\d+)'
dynamic_labels = ["port", "slot"]
"#,
        );
        let samples = extract(&m, "Port 3: 5").unwrap();

        assert_eq!(
            samples[0].label_values,
            vec!["3".to_string(), MISSING_GROUP.to_string()]
        );
        assert_eq!(samples[0].value, 5.0);
    }

    #[test]
    fn test_missing_value_group_skips_metric() {
        let m = metric(
            r#"
regex = 'Port (?P<port>\d+): (\d+)'
dynamic_labels = ["port"]
"#,
        );
        assert_eq!(
            extract(&m, "Port 3: 5").unwrap_err(),
            ExtractionError::MissingValueGroup {
                metric: "m".to_string()
            }
        );
    }

    #[test]
    fn test_value_as_label_without_enum() {
        let m = metric(
            r#"
regex = 'Version: (\S+)'
value_as_label = "version"
"#,
        );
        let samples = extract(&m, "Version: 15.2(4)").unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 1.0);
        assert_eq!(samples[0].label("version"), Some("15.2(4)"));
    }

    #[test]
    fn test_enum_is_one_hot() {
        let m = metric(
            r#"
regex = 'Link is (\w+)'
value_as_label = "state"
value_enum = ["up", "down"]
"#,
        );
        let samples = extract(&m, "Link is down").unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].label("state"), Some("up"));
        assert_eq!(samples[0].value, 0.0);
        assert_eq!(samples[1].label("state"), Some("down"));
        assert_eq!(samples[1].value, 1.0);
    }

    #[test]
    fn test_enum_without_matching_entry_is_all_zero() {
        let m = metric(
            r#"
regex = 'Link is (\w+)'
value_as_label = "state"
value_enum = ["up", "down"]
"#,
        );
        let samples = extract(&m, "Link is testing").unwrap();

        assert_eq!(samples.len(), 2);
        assert!(samples.iter().all(|s| s.value == 0.0));
    }

    #[test]
    fn test_enum_with_dynamic_labels() {
        let m = metric(
            r#"
regex = 'Port (?P<port>\d+) is (?P<value>\w+)'
dynamic_labels = ["port"]
value_as_label = "state"
value_enum = ["up", "down", "disabled"]
"#,
        );
        let samples = extract(&m, "Port 2 is up").unwrap();

        assert_eq!(samples.len(), 3);
        assert!(samples.iter().all(|s| s.label("port") == Some("2")));
        let ones: Vec<_> = samples.iter().filter(|s| s.value == 1.0).collect();
        assert_eq!(ones.len(), 1);
        assert_eq!(ones[0].label("state"), Some("up"));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("42.5").unwrap(), 42.5);
        assert_eq!(parse_value("7").unwrap(), 7.0);
        assert_eq!(
            parse_value(" 7 ").unwrap_err(),
            ExtractionError::InvalidNumber {
                value: " 7 ".to_string()
            }
        );
        assert!(parse_value("abc").is_err());
        assert!(parse_value("").is_err());
    }
}
