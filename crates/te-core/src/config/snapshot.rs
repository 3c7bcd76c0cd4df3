//! Compiled, immutable configuration

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use prometheus::core::Desc;
use regex::Regex;

use super::host::{
    CommandConfig, ExporterConfig, HostConfig, MetricConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT,
};
use super::registry::DescriptorRegistry;
use crate::error::{ConfigError, SelectionError};
use crate::types::{HostId, Target};

/// Immutable view of a loaded configuration
///
/// A reload produces a new snapshot; existing snapshots are never mutated.
#[derive(Debug)]
pub struct ConfigSnapshot {
    hosts: BTreeMap<HostId, Arc<Host>>,
    up: Arc<Desc>,
}

/// A host ready for collection
#[derive(Debug)]
pub struct Host {
    pub id: HostId,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub connect_timeout: Duration,
    pub prompt: String,
    pub labels: BTreeMap<String, String>,
    pub commands: Vec<Command>,
}

/// A command and its compiled metrics
#[derive(Debug)]
pub struct Command {
    pub text: String,
    pub metrics: BTreeMap<String, MetricDefinition>,
}

/// A compiled metric definition
#[derive(Debug, Clone)]
pub struct MetricDefinition {
    pub name: String,
    pub regex: Regex,
    pub help: String,
    /// Metric labels with host labels merged in
    pub labels: BTreeMap<String, String>,
    pub dynamic_labels: Option<Vec<String>>,
    pub value_as_label: Option<String>,
    pub value_enum: Option<Vec<String>>,
    /// Descriptor shared by every sample of this metric
    pub desc: Arc<Desc>,
}

/// Merge host labels into a metric's labels
///
/// Without metric labels the host labels are used as-is. Otherwise host
/// labels are copied over the metric labels and win on key collision.
pub fn merge_labels(
    metric: Option<&BTreeMap<String, String>>,
    host: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    match metric {
        None => host.clone(),
        Some(metric) => {
            let mut merged = metric.clone();
            merged.extend(host.iter().map(|(k, v)| (k.clone(), v.clone())));
            merged
        }
    }
}

impl ExporterConfig {
    /// Compile into an immutable snapshot
    ///
    /// Regexes are compiled and descriptors interned into `registry`. Any
    /// failure aborts the whole load.
    pub fn compile(&self, registry: &mut DescriptorRegistry) -> Result<ConfigSnapshot, ConfigError> {
        let mut hosts = BTreeMap::new();

        for (name, host) in &self.hosts {
            if name.is_empty() {
                return Err(ConfigError::Invalid("host name cannot be empty".to_string()));
            }
            let compiled = compile_host(name, host, registry)?;
            hosts.insert(compiled.id.clone(), Arc::new(compiled));
        }

        Ok(ConfigSnapshot {
            hosts,
            up: Arc::clone(registry.up()),
        })
    }
}

fn compile_host(
    name: &str,
    host: &HostConfig,
    registry: &mut DescriptorRegistry,
) -> Result<Host, ConfigError> {
    let commands = host
        .commands
        .iter()
        .map(|command| compile_command(name, host, command, registry))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Host {
        id: HostId::new(name),
        port: if host.port == 0 { DEFAULT_PORT } else { host.port },
        username: host.username.clone(),
        password: host.password.clone(),
        connect_timeout: non_zero_or(host.connect_timeout, DEFAULT_CONNECT_TIMEOUT),
        prompt: host.prompt.clone(),
        labels: host.labels.clone(),
        commands,
    })
}

fn compile_command(
    host_name: &str,
    host: &HostConfig,
    command: &CommandConfig,
    registry: &mut DescriptorRegistry,
) -> Result<Command, ConfigError> {
    let mut metrics = BTreeMap::new();
    for (metric_name, metric) in &command.metrics {
        let compiled = compile_metric(host_name, host, &command.command, metric_name, metric, registry)?;
        metrics.insert(metric_name.clone(), compiled);
    }

    Ok(Command {
        text: command.command.clone(),
        metrics,
    })
}

fn compile_metric(
    host_name: &str,
    host: &HostConfig,
    command: &str,
    metric_name: &str,
    metric: &MetricConfig,
    registry: &mut DescriptorRegistry,
) -> Result<MetricDefinition, ConfigError> {
    let regex = Regex::new(&metric.regex).map_err(|source| ConfigError::Regex {
        host: host_name.to_string(),
        command: command.to_string(),
        metric: metric_name.to_string(),
        regex: metric.regex.clone(),
        source,
    })?;

    let labels = merge_labels(metric.labels.as_ref(), &host.labels);

    let mut const_labels = HashMap::new();
    const_labels.insert("target".to_string(), host_name.to_string());
    const_labels.insert("command".to_string(), command.to_string());
    const_labels.extend(labels.iter().map(|(k, v)| (k.clone(), v.clone())));

    let mut variable_labels = metric.dynamic_labels.clone().unwrap_or_default();
    if let Some(label) = &metric.value_as_label {
        variable_labels.push(label.clone());
    }

    if let Some(label) = variable_labels.iter().find(|l| const_labels.contains_key(*l)) {
        return Err(ConfigError::LabelConflict {
            host: host_name.to_string(),
            command: command.to_string(),
            metric: metric_name.to_string(),
            label: label.clone(),
        });
    }

    let help = if metric.help.is_empty() {
        metric_name.to_string()
    } else {
        metric.help.clone()
    };

    let desc = Desc::new(metric_name.to_string(), help.clone(), variable_labels, const_labels)
        .map_err(|source| ConfigError::Descriptor {
            host: host_name.to_string(),
            command: command.to_string(),
            metric: metric_name.to_string(),
            source,
        })?;

    Ok(MetricDefinition {
        name: metric_name.to_string(),
        regex,
        help,
        labels,
        dynamic_labels: metric.dynamic_labels.clone(),
        value_as_label: metric.value_as_label.clone(),
        value_enum: metric.value_enum.clone(),
        desc: registry.intern(desc),
    })
}

fn non_zero_or(value: Duration, default: Duration) -> Duration {
    if value.is_zero() {
        default
    } else {
        value
    }
}

impl ConfigSnapshot {
    /// Get a host by identity
    pub fn host(&self, id: &str) -> Option<&Arc<Host>> {
        self.hosts.get(&HostId::new(id))
    }

    /// Iterate over all hosts
    pub fn hosts(&self) -> impl Iterator<Item = &Arc<Host>> {
        self.hosts.values()
    }

    /// Resolve a collection target to the hosts it covers
    pub fn select(&self, target: &Target) -> Result<Vec<Arc<Host>>, SelectionError> {
        match target {
            Target::All => Ok(self.hosts.values().cloned().collect()),
            Target::Host(id) => self
                .hosts
                .get(id)
                .map(|host| vec![Arc::clone(host)])
                .ok_or_else(|| SelectionError::UnknownHost(id.to_string())),
        }
    }

    /// The liveness descriptor
    pub fn up_descriptor(&self) -> &Arc<Desc> {
        &self.up
    }

    /// Number of hosts
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Check if no hosts are configured
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl Host {
    /// Address in `host:port` form, bracketing IPv6 literals
    pub fn socket_address(&self) -> String {
        let host = self.id.as_str();
        if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, self.port)
        } else {
            format!("{}:{}", host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn compile(toml_text: &str) -> Result<ConfigSnapshot, ConfigError> {
        let config: ExporterConfig = toml::from_str(toml_text).unwrap();
        let mut registry = DescriptorRegistry::new().unwrap();
        config.compile(&mut registry)
    }

    fn const_label<'a>(desc: &'a Desc, name: &str) -> Option<&'a str> {
        desc.const_label_pairs
            .iter()
            .find(|p| p.get_name() == name)
            .map(|p| p.get_value())
    }

    #[test]
    fn test_host_labels_override_metric_labels() {
        let merged = merge_labels(
            Some(&labels(&[("a", "1")])),
            &labels(&[("a", "2"), ("b", "3")]),
        );
        assert_eq!(merged, labels(&[("a", "2"), ("b", "3")]));
    }

    #[test]
    fn test_host_labels_used_without_metric_labels() {
        let merged = merge_labels(None, &labels(&[("site", "lab")]));
        assert_eq!(merged, labels(&[("site", "lab")]));
    }

    #[test]
    fn test_compile_builds_descriptor() {
        let snapshot = compile(
            r#"
[hosts.sw1]
labels = { site = "lab" }

[[hosts.sw1.commands]]
command = "show ports"

[hosts.sw1.commands.metrics.port_state]
regex = 'Port (?P<port>\d+): (?P<value>\w+)'
labels = { site = "other", kind = "eth" }
dynamic_labels = ["port"]
value_as_label = "state"
"#,
        )
        .unwrap();

        let host = snapshot.host("sw1").unwrap();
        let metric = &host.commands[0].metrics["port_state"];

        assert_eq!(metric.help, "port_state");
        assert_eq!(metric.labels, labels(&[("kind", "eth"), ("site", "lab")]));
        assert_eq!(
            metric.desc.variable_labels,
            vec!["port".to_string(), "state".to_string()]
        );
        assert_eq!(const_label(&metric.desc, "target"), Some("sw1"));
        assert_eq!(const_label(&metric.desc, "command"), Some("show ports"));
        assert_eq!(const_label(&metric.desc, "site"), Some("lab"));
    }

    #[test]
    fn test_bad_regex_names_offending_metric() {
        let err = compile(
            r#"
[hosts.sw1]

[[hosts.sw1.commands]]
command = "show temp"

[hosts.sw1.commands.metrics.temp]
regex = 'Temp: ([\d.+'
"#,
        )
        .unwrap_err();

        match err {
            ConfigError::Regex {
                host,
                command,
                metric,
                ..
            } => {
                assert_eq!(host, "sw1");
                assert_eq!(command, "show temp");
                assert_eq!(metric, "temp");
            }
            other => panic!("Expected regex error, got {:?}", other),
        }
    }

    #[test]
    fn test_label_collision_is_a_load_error() {
        let err = compile(
            r#"
[hosts.sw1]

[[hosts.sw1.commands]]
command = "show ports"

[hosts.sw1.commands.metrics.port_state]
regex = '(?P<value>\w+)'
dynamic_labels = ["target"]
"#,
        )
        .unwrap_err();

        match err {
            ConfigError::LabelConflict { label, .. } => assert_eq!(label, "target"),
            other => panic!("Expected label conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_metric_name_is_a_load_error() {
        let err = compile(
            r#"
[hosts.sw1]

[[hosts.sw1.commands]]
command = "show temp"

[hosts.sw1.commands.metrics."temp-celsius"]
regex = '(\d+)'
"#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Descriptor { .. }));
    }

    #[test]
    fn test_zero_values_fall_back_to_defaults() {
        let snapshot = compile(
            r#"
[hosts.sw1]
port = 0
connect_timeout = 0
"#,
        )
        .unwrap();

        let host = snapshot.host("sw1").unwrap();
        assert_eq!(host.port, DEFAULT_PORT);
        assert_eq!(host.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
    }

    #[test]
    fn test_select_targets() {
        let snapshot = compile(
            r#"
[hosts.a]
[hosts.b]
"#,
        )
        .unwrap();

        assert_eq!(snapshot.select(&Target::All).unwrap().len(), 2);
        assert_eq!(
            snapshot.select(&Target::Host(HostId::new("b"))).unwrap()[0].id,
            HostId::new("b")
        );
        assert_eq!(
            snapshot.select(&Target::Host(HostId::new("c"))).unwrap_err(),
            SelectionError::UnknownHost("c".to_string())
        );
    }

    #[test]
    fn test_recompile_reuses_descriptors() {
        let text = r#"
[hosts.sw1]

[[hosts.sw1.commands]]
command = "uptime"

[hosts.sw1.commands.metrics.uptime_seconds]
regex = '(\d+)'
"#;
        let config: ExporterConfig = toml::from_str(text).unwrap();
        let mut registry = DescriptorRegistry::new().unwrap();

        let first = config.compile(&mut registry).unwrap();
        let second = config.compile(&mut registry).unwrap();

        let a = &first.host("sw1").unwrap().commands[0].metrics["uptime_seconds"].desc;
        let b = &second.host("sw1").unwrap().commands[0].metrics["uptime_seconds"].desc;
        assert!(Arc::ptr_eq(a, b));
        assert!(Arc::ptr_eq(first.up_descriptor(), second.up_descriptor()));
    }

    #[test]
    fn test_socket_address() {
        let snapshot = compile(
            r#"
[hosts."10.0.0.1"]
port = 2323
[hosts."fe80::1"]
"#,
        )
        .unwrap();

        assert_eq!(snapshot.host("10.0.0.1").unwrap().socket_address(), "10.0.0.1:2323");
        assert_eq!(snapshot.host("fe80::1").unwrap().socket_address(), "[fe80::1]:23");
    }
}
