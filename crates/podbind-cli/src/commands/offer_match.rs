//! `podbind match` — check whether an offer can host a pod.
//!
//! Creates a fresh task for the pod, checks the offer, then commits to it so
//! the resulting descriptor (or the typed failure) can be inspected.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use podbind_core::{ExecutorInfo, Offer, Pod, Resource};
use podbind_scheduler::{BindError, PortMappingError, ResourceBaseline, TaskFactory};
use serde::Serialize;
use tracing::info;

/// Executor attached to tasks created by the CLI.
const CLI_EXECUTOR_ID: &str = "podbind-cli";

#[derive(Debug, Serialize)]
pub struct MatchReport {
    pub pod: String,
    pub offer: String,
    pub host: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub ports: Vec<PortReport>,
    pub resources: Vec<Resource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether another offer might succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct PortReport {
    pub container: String,
    pub container_port: u16,
    pub host_port: u64,
}

pub fn run(pod_path: &str, offer_path: &str, config_path: Option<&str>, format: &str) -> Result<()> {
    let config = super::load_config(config_path)?;
    let pod: Pod = read_json(pod_path)?;
    let offer: Offer = read_json(offer_path)?;

    let report = evaluate(&TaskFactory::new(&config), pod, offer)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print!("{}", format_report(&report)),
    }

    if !report.accepted {
        bail!("offer {} does not fit pod {}", report.offer, report.pod);
    }
    Ok(())
}

/// Check and bind a fresh task for `pod` against `offer`.
pub fn evaluate(factory: &TaskFactory, pod: Pod, offer: Offer) -> Result<MatchReport> {
    let executor = Arc::new(ExecutorInfo {
        executor_id: CLI_EXECUTOR_ID.to_string(),
        name: "podbind cli".to_string(),
        ..Default::default()
    });
    let mut task = factory.create(Arc::new(pod), executor)?;

    let mut report = MatchReport {
        pod: task.pod_key().to_string(),
        offer: offer.id.clone(),
        host: offer.host_id.clone(),
        hostname: offer.hostname.clone(),
        accepted: false,
        task_id: None,
        ports: Vec::new(),
        resources: Vec::new(),
        error: None,
        retryable: None,
    };

    let fits = task.accepts_offer(Some(&offer));
    info!(pod = %report.pod, offer = %report.offer, fits, "checked offer");

    if !fits {
        let baseline: ResourceBaseline = factory.baseline();
        if !baseline.accepts(&offer) {
            report.error = Some(format!(
                "insufficient resources: need cpus >= {} and mem >= {}",
                baseline.cpus, baseline.mem
            ));
            report.retryable = Some(true);
            return Ok(report);
        }
        // Rejected on ports; committing surfaces the typed mapping error.
    }

    match task.bind_offer(offer) {
        Ok(()) => {
            report.accepted = true;
            report.task_id = task.info().task_id.clone();
            report.resources = task.info().resources.clone();
            let containers = &task.pod().spec.containers;
            report.ports = task
                .ports()
                .iter()
                .map(|m| {
                    let container = &containers[m.container_index];
                    PortReport {
                        container: container.name.clone(),
                        container_port: container.ports[m.port_index].container_port,
                        host_port: m.host_port,
                    }
                })
                .collect();
        }
        Err(BindError::PortMapping(e)) => {
            report.retryable = Some(e.is_retryable());
            report.error = Some(describe(&e));
        }
        Err(e) => return Err(e.into()),
    }
    Ok(report)
}

fn describe(err: &PortMappingError) -> String {
    match err {
        PortMappingError::DuplicateHostPort(_) => format!("pod defect: {err}"),
        PortMappingError::Allocation(_) => err.to_string(),
    }
}

pub fn format_report(report: &MatchReport) -> String {
    let mut out = String::new();
    let verdict = if report.accepted { "ACCEPTED" } else { "REJECTED" };
    let host = if report.hostname.is_empty() {
        report.host.clone()
    } else {
        format!("{} {}", report.host, report.hostname)
    };
    out.push_str(&format!("{verdict}: pod {} on offer {} (host {host})\n", report.pod, report.offer));

    if let Some(task_id) = &report.task_id {
        out.push_str(&format!("  task:  {task_id}\n"));
    }
    for port in &report.ports {
        out.push_str(&format!(
            "  port:  {}:{} -> host {}\n",
            port.container, port.container_port, port.host_port
        ));
    }
    if let Some(error) = &report.error {
        out.push_str(&format!("  error: {error}\n"));
    }
    if let Some(retryable) = report.retryable {
        let hint = if retryable { "try another offer" } else { "fix the pod" };
        out.push_str(&format!("  hint:  {hint}\n"));
    }
    out
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let content = std::fs::read_to_string(Path::new(path)).with_context(|| format!("reading {path}"))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {path}"))
}
