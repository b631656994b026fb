//! Resource offers advertised by the cluster resource manager.

use serde::{Deserialize, Serialize};

/// Scalar CPU resource name.
pub const CPUS: &str = "cpus";
/// Scalar memory resource name (megabytes).
pub const MEM: &str = "mem";
/// Range-valued host port resource name.
pub const PORTS: &str = "ports";

/// A perishable advertisement of capacity on a single host.
///
/// The same resource name may appear more than once (one entry per
/// resource group on the host).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    pub host_id: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub value: ResourceValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceValue {
    Scalar(f64),
    Ranges(Vec<ValueRange>),
}

/// Closed integer interval `[begin, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    pub begin: u64,
    pub end: u64,
}

impl ValueRange {
    pub fn new(begin: u64, end: u64) -> Self {
        Self { begin, end }
    }

    pub fn contains(&self, value: u64) -> bool {
        self.begin <= value && value <= self.end
    }
}

impl Resource {
    pub fn scalar(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: ResourceValue::Scalar(value),
        }
    }

    pub fn ranges(name: impl Into<String>, ranges: Vec<ValueRange>) -> Self {
        Self {
            name: name.into(),
            value: ResourceValue::Ranges(ranges),
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self.value {
            ResourceValue::Scalar(v) => Some(v),
            ResourceValue::Ranges(_) => None,
        }
    }

    pub fn as_ranges(&self) -> Option<&[ValueRange]> {
        match &self.value {
            ResourceValue::Ranges(r) => Some(r),
            ResourceValue::Scalar(_) => None,
        }
    }
}

impl Offer {
    pub fn new(id: impl Into<String>, host_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host_id: host_id.into(),
            ..Default::default()
        }
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Every range of every `ports` resource, in offer order.
    pub fn port_ranges(&self) -> impl Iterator<Item = &ValueRange> {
        self.resources
            .iter()
            .filter(|r| r.name == PORTS)
            .filter_map(Resource::as_ranges)
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_closed() {
        let r = ValueRange::new(8000, 8100);
        assert!(r.contains(8000));
        assert!(r.contains(8100));
        assert!(!r.contains(7999));
        assert!(!r.contains(8101));
    }

    #[test]
    fn port_ranges_spans_every_ports_resource() {
        let offer = Offer::new("o1", "h1")
            .with_resource(Resource::ranges(PORTS, vec![ValueRange::new(1, 2)]))
            .with_resource(Resource::scalar(CPUS, 1.0))
            .with_resource(Resource::ranges(
                PORTS,
                vec![ValueRange::new(10, 20), ValueRange::new(30, 40)],
            ));

        let ranges: Vec<_> = offer.port_ranges().copied().collect();
        assert_eq!(
            ranges,
            vec![
                ValueRange::new(1, 2),
                ValueRange::new(10, 20),
                ValueRange::new(30, 40)
            ]
        );
    }

    #[test]
    fn offer_parses_from_json() {
        let json = r#"{
            "id": "offer-a",
            "host_id": "agent-1",
            "resources": [
                { "name": "cpus", "value": { "scalar": 1.0 } },
                { "name": "ports", "value": { "ranges": [ { "begin": 8000, "end": 8100 } ] } }
            ]
        }"#;
        let offer: Offer = serde_json::from_str(json).unwrap();

        assert_eq!(offer.id, "offer-a");
        assert_eq!(offer.resources[0].as_scalar(), Some(1.0));
        assert_eq!(offer.port_ranges().count(), 1);
        assert!(offer.hostname.is_empty());
    }
}
