//! Host port mapping.
//!
//! Matches the host ports a pod requests against the port ranges of an
//! offer. Two failure modes are kept apart:
//! - a host port requested twice within the pod ([`DuplicateHostPortError`]),
//!   which no offer can fix
//! - a host port the offer does not cover ([`PortAllocationError`]), which
//!   another offer may satisfy

use std::collections::BTreeMap;

use podbind_core::offer::PORTS;
use podbind_core::{Offer, Pod, Resource, ValueRange};
use tracing::trace;

use crate::error::{DuplicateHostPortError, PortAllocationError, PortMappingError};

/// One required host port resolved for `(container_index, port_index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostPortMapping {
    pub container_index: usize,
    pub port_index: usize,
    pub host_port: u64,
}

/// Strategy for mapping a pod's host ports onto an offer.
///
/// Any `Fn(&Pod, &Offer) -> Result<Vec<HostPortMapping>, PortMappingError>`
/// closure is a mapper.
pub trait HostPortMapper: Send + Sync {
    fn map(&self, pod: &Pod, offer: &Offer) -> Result<Vec<HostPortMapping>, PortMappingError>;
}

impl<F> HostPortMapper for F
where
    F: Fn(&Pod, &Offer) -> Result<Vec<HostPortMapping>, PortMappingError> + Send + Sync,
{
    fn map(&self, pod: &Pod, offer: &Offer) -> Result<Vec<HostPortMapping>, PortMappingError> {
        self(pod, offer)
    }
}

/// Default mapping: `host_port == 0` keeps the container port pod-private,
/// every other host port must be covered by an offered range.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHostPortMapper;

impl HostPortMapper for DefaultHostPortMapper {
    fn map(&self, pod: &Pod, offer: &Offer) -> Result<Vec<HostPortMapping>, PortMappingError> {
        map_host_ports(pod, offer)
    }
}

/// Collect the pod's host port requirements, keyed by host port.
pub fn required_host_ports(pod: &Pod) -> Result<BTreeMap<u64, HostPortMapping>, DuplicateHostPortError> {
    let mut required = BTreeMap::new();
    for (container_index, container) in pod.spec.containers.iter().enumerate() {
        for (port_index, port) in container.ports.iter().enumerate() {
            // Zero host ports create no binding on the host.
            if port.host_port == 0 {
                continue;
            }
            let mapping = HostPortMapping {
                container_index,
                port_index,
                host_port: u64::from(port.host_port),
            };
            if let Some(first) = required.get(&mapping.host_port) {
                return Err(DuplicateHostPortError {
                    first: *first,
                    second: mapping,
                });
            }
            required.insert(mapping.host_port, mapping);
        }
    }
    Ok(required)
}

/// Resolve every required host port of `pod` against `offer`.
///
/// Ranges are visited in offer order and required ports in ascending order,
/// so the returned assignment is deterministic.
pub fn map_host_ports(pod: &Pod, offer: &Offer) -> Result<Vec<HostPortMapping>, PortMappingError> {
    let mut required = required_host_ports(pod)?;
    let mut mapping = Vec::with_capacity(required.len());

    for range in offer.port_ranges() {
        if required.is_empty() {
            break;
        }
        if range.begin > range.end {
            continue;
        }
        trace!(begin = range.begin, end = range.end, pending = required.len(), "evaluating port range");
        let covered: Vec<u64> = required
            .range(range.begin..=range.end)
            .map(|(port, _)| *port)
            .collect();
        for port in covered {
            if let Some(entry) = required.remove(&port) {
                mapping.push(entry);
            }
        }
    }

    if !required.is_empty() {
        return Err(PortAllocationError {
            pod: pod.key(),
            ports: required.into_keys().collect(),
        }
        .into());
    }
    Ok(mapping)
}

/// Collapse host ports into a sorted range resource.
///
/// Adjacent ports merge into one range. Returns `None` when there are no
/// ports, since an empty range resource is not valid on the wire.
pub fn range_resource(name: &str, ports: &[u64]) -> Option<Resource> {
    let mut sorted = ports.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges: Vec<ValueRange> = Vec::new();
    for port in sorted {
        match ranges.last_mut() {
            Some(last) if last.end + 1 == port => last.end = port,
            _ => ranges.push(ValueRange::new(port, port)),
        }
    }

    if ranges.is_empty() {
        None
    } else {
        Some(Resource::ranges(name, ranges))
    }
}

/// The `ports` resource claimed by a resolved assignment.
pub fn ports_resource(mapping: &[HostPortMapping]) -> Option<Resource> {
    let ports: Vec<u64> = mapping.iter().map(|m| m.host_port).collect();
    range_resource(PORTS, &ports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use podbind_core::Container;

    fn offer_with_ranges(ranges: &[(u64, u64)]) -> Offer {
        Offer::new("o1", "h1").with_resource(Resource::ranges(
            PORTS,
            ranges.iter().map(|(b, e)| ValueRange::new(*b, *e)).collect(),
        ))
    }

    fn m(container_index: usize, port_index: usize, host_port: u64) -> HostPortMapping {
        HostPortMapping {
            container_index,
            port_index,
            host_port,
        }
    }

    #[test]
    fn private_ports_need_nothing_from_offer() {
        let pod = Pod::new("ns", "p")
            .with_container(Container::new("a").with_port(80, 0).with_port(81, 0));
        let mapping = map_host_ports(&pod, &Offer::new("o1", "h1")).unwrap();
        assert!(mapping.is_empty());
    }

    #[test]
    fn maps_single_port() {
        let pod = Pod::new("", "web").with_container(Container::new("nginx").with_port(80, 8080));
        let mapping = map_host_ports(&pod, &offer_with_ranges(&[(8000, 8100)])).unwrap();
        assert_eq!(mapping, vec![m(0, 0, 8080)]);
    }

    #[test]
    fn maps_across_containers_and_ranges() {
        let pod = Pod::new("ns", "p")
            .with_container(Container::new("a").with_port(80, 31000).with_port(81, 0))
            .with_container(Container::new("b").with_port(443, 9443).with_port(53, 31001));
        let offer = offer_with_ranges(&[(9000, 9999), (31000, 32000)]);

        let mapping = map_host_ports(&pod, &offer).unwrap();
        assert_eq!(mapping, vec![m(1, 0, 9443), m(0, 0, 31000), m(1, 1, 31001)]);
    }

    #[test]
    fn duplicate_host_port_names_both_entries() {
        let pod = Pod::new("ns", "p")
            .with_container(Container::new("a").with_port(80, 8080))
            .with_container(Container::new("b").with_port(9090, 0).with_port(81, 8080));

        let err = map_host_ports(&pod, &offer_with_ranges(&[(1, 65535)])).unwrap_err();
        assert_eq!(
            err,
            PortMappingError::DuplicateHostPort(DuplicateHostPortError {
                first: m(0, 0, 8080),
                second: m(1, 1, 8080),
            })
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn duplicate_wins_over_allocation_shortfall() {
        let pod = Pod::new("ns", "p")
            .with_container(Container::new("a").with_port(80, 1).with_port(81, 1));
        let err = map_host_ports(&pod, &Offer::new("o1", "h1")).unwrap_err();
        assert!(matches!(err, PortMappingError::DuplicateHostPort(_)));
    }

    #[test]
    fn reports_exactly_the_uncovered_ports() {
        let pod = Pod::new("ns", "p").with_container(
            Container::new("a")
                .with_port(1, 7000)
                .with_port(2, 8080)
                .with_port(3, 5000),
        );
        let err = map_host_ports(&pod, &offer_with_ranges(&[(8000, 8100)])).unwrap_err();
        assert_eq!(
            err,
            PortMappingError::Allocation(PortAllocationError {
                pod: "ns/p".to_string(),
                ports: vec![5000, 7000],
            })
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn ignores_non_port_resources() {
        let pod = Pod::new("ns", "p").with_container(Container::new("a").with_port(80, 8080));
        let offer = Offer::new("o1", "h1")
            .with_resource(Resource::ranges("other", vec![ValueRange::new(8000, 9000)]));
        assert!(matches!(
            map_host_ports(&pod, &offer),
            Err(PortMappingError::Allocation(_))
        ));
    }

    #[test]
    fn overlapping_ranges_assign_each_port_once() {
        let pod = Pod::new("ns", "p").with_container(Container::new("a").with_port(80, 8080));
        let offer = offer_with_ranges(&[(8000, 8100), (8050, 8090)]);
        assert_eq!(map_host_ports(&pod, &offer).unwrap(), vec![m(0, 0, 8080)]);
    }

    #[test]
    fn closures_are_mappers() {
        let reject_all = |pod: &Pod, _: &Offer| -> Result<Vec<HostPortMapping>, PortMappingError> {
            Err(PortAllocationError {
                pod: pod.key(),
                ports: vec![],
            }
            .into())
        };
        let pod = Pod::new("ns", "p");
        assert!(reject_all.map(&pod, &Offer::new("o1", "h1")).is_err());
        assert!(DefaultHostPortMapper.map(&pod, &Offer::new("o1", "h1")).is_ok());
    }

    #[test]
    fn range_resource_coalesces_adjacent_ports() {
        let resource = range_resource(PORTS, &[443, 81, 80, 82, 80]).unwrap();
        assert_eq!(
            resource.as_ranges().unwrap(),
            &[ValueRange::new(80, 82), ValueRange::new(443, 443)]
        );
    }

    #[test]
    fn range_resource_is_none_for_no_ports() {
        assert!(range_resource(PORTS, &[]).is_none());
        assert!(ports_resource(&[]).is_none());
    }
}
