//! Binding error types.

use thiserror::Error;

use crate::ports::HostPortMapping;
use crate::task::TaskState;

/// Errors that can occur while building or binding a pod task.
#[derive(Debug, Error)]
pub enum BindError {
    /// Malformed caller request; never retried.
    #[error("illegal argument: {0}")]
    InvalidArgument(String),

    #[error("task {task_id}: cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        task_id: String,
        from: TaskState,
        to: TaskState,
    },

    #[error(transparent)]
    PortMapping(#[from] PortMappingError),
}

impl BindError {
    /// Whether trying a different offer could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BindError::PortMapping(e) if e.is_retryable())
    }
}

pub type BindResult<T> = Result<T, BindError>;

/// Failure of a host port mapping strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortMappingError {
    #[error(transparent)]
    DuplicateHostPort(#[from] DuplicateHostPortError),

    #[error(transparent)]
    Allocation(#[from] PortAllocationError),
}

impl PortMappingError {
    /// Allocation shortfall is specific to one offer; a duplicate host port
    /// is a defect in the pod itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PortMappingError::Allocation(_))
    }
}

/// The offer does not cover every host port the pod requires.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not schedule pod {pod}: {} port(s) could not be allocated: {ports:?}", .ports.len())]
pub struct PortAllocationError {
    /// Pod key (`namespace/name`).
    pub pod: String,
    /// Unsatisfied host ports, ascending.
    pub ports: Vec<u64>,
}

/// Two container ports of the same pod request the same host port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "host port {} is specified for container {}, port {} and container {}, port {}",
    .first.host_port, .first.container_index, .first.port_index,
    .second.container_index, .second.port_index
)]
pub struct DuplicateHostPortError {
    pub first: HostPortMapping,
    pub second: HostPortMapping,
}

impl DuplicateHostPortError {
    pub fn host_port(&self) -> u64 {
        self.first.host_port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(container_index: usize, port_index: usize, host_port: u64) -> HostPortMapping {
        HostPortMapping {
            container_index,
            port_index,
            host_port,
        }
    }

    #[test]
    fn allocation_shortfall_is_retryable() {
        let err: BindError = PortMappingError::from(PortAllocationError {
            pod: "default/web".to_string(),
            ports: vec![8080],
        })
        .into();
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "could not schedule pod default/web: 1 port(s) could not be allocated: [8080]"
        );
    }

    #[test]
    fn duplicate_host_port_is_not_retryable() {
        let err: BindError = PortMappingError::from(DuplicateHostPortError {
            first: mapping(0, 0, 80),
            second: mapping(1, 2, 80),
        })
        .into();
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "host port 80 is specified for container 0, port 0 and container 1, port 2"
        );
    }

    #[test]
    fn invalid_argument_is_not_retryable() {
        let err = BindError::InvalidArgument("pod has no name".to_string());
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "illegal argument: pod has no name");
    }
}
