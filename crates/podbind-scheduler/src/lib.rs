//! podbind-scheduler — offer matching and pod task binding.
//!
//! Decides whether a resource offer can host a pod and, if so, turns the
//! pod into a task descriptor ready to launch on the offering host.
//!
//! # Architecture
//!
//! ```text
//! TaskFactory ──create──▶ PodTask
//!                           ├── ResourceBaseline (executor shim cpus/mem)
//!                           └── HostPortMapper   (pod host ports ↔ offer ranges)
//! ```
//!
//! The baseline check and the port mapper are pure and may be run
//! concurrently for many offers. A `PodTask` is owned by one scheduling
//! attempt at a time.

pub mod error;
pub mod factory;
pub mod ports;
pub mod resources;
pub mod task;

pub use error::{
    BindError, BindResult, DuplicateHostPortError, PortAllocationError, PortMappingError,
};
pub use factory::TaskFactory;
pub use ports::{DefaultHostPortMapper, HostPortMapper, HostPortMapping, map_host_ports};
pub use resources::ResourceBaseline;
pub use task::{PodTask, TaskInfo, TaskState};
