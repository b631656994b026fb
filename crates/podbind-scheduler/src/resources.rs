//! Resource sufficiency check.
//!
//! Every task runs under an executor shim with a fixed CPU and memory
//! footprint. An offer is acceptable only if it can host that shim; the
//! pod's own resource requests are not accounted here.

use podbind_core::config::{BindConfig, DEFAULT_EXECUTOR_CPUS, DEFAULT_EXECUTOR_MEM};
use podbind_core::offer::{CPUS, MEM};
use podbind_core::{Offer, Resource};
use tracing::debug;

/// Minimum scalar resources an offer must carry to host one task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceBaseline {
    pub cpus: f64,
    /// Megabytes.
    pub mem: f64,
}

impl Default for ResourceBaseline {
    fn default() -> Self {
        Self {
            cpus: DEFAULT_EXECUTOR_CPUS,
            mem: DEFAULT_EXECUTOR_MEM,
        }
    }
}

impl From<&BindConfig> for ResourceBaseline {
    fn from(config: &BindConfig) -> Self {
        Self {
            cpus: config.executor_cpus(),
            mem: config.executor_mem(),
        }
    }
}

/// CPU and memory advertised by an offer.
///
/// When a name appears more than once the last scalar entry wins; entries
/// are not summed. A missing name reads as zero.
pub fn offered_scalars(offer: &Offer) -> (f64, f64) {
    let mut cpus = 0.0;
    let mut mem = 0.0;
    for resource in &offer.resources {
        let Some(value) = resource.as_scalar() else { continue };
        match resource.name.as_str() {
            CPUS => cpus = value,
            MEM => mem = value,
            _ => {}
        }
    }
    (cpus, mem)
}

impl ResourceBaseline {
    pub fn new(cpus: f64, mem: f64) -> Self {
        Self { cpus, mem }
    }

    /// Whether the offer can host the executor shim.
    pub fn accepts(&self, offer: &Offer) -> bool {
        let (cpus, mem) = offered_scalars(offer);
        if cpus < self.cpus || mem < self.mem {
            debug!(
                offer = %offer.id,
                cpus,
                mem,
                need_cpus = self.cpus,
                need_mem = self.mem,
                "not enough resources"
            );
            return false;
        }
        true
    }

    /// Scalar resources stamped into a bound task descriptor.
    pub fn task_resources(&self) -> Vec<Resource> {
        vec![
            Resource::scalar(CPUS, self.cpus),
            Resource::scalar(MEM, self.mem),
        ]
    }
}
