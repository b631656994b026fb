//! Pod task — one attempt to bind a pod to an offer and launch it.
//!
//! A task moves `Unbound → OfferAccepted → Launched → Bound`. An accepted
//! offer may be rescinded or expire before launch; `clear_binding` returns
//! the task to `Unbound` with no trace of the old offer so it can be tried
//! against another one. Once launched the binding is fixed. Deletion is a
//! separate soft flag.
//!
//! A task is owned by a single scheduling attempt at a time. It has no
//! interior locking; every mutating operation takes `&mut self`.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use podbind_core::{ExecutorInfo, Offer, Pod, Resource};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{BindError, BindResult};
use crate::ports::{HostPortMapper, HostPortMapping, ports_resource};
use crate::resources::ResourceBaseline;

/// Binding state of a [`PodTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Unbound,
    OfferAccepted,
    Launched,
    Bound,
}

/// Task descriptor handed to the resource manager at launch.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInfo {
    pub name: String,
    /// Minted per accepted offer; `None` while unbound.
    pub task_id: Option<String>,
    /// Host of the accepted offer.
    pub host_id: Option<String>,
    pub executor: Arc<ExecutorInfo>,
    pub resources: Vec<Resource>,
    /// Opaque payload for the executor.
    pub data: Option<Vec<u8>>,
}

impl TaskInfo {
    fn new(name: &str, executor: Arc<ExecutorInfo>) -> Self {
        Self {
            name: name.to_string(),
            task_id: None,
            host_id: None,
            executor,
            resources: Vec::new(),
            data: None,
        }
    }
}

pub struct PodTask {
    id: String,
    pod: Arc<Pod>,
    pod_key: String,
    info: TaskInfo,
    offer: Option<Offer>,
    state: TaskState,
    deleted: bool,
    created_at: Instant,
    launched_at: Option<Instant>,
    bound_at: Option<Instant>,
    ports: Vec<HostPortMapping>,
    mapper: Arc<dyn HostPortMapper>,
    baseline: ResourceBaseline,
}

impl PodTask {
    pub(crate) fn new(
        pod: Arc<Pod>,
        executor: Arc<ExecutorInfo>,
        task_name: &str,
        mapper: Arc<dyn HostPortMapper>,
        baseline: ResourceBaseline,
    ) -> Self {
        let pod_key = pod.key();
        Self {
            id: Uuid::new_v4().to_string(),
            pod,
            pod_key,
            info: TaskInfo::new(task_name, executor),
            offer: None,
            state: TaskState::Unbound,
            deleted: false,
            created_at: Instant::now(),
            launched_at: None,
            bound_at: None,
            ports: Vec::new(),
            mapper,
            baseline,
        }
    }

    /// Check whether `offer` could host this task, without committing.
    ///
    /// A missing offer, or a task that is not unbound, never matches.
    pub fn accepts_offer(&self, offer: Option<&Offer>) -> bool {
        let Some(offer) = offer else {
            return false;
        };
        if self.state != TaskState::Unbound {
            debug!(task = %self.id, state = ?self.state, "task is not unbound, ignoring offer");
            return false;
        }
        if !self.baseline.accepts(offer) {
            return false;
        }
        if let Err(e) = self.mapper.map(&self.pod, offer) {
            debug!(task = %self.id, offer = %offer.id, error = %e, "offer rejected by port mapper");
            return false;
        }
        true
    }

    /// Commit this task to `offer`.
    ///
    /// On a port mapping failure every binding field is cleared before the
    /// error is returned, leaving the task unbound.
    pub fn bind_offer(&mut self, offer: Offer) -> BindResult<()> {
        if self.state != TaskState::Unbound {
            return Err(self.transition_error(TaskState::OfferAccepted));
        }
        debug!(offer = %offer.id, pod = %self.pod_key, "recording offer against pod");

        self.info.task_id = Some(Uuid::new_v4().to_string());
        self.info.host_id = Some(offer.host_id.clone());
        self.info.resources = self.baseline.task_resources();

        let mapping = match self.mapper.map(&self.pod, &offer) {
            Ok(mapping) => mapping,
            Err(e) => {
                self.reset_binding();
                warn!(offer = %offer.id, pod = %self.pod_key, error = %e, "failed to map host ports");
                return Err(e.into());
            }
        };

        if let Some(ports) = ports_resource(&mapping) {
            self.info.resources.push(ports);
        }
        self.ports = mapping;
        info!(
            task = %self.id,
            offer = %offer.id,
            host = %offer.host_id,
            ports = self.ports.len(),
            "offer accepted"
        );
        self.offer = Some(offer);
        self.state = TaskState::OfferAccepted;
        Ok(())
    }

    /// Drop the accepted offer and everything derived from it.
    ///
    /// Used when the offer turns out to be invalid before launch. A task
    /// that is already launched or bound is running on its host and cannot
    /// be unbound.
    pub fn clear_binding(&mut self) -> BindResult<()> {
        if self.is_launched() {
            return Err(self.transition_error(TaskState::Unbound));
        }
        self.reset_binding();
        Ok(())
    }

    fn reset_binding(&mut self) {
        debug!(pod = %self.pod_key, "clearing offer from pod");
        self.offer = None;
        self.info.task_id = None;
        self.info.host_id = None;
        self.info.resources.clear();
        self.info.data = None;
        self.ports.clear();
        self.state = TaskState::Unbound;
    }

    pub fn mark_launched(&mut self) -> BindResult<()> {
        if self.state != TaskState::OfferAccepted {
            return Err(self.transition_error(TaskState::Launched));
        }
        self.state = TaskState::Launched;
        self.launched_at.get_or_insert_with(Instant::now);
        debug!(task = %self.id, pod = %self.pod_key, "task launched");
        Ok(())
    }

    pub fn mark_bound(&mut self) -> BindResult<()> {
        if self.state != TaskState::Launched {
            return Err(self.transition_error(TaskState::Bound));
        }
        self.state = TaskState::Bound;
        self.bound_at.get_or_insert_with(Instant::now);
        debug!(task = %self.id, pod = %self.pod_key, "task bound");
        Ok(())
    }

    /// Flag the task as deleted. The scheduling loop must not launch or
    /// rebind a deleted task.
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
        debug!(task = %self.id, pod = %self.pod_key, "task marked deleted");
    }

    /// A fresh task for the same pod and executor, at factory defaults.
    pub fn duplicate(&self) -> PodTask {
        PodTask::new(
            Arc::clone(&self.pod),
            Arc::clone(&self.info.executor),
            &self.info.name,
            Arc::clone(&self.mapper),
            self.baseline,
        )
    }

    /// Attach an executor payload to the descriptor of the accepted offer.
    pub fn set_data(&mut self, data: Vec<u8>) -> BindResult<()> {
        if !self.has_accepted_offer() {
            return Err(BindError::InvalidArgument(format!(
                "task {} has no accepted offer",
                self.id
            )));
        }
        self.info.data = Some(data);
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pod(&self) -> &Arc<Pod> {
        &self.pod
    }

    pub fn pod_key(&self) -> &str {
        &self.pod_key
    }

    pub fn executor(&self) -> &Arc<ExecutorInfo> {
        &self.info.executor
    }

    pub fn info(&self) -> &TaskInfo {
        &self.info
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn has_accepted_offer(&self) -> bool {
        self.offer.is_some() && self.info.task_id.is_some()
    }

    pub fn is_launched(&self) -> bool {
        matches!(self.state, TaskState::Launched | TaskState::Bound)
    }

    pub fn is_bound(&self) -> bool {
        self.state == TaskState::Bound
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn offer(&self) -> Option<&Offer> {
        self.offer.as_ref()
    }

    /// Id of the accepted offer, or `""` when unbound.
    pub fn offer_id(&self) -> &str {
        self.offer.as_ref().map(|o| o.id.as_str()).unwrap_or("")
    }

    /// Resolved host port assignment of the accepted offer.
    pub fn ports(&self) -> &[HostPortMapping] {
        &self.ports
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn launched_at(&self) -> Option<Instant> {
        self.launched_at
    }

    pub fn bound_at(&self) -> Option<Instant> {
        self.bound_at
    }

    fn transition_error(&self, to: TaskState) -> BindError {
        BindError::InvalidTransition {
            task_id: self.id.clone(),
            from: self.state,
            to,
        }
    }
}

impl fmt::Debug for PodTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PodTask")
            .field("id", &self.id)
            .field("pod_key", &self.pod_key)
            .field("state", &self.state)
            .field("deleted", &self.deleted)
            .field("offer_id", &self.offer_id())
            .field("info", &self.info)
            .field("ports", &self.ports)
            .finish_non_exhaustive()
    }
}
