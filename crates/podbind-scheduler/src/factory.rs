//! Task factory — builds unbound pod tasks.

use std::fmt;
use std::sync::Arc;

use podbind_core::{BindConfig, ExecutorInfo, Pod};
use tracing::debug;

use crate::error::{BindError, BindResult};
use crate::ports::{DefaultHostPortMapper, HostPortMapper};
use crate::resources::ResourceBaseline;
use crate::task::PodTask;

/// Creates [`PodTask`]s sharing one baseline and port mapping strategy.
#[derive(Clone)]
pub struct TaskFactory {
    baseline: ResourceBaseline,
    mapper: Arc<dyn HostPortMapper>,
    task_name: String,
}

impl TaskFactory {
    pub fn new(config: &BindConfig) -> Self {
        Self {
            baseline: ResourceBaseline::from(config),
            mapper: Arc::new(DefaultHostPortMapper),
            task_name: config.task_name().to_string(),
        }
    }

    /// Replace the port mapping strategy for tasks created from now on.
    pub fn with_mapper(mut self, mapper: impl HostPortMapper + 'static) -> Self {
        self.mapper = Arc::new(mapper);
        self
    }

    pub fn with_baseline(mut self, baseline: ResourceBaseline) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn baseline(&self) -> ResourceBaseline {
        self.baseline
    }

    /// Create an unbound task for `pod`, run by `executor`.
    pub fn create(&self, pod: Arc<Pod>, executor: Arc<ExecutorInfo>) -> BindResult<PodTask> {
        if pod.name.is_empty() {
            return Err(BindError::InvalidArgument("pod has no name".to_string()));
        }
        if executor.executor_id.is_empty() {
            return Err(BindError::InvalidArgument(format!(
                "executor for pod {} has no id",
                pod.key()
            )));
        }
        let task = PodTask::new(
            pod,
            executor,
            &self.task_name,
            Arc::clone(&self.mapper),
            self.baseline,
        );
        debug!(task = %task.id(), pod = %task.pod_key(), "created pod task");
        Ok(task)
    }
}

impl Default for TaskFactory {
    fn default() -> Self {
        Self::new(&BindConfig::default())
    }
}

impl fmt::Debug for TaskFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFactory")
            .field("baseline", &self.baseline)
            .field("task_name", &self.task_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PortMappingError;
    use crate::ports::HostPortMapping;
    use crate::task::TaskState;
    use podbind_core::offer::{CPUS, MEM};
    use podbind_core::{Container, Offer, Resource};

    fn executor() -> Arc<ExecutorInfo> {
        Arc::new(ExecutorInfo::new("exec-1"))
    }

    #[test]
    fn creates_unbound_task() {
        let task = TaskFactory::default()
            .create(Arc::new(Pod::new("prod", "api")), executor())
            .unwrap();
        assert_eq!(task.state(), TaskState::Unbound);
        assert_eq!(task.pod_key(), "prod/api");
        assert_eq!(task.executor().executor_id, "exec-1");
    }

    #[test]
    fn task_ids_are_unique() {
        let factory = TaskFactory::default();
        let pod = Arc::new(Pod::new("prod", "api"));
        let a = factory.create(Arc::clone(&pod), executor()).unwrap();
        let b = factory.create(pod, executor()).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn rejects_unnamed_pod() {
        let err = TaskFactory::default()
            .create(Arc::new(Pod::new("prod", "")), executor())
            .unwrap_err();
        assert!(matches!(err, BindError::InvalidArgument(_)));
    }

    #[test]
    fn rejects_executor_without_id() {
        let err = TaskFactory::default()
            .create(Arc::new(Pod::new("prod", "api")), Arc::new(ExecutorInfo::default()))
            .unwrap_err();
        assert!(matches!(err, BindError::InvalidArgument(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn task_name_comes_from_config() {
        let config = BindConfig::from_toml_str("[task]\nname = \"Custom\"\n").unwrap();
        let task = TaskFactory::new(&config)
            .create(Arc::new(Pod::new("prod", "api")), executor())
            .unwrap();
        assert_eq!(task.info().name, "Custom");
    }

    #[test]
    fn baseline_applies_to_offer_check() {
        let factory = TaskFactory::default().with_baseline(ResourceBaseline::new(2.0, 64.0));
        let task = factory
            .create(Arc::new(Pod::new("prod", "api")), executor())
            .unwrap();
        let offer = Offer::new("o1", "h1")
            .with_resource(Resource::scalar(CPUS, 1.0))
            .with_resource(Resource::scalar(MEM, 128.0));
        assert!(!task.accepts_offer(Some(&offer)));
        assert!(TaskFactory::default()
            .create(Arc::new(Pod::new("prod", "api")), executor())
            .unwrap()
            .accepts_offer(Some(&offer)));
    }

    #[test]
    fn injected_mapper_is_used_and_duplicated() {
        // Pins every host port to the first container port, ignoring offers.
        let pinned = |_: &Pod, _: &Offer| -> Result<Vec<HostPortMapping>, PortMappingError> {
            Ok(vec![HostPortMapping {
                container_index: 0,
                port_index: 0,
                host_port: 1,
            }])
        };
        let factory = TaskFactory::default().with_mapper(pinned);
        let pod = Arc::new(Pod::new("prod", "api").with_container(Container::new("a").with_port(80, 8080)));
        let task = factory.create(pod, executor()).unwrap();

        let mut dup = task.duplicate();
        dup.bind_offer(Offer::new("o1", "h1")).unwrap();
        assert_eq!(dup.ports()[0].host_port, 1);
    }
}
