//! Test doubles for the evaluation engine

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing_subscriber::fmt::MakeWriter;

use meridian_core::{
    Action, Artifact, BuildError, CycleInfo, EvaluationResult, EvaluationState, ModifiedFileSet,
    NodeKey, Result,
};

use crate::events::{ActionEvent, ActionEventBus, ActionEventListener};
use crate::evaluator::{
    ActionCacheChecker, ActionInputFileCache, CycleReporter, EvaluationRequest, Evaluator,
    ProgressReportingObjects,
};
use crate::status::ActionStatusReporter;

/// Scripted body of one `evaluate` call
type Script =
    Box<dyn FnOnce(&FakeEvaluator, &EvaluationRequest<'_>) -> Result<EvaluationResult> + Send>;

/// What one `evaluate` call was asked to do
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub artifacts: Vec<Artifact>,
    pub keep_going: bool,
    pub jobs: usize,
    pub had_listener: bool,
}

/// Cycle reporter that remembers every report
#[derive(Debug, Default)]
pub(crate) struct CollectingCycleReporter {
    reports: Mutex<Vec<(Vec<CycleInfo>, NodeKey)>>,
}

impl CollectingCycleReporter {
    pub fn reports(&self) -> Vec<(Vec<CycleInfo>, NodeKey)> {
        self.reports.lock().unwrap().clone()
    }

    pub fn cycle_count(&self) -> usize {
        self.reports().iter().map(|(cycles, _)| cycles.len()).sum()
    }
}

impl CycleReporter for CollectingCycleReporter {
    fn report_cycles(&self, cycles: &[CycleInfo], top_level_key: &NodeKey) {
        self.reports
            .lock()
            .unwrap()
            .push((cycles.to_vec(), top_level_key.clone()));
    }
}

/// Evaluator that replays scripted results and records every call.
///
/// Unscripted `evaluate` calls succeed with every requested artifact.
#[derive(Default)]
pub(crate) struct FakeEvaluator {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<RecordedRequest>>,
    calls: Mutex<Vec<String>>,
    cycles: CollectingCycleReporter,
    objects: Mutex<Option<ProgressReportingObjects>>,
    last_status_reporter: Mutex<Option<Arc<ActionStatusReporter>>>,
    conflict_error: Mutex<Option<BuildError>>,
    bus: ActionEventBus,
}

impl FakeEvaluator {
    /// Queue the body of the next unscripted `evaluate` call
    pub fn push<F>(&self, script: F)
    where
        F: FnOnce(&FakeEvaluator, &EvaluationRequest<'_>) -> Result<EvaluationResult> + Send + 'static,
    {
        self.scripts.lock().unwrap().push_back(Box::new(script));
    }

    /// Make the next `find_artifact_conflicts` fail
    pub fn fail_conflicts(&self, err: BuildError) {
        *self.conflict_error.lock().unwrap() = Some(err);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn position(&self, call: &str) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }

    pub fn cycle_reports(&self) -> &CollectingCycleReporter {
        &self.cycles
    }

    /// Status reporter of the most recent attachment, kept after detaching
    pub fn last_status_reporter(&self) -> Option<Arc<ActionStatusReporter>> {
        self.last_status_reporter.lock().unwrap().clone()
    }

    pub fn objects_attached(&self) -> bool {
        self.objects.lock().unwrap().is_some()
    }

    /// Run `action` the way the engine would: enqueue its node, broadcast its
    /// execution, tell the completion receiver, then report the node evaluated.
    pub fn run_action(&self, request: &EvaluationRequest<'_>, action: &Arc<Action>) {
        let key = NodeKey::ActionExecution(Arc::clone(action));
        if let Some(listener) = request.progress_listener {
            listener.enqueueing(&key);
        }
        self.bus.broadcast(&ActionEvent::Started {
            action: Arc::clone(action),
        });
        self.bus.broadcast(&ActionEvent::Completed {
            action: Arc::clone(action),
            duration: Duration::from_millis(1),
        });
        let objects = self.objects.lock().unwrap().clone();
        if let Some(objects) = objects {
            objects.completion_receiver.action_completed(action);
        }
        if let Some(listener) = request.progress_listener {
            listener.evaluated(&key, EvaluationState::Built);
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

impl CycleReporter for FakeEvaluator {
    fn report_cycles(&self, cycles: &[CycleInfo], top_level_key: &NodeKey) {
        self.record("report_cycles");
        self.cycles.report_cycles(cycles, top_level_key);
    }
}

impl Evaluator for FakeEvaluator {
    fn prepare_execution(&self) {
        self.record("prepare_execution");
    }

    fn set_file_cache(&self, _cache: Arc<dyn ActionInputFileCache>) {
        self.record("set_file_cache");
    }

    fn find_artifact_conflicts(&self) -> Result<()> {
        self.record("find_artifact_conflicts");
        match self.conflict_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn inform_about_modified_files(&self, modified: &ModifiedFileSet) {
        self.record(format!("modified_files:{:?}", modified.count()));
    }

    fn evaluate(&self, request: EvaluationRequest<'_>) -> Result<EvaluationResult> {
        self.record("evaluate");
        let mut artifacts: Vec<Artifact> = request.artifacts.iter().cloned().collect();
        artifacts.sort();
        self.requests.lock().unwrap().push(RecordedRequest {
            artifacts: artifacts.clone(),
            keep_going: request.keep_going,
            jobs: request.jobs,
            had_listener: request.progress_listener.is_some(),
        });

        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(script) => script(self, &request),
            None => Ok(EvaluationResult::success(artifacts)),
        }
    }

    fn set_progress_reporting_objects(&self, objects: Option<ProgressReportingObjects>) {
        self.record(if objects.is_some() { "attach" } else { "detach" });
        if let Some(objects) = &objects {
            *self.last_status_reporter.lock().unwrap() = Some(Arc::clone(&objects.status_reporter));
        }
        *self.objects.lock().unwrap() = objects;
    }

    fn event_bus(&self) -> &ActionEventBus {
        &self.bus
    }
}

/// Cache checker that always asks for execution
#[derive(Debug, Default)]
pub(crate) struct AlwaysExecute;

impl ActionCacheChecker for AlwaysExecute {
    fn needs_execution(&self, _action: &Action) -> bool {
        true
    }
}

/// File cache that knows nothing
#[derive(Debug, Default)]
pub(crate) struct EmptyFileCache;

impl ActionInputFileCache for EmptyFileCache {
    fn digest(&self, _input: &Artifact) -> Option<Vec<u8>> {
        None
    }
}

/// Listener that collects events for later inspection
#[derive(Debug, Default)]
pub(crate) struct CollectingListener {
    events: Mutex<Vec<ActionEvent>>,
}

impl CollectingListener {
    pub fn events(&self) -> Vec<ActionEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ActionEventListener for CollectingListener {
    fn on_event(&self, event: &ActionEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Log sink for a test subscriber
#[derive(Debug, Clone, Default)]
pub(crate) struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Proptest generators
pub(crate) mod generators {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use meridian_core::{Action, Artifact, EvaluationState, NodeKey};

    /// A stream of evaluation events together with the built set it must produce
    #[derive(Debug, Clone)]
    pub(crate) struct TrackedBuild {
        pub requested: HashSet<Artifact>,
        pub previously_built: HashSet<Artifact>,
        pub events: Vec<(NodeKey, EvaluationState)>,
        pub expected_built: HashSet<Artifact>,
    }

    #[derive(Debug, Clone, Copy)]
    enum Event {
        CleanArtifact,
        BuiltArtifact,
        ActionRan,
    }

    fn event() -> impl Strategy<Value = Event> {
        prop_oneof![
            Just(Event::CleanArtifact),
            Just(Event::BuiltArtifact),
            Just(Event::ActionRan),
        ]
    }

    /// Generate artifacts with random kind, request membership and prior
    /// presence, each seen through one random evaluation event
    pub(crate) fn tracked_build() -> impl Strategy<Value = TrackedBuild> {
        prop::collection::vec((any::<bool>(), any::<bool>(), any::<bool>(), event()), 0..24)
            .prop_map(|specs| {
                let mut build = TrackedBuild {
                    requested: HashSet::new(),
                    previously_built: HashSet::new(),
                    events: Vec::new(),
                    expected_built: HashSet::new(),
                };

                for (i, (is_source, requested, previously_built, event)) in
                    specs.into_iter().enumerate()
                {
                    let path = format!("out/{i}");
                    let artifact = if is_source {
                        Artifact::source(path)
                    } else {
                        Artifact::derived(path)
                    };
                    if requested {
                        build.requested.insert(artifact.clone());
                    }
                    if previously_built {
                        build.previously_built.insert(artifact.clone());
                    }

                    let (key, state, counts) = match event {
                        Event::CleanArtifact => (
                            NodeKey::from(artifact.clone()),
                            EvaluationState::Clean,
                            true,
                        ),
                        Event::BuiltArtifact => (
                            NodeKey::from(artifact.clone()),
                            EvaluationState::Built,
                            is_source,
                        ),
                        Event::ActionRan => (
                            NodeKey::from(
                                Action::new(format!("a{i}"), "Compile")
                                    .with_output(artifact.clone()),
                            ),
                            EvaluationState::Built,
                            true,
                        ),
                    };
                    if counts && requested {
                        build.expected_built.insert(artifact);
                    }
                    build.events.push((key, state));
                }
                build
            })
    }
}
