//! Ordered component lifecycle
//!
//! Components are constructed one by one, in the order they are added, each
//! constructor receiving handles to the components added before it. In
//! [`Mode::Run`] a component is started right after its construction. Any
//! failure stops the components already started, most recent first, and the
//! same reverse walk happens on termination.

use crate::error::LifecycleError;
use std::collections::VecDeque;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// A start or stop operation of a component.
pub type Hook<T> = fn(&T) -> anyhow::Result<()>;

/// Whether components are only validated or actually run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Construct every component, start none, never block.
    Check,
    /// Construct and start every component, then wait for termination.
    Run,
}

/// Name and capabilities of a component, fixed when it is registered.
pub struct Descriptor<T> {
    name: &'static str,
    start: Option<Hook<T>>,
    stop: Option<Hook<T>>,
}

impl<T> Descriptor<T> {
    /// A component without start or stop capability.
    pub fn new(name: &'static str) -> Self {
        Self { name, start: None, stop: None }
    }

    /// Set the operation run right after construction.
    pub fn start(mut self, hook: Hook<T>) -> Self {
        self.start = Some(hook);
        self
    }

    /// Set the operation run during unwind.
    pub fn stop(mut self, hook: Hook<T>) -> Self {
        self.stop = Some(hook);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn can_start(&self) -> bool {
        self.start.is_some()
    }

    pub fn can_stop(&self) -> bool {
        self.stop.is_some()
    }
}

struct Started {
    name: &'static str,
    stop: Option<Box<dyn FnOnce() -> anyhow::Result<()>>>,
}

/// Drives construction, start and reverse-order stop of components.
///
/// Dropping an orchestrator stops whatever is still running, so bailing out
/// of the wiring code with `?` never leaves components behind.
pub struct Orchestrator {
    mode: Mode,
    /// Started components, most recent first.
    started: VecDeque<Started>,
    constructed: Vec<&'static str>,
    /// Component whose construction or start failed. Nothing is added after it.
    failed: Option<&'static str>,
}

impl Orchestrator {
    pub fn new(mode: Mode) -> Self {
        Self { mode, started: VecDeque::new(), constructed: Vec::new(), failed: None }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Construct a component and, in run mode, start it.
    ///
    /// On failure, components started earlier are stopped before the error
    /// is returned. A component whose start fails is not stopped. Once a
    /// component has failed, later calls return an error without invoking
    /// their constructor.
    pub fn add<T, F>(&mut self, descriptor: Descriptor<T>, construct: F) -> Result<Arc<T>, LifecycleError>
    where
        T: 'static,
        F: FnOnce() -> anyhow::Result<T>,
    {
        let name = descriptor.name;
        if let Some(failed) = self.failed {
            return Err(LifecycleError::Construction {
                component: name,
                source: anyhow::anyhow!("{failed} component failed earlier"),
            });
        }
        let component = match construct() {
            Ok(component) => Arc::new(component),
            Err(source) => {
                self.failed = Some(name);
                self.unwind();
                return Err(LifecycleError::Construction { component: name, source });
            }
        };
        self.constructed.push(name);
        tracing::debug!("Initialized {} component", name);

        if self.mode == Mode::Check {
            return Ok(component);
        }

        if let Some(start) = descriptor.start {
            if let Err(source) = start(&component) {
                self.failed = Some(name);
                self.unwind();
                return Err(LifecycleError::Start { component: name, source });
            }
            tracing::debug!("Started {} component", name);
        }

        let stop = descriptor.stop.map(|hook| {
            let handle = Arc::clone(&component);
            Box::new(move || hook(&handle)) as Box<dyn FnOnce() -> anyhow::Result<()>>
        });
        self.started.push_front(Started { name, stop });
        Ok(component)
    }

    /// Names of the constructed components, in construction order.
    pub fn constructed(&self) -> &[&'static str] {
        &self.constructed
    }

    /// Names of the running components, in the order they will be stopped.
    pub fn running(&self) -> Vec<&'static str> {
        self.started.iter().map(|s| s.name).collect()
    }

    /// Block until `terminated` fires (or its sender goes away), then stop
    /// every component. Returns at once in check mode.
    pub fn run(mut self, terminated: &Receiver<()>) {
        if self.mode == Mode::Check {
            return;
        }
        // A closed channel means nobody can ask for termination anymore.
        let _ = terminated.recv();
        tracing::info!("Stopping all components");
        self.shutdown();
    }

    /// Stop every running component, most recent first.
    ///
    /// Stop failures are logged and returned; they never interrupt the walk.
    pub fn shutdown(&mut self) -> Vec<LifecycleError> {
        let mut failures = Vec::new();
        while let Some(Started { name, stop }) = self.started.pop_front() {
            let Some(stop) = stop else {
                continue;
            };
            match stop() {
                Ok(()) => tracing::debug!("Stopped {} component", name),
                Err(source) => {
                    tracing::warn!("Unable to stop {} component, ignoring: {:#}", name, source);
                    failures.push(LifecycleError::Stop { component: name, source });
                }
            }
        }
        failures
    }

    fn unwind(&mut self) {
        let failures = self.shutdown();
        if !failures.is_empty() {
            tracing::debug!("{} component(s) failed to stop during unwind", failures.len());
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if !self.started.is_empty() {
            self.shutdown();
        }
    }
}
