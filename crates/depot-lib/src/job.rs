//! Cancellable, weighted, hierarchical progress reporting.
//!
//! A [`Job`] is one node in a progress tree. Each logical stage of a
//! long running operation gets a sub job with a weight, the fraction of
//! the parent it accounts for; completing the sub job moves the parent
//! by exactly that fraction. The first error recorded anywhere in the
//! tree bubbles to the root and wins, cancellation is a cooperative
//! flag the worker polls between steps.
//!
//! Monitors observe a job through [`Job::subscribe`], a watch channel
//! carrying [`JobSnapshot`] values, rather than by polling the tree.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

/// Point-in-time view of a job published to subscribers.
#[derive(Debug, Clone, Default)]
pub struct JobSnapshot {
	/// Completed fraction in `[0, 1]`.
	pub progress: f64,
	/// Human readable description of the current step.
	pub hint: String,
	/// First error recorded, if any.
	pub error: Option<String>,
}

#[derive(Clone)]
pub struct Job {
	inner: Arc<Inner>,
}

struct Inner {
	state: Mutex<State>,
	cancelled: AtomicBool,
	parent: Option<Parent>,
	notify: watch::Sender<JobSnapshot>,
}

#[derive(Default)]
struct State {
	progress: f64,
	hint: String,
	error: Option<String>,
}

struct Parent {
	inner: Arc<Inner>,
	weight: f64,
	/// Parent progress at the time this sub job was created.
	base: f64,
}

impl Default for Job {
	fn default() -> Self {
		Self::new()
	}
}

impl Job {
	pub fn new() -> Self {
		let (notify, _) = watch::channel(JobSnapshot::default());
		Job {
			inner: Arc::new(Inner {
				state: Mutex::new(State::default()),
				cancelled: AtomicBool::new(false),
				parent: None,
				notify,
			}),
		}
	}

	/// Creates a child accounting for `weight` of this job's remaining progress.
	///
	/// The child's progress runs `[0, 1]` like any job; the parent moves
	/// from its current position by `weight * child progress`.
	pub fn sub_job(&self, weight: f64, hint: &str) -> Job {
		let base = self.progress();
		let (notify, _) = watch::channel(JobSnapshot::default());
		let sub = Job {
			inner: Arc::new(Inner {
				state: Mutex::new(State::default()),
				cancelled: AtomicBool::new(false),
				parent: Some(Parent { inner: self.inner.clone(), weight, base }),
				notify,
			}),
		};
		sub.set_hint(hint);
		sub
	}

	pub fn progress(&self) -> f64 {
		self.inner.state.lock().expect("job mutex poisoned").progress
	}

	pub fn set_progress(&self, progress: f64) {
		self.inner.set_progress(progress);
	}

	/// Moves progress forward by `delta`.
	pub fn add_progress(&self, delta: f64) {
		self.inner.set_progress(self.progress() + delta);
	}

	pub fn hint(&self) -> String {
		self.inner.state.lock().expect("job mutex poisoned").hint.clone()
	}

	/// Sets the current step description on this job and every ancestor,
	/// so root subscribers always see the active step.
	pub fn set_hint(&self, hint: &str) {
		let mut node = Some(&self.inner);
		while let Some(inner) = node {
			inner.state.lock().expect("job mutex poisoned").hint = hint.to_string();
			inner.publish();
			node = inner.parent.as_ref().map(|p| &p.inner);
		}
	}

	pub fn error_message(&self) -> Option<String> {
		self.inner.state.lock().expect("job mutex poisoned").error.clone()
	}

	/// Records an error on this job and every ancestor. The first error
	/// recorded at each node wins, later ones are dropped.
	pub fn set_error(&self, message: &str) {
		let mut node = Some(&self.inner);
		while let Some(inner) = node {
			{
				let mut state = inner.state.lock().expect("job mutex poisoned");
				if state.error.is_none() {
					state.error = Some(message.to_string());
				}
			}
			inner.publish();
			node = inner.parent.as_ref().map(|p| &p.inner);
		}
	}

	/// Signals cancellation for the whole tree. Idempotent.
	pub fn cancel(&self) {
		self.inner.root().cancelled.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.inner.root().cancelled.load(Ordering::SeqCst)
	}

	/// Whether the worker should keep dispatching steps: not cancelled
	/// and no error recorded on this node.
	pub fn should_proceed(&self) -> bool {
		!self.is_cancelled() && self.error_message().is_none()
	}

	/// Watch channel observing this node. Root subscriptions see all
	/// bubbled progress, hints and errors.
	pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
		self.inner.notify.subscribe()
	}
}

impl Inner {
	fn set_progress(&self, progress: f64) {
		let progress = progress.clamp(0.0, 1.0);
		self.state.lock().expect("job mutex poisoned").progress = progress;
		self.publish();
		if let Some(parent) = &self.parent {
			parent.inner.set_progress(parent.base + parent.weight * progress);
		}
	}

	fn publish(&self) {
		let state = self.state.lock().expect("job mutex poisoned");
		self.notify.send_replace(JobSnapshot {
			progress: state.progress,
			hint: state.hint.clone(),
			error: state.error.clone(),
		});
	}

	fn root(&self) -> &Inner {
		let mut node = self;
		while let Some(parent) = &node.parent {
			node = &*parent.inner;
		}
		node
	}
}

impl std::fmt::Debug for Job {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Job")
			.field("progress", &self.progress())
			.field("hint", &self.hint())
			.field("error", &self.error_message())
			.field("cancelled", &self.is_cancelled())
			.finish()
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn sub_job_moves_parent_by_weight() {
		let job = Job::new();
		let sub = job.sub_job(0.7, "downloading");
		sub.set_progress(0.5);
		assert!((job.progress() - 0.35).abs() < 1e-9);
		sub.set_progress(1.0);
		assert!((job.progress() - 0.7).abs() < 1e-9);
	}

	#[test]
	fn later_sub_jobs_start_from_current_progress() {
		let job = Job::new();
		job.sub_job(0.5, "first").set_progress(1.0);
		job.sub_job(0.5, "second").set_progress(1.0);
		assert!((job.progress() - 1.0).abs() < 1e-9);
	}

	#[test]
	fn nested_sub_jobs_compose() {
		let job = Job::new();
		let sub = job.sub_job(0.5, "outer");
		let subsub = sub.sub_job(0.5, "inner");
		subsub.set_progress(1.0);
		assert!((job.progress() - 0.25).abs() < 1e-9);
	}

	#[test]
	fn first_error_wins() {
		let job = Job::new();
		let sub = job.sub_job(0.5, "step");
		sub.set_error("first");
		job.sub_job(0.5, "other").set_error("second");
		assert_eq!(job.error_message().as_deref(), Some("first"));
		assert!(!job.should_proceed());
	}

	#[test]
	fn cancel_reaches_the_whole_tree() {
		let job = Job::new();
		let sub = job.sub_job(0.5, "step");
		sub.cancel();
		assert!(job.is_cancelled());
		assert!(sub.is_cancelled());
		/* idempotent */
		job.cancel();
		assert!(job.is_cancelled());
	}

	#[test]
	fn hints_bubble_to_the_root() {
		let job = Job::new();
		let sub = job.sub_job(0.5, "downloading a.B 1.0");
		assert_eq!(job.hint(), "downloading a.B 1.0");
		sub.set_hint("unpacking a.B 1.0");
		assert_eq!(job.hint(), "unpacking a.B 1.0");
	}

	#[test]
	fn subscribers_see_updates() {
		let job = Job::new();
		let rx = job.subscribe();
		job.set_progress(0.25);
		assert!((rx.borrow().progress - 0.25).abs() < 1e-9);
	}

	#[test]
	fn progress_is_clamped() {
		let job = Job::new();
		job.set_progress(1.5);
		assert!((job.progress() - 1.0).abs() < 1e-9);
	}
}
