use std::future::Future;
use std::sync::OnceLock;

use tokio::task::{JoinError, JoinHandle};
use tracing::Instrument;

use crate::{RequestId, TaskClass};

fn runtime_handle() -> tokio::runtime::Handle {
	if let Ok(handle) = tokio::runtime::Handle::try_current() {
		return handle;
	}

	static GLOBAL_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	let runtime = GLOBAL_RT.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(2)
			.thread_name("tagflow-worker-global")
			.build()
			.expect("failed to build tagflow-worker global tokio runtime")
	});
	runtime.handle().clone()
}

/// Spawns an async task for `request`.
///
/// The task runs inside a `worker.task` span carrying the class and request
/// id, so events it emits can be attributed to the request.
pub fn spawn<F>(class: TaskClass, request: RequestId, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), %request, "worker.spawn");
	runtime_handle().spawn(fut.instrument(task_span(class, request)))
}

/// Spawns blocking work for `request` on the blocking pool.
pub fn spawn_blocking<F, R>(class: TaskClass, request: RequestId, f: F) -> JoinHandle<R>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), %request, "worker.spawn_blocking");
	let span = task_span(class, request);
	runtime_handle().spawn_blocking(move || span.in_scope(f))
}

fn task_span(class: TaskClass, request: RequestId) -> tracing::Span {
	tracing::trace_span!("worker.task", worker_class = class.as_str(), %request)
}

/// Extracts the panic message from a failed join, if the task panicked.
pub fn join_error_panic_message(err: JoinError) -> Option<String> {
	let payload = err.try_into_panic().ok()?;
	if let Some(s) = payload.downcast_ref::<&'static str>() {
		return Some((*s).to_string());
	}
	if let Some(s) = payload.downcast_ref::<String>() {
		return Some(s.clone());
	}
	Some("<non-string panic payload>".to_string())
}
