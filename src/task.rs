/// Schedules work on the host's macrotask queue.
///
/// Microtasks aren't good enough here: host routers settle their internal state across several microtasks,
/// so anything queued as one would observe them half-way through.
pub trait TaskQueue {
	fn queue_macrotask(&self, task: Box<dyn FnOnce()>);
}
