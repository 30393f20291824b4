use tracing::{error, trace};
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{Event, EventTarget};

/// Keeps a DOM event listener registered for as long as it is alive.
///
/// The closure is removed from the target before it is freed, so the listener can't be
/// called into after drop.
pub struct EventListener {
	target: EventTarget,
	event: &'static str,
	closure: Closure<dyn FnMut(Event)>,
}
impl core::fmt::Debug for EventListener {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("EventListener").field("target", &self.target).field("event", &self.event).finish_non_exhaustive()
	}
}
impl EventListener {
	pub fn new(target: &EventTarget, event: &'static str, handler: impl FnMut(Event) + 'static) -> Self {
		let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
		if let Err(error) = target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()) {
			error!("Failed to add {:?} listener: {:?}", event, error);
		} else {
			trace!("Added {:?} listener.", event);
		}
		Self {
			target: target.clone(),
			event,
			closure,
		}
	}
}
impl Drop for EventListener {
	fn drop(&mut self) {
		match self.target.remove_event_listener_with_callback(self.event, self.closure.as_ref().unchecked_ref()) {
			Ok(()) => trace!("Removed {:?} listener.", self.event),
			Err(error) => error!("Failed to remove {:?} listener: {:?}", self.event, error),
		}
	}
}
