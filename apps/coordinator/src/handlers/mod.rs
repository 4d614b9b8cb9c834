//! The HTTP Surface (§6): thin translators between external requests and
//! the Store/CreditEngine/Registry/Scheduler/Queue underneath. Handlers
//! validate at the boundary (§6 validation rules) and otherwise do no more
//! than one or two calls into the components they front.

pub mod credits;
pub mod jobs;
pub mod system;
pub mod workers;
pub mod ws;
