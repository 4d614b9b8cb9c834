pub(crate) mod auth;
pub(crate) mod credits;
pub(crate) mod jobs;
pub(crate) mod workers;
