pub(crate) mod answers;
pub(crate) mod attempts;
pub(crate) mod enrollments;
pub(crate) mod exams;
pub(crate) mod health;
pub(crate) mod platform_settings;
pub(crate) mod progress;
pub(crate) mod questions;
pub(crate) mod results;
pub(crate) mod users;
