pub(crate) mod answer_capture;
pub(crate) mod attempt_error;
pub(crate) mod attempt_finalize;
pub(crate) mod attempt_paper;
pub(crate) mod attempt_timing;
pub(crate) mod eligibility;
pub(crate) mod option_order;
pub(crate) mod reconstruction;
pub(crate) mod scoring;
pub(crate) mod shuffle;
