pub mod controller;
pub mod error;
pub mod scoring;
pub mod state;

pub use controller::{ExamController, ExamEvent, SubmissionOutcome, SubmitTrigger};
pub use error::{ExamError, ExamResult};
pub use scoring::{compute_scores, review, ReviewItem, ScoreReport, SectionReview, SectionScore, Verdict};
pub use state::{
    Direction, ExamSession, ExamSnapshot, ExamStatus, FlaggedQuestion, NavOutcome,
    SectionProgress, SectionSummary,
};
