pub mod answers;
pub mod ats;
pub mod catalog;
pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod fill;
pub mod filler;
pub mod frame;
pub mod matching;
pub mod page;
pub mod profile;
pub mod resolve;
pub mod submission;

pub use answers::{AnswerStore, CustomAnswer, CustomAnswers, PendingQuestion, YamlAnswerStore};
pub use ats::{Ats, AtsDetection};
pub use catalog::{FieldCategory, FieldType};
pub use config::{FillerBuilder, FillerConfig};
pub use document::{Document, FramePath, Locator};
pub use error::{Error, Result};
pub use extract::{ControlKind, FormField};
pub use filler::{ApplicationReport, FilledField, FormFiller};
pub use page::Page;
pub use profile::Profile;
pub use resolve::{AnswerBackend, AnswerRequest, ValueSource};
pub use submission::{wait_for_submission, Submission};
