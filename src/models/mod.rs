mod progress;
mod question;
mod session;
mod user;

pub use progress::{CategoryProgress, GeneralProgress, ProgressReport, accuracy_percentage};
pub use question::{CategoryCount, Question, QuestionPayload};
pub use session::{PracticeSession, QuizMode, SessionPayload};
pub use user::{User, UserPayload, validate_email_format};
