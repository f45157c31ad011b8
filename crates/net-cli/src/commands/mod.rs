//! CLI commands

pub mod request;
pub mod show;
pub mod status;
pub mod validate;

pub use request::RequestCommand;
pub use show::ShowCommand;
pub use status::StatusCommand;
pub use validate::ValidateCommand;

/// What a command prints and how the process should exit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub output: String,
    pub success: bool,
}

impl Outcome {
    pub fn new(output: impl Into<String>, success: bool) -> Self {
        Self {
            output: output.into(),
            success,
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.success {
            0
        } else {
            1
        }
    }
}
