use crate::cli::CommandLineArgs;
use crate::dataset::DatasetSource;
use crate::error::DataServerError;
use crate::resource_manager::ResourceManager;

use std::sync::Arc;

/// Shared application state passed to each operation request handler.
pub struct AppState {
    /// Command line arguments.
    pub args: CommandLineArgs,

    /// Resource manager.
    pub resource_manager: ResourceManager,

    /// Opens the dataset for each request.
    pub source: Arc<dyn DatasetSource>,
}

impl AppState {
    /// Create and return an [AppState].
    pub fn new(args: &CommandLineArgs, source: Arc<dyn DatasetSource>) -> Self {
        let task_limit = args
            .thread_limit
            .or_else(|| Some(num_cpus::get().saturating_sub(1).max(1)));
        let resource_manager = ResourceManager::new(task_limit);

        Self {
            args: args.clone(),
            resource_manager,
            source,
        }
    }

    /// Check that a variable may be served.
    pub fn check_variable(&self, variable: &str) -> Result<(), DataServerError> {
        if self.args.variables.iter().any(|allowed| allowed == variable) {
            Ok(())
        } else {
            Err(DataServerError::UnknownVariable {
                variable: variable.to_string(),
            })
        }
    }
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::ErrorKind;
    use clap::Parser;

    #[test]
    fn variable_allow_list() {
        let args =
            CommandLineArgs::try_parse_from(["diversity-server", "--variables", "sd_values"])
                .unwrap();
        let state = AppState::new(&args, Arc::new(crate::test_utils::test_dataset()));
        state.check_variable("sd_values").unwrap();
        let error = state.check_variable("mean_values").unwrap_err();
        assert_eq!(ErrorKind::UnknownVariable, error.kind());
    }
}
