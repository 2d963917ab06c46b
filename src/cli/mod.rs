// CLI module
// Interactive terminal front end for the prompt chain

mod workflow;

pub use workflow::{preview, InteractiveWorkflow, Prompter, TerminalPrompter, WorkflowOutcome};
