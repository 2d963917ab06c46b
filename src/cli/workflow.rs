// Interactive terminal workflow
//
// Walks one session through all six stages. Planning stages loop on user
// feedback until "done"; code stages loop over step numbers. A failed
// generation is reported and can be retried; the state is left as it was.

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::chain::{ChainError, PipelineState, PromptChain, Stage};
use crate::config::constants::PREVIEW_CHARS;

/// Line-oriented user interaction
pub trait Prompter {
    /// Read one line. `Ok(None)` means the user closed input (Ctrl-D / Ctrl-C).
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Show text to the user
    fn show(&mut self, text: &str);
}

/// rustyline-backed prompter with in-session history
pub struct TerminalPrompter {
    editor: DefaultEditor,
}

impl TerminalPrompter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl Prompter for TerminalPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn show(&mut self, text: &str) {
        println!("{}", text);
    }
}

/// How an interactive session ended
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    Completed(PipelineState),
    /// Input closed part-way; holds whatever was produced so far
    Cancelled(PipelineState),
}

#[derive(Debug, thiserror::Error)]
#[error("input closed")]
struct InputClosed;

#[derive(Debug, thiserror::Error)]
#[error("stage abandoned after a failed generation")]
struct Abandoned;

pub struct InteractiveWorkflow<P: Prompter> {
    chain: PromptChain,
    prompter: P,
    idea: String,
}

impl<P: Prompter> InteractiveWorkflow<P> {
    pub fn new(chain: PromptChain, prompter: P) -> Self {
        Self {
            chain,
            prompter,
            idea: String::new(),
        }
    }

    pub fn into_parts(self) -> (PromptChain, P) {
        (self.chain, self.prompter)
    }

    pub async fn run(&mut self) -> Result<WorkflowOutcome> {
        match self.run_stages().await {
            Ok(()) => Ok(WorkflowOutcome::Completed(self.chain.snapshot())),
            Err(e) if e.is::<InputClosed>() || e.is::<Abandoned>() => {
                self.prompter.show("\nWorkflow cancelled.");
                Ok(WorkflowOutcome::Cancelled(self.chain.snapshot()))
            }
            Err(e) => Err(e),
        }
    }

    async fn run_stages(&mut self) -> Result<()> {
        self.prompter.show("=== ITERATIVE PROMPT CHAIN ===\n");

        self.idea = self.ask_required("Describe your app idea: ")?;
        self.planning_stage(Stage::ProjectRequest).await?;

        self.prompter.show("\n=== PROJECT DETAILS ===");
        let rules = self.ask_required("Enter your project rules: ")?;
        let template = self.ask_required("Enter your starter template: ")?;
        self.chain.set_project_details(&rules, &template);

        self.planning_stage(Stage::TechnicalSpecification).await?;
        self.planning_stage(Stage::ImplementationPlan).await?;

        self.heading(Stage::Code);
        self.step_loop(Stage::Code).await?;

        if self.chain.state().has_generated_code() {
            self.planning_stage(Stage::OptimizationPlan).await?;

            self.heading(Stage::OptimizedCode);
            self.step_loop(Stage::OptimizedCode).await?;
        } else {
            self.prompter
                .show("\nNo code was generated, skipping optimization.");
        }

        let state = self.chain.state();
        let summary = format!(
            "\n=== WORKFLOW COMPLETE ===\nGenerated {} code step(s) and {} optimized step(s).",
            state.generated_code.len(),
            state.optimized_code.len()
        );
        self.prompter.show(&summary);
        Ok(())
    }

    /// A stage every later stage depends on; giving up on it ends the session
    async fn planning_stage(&mut self, stage: Stage) -> Result<()> {
        self.heading(stage);
        if self.refine(stage, 0).await? {
            Ok(())
        } else {
            Err(Abandoned.into())
        }
    }

    /// Generate once, then regenerate with feedback until the user accepts.
    ///
    /// Returns whether the stage holds an accepted output. `false` only when
    /// the user gave up before any generation succeeded.
    async fn refine(&mut self, stage: Stage, step: u32) -> Result<bool> {
        let mut feedback = String::new();
        let mut accepted = false;

        loop {
            match self.generate(stage, step, &feedback).await {
                Ok(output) => {
                    accepted = true;
                    self.show_output(stage, step, &output);
                    match self.feedback_for(stage, step)? {
                        Some(next) => feedback = next,
                        None => return Ok(true),
                    }
                }
                Err(e) => {
                    self.prompter.show(&format!("\nError: {}", e));
                    let line = self.ask("Press Enter to retry, or type 'done' to give up: ")?;
                    if line.trim().eq_ignore_ascii_case("done") {
                        return Ok(accepted);
                    }
                }
            }
        }
    }

    /// Repeatedly ask for a step number and refine that step
    async fn step_loop(&mut self, stage: Stage) -> Result<()> {
        let noun = step_noun(stage);
        loop {
            let line = self.ask(&format!(
                "Enter the {} number to generate (or 'done' to continue): ",
                noun
            ))?;
            if is_done(&line) {
                return Ok(());
            }

            match line.trim().parse::<u32>() {
                Ok(step) if step > 0 => {
                    self.refine(stage, step).await?;
                }
                _ => self.prompter.show("Please enter a positive step number."),
            }
        }
    }

    async fn generate(
        &mut self,
        stage: Stage,
        step: u32,
        feedback: &str,
    ) -> Result<String, ChainError> {
        match stage {
            Stage::ProjectRequest => {
                self.chain
                    .generate_project_request(&self.idea, feedback)
                    .await
            }
            Stage::TechnicalSpecification => {
                self.chain.generate_technical_specification(feedback).await
            }
            Stage::ImplementationPlan => self.chain.generate_implementation_plan(feedback).await,
            Stage::Code => self.chain.generate_code_for_step(step, feedback).await,
            Stage::OptimizationPlan => self.chain.generate_optimization_plan(feedback).await,
            Stage::OptimizedCode => {
                self.chain
                    .generate_optimized_code_for_step(step, feedback)
                    .await
            }
        }
    }

    /// `None` once the user types "done" or an empty line
    fn feedback_for(&mut self, stage: Stage, step: u32) -> Result<Option<String>> {
        let prompt = match stage {
            Stage::Code | Stage::OptimizedCode => format!(
                "Feedback on {} {} (Enter or 'done' to accept): ",
                step_noun(stage),
                step
            ),
            _ => format!("Feedback on the {} (or 'done' to finalize): ", stage),
        };

        let line = self.ask(&prompt)?;
        Ok((!is_done(&line)).then(|| line.trim().to_string()))
    }

    fn heading(&mut self, stage: Stage) {
        let title = format!(
            "\n=== STEP {}: {} ===",
            stage.number(),
            stage.to_string().to_uppercase()
        );
        self.prompter.show(&title);
    }

    fn show_output(&mut self, stage: Stage, step: u32, output: &str) {
        let label = match stage {
            Stage::Code | Stage::OptimizedCode => format!("{} {}", step_noun(stage), step),
            _ => stage.to_string(),
        };
        let text = format!("\n--- {} ---\n{}", label, preview(output, PREVIEW_CHARS));
        self.prompter.show(&text);
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        self.prompter
            .read_line(prompt)?
            .ok_or_else(|| InputClosed.into())
    }

    /// Ask until the answer is non-empty
    fn ask_required(&mut self, prompt: &str) -> Result<String> {
        loop {
            let line = self.ask(prompt)?;
            if !line.trim().is_empty() {
                return Ok(line.trim().to_string());
            }
        }
    }
}

fn step_noun(stage: Stage) -> &'static str {
    match stage {
        Stage::OptimizedCode => "optimization step",
        _ => "implementation step",
    }
}

fn is_done(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.eq_ignore_ascii_case("done")
}

/// First `limit` characters, with a note when truncated
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!(
            "{}...\n(truncated, {} characters total)",
            &text[..cut],
            text.chars().count()
        ),
        None => text.to_string(),
    }
}
