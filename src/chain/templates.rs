// Stage template registry
//
// One prompt template per pipeline stage. Placeholders are `{name}` where
// `name` is a lowercase identifier; any other brace group (`{Project Name}`)
// is literal text that the model is expected to fill in.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::SamplingRole;

/// A named step of the pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ProjectRequest,
    TechnicalSpecification,
    ImplementationPlan,
    Code,
    OptimizationPlan,
    OptimizedCode,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::ProjectRequest,
        Stage::TechnicalSpecification,
        Stage::ImplementationPlan,
        Stage::Code,
        Stage::OptimizationPlan,
        Stage::OptimizedCode,
    ];

    /// 1-based position in the pipeline
    pub fn number(self) -> u8 {
        match self {
            Stage::ProjectRequest => 1,
            Stage::TechnicalSpecification => 2,
            Stage::ImplementationPlan => 3,
            Stage::Code => 4,
            Stage::OptimizationPlan => 5,
            Stage::OptimizedCode => 6,
        }
    }

    /// Machine name, as accepted by `/full-workflow`
    pub fn key(self) -> &'static str {
        match self {
            Stage::ProjectRequest => "project_request",
            Stage::TechnicalSpecification => "technical_specification",
            Stage::ImplementationPlan => "implementation_plan",
            Stage::Code => "code",
            Stage::OptimizationPlan => "optimization_plan",
            Stage::OptimizedCode => "optimized_code",
        }
    }

    pub fn role(self) -> SamplingRole {
        match self {
            Stage::Code | Stage::OptimizedCode => SamplingRole::Implementation,
            _ => SamplingRole::Planning,
        }
    }

    pub fn template(self) -> &'static StageTemplate {
        &TEMPLATES[usize::from(self.number() - 1)]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ProjectRequest => "project request",
            Stage::TechnicalSpecification => "technical specification",
            Stage::ImplementationPlan => "implementation plan",
            Stage::Code => "code",
            Stage::OptimizationPlan => "optimization plan",
            Stage::OptimizedCode => "optimized code",
        };
        f.write_str(name)
    }
}

/// Unrecognised stage name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown step: {0}")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.key() == s)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("no value for {{{placeholder}}} in the {stage} template")]
    MissingInput { stage: Stage, placeholder: String },
}

/// Prompt text plus the inputs it declares
#[derive(Debug)]
pub struct StageTemplate {
    pub stage: Stage,
    pub inputs: &'static [&'static str],
    pub body: &'static str,
}

impl StageTemplate {
    /// Substitute every declared input in one left-to-right pass.
    ///
    /// Substituted values are never re-scanned, so a value containing
    /// `{idea}` is inserted verbatim.
    pub fn render(&self, values: &HashMap<&str, &str>) -> Result<String, TemplateError> {
        if let Some(missing) = self.inputs.iter().find(|name| !values.contains_key(*name)) {
            return Err(TemplateError::MissingInput {
                stage: self.stage,
                placeholder: missing.to_string(),
            });
        }

        let value_len: usize = values.values().map(|v| v.len()).sum();
        let mut out = String::with_capacity(self.body.len() + value_len);
        let mut rest = self.body;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            let substituted = after.find('}').and_then(|close| {
                let name = &after[..close];
                if !self.inputs.contains(&name) {
                    return None;
                }
                values.get(name).map(|value| (*value, close))
            });

            match substituted {
                Some((value, close)) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);

        Ok(out)
    }
}

static TEMPLATES: [StageTemplate; 6] = [
    StageTemplate {
        stage: Stage::ProjectRequest,
        inputs: &["idea", "feedback"],
        body: PROJECT_REQUEST,
    },
    StageTemplate {
        stage: Stage::TechnicalSpecification,
        inputs: &["project_request", "project_rules", "starter_template", "feedback"],
        body: TECHNICAL_SPECIFICATION,
    },
    StageTemplate {
        stage: Stage::ImplementationPlan,
        inputs: &[
            "project_request",
            "project_rules",
            "technical_specification",
            "starter_template",
            "feedback",
        ],
        body: IMPLEMENTATION_PLAN,
    },
    StageTemplate {
        stage: Stage::Code,
        inputs: &[
            "project_request",
            "project_rules",
            "technical_specification",
            "implementation_plan",
            "existing_code",
            "current_step",
            "feedback",
        ],
        body: CODE_GENERATOR,
    },
    StageTemplate {
        stage: Stage::OptimizationPlan,
        inputs: &[
            "project_request",
            "project_rules",
            "technical_specification",
            "implementation_plan",
            "existing_code",
            "feedback",
        ],
        body: OPTIMIZATION_PLANNER,
    },
    StageTemplate {
        stage: Stage::OptimizedCode,
        inputs: &[
            "optimization_plan",
            "existing_code",
            "current_optimization_step",
            "feedback",
        ],
        body: OPTIMIZATION_GENERATOR,
    },
];

const PROJECT_REQUEST: &str = r#"## 1. Project Request Generator

I have a web app idea I'd like to develop. Here's my initial concept:

{idea}

I'm looking to collaborate with you to turn this into a detailed project request. Let's iterate together until we have a complete request that I find to be complete.

{feedback}

Please return the current state of the request in this format:

```request
# Project Name
## Project Description
[Description]

## Target Audience
[Target users]

## Desired Features
### [Feature Category]
- [ ] [Requirement]
    - [ ] [Sub-requirement]

## Design Requests
- [ ] [Design requirement]
    - [ ] [Design detail]

## Other Notes
- [Additional considerations]
```

Please:
1. Ask me questions about any areas that need more detail
2. Suggest features or considerations I might have missed
3. Help me organize requirements logically
4. Show me the current state of the spec
5. Flag any potential technical challenges or important decisions
"#;

const TECHNICAL_SPECIFICATION: &str = r#"## 2. Technical Specification Generator

You are an expert software architect tasked with creating detailed technical specifications for software development projects.

Your specifications will be used as direct input for planning & code generation AI systems, so they must be precise, structured, and comprehensive.

First, carefully review the project request:

<project_request>
{project_request}
</project_request>

Next, carefully review the project rules:

<project_rules>
{project_rules}
</project_rules>

Finally, carefully review the starter template:

<starter_template>
{starter_template}
</starter_template>

User feedback on previous iteration (if any):
{feedback}

Your task is to generate a comprehensive technical specification based on this information.

Begin with your specification planning, considering:
1. Core system architecture and key workflows
2. Project structure and organization
3. Detailed feature specifications
4. Database schema design
5. Server actions and integrations
6. Design system and component architecture
7. Authentication and authorization implementation
8. Data flow and state management
9. Payment implementation
10. Analytics implementation
11. Testing strategy

Then generate the technical specification using this markdown structure:

```markdown
# {Project Name} Technical Specification

## 1. System Overview
- Core purpose and value proposition
- Key workflows
- System architecture

## 2. Project Structure
- Detailed breakdown of project structure & organization

## 3. Feature Specification
For each feature:
### 3.1 Feature Name
- User story and requirements
- Detailed implementation steps
- Error handling and edge cases

## 4. Database Schema
### 4.1 Tables
For each table:
- Complete table schema (field names, types, constraints)
- Relationships and indexes

## 5. Server Actions
### 5.1 Database Actions
For each action:
- Detailed description of the action
- Input parameters and return values
- SQL queries or ORM operations

### 5.2 Other Actions
- External API integrations (endpoints, authentication, data formats)
- File handling procedures
- Data processing algorithms

## 6. Design System
### 6.1 Visual Style
- Color palette (with hex codes)
- Typography (font families, sizes, weights)
- Component styling patterns
- Spacing and layout principles

### 6.2 Core Components
- Layout structure (with examples)
- Navigation patterns
- Shared components (with props and usage examples)
- Interactive states (hover, active, disabled)

## 7. Component Architecture
### 7.1 Server Components
- Data fetching strategy
- Suspense boundaries
- Error handling
- Props interface (with TypeScript types)

### 7.2 Client Components
- State management approach
- Event handlers
- UI interactions
- Props interface (with TypeScript types)

## 8. Authentication & Authorization
- Clerk implementation details
- Protected routes configuration
- Session management strategy

## 9. Data Flow
- Server/client data passing mechanisms
- State management architecture

## 10. Stripe Integration
- Payment flow diagram
- Webhook handling process
- Product/Price configuration details

## 11. PostHog Analytics
- Analytics strategy
- Event tracking implementation
- Custom property definitions

## 12. Testing
- Unit tests with Jest (example test cases)
- e2e tests with Playwright (key user flows to test)
```

Ensure that your specification is extremely detailed, providing specific implementation guidance wherever possible. Include concrete examples for complex features and clearly define interfaces between components.
"#;

const IMPLEMENTATION_PLAN: &str = r#"## 3. Implementation Plan Generator

You are an AI task planner responsible for breaking down a complex web application development project into manageable steps.

Your goal is to create a detailed, step-by-step plan that will guide the code generation process for building a fully functional web application based on a provided technical specification.

First, carefully review the following inputs:

<project_request>
{project_request}
</project_request>

<project_rules>
{project_rules}
</project_rules>

<technical_specification>
{technical_specification}
</technical_specification>

<starter_template>
{starter_template}
</starter_template>

User feedback on previous iteration (if any):
{feedback}

After reviewing these inputs, your task is to create a comprehensive, detailed plan for implementing the web application.

Begin with your brainstorming, then create a detailed implementation plan in the format:

```md
# Implementation Plan

## [Section Name]
- [ ] Step 1: [Brief title]
  - **Task**: [Detailed explanation of what needs to be implemented]
  - **Files**: [Maximum of 20 files, ideally less]
    - `path/to/file1.ts`: [Description of changes]
  - **Step Dependencies**: [Step Dependencies]
  - **User Instructions**: [Instructions for User]
```

Ensure each step is atomic, builds logically on previous steps, and can be implemented in a single iteration.
"#;

const CODE_GENERATOR: &str = r#"## 4. Code Generator

You are an AI code generator responsible for implementing a web application based on a provided technical specification and implementation plan.

Your task is to systematically implement each step of the plan, one at a time.

First, carefully review the following inputs:

<project_request>
{project_request}
</project_request>

<project_rules>
{project_rules}
</project_rules>

<technical_specification>
{technical_specification}
</technical_specification>

<implementation_plan>
{implementation_plan}
</implementation_plan>

<existing_code>
{existing_code}
</existing_code>

<feedback>
{feedback}
</feedback>

Your task is to:
1. Implement step #{current_step} from the implementation plan
2. Generate the necessary code for all files specified in that step
3. Return the generated code using the XML format

For EVERY file you modify or create, provide the COMPLETE file contents using this XML structure:

```xml
<code_changes>
  <changed_files>
    <file>
      <file_operation>CREATE or UPDATE or DELETE</file_operation>
      <file_path>path/to/file</file_path>
      <file_code><![CDATA[
/**
 * Complete file contents with extensive documentation
 */
// Complete implementation with inline comments & documentation...
]]></file_code>
    </file>
    <!-- Additional files as needed -->
  </changed_files>
</code_changes>
```

Include comprehensive documentation:
- File-level purpose and scope
- Component/function-level documentation
- Inline comments for complex logic
- Type documentation for interfaces and types
- Notes about edge cases and error handling

After the code, include:
- "STEP {current_step} COMPLETE" with an explanation of what you did
- User instructions for any manual steps required
"#;

const OPTIMIZATION_PLANNER: &str = r#"## 5. Code Optimization Planner

You are an expert code reviewer and optimizer responsible for analyzing the implemented code and creating a detailed optimization plan.

Please review the following context and implementation:

<project_request>
{project_request}
</project_request>

<project_rules>
{project_rules}
</project_rules>

<technical_specification>
{technical_specification}
</technical_specification>

<implementation_plan>
{implementation_plan}
</implementation_plan>

<existing_code>
{existing_code}
</existing_code>

<feedback>
{feedback}
</feedback>

First, analyze the implemented code against the original requirements and plan, considering:
1. Code Organization and Structure
2. Code Quality and Best Practices
3. UI/UX Improvements

Then create a detailed optimization plan using the following format:

```md
# Optimization Plan
## [Category Name]
- [ ] Step 1: [Brief title]
  - **Task**: [Detailed explanation of what needs to be optimized/improved]
  - **Files**: [List of files]
    - `path/to/file1.ts`: [Description of changes]
  - **Step Dependencies**: [Any steps that must be completed first]
  - **User Instructions**: [Any manual steps required]
```

Focus on specific, concrete improvements with manageable changes (no more than 20 files per step, ideally less).
"#;

const OPTIMIZATION_GENERATOR: &str = r#"## 6. Code Optimization Generator

You are an AI code optimizer responsible for implementing the optimization steps identified in the optimization plan.

Your task is to systematically implement each optimization step, one at a time.

<optimization_plan>
{optimization_plan}
</optimization_plan>

<existing_code>
{existing_code}
</existing_code>

<feedback>
{feedback}
</feedback>

Your task is to:
1. Implement optimization step #{current_optimization_step} from the optimization plan
2. Generate the optimized code for all files specified in that step
3. Return the optimized code using the XML format

For EVERY file you modify, provide the COMPLETE file contents using this XML structure:

```xml
<code_changes>
  <changed_files>
    <file>
      <file_operation>UPDATE</file_operation>
      <file_path>path/to/file</file_path>
      <file_code><![CDATA[
/**
 * Complete optimized file contents with extensive documentation
 */
// Complete implementation with inline comments explaining optimizations...
]]></file_code>
    </file>
    <!-- Additional files as needed -->
  </changed_files>
</code_changes>
```

After the code, include:
- "OPTIMIZATION STEP {current_optimization_step} COMPLETE" with an explanation of the optimizations
- Details on the improvements made and their benefits
- User instructions for any manual steps required
"#;
