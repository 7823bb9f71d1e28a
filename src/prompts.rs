//! Prompt templates for the pipeline agents.
//!
//! Given the current pipeline state and an agent definition, these
//! functions produce the role instructions handed to the agent tool and
//! the model label to run it under. The state machine never inspects the
//! text.

use crate::agent::{AgentDefinition, AgentId};
use crate::pipeline::PipelineState;

/// A generated prompt plus the model identity to execute it with.
#[derive(Debug, Clone)]
pub struct AgentPrompt {
    pub model: String,
    pub text: String,
}

/// Build the full prompt for one agent against the current state.
pub fn build_agent_prompt(state: &PipelineState, def: &AgentDefinition) -> AgentPrompt {
    let mut prompt = String::new();

    prompt.push_str(&format!("# {} | handoff pipeline\n\n", def.title));
    prompt.push_str(role_preamble(def.id));
    prompt.push('\n');

    prompt.push_str("## Task\n\n");
    match &state.task_description {
        Some(task) => {
            prompt.push_str(task);
            prompt.push('\n');
        }
        None => prompt.push_str("(no task recorded; the pipeline has not been started)\n"),
    }
    prompt.push('\n');

    if !def.requires.is_empty() {
        prompt.push_str("## Upstream output\n\n");
        for upstream in def.requires {
            prompt.push_str(&format!("### From the {}\n\n", upstream.definition().title.to_lowercase()));
            match state.outputs.get(upstream) {
                Some(output) => {
                    prompt.push_str(output);
                    prompt.push('\n');
                }
                None => prompt.push_str("(not yet produced)\n"),
            }
            prompt.push('\n');
        }
    }

    prompt.push_str("## Deliverable\n\n");
    prompt.push_str(deliverable(def.id));

    AgentPrompt {
        model: def.model.to_string(),
        text: prompt,
    }
}

fn role_preamble(agent: AgentId) -> &'static str {
    match agent {
        AgentId::Planner => {
            "You are the planning agent. Break the task into a concrete,\n\
             ordered implementation plan: the files to touch, the changes to\n\
             make, and the order to make them in. Do not write code.\n"
        }
        AgentId::Implementer => {
            "You are the implementation agent. Execute the approved plan\n\
             exactly; where the plan is silent, follow the conventions\n\
             already present in the codebase.\n"
        }
        AgentId::Reviewer => {
            "You are the review agent. Re-read the plan and the\n\
             implementation with fresh eyes and report defects,\n\
             divergences from the plan, and risks. Do not fix anything.\n"
        }
        AgentId::Test => {
            "You are the test agent. Exercise the implemented changes and\n\
             report what passes and what fails, with enough detail to act\n\
             on each failure.\n"
        }
    }
}

fn deliverable(agent: AgentId) -> &'static str {
    match agent {
        AgentId::Planner => "A numbered implementation plan, one step per change.\n",
        AgentId::Implementer => {
            "A summary of every change made, grouped by file, noting any\n\
             deliberate departure from the plan.\n"
        }
        AgentId::Reviewer => {
            "A findings list ordered by severity; state explicitly when\n\
             there are no findings.\n"
        }
        AgentId::Test => "A pass/fail report per test area, failures first.\n",
    }
}
