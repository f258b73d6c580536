use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub const SUMMARY_FILE: &str = "summary.txt";
pub const PROFILE_FILE: &str = "profile.txt";

/// The static context the chatbot represents: the person's name, a short
/// summary, and their pre-extracted profile document. Read once at process
/// start and immutable for the process lifetime; a load failure is fatal at
/// startup, never a per-turn error.
#[derive(Debug, Clone)]
pub struct ProfileContext {
    pub name: String,
    pub summary: String,
    pub profile: String,
}

impl ProfileContext {
    pub fn new(name: String, summary: String, profile: String) -> Self {
        Self {
            name,
            summary,
            profile,
        }
    }

    /// Load `summary.txt` and `profile.txt` from the given directory.
    pub fn load(name: &str, dir: &Path) -> Result<Self> {
        let summary_path = dir.join(SUMMARY_FILE);
        let summary = fs::read_to_string(&summary_path)
            .with_context(|| format!("Failed to read summary from {}", summary_path.display()))?;

        let profile_path = dir.join(PROFILE_FILE);
        let profile = fs::read_to_string(&profile_path)
            .with_context(|| format!("Failed to read profile from {}", profile_path.display()))?;

        Ok(Self::new(name.to_string(), summary, profile))
    }

    /// The instructions the chatbot answers under.
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are acting as {name}. You are answering questions on {name}'s website, \
particularly questions related to {name}'s career, background, skills and experience. \
Your responsibility is to represent {name} for interactions on the website as faithfully as possible. \
You are given a summary of {name}'s background and profile which you can use to answer questions. \
Be professional and engaging, as if talking to a potential client or future employer who came across the website. \
If you don't know the answer to any question, use your record_unknown_question tool to record the question that you couldn't answer, even if it's about something trivial or unrelated to career. \
If the user is engaging in discussion, try to steer them towards getting in touch via email; ask for their email and record it using your record_user_details tool.",
            name = self.name
        );
        prompt.push_str(&format!(
            "\n\n## Summary:\n{}\n\n## Profile:\n{}\n\n",
            self.summary, self.profile
        ));
        prompt.push_str(&format!(
            "With this context, please chat with the user, always staying in character as {}.",
            self.name
        ));
        prompt
    }

    /// The instructions the judge evaluates under.
    pub fn judge_system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are an evaluator that decides whether a response to a question is acceptable. \
You are provided with a conversation between a User and an Agent. Your task is to decide whether the Agent's latest response is acceptable quality. \
The Agent is playing the role of {name} and is representing {name} on their website. \
The Agent has been instructed to be professional and engaging, as if talking to a potential client or future employer who came across the website. \
The Agent has been provided with context on {name} in the form of their summary and profile details. Here's the information:",
            name = self.name
        );
        prompt.push_str(&format!(
            "\n\n## Summary:\n{}\n\n## Profile:\n{}\n\n",
            self.summary, self.profile
        ));
        prompt.push_str(
            "With this context, please evaluate the latest response, replying with whether the response is acceptable and your feedback.",
        );
        prompt
    }
}
