// src/scoring/prompt.rs
use crate::clients::CompletionRequest;
use crate::types::{Company, Profile, PromptTemplate, ScoringJob};

pub const SYSTEM_PROMPT: &str = "You are an experienced technical recruiter. \
Evaluate the LinkedIn profile you are given against the instructions. \
Respond with a single JSON object and nothing else. \
Include a numeric \"score\" from 0 to 100, a short \"summary\", \
and lists of \"strengths\" and \"concerns\".";

pub const ENHANCED_RUBRIC: &str = "Produce a sectioned assessment as JSON with these keys:\n\
- \"score\": overall score from 0 to 100\n\
- \"category_scores\": object with \"experience\", \"skills\", \"education\", \"career_trajectory\" and \"company_fit\", each 0 to 100\n\
- \"strengths\": list of strings\n\
- \"concerns\": list of strings\n\
- \"recommendation\": one of \"strong_yes\", \"yes\", \"maybe\", \"no\"\n\
- \"summary\": two or three sentences";

/// Appended to a custom system prompt that never asks for JSON, since JSON mode
/// is rejected by OpenAI unless the messages mention it.
const JSON_INSTRUCTION: &str = "Respond with a single JSON object and nothing else.";

const PROFILE_PLACEHOLDER: &str = "{{profile}}";

/// Fills `{{profile}}`, `{{name}}`, `{{headline}}`, `{{company}}`, `{{job_title}}`
/// and `{{location}}`. A template without `{{profile}}` gets the profile appended.
pub fn render(template: &str, profile: &Profile) -> String {
    let summary = profile.summary_text();
    let mut out = template
        .replace(PROFILE_PLACEHOLDER, summary.trim_end())
        .replace("{{name}}", profile.display_name())
        .replace("{{headline}}", profile.headline.as_deref().unwrap_or(""))
        .replace("{{company}}", profile.current_company.as_deref().unwrap_or(""))
        .replace("{{job_title}}", profile.job_title.as_deref().unwrap_or(""))
        .replace("{{location}}", profile.location.as_deref().unwrap_or(""));

    if !template.contains(PROFILE_PLACEHOLDER) {
        out.push_str("\n\nProfile:\n");
        out.push_str(summary.trim_end());
    }
    out
}

/// Builds the LLM request for a job. Template metadata may override the model,
/// temperature, max tokens and system prompt; a model on the job wins over all.
pub fn build_request(
    job: &ScoringJob,
    template: Option<&PromptTemplate>,
    profile: &Profile,
    company: Option<&Company>,
) -> CompletionRequest {
    let instructions = template
        .map(|t| t.prompt.as_str())
        .or(job.prompt.as_deref())
        .unwrap_or_default();

    let mut prompt = render(instructions, profile);
    if job.enhanced {
        if let Some(company) = company {
            prompt.push_str("\n\nCurrent company:\n");
            prompt.push_str(company.summary_text().trim_end());
        }
        prompt.push_str("\n\n");
        prompt.push_str(ENHANCED_RUBRIC);
    }

    let system = match template.and_then(|t| t.metadata_str("system_prompt")) {
        Some(custom) if !custom.to_lowercase().contains("json") => {
            format!("{}\n\n{}", custom.trim_end(), JSON_INSTRUCTION)
        }
        Some(custom) => custom.to_string(),
        None => SYSTEM_PROMPT.to_string(),
    };
    let model = job
        .model
        .clone()
        .or_else(|| template.and_then(|t| t.metadata_str("model")).map(String::from));

    let mut request = CompletionRequest::new(prompt)
        .with_system(system)
        .with_model(model);
    request.temperature = template
        .and_then(|t| t.metadata_f64("temperature"))
        .map(|v| v as f32);
    request.max_tokens = template.and_then(|t| t.metadata_u32("max_tokens"));
    request.json_mode = true;
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewTemplate, PromptSelection};
    use serde_json::{json, Map};

    fn profile() -> Profile {
        let mut p = Profile::pending("https://www.linkedin.com/in/jane".to_string());
        p.full_name = Some("Jane Doe".to_string());
        p.headline = Some("Staff Engineer".to_string());
        p.current_company = Some("Acme".to_string());
        p
    }

    #[test]
    fn test_render_placeholders() {
        let text = render("Rate {{name}} ({{headline}}) at {{company}}:\n{{profile}}", &profile());
        assert!(text.starts_with("Rate Jane Doe (Staff Engineer) at Acme:\nName: Jane Doe"));
        assert!(!text.contains("\n\nProfile:\n"));
    }

    #[test]
    fn test_render_appends_profile_when_missing() {
        let text = render("Is {{name}} senior?", &profile());
        assert!(text.starts_with("Is Jane Doe senior?\n\nProfile:\nName: Jane Doe"));
    }

    #[test]
    fn test_build_request_uses_template_metadata() {
        let mut metadata = Map::new();
        metadata.insert("model".into(), json!("gpt-4o"));
        metadata.insert("temperature".into(), json!(0.2));
        metadata.insert("max_tokens".into(), json!(800));
        let template = NewTemplate {
            name: "Engineer".into(),
            category: "engineering".into(),
            prompt: "Assess {{name}}".into(),
            is_active: None,
            metadata: Some(metadata),
        }
        .into_template()
        .unwrap();
        let job = ScoringJob::new(
            "p".into(),
            PromptSelection::Template(template.id.clone()),
            false,
            None,
        );

        let request = build_request(&job, Some(&template), &profile(), None);
        assert_eq!(request.model.as_deref(), Some("gpt-4o"));
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, Some(800));
        assert_eq!(request.system.as_deref(), Some(SYSTEM_PROMPT));
        assert!(request.json_mode);
        assert!(request.prompt.starts_with("Assess Jane Doe"));
    }

    #[test]
    fn test_enhanced_request_includes_company_and_rubric() {
        let job = ScoringJob::new(
            "p".into(),
            PromptSelection::Prompt("Rate this person".into()),
            true,
            Some("custom".into()),
        );
        let mut company = Company::new("https://www.linkedin.com/company/acme".into());
        company.name = Some("Acme".into());

        let request = build_request(&job, None, &profile(), Some(&company));
        assert_eq!(request.model.as_deref(), Some("custom"));
        assert!(request.prompt.contains("Current company:\nCompany: Acme"));
        assert!(request.prompt.ends_with(ENHANCED_RUBRIC));
    }

    fn template_with_system(system: &str) -> PromptTemplate {
        let mut metadata = Map::new();
        metadata.insert("system_prompt".into(), json!(system));
        NewTemplate {
            name: "Custom".into(),
            category: "engineering".into(),
            prompt: "Assess {{name}}".into(),
            is_active: None,
            metadata: Some(metadata),
        }
        .into_template()
        .unwrap()
    }

    #[test]
    fn test_custom_system_prompt_always_asks_for_json() {
        let plain = template_with_system("You review sales candidates.");
        let job = ScoringJob::new("p".into(), PromptSelection::Template(plain.id.clone()), false, None);
        let request = build_request(&job, Some(&plain), &profile(), None);
        let system = request.system.unwrap();
        assert!(system.starts_with("You review sales candidates."));
        assert!(system.ends_with(JSON_INSTRUCTION));
        assert!(request.json_mode);

        let explicit = template_with_system("Reply in json only.");
        let request = build_request(&job, Some(&explicit), &profile(), None);
        assert_eq!(request.system.as_deref(), Some("Reply in json only."));
    }
}
