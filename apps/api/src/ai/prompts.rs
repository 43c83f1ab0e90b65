// Prompts for the suggestion endpoint.
// Cross-cutting fragments live in llm_client::prompts.

use crate::ai::SuggestionSection;
use crate::models::curriculum::CurriculumData;

pub const SUGGESTION_SYSTEM_PREFIX: &str = "You are an experienced résumé writer \
    helping a candidate fill in one section of their CV.";

pub const OBJECTIVE_INSTRUCTION: &str = "\
    Write 3 alternative professional objective statements for this candidate. \
    Each must be one or two sentences, first person implied (no 'I'), \
    and name the target role when one is given.";

pub const EXPERIENCE_INSTRUCTION: &str = "\
    Write up to 5 résumé bullet points for the candidate's most recent role. \
    Start each with a strong past-tense verb (present tense for a current role). \
    Keep each under 25 words.";

pub const SKILLS_INSTRUCTION: &str = "\
    Suggest up to 5 additional skills relevant to the candidate's target role \
    that are implied by their experience and projects but not already listed. \
    Return skill names only.";

pub const ACHIEVEMENTS_INSTRUCTION: &str = "\
    Rewrite or propose up to 5 achievement statements grounded in the candidate's \
    experience and projects. Prefer concrete outcomes over responsibilities.";

pub const OUTPUT_FORMAT: &str = "Respond with a JSON array of strings and nothing else.";

pub fn instruction_for(section: SuggestionSection) -> &'static str {
    match section {
        SuggestionSection::Objective => OBJECTIVE_INSTRUCTION,
        SuggestionSection::Experience => EXPERIENCE_INSTRUCTION,
        SuggestionSection::Skills => SKILLS_INSTRUCTION,
        SuggestionSection::Achievements => ACHIEVEMENTS_INSTRUCTION,
    }
}

/// Plain-text digest of the curriculum. Empty fields are skipped.
pub fn curriculum_digest(data: &CurriculumData) -> String {
    let mut lines = Vec::new();

    push_field(&mut lines, "Name", &data.personal_info.full_name);
    push_field(&mut lines, "Target role", &data.professional_objective.title);
    push_field(&mut lines, "Current objective", &data.professional_objective.description);

    let roles = data.experience_by_recency();
    if !roles.is_empty() {
        lines.push("Experience:".to_string());
        for role in roles {
            let end = if role.current { "present" } else { role.end_date.as_str() };
            lines.push(format!(
                "- {} at {} ({} to {}): {}",
                role.position.trim(),
                role.company.trim(),
                role.start_date.trim(),
                end.trim(),
                role.description.trim()
            ));
            for highlight in role.achievements.iter().filter(|a| !a.trim().is_empty()) {
                lines.push(format!("  * {}", highlight.trim()));
            }
        }
    }

    if !data.education.is_empty() {
        lines.push("Education:".to_string());
        for edu in &data.education {
            lines.push(format!(
                "- {} in {}, {}",
                edu.degree.trim(),
                edu.field_of_study.trim(),
                edu.institution.trim()
            ));
        }
    }

    let skills = data.skill_names();
    if !skills.is_empty() {
        lines.push(format!("Skills: {}", skills.join(", ")));
    }

    if !data.projects.is_empty() {
        lines.push("Projects:".to_string());
        for project in &data.projects {
            let stack = if project.technologies.is_empty() {
                String::new()
            } else {
                format!(" [{}]", project.technologies.join(", "))
            };
            lines.push(format!(
                "- {}{}: {}",
                project.name.trim(),
                stack,
                project.description.trim()
            ));
        }
    }

    if !data.achievements.is_empty() {
        lines.push("Achievements:".to_string());
        for achievement in &data.achievements {
            lines.push(format!("- {}", achievement.title.trim()));
        }
    }

    lines.join("\n")
}

pub fn build_suggestion_prompt(section: SuggestionSection, data: &CurriculumData) -> String {
    format!(
        "{}\n\nCANDIDATE DATA:\n{}\n\n{}",
        instruction_for(section),
        curriculum_digest(data),
        OUTPUT_FORMAT
    )
}

fn push_field(lines: &mut Vec<String>, label: &str, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        lines.push(format!("{label}: {value}"));
    }
}
