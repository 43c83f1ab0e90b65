//! Local suggestion source used when the LLM path gives up.
//!
//! Deterministic and offline. Quality is deliberately modest; the response
//! carries `from_fallback` so the client can say so.

use crate::ai::SuggestionSection;
use crate::models::curriculum::CurriculumData;

const GENERIC_SKILLS: &[&str] = &[
    "Communication",
    "Problem solving",
    "Teamwork",
    "Time management",
    "Adaptability",
    "Critical thinking",
    "Project management",
];

const EXPERIENCE_BULLETS: &[&str] = &[
    "Delivered {position} responsibilities at {company} while meeting deadlines and quality targets",
    "Collaborated with cross-functional teams at {company} to improve processes",
    "Identified and resolved recurring issues, reducing rework for the team",
];

const GENERIC_EXPERIENCE_BULLETS: &[&str] = &[
    "Handled day-to-day responsibilities reliably and met agreed deadlines",
    "Worked with colleagues to improve how tasks were organized and tracked",
    "Learned new tools quickly and applied them to everyday work",
];

const ACHIEVEMENT_LINES: &[&str] = &[
    "Recognized for consistent delivery on high-priority work",
    "Improved an existing process, saving the team measurable time",
    "Mentored colleagues and shared knowledge across the team",
];

pub fn suggestions_for(section: SuggestionSection, data: &CurriculumData) -> Vec<String> {
    match section {
        SuggestionSection::Objective => objective_suggestions(data),
        SuggestionSection::Experience => experience_suggestions(data),
        SuggestionSection::Skills => skill_suggestions(data),
        SuggestionSection::Achievements => ACHIEVEMENT_LINES.iter().map(|s| s.to_string()).collect(),
    }
}

fn objective_suggestions(data: &CurriculumData) -> Vec<String> {
    let role = target_role(data);
    match role {
        Some(role) => vec![
            format!("{role} seeking to apply proven skills to deliver measurable results for a growing team."),
            format!("Motivated {role} focused on continuous learning and high-quality work."),
            format!("Opportunity as {role} where I can contribute experience and grow with the company."),
        ],
        None => vec![
            "Professional seeking to apply proven skills to deliver measurable results for a growing team.".to_string(),
            "Motivated professional focused on continuous learning and high-quality work.".to_string(),
        ],
    }
}

fn experience_suggestions(data: &CurriculumData) -> Vec<String> {
    let Some(role) = data.experience_by_recency().into_iter().next() else {
        return GENERIC_EXPERIENCE_BULLETS.iter().map(|s| s.to_string()).collect();
    };
    let company = non_empty(&role.company).unwrap_or("the company");
    let position = non_empty(&role.position).unwrap_or("core");

    EXPERIENCE_BULLETS
        .iter()
        .map(|line| line.replace("{company}", company).replace("{position}", position))
        .collect()
}

fn skill_suggestions(data: &CurriculumData) -> Vec<String> {
    let existing: Vec<String> = data
        .skill_names()
        .iter()
        .map(|s| s.to_lowercase())
        .collect();

    GENERIC_SKILLS
        .iter()
        .filter(|skill| !existing.contains(&skill.to_lowercase()))
        .take(5)
        .map(|s| s.to_string())
        .collect()
}

fn target_role(data: &CurriculumData) -> Option<&str> {
    non_empty(&data.professional_objective.title).or_else(|| {
        data.experience_by_recency()
            .into_iter()
            .find_map(|e| non_empty(&e.position))
    })
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::curriculum::{Experience, ProfessionalObjective, Skill};

    #[test]
    fn test_objective_uses_target_role() {
        let data = CurriculumData {
            professional_objective: ProfessionalObjective {
                title: "UX Designer".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let suggestions = suggestions_for(SuggestionSection::Objective, &data);
        assert_eq!(suggestions.len(), 3);
        assert!(suggestions.iter().all(|s| s.contains("UX Designer")));
    }

    #[test]
    fn test_objective_falls_back_to_latest_position() {
        let data = CurriculumData {
            experience: vec![Experience {
                position: "Nurse".to_string(),
                current: true,
                ..Default::default()
            }],
            ..Default::default()
        };
        let suggestions = suggestions_for(SuggestionSection::Objective, &data);
        assert!(suggestions[0].starts_with("Nurse"));
    }

    #[test]
    fn test_objective_without_any_role() {
        let suggestions = suggestions_for(SuggestionSection::Objective, &CurriculumData::default());
        assert_eq!(suggestions.len(), 2);
        assert!(suggestions[0].starts_with("Professional"));
    }

    #[test]
    fn test_experience_uses_latest_role() {

        let data = CurriculumData {
            experience: vec![Experience {
                company: "Acme".to_string(),
                position: "Cashier".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let bullets = suggestions_for(SuggestionSection::Experience, &data);
        assert_eq!(bullets.len(), EXPERIENCE_BULLETS.len());
        assert!(bullets[0].contains("Cashier") && bullets[0].contains("Acme"));
        assert!(bullets.iter().all(|b| !b.contains('{')));
    }

    #[test]
    fn test_experience_without_roles_is_generic() {
        let bullets = suggestions_for(SuggestionSection::Experience, &CurriculumData::default());
        assert_eq!(bullets.len(), GENERIC_EXPERIENCE_BULLETS.len());
        assert!(bullets.iter().all(|b| !b.trim().is_empty() && !b.contains('{')));
    }

    #[test]
    fn test_every_section_has_suggestions_for_blank_curriculum() {
        let blank = CurriculumData::default();
        for section in [
            SuggestionSection::Objective,
            SuggestionSection::Experience,
            SuggestionSection::Skills,
            SuggestionSection::Achievements,
        ] {
            assert!(!suggestions_for(section, &blank).is_empty(), "{section:?}");
        }
    }

    #[test]
    fn test_skills_skip_existing_case_insensitively() {
        let data = CurriculumData {
            skills: vec![Skill {
                name: "teamwork".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let skills = suggestions_for(SuggestionSection::Skills, &data);
        assert_eq!(skills.len(), 5);
        assert!(!skills.iter().any(|s| s == "Teamwork"));
    }
}
